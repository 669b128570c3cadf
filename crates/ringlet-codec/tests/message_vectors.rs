use std::sync::Arc;

use bytes::Bytes;
use ringlet_codec::content::{
    AttachReqAns, FetchAnswer, FetchKindResponse, FetchRequest, IceCandidate, JoinAnswer,
    JoinRequest, LeaveAnswer, LeaveRequest, PingAnswer, PingRequest, ProbeAnswer,
    ProbeInformation, ProbeInformationType, ProbeRequest, StatAnswer, StatKindResponse,
    StoreAnswer, StoreKindResponse, StoreRequest,
};
use ringlet_codec::storage::{
    AccessPolicyKind, ArrayRange, DataKind, DataModel, KindRegistry, ModelSpecifier, StoreKindData,
    StoredData, StoredDataSpecifier,
};
use ringlet_codec::{
    Content, DecodeContext, ErrorCode, ErrorContent, GenericCertificate, Header, Message,
    SecurityBlock, Signature, SignatureAlgorithm, SignerIdentity,
};
use ringlet_core::{HashAlgorithm, NodeId, OverlayLinkType, ResourceId, RoutableId};

fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

fn node(byte: u8) -> NodeId {
    NodeId::new(vec![byte; 2]).unwrap()
}

fn kinds() -> (KindRegistry, Arc<DataKind>, Arc<DataKind>, Arc<DataKind>) {
    let mut kinds = KindRegistry::new();
    let single = kinds
        .register(DataKind::new(1, "text", DataModel::Single, AccessPolicyKind::NodeMatch))
        .unwrap();
    let array = kinds
        .register(DataKind::new(2, "log", DataModel::Array, AccessPolicyKind::NodeMatch))
        .unwrap();
    let dict = kinds
        .register(DataKind::new(3, "map", DataModel::Dictionary, AccessPolicyKind::UserMatch))
        .unwrap();
    (kinds, single, array, dict)
}

fn signed() -> Signature {
    Signature {
        hash_algorithm: HashAlgorithm::Sha256,
        algorithm: SignatureAlgorithm::Ed25519,
        identity: SignerIdentity::CertHash {
            hash_algorithm: HashAlgorithm::Sha256,
            hash: Bytes::from(vec![0x33; 32]),
        },
        value: Bytes::from(vec![0x44; 64]),
    }
}

fn wrap(content: Content) -> Message {
    Message {
        header: Header::new(7, 99, node(1), vec![RoutableId::Node(node(2))]),
        content,
        security_block: SecurityBlock {
            certificates: vec![GenericCertificate {
                cert_type: ringlet_codec::security::CertificateType::X509,
                der: Bytes::from_static(b"der"),
            }],
            signature: signed(),
        },
    }
}

fn sample_contents(
    single: &Arc<DataKind>,
    array: &Arc<DataKind>,
    dict: &Arc<DataKind>,
) -> Vec<Content> {
    let resource = ResourceId::new(vec![0x0f; 2]).unwrap();
    let stored = |value| StoredData {
        generation: 5,
        lifetime: 3600,
        value,
        signature: signed(),
    };
    vec![
        Content::PingRequest(PingRequest::default()),
        Content::PingAnswer(PingAnswer {
            response_id: 17,
            time: 1_700_000_000_000,
        }),
        Content::ProbeRequest(ProbeRequest {
            requested: vec![ProbeInformationType::NumResources, ProbeInformationType::Uptime],
        }),
        Content::ProbeAnswer(ProbeAnswer {
            information: vec![ProbeInformation::NumResources(4), ProbeInformation::Uptime(60)],
        }),
        Content::AttachRequest(AttachReqAns::default()),
        Content::AttachAnswer(AttachReqAns {
            ufrag: Bytes::from_static(b"uf"),
            password: Bytes::from_static(b"pw"),
            role: Bytes::from_static(b"passive"),
            candidates: vec![IceCandidate::host(
                "[::1]:6084".parse().unwrap(),
                OverlayLinkType::DtlsUdpSr,
            )],
            send_update: true,
        }),
        Content::JoinRequest(JoinRequest {
            joining_node: node(1),
            overlay_data: Bytes::new(),
        }),
        Content::JoinAnswer(JoinAnswer::default()),
        Content::LeaveRequest(LeaveRequest {
            leaving_node: node(1),
            overlay_data: Bytes::from_static(b"bye"),
        }),
        Content::LeaveAnswer(LeaveAnswer),
        Content::StoreRequest(StoreRequest {
            resource: resource.clone(),
            replica_number: 0,
            kind_data: vec![
                StoreKindData {
                    kind: Arc::clone(single),
                    generation: 1,
                    values: vec![stored(DataModel::Single.builder().value(&b"hello"[..]).build())],
                },
                StoreKindData {
                    kind: Arc::clone(array),
                    generation: 2,
                    values: vec![
                        stored(DataModel::Array.builder().index(0).value(&b"a"[..]).build()),
                        stored(DataModel::Array.builder().append(true).value(&b"b"[..]).build()),
                    ],
                },
                StoreKindData {
                    kind: Arc::clone(dict),
                    generation: 3,
                    values: Vec::new(),
                },
            ],
        }),
        Content::StoreAnswer(StoreAnswer {
            responses: vec![StoreKindResponse {
                kind: single.id,
                generation: 1,
                replicas: vec![node(3), node(4)],
            }],
        }),
        Content::FetchRequest(FetchRequest {
            resource: resource.clone(),
            specifiers: vec![
                StoredDataSpecifier::all(single, 0),
                StoredDataSpecifier {
                    kind: array.id,
                    generation: 1,
                    specifier: ModelSpecifier::Array(vec![ArrayRange { first: 0, last: 9 }]),
                },
                StoredDataSpecifier {
                    kind: dict.id,
                    generation: 0,
                    specifier: ModelSpecifier::Dictionary(vec![Bytes::from_static(b"k")]),
                },
            ],
        }),
        Content::FetchAnswer(FetchAnswer {
            responses: vec![FetchKindResponse {
                kind: dict.id,
                generation: 3,
                values: vec![
                    stored(DataModel::Dictionary.builder().key(&b"k"[..]).value(&b"v"[..]).build()),
                    StoredData::non_existent(DataModel::Dictionary),
                ],
            }],
        }),
        Content::StatRequest(FetchRequest {
            resource,
            specifiers: Vec::new(),
        }),
        Content::StatAnswer(StatAnswer {
            responses: vec![StatKindResponse {
                kind: single.id,
                generation: 1,
                values: vec![stored(DataModel::Single.builder().value(&b"hello"[..]).build())
                    .metadata(HashAlgorithm::Sha256)],
            }],
        }),
        Content::Error(ErrorContent::new(ErrorCode::Forbidden, Bytes::new())),
    ]
}

#[test]
fn minimal_ping_message_matches_vector() {
    let message = Message {
        header: Header::new(0x0102_0304, 1, node(0xaa), vec![RoutableId::Node(node(0xbb))]),
        content: Content::PingRequest(PingRequest::default()),
        security_block: SecurityBlock::unsigned(),
    };
    let expected = concat!(
        "d2454c4f", "01020304", "0000", "0a", "64", "c0000000", "0000002a",
        "0000000000000001", "00000000", "02aaaa", "0000", "00040102bbbb", "0000",
        "0017000000020000",
        "0000", "0000", "030000", "0000",
    );
    assert_eq!(to_hex(&message.encode().expect("ping encodes")), expected);
}

#[test]
fn every_content_variant_decodes_to_itself() {
    let (registry, single, array, dict) = kinds();
    let ctx = DecodeContext::new(2, &registry);
    for content in sample_contents(&single, &array, &dict) {
        let message = wrap(content);
        let bytes = message.encode().expect("sample encodes");
        let decoded = Message::decode(bytes, &ctx).expect("sample decodes");
        assert_eq!(decoded, message, "{:?}", message.content.content_type());
    }
}

#[test]
fn message_length_matches_encoded_size() {
    let (registry, single, array, dict) = kinds();
    let ctx = DecodeContext::new(2, &registry);
    for content in sample_contents(&single, &array, &dict) {
        let bytes = wrap(content).encode().unwrap();
        let declared = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]) as usize;
        assert_eq!(declared + 20, bytes.len());
        let mut extended = bytes.to_vec();
        extended.extend_from_slice(&[0xde, 0xad]);
        assert!(Message::decode(Bytes::from(extended), &ctx).is_ok());
    }
}

#[test]
fn storage_content_requires_registered_kinds() {
    let (registry, single, array, dict) = kinds();
    let store = sample_contents(&single, &array, &dict)
        .into_iter()
        .find(|c| matches!(c, Content::StoreRequest(_)))
        .unwrap();
    let bytes = wrap(store).encode().unwrap();
    drop(registry);

    let empty = KindRegistry::new();
    let ctx = DecodeContext::new(2, &empty);
    assert_eq!(
        Message::decode(bytes, &ctx).expect_err("kinds unknown"),
        ringlet_codec::CodecError::UnknownKind(1)
    );
}
