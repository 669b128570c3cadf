//! Message bodies and their code-based dispatch.

pub mod attach;
pub mod failure;
pub mod membership;
pub mod ping;
pub mod probe;
pub mod storage;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::field::{
    read_field, write_field, DecodeContext, LengthWidth, WireDecode, WireEncode, WireRead,
};

pub use attach::{AttachReqAns, CandidateType, IceCandidate};
pub use failure::{ErrorCode, ErrorContent};
pub use membership::{JoinAnswer, JoinRequest, LeaveAnswer, LeaveRequest};
pub use ping::{PingAnswer, PingRequest};
pub use probe::{ProbeAnswer, ProbeInformation, ProbeInformationType, ProbeRequest};
pub use storage::{
    FetchAnswer, FetchKindResponse, FetchRequest, StatAnswer, StatKindResponse, StatRequest,
    StoreAnswer, StoreKindResponse, StoreRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    ProbeReq,
    ProbeAns,
    AttachReq,
    AttachAns,
    StoreReq,
    StoreAns,
    FetchReq,
    FetchAns,
    JoinReq,
    JoinAns,
    LeaveReq,
    LeaveAns,
    PingReq,
    PingAns,
    StatReq,
    StatAns,
    Error,
}

impl ContentType {
    pub const fn code(self) -> u16 {
        match self {
            Self::ProbeReq => 1,
            Self::ProbeAns => 2,
            Self::AttachReq => 3,
            Self::AttachAns => 4,
            Self::StoreReq => 7,
            Self::StoreAns => 8,
            Self::FetchReq => 9,
            Self::FetchAns => 10,
            Self::JoinReq => 15,
            Self::JoinAns => 16,
            Self::LeaveReq => 17,
            Self::LeaveAns => 18,
            Self::PingReq => 23,
            Self::PingAns => 24,
            Self::StatReq => 25,
            Self::StatAns => 26,
            Self::Error => 0xffff,
        }
    }

    pub fn from_code(code: u16) -> Result<Self, CodecError> {
        Ok(match code {
            1 => Self::ProbeReq,
            2 => Self::ProbeAns,
            3 => Self::AttachReq,
            4 => Self::AttachAns,
            7 => Self::StoreReq,
            8 => Self::StoreAns,
            9 => Self::FetchReq,
            10 => Self::FetchAns,
            15 => Self::JoinReq,
            16 => Self::JoinAns,
            17 => Self::LeaveReq,
            18 => Self::LeaveAns,
            23 => Self::PingReq,
            24 => Self::PingAns,
            25 => Self::StatReq,
            26 => Self::StatAns,
            0xffff => Self::Error,
            other => {
                return Err(CodecError::UnknownTag {
                    what: "message code",
                    tag: u32::from(other),
                })
            }
        })
    }

    /// Answers carry even codes; the error code counts as an answer.
    pub const fn is_answer(self) -> bool {
        self.code() % 2 == 0 || matches!(self, Self::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    PingRequest(PingRequest),
    PingAnswer(PingAnswer),
    ProbeRequest(ProbeRequest),
    ProbeAnswer(ProbeAnswer),
    AttachRequest(AttachReqAns),
    AttachAnswer(AttachReqAns),
    JoinRequest(JoinRequest),
    JoinAnswer(JoinAnswer),
    LeaveRequest(LeaveRequest),
    LeaveAnswer(LeaveAnswer),
    StoreRequest(StoreRequest),
    StoreAnswer(StoreAnswer),
    FetchRequest(FetchRequest),
    FetchAnswer(FetchAnswer),
    StatRequest(StatRequest),
    StatAnswer(StatAnswer),
    Error(ErrorContent),
}

impl Content {
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::PingRequest(_) => ContentType::PingReq,
            Self::PingAnswer(_) => ContentType::PingAns,
            Self::ProbeRequest(_) => ContentType::ProbeReq,
            Self::ProbeAnswer(_) => ContentType::ProbeAns,
            Self::AttachRequest(_) => ContentType::AttachReq,
            Self::AttachAnswer(_) => ContentType::AttachAns,
            Self::JoinRequest(_) => ContentType::JoinReq,
            Self::JoinAnswer(_) => ContentType::JoinAns,
            Self::LeaveRequest(_) => ContentType::LeaveReq,
            Self::LeaveAnswer(_) => ContentType::LeaveAns,
            Self::StoreRequest(_) => ContentType::StoreReq,
            Self::StoreAnswer(_) => ContentType::StoreAns,
            Self::FetchRequest(_) => ContentType::FetchReq,
            Self::FetchAnswer(_) => ContentType::FetchAns,
            Self::StatRequest(_) => ContentType::StatReq,
            Self::StatAnswer(_) => ContentType::StatAns,
            Self::Error(_) => ContentType::Error,
        }
    }

    pub fn is_answer(&self) -> bool {
        self.content_type().is_answer()
    }

    fn encode_body(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Self::PingRequest(c) => c.encode(out),
            Self::PingAnswer(c) => c.encode(out),
            Self::ProbeRequest(c) => c.encode(out),
            Self::ProbeAnswer(c) => c.encode(out),
            Self::AttachRequest(c) | Self::AttachAnswer(c) => c.encode(out),
            Self::JoinRequest(c) => c.encode(out),
            Self::JoinAnswer(c) => c.encode(out),
            Self::LeaveRequest(c) => c.encode(out),
            Self::LeaveAnswer(c) => c.encode(out),
            Self::StoreRequest(c) => c.encode(out),
            Self::StoreAnswer(c) => c.encode(out),
            Self::FetchRequest(c) | Self::StatRequest(c) => c.encode(out),
            Self::FetchAnswer(c) => c.encode(out),
            Self::StatAnswer(c) => c.encode(out),
            Self::Error(c) => c.encode(out),
        }
    }
}

impl WireEncode for Content {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u16(self.content_type().code());
        write_field(out, LengthWidth::U32, |out| self.encode_body(out))
    }
}

impl WireDecode for Content {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let content_type = ContentType::from_code(input.read_u16()?)?;
        let mut body = read_field(input, LengthWidth::U32)?;
        let body = &mut body;
        Ok(match content_type {
            ContentType::PingReq => Self::PingRequest(PingRequest::decode(body, ctx)?),
            ContentType::PingAns => Self::PingAnswer(PingAnswer::decode(body, ctx)?),
            ContentType::ProbeReq => Self::ProbeRequest(ProbeRequest::decode(body, ctx)?),
            ContentType::ProbeAns => Self::ProbeAnswer(ProbeAnswer::decode(body, ctx)?),
            ContentType::AttachReq => Self::AttachRequest(AttachReqAns::decode(body, ctx)?),
            ContentType::AttachAns => Self::AttachAnswer(AttachReqAns::decode(body, ctx)?),
            ContentType::JoinReq => Self::JoinRequest(JoinRequest::decode(body, ctx)?),
            ContentType::JoinAns => Self::JoinAnswer(JoinAnswer::decode(body, ctx)?),
            ContentType::LeaveReq => Self::LeaveRequest(LeaveRequest::decode(body, ctx)?),
            ContentType::LeaveAns => Self::LeaveAnswer(LeaveAnswer::decode(body, ctx)?),
            ContentType::StoreReq => Self::StoreRequest(StoreRequest::decode(body, ctx)?),
            ContentType::StoreAns => Self::StoreAnswer(StoreAnswer::decode(body, ctx)?),
            ContentType::FetchReq => Self::FetchRequest(FetchRequest::decode(body, ctx)?),
            ContentType::FetchAns => Self::FetchAnswer(FetchAnswer::decode(body, ctx)?),
            ContentType::StatReq => Self::StatRequest(StatRequest::decode(body, ctx)?),
            ContentType::StatAns => Self::StatAnswer(StatAnswer::decode(body, ctx)?),
            ContentType::Error => Self::Error(ErrorContent::decode(body, ctx)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KindRegistry;

    #[test]
    fn ping_request_wire_bytes() {
        let content = Content::PingRequest(PingRequest { padding: 3 });
        let bytes = content.to_bytes().unwrap();
        assert_eq!(
            &bytes[..],
            &[0x00, 23, 0x00, 0x00, 0x00, 0x05, 0x00, 0x03, 0, 0, 0]
        );
    }

    #[test]
    fn unknown_message_code_is_a_decode_failure() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(16, &kinds);
        let mut input = Bytes::from_static(&[0x00, 0x05, 0, 0, 0, 0]);
        assert_eq!(
            Content::decode(&mut input, &ctx).expect_err("code 5 is not registered"),
            CodecError::UnknownTag {
                what: "message code",
                tag: 5
            }
        );
    }

    #[test]
    fn body_beyond_declared_length_is_rejected() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(16, &kinds);
        let mut input = Bytes::from_static(&[0x00, 24, 0, 0, 0, 0x20, 0, 0]);
        assert!(matches!(
            Content::decode(&mut input, &ctx),
            Err(CodecError::LengthOverflow { declared: 32, .. })
        ));
    }

    #[test]
    fn answers_are_classified() {
        assert!(ContentType::JoinAns.is_answer());
        assert!(ContentType::Error.is_answer());
        assert!(!ContentType::LeaveReq.is_answer());
        assert!(!ContentType::StatReq.is_answer());
    }

    #[test]
    fn error_content_keeps_unnamed_codes() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(16, &kinds);
        let content = Content::Error(ErrorContent::new(ErrorCode::Other(99), &b"odd"[..]));
        let mut bytes = content.to_bytes().unwrap();
        assert_eq!(Content::decode(&mut bytes, &ctx).unwrap(), content);
        assert_eq!(ErrorCode::from_code(5), ErrorCode::GenerationCounterTooLow);
    }
}
