#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use ringlet_codec::storage::{AccessPolicyKind, DataKind, DataModel, KindRegistry};
use ringlet_codec::{Content, DecodeContext, SecurityBlock, WireDecode};
use ringlet_core::{NodeId, RoutableId};

fuzz_target!(|data: &[u8]| {
    let mut kinds = KindRegistry::new();
    let _ = kinds.register(DataKind::new(
        7,
        "fuzz",
        DataModel::Array,
        AccessPolicyKind::NodeMultiple,
    ));
    let ctx = DecodeContext::new(16, &kinds);
    let _ = Content::decode(&mut Bytes::copy_from_slice(data), &ctx);
    let _ = SecurityBlock::decode(&mut Bytes::copy_from_slice(data), &ctx);
    let _ = NodeId::decode(&mut Bytes::copy_from_slice(data), &ctx);
    let _ = RoutableId::decode(&mut Bytes::copy_from_slice(data), &ctx);
});
