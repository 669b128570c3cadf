#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use ringlet_codec::storage::{AccessPolicyKind, DataKind, DataModel, KindRegistry};
use ringlet_codec::{DecodeContext, Message};

fuzz_target!(|data: &[u8]| {
    let mut kinds = KindRegistry::new();
    for (id, model) in [(1, DataModel::Single), (2, DataModel::Array), (3, DataModel::Dictionary)] {
        let _ = kinds.register(DataKind::new(id, "fuzz", model, AccessPolicyKind::NodeMatch));
    }
    let ctx = DecodeContext::new(16, &kinds);
    if let Ok(message) = Message::decode(Bytes::copy_from_slice(data), &ctx) {
        let _ = message.encode();
    }
});
