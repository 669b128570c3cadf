use bytes::Bytes;
use ringlet_codec::content::{StoreAnswer, StoreKindResponse};
use ringlet_codec::storage::KindError;
use ringlet_codec::{CodecError, ContentType, ErrorCode, ErrorContent, WireEncode};
use ringlet_core::CoreError;
use ringlet_crypto::SigningError;
use ringlet_transport::TransportError;
use thiserror::Error;

/// Failures surfaced by the overlay node.
///
/// Every variant maps onto a protocol error code so a failed request can be
/// answered instead of dropped.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("decode failed: {0}")]
    Decode(#[from] CodecError),
    #[error("network failure: {0}")]
    Network(String),
    #[error("access policy rejected the value: {0}")]
    AccessPolicy(String),
    /// Carries the generations the rejected kinds are currently stored at.
    #[error("generation counter too low for {} kind(s)", .0.len())]
    GenerationTooLow(Vec<StoreKindResponse>),
    #[error("data too large: {0}")]
    DataTooLarge(String),
    #[error("message of {0} bytes exceeds the overlay limit")]
    MessageTooLarge(usize),
    #[error("signature check failed: {0}")]
    Signature(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request timed out")]
    Timeout,
    #[error("message for overlay {0:#010x} reached another overlay")]
    IncompatibleOverlay(u32),
    #[error("critical forwarding option {0} is not supported")]
    UnsupportedForwardingOption(u8),
    #[error("ttl exceeded")]
    TtlExceeded,
    #[error("peer answered with error {}", .code.code())]
    Remote { code: ErrorCode, info: Bytes },
    #[error("unexpected {0:?} answer")]
    UnexpectedAnswer(ContentType),
    #[error("configuration error: {0}")]
    Config(String),
}

impl NodeError {
    /// Protocol error code reported to the requesting peer.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Decode(CodecError::UnknownKind(_)) => ErrorCode::UnknownKind,
            Self::Decode(_) | Self::UnexpectedAnswer(_) | Self::Config(_) => {
                ErrorCode::InvalidMessage
            }
            Self::Network(_) | Self::NotFound(_) => ErrorCode::NotFound,
            Self::AccessPolicy(_) | Self::Signature(_) | Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::GenerationTooLow(_) => ErrorCode::GenerationCounterTooLow,
            Self::DataTooLarge(_) => ErrorCode::DataTooLarge,
            Self::MessageTooLarge(_) => ErrorCode::MessageTooLarge,
            Self::Timeout => ErrorCode::RequestTimeout,
            Self::IncompatibleOverlay(_) => ErrorCode::IncompatibleWithOverlay,
            Self::UnsupportedForwardingOption(_) => ErrorCode::UnsupportedForwardingOption,
            Self::TtlExceeded => ErrorCode::TtlExceeded,
            Self::Remote { code, .. } => *code,
        }
    }

    /// Error answer body; generation conflicts carry the encoded store answer.
    pub fn to_error_content(&self) -> ErrorContent {
        let info = match self {
            Self::GenerationTooLow(responses) => StoreAnswer {
                responses: responses.clone(),
            }
            .to_bytes()
            .unwrap_or_default(),
            Self::Remote { info, .. } => info.clone(),
            other => Bytes::from(other.to_string()),
        };
        ErrorContent::new(self.error_code(), info)
    }
}

impl From<CoreError> for NodeError {
    fn from(err: CoreError) -> Self {
        Self::Decode(CodecError::Core(err))
    }
}

impl From<SigningError> for NodeError {
    fn from(err: SigningError) -> Self {
        Self::Signature(err.to_string())
    }
}

impl From<TransportError> for NodeError {
    fn from(err: TransportError) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<KindError> for NodeError {
    fn from(err: KindError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<config::ConfigError> for NodeError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringlet_codec::storage::{KindId, KindRegistry};
    use ringlet_codec::{DecodeContext, WireDecode};

    #[test]
    fn failures_map_to_protocol_codes() {
        assert_eq!(
            NodeError::AccessPolicy("x".into()).error_code(),
            ErrorCode::Forbidden
        );
        assert_eq!(
            NodeError::Decode(CodecError::UnknownKind(9)).error_code(),
            ErrorCode::UnknownKind
        );
        assert_eq!(
            NodeError::Decode(CodecError::Invalid("x")).error_code(),
            ErrorCode::InvalidMessage
        );
        assert_eq!(NodeError::Timeout.error_code(), ErrorCode::RequestTimeout);
        assert_eq!(NodeError::TtlExceeded.error_code().code(), 10);
        assert_eq!(
            NodeError::IncompatibleOverlay(1).error_code(),
            ErrorCode::IncompatibleWithOverlay
        );
        assert_eq!(NodeError::DataTooLarge("x".into()).error_code().code(), 8);
    }

    #[test]
    fn generation_conflicts_carry_a_store_answer() {
        let responses = vec![StoreKindResponse {
            kind: KindId(4),
            generation: 7,
            replicas: Vec::new(),
        }];
        let content = NodeError::GenerationTooLow(responses.clone()).to_error_content();
        assert_eq!(content.code, ErrorCode::GenerationCounterTooLow);

        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(16, &kinds);
        let mut info = content.info;
        let answer = StoreAnswer::decode(&mut info, &ctx).unwrap();
        assert_eq!(answer.responses, responses);
    }
}
