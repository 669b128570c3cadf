use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::field::{
    read_opaque, write_opaque, DecodeContext, LengthWidth, WireDecode, WireEncode, WireRead,
};

/// Protocol error codes returned in error answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Forbidden,
    NotFound,
    RequestTimeout,
    GenerationCounterTooLow,
    IncompatibleWithOverlay,
    UnsupportedForwardingOption,
    DataTooLarge,
    TtlExceeded,
    MessageTooLarge,
    UnknownKind,
    InvalidMessage,
    /// A code this node has no name for, kept so it can be reported.
    Other(u16),
}

impl ErrorCode {
    pub const fn code(self) -> u16 {
        match self {
            Self::Forbidden => 2,
            Self::NotFound => 3,
            Self::RequestTimeout => 4,
            Self::GenerationCounterTooLow => 5,
            Self::IncompatibleWithOverlay => 6,
            Self::UnsupportedForwardingOption => 7,
            Self::DataTooLarge => 8,
            Self::TtlExceeded => 10,
            Self::MessageTooLarge => 11,
            Self::UnknownKind => 12,
            Self::InvalidMessage => 20,
            Self::Other(code) => code,
        }
    }

    pub const fn from_code(code: u16) -> Self {
        match code {
            2 => Self::Forbidden,
            3 => Self::NotFound,
            4 => Self::RequestTimeout,
            5 => Self::GenerationCounterTooLow,
            6 => Self::IncompatibleWithOverlay,
            7 => Self::UnsupportedForwardingOption,
            8 => Self::DataTooLarge,
            10 => Self::TtlExceeded,
            11 => Self::MessageTooLarge,
            12 => Self::UnknownKind,
            20 => Self::InvalidMessage,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContent {
    pub code: ErrorCode,
    /// Code-specific detail; a generation-too-low error carries the encoded store answer.
    pub info: Bytes,
}

impl ErrorContent {
    pub fn new(code: ErrorCode, info: impl Into<Bytes>) -> Self {
        Self {
            code,
            info: info.into(),
        }
    }
}

impl WireEncode for ErrorContent {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u16(self.code.code());
        write_opaque(out, LengthWidth::U16, &self.info)
    }
}

impl WireDecode for ErrorContent {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            code: ErrorCode::from_code(input.read_u16()?),
            info: read_opaque(input, LengthWidth::U16)?,
        })
    }
}
