//! Data models: how values of a kind are shaped, summarized and selected.
//!
//! | Model | Value | Specifier selects |
//! |---|---|---|
//! | single | one payload | the value |
//! | array | index + payload | indices inside any listed range |
//! | dictionary | key + payload | listed keys |

use bytes::{BufMut, Bytes, BytesMut};
use ringlet_core::HashAlgorithm;

use crate::error::CodecError;
use crate::field::{read_list, read_opaque, write_list, write_opaque, LengthWidth, WireRead};

/// Array index requesting an append after the last stored value.
pub const LAST_INDEX: u32 = 0xffff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataModel {
    Single,
    Array,
    Dictionary,
}

impl DataModel {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Array => "array",
            Self::Dictionary => "dictionary",
        }
    }

    pub fn builder(self) -> ValueBuilder {
        ValueBuilder {
            model: self,
            exists: true,
            value: Bytes::new(),
            index: 0,
            key: Bytes::new(),
        }
    }

    /// The value reported when a fetch matches nothing.
    pub fn default_value(self) -> DataValue {
        self.builder().exists(false).build()
    }

    /// Specifier selecting every stored value.
    pub fn match_all(self) -> ModelSpecifier {
        match self {
            Self::Single => ModelSpecifier::Single,
            Self::Array => ModelSpecifier::Array(Vec::new()),
            Self::Dictionary => ModelSpecifier::Dictionary(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleValue {
    pub exists: bool,
    pub value: Bytes,
}

impl SingleValue {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u8(u8::from(self.exists));
        write_opaque(out, LengthWidth::U32, &self.value)
    }

    fn decode(input: &mut Bytes) -> Result<Self, CodecError> {
        let exists = input.read_bool()?;
        let value = read_opaque(input, LengthWidth::U32)?;
        Ok(Self { exists, value })
    }

    fn metadata(&self, hash_algorithm: HashAlgorithm) -> SingleMetadata {
        SingleMetadata {
            exists: self.exists,
            value_length: self.value.len() as u32,
            hash_algorithm,
            hash: Bytes::from(hash_algorithm.digest(&self.value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    Single(SingleValue),
    Array { index: u32, value: SingleValue },
    Dictionary { key: Bytes, value: SingleValue },
}

impl DataValue {
    pub fn model(&self) -> DataModel {
        match self {
            Self::Single(_) => DataModel::Single,
            Self::Array { .. } => DataModel::Array,
            Self::Dictionary { .. } => DataModel::Dictionary,
        }
    }

    pub fn single(&self) -> &SingleValue {
        match self {
            Self::Single(value)
            | Self::Array { value, .. }
            | Self::Dictionary { value, .. } => value,
        }
    }

    pub fn exists(&self) -> bool {
        self.single().exists
    }

    /// Payload size checked against a kind's maximum.
    pub fn size(&self) -> usize {
        self.single().value.len()
    }

    pub fn metadata(&self, hash_algorithm: HashAlgorithm) -> Metadata {
        let meta = self.single().metadata(hash_algorithm);
        match self {
            Self::Single(_) => Metadata::Single(meta),
            Self::Array { index, .. } => Metadata::Array {
                index: *index,
                metadata: meta,
            },
            Self::Dictionary { key, .. } => Metadata::Dictionary {
                key: key.clone(),
                metadata: meta,
            },
        }
    }

    pub fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Self::Single(value) => value.encode(out),
            Self::Array { index, value } => {
                out.put_u32(*index);
                value.encode(out)
            }
            Self::Dictionary { key, value } => {
                write_opaque(out, LengthWidth::U16, key)?;
                value.encode(out)
            }
        }
    }

    pub fn decode_for(input: &mut Bytes, model: DataModel) -> Result<Self, CodecError> {
        Ok(match model {
            DataModel::Single => Self::Single(SingleValue::decode(input)?),
            DataModel::Array => {
                let index = input.read_u32()?;
                Self::Array {
                    index,
                    value: SingleValue::decode(input)?,
                }
            }
            DataModel::Dictionary => {
                let key = read_opaque(input, LengthWidth::U16)?;
                Self::Dictionary {
                    key,
                    value: SingleValue::decode(input)?,
                }
            }
        })
    }
}

/// Builds values for one model from raw bytes plus model parameters.
#[derive(Debug, Clone)]
pub struct ValueBuilder {
    model: DataModel,
    exists: bool,
    value: Bytes,
    index: u32,
    key: Bytes,
}

impl ValueBuilder {
    pub fn value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = value.into();
        self
    }

    pub fn exists(mut self, exists: bool) -> Self {
        self.exists = exists;
        self
    }

    /// Array position; ignored by other models.
    pub fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        if append {
            self.index = LAST_INDEX;
        }
        self
    }

    /// Dictionary key; ignored by other models.
    pub fn key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = key.into();
        self
    }

    pub fn build(self) -> DataValue {
        let value = SingleValue {
            exists: self.exists,
            value: self.value,
        };
        match self.model {
            DataModel::Single => DataValue::Single(value),
            DataModel::Array => DataValue::Array {
                index: self.index,
                value,
            },
            DataModel::Dictionary => DataValue::Dictionary {
                key: self.key,
                value,
            },
        }
    }
}

/// Hash and size of a value, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleMetadata {
    pub exists: bool,
    pub value_length: u32,
    pub hash_algorithm: HashAlgorithm,
    pub hash: Bytes,
}

impl SingleMetadata {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u8(u8::from(self.exists));
        out.put_u32(self.value_length);
        out.put_u8(self.hash_algorithm.code());
        write_opaque(out, LengthWidth::U8, &self.hash)
    }

    fn decode(input: &mut Bytes) -> Result<Self, CodecError> {
        let exists = input.read_bool()?;
        let value_length = input.read_u32()?;
        let hash_algorithm = HashAlgorithm::from_code(input.read_u8()?)?;
        let hash = read_opaque(input, LengthWidth::U8)?;
        Ok(Self {
            exists,
            value_length,
            hash_algorithm,
            hash,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    Single(SingleMetadata),
    Array { index: u32, metadata: SingleMetadata },
    Dictionary { key: Bytes, metadata: SingleMetadata },
}

impl Metadata {
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Self::Single(meta) => meta.encode(out),
            Self::Array { index, metadata } => {
                out.put_u32(*index);
                metadata.encode(out)
            }
            Self::Dictionary { key, metadata } => {
                write_opaque(out, LengthWidth::U16, key)?;
                metadata.encode(out)
            }
        }
    }

    pub fn decode_for(input: &mut Bytes, model: DataModel) -> Result<Self, CodecError> {
        Ok(match model {
            DataModel::Single => Self::Single(SingleMetadata::decode(input)?),
            DataModel::Array => {
                let index = input.read_u32()?;
                Self::Array {
                    index,
                    metadata: SingleMetadata::decode(input)?,
                }
            }
            DataModel::Dictionary => {
                let key = read_opaque(input, LengthWidth::U16)?;
                Self::Dictionary {
                    key,
                    metadata: SingleMetadata::decode(input)?,
                }
            }
        })
    }
}

/// Inclusive index range of an array specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayRange {
    pub first: u32,
    pub last: u32,
}

impl ArrayRange {
    pub fn contains(&self, index: u32) -> bool {
        self.first <= index && index <= self.last
    }
}

/// Model-specific selection of stored values for fetch and stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSpecifier {
    Single,
    /// Empty means every index.
    Array(Vec<ArrayRange>),
    /// Empty means every key.
    Dictionary(Vec<Bytes>),
}

impl ModelSpecifier {
    pub fn model(&self) -> DataModel {
        match self {
            Self::Single => DataModel::Single,
            Self::Array(_) => DataModel::Array,
            Self::Dictionary(_) => DataModel::Dictionary,
        }
    }

    pub fn matches(&self, value: &DataValue) -> bool {
        match (self, value) {
            (Self::Single, DataValue::Single(_)) => true,
            (Self::Array(ranges), DataValue::Array { index, value }) => {
                value.exists && (ranges.is_empty() || ranges.iter().any(|r| r.contains(*index)))
            }
            (Self::Dictionary(keys), DataValue::Dictionary { key, .. }) => {
                keys.is_empty() || keys.contains(key)
            }
            _ => false,
        }
    }

    pub fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Self::Single => Ok(()),
            Self::Array(ranges) => write_list(out, LengthWidth::U16, ranges, |range, out| {
                out.put_u32(range.first);
                out.put_u32(range.last);
                Ok(())
            }),
            Self::Dictionary(keys) => write_list(out, LengthWidth::U16, keys, |key, out| {
                write_opaque(out, LengthWidth::U16, key)
            }),
        }
    }

    pub fn decode_for(input: &mut Bytes, model: DataModel) -> Result<Self, CodecError> {
        Ok(match model {
            DataModel::Single => Self::Single,
            DataModel::Array => Self::Array(read_list(input, LengthWidth::U16, |r| {
                Ok(ArrayRange {
                    first: r.read_u32()?,
                    last: r.read_u32()?,
                })
            })?),
            DataModel::Dictionary => Self::Dictionary(read_list(input, LengthWidth::U16, |r| {
                read_opaque(r, LengthWidth::U16)
            })?),
        })
    }
}
