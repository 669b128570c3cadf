//! Length-prefixed framing shared by every wire structure.
//!
//! Encoders reserve a length prefix, write the body, then patch the prefix
//! with the body's byte count. Decoders split the declared region off the
//! input before parsing it, so a sub-decoder can never read past its field
//! and any bytes it leaves unread are skipped along with the region.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::storage::KindRegistry;

/// Width of a length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthWidth {
    U8,
    U16,
    U32,
    U64,
}

impl LengthWidth {
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    /// Largest body length the prefix can describe.
    pub const fn max(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
            Self::U64 => u64::MAX,
        }
    }
}

/// A reserved length prefix waiting for the size of the body written after it.
#[must_use = "a reserved length field must be patched"]
#[derive(Debug)]
pub struct LengthField {
    start: usize,
    width: LengthWidth,
}

impl LengthField {
    pub fn reserve(out: &mut BytesMut, width: LengthWidth) -> Self {
        let start = out.len();
        out.put_bytes(0, width.bytes());
        Self { start, width }
    }

    /// Writes the number of bytes appended since `reserve` into the prefix.
    pub fn patch(self, out: &mut BytesMut) -> Result<usize, CodecError> {
        let body_start = self.start + self.width.bytes();
        let len = out.len().saturating_sub(body_start);
        if len as u64 > self.width.max() {
            return Err(CodecError::FieldTooLarge {
                len,
                max: self.width.max(),
            });
        }
        let slot = &mut out[self.start..body_start];
        match self.width {
            LengthWidth::U8 => slot[0] = len as u8,
            LengthWidth::U16 => slot.copy_from_slice(&(len as u16).to_be_bytes()),
            LengthWidth::U32 => slot.copy_from_slice(&(len as u32).to_be_bytes()),
            LengthWidth::U64 => slot.copy_from_slice(&(len as u64).to_be_bytes()),
        }
        Ok(len)
    }
}

/// Immutable decode parameters fixed by the overlay.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub node_id_length: usize,
    pub resource_id_length: usize,
    pub kinds: &'a KindRegistry,
}

impl<'a> DecodeContext<'a> {
    /// Context whose resource ids share the node id width.
    pub fn new(node_id_length: usize, kinds: &'a KindRegistry) -> Self {
        Self {
            node_id_length,
            resource_id_length: node_id_length,
            kinds,
        }
    }

    pub fn with_resource_id_length(mut self, resource_id_length: usize) -> Self {
        self.resource_id_length = resource_id_length;
        self
    }
}

pub trait WireEncode {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError>;

    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut out = BytesMut::new();
        self.encode(&mut out)?;
        Ok(out.freeze())
    }
}

/// Types whose wire shape needs nothing beyond the overlay parameters.
///
/// Types that depend on an already-decoded discriminator expose an inherent
/// `decode_for` taking that discriminator instead.
pub trait WireDecode: Sized {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError>;
}

/// Bounds-checked big-endian reads.
pub trait WireRead {
    fn read_u8(&mut self) -> Result<u8, CodecError>;
    fn read_u16(&mut self) -> Result<u16, CodecError>;
    fn read_u32(&mut self) -> Result<u32, CodecError>;
    fn read_u64(&mut self) -> Result<u64, CodecError>;
    fn read_bytes(&mut self, len: usize) -> Result<Bytes, CodecError>;
    fn read_bool(&mut self) -> Result<bool, CodecError>;
}

fn ensure(input: &Bytes, needed: usize) -> Result<(), CodecError> {
    if input.remaining() < needed {
        return Err(CodecError::Truncated {
            needed,
            available: input.remaining(),
        });
    }
    Ok(())
}

impl WireRead for Bytes {
    fn read_u8(&mut self) -> Result<u8, CodecError> {
        ensure(self, 1)?;
        Ok(self.get_u8())
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        ensure(self, 2)?;
        Ok(self.get_u16())
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        ensure(self, 4)?;
        Ok(self.get_u32())
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        ensure(self, 8)?;
        Ok(self.get_u64())
    }

    fn read_bytes(&mut self, len: usize) -> Result<Bytes, CodecError> {
        ensure(self, len)?;
        Ok(self.split_to(len))
    }

    fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::Invalid("boolean value")),
        }
    }
}

/// Splits the region announced by a `width` length prefix off `input`.
///
/// The region is removed from `input` whether or not the caller parses all
/// of it; dropping the returned view releases it on every path.
pub fn read_field(input: &mut Bytes, width: LengthWidth) -> Result<Bytes, CodecError> {
    let declared = match width {
        LengthWidth::U8 => u64::from(input.read_u8()?),
        LengthWidth::U16 => u64::from(input.read_u16()?),
        LengthWidth::U32 => u64::from(input.read_u32()?),
        LengthWidth::U64 => input.read_u64()?,
    };
    if declared > input.remaining() as u64 {
        return Err(CodecError::LengthOverflow {
            declared,
            available: input.remaining(),
        });
    }
    Ok(input.split_to(declared as usize))
}

/// Writes `body` behind a patched `width` length prefix.
pub fn write_field<F>(out: &mut BytesMut, width: LengthWidth, body: F) -> Result<(), CodecError>
where
    F: FnOnce(&mut BytesMut) -> Result<(), CodecError>,
{
    let field = LengthField::reserve(out, width);
    body(out)?;
    field.patch(out)?;
    Ok(())
}

pub fn write_opaque(
    out: &mut BytesMut,
    width: LengthWidth,
    bytes: &[u8],
) -> Result<(), CodecError> {
    write_field(out, width, |out| {
        out.put_slice(bytes);
        Ok(())
    })
}

pub fn read_opaque(input: &mut Bytes, width: LengthWidth) -> Result<Bytes, CodecError> {
    read_field(input, width)
}

/// Writes `items` back to back inside one length-prefixed region.
pub fn write_list<T, F>(
    out: &mut BytesMut,
    width: LengthWidth,
    items: &[T],
    mut item: F,
) -> Result<(), CodecError>
where
    F: FnMut(&T, &mut BytesMut) -> Result<(), CodecError>,
{
    write_field(out, width, |out| {
        for value in items {
            item(value, out)?;
        }
        Ok(())
    })
}

/// Decodes items until the length-prefixed region is exhausted.
pub fn read_list<T, F>(
    input: &mut Bytes,
    width: LengthWidth,
    mut item: F,
) -> Result<Vec<T>, CodecError>
where
    F: FnMut(&mut Bytes) -> Result<T, CodecError>,
{
    let mut region = read_field(input, width)?;
    let mut items = Vec::new();
    while region.has_remaining() {
        items.push(item(&mut region)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patched_prefix_counts_body_bytes() {
        let mut out = BytesMut::new();
        out.put_u8(0xaa);
        write_field(&mut out, LengthWidth::U16, |out| {
            out.put_slice(&[1, 2, 3]);
            write_opaque(out, LengthWidth::U8, &[9, 9])
        })
        .unwrap();
        assert_eq!(&out[..], &[0xaa, 0x00, 0x06, 1, 2, 3, 0x02, 9, 9]);
    }

    #[test]
    fn oversized_body_is_rejected_on_patch() {
        let mut out = BytesMut::new();
        let err = write_opaque(&mut out, LengthWidth::U8, &[0_u8; 256]).expect_err("too large");
        assert_eq!(err, CodecError::FieldTooLarge { len: 256, max: 255 });
    }

    #[test]
    fn declared_length_beyond_input_is_rejected() {
        let mut input = Bytes::from_static(&[0x00, 0x05, 1, 2]);
        let err = read_field(&mut input, LengthWidth::U16).expect_err("overflow");
        assert_eq!(
            err,
            CodecError::LengthOverflow {
                declared: 5,
                available: 2
            }
        );
    }

    #[test]
    fn unread_bytes_in_a_region_are_skipped() {
        let mut input = Bytes::from_static(&[0x03, 0x01, 0xee, 0xee, 0x7f]);
        let mut region = read_field(&mut input, LengthWidth::U8).unwrap();
        assert_eq!(region.read_u8().unwrap(), 0x01);
        drop(region);
        assert_eq!(input.read_u8().unwrap(), 0x7f);
    }

    #[test]
    fn subreads_cannot_cross_the_region_boundary() {
        let mut input = Bytes::from_static(&[0x01, 0x00, 0x00, 0x00, 0x00]);
        let mut region = read_field(&mut input, LengthWidth::U8).unwrap();
        let err = region.read_u32().expect_err("region holds one byte");
        assert_eq!(
            err,
            CodecError::Truncated {
                needed: 4,
                available: 1
            }
        );
        assert_eq!(input.len(), 4);
    }

    #[test]
    fn list_reads_until_region_end() {
        let mut input = Bytes::from_static(&[0x00, 0x04, 0, 1, 0, 2, 0xff]);
        let items = read_list(&mut input, LengthWidth::U16, |r| r.read_u16()).unwrap();
        assert_eq!(items, vec![1, 2]);
        assert_eq!(input.len(), 1);
    }

    #[test]
    fn booleans_outside_zero_and_one_fail() {
        let mut input = Bytes::from_static(&[2]);
        assert_eq!(
            input.read_bool().expect_err("bad bool"),
            CodecError::Invalid("boolean value")
        );
    }
}
