//! Primitive XDR codecs (RFC 4506 subset).
//!
//! Every encoder takes an `Option<&mut BytesMut>` destination: `None` is a
//! dry run that still reports the exact byte count that would have been
//! written, used by the aggregate codec for two-pass buffer sizing.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::WireError;

/// XDR values are 4-byte aligned; this is the alignment unit.
pub const XDR_UNIT: usize = 4;

/// Number of zero pad bytes needed to bring `len` up to a 4-byte boundary.
pub fn pad_len(len: usize) -> usize {
    (XDR_UNIT - len % XDR_UNIT) % XDR_UNIT
}

/// Whether floats/doubles are written raw-native (bug-compatible with
/// existing producers) or as portable big-endian IEEE-754.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatEndian {
    /// Byte-for-byte little-endian copy. Matches the platform quirk the
    /// original producers rely on; not portable XDR.
    #[default]
    BugCompatibleLittle,
    /// Portable IEEE-754 big-endian.
    PortableBig,
}

fn check_remaining(src: &Bytes, expected: usize) -> Result<(), WireError> {
    if src.remaining() < expected {
        return Err(WireError::Truncated { expected, actual: src.remaining() });
    }
    Ok(())
}

pub fn encode_u32(value: u32, dst: Option<&mut BytesMut>) -> usize {
    if let Some(buf) = dst {
        buf.put_u32(value);
    }
    4
}

pub fn decode_u32(src: &mut Bytes) -> Result<u32, WireError> {
    check_remaining(src, 4)?;
    Ok(src.get_u32())
}

pub fn encode_i32(value: i32, dst: Option<&mut BytesMut>) -> usize {
    encode_u32(value as u32, dst)
}

pub fn decode_i32(src: &mut Bytes) -> Result<i32, WireError> {
    Ok(decode_u32(src)? as i32)
}

/// 64-bit values are split into two network-order 32-bit halves: (high, low).
pub fn encode_u64(value: u64, dst: Option<&mut BytesMut>) -> usize {
    let hi = (value >> 32) as u32;
    let lo = value as u32;
    match dst {
        Some(buf) => {
            buf.put_u32(hi);
            buf.put_u32(lo);
        }
        None => {}
    }
    8
}

pub fn decode_u64(src: &mut Bytes) -> Result<u64, WireError> {
    let hi = decode_u32(src)? as u64;
    let lo = decode_u32(src)? as u64;
    Ok((hi << 32) | lo)
}

pub fn encode_i64(value: i64, dst: Option<&mut BytesMut>) -> usize {
    encode_u64(value as u64, dst)
}

pub fn decode_i64(src: &mut Bytes) -> Result<i64, WireError> {
    Ok(decode_u64(src)? as i64)
}

pub fn encode_f32(value: f32, endian: FloatEndian, dst: Option<&mut BytesMut>) -> usize {
    let bytes = match endian {
        FloatEndian::BugCompatibleLittle => value.to_le_bytes(),
        FloatEndian::PortableBig => value.to_be_bytes(),
    };
    if let Some(buf) = dst {
        buf.extend_from_slice(&bytes);
    }
    4
}

pub fn decode_f32(src: &mut Bytes, endian: FloatEndian) -> Result<f32, WireError> {
    check_remaining(src, 4)?;
    let mut bytes = [0u8; 4];
    src.copy_to_slice(&mut bytes);
    Ok(match endian {
        FloatEndian::BugCompatibleLittle => f32::from_le_bytes(bytes),
        FloatEndian::PortableBig => f32::from_be_bytes(bytes),
    })
}

pub fn encode_f64(value: f64, endian: FloatEndian, dst: Option<&mut BytesMut>) -> usize {
    let bytes = match endian {
        FloatEndian::BugCompatibleLittle => value.to_le_bytes(),
        FloatEndian::PortableBig => value.to_be_bytes(),
    };
    if let Some(buf) = dst {
        buf.extend_from_slice(&bytes);
    }
    8
}

pub fn decode_f64(src: &mut Bytes, endian: FloatEndian) -> Result<f64, WireError> {
    check_remaining(src, 8)?;
    let mut bytes = [0u8; 8];
    src.copy_to_slice(&mut bytes);
    Ok(match endian {
        FloatEndian::BugCompatibleLittle => f64::from_le_bytes(bytes),
        FloatEndian::PortableBig => f64::from_be_bytes(bytes),
    })
}

/// Self-delimiting counted byte blob: 4-byte big-endian count, raw bytes,
/// zero pad to a 4-byte boundary. Counted strings share this exact wire
/// shape (see the `registry` crate's `FieldKind::Bytes { as_str }`).
pub fn encode_bytes(data: &[u8], dst: Option<&mut BytesMut>) -> usize {
    let pad = pad_len(data.len());
    if let Some(buf) = dst {
        buf.put_u32(data.len() as u32);
        buf.extend_from_slice(data);
        buf.put_bytes(0, pad);
    }
    4 + data.len() + pad
}

pub fn decode_bytes(src: &mut Bytes) -> Result<Vec<u8>, WireError> {
    let len = decode_u32(src)? as usize;
    check_remaining(src, len)?;
    let data = src.copy_to_bytes(len).to_vec();
    let pad = pad_len(len);
    check_remaining(src, pad)?;
    src.advance(pad);
    Ok(data)
}

fn bit_mask(width: u32) -> Result<u32, WireError> {
    if width == 0 || width > 32 {
        return Err(WireError::BitWidthOverflow { width });
    }
    Ok(if width == 32 { u32::MAX } else { (1u32 << width) - 1 })
}

/// Packs `value`'s low `width` bits into `word` at bit offset `shift`.
pub fn encode_bitfield(word: &mut u32, value: i64, shift: u32, width: u32) -> Result<(), WireError> {
    let mask = bit_mask(width)?;
    *word |= ((value as u32) & mask) << shift;
    Ok(())
}

pub fn decode_bitfield_unsigned(word: u32, shift: u32, width: u32) -> Result<u32, WireError> {
    let mask = bit_mask(width)?;
    Ok((word >> shift) & mask)
}

/// Like [`decode_bitfield_unsigned`], but re-creates the sign bit from the
/// top bit of `width` and sign-extends into a full `i32`.
pub fn decode_bitfield_signed(word: u32, shift: u32, width: u32) -> Result<i32, WireError> {
    let raw = decode_bitfield_unsigned(word, shift, width)?;
    let sign_bit = 1u32 << (width - 1);
    Ok(if raw & sign_bit != 0 { (raw as i32) - (1i32 << width) } else { raw as i32 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_uint32_round_trip() {
        let mut buf = BytesMut::new();
        let used = encode_u32(0xDEAD_BEEF, Some(&mut buf));
        assert_eq!(used, 4);
        assert_eq!(&buf[..], &[0xDE, 0xAD, 0xBE, 0xEF]);
        let mut src = buf.freeze();
        assert_eq!(decode_u32(&mut src).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn s2_byte_array_padding() {
        let data = [0x01u8, 0x02, 0x03, 0x04, 0x05];
        let mut buf = BytesMut::new();
        let used = encode_bytes(&data, Some(&mut buf));
        assert_eq!(used, 12);
        assert_eq!(
            &buf[..],
            &[0x00, 0x00, 0x00, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05, 0x00, 0x00, 0x00]
        );
        let mut src = buf.freeze();
        assert_eq!(decode_bytes(&mut src).unwrap(), data.to_vec());
    }

    #[test]
    fn s3_int64_negative() {
        let mut buf = BytesMut::new();
        encode_i64(-2, Some(&mut buf));
        assert_eq!(&buf[..], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);
        let mut src = buf.freeze();
        assert_eq!(decode_i64(&mut src).unwrap(), -2);
    }

    #[test]
    fn s4_bitpacked_word() {
        let mut word = 0u32;
        encode_bitfield(&mut word, 0xA, 0, 4).unwrap();
        encode_bitfield(&mut word, 0x3, 4, 4).unwrap();
        assert_eq!(word, 0x3A);
        let mut buf = BytesMut::new();
        encode_u32(word, Some(&mut buf));
        assert_eq!(&buf[..], &[0x00, 0x00, 0x00, 0x3A]);
        assert_eq!(decode_bitfield_unsigned(word, 0, 4).unwrap(), 0xA);
        assert_eq!(decode_bitfield_unsigned(word, 4, 4).unwrap(), 0x3);
    }

    #[test]
    fn bitfield_sign_extension() {
        // width=4, top bit set -> negative.
        let word = 0b1000u32;
        assert_eq!(decode_bitfield_signed(word, 0, 4).unwrap(), -8);
        let word = 0b0111u32;
        assert_eq!(decode_bitfield_signed(word, 0, 4).unwrap(), 7);
    }

    #[test]
    fn dry_run_matches_written_len() {
        let data = [1u8, 2, 3];
        let dry = encode_bytes(&data, None);
        let mut buf = BytesMut::new();
        let written = encode_bytes(&data, Some(&mut buf));
        assert_eq!(dry, written);
        assert_eq!(buf.len(), written);
    }

    #[test]
    fn truncated_u32_decode_fails() {
        let mut src = Bytes::from_static(&[0x00, 0x01]);
        assert!(matches!(decode_u32(&mut src), Err(WireError::Truncated { .. })));
    }
}
