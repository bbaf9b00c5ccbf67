use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use uuid::Uuid;

/// Upper bound for any string we are willing to write (32767 UTF-16 units,
/// each up to 4 bytes of UTF-8).
pub const MAX_STRING_BYTES: usize = 32767 * 4;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("VarInt too big")]
    VarIntTooBig,
    #[error("Not enough data")]
    NotEnoughData,
    #[error("String too long: {0} > {1}")]
    StringTooLong(usize, usize),
    #[error("Negative length: {0}")]
    NegativeLength(i32),
    #[error("Invalid UTF-8 in string")]
    InvalidUtf8,
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),
    #[error("Compressed frame declares {declared} bytes: {reason}")]
    BadCompressedFrame {
        declared: usize,
        reason: &'static str,
    },
    #[error("Payload too long: {0} > {1}")]
    PayloadTooLong(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Read a VarInt from the buffer.
pub fn read_varint(buf: &mut BytesMut) -> CodecResult<i32> {
    let mut result: i32 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::NotEnoughData);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarInt to the buffer.
pub fn write_varint(buf: &mut BytesMut, mut value: i32) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u32) >> 7) as i32;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Calculate the byte length of a VarInt.
pub fn varint_len(value: i32) -> usize {
    let mut val = value as u32;
    let mut len = 0;
    loop {
        len += 1;
        val >>= 7;
        if val == 0 {
            break;
        }
    }
    len
}

fn read_length(buf: &mut BytesMut) -> CodecResult<usize> {
    let len = read_varint(buf)?;
    if len < 0 {
        return Err(CodecError::NegativeLength(len));
    }
    Ok(len as usize)
}

/// Read a protocol string (varint-prefixed UTF-8) of at most `max_bytes`
/// encoded bytes. The bound is checked before anything is copied out.
pub fn read_string(buf: &mut BytesMut, max_bytes: usize) -> CodecResult<String> {
    read_string_counted(buf, max_bytes).map(|(s, _)| s)
}

/// Like [`read_string`], but also returns how many bytes were consumed,
/// length prefix included.
pub fn read_string_counted(buf: &mut BytesMut, max_bytes: usize) -> CodecResult<(String, usize)> {
    let before = buf.remaining();
    let len = read_length(buf)?;
    if len > max_bytes {
        return Err(CodecError::StringTooLong(len, max_bytes));
    }
    if buf.remaining() < len {
        return Err(CodecError::NotEnoughData);
    }
    let bytes = buf.split_to(len);
    let s = String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)?;
    Ok((s, before - buf.remaining()))
}

/// Write a protocol string.
pub fn write_string(buf: &mut BytesMut, s: &str) -> CodecResult<()> {
    if s.len() > MAX_STRING_BYTES {
        return Err(CodecError::StringTooLong(s.len(), MAX_STRING_BYTES));
    }
    write_varint(buf, s.len() as i32);
    buf.put_slice(s.as_bytes());
    Ok(())
}

/// Read exactly `len` raw bytes.
pub fn read_byte_array(buf: &mut BytesMut, len: usize) -> CodecResult<Vec<u8>> {
    if buf.remaining() < len {
        return Err(CodecError::NotEnoughData);
    }
    Ok(buf.split_to(len).to_vec())
}

/// Write raw bytes with no length prefix.
pub fn write_byte_array(buf: &mut BytesMut, data: &[u8]) {
    buf.put_slice(data);
}

/// Read a UUID (128 bits, big endian).
pub fn read_uuid(buf: &mut BytesMut) -> CodecResult<Uuid> {
    if buf.remaining() < 16 {
        return Err(CodecError::NotEnoughData);
    }
    let mut bytes = [0u8; 16];
    buf.copy_to_slice(&mut bytes);
    Ok(Uuid::from_bytes(bytes))
}

/// Write a UUID.
pub fn write_uuid(buf: &mut BytesMut, uuid: &Uuid) {
    buf.put_slice(uuid.as_bytes());
}

pub fn read_bool(buf: &mut BytesMut) -> CodecResult<bool> {
    Ok(read_u8(buf)? != 0)
}

pub fn write_bool(buf: &mut BytesMut, value: bool) {
    buf.put_u8(value as u8);
}

// Checked big-endian fixed-width reads. `Buf::get_*` panics on short input,
// so every read goes through a length check first.
macro_rules! fixed_readers {
    ($($name:ident => $ty:ty, $get:ident;)*) => {
        $(
            pub fn $name(buf: &mut BytesMut) -> CodecResult<$ty> {
                if buf.remaining() < std::mem::size_of::<$ty>() {
                    return Err(CodecError::NotEnoughData);
                }
                Ok(buf.$get())
            }
        )*
    };
}

fixed_readers! {
    read_u8 => u8, get_u8;
    read_i8 => i8, get_i8;
    read_u16 => u16, get_u16;
    read_i16 => i16, get_i16;
    read_u32 => u32, get_u32;
    read_i32 => i32, get_i32;
    read_u64 => u64, get_u64;
    read_i64 => i64, get_i64;
    read_f32 => f32, get_f32;
    read_f64 => f64, get_f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let test_cases = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (255, vec![0xFF, 0x01]),
            (25565, vec![0xDD, 0xC7, 0x01]),
            (2097151, vec![0xFF, 0xFF, 0x7F]),
            (i32::MAX, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
            (-1, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];

        for (value, expected_bytes) in test_cases {
            let mut buf = BytesMut::new();
            write_varint(&mut buf, value);
            assert_eq!(
                buf.to_vec(),
                expected_bytes,
                "write_varint({}) failed",
                value
            );

            let mut buf = BytesMut::from(&expected_bytes[..]);
            let result = read_varint(&mut buf).unwrap();
            assert_eq!(result, value, "read_varint for {} failed", value);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_varint_rejects_six_bytes() {
        let mut buf = BytesMut::from(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01][..]);
        assert!(matches!(read_varint(&mut buf), Err(CodecError::VarIntTooBig)));
    }

    #[test]
    fn test_varint_truncated() {
        let mut buf = BytesMut::from(&[0x80, 0x80][..]);
        assert!(matches!(read_varint(&mut buf), Err(CodecError::NotEnoughData)));
    }

    #[test]
    fn test_varint_len() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(25565), 3);
        assert_eq!(varint_len(-1), 5);
    }

    #[test]
    fn test_string_roundtrip() {
        let test_str = "Hello, Minecraft!";
        let mut buf = BytesMut::new();
        write_string(&mut buf, test_str).unwrap();
        let result = read_string(&mut buf, 32767).unwrap();
        assert_eq!(result, test_str);
    }

    #[test]
    fn test_string_at_limit() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "abcdefghijklmnop").unwrap();
        assert_eq!(read_string(&mut buf, 16).unwrap(), "abcdefghijklmnop");
    }

    #[test]
    fn test_string_over_limit() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "abcdefghijklmnopq").unwrap();
        assert!(matches!(
            read_string(&mut buf, 16),
            Err(CodecError::StringTooLong(17, 16))
        ));
    }

    #[test]
    fn test_string_limit_checked_before_payload() {
        // Claims 1000 bytes but carries none: must fail on the bound, not on
        // missing data.
        let mut buf = BytesMut::new();
        write_varint(&mut buf, 1000);
        assert!(matches!(
            read_string(&mut buf, 20),
            Err(CodecError::StringTooLong(1000, 20))
        ));
    }

    #[test]
    fn test_string_limit_counts_bytes() {
        // Four characters, eight bytes.
        let mut buf = BytesMut::new();
        write_string(&mut buf, "éééé").unwrap();
        assert!(read_string(&mut buf.clone(), 7).is_err());
        assert_eq!(read_string(&mut buf, 8).unwrap(), "éééé");
    }

    #[test]
    fn test_string_counted() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "minecraft:brand").unwrap();
        buf.put_slice(b"rest");
        let (s, read) = read_string_counted(&mut buf, 20).unwrap();
        assert_eq!(s, "minecraft:brand");
        assert_eq!(read, 16);
        assert_eq!(&buf[..], b"rest");
    }

    #[test]
    fn test_negative_string_length() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, -1);
        assert!(matches!(
            read_string(&mut buf, 16),
            Err(CodecError::NegativeLength(-1))
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = BytesMut::from(&[0x02, 0xC3, 0x28][..]);
        assert!(matches!(read_string(&mut buf, 16), Err(CodecError::InvalidUtf8)));
    }

    #[test]
    fn test_uuid_roundtrip() {
        let uuid = Uuid::new_v4();
        let mut buf = BytesMut::new();
        write_uuid(&mut buf, &uuid);
        assert_eq!(buf.len(), 16);
        let result = read_uuid(&mut buf).unwrap();
        assert_eq!(result, uuid);
    }

    #[test]
    fn test_fixed_width_big_endian() {
        let mut buf = BytesMut::from(&[0x63, 0xDD, 0x00, 0x00, 0x00, 0x2A][..]);
        assert_eq!(read_u16(&mut buf).unwrap(), 25565);
        assert_eq!(read_i32(&mut buf).unwrap(), 42);
        assert!(matches!(read_u8(&mut buf), Err(CodecError::NotEnoughData)));
    }

    #[test]
    fn test_short_fixed_read_does_not_consume() {
        let mut buf = BytesMut::from(&[0x01, 0x02, 0x03][..]);
        assert!(read_u64(&mut buf).is_err());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_bool() {
        let mut buf = BytesMut::from(&[0x00, 0x01, 0x05][..]);
        assert!(!read_bool(&mut buf).unwrap());
        assert!(read_bool(&mut buf).unwrap());
        assert!(read_bool(&mut buf).unwrap());
        write_bool(&mut buf, true);
        assert_eq!(&buf[..], &[0x01]);
    }

    #[test]
    fn test_byte_array() {
        let mut buf = BytesMut::from(&b"vanilla"[..]);
        assert!(read_byte_array(&mut buf.clone(), 8).is_err());
        assert_eq!(read_byte_array(&mut buf, 7).unwrap(), b"vanilla");
        write_byte_array(&mut buf, b"xy");
        assert_eq!(&buf[..], b"xy");
    }
}
