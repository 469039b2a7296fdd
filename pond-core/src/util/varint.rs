use std::io::{self, Read, Write};

use crate::error::{PondError, Result};

/// Longest LEB128 encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Writes `x` as LEB128 and returns the encoded length.
pub fn write_uvarint<W: Write>(w: &mut W, mut x: u64) -> io::Result<usize> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut n = 0;
    loop {
        let low = (x & 0x7f) as u8;
        x >>= 7;
        if x == 0 {
            buf[n] = low;
            n += 1;
            break;
        }
        buf[n] = low | 0x80;
        n += 1;
    }
    w.write_all(&buf[..n])?;
    Ok(n)
}

/// `Ok(None)` on a clean EOF before the first byte. A prefix cut short is an
/// `UnexpectedEof` io error; one that never terminates is `Format`.
pub fn read_uvarint<R: Read>(r: &mut R) -> Result<Option<u64>> {
    let mut x = 0u64;
    let mut seen = 0usize;
    for byte in r.bytes().take(MAX_VARINT_LEN) {
        let byte = byte?;
        x |= u64::from(byte & 0x7f) << (7 * seen);
        seen += 1;
        if byte & 0x80 == 0 {
            return Ok(Some(x));
        }
    }
    match seen {
        0 => Ok(None),
        MAX_VARINT_LEN => Err(PondError::Format("varint longer than ten bytes".into())),
        _ => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated varint").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_values() {
        let mut out = Vec::new();
        assert_eq!(write_uvarint(&mut out, 1).unwrap(), 1);
        assert_eq!(write_uvarint(&mut out, 300).unwrap(), 2);
        assert_eq!(out, vec![0x01, 0xac, 0x02]);

        let mut r = out.as_slice();
        assert_eq!(read_uvarint(&mut r).unwrap(), Some(1));
        assert_eq!(read_uvarint(&mut r).unwrap(), Some(300));
        assert_eq!(read_uvarint(&mut r).unwrap(), None);
    }

    #[test]
    fn largest_value_fits_in_ten_bytes() {
        let mut out = Vec::new();
        assert_eq!(write_uvarint(&mut out, u64::MAX).unwrap(), MAX_VARINT_LEN);
        assert_eq!(read_uvarint(&mut out.as_slice()).unwrap(), Some(u64::MAX));
    }

    #[test]
    fn truncated_input_is_an_eof_error() {
        let mut r: &[u8] = &[0x80];
        match read_uvarint(&mut r) {
            Err(PondError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn endless_continuation_is_a_format_error() {
        let mut r: &[u8] = &[0xff; 12];
        assert!(matches!(read_uvarint(&mut r), Err(PondError::Format(_))));
    }
}
