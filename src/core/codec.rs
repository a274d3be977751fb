//! Hex and binary encoding helpers
//!
//! Header fields travel as hex on the wire and in `getblocktemplate`, while the
//! header itself wants little-endian integers and byte-reversed hashes.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use sha2::{Digest, Sha256};

/// Decode a hex string to bytes. Length is not checked here.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    hex::decode(hex_str)
        .map_err(|e| Error::invalid_encoding(format!("Invalid hex string {:?}: {}", hex_str, e)))
}

/// Encode bytes as a lowercase hex string
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Reverse a byte buffer in place
pub fn reverse(buffer: &mut [u8]) {
    buffer.reverse();
}

/// Return a reversed copy of `bytes`
pub fn reversed(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    reverse(&mut out);
    out
}

/// Decode, byte-reverse and re-encode a hex string
pub fn reverse_hex(hex_str: &str) -> Result<String> {
    let mut bytes = hex_to_bytes(hex_str)?;
    reverse(&mut bytes);
    Ok(bytes_to_hex(&bytes))
}

/// Pack a u16 as 2 little-endian bytes
pub fn pack_le16(value: u16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    LittleEndian::write_u16(&mut buf, value);
    buf
}

/// Pack a u32 as 4 little-endian bytes
pub fn pack_le32(value: u32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    buf
}

/// Pack a u64 as 8 little-endian bytes
pub fn pack_le64(value: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, value);
    buf
}

/// Pack a u16 as 2 big-endian bytes
pub fn pack_be16(value: u16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, value);
    buf
}

/// Pack a u32 as 4 big-endian bytes
pub fn pack_be32(value: u32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, value);
    buf
}

/// Pack a u64 as 8 big-endian bytes
pub fn pack_be64(value: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, value);
    buf
}

/// SHA-256 applied twice
pub fn double_hash(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Bitcoin-style variable length integer, used when serializing a block's
/// transaction count
pub fn compact_size(value: u64) -> Vec<u8> {
    match value {
        0..=0xfc => vec![value as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&pack_le16(value as u16));
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&pack_le32(value as u32));
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&pack_le64(value));
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_decode_invalid() {
        assert!(matches!(
            hex_to_bytes("xyz"),
            Err(Error::InvalidEncoding { .. })
        ));
        assert!(hex_to_bytes("abc").is_err()); // Odd length
    }

    #[test]
    fn test_hex_case_insensitive() {
        assert_eq!(hex_to_bytes("abcdef").unwrap(), hex_to_bytes("ABCDEF").unwrap());
        assert_eq!(bytes_to_hex(&[0xAB, 0xCD, 0xEF]), "abcdef");
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(bytes_to_hex(&[]), "");
        assert!(hex_to_bytes("").unwrap().is_empty());
    }

    #[test]
    fn test_reverse() {
        let mut buf = [1u8, 2, 3, 4];
        reverse(&mut buf);
        assert_eq!(buf, [4, 3, 2, 1]);
        assert_eq!(reverse_hex("1f07ffff").unwrap(), "ffff071f");
    }

    #[test]
    fn test_packing() {
        assert_eq!(pack_le16(0x0102), [0x02, 0x01]);
        assert_eq!(pack_be16(0x0102), [0x01, 0x02]);
        assert_eq!(pack_le32(4), [4, 0, 0, 0]);
        assert_eq!(pack_be32(4), [0, 0, 0, 4]);
        assert_eq!(pack_le64(1), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(pack_be64(1), [0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_double_hash_known_vector() {
        // sha256d("") is a well known constant
        assert_eq!(
            bytes_to_hex(&double_hash(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_compact_size() {
        assert_eq!(compact_size(1), vec![0x01]);
        assert_eq!(compact_size(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_size(0x1_0000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
    }
}
