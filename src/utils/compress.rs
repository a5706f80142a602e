// utils/compress.rs - Gzip helpers for cache payloads and WebSocket frames

use crate::types::AppError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

pub fn gzip_compress(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(data)
        .map_err(|e| AppError::CacheError(format!("gzip write failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| AppError::CacheError(format!("gzip finish failed: {e}")))
}

pub fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| AppError::ParseError(format!("gzip decode failed: {e}")))?;
    Ok(out)
}

/// Decompress straight to UTF-8 text (WebSocket frame path).
pub fn gzip_decompress_text(data: &[u8]) -> Result<String, AppError> {
    let bytes = gzip_decompress(data)?;
    String::from_utf8(bytes).map_err(|e| AppError::ParseError(format!("invalid utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_round_trip() {
        let payload = br#"{"data":[1,2,3],"lastUpdated":1700000000000}"#;
        let packed = gzip_compress(payload).unwrap();
        assert_ne!(packed.as_slice(), payload.as_slice());
        let unpacked = gzip_decompress(&packed).unwrap();
        assert_eq!(unpacked.as_slice(), payload.as_slice());
    }

    #[test]
    fn test_gzip_round_trip_empty() {
        let packed = gzip_compress(b"").unwrap();
        assert!(gzip_decompress(&packed).unwrap().is_empty());
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(gzip_decompress(b"definitely not gzip").is_err());
    }

    #[test]
    fn test_decompress_text() {
        let packed = gzip_compress("Ping".as_bytes()).unwrap();
        assert_eq!(gzip_decompress_text(&packed).unwrap(), "Ping");
    }
}
