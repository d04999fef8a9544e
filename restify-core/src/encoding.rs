//! HTTP `Content-Encoding` support for response bodies.
//!
//! The transport advertises [`ContentEncoding::accept_encoding`] and decodes
//! responses whose `Content-Encoding` is one of the enabled variants:
//! - `gzip` (requires `compression-gzip`)
//! - `deflate`, zlib framed (requires `compression-deflate`)

use bytes::Bytes;
use std::io;

#[cfg(any(feature = "compression-gzip", feature = "compression-deflate"))]
use std::io::Read;

/// A supported content coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    #[default]
    Identity,
    #[cfg(feature = "compression-gzip")]
    Gzip,
    #[cfg(feature = "compression-deflate")]
    Deflate,
}

impl ContentEncoding {
    /// Parse a `Content-Encoding` header value.
    ///
    /// Returns `None` for codings this build cannot decode.
    pub fn from_header(value: Option<&str>) -> Option<Self> {
        let value = value.map(|v| v.trim().to_ascii_lowercase());
        match value.as_deref() {
            None | Some("identity") | Some("") => Some(Self::Identity),
            #[cfg(feature = "compression-gzip")]
            Some("gzip") | Some("x-gzip") => Some(Self::Gzip),
            #[cfg(feature = "compression-deflate")]
            Some("deflate") => Some(Self::Deflate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            #[cfg(feature = "compression-gzip")]
            Self::Gzip => "gzip",
            #[cfg(feature = "compression-deflate")]
            Self::Deflate => "deflate",
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// The `Accept-Encoding` value listing every enabled coding, or `None` when
    /// only identity is available.
    pub fn accept_encoding() -> Option<&'static str> {
        match (
            cfg!(feature = "compression-gzip"),
            cfg!(feature = "compression-deflate"),
        ) {
            (true, true) => Some("gzip, deflate"),
            (true, false) => Some("gzip"),
            (false, true) => Some("deflate"),
            (false, false) => None,
        }
    }

    /// Decode a complete body.
    pub fn decode(&self, data: Bytes) -> io::Result<Bytes> {
        match self {
            Self::Identity => Ok(data),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip => {
                let mut decoder = flate2::read::GzDecoder::new(&data[..]);
                let mut decoded = Vec::new();
                decoder.read_to_end(&mut decoded)?;
                Ok(Bytes::from(decoded))
            }
            #[cfg(feature = "compression-deflate")]
            Self::Deflate => {
                let mut decoder = flate2::read::ZlibDecoder::new(&data[..]);
                let mut decoded = Vec::new();
                decoder.read_to_end(&mut decoded)?;
                Ok(Bytes::from(decoded))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parsing() {
        assert_eq!(ContentEncoding::from_header(None), Some(ContentEncoding::Identity));
        assert_eq!(
            ContentEncoding::from_header(Some("identity")),
            Some(ContentEncoding::Identity)
        );
        assert_eq!(ContentEncoding::from_header(Some("")), Some(ContentEncoding::Identity));
        assert_eq!(ContentEncoding::from_header(Some("snappy")), None);
    }

    #[test]
    fn test_identity_passthrough() {
        let data = Bytes::from_static(b"plain");
        assert_eq!(ContentEncoding::Identity.decode(data.clone()).unwrap(), data);
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_gzip_decode() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello gzip").unwrap();
        let compressed = Bytes::from(encoder.finish().unwrap());

        let encoding = ContentEncoding::from_header(Some("GZIP")).unwrap();
        assert_eq!(encoding, ContentEncoding::Gzip);
        assert_eq!(&encoding.decode(compressed).unwrap()[..], b"hello gzip");
    }

    #[cfg(feature = "compression-deflate")]
    #[test]
    fn test_deflate_decode() {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello deflate").unwrap();
        let compressed = Bytes::from(encoder.finish().unwrap());

        let decoded = ContentEncoding::Deflate.decode(compressed).unwrap();
        assert_eq!(&decoded[..], b"hello deflate");
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_gzip_rejects_garbage() {
        let result = ContentEncoding::Gzip.decode(Bytes::from_static(b"not gzip"));
        assert!(result.is_err());
    }
}
