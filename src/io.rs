use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::codec::Utf8Transcoder;
use crate::error::ConfigError;

/// Every pass over a source reads through one of these.
pub type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// Read buffer for all passes (1 MiB).
pub(crate) const READ_BUFFER: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Suffix convention: `.gz` is gzip, `.zst` is zstd, anything else is plain.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "zstd" | "zst" => Ok(Compression::Zstd),
            _ => Err(ConfigError::UnknownValue {
                kind: "compression",
                value: s.to_string(),
                expected: "none, gzip, zstd",
            }),
        }
    }
}

/// Wrap a raw byte stream with the chosen decompression and, when the
/// charset is not UTF-8, a transcoder to UTF-8.
pub fn build_reader<R>(
    raw: R,
    compression: Compression,
    charset: &'static encoding_rs::Encoding,
) -> BoxedReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = BufReader::with_capacity(READ_BUFFER, raw);
    let decompressed: BoxedReader = match compression {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    };

    if charset == encoding_rs::UTF_8 {
        decompressed
    } else {
        let framed = FramedRead::new(decompressed, Utf8Transcoder::new(charset));
        Box::new(StreamReader::new(framed))
    }
}

/// A file on disk with its read path pinned: compression and charset are
/// fixed at construction and reused by every [`Source::open`].
#[derive(Debug, Clone)]
pub struct Source {
    path: PathBuf,
    compression: Compression,
    charset: &'static encoding_rs::Encoding,
}

impl Source {
    /// `compression: None` infers from the file suffix.
    pub fn new(
        path: impl Into<PathBuf>,
        compression: Option<Compression>,
        charset: &'static encoding_rs::Encoding,
    ) -> Self {
        let path = path.into();
        let compression = compression.unwrap_or_else(|| Compression::from_path(&path));
        Self {
            path,
            compression,
            charset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Uncompressed UTF-8: bytes on disk are the bytes every pass sees.
    pub fn is_plain_utf8(&self) -> bool {
        self.compression == Compression::None && self.charset == encoding_rs::UTF_8
    }

    /// Open a fresh reader positioned at the start of the decoded stream.
    pub async fn open(&self) -> std::io::Result<BoxedReader> {
        let file = File::open(&self.path).await?;
        Ok(build_reader(file, self.compression, self.charset))
    }
}
