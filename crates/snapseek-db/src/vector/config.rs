//! Where the vector file lives and how its header is laid out.
//!
//! ```text
//! offset  size  field
//!      0     4  magic "SSVX"
//!      4     4  format version (u32 LE)
//!      8     4  dimension (u32 LE)
//!     12     8  row count (u64 LE)
//!     20     -  count * dimension f32 LE, row-major
//! ```

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INDEX_FILENAME: &str = "index.ssvx";

pub const FILE_MAGIC: [u8; 4] = *b"SSVX";

pub const FORMAT_VERSION: u32 = 1;

pub const HEADER_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexConfig {
    pub dimension: usize,
    pub path: PathBuf,
    /// Start an empty index when `path` does not exist (default true).
    #[serde(default = "yes")]
    pub create_if_missing: bool,
}

fn yes() -> bool {
    true
}

impl VectorIndexConfig {
    pub fn new(dimension: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            path: path.into(),
            create_if_missing: true,
        }
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u32,
    pub dimension: usize,
    pub count: usize,
}

impl IndexHeader {
    pub fn new(dimension: usize, count: usize) -> Self {
        Self {
            version: FORMAT_VERSION,
            dimension,
            count,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..4].copy_from_slice(&FILE_MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&(self.dimension as u32).to_le_bytes());
        buf[12..].copy_from_slice(&(self.count as u64).to_le_bytes());
        buf
    }

    /// Decode the header at the start of `bytes`. `path` is only used in errors.
    pub fn parse(path: &Path, bytes: &[u8]) -> DbResult<Self> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(DbError::vector_parse(
                path,
                format!("{} bytes is too short for a header", bytes.len()),
            ));
        };
        if header[..4] != FILE_MAGIC {
            return Err(DbError::vector_parse(path, "not a snapseek vector index (bad magic)"));
        }

        let word = |at: usize| {
            let mut le = [0u8; 4];
            le.copy_from_slice(&header[at..at + 4]);
            u32::from_le_bytes(le)
        };
        let version = word(4);
        if version != FORMAT_VERSION {
            return Err(DbError::vector_parse(
                path,
                format!("format version {} is not supported", version),
            ));
        }
        let mut count = [0u8; 8];
        count.copy_from_slice(&header[12..20]);

        Ok(Self {
            version,
            dimension: word(8) as usize,
            count: u64::from_le_bytes(count) as usize,
        })
    }

    /// Size in bytes a well-formed file with this header has, or `None` when
    /// the header describes more data than fits in memory.
    pub fn file_len(&self) -> Option<usize> {
        self.count
            .checked_mul(self.dimension)?
            .checked_mul(std::mem::size_of::<f32>())?
            .checked_add(HEADER_LEN)
    }
}

pub fn read_index_header(path: &Path) -> DbResult<IndexHeader> {
    debug!("Reading vector index header from {}", path.display());
    let mut buf = [0u8; HEADER_LEN];
    File::open(path)
        .map_err(|e| DbError::vector_io(path, e.to_string()))?
        .read_exact(&mut buf)
        .map_err(|e| DbError::vector_parse(path, format!("truncated header: {}", e)))?;
    IndexHeader::parse(path, &buf)
}

/// What opening the configured index would find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorIndexCompatibility {
    Compatible,
    NotFound,
    IncompatibleDimension { expected: usize, actual: usize },
    /// The header could not be read; carries the reason.
    Corrupted(String),
}

impl VectorIndexCompatibility {
    pub fn is_compatible(&self) -> bool {
        *self == Self::Compatible
    }

    pub fn is_not_found(&self) -> bool {
        *self == Self::NotFound
    }
}

/// Compare the header on disk with `config` without loading any vectors.
pub fn check_index_compatibility(config: &VectorIndexConfig) -> VectorIndexCompatibility {
    if !config.path.exists() {
        return VectorIndexCompatibility::NotFound;
    }
    match read_index_header(&config.path) {
        Err(e) => VectorIndexCompatibility::Corrupted(e.to_string()),
        Ok(header) if header.dimension == config.dimension => VectorIndexCompatibility::Compatible,
        Ok(header) => VectorIndexCompatibility::IncompatibleDimension {
            expected: config.dimension,
            actual: header.dimension,
        },
    }
}
