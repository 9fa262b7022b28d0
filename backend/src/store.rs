use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::RouteSegment;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read segments from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid segment file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only access to the current set of route segments.
///
/// Snapshots hold approved segments only; rejected ones are never routed over.
pub trait SegmentStore: Send + Sync {
    fn snapshot(&self) -> Result<Vec<RouteSegment>, StoreError>;
}

fn approved_only(segments: Vec<RouteSegment>) -> Vec<RouteSegment> {
    let total = segments.len();
    let approved: Vec<_> = segments.into_iter().filter(|s| s.is_approved()).collect();
    if approved.len() < total {
        tracing::debug!("skipping {} unapproved segments", total - approved.len());
    }
    approved
}

/// On-disk layout: `{"segments": [...]}` or a bare array of segments.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SegmentFile {
    pub segments: Vec<RouteSegment>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentFileLayout {
    Wrapped(SegmentFile),
    Bare(Vec<RouteSegment>),
}

impl SegmentFile {
    pub fn from_reader(reader: impl Read) -> Result<Self, serde_json::Error> {
        let layout: SegmentFileLayout = serde_json::from_reader(reader)?;
        Ok(match layout {
            SegmentFileLayout::Wrapped(file) => file,
            SegmentFileLayout::Bare(segments) => Self { segments },
        })
    }

    /// Read `path`, preferring a zstd-compressed `.json.zst` sibling when present.
    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        let compressed_path = path.with_extension("json.zst");
        if compressed_path.exists() {
            return Self::read_compressed(&compressed_path);
        }

        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_compressed(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let io_error = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let decoder = zstd::stream::read::Decoder::new(file).map_err(io_error)?;
        Self::from_reader(BufReader::new(decoder)).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write_compressed(&self, path: impl AsRef<Path>) -> Result<(), io::Error> {
        let file = File::create(path)?;
        let mut encoder = zstd::stream::write::Encoder::new(file, 3)?;
        serde_json::to_writer(&mut encoder, self)?;
        encoder.finish()?;
        Ok(())
    }
}

/// Segments kept in a JSON file that is re-read for every snapshot, so edits
/// to the file show up without a restart.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SegmentStore for JsonFileStore {
    fn snapshot(&self) -> Result<Vec<RouteSegment>, StoreError> {
        let file = SegmentFile::read_from_path(&self.path)?;
        tracing::debug!(
            "loaded {} segments from {:?}",
            file.segments.len(),
            self.path
        );
        Ok(approved_only(file.segments))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    segments: Vec<RouteSegment>,
}

impl MemoryStore {
    pub fn new(segments: Vec<RouteSegment>) -> Self {
        Self { segments }
    }
}

impl SegmentStore for MemoryStore {
    fn snapshot(&self) -> Result<Vec<RouteSegment>, StoreError> {
        Ok(approved_only(self.segments.clone()))
    }
}
