//! Typed paper metadata and corpus preparation
//!
//! Reads the arXiv metadata snapshot (JSON lines, one paper per line) into
//! strongly-typed rows, cleans the text, and produces the corpus that the
//! embedder consumes. Row order is load order, and the build pipeline writes
//! vectors in the same order — row i of the saved corpus always describes
//! vector i of the index. [`verify_alignment`] enforces that at serve time.
//!
//! A snapshot line missing a required field fails the whole load with the
//! offending line number; there are no per-row optional lookups.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("metadata file not found at {0}")]
    NotFound(PathBuf),

    #[error("malformed record on line {line}: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },

    #[error("index/metadata misalignment: {index_size} vectors vs {record_count} records")]
    AlignmentMismatch {
        index_size: usize,
        record_count: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One paper from the metadata snapshot.
///
/// All four fields are required; deserialization fails if any is absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub categories: String,
}

impl PaperRecord {
    /// Text fed to the embedder: `title. abstract`, with dangling
    /// separators trimmed when either side is empty.
    pub fn combined_text(&self) -> String {
        let combined = format!("{}. {}", self.title, self.abstract_text);
        combined.trim_matches([' ', '.']).to_string()
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn clean(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Load paper records from a JSON-lines snapshot.
///
/// Blank lines are skipped. The first malformed line aborts the load.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<PaperRecord>, CorpusError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CorpusError::NotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PaperRecord =
            serde_json::from_str(&line).map_err(|source| CorpusError::Malformed {
                line: i + 1,
                source,
            })?;
        records.push(record);
    }
    Ok(records)
}

/// Write paper records as JSON lines.
pub fn save_corpus<P: AsRef<Path>>(path: P, records: &[PaperRecord]) -> Result<(), CorpusError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        // Infallible for this struct; surface as Io if the sink fails.
        let line = serde_json::to_string(record).map_err(io::Error::other)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Clean every text field and drop rows whose combined text is empty.
///
/// Surviving rows keep their relative order; their positions become vector
/// row indices.
pub fn prepare_corpus(records: Vec<PaperRecord>) -> Vec<PaperRecord> {
    records
        .into_iter()
        .map(|r| PaperRecord {
            id: clean(&r.id),
            title: clean(&r.title),
            abstract_text: clean(&r.abstract_text),
            categories: clean(&r.categories),
        })
        .filter(|r| !r.combined_text().is_empty())
        .collect()
}

/// Check the positional invariant between an index and its metadata.
pub fn verify_alignment(index_size: usize, record_count: usize) -> Result<(), CorpusError> {
    if index_size != record_count {
        return Err(CorpusError::AlignmentMismatch {
            index_size,
            record_count,
        });
    }
    Ok(())
}
