//! Zip family validation
//!
//! The central directory records every entry's compressed size, so zip gets
//! a precise per-entry ratio check on top of the aggregate budgets.

use super::{ArchiveFormat, ExtractionCounters, SafetyBudget, CHUNK_SIZE};
use crate::error::{BombKind, StageError, StageResult};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::trace;
use zip::ZipArchive;

pub(super) fn validate_zip(path: &Path, budget: &SafetyBudget) -> StageResult<ExtractionCounters> {
    let malformed = |e: &dyn std::fmt::Display| StageError::malformed(path, ArchiveFormat::Zip, e);

    let file = File::open(path).map_err(|e| malformed(&e))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| malformed(&e))?;
    let mut counters = ExtractionCounters::default();
    let mut chunk = [0u8; CHUNK_SIZE];

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| malformed(&e))?;
        counters.record_entry(budget)?;

        // A stored-empty entry has nothing to divide by.
        let compressed = entry.compressed_size().max(1);
        let mut entry_bytes: u64 = 0;
        loop {
            let read = entry.read(&mut chunk).map_err(|e| malformed(&e))?;
            if read == 0 {
                break;
            }
            entry_bytes += read as u64;
            counters.record_bytes(read as u64, budget)?;

            if entry_bytes as f64 / compressed as f64 > budget.max_compression_ratio {
                return Err(BombKind::SuspiciousRatio.into());
            }
        }

        trace!(entry = entry.name(), bytes = entry_bytes, compressed, "zip entry streamed");
    }

    Ok(counters)
}
