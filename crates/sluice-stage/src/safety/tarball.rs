//! Tar family validation
//!
//! Tar headers declare each entry's size but say nothing about how well the
//! outer stream compressed, and tiny entries make a per-entry ratio useless.
//! Only the aggregate budgets are enforced here; ratio bombs surface through
//! the byte budget.

use super::{ArchiveFormat, ExtractionCounters, SafetyBudget, TarCompression, CHUNK_SIZE};
use crate::error::{StageError, StageResult};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::trace;
use xz2::read::XzDecoder;

/// Open a tar archive behind the decoder its suffix calls for
pub(crate) fn open_tar(
    path: &Path,
    compression: TarCompression,
) -> io::Result<tar::Archive<Box<dyn Read>>> {
    let file = BufReader::new(File::open(path)?);
    let reader: Box<dyn Read> = match compression {
        TarCompression::None => Box::new(file),
        TarCompression::Gzip => Box::new(GzDecoder::new(file)),
        TarCompression::Bzip2 => Box::new(BzDecoder::new(file)),
        TarCompression::Xz => Box::new(XzDecoder::new(file)),
    };
    Ok(tar::Archive::new(reader))
}

pub(super) fn validate_tar(
    path: &Path,
    compression: TarCompression,
    budget: &SafetyBudget,
) -> StageResult<ExtractionCounters> {
    let format = ArchiveFormat::Tar(compression);
    let malformed = |e: &dyn std::fmt::Display| StageError::malformed(path, format, e);

    let len = fs::metadata(path).map_err(|e| malformed(&e))?.len();
    if len == 0 {
        return Err(malformed(&"empty file"));
    }

    let mut archive = open_tar(path, compression).map_err(|e| malformed(&e))?;
    let mut counters = ExtractionCounters::default();
    let mut chunk = [0u8; CHUNK_SIZE];

    for entry in archive.entries().map_err(|e| malformed(&e))? {
        let mut entry = entry.map_err(|e| malformed(&e))?;
        counters.record_entry(budget)?;

        let mut entry_bytes: u64 = 0;
        loop {
            let read = entry.read(&mut chunk).map_err(|e| malformed(&e))?;
            if read == 0 {
                break;
            }
            entry_bytes += read as u64;
            counters.record_bytes(read as u64, budget)?;
        }

        trace!(
            entry = %entry.path().map(|p| p.display().to_string()).unwrap_or_default(),
            bytes = entry_bytes,
            "tar entry streamed"
        );
    }

    // Only end-of-archive blocks, or a compressed empty stream.
    if counters.entries == 0 {
        return Err(malformed(&"empty archive"));
    }

    Ok(counters)
}
