//! Archive extraction
//!
//! Only called once [`ArchiveSafetyValidator`](crate::ArchiveSafetyValidator)
//! has accepted the archive.

use crate::error::{StageError, StageResult};
use crate::safety::{open_tar, ArchiveDescriptor, ArchiveFormat, TarCompression};
use crate::util::safe_join;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Expand a validated archive into `destination`
///
/// # Errors
/// Returns an error if the archive cannot be read or a file cannot be written
pub fn extract_archive(archive: &ArchiveDescriptor, destination: &Path) -> StageResult<()> {
    match archive.format {
        ArchiveFormat::Zip => extract_zip(&archive.path, destination),
        ArchiveFormat::Tar(compression) => extract_tar(&archive.path, compression, destination),
    }
}

fn extract_zip(path: &Path, destination: &Path) -> StageResult<()> {
    let malformed = |e: zip::result::ZipError| StageError::malformed(path, ArchiveFormat::Zip, e);

    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(malformed)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(malformed)?;

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(entry = entry.name(), "skipping zip entry with unsafe name");
            continue;
        };
        let target = safe_join(destination, &relative)?;

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            // Staged files must stay writable for autofix.
            fs::set_permissions(&target, fs::Permissions::from_mode((mode & 0o777) | 0o600))?;
        }
    }

    debug!(entries = archive.len(), dest = %destination.display(), "zip extracted");
    Ok(())
}

fn extract_tar(path: &Path, compression: TarCompression, destination: &Path) -> StageResult<()> {
    let format = ArchiveFormat::Tar(compression);
    let mut archive =
        open_tar(path, compression).map_err(|e| StageError::malformed(path, format, e))?;
    archive.set_preserve_permissions(false);
    archive.set_overwrite(true);

    // `unpack` refuses entries that would escape `destination`.
    archive.unpack(destination).map_err(|e| {
        if is_archive_defect(&e) {
            StageError::malformed(path, format, e)
        } else {
            StageError::Io(e)
        }
    })?;

    debug!(dest = %destination.display(), "tar extracted");
    Ok(())
}

/// Decoder and header failures, as opposed to the destination refusing a
/// write. The OS never reports `Other`; the tar crate uses it for bad headers.
fn is_archive_defect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::Other
    )
}
