//! Archive handling for downloaded hugo packages.
//!
//! Release packages are either gzip-compressed tarballs or zip files. Only a
//! single file is ever needed out of them, so extraction scans the entries for
//! the first regular file whose base name matches, streams it to the target
//! path and ignores everything else.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::HugoError;

// ============================================================================
// Packaging
// ============================================================================

/// Packaging format of a release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Packaging {
    /// Gzip-compressed tar archive (.tar.gz)
    TarGz,
    /// ZIP archive (.zip)
    Zip,
}

impl Packaging {
    /// File extension used in release artifact names, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => ".tar.gz",
            Self::Zip => ".zip",
        }
    }
}

// ============================================================================
// Single-File Extraction
// ============================================================================

/// Extracts the first non-directory entry named `file_name` (case-insensitive,
/// at any depth) from `archive_path` into `dest`.
///
/// `dest` is created or truncated. If no entry matches, a download error
/// naming the expected file is returned and `dest` is not created.
pub fn extract_file(
    archive_path: &Path,
    packaging: Packaging,
    file_name: &str,
    dest: &Path,
) -> Result<(), HugoError> {
    info!(
        "Extracting {} from {:?} archive {} to {}",
        file_name,
        packaging,
        archive_path.display(),
        dest.display()
    );

    let found = match packaging {
        Packaging::TarGz => extract_from_tar_gz(archive_path, file_name, dest),
        Packaging::Zip => extract_from_zip(archive_path, file_name, dest),
    }
    .with_context(|| {
        format!(
            "Cannot extract {} from {} to {}",
            file_name,
            archive_path.display(),
            dest.display()
        )
    })?;

    if !found {
        return Err(HugoError::download(format!(
            "{} does not contain expected file {}",
            archive_path.display(),
            file_name
        )));
    }

    debug!("Extracted {} to {}", file_name, dest.display());
    Ok(())
}

fn extract_from_tar_gz(archive_path: &Path, file_name: &str, dest: &Path) -> Result<bool> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open tar.gz: {}", archive_path.display()))?;

    let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let path = entry.path()?.into_owned();
        if matches_file_name(&path, file_name) {
            debug!("Found {} at {:?} in tar", file_name, path);
            copy_to(&mut entry, dest)?;
            return Ok(true);
        }
    }

    Ok(false)
}

fn extract_from_zip(archive_path: &Path, file_name: &str, dest: &Path) -> Result<bool> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open zip: {}", archive_path.display()))?;

    extract_from_zip_reader(file, file_name, dest)
}

fn extract_from_zip_reader<R: Read + Seek>(reader: R, file_name: &str, dest: &Path) -> Result<bool> {
    let mut archive = zip::ZipArchive::new(reader).context("Failed to read zip")?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        if matches_file_name(Path::new(&name), file_name) {
            debug!("Found {} at {} in zip", file_name, name);
            copy_to(&mut entry, dest)?;
            return Ok(true);
        }
    }

    Ok(false)
}

/// Base-name comparison; directories inside the archive are irrelevant.
fn matches_file_name(entry_path: &Path, file_name: &str) -> bool {
    entry_path
        .file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|base| base.eq_ignore_ascii_case(file_name))
}

fn copy_to<R: Read>(reader: &mut R, dest: &Path) -> Result<()> {
    let mut outfile =
        File::create(dest).with_context(|| format!("Failed to create: {}", dest.display()))?;
    io::copy(reader, &mut outfile)
        .with_context(|| format!("Failed to write: {}", dest.display()))?;
    outfile.sync_all()?;
    Ok(())
}

// ============================================================================
// Permissions
// ============================================================================

/// Marks a file executable: owner rwx, group and others r-x.
///
/// On platforms without POSIX permissions this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<(), HugoError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| {
            HugoError::download_caused(
                format!("Cannot make {} executable", path.display()),
                e,
            )
        })?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}

/// Returns true if `path` is a regular file that can be executed.
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}
