use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::FileCandidate;

/// Case-insensitive extension check, `ext` given without the dot
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// SHA-256 of the full file, streamed
pub fn checksum_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Recursively find files with `ext` under `dir` and fingerprint them.
///
/// Fails only if `dir` itself cannot be read. Files that vanish or can't be
/// read between listing and hashing are skipped with a warning.
pub fn discover(dir: &Path, ext: &str) -> io::Result<Vec<FileCandidate>> {
    let mut paths = Vec::new();
    collect(dir, ext, &mut paths, true)?;
    debug!("Found {} .{} files under {}", paths.len(), ext, dir.display());

    let mut candidates = Vec::with_capacity(paths.len());
    for path in paths {
        match FileCandidate::from_path(&path) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(candidates)
}

fn collect(dir: &Path, ext: &str, out: &mut Vec<PathBuf>, root: bool) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if !root => {
            warn!("Skipping unreadable directory {}: {}", dir.display(), e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            collect(&path, ext, out, false)?;
        } else if file_type.is_file() && has_extension(&path, ext) {
            out.push(path);
        }
    }
    Ok(())
}
