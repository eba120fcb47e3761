//! Static asset copying.
//!
//! Copies the assets root into the output tree, skipping files whose copy is
//! already up to date. A destination file is refreshed when it is missing or
//! its modification time is older than the source's.
//!
//! Failures here never abort the build: each one is logged as a warning and
//! counted, and copying moves on to the next file.

use std::fmt;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// What [`copy_assets`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssetStats {
    /// Destination was missing.
    pub copied: usize,
    /// Destination was older than the source.
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl AssetStats {
    pub fn total(&self) -> usize {
        self.copied + self.updated + self.skipped + self.failed
    }
}

impl fmt::Display for AssetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} updated, {} up to date",
            self.copied, self.updated, self.skipped
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

enum Outcome {
    Copied,
    Updated,
    Skipped,
}

/// Mirror `src` into `dst`.
pub fn copy_assets(src: &Path, dst: &Path) -> AssetStats {
    let mut stats = AssetStats::default();
    if !src.is_dir() {
        info!("no assets at {}, skipping", src.display());
        return stats;
    }

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("could not read asset: {err}");
                stats.failed += 1;
                continue;
            }
        };
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            if let Err(err) = std::fs::create_dir_all(&target) {
                warn!("could not create directory {}: {err}", target.display());
            }
            continue;
        }

        match copy_file(entry.path(), &target) {
            Ok(Outcome::Copied) => {
                info!("copied {}", relative.display());
                stats.copied += 1;
            }
            Ok(Outcome::Updated) => {
                info!("updated {}", relative.display());
                stats.updated += 1;
            }
            Ok(Outcome::Skipped) => stats.skipped += 1,
            Err(err) => {
                warn!("could not copy {}: {err}", entry.path().display());
                stats.failed += 1;
            }
        }
    }
    stats
}

fn copy_file(src: &Path, dst: &Path) -> std::io::Result<Outcome> {
    let outcome = match std::fs::metadata(dst) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Outcome::Copied,
        Err(err) => return Err(err),
        Ok(existing) => {
            let source_time = std::fs::metadata(src)?.modified()?;
            if existing.modified()? < source_time {
                Outcome::Updated
            } else {
                return Ok(Outcome::Skipped);
            }
        }
    };
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(src, dst)?;
    Ok(outcome)
}
