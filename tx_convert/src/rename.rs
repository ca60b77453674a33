//! Suffix rename pass
//!
//! Makes the classified color space explicit on disk (`brick.png` →
//! `brick_srgb_texture.png`) before conversion, so every later
//! classification of the file is stable. Per-file failures are logged and the
//! original path is kept.

use crate::classifier::Classifier;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
    /// Input paths after the pass, in input order
    pub paths: Vec<PathBuf>,
}

/// Rename every path whose classifier suggests a new name.
///
/// The classifier only suggests names when suffix adding is enabled; with
/// a classifier built otherwise this is a no-op that reports all skipped.
pub fn rename_missing_suffixes<F>(paths: &[PathBuf], classifier: &Classifier, mut log: F) -> RenameReport
where
    F: FnMut(String),
{
    let mut report = RenameReport::default();

    for path in paths {
        let item = classifier.classify(path);
        let target = match item.suggested_rename() {
            Some(target) if item.color_space().is_recognized() => target.to_path_buf(),
            _ => {
                report.skipped += 1;
                report.paths.push(path.clone());
                continue;
            }
        };

        match rename_no_clobber(path, &target) {
            Ok(()) => {
                info!(from = %path.display(), to = %target.display(), "Renamed texture");
                report.renamed.push((path.clone(), target.clone()));
                report.paths.push(target);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Rename failed");
                log(format!("❌ Error renaming {}: {}", path.display(), e));
                report.failed.push((path.clone(), e.to_string()));
                report.paths.push(path.clone());
            }
        }
    }

    log(format!("Renamed {} files.", report.renamed.len()));
    for (old, new) in &report.renamed {
        log(format!("  {} -> {}", old.display(), new.display()));
    }
    log(format!("Skipped {} files.", report.skipped));

    report
}

fn rename_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }
    fs::rename(from, to)
}
