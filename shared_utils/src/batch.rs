//! Batch Processing Module
//!
//! Candidate file collection and the per-run tally of outcomes.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Case-insensitive extension check; `extensions` are lowercase without the dot.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Regular files under `dir` matching `extensions`.
///
/// Entries are sorted by name within each directory so repeated scans give
/// the same order. Hidden files and directories are ignored.
pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    let depth = if recursive { usize::MAX } else { 1 };

    WalkDir::new(dir)
        .max_depth(depth)
        .follow_links(recursive)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .map(DirEntry::into_path)
        .collect()
}

/// Outcome counts for one run. Every item lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Failed item and reason, in the order they were recorded
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn fail(&mut self, path: PathBuf, reason: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((path, reason));
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Percentage of attempted items that succeeded; skips do not count.
    pub fn success_rate(&self) -> f64 {
        match self.attempted() {
            0 => 100.0,
            n => self.succeeded as f64 * 100.0 / n as f64,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_buckets_add_up() {
        let mut result = BatchResult::new();
        result.success();
        result.skip();
        result.fail(PathBuf::from("/t/cliff_disp.exr"), "exit code 1".to_string());
        result.success();

        assert_eq!(result.total, 4);
        assert_eq!(result.total, result.succeeded + result.failed + result.skipped);
        assert_eq!(result.attempted(), 3);
        assert_eq!(result.errors, vec![(PathBuf::from("/t/cliff_disp.exr"), "exit code 1".to_string())]);
        assert!(!result.all_succeeded());
    }

    #[test]
    fn test_success_rate_ignores_skips() {
        let mut result = BatchResult::new();
        assert_eq!(result.success_rate(), 100.0);

        result.skip();
        result.skip();
        assert_eq!(result.success_rate(), 100.0);

        result.success();
        result.fail(PathBuf::from("a.png"), "timed out".to_string());
        assert!((result.success_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("/tex/Wall.PNG"), &["png"]));
        assert!(has_extension(Path::new("wall.tiff"), &["tif", "tiff"]));
        assert!(!has_extension(Path::new("wall.tx"), &["png"]));
        assert!(!has_extension(Path::new("README"), &["png"]));
    }

    #[test]
    fn test_collect_files_depth_and_order() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        let hidden = dir.path().join(".cache");
        fs::create_dir(&nested).unwrap();
        fs::create_dir(&hidden).unwrap();
        for name in ["b.png", "a.exr", "a.tx", ".thumb.png"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::write(nested.join("c.jpg"), b"").unwrap();
        fs::write(hidden.join("d.png"), b"").unwrap();

        let exts = ["png", "exr", "jpg"];
        let flat: Vec<_> = collect_files(dir.path(), &exts, false)
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(flat, vec!["a.exr", "b.png"]);

        let deep = collect_files(dir.path(), &exts, true);
        assert_eq!(deep.len(), 3);
        assert!(deep.iter().any(|p| p.ends_with("nested/c.jpg")));
    }
}
