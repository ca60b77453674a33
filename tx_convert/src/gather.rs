//! Texture gathering and display grouping
//!
//! Both input surfaces (folder scan, dropped file list) reduce to one ordered
//! list of candidate paths. Renderer-native outputs are never candidates.

use crate::color_space::{ColorSpace, TextureItem};
use crate::commands::is_output_extension;
use crate::error::{Result, TxError};
use shared_utils::collect_files;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Image formats accepted from a folder scan (lowercase, no dot).
pub const SOURCE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "exr", "bmp", "gif", "tga"];

/// Scan `folder` for source textures, sorted by name per directory.
pub fn gather_textures(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if folder.as_os_str().is_empty() {
        return Err(TxError::NoInput("no folder selected".to_string()));
    }
    if !folder.is_dir() {
        return Err(TxError::NoInput(format!("{} is not a folder", folder.display())));
    }

    let textures = collect_files(folder, SOURCE_EXTENSIONS, recursive);
    info!(folder = %folder.display(), recursive, count = textures.len(), "Gathered textures");

    if textures.is_empty() {
        return Err(TxError::NoMatchingTextures(folder.display().to_string()));
    }
    Ok(textures)
}

/// Normalize a dropped file list: existing files only, duplicates and
/// renderer outputs removed, input order kept.
///
/// Unlike a folder scan, any other extension is kept so the classifier can
/// report it as unrecognized.
pub fn gather_dropped(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return Err(TxError::NoInput("no files dropped".to_string()));
    }

    let mut seen = HashSet::new();
    let files: Vec<PathBuf> = paths
        .iter()
        .filter(|p| {
            let keep = p.is_file();
            if !keep {
                debug!(path = %p.display(), "Ignoring dropped path that is not a file");
            }
            keep
        })
        .filter(|p| {
            !p.extension()
                .is_some_and(|e| is_output_extension(&e.to_string_lossy()))
        })
        .filter(|p| seen.insert((*p).clone()))
        .cloned()
        .collect();

    if files.is_empty() {
        return Err(TxError::NoMatchingTextures("dropped files".to_string()));
    }
    Ok(files)
}

/// Classified textures grouped color space → extension → files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureGroups {
    pub groups: BTreeMap<ColorSpace, BTreeMap<String, Vec<PathBuf>>>,
    pub total: usize,
}

impl TextureGroups {
    pub fn count(&self, color_space: ColorSpace) -> usize {
        self.groups
            .get(&color_space)
            .map(|by_ext| by_ext.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Textures that will be submitted (everything but UNKNOWN).
    pub fn convertible(&self) -> usize {
        self.total - self.count(ColorSpace::Unknown)
    }
}

pub fn group_textures(items: &[TextureItem]) -> TextureGroups {
    let mut groups: BTreeMap<ColorSpace, BTreeMap<String, Vec<PathBuf>>> = BTreeMap::new();
    for item in items {
        groups
            .entry(item.color_space())
            .or_default()
            .entry(item.extension().to_string())
            .or_default()
            .push(item.source_path().to_path_buf());
    }
    TextureGroups {
        groups,
        total: items.len(),
    }
}

impl fmt::Display for TextureGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (color_space, by_ext) in &self.groups {
            writeln!(f, "{}:", color_space.label().to_uppercase())?;
            for (ext, files) in by_ext {
                let ext = if ext.is_empty() { "(none)".to_string() } else { ext.to_uppercase() };
                writeln!(f, "  {}:", ext)?;
                for file in files {
                    let name = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.display().to_string());
                    writeln!(f, "    - {}", name)?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "Total Textures to Convert: {}", self.convertible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::options::ConversionOptions;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_gather_filters_and_recurses() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b_albedo.png");
        touch(dir.path(), "a_rough.JPG");
        touch(dir.path(), "a_rough.tx");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "sub/sky.exr");
        touch(dir.path(), "sub/sky.tex");

        let top = gather_textures(dir.path(), false).unwrap();
        let names: Vec<_> = top.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["a_rough.JPG", "b_albedo.png"]);

        let all = gather_textures(dir.path(), true).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().any(|p| p.ends_with("sub/sky.exr")));
    }

    #[test]
    fn test_gather_preconditions() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "readme.md");
        assert!(matches!(gather_textures(dir.path(), true), Err(TxError::NoMatchingTextures(_))));
        assert!(matches!(gather_textures(Path::new(""), true), Err(TxError::NoInput(_))));
        assert!(matches!(
            gather_textures(&dir.path().join("missing"), true),
            Err(TxError::NoInput(_))
        ));
    }

    #[test]
    fn test_gather_dropped_keeps_order_and_unknown_formats() {
        let dir = TempDir::new().unwrap();
        let psd = touch(dir.path(), "paint.psd");
        let png = touch(dir.path(), "brick.png");
        let tx = touch(dir.path(), "brick.tx");
        let missing = dir.path().join("gone.png");

        let files = gather_dropped(&[psd.clone(), tx, missing, png.clone(), psd.clone()]).unwrap();
        assert_eq!(files, vec![psd, png]);
    }

    #[test]
    fn test_gather_dropped_preconditions() {
        assert!(matches!(gather_dropped(&[]), Err(TxError::NoInput(_))));
        let dir = TempDir::new().unwrap();
        let tx = touch(dir.path(), "done.tx");
        assert!(matches!(gather_dropped(&[tx]), Err(TxError::NoMatchingTextures(_))));
    }

    #[test]
    fn test_grouping_and_listing() {
        let classifier = Classifier::new(&ConversionOptions::default());
        let items: Vec<_> = ["/t/brick.png", "/t/wall.png", "/t/wall_rough.jpg", "/t/sky.exr", "/t/paint.psd"]
            .iter()
            .map(|p| classifier.classify(Path::new(p)))
            .collect();

        let groups = group_textures(&items);
        assert_eq!(groups.total, 5);
        assert_eq!(groups.count(ColorSpace::SrgbTexture), 2);
        assert_eq!(groups.count(ColorSpace::Unknown), 1);
        assert_eq!(groups.convertible(), 4);

        let listing = groups.to_string();
        assert!(listing.contains("SRGB_TEXTURE:\n  .PNG:\n    - brick.png\n    - wall.png\n"));
        assert!(listing.contains("RAW:\n  .JPG:\n    - wall_rough.jpg\n"));
        assert!(listing.ends_with("Total Textures to Convert: 4"));
    }
}
