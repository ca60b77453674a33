//! Run preparation and dispatch
//!
//! Turns an input surface (folder or dropped files) plus one options
//! snapshot into the list of textures to convert, failing fast on the
//! precondition errors before anything is started.

use crate::aces_config::detect_version;
use crate::classifier::Classifier;
use crate::color_space::TextureItem;
use crate::commands::builder_for;
use crate::error::{Result, TxError};
use crate::executor::ProcessConverter;
use crate::gather::{gather_dropped, gather_textures, group_textures, TextureGroups};
use crate::options::ConversionOptions;
use crate::rename::{rename_missing_suffixes, RenameReport};
use crate::scheduler::{BatchEvent, BatchScheduler, BatchSummary};
use crate::tools::ToolPaths;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    Folder { root: PathBuf, recursive: bool },
    /// Explicit (dropped) files; only these are processed
    Files(Vec<PathBuf>),
}

#[derive(Debug, Clone)]
pub struct PreparedRun {
    /// Recognized textures, in gather order
    pub selected: Vec<TextureItem>,
    /// Unrecognized color space, excluded from the run
    pub skipped: Vec<TextureItem>,
    pub rename: Option<RenameReport>,
    pub groups: TextureGroups,
}

impl PreparedRun {
    pub fn total(&self) -> usize {
        self.selected.len()
    }
}

/// Gather, optionally rename, classify and select.
///
/// Every excluded texture gets exactly one log line.
pub fn prepare<F>(source: &TextureSource, options: &ConversionOptions, mut log: F) -> Result<PreparedRun>
where
    F: FnMut(String),
{
    options.validate()?;

    let mut paths = match source {
        TextureSource::Folder { root, recursive } => gather_textures(root, *recursive)?,
        TextureSource::Files(files) => {
            let files = gather_dropped(files)?;
            log(format!("Processing {} dropped file(s) only...", files.len()));
            files
        }
    };

    let classifier = Classifier::new(options);

    let rename = if options.add_missing_suffix {
        log("Adding missing color space suffixes...".to_string());
        let report = rename_missing_suffixes(&paths, &classifier, &mut log);
        paths = report.paths.clone();
        Some(report)
    } else {
        None
    };

    log(format!("Total textures found: {}", paths.len()));

    let items: Vec<TextureItem> = paths.iter().map(|p| classifier.classify(p)).collect();
    let groups = group_textures(&items);
    let (selected, skipped): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| item.color_space().is_recognized());

    for item in &skipped {
        log(format!(
            "⏭️ Skipped (unrecognized color space): {}",
            item.source_path().display()
        ));
    }

    if selected.is_empty() {
        return Err(TxError::NoRecognizedColorSpaces {
            skipped: skipped.len(),
        });
    }

    info!(selected = selected.len(), skipped = skipped.len(), "Prepared batch run");
    Ok(PreparedRun {
        selected,
        skipped,
        rename,
        groups,
    })
}

/// Convert a prepared run with the external compiler for `options.backend`
/// (or the Arnold fallback when it cannot be located).
pub fn convert_prepared<F>(
    prepared: &PreparedRun,
    options: &ConversionOptions,
    tools: &ToolPaths,
    scheduler: &BatchScheduler,
    mut on_event: F,
) -> Result<BatchSummary>
where
    F: FnMut(BatchEvent),
{
    let (backend, note) = tools.select_backend(options.backend);
    if let Some(note) = note {
        on_event(BatchEvent::Log(note));
    }

    let aces = detect_version(tools.ocio_config.as_deref());
    let converter = ProcessConverter::new(builder_for(backend, tools), options.clone(), aces)
        .with_cancel(scheduler.cancel_token().clone());

    info!(backend = %converter.backend(), aces = %aces, "Converting textures");
    on_event(BatchEvent::Log(format!(
        "Starting conversion of {} textures to {}...",
        prepared.total(),
        converter.backend().output_format()
    )));

    scheduler.run(&prepared.selected, &converter, on_event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::ColorSpace;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn folder(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_prepare_folder() {
        let dir = folder(&["brick.png", "wall_rough.jpg", "sky.exr"]);
        let source = TextureSource::Folder {
            root: dir.path().to_path_buf(),
            recursive: false,
        };
        let mut lines = Vec::new();
        let run = prepare(&source, &ConversionOptions::default(), |l| lines.push(l)).unwrap();

        assert_eq!(run.total(), 3);
        assert!(run.skipped.is_empty());
        assert!(run.rename.is_none());
        assert_eq!(run.groups.count(ColorSpace::Raw), 1);
        assert_eq!(lines, vec!["Total textures found: 3"]);
    }

    #[test]
    fn test_prepare_drops_skip_unknown_with_one_line_each() {
        let dir = folder(&["brick.png", "paint.psd", "layout.kra"]);
        let files = ["paint.psd", "brick.png", "layout.kra"]
            .iter()
            .map(|n| dir.path().join(n))
            .collect();
        let mut lines = Vec::new();
        let run = prepare(&TextureSource::Files(files), &ConversionOptions::default(), |l| lines.push(l)).unwrap();

        assert_eq!(run.total(), 1);
        assert_eq!(run.skipped.len(), 2);
        let skip_lines = lines.iter().filter(|l| l.starts_with("⏭️")).count();
        assert_eq!(skip_lines, 2);
    }

    #[test]
    fn test_prepare_renames_before_classifying() {
        let dir = folder(&["brick.png"]);
        let options = ConversionOptions {
            add_missing_suffix: true,
            ..ConversionOptions::default()
        };
        let source = TextureSource::Folder {
            root: dir.path().to_path_buf(),
            recursive: true,
        };
        let run = prepare(&source, &options, |_| {}).unwrap();

        assert_eq!(run.rename.as_ref().map(|r| r.renamed.len()), Some(1));
        assert_eq!(
            run.selected[0].source_path(),
            dir.path().join("brick_srgb_texture.png").as_path()
        );
        assert!(run.selected[0].suggested_rename().is_none());
    }

    #[test]
    fn test_prepare_preconditions() {
        let options = ConversionOptions::default();
        let only_unknown = folder(&["paint.psd"]);
        let err = prepare(
            &TextureSource::Files(vec![only_unknown.path().join("paint.psd")]),
            &options,
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, TxError::NoRecognizedColorSpaces { skipped: 1 }));
        assert!(err.is_precondition());

        let empty = folder(&[]);
        let source = TextureSource::Folder {
            root: empty.path().to_path_buf(),
            recursive: true,
        };
        assert!(matches!(prepare(&source, &options, |_| {}), Err(TxError::NoMatchingTextures(_))));

        let bad = ConversionOptions {
            concurrency: 0,
            ..ConversionOptions::default()
        };
        let source = TextureSource::Files(vec![Path::new("/nope.png").to_path_buf()]);
        assert!(matches!(prepare(&source, &bad, |_| {}), Err(TxError::InvalidConcurrency(0))));
    }

    #[cfg(unix)]
    #[test]
    fn test_convert_prepared_reports_missing_tool_per_texture() {
        let dir = folder(&["brick.png", "sky.exr"]);
        let source = TextureSource::Folder {
            root: dir.path().to_path_buf(),
            recursive: false,
        };
        let options = ConversionOptions::default();
        let run = prepare(&source, &options, |_| {}).unwrap();
        let tools = ToolPaths {
            maketx: PathBuf::from("/definitely/not/installed/maketx"),
            ..ToolPaths::default()
        };
        let scheduler = BatchScheduler::new(2).unwrap();
        let mut events = Vec::new();
        let summary = convert_prepared(&run, &options, &tools, &scheduler, |e| events.push(e)).unwrap();

        assert_eq!(summary.result.failed, 2);
        assert!(matches!(events.last(), Some(BatchEvent::Finished(_))));
    }
}
