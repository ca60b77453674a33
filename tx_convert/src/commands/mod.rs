//! Backend command builders
//!
//! One builder per texture compiler. All of them share the output naming
//! policy and the "already converted" guard defined here; each one owns its
//! argument grammar.

mod arnold;
mod houdini;
mod renderman;

pub use arnold::MaketxBuilder;
pub use houdini::ImaketxBuilder;
pub use renderman::TxmakeBuilder;

use crate::aces_config::AcesVersion;
use crate::color_space::{ColorSpace, TextureItem};
use crate::options::{Backend, ConversionOptions, SuffixTokens};
use crate::tools::ToolPaths;
use std::fmt;
use std::path::{Path, PathBuf};

/// Renderer-native extensions. Files carrying one are never used as sources.
pub const OUTPUT_EXTENSIONS: &[&str] = &["tx", "tex", "rat", "b2r"];

pub(crate) const DWAA: &str = "dwaa";

/// A ready-to-run external compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub backend: Backend,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Extra environment for the child process
    pub env: Vec<(String, String)>,
    pub output_path: PathBuf,
}

impl Invocation {
    pub fn tool_name(&self) -> &'static str {
        self.backend.tool_name()
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Command(Invocation),
    /// Source is itself a renderer-native texture
    AlreadyConverted,
}

pub trait CommandBuilder: Send + Sync {
    fn backend(&self) -> Backend;

    fn build(&self, item: &TextureItem, options: &ConversionOptions, aces: AcesVersion) -> BuildOutcome;
}

/// Builder for the given backend. Callers pick the backend through
/// [`ToolPaths::select_backend`] first, so a missing path only happens when
/// the fallback itself was requested.
pub fn builder_for(backend: Backend, tools: &ToolPaths) -> Box<dyn CommandBuilder> {
    let ocio_config = tools.ocio_config.clone();
    let program = tools
        .executable_for(backend)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(backend.tool_name()));

    match backend {
        Backend::Arnold => Box::new(MaketxBuilder::new(program, ocio_config)),
        Backend::RenderMan => Box::new(TxmakeBuilder::new(program, ocio_config)),
        Backend::Houdini => Box::new(ImaketxBuilder::new(program, ocio_config)),
    }
}

pub fn is_output_extension(extension: &str) -> bool {
    let ext = extension.trim_start_matches('.').to_lowercase();
    OUTPUT_EXTENSIONS.contains(&ext.as_str())
}

/// Output base name (no extension) under the renaming policy.
///
/// ACEScg renaming beats "add missing suffix", which beats leaving the
/// stem alone.
pub fn output_stem(item: &TextureItem, options: &ConversionOptions) -> String {
    let stem = item.file_stem();
    let suffixes = &options.suffixes;

    if options.rename_to_acescg {
        let base = strip_trailing_token(&stem, suffixes);
        return match suffixes.token(ColorSpace::Acescg) {
            Some(token) => format!("{}{}", base, token),
            None => base.to_string(),
        };
    }

    if options.add_missing_suffix && trailing_token(&stem, suffixes).is_none() {
        if let Some(token) = suffixes.token(item.color_space()) {
            return format!("{}{}", stem, token);
        }
    }

    stem
}

/// `<dir>/<output stem>.<extension>` next to the source.
pub fn output_path(item: &TextureItem, options: &ConversionOptions, extension: &str) -> PathBuf {
    let file_name = format!("{}.{}", output_stem(item, options), extension);
    item.source_path().with_file_name(file_name)
}

fn trailing_token<'a>(stem: &str, suffixes: &'a SuffixTokens) -> Option<&'a str> {
    let lower = stem.to_lowercase();
    suffixes
        .iter()
        .map(|(_, t)| t)
        .find(|t| lower.ends_with(&t.to_lowercase()))
}

fn strip_trailing_token<'s>(stem: &'s str, suffixes: &SuffixTokens) -> &'s str {
    match trailing_token(stem, suffixes) {
        // tokens are ASCII in practice; fall back to the full stem otherwise
        Some(token) => stem.get(..stem.len() - token.len()).unwrap_or(stem),
        None => stem,
    }
}

/// Shared guard used by every builder before emitting arguments.
pub(crate) fn already_converted(item: &TextureItem) -> bool {
    is_output_extension(item.extension())
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
