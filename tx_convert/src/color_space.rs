//! Texture value types: color space labels, bit depths and the classified
//! texture record consumed by the command builders and the scheduler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    Acescg,
    Raw,
    SrgbTexture,
    LinSrgb,
    Unknown,
}

impl ColorSpace {
    /// Labels that can be written into a filename, in classifier priority order.
    pub const TAGGED: [ColorSpace; 4] = [
        ColorSpace::Acescg,
        ColorSpace::Raw,
        ColorSpace::SrgbTexture,
        ColorSpace::LinSrgb,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ColorSpace::Acescg => "acescg",
            ColorSpace::Raw => "raw",
            ColorSpace::SrgbTexture => "srgb_texture",
            ColorSpace::LinSrgb => "lin_srgb",
            ColorSpace::Unknown => "unknown",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ColorSpace::Unknown)
    }

    /// Only display-referred and linear sRGB data is converted to ACEScg.
    /// RAW data must stay untouched and ACEScg is already the target.
    pub fn needs_transform(&self) -> bool {
        matches!(self, ColorSpace::SrgbTexture | ColorSpace::LinSrgb)
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitDepth {
    Uint8,
    Uint16,
    Half,
    Float,
}

impl BitDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            BitDepth::Uint8 => "uint8",
            BitDepth::Uint16 => "uint16",
            BitDepth::Half => "half",
            BitDepth::Float => "float",
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified texture. Built only by the classifier; reclassifying a file
/// produces a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureItem {
    pub(crate) source_path: PathBuf,
    pub(crate) extension: String,
    pub(crate) color_space: ColorSpace,
    pub(crate) renderer_hint: String,
    pub(crate) is_displacement: bool,
    pub(crate) is_bump: bool,
    pub(crate) is_normal: bool,
    pub(crate) suggested_rename: Option<PathBuf>,
}

impl TextureItem {
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Lowercase extension including the leading dot, empty when absent.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Free-form renderer option hint, e.g. `-d float` for non-color data.
    pub fn renderer_hint(&self) -> &str {
        &self.renderer_hint
    }

    pub fn is_displacement(&self) -> bool {
        self.is_displacement
    }

    pub fn is_bump(&self) -> bool {
        self.is_bump
    }

    pub fn is_normal(&self) -> bool {
        self.is_normal
    }

    pub fn suggested_rename(&self) -> Option<&Path> {
        self.suggested_rename.as_deref()
    }

    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    pub fn file_stem(&self) -> String {
        self.source_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_filename_tokens() {
        let labels: Vec<_> = ColorSpace::TAGGED.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["acescg", "raw", "srgb_texture", "lin_srgb"]);
        assert_eq!(ColorSpace::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_only_srgb_variants_need_transform() {
        assert!(ColorSpace::SrgbTexture.needs_transform());
        assert!(ColorSpace::LinSrgb.needs_transform());
        assert!(!ColorSpace::Raw.needs_transform());
        assert!(!ColorSpace::Acescg.needs_transform());
        assert!(!ColorSpace::Unknown.needs_transform());
    }

    #[test]
    fn test_color_space_serializes_as_label() {
        let json = serde_json::to_string(&ColorSpace::SrgbTexture).unwrap();
        assert_eq!(json, "\"srgb_texture\"");
        let back: ColorSpace = serde_json::from_str("\"lin_srgb\"").unwrap();
        assert_eq!(back, ColorSpace::LinSrgb);
    }

    #[test]
    fn test_bit_depth_names() {
        let names: Vec<_> = [BitDepth::Uint8, BitDepth::Uint16, BitDepth::Half, BitDepth::Float]
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(names, vec!["uint8", "uint16", "half", "float"]);
    }
}
