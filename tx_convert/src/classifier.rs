//! Color-space classifier
//!
//! Maps a texture filename to a color space label using an explicit, ordered
//! rule list (first match wins):
//!
//! 1. explicit tokens already in the stem: ACEScg, RAW, sRGB-texture,
//!    linear sRGB, each extended by user synonyms (case-insensitive substring)
//! 2. the non-color data family (depth, displacement, normal/bump, masks,
//!    roughness/metalness/specular/ao/cavity/opacity) → RAW, force float
//! 3. extension defaults: `.exr` → linear sRGB, `.tif`/`.tiff` → per option,
//!    other source formats → sRGB-texture, anything else → unknown
//!
//! ACEScg is checked first: older naming put `_acescg` on files that also
//! carried other tokens.
//!
//! Displacement/bump/normal detection runs independently over the same stem
//! and only feeds bit-depth and bump-roughness decisions.

use crate::color_space::{BitDepth, ColorSpace, TextureItem};
use crate::gather::SOURCE_EXTENSIONS;
use crate::options::{ConversionOptions, SuffixTokens};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const FORCE_FLOAT_HINT: &str = "-d float";

static NON_COLOR_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"_depth|_disp|_displacement|_zdisp|_normal|_nrm|_norm|_n(?:[^a-z]|$)|_mask|_rough|_metal",
        r"|_gloss|_spec|_ao|_cavity|_bump|_height|_opacity|_roughness|_r(?:[^a-z]|$)|_roughnes",
        r"|_specularity|_specs|_metalness|_metalnes",
    ))
    .expect("Invalid non-color data pattern")
});

static NORMAL_MAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_normal|_nrm|_norm|_n(?:[^a-z]|$)").expect("Invalid normal map pattern")
});

const DISPLACEMENT_TOKENS: &[&str] = &["_disp", "_displacement", "_zdisp"];
const BUMP_TOKENS: &[&str] = &["_bump", "_height"];

const LDR_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".gif", ".bmp"];
const HALF_EXTENSIONS: &[&str] = &[".png", ".tif", ".tiff", ".exr"];

#[derive(Debug, Clone)]
enum Predicate {
    /// Lowercased substrings, any of which matches
    Substrings(Vec<String>),
    Pattern(&'static LazyLock<Regex>),
}

impl Predicate {
    fn matches(&self, stem_lower: &str) -> bool {
        match self {
            Predicate::Substrings(needles) => needles.iter().any(|n| stem_lower.contains(n.as_str())),
            Predicate::Pattern(re) => re.is_match(stem_lower),
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    name: &'static str,
    predicate: Predicate,
    color_space: ColorSpace,
    hint: &'static str,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
    /// Lowercased configured tokens, for "already suffixed" checks
    tokens: Vec<(ColorSpace, String)>,
    suffixes: SuffixTokens,
    tif_is_srgb: bool,
    suggest_renames: bool,
}

impl Classifier {
    pub fn new(options: &ConversionOptions) -> Self {
        let mut rules = Vec::with_capacity(5);

        for (color_space, token) in options.suffixes.iter() {
            let mut needles = vec![token.to_lowercase()];
            needles.extend(
                options
                    .custom_patterns_for(color_space)
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(|p| p.to_lowercase()),
            );
            rules.push(Rule {
                name: "explicit token",
                predicate: Predicate::Substrings(needles),
                color_space,
                hint: hint_for(color_space),
            });
        }

        rules.push(Rule {
            name: "non-color data",
            predicate: Predicate::Pattern(&NON_COLOR_DATA),
            color_space: ColorSpace::Raw,
            hint: FORCE_FLOAT_HINT,
        });

        let tokens = options
            .suffixes
            .iter()
            .map(|(cs, t)| (cs, t.to_lowercase()))
            .collect();

        Self {
            rules,
            tokens,
            suffixes: options.suffixes.clone(),
            tif_is_srgb: options.tif_is_srgb,
            suggest_renames: options.suggests_renames(),
        }
    }

    /// Rule order as (rule name, color space), highest priority first.
    pub fn precedence(&self) -> Vec<(&'static str, ColorSpace)> {
        self.rules.iter().map(|r| (r.name, r.color_space)).collect()
    }

    /// Classify using the path's own extension.
    pub fn classify(&self, path: &Path) -> TextureItem {
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        self.classify_with_extension(path, &extension)
    }

    pub fn classify_with_extension(&self, path: &Path, extension: &str) -> TextureItem {
        let extension = normalize_extension(extension);
        let stem_lower = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let (color_space, hint) = self.color_space_for(&stem_lower, &extension);

        let suggested_rename = if self.suggest_renames && color_space.is_recognized() {
            self.suggest_rename(path, color_space, &stem_lower)
        } else {
            None
        };

        TextureItem {
            source_path: path.to_path_buf(),
            is_displacement: DISPLACEMENT_TOKENS.iter().any(|t| stem_lower.contains(t)),
            is_bump: BUMP_TOKENS.iter().any(|t| stem_lower.contains(t)),
            is_normal: NORMAL_MAP.is_match(&stem_lower),
            extension,
            color_space,
            renderer_hint: hint.to_string(),
            suggested_rename,
        }
    }

    fn color_space_for(&self, stem_lower: &str, extension: &str) -> (ColorSpace, &'static str) {
        if let Some(rule) = self.rules.iter().find(|r| r.predicate.matches(stem_lower)) {
            return (rule.color_space, rule.hint);
        }

        let color_space = match extension {
            ".exr" => ColorSpace::LinSrgb,
            ".tif" | ".tiff" if self.tif_is_srgb => ColorSpace::SrgbTexture,
            ".tif" | ".tiff" => ColorSpace::LinSrgb,
            ext if is_source_extension(ext) => ColorSpace::SrgbTexture,
            _ => ColorSpace::Unknown,
        };
        (color_space, "")
    }

    fn suggest_rename(&self, path: &Path, color_space: ColorSpace, stem_lower: &str) -> Option<PathBuf> {
        if self.tokens.iter().any(|(_, t)| stem_lower.contains(t.as_str())) {
            return None;
        }
        let token = self.suffixes.token(color_space)?;
        let stem = path.file_stem()?.to_string_lossy();
        let file_name = match path.extension() {
            Some(ext) => format!("{}{}.{}", stem, token, ext.to_string_lossy()),
            None => format!("{}{}", stem, token),
        };
        Some(path.with_file_name(file_name))
    }
}

/// One-shot classification: `(path, extension, options)` → texture record.
pub fn classify(path: &Path, extension: &str, options: &ConversionOptions) -> TextureItem {
    Classifier::new(options).classify_with_extension(path, extension)
}

/// Output precision for a classified texture.
///
/// Displacement is always float; HDRI mode lifts every color texture to
/// float; otherwise the source format family decides.
pub fn bit_depth(item: &TextureItem, hdri: bool) -> BitDepth {
    if item.is_displacement() {
        return BitDepth::Float;
    }
    if hdri && item.color_space() != ColorSpace::Raw {
        return BitDepth::Float;
    }
    let ext = item.extension();
    if LDR_EXTENSIONS.contains(&ext) {
        BitDepth::Uint8
    } else if HALF_EXTENSIONS.contains(&ext) {
        BitDepth::Half
    } else {
        BitDepth::Uint16
    }
}

fn hint_for(color_space: ColorSpace) -> &'static str {
    if color_space == ColorSpace::Raw {
        FORCE_FLOAT_HINT
    } else {
        ""
    }
}

fn normalize_extension(extension: &str) -> String {
    let lower = extension.trim().to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

fn is_source_extension(ext: &str) -> bool {
    ext.strip_prefix('.')
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}
