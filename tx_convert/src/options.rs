//! Conversion options for one batch run.
//!
//! Built once at the UI boundary (CLI flags merged over persisted settings)
//! and passed by reference through every layer; nothing below reads
//! interface state directly.

use crate::color_space::ColorSpace;
use crate::error::{Result, TxError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 6;

/// Target texture compiler. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Arnold `maketx` → `.tx`
    Arnold,
    /// RenderMan `txmake` → `.tex` (`.b2r` for bump-to-roughness)
    RenderMan,
    /// Houdini `imaketx` → `.rat`
    Houdini,
}

impl Backend {
    /// Resolve independent on/off switches into a single backend.
    ///
    /// No switch selects Arnold; more than one is a configuration error.
    pub fn from_flags(arnold: bool, renderman: bool, houdini: bool) -> Result<Self> {
        let selected: Vec<Backend> = [
            (arnold, Backend::Arnold),
            (renderman, Backend::RenderMan),
            (houdini, Backend::Houdini),
        ]
        .into_iter()
        .filter_map(|(on, backend)| on.then_some(backend))
        .collect();

        match selected.as_slice() {
            [] => Ok(Backend::Arnold),
            [one] => Ok(*one),
            many => Err(TxError::ConflictingBackends(
                many.iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Backend::Arnold => "maketx",
            Backend::RenderMan => "txmake",
            Backend::Houdini => "imaketx",
        }
    }

    pub fn output_format(&self) -> &'static str {
        match self {
            Backend::Arnold => "Arnold .tx",
            Backend::RenderMan => "RenderMan .tex",
            Backend::Houdini => "Houdini .rat",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Arnold => "arnold",
            Backend::RenderMan => "renderman",
            Backend::Houdini => "houdini",
        };
        f.write_str(name)
    }
}

/// Filename tokens that make a color space explicit, e.g. `brick_raw.png`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuffixTokens {
    pub acescg: String,
    pub raw: String,
    pub srgb_texture: String,
    pub lin_srgb: String,
}

impl Default for SuffixTokens {
    fn default() -> Self {
        Self {
            acescg: "_acescg".to_string(),
            raw: "_raw".to_string(),
            srgb_texture: "_srgb_texture".to_string(),
            lin_srgb: "_lin_srgb".to_string(),
        }
    }
}

impl SuffixTokens {
    pub fn token(&self, color_space: ColorSpace) -> Option<&str> {
        let token = match color_space {
            ColorSpace::Acescg => &self.acescg,
            ColorSpace::Raw => &self.raw,
            ColorSpace::SrgbTexture => &self.srgb_texture,
            ColorSpace::LinSrgb => &self.lin_srgb,
            ColorSpace::Unknown => return None,
        };
        (!token.is_empty()).then_some(token.as_str())
    }

    /// Configured tokens in classifier priority order.
    pub fn iter(&self) -> impl Iterator<Item = (ColorSpace, &str)> + '_ {
        ColorSpace::TAGGED
            .into_iter()
            .filter_map(|cs| self.token(cs).map(|t| (cs, t)))
    }
}

/// Logical roles resolved through environment-style lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRole {
    /// Path to `maketx`
    Maketx,
    /// RenderMan install root; `txmake` lives in `bin/`
    RendermanRoot,
    /// Path to `imaketx`
    Imaketx,
    /// Active OCIO config file
    OcioConfig,
    /// Houdini install root, used to derive the default `imaketx` path
    HoudiniRoot,
}

/// Role → lookup key bindings. Studios rename these variables, so every
/// binding is configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvBindings {
    pub arnold: String,
    pub renderman: String,
    pub houdini: String,
    pub ocio: String,
    pub houdini_root: String,
}

impl Default for EnvBindings {
    fn default() -> Self {
        Self {
            arnold: "MAKETX_PATH".to_string(),
            renderman: "RMANTREE".to_string(),
            houdini: "IMAKETX_PATH".to_string(),
            ocio: "OCIO".to_string(),
            houdini_root: "HFS".to_string(),
        }
    }
}

impl EnvBindings {
    pub fn key(&self, role: ToolRole) -> &str {
        match role {
            ToolRole::Maketx => &self.arnold,
            ToolRole::RendermanRoot => &self.renderman,
            ToolRole::Imaketx => &self.houdini,
            ToolRole::OcioConfig => &self.ocio,
            ToolRole::HoudiniRoot => &self.houdini_root,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Name every output `_acescg`, replacing any existing color space token
    pub rename_to_acescg: bool,
    /// Add the classified token to names that have none (and rename sources)
    pub add_missing_suffix: bool,
    /// DWAA compression for everything except displacement
    pub compression: bool,
    pub backend: Backend,
    /// 32-bit float for all color (non-RAW) textures
    pub hdri: bool,
    /// TIF/TIFF without a token is sRGB-texture, otherwise linear sRGB
    pub tif_is_srgb: bool,
    /// RenderMan only: bump/normal maps become `.b2r` bump-roughness textures
    pub bump_to_rough: bool,
    pub concurrency: usize,
    /// Per-invocation limit; `None` waits forever
    pub timeout: Option<Duration>,
    pub suffixes: SuffixTokens,
    /// Extra case-insensitive substrings that imply a color space
    pub custom_patterns: BTreeMap<ColorSpace, Vec<String>>,
    pub env_bindings: EnvBindings,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            rename_to_acescg: false,
            add_missing_suffix: false,
            compression: true,
            backend: Backend::Arnold,
            hdri: false,
            tif_is_srgb: true,
            bump_to_rough: false,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            suffixes: SuffixTokens::default(),
            custom_patterns: BTreeMap::new(),
            env_bindings: EnvBindings::default(),
        }
    }
}

impl ConversionOptions {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(TxError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }

    /// Whether the classifier should propose renamed paths.
    pub fn suggests_renames(&self) -> bool {
        self.add_missing_suffix || self.rename_to_acescg
    }

    pub fn custom_patterns_for(&self, color_space: ColorSpace) -> &[String] {
        self.custom_patterns
            .get(&color_space)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_flags() {
        assert_eq!(Backend::from_flags(false, false, false).unwrap(), Backend::Arnold);
        assert_eq!(Backend::from_flags(true, false, false).unwrap(), Backend::Arnold);
        assert_eq!(Backend::from_flags(false, true, false).unwrap(), Backend::RenderMan);
        assert_eq!(Backend::from_flags(false, false, true).unwrap(), Backend::Houdini);
    }

    #[test]
    fn test_conflicting_backends_fail_fast() {
        let err = Backend::from_flags(false, true, true).unwrap_err();
        assert!(matches!(err, TxError::ConflictingBackends(ref names) if names == "renderman, houdini"));
        assert!(err.is_precondition());
        assert!(Backend::from_flags(true, true, true).is_err());
    }

    #[test]
    fn test_suffix_tokens_priority_order() {
        let tokens = SuffixTokens::default();
        let order: Vec<_> = tokens.iter().map(|(cs, _)| cs).collect();
        assert_eq!(order, ColorSpace::TAGGED.to_vec());
        assert_eq!(tokens.token(ColorSpace::Unknown), None);
    }

    #[test]
    fn test_empty_token_is_disabled() {
        let tokens = SuffixTokens {
            acescg: String::new(),
            ..SuffixTokens::default()
        };
        assert_eq!(tokens.token(ColorSpace::Acescg), None);
        assert_eq!(tokens.iter().count(), 3);
    }

    #[test]
    fn test_env_binding_keys() {
        let bindings = EnvBindings {
            arnold: "STUDIO_MAKETX".to_string(),
            ..EnvBindings::default()
        };
        assert_eq!(bindings.key(ToolRole::Maketx), "STUDIO_MAKETX");
        assert_eq!(bindings.key(ToolRole::RendermanRoot), "RMANTREE");
        assert_eq!(bindings.key(ToolRole::OcioConfig), "OCIO");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let options = ConversionOptions {
            concurrency: 0,
            ..ConversionOptions::default()
        };
        assert!(matches!(options.validate(), Err(TxError::InvalidConcurrency(0))));
        assert!(ConversionOptions::default().validate().is_ok());
    }
}
