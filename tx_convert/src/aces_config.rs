//! ACES/OCIO config inspector
//!
//! Named color spaces differ between config generations (`Utility - sRGB - Texture`
//! in the ACES 1.0.3 config, `sRGB - Texture` in the 1.3 CG/studio configs).
//! A short scan of the config head is enough to tell them apart.

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use crate::color_space::ColorSpace;

const SCAN_LINES: usize = 500;

const MARKERS_1_3: &[&str] = &[
    "ocio_profile_version: 2",
    "aces-v1.3",
    "Linear Rec.709 (sRGB)",
];

const MARKERS_1_0_3: &[&str] = &[
    "ocio_profile_version: 1",
    "Utility - Linear - sRGB",
    "Utility - sRGB - Texture",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcesVersion {
    V1_3,
    V1_0_3,
    Unknown,
}

impl AcesVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcesVersion::V1_3 => "1.3",
            AcesVersion::V1_0_3 => "1.0.3",
            AcesVersion::Unknown => "unknown",
        }
    }

    /// Source → target named transform for a color space, `None` when the
    /// data must not be converted. Unknown configs use the 1.0.3 names.
    pub fn transform_pair(&self, color_space: ColorSpace) -> Option<(&'static str, &'static str)> {
        if !color_space.needs_transform() {
            return None;
        }
        let newer = matches!(self, AcesVersion::V1_3);
        let target = if newer { "ACEScg" } else { "ACES - ACEScg" };
        let source = match (color_space == ColorSpace::LinSrgb, newer) {
            (true, true) => "Linear Rec.709 (sRGB)",
            (true, false) => "Utility - Linear - sRGB",
            (false, true) => "sRGB - Texture",
            (false, false) => "Utility - sRGB - Texture",
        };
        Some((source, target))
    }
}

impl fmt::Display for AcesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort version detection; never fails.
///
/// Missing, unreadable or unrecognized configs report [`AcesVersion::Unknown`].
pub fn detect_version(config_path: Option<&Path>) -> AcesVersion {
    let Some(path) = config_path.filter(|p| !p.as_os_str().is_empty()) else {
        return AcesVersion::Unknown;
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read color config");
            return AcesVersion::Unknown;
        }
    };

    let version = scan(BufReader::new(file));
    debug!(path = %path.display(), version = %version, "Detected ACES config version");
    version
}

fn scan<R: BufRead>(reader: R) -> AcesVersion {
    for line in reader.lines().take(SCAN_LINES).map_while(Result::ok) {
        if MARKERS_1_3.iter().any(|m| line.contains(m)) {
            return AcesVersion::V1_3;
        }
        if MARKERS_1_0_3.iter().any(|m| line.contains(m)) {
            return AcesVersion::V1_0_3;
        }
    }
    AcesVersion::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_detects_newer_config() {
        let config = "ocio_profile_version: 2.1\n\nname: studio-config-v1.0.0_aces-v1.3_ocio-v2.1\n";
        assert_eq!(scan(Cursor::new(config)), AcesVersion::V1_3);
    }

    #[test]
    fn test_detects_older_config() {
        let config = "ocio_profile_version: 1\n\nsearch_path: luts\n";
        assert_eq!(scan(Cursor::new(config)), AcesVersion::V1_0_3);

        let by_name = "roles:\n  color_picking: Utility - sRGB - Texture\n";
        assert_eq!(scan(Cursor::new(by_name)), AcesVersion::V1_0_3);
    }

    #[test]
    fn test_markers_past_scan_window_are_ignored() {
        let mut config = "# padding\n".repeat(SCAN_LINES);
        config.push_str("ocio_profile_version: 2\n");
        assert_eq!(scan(Cursor::new(config)), AcesVersion::Unknown);
    }

    #[test]
    fn test_missing_or_empty_path_is_unknown() {
        assert_eq!(detect_version(None), AcesVersion::Unknown);
        assert_eq!(detect_version(Some(Path::new(""))), AcesVersion::Unknown);
        assert_eq!(
            detect_version(Some(Path::new("/definitely/not/here/config.ocio"))),
            AcesVersion::Unknown
        );
    }

    #[test]
    fn test_detect_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ocio");
        std::fs::write(&path, "ocio_profile_version: 1\n").unwrap();
        assert_eq!(detect_version(Some(&path)), AcesVersion::V1_0_3);

        std::fs::write(&path, [0xffu8, 0xfe, 0x00, 0x01]).unwrap();
        assert_eq!(detect_version(Some(&path)), AcesVersion::Unknown);
    }

    #[test]
    fn test_transform_pairs() {
        assert_eq!(
            AcesVersion::V1_3.transform_pair(ColorSpace::SrgbTexture),
            Some(("sRGB - Texture", "ACEScg"))
        );
        assert_eq!(
            AcesVersion::V1_0_3.transform_pair(ColorSpace::LinSrgb),
            Some(("Utility - Linear - sRGB", "ACES - ACEScg"))
        );
        assert_eq!(
            AcesVersion::Unknown.transform_pair(ColorSpace::SrgbTexture),
            AcesVersion::V1_0_3.transform_pair(ColorSpace::SrgbTexture)
        );
        for version in [AcesVersion::V1_3, AcesVersion::V1_0_3, AcesVersion::Unknown] {
            assert_eq!(version.transform_pair(ColorSpace::Raw), None);
            assert_eq!(version.transform_pair(ColorSpace::Acescg), None);
        }
    }
}
