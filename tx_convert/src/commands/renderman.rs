//! RenderMan `txmake` builder (`.tex`, or `.b2r` for bump-to-roughness)

use super::{already_converted, output_path, path_arg, BuildOutcome, CommandBuilder, Invocation, DWAA};
use crate::aces_config::AcesVersion;
use crate::classifier::bit_depth;
use crate::color_space::{BitDepth, TextureItem};
use crate::options::{Backend, ConversionOptions};
use std::path::PathBuf;

const OUTPUT_EXTENSION: &str = "tex";
const BUMP_ROUGH_EXTENSION: &str = "b2r";

/// `-bumprough` directive: map type, scale, invert U, invert V, flip, refit.
const BUMPROUGH_NORMAL: [&str; 6] = ["2", "0", "1", "0", "0", "1"];
const BUMPROUGH_HEIGHT: [&str; 6] = ["-1", "0", "1", "0", "0", "1"];

#[derive(Debug, Clone)]
pub struct TxmakeBuilder {
    program: PathBuf,
    ocio_config: Option<PathBuf>,
}

impl TxmakeBuilder {
    pub fn new(program: PathBuf, ocio_config: Option<PathBuf>) -> Self {
        Self { program, ocio_config }
    }
}

fn depth_flag(depth: BitDepth) -> &'static str {
    match depth {
        BitDepth::Uint8 => "-byte",
        BitDepth::Uint16 => "-short",
        BitDepth::Half => "-half",
        BitDepth::Float => "-float",
    }
}

impl CommandBuilder for TxmakeBuilder {
    fn backend(&self) -> Backend {
        Backend::RenderMan
    }

    fn build(&self, item: &TextureItem, options: &ConversionOptions, aces: AcesVersion) -> BuildOutcome {
        if already_converted(item) {
            return BuildOutcome::AlreadyConverted;
        }

        let bump_rough = options.bump_to_rough && (item.is_bump() || item.is_normal());
        let extension = if bump_rough { BUMP_ROUGH_EXTENSION } else { OUTPUT_EXTENSION };
        let output = output_path(item, options, extension);

        let mut args = vec!["-format".to_string(), "openexr".to_string()];
        if options.compression && !item.is_displacement() {
            args.extend(["-compression".to_string(), DWAA.to_string()]);
        }
        args.push(depth_flag(bit_depth(item, options.hdri)).to_string());
        args.extend(
            ["-resize", "round-", "-mode", "periodic"]
                .into_iter()
                .map(String::from),
        );

        if let (Some(config), Some((src, dst))) = (&self.ocio_config, aces.transform_pair(item.color_space())) {
            args.extend([
                "-ocioconfig".to_string(),
                path_arg(config),
                "-ocioconvert".to_string(),
                src.to_string(),
                dst.to_string(),
            ]);
        }

        if bump_rough {
            let params = if item.is_normal() { BUMPROUGH_NORMAL } else { BUMPROUGH_HEIGHT };
            args.push("-bumprough".to_string());
            args.extend(params.into_iter().map(String::from));
        }

        args.push(path_arg(item.source_path()));
        args.push(path_arg(&output));

        BuildOutcome::Command(Invocation {
            backend: self.backend(),
            program: self.program.clone(),
            args,
            env: Vec::new(),
            output_path: output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::item;
    use super::*;

    fn build(name: &str, options: &ConversionOptions) -> Invocation {
        let builder = TxmakeBuilder::new("txmake".into(), Some("/aces/config.ocio".into()));
        match builder.build(&item(name, options), options, AcesVersion::V1_3) {
            BuildOutcome::Command(inv) => inv,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_color_texture_argv() {
        let inv = build("/t/brick.png", &ConversionOptions::default());
        assert_eq!(
            inv.args,
            vec![
                "-format", "openexr", "-compression", "dwaa", "-half",
                "-resize", "round-", "-mode", "periodic",
                "-ocioconfig", "/aces/config.ocio",
                "-ocioconvert", "sRGB - Texture", "ACEScg",
                "/t/brick.png", "/t/brick.tex",
            ]
        );
    }

    #[test]
    fn test_depth_flags() {
        let options = ConversionOptions::default();
        assert!(build("/t/a.jpg", &options).has_arg("-byte"));
        assert!(build("/t/a.tga", &options).has_arg("-short"));
        assert!(build("/t/a_disp.exr", &options).has_arg("-float"));
        let hdri = ConversionOptions {
            hdri: true,
            ..ConversionOptions::default()
        };
        assert!(build("/t/a.jpg", &hdri).has_arg("-float"));
    }

    #[test]
    fn test_bump_to_rough_only_when_enabled() {
        let plain = build("/t/rock_normal.png", &ConversionOptions::default());
        assert!(!plain.has_arg("-bumprough"));
        assert_eq!(plain.output_path, PathBuf::from("/t/rock_normal.tex"));

        let options = ConversionOptions {
            bump_to_rough: true,
            ..ConversionOptions::default()
        };
        let normal = build("/t/rock_normal.png", &options);
        assert_eq!(normal.output_path, PathBuf::from("/t/rock_normal.b2r"));
        let pos = normal.args.iter().position(|a| a == "-bumprough").unwrap();
        assert_eq!(normal.args[pos + 1..pos + 7], BUMPROUGH_NORMAL);

        let height = build("/t/cliff_height.png", &options);
        let pos = height.args.iter().position(|a| a == "-bumprough").unwrap();
        assert_eq!(height.args[pos + 1..pos + 7], BUMPROUGH_HEIGHT);
        assert_eq!(height.args.last().unwrap(), "/t/cliff_height.b2r");

        // color maps are unaffected
        assert!(!build("/t/brick.png", &options).has_arg("-bumprough"));
    }

    #[test]
    fn test_displacement_skips_compression() {
        let inv = build("/t/cliff_displacement.exr", &ConversionOptions::default());
        assert!(!inv.has_arg("-compression"));
    }
}
