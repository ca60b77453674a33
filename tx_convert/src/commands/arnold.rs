//! Arnold `maketx` builder (`.tx` output)

use super::{already_converted, output_path, path_arg, BuildOutcome, CommandBuilder, Invocation, DWAA};
use crate::aces_config::AcesVersion;
use crate::classifier::bit_depth;
use crate::color_space::TextureItem;
use crate::options::{Backend, ConversionOptions};
use std::path::PathBuf;

const OUTPUT_EXTENSION: &str = "tx";

#[derive(Debug, Clone)]
pub struct MaketxBuilder {
    program: PathBuf,
    ocio_config: Option<PathBuf>,
}

impl MaketxBuilder {
    pub fn new(program: PathBuf, ocio_config: Option<PathBuf>) -> Self {
        Self { program, ocio_config }
    }
}

impl CommandBuilder for MaketxBuilder {
    fn backend(&self) -> Backend {
        Backend::Arnold
    }

    fn build(&self, item: &TextureItem, options: &ConversionOptions, aces: AcesVersion) -> BuildOutcome {
        if already_converted(item) {
            return BuildOutcome::AlreadyConverted;
        }

        let output = output_path(item, options, OUTPUT_EXTENSION);
        let depth = bit_depth(item, options.hdri);

        let mut args = vec![
            "-v".to_string(),
            "-o".to_string(),
            path_arg(&output),
            "-u".to_string(),
            "--format".to_string(),
            "exr".to_string(),
            "-d".to_string(),
            depth.as_str().to_string(),
        ];

        if options.compression && !item.is_displacement() {
            args.extend(["--compression".to_string(), DWAA.to_string()]);
        }

        if let (Some(config), Some((src, dst))) = (&self.ocio_config, aces.transform_pair(item.color_space())) {
            args.extend([
                "--colorconfig".to_string(),
                path_arg(config),
                "--colorconvert".to_string(),
                src.to_string(),
                dst.to_string(),
            ]);
        }

        args.extend(["--oiio".to_string(), path_arg(item.source_path())]);

        BuildOutcome::Command(Invocation {
            backend: self.backend(),
            program: self.program.clone(),
            args,
            env: Vec::new(),
            output_path: output,
        })
    }
}
