//! Houdini `imaketx` builder (`.rat` output)

use super::{already_converted, output_path, path_arg, BuildOutcome, CommandBuilder, Invocation};
use crate::aces_config::AcesVersion;
use crate::color_space::TextureItem;
use crate::options::{Backend, ConversionOptions};
use std::path::PathBuf;

const OUTPUT_EXTENSION: &str = "rat";

#[derive(Debug, Clone)]
pub struct ImaketxBuilder {
    program: PathBuf,
    ocio_config: Option<PathBuf>,
}

impl ImaketxBuilder {
    pub fn new(program: PathBuf, ocio_config: Option<PathBuf>) -> Self {
        Self { program, ocio_config }
    }

    fn color_mode(&self) -> &'static str {
        if self.ocio_config.is_some() {
            "ocio"
        } else {
            "builtin"
        }
    }
}

impl CommandBuilder for ImaketxBuilder {
    fn backend(&self) -> Backend {
        Backend::Houdini
    }

    fn build(&self, item: &TextureItem, options: &ConversionOptions, aces: AcesVersion) -> BuildOutcome {
        if already_converted(item) {
            return BuildOutcome::AlreadyConverted;
        }

        let output = output_path(item, options, OUTPUT_EXTENSION);
        let mut args = vec!["--format".to_string(), "rat".to_string()];
        let mut env = Vec::new();

        if let Some((src, dst)) = aces.transform_pair(item.color_space()) {
            args.extend([
                "--colorspace-mode".to_string(),
                self.color_mode().to_string(),
                "--colorconvert".to_string(),
                src.to_string(),
                dst.to_string(),
            ]);
            // imaketx reads the config from the environment only
            if let Some(config) = &self.ocio_config {
                env.push(("OCIO".to_string(), path_arg(config)));
            }
        }

        args.push(path_arg(item.source_path()));
        args.push(path_arg(&output));

        BuildOutcome::Command(Invocation {
            backend: self.backend(),
            program: self.program.clone(),
            args,
            env,
            output_path: output,
        })
    }
}
