//! tx_convert - color-space aware texture conversion
//!
//! Classifies texture files by filename convention, decides the color
//! transform and bit depth for each one, and drives an external texture
//! compiler (Arnold `maketx`, RenderMan `txmake` or Houdini `imaketx`) over
//! the whole set in bounded-concurrency groups.
//!
//! Flow: [`gather`] → [`classifier`] → [`rename`] (optional) →
//! [`scheduler`] → [`executor`] → [`commands`] → external process.

pub mod aces_config;
pub mod classifier;
pub mod color_space;
pub mod commands;
pub mod error;
pub mod executor;
pub mod gather;
pub mod options;
pub mod pipeline;
pub mod rename;
pub mod scheduler;
pub mod settings;
pub mod tools;

pub use aces_config::{detect_version, AcesVersion};
pub use classifier::{bit_depth, classify, Classifier};
pub use color_space::{BitDepth, ColorSpace, TextureItem};
pub use commands::{builder_for, BuildOutcome, CommandBuilder, Invocation};
pub use error::{Result, TxError};
pub use executor::{execute, ConversionResult, ProcessConverter};
pub use gather::{gather_dropped, gather_textures, group_textures, TextureGroups};
pub use options::{Backend, ConversionOptions, EnvBindings, SuffixTokens, ToolRole};
pub use pipeline::{convert_prepared, prepare, PreparedRun, TextureSource};
pub use rename::{rename_missing_suffixes, RenameReport};
pub use scheduler::{BatchEvent, BatchScheduler, BatchSummary, Converter};
pub use settings::Settings;
pub use tools::ToolPaths;

pub use shared_utils::CancelToken;
