use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{print_simple_summary, print_summary_report, BatchProgress};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tx_convert::{
    convert_prepared, gather_textures, group_textures, prepare, Backend, BatchEvent, BatchScheduler, CancelToken,
    Classifier, ConversionOptions, Settings, TextureSource, ToolPaths, TxError,
};

#[derive(Parser)]
#[command(name = "tx-convert")]
#[command(version, about = "Color-space aware batch texture converter (maketx / txmake / imaketx)", long_about = None)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Log file directory (defaults to the system temp directory)
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the textures in a folder grouped by detected color space
    Load {
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,

        #[arg(long)]
        no_recursive: bool,

        /// Untagged TIF/TIFF files are linear sRGB instead of sRGB-texture
        #[arg(long)]
        tif_linear: bool,
    },

    /// Convert a folder, or an explicit list of files
    #[command(name = "run")]
    Run(RunArgs),

    /// Print the effective settings
    Settings {
        /// Only print the settings file location
        #[arg(long)]
        path: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// A single folder, or any number of texture files
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    #[arg(long)]
    no_recursive: bool,

    /// Name every output `_acescg`
    #[arg(long)]
    rename_to_acescg: bool,

    /// Rename sources without a color space token before converting
    #[arg(long)]
    add_missing_suffix: bool,

    #[arg(long)]
    no_compression: bool,

    #[arg(long)]
    arnold: bool,

    #[arg(long)]
    renderman: bool,

    #[arg(long)]
    houdini: bool,

    /// 32-bit float for all color textures
    #[arg(long)]
    hdri: bool,

    #[arg(long)]
    tif_linear: bool,

    /// RenderMan only: convert bump/normal maps to bump-roughness (.b2r)
    #[arg(long)]
    bump_to_rough: bool,

    /// Textures converted simultaneously (overrides settings)
    #[arg(short = 'j', long, value_name = "N")]
    batch_size: Option<usize>,

    /// Per-texture compiler timeout in seconds (overrides settings)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_settings: bool,

    /// Plain output: no progress bar, per-texture results as JSON at the end
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.verbose {
        LogConfig::default()
            .with_file_level(Level::DEBUG)
            .with_stderr_level(Some(Level::DEBUG))
    } else {
        LogConfig::default()
    };
    if let Some(dir) = &cli.log_dir {
        config = config.with_log_dir(dir);
    }
    if let Err(e) = init_logging("tx_convert", config) {
        eprintln!("⚠️  Logging disabled: {:#}", e);
    }

    let settings_path = cli.settings.clone().or_else(Settings::default_path);
    let settings = match &settings_path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Load {
            folder,
            no_recursive,
            tif_linear,
        } => {
            let mut options = ConversionOptions {
                tif_is_srgb: !tif_linear,
                ..ConversionOptions::default()
            };
            settings.apply(&mut options);
            load(&folder, !no_recursive, &options)?;
        }

        Commands::Run(args) => run(args, settings, settings_path.as_deref())?,

        Commands::Settings { path } => {
            if path {
                match &settings_path {
                    Some(p) => println!("{}", p.display()),
                    None => println!("(no settings location on this platform)"),
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
        }
    }

    Ok(())
}

fn load(folder: &Path, recursive: bool, options: &ConversionOptions) -> anyhow::Result<()> {
    let textures = match gather_textures(folder, recursive) {
        Ok(textures) => textures,
        Err(e) => precondition_exit(e),
    };
    let classifier = Classifier::new(options);
    let items: Vec<_> = textures.iter().map(|p| classifier.classify(p)).collect();
    let groups = group_textures(&items);

    println!("{}", groups);
    println!("Loaded {} textures.", groups.total);
    Ok(())
}

fn run(args: RunArgs, settings: Settings, settings_path: Option<&Path>) -> anyhow::Result<()> {
    let backend = match Backend::from_flags(args.arnold, args.renderman, args.houdini) {
        Ok(backend) => backend,
        Err(e) => precondition_exit(e),
    };

    let mut options = ConversionOptions {
        rename_to_acescg: args.rename_to_acescg,
        add_missing_suffix: args.add_missing_suffix,
        compression: !args.no_compression,
        backend,
        hdri: args.hdri,
        tif_is_srgb: !args.tif_linear,
        bump_to_rough: args.bump_to_rough,
        ..ConversionOptions::default()
    };
    settings.apply(&mut options);
    if let Some(n) = args.batch_size {
        options.concurrency = n;
    }
    if let Some(secs) = args.timeout {
        options.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if options.bump_to_rough && options.backend != Backend::RenderMan {
        eprintln!("⚠️  --bump-to-rough only affects RenderMan output");
    }

    if args.save_settings {
        let path = settings_path.context("No settings location available; pass --settings")?;
        Settings::from_options(&options).save(path)?;
        eprintln!("💾 Settings saved to {}", path.display());
    }

    let source = match args.inputs.as_slice() {
        [single] if single.is_dir() => TextureSource::Folder {
            root: single.clone(),
            recursive: !args.no_recursive,
        },
        files => TextureSource::Files(files.to_vec()),
    };

    let json = args.json;
    let prepared = match prepare(&source, &options, |line| {
        if json {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }) {
        Ok(prepared) => prepared,
        Err(e) if e.is_precondition() => precondition_exit(e),
        Err(e) => return Err(e.into()),
    };

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\n⏹️  Cancelling batch...");
        handler_token.cancel();
    }) {
        eprintln!("⚠️  Ctrl-C handler not installed: {}", e);
    }

    let scheduler = BatchScheduler::new(options.concurrency)?.with_cancel(cancel);
    let tools = ToolPaths::resolve(&options.env_bindings);

    let start = Instant::now();
    let total = prepared.total() as u64;
    let mut progress = if args.json {
        BatchProgress::hidden(total)
    } else {
        BatchProgress::new(total, "Converting")
    };
    let summary = convert_prepared(&prepared, &options, &tools, &scheduler, |event| match event {
        BatchEvent::Log(line) => progress.println(&line),
        BatchEvent::Progress { processed, .. } => progress.set_processed(processed as u64),
        BatchEvent::Finished(_) => progress.finish("Conversion process completed."),
    })?;

    info!(
        succeeded = summary.result.succeeded,
        failed = summary.result.failed,
        "Run complete"
    );
    if args.json {
        print_simple_summary(&summary.result);
        println!("{}", serde_json::to_string_pretty(&summary.results)?);
    } else {
        print_summary_report(&summary.result, start.elapsed(), "Texture Conversion");
    }

    if summary.result.failed > 0 || summary.cancelled {
        std::process::exit(1);
    }
    Ok(())
}

fn precondition_exit(e: TxError) -> ! {
    eprintln!("⚠️  {}", e);
    std::process::exit(2);
}
