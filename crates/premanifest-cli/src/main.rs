mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{exit_code_for, Context};
use premanifest_core::{BuildInput, DEFAULT_RUNTIME_ROOT};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "premanifest",
    version,
    about = "Compile pre-manifests into signed Graphene-SGX enclave manifests"
)]
struct Cli {
    /// Graphene root directory (holds Runtime/).
    #[arg(short, long, default_value = DEFAULT_RUNTIME_ROOT, global = true)]
    graphene: PathBuf,

    /// Tool configuration file [default: ~/.config/premanifest/tools.toml].
    #[arg(long, global = true)]
    tool_config: Option<PathBuf>,

    /// Directory holding pal-sgx-sign and pal-sgx-get-token (otherwise $PATH).
    #[arg(short, long, global = true)]
    tool_dir: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging and show tool stderr.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile a pre-manifest into a manifest.
    Compile {
        /// Pre-manifest file.
        conf: PathBuf,
        /// Output manifest [default: <CONF>.manifest.sgx].
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse a pre-manifest without running any external tool.
    Check {
        /// Pre-manifest file.
        conf: PathBuf,
    },
    /// Compile, sign, and fetch a launch token for an enclave.
    Build {
        /// Private key used to sign the enclave image.
        #[arg(short, long)]
        key: PathBuf,
        /// Pre-manifest to compile.
        #[arg(
            short,
            long = "pre-manifest",
            conflicts_with = "manifest",
            required_unless_present = "manifest"
        )]
        pre_manifest: Option<PathBuf>,
        /// Existing manifest to sign as-is.
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Output directory; also names the final <DIR>.manifest.sgx.
        #[arg(short, long)]
        outdir: Option<PathBuf>,
    },
    /// Check external tools and the Graphene runtime layout.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PREMANIFEST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let ctx = Context {
        graphene: cli.graphene,
        tool_config: cli.tool_config,
        tool_dir: cli.tool_dir,
        verbose: cli.verbose || cli.trace,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Compile { conf, output } => commands::compile::run(&ctx, &conf, output.as_deref()),
        Commands::Check { conf } => commands::check::run(&conf, ctx.json),
        Commands::Build {
            key,
            pre_manifest,
            manifest,
            outdir,
        } => match (pre_manifest, manifest) {
            (Some(conf), _) => {
                commands::build::run(&ctx, BuildInput::PreManifest(conf), &key, outdir)
            }
            (None, Some(path)) => {
                commands::build::run(&ctx, BuildInput::Manifest(path), &key, outdir)
            }
            (None, None) => Err("either --pre-manifest or --manifest is required".to_owned()),
        },
        Commands::Doctor => commands::doctor::run(&ctx),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
