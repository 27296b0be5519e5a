//! Stevedore CLI - Generate Helm charts from compose projects

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stevedore_convert::ConvertOptions;
use stevedore_convert::converter::DEFAULT_CHART_VERSION;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(author = "Stevedore Contributors")]
#[command(version)]
#[command(about = "Generate Helm charts from compose projects", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show progress logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a compose project into a Helm chart
    Convert {
        /// Compose file, or a directory holding one
        #[arg(short = 'c', long = "compose-file", default_value = ".")]
        compose: PathBuf,

        /// Chart output directory
        #[arg(short, long, default_value = "./chart")]
        output: PathBuf,

        /// Overwrite the output directory
        #[arg(short, long)]
        force: bool,

        /// Show what would be generated without writing
        #[arg(long)]
        dry_run: bool,

        /// Chart name (defaults to the compose project name)
        #[arg(short = 'n', long)]
        app_name: Option<String>,

        /// Chart version
        #[arg(long, default_value = DEFAULT_CHART_VERSION)]
        chart_version: String,

        /// Chart appVersion (defaults to the main-app image tag)
        #[arg(short = 'a', long)]
        app_version: Option<String>,

        /// Chart icon URL
        #[arg(short = 'i', long)]
        icon: Option<String>,

        /// Chart description
        #[arg(long)]
        description: Option<String>,
    },

    /// Describe the stevedore.io labels
    Labels {
        /// Label name (e.g. `ingress`)
        name: Option<String>,
    },

    /// Show the stevedore version
    Version,
}

fn init_tracing(verbose: bool, debug: bool) {
    let default_level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // try_init: a subscriber may already be installed
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn run(cli: Cli) -> error::Result<()> {
    match cli.command {
        Commands::Convert {
            compose,
            output,
            force,
            dry_run,
            app_name,
            chart_version,
            app_version,
            icon,
            description,
        } => commands::convert::run(commands::convert::ConvertArgs {
            compose: &compose,
            output: &output,
            options: ConvertOptions {
                force,
                dry_run,
                app_name,
                chart_version,
                app_version,
                icon,
                description,
            },
            verbose: cli.verbose,
        }),

        Commands::Labels { name } => commands::labels::run(name.as_deref()),

        Commands::Version => {
            commands::version::run();
            Ok(())
        }
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
