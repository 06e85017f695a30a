//! grpcbridge CLI - Thrift to gRPC schema migration and code generator
//!
//! Commands:
//! - `grpcbridge generate` - Emit proto schemas, codecs, service adapters and the stub interface
//! - `grpcbridge check` - Validate a grpcbridge.toml and ingest its descriptors

use clap::{Parser, Subcommand};
use grpcbridge_cli::generate::{self, Artifact};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "grpcbridge")]
#[command(author, version, about = "Thrift to gRPC migration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate target artifacts from source descriptors
    Generate {
        /// Path to grpcbridge.toml (default: ./grpcbridge.toml)
        #[arg(short, long)]
        config: Option<String>,

        /// Artifact to generate
        #[arg(short, long, value_enum, default_value = "all")]
        artifact: Artifact,

        /// Only ingest these top-level types (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Skip these top-level types unless referenced (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Increase log verbosity (-v debug, -vv trace)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Validate a grpcbridge.toml and its descriptors without writing
    Check {
        /// Path to grpcbridge.toml (default: ./grpcbridge.toml)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            config,
            artifact,
            include,
            exclude,
            verbose,
        } => generate::run(config, artifact, include, exclude, verbose),
        Commands::Check { config } => generate::check(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:?}");
            ExitCode::from(generate::exit_code(&error))
        }
    }
}
