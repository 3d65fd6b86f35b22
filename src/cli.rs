//! Command-line driver for the conversion lifecycle.
//!
//! `formats` shows what an upload would be offered; `convert` runs the whole
//! accept → select flow against a URL and writes the artifact to disk. Both
//! go through the same library calls a chat front end would use.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::contract::SourceFile;
use crate::format::classify;
use crate::load_config::load_config;
use crate::matrix::targets_for;
use crate::orchestrate::{reply_for, Orchestrator};
use crate::ConversionError;

/// CLI for file-converter: detect formats and convert files.
#[derive(Parser)]
#[clap(
    name = "file-converter",
    version,
    about = "Detect a file's format and convert it into another one"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the detected format and the conversion menu for a file
    Formats {
        /// Declared filename of the upload
        #[clap(long)]
        name: String,
        /// Declared MIME type of the upload
        #[clap(long)]
        content_type: Option<String>,
    },
    /// Download a file, convert it, and write the result into a directory
    Convert {
        /// Where the source bytes can be fetched from
        #[clap(long)]
        url: String,
        /// Declared filename of the upload
        #[clap(long)]
        name: String,
        /// Declared size in bytes
        #[clap(long)]
        size: u64,
        /// Declared MIME type of the upload
        #[clap(long)]
        content_type: Option<String>,
        /// Target extension, e.g. `png`
        #[clap(long)]
        to: String,
        /// Directory the converted file is written to
        #[clap(long)]
        out: PathBuf,
        /// Path to a YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Async CLI entrypoint, shared by `main()` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Formats { name, content_type } => {
            let ext = classify(Some(&name), content_type.as_deref());
            let targets = targets_for(&ext);
            if targets.is_empty() {
                let err = ConversionError::UnsupportedFormat { extension: ext };
                println!("{}", err.user_message());
                return Err(err.into());
            }
            println!("Detected .{ext}. Choose format:");
            for target in targets {
                println!("  {:<5} {}", target.extension(), target.label());
            }
            Ok(())
        }
        Commands::Convert {
            url,
            name,
            size,
            content_type,
            to,
            out,
            config,
        } => {
            let config = load_config(config)?;
            let orchestrator =
                Orchestrator::from_config(&config).context("Failed to set up converter")?;
            tracing::info!(command = "convert", url = %url, "Starting conversion");

            let source = SourceFile {
                url,
                name: Some(name),
                size,
                content_type,
            };
            let offer = match orchestrator.accept(source) {
                Ok(offer) => offer,
                Err(e) => {
                    println!("{}", e.user_message());
                    return Err(e.into());
                }
            };
            println!("{}", offer.prompt());

            let result = orchestrator.select(&offer.job_id, &to).await;
            println!("{}", reply_for(&result));
            let file = result?;

            std::fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create output directory {}", out.display()))?;
            let dest = out.join(&file.file_name);
            std::fs::write(&dest, &file.content)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            println!("{}", dest.display());
            tracing::info!(command = "convert", dest = %dest.display(), "Conversion written");
            Ok(())
        }
    }
}
