//! filedrop command-line front end.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use filedrop_dashboard::{Dashboard, SelectedFile};
use filedrop_protocol::{SessionIdentity, UploadResult};
use filedrop_session::SessionStore;
use filedrop_upload::{ChannelObserver, UploadEvent};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Observer events buffered per upload before new ones are dropped.
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Parser)]
#[command(name = "filedrop", version, about = "Upload files and get shareable links")]
struct Cli {
    /// Config file (defaults to ~/.config/filedrop/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload one or more files into the owner's folder
    Upload {
        /// Owner id; files land under `<owner>/`
        #[arg(long)]
        owner: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the owner's files with their links, newest first
    List {
        #[arg(long)]
        owner: String,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the current (or default) configuration to disk
    InitConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "filedrop failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::debug!(
        backend = ?config.storage,
        max_attempts = config.retry.max_attempts,
        "configuration loaded"
    );

    match cli.command {
        Command::InitConfig => {
            let path = config.save(cli.config.as_deref())?;
            println!("wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Upload {
            owner,
            email,
            files,
        } => {
            let dashboard = open_dashboard(&config, SessionIdentity::new(owner, email))?;
            upload_all(&dashboard, &files).await
        }
        Command::List { owner, json } => {
            let dashboard = open_dashboard(&config, SessionIdentity::new(owner, ""))?;
            let listing = dashboard.list_files().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else if listing.is_empty() {
                println!("No files yet.");
            } else {
                for entry in &listing {
                    println!(
                        "{}\t{} bytes\t{}",
                        entry.file.name, entry.file.size, entry.public_url
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_dashboard(config: &AppConfig, identity: SessionIdentity) -> anyhow::Result<Dashboard> {
    let storage = config.build_storage()?;
    tracing::info!(backend = storage.backend_name(), "storage ready");
    let session = SessionStore::signed_in(identity)?;
    Ok(Dashboard::new(
        Arc::new(session),
        storage,
        config.retry.policy(),
    ))
}

/// Uploads `files` one after another. Fails the process if any of them
/// did not make it.
async fn upload_all(dashboard: &Dashboard, files: &[PathBuf]) -> anyhow::Result<ExitCode> {
    let mut failed = 0usize;

    for path in files {
        let file = match SelectedFile::from_path(path).await {
            Ok(file) => file,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                failed += 1;
                continue;
            }
        };
        let name = file.name.clone();

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let printer = tokio::spawn(print_events(name.clone(), rx));
        let observer = ChannelObserver::new(tx);

        let outcome = dashboard.upload(file, &observer).await;
        drop(observer);
        if let Err(e) = printer.await {
            tracing::warn!(error = %e, "progress printer task failed");
        }

        match outcome {
            Ok(report) => match report.result {
                UploadResult::Success { access_url } => {
                    println!("{name}: {access_url}");
                }
                UploadResult::ExhaustedRetries { .. } => failed += 1,
            },
            Err(e) => {
                eprintln!("{name}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        tracing::warn!(failed, total = files.len(), "some uploads failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn print_events(name: String, mut rx: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::Attempt {
                attempt,
                max_attempts,
            } => eprintln!("{name}: uploading... (attempt {attempt}/{max_attempts})"),
            UploadEvent::Progress { percent } => eprintln!("{name}: {percent}%"),
            UploadEvent::Status { message, is_error } => {
                if is_error {
                    eprintln!("{name}: error: {message}");
                } else {
                    eprintln!("{name}: {message}");
                }
            }
        }
    }
}
