//! `brick`: upload listing galleries and brochures from the command line.

mod error;

use crate::error::{ErrorKind, Result};
use brick_config::Config;
use brick_upload::policy::{MediaKind, Policy};
use brick_upload::{ItemState, SourceFile, UploadBatch, Uploader, naming};
use clap::{Args, Parser, Subcommand, ValueEnum};
use exn::ResultExt;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "brick", version, about)]
struct Cli {
    /// Config file (TOML, YAML or JSON). Defaults to the platform config directory.
    #[arg(short, long, env = "BRICK_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload files to the configured storage.
    Upload {
        #[command(flatten)]
        target: Target,
        /// Retry every failed file once after the batch finishes.
        #[arg(long)]
        retry_failed: bool,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show which files would be accepted, and the keys they would get.
    Check {
        #[command(flatten)]
        target: Target,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct Target {
    /// Project the files belong to; normalized into the first key segment.
    #[arg(long)]
    project: String,
    #[arg(long, default_value = "gallery")]
    folder: String,
    #[arg(long, value_enum, default_value_t = Kind::Image)]
    kind: Kind,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Image,
    Document,
}
impl From<Kind> for MediaKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Image => Self::Image,
            Kind::Document => Self::Document,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("brick=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Upload {
            target,
            retry_failed,
            files,
        } => upload(&config, target, retry_failed, files).await,
        Command::Check { target, files } => check(&config, target, files).await,
    }
}

async fn open_all(paths: Vec<PathBuf>) -> Result<Vec<SourceFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = SourceFile::open(&path).await.or_raise(|| ErrorKind::Input(path.display().to_string()))?;
        files.push(file);
    }
    Ok(files)
}

async fn upload(config: &Config, target: Target, retry_failed: bool, paths: Vec<PathBuf>) -> Result<()> {
    let kind = MediaKind::from(target.kind);
    let files = open_all(paths).await?;
    let backend = config.storage.build().await.or_raise(|| ErrorKind::Storage)?;
    let uploader = Uploader::new(backend, config.upload.settings(kind), &target.project, &target.folder);
    tracing::debug!(
        storage = config.storage.type_name(),
        project = uploader.namer().project(),
        folder = uploader.namer().folder(),
        "Uploader ready"
    );

    let summary = uploader.submit(files).await;
    if retry_failed && summary.failed > 0 {
        let failed: Vec<usize> = uploader
            .snapshot()
            .iter()
            .enumerate()
            .filter(|(_, item)| item.has_error())
            .map(|(index, _)| index)
            .collect();
        for index in failed {
            uploader.retry(index).await.or_raise(|| ErrorKind::Retry(index))?;
        }
    }

    let batch = uploader.snapshot();
    print_batch(&batch);
    for rejection in &summary.rejected {
        println!("rejected\t{rejection}");
    }
    match batch.failed() + summary.rejected.len() {
        0 => Ok(()),
        missing => exn::bail!(ErrorKind::Incomplete(missing)),
    }
}

fn print_batch(batch: &UploadBatch) {
    for item in batch.iter() {
        match item.state() {
            ItemState::Uploaded { url } => println!("uploaded\t{}\t{url}", item.name()),
            ItemState::Failed { reason, .. } => println!("failed\t{}\t{reason}", item.name()),
            ItemState::Uploading => println!("uploading\t{}", item.name()),
        }
    }
}

async fn check(config: &Config, target: Target, paths: Vec<PathBuf>) -> Result<()> {
    let kind = MediaKind::from(target.kind);
    let files = open_all(paths).await?;
    let policy = Policy::new(kind, config.upload.limits(kind));
    let namer = naming::ObjectNamer::new(&target.project, &target.folder, kind);
    let admission = policy.admit(files, 0, 0);
    let timestamp = naming::timestamp_ms();
    for (index, file) in admission.admitted.iter().enumerate() {
        match namer.name(file, index, timestamp) {
            Ok(key) => println!("accepted\t{}\t{key}", file.name()),
            Err(err) => println!("invalid\t{}\t{}", file.name(), *err),
        }
    }
    for rejection in &admission.rejected {
        println!("rejected\t{rejection}");
    }
    Ok(())
}
