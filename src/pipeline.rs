//! Runs the requested years through resolve, fetch, decode, load and cleanup.
//!
//! Archives are handled one at a time. A parse or load failure is recorded against its
//! archive and the run moves on to the next one; a network failure ends the run. Either
//! way the staging directory is removed at the end unless files are being kept.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use reqwest::Client;
use tracing::{error, info};

use crate::{
    cli::create_spinner,
    config::{Config, Mode, StationSet},
    db::{BatchLoader, Store},
    decode,
    download::{find_staged_archives, ArchiveFetcher},
    error::{Error, Result},
    index::{ArchiveRef, IndexResolver, Resolution},
};

/// Where archives come from in live mode.
pub trait ArchiveSource {
    async fn resolve(&self, prefixes: &[String]) -> Result<Resolution>;

    async fn fetch(&self, archive: &ArchiveRef, staging_dir: &Path) -> Result<PathBuf>;
}

/// The remote index and archives over HTTP.
pub struct HttpSource {
    resolver: IndexResolver,
    fetcher: ArchiveFetcher,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Self {
        let client = Client::new();
        HttpSource {
            resolver: IndexResolver::new(client.clone(), base_url),
            fetcher: ArchiveFetcher::new(client),
        }
    }
}

impl ArchiveSource for HttpSource {
    async fn resolve(&self, prefixes: &[String]) -> Result<Resolution> {
        self.resolver.resolve(prefixes).await
    }

    async fn fetch(&self, archive: &ArchiveRef, staging_dir: &Path) -> Result<PathBuf> {
        let bar = create_spinner(format!("Downloading {}", archive.file_name));
        let result = self.fetcher.fetch(archive, staging_dir, &bar).await;

        match &result {
            Ok(_) => bar.finish_with_message(format!("{} downloaded", archive.file_name)),
            Err(_) => bar.abandon_with_message(format!("{} failed", archive.file_name)),
        }

        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How far an archive got.
pub enum RunState {
    Downloaded,
    Decoded,
    Loaded,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub path: PathBuf,
    pub state: RunState,
    pub rows: usize,
    pub batches: usize,
    pub error: Option<String>,
}

impl ArchiveOutcome {
    fn new(path: PathBuf) -> Self {
        ArchiveOutcome {
            path,
            state: RunState::Downloaded,
            rows: 0,
            batches: 0,
            error: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub archives: Vec<ArchiveOutcome>,
    /// Year prefixes that matched no archive
    pub unmatched: Vec<String>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &ArchiveOutcome> {
        self.archives.iter().filter(|a| a.error.is_some())
    }

    pub fn rows_loaded(&self) -> usize {
        self.archives
            .iter()
            .filter(|a| a.error.is_none())
            .map(|a| a.rows)
            .sum()
    }
}

pub struct Pipeline<A, S> {
    config: Config,
    stations: Arc<StationSet>,
    source: A,
    loader: BatchLoader<S>,
}

impl<A: ArchiveSource, S: Store> Pipeline<A, S> {
    pub fn new(config: Config, source: A, store: S) -> Self {
        Pipeline {
            stations: Arc::new(config.stations.clone()),
            config,
            source,
            loader: BatchLoader::new(store),
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        setup_staging_dir(&self.config.staging_dir)?;

        let mut report = RunReport::default();
        let result = match self.config.mode {
            Mode::ProcessOnly => self.reprocess(&mut report).await,
            Mode::Live | Mode::DownloadOnly => self.live(&mut report).await,
        };

        let cleanup = if self.config.keep_files {
            Ok(())
        } else {
            cleanup_staging_dir(&self.config.staging_dir)
        };

        result?;
        cleanup?;

        Ok(report)
    }

    async fn live(&self, report: &mut RunReport) -> Result<()> {
        let resolution = self.source.resolve(&self.config.years).await?;
        report.unmatched.extend(resolution.unmatched);

        for archive in &resolution.archives {
            let path = self.source.fetch(archive, &self.config.staging_dir).await?;
            let mut outcome = ArchiveOutcome::new(path);

            if self.config.mode != Mode::DownloadOnly {
                self.process(&mut outcome).await?;
            }
            report.archives.push(outcome);
        }

        Ok(())
    }

    async fn reprocess(&self, report: &mut RunReport) -> Result<()> {
        let (paths, unmatched) =
            find_staged_archives(&self.config.years, &self.config.staging_dir)?;
        report.unmatched.extend(unmatched);

        for path in paths {
            info!("Processing staged file {}", path.display());
            let mut outcome = ArchiveOutcome::new(path);
            self.process(&mut outcome).await?;
            report.archives.push(outcome);
        }

        Ok(())
    }

    // Errors that only concern this archive are recorded on the outcome.
    async fn process(&self, outcome: &mut ArchiveOutcome) -> Result<()> {
        match self.decode_and_load(outcome).await {
            Ok(()) => {}
            Err(e) if e.is_fatal_to_run() => return Err(e),
            Err(e) => {
                error!("Failed to process {}: {}", outcome.path.display(), e);
                outcome.error = Some(e.to_string());
                return Ok(());
            }
        }

        if !self.config.keep_files {
            info!("Deleting file {}", outcome.path.display());
            fs::remove_file(&outcome.path)?;
            outcome.state = RunState::Deleted;
        }

        Ok(())
    }

    async fn decode_and_load(&self, outcome: &mut ArchiveOutcome) -> Result<()> {
        let observations = decode::decode(
            outcome.path.clone(),
            self.config.staging_dir.clone(),
            Arc::clone(&self.stations),
        )
        .await?;
        outcome.state = RunState::Decoded;
        outcome.rows = observations.len();

        let summary = self.loader.load(&observations).await?;
        outcome.state = RunState::Loaded;
        outcome.batches = summary.batches;

        Ok(())
    }
}

fn setup_staging_dir(staging_dir: &Path) -> Result<()> {
    if staging_dir.is_file() {
        return Err(Error::Config(format!(
            "download directory {} is a file",
            staging_dir.display()
        )));
    }

    if staging_dir.is_dir() {
        info!("Using download directory {}", staging_dir.display());
    } else {
        info!("Creating download directory {}", staging_dir.display());
        fs::create_dir_all(staging_dir)?;
    }

    Ok(())
}

fn cleanup_staging_dir(staging_dir: &Path) -> Result<()> {
    if staging_dir.exists() {
        info!("Deleting download directory {}", staging_dir.display());
        fs::remove_dir_all(staging_dir)?;
    }

    Ok(())
}

// -- Tests -------------------------------------------------------------------
