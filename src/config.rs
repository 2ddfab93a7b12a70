//! Run configuration built from the command line.

use std::{collections::HashSet, path::PathBuf};

use crate::{
    cli::Cli,
    error::{Error, Result},
};

pub const DEFAULT_RAW_TABLE: &str = "ghcn.daily_raw";
pub const DEFAULT_POST_LOAD_PROCEDURE: &str = "ghcn.stp_daily";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Resolve, download, decode and load
    Live,
    /// Resolve and download, stop before decoding
    DownloadOnly,
    /// Decode and load archives already in the staging directory
    ProcessOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Station identifiers a run is restricted to.
pub struct StationSet(HashSet<String>);

impl StationSet {
    /// Parses a comma-separated list, ignoring blank entries.
    pub fn parse(s: &str) -> Self {
        StationSet(split_list(s).into_iter().collect())
    }

    pub fn contains(&self, station_id: &str) -> bool {
        self.0.contains(station_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Year prefixes, matched against archive names with `starts_with`
    pub years: Vec<String>,
    pub stations: StationSet,
    pub staging_dir: PathBuf,
    pub keep_files: bool,
    pub mode: Mode,
    pub base_url: String,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub raw_table: String,
    pub post_load_procedure: String,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mode = match (cli.download_only, cli.process_only) {
            (true, true) => {
                return Err(Error::Config(
                    "--download-only and --process-only cannot be combined".to_string(),
                ))
            }
            (true, false) => Mode::DownloadOnly,
            (false, true) => Mode::ProcessOnly,
            (false, false) => Mode::Live,
        };

        let years = split_list(&cli.years);
        if years.is_empty() {
            return Err(Error::Config("no years given".to_string()));
        }

        let stations = StationSet::parse(&cli.stations);
        if stations.is_empty() && mode != Mode::DownloadOnly {
            return Err(Error::Config("no stations given".to_string()));
        }

        let base_url = cli.base_url.clone().unwrap_or_default();
        if base_url.is_empty() && mode != Mode::ProcessOnly {
            return Err(Error::Config(
                "a base URL is required unless processing existing files".to_string(),
            ));
        }

        let url = cli.database_url.clone().unwrap_or_default();
        if url.is_empty() && mode != Mode::DownloadOnly {
            return Err(Error::Config(
                "a database URL is required unless only downloading".to_string(),
            ));
        }

        check_identifier(&cli.raw_table)?;
        check_identifier(&cli.post_load_procedure)?;

        Ok(Config {
            years,
            stations,
            staging_dir: cli.dir.clone(),
            // Downloaded files are the only output of a download-only run.
            keep_files: cli.keep || mode == Mode::DownloadOnly,
            mode,
            base_url,
            database: DatabaseConfig {
                url,
                raw_table: cli.raw_table.clone(),
                post_load_procedure: cli.post_load_procedure.clone(),
            },
        })
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

// Table and procedure names are spliced into SQL text, so only plain dotted identifiers pass.
fn check_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("`{}` is not a valid SQL identifier", name)))
    }
}

// -- Tests -------------------------------------------------------------------
