//! Command line interface.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{DEFAULT_POST_LOAD_PROCEDURE, DEFAULT_RAW_TABLE};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
/// Downloads GHCN-Daily yearly archives and loads the selected stations into Postgres
pub struct Cli {
    /// Comma separated years. Matches on the leading digits, so "190" selects 1900 through 1909
    pub years: String,

    /// Comma separated station IDs to collect data for
    pub stations: String,

    /// Directory archives are downloaded to
    #[arg(short, long, default_value = "./tmp")]
    pub dir: PathBuf,

    /// Keep the downloaded files after processing
    #[arg(short, long)]
    pub keep: bool,

    /// Download the archives without processing them. Downloaded files are always kept
    #[arg(short = 'o', long)]
    pub download_only: bool,

    /// Process archives for the given years already in the download directory
    #[arg(short, long)]
    pub process_only: bool,

    /// URL of the yearly archive index
    #[arg(long, env = "GHCN_BASE_URL")]
    pub base_url: Option<String>,

    /// Postgres connection string
    #[arg(long, env = "GHCN_DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Table the raw observations are inserted into
    #[arg(long, default_value = DEFAULT_RAW_TABLE)]
    pub raw_table: String,

    /// Procedure called once an archive's rows are inserted
    #[arg(long, default_value = DEFAULT_POST_LOAD_PROCEDURE)]
    pub post_load_procedure: String,
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Converts a spinner into a byte progress bar once the size is known.
pub fn set_byte_progress(bar: &ProgressBar, size: u64) {
    bar.set_length(size);
    bar.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
        )
        .unwrap()
        .progress_chars("=> "),
    );
}
