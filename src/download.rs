//! Downloads resolved archives into the staging directory, or finds ones already staged.

use std::{
    collections::BTreeSet,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use futures::StreamExt;
use indicatif::ProgressBar;
use reqwest::Client;
use tracing::{info, warn};

use crate::{
    cli::set_byte_progress,
    error::{Error, Result},
    index::ArchiveRef,
};

pub struct ArchiveFetcher {
    client: Client,
}

impl ArchiveFetcher {
    pub fn new(client: Client) -> Self {
        ArchiveFetcher { client }
    }

    /// Streams the archive to `<staging_dir>/<file name>`, reporting bytes to `progress_bar`.
    ///
    /// A failed transfer leaves whatever was written in place; the staging directory
    /// teardown removes it.
    pub async fn fetch(
        &self,
        archive: &ArchiveRef,
        staging_dir: &Path,
        progress_bar: &ProgressBar,
    ) -> Result<PathBuf> {
        let file_path = staging_dir.join(&archive.file_name);
        info!("Downloading file {} to {}", archive.url, file_path.display());

        let response = self
            .client
            .get(&archive.url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to download {}: {}", archive.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "Failed to download {}: {}",
                archive.url,
                response.status()
            )));
        }

        if let Some(total_size) = response.content_length().filter(|&size| size > 0) {
            set_byte_progress(progress_bar, total_size);
        }

        let mut file = File::create(&file_path)?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result
                .map_err(|e| Error::Network(format!("Error reading chunk: {}", e)))?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
            progress_bar.set_position(downloaded);
        }

        Ok(file_path)
    }
}

/// Lists the `.gz` files in `staging_dir` whose names start with one of `prefixes`.
///
/// A file matched by several prefixes is listed once. Prefixes with no file are returned
/// alongside.
pub fn find_staged_archives(
    prefixes: &[String],
    staging_dir: &Path,
) -> Result<(Vec<PathBuf>, Vec<String>)> {
    let mut names = Vec::new();
    for entry in fs::read_dir(staging_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".gz") {
                names.push(name.to_string());
            }
        }
    }

    let mut found = BTreeSet::new();
    let mut unmatched = Vec::new();
    for prefix in prefixes {
        let matches: Vec<_> = names.iter().filter(|n| n.starts_with(prefix.as_str())).collect();
        if matches.is_empty() {
            warn!("Unable to find files starting with {}", prefix);
            unmatched.push(prefix.clone());
        }
        found.extend(matches.into_iter().map(|n| staging_dir.join(n)));
    }

    Ok((found.into_iter().collect(), unmatched))
}

// -- Tests -------------------------------------------------------------------
