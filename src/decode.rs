//! Decompresses a staged archive and collects the observations for the run's stations.

use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::{
    config::StationSet,
    error::{Error, Result},
    observation::Observation,
};

/// Decodes on a blocking thread so the runtime keeps ticking progress bars.
pub async fn decode(
    archive_path: PathBuf,
    staging_dir: PathBuf,
    stations: Arc<StationSet>,
) -> Result<Vec<Observation>> {
    tokio::task::spawn_blocking(move || decode_archive(&archive_path, &staging_dir, &stations))
        .await
        .map_err(|e| Error::Parse(format!("Decode task failed: {}", e)))?
}

/// Decompresses `archive_path` into `staging_dir` and returns every matching observation.
///
/// Any malformed line fails the whole archive. The decompressed file is removed before
/// returning, whether or not decoding succeeded. Local I/O failures are reported as
/// [`Error::Parse`] since they only concern this archive.
pub fn decode_archive(
    archive_path: &Path,
    staging_dir: &Path,
    stations: &StationSet,
) -> Result<Vec<Observation>> {
    let unzipped_path = staging_dir.join(decompressed_name(archive_path)?);

    info!("Unzipping file {}...", archive_path.display());
    let result = decompress(archive_path, &unzipped_path).and_then(|()| {
        info!("Parsing file...");
        read_observations(&unzipped_path, stations)
    });
    let removed = remove_intermediate(&unzipped_path);

    let observations = result?;
    removed?;
    info!("{} rows collected.", observations.len());

    Ok(observations)
}

/// Name of the decompressed intermediate for an archive.
pub fn decompressed_name(archive_path: &Path) -> Result<String> {
    let name = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Parse(format!("Bad archive name {}", archive_path.display())))?;

    Ok(match name.strip_suffix(".gz") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => format!("{}.out", name),
    })
}

fn decompress(archive_path: &Path, unzipped_path: &Path) -> Result<()> {
    let archive = File::open(archive_path).map_err(|e| local_io(archive_path, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(archive));
    let out = File::create(unzipped_path).map_err(|e| local_io(unzipped_path, e))?;
    let mut out = BufWriter::new(out);

    io::copy(&mut decoder, &mut out).map_err(|e| {
        Error::Parse(format!("Failed to decompress {}: {}", archive_path.display(), e))
    })?;
    out.flush().map_err(|e| local_io(unzipped_path, e))?;

    Ok(())
}

// Only regular files are removed; a missing intermediate is fine.
fn remove_intermediate(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Ok(());
    }

    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(local_io(path, e)),
    }
}

fn local_io(path: &Path, e: io::Error) -> Error {
    Error::Parse(format!("{}: {}", path.display(), e))
}

fn read_observations(path: &Path, stations: &StationSet) -> Result<Vec<Observation>> {
    let reader = BufReader::new(File::open(path).map_err(|e| local_io(path, e))?);
    let mut observations = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::Parse(format!("line {}: {}", idx + 1, e)))?;
        let observation = Observation::from_line(&line, stations)
            .map_err(|e| Error::Parse(format!("{} line {}: {}", path.display(), idx + 1, e)))?;

        if let Some(observation) = observation {
            observations.push(observation);
        }
    }

    Ok(observations)
}

// -- Tests -------------------------------------------------------------------
