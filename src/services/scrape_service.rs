use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::accumulator::SeriesAccumulator;
use crate::config::Config;
use crate::finalizer::{finalize, ConsolidatedDataset};
use crate::importers::downloader::{DownloadError, SpreadsheetDownloader};
use crate::importers::workbook_importer::WorkbookImporter;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Failed to create download directory: {0}")]
    Workdir(#[from] std::io::Error),
}

/// End-to-end scrape: acquisition, extraction, consolidation.
pub struct ScrapeService {
    downloader: SpreadsheetDownloader,
}

impl ScrapeService {
    pub fn new(config: &Config) -> Self {
        Self {
            downloader: SpreadsheetDownloader::new(
                config.index_url.clone(),
                Duration::from_secs(config.download_delay_secs),
            ),
        }
    }

    /// Download every published spreadsheet into a fresh scratch directory,
    /// fold the workbooks into the accumulator, and finalize.
    ///
    /// The scratch directory has a collision-resistant generated name and is
    /// removed when the `TempDir` drops, on every exit path.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ConsolidatedDataset, ScrapeError> {
        let workdir = tempfile::tempdir()?;
        debug!("Downloading spreadsheets into {:?}", workdir.path());

        let files = self.downloader.download_all(workdir.path()).await?;
        Ok(consolidate_files(&files))
    }
}

/// Fold a set of downloaded workbooks into the consolidated dataset.
///
/// Files are processed in the given order; unreadable files and workbooks
/// without the expected sheets contribute nothing.
pub fn consolidate_files(files: &[PathBuf]) -> ConsolidatedDataset {
    let mut accumulator = SeriesAccumulator::new();
    let mut applicable = 0;

    for file in files {
        match WorkbookImporter::new(file).import() {
            Some(extract) => {
                debug!(
                    "Workbook {file:?}: {} definitions, {} series",
                    extract.definitions.len(),
                    extract.observations.len()
                );
                accumulator.absorb(extract);
                applicable += 1;
            }
            None => debug!("Workbook {file:?} not applicable, skipped"),
        }
    }

    info!(
        "Consolidated {applicable} of {} workbooks: {} definitions, {} series",
        files.len(),
        accumulator.definitions.len(),
        accumulator.observations.len()
    );
    finalize(accumulator)
}
