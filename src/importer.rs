use crate::archive::ArchiveFile;
use crate::article_store::ArticleSink;
use crate::classify;
use crate::extractor::ArticleExtractor;
use crate::policy;
use crate::types::{FileCounters, ImportConfig, ImportError, ImportStats, NewsArticle, Result};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives one ingestion run: directory scan, then file by file, record by
/// record, strictly sequentially. The stop token is polled before each file
/// and before each record; work already past a poll point runs to
/// completion. Per-file and per-record failures are contained at their
/// boundary and never end the run.
pub struct ArchiveImporter<S> {
    sink: S,
    config: ImportConfig,
    extractor: ArticleExtractor,
    stop: CancellationToken,
}

impl<S: ArticleSink> ArchiveImporter<S> {
    pub fn new(sink: S, config: ImportConfig, stop: CancellationToken) -> Self {
        Self {
            sink,
            config,
            extractor: ArticleExtractor::new(),
            stop,
        }
    }

    pub async fn run(&self) -> Result<ImportStats> {
        let files = scan_data_dir(&self.config.data_dir)?;
        let mut stats = ImportStats::begin(files.len());

        info!(
            "{} files to import article data from in {}",
            files.len(),
            self.config.data_dir.display()
        );
        if files.is_empty() {
            return Ok(stats.finish());
        }

        let mut files_remaining = files.len();
        for path in &files {
            if self.stop.is_cancelled() {
                info!("Stopping...");
                stats.stopped = true;
                break;
            }

            info!("Processing file {}...", path.display());
            match self.process_file(path, &mut stats).await {
                Ok(counters) => {
                    if self.stop.is_cancelled() {
                        info!("Stopping...");
                        stats.stopped = true;
                        break;
                    }
                    stats.files_completed += 1;
                    info!(
                        "Finished {}: {} articles stored, {} records skipped",
                        path.display(),
                        counters.processed,
                        counters.skipped
                    );
                }
                Err(e) => {
                    stats.files_failed += 1;
                    warn!("Skipping file {}: {}", path.display(), e);
                }
            }

            files_remaining -= 1;
            debug!("{} files remaining", files_remaining);
        }

        Ok(stats.finish())
    }

    /// Process every record of one archive file. Returns the per-file
    /// counters; an `Err` means the file itself could not be read further
    /// (the records already handled stay counted in `stats`).
    async fn process_file(&self, path: &Path, stats: &mut ImportStats) -> Result<FileCounters> {
        let mut archive = ArchiveFile::open(path)?;
        let mut counters = FileCounters::default();

        for record in archive.records() {
            if self.stop.is_cancelled() {
                return Ok(counters);
            }

            let record = record?;

            if !classify::is_eligible(&record) {
                counters.skipped += 1;
                stats.records_skipped += 1;
                debug!(
                    "Skipping ineligible record{}",
                    record
                        .target_uri
                        .as_deref()
                        .map(|u| format!(" for {u}"))
                        .unwrap_or_default()
                );
                continue;
            }

            let Some(url) = record.target_uri.as_deref() else {
                counters.skipped += 1;
                stats.records_skipped += 1;
                debug!("Skipping response record without a target URI");
                continue;
            };

            match self
                .extractor
                .extract(&record.payload, record.content_type.as_deref(), url)
            {
                Ok(candidate) => {
                    if policy::accepts(&candidate, &self.config.target_lang) {
                        if let Some(image) = &candidate.top_image {
                            debug!("Top image for {}: {}", url, image);
                        }
                        let article = NewsArticle::from(candidate);
                        match self.sink.store(&article).await {
                            Ok(()) => {
                                counters.processed += 1;
                                stats.articles_stored += 1;
                            }
                            Err(e) => {
                                // The record is lost for this run; the file
                                // and the run keep going.
                                error!("Failed to store article from {}: {}", url, e);
                                counters.skipped += 1;
                                stats.records_skipped += 1;
                            }
                        }
                    } else {
                        warn!(
                            "Skipping {} with no title or ({}) text.",
                            url, self.config.target_lang
                        );
                        counters.skipped += 1;
                        stats.records_skipped += 1;
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    counters.skipped += 1;
                    stats.records_skipped += 1;
                }
            }
        }

        Ok(counters)
    }
}

/// Enumerate the archive files once, at run start. The listing is sorted by
/// file name so a run always visits files in the same order.
fn scan_data_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ImportError::DataDirectory(format!(
            "{} does not exist or is not a directory",
            dir.display()
        )));
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| ImportError::DataDirectory(format!("cannot read {}: {}", dir.display(), e)))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_dir_is_fatal() {
        let err = scan_data_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ImportError::DataDirectory(_)));
    }

    #[test]
    fn scan_returns_sorted_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.warc"), b"").unwrap();
        std::fs::write(dir.path().join("a.warc"), b"").unwrap();

        let files = scan_data_dir(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.warc", "b.warc"]);
    }
}
