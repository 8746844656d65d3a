use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What kind of capture a WARC record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Response,
    Request,
    Metadata,
    Other,
}

/// One decoded entry from an archive file.
///
/// For `Response` records the embedded HTTP head has already been parsed:
/// `content_type` carries the declared `Content-Type` header verbatim and
/// `payload` holds the response body with transfer/content encodings undone.
/// Consumed at most once by the importer and dropped afterwards.
#[derive(Debug, Clone)]
pub struct CaptureRecord {
    pub kind: RecordKind,
    pub target_uri: Option<String>,
    pub content_type: Option<String>,
    pub payload: Vec<u8>,
}

/// Result of running article extraction on an eligible record.
#[derive(Debug, Clone)]
pub struct CandidateArticle {
    pub lang: String,
    pub title: String,
    pub text: String,
    pub top_image: Option<String>,
    pub url: String,
    pub source_host: String,
}

/// An article that passed acceptance and is ready for persistence.
///
/// `title` and `text` are non-blank and `lang` equals the configured target
/// language by the time one of these is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub source: String,
    pub lang: String,
    pub url: String,
    pub title: String,
    pub text: String,
}

impl From<CandidateArticle> for NewsArticle {
    fn from(candidate: CandidateArticle) -> Self {
        Self {
            source: candidate.source_host,
            lang: candidate.lang,
            url: candidate.url,
            title: candidate.title,
            text: candidate.text,
        }
    }
}

/// Per-file counters, reset at every file boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCounters {
    pub processed: u64,
    pub skipped: u64,
}

/// Run-level summary returned by the importer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStats {
    /// Files discovered in the data directory at run start.
    pub files_found: usize,
    /// Files whose record stream was fully consumed.
    pub files_completed: usize,
    /// Files abandoned because of a decode or I/O failure.
    pub files_failed: usize,
    /// Articles durably stored across the whole run.
    pub articles_stored: u64,
    /// Records skipped across the whole run (ineligible, failed extraction,
    /// rejected by policy, or lost to a persistence failure).
    pub records_skipped: u64,
    /// True when the run ended because the operator requested a stop.
    pub stopped: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportStats {
    pub fn begin(files_found: usize) -> Self {
        Self {
            files_found,
            files_completed: 0,
            files_failed: 0,
            articles_stored: 0,
            records_skipped: 0,
            stopped: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn elapsed_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory holding the archive files to import.
    pub data_dir: PathBuf,
    /// Language code an article must carry to be accepted.
    pub target_lang: String,
    /// Further insert attempts after a persistence failure before the
    /// record is given up for the run.
    pub insert_max_retries: u32,
    /// Initial delay between insert attempts; doubles per retry.
    pub insert_retry_delay_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            target_lang: "en".to_string(),
            insert_max_retries: 2,
            insert_retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("malformed archive: {0}")]
    MalformedArchive(#[from] warc::Error),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("data directory error: {0}")]
    DataDirectory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
