use crate::types::{ImportConfig, NewsArticle, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, warn};

/// Destination for accepted articles. One call per article, synchronous
/// success/failure; implementations must not panic the importer.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    async fn store(&self, article: &NewsArticle) -> Result<()>;
}

/// PostgreSQL-backed sink writing one row per accepted article.
pub struct PgArticleStore {
    db: PgPool,
    max_retries: u32,
    retry_delay: Duration,
}

impl PgArticleStore {
    /// Connect to the database and verify the connection works. A failure
    /// here is fatal to the run; nothing has been ingested yet.
    pub async fn connect(database_url: &str, config: &ImportConfig) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self {
            db,
            max_retries: config.insert_max_retries,
            retry_delay: Duration::from_millis(config.insert_retry_delay_ms),
        })
    }

    async fn insert(&self, article: &NewsArticle) -> Result<()> {
        sqlx::query(
            "INSERT INTO news_articles (source, lang, url, title, text) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&article.source)
        .bind(&article.lang)
        .bind(&article.url)
        .bind(&article.title)
        .bind(&article.text)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ArticleSink for PgArticleStore {
    /// Insert with a bounded retry: transient failures get
    /// `insert_max_retries` further attempts with exponential backoff, after
    /// which the record is given up for this run and the error surfaces to
    /// the importer's per-record handling.
    async fn store(&self, article: &NewsArticle) -> Result<()> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.retry_delay,
            initial_interval: self.retry_delay,
            max_interval: self.retry_delay * 8,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            match self.insert(article).await {
                Ok(()) => {
                    debug!("Stored article from {}", article.url);
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff().unwrap_or(self.retry_delay);
                    warn!(
                        "Insert failed for {} (attempt {}), retrying in {:?}: {}",
                        article.url, attempt, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
