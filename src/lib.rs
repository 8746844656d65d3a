pub mod archive;
pub mod article_store;
pub mod classify;
pub mod extractor;
pub mod importer;
pub mod policy;
pub mod shutdown;
pub mod types;

pub use archive::ArchiveFile;
pub use article_store::{ArticleSink, PgArticleStore};
pub use extractor::ArticleExtractor;
pub use importer::ArchiveImporter;
pub use shutdown::spawn_stop_listener;
pub use types::*;
