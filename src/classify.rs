use crate::types::{CaptureRecord, RecordKind};

/// Whether a capture record is worth an extraction attempt: an HTTP
/// response declaring `text/html` with a non-empty payload.
///
/// Pure predicate, no side effects; the importer does the counting. The
/// comparison is against the media type with any parameters stripped, so
/// `text/html; charset=utf-8` qualifies and `application/xhtml+xml` does
/// not.
pub fn is_eligible(record: &CaptureRecord) -> bool {
    record.kind == RecordKind::Response
        && record
            .content_type
            .as_deref()
            .map(media_type_is_html)
            .unwrap_or(false)
        && !record.payload.is_empty()
}

fn media_type_is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media_type| media_type.trim().eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}
