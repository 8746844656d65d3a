use crate::types::{CandidateArticle, ImportError, Result};
use chardetng::EncodingDetector;
use dom_smoothie::Readability;
use encoding_rs::Encoding;
use scraper::{Html, Selector};
use url::Url;

/// Turns the HTML payload of an eligible capture record into a candidate
/// article: readability pass for title and body text, document metadata for
/// language and the representative image.
#[derive(Debug, Default)]
pub struct ArticleExtractor;

impl ArticleExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(
        &self,
        payload: &[u8],
        content_type: Option<&str>,
        url: &str,
    ) -> Result<CandidateArticle> {
        let source_host = Url::parse(url)?
            .host_str()
            .unwrap_or_default()
            .to_string();

        let html = decode_payload(payload, content_type)?;

        let mut readability = Readability::new(html.as_str(), Some(url), None)
            .map_err(|e| ImportError::Extraction(format!("readability rejected document: {e:?}")))?;
        let article = readability
            .parse()
            .map_err(|e| ImportError::Extraction(format!("no article content found: {e:?}")))?;
        let text: String = article.text_content.into();

        let document = Html::parse_document(&html);

        Ok(CandidateArticle {
            lang: document_language(&document),
            title: article.title.trim().to_string(),
            text,
            top_image: document_top_image(&document),
            url: url.to_string(),
            source_host,
        })
    }
}

/// Decode raw payload bytes into UTF-8: BOM, then the charset declared in
/// the HTTP content type, then detection as a last resort.
fn decode_payload(bytes: &[u8], content_type: Option<&str>) -> Result<String> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(charset_label) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, encoding);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let (key, value) = part.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches(['"', '\''].as_ref()).to_string())
            } else {
                None
            }
        })
        .filter(|label| !label.is_empty())
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(ImportError::Extraction(format!(
            "payload is not valid {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// The document's declared language, reduced to its lowercased primary
/// subtag (`en-US` becomes `en`). Empty when the document declares none.
fn document_language(document: &Html) -> String {
    let html_lang = Selector::parse("html")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .and_then(|el| el.value().attr("lang").map(str::trim).map(str::to_string))
        .filter(|v| !v.is_empty());

    let declared = html_lang.or_else(|| {
        let sel = Selector::parse("meta").ok()?;
        document.select(&sel).find_map(|el| {
            let meta = el.value();
            let is_lang_meta = meta
                .attr("http-equiv")
                .map(|n| n.eq_ignore_ascii_case("content-language"))
                .unwrap_or(false)
                || meta
                    .attr("name")
                    .map(|n| n.eq_ignore_ascii_case("language"))
                    .unwrap_or(false);
            if !is_lang_meta {
                return None;
            }
            meta.attr("content")
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        })
    });

    normalize_language(declared.as_deref().unwrap_or(""))
}

fn normalize_language(tag: &str) -> String {
    tag.split(['-', '_'].as_ref())
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Representative image: `og:image` preferred, `twitter:image` as fallback.
fn document_top_image(document: &Html) -> Option<String> {
    let sel = Selector::parse("meta").ok()?;
    let mut fallback = None;
    for el in document.select(&sel) {
        let meta = el.value();
        let key = meta.attr("property").or_else(|| meta.attr("name")).unwrap_or("");
        let content = meta
            .attr("content")
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if key.eq_ignore_ascii_case("og:image") {
            if let Some(image) = content {
                return Some(image.to_string());
            }
        } else if key.eq_ignore_ascii_case("twitter:image") && fallback.is_none() {
            fallback = content.map(str::to_string);
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_html(lang: &str, title: &str, paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<p>{}</p>", p))
            .collect();
        format!(
            "<!DOCTYPE html><html lang=\"{lang}\"><head><title>{title}</title>\
             <meta property=\"og:title\" content=\"{title}\">\
             <meta property=\"og:image\" content=\"https://example.com/lead.jpg\">\
             </head><body><article><h1>{title}</h1>{body}</article></body></html>"
        )
    }

    fn long_paragraphs() -> Vec<&'static str> {
        vec![
            "The committee published its long-awaited findings on Tuesday, detailing how \
             the infrastructure programme had drifted three years behind schedule while \
             costs climbed well past the original estimates approved by parliament.",
            "Officials familiar with the review said the delays stemmed from a combination \
             of contractor turnover, redesigned safety requirements, and a procurement \
             process that repeatedly stalled while ministries argued over funding shares.",
            "Opposition members called for an independent audit before any further money \
             is released, while the transport ministry insisted the revised timetable was \
             realistic and that the first segment would open to the public next spring.",
        ]
    }

    #[test]
    fn extracts_title_language_image_and_host() {
        let extractor = ArticleExtractor::new();
        let html = article_html("en", "Committee Faults Rail Programme", &long_paragraphs());
        let candidate = extractor
            .extract(
                html.as_bytes(),
                Some("text/html; charset=utf-8"),
                "https://news.example.org/rail/report",
            )
            .unwrap();

        assert_eq!(candidate.title, "Committee Faults Rail Programme");
        assert_eq!(candidate.lang, "en");
        assert_eq!(candidate.source_host, "news.example.org");
        assert_eq!(
            candidate.top_image.as_deref(),
            Some("https://example.com/lead.jpg")
        );
        assert!(candidate.text.contains("procurement"));
    }

    #[test]
    fn regional_language_tags_reduce_to_primary_subtag() {
        assert_eq!(normalize_language("en-US"), "en");
        assert_eq!(normalize_language("pt_BR"), "pt");
        assert_eq!(normalize_language("FR"), "fr");
        assert_eq!(normalize_language(""), "");
    }

    #[test]
    fn meta_language_is_used_when_html_lang_is_missing() {
        let html = "<html><head>\
                    <meta http-equiv=\"Content-Language\" content=\"de\">\
                    </head><body></body></html>";
        let document = Html::parse_document(html);
        assert_eq!(document_language(&document), "de");
    }

    #[test]
    fn charset_parameter_drives_decoding() {
        // "café" in windows-1252: the é is a single 0xE9 byte.
        let bytes = b"<html lang=\"en\"><body><p>caf\xE9</p></body></html>";
        let decoded = decode_payload(bytes, Some("text/html; charset=windows-1252")).unwrap();
        assert!(decoded.contains("café"));
    }

    #[test]
    fn invalid_bytes_for_declared_charset_fail_extraction() {
        let bytes = b"<html><body>\xFF\xFE\xFD broken</body></html>";
        let result = decode_payload(bytes, Some("text/html; charset=utf-8"));
        assert!(matches!(result, Err(ImportError::Extraction(_))));
    }

    #[test]
    fn unparseable_target_url_fails_extraction() {
        let extractor = ArticleExtractor::new();
        let html = article_html("en", "Anything", &long_paragraphs());
        let result = extractor.extract(html.as_bytes(), Some("text/html"), "not a url");
        assert!(matches!(result, Err(ImportError::InvalidUrl(_))));
    }

    #[test]
    fn twitter_image_is_only_a_fallback() {
        let html = "<html><head>\
                    <meta name=\"twitter:image\" content=\"https://example.com/tw.jpg\">\
                    <meta property=\"og:image\" content=\"https://example.com/og.jpg\">\
                    </head><body></body></html>";
        let document = Html::parse_document(html);
        assert_eq!(
            document_top_image(&document).as_deref(),
            Some("https://example.com/og.jpg")
        );
    }
}
