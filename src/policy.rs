use crate::types::CandidateArticle;

/// Whether an extracted candidate qualifies for persistence: its language
/// matches the configured target exactly and both title and body text are
/// non-blank. Pure predicate; counter updates stay with the importer.
pub fn accepts(candidate: &CandidateArticle, target_lang: &str) -> bool {
    candidate.lang == target_lang
        && !candidate.title.trim().is_empty()
        && !candidate.text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(lang: &str, title: &str, text: &str) -> CandidateArticle {
        CandidateArticle {
            lang: lang.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            top_image: None,
            url: "https://example.com/story".to_string(),
            source_host: "example.com".to_string(),
        }
    }

    #[test]
    fn accepts_matching_language_with_title_and_text() {
        assert!(accepts(&candidate("en", "Headline", "Body text."), "en"));
    }

    #[test]
    fn rejects_language_mismatch_regardless_of_content() {
        assert!(!accepts(&candidate("fr", "Headline", "Body text."), "en"));
        assert!(!accepts(&candidate("", "Headline", "Body text."), "en"));
    }

    #[test]
    fn rejects_blank_title_even_when_language_matches() {
        assert!(!accepts(&candidate("en", "", "Body text."), "en"));
        assert!(!accepts(&candidate("en", "   \t ", "Body text."), "en"));
    }

    #[test]
    fn rejects_blank_body_even_when_language_matches() {
        assert!(!accepts(&candidate("en", "Headline", ""), "en"));
        assert!(!accepts(&candidate("en", "Headline", " \n "), "en"));
    }

    #[test]
    fn acceptance_is_repeatable() {
        let c = candidate("en", "Headline", "Body text.");
        assert_eq!(accepts(&c, "en"), accepts(&c, "en"));
    }
}
