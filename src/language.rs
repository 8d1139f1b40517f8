//! Target-language classification.
//!
//! Classification is fail-open only where there is nothing to classify:
//! empty or undetectable text counts as a match. Any detection, however
//! confident, is compared against the target.

use tracing::debug;
use whatlang::Lang;

/// Decides whether a post's text is in the target language.
pub trait LanguageFilter: Send + Sync {
    fn is_target_language(&self, text: &str) -> bool;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl LanguageFilter for AcceptAll {
    fn is_target_language(&self, _text: &str) -> bool {
        true
    }
}

/// Trigram-based detection via `whatlang`.
#[derive(Debug, Clone, Copy)]
pub struct WhatlangFilter {
    target: Lang,
}

impl WhatlangFilter {
    #[must_use]
    pub fn new(target: Lang) -> Self {
        Self { target }
    }

    /// Build a filter from a two-letter code such as `en`.
    ///
    /// Returns `None` for codes `whatlang` does not know.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        lang_from_code(code).map(Self::new)
    }

    #[must_use]
    pub fn target(&self) -> Lang {
        self.target
    }
}

impl Default for WhatlangFilter {
    fn default() -> Self {
        Self::new(Lang::Eng)
    }
}

impl LanguageFilter for WhatlangFilter {
    fn is_target_language(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return true;
        }
        let Some(info) = whatlang::detect(text) else {
            return true;
        };
        if !info.is_reliable() {
            debug!(
                lang = ?info.lang(),
                confidence = info.confidence(),
                "Low-confidence language detection"
            );
        }
        info.lang() == self.target
    }
}

fn lang_from_code(code: &str) -> Option<Lang> {
    Some(match code.to_lowercase().as_str() {
        "en" => Lang::Eng,
        "es" => Lang::Spa,
        "fr" => Lang::Fra,
        "de" => Lang::Deu,
        "it" => Lang::Ita,
        "pt" => Lang::Por,
        "nl" => Lang::Nld,
        "ru" => Lang::Rus,
        "ja" => Lang::Jpn,
        "ko" => Lang::Kor,
        "zh" => Lang::Cmn,
        "ar" => Lang::Ara,
        "hi" => Lang::Hin,
        "tr" => Lang::Tur,
        "pl" => Lang::Pol,
        "uk" => Lang::Ukr,
        "sv" => Lang::Swe,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_accepted() {
        let filter = WhatlangFilter::default();
        assert!(filter.is_target_language(""));
        assert!(filter.is_target_language("   "));
    }

    #[test]
    fn test_undetectable_is_accepted() {
        let filter = WhatlangFilter::default();
        assert!(filter.is_target_language("12345 !!! ???"));
    }

    #[test]
    fn test_english_accepted() {
        let filter = WhatlangFilter::default();
        assert!(filter.is_target_language(
            "The quick brown fox jumps over the lazy dog while the children \
             watch from the garden and laugh together."
        ));
    }

    #[test]
    fn test_other_language_rejected() {
        let filter = WhatlangFilter::default();
        assert!(!filter.is_target_language(
            "これは日本語の文章です。\
             今日はとても良い天気ですね。散歩に行きましょう。"
        ));
    }

    #[test]
    fn test_short_other_language_rejected() {
        let filter = WhatlangFilter::default();
        assert!(!filter.is_target_language("Hola, ¿cómo estás hoy? Qué bonito día."));
        assert!(!filter.is_target_language("Это очень интересная новость, спасибо!"));
    }

    #[test]
    fn test_from_code() {
        assert_eq!(WhatlangFilter::from_code("en").unwrap().target(), Lang::Eng);
        assert_eq!(WhatlangFilter::from_code("DE").unwrap().target(), Lang::Deu);
        assert!(WhatlangFilter::from_code("xx").is_none());
    }

    #[test]
    fn test_accept_all() {
        assert!(AcceptAll.is_target_language("anything at all"));
    }
}
