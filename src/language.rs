use tracing::{error, trace};

use crate::card::CardRecord;
use crate::domain::Language;

/// Determines the language of `card` from its language-variant page.
///
/// The page lists the *other* printings of the card, so every language whose
/// label appears on it is eliminated. A single survivor is the answer; when
/// several survive the result falls back to English if it is among them and to
/// [`Language::UnknownNonEnglish`] otherwise.
pub fn resolve_language(page: &[u8], card: &CardRecord) -> Language {
    let page = String::from_utf8_lossy(page);
    let candidates = Language::ALL
        .into_iter()
        .filter(|language| *language != Language::UnknownNonEnglish)
        .filter(|language| !page.contains(language.label()))
        .collect::<Vec<_>>();

    if let [language] = candidates.as_slice() {
        trace!(id = card.id, %language, "language resolved");
        return *language;
    }

    let fallback = if candidates.contains(&Language::English) {
        Language::English
    } else {
        Language::UnknownNonEnglish
    };
    error!(
        id = card.id,
        name = %card.name,
        candidates = ?candidates,
        %fallback,
        "ambiguous language for card"
    );
    fallback
}
