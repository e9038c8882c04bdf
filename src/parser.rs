use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, error, trace, warn};

use crate::card::{CardRecord, RawCardBundle};
use crate::error::IngestError;
use crate::language::resolve_language;
use crate::mana::{Mana, decode_label, is_numeric};

/// Element id prefix Gatherer uses for single-faced cards.
pub const DEFAULT_PREFIX: &str = "ctl00_ctl00_ctl00_MainContent_SubContent_SubContent_";
/// Number of numbered `ctl0N_` prefixes probed when the default one misses.
pub const ALTERNATE_PREFIXES: usize = 10;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static VALUE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.value").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static TEXT_BOX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.cardtextbox").unwrap());

/// Turns one fetched bundle into a [`CardRecord`].
///
/// The parser keeps the element prefix discovered for the document being
/// parsed, so an instance must stay with a single worker.
#[derive(Debug)]
pub struct CardParser {
    prefix: String,
}

impl Default for CardParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CardParser {
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Prefix discovered for the most recently parsed document.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `Ok(None)` when no card is assigned to the bundle's identifier.
    pub fn parse(&mut self, bundle: RawCardBundle) -> Result<Option<CardRecord>, IngestError> {
        let id = bundle.id;
        trace!(id, "parsing card detail page");
        let page = String::from_utf8_lossy(&bundle.detail);
        let document = Html::parse_document(&page);

        let Some(name) = self.discover_name(&document, id)? else {
            debug!(id, "no card assigned to multiverse id");
            return Ok(None);
        };

        let mut card = CardRecord::new(id, name);
        card.type_line = self
            .value_text(&document, "typeRow")?
            .ok_or(IngestError::MissingField {
                id,
                field: "type line",
            })?;
        card.mana_cost = self.mana_cost(&document)?;
        card.rules_text = self.rules_text(&document, id)?;
        card.flavor_text = self.flavor_text(&document)?;
        self.power_toughness(&document, &mut card)?;
        card.expansion = self.expansion(&document)?.ok_or(IngestError::MissingField {
            id,
            field: "expansion",
        })?;
        card.rarity = self.rarity(&document)?;
        card.collector_number = self.value_text(&document, "numberRow")?;
        card.artist = self.artist(&document)?;
        card.watermark = self.value_text(&document, "markRow")?;

        card.image = bundle.image;
        card.language = resolve_language(&bundle.language, &card);
        debug!(id, name = %card.name, language = %card.language, "parsed card");
        Ok(Some(card))
    }

    fn discover_name(&mut self, document: &Html, id: u32) -> Result<Option<String>, IngestError> {
        let prefixes = std::iter::once(DEFAULT_PREFIX.to_string()).chain(
            (0..ALTERNATE_PREFIXES).map(|index| format!("{DEFAULT_PREFIX}ctl0{index}_")),
        );
        for prefix in prefixes {
            self.prefix = prefix;
            if self.row(document, "nameRow")?.is_some() {
                let name = self.value_text(document, "nameRow")?.unwrap_or_default();
                if self.prefix != DEFAULT_PREFIX {
                    warn!(
                        id,
                        prefix = %self.prefix,
                        "multiverse id carries more than one card face, loading the first"
                    );
                }
                return Ok(Some(name));
            }
        }
        self.prefix = DEFAULT_PREFIX.to_string();
        Ok(None)
    }

    fn row<'a>(&self, document: &'a Html, field: &str) -> Result<Option<ElementRef<'a>>, IngestError> {
        let query = format!("[id=\"{}{field}\"]", self.prefix);
        let selector =
            Selector::parse(&query).map_err(|err| IngestError::Selector(format!("{query}: {err:?}")))?;
        Ok(document.select(&selector).next())
    }

    fn value<'a>(&self, document: &'a Html, field: &str) -> Result<Option<ElementRef<'a>>, IngestError> {
        Ok(self
            .row(document, field)?
            .and_then(|row| row.select(&VALUE).next()))
    }

    fn value_text(&self, document: &Html, field: &str) -> Result<Option<String>, IngestError> {
        Ok(self
            .value(document, field)?
            .map(normalized_text)
            .filter(|text| !text.is_empty()))
    }

    fn mana_cost(&self, document: &Html) -> Result<Vec<Mana>, IngestError> {
        let Some(value) = self.value(document, "manaRow")? else {
            return Ok(Vec::new());
        };
        Ok(value
            .select(&IMG)
            .map(|img| Mana::from_label(img.value().attr("alt").unwrap_or_default()))
            .collect())
    }

    fn rules_text(&self, document: &Html, id: u32) -> Result<Option<String>, IngestError> {
        let Some(value) = self.value(document, "textRow")? else {
            return Ok(None);
        };
        let text = render_text(value, |alt| symbol_token(alt, id));
        trace!(id, text = %text, "card text");
        Ok(Some(text).filter(|text| !text.is_empty()))
    }

    fn flavor_text(&self, document: &Html) -> Result<Option<String>, IngestError> {
        let Some(row) = self.row(document, "FlavorText")? else {
            return Ok(None);
        };
        let mut flavor = String::new();
        for block in row.select(&TEXT_BOX) {
            flavor.push_str(&normalized_text(block));
            flavor.push('\n');
        }
        let flavor = flavor.trim().to_string();
        Ok(Some(flavor).filter(|text| !text.is_empty()))
    }

    fn power_toughness(&self, document: &Html, card: &mut CardRecord) -> Result<(), IngestError> {
        let Some(raw) = self.value_text(document, "ptRow")? else {
            return Ok(());
        };
        let (power, toughness) = parse_power_toughness(&raw);
        if !raw.contains('/') && card.is_planeswalker() {
            card.loyalty = Some(raw.trim().to_string());
        }
        if toughness.is_none() && !card.is_planeswalker() {
            warn!(id = card.id, value = %raw, "power/toughness row without toughness");
        }
        card.power = power;
        card.toughness = toughness;
        Ok(())
    }

    fn expansion(&self, document: &Html) -> Result<Option<String>, IngestError> {
        Ok(self
            .row(document, "currentSetSymbol")?
            .and_then(|row| row.select(&LINK).last())
            .map(normalized_text)
            .filter(|text| !text.is_empty()))
    }

    fn rarity(&self, document: &Html) -> Result<Option<String>, IngestError> {
        Ok(self
            .value(document, "rarityRow")?
            .and_then(|value| value.select(&SPAN).next())
            .map(normalized_text)
            .filter(|text| !text.is_empty()))
    }

    fn artist(&self, document: &Html) -> Result<Option<String>, IngestError> {
        let Some(value) = self.value(document, "artistRow")? else {
            return Ok(None);
        };
        let artist = match value.select(&LINK).next() {
            Some(link) => normalized_text(link),
            None => normalized_text(value),
        };
        Ok(Some(artist).filter(|text| !text.is_empty()))
    }
}

/// Splits a P/T value. `{1/2}` and `{^2}` are replaced by `½` and `²` first.
///
/// Vanguard cards print `(Hand Modifier: +0 , Life Modifier: +6)`: power is the
/// last character of the first segment, toughness the second-to-last character
/// of the second.
pub fn parse_power_toughness(raw: &str) -> (Option<String>, Option<String>) {
    let value = raw.replace("{1/2}", "½").replace("{^2}", "²");

    if value.contains('/') {
        let mut parts = value.split('/').map(str::trim);
        let power = parts.next().filter(|part| !part.is_empty()).map(String::from);
        let toughness = parts.next().filter(|part| !part.is_empty()).map(String::from);
        return (power, toughness);
    }

    let mut segments = value.split(',').map(|segment| segment.replace('\u{a0}', " "));
    let power = segments
        .next()
        .and_then(|segment| segment.trim().chars().last())
        .map(String::from);
    let toughness = segments
        .next()
        .and_then(|segment| {
            let chars = segment.trim().chars().collect::<Vec<_>>();
            chars.len().checked_sub(2).map(|index| chars[index])
        })
        .map(String::from);
    (power, toughness)
}

/// Bracketed token for an inline symbol image in rules text.
fn symbol_token(alt: &str, id: u32) -> String {
    if alt.eq_ignore_ascii_case("tap") {
        return "{T}".to_string();
    }
    if is_numeric(alt.trim()) {
        return format!("{{{}}}", alt.trim());
    }
    let decoded = decode_label(alt);
    if decoded.eq_ignore_ascii_case(alt.trim()) {
        error!(id, alt, "unexpected image in card text");
    }
    format!("{{{decoded}}}")
}

fn normalized_text(element: ElementRef<'_>) -> String {
    render_text(element, |_| String::new())
}

/// Text content with whitespace collapsed, block elements separated by a space
/// and each `<img>` replaced by `image_token(alt)`.
fn render_text<F>(element: ElementRef<'_>, mut image_token: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut raw = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(inner) => match inner.name() {
                "img" => raw.push_str(&image_token(inner.attr("alt").unwrap_or_default())),
                "div" | "p" | "br" | "li" => raw.push(' '),
                _ => {}
            },
            _ => {}
        }
    }
    WHITESPACE.replace_all(&raw, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(id: u32, detail: &str) -> RawCardBundle {
        RawCardBundle::new(id, detail.as_bytes().to_vec(), Vec::new(), Vec::new())
    }

    fn row(prefix: &str, field: &str, inner: &str) -> String {
        format!("<div id=\"{prefix}{field}\" class=\"row\"><div class=\"label\">x</div><div class=\"value\">{inner}</div></div>")
    }

    #[test]
    fn slash_layout() {
        assert_eq!(
            parse_power_toughness("3/3"),
            (Some("3".to_string()), Some("3".to_string()))
        );
    }

    #[test]
    fn half_glyph_is_not_split() {
        assert_eq!(
            parse_power_toughness("{1/2} / {1/2}"),
            (Some("½".to_string()), Some("½".to_string()))
        );
    }

    #[test]
    fn vanguard_layout() {
        assert_eq!(
            parse_power_toughness("(Hand Modifier: +0 ,\u{a0}Life Modifier: +6)"),
            (Some("0".to_string()), Some("6".to_string()))
        );
    }

    #[test]
    fn empty_detail_page_is_no_card() {
        let mut parser = CardParser::new();
        assert!(parser.parse(bundle(3756, "")).unwrap().is_none());
        assert_eq!(parser.prefix(), DEFAULT_PREFIX);
    }

    #[test]
    fn alternate_prefix_is_remembered() {
        let prefix = format!("{DEFAULT_PREFIX}ctl03_");
        let html = format!(
            "<html><body>{}{}<div id=\"{prefix}currentSetSymbol\"><a href=\"#\">Dark Ascension</a></div></body></html>",
            row(&prefix, "nameRow", "Delver"),
            row(&prefix, "typeRow", "Creature — Human Wizard"),
        );
        let mut parser = CardParser::new();
        let card = parser.parse(bundle(7, &html)).unwrap().unwrap();
        assert_eq!(parser.prefix(), prefix);
        assert_eq!(card.name, "Delver");
        assert_eq!(card.expansion, "Dark Ascension");
    }

    #[test]
    fn blank_name_row_still_claims_prefix() {
        let face = format!("{DEFAULT_PREFIX}ctl02_");
        let html = format!(
            "<html><body>{}{}<div id=\"{DEFAULT_PREFIX}currentSetSymbol\"><a href=\"#\">Alpha</a></div>{}</body></html>",
            row(DEFAULT_PREFIX, "nameRow", "  "),
            row(DEFAULT_PREFIX, "typeRow", "Artifact"),
            row(&face, "nameRow", "Other Face"),
        );
        let mut parser = CardParser::new();
        let card = parser.parse(bundle(8, &html)).unwrap().unwrap();
        assert_eq!(parser.prefix(), DEFAULT_PREFIX);
        assert_eq!(card.name, "");
        assert_eq!(card.type_line, "Artifact");
        assert_eq!(card.expansion, "Alpha");
    }

    #[test]
    fn tap_and_numeric_tokens() {
        assert_eq!(symbol_token("Tap", 1), "{T}");
        assert_eq!(symbol_token(" 2 ", 1), "{2}");
        assert_eq!(symbol_token("Variable Colorless", 1), "{X}");
    }
}
