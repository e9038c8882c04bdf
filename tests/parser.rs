use assert_matches::assert_matches;

use gatherer_ingest::card::{CardRecord, RawCardBundle};
use gatherer_ingest::domain::{Color, Language};
use gatherer_ingest::error::IngestError;
use gatherer_ingest::parser::{CardParser, DEFAULT_PREFIX, parse_power_toughness};

const ENGLISH_LANGUAGES: &str = include_str!("fixtures/languages_english_card.html");

fn parse(id: u32, detail: &str) -> Option<CardRecord> {
    let bundle = RawCardBundle::new(
        id,
        detail.as_bytes().to_vec(),
        b"\x89PNG".to_vec(),
        ENGLISH_LANGUAGES.as_bytes().to_vec(),
    );
    CardParser::new().parse(bundle).unwrap()
}

#[test]
fn archangel_cost_and_text() {
    let card = parse(4, include_str!("fixtures/archangel.html")).unwrap();
    assert_eq!(card.name, "Archangel");
    assert_eq!(card.mana_cost_string(), "5WW");
    assert_eq!(card.converted_cost(), 7);
    assert_eq!(card.colors(), vec![Color::White]);
    assert_eq!(card.type_line, "Creature — Angel");
    assert_eq!(card.rules_text.as_deref(), Some("Flying, vigilance"));
    assert_eq!(
        card.flavor_text.as_deref(),
        Some("Her hammer spoke of mercy; her sword, of judgment.")
    );
    assert_eq!(card.power.as_deref(), Some("5"));
    assert_eq!(card.toughness.as_deref(), Some("5"));
    assert_eq!(card.loyalty, None);
    assert_eq!(card.expansion, "Portal");
    assert_eq!(card.rarity.as_deref(), Some("Rare"));
    assert_eq!(card.artist.as_deref(), Some("Quinton Hoover"));
    assert_eq!(card.image, b"\x89PNG");
    assert_eq!(card.language, Language::English);
}

#[test]
fn basic_land_has_zero_cost() {
    let card = parse(383283, include_str!("fixtures/island.html")).unwrap();
    assert!(card.mana_cost.is_empty());
    assert_eq!(card.mana_cost_string(), "0");
    assert_eq!(card.converted_cost(), 0);
    assert_eq!(card.colors(), vec![Color::Colorless]);
    assert_eq!(card.rules_text, None);
    assert_eq!(card.power, None);
    assert_eq!(card.collector_number.as_deref(), Some("235"));
}

#[test]
fn phyrexian_symbols() {
    let card = parse(230076, include_str!("fixtures/act_of_aggression.html")).unwrap();
    assert_eq!(card.mana_cost_string(), "3RPRP");
    assert_eq!(card.converted_cost(), 5);
    assert_eq!(card.colors_string(), "R");
    assert!(
        card.rules_text
            .as_deref()
            .unwrap()
            .starts_with("({RP} can be paid with either {R} or 2 life.)")
    );
}

#[test]
fn hybrid_symbols_in_cost_and_text() {
    let card = parse(107451, include_str!("fixtures/avatar_of_discord.html")).unwrap();
    assert_eq!(card.mana_cost_string(), "{B/R}{B/R}{B/R}");
    assert_eq!(card.converted_cost(), 3);
    assert_eq!(card.colors(), vec![Color::Black, Color::Red]);
    assert_eq!(
        card.rules_text.as_deref(),
        Some(
            "({B/R} can be paid with either {B} or {R}.) Flying When Avatar of Discord enters the battlefield, sacrifice it unless you discard two cards."
        )
    );
}

#[test]
fn generic_hybrid_symbols() {
    let card = parse(146017, include_str!("fixtures/spectral_procession.html")).unwrap();
    assert_eq!(card.mana_cost_string(), "{2/W}{2/W}{2/W}");
    assert_eq!(card.converted_cost(), 6);
    assert_eq!(card.colors(), vec![Color::White]);
}

#[test]
fn vanguard_modifiers() {
    let card = parse(4965, include_str!("fixtures/barrin_vanguard.html")).unwrap();
    assert_eq!(card.type_line, "Vanguard");
    assert_eq!(card.power.as_deref(), Some("0"));
    assert_eq!(card.toughness.as_deref(), Some("6"));
    assert_eq!(card.loyalty, None);
}

#[test]
fn planeswalker_loyalty() {
    let card = parse(140222, include_str!("fixtures/jace_beleren.html")).unwrap();
    assert!(card.is_planeswalker());
    assert_eq!(card.loyalty.as_deref(), Some("3"));
    assert_eq!(card.power.as_deref(), Some("3"));
    assert_eq!(card.toughness, None);
}

#[test]
fn double_faced_card_loads_first_face() {
    let mut parser = CardParser::new();
    let bundle = RawCardBundle::new(
        262875,
        include_str!("fixtures/huntmaster_of_the_fells.html")
            .as_bytes()
            .to_vec(),
        Vec::new(),
        Vec::new(),
    );
    let card = parser.parse(bundle).unwrap().unwrap();
    assert_eq!(parser.prefix(), format!("{DEFAULT_PREFIX}ctl02_"));
    assert_eq!(card.name, "Huntmaster of the Fells");
    assert_eq!(card.collector_number.as_deref(), Some("140a"));
    assert_eq!(card.converted_cost(), 4);
    assert_eq!(card.colors_string(), "RG");

    let island = RawCardBundle::new(
        383283,
        include_str!("fixtures/island.html").as_bytes().to_vec(),
        Vec::new(),
        Vec::new(),
    );
    parser.parse(island).unwrap().unwrap();
    assert_eq!(parser.prefix(), DEFAULT_PREFIX);
}

#[test]
fn tap_symbol_and_plain_artist() {
    let card = parse(1063, include_str!("fixtures/bazaar_of_baghdad.html")).unwrap();
    assert_eq!(
        card.rules_text.as_deref(),
        Some("{T}: Draw two cards, then discard three cards.")
    );
    assert_eq!(card.artist.as_deref(), Some("(none)"));
}

#[test]
fn variable_symbol_in_text() {
    let card = parse(5, include_str!("fixtures/clockwork_beast.html")).unwrap();
    let text = card.rules_text.unwrap();
    assert!(text.contains("{X}, {T}: Put up to X +1/+0 counters"));
    assert_eq!(card.power.as_deref(), Some("0"));
    assert_eq!(card.toughness.as_deref(), Some("4"));
}

#[test]
fn watermark() {
    let card = parse(366241, include_str!("fixtures/midnight_recovery.html")).unwrap();
    assert_eq!(card.watermark.as_deref(), Some("Dimir"));
    assert_eq!(card.mana_cost_string(), "3B");
}

#[test]
fn missing_rarity_is_none() {
    let card = parse(247180, include_str!("fixtures/shield_of_kaldra.html")).unwrap();
    assert_eq!(card.rarity, None);
    assert_eq!(card.watermark, None);
    assert!(card.rules_text.unwrap().ends_with("Equip {4}"));
}

#[test]
fn unassigned_identifier_is_no_card() {
    assert!(parse(3756, include_str!("fixtures/unassigned.html")).is_none());
}

#[test]
fn empty_bundle_is_no_card() {
    let bundle = RawCardBundle::new(77, Vec::new(), Vec::new(), Vec::new());
    assert!(CardParser::new().parse(bundle).unwrap().is_none());
}

#[test]
fn missing_type_line_is_an_error() {
    let html = format!(
        "<div id=\"{DEFAULT_PREFIX}nameRow\"><div class=\"value\">Nameless</div></div>"
    );
    let bundle = RawCardBundle::new(9, html.into_bytes(), Vec::new(), Vec::new());
    let err = CardParser::new().parse(bundle).unwrap_err();
    assert_matches!(
        err,
        IngestError::MissingField {
            id: 9,
            field: "type line"
        }
    );
}

#[test]
fn flavor_blocks_join_with_newlines() {
    let html = format!(
        concat!(
            "<html><body>",
            "<div id=\"{p}nameRow\"><div class=\"value\">Serra Angel</div></div>",
            "<div id=\"{p}typeRow\"><div class=\"value\">Creature — Angel</div></div>",
            "<div id=\"{p}FlavorText\" class=\"row\"><div class=\"value\">",
            "<div class=\"cardtextbox\"><i>First   line.</i></div>",
            "<div class=\"cardtextbox\"><i>—Someone</i></div>",
            "</div></div>",
            "<div id=\"{p}currentSetSymbol\"><a href=\"#\">Alpha</a></div>",
            "</body></html>"
        ),
        p = DEFAULT_PREFIX
    );
    let card = parse(11, &html).unwrap();
    assert_eq!(card.flavor_text.as_deref(), Some("First line.\n—Someone"));
}

#[test]
fn power_toughness_layouts() {
    assert_eq!(
        parse_power_toughness("* / 1{1/2}"),
        (Some("*".to_string()), Some("1½".to_string()))
    );
    assert_eq!(
        parse_power_toughness("2{^2} / 2{^2}"),
        (Some("2²".to_string()), Some("2²".to_string()))
    );
    assert_eq!(parse_power_toughness("5"), (Some("5".to_string()), None));
}
