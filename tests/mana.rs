use gatherer_ingest::domain::Color;
use gatherer_ingest::mana::{Mana, decode_label};

#[test]
fn decode_table() {
    assert_eq!(decode_label("Black"), "B");
    assert_eq!(decode_label("Black or White"), "B/W");
    assert_eq!(decode_label("Phyrexian Black"), "BP");
    assert_eq!(decode_label("Two"), "2");
    assert_eq!(decode_label("3"), "3");
    assert_eq!(decode_label("Green or Blue"), "G/U");
}

#[test]
fn labels_to_symbols() {
    assert_eq!(Mana::from_label("White"), Mana::Colored(Color::White));
    assert_eq!(Mana::from_label("Colorless"), Mana::Colorless);
    assert_eq!(Mana::from_label("10"), Mana::Generic(10));
    assert_eq!(
        Mana::from_label("Black or White"),
        Mana::Hybrid(vec![Color::Black, Color::White])
    );
    assert_eq!(Mana::from_label("Phyrexian Green"), Mana::Phyrexian(Color::Green));
}

#[test]
fn unrecognized_label_keeps_raw_text() {
    let mana = Mana::from_label("Half a Red");
    assert_eq!(mana, Mana::Unrecognized("Half a Red".to_string()));
    assert_eq!(mana.value(), 0);
    assert!(mana.colors().is_empty());
    assert_eq!(mana.to_string(), "{Half a Red}");
}
