use serde::{Deserialize, Serialize};

use crate::domain::{Color, Language};
use crate::mana::Mana;

/// As-fetched payloads for one identifier. A failed fetch leaves its field empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCardBundle {
    pub id: u32,
    pub detail: Vec<u8>,
    pub image: Vec<u8>,
    pub language: Vec<u8>,
}

impl RawCardBundle {
    pub fn new(id: u32, detail: Vec<u8>, image: Vec<u8>, language: Vec<u8>) -> Self {
        Self {
            id,
            detail,
            image,
            language,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: u32,
    pub name: String,
    pub mana_cost: Vec<Mana>,
    pub type_line: String,
    pub rules_text: Option<String>,
    pub flavor_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub rarity: Option<String>,
    pub collector_number: Option<String>,
    pub artist: Option<String>,
    pub watermark: Option<String>,
    pub expansion: String,
    pub language: Language,
    #[serde(skip)]
    pub image: Vec<u8>,
}

impl CardRecord {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mana_cost: Vec::new(),
            type_line: String::new(),
            rules_text: None,
            flavor_text: None,
            power: None,
            toughness: None,
            loyalty: None,
            rarity: None,
            collector_number: None,
            artist: None,
            watermark: None,
            expansion: String::new(),
            language: Language::default(),
            image: Vec::new(),
        }
    }

    pub fn converted_cost(&self) -> u32 {
        self.mana_cost.iter().map(Mana::value).sum()
    }

    /// Cost as printed, e.g. `3GU`, `{2/W}{2/W}{2/W}` or `0` when there is none.
    pub fn mana_cost_string(&self) -> String {
        if self.mana_cost.is_empty() {
            return "0".to_string();
        }
        self.mana_cost.iter().map(ToString::to_string).collect()
    }

    /// Distinct colors in cost order; a card without colored symbols is colorless.
    pub fn colors(&self) -> Vec<Color> {
        let mut colors = Vec::new();
        for color in self.mana_cost.iter().flat_map(Mana::colors) {
            if !colors.contains(&color) {
                colors.push(color);
            }
        }
        if colors.is_empty() {
            colors.push(Color::Colorless);
        }
        colors
    }

    pub fn colors_string(&self) -> String {
        self.colors().iter().map(|color| color.letter()).collect()
    }

    pub fn is_planeswalker(&self) -> bool {
        self.type_line.to_lowercase().contains("planeswalker")
    }
}
