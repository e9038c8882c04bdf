use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
    VariableColorless,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Colorless,
        Color::VariableColorless,
    ];

    /// Single-letter code as printed in mana costs.
    pub fn letter(self) -> &'static str {
        match self {
            Color::White => "W",
            Color::Blue => "U",
            Color::Black => "B",
            Color::Red => "R",
            Color::Green => "G",
            Color::Colorless => "C",
            Color::VariableColorless => "X",
        }
    }

    /// True for the five real colors; colorless markers are not chromatic.
    pub fn is_chromatic(self) -> bool {
        !matches!(self, Color::Colorless | Color::VariableColorless)
    }

    pub fn from_letter(letter: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.letter() == letter)
    }

    /// Matches the upper-snake-case label form, e.g. `VARIABLE_COLORLESS`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "WHITE" => Some(Color::White),
            "BLUE" => Some(Color::Blue),
            "BLACK" => Some(Color::Black),
            "RED" => Some(Color::Red),
            "GREEN" => Some(Color::Green),
            "COLORLESS" => Some(Color::Colorless),
            "VARIABLE_COLORLESS" => Some(Color::VariableColorless),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    German,
    French,
    Italian,
    Spanish,
    Portuguese,
    Japanese,
    ChineseSimplified,
    ChineseTraditional,
    Russian,
    Korean,
    UnknownNonEnglish,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::English,
        Language::German,
        Language::French,
        Language::Italian,
        Language::Spanish,
        Language::Portuguese,
        Language::Japanese,
        Language::ChineseSimplified,
        Language::ChineseTraditional,
        Language::Russian,
        Language::Korean,
        Language::UnknownNonEnglish,
    ];

    /// Label as it appears on the language-variant page.
    pub fn label(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::German => "German",
            Language::French => "French",
            Language::Italian => "Italian",
            Language::Spanish => "Spanish",
            Language::Portuguese => "Portuguese (Brazil)",
            Language::Japanese => "Japanese",
            Language::ChineseSimplified => "Chinese Simplified",
            Language::ChineseTraditional => "Chinese Traditional",
            Language::Russian => "Russian",
            Language::Korean => "Korean",
            Language::UnknownNonEnglish => "Unknown (non-English)",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Multiverse identifier addressing one card's remote resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MultiverseId(u32);

impl MultiverseId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MultiverseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MultiverseId {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.parse::<u32>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(IngestError::InvalidIdentifier(value.to_string())),
        }
    }
}

/// Parses a comma-separated id list such as `"1,984, 6514"`.
pub fn parse_id_list(value: &str) -> Result<Vec<u32>, IngestError> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.parse::<MultiverseId>().map(MultiverseId::get))
        .collect()
}
