use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::Color;

const NUMBER_WORDS: [(&str, u32); 10] = [
    ("ONE", 1),
    ("TWO", 2),
    ("THREE", 3),
    ("FOUR", 4),
    ("FIVE", 5),
    ("SIX", 6),
    ("SEVEN", 7),
    ("EIGHT", 8),
    ("NINE", 9),
    ("TEN", 10),
];

/// One symbol of a mana cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mana {
    Colored(Color),
    Hybrid(Vec<Color>),
    GenericHybrid { generic: u32, color: Color },
    Phyrexian(Color),
    Generic(u32),
    Colorless,
    Variable,
    Unrecognized(String),
}

impl Mana {
    /// Decodes a symbol image label (`"Black or Red"`, `"Phyrexian Red"`, `"3"`).
    pub fn from_label(label: &str) -> Self {
        match Self::from_code(&decode_label(label)) {
            Mana::Unrecognized(_) => Mana::Unrecognized(label.trim().to_string()),
            mana => mana,
        }
    }

    /// Parses the short code produced by [`decode_label`] (`"B/R"`, `"RP"`, `"3"`).
    pub fn from_code(code: &str) -> Self {
        if code.contains('/') {
            let parts = code.split('/').collect::<Vec<_>>();
            let colors = parts
                .iter()
                .map(|part| chromatic(part))
                .collect::<Option<Vec<_>>>();
            if let Some(colors) = colors {
                if colors.len() >= 2 {
                    return Mana::Hybrid(colors);
                }
            }
            if let [generic, color] = parts.as_slice() {
                if let (Ok(generic), Some(color)) = (generic.parse::<u32>(), chromatic(color)) {
                    return Mana::GenericHybrid { generic, color };
                }
            }
            return Mana::Unrecognized(code.to_string());
        }

        if code.len() == 2 {
            if let Some(color) = code.strip_suffix('P').and_then(chromatic) {
                return Mana::Phyrexian(color);
            }
        }

        if is_numeric(code) {
            if let Ok(value) = code.parse::<u32>() {
                return Mana::Generic(value);
            }
        }

        match Color::from_letter(code) {
            Some(Color::Colorless) => Mana::Colorless,
            Some(Color::VariableColorless) => Mana::Variable,
            Some(color) => Mana::Colored(color),
            None => Mana::Unrecognized(code.to_string()),
        }
    }

    /// Contribution to the converted cost.
    pub fn value(&self) -> u32 {
        match self {
            Mana::Colored(_) | Mana::Hybrid(_) | Mana::Phyrexian(_) | Mana::Colorless => 1,
            Mana::GenericHybrid { generic, .. } => *generic,
            Mana::Generic(value) => *value,
            Mana::Variable | Mana::Unrecognized(_) => 0,
        }
    }

    pub fn colors(&self) -> Vec<Color> {
        match self {
            Mana::Colored(color) | Mana::Phyrexian(color) => vec![*color],
            Mana::GenericHybrid { color, .. } => vec![*color],
            Mana::Hybrid(colors) => colors.clone(),
            Mana::Generic(_) | Mana::Colorless | Mana::Variable | Mana::Unrecognized(_) => {
                Vec::new()
            }
        }
    }
}

impl fmt::Display for Mana {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mana::Colored(color) => write!(f, "{}", color.letter()),
            Mana::Hybrid(colors) => {
                let joined = colors
                    .iter()
                    .map(|color| color.letter())
                    .collect::<Vec<_>>()
                    .join("/");
                write!(f, "{{{joined}}}")
            }
            Mana::GenericHybrid { generic, color } => write!(f, "{{{generic}/{}}}", color.letter()),
            Mana::Phyrexian(color) => write!(f, "{}P", color.letter()),
            Mana::Generic(value) => write!(f, "{value}"),
            Mana::Colorless => write!(f, "C"),
            Mana::Variable => write!(f, "X"),
            Mana::Unrecognized(raw) => write!(f, "{{{raw}}}"),
        }
    }
}

/// Color-decoding table for symbol labels.
///
/// Labels are upper-cased with spaces turned into underscores, then
/// `PHYREXIAN_<COLOR>` becomes `<letter>P`, `<A>_OR_<B>` becomes `A/B`, number
/// words become digits and numeric labels pass through. Anything else is
/// logged and returned verbatim.
pub fn decode_label(label: &str) -> String {
    let normalized = label.trim().to_uppercase().replace(' ', "_");
    let phyrexian = normalized.contains("PHYREXIAN_");
    let parts = if phyrexian {
        normalized.split("PHYREXIAN_").collect::<Vec<_>>()
    } else {
        normalized.split("_OR_").collect::<Vec<_>>()
    };

    let mut decoded = Vec::new();
    for part in parts.into_iter().filter(|part| !part.is_empty()) {
        if let Some(color) = Color::from_label(part) {
            let mut code = color.letter().to_string();
            if phyrexian {
                code.push('P');
            }
            decoded.push(code);
        } else if let Some((_, value)) = NUMBER_WORDS.iter().find(|(word, _)| *word == part) {
            decoded.push(value.to_string());
        } else if is_numeric(part) {
            decoded.push(part.to_string());
        } else {
            error!(label, part, "unable to decode mana symbol label");
            return label.trim().to_string();
        }
    }

    if decoded.is_empty() {
        return label.trim().to_string();
    }
    decoded.join("/")
}

pub fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}

fn chromatic(code: &str) -> Option<Color> {
    Color::from_letter(code).filter(|color| color.is_chromatic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_variable_colorless() {
        assert_eq!(decode_label("Variable Colorless"), "X");
        assert_eq!(Mana::from_label("Variable Colorless"), Mana::Variable);
    }

    #[test]
    fn decode_generic_hybrid() {
        assert_eq!(decode_label("Two or White"), "2/W");
        assert_eq!(
            Mana::from_label("Two or White"),
            Mana::GenericHybrid {
                generic: 2,
                color: Color::White
            }
        );
    }

    #[test]
    fn unknown_label_passes_through() {
        assert_eq!(decode_label("Snow"), "Snow");
        assert_eq!(
            Mana::from_label(" Snow "),
            Mana::Unrecognized("Snow".to_string())
        );
    }

    #[test]
    fn symbol_values() {
        assert_eq!(Mana::Generic(5).value(), 5);
        assert_eq!(Mana::Phyrexian(Color::Red).value(), 1);
        assert_eq!(Mana::Variable.value(), 0);
        assert_eq!(
            Mana::GenericHybrid {
                generic: 2,
                color: Color::White
            }
            .value(),
            2
        );
    }

    #[test]
    fn symbol_rendering() {
        assert_eq!(Mana::Hybrid(vec![Color::Black, Color::Red]).to_string(), "{B/R}");
        assert_eq!(Mana::Phyrexian(Color::Red).to_string(), "RP");
        assert_eq!(Mana::Colored(Color::Blue).to_string(), "U");
    }
}
