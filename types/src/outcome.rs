use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for outcome classification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("number out of range: {0} (expected 0-9)")]
    InvalidNumber(u8),
}

/// Color category of a drawn number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Violet,
}

/// Size category of a drawn number. 5-9 are Big, 0-4 are Small.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Big,
    Small,
}

// Color table: 0 and 5 belong to two categories, so a color bet on either
// category wins. Modeled as slices rather than a one-to-one map.
const RED_VIOLET: &[Color] = &[Color::Red, Color::Violet];
const GREEN_VIOLET: &[Color] = &[Color::Green, Color::Violet];
const GREEN: &[Color] = &[Color::Green];
const RED: &[Color] = &[Color::Red];

/// Classified categories of a drawn number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub number: u8,
    pub size: Size,
    colors: &'static [Color],
}

impl Outcome {
    /// All color categories the number belongs to.
    pub fn colors(&self) -> &'static [Color] {
        self.colors
    }

    /// Whether a color bet on `color` wins against this outcome.
    pub fn has_color(&self, color: Color) -> bool {
        self.colors.contains(&color)
    }
}

/// Map a drawn number to its color and size categories.
///
/// Pure and referentially transparent, so backend-declared outcomes can be
/// verified independently.
pub fn classify(number: u8) -> Result<Outcome, ClassifyError> {
    let colors = match number {
        0 => RED_VIOLET,
        5 => GREEN_VIOLET,
        1 | 3 | 7 | 9 => GREEN,
        2 | 4 | 6 | 8 => RED,
        n => return Err(ClassifyError::InvalidNumber(n)),
    };
    let size = if number >= 5 { Size::Big } else { Size::Small };
    Ok(Outcome {
        number,
        size,
        colors,
    })
}
