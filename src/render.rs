//! Terminal rendering for vectors and scores

use crossterm::style::{Color, Stylize};

/// Ten equal-width bands over [-1, 1], warmest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueBand {
    Red,
    Orange,
    Amber,
    Yellow,
    Lime,
    Green,
    Emerald,
    Teal,
    Cyan,
    Sky,
}

impl ValueBand {
    pub fn of(value: f64) -> ValueBand {
        if value > 0.8 {
            ValueBand::Red
        } else if value > 0.6 {
            ValueBand::Orange
        } else if value > 0.4 {
            ValueBand::Amber
        } else if value > 0.2 {
            ValueBand::Yellow
        } else if value > 0.0 {
            ValueBand::Lime
        } else if value > -0.2 {
            ValueBand::Green
        } else if value > -0.4 {
            ValueBand::Emerald
        } else if value > -0.6 {
            ValueBand::Teal
        } else if value > -0.8 {
            ValueBand::Cyan
        } else {
            ValueBand::Sky
        }
    }

    /// Position of the band, 0 for the warmest
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn color(self) -> Color {
        match self {
            ValueBand::Red => Color::Rgb { r: 248, g: 113, b: 113 },
            ValueBand::Orange => Color::Rgb { r: 251, g: 146, b: 60 },
            ValueBand::Amber => Color::Rgb { r: 251, g: 191, b: 36 },
            ValueBand::Yellow => Color::Rgb { r: 250, g: 204, b: 21 },
            ValueBand::Lime => Color::Rgb { r: 163, g: 230, b: 53 },
            ValueBand::Green => Color::Rgb { r: 74, g: 222, b: 128 },
            ValueBand::Emerald => Color::Rgb { r: 52, g: 211, b: 153 },
            ValueBand::Teal => Color::Rgb { r: 45, g: 212, b: 191 },
            ValueBand::Cyan => Color::Rgb { r: 34, g: 211, b: 238 },
            ValueBand::Sky => Color::Rgb { r: 56, g: 189, b: 248 },
        }
    }
}

/// One cell per component: a colored block, or the band index when
/// `color` is off.
pub fn heat_strip(vector: &[f64], color: bool) -> String {
    vector.iter()
        .map(|value| {
            let band = ValueBand::of(*value);
            if color {
                "█".with(band.color()).to_string()
            } else {
                band.index().to_string()
            }
        })
        .collect()
}

/// `[0.1234, -0.5000, ...]`
pub fn format_vector(vector: &[f64]) -> String {
    let parts: Vec<String> = vector.iter().map(|value| format!("{value:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

pub fn format_score(similarity: f64) -> String {
    format!("{similarity:.4}")
}
