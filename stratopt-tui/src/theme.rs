//! Named color palettes.
//!
//! The palette name is the persisted `theme` setting. Unknown names fall
//! back to `slate`, so an old or hand-edited settings file still renders.

use ratatui::style::{Color, Modifier, Style};

/// Palette names in the order the Settings panel cycles through them.
pub const THEME_NAMES: [&str; 5] = ["slate", "dark", "light", "midnight", "neon"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    /// Focus, titles, the active panel border
    pub accent: Color,
    /// Gains, BUY markers
    pub positive: Color,
    /// Losses, SELL markers, errors
    pub negative: Color,
    pub warning: Color,
    /// Secondary curve (buy-and-hold)
    pub neutral: Color,
    pub muted: Color,
    pub text: Color,
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::slate()
    }
}

impl Theme {
    /// Look up a palette by its settings name.
    pub fn named(name: &str) -> Self {
        match name {
            "dark" => Self::dark(),
            "light" => Self::light(),
            "midnight" => Self::midnight(),
            "neon" => Self::neon(),
            "slate" => Self::slate(),
            other => {
                tracing::debug!("unknown theme {other:?}, using slate");
                Self::slate()
            }
        }
    }

    /// Name of the palette after `current`, wrapping around.
    pub fn next_name(current: &str) -> &'static str {
        let pos = THEME_NAMES.iter().position(|n| *n == current).unwrap_or(0);
        THEME_NAMES[(pos + 1) % THEME_NAMES.len()]
    }

    pub fn slate() -> Self {
        Self {
            name: "slate",
            accent: Color::Rgb(96, 165, 250),
            positive: Color::Rgb(74, 222, 128),
            negative: Color::Rgb(248, 113, 113),
            warning: Color::Rgb(251, 191, 36),
            neutral: Color::Rgb(148, 163, 184),
            muted: Color::Rgb(100, 116, 139),
            text: Color::Rgb(226, 232, 240),
            border: Color::Rgb(71, 85, 105),
        }
    }

    pub fn dark() -> Self {
        Self {
            name: "dark",
            accent: Color::Rgb(129, 140, 248),
            positive: Color::Rgb(52, 211, 153),
            negative: Color::Rgb(244, 63, 94),
            warning: Color::Rgb(250, 204, 21),
            neutral: Color::Rgb(161, 161, 170),
            muted: Color::Rgb(113, 113, 122),
            text: Color::Rgb(244, 244, 245),
            border: Color::Rgb(63, 63, 70),
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light",
            accent: Color::Rgb(37, 99, 235),
            positive: Color::Rgb(22, 163, 74),
            negative: Color::Rgb(220, 38, 38),
            warning: Color::Rgb(202, 138, 4),
            neutral: Color::Rgb(82, 82, 91),
            muted: Color::Rgb(113, 113, 122),
            text: Color::Rgb(24, 24, 27),
            border: Color::Rgb(161, 161, 170),
        }
    }

    pub fn midnight() -> Self {
        Self {
            name: "midnight",
            accent: Color::Rgb(56, 189, 248),
            positive: Color::Rgb(45, 212, 191),
            negative: Color::Rgb(251, 113, 133),
            warning: Color::Rgb(253, 186, 116),
            neutral: Color::Rgb(165, 180, 252),
            muted: Color::Rgb(71, 85, 105),
            text: Color::Rgb(203, 213, 225),
            border: Color::Rgb(30, 41, 59),
        }
    }

    pub fn neon() -> Self {
        Self {
            name: "neon",
            accent: Color::Rgb(0, 255, 255),
            positive: Color::Rgb(0, 255, 128),
            negative: Color::Rgb(255, 20, 147),
            warning: Color::Rgb(255, 165, 0),
            neutral: Color::Rgb(180, 130, 255),
            muted: Color::Rgb(100, 149, 237),
            text: Color::Rgb(255, 255, 255),
            border: Color::Rgb(60, 60, 80),
        }
    }

    pub fn accent(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn accent_bold(&self) -> Style {
        self.accent().add_modifier(Modifier::BOLD)
    }

    pub fn positive(&self) -> Style {
        Style::default().fg(self.positive)
    }

    pub fn negative(&self) -> Style {
        Style::default().fg(self.negative)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn neutral(&self) -> Style {
        Style::default().fg(self.neutral)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            self.accent()
        } else {
            Style::default().fg(self.border)
        }
    }

    /// Style for a signed metric.
    pub fn signed(&self, value: f64) -> Style {
        if value >= 0.0 {
            self.positive()
        } else {
            self.negative()
        }
    }
}
