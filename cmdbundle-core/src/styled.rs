//! Styled chat text handed to [`crate::host::ServerHost::send_text`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TextColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Decoration {
    Bold,
    Italic,
    Underlined,
    Strikethrough,
    Obfuscated,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyledText {
    pub text: String,
    pub color: Option<TextColor>,
    pub decorations: Vec<Decoration>,
}

impl StyledText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn colored(text: impl Into<String>, color: TextColor) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
            decorations: Vec::new(),
        }
    }

    /// Applies a `color,decoration,...` spec. Unknown parts are ignored and the last color wins.
    pub fn from_spec(spec: Option<&str>, text: impl Into<String>) -> Self {
        let mut styled = Self::plain(text);
        let Some(spec) = spec else {
            return styled;
        };
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if let Ok(color) = TextColor::from_str(part) {
                styled.color = Some(color);
            } else if let Ok(decoration) = Decoration::from_str(part) {
                if !styled.decorations.contains(&decoration) {
                    styled.decorations.push(decoration);
                }
            }
        }
        styled
    }
}

impl std::fmt::Display for StyledText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_spec() {
        let styled = StyledText::from_spec(Some("GOLD, bold,italic"), "Welcome");
        assert_eq!(styled.text, "Welcome");
        assert_eq!(styled.color, Some(TextColor::Gold));
        assert_eq!(styled.decorations, vec![Decoration::Bold, Decoration::Italic]);
    }

    #[test]
    fn test_unknown_parts_ignored_last_color_wins() {
        let styled = StyledText::from_spec(Some("sparkly,red,dark_blue"), "x");
        assert_eq!(styled.color, Some(TextColor::DarkBlue));
        assert!(styled.decorations.is_empty());
    }

    #[test]
    fn test_no_spec() {
        assert_eq!(StyledText::from_spec(None, "hi"), StyledText::plain("hi"));
    }
}
