//! Hex color helpers used by series labels.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static SHORTHAND_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#?([a-f\d])([a-f\d])([a-f\d])$").expect("valid regex"));

static FULL_HEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#?([a-f\d]{2})([a-f\d]{2})([a-f\d]{2})$").expect("valid regex")
});

/// An RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Converts `#RGB` or `#RRGGBB` (leading `#` optional, any case) to RGB.
pub fn hex2rgb(hex: &str) -> Option<Rgb> {
    let expanded = match SHORTHAND_HEX.captures(hex) {
        Some(caps) => {
            let mut full = String::with_capacity(6);
            for i in 1..=3 {
                full.push_str(&caps[i]);
                full.push_str(&caps[i]);
            }
            full
        }
        None => hex.to_string(),
    };

    let caps = FULL_HEX.captures(&expanded)?;
    let channel = |i: usize| u8::from_str_radix(&caps[i], 16).ok();
    Some(Rgb {
        r: channel(1)?,
        g: channel(2)?,
        b: channel(3)?,
    })
}

/// YIQ brightness below 125 counts as dark. Unparseable input is not dark.
pub fn is_dark_color(hex: &str) -> bool {
    hex2rgb(hex).map(is_dark_rgb).unwrap_or(false)
}

pub fn is_dark_rgb(color: Rgb) -> bool {
    let yiq = (u32::from(color.r) * 299 + u32::from(color.g) * 587 + u32::from(color.b) * 114)
        as f64
        / 1000.0;
    yiq.round() < 125.0
}

pub fn is_valid_hex_color_string(hex: &str) -> bool {
    if hex.is_empty() || hex == "#" {
        return false;
    }
    hex2rgb(hex).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex2rgb_full_and_shorthand() {
        assert_eq!(hex2rgb("#ff0000"), Some(Rgb { r: 255, g: 0, b: 0 }));
        assert_eq!(hex2rgb("#03F"), Some(Rgb { r: 0, g: 0x33, b: 0xff }));
        assert_eq!(hex2rgb("00FF00"), Some(Rgb { r: 0, g: 255, b: 0 }));
        assert_eq!(hex2rgb("#12345"), None);
        assert_eq!(hex2rgb("#gggggg"), None);
    }

    #[test]
    fn test_is_valid_hex_color_string() {
        assert!(is_valid_hex_color_string("#ff0000"));
        assert!(is_valid_hex_color_string("#f00"));
        assert!(!is_valid_hex_color_string(""));
        assert!(!is_valid_hex_color_string("#"));
        assert!(!is_valid_hex_color_string("#ff00"));
        assert!(!is_valid_hex_color_string("red"));
    }

    #[test]
    fn test_is_dark_color() {
        assert!(is_dark_color("#000000"));
        assert!(is_dark_color("#3f51b5"));
        assert!(!is_dark_color("#ffffff"));
        assert!(!is_dark_color("#e6e6e6"));
        assert!(!is_dark_color("not a color"));
    }
}
