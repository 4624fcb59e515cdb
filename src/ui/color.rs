//! Hex color strings as edited in the debug panel

use glam::Vec3;

/// Parse `#rgb` or `#rrggbb` into linear 0..1 components
///
/// # Errors
///
/// Returns an error if the string is not a well-formed hex color
pub fn parse_hex_color(text: &str) -> Result<Vec3, ColorParseError> {
    let digits = text
        .trim()
        .strip_prefix('#')
        .ok_or(ColorParseError::MissingHash)?;

    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorParseError::InvalidDigit(bad));
    }

    let channel = |hex: &str| u8::from_str_radix(hex, 16).map(|v| f32::from(v) / 255.0);

    let rgb = match digits.len() {
        3 => {
            let doubled: Vec<String> = digits.chars().map(|c| format!("{c}{c}")).collect();
            [
                channel(&doubled[0]),
                channel(&doubled[1]),
                channel(&doubled[2]),
            ]
        }
        6 => [
            channel(&digits[0..2]),
            channel(&digits[2..4]),
            channel(&digits[4..6]),
        ],
        len => return Err(ColorParseError::InvalidLength(len)),
    };

    match rgb {
        [Ok(r), Ok(g), Ok(b)] => Ok(Vec3::new(r, g, b)),
        _ => Err(ColorParseError::InvalidLength(digits.len())),
    }
}

/// Format components as `#rrggbb`, clamping each to 0..1
#[must_use]
pub fn to_hex_color(rgb: Vec3) -> String {
    let [r, g, b] = to_srgb_bytes(rgb);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Components as bytes for color widgets
#[must_use]
pub fn to_srgb_bytes(rgb: Vec3) -> [u8; 3] {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [byte(rgb.x), byte(rgb.y), byte(rgb.z)]
}

/// Errors that can occur parsing a color string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// String does not start with `#`
    MissingHash,
    /// Wrong number of hex digits
    InvalidLength(usize),
    /// Non-hex character
    InvalidDigit(char),
}

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHash => write!(f, "color must start with '#'"),
            Self::InvalidLength(n) => write!(f, "expected 3 or 6 hex digits, got {n}"),
            Self::InvalidDigit(c) => write!(f, "invalid hex digit '{c}'"),
        }
    }
}

impl std::error::Error for ColorParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_form() {
        assert_eq!(parse_hex_color("#ff0000"), Ok(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(parse_hex_color("#000000"), Ok(Vec3::ZERO));
    }

    #[test]
    fn test_parse_short_form() {
        assert_eq!(parse_hex_color("#0f0"), Ok(Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_hex_color("ff0000"), Err(ColorParseError::MissingHash));
        assert_eq!(
            parse_hex_color("#ff00"),
            Err(ColorParseError::InvalidLength(4))
        );
        assert_eq!(
            parse_hex_color("#gg0000"),
            Err(ColorParseError::InvalidDigit('g'))
        );
    }

    #[test]
    fn test_hex_formatting() {
        assert_eq!(to_hex_color(Vec3::new(1.0, 0.2, 0.0)), "#ff3300");
        assert_eq!(to_hex_color(Vec3::splat(2.0)), "#ffffff");
    }
}
