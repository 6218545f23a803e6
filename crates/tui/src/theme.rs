use gamevault_core::ThemeConfig;
use ratatui::style::Color;
use tracing::warn;

/// Resolved colour palette for the terminal UI.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub panel: Color,
    pub header: Color,
    pub text: Color,
    pub accent: Color,
    pub accent_alt: Color,
    pub muted: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub on_accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        let (theme, _) = Theme::from_config(&ThemeConfig::default());
        theme
    }
}

impl Theme {
    /// Build the palette from configuration. Unparseable entries keep the
    /// built-in colour and are listed in the returned names.
    pub fn from_config(config: &ThemeConfig) -> (Self, Vec<&'static str>) {
        let fallback = ThemeConfig::default();
        let mut rejected = Vec::new();
        let mut pick = |name: &'static str, value: &str, default: &str| {
            parse_hex_color(value).unwrap_or_else(|| {
                warn!(key = name, value, "Ignoring invalid theme colour");
                rejected.push(name);
                parse_hex_color(default).unwrap_or(Color::Reset)
            })
        };

        let background = pick("background", &config.background, &fallback.background);
        let panel = pick("panel", &config.panel, &fallback.panel);
        let header = pick("header", &config.header, &fallback.header);
        let text = pick("text", &config.text, &fallback.text);
        let accent = pick("accent", &config.accent, &fallback.accent);
        let accent_alt = pick("accent_alt", &config.accent_alt, &fallback.accent_alt);
        let muted = pick("muted", &config.muted, &fallback.muted);
        let success = pick("success", &config.success, &fallback.success);
        let warning = pick("warning", &config.warning, &fallback.warning);
        let danger = pick("danger", &config.danger, &fallback.danger);

        let theme = Self {
            background,
            panel,
            header,
            text,
            accent,
            accent_alt,
            muted,
            selection_bg: accent,
            selection_fg: contrast_color(&accent, text),
            success,
            warning,
            danger,
            on_accent: contrast_color(&accent, Color::Black),
        };
        (theme, rejected)
    }
}

pub fn parse_hex_color(input: &str) -> Option<Color> {
    let trimmed = input.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

/// Black or white, whichever reads better on `color`.
pub fn contrast_color(color: &Color, fallback: Color) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let luminance =
                0.299 * f64::from(*r) + 0.587 * f64::from(*g) + 0.114 * f64::from(*b);
            if luminance > 186.0 {
                Color::Black
            } else {
                Color::White
            }
        }
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(parse_hex_color("#6A5ACD"), Some(Color::Rgb(0x6a, 0x5a, 0xcd)));
        assert_eq!(parse_hex_color("0xffffff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(parse_hex_color(" #fd0 "), Some(Color::Rgb(0xff, 0xdd, 0x00)));
        assert_eq!(parse_hex_color("purple"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
    }

    #[test]
    fn contrast_picks_readable_text() {
        assert_eq!(contrast_color(&Color::Rgb(255, 215, 0), Color::Reset), Color::Black);
        assert_eq!(contrast_color(&Color::Rgb(30, 30, 30), Color::Reset), Color::White);
        assert_eq!(contrast_color(&Color::Cyan, Color::Gray), Color::Gray);
    }

    #[test]
    fn invalid_entries_fall_back_to_defaults() {
        let config = ThemeConfig {
            accent: "not-a-colour".to_string(),
            danger: "#f00".to_string(),
            ..ThemeConfig::default()
        };
        let (theme, rejected) = Theme::from_config(&config);
        assert_eq!(rejected, vec!["accent"]);
        assert_eq!(theme.accent, Color::Rgb(0x6a, 0x5a, 0xcd));
        assert_eq!(theme.danger, Color::Rgb(255, 0, 0));
        assert_eq!(theme.on_accent, Color::White);
    }
}
