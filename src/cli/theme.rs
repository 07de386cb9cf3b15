use crate::config::{
    HexColor, StyleOverride, ThemeConfig as UserThemeConfig, ThemeModifier, ThemePreset, ThemeToken,
};
use crossterm::style::{Attribute, Attributes, Color, ContentStyle, StyledContent};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Theme {
    enabled: bool,
    styles: HashMap<ThemeToken, ContentStyle>,
}

impl Theme {
    #[cfg(test)]
    pub fn new(enabled: bool) -> Self {
        Self::from_config(enabled, &UserThemeConfig::default())
    }

    pub fn from_config(enabled: bool, config: &UserThemeConfig) -> Self {
        let mut styles = preset_styles(config.preset);
        for (token, override_style) in &config.styles {
            let base = styles.get(token).copied().unwrap_or_default();
            styles.insert(*token, merge_style(base, override_style));
        }

        Self { enabled, styles }
    }

    pub fn style(&self, token: ThemeToken) -> ContentStyle {
        if !self.enabled {
            return disabled_style(token);
        }

        self.styles.get(&token).copied().unwrap_or_default()
    }

    pub fn paint<D: std::fmt::Display>(&self, token: ThemeToken, content: D) -> StyledContent<D> {
        self.style(token).apply(content)
    }
}

fn preset_styles(preset: ThemePreset) -> HashMap<ThemeToken, ContentStyle> {
    ThemeToken::ALL
        .iter()
        .copied()
        .map(|token| (token, preset_style(preset, token)))
        .collect()
}

fn preset_style(preset: ThemePreset, token: ThemeToken) -> ContentStyle {
    match preset {
        ThemePreset::Default => default_preset_style(token),
        ThemePreset::Light => light_preset_style(token),
        ThemePreset::HighContrast => high_contrast_preset_style(token),
    }
}

fn fg(r: u8, g: u8, b: u8) -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Rgb { r, g, b }),
        ..ContentStyle::default()
    }
}

fn with(style: ContentStyle, attribute: Attribute) -> ContentStyle {
    ContentStyle {
        attributes: style.attributes.with(attribute),
        ..style
    }
}

fn default_preset_style(token: ThemeToken) -> ContentStyle {
    match token {
        ThemeToken::Heading => with(fg(122, 162, 247), Attribute::Bold),
        ThemeToken::CodeBlock => ContentStyle {
            background_color: Some(Color::Rgb {
                r: 22,
                g: 22,
                b: 30,
            }),
            ..fg(192, 202, 245)
        },
        ThemeToken::CodeLanguage => with(fg(138, 138, 138), Attribute::Italic),
        ThemeToken::ListBullet => with(fg(158, 206, 106), Attribute::Bold),
        ThemeToken::Paragraph | ThemeToken::UserMessage => ContentStyle {
            foreground_color: Some(Color::White),
            ..ContentStyle::default()
        },
        ThemeToken::ModelMessage => fg(219, 75, 75),
        ThemeToken::SystemInfo => fg(86, 95, 137),
        ThemeToken::SystemError => with(fg(247, 118, 142), Attribute::Bold),
        ThemeToken::Prompt => with(fg(158, 206, 106), Attribute::Bold),
    }
}

fn light_preset_style(token: ThemeToken) -> ContentStyle {
    match token {
        ThemeToken::Heading => with(fg(31, 111, 235), Attribute::Bold),
        ThemeToken::CodeBlock => ContentStyle {
            background_color: Some(Color::Rgb {
                r: 246,
                g: 248,
                b: 250,
            }),
            ..fg(36, 41, 47)
        },
        ThemeToken::CodeLanguage => with(fg(80, 90, 110), Attribute::Italic),
        ThemeToken::ListBullet => with(fg(5, 80, 40), Attribute::Bold),
        ThemeToken::Paragraph | ThemeToken::UserMessage => fg(36, 41, 47),
        ThemeToken::ModelMessage => fg(130, 70, 0),
        ThemeToken::SystemInfo => fg(36, 70, 120),
        ThemeToken::SystemError => with(fg(176, 0, 32), Attribute::Bold),
        ThemeToken::Prompt => with(fg(176, 64, 0), Attribute::Bold),
    }
}

fn high_contrast_preset_style(token: ThemeToken) -> ContentStyle {
    match token {
        ThemeToken::Heading => with(
            with(fg(255, 215, 0), Attribute::Bold),
            Attribute::Underlined,
        ),
        ThemeToken::CodeBlock => ContentStyle {
            background_color: Some(Color::Rgb { r: 0, g: 0, b: 0 }),
            ..fg(135, 206, 250)
        },
        ThemeToken::CodeLanguage => with(fg(220, 220, 220), Attribute::Italic),
        ThemeToken::ListBullet => with(fg(0, 255, 127), Attribute::Bold),
        ThemeToken::Paragraph | ThemeToken::UserMessage => fg(255, 255, 255),
        ThemeToken::ModelMessage => fg(255, 215, 0),
        ThemeToken::SystemInfo => fg(173, 216, 230),
        ThemeToken::SystemError => with(fg(255, 64, 64), Attribute::Bold),
        ThemeToken::Prompt => with(fg(0, 255, 127), Attribute::Bold),
    }
}

fn disabled_style(token: ThemeToken) -> ContentStyle {
    match token {
        ThemeToken::Prompt => with(ContentStyle::default(), Attribute::Bold),
        _ => ContentStyle::default(),
    }
}

fn merge_style(base: ContentStyle, override_style: &StyleOverride) -> ContentStyle {
    let mut merged = base;

    if let Some(fg) = override_style.fg {
        merged.foreground_color = Some(color_from_hex(fg));
    }

    if let Some(bg) = override_style.bg {
        merged.background_color = Some(color_from_hex(bg));
    }

    if let Some(modifiers) = &override_style.modifiers {
        merged.attributes = modifiers_to_attributes(modifiers);
    }

    merged
}

fn color_from_hex(color: HexColor) -> Color {
    Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

fn modifiers_to_attributes(modifiers: &[ThemeModifier]) -> Attributes {
    modifiers
        .iter()
        .copied()
        .fold(Attributes::default(), |acc, modifier| {
            acc.with(modifier_to_attribute(modifier))
        })
}

fn modifier_to_attribute(modifier: ThemeModifier) -> Attribute {
    match modifier {
        ThemeModifier::Bold => Attribute::Bold,
        ThemeModifier::Dim => Attribute::Dim,
        ThemeModifier::Italic => Attribute::Italic,
        ThemeModifier::Underlined => Attribute::Underlined,
        ThemeModifier::Reversed => Attribute::Reverse,
        ThemeModifier::CrossedOut => Attribute::CrossedOut,
    }
}
