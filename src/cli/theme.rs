use crate::config::{
    HexColor, StyleOverride, ThemeConfig as UserThemeConfig, ThemeModifier, ThemePreset, ThemeToken,
};
use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Theme {
    enabled: bool,
    styles: HashMap<ThemeToken, Style>,
}

impl Theme {
    #[cfg(any(test, feature = "test-support"))]
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

    /// Colors are off when `NO_COLOR` is set to anything non-empty.
    pub fn from_env(config: &UserThemeConfig) -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        Self::from_config(!no_color, config)
    }

    pub fn style(&self, token: ThemeToken) -> Style {
        if !self.enabled {
            return disabled_style(token);
        }

        self.styles.get(&token).copied().unwrap_or_default()
    }
}

fn preset_styles(preset: ThemePreset) -> HashMap<ThemeToken, Style> {
    ThemeToken::all()
        .iter()
        .copied()
        .map(|token| (token, preset_style(preset, token)))
        .collect()
}

fn preset_style(preset: ThemePreset, token: ThemeToken) -> Style {
    match preset {
        ThemePreset::Default => default_preset_style(token),
        ThemePreset::Light => light_preset_style(token),
        ThemePreset::HighContrast => high_contrast_preset_style(token),
    }
}

fn default_preset_style(token: ThemeToken) -> Style {
    match token {
        ThemeToken::Title => Style::default()
            .fg(Color::Rgb(122, 162, 247))
            .add_modifier(Modifier::BOLD),
        ThemeToken::Intro => Style::default().fg(Color::Rgb(192, 202, 245)),
        ThemeToken::PanelTitle => Style::default()
            .fg(Color::Rgb(224, 175, 104))
            .add_modifier(Modifier::BOLD),
        ThemeToken::TableHeader => Style::default()
            .fg(Color::Rgb(224, 175, 104))
            .add_modifier(Modifier::UNDERLINED),
        ThemeToken::TableCell => Style::default().fg(Color::Rgb(169, 177, 214)),
        ThemeToken::UserLabel => Style::default()
            .fg(Color::Rgb(158, 206, 106))
            .add_modifier(Modifier::BOLD),
        ThemeToken::UserText => Style::default().fg(Color::White),
        ThemeToken::AssistantLabel => Style::default()
            .fg(Color::Rgb(187, 154, 247))
            .add_modifier(Modifier::BOLD),
        ThemeToken::AssistantText => Style::default().fg(Color::Rgb(192, 202, 245)),
        ThemeToken::AssistantWaiting => Style::default()
            .fg(Color::Rgb(187, 154, 247))
            .add_modifier(Modifier::ITALIC),
        ThemeToken::SystemInfo | ThemeToken::Status => Style::default().fg(Color::Rgb(86, 95, 137)),
        ThemeToken::SystemError => Style::default()
            .fg(Color::Rgb(247, 118, 142))
            .add_modifier(Modifier::BOLD),
        ThemeToken::Prompt => Style::default()
            .fg(Color::Rgb(158, 206, 106))
            .add_modifier(Modifier::BOLD),
        ThemeToken::InputBlock => Style::default().bg(Color::Rgb(22, 22, 30)).fg(Color::White),
    }
}

fn light_preset_style(token: ThemeToken) -> Style {
    match token {
        ThemeToken::Title => Style::default()
            .fg(Color::Rgb(31, 111, 235))
            .add_modifier(Modifier::BOLD),
        ThemeToken::Intro => Style::default().fg(Color::Rgb(36, 41, 47)),
        ThemeToken::PanelTitle => Style::default()
            .fg(Color::Rgb(130, 70, 0))
            .add_modifier(Modifier::BOLD),
        ThemeToken::TableHeader => Style::default()
            .fg(Color::Rgb(130, 70, 0))
            .add_modifier(Modifier::UNDERLINED),
        ThemeToken::TableCell => Style::default().fg(Color::Rgb(36, 41, 47)),
        ThemeToken::UserLabel => Style::default()
            .fg(Color::Rgb(5, 80, 40))
            .add_modifier(Modifier::BOLD),
        ThemeToken::UserText => Style::default().fg(Color::Rgb(36, 41, 47)),
        ThemeToken::AssistantLabel => Style::default()
            .fg(Color::Rgb(130, 80, 223))
            .add_modifier(Modifier::BOLD),
        ThemeToken::AssistantText => Style::default().fg(Color::Rgb(36, 41, 47)),
        ThemeToken::AssistantWaiting => Style::default()
            .fg(Color::Rgb(130, 80, 223))
            .add_modifier(Modifier::ITALIC),
        ThemeToken::SystemInfo | ThemeToken::Status => Style::default().fg(Color::Rgb(36, 70, 120)),
        ThemeToken::SystemError => Style::default()
            .fg(Color::Rgb(176, 0, 32))
            .add_modifier(Modifier::BOLD),
        ThemeToken::Prompt => Style::default()
            .fg(Color::Rgb(5, 80, 40))
            .add_modifier(Modifier::BOLD),
        ThemeToken::InputBlock => Style::default()
            .bg(Color::Rgb(246, 248, 250))
            .fg(Color::Rgb(36, 41, 47)),
    }
}

fn high_contrast_preset_style(token: ThemeToken) -> Style {
    match token {
        ThemeToken::Title | ThemeToken::PanelTitle => Style::default()
            .fg(Color::Rgb(255, 255, 255))
            .add_modifier(Modifier::BOLD),
        ThemeToken::Intro | ThemeToken::TableCell | ThemeToken::UserText => {
            Style::default().fg(Color::Rgb(255, 255, 255))
        }
        ThemeToken::TableHeader => Style::default()
            .fg(Color::Rgb(255, 215, 0))
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ThemeToken::UserLabel | ThemeToken::Prompt => Style::default()
            .fg(Color::Rgb(0, 255, 127))
            .add_modifier(Modifier::BOLD),
        ThemeToken::AssistantLabel => Style::default()
            .fg(Color::Rgb(255, 215, 0))
            .add_modifier(Modifier::BOLD),
        ThemeToken::AssistantText => Style::default().fg(Color::Rgb(255, 215, 0)),
        ThemeToken::AssistantWaiting => Style::default()
            .fg(Color::Rgb(255, 255, 0))
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ThemeToken::SystemInfo | ThemeToken::Status => {
            Style::default().fg(Color::Rgb(173, 216, 230))
        }
        ThemeToken::SystemError => Style::default()
            .fg(Color::Rgb(255, 64, 64))
            .add_modifier(Modifier::BOLD),
        ThemeToken::InputBlock => Style::default()
            .bg(Color::Rgb(0, 0, 0))
            .fg(Color::Rgb(255, 255, 255)),
    }
}

fn disabled_style(token: ThemeToken) -> Style {
    match token {
        ThemeToken::Title
        | ThemeToken::UserLabel
        | ThemeToken::AssistantLabel
        | ThemeToken::Prompt => Style::default().add_modifier(Modifier::BOLD),
        _ => Style::default(),
    }
}

fn merge_style(base: Style, override_style: &StyleOverride) -> Style {
    let mut merged = base;

    if let Some(fg) = override_style.fg {
        merged = merged.fg(color_from_hex(fg));
    }

    if let Some(bg) = override_style.bg {
        merged = merged.bg(color_from_hex(bg));
    }

    if let Some(modifiers) = &override_style.modifiers {
        merged = merged
            .remove_modifier(Modifier::all())
            .add_modifier(modifiers_to_modifier(modifiers));
    }

    merged
}

fn color_from_hex(color: HexColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn modifiers_to_modifier(modifiers: &[ThemeModifier]) -> Modifier {
    modifiers
        .iter()
        .copied()
        .fold(Modifier::empty(), |acc, modifier| {
            acc | modifier_to_ratatui(modifier)
        })
}

fn modifier_to_ratatui(modifier: ThemeModifier) -> Modifier {
    match modifier {
        ThemeModifier::Bold => Modifier::BOLD,
        ThemeModifier::Dim => Modifier::DIM,
        ThemeModifier::Italic => Modifier::ITALIC,
        ThemeModifier::Underlined => Modifier::UNDERLINED,
        ThemeModifier::SlowBlink => Modifier::SLOW_BLINK,
        ThemeModifier::RapidBlink => Modifier::RAPID_BLINK,
        ThemeModifier::Reversed => Modifier::REVERSED,
        ThemeModifier::Hidden => Modifier::HIDDEN,
        ThemeModifier::CrossedOut => Modifier::CROSSED_OUT,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::Theme;
    use crate::config::{HexColor, StyleOverride, ThemeConfig, ThemeModifier, ThemePreset, ThemeToken};
    use ratatui::style::{Color, Modifier, Style};

    #[test]
    fn theme_new_matches_default_preset() {
        let theme = Theme::new(true);
        assert_eq!(
            theme.style(ThemeToken::AssistantLabel),
            Theme::from_config(true, &ThemeConfig::default()).style(ThemeToken::AssistantLabel)
        );
    }

    #[test]
    fn every_token_has_a_style_in_every_preset() {
        for preset in [ThemePreset::Default, ThemePreset::Light, ThemePreset::HighContrast] {
            let theme = Theme::from_config(
                true,
                &ThemeConfig {
                    preset,
                    styles: HashMap::new(),
                },
            );
            for token in ThemeToken::all() {
                assert_ne!(theme.style(*token), Style::default(), "{preset:?} {token:?}");
            }
        }
    }

    #[test]
    fn disabled_theme_only_keeps_labels_bold() {
        let theme = Theme::new(false);
        assert!(
            theme
                .style(ThemeToken::UserLabel)
                .add_modifier
                .contains(Modifier::BOLD)
        );
        assert_eq!(theme.style(ThemeToken::SystemInfo), Style::default());
        assert_eq!(theme.style(ThemeToken::InputBlock), Style::default());
    }

    #[test]
    fn partial_override_preserves_unset_fields() {
        let mut config = ThemeConfig::default();
        config.styles.insert(
            ThemeToken::UserLabel,
            StyleOverride {
                fg: Some(HexColor { r: 1, g: 2, b: 3 }),
                bg: None,
                modifiers: None,
            },
        );

        let theme = Theme::from_config(true, &config);
        let style = theme.style(ThemeToken::UserLabel);
        assert_eq!(style.fg, Some(Color::Rgb(1, 2, 3)));
        assert_eq!(
            style.add_modifier,
            Modifier::BOLD,
            "preset bold should be preserved"
        );
    }

    #[test]
    fn modifier_override_replaces_preset_modifiers() {
        let mut config = ThemeConfig::default();
        config.styles.insert(
            ThemeToken::AssistantWaiting,
            StyleOverride {
                fg: None,
                bg: None,
                modifiers: Some(vec![ThemeModifier::Reversed]),
            },
        );

        let style = Theme::from_config(true, &config).style(ThemeToken::AssistantWaiting);
        assert_eq!(style.add_modifier, Modifier::REVERSED);
    }
}
