use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::llm::bedrock::{DEFAULT_AWS_PROFILE, DEFAULT_AWS_REGION, DEFAULT_BEDROCK_MODEL};

pub const DEFAULT_DATA_DIR: &str = ".";

const CONFIG_DIR_NAME: &str = "escola-chat";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub aws_profile: String,
    pub aws_region: String,
    pub bedrock_model: String,
    pub bedrock_endpoint: Option<String>,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfig {
    pub preset: ThemePreset,
    pub styles: HashMap<ThemeToken, StyleOverride>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            preset: ThemePreset::Default,
            styles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemePreset {
    Default,
    Light,
    HighContrast,
}

impl FromStr for ThemePreset {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "default" => Ok(Self::Default),
            "light" => Ok(Self::Light),
            "high-contrast" => Ok(Self::HighContrast),
            _ => Err(format!("unknown preset '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeToken {
    Title,
    Intro,
    PanelTitle,
    TableHeader,
    TableCell,
    UserLabel,
    UserText,
    AssistantLabel,
    AssistantText,
    AssistantWaiting,
    SystemInfo,
    SystemError,
    Prompt,
    InputBlock,
    Status,
}

impl ThemeToken {
    pub fn all() -> &'static [ThemeToken] {
        &[
            Self::Title,
            Self::Intro,
            Self::PanelTitle,
            Self::TableHeader,
            Self::TableCell,
            Self::UserLabel,
            Self::UserText,
            Self::AssistantLabel,
            Self::AssistantText,
            Self::AssistantWaiting,
            Self::SystemInfo,
            Self::SystemError,
            Self::Prompt,
            Self::InputBlock,
            Self::Status,
        ]
    }
}

impl FromStr for ThemeToken {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "title" => Ok(Self::Title),
            "intro" => Ok(Self::Intro),
            "panel_title" => Ok(Self::PanelTitle),
            "table_header" => Ok(Self::TableHeader),
            "table_cell" => Ok(Self::TableCell),
            "user_label" => Ok(Self::UserLabel),
            "user_text" => Ok(Self::UserText),
            "assistant_label" => Ok(Self::AssistantLabel),
            "assistant_text" => Ok(Self::AssistantText),
            "assistant_waiting" => Ok(Self::AssistantWaiting),
            "system_info" => Ok(Self::SystemInfo),
            "system_error" => Ok(Self::SystemError),
            "prompt" => Ok(Self::Prompt),
            "input_block" => Ok(Self::InputBlock),
            "status" => Ok(Self::Status),
            _ => Err(format!("unknown token '{value}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOverride {
    pub fg: Option<HexColor>,
    pub bg: Option<HexColor>,
    pub modifiers: Option<Vec<ThemeModifier>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl FromStr for HexColor {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        const INVALID: &str = "invalid hex color, expected #RRGGBB";
        let digits = value.strip_prefix('#').ok_or_else(|| INVALID.to_string())?;
        let mut rgb = [0u8; 3];
        hex::decode_to_slice(digits, &mut rgb).map_err(|_| INVALID.to_string())?;
        let [r, g, b] = rgb;
        Ok(Self { r, g, b })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeModifier {
    Bold,
    Dim,
    Italic,
    Underlined,
    SlowBlink,
    RapidBlink,
    Reversed,
    Hidden,
    CrossedOut,
}

impl FromStr for ThemeModifier {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "bold" => Ok(Self::Bold),
            "dim" => Ok(Self::Dim),
            "italic" => Ok(Self::Italic),
            "underlined" => Ok(Self::Underlined),
            "slow_blink" => Ok(Self::SlowBlink),
            "rapid_blink" => Ok(Self::RapidBlink),
            "reversed" => Ok(Self::Reversed),
            "hidden" => Ok(Self::Hidden),
            "crossed_out" => Ok(Self::CrossedOut),
            _ => Err(format!("unknown modifier '{value}'")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    data_dir: Option<String>,
    aws_profile: Option<String>,
    aws_region: Option<String>,
    bedrock_model: Option<String>,
    bedrock_endpoint: Option<String>,
    theme: Option<RawThemeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThemeConfig {
    name: Option<String>,
    styles: Option<HashMap<String, RawStyleOverride>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStyleOverride {
    fg: Option<String>,
    bg: Option<String>,
    modifiers: Option<Vec<String>>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Reads the TOML file (an explicit path must exist, the default one is
    /// optional) and applies `.env` and `ESCOLA_*` overrides on top.
    pub fn load_with_path(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Failed to load config {}: file not found", path.display());
                }
                path.to_path_buf()
            }
            None => discover_config_path()?,
        };
        let file_config = load_file_config(&config_path)?;

        dotenvy::dotenv().ok();

        let file_value = |pick: fn(&RawFileConfig) -> Option<&String>| {
            file_config
                .as_ref()
                .and_then(pick)
                .and_then(|value| non_empty(value).map(ToOwned::to_owned))
        };

        let theme = validate_theme(
            file_config.as_ref().and_then(|cfg| cfg.theme.as_ref()),
            &config_path,
        )?;

        Ok(Self {
            data_dir: PathBuf::from(
                env_non_empty("ESCOLA_DATA_DIR")
                    .or_else(|| file_value(|cfg| cfg.data_dir.as_ref()))
                    .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            aws_profile: env_non_empty("ESCOLA_AWS_PROFILE")
                .or_else(|| file_value(|cfg| cfg.aws_profile.as_ref()))
                .unwrap_or_else(|| DEFAULT_AWS_PROFILE.to_string()),
            aws_region: env_non_empty("ESCOLA_AWS_REGION")
                .or_else(|| file_value(|cfg| cfg.aws_region.as_ref()))
                .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            bedrock_model: env_non_empty("ESCOLA_BEDROCK_MODEL")
                .or_else(|| file_value(|cfg| cfg.bedrock_model.as_ref()))
                .unwrap_or_else(|| DEFAULT_BEDROCK_MODEL.to_string()),
            bedrock_endpoint: env_non_empty("ESCOLA_BEDROCK_ENDPOINT")
                .or_else(|| file_value(|cfg| cfg.bedrock_endpoint.as_ref())),
            theme,
            config_path,
        })
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve config path: XDG_CONFIG_HOME is set but empty");
        }

        return Ok(PathBuf::from(trimmed)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME));
    }

    let home = dirs::home_dir().ok_or_else(|| {
        anyhow!("Failed to resolve config path: HOME directory is unavailable")
    })?;

    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

fn load_file_config(config_path: &Path) -> Result<Option<RawFileConfig>> {
    if !config_path.is_file() {
        return Ok(None);
    }

    let config_text = fs::read_to_string(config_path).map_err(|err| {
        anyhow!(
            "Failed to load config {}: unable to read file: {err}",
            config_path.display()
        )
    })?;

    toml::from_str(&config_text).map(Some).map_err(|err| {
        anyhow!(
            "Failed to load config {}: {err}",
            config_path.display()
        )
    })
}

fn validate_theme(raw_theme: Option<&RawThemeConfig>, config_path: &Path) -> Result<ThemeConfig> {
    let Some(theme) = raw_theme else {
        return Ok(ThemeConfig::default());
    };

    let mut config = ThemeConfig::default();

    if let Some(name) = &theme.name {
        config.preset = ThemePreset::from_str(name).map_err(|reason| {
            config_error(config_path, "theme.name", &reason)
        })?;
    }

    if let Some(styles) = &theme.styles {
        for (token_name, raw_style) in styles {
            let token = ThemeToken::from_str(token_name).map_err(|reason| {
                config_error(
                    config_path,
                    &format!("theme.styles.{token_name}"),
                    &reason,
                )
            })?;

            let fg = parse_color(raw_style.fg.as_deref(), config_path, token_name, "fg")?;
            let bg = parse_color(raw_style.bg.as_deref(), config_path, token_name, "bg")?;
            let modifiers =
                parse_modifiers(raw_style.modifiers.as_deref(), config_path, token_name)?;

            config.styles.insert(token, StyleOverride { fg, bg, modifiers });
        }
    }

    Ok(config)
}

fn parse_color(
    value: Option<&str>,
    config_path: &Path,
    token_name: &str,
    field_name: &str,
) -> Result<Option<HexColor>> {
    let Some(value) = value else {
        return Ok(None);
    };

    HexColor::from_str(value)
        .map(Some)
        .map_err(|reason| {
            config_error(
                config_path,
                &format!("theme.styles.{token_name}.{field_name}"),
                &reason,
            )
        })
}

fn parse_modifiers(
    values: Option<&[String]>,
    config_path: &Path,
    token_name: &str,
) -> Result<Option<Vec<ThemeModifier>>> {
    let Some(values) = values else {
        return Ok(None);
    };

    let mut parsed = Vec::with_capacity(values.len());
    for value in values {
        let modifier = ThemeModifier::from_str(value).map_err(|reason| {
            config_error(
                config_path,
                &format!("theme.styles.{token_name}.modifiers"),
                &reason,
            )
        })?;
        parsed.push(modifier);
    }

    Ok(Some(parsed))
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn config_error(config_path: &Path, key_path: &str, reason: &str) -> anyhow::Error {
    anyhow!(
        "Failed to load config {}: {key_path}: {reason}",
        config_path.display()
    )
}
