use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api";
pub const DEFAULT_MAX_ATTEMPTS: u32 = crate::orchestrator::backoff::DEFAULT_MAX_ATTEMPTS;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

const CONFIG_DIR_NAME: &str = "gbit-studio";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// The file the settings were read from, when one was found.
    pub config_path: Option<PathBuf>,
    pub endpoint: String,
    pub max_attempts: u32,
    pub request_timeout_secs: u64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin for the proxy. Any origin is allowed when unset.
    pub frontend_url: Option<String>,
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
    Heading,
    CodeBlock,
    CodeLanguage,
    ListBullet,
    Paragraph,
    UserMessage,
    ModelMessage,
    SystemInfo,
    SystemError,
    Prompt,
}

impl ThemeToken {
    pub const ALL: [ThemeToken; 10] = [
        ThemeToken::Heading,
        ThemeToken::CodeBlock,
        ThemeToken::CodeLanguage,
        ThemeToken::ListBullet,
        ThemeToken::Paragraph,
        ThemeToken::UserMessage,
        ThemeToken::ModelMessage,
        ThemeToken::SystemInfo,
        ThemeToken::SystemError,
        ThemeToken::Prompt,
    ];
}

impl FromStr for ThemeToken {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "heading" => Ok(Self::Heading),
            "code_block" => Ok(Self::CodeBlock),
            "code_language" => Ok(Self::CodeLanguage),
            "list_bullet" => Ok(Self::ListBullet),
            "paragraph" => Ok(Self::Paragraph),
            "user_message" => Ok(Self::UserMessage),
            "model_message" => Ok(Self::ModelMessage),
            "system_info" => Ok(Self::SystemInfo),
            "system_error" => Ok(Self::SystemError),
            "prompt" => Ok(Self::Prompt),
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
        let invalid = || "invalid hex color, expected #RRGGBB".to_string();
        let Some(hex) = value.strip_prefix('#') else {
            return Err(invalid());
        };
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeModifier {
    Bold,
    Dim,
    Italic,
    Underlined,
    Reversed,
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
            "reversed" => Ok(Self::Reversed),
            "crossed_out" => Ok(Self::CrossedOut),
            _ => Err(format!("unknown modifier '{value}'")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    endpoint: Option<String>,
    max_attempts: Option<u32>,
    request_timeout_secs: Option<u64>,
    gemini_api_key: Option<String>,
    gemini_model: Option<String>,
    gemini_base_url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    frontend_url: Option<String>,
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

    /// Layers defaults, the config file, `.env` and the process environment,
    /// in that order. An explicit `path` must exist; the discovered XDG path
    /// may be absent.
    pub fn load_with_path(path: Option<&Path>) -> Result<Self> {
        let (config_path, file_config) = match path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Failed to load config {}: file not found", path.display());
                }
                (path.to_path_buf(), load_file_config(path)?)
            }
            None => {
                let discovered = discover_config_path()?;
                let file_config = load_file_config(&discovered)?;
                (discovered, file_config)
            }
        };
        let found = file_config.is_some();
        let file = file_config.unwrap_or_default();

        // Variables already present in the environment win over .env entries.
        dotenvy::dotenv().ok();

        let theme = validate_theme(file.theme.as_ref(), &config_path)?;

        let max_attempts = match env_parsed::<u32>("GBIT_MAX_ATTEMPTS")? {
            Some(value) => value,
            None => file.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        };
        if max_attempts == 0 {
            bail!("Invalid max_attempts: at least one attempt is required");
        }

        let request_timeout_secs = match env_parsed::<u64>("GBIT_REQUEST_TIMEOUT_SECS")? {
            Some(value) => value,
            None => file
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        if request_timeout_secs == 0 {
            bail!("Invalid request_timeout_secs: must be greater than zero");
        }

        let port = match env_parsed::<u16>("PORT")? {
            Some(value) => value,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            config_path: found.then_some(config_path),
            endpoint: layered("GBIT_ENDPOINT", file.endpoint.as_deref())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            max_attempts,
            request_timeout_secs,
            gemini_api_key: layered("GEMINI_API_KEY", file.gemini_api_key.as_deref()),
            gemini_model: layered("GEMINI_MODEL", file.gemini_model.as_deref())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: layered("GEMINI_BASE_URL", file.gemini_base_url.as_deref())
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            host: layered("GBIT_HOST", file.host.as_deref())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            frontend_url: layered("FRONTEND_URL", file.frontend_url.as_deref()),
            theme,
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

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow!("Failed to resolve config path: HOME directory is unavailable"))?;

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

    toml::from_str(&config_text)
        .map(Some)
        .map_err(|err| anyhow!("Failed to load config {}: {err}", config_path.display()))
}

fn validate_theme(raw_theme: Option<&RawThemeConfig>, config_path: &Path) -> Result<ThemeConfig> {
    let Some(theme) = raw_theme else {
        return Ok(ThemeConfig::default());
    };

    let mut config = ThemeConfig::default();

    if let Some(name) = &theme.name {
        config.preset = ThemePreset::from_str(name)
            .map_err(|reason| config_error(config_path, "theme.name", &reason))?;
    }

    if let Some(styles) = &theme.styles {
        for (token_name, raw_style) in styles {
            let token = ThemeToken::from_str(token_name).map_err(|reason| {
                config_error(config_path, &format!("theme.styles.{token_name}"), &reason)
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

    HexColor::from_str(value).map(Some).map_err(|reason| {
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

    values
        .iter()
        .map(|value| {
            ThemeModifier::from_str(value).map_err(|reason| {
                config_error(
                    config_path,
                    &format!("theme.styles.{token_name}.modifiers"),
                    &reason,
                )
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Environment value first, then the file value; blanks count as unset.
fn layered(key: &str, file_value: Option<&str>) -> Option<String> {
    env_non_empty(key).or_else(|| file_value.and_then(non_empty).map(ToOwned::to_owned))
}

fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>> {
    let Some(raw) = env_non_empty(key) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| anyhow!("Invalid {key}: '{raw}' is not a valid number"))
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|value| non_empty(&value).map(ToOwned::to_owned))
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
