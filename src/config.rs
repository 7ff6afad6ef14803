/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Problems are collected as warnings and reported once logging is up.
///
/// There is no keymap section: bindings are fixed.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::sim::countdown::DEFAULT_DANGER_FRACTION;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct DeskConfig {
    pub countdown: CountdownConfig,
    pub animation: AnimationConfig,
    pub desk: TableConfig,
    pub log: LogConfig,
    pub frame: Duration,
    /// Problems met while loading; defaults were used in their place.
    pub warnings: Vec<ConfigError>,
}

#[derive(Clone, Debug)]
pub struct CountdownConfig {
    pub round: Duration,
    pub danger_fraction: f64,
}

#[derive(Clone, Debug)]
pub struct AnimationConfig {
    /// How long a flash class stays on before the completion signal.
    pub flash: Duration,
}

#[derive(Clone, Debug)]
pub struct TableConfig {
    pub starting_points: i64,
    pub starting_cards: u32,
    pub market_price: u32,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins.
    pub filter: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("{path}: parse error: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{key} = {value} is out of range; using {fallback}")]
    Range { key: &'static str, value: String, fallback: String },
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    countdown: TomlCountdown,
    #[serde(default)]
    animation: TomlAnimation,
    #[serde(default)]
    desk: TomlDesk,
    #[serde(default)]
    log: TomlLog,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlCountdown {
    #[serde(default = "default_round_secs")]
    round_secs: u64,
    #[serde(default = "default_danger_fraction")]
    danger_fraction: f64,
}

#[derive(Deserialize, Debug)]
struct TomlAnimation {
    #[serde(default = "default_flash_ms")]
    flash_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlDesk {
    #[serde(default = "default_starting_points")]
    starting_points: i64,
    #[serde(default = "default_starting_cards")]
    starting_cards: u32,
    #[serde(default = "default_market_price")]
    market_price: u32,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_filter")]
    filter: String,
    #[serde(default = "default_log_file")]
    file: String,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

// ── Defaults ──

fn default_round_secs() -> u64 { 240 }
fn default_danger_fraction() -> f64 { DEFAULT_DANGER_FRACTION }
fn default_flash_ms() -> u64 { 600 }
fn default_starting_points() -> i64 { 350 }
fn default_starting_cards() -> u32 { 2 }
fn default_market_price() -> u32 { 5 }
fn default_log_filter() -> String { "info".into() }
fn default_log_file() -> String { "figgie-desk.log".into() }
fn default_frame_ms() -> u64 { 16 }

impl Default for TomlCountdown {
    fn default() -> Self {
        TomlCountdown {
            round_secs: default_round_secs(),
            danger_fraction: default_danger_fraction(),
        }
    }
}

impl Default for TomlAnimation {
    fn default() -> Self {
        TomlAnimation { flash_ms: default_flash_ms() }
    }
}

impl Default for TomlDesk {
    fn default() -> Self {
        TomlDesk {
            starting_points: default_starting_points(),
            starting_cards: default_starting_cards(),
            market_price: default_market_price(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog { filter: default_log_filter(), file: default_log_file() }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { frame_ms: default_frame_ms() }
    }
}

// ── Loading ──

impl DeskConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let mut warnings = Vec::new();
        let toml_cfg = match find_config(&candidate_dirs()) {
            Some(path) => match read_toml(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warnings.push(e);
                    TomlConfig::default()
                }
            },
            None => TomlConfig::default(),
        };
        Self::resolve(toml_cfg, warnings)
    }

    /// Parse config text directly, without searching the filesystem.
    #[allow(dead_code)]
    pub fn parse(text: &str) -> Self {
        let path = PathBuf::from("config.toml");
        match parse_toml(&path, text) {
            Ok(cfg) => Self::resolve(cfg, Vec::new()),
            Err(e) => Self::resolve(TomlConfig::default(), vec![e]),
        }
    }

    fn resolve(cfg: TomlConfig, mut warnings: Vec<ConfigError>) -> Self {
        let mut danger_fraction = cfg.countdown.danger_fraction;
        if !(0.0..=1.0).contains(&danger_fraction) {
            warnings.push(ConfigError::Range {
                key: "countdown.danger_fraction",
                value: danger_fraction.to_string(),
                fallback: DEFAULT_DANGER_FRACTION.to_string(),
            });
            danger_fraction = DEFAULT_DANGER_FRACTION;
        }

        let mut round_secs = cfg.countdown.round_secs;
        if round_secs == 0 {
            warnings.push(ConfigError::Range {
                key: "countdown.round_secs",
                value: "0".into(),
                fallback: default_round_secs().to_string(),
            });
            round_secs = default_round_secs();
        }

        DeskConfig {
            countdown: CountdownConfig {
                round: Duration::from_secs(round_secs),
                danger_fraction,
            },
            animation: AnimationConfig { flash: Duration::from_millis(cfg.animation.flash_ms) },
            desk: TableConfig {
                starting_points: cfg.desk.starting_points,
                starting_cards: cfg.desk.starting_cards,
                market_price: cfg.desk.market_price,
            },
            log: LogConfig { filter: cfg.log.filter, file: PathBuf::from(cfg.log.file) },
            frame: Duration::from_millis(cfg.general.frame_ms.max(1)),
            warnings,
        }
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), Vec::new())
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn find_config(search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs.iter().map(|d| d.join("config.toml")).find(|p| p.exists())
}

fn read_toml(path: &Path) -> Result<TomlConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_toml(path, &text)
}

fn parse_toml(path: &Path, text: &str) -> Result<TomlConfig, ConfigError> {
    toml::from_str::<TomlConfig>(text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}
