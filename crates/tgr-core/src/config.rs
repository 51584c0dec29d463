use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use crate::{errors::Error, Result};

const DEFAULT_TARGET_CHAT: &str = "WeLeakInfo_BOT";
const DEFAULT_LOG_CAPACITY: usize = 1000;
const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Credentials for the pre-authorized Telegram user session.
#[derive(Clone)]
pub struct TelegramCredentials {
    pub api_id: i32,
    pub api_hash: String,
    pub session_string: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("session_string", &"<redacted>")
            .finish()
    }
}

/// Typed configuration for the relay.
#[derive(Clone)]
pub struct Config {
    // Telegram
    /// `None` when any of `API_ID` / `API_HASH` / `SESSION_STRING` is missing.
    pub telegram: Option<TelegramCredentials>,
    pub target_chat: String,

    // HTTP
    pub bind_addr: SocketAddr,
    pub cors_allow_origins: Vec<String>,

    // Storage
    pub download_dir: PathBuf,
    pub max_download_bytes: u64,
    pub log_capacity: usize,

    // Auto-click
    pub auto_click_enabled: bool,
    pub auto_click_patterns: Vec<String>,

    // Outbound pacing
    pub send_min_interval: Duration,

    // Kill switch
    pub kill_switch_password: Option<String>,
    pub start_disabled: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("telegram", &self.telegram)
            .field("target_chat", &self.target_chat)
            .field("bind_addr", &self.bind_addr)
            .field("cors_allow_origins", &self.cors_allow_origins)
            .field("download_dir", &self.download_dir)
            .field("max_download_bytes", &self.max_download_bytes)
            .field("log_capacity", &self.log_capacity)
            .field("auto_click_enabled", &self.auto_click_enabled)
            .field("auto_click_patterns", &self.auto_click_patterns)
            .field("send_min_interval", &self.send_min_interval)
            .field(
                "kill_switch_password",
                &self.kill_switch_password.as_ref().map(|_| "<redacted>"),
            )
            .field("start_disabled", &self.start_disabled)
            .finish()
    }
}

impl Config {
    /// Load from the process environment, seeded by `.env` if present.
    pub fn load() -> Result<Self> {
        // Existing env vars win over `.env` entries.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (env, map in tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).and_then(non_empty);

        let telegram = match (var("API_ID"), var("API_HASH"), var("SESSION_STRING")) {
            (Some(id), Some(api_hash), Some(session_string)) => {
                let api_id = id.trim().parse::<i32>().map_err(|_| {
                    Error::Config(format!("API_ID must be an integer, got {id:?}"))
                })?;
                Some(TelegramCredentials {
                    api_id,
                    api_hash: api_hash.trim().to_string(),
                    session_string: session_string.trim().to_string(),
                })
            }
            _ => None,
        };

        let target_chat = normalize_username(
            &var("TARGET_CHAT").unwrap_or_else(|| DEFAULT_TARGET_CHAT.to_string()),
        );
        if target_chat.is_empty() {
            return Err(Error::Config("TARGET_CHAT must not be empty".to_string()));
        }

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(var("PORT"), "PORT", 8000u16)?;
        let ip: IpAddr = host
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .map_err(|_| Error::Config(format!("HOST must be an IP address, got {host:?}")))?;
        let bind_addr = SocketAddr::new(ip, port);

        let cors_allow_origins = parse_csv(var("CORS_ALLOW_ORIGINS").or(Some("*".to_string())));

        let download_dir = match var("DOWNLOAD_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = var("HOME").ok_or_else(|| {
                    Error::Config("DOWNLOAD_DIR is not set and HOME is unknown".to_string())
                })?;
                PathBuf::from(home).join("BotFiles")
            }
        };
        let max_download_bytes =
            parse_or(var("MAX_DOWNLOAD_BYTES"), "MAX_DOWNLOAD_BYTES", DEFAULT_MAX_DOWNLOAD_BYTES)?;
        let log_capacity =
            parse_or(var("LOG_CAPACITY"), "LOG_CAPACITY", DEFAULT_LOG_CAPACITY)?.max(1);

        let auto_click_enabled = parse_bool(var("AUTO_CLICK_ENABLED")).unwrap_or(true);
        let auto_click_patterns =
            parse_csv(var("AUTO_CLICK_PATTERNS").or(Some("download".to_string())));

        let send_min_interval = Duration::from_millis(parse_or(
            var("SEND_MIN_INTERVAL_MS"),
            "SEND_MIN_INTERVAL_MS",
            1050u64,
        )?);

        let kill_switch_password = var("KILL_SWITCH_PASSWORD");
        let start_disabled = parse_bool(var("START_DISABLED")).unwrap_or(false);

        Ok(Self {
            telegram,
            target_chat,
            bind_addr,
            cors_allow_origins,
            download_dir,
            max_download_bytes,
            log_capacity,
            auto_click_enabled,
            auto_click_patterns,
            send_min_interval,
            kill_switch_password,
            start_disabled,
        })
    }

    /// Names of the Telegram variables that are absent, for startup diagnostics.
    pub fn missing_telegram_vars(get: impl Fn(&str) -> Option<String>) -> Vec<&'static str> {
        ["API_ID", "API_HASH", "SESSION_STRING"]
            .into_iter()
            .filter(|k| get(k).and_then(non_empty).is_none())
            .collect()
    }
}

/// `API_ID` / `API_HASH` only, for tooling that creates a session string.
pub fn api_credentials(get: impl Fn(&str) -> Option<String>) -> Result<(i32, String)> {
    let id = get("API_ID")
        .and_then(non_empty)
        .ok_or_else(|| Error::Config("API_ID environment variable is required".to_string()))?;
    let api_id = id
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::Config(format!("API_ID must be an integer, got {id:?}")))?;
    let api_hash = get("API_HASH")
        .and_then(non_empty)
        .ok_or_else(|| Error::Config("API_HASH environment variable is required".to_string()))?;
    Ok((api_id, api_hash.trim().to_string()))
}

/// Strip a leading `@` and surrounding whitespace from a username.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {s:?}"))),
    }
}

fn parse_bool(raw: Option<String>) -> Option<bool> {
    raw.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
