use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub database_path: PathBuf,
    pub temp_dir: PathBuf,

    // Geocoding
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub geocode_timeout: Duration,

    // Rendering
    pub map_size: (u32, u32),
    pub multi_map_size: (u32, u32),

    // Telegram limits
    pub telegram_safe_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let database_path = env_path("DATABASE").unwrap_or_else(|| PathBuf::from("cities.db"));
        let temp_dir = env_path("TEMP_DIR").unwrap_or_else(|| PathBuf::from("/tmp/mapbot"));
        fs::create_dir_all(&temp_dir)?;

        let geocoder_url = env_str("GEOCODER_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string());
        let geocoder_user_agent = env_str("GEOCODER_USER_AGENT")
            .and_then(non_empty)
            .unwrap_or_else(|| "mapbot".to_string());
        let geocode_timeout =
            Duration::from_secs(env_u64("GEOCODE_TIMEOUT_SECS").unwrap_or(10).max(1));

        let map_size = (
            env_u32("MAP_WIDTH").unwrap_or(800),
            env_u32("MAP_HEIGHT").unwrap_or(600),
        );
        let multi_map_size = (
            env_u32("MULTI_MAP_WIDTH").unwrap_or(1000),
            env_u32("MULTI_MAP_HEIGHT").unwrap_or(800),
        );

        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000);

        Ok(Self {
            telegram_bot_token,
            database_path,
            temp_dir,
            geocoder_url,
            geocoder_user_agent,
            geocode_timeout,
            map_size,
            multi_map_size,
            telegram_safe_limit,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_str(key).and_then(non_empty).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
