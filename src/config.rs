use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::cache::RefetchOrdering;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/v1";
pub const DEFAULT_PAYMENT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_SESSION_STORE_PATH: &str = "novel_shelf_session.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    /// Payment endpoints live outside the versioned API prefix.
    pub payment_base_url: String,
    pub session_store_path: PathBuf,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    pub confirm_timeout: Duration,
    pub refetch_ordering: RefetchOrdering,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            payment_base_url: DEFAULT_PAYMENT_BASE_URL.to_string(),
            session_store_path: PathBuf::from(DEFAULT_SESSION_STORE_PATH),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(60),
            confirm_timeout: Duration::from_secs(30),
            refetch_ordering: RefetchOrdering::default(),
        }
    }
}

impl Config {
    /// Reads the environment (call `dotenv` first to pick up a `.env` file).
    pub fn from_env() -> Config {
        let defaults = Config::default();
        Config {
            api_base_url: env::var("API_BASE_URL")
                .map(|url| trim_base(&url))
                .unwrap_or(defaults.api_base_url),
            payment_base_url: env::var("PAYMENT_BASE_URL")
                .map(|url| trim_base(&url))
                .unwrap_or(defaults.payment_base_url),
            session_store_path: env::var("SESSION_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_store_path),
            request_timeout: env_secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            upload_timeout: env_secs("UPLOAD_TIMEOUT_SECS", defaults.upload_timeout),
            confirm_timeout: env_secs("CONFIRM_TIMEOUT_SECS", defaults.confirm_timeout),
            refetch_ordering: env_parse("REFETCH_ORDERING", defaults.refetch_ordering),
        }
    }

    pub fn with_base_urls(api_base_url: &str, payment_base_url: &str) -> Config {
        Config {
            api_base_url: trim_base(api_base_url),
            payment_base_url: trim_base(payment_base_url),
            ..Config::default()
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn env_secs(name: &str, default: Duration) -> Duration {
    Duration::from_secs(env_parse(name, default.as_secs()))
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}
