use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::normalize::DEFAULT_MAX_SIZE_KB;
use crate::notify::DEFAULT_LINE_API_BASE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub access_token: Option<String>,
    pub recipient: Option<String>,
    pub base_url: String,
    pub line_api_base: String,
    pub port: u16,
    pub body_limit_bytes: usize,
    pub static_dir: PathBuf,
    pub model_path: PathBuf,
    pub class_list_path: PathBuf,
    pub model_url: Option<String>,
    pub class_list_url: Option<String>,
    pub github_token: Option<String>,
    pub input_op: String,
    pub output_op: String,
    pub max_image_kb: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let body_limit_bytes = {
            let mb: usize = parse(&lookup, "BODY_LIMIT_MB", 16, "a whole number of megabytes")?;
            mb * 1024 * 1024
        };

        Ok(Config {
            access_token: get("LINE_CHANNEL_ACCESS_TOKEN"),
            recipient: get("USER_ID"),
            base_url: get("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            line_api_base: get("LINE_API_BASE").unwrap_or_else(|| DEFAULT_LINE_API_BASE.into()),
            port: parse(&lookup, "PORT", 5000, "a valid number between 0 and 65535")?,
            body_limit_bytes,
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "static".into()).into(),
            model_path: get("MODEL_PATH")
                .unwrap_or_else(|| "./model/frozen_graph.pb".into())
                .into(),
            class_list_path: get("CLASS_LIST_PATH")
                .unwrap_or_else(|| "./model/class_list.txt".into())
                .into(),
            model_url: get("MODEL_URL"),
            class_list_url: get("CLASS_LIST_URL"),
            github_token: get("GITHUB_TOKEN"),
            input_op: get("MODEL_INPUT_OP").unwrap_or_else(|| "x".into()),
            output_op: get("MODEL_OUTPUT_OP").unwrap_or_else(|| "Identity".into()),
            max_image_kb: parse(
                &lookup,
                "MAX_IMAGE_KB",
                DEFAULT_MAX_SIZE_KB,
                "a whole number of kilobytes",
            )?,
        })
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.static_dir.join("uploads")
    }

    /// Public link for a stored upload, served by the `/static` route.
    pub fn image_url(&self, filename: &str) -> String {
        format!("{}/static/uploads/{}", self.base_url, filename)
    }
}

fn parse<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                key,
                value,
                expected,
            })
        }
        _ => Ok(default),
    }
}
