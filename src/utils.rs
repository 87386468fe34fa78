use std::path::Path;

use image::{DynamicImage, ImageResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{0} is missing and {1} is not set")]
    MissingUrl(String, &'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to download {url}: {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("GITHUB_TOKEN is not a valid header value")]
    InvalidToken,
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens an image by sniffing its content, so uploads stored under a
/// misleading extension still decode.
pub fn decode_image(path: &Path) -> ImageResult<DynamicImage> {
    image::io::Reader::open(path)?.with_guessed_format()?.decode()
}

async fn download_file(
    url: &str,
    path: &Path,
    token: Option<&str>,
) -> Result<(), DownloadError> {
    log::info!("Downloading {} from {}", path.display(), url);

    let mut header_map = HeaderMap::new();
    if let Some(token) = token {
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| DownloadError::InvalidToken)?;
        header_map.insert(AUTHORIZATION, auth_value);
    }
    header_map.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));

    let client = reqwest::Client::new();
    let response = client.get(url).headers(header_map).send().await?;

    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = response.bytes().await?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Fetches the frozen graph when it is not on disk. A missing model with no
/// download URL is fatal.
pub async fn ensure_model_exists(
    model_path: &Path,
    model_url: Option<&str>,
    token: Option<&str>,
) -> Result<(), DownloadError> {
    log::info!("Checking model...");
    if model_path.exists() {
        return Ok(());
    }
    match model_url {
        Some(url) => download_file(url, model_path, token).await,
        None => Err(DownloadError::MissingUrl(
            model_path.display().to_string(),
            "MODEL_URL",
        )),
    }
}

/// Fetches the class list when it is missing and a URL is configured.
/// Returns whether the file is present afterwards.
pub async fn ensure_class_list_exists(
    class_list_path: &Path,
    class_list_url: Option<&str>,
    token: Option<&str>,
) -> Result<bool, DownloadError> {
    if class_list_path.exists() {
        return Ok(true);
    }
    match class_list_url {
        Some(url) => {
            download_file(url, class_list_path, token).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
