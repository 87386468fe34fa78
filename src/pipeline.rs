use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use chrono::{DateTime, Local};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::model::{Classifier, ModelError, Prediction};
use crate::normalize::{normalize, NormalizeError, TempUpload};
use crate::notify::Notifier;

/// The two deployments of the service differ only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Stores the upload as-is and reports the confidence.
    Plain,
    /// Re-encodes the upload as a size-bounded JPEG and reports the upload time.
    Compressed,
}

/// Everything a request needs, built once at startup.
pub struct AppContext {
    pub config: Config,
    pub variant: Variant,
    pub classifier: Arc<dyn Classifier>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("classification failed: {0}")]
    Model(#[from] ModelError),
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub filename: String,
    pub path: PathBuf,
    pub prediction: Prediction,
    pub text: String,
    pub image_url: String,
}

/// Stores the upload, classifies it and formats the result text. Notification
/// is left to the caller.
pub async fn process_upload(ctx: &AppContext, upload: Bytes) -> Result<Diagnosis, PipelineError> {
    let now = Local::now();
    let upload_dir = ctx.config.upload_dir();

    let (filename, path) = match ctx.variant {
        Variant::Plain => {
            let filename = format!("{}.jpg", Uuid::new_v4().simple());
            let path = upload_dir.join(&filename);
            tokio::fs::write(&path, &upload).await?;
            (filename, path)
        }
        Variant::Compressed => {
            let filename = format!(
                "{}_{}.jpg",
                now.format("%Y%m%d_%H%M%S"),
                Uuid::new_v4().simple()
            );
            let dest = upload_dir.join(&filename);
            let temp_path = upload_dir.join(format!("original_{}.tmp", Uuid::new_v4().simple()));
            let max_kb = ctx.config.max_image_kb;

            let target = dest.clone();
            let normalized = tokio::task::spawn_blocking(move || {
                let temp = TempUpload::create(temp_path, &upload)?;
                normalize(temp.path(), &target, max_kb).map_err(PipelineError::from)
            })
            .await??;
            log::info!(
                "Stored {} ({} bytes at quality {})",
                filename,
                normalized.size_bytes,
                normalized.quality
            );
            (filename, dest)
        }
    };

    let classifier = Arc::clone(&ctx.classifier);
    let image_path = path.clone();
    let prediction = tokio::task::spawn_blocking(move || classifier.classify(&image_path)).await??;
    log::info!(
        "Classified {} as {} ({:.2})",
        filename,
        prediction.label,
        prediction.confidence
    );

    let text = format_result(ctx.variant, &prediction, &now);
    let image_url = ctx.config.image_url(&filename);

    Ok(Diagnosis {
        filename,
        path,
        prediction,
        text,
        image_url,
    })
}

pub fn format_result(variant: Variant, prediction: &Prediction, uploaded_at: &DateTime<Local>) -> String {
    let info = prediction.label.info();
    match variant {
        Variant::Plain => format!(
            "🌿 狀況：{}\n📌 原因：{}\n🛠️ 建議：{}\n✅ 信心度：{:.2}",
            info.status, info.cause, info.solution, prediction.confidence
        ),
        Variant::Compressed => format!(
            "🕒 上傳時間：{}\n🌿 狀況：{}\n📌 原因：{}\n🛠️ 建議：{}\n",
            uploaded_at.format("%Y-%m-%d %H:%M:%S"),
            info.status,
            info.cause,
            info.solution
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DiagnosisLabel;
    use chrono::TimeZone;

    #[test]
    fn plain_text_reports_confidence() {
        let prediction = Prediction {
            label: DiagnosisLabel::Healthy,
            confidence: 0.876,
        };
        let text = format_result(Variant::Plain, &prediction, &Local::now());
        assert_eq!(
            text,
            "🌿 狀況：健康\n📌 原因：無病害\n🛠️ 建議：維持良好環境即可。\n✅ 信心度：0.88"
        );
    }

    #[test]
    fn compressed_text_reports_upload_time() {
        let prediction = Prediction {
            label: DiagnosisLabel::LateBlight,
            confidence: 0.5,
        };
        let at = Local.with_ymd_and_hms(2024, 5, 3, 14, 7, 9).unwrap();
        let text = format_result(Variant::Compressed, &prediction, &at);
        assert_eq!(
            text,
            "🕒 上傳時間：2024-05-03 14:07:09\n🌿 狀況：晚疫病\n📌 原因：疫黴菌感染。\n🛠️ 建議：噴甲霜靈，移除感染區。\n"
        );
        assert!(!text.contains("信心度"));
    }
}
