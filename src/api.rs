use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default address of the diagnosis service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Fallback notice when the server rejects an image without a message.
pub const INVALID_IMAGE_NOTICE: &str = "Invalid image type uploaded.";

pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Reply from `POST /validate-image`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationReply {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Validator confidence, present on both accept and reject.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// The service reports confidence either as a number or a preformatted string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Number(f64),
    Text(String),
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Number(n) => write!(f, "{n}"),
            Confidence::Text(s) => f.write_str(s),
        }
    }
}

/// Reply from `POST /diagnose`. Only the prediction pair is guaranteed.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosisResult {
    pub image_prediction: String,
    pub image_confidence: Confidence,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub pneumonia_type: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    /// Relative path to the Grad-CAM PNG, served off the same base address.
    #[serde(default)]
    pub gradcam_image: Option<String>,
    /// Relative path to the generated PDF report.
    #[serde(default)]
    pub report_path: Option<String>,
}

/// Error body the service attaches to a rejected `/diagnose` call.
#[derive(Debug, Clone, Deserialize)]
struct RejectionBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// A `/diagnose` call either completes or is rejected by the server's own
/// re-validation of the image.
#[derive(Debug, Clone)]
pub enum DiagnoseReply {
    Completed(DiagnosisResult),
    Rejected(String),
}

/// End state of one submission attempt.
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    Completed(DiagnosisResult),
    /// Server-reported validation rejection; carries the notice to show.
    Rejected(String),
    /// Transport failure on either call.
    Unreachable,
}

/// The diagnosis service seam. The HTTP implementation below is the only
/// production one; tests substitute a stub.
#[async_trait::async_trait]
pub trait DiagnosisBackend: Send + Sync {
    async fn validate_image(&self, image: &Path) -> Result<ValidationReply, BackendError>;

    async fn diagnose(
        &self,
        image: &Path,
        audio_wav: Option<Vec<u8>>,
        text: Option<String>,
    ) -> Result<DiagnoseReply, BackendError>;

    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError>;
}

/// The submission protocol: validate first, diagnose only when the image is
/// accepted. No retries, no timeouts; each failure ends the attempt.
pub async fn run_submission(
    backend: &dyn DiagnosisBackend,
    image: std::path::PathBuf,
    audio_wav: Option<Vec<u8>>,
    text: Option<String>,
) -> SubmissionOutcome {
    let validation = match backend.validate_image(&image).await {
        Ok(validation) => validation,
        Err(e) => {
            log::error!("Image validation request failed: {e}");
            return SubmissionOutcome::Unreachable;
        }
    };

    if !validation.valid {
        let notice = validation
            .message
            .unwrap_or_else(|| INVALID_IMAGE_NOTICE.to_string());
        return SubmissionOutcome::Rejected(notice);
    }

    match backend.diagnose(&image, audio_wav, text).await {
        Ok(DiagnoseReply::Completed(result)) => SubmissionOutcome::Completed(result),
        Ok(DiagnoseReply::Rejected(notice)) => SubmissionOutcome::Rejected(notice),
        Err(e) => {
            log::error!("Diagnosis request failed: {e}");
            SubmissionOutcome::Unreachable
        }
    }
}

/// reqwest client for the diagnosis service.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET /health`; used for the startup reachability check.
    pub async fn health(&self) -> bool {
        match self.client.get(self.endpoint("health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::warn!("Health check failed: {e}");
                false
            }
        }
    }

    /// Fetch a static asset (Grad-CAM image) served off the base address.
    pub async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let resp = self.client.get(self.endpoint(path)).send().await?;
        if !resp.status().is_success() {
            return Err(format!("asset request answered {}", resp.status()).into());
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// Stream the PDF report to `dest`.
    pub async fn download_report(
        &self,
        report_path: &str,
        dest: &Path,
    ) -> Result<(), BackendError> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        let response = self.client.get(self.endpoint(report_path)).send().await?;
        if !response.status().is_success() {
            return Err(format!("report request answered {}", response.status()).into());
        }

        if let Some(dir) = dest.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        log::info!("Report saved to {}", dest.display());
        Ok(())
    }
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

async fn image_part(path: &Path) -> Result<reqwest::multipart::Part, BackendError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("xray")
        .to_string();
    Ok(reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(image_mime(path))?)
}

#[async_trait::async_trait]
impl DiagnosisBackend for HttpBackend {
    async fn validate_image(&self, image: &Path) -> Result<ValidationReply, BackendError> {
        let form = reqwest::multipart::Form::new().part("image", image_part(image).await?);
        let resp = self
            .client
            .post(self.endpoint("validate-image"))
            .multipart(form)
            .send()
            .await?;
        // Rejections arrive as 400 with a regular body; parse either way.
        Ok(resp.json().await?)
    }

    async fn diagnose(
        &self,
        image: &Path,
        audio_wav: Option<Vec<u8>>,
        text: Option<String>,
    ) -> Result<DiagnoseReply, BackendError> {
        let mut form = reqwest::multipart::Form::new().part("image", image_part(image).await?);
        if let Some(wav) = audio_wav {
            form = form.part(
                "audio",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("symptoms.wav")
                    .mime_str("audio/wav")?,
            );
        }
        if let Some(text) = text {
            form = form.text("text", text);
        }

        let resp = self
            .client
            .post(self.endpoint("diagnose"))
            .multipart(form)
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(DiagnoseReply::Completed(resp.json().await?));
        }

        // The service re-validates the image inside /diagnose and answers
        // 4xx with an error body; surface that as a rejection notice.
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<RejectionBody>(&body) {
            Ok(rejection) => {
                let notice = rejection
                    .message
                    .or(rejection.error)
                    .unwrap_or_else(|| INVALID_IMAGE_NOTICE.to_string());
                Ok(DiagnoseReply::Rejected(notice))
            }
            Err(_) => Err(format!("diagnosis service answered {status}").into()),
        }
    }

    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        let resp = self
            .client
            .post(self.endpoint("chatbot"))
            .json(&ChatRequest { message })
            .send()
            .await?;
        // The chatbot answers 500 with a reply body too; parse either way.
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnosis_result_parses_numeric_confidence() {
        let json = r#"{
            "image_prediction": "PNEUMONIA",
            "image_confidence": 0.9174,
            "pneumonia_type": "Bacterial",
            "gradcam_image": "static/gradcam/xray_cam.png",
            "report_path": "reports/report_42.pdf"
        }"#;
        let result: DiagnosisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.image_prediction, "PNEUMONIA");
        assert_eq!(result.image_confidence.to_string(), "0.9174");
        assert_eq!(result.pneumonia_type.as_deref(), Some("Bacterial"));
        assert!(result.transcription.is_none());
    }

    #[test]
    fn diagnosis_result_parses_string_confidence() {
        let json = r#"{"image_prediction": "Normal", "image_confidence": "92%"}"#;
        let result: DiagnosisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.image_confidence.to_string(), "92%");
    }

    #[test]
    fn validation_rejection_parses_message() {
        let json = r#"{"valid": false, "confidence": 0.12, "message": "Not a chest X-ray."}"#;
        let reply: ValidationReply = serde_json::from_str(json).unwrap();
        assert!(!reply.valid);
        assert_eq!(reply.message.as_deref(), Some("Not a chest X-ray."));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let backend = HttpBackend::new("http://127.0.0.1:5000/");
        assert_eq!(
            backend.endpoint("/validate-image"),
            "http://127.0.0.1:5000/validate-image"
        );
        assert_eq!(
            backend.endpoint("static/gradcam/cam.png"),
            "http://127.0.0.1:5000/static/gradcam/cam.png"
        );
    }
}
