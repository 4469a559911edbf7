use async_trait::async_trait;
use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::{CameraMetadata, TaskType};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::ports::{phase, CaptureBackend, ImageUpload, UploadAck};

/// HTTP adapter for the reconstruction backend
pub struct HttpBackend {
    /// Base URL of the backend API (e.g., "http://127.0.0.1:3001")
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a prepared request and turn failures into phase-tagged errors
    async fn send(&self, phase: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| CaptureError::Network {
            phase: phase.to_string(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CaptureError::Backend { phase: phase.to_string(), status, body });
        }

        tracing::debug!(phase, status = response.status().as_u16(), "Backend call succeeded");
        Ok(response)
    }
}

#[async_trait]
impl CaptureBackend for HttpBackend {
    async fn create_capture(&self) -> Result<String> {
        let request = self.client.post(self.url("/capture")).json(&serde_json::json!({}));
        let response = self.send(phase::CREATE_CAPTURE, request).await?;

        let body: DataEnvelope = response.json().await.map_err(|e| CaptureError::Network {
            phase: phase::CREATE_CAPTURE.to_string(),
            reason: format!("Unreadable response: {}", e),
        })?;
        Ok(body.data.id)
    }

    async fn update_capture(&self, capture_id: &str, name: &str, camera: CameraMetadata) -> Result<()> {
        let payload = UpdateCaptureRequest { name, camera_metadata: camera };
        let request = self.client.put(self.url(&format!("/capture/{}", capture_id))).json(&payload);
        self.send(phase::UPDATE_CAPTURE, request).await?;
        Ok(())
    }

    async fn upload_image(&self, capture_id: &str, image: &ImageUpload) -> Result<UploadAck> {
        let mut form = Form::new()
            .text("index", image.index.to_string())
            .part("image", file_part(image.image.clone(), &image.file_name, "image/png")?);
        if let Some(depth) = &image.depth {
            form = form.part("depth", file_part(depth.clone(), &image.depth_file_name, "image/tiff")?);
        }

        let request = self.client.post(self.url(&format!("/image/{}", capture_id))).multipart(form);
        let response = self.send(phase::UPLOAD_IMAGE, request).await?;

        // older backends answer with an empty body and no echoed index
        let record = response.json::<ImageEnvelope>().await.ok().map(|body| body.data);
        let (index, image_id) = match record {
            Some(record) => (record.index.unwrap_or(image.index), record.id),
            None => (image.index, None),
        };
        Ok(UploadAck { index, image_id })
    }

    async fn lock_capture(&self, capture_id: &str) -> Result<()> {
        let request = self.client.put(self.url(&format!("/capture/lock/{}", capture_id)));
        self.send(phase::LOCK_CAPTURE, request).await?;
        Ok(())
    }

    async fn create_task(&self, capture_id: &str, task: TaskType) -> Result<()> {
        let payload = CreateTaskRequest { task_type: task };
        let request = self.client.post(self.url(&format!("/task/{}", capture_id))).json(&payload);
        self.send(phase::CREATE_TASK, request).await?;
        Ok(())
    }
}

fn file_part(bytes: Vec<u8>, file_name: &str, mime: &str) -> Result<Part> {
    Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .map_err(|e| CaptureError::Network { phase: phase::UPLOAD_IMAGE.to_string(), reason: e.to_string() })
}

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    data: RemoteRecord,
}

#[derive(Debug, Deserialize)]
struct RemoteRecord {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct ImageEnvelope {
    data: ImageRecord,
}

#[derive(Debug, Deserialize)]
struct ImageRecord {
    #[serde(rename = "_id")]
    id: Option<String>,

    /// Index the backend stored the image under
    index: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCaptureRequest<'a> {
    name: &'a str,
    camera_metadata: CameraMetadata,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest {
    #[serde(rename = "type")]
    task_type: TaskType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = HttpBackend::new("http://127.0.0.1:3001/");
        assert_eq!(backend.base_url(), "http://127.0.0.1:3001");
        assert_eq!(backend.url("/capture"), "http://127.0.0.1:3001/capture");
    }

    #[test]
    fn test_request_bodies() {
        let update = UpdateCaptureRequest {
            name: "mug",
            camera_metadata: CameraMetadata { width: 1920, height: 1440 },
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"name": "mug", "cameraMetadata": {"width": 1920, "height": 1440}})
        );

        let task = CreateTaskRequest { task_type: TaskType::GaussianSplatting };
        assert_eq!(serde_json::to_value(&task).unwrap(), serde_json::json!({"type": "GS"}));
    }

    #[test]
    fn test_create_response() {
        let body: DataEnvelope = serde_json::from_str(r#"{"data":{"_id":"66f0c1","name":""}}"#).unwrap();
        assert_eq!(body.data.id, "66f0c1");
    }

    #[test]
    fn test_image_response_fields_are_optional() {
        let body: ImageEnvelope = serde_json::from_str(r#"{"data":{"_id":"img-2","index":2}}"#).unwrap();
        assert_eq!(body.data.id.as_deref(), Some("img-2"));
        assert_eq!(body.data.index, Some(2));

        let body: ImageEnvelope = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert_eq!(body.data.id, None);
        assert_eq!(body.data.index, None);
    }
}
