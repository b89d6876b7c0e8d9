//! AI map generation jobs and generated map uploads.
//!
//! These handlers never raise: every failure comes back as a
//! `{ "success": false, "error": ... }` payload.

use serde_json::{Map, Value, json};

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};
use crate::host::{FileUpload, MapGenerationRequest};
use crate::queries::payload::is_truthy;
use crate::queries::{Payload, QueryHandlers, QueryResponse};

use super::files::{DATA_SOURCE, check_base64, sanitize_filename};
use super::{or_default, or_truthy};

const DEFAULT_MAP_GRID_SIZE: u64 = 70;
const MAP_IMAGE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

impl QueryHandlers {
    pub(crate) async fn generate_map(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.reporting(caller, async {
            let prompt = payload.require_str("prompt", "Prompt is required and must be a string")?;
            let scene_name = payload
                .require_str("scene_name", "Scene name is required and must be a string")?;

            let request = MapGenerationRequest {
                prompt: prompt.trim().to_string(),
                scene_name: scene_name.trim().to_string(),
                size: payload.str("size").unwrap_or("medium").to_string(),
                grid_size: payload
                    .positive_u64("grid_size")
                    .unwrap_or(DEFAULT_MAP_GRID_SIZE),
                quality: self.settings.map_quality.clone(),
            };

            let response = self.host.generate_map(request).await?;
            if !backend_succeeded(&response) {
                return Ok(backend_failure(&response, "Map generation failed"));
            }
            let mut body = json!({
                "success": true,
                "status": or_default(response.get("status"), json!("success")),
                "message": or_truthy(response.get("message"), json!("Map generation started")),
                "estimatedTime": or_truthy(response.get("estimatedTime"), json!("30-90 seconds")),
            });
            if let Some(job_id) = response.get("jobId") {
                body["jobId"] = job_id.clone();
            }
            Ok(body)
        })
        .await
    }

    pub(crate) async fn check_map_status(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.reporting(caller, async {
            let job_id = payload.require_str("job_id", "Job ID is required")?;

            let response = self.host.check_map_status(job_id).await?;
            if !backend_succeeded(&response) {
                return Ok(backend_failure(&response, "Status check failed"));
            }
            Ok(json!({
                "success": true,
                "status": or_default(response.get("status"), json!("success")),
                "job": response.get("job"),
            }))
        })
        .await
    }

    pub(crate) async fn cancel_map_job(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.reporting(caller, async {
            let job_id = payload.require_str("job_id", "Job ID is required")?;

            let response = self.host.cancel_map_job(job_id).await?;
            if !backend_succeeded(&response) {
                return Ok(backend_failure(&response, "Job cancellation failed"));
            }
            Ok(json!({
                "success": true,
                "status": or_default(response.get("status"), json!("success")),
                "message": or_truthy(response.get("message"), json!("Job cancelled successfully")),
            }))
        })
        .await
    }

    /// Stores a generated map image under the world's generated maps folder.
    pub(crate) async fn upload_generated_map(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.reporting(caller, async {
            let filename =
                payload.require_str("filename", "Filename is required and must be a string")?;
            let image_data = payload.require_str(
                "imageData",
                "Image data is required and must be a base64 string",
            )?;

            let filename = sanitize_filename(&filename, false);
            if !MAP_IMAGE_EXTENSIONS.iter().any(|ext| filename.ends_with(ext)) {
                return Err(QueryError::validation("Only PNG and JPEG images are supported"));
            }
            check_base64(&image_data, "Image data is not valid base64")?;

            let world_id = self
                .host
                .world()
                .world_id
                .unwrap_or_else(|| "unknown-world".to_string());
            let upload_path = format!("worlds/{world_id}/{}", self.settings.generated_maps_dir);
            self.ensure_directory(&upload_path).await;

            let path = self
                .host
                .upload_file(FileUpload {
                    source: DATA_SOURCE.to_string(),
                    target_path: upload_path,
                    filename: filename.clone(),
                    mime_type: "image/png".to_string(),
                    base64_data: image_data,
                })
                .await?;

            let mut fields = Map::new();
            fields.insert("path".to_string(), json!(path));
            fields.insert("filename".to_string(), json!(filename));
            fields.insert(
                "message".to_string(),
                json!(format!("Map uploaded successfully to {path}")),
            );
            Ok(QueryResponse::success(fields))
        })
        .await
    }
}

/// An explicit boolean `success` wins; otherwise `status` must be "success"
fn backend_succeeded(response: &Value) -> bool {
    match response.get("success") {
        Some(Value::Bool(success)) => *success,
        _ => response.get("status").and_then(Value::as_str) == Some("success"),
    }
}

fn backend_failure(response: &Value, fallback: &str) -> Value {
    let error = ["error", "message"]
        .iter()
        .filter_map(|key| response.get(*key))
        .find(|value| is_truthy(value))
        .cloned()
        .unwrap_or_else(|| json!(fallback));
    json!({
        "error": error,
        "success": false,
        "status": or_default(response.get("status"), json!("error")),
    })
}
