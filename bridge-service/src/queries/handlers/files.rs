//! File browsing, uploads and folder management.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, general_purpose};
use serde_json::{Value, json};
use tracing::warn;

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};
use crate::host::{BrowseRequest, FileUpload, FolderExportRequest, FolderUpdate, NewFolder};
use crate::queries::{Payload, QueryHandlers};

/// Standard alphabet, padding optional on decode
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Storage source used for uploads
pub(super) const DATA_SOURCE: &str = "data";

/// Upload extensions and their MIME types, in the order they are listed
/// back to callers
const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("gif", "image/gif"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("pdf", "application/pdf"),
];

impl QueryHandlers {
    pub(crate) async fn browse_files(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "browse files", async {
            let request = BrowseRequest {
                source: payload.str("source").unwrap_or("public").to_string(),
                target: payload.str("target").unwrap_or_default().to_string(),
                extensions: payload.strings("extensions").unwrap_or_default(),
            };

            let listing = self.host.browse_files(request).await?;
            Ok(json!({
                "target": listing.target,
                "dirs": listing.dirs,
                "files": listing.files,
            }))
        })
        .await
    }

    pub(crate) async fn upload_file(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "upload file", async {
            let filename =
                payload.require_str("filename", "filename is required and must be a string")?;
            let base64_data =
                payload.require_str("base64data", "base64data is required and must be a string")?;
            let target_path =
                payload.require_str("targetPath", "targetPath is required and must be a string")?;

            let filename = sanitize_filename(&filename, true);
            let extension = filename
                .rsplit('.')
                .next()
                .unwrap_or_default()
                .to_lowercase();
            let mime_type = mime_type_for(&extension).ok_or_else(|| {
                QueryError::validation(format!(
                    "Unsupported file extension: .{extension}. Supported: {}",
                    MIME_TYPES
                        .iter()
                        .map(|(ext, _)| *ext)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;
            check_base64(&base64_data, "base64data is not valid base64")?;

            let target_path = target_path.trim_matches('/').to_string();
            let mut current = String::new();
            for part in target_path.split('/').filter(|part| !part.is_empty()) {
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(part);
                self.ensure_directory(&current).await;
            }

            let path = self
                .host
                .upload_file(FileUpload {
                    source: DATA_SOURCE.to_string(),
                    target_path,
                    filename: filename.clone(),
                    mime_type: mime_type.to_string(),
                    base64_data,
                })
                .await?;
            Ok(json!({ "success": true, "path": path, "filename": filename }))
        })
        .await
    }

    pub(crate) async fn create_folder(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "create folder", async {
            let folder = NewFolder {
                name: payload.required("name")?,
                folder_type: payload.required("type")?,
                parent: payload.str("parent").map(str::to_string),
            };

            let created = self.host.create_folder(folder).await?;
            Ok(json!(created))
        })
        .await
    }

    pub(crate) async fn list_folders(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "list folders", async {
            let mut folders = self.host.list_folders().await?;
            if let Some(folder_type) = payload.str("type") {
                folders.retain(|f| f.folder_type == folder_type);
            }
            Ok(json!({ "folders": folders }))
        })
        .await
    }

    pub(crate) async fn delete_folder(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "delete folder", async {
            let folder_id = payload.required("folderId")?;
            let delete_contents = payload.truthy("deleteContents").is_some();

            let name = self
                .host
                .delete_folder(folder_id.clone(), delete_contents)
                .await?
                .ok_or_else(|| QueryError::precondition(format!("Folder not found: {folder_id}")))?;
            Ok(json!({ "name": name }))
        })
        .await
    }

    pub(crate) async fn update_folder(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "update folder", async {
            let folder_id = payload.required("folderId")?;
            let update = FolderUpdate {
                name: payload.get("name").and_then(Value::as_str).map(str::to_string),
                parent: payload
                    .get("parent")
                    .map(|parent| parent.as_str().filter(|p| !p.is_empty()).map(str::to_string)),
            };

            let folder = self
                .host
                .update_folder(folder_id.clone(), update)
                .await?
                .ok_or_else(|| QueryError::precondition(format!("Folder not found: {folder_id}")))?;
            Ok(json!(folder))
        })
        .await
    }

    pub(crate) async fn export_folder_to_compendium(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "export folder to compendium", async {
            let request = FolderExportRequest {
                folder_id: payload.required("folderId")?,
                pack_id: payload.required("packId")?,
                recursive: payload.flag("recursive") != Some(false),
                clear_first: payload.truthy("clearFirst").is_some(),
            };
            Ok(self.host.export_folder_to_compendium(request).await?)
        })
        .await
    }

    /// Create `path` on the data source. Existing directories are fine and
    /// other failures only warn; the upload itself reports real problems.
    pub(super) async fn ensure_directory(&self, path: &str) {
        if let Err(e) = self
            .host
            .create_directory(DATA_SOURCE.to_string(), path.to_string())
            .await
        {
            let message = e.to_string();
            if !message.contains("EEXIST") && !message.contains("already exists") {
                warn!(path = %path, error = %message, "Directory creation failed");
            }
        }
    }
}

/// Replace anything outside `[A-Za-z0-9_.-]` (plus whitespace when allowed)
/// with `_`.
pub(super) fn sanitize_filename(name: &str, allow_whitespace: bool) -> String {
    name.chars()
        .map(|c| {
            let keep = c.is_ascii_alphanumeric()
                || matches!(c, '_' | '-' | '.')
                || (allow_whitespace && c.is_whitespace());
            if keep { c } else { '_' }
        })
        .collect()
}

pub(super) fn mime_type_for(extension: &str) -> Option<&'static str> {
    MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// Accepts what a browser's `atob` accepts: unpadded input and line-wrapped data.
pub(super) fn check_base64(data: &str, message: &str) -> Result<(), QueryError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    LENIENT_BASE64
        .decode(compact)
        .map(|_| ())
        .map_err(|_| QueryError::validation(message))
}
