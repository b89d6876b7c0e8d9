//! Generic Actor and Item document operations.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};
use crate::host::{BatchCreateRequest, CreateDocumentRequest, DocumentType, UpdateDocumentRequest};
use crate::queries::{Payload, QueryHandlers};

fn document_type(payload: &Payload) -> Result<DocumentType, QueryError> {
    payload
        .str("documentType")
        .and_then(|name| DocumentType::from_str(name).ok())
        .ok_or_else(|| QueryError::validation(r#"documentType must be "Actor" or "Item""#))
}

fn string_field<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

impl QueryHandlers {
    pub(crate) async fn create_document(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "create document", async {
            self.host.ensure_ready()?;
            let data = payload
                .get("data")
                .and_then(Value::as_object)
                .ok_or_else(|| QueryError::validation("data object is required"))?;
            if string_field(data, "name").is_none() {
                return Err(QueryError::validation("data.name is required and must be a string"));
            }
            if string_field(data, "type").is_none() {
                return Err(QueryError::validation("data.type is required and must be a string"));
            }
            let document_type = document_type(payload)?;

            let request = CreateDocumentRequest {
                document_type,
                data: data.clone(),
                folder_name: payload.str("folderName").map(str::to_string),
            };
            Ok(self.host.create_document(request).await?)
        })
        .await
    }

    pub(crate) async fn batch_create_documents(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "batch create documents", async {
            self.host.ensure_ready()?;
            let document_type = document_type(payload)?;
            let documents = payload.non_empty_array("documents").ok_or_else(|| {
                QueryError::validation("documents array is required and must not be empty")
            })?;

            let request = BatchCreateRequest {
                document_type,
                documents: documents.clone(),
                folder_id: payload.str("folderId").map(str::to_string),
            };
            Ok(self.host.batch_create_documents(request).await?)
        })
        .await
    }

    pub(crate) async fn update_document(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "update document", async {
            self.host.ensure_ready()?;
            let document_id = payload.required("documentId")?;
            let document_type = document_type(payload)?;

            let request = UpdateDocumentRequest {
                document_type,
                document_id,
                updates: payload.truthy("updates").cloned(),
                add_items: payload.truthy("addItems").cloned(),
                remove_item_ids: payload.truthy("removeItemIds").cloned(),
            };
            if request.updates.is_none()
                && request.add_items.is_none()
                && request.remove_item_ids.is_none()
            {
                return Err(QueryError::validation(
                    "At least one of updates, addItems, or removeItemIds must be provided",
                ));
            }
            Ok(self.host.update_document(request).await?)
        })
        .await
    }

    pub(crate) async fn delete_document(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "delete document", async {
            self.host.ensure_ready()?;
            let document_id = payload.required("documentId")?;
            let document_type = document_type(payload)?;
            Ok(self.host.delete_document(document_type, document_id).await?)
        })
        .await
    }
}
