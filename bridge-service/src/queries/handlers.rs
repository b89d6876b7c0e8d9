//! Query handler implementations, grouped by host area.
//!
//! Each submodule adds an `impl QueryHandlers` block. Handlers check access,
//! validate their payload, then make their host calls through the facade.

use serde_json::{Map, Value};

use crate::error::QueryError;
use crate::host::NewFolder;

use super::payload::is_truthy;
use super::{Payload, QueryHandlers};

mod actors;
mod compendium;
mod documents;
mod files;
mod journals;
mod maps;
mod players;
mod scenes;
mod tokens;
mod world;

impl QueryHandlers {
    /// Folder for a new document: the explicit `folder` id, else a folder of
    /// `folder_type` named `folderName`, created when missing.
    pub(crate) async fn resolve_folder(
        &self,
        payload: &Payload,
        folder_type: &str,
    ) -> Result<Option<String>, QueryError> {
        if let Some(folder_id) = payload.str("folder") {
            return Ok(Some(folder_id.to_string()));
        }
        let Some(folder_name) = payload.str("folderName") else {
            return Ok(None);
        };

        let existing = self
            .host
            .list_folders()
            .await?
            .into_iter()
            .find(|f| f.folder_type == folder_type && f.name == folder_name);
        if let Some(folder) = existing {
            return Ok(Some(folder.id));
        }

        let created = self
            .host
            .create_folder(NewFolder {
                name: folder_name.to_string(),
                folder_type: folder_type.to_string(),
                parent: None,
            })
            .await?;
        Ok(Some(created.id))
    }
}

/// `value ?? default`: missing or null falls back
pub(crate) fn or_default(value: Option<&Value>, default: Value) -> Value {
    match value {
        Some(v) if !v.is_null() => v.clone(),
        _ => default,
    }
}

/// `value || default`: any falsy value falls back
pub(crate) fn or_truthy(value: Option<&Value>, default: Value) -> Value {
    match value {
        Some(v) if is_truthy(v) => v.clone(),
        _ => default,
    }
}

/// Copy the listed fields that are present in `source`
pub(crate) fn copy_fields(source: &Value, target: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        if let Some(value) = source.get(*key) {
            target.insert((*key).to_string(), value.clone());
        }
    }
}

/// Copy the listed fields when truthy
pub(crate) fn copy_truthy(source: &Value, target: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        if let Some(value) = source.get(*key).filter(|v| is_truthy(v)) {
            target.insert((*key).to_string(), value.clone());
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::access::Caller;
    use crate::host::{FolderInfo, MockHostApi};
    use crate::queries::QueryName;
    use mockall::predicate::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[tokio::test]
    async fn test_every_query_but_ping_denies_non_gm_callers() {
        // A mock without expectations panics on any host call
        let handlers = handlers(MockHostApi::new());
        for caller in [player(), Caller::anonymous()] {
            for name in QueryName::iter().filter(|n| *n != QueryName::Ping) {
                let result = handlers
                    .handle(name, &caller, payload(json!({"tokenId": "t1", "name": "x"})))
                    .await
                    .unwrap();
                assert_eq!(result, denied(), "{name} should deny");
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_folder_prefers_explicit_id() {
        let handlers = handlers(MockHostApi::new());
        let folder = handlers
            .resolve_folder(&payload(json!({"folder": "f1", "folderName": "Maps"})), "Scene")
            .await
            .unwrap();
        assert_eq!(folder.as_deref(), Some("f1"));

        let none = handlers
            .resolve_folder(&payload(json!({})), "Scene")
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_resolve_folder_finds_by_name_and_type() {
        let mut host = MockHostApi::new();
        host.expect_list_folders().times(1).returning(|| {
            Ok(vec![
                FolderInfo {
                    id: "j1".to_string(),
                    name: "Chapter 1".to_string(),
                    folder_type: "JournalEntry".to_string(),
                    parent: None,
                },
                FolderInfo {
                    id: "s1".to_string(),
                    name: "Chapter 1".to_string(),
                    folder_type: "Scene".to_string(),
                    parent: None,
                },
            ])
        });
        host.expect_create_folder().never();

        let folder = handlers(host)
            .resolve_folder(&payload(json!({"folderName": "Chapter 1"})), "Scene")
            .await
            .unwrap();
        assert_eq!(folder.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_resolve_folder_creates_missing_folder() {
        let mut host = MockHostApi::new();
        host.expect_list_folders().returning(|| Ok(vec![]));
        host.expect_create_folder()
            .with(eq(NewFolder {
                name: "Tables".to_string(),
                folder_type: "RollTable".to_string(),
                parent: None,
            }))
            .times(1)
            .returning(|folder| {
                Ok(FolderInfo {
                    id: "new".to_string(),
                    name: folder.name,
                    folder_type: folder.folder_type,
                    parent: None,
                })
            });

        let folder = handlers(host)
            .resolve_folder(&payload(json!({"folderName": "Tables"})), "RollTable")
            .await
            .unwrap();
        assert_eq!(folder.as_deref(), Some("new"));
    }

    #[test]
    fn test_default_helpers() {
        assert_eq!(or_default(Some(&json!(0)), json!(20)), json!(0));
        assert_eq!(or_default(Some(&Value::Null), json!(20)), json!(20));
        assert_eq!(or_truthy(Some(&json!(0)), json!(40)), json!(40));
        assert_eq!(or_truthy(None, json!("ft")), json!("ft"));

        let mut target = Map::new();
        let source = json!({"x": 1, "pageId": "", "iconTint": "#fff"});
        copy_fields(&source, &mut target, &["x", "y"]);
        copy_truthy(&source, &mut target, &["pageId", "iconTint"]);
        assert_eq!(Value::Object(target), json!({"x": 1, "iconTint": "#fff"}));
    }
}
