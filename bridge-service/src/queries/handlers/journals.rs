//! Journals, multi-page journal entries and roll tables.

use serde_json::{Map, Value, json};

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};
use crate::host::{JournalData, RollTableData};
use crate::queries::payload::is_truthy;
use crate::queries::{Payload, QueryHandlers};

use super::{copy_truthy, or_default, or_truthy};

/// Gap between page sort keys, so pages can be reordered in between
const PAGE_SORT_STEP: u64 = 100_000;

impl QueryHandlers {
    pub(crate) async fn create_journal_entry(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "create journal entry", async {
            let name = payload.required("name")?;
            let content = payload.required("content")?;
            Ok(self.host.create_journal_entry(name, content).await?)
        })
        .await
    }

    pub(crate) async fn list_journals(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "list journals", async {
            self.host.ensure_ready()?;
            Ok(self.host.list_journals().await?)
        })
        .await
    }

    pub(crate) async fn get_journal_content(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "get journal content", async {
            self.host.ensure_ready()?;
            let journal_id = payload.required("journalId")?;
            Ok(self.host.get_journal_content(journal_id).await?)
        })
        .await
    }

    pub(crate) async fn update_journal_content(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "update journal content", async {
            self.host.ensure_ready()?;
            let journal_id = payload.required("journalId")?;
            let content = payload.required("content")?;
            Ok(self.host.update_journal_content(journal_id, content).await?)
        })
        .await
    }

    pub(crate) async fn create_journal_entry_multi_page(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "create journal entry", async {
            self.host.ensure_ready()?;
            let name = payload.required("name")?;
            let pages = payload
                .non_empty_array("pages")
                .ok_or_else(|| QueryError::validation("pages array is required and must not be empty"))?;

            let pages: Vec<Value> = pages
                .iter()
                .enumerate()
                .map(|(index, page)| journal_page(index, page))
                .collect();
            let journal = JournalData {
                name,
                pages,
                ownership: or_truthy(payload.get("ownership"), json!({ "default": 0 })),
                folder: self.resolve_folder(payload, "JournalEntry").await?,
            };

            let created = self.host.create_journal(journal).await?;
            Ok(json!({
                "id": created.id,
                "name": created.name,
                "pageCount": created.page_ids.len(),
                "pageIds": created.page_ids,
            }))
        })
        .await
    }

    pub(crate) async fn create_roll_table(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "create roll table", async {
            self.host.ensure_ready()?;
            let name = payload.required("name")?;
            let formula = payload.required("formula")?;
            let results = payload
                .non_empty_array("results")
                .ok_or_else(|| QueryError::validation("results array is required and must not be empty"))?;

            let table = RollTableData {
                name,
                formula,
                description: payload.str("description").unwrap_or_default().to_string(),
                results: results.iter().map(table_result).collect(),
                replacement: payload.flag("replacement") != Some(false),
                display_roll: payload.flag("displayRoll") != Some(false),
                img: payload.str("img").map(str::to_string),
                folder: self.resolve_folder(payload, "RollTable").await?,
            };

            let created = self.host.create_roll_table(table).await?;
            Ok(json!({
                "id": created.id,
                "name": created.name,
                "formula": created.formula,
                "resultCount": created.result_count,
            }))
        })
        .await
    }
}

fn journal_page(index: usize, page: &Value) -> Value {
    let page_type = or_default(page.get("type"), Value::Null);
    let mut data = Map::new();
    data.insert("name".to_string(), or_default(page.get("name"), Value::Null));
    data.insert("type".to_string(), page_type.clone());
    data.insert(
        "sort".to_string(),
        json!((index as u64 + 1) * PAGE_SORT_STEP),
    );

    match page_type.as_str() {
        Some("text") => {
            data.insert(
                "text".to_string(),
                json!({ "content": or_truthy(page.get("content"), json!("")) }),
            );
        }
        Some("image") => {
            data.insert("src".to_string(), or_truthy(page.get("src"), json!("")));
            if let Some(caption) = page.get("caption").filter(|v| is_truthy(v)) {
                data.insert("image".to_string(), json!({ "caption": caption }));
            }
        }
        _ => {}
    }
    Value::Object(data)
}

fn table_result(result: &Value) -> Value {
    let mut data = Map::new();
    data.insert("range".to_string(), or_default(result.get("range"), Value::Null));
    data.insert("text".to_string(), or_default(result.get("text"), Value::Null));
    data.insert("type".to_string(), or_default(result.get("type"), json!(0)));
    data.insert("weight".to_string(), or_default(result.get("weight"), json!(1)));
    copy_truthy(result, &mut data, &["documentCollection", "documentId", "img"]);
    Value::Object(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CreatedJournal, CreatedRollTable, MockHostApi, PageRef};
    use crate::queries::handlers::test_support::*;
    use mockall::predicate::*;

    #[test]
    fn test_journal_pages_by_type() {
        let text = journal_page(0, &json!({"name": "Intro", "type": "text", "content": "<p>Hi</p>"}));
        assert_eq!(
            text,
            json!({"name": "Intro", "type": "text", "sort": 100000, "text": {"content": "<p>Hi</p>"}})
        );

        let image = journal_page(2, &json!({"name": "Map", "type": "image", "src": "maps/a.png", "caption": "The keep"}));
        assert_eq!(
            image,
            json!({
                "name": "Map",
                "type": "image",
                "sort": 300000,
                "src": "maps/a.png",
                "image": {"caption": "The keep"}
            })
        );

        let bare = journal_page(1, &json!({"name": "Empty", "type": "text"}));
        assert_eq!(bare["text"], json!({"content": ""}));

        let untyped = journal_page(0, &json!({"name": "Odd"}));
        assert_eq!(untyped, json!({"name": "Odd", "type": null, "sort": 100000}));
    }

    #[test]
    fn test_table_result_defaults() {
        let result = table_result(&json!({"range": [1, 2], "text": "Goblins", "weight": 0, "img": ""}));
        assert_eq!(
            result,
            json!({"range": [1, 2], "text": "Goblins", "type": 0, "weight": 0})
        );
    }

    #[tokio::test]
    async fn test_create_journal_entry_skips_readiness_check() {
        let mut host = MockHostApi::new();
        host.expect_ensure_ready().never();
        host.expect_create_journal_entry()
            .with(eq("Session 1".to_string()), eq("<p>Notes</p>".to_string()))
            .times(1)
            .returning(|name, _| Ok(json!({"id": "j1", "name": name})));

        let result = handlers(host)
            .create_journal_entry(&gm(), &payload(json!({"name": "Session 1", "content": "<p>Notes</p>"})))
            .await
            .unwrap();
        assert_eq!(result["id"], "j1");
    }

    #[tokio::test]
    async fn test_multi_page_requires_pages() {
        let mut host = ready_host();
        host.expect_create_journal().never();

        let err = handlers(host)
            .create_journal_entry_multi_page(&gm(), &payload(json!({"name": "Lore", "pages": []})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to create journal entry: pages array is required and must not be empty"
        );
    }

    #[tokio::test]
    async fn test_multi_page_shapes_request_and_response() {
        let mut host = ready_host();
        host.expect_create_journal()
            .withf(|journal| {
                journal.name == "Lore"
                    && journal.pages.len() == 2
                    && journal.ownership == json!({"default": 0})
                    && journal.folder.as_deref() == Some("f1")
            })
            .times(1)
            .returning(|journal| {
                Ok(CreatedJournal {
                    id: "j2".to_string(),
                    name: journal.name,
                    page_ids: vec![
                        PageRef { id: "p1".to_string(), name: "One".to_string() },
                        PageRef { id: "p2".to_string(), name: "Two".to_string() },
                    ],
                })
            });

        let result = handlers(host)
            .create_journal_entry_multi_page(
                &gm(),
                &payload(json!({
                    "name": "Lore",
                    "folder": "f1",
                    "pages": [{"name": "One", "type": "text"}, {"name": "Two", "type": "image"}]
                })),
            )
            .await
            .unwrap();
        assert_eq!(result["pageCount"], 2);
        assert_eq!(result["pageIds"][1], json!({"id": "p2", "name": "Two"}));
    }

    #[tokio::test]
    async fn test_roll_table_flags_default_on() {
        let mut host = ready_host();
        host.expect_create_roll_table()
            .withf(|table| {
                table.replacement
                    && !table.display_roll
                    && table.description.is_empty()
                    && table.folder.is_none()
                    && table.results[0]["weight"] == 1
            })
            .times(1)
            .returning(|table| {
                Ok(CreatedRollTable {
                    id: "t1".to_string(),
                    name: table.name,
                    formula: table.formula,
                    result_count: table.results.len() as u64,
                })
            });

        let result = handlers(host)
            .create_roll_table(
                &gm(),
                &payload(json!({
                    "name": "Encounters",
                    "formula": "1d6",
                    "displayRoll": false,
                    "results": [{"range": [1, 6], "text": "Wolves"}]
                })),
            )
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({"id": "t1", "name": "Encounters", "formula": "1d6", "resultCount": 1})
        );
    }
}
