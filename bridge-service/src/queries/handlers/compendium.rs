//! Compendium search, browsing and edits.

use serde_json::{Map, Value, json};

use crate::access::{Caller, validate_gm_access};
use crate::error::{QueryError, QueryResult};
use crate::host::{CompendiumActorRequest, CompendiumSearch};
use crate::queries::{Payload, QueryHandlers, QueryResponse};

impl QueryHandlers {
    pub(crate) async fn search_compendium(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "search compendium", async {
            self.host.ensure_ready()?;
            if !payload.is_object() {
                return Err(QueryError::validation("Invalid data parameter structure"));
            }
            let query =
                payload.require_str("query", "query parameter is required and must be a string")?;

            let request = CompendiumSearch {
                query,
                pack_type: payload.str("packType").map(str::to_string),
                filters: payload.get("filters").filter(|v| !v.is_null()).cloned(),
            };
            Ok(self.host.search_compendium(request).await?)
        })
        .await
    }

    pub(crate) async fn list_creatures_by_criteria(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "list creatures by criteria", async {
            self.host.ensure_ready()?;
            let result = self
                .host
                .list_creatures_by_criteria(payload.to_value())
                .await?;
            Ok(json!({ "response": result }))
        })
        .await
    }

    pub(crate) async fn get_available_packs(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "get available packs", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_available_packs().await?)
        })
        .await
    }

    pub(crate) async fn list_compendium_entries(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "list compendium entries", async {
            self.host.ensure_ready()?;
            let pack_id = payload.required("packId")?;
            let entry_type = payload.str("type").map(str::to_string);
            Ok(self.host.list_compendium_entries(pack_id, entry_type).await?)
        })
        .await
    }

    pub(crate) async fn get_compendium_document_full(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "get compendium document", async {
            self.host.ensure_ready()?;
            let pack_id = payload.required("packId")?;
            let document_id = payload.required("documentId")?;
            Ok(self
                .host
                .get_compendium_document_full(pack_id, document_id)
                .await?)
        })
        .await
    }

    pub(crate) async fn get_enhanced_creature_index(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "get enhanced creature index", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_enhanced_creature_index().await?)
        })
        .await
    }

    pub(crate) async fn create_actor_from_compendium(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "create actor from compendium", async {
            self.host.ensure_ready()?;
            let pack_id = payload.required("packId")?;
            let item_id = payload.required("itemId")?;

            let request = CompendiumActorRequest {
                pack_id,
                item_id,
                custom_names: payload.strings("customNames").unwrap_or_default(),
                quantity: payload.positive_u64("quantity").unwrap_or(1),
                add_to_scene: payload.truthy("addToScene").is_some(),
                placement: payload.truthy("placement").cloned(),
            };
            Ok(self.host.create_actor_from_compendium(request).await?)
        })
        .await
    }

    /// Pack lookups fail unprefixed; only the edit itself carries the
    /// operation name.
    pub(crate) async fn update_compendium_entry(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        if !validate_gm_access(caller).allowed {
            return Ok(QueryResponse::access_denied());
        }

        let pack_id = payload.required("packId")?;
        let item_id = payload.required("itemId")?;

        let pack = self
            .host
            .get_pack(pack_id.clone())
            .await?
            .ok_or_else(|| QueryError::precondition(format!("Compendium pack not found: {pack_id}")))?;
        if pack.locked {
            return Err(QueryError::precondition(format!(
                "Compendium pack is locked: {pack_id}. Unlock it in Foundry first."
            )));
        }

        self.guarded(caller, "update compendium entry", async {
            let updates = payload
                .get("updates")
                .filter(|v| v.is_object())
                .cloned()
                .ok_or_else(|| QueryError::validation("updates object is required"))?;

            let name = self
                .host
                .update_compendium_entry(pack_id.clone(), item_id.clone(), updates)
                .await?
                .ok_or_else(|| {
                    QueryError::precondition(format!("Document not found: {item_id} in {pack_id}"))
                })?;

            let mut fields = Map::new();
            fields.insert("id".to_string(), Value::String(item_id.clone()));
            fields.insert("name".to_string(), Value::String(name));
            Ok(QueryResponse::success(fields))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::host::{MockHostApi, PackInfo};
    use crate::queries::handlers::test_support::*;
    use mockall::predicate::*;
    use serde_json::json;

    fn pack(locked: bool) -> PackInfo {
        PackInfo {
            id: "world.monsters".to_string(),
            label: "Monsters".to_string(),
            locked,
        }
    }

    #[tokio::test]
    async fn test_search_rejects_non_object_payload() {
        let mut host = ready_host();
        host.expect_search_compendium().never();

        let err = handlers(host)
            .search_compendium(&gm(), &payload(json!(["goblin"])))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to search compendium: Invalid data parameter structure"
        );
    }

    #[tokio::test]
    async fn test_search_requires_string_query() {
        let mut host = ready_host();
        host.expect_search_compendium().never();

        let err = handlers(host)
            .search_compendium(&gm(), &payload(json!({"query": 42})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to search compendium: query parameter is required and must be a string"
        );
    }

    #[tokio::test]
    async fn test_search_forwards_pack_type() {
        let mut host = ready_host();
        host.expect_search_compendium()
            .withf(|r| r.query == "dragon" && r.pack_type.as_deref() == Some("Actor"))
            .times(1)
            .returning(|_| Ok(json!([{"name": "Red Dragon"}])));

        let result = handlers(host)
            .search_compendium(&gm(), &payload(json!({"query": "dragon", "packType": "Actor"})))
            .await
            .unwrap();
        assert_eq!(result[0]["name"], "Red Dragon");
    }

    #[tokio::test]
    async fn test_creatures_by_criteria_wraps_response() {
        let mut host = ready_host();
        host.expect_list_creatures_by_criteria()
            .with(eq(json!({"challengeRating": 5})))
            .times(1)
            .returning(|_| Ok(json!({"creatures": []})));

        let result = handlers(host)
            .list_creatures_by_criteria(&gm(), &payload(json!({"challengeRating": 5})))
            .await
            .unwrap();
        assert_eq!(result, json!({"response": {"creatures": []}}));
    }

    #[tokio::test]
    async fn test_create_actor_defaults() {
        let mut host = ready_host();
        host.expect_create_actor_from_compendium()
            .withf(|r| {
                r.pack_id == "world.monsters"
                    && r.item_id == "gob"
                    && r.custom_names.is_empty()
                    && r.quantity == 1
                    && !r.add_to_scene
                    && r.placement.is_none()
            })
            .times(1)
            .returning(|_| Ok(json!({"actors": ["a1"]})));

        let result = handlers(host)
            .create_actor_from_compendium(
                &gm(),
                &payload(json!({"packId": "world.monsters", "itemId": "gob", "quantity": 0})),
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"actors": ["a1"]}));
    }

    #[tokio::test]
    async fn test_update_entry_missing_pack_is_unprefixed() {
        let mut host = MockHostApi::new();
        host.expect_get_pack().returning(|_| Ok(None));
        host.expect_update_compendium_entry().never();

        let err = handlers(host)
            .update_compendium_entry(
                &gm(),
                &payload(json!({"packId": "world.nope", "itemId": "x", "updates": {}})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Compendium pack not found: world.nope");
    }

    #[tokio::test]
    async fn test_update_entry_locked_pack() {
        let mut host = MockHostApi::new();
        host.expect_get_pack().returning(|_| Ok(Some(pack(true))));
        host.expect_update_compendium_entry().never();

        let err = handlers(host)
            .update_compendium_entry(
                &gm(),
                &payload(json!({"packId": "world.monsters", "itemId": "x", "updates": {}})),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Compendium pack is locked: world.monsters. Unlock it in Foundry first."
        );
    }

    #[tokio::test]
    async fn test_update_entry_success_and_missing_document() {
        let mut host = MockHostApi::new();
        host.expect_get_pack().returning(|_| Ok(Some(pack(false))));
        host.expect_update_compendium_entry()
            .withf(|pack_id, _, updates| pack_id == "world.monsters" && updates["name"] == "Boss")
            .times(2)
            .returning(|_, entry_id, _| Ok((entry_id == "gob").then(|| "Boss".to_string())));
        let handlers = handlers(host);

        let result = handlers
            .update_compendium_entry(
                &gm(),
                &payload(json!({
                    "packId": "world.monsters",
                    "itemId": "gob",
                    "updates": {"name": "Boss"}
                })),
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"success": true, "id": "gob", "name": "Boss"}));

        let err = handlers
            .update_compendium_entry(
                &gm(),
                &payload(json!({
                    "packId": "world.monsters",
                    "itemId": "gone",
                    "updates": {"name": "Boss"}
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to update compendium entry: Document not found: gone in world.monsters"
        );
    }
}
