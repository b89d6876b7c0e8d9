//! Actor lookups and item usage.

use serde_json::json;

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};
use crate::host::{CharacterItemSearch, LookupRequest, UseItemRequest};
use crate::queries::{Payload, QueryHandlers};

impl QueryHandlers {
    pub(crate) async fn get_character_info(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "get character info", async {
            self.host.ensure_ready()?;
            let identifier = payload
                .str("characterName")
                .or_else(|| payload.str("characterId"))
                .ok_or_else(|| QueryError::validation("characterName or characterId is required"))?;

            Ok(self.host.get_character_info(identifier.to_string()).await?)
        })
        .await
    }

    pub(crate) async fn list_actors(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "list actors", async {
            self.host.ensure_ready()?;
            let mut actors = self.host.list_actors().await?;
            if let Some(actor_type) = payload.str("type") {
                actors.retain(|actor| actor.actor_type.as_deref() == Some(actor_type));
            }
            Ok(json!(actors))
        })
        .await
    }

    pub(crate) async fn find_actor(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "find actor", async {
            self.host.ensure_ready()?;
            let identifier = payload.required("identifier")?;

            let request = LookupRequest {
                identifier,
                extra: payload.extras(&["identifier"]),
            };
            Ok(self.host.find_actor(request).await?)
        })
        .await
    }

    pub(crate) async fn search_character_items(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "search character items", async {
            self.host.ensure_ready()?;
            let character_identifier = payload.required("characterIdentifier")?;

            let request = CharacterItemSearch {
                character_identifier,
                query: payload.str("query").map(str::to_string),
                item_type: payload.str("type").map(str::to_string),
                category: payload.str("category").map(str::to_string),
                limit: payload.number("limit").map(|n| n as u64),
            };
            Ok(self.host.search_character_items(request).await?)
        })
        .await
    }

    pub(crate) async fn use_item(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "use item", async {
            self.host.ensure_ready()?;
            let actor_identifier = payload.required("actorIdentifier")?;
            let item_identifier = payload.required("itemIdentifier")?;

            let request = UseItemRequest {
                actor_identifier,
                item_identifier,
                targets: payload.strings("targets"),
                options: payload.object("options").cloned(),
            };
            Ok(self.host.use_item(request).await?)
        })
        .await
    }
}
