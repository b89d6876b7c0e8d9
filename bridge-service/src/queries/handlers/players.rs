//! Player rolls, campaign progress, ownership and player lookups.

use serde_json::{Value, json};

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};
use crate::host::{LookupRequest, OwnershipRequest, PlayerRollRequest};
use crate::queries::{Payload, QueryHandlers};

impl QueryHandlers {
    pub(crate) async fn request_player_rolls(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "request player rolls", async {
            self.host.ensure_ready()?;
            let (Some(roll_type), Some(roll_target), Some(target_player)) = (
                payload.str("rollType"),
                payload.str("rollTarget"),
                payload.str("targetPlayer"),
            ) else {
                return Err(QueryError::validation(
                    "rollType, rollTarget, and targetPlayer are required",
                ));
            };

            let request = PlayerRollRequest {
                roll_type: roll_type.to_string(),
                roll_target: roll_target.to_string(),
                target_player: target_player.to_string(),
                extra: payload.extras(&["rollType", "rollTarget", "targetPlayer"]),
            };
            Ok(self.host.request_player_rolls(request).await?)
        })
        .await
    }

    /// Acknowledges a progress change. Campaign state lives with the caller,
    /// so nothing is written to the host.
    pub(crate) async fn update_campaign_progress(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "update campaign progress", async {
            self.host.ensure_ready()?;
            let part_id = payload.get("partId").cloned().unwrap_or(Value::Null);
            let new_status = payload.get("newStatus").cloned().unwrap_or(Value::Null);

            Ok(json!({
                "success": true,
                "message": format!(
                    "Campaign progress updated: {} is now {}",
                    display(&part_id),
                    display(&new_status)
                ),
                "campaignId": payload.get("campaignId"),
                "partId": part_id,
                "newStatus": new_status,
            }))
        })
        .await
    }

    pub(crate) async fn set_actor_ownership(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "set actor ownership", async {
            self.host.ensure_ready()?;
            let (Some(actor_id), Some(user_id), Some(permission)) = (
                payload.str("actorId"),
                payload.str("userId"),
                payload.get("permission"),
            ) else {
                return Err(QueryError::validation(
                    "actorId, userId, and permission are required",
                ));
            };

            let request = OwnershipRequest {
                actor_id: actor_id.to_string(),
                user_id: user_id.to_string(),
                permission: permission.clone(),
                extra: payload.extras(&["actorId", "userId", "permission"]),
            };
            Ok(self.host.set_actor_ownership(request).await?)
        })
        .await
    }

    pub(crate) async fn get_actor_ownership(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "get actor ownership", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_actor_ownership(payload.to_value()).await?)
        })
        .await
    }

    pub(crate) async fn get_friendly_npcs(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "get friendly NPCs", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_friendly_npcs().await?)
        })
        .await
    }

    pub(crate) async fn get_party_characters(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "get party characters", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_party_characters().await?)
        })
        .await
    }

    pub(crate) async fn get_connected_players(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "get connected players", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_connected_players().await?)
        })
        .await
    }

    pub(crate) async fn find_players(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "find players", async {
            self.host.ensure_ready()?;
            let identifier = payload.required("identifier")?;

            let request = LookupRequest {
                identifier,
                extra: payload.extras(&["identifier"]),
            };
            Ok(self.host.find_players(request).await?)
        })
        .await
    }
}

/// Template rendering of a JSON value; missing fields read "undefined"
fn display(value: &Value) -> String {
    match value {
        Value::Null => "undefined".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
