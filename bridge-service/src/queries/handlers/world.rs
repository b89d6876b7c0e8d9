//! World metadata, the liveness ping and write-permission checks.

use serde_json::{Value, json};

use crate::access::Caller;
use crate::error::QueryResult;
use crate::queries::{Payload, QueryHandlers};

impl QueryHandlers {
    pub(crate) async fn get_world_info(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "get world info", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_world_info().await?)
        })
        .await
    }

    /// Liveness probe. Open to every caller and never touches the host.
    pub(crate) fn ping(&self, caller: &Caller) -> Value {
        let world = self.host.world();
        json!({
            "status": "ok",
            "timestamp": chrono::Utc::now().timestamp_millis(),
            "module": self.settings.module_id,
            "foundryVersion": world.foundry_version,
            "worldId": world.world_id,
            "userId": caller.user_id,
        })
    }

    pub(crate) async fn validate_write_permissions(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "validate write permissions", async {
            self.host.ensure_ready()?;
            let operation = payload.required("operation")?;
            Ok(self.host.validate_write_permissions(operation).await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::access::Caller;
    use crate::host::{HostWorld, MockHostApi};
    use crate::queries::QueryName;
    use crate::queries::handlers::test_support::*;
    use serde_json::json;

    fn host_in_world() -> MockHostApi {
        let mut host = MockHostApi::new();
        host.expect_world().returning(|| HostWorld {
            world_id: Some("lost-mines".to_string()),
            foundry_version: Some("12.331".to_string()),
        });
        host
    }

    #[tokio::test]
    async fn test_ping_reports_session() {
        let result = handlers(host_in_world())
            .handle(QueryName::Ping, &gm(), payload(json!({})))
            .await
            .unwrap();

        assert_eq!(result["status"], "ok");
        assert_eq!(result["module"], "foundry-mcp-bridge");
        assert_eq!(result["worldId"], "lost-mines");
        assert_eq!(result["foundryVersion"], "12.331");
        assert_eq!(result["userId"], "gm-user");
        assert!(result["timestamp"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_ping_is_open_to_everyone() {
        let result = handlers(host_in_world())
            .handle(QueryName::Ping, &Caller::anonymous(), payload(json!(null)))
            .await
            .unwrap();
        assert_eq!(result["status"], "ok");
        assert!(result["userId"].is_null());

        let result = handlers(host_in_world())
            .handle(QueryName::Ping, &player(), payload(json!({})))
            .await
            .unwrap();
        assert_eq!(result["userId"], "player-user");
    }

    #[tokio::test]
    async fn test_validate_write_permissions_requires_operation() {
        let mut host = ready_host();
        host.expect_validate_write_permissions().never();

        let err = handlers(host)
            .validate_write_permissions(&gm(), &payload(json!({})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to validate write permissions: operation is required"
        );
    }

    #[tokio::test]
    async fn test_world_info_passes_through() {
        let mut host = ready_host();
        host.expect_get_world_info()
            .times(1)
            .returning(|| Ok(json!({"id": "lost-mines", "system": "dnd5e"})));

        let result = handlers(host).get_world_info(&gm()).await.unwrap();
        assert_eq!(result["system"], "dnd5e");
    }
}
