//! Token manipulation on the active scene.

use serde_json::Value;

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};
use crate::host::{MoveTokenRequest, TokenConditionRequest, UpdateTokenRequest};
use crate::queries::{Payload, QueryHandlers};

impl QueryHandlers {
    pub(crate) async fn move_token(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "move token", async {
            self.host.ensure_ready()?;
            let token_id = payload.required("tokenId")?;
            let (Some(x), Some(y)) = (payload.number("x"), payload.number("y")) else {
                return Err(QueryError::validation(
                    "x and y coordinates are required and must be numbers",
                ));
            };

            let request = MoveTokenRequest {
                token_id,
                x,
                y,
                extra: payload.extras(&["tokenId", "x", "y"]),
            };
            Ok(self.host.move_token(request).await?)
        })
        .await
    }

    pub(crate) async fn update_token(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "update token", async {
            self.host.ensure_ready()?;
            let token_id = payload.required("tokenId")?;
            let updates = payload
                .get("updates")
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| QueryError::validation("updates object is required"))?;

            Ok(self
                .host
                .update_token(UpdateTokenRequest { token_id, updates })
                .await?)
        })
        .await
    }

    pub(crate) async fn delete_tokens(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "delete tokens", async {
            self.host.ensure_ready()?;
            if payload.non_empty_array("tokenIds").is_none() {
                return Err(QueryError::validation(
                    "tokenIds array is required and must not be empty",
                ));
            }
            let token_ids = payload.strings("tokenIds").unwrap_or_default();
            Ok(self.host.delete_tokens(token_ids).await?)
        })
        .await
    }

    pub(crate) async fn get_token_details(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "get token details", async {
            self.host.ensure_ready()?;
            let token_id = payload.required("tokenId")?;
            Ok(self.host.get_token_details(token_id).await?)
        })
        .await
    }

    pub(crate) async fn toggle_token_condition(
        &self,
        caller: &Caller,
        payload: &Payload,
    ) -> QueryResult {
        self.guarded(caller, "toggle token condition", async {
            self.host.ensure_ready()?;
            let token_id = payload.required("tokenId")?;
            let condition_id = payload.required("conditionId")?;
            let active = payload
                .flag("active")
                .ok_or_else(|| QueryError::validation("active must be a boolean"))?;

            let request = TokenConditionRequest {
                token_id,
                condition_id,
                active,
            };
            Ok(self.host.toggle_token_condition(request).await?)
        })
        .await
    }

    pub(crate) async fn get_available_conditions(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "get available conditions", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_available_conditions().await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::HostError;
    use crate::host::TokenConditionRequest;
    use crate::queries::handlers::test_support::*;
    use mockall::predicate::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_move_token_requires_numeric_coordinates() {
        let mut host = ready_host();
        host.expect_move_token().never();
        let handlers = handlers(host);

        let err = handlers
            .move_token(&gm(), &payload(json!({"x": 1, "y": 2})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to move token: tokenId is required");

        let err = handlers
            .move_token(&gm(), &payload(json!({"tokenId": "t1", "x": "10", "y": 2})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to move token: x and y coordinates are required and must be numbers"
        );
    }

    #[tokio::test]
    async fn test_move_token_allows_zero_coordinates() {
        let mut host = ready_host();
        host.expect_move_token()
            .withf(|r| {
                r.token_id == "t1" && r.x == 0.0 && r.y == 150.0 && r.extra.get("animate") == Some(&json!(true))
            })
            .times(1)
            .returning(|_| Ok(json!({"success": true})));

        let result = handlers(host)
            .move_token(
                &gm(),
                &payload(json!({"tokenId": "t1", "x": 0, "y": 150, "animate": true})),
            )
            .await
            .unwrap();
        assert_eq!(result["success"], true);
    }

    #[tokio::test]
    async fn test_update_token_requires_object() {
        let mut host = ready_host();
        host.expect_update_token().never();

        let err = handlers(host)
            .update_token(&gm(), &payload(json!({"tokenId": "t1", "updates": "hidden"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to update token: updates object is required");
    }

    #[tokio::test]
    async fn test_delete_tokens_requires_ids() {
        let mut host = ready_host();
        host.expect_delete_tokens()
            .with(eq(vec!["t1".to_string(), "t2".to_string()]))
            .times(1)
            .returning(|ids| Ok(json!({"deletedCount": ids.len()})));
        let handlers = handlers(host);

        let err = handlers
            .delete_tokens(&gm(), &payload(json!({"tokenIds": []})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to delete tokens: tokenIds array is required and must not be empty"
        );

        let result = handlers
            .delete_tokens(&gm(), &payload(json!({"tokenIds": ["t1", "t2"]})))
            .await
            .unwrap();
        assert_eq!(result, json!({"deletedCount": 2}));
    }

    #[tokio::test]
    async fn test_toggle_condition_validation_order() {
        let mut host = ready_host();
        host.expect_toggle_token_condition()
            .with(eq(TokenConditionRequest {
                token_id: "t1".to_string(),
                condition_id: "prone".to_string(),
                active: false,
            }))
            .times(1)
            .returning(|_| Ok(json!({"active": false})));
        let handlers = handlers(host);

        let err = handlers
            .toggle_token_condition(&gm(), &payload(json!({"tokenId": "t1", "active": true})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to toggle token condition: conditionId is required"
        );

        let err = handlers
            .toggle_token_condition(
                &gm(),
                &payload(json!({"tokenId": "t1", "conditionId": "prone", "active": "yes"})),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to toggle token condition: active must be a boolean"
        );

        let result = handlers
            .toggle_token_condition(
                &gm(),
                &payload(json!({"tokenId": "t1", "conditionId": "prone", "active": false})),
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"active": false}));
    }

    #[tokio::test]
    async fn test_token_details_missing_token() {
        let mut host = ready_host();
        host.expect_get_token_details()
            .returning(|id| Err(HostError::rejected(format!("Token {id} not found"))));

        let err = handlers(host)
            .get_token_details(&gm(), &payload(json!({"tokenId": "zz"})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to get token details: Token zz not found"
        );
    }
}
