//! Host facade backed by the connected Foundry module.
//!
//! Each facade call becomes a `host_call` message to the active host session.
//! The matching `host_result` completes the call through a oneshot channel
//! keyed by request id.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::Display;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{HostError, HostResult};
use crate::websocket::{ServerMessage, WebSocketManager};

use super::*;

/// Operation names understood by the Foundry module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "camelCase")]
pub enum HostOp {
    GetCharacterInfo,
    ListActors,
    FindActor,
    SearchCharacterItems,
    UseItem,
    SearchCompendium,
    ListCreaturesByCriteria,
    GetAvailablePacks,
    ListCompendiumEntries,
    GetCompendiumDocumentFull,
    GetEnhancedCreatureIndex,
    CreateActorFromCompendium,
    GetPack,
    UpdateCompendiumEntry,
    GetActiveScene,
    ListScenes,
    SwitchScene,
    AddActorsToScene,
    SceneExists,
    ImageSize,
    CreateScene,
    CreateSceneThumbnail,
    CreateEmbedded,
    PrototypeToken,
    GetWorldInfo,
    ValidateWritePermissions,
    CreateJournalEntry,
    ListJournals,
    GetJournalContent,
    UpdateJournalContent,
    CreateJournal,
    CreateRollTable,
    RequestPlayerRolls,
    SetActorOwnership,
    GetActorOwnership,
    GetFriendlyNpcs,
    GetPartyCharacters,
    GetConnectedPlayers,
    FindPlayers,
    MoveToken,
    UpdateToken,
    DeleteTokens,
    GetTokenDetails,
    ToggleTokenCondition,
    GetAvailableConditions,
    GenerateMap,
    CheckMapStatus,
    CancelMapJob,
    CreateDocument,
    BatchCreateDocuments,
    UpdateDocument,
    DeleteDocument,
    BrowseFiles,
    CreateDirectory,
    UploadFile,
    CreateFolder,
    ListFolders,
    DeleteFolder,
    UpdateFolder,
    ExportFolderToCompendium,
}

/// Reply from the host: the result value or the host's error message
pub type HostReply = Result<Value, String>;

struct PendingCall {
    session_id: String,
    tx: oneshot::Sender<HostReply>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct UploadedFile {
    path: String,
}

/// [`HostApi`] implementation that forwards to the Foundry module
pub struct RemoteHost {
    sessions: Arc<WebSocketManager>,
    pending: DashMap<String, PendingCall>,
    timeout: Option<Duration>,
}

impl RemoteHost {
    /// `timeout` of None waits for the host indefinitely
    pub fn new(sessions: Arc<WebSocketManager>, timeout: Option<Duration>) -> Self {
        Self {
            sessions,
            pending: DashMap::new(),
            timeout,
        }
    }

    /// Send one call to the active session and wait for its reply
    pub async fn call(&self, op: HostOp, args: Value) -> HostResult<Value> {
        let session = self.sessions.active_session().ok_or(HostError::NoSession)?;
        let operation = op.to_string();
        let request_id = Uuid::new_v4().to_string();

        debug!(
            request_id = %request_id,
            operation = %operation,
            session_id = %session.session_id,
            "Routing host call to Foundry session"
        );

        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            request_id.clone(),
            PendingCall {
                session_id: session.session_id.clone(),
                tx,
            },
        );

        let sent = self.sessions.send_to(
            &session.session_id,
            ServerMessage::HostCall {
                request_id: request_id.clone(),
                operation: operation.clone(),
                args,
            },
        );
        if !sent {
            self.pending.remove(&request_id);
            return Err(HostError::Disconnected { operation });
        }

        let reply = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    warn!(request_id = %request_id, operation = %operation, "Host call timed out");
                    self.pending.remove(&request_id);
                    return Err(HostError::Timeout { operation });
                }
            },
            None => rx.await,
        };

        match reply {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => {
                debug!(request_id = %request_id, operation = %operation, error = %message, "Host rejected call");
                Err(HostError::Rejected { message })
            }
            Err(_) => {
                warn!(request_id = %request_id, operation = %operation, "Host call channel closed");
                self.pending.remove(&request_id);
                Err(HostError::Disconnected { operation })
            }
        }
    }

    async fn call_as<T: DeserializeOwned>(&self, op: HostOp, args: Value) -> HostResult<T> {
        let value = self.call(op, args).await?;
        serde_json::from_value(value).map_err(|e| HostError::InvalidResponse {
            operation: op.to_string(),
            message: e.to_string(),
        })
    }

    fn encode(op: HostOp, args: &impl Serialize) -> HostResult<Value> {
        serde_json::to_value(args).map_err(|e| HostError::Encode {
            operation: op.to_string(),
            message: e.to_string(),
        })
    }

    async fn send<T: Serialize + Sync>(&self, op: HostOp, args: &T) -> HostResult<Value> {
        let args = Self::encode(op, args)?;
        self.call(op, args).await
    }

    /// Complete a pending call with the host's reply
    pub fn resolve(&self, request_id: &str, reply: HostReply) {
        if let Some((_, pending)) = self.pending.remove(request_id) {
            if pending.tx.send(reply).is_err() {
                debug!(request_id = %request_id, "Host result channel closed - caller likely timed out");
            }
        } else {
            warn!(request_id = %request_id, "No pending host call for result");
        }
    }

    /// Drop every call waiting on a session; their callers see a disconnect.
    /// Returns how many calls were abandoned.
    pub fn abandon_session(&self, session_id: &str) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, pending| pending.session_id != session_id);
        before.saturating_sub(self.pending.len())
    }

    /// Number of calls waiting for a host reply
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl HostApi for RemoteHost {
    fn ensure_ready(&self) -> HostResult<()> {
        match self.sessions.active_session() {
            Some(_) => Ok(()),
            None => Err(HostError::NoSession),
        }
    }

    fn world(&self) -> HostWorld {
        self.sessions
            .active_session()
            .map(|session| session.world)
            .unwrap_or_default()
    }

    async fn get_character_info(&self, identifier: String) -> HostResult<Value> {
        self.call(HostOp::GetCharacterInfo, json!({ "identifier": identifier }))
            .await
    }

    async fn list_actors(&self) -> HostResult<Vec<ActorSummary>> {
        self.call_as(HostOp::ListActors, Value::Null).await
    }

    async fn find_actor(&self, request: LookupRequest) -> HostResult<Value> {
        self.send(HostOp::FindActor, &request).await
    }

    async fn search_character_items(&self, request: CharacterItemSearch) -> HostResult<Value> {
        self.send(HostOp::SearchCharacterItems, &request).await
    }

    async fn use_item(&self, request: UseItemRequest) -> HostResult<Value> {
        self.send(HostOp::UseItem, &request).await
    }

    async fn search_compendium(&self, request: CompendiumSearch) -> HostResult<Value> {
        self.send(HostOp::SearchCompendium, &request).await
    }

    async fn list_creatures_by_criteria(&self, criteria: Value) -> HostResult<Value> {
        self.call(HostOp::ListCreaturesByCriteria, criteria).await
    }

    async fn get_available_packs(&self) -> HostResult<Value> {
        self.call(HostOp::GetAvailablePacks, Value::Null).await
    }

    async fn list_compendium_entries(
        &self,
        pack_id: String,
        entry_type: Option<String>,
    ) -> HostResult<Value> {
        self.call(
            HostOp::ListCompendiumEntries,
            json!({ "packId": pack_id, "type": entry_type }),
        )
        .await
    }

    async fn get_compendium_document_full(
        &self,
        pack_id: String,
        document_id: String,
    ) -> HostResult<Value> {
        self.call(
            HostOp::GetCompendiumDocumentFull,
            json!({ "packId": pack_id, "documentId": document_id }),
        )
        .await
    }

    async fn get_enhanced_creature_index(&self) -> HostResult<Value> {
        self.call(HostOp::GetEnhancedCreatureIndex, Value::Null).await
    }

    async fn create_actor_from_compendium(
        &self,
        request: CompendiumActorRequest,
    ) -> HostResult<Value> {
        self.send(HostOp::CreateActorFromCompendium, &request).await
    }

    async fn get_pack(&self, pack_id: String) -> HostResult<Option<PackInfo>> {
        self.call_as(HostOp::GetPack, json!({ "packId": pack_id }))
            .await
    }

    async fn update_compendium_entry(
        &self,
        pack_id: String,
        entry_id: String,
        updates: Value,
    ) -> HostResult<Option<String>> {
        let updated: Option<Named> = self
            .call_as(
                HostOp::UpdateCompendiumEntry,
                json!({ "packId": pack_id, "entryId": entry_id, "updates": updates }),
            )
            .await?;
        Ok(updated.map(|entry| entry.name))
    }

    async fn get_active_scene(&self) -> HostResult<Value> {
        self.call(HostOp::GetActiveScene, Value::Null).await
    }

    async fn list_scenes(&self, filters: Value) -> HostResult<Value> {
        self.call(HostOp::ListScenes, filters).await
    }

    async fn switch_scene(&self, request: SwitchSceneRequest) -> HostResult<Value> {
        self.send(HostOp::SwitchScene, &request).await
    }

    async fn add_actors_to_scene(&self, request: AddActorsRequest) -> HostResult<Value> {
        self.send(HostOp::AddActorsToScene, &request).await
    }

    async fn scene_exists(&self, scene_id: String) -> HostResult<bool> {
        self.call_as(HostOp::SceneExists, json!({ "sceneId": scene_id }))
            .await
    }

    async fn image_size(&self, src: String) -> HostResult<ImageSize> {
        self.call_as(HostOp::ImageSize, json!({ "src": src })).await
    }

    async fn create_scene(&self, scene: Value) -> HostResult<CreatedScene> {
        self.call_as(HostOp::CreateScene, scene).await
    }

    async fn create_scene_thumbnail(&self, scene_id: String) -> HostResult<()> {
        self.call(HostOp::CreateSceneThumbnail, json!({ "sceneId": scene_id }))
            .await
            .map(|_| ())
    }

    async fn create_embedded(
        &self,
        scene_id: String,
        kind: EmbeddedKind,
        documents: Vec<Value>,
    ) -> HostResult<Vec<String>> {
        self.call_as(
            HostOp::CreateEmbedded,
            json!({ "sceneId": scene_id, "kind": kind, "documents": documents }),
        )
        .await
    }

    async fn prototype_token(&self, actor_id: String) -> HostResult<Option<Value>> {
        self.call_as(HostOp::PrototypeToken, json!({ "actorId": actor_id }))
            .await
    }

    async fn get_world_info(&self) -> HostResult<Value> {
        self.call(HostOp::GetWorldInfo, Value::Null).await
    }

    async fn validate_write_permissions(&self, operation: String) -> HostResult<Value> {
        self.call(
            HostOp::ValidateWritePermissions,
            json!({ "operation": operation }),
        )
        .await
    }

    async fn create_journal_entry(&self, name: String, content: String) -> HostResult<Value> {
        self.call(
            HostOp::CreateJournalEntry,
            json!({ "name": name, "content": content }),
        )
        .await
    }

    async fn list_journals(&self) -> HostResult<Value> {
        self.call(HostOp::ListJournals, Value::Null).await
    }

    async fn get_journal_content(&self, journal_id: String) -> HostResult<Value> {
        self.call(HostOp::GetJournalContent, json!({ "journalId": journal_id }))
            .await
    }

    async fn update_journal_content(
        &self,
        journal_id: String,
        content: String,
    ) -> HostResult<Value> {
        self.call(
            HostOp::UpdateJournalContent,
            json!({ "journalId": journal_id, "content": content }),
        )
        .await
    }

    async fn create_journal(&self, journal: JournalData) -> HostResult<CreatedJournal> {
        let args = Self::encode(HostOp::CreateJournal, &journal)?;
        self.call_as(HostOp::CreateJournal, args).await
    }

    async fn create_roll_table(&self, table: RollTableData) -> HostResult<CreatedRollTable> {
        let args = Self::encode(HostOp::CreateRollTable, &table)?;
        self.call_as(HostOp::CreateRollTable, args).await
    }

    async fn request_player_rolls(&self, request: PlayerRollRequest) -> HostResult<Value> {
        self.send(HostOp::RequestPlayerRolls, &request).await
    }

    async fn set_actor_ownership(&self, request: OwnershipRequest) -> HostResult<Value> {
        self.send(HostOp::SetActorOwnership, &request).await
    }

    async fn get_actor_ownership(&self, request: Value) -> HostResult<Value> {
        self.call(HostOp::GetActorOwnership, request).await
    }

    async fn get_friendly_npcs(&self) -> HostResult<Value> {
        self.call(HostOp::GetFriendlyNpcs, Value::Null).await
    }

    async fn get_party_characters(&self) -> HostResult<Value> {
        self.call(HostOp::GetPartyCharacters, Value::Null).await
    }

    async fn get_connected_players(&self) -> HostResult<Value> {
        self.call(HostOp::GetConnectedPlayers, Value::Null).await
    }

    async fn find_players(&self, request: LookupRequest) -> HostResult<Value> {
        self.send(HostOp::FindPlayers, &request).await
    }

    async fn move_token(&self, request: MoveTokenRequest) -> HostResult<Value> {
        self.send(HostOp::MoveToken, &request).await
    }

    async fn update_token(&self, request: UpdateTokenRequest) -> HostResult<Value> {
        self.send(HostOp::UpdateToken, &request).await
    }

    async fn delete_tokens(&self, token_ids: Vec<String>) -> HostResult<Value> {
        self.call(HostOp::DeleteTokens, json!({ "tokenIds": token_ids }))
            .await
    }

    async fn get_token_details(&self, token_id: String) -> HostResult<Value> {
        self.call(HostOp::GetTokenDetails, json!({ "tokenId": token_id }))
            .await
    }

    async fn toggle_token_condition(&self, request: TokenConditionRequest) -> HostResult<Value> {
        self.send(HostOp::ToggleTokenCondition, &request).await
    }

    async fn get_available_conditions(&self) -> HostResult<Value> {
        self.call(HostOp::GetAvailableConditions, Value::Null).await
    }

    async fn generate_map(&self, request: MapGenerationRequest) -> HostResult<Value> {
        self.send(HostOp::GenerateMap, &request).await
    }

    async fn check_map_status(&self, job_id: String) -> HostResult<Value> {
        self.call(HostOp::CheckMapStatus, json!({ "job_id": job_id }))
            .await
    }

    async fn cancel_map_job(&self, job_id: String) -> HostResult<Value> {
        self.call(HostOp::CancelMapJob, json!({ "job_id": job_id }))
            .await
    }

    async fn create_document(&self, request: CreateDocumentRequest) -> HostResult<Value> {
        self.send(HostOp::CreateDocument, &request).await
    }

    async fn batch_create_documents(&self, request: BatchCreateRequest) -> HostResult<Value> {
        self.send(HostOp::BatchCreateDocuments, &request).await
    }

    async fn update_document(&self, request: UpdateDocumentRequest) -> HostResult<Value> {
        self.send(HostOp::UpdateDocument, &request).await
    }

    async fn delete_document(
        &self,
        document_type: DocumentType,
        document_id: String,
    ) -> HostResult<Value> {
        self.call(
            HostOp::DeleteDocument,
            json!({ "documentType": document_type, "documentId": document_id }),
        )
        .await
    }

    async fn browse_files(&self, request: BrowseRequest) -> HostResult<BrowseResult> {
        let args = Self::encode(HostOp::BrowseFiles, &request)?;
        self.call_as(HostOp::BrowseFiles, args).await
    }

    async fn create_directory(&self, source: String, path: String) -> HostResult<()> {
        self.call(
            HostOp::CreateDirectory,
            json!({ "source": source, "path": path }),
        )
        .await
        .map(|_| ())
    }

    async fn upload_file(&self, upload: FileUpload) -> HostResult<String> {
        let args = Self::encode(HostOp::UploadFile, &upload)?;
        let uploaded: UploadedFile = self.call_as(HostOp::UploadFile, args).await?;
        Ok(uploaded.path)
    }

    async fn create_folder(&self, folder: NewFolder) -> HostResult<FolderInfo> {
        let args = Self::encode(HostOp::CreateFolder, &folder)?;
        self.call_as(HostOp::CreateFolder, args).await
    }

    async fn list_folders(&self) -> HostResult<Vec<FolderInfo>> {
        self.call_as(HostOp::ListFolders, Value::Null).await
    }

    async fn delete_folder(
        &self,
        folder_id: String,
        delete_contents: bool,
    ) -> HostResult<Option<String>> {
        let deleted: Option<Named> = self
            .call_as(
                HostOp::DeleteFolder,
                json!({ "folderId": folder_id, "deleteContents": delete_contents }),
            )
            .await?;
        Ok(deleted.map(|folder| folder.name))
    }

    async fn update_folder(
        &self,
        folder_id: String,
        update: FolderUpdate,
    ) -> HostResult<Option<FolderInfo>> {
        let update = Self::encode(HostOp::UpdateFolder, &update)?;
        self.call_as(
            HostOp::UpdateFolder,
            json!({ "folderId": folder_id, "updates": update }),
        )
        .await
    }

    async fn export_folder_to_compendium(
        &self,
        request: FolderExportRequest,
    ) -> HostResult<Value> {
        self.send(HostOp::ExportFolderToCompendium, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::UserRole;
    use crate::websocket::manager::HostIdentity;
    use tokio::sync::mpsc;

    fn connected(
        manager: &WebSocketManager,
        session_id: &str,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        manager.add_connection(session_id.to_string(), tx);
        manager.authenticate(
            session_id,
            HostIdentity {
                user_id: "gm".to_string(),
                user_name: "Game Master".to_string(),
                role: UserRole::Gamemaster,
                world: HostWorld {
                    world_id: Some("world".to_string()),
                    foundry_version: Some("13.345".to_string()),
                },
            },
        );
        rx
    }

    async fn next_call(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> (String, String, Value) {
        match rx.recv().await {
            Some(ServerMessage::HostCall {
                request_id,
                operation,
                args,
            }) => (request_id, operation, args),
            other => panic!("Expected host call, got {other:?}"),
        }
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(HostOp::GetCharacterInfo.to_string(), "getCharacterInfo");
        assert_eq!(HostOp::GetFriendlyNpcs.to_string(), "getFriendlyNpcs");
        assert_eq!(
            HostOp::ExportFolderToCompendium.to_string(),
            "exportFolderToCompendium"
        );
    }

    #[tokio::test]
    async fn test_no_session() {
        let host = RemoteHost::new(Arc::new(WebSocketManager::new()), None);
        assert!(matches!(host.ensure_ready(), Err(HostError::NoSession)));
        assert_eq!(host.world(), HostWorld::default());
        let result = host.get_world_info().await;
        assert!(matches!(result, Err(HostError::NoSession)));
    }

    #[tokio::test]
    async fn test_call_resolves_with_host_result() {
        let manager = Arc::new(WebSocketManager::new());
        let mut rx = connected(&manager, "s1");
        let host = Arc::new(RemoteHost::new(manager, None));
        assert!(host.ensure_ready().is_ok());
        assert_eq!(host.world().world_id.as_deref(), Some("world"));

        let caller = host.clone();
        let call = tokio::spawn(async move { caller.get_token_details("t1".to_string()).await });

        let (request_id, operation, args) = next_call(&mut rx).await;
        assert_eq!(operation, "getTokenDetails");
        assert_eq!(args, json!({ "tokenId": "t1" }));
        host.resolve(&request_id, Ok(json!({ "id": "t1", "name": "Goblin" })));

        let result = call.await.unwrap().unwrap();
        assert_eq!(result["name"], "Goblin");
        assert_eq!(host.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_host_error_is_passed_through() {
        let manager = Arc::new(WebSocketManager::new());
        let mut rx = connected(&manager, "s1");
        let host = Arc::new(RemoteHost::new(manager, None));

        let caller = host.clone();
        let call = tokio::spawn(async move { caller.delete_tokens(vec!["t1".to_string()]).await });

        let (request_id, _, _) = next_call(&mut rx).await;
        host.resolve(&request_id, Err("Token not found: t1".to_string()));

        let err = call.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Token not found: t1");
    }

    #[tokio::test]
    async fn test_abandoned_session_fails_pending_calls() {
        let manager = Arc::new(WebSocketManager::new());
        let mut rx = connected(&manager, "s1");
        let host = Arc::new(RemoteHost::new(manager, None));

        let caller = host.clone();
        let call = tokio::spawn(async move { caller.list_journals().await });

        let _ = next_call(&mut rx).await;
        assert_eq!(host.abandon_session("other"), 0);
        assert_eq!(host.abandon_session("s1"), 1);

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, HostError::Disconnected { operation } if operation == "listJournals"));
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let manager = Arc::new(WebSocketManager::new());
        let _rx = connected(&manager, "s1");
        let host = RemoteHost::new(manager, Some(Duration::from_millis(20)));

        let err = host.get_available_packs().await.unwrap_err();
        assert!(matches!(err, HostError::Timeout { .. }));
        assert_eq!(host.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_typed_reply_decoding() {
        let manager = Arc::new(WebSocketManager::new());
        let mut rx = connected(&manager, "s1");
        let host = Arc::new(RemoteHost::new(manager, None));

        let caller = host.clone();
        let call = tokio::spawn(async move { caller.delete_folder("f1".to_string(), true).await });
        let (request_id, _, args) = next_call(&mut rx).await;
        assert_eq!(args, json!({ "folderId": "f1", "deleteContents": true }));
        host.resolve(&request_id, Ok(Value::Null));
        assert_eq!(call.await.unwrap().unwrap(), None);

        let caller = host.clone();
        let call = tokio::spawn(async move { caller.scene_exists("s".to_string()).await });
        let (request_id, _, _) = next_call(&mut rx).await;
        host.resolve(&request_id, Ok(json!("yes")));
        assert!(matches!(
            call.await.unwrap(),
            Err(HostError::InvalidResponse { .. })
        ));
    }
}
