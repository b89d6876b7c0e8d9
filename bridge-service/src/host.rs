//! Data access facade over the Foundry VTT host.
//!
//! Query handlers never touch the host directly; every read and write goes
//! through [`HostApi`]. The production implementation is [`RemoteHost`],
//! which forwards each call to the connected Foundry module over WebSocket.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HostResult;

pub mod remote;
pub mod requests;

pub use remote::RemoteHost;
pub use requests::*;

/// One method per semantic host operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Fails when the host cannot serve requests right now
    fn ensure_ready(&self) -> HostResult<()>;

    /// World and version info of the host session
    fn world(&self) -> HostWorld;

    // Actors
    async fn get_character_info(&self, identifier: String) -> HostResult<Value>;
    async fn list_actors(&self) -> HostResult<Vec<ActorSummary>>;
    async fn find_actor(&self, request: LookupRequest) -> HostResult<Value>;
    async fn search_character_items(&self, request: CharacterItemSearch) -> HostResult<Value>;
    async fn use_item(&self, request: UseItemRequest) -> HostResult<Value>;

    // Compendium
    async fn search_compendium(&self, request: CompendiumSearch) -> HostResult<Value>;
    async fn list_creatures_by_criteria(&self, criteria: Value) -> HostResult<Value>;
    async fn get_available_packs(&self) -> HostResult<Value>;
    async fn list_compendium_entries(
        &self,
        pack_id: String,
        entry_type: Option<String>,
    ) -> HostResult<Value>;
    async fn get_compendium_document_full(
        &self,
        pack_id: String,
        document_id: String,
    ) -> HostResult<Value>;
    async fn get_enhanced_creature_index(&self) -> HostResult<Value>;
    async fn create_actor_from_compendium(
        &self,
        request: CompendiumActorRequest,
    ) -> HostResult<Value>;
    async fn get_pack(&self, pack_id: String) -> HostResult<Option<PackInfo>>;
    /// Returns the entry name, or `None` when the entry does not exist
    async fn update_compendium_entry(
        &self,
        pack_id: String,
        entry_id: String,
        updates: Value,
    ) -> HostResult<Option<String>>;

    // Scenes
    async fn get_active_scene(&self) -> HostResult<Value>;
    async fn list_scenes(&self, filters: Value) -> HostResult<Value>;
    async fn switch_scene(&self, request: SwitchSceneRequest) -> HostResult<Value>;
    async fn add_actors_to_scene(&self, request: AddActorsRequest) -> HostResult<Value>;
    async fn scene_exists(&self, scene_id: String) -> HostResult<bool>;
    async fn image_size(&self, src: String) -> HostResult<ImageSize>;
    async fn create_scene(&self, scene: Value) -> HostResult<CreatedScene>;
    async fn create_scene_thumbnail(&self, scene_id: String) -> HostResult<()>;
    /// Creates embedded documents on a scene and returns their ids
    async fn create_embedded(
        &self,
        scene_id: String,
        kind: EmbeddedKind,
        documents: Vec<Value>,
    ) -> HostResult<Vec<String>>;
    async fn prototype_token(&self, actor_id: String) -> HostResult<Option<Value>>;

    // World
    async fn get_world_info(&self) -> HostResult<Value>;
    async fn validate_write_permissions(&self, operation: String) -> HostResult<Value>;

    // Journals and tables
    async fn create_journal_entry(&self, name: String, content: String) -> HostResult<Value>;
    async fn list_journals(&self) -> HostResult<Value>;
    async fn get_journal_content(&self, journal_id: String) -> HostResult<Value>;
    async fn update_journal_content(&self, journal_id: String, content: String)
    -> HostResult<Value>;
    async fn create_journal(&self, journal: JournalData) -> HostResult<CreatedJournal>;
    async fn create_roll_table(&self, table: RollTableData) -> HostResult<CreatedRollTable>;

    // Players, ownership, dice
    async fn request_player_rolls(&self, request: PlayerRollRequest) -> HostResult<Value>;
    async fn set_actor_ownership(&self, request: OwnershipRequest) -> HostResult<Value>;
    async fn get_actor_ownership(&self, request: Value) -> HostResult<Value>;
    async fn get_friendly_npcs(&self) -> HostResult<Value>;
    async fn get_party_characters(&self) -> HostResult<Value>;
    async fn get_connected_players(&self) -> HostResult<Value>;
    async fn find_players(&self, request: LookupRequest) -> HostResult<Value>;

    // Tokens
    async fn move_token(&self, request: MoveTokenRequest) -> HostResult<Value>;
    async fn update_token(&self, request: UpdateTokenRequest) -> HostResult<Value>;
    async fn delete_tokens(&self, token_ids: Vec<String>) -> HostResult<Value>;
    async fn get_token_details(&self, token_id: String) -> HostResult<Value>;
    async fn toggle_token_condition(&self, request: TokenConditionRequest) -> HostResult<Value>;
    async fn get_available_conditions(&self) -> HostResult<Value>;

    // Map generation backend
    async fn generate_map(&self, request: MapGenerationRequest) -> HostResult<Value>;
    async fn check_map_status(&self, job_id: String) -> HostResult<Value>;
    async fn cancel_map_job(&self, job_id: String) -> HostResult<Value>;

    // Generic documents
    async fn create_document(&self, request: CreateDocumentRequest) -> HostResult<Value>;
    async fn batch_create_documents(&self, request: BatchCreateRequest) -> HostResult<Value>;
    async fn update_document(&self, request: UpdateDocumentRequest) -> HostResult<Value>;
    async fn delete_document(
        &self,
        document_type: DocumentType,
        document_id: String,
    ) -> HostResult<Value>;

    // Files and folders
    async fn browse_files(&self, request: BrowseRequest) -> HostResult<BrowseResult>;
    async fn create_directory(&self, source: String, path: String) -> HostResult<()>;
    /// Uploads a file and returns its host path
    async fn upload_file(&self, upload: FileUpload) -> HostResult<String>;
    async fn create_folder(&self, folder: NewFolder) -> HostResult<FolderInfo>;
    async fn list_folders(&self) -> HostResult<Vec<FolderInfo>>;
    /// Returns the deleted folder's name, or `None` when it does not exist
    async fn delete_folder(
        &self,
        folder_id: String,
        delete_contents: bool,
    ) -> HostResult<Option<String>>;
    async fn update_folder(
        &self,
        folder_id: String,
        update: FolderUpdate,
    ) -> HostResult<Option<FolderInfo>>;
    async fn export_folder_to_compendium(&self, request: FolderExportRequest)
    -> HostResult<Value>;
}
