//! Named queries exposed to tool-calling clients.
//!
//! Every operation is a [`QueryName`] variant; [`QueryHandlers::handle`]
//! routes each one to its handler with an exhaustive match, so adding a
//! variant without a handler is a compile error.

use std::future::Future;
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::access::{Caller, validate_gm_access};
use crate::error::QueryResult;
use crate::host::HostApi;

pub mod handlers;
pub mod payload;
pub mod registry;
pub mod response;

pub use payload::Payload;
pub use registry::{DispatchTable, QueryHandler, QueryRegistry, run_query};
pub use response::QueryResponse;

/// All query names as an exhaustive enum.
///
/// `to_string` is the canonical wire name; token operations also answer to
/// the kebab-case aliases returned by [`QueryName::aliases`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, IntoStaticStr)]
pub enum QueryName {
    // ==========================================
    // Actors
    // ==========================================
    #[strum(to_string = "getCharacterInfo")]
    GetCharacterInfo,
    #[strum(to_string = "listActors")]
    ListActors,
    #[strum(to_string = "findActor")]
    FindActor,
    #[strum(to_string = "searchCharacterItems")]
    SearchCharacterItems,
    #[strum(to_string = "useItem")]
    UseItem,

    // ==========================================
    // Compendium
    // ==========================================
    #[strum(to_string = "searchCompendium")]
    SearchCompendium,
    #[strum(to_string = "listCreaturesByCriteria")]
    ListCreaturesByCriteria,
    #[strum(to_string = "getAvailablePacks")]
    GetAvailablePacks,
    #[strum(to_string = "listCompendiumEntries")]
    ListCompendiumEntries,
    #[strum(to_string = "getCompendiumDocumentFull")]
    GetCompendiumDocumentFull,
    #[strum(to_string = "getEnhancedCreatureIndex")]
    GetEnhancedCreatureIndex,
    #[strum(to_string = "createActorFromCompendium")]
    CreateActorFromCompendium,
    #[strum(to_string = "updateCompendiumEntry")]
    UpdateCompendiumEntry,

    // ==========================================
    // Scenes
    // ==========================================
    #[strum(to_string = "getActiveScene")]
    GetActiveScene,
    #[strum(to_string = "list-scenes")]
    ListScenes,
    #[strum(to_string = "switch-scene")]
    SwitchScene,
    #[strum(to_string = "addActorsToScene")]
    AddActorsToScene,
    #[strum(to_string = "createScene")]
    CreateScene,
    #[strum(to_string = "placeNotes")]
    PlaceNotes,
    #[strum(to_string = "createWalls")]
    CreateWalls,
    #[strum(to_string = "createLights")]
    CreateLights,
    #[strum(to_string = "createTokens")]
    CreateTokens,

    // ==========================================
    // World
    // ==========================================
    #[strum(to_string = "getWorldInfo")]
    GetWorldInfo,
    #[strum(to_string = "ping")]
    Ping,
    #[strum(to_string = "validateWritePermissions")]
    ValidateWritePermissions,

    // ==========================================
    // Journals and roll tables
    // ==========================================
    #[strum(to_string = "createJournalEntry")]
    CreateJournalEntry,
    #[strum(to_string = "listJournals")]
    ListJournals,
    #[strum(to_string = "getJournalContent")]
    GetJournalContent,
    #[strum(to_string = "updateJournalContent")]
    UpdateJournalContent,
    #[strum(to_string = "createJournalEntryMultiPage")]
    CreateJournalEntryMultiPage,
    #[strum(to_string = "createRollTable")]
    CreateRollTable,

    // ==========================================
    // Dice and campaign
    // ==========================================
    #[strum(to_string = "request-player-rolls")]
    RequestPlayerRolls,
    #[strum(to_string = "updateCampaignProgress")]
    UpdateCampaignProgress,

    // ==========================================
    // Ownership and players
    // ==========================================
    #[strum(to_string = "setActorOwnership")]
    SetActorOwnership,
    #[strum(to_string = "getActorOwnership")]
    GetActorOwnership,
    #[strum(to_string = "getFriendlyNPCs")]
    GetFriendlyNpcs,
    #[strum(to_string = "getPartyCharacters")]
    GetPartyCharacters,
    #[strum(to_string = "getConnectedPlayers")]
    GetConnectedPlayers,
    #[strum(to_string = "findPlayers")]
    FindPlayers,

    // ==========================================
    // Tokens
    // ==========================================
    #[strum(to_string = "moveToken", serialize = "move-token")]
    MoveToken,
    #[strum(to_string = "updateToken", serialize = "update-token")]
    UpdateToken,
    #[strum(to_string = "deleteTokens", serialize = "delete-tokens")]
    DeleteTokens,
    #[strum(to_string = "getTokenDetails", serialize = "get-token-details")]
    GetTokenDetails,
    #[strum(to_string = "toggleTokenCondition", serialize = "toggle-token-condition")]
    ToggleTokenCondition,
    #[strum(to_string = "getAvailableConditions", serialize = "get-available-conditions")]
    GetAvailableConditions,

    // ==========================================
    // Map generation
    // ==========================================
    #[strum(to_string = "generate-map")]
    GenerateMap,
    #[strum(to_string = "check-map-status")]
    CheckMapStatus,
    #[strum(to_string = "cancel-map-job")]
    CancelMapJob,
    #[strum(to_string = "upload-generated-map")]
    UploadGeneratedMap,

    // ==========================================
    // Generic documents
    // ==========================================
    #[strum(to_string = "createDocument")]
    CreateDocument,
    #[strum(to_string = "batchCreateDocuments")]
    BatchCreateDocuments,
    #[strum(to_string = "updateDocument")]
    UpdateDocument,
    #[strum(to_string = "deleteDocument")]
    DeleteDocument,

    // ==========================================
    // Files and folders
    // ==========================================
    #[strum(to_string = "browseFiles")]
    BrowseFiles,
    #[strum(to_string = "uploadFile")]
    UploadFile,
    #[strum(to_string = "createFolder")]
    CreateFolder,
    #[strum(to_string = "listFolders")]
    ListFolders,
    #[strum(to_string = "deleteFolder")]
    DeleteFolder,
    #[strum(to_string = "updateFolder")]
    UpdateFolder,
    #[strum(to_string = "exportFolderToCompendium")]
    ExportFolderToCompendium,
}

impl QueryName {
    /// Canonical wire name
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Alternate names registered next to the canonical one
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            QueryName::MoveToken => &["move-token"],
            QueryName::UpdateToken => &["update-token"],
            QueryName::DeleteTokens => &["delete-tokens"],
            QueryName::GetTokenDetails => &["get-token-details"],
            QueryName::ToggleTokenCondition => &["toggle-token-condition"],
            QueryName::GetAvailableConditions => &["get-available-conditions"],
            _ => &[],
        }
    }

    /// Canonical name followed by any aliases
    pub fn wire_names(self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.as_str()).chain(self.aliases().iter().copied())
    }
}

/// Settings the handlers read from service configuration
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub module_id: String,
    pub map_quality: String,
    pub generated_maps_dir: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            module_id: "foundry-mcp-bridge".to_string(),
            map_quality: "low".to_string(),
            generated_maps_dir: "ai-generated-maps".to_string(),
        }
    }
}

/// The handlers behind every [`QueryName`], sharing one host facade
pub struct QueryHandlers {
    host: Arc<dyn HostApi>,
    settings: QuerySettings,
}

impl QueryHandlers {
    pub fn new(host: Arc<dyn HostApi>, settings: QuerySettings) -> Self {
        Self { host, settings }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Run one query on behalf of `caller`
    pub async fn handle(&self, name: QueryName, caller: &Caller, payload: Payload) -> QueryResult {
        let p = &payload;
        match name {
            // Actors
            QueryName::GetCharacterInfo => self.get_character_info(caller, p).await,
            QueryName::ListActors => self.list_actors(caller, p).await,
            QueryName::FindActor => self.find_actor(caller, p).await,
            QueryName::SearchCharacterItems => self.search_character_items(caller, p).await,
            QueryName::UseItem => self.use_item(caller, p).await,

            // Compendium
            QueryName::SearchCompendium => self.search_compendium(caller, p).await,
            QueryName::ListCreaturesByCriteria => self.list_creatures_by_criteria(caller, p).await,
            QueryName::GetAvailablePacks => self.get_available_packs(caller).await,
            QueryName::ListCompendiumEntries => self.list_compendium_entries(caller, p).await,
            QueryName::GetCompendiumDocumentFull => {
                self.get_compendium_document_full(caller, p).await
            }
            QueryName::GetEnhancedCreatureIndex => self.get_enhanced_creature_index(caller).await,
            QueryName::CreateActorFromCompendium => {
                self.create_actor_from_compendium(caller, p).await
            }
            QueryName::UpdateCompendiumEntry => self.update_compendium_entry(caller, p).await,

            // Scenes
            QueryName::GetActiveScene => self.get_active_scene(caller).await,
            QueryName::ListScenes => self.list_scenes(caller, p).await,
            QueryName::SwitchScene => self.switch_scene(caller, p).await,
            QueryName::AddActorsToScene => self.add_actors_to_scene(caller, p).await,
            QueryName::CreateScene => self.create_scene(caller, p).await,
            QueryName::PlaceNotes => self.place_notes(caller, p).await,
            QueryName::CreateWalls => self.create_walls(caller, p).await,
            QueryName::CreateLights => self.create_lights(caller, p).await,
            QueryName::CreateTokens => self.create_tokens(caller, p).await,

            // World
            QueryName::GetWorldInfo => self.get_world_info(caller).await,
            QueryName::Ping => Ok(self.ping(caller)),
            QueryName::ValidateWritePermissions => {
                self.validate_write_permissions(caller, p).await
            }

            // Journals and roll tables
            QueryName::CreateJournalEntry => self.create_journal_entry(caller, p).await,
            QueryName::ListJournals => self.list_journals(caller).await,
            QueryName::GetJournalContent => self.get_journal_content(caller, p).await,
            QueryName::UpdateJournalContent => self.update_journal_content(caller, p).await,
            QueryName::CreateJournalEntryMultiPage => {
                self.create_journal_entry_multi_page(caller, p).await
            }
            QueryName::CreateRollTable => self.create_roll_table(caller, p).await,

            // Dice and campaign
            QueryName::RequestPlayerRolls => self.request_player_rolls(caller, p).await,
            QueryName::UpdateCampaignProgress => self.update_campaign_progress(caller, p).await,

            // Ownership and players
            QueryName::SetActorOwnership => self.set_actor_ownership(caller, p).await,
            QueryName::GetActorOwnership => self.get_actor_ownership(caller, p).await,
            QueryName::GetFriendlyNpcs => self.get_friendly_npcs(caller).await,
            QueryName::GetPartyCharacters => self.get_party_characters(caller).await,
            QueryName::GetConnectedPlayers => self.get_connected_players(caller).await,
            QueryName::FindPlayers => self.find_players(caller, p).await,

            // Tokens
            QueryName::MoveToken => self.move_token(caller, p).await,
            QueryName::UpdateToken => self.update_token(caller, p).await,
            QueryName::DeleteTokens => self.delete_tokens(caller, p).await,
            QueryName::GetTokenDetails => self.get_token_details(caller, p).await,
            QueryName::ToggleTokenCondition => self.toggle_token_condition(caller, p).await,
            QueryName::GetAvailableConditions => self.get_available_conditions(caller).await,

            // Map generation
            QueryName::GenerateMap => self.generate_map(caller, p).await,
            QueryName::CheckMapStatus => self.check_map_status(caller, p).await,
            QueryName::CancelMapJob => self.cancel_map_job(caller, p).await,
            QueryName::UploadGeneratedMap => self.upload_generated_map(caller, p).await,

            // Generic documents
            QueryName::CreateDocument => self.create_document(caller, p).await,
            QueryName::BatchCreateDocuments => self.batch_create_documents(caller, p).await,
            QueryName::UpdateDocument => self.update_document(caller, p).await,
            QueryName::DeleteDocument => self.delete_document(caller, p).await,

            // Files and folders
            QueryName::BrowseFiles => self.browse_files(caller, p).await,
            QueryName::UploadFile => self.upload_file(caller, p).await,
            QueryName::CreateFolder => self.create_folder(caller, p).await,
            QueryName::ListFolders => self.list_folders(caller, p).await,
            QueryName::DeleteFolder => self.delete_folder(caller, p).await,
            QueryName::UpdateFolder => self.update_folder(caller, p).await,
            QueryName::ExportFolderToCompendium => {
                self.export_folder_to_compendium(caller, p).await
            }
        }
    }

    /// Deny non-GM callers silently, otherwise run `work` and prefix any
    /// failure with the operation name.
    async fn guarded<F>(&self, caller: &Caller, operation: &'static str, work: F) -> QueryResult
    where
        F: Future<Output = QueryResult>,
    {
        if !validate_gm_access(caller).allowed {
            return Ok(QueryResponse::access_denied());
        }
        work.await.map_err(|e| e.within(operation))
    }

    /// Like [`Self::guarded`] but failures come back as data, unprefixed
    async fn reporting<F>(&self, caller: &Caller, work: F) -> QueryResult
    where
        F: Future<Output = QueryResult>,
    {
        if !validate_gm_access(caller).allowed {
            return Ok(QueryResponse::access_denied());
        }
        Ok(work
            .await
            .unwrap_or_else(|e| QueryResponse::failure(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_canonical_names_round_trip() {
        for name in QueryName::iter() {
            assert_eq!(QueryName::from_str(name.as_str()).unwrap(), name);
            assert_eq!(name.to_string(), name.as_str());
        }
        assert_eq!(QueryName::GetFriendlyNpcs.as_str(), "getFriendlyNPCs");
        assert_eq!(QueryName::ListScenes.as_str(), "list-scenes");
    }

    #[test]
    fn test_token_aliases() {
        assert_eq!(QueryName::from_str("move-token").unwrap(), QueryName::MoveToken);
        assert_eq!(
            QueryName::GetAvailableConditions
                .wire_names()
                .collect::<Vec<_>>(),
            vec!["getAvailableConditions", "get-available-conditions"]
        );
        let alias_count: usize = QueryName::iter().map(|n| n.aliases().len()).sum();
        assert_eq!(alias_count, 6);
    }

    #[test]
    fn test_operation_count() {
        assert_eq!(QueryName::iter().count(), 60);
    }
}
