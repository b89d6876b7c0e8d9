//! Argument and result types for host facade calls.
//!
//! Field names serialize in camelCase, the shape the Foundry module reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Session metadata reported by the host at authentication
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostWorld {
    pub world_id: Option<String>,
    pub foundry_version: Option<String>,
}

/// Actor entry as listed by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub actor_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Folder descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub folder_type: String,
    pub parent: Option<String>,
}

/// Compendium pack metadata needed before editing entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackInfo {
    pub id: String,
    pub label: String,
    pub locked: bool,
}

/// Document types accepted by the generic document operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum DocumentType {
    Actor,
    Item,
}

/// Embedded document collections on a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum EmbeddedKind {
    Note,
    Wall,
    AmbientLight,
    Token,
}

/// Lookup by free-form identifier (name or id), extra fields pass through
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupRequest {
    pub identifier: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompendiumSearch {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompendiumActorRequest {
    pub pack_id: String,
    pub item_id: String,
    pub custom_names: Vec<String>,
    pub quantity: u64,
    pub add_to_scene: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddActorsRequest {
    pub actor_ids: Vec<String>,
    pub placement: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchSceneRequest {
    pub scene_identifier: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterItemSearch {
    pub character_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UseItemRequest {
    pub actor_identifier: String,
    pub item_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRollRequest {
    pub roll_type: String,
    pub roll_target: String,
    pub target_player: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRequest {
    pub actor_id: String,
    pub user_id: String,
    pub permission: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTokenRequest {
    pub token_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTokenRequest {
    pub token_id: String,
    pub updates: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConditionRequest {
    pub token_id: String,
    pub condition_id: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapGenerationRequest {
    pub prompt: String,
    pub scene_name: String,
    pub size: String,
    pub grid_size: u64,
    pub quality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub document_type: DocumentType,
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest {
    pub document_type: DocumentType,
    pub documents: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    pub document_type: DocumentType,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_items: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_item_ids: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseRequest {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseResult {
    pub target: String,
    #[serde(default)]
    pub dirs: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// A file to place in the host's data storage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    pub source: String,
    pub target_path: String,
    pub filename: String,
    pub mime_type: String,
    /// Base64 payload, already checked to decode
    pub base64_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFolder {
    pub name: String,
    #[serde(rename = "type")]
    pub folder_type: String,
    #[serde(rename = "folder", skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Partial folder update; `parent: Some(None)` moves the folder to the root
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FolderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "folder", skip_serializing_if = "Option::is_none")]
    pub parent: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderExportRequest {
    pub folder_id: String,
    pub pack_id: String,
    pub recursive: bool,
    pub clear_first: bool,
}

/// Journal entry with its pages, ready for creation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalData {
    pub name: String,
    pub pages: Vec<Value>,
    pub ownership: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedJournal {
    pub id: String,
    pub name: String,
    pub page_ids: Vec<PageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollTableData {
    pub name: String,
    pub formula: String,
    pub description: String,
    pub results: Vec<Value>,
    pub replacement: bool,
    pub display_roll: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRollTable {
    pub id: String,
    pub name: String,
    pub formula: String,
    pub result_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u64,
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedScene {
    pub id: String,
    pub name: String,
    pub width: u64,
    pub height: u64,
    #[serde(default)]
    pub grid_size: Option<u64>,
}
