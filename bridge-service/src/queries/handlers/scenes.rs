//! Scene navigation, creation and embedded placements (notes, walls,
//! lights, tokens).

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};
use crate::host::{AddActorsRequest, EmbeddedKind, SwitchSceneRequest};
use crate::queries::payload::is_truthy;
use crate::queries::{Payload, QueryHandlers};

use super::{copy_fields, copy_truthy, or_default, or_truthy};

/// Used when the background image size can't be read
const FALLBACK_SCENE_SIZE: (u64, u64) = (4000, 3000);

impl QueryHandlers {
    pub(crate) async fn get_active_scene(&self, caller: &Caller) -> QueryResult {
        self.guarded(caller, "get active scene", async {
            self.host.ensure_ready()?;
            Ok(self.host.get_active_scene().await?)
        })
        .await
    }

    pub(crate) async fn list_scenes(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "list scenes", async {
            self.host.ensure_ready()?;
            Ok(self.host.list_scenes(payload.to_value()).await?)
        })
        .await
    }

    pub(crate) async fn switch_scene(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "switch scene", async {
            self.host.ensure_ready()?;
            let scene_identifier = payload.required("scene_identifier")?;

            let request = SwitchSceneRequest {
                scene_identifier,
                extra: payload.extras(&["scene_identifier"]),
            };
            Ok(self.host.switch_scene(request).await?)
        })
        .await
    }

    pub(crate) async fn add_actors_to_scene(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "add actors to scene", async {
            self.host.ensure_ready()?;
            if payload.non_empty_array("actorIds").is_none() {
                return Err(QueryError::validation(
                    "actorIds array is required and must not be empty",
                ));
            }

            let request = AddActorsRequest {
                actor_ids: payload.strings("actorIds").unwrap_or_default(),
                placement: payload.str("placement").unwrap_or("random").to_string(),
                hidden: payload.truthy("hidden").is_some(),
            };
            Ok(self.host.add_actors_to_scene(request).await?)
        })
        .await
    }

    pub(crate) async fn create_scene(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "create scene", async {
            self.host.ensure_ready()?;
            let name = payload.required("name")?;
            let background = payload.required("backgroundImage")?;

            let (width, height) = self.scene_dimensions(payload, &background).await;
            let folder = self.resolve_folder(payload, "Scene").await?;
            let grid_size = or_truthy(payload.get("gridSize"), json!(100));

            let mut scene = json!({
                "name": name,
                "background": { "src": background },
                "width": width,
                "height": height,
                "padding": or_default(payload.get("padding"), json!(0.25)),
                "grid": {
                    "size": grid_size,
                    "type": or_default(payload.get("gridType"), json!(1)),
                    "distance": or_default(payload.get("gridDistance"), json!(5)),
                    "units": or_truthy(payload.get("gridUnits"), json!("ft")),
                },
                "environment": {
                    "globalLight": { "enabled": payload.flag("globalLight") != Some(false) }
                },
            });
            if let Some(threshold) = payload.get("globalLightThreshold").filter(|v| !v.is_null()) {
                scene["environment"]["globalLight"]["darkness"] = json!({ "max": threshold });
            }
            if let Some(view) = payload.truthy("initialViewPosition") {
                scene["initial"] = json!({
                    "x": view.get("x"),
                    "y": view.get("y"),
                    "scale": or_truthy(view.get("scale"), json!(1)),
                });
            }
            if let Some(folder) = folder {
                scene["folder"] = Value::String(folder);
            }

            let created = self.host.create_scene(scene).await?;
            if let Err(e) = self.host.create_scene_thumbnail(created.id.clone()).await {
                warn!(scene_id = %created.id, error = %e, "Could not generate scene thumbnail");
            }

            let reported_grid = created
                .grid_size
                .filter(|size| *size > 0)
                .map(Value::from)
                .unwrap_or(grid_size);
            Ok(json!({
                "id": created.id,
                "name": created.name,
                "width": created.width,
                "height": created.height,
                "gridSize": reported_grid,
            }))
        })
        .await
    }

    pub(crate) async fn place_notes(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "place notes", async {
            self.host.ensure_ready()?;
            let (scene_id, notes) = self.embedded_target(payload, "notes").await?;

            let documents = notes.iter().map(note_document).collect();
            let ids = self
                .host
                .create_embedded(scene_id, EmbeddedKind::Note, documents)
                .await?;
            Ok(created_ids(ids, "noteIds"))
        })
        .await
    }

    pub(crate) async fn create_walls(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "create walls", async {
            self.host.ensure_ready()?;
            let (scene_id, walls) = self.embedded_target(payload, "walls").await?;

            let documents = walls.iter().map(wall_document).collect();
            let ids = self
                .host
                .create_embedded(scene_id, EmbeddedKind::Wall, documents)
                .await?;
            Ok(created_ids(ids, "wallIds"))
        })
        .await
    }

    pub(crate) async fn create_lights(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "create lights", async {
            self.host.ensure_ready()?;
            let (scene_id, lights) = self.embedded_target(payload, "lights").await?;

            let documents = lights.iter().map(light_document).collect();
            let ids = self
                .host
                .create_embedded(scene_id, EmbeddedKind::AmbientLight, documents)
                .await?;
            Ok(created_ids(ids, "lightIds"))
        })
        .await
    }

    pub(crate) async fn create_tokens(&self, caller: &Caller, payload: &Payload) -> QueryResult {
        self.guarded(caller, "create tokens", async {
            self.host.ensure_ready()?;
            let (scene_id, tokens) = self.embedded_target(payload, "tokens").await?;

            let mut documents = Vec::with_capacity(tokens.len());
            for token in tokens {
                let actor_id = token
                    .get("actorId")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| QueryError::validation("actorId is required for every token"))?;
                let proto = self
                    .host
                    .prototype_token(actor_id.to_string())
                    .await?
                    .ok_or_else(|| QueryError::precondition(format!("Actor not found: {actor_id}")))?;
                documents.push(token_document(actor_id, token, &proto));
            }

            let ids = self
                .host
                .create_embedded(scene_id, EmbeddedKind::Token, documents)
                .await?;
            Ok(created_ids(ids, "tokenIds"))
        })
        .await
    }

    /// Explicit dimensions win; missing ones come from the background image.
    async fn scene_dimensions(&self, payload: &Payload, background: &str) -> (Value, Value) {
        let width = payload.truthy("width").cloned();
        let height = payload.truthy("height").cloned();
        if let (Some(width), Some(height)) = (&width, &height) {
            return (width.clone(), height.clone());
        }

        let (fallback_width, fallback_height) = match self.host.image_size(background.to_string()).await {
            Ok(size) => (size.width, size.height),
            Err(e) => {
                warn!(src = %background, error = %e, "Could not auto-detect image dimensions, using defaults");
                FALLBACK_SCENE_SIZE
            }
        };
        (
            width.unwrap_or_else(|| json!(fallback_width)),
            height.unwrap_or_else(|| json!(fallback_height)),
        )
    }

    /// Validate `sceneId` and the non-empty `key` array, then confirm the
    /// scene exists.
    async fn embedded_target<'a>(
        &self,
        payload: &'a Payload,
        key: &str,
    ) -> Result<(String, &'a Vec<Value>), QueryError> {
        let scene_id = payload.required("sceneId")?;
        let items = payload.non_empty_array(key).ok_or_else(|| {
            QueryError::validation(format!("{key} array is required and must not be empty"))
        })?;

        if !self.host.scene_exists(scene_id.clone()).await? {
            return Err(QueryError::precondition(format!("Scene not found: {scene_id}")));
        }
        Ok((scene_id, items))
    }
}

fn created_ids(ids: Vec<String>, key: &str) -> Value {
    let mut body = Map::new();
    body.insert("count".to_string(), json!(ids.len()));
    body.insert(key.to_string(), json!(ids));
    Value::Object(body)
}

fn note_document(note: &Value) -> Value {
    let mut data = Map::new();
    copy_fields(note, &mut data, &["x", "y", "entryId", "text"]);
    data.insert("iconSize".to_string(), or_truthy(note.get("iconSize"), json!(40)));
    // TEXT_ANCHOR_POINTS.TOP
    data.insert("textAnchor".to_string(), json!(1));
    copy_truthy(note, &mut data, &["pageId", "iconTint"]);
    Value::Object(data)
}

fn wall_document(wall: &Value) -> Value {
    json!({
        "c": wall.get("c"),
        "move": or_default(wall.get("move"), json!(20)),
        "sight": or_default(wall.get("sense"), json!(20)),
        "door": or_default(wall.get("door"), json!(0)),
        "ds": or_default(wall.get("ds"), json!(0)),
        "dir": or_default(wall.get("dir"), json!(0)),
    })
}

fn light_document(light: &Value) -> Value {
    let config = &light["config"];
    let mut document = json!({
        "x": light.get("x"),
        "y": light.get("y"),
        "config": {
            "dim": or_default(config.get("dim"), json!(10)),
            "bright": or_default(config.get("bright"), json!(5)),
            "color": or_truthy(config.get("color"), json!("#ff9329")),
            "angle": or_default(config.get("angle"), json!(360)),
            "alpha": 0.5,
        },
    });
    if let Some(animation) = config.get("animation").filter(|v| is_truthy(v)) {
        document["config"]["animation"] = json!({
            "type": animation.get("type"),
            "speed": or_default(animation.get("speed"), json!(5)),
            "intensity": or_default(animation.get("intensity"), json!(5)),
        });
    }
    document
}

fn token_document(actor_id: &str, token: &Value, proto: &Value) -> Value {
    let mut data = Map::new();
    data.insert("actorId".to_string(), json!(actor_id));
    data.insert("name".to_string(), or_default(token.get("name"), proto["name"].clone()));
    copy_fields(token, &mut data, &["x", "y"]);
    data.insert("hidden".to_string(), or_default(token.get("hidden"), json!(false)));
    data.insert("elevation".to_string(), or_default(token.get("elevation"), json!(0)));
    data.insert(
        "disposition".to_string(),
        or_default(token.get("disposition"), proto["disposition"].clone()),
    );
    data.insert("actorLink".to_string(), or_default(token.get("actorLink"), json!(false)));
    data.insert("texture".to_string(), json!({ "src": proto["texture"]["src"] }));
    copy_fields(proto, &mut data, &["width", "height"]);
    copy_truthy(proto, &mut data, &["sight", "bar1", "bar2"]);
    Value::Object(data)
}
