//! The controller client: a typed seam over the remote controller's HTTP
//! API. Every validator and mutation primitive takes this trait explicitly,
//! so tests substitute an in-memory double without global state.

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::model::{
    ColorStore, Effect, EffectConfig, Playlist, PlaylistState, PresetCatalog, PresetCategory,
    Scene, SceneEntry, Virtual,
};

// ── Trait ────────────────────────────────────────────────────────

/// Typed get/set surface of the remote controller. Shapes are the
/// controller's own; this trait adds nothing but types and the error
/// taxonomy.
#[async_trait]
pub trait Controller: Send + Sync {
    // Virtuals
    async fn list_virtuals(&self) -> Result<Vec<Virtual>, BridgeError>;
    async fn get_virtual(&self, id: &str) -> Result<Virtual, BridgeError>;
    async fn set_virtual_active(&self, id: &str, active: bool) -> Result<(), BridgeError>;
    async fn set_virtual_effect(&self, id: &str, effect: &Effect) -> Result<(), BridgeError>;
    async fn update_virtual_effect(
        &self,
        id: &str,
        config: &EffectConfig,
    ) -> Result<(), BridgeError>;
    async fn clear_virtual_effect(&self, id: &str) -> Result<(), BridgeError>;

    // Effect schema catalog: effect type → parameter schema.
    async fn get_effect_schemas(&self) -> Result<HashMap<String, Value>, BridgeError>;

    // Presets
    async fn get_presets(&self, effect_type: &str) -> Result<PresetCatalog, BridgeError>;
    async fn apply_preset(
        &self,
        virtual_id: &str,
        category: PresetCategory,
        preset_id: &str,
    ) -> Result<(), BridgeError>;
    async fn save_preset(&self, virtual_id: &str, name: &str) -> Result<(), BridgeError>;
    async fn delete_preset(&self, effect_type: &str, preset_id: &str) -> Result<(), BridgeError>;

    // Scenes
    async fn list_scenes(&self) -> Result<Vec<Scene>, BridgeError>;
    async fn get_scene(&self, id: &str) -> Result<Scene, BridgeError>;
    /// Create a scene. Without an explicit virtual map the controller
    /// captures the currently active effects.
    async fn create_scene(
        &self,
        name: &str,
        tags: Option<&str>,
        virtuals: Option<&IndexMap<String, SceneEntry>>,
    ) -> Result<Scene, BridgeError>;
    /// Update a scene in place by id. The whole body is written; callers
    /// are responsible for merging from a fresh read first.
    async fn update_scene(&self, scene: &Scene) -> Result<(), BridgeError>;
    async fn delete_scene(&self, id: &str) -> Result<(), BridgeError>;
    async fn activate_scene(&self, id: &str) -> Result<(), BridgeError>;

    // Playlists
    async fn list_playlists(&self) -> Result<Vec<Playlist>, BridgeError>;
    async fn get_playlist(&self, id: &str) -> Result<Playlist, BridgeError>;
    async fn create_playlist(&self, playlist: &Playlist) -> Result<(), BridgeError>;
    async fn update_playlist(&self, playlist: &Playlist) -> Result<(), BridgeError>;
    async fn delete_playlist(&self, id: &str) -> Result<(), BridgeError>;
    async fn start_playlist(&self, id: &str) -> Result<(), BridgeError>;
    async fn stop_playlist(&self) -> Result<(), BridgeError>;
    async fn playlist_state(&self) -> Result<PlaylistState, BridgeError>;

    // Color / gradient store
    async fn get_colors(&self) -> Result<ColorStore, BridgeError>;
    async fn get_gradients(&self) -> Result<ColorStore, BridgeError>;
    async fn set_gradient(&self, id: &str, value: &str) -> Result<(), BridgeError>;
    async fn delete_gradient(&self, id: &str) -> Result<(), BridgeError>;

    // Pass-through reads
    async fn server_info(&self) -> Result<Value, BridgeError>;
    async fn list_devices(&self) -> Result<Value, BridgeError>;
}

// ── HTTP implementation ──────────────────────────────────────────

/// Thin reqwest transport. One shared client, one base URL, no caching:
/// every call is a fresh round trip by design.
pub struct HttpController {
    client: reqwest::Client,
    base_url: String,
}

impl HttpController {
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(BridgeError::from)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// One round trip. Connect/timeout failures become `Transport`;
    /// non-success statuses become `ControllerRejected` with the body
    /// surfaced verbatim.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        debug!("{method} {path}");
        let mut req = self.client.request(method, self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(BridgeError::from)?;
        let status = resp.status();
        let text = resp.text().await.map_err(BridgeError::from)?;
        if !status.is_success() {
            return Err(BridgeError::ControllerRejected {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("unknown status").to_string(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| BridgeError::ControllerRejected {
            status: status.as_u16(),
            status_text: "unparseable response body".to_string(),
            body: format!("{e}: {text}"),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BridgeError> {
        let value = self.request(Method::GET, path, None).await?;
        serde_json::from_value(value).map_err(|e| BridgeError::ControllerRejected {
            status: 200,
            status_text: "unexpected response shape".to_string(),
            body: e.to_string(),
        })
    }

    /// Parse an `{ "<key>": { id: body, ... } }` envelope into entities,
    /// copying each map key into the entity's `id`.
    fn parse_keyed<T: DeserializeOwned>(
        envelope: Value,
        key: &str,
        set_id: impl Fn(&mut T, String),
    ) -> Result<Vec<T>, BridgeError> {
        let map: IndexMap<String, Value> = envelope
            .get(key)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| BridgeError::ControllerRejected {
                status: 200,
                status_text: format!("unexpected {key} envelope"),
                body: e.to_string(),
            })?
            .unwrap_or_default();
        let mut out = Vec::with_capacity(map.len());
        for (id, body) in map {
            let mut entity: T =
                serde_json::from_value(body).map_err(|e| BridgeError::ControllerRejected {
                    status: 200,
                    status_text: format!("unexpected {key} entry shape"),
                    body: format!("{id}: {e}"),
                })?;
            set_id(&mut entity, id);
            out.push(entity);
        }
        Ok(out)
    }
}

#[async_trait]
impl Controller for HttpController {
    async fn list_virtuals(&self) -> Result<Vec<Virtual>, BridgeError> {
        let envelope = self.request(Method::GET, "/api/virtuals", None).await?;
        Self::parse_keyed(envelope, "virtuals", |v: &mut Virtual, id| v.id = id)
    }

    async fn get_virtual(&self, id: &str) -> Result<Virtual, BridgeError> {
        let mut v: Virtual = self.get_json(&format!("/api/virtuals/{id}")).await?;
        if v.id.is_empty() {
            v.id = id.to_string();
        }
        Ok(v)
    }

    async fn set_virtual_active(&self, id: &str, active: bool) -> Result<(), BridgeError> {
        let body = serde_json::json!({ "active": active });
        self.request(Method::PUT, &format!("/api/virtuals/{id}"), Some(&body))
            .await?;
        Ok(())
    }

    async fn set_virtual_effect(&self, id: &str, effect: &Effect) -> Result<(), BridgeError> {
        let body = serde_json::to_value(effect).map_err(|e| BridgeError::validation(e.to_string()))?;
        self.request(Method::POST, &format!("/api/virtuals/{id}/effects"), Some(&body))
            .await?;
        Ok(())
    }

    async fn update_virtual_effect(
        &self,
        id: &str,
        config: &EffectConfig,
    ) -> Result<(), BridgeError> {
        let body = serde_json::json!({ "config": config });
        self.request(Method::PUT, &format!("/api/virtuals/{id}/effects"), Some(&body))
            .await?;
        Ok(())
    }

    async fn clear_virtual_effect(&self, id: &str) -> Result<(), BridgeError> {
        self.request(Method::DELETE, &format!("/api/virtuals/{id}/effects"), None)
            .await?;
        Ok(())
    }

    async fn get_effect_schemas(&self) -> Result<HashMap<String, Value>, BridgeError> {
        let envelope = self.request(Method::GET, "/api/schema/effects", None).await?;
        let schemas = envelope.get("effects").cloned().unwrap_or(envelope);
        serde_json::from_value(schemas).map_err(|e| BridgeError::ControllerRejected {
            status: 200,
            status_text: "unexpected effect schema shape".to_string(),
            body: e.to_string(),
        })
    }

    async fn get_presets(&self, effect_type: &str) -> Result<PresetCatalog, BridgeError> {
        let envelope = self
            .request(Method::GET, &format!("/api/effects/{effect_type}/presets"), None)
            .await?;
        // The controller keys presets by id under each category; only the
        // ids matter for reference validation.
        let keys = |category: &str| -> Vec<String> {
            envelope
                .get(category)
                .and_then(Value::as_object)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default()
        };
        Ok(PresetCatalog {
            builtin: keys(PresetCategory::Builtin.as_str()),
            user: keys(PresetCategory::User.as_str()),
        })
    }

    async fn apply_preset(
        &self,
        virtual_id: &str,
        category: PresetCategory,
        preset_id: &str,
    ) -> Result<(), BridgeError> {
        let body = serde_json::json!({
            "category": category.as_str(),
            "preset_id": preset_id,
        });
        self.request(
            Method::PUT,
            &format!("/api/virtuals/{virtual_id}/presets"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn save_preset(&self, virtual_id: &str, name: &str) -> Result<(), BridgeError> {
        let body = serde_json::json!({ "name": name });
        self.request(
            Method::POST,
            &format!("/api/virtuals/{virtual_id}/presets"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete_preset(&self, effect_type: &str, preset_id: &str) -> Result<(), BridgeError> {
        self.request(
            Method::DELETE,
            &format!("/api/effects/{effect_type}/presets/{preset_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_scenes(&self) -> Result<Vec<Scene>, BridgeError> {
        let envelope = self.request(Method::GET, "/api/scenes", None).await?;
        Self::parse_keyed(envelope, "scenes", |s: &mut Scene, id| s.id = id)
    }

    async fn get_scene(&self, id: &str) -> Result<Scene, BridgeError> {
        let mut s: Scene = self.get_json(&format!("/api/scenes/{id}")).await?;
        if s.id.is_empty() {
            s.id = id.to_string();
        }
        Ok(s)
    }

    async fn create_scene(
        &self,
        name: &str,
        tags: Option<&str>,
        virtuals: Option<&IndexMap<String, SceneEntry>>,
    ) -> Result<Scene, BridgeError> {
        let mut body = serde_json::json!({ "name": name });
        if let Some(obj) = body.as_object_mut() {
            if let Some(tags) = tags {
                obj.insert("scene_tags".to_string(), Value::String(tags.to_string()));
            }
            if let Some(virtuals) = virtuals {
                let value = serde_json::to_value(virtuals)
                    .map_err(|e| BridgeError::validation(e.to_string()))?;
                obj.insert("virtuals".to_string(), value);
            }
        }
        let created = self.request(Method::POST, "/api/scenes", Some(&body)).await?;
        serde_json::from_value(created.get("scene").cloned().unwrap_or(created)).map_err(|e| {
            BridgeError::ControllerRejected {
                status: 200,
                status_text: "unexpected created-scene shape".to_string(),
                body: e.to_string(),
            }
        })
    }

    async fn update_scene(&self, scene: &Scene) -> Result<(), BridgeError> {
        let body = serde_json::to_value(scene).map_err(|e| BridgeError::validation(e.to_string()))?;
        self.request(Method::PUT, &format!("/api/scenes/{}", scene.id), Some(&body))
            .await?;
        Ok(())
    }

    async fn delete_scene(&self, id: &str) -> Result<(), BridgeError> {
        self.request(Method::DELETE, &format!("/api/scenes/{id}"), None)
            .await?;
        Ok(())
    }

    async fn activate_scene(&self, id: &str) -> Result<(), BridgeError> {
        let body = serde_json::json!({ "id": id, "action": "activate" });
        self.request(Method::PUT, "/api/scenes", Some(&body)).await?;
        Ok(())
    }

    async fn list_playlists(&self) -> Result<Vec<Playlist>, BridgeError> {
        let envelope = self.request(Method::GET, "/api/playlists", None).await?;
        Self::parse_keyed(envelope, "playlists", |p: &mut Playlist, id| p.id = id)
    }

    async fn get_playlist(&self, id: &str) -> Result<Playlist, BridgeError> {
        let mut p: Playlist = self.get_json(&format!("/api/playlists/{id}")).await?;
        if p.id.is_empty() {
            p.id = id.to_string();
        }
        Ok(p)
    }

    async fn create_playlist(&self, playlist: &Playlist) -> Result<(), BridgeError> {
        let body =
            serde_json::to_value(playlist).map_err(|e| BridgeError::validation(e.to_string()))?;
        self.request(Method::POST, "/api/playlists", Some(&body)).await?;
        Ok(())
    }

    async fn update_playlist(&self, playlist: &Playlist) -> Result<(), BridgeError> {
        let body =
            serde_json::to_value(playlist).map_err(|e| BridgeError::validation(e.to_string()))?;
        self.request(Method::PUT, &format!("/api/playlists/{}", playlist.id), Some(&body))
            .await?;
        Ok(())
    }

    async fn delete_playlist(&self, id: &str) -> Result<(), BridgeError> {
        self.request(Method::DELETE, &format!("/api/playlists/{id}"), None)
            .await?;
        Ok(())
    }

    async fn start_playlist(&self, id: &str) -> Result<(), BridgeError> {
        let body = serde_json::json!({ "action": "start", "id": id });
        self.request(Method::PUT, "/api/playlists/state", Some(&body)).await?;
        Ok(())
    }

    async fn stop_playlist(&self) -> Result<(), BridgeError> {
        let body = serde_json::json!({ "action": "stop" });
        self.request(Method::PUT, "/api/playlists/state", Some(&body)).await?;
        Ok(())
    }

    async fn playlist_state(&self) -> Result<PlaylistState, BridgeError> {
        self.get_json("/api/playlists/state").await
    }

    async fn get_colors(&self) -> Result<ColorStore, BridgeError> {
        self.get_json("/api/colors").await
    }

    async fn get_gradients(&self) -> Result<ColorStore, BridgeError> {
        self.get_json("/api/gradients").await
    }

    async fn set_gradient(&self, id: &str, value: &str) -> Result<(), BridgeError> {
        let body = serde_json::json!({ "data": value });
        self.request(Method::PUT, &format!("/api/gradients/{id}"), Some(&body))
            .await?;
        Ok(())
    }

    async fn delete_gradient(&self, id: &str) -> Result<(), BridgeError> {
        self.request(Method::DELETE, &format!("/api/gradients/{id}"), None)
            .await?;
        Ok(())
    }

    async fn server_info(&self) -> Result<Value, BridgeError> {
        self.request(Method::GET, "/api/info", None).await
    }

    async fn list_devices(&self) -> Result<Value, BridgeError> {
        self.request(Method::GET, "/api/devices", None).await
    }
}
