//! In-memory controller double for unit tests. Records every write so tests
//! can assert that validation failures stop short of the controller.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::controller::Controller;
use crate::error::BridgeError;
use crate::model::{
    ColorStore, Effect, EffectConfig, Playlist, PlaylistState, PresetCatalog, PresetCategory,
    Scene, SceneEntry, Virtual,
};

fn rejected_404(what: &str) -> BridgeError {
    BridgeError::ControllerRejected {
        status: 404,
        status_text: "Not Found".to_string(),
        body: what.to_string(),
    }
}

/// Controller double backed by plain collections.
#[derive(Default)]
pub struct MockController {
    pub virtuals: Mutex<Vec<Virtual>>,
    pub scenes: Mutex<Vec<Scene>>,
    pub playlists: Mutex<Vec<Playlist>>,
    pub effect_types: Vec<String>,
    pub presets: HashMap<String, PresetCatalog>,
    pub gradients: Mutex<ColorStore>,
    pub colors: ColorStore,
    /// Virtuals whose reported effect never changes regardless of writes.
    /// Simulates the controller-side reconciliation never completing.
    pub stuck_virtuals: HashSet<String>,
    /// Every mutating call, in order, as "op:target".
    pub writes: Mutex<Vec<String>>,
    /// Effect types whose preset catalog was fetched, in order.
    pub preset_fetches: Mutex<Vec<String>>,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_virtuals(mut self, ids: &[&str]) -> Self {
        self.virtuals = Mutex::new(
            ids.iter()
                .map(|id| Virtual {
                    id: (*id).to_string(),
                    active: false,
                    effect: None,
                })
                .collect(),
        );
        self
    }

    pub fn with_effect_types(mut self, types: &[&str]) -> Self {
        self.effect_types = types.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn with_scene(self, scene: Scene) -> Self {
        self.scenes.lock().unwrap().push(scene);
        self
    }

    pub fn with_playlist(self, playlist: Playlist) -> Self {
        self.playlists.lock().unwrap().push(playlist);
        self
    }

    pub fn with_presets(mut self, effect_type: &str, catalog: PresetCatalog) -> Self {
        self.presets.insert(effect_type.to_string(), catalog);
        self
    }

    pub fn with_user_gradient(self, id: &str, value: &str) -> Self {
        self.gradients
            .lock()
            .unwrap()
            .user
            .insert(id.to_string(), value.to_string());
        self
    }

    pub fn with_builtin_gradient(self, id: &str, value: &str) -> Self {
        self.gradients
            .lock()
            .unwrap()
            .builtin
            .insert(id.to_string(), value.to_string());
        self
    }

    pub fn with_stuck_virtual(mut self, id: &str) -> Self {
        self.stuck_virtuals.insert(id.to_string());
        self
    }

    pub fn write_log(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn record(&self, op: &str, target: &str) {
        self.writes.lock().unwrap().push(format!("{op}:{target}"));
    }
}

#[async_trait]
impl Controller for MockController {
    async fn list_virtuals(&self) -> Result<Vec<Virtual>, BridgeError> {
        Ok(self.virtuals.lock().unwrap().clone())
    }

    async fn get_virtual(&self, id: &str) -> Result<Virtual, BridgeError> {
        self.virtuals
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| rejected_404(id))
    }

    async fn set_virtual_active(&self, id: &str, active: bool) -> Result<(), BridgeError> {
        self.record("set_active", id);
        let mut virtuals = self.virtuals.lock().unwrap();
        let v = virtuals
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| rejected_404(id))?;
        v.active = active;
        Ok(())
    }

    async fn set_virtual_effect(&self, id: &str, effect: &Effect) -> Result<(), BridgeError> {
        self.record("set_effect", id);
        let mut virtuals = self.virtuals.lock().unwrap();
        let v = virtuals
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| rejected_404(id))?;
        if !self.stuck_virtuals.contains(id) {
            v.effect = Some(effect.clone());
        }
        Ok(())
    }

    async fn update_virtual_effect(
        &self,
        id: &str,
        config: &EffectConfig,
    ) -> Result<(), BridgeError> {
        self.record("update_effect", id);
        let mut virtuals = self.virtuals.lock().unwrap();
        let v = virtuals
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| rejected_404(id))?;
        if let Some(effect) = v.effect.as_mut() {
            effect.config = config.clone();
        }
        Ok(())
    }

    async fn clear_virtual_effect(&self, id: &str) -> Result<(), BridgeError> {
        self.record("clear_effect", id);
        let mut virtuals = self.virtuals.lock().unwrap();
        let v = virtuals
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| rejected_404(id))?;
        v.effect = None;
        Ok(())
    }

    async fn get_effect_schemas(&self) -> Result<HashMap<String, Value>, BridgeError> {
        Ok(self
            .effect_types
            .iter()
            .map(|t| (t.clone(), serde_json::json!({})))
            .collect())
    }

    async fn get_presets(&self, effect_type: &str) -> Result<PresetCatalog, BridgeError> {
        self.preset_fetches
            .lock()
            .unwrap()
            .push(effect_type.to_string());
        Ok(self.presets.get(effect_type).cloned().unwrap_or_default())
    }

    async fn apply_preset(
        &self,
        virtual_id: &str,
        _category: PresetCategory,
        preset_id: &str,
    ) -> Result<(), BridgeError> {
        self.record("apply_preset", &format!("{virtual_id}/{preset_id}"));
        Ok(())
    }

    async fn save_preset(&self, virtual_id: &str, name: &str) -> Result<(), BridgeError> {
        self.record("save_preset", &format!("{virtual_id}/{name}"));
        Ok(())
    }

    async fn delete_preset(&self, effect_type: &str, preset_id: &str) -> Result<(), BridgeError> {
        self.record("delete_preset", &format!("{effect_type}/{preset_id}"));
        Ok(())
    }

    async fn list_scenes(&self) -> Result<Vec<Scene>, BridgeError> {
        Ok(self.scenes.lock().unwrap().clone())
    }

    async fn get_scene(&self, id: &str) -> Result<Scene, BridgeError> {
        self.scenes
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| rejected_404(id))
    }

    async fn create_scene(
        &self,
        name: &str,
        tags: Option<&str>,
        virtuals: Option<&IndexMap<String, SceneEntry>>,
    ) -> Result<Scene, BridgeError> {
        self.record("create_scene", name);
        let scene = Scene {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            scene_tags: tags.map(str::to_string),
            virtuals: virtuals.cloned().unwrap_or_default(),
        };
        self.scenes.lock().unwrap().push(scene.clone());
        Ok(scene)
    }

    async fn update_scene(&self, scene: &Scene) -> Result<(), BridgeError> {
        self.record("update_scene", &scene.id);
        let mut scenes = self.scenes.lock().unwrap();
        let existing = scenes
            .iter_mut()
            .find(|s| s.id == scene.id)
            .ok_or_else(|| rejected_404(&scene.id))?;
        *existing = scene.clone();
        Ok(())
    }

    async fn delete_scene(&self, id: &str) -> Result<(), BridgeError> {
        self.record("delete_scene", id);
        self.scenes.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }

    async fn activate_scene(&self, id: &str) -> Result<(), BridgeError> {
        self.record("activate_scene", id);
        Ok(())
    }

    async fn list_playlists(&self) -> Result<Vec<Playlist>, BridgeError> {
        Ok(self.playlists.lock().unwrap().clone())
    }

    async fn get_playlist(&self, id: &str) -> Result<Playlist, BridgeError> {
        self.playlists
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| rejected_404(id))
    }

    async fn create_playlist(&self, playlist: &Playlist) -> Result<(), BridgeError> {
        self.record("create_playlist", &playlist.id);
        self.playlists.lock().unwrap().push(playlist.clone());
        Ok(())
    }

    async fn update_playlist(&self, playlist: &Playlist) -> Result<(), BridgeError> {
        self.record("update_playlist", &playlist.id);
        let mut playlists = self.playlists.lock().unwrap();
        let existing = playlists
            .iter_mut()
            .find(|p| p.id == playlist.id)
            .ok_or_else(|| rejected_404(&playlist.id))?;
        *existing = playlist.clone();
        Ok(())
    }

    async fn delete_playlist(&self, id: &str) -> Result<(), BridgeError> {
        self.record("delete_playlist", id);
        self.playlists.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }

    async fn start_playlist(&self, id: &str) -> Result<(), BridgeError> {
        self.record("start_playlist", id);
        Ok(())
    }

    async fn stop_playlist(&self) -> Result<(), BridgeError> {
        self.record("stop_playlist", "");
        Ok(())
    }

    async fn playlist_state(&self) -> Result<PlaylistState, BridgeError> {
        Ok(PlaylistState {
            running: false,
            playlist_id: None,
            current_index: None,
        })
    }

    async fn get_colors(&self) -> Result<ColorStore, BridgeError> {
        Ok(self.colors.clone())
    }

    async fn get_gradients(&self) -> Result<ColorStore, BridgeError> {
        Ok(self.gradients.lock().unwrap().clone())
    }

    async fn set_gradient(&self, id: &str, value: &str) -> Result<(), BridgeError> {
        self.record("set_gradient", id);
        self.gradients
            .lock()
            .unwrap()
            .user
            .insert(id.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_gradient(&self, id: &str) -> Result<(), BridgeError> {
        self.record("delete_gradient", id);
        self.gradients.lock().unwrap().user.shift_remove(id);
        Ok(())
    }

    async fn server_info(&self) -> Result<Value, BridgeError> {
        Ok(serde_json::json!({ "name": "mock" }))
    }

    async fn list_devices(&self) -> Result<Value, BridgeError> {
        Ok(serde_json::json!({ "devices": {} }))
    }
}

// Coverage for the parts of the controller surface no mutation primitive
// drives directly. The double must honor the same contract as the HTTP
// client before a test can lean on it.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlaylistItem, PlaylistMode};

    fn playlist(id: &str) -> Playlist {
        Playlist {
            id: id.to_string(),
            name: id.to_string(),
            mode: PlaylistMode::Sequence,
            default_duration_ms: 5_000,
            items: vec![PlaylistItem {
                scene_id: "scene-1".to_string(),
                duration_ms: 5_000,
            }],
            extra: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn preset_calls_are_recorded_as_writes() {
        let mock = MockController::new().with_virtuals(&["strip-1"]);
        mock.apply_preset("strip-1", PresetCategory::Builtin, "fast")
            .await
            .unwrap();
        mock.save_preset("strip-1", "mine").await.unwrap();
        mock.delete_preset("rainbow", "mine").await.unwrap();
        assert_eq!(
            mock.write_log(),
            vec![
                "apply_preset:strip-1/fast",
                "save_preset:strip-1/mine",
                "delete_preset:rainbow/mine",
            ]
        );
    }

    #[tokio::test]
    async fn effect_update_and_clear_mutate_the_stored_virtual() {
        let mock = MockController::new().with_virtuals(&["strip-1"]);
        let effect = Effect {
            effect_type: "rainbow".to_string(),
            config: EffectConfig::new(),
        };
        mock.set_virtual_effect("strip-1", &effect).await.unwrap();

        let mut config = EffectConfig::new();
        config.insert("speed".to_string(), serde_json::json!(2.0));
        mock.update_virtual_effect("strip-1", &config).await.unwrap();
        let v = mock.get_virtual("strip-1").await.unwrap();
        assert_eq!(
            v.effect.unwrap().config.get("speed"),
            Some(&serde_json::json!(2.0))
        );

        mock.clear_virtual_effect("strip-1").await.unwrap();
        assert!(mock.get_virtual("strip-1").await.unwrap().effect.is_none());

        let err = mock.clear_virtual_effect("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn scene_and_playlist_deletes_remove_and_record() {
        let mock = MockController::new()
            .with_scene(Scene {
                id: "scene-1".to_string(),
                name: "One".to_string(),
                scene_tags: None,
                virtuals: IndexMap::new(),
            })
            .with_playlist(playlist("pl-1"));

        mock.delete_scene("scene-1").await.unwrap();
        mock.delete_playlist("pl-1").await.unwrap();

        assert!(mock.list_scenes().await.unwrap().is_empty());
        assert!(mock.list_playlists().await.unwrap().is_empty());
        assert_eq!(
            mock.write_log(),
            vec!["delete_scene:scene-1", "delete_playlist:pl-1"]
        );
    }

    #[tokio::test]
    async fn playback_controls_record_and_state_reads_answer() {
        let mock = MockController::new().with_playlist(playlist("pl-1"));
        mock.start_playlist("pl-1").await.unwrap();
        mock.stop_playlist().await.unwrap();
        assert_eq!(mock.write_log(), vec!["start_playlist:pl-1", "stop_playlist:"]);

        let state = mock.playlist_state().await.unwrap();
        assert!(!state.running);
        assert!(state.playlist_id.is_none());
    }

    #[tokio::test]
    async fn passthrough_reads_return_store_shapes() {
        let mock = MockController::new();
        let colors = mock.get_colors().await.unwrap();
        assert!(colors.builtin.is_empty() && colors.user.is_empty());

        let devices = mock.list_devices().await.unwrap();
        assert!(devices.get("devices").is_some());
        assert_eq!(mock.write_count(), 0);
    }
}
