//! In-place scene mutation.
//!
//! The controller's only native "update" used to be delete-then-recreate,
//! which leaves the scene permanently gone if the recreate step fails.
//! Everything here is read-modify-write against a fresh fetch: fields not
//! supplied are preserved from the current remote value, never defaulted to
//! empty, and validation failures abort before any write.

use indexmap::IndexMap;
use serde_json::Value;

use crate::controller::Controller;
use crate::error::BridgeError;
use crate::model::{Scene, SceneEntry};
use crate::palette;
use crate::validate;

/// A partial scene update. `None` means "leave unchanged".
///
/// `scene_tags` distinguishes absent (`None`) from clear (`Some(None)`)
/// from set (`Some(Some(v))`).
#[derive(Debug, Clone, Default)]
pub struct SceneUpdate {
    pub name: Option<String>,
    pub scene_tags: Option<Option<String>>,
    pub virtuals: Option<IndexMap<String, SceneEntry>>,
    /// Replace the virtual map with a capture of the controller's currently
    /// active effects. Mutually exclusive with `virtuals`.
    pub snapshot_current: bool,
}

impl SceneUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.scene_tags.is_none()
            && self.virtuals.is_none()
            && !self.snapshot_current
    }
}

/// Update a scene in place. Validates any supplied virtual map first, then
/// issues exactly one update request merged over the freshly fetched
/// current scene.
pub async fn update_scene_in_place(
    controller: &dyn Controller,
    scene_id: &str,
    update: SceneUpdate,
) -> Result<Scene, BridgeError> {
    if update.is_empty() {
        return Err(BridgeError::validation(
            "Scene update has no fields to change",
        ));
    }
    if update.snapshot_current && update.virtuals.is_some() {
        return Err(BridgeError::validation(
            "Scene update cannot both supply a virtual map and snapshot current state",
        ));
    }

    // Fresh read; the merge below must never start from a stale or empty
    // scene body.
    let mut scene = controller.get_scene(scene_id).await.map_err(|e| {
        if e.is_not_found() {
            BridgeError::NotFound {
                what: format!("Scene \"{scene_id}\""),
            }
        } else {
            e
        }
    })?;

    let new_virtuals = if update.snapshot_current {
        Some(snapshot_active_virtuals(controller).await?)
    } else if let Some(mut supplied) = update.virtuals {
        validate::ensure_valid(validate::validate_scene_virtuals(controller, &supplied).await?)?;
        resolve_entry_gradients(controller, &mut supplied).await?;
        Some(supplied)
    } else {
        None
    };

    if let Some(name) = update.name {
        scene.name = name;
    }
    if let Some(tags) = update.scene_tags {
        scene.scene_tags = tags;
    }
    if let Some(virtuals) = new_virtuals {
        scene.virtuals = virtuals;
    }

    controller.update_scene(&scene).await?;
    Ok(scene)
}

/// Create a scene, validating any explicit virtual map first. Without a map
/// the controller captures the currently active effects itself.
pub async fn create_scene_validated(
    controller: &dyn Controller,
    name: &str,
    tags: Option<&str>,
    virtuals: Option<IndexMap<String, SceneEntry>>,
) -> Result<Scene, BridgeError> {
    if name.trim().is_empty() {
        return Err(BridgeError::validation("Scene name must not be empty"));
    }
    let virtuals = match virtuals {
        Some(mut map) => {
            validate::ensure_valid(validate::validate_scene_virtuals(controller, &map).await?)?;
            resolve_entry_gradients(controller, &mut map).await?;
            Some(map)
        }
        None => None,
    };
    controller.create_scene(name, tags, virtuals.as_ref()).await
}

/// Capture the controller's currently active virtuals as a scene map.
async fn snapshot_active_virtuals(
    controller: &dyn Controller,
) -> Result<IndexMap<String, SceneEntry>, BridgeError> {
    let virtuals = controller.list_virtuals().await?;
    let mut map = IndexMap::new();
    for v in virtuals {
        let Some(effect) = v.effect else { continue };
        if !v.active {
            continue;
        }
        map.insert(
            v.id,
            SceneEntry {
                effect_type: Some(effect.effect_type),
                config: effect.config,
                action: None,
                preset: None,
            },
        );
    }
    Ok(map)
}

/// Resolve palette aliases and validate gradient literals inside supplied
/// entry configs, substituting the resolved literal in place.
async fn resolve_entry_gradients(
    controller: &dyn Controller,
    entries: &mut IndexMap<String, SceneEntry>,
) -> Result<(), BridgeError> {
    for (virtual_id, entry) in entries.iter_mut() {
        let Some(Value::String(raw)) = entry.config.get("gradient") else {
            continue;
        };
        let resolved = palette::resolve_gradient(controller, raw)
            .await
            .map_err(|e| {
                BridgeError::validation(format!("Virtual \"{virtual_id}\" gradient: {e}"))
            })?;
        entry
            .config
            .insert("gradient".to_string(), Value::String(resolved));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::Effect;
    use crate::testing::MockController;

    fn scene_with_map() -> Scene {
        let mut virtuals = IndexMap::new();
        virtuals.insert(
            "strip-1".to_string(),
            SceneEntry {
                effect_type: Some("rainbow".to_string()),
                ..SceneEntry::default()
            },
        );
        Scene {
            id: "evening".to_string(),
            name: "Evening".to_string(),
            scene_tags: Some("chill".to_string()),
            virtuals,
        }
    }

    #[tokio::test]
    async fn renaming_preserves_the_virtual_map() {
        let mock = MockController::new()
            .with_virtuals(&["strip-1"])
            .with_effect_types(&["rainbow"])
            .with_scene(scene_with_map());

        let updated = update_scene_in_place(
            &mock,
            "evening",
            SceneUpdate {
                name: Some("Late Evening".to_string()),
                ..SceneUpdate::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Late Evening");
        assert_eq!(updated.scene_tags.as_deref(), Some("chill"));
        assert!(updated.virtuals.contains_key("strip-1"));
        // One in-place update; never delete + recreate.
        assert_eq!(mock.write_log(), vec!["update_scene:evening"]);
    }

    #[tokio::test]
    async fn clearing_tags_is_distinct_from_leaving_them() {
        let mock = MockController::new().with_scene(scene_with_map());
        let updated = update_scene_in_place(
            &mock,
            "evening",
            SceneUpdate {
                scene_tags: Some(None),
                ..SceneUpdate::default()
            },
        )
        .await
        .unwrap();
        assert!(updated.scene_tags.is_none());
    }

    #[tokio::test]
    async fn invalid_virtual_map_blocks_all_writes() {
        let mock = MockController::new()
            .with_virtuals(&["strip-1"])
            .with_effect_types(&["rainbow"])
            .with_scene(scene_with_map());

        let mut virtuals = IndexMap::new();
        virtuals.insert("ghost".to_string(), SceneEntry::default());

        let err = update_scene_in_place(
            &mock,
            "evening",
            SceneUpdate {
                virtuals: Some(virtuals),
                ..SceneUpdate::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BridgeError::Validation { .. }));
        assert!(err.to_string().contains("ghost"));
        assert_eq!(mock.write_count(), 0);
    }

    #[tokio::test]
    async fn missing_scene_is_not_found() {
        let mock = MockController::new();
        let err = update_scene_in_place(
            &mock,
            "nope",
            SceneUpdate {
                name: Some("x".to_string()),
                ..SceneUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn snapshot_captures_only_active_virtuals_with_effects() {
        let mock = MockController::new()
            .with_virtuals(&["strip-1", "strip-2", "strip-3"])
            .with_effect_types(&["rainbow"])
            .with_scene(scene_with_map());
        {
            let mut virtuals = mock.virtuals.lock().unwrap();
            virtuals[0].active = true;
            virtuals[0].effect = Some(Effect {
                effect_type: "rainbow".to_string(),
                config: serde_json::Map::new(),
            });
            // strip-2: active but no effect; strip-3: effect but inactive.
            virtuals[1].active = true;
            virtuals[2].effect = Some(Effect {
                effect_type: "rainbow".to_string(),
                config: serde_json::Map::new(),
            });
        }

        let updated = update_scene_in_place(
            &mock,
            "evening",
            SceneUpdate {
                snapshot_current: true,
                ..SceneUpdate::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.virtuals.len(), 1);
        assert!(updated.virtuals.contains_key("strip-1"));
    }

    #[tokio::test]
    async fn supplied_gradients_are_resolved_before_the_write() {
        let mock = MockController::new()
            .with_virtuals(&["strip-1"])
            .with_effect_types(&["gradient"])
            .with_scene(scene_with_map())
            .with_user_gradient(
                "palette:dusk",
                "linear-gradient(90deg, #112233 0%, #445566 100%)",
            );

        let mut config = serde_json::Map::new();
        config.insert(
            "gradient".to_string(),
            Value::String("palette:dusk".to_string()),
        );
        let mut virtuals = IndexMap::new();
        virtuals.insert(
            "strip-1".to_string(),
            SceneEntry {
                effect_type: Some("gradient".to_string()),
                config,
                ..SceneEntry::default()
            },
        );

        let updated = update_scene_in_place(
            &mock,
            "evening",
            SceneUpdate {
                virtuals: Some(virtuals),
                ..SceneUpdate::default()
            },
        )
        .await
        .unwrap();

        let entry = updated.virtuals.get("strip-1").unwrap();
        assert_eq!(
            entry.config.get("gradient").and_then(Value::as_str),
            Some("linear-gradient(90deg, #112233 0%, #445566 100%)")
        );
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let mock = MockController::new().with_scene(scene_with_map());
        let err = update_scene_in_place(&mock, "evening", SceneUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation { .. }));
        assert_eq!(mock.write_count(), 0);
    }
}
