//! Cross-entity reference validation against freshly read controller state.
//!
//! The controller silently accepts writes that reference nonexistent
//! virtuals, effect types, presets, or scenes. Every mutation primitive
//! calls into this module first and short-circuits on any violation, so no
//! partial write ever reaches the controller on bad input.
//!
//! Read-only by construction: nothing here takes a mutating controller
//! method. Snapshots are fetched once per call (O(1) round trips, not
//! O(entries)); preset catalogs are fetched lazily and cached per effect
//! type within one call.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::controller::Controller;
use crate::error::BridgeError;
use crate::model::{PresetCatalog, SceneEntry, PRESET_RESET};

/// Validate a proposed scene virtual map. Returns the list of violations;
/// empty means proceed. Controller read failures propagate as errors.
pub async fn validate_scene_virtuals(
    controller: &dyn Controller,
    entries: &IndexMap<String, SceneEntry>,
) -> Result<Vec<String>, BridgeError> {
    let virtuals = controller.list_virtuals().await?;
    let schemas = controller.get_effect_schemas().await?;

    let mut violations = Vec::new();
    let mut preset_cache: HashMap<String, PresetCatalog> = HashMap::new();

    for (virtual_id, entry) in entries {
        if !virtuals.iter().any(|v| v.id == *virtual_id) {
            violations.push(format!("Unknown virtual \"{virtual_id}\""));
        }

        let effect_type = entry.effect_type.as_deref();
        let mut type_known = false;
        if let Some(effect_type) = effect_type {
            type_known = schemas.contains_key(effect_type);
            if !type_known {
                violations.push(format!(
                    "Unknown effect type \"{effect_type}\" on virtual \"{virtual_id}\""
                ));
            }
        }

        let Some(preset) = &entry.preset else {
            continue;
        };
        if preset.preset_id == PRESET_RESET {
            continue;
        }
        let Some(effect_type) = effect_type else {
            violations.push(format!(
                "Preset \"{}\" on virtual \"{virtual_id}\" needs an effect type to resolve",
                preset.preset_id
            ));
            continue;
        };
        // An unknown type has no preset catalog to consult; fetching it would
        // turn the already-reported violation into a controller rejection.
        if !type_known {
            continue;
        }

        if !preset_cache.contains_key(effect_type) {
            let fetched = controller.get_presets(effect_type).await?;
            preset_cache.insert(effect_type.to_string(), fetched);
        }
        let Some(catalog) = preset_cache.get(effect_type) else {
            continue;
        };

        match preset.category {
            Some(category) => {
                if !catalog.contains(category, &preset.preset_id) {
                    violations.push(format!(
                        "Preset \"{}\" not found in {} for effect type \"{effect_type}\" \
                         (virtual \"{virtual_id}\")",
                        preset.preset_id,
                        category.as_str()
                    ));
                }
            }
            // Unscoped: a match in either category is accepted, with no
            // preference between them.
            None => {
                if !catalog.contains_any(&preset.preset_id) {
                    violations.push(format!(
                        "Preset \"{}\" not found in any category for effect type \
                         \"{effect_type}\" (virtual \"{virtual_id}\")",
                        preset.preset_id
                    ));
                }
            }
        }
    }

    Ok(violations)
}

/// Validate a playlist's scene-id list against the current scene catalog.
/// All absent ids are reported as one aggregated violation.
pub async fn validate_playlist_scene_ids(
    controller: &dyn Controller,
    scene_ids: &[String],
) -> Result<Vec<String>, BridgeError> {
    let scenes = controller.list_scenes().await?;
    let known: std::collections::HashSet<&str> = scenes.iter().map(|s| s.id.as_str()).collect();

    let missing: Vec<&str> = scene_ids
        .iter()
        .map(String::as_str)
        .filter(|id| !known.contains(id))
        .collect();

    if missing.is_empty() {
        Ok(Vec::new())
    } else {
        Ok(vec![format!("Missing scene IDs: {}", missing.join(", "))])
    }
}

/// Turn a violation list into a single `Validation` error, or Ok when empty.
/// Mutation primitives call this immediately before their write.
pub fn ensure_valid(violations: Vec<String>) -> Result<(), BridgeError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(BridgeError::validation(violations.join("; ")))
    }
}
