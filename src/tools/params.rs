//! Parameter types for the tool surface. Each mutation operation gets one
//! schema-deriving struct so the dispatcher can hand the catalog to an AI
//! tool-calling interface without manual schema mirroring.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{EffectConfig, PlaylistMode, SceneEntry};

/// Represents a field update that distinguishes "absent" from "null" from
/// "value". Use as `Option<FieldUpdate<T>>` with
/// `#[serde(default, deserialize_with = "field_update_opt::deserialize")]`.
///
/// - `None` (field absent via `#[serde(default)]`) → skip / unchanged
/// - `Some(FieldUpdate::Clear)` (JSON `null`) → clear the field
/// - `Some(FieldUpdate::Set(v))` (JSON value) → set the field
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldUpdate<T> {
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Flatten into the core's `Option<Option<T>>` merge shape.
    pub fn into_option(self) -> Option<T> {
        match self {
            FieldUpdate::Clear => None,
            FieldUpdate::Set(v) => Some(v),
        }
    }
}

/// Serde helper for `Option<FieldUpdate<T>>` fields. Prevents `Option` from
/// swallowing JSON `null` — instead maps it to `Some(FieldUpdate::Clear)`.
pub mod field_update_opt {
    use super::FieldUpdate;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<FieldUpdate<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        FieldUpdate::<T>::deserialize(deserializer).map(Some)
    }
}

// ── Gradient / palette params ────────────────────────────────────

/// Declared kind for a syntax check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    Color,
    Gradient,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ValidateLiteralParams {
    pub kind: LiteralKind,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreatePaletteParams {
    /// Palette name; stored as the user gradient `palette:<name>`.
    pub name: String,
    /// Ordered hex colors, first at 0%, last at 100%.
    pub colors: Vec<String>,
}

// ── Scene params ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateSceneParams {
    pub name: String,
    #[serde(default)]
    pub scene_tags: Option<String>,
    /// Explicit virtual map; omit to let the controller capture the
    /// currently active effects.
    #[serde(default)]
    #[schemars(with = "Option<std::collections::HashMap<String, SceneEntry>>")]
    pub virtuals: Option<IndexMap<String, SceneEntry>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateSceneParams {
    pub scene_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Omit to keep, `null` to clear, string to set.
    #[serde(default, deserialize_with = "field_update_opt::deserialize")]
    pub scene_tags: Option<FieldUpdate<String>>,
    #[serde(default)]
    #[schemars(with = "Option<std::collections::HashMap<String, SceneEntry>>")]
    pub virtuals: Option<IndexMap<String, SceneEntry>>,
    /// Replace the virtual map with a capture of current controller state.
    #[serde(default)]
    pub snapshot_current: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ActivateSceneParams {
    pub scene_id: String,
}

// ── Playlist params ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpsertPlaylistParams {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: Option<PlaylistMode>,
    #[serde(default)]
    pub default_duration_ms: Option<u64>,
    #[serde(default)]
    pub scene_ids: Option<Vec<String>>,
}

/// One item-list operation, tagged by `op`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ItemPatchParams {
    Append {
        scene_id: String,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    RemoveIndex {
        index: usize,
    },
    RemoveScene {
        scene_id: String,
    },
    Move {
        index: usize,
        to_index: usize,
    },
    SetDuration {
        index: usize,
        duration_ms: u64,
    },
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PatchPlaylistItemsParams {
    pub playlist_id: String,
    #[serde(flatten)]
    pub patch: ItemPatchParams,
}

// ── Blender params ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BlenderSourceParams {
    pub virtual_id: String,
    /// Non-composite effect type for this layer.
    #[serde(rename = "type")]
    pub effect_type: String,
    /// Effect config object; gradients may be palette aliases.
    #[serde(default)]
    #[schemars(with = "Value")]
    pub config: EffectConfig,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ApplyBlenderParams {
    pub target_virtual_id: String,
    pub background: BlenderSourceParams,
    pub foreground: BlenderSourceParams,
    pub mask: BlenderSourceParams,
    #[serde(default)]
    pub mask_stretch: Option<String>,
    #[serde(default)]
    pub mask_cutoff: Option<f64>,
    #[serde(default)]
    pub invert_mask: Option<bool>,
    #[serde(default)]
    pub brightness: Option<f64>,
}
