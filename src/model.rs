//! Wire shapes for the controller's entities. All authoritative state lives
//! on the controller; these types are snapshots valid only for the
//! validation step that read them.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Effect configs are open-ended string-keyed bags whose shape depends on
/// the effect type. Only the narrow subset the bridge's logic depends on
/// (the `gradient` field) is ever validated; the rest passes through opaque.
pub type EffectConfig = serde_json::Map<String, Value>;

/// Effect type of the three-source composite.
pub const BLENDER_EFFECT_TYPE: &str = "blender";

/// Reserved prefix marking a user gradient as a palette.
pub const PALETTE_PREFIX: &str = "palette:";

/// Sentinel preset id that clears an entry back to effect defaults. Never
/// checked against the preset catalogs.
pub const PRESET_RESET: &str = "reset";

// ── Virtuals and effects ─────────────────────────────────────────

/// A typed effect configuration on a virtual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Effect {
    #[serde(rename = "type")]
    pub effect_type: String,
    #[serde(default)]
    pub config: EffectConfig,
}

/// An addressable logical LED output owned by the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Virtual {
    /// Map key on the wire; filled in by the client from the envelope.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub effect: Option<Effect>,
}

impl Virtual {
    /// The effect type currently reported on this virtual, if any.
    pub fn effect_type(&self) -> Option<&str> {
        self.effect.as_ref().map(|e| e.effect_type.as_str())
    }
}

// ── Presets ──────────────────────────────────────────────────────

/// Where a preset is saved. Wire names are the controller's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PresetCategory {
    #[serde(rename = "ledfx_presets")]
    Builtin,
    #[serde(rename = "user_presets")]
    User,
}

impl PresetCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PresetCategory::Builtin => "ledfx_presets",
            PresetCategory::User => "user_presets",
        }
    }

    pub fn all() -> [PresetCategory; 2] {
        [PresetCategory::Builtin, PresetCategory::User]
    }
}

/// A reference to a saved preset, optionally scoped to one category.
/// Unscoped references resolve against either category with no preference.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PresetRef {
    pub preset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<PresetCategory>,
}

/// Preset ids known for one effect type, split by category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetCatalog {
    #[serde(default)]
    pub builtin: Vec<String>,
    #[serde(default)]
    pub user: Vec<String>,
}

impl PresetCatalog {
    pub fn contains(&self, category: PresetCategory, preset_id: &str) -> bool {
        match category {
            PresetCategory::Builtin => self.builtin.iter().any(|p| p == preset_id),
            PresetCategory::User => self.user.iter().any(|p| p == preset_id),
        }
    }

    pub fn contains_any(&self, preset_id: &str) -> bool {
        PresetCategory::all()
            .into_iter()
            .any(|c| self.contains(c, preset_id))
    }
}

// ── Scenes ───────────────────────────────────────────────────────

/// One virtual's captured assignment inside a scene.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SceneEntry {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub effect_type: Option<String>,
    #[serde(default)]
    #[schemars(with = "Value")]
    pub config: EffectConfig,
    /// Controller-defined activation action (e.g. "activate", "ignore").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<PresetRef>,
}

impl SceneEntry {
    /// True when this entry captures the three-source composite effect.
    pub fn is_blender(&self) -> bool {
        self.effect_type.as_deref() == Some(BLENDER_EFFECT_TYPE)
    }
}

/// A named snapshot of effect assignments across virtuals. Entry order is
/// preserved as the controller reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_tags: Option<String>,
    #[serde(default)]
    pub virtuals: IndexMap<String, SceneEntry>,
}

// ── Playlists ────────────────────────────────────────────────────

/// Playback order for a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistMode {
    Sequence,
    Shuffle,
}

/// One timed scene reference inside a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlaylistItem {
    pub scene_id: String,
    pub duration_ms: u64,
}

/// An ordered, timed sequence of scene references.
///
/// `extra` round-trips controller metadata this bridge does not model
/// (timing config, tags, image reference) so in-place updates never drop it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub mode: PlaylistMode,
    pub default_duration_ms: u64,
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Runtime state of playlist playback as the controller reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistState {
    #[serde(default)]
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
}

// ── Color / gradient store ───────────────────────────────────────

/// One half of the color store: builtin entries plus user entries.
/// Values are literal hex colors or gradient strings keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorStore {
    #[serde(default)]
    pub builtin: IndexMap<String, String>,
    #[serde(default)]
    pub user: IndexMap<String, String>,
}
