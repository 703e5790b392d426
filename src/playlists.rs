//! Playlist upsert and item patching.
//!
//! All item operations are read-modify-write: fetch the current item list
//! fresh, apply exactly one change in memory, write the whole list back.
//! Index checks run against the fresh count and fail the entire operation
//! when out of range, so the remote list is never partially mutated.

use crate::controller::Controller;
use crate::error::BridgeError;
use crate::model::{Playlist, PlaylistItem, PlaylistMode};
use crate::validate;

/// Fallback per-item duration when the caller supplies none.
pub const DEFAULT_ITEM_DURATION_MS: u64 = 5_000;

/// Create-or-update request. On create, `name` and a non-empty `scene_ids`
/// are required; on update, only supplied fields change and unsupplied
/// metadata carries over from the current remote value.
#[derive(Debug, Clone, Default)]
pub struct PlaylistUpsert {
    pub id: String,
    pub name: Option<String>,
    pub mode: Option<PlaylistMode>,
    pub default_duration_ms: Option<u64>,
    /// Full replacement item list, each scene id paired with the playlist's
    /// default duration.
    pub scene_ids: Option<Vec<String>>,
}

/// One item-list operation. Exactly one change per patch call.
#[derive(Debug, Clone)]
pub enum ItemPatch {
    Append {
        scene_id: String,
        duration_ms: Option<u64>,
    },
    RemoveIndex {
        index: usize,
    },
    /// Remove the first item referencing the scene.
    RemoveScene {
        scene_id: String,
    },
    /// Relocate the item at `index` to `to_index`, preserving the relative
    /// order of everything else.
    Move {
        index: usize,
        to_index: usize,
    },
    SetDuration {
        index: usize,
        duration_ms: u64,
    },
}

/// Create the playlist if absent, otherwise update supplied fields in place.
pub async fn upsert_playlist(
    controller: &dyn Controller,
    request: PlaylistUpsert,
) -> Result<Playlist, BridgeError> {
    if request.id.trim().is_empty() {
        return Err(BridgeError::validation("Playlist id must not be empty"));
    }

    match controller.get_playlist(&request.id).await {
        Ok(existing) => update_existing(controller, existing, request).await,
        Err(e) if e.is_not_found() => create_new(controller, request).await,
        Err(e) => Err(e),
    }
}

async fn create_new(
    controller: &dyn Controller,
    request: PlaylistUpsert,
) -> Result<Playlist, BridgeError> {
    let Some(name) = request.name else {
        return Err(BridgeError::validation(format!(
            "Playlist \"{}\" does not exist; creation requires a name",
            request.id
        )));
    };
    let scene_ids = request.scene_ids.unwrap_or_default();
    if scene_ids.is_empty() {
        return Err(BridgeError::validation(format!(
            "Playlist \"{}\" does not exist; creation requires a non-empty scene list",
            request.id
        )));
    }
    validate::ensure_valid(validate::validate_playlist_scene_ids(controller, &scene_ids).await?)?;

    let default_duration_ms = request.default_duration_ms.unwrap_or(DEFAULT_ITEM_DURATION_MS);
    let playlist = Playlist {
        id: request.id,
        name,
        mode: request.mode.unwrap_or(PlaylistMode::Sequence),
        default_duration_ms,
        items: scene_ids
            .into_iter()
            .map(|scene_id| PlaylistItem {
                scene_id,
                duration_ms: default_duration_ms,
            })
            .collect(),
        extra: serde_json::Map::new(),
    };
    controller.create_playlist(&playlist).await?;
    Ok(playlist)
}

async fn update_existing(
    controller: &dyn Controller,
    mut playlist: Playlist,
    request: PlaylistUpsert,
) -> Result<Playlist, BridgeError> {
    if let Some(name) = request.name {
        playlist.name = name;
    }
    if let Some(mode) = request.mode {
        playlist.mode = mode;
    }
    if let Some(duration) = request.default_duration_ms {
        playlist.default_duration_ms = duration;
    }
    if let Some(scene_ids) = request.scene_ids {
        if scene_ids.is_empty() {
            return Err(BridgeError::validation(
                "Playlist scene list replacement must not be empty",
            ));
        }
        validate::ensure_valid(
            validate::validate_playlist_scene_ids(controller, &scene_ids).await?,
        )?;
        playlist.items = scene_ids
            .into_iter()
            .map(|scene_id| PlaylistItem {
                scene_id,
                duration_ms: playlist.default_duration_ms,
            })
            .collect();
    }
    // `playlist.extra` came from the fresh read, so timing config, tags and
    // image references ride along unchanged.
    controller.update_playlist(&playlist).await?;
    Ok(playlist)
}

/// Apply one item operation and write the whole list back.
pub async fn patch_playlist_items(
    controller: &dyn Controller,
    playlist_id: &str,
    patch: ItemPatch,
) -> Result<Playlist, BridgeError> {
    let mut playlist = controller.get_playlist(playlist_id).await.map_err(|e| {
        if e.is_not_found() {
            BridgeError::NotFound {
                what: format!("Playlist \"{playlist_id}\""),
            }
        } else {
            e
        }
    })?;

    apply_patch(controller, &mut playlist, patch).await?;
    controller.update_playlist(&playlist).await?;
    Ok(playlist)
}

async fn apply_patch(
    controller: &dyn Controller,
    playlist: &mut Playlist,
    patch: ItemPatch,
) -> Result<(), BridgeError> {
    let count = playlist.items.len();
    match patch {
        ItemPatch::Append {
            scene_id,
            duration_ms,
        } => {
            validate::ensure_valid(
                validate::validate_playlist_scene_ids(controller, std::slice::from_ref(&scene_id))
                    .await?,
            )?;
            let duration_ms = duration_ms.unwrap_or(playlist.default_duration_ms);
            playlist.items.push(PlaylistItem {
                scene_id,
                duration_ms,
            });
        }
        ItemPatch::RemoveIndex { index } => {
            if index >= count {
                return Err(BridgeError::InvalidIndex {
                    what: "playlist item".to_string(),
                    index,
                });
            }
            playlist.items.remove(index);
        }
        ItemPatch::RemoveScene { scene_id } => {
            let Some(pos) = playlist.items.iter().position(|i| i.scene_id == scene_id) else {
                return Err(BridgeError::NotFound {
                    what: format!("Playlist item for scene \"{scene_id}\""),
                });
            };
            playlist.items.remove(pos);
        }
        ItemPatch::Move { index, to_index } => {
            if index >= count {
                return Err(BridgeError::InvalidIndex {
                    what: "playlist item".to_string(),
                    index,
                });
            }
            if to_index >= count {
                return Err(BridgeError::InvalidIndex {
                    what: "playlist move destination".to_string(),
                    index: to_index,
                });
            }
            let item = playlist.items.remove(index);
            playlist.items.insert(to_index.min(playlist.items.len()), item);
        }
        ItemPatch::SetDuration { index, duration_ms } => {
            let Some(item) = playlist.items.get_mut(index) else {
                return Err(BridgeError::InvalidIndex {
                    what: "playlist item".to_string(),
                    index,
                });
            };
            item.duration_ms = duration_ms;
        }
    }
    Ok(())
}
