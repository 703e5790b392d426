//! Tool handlers. Each translates validated params into a core operation
//! and renders a caller-facing message; no controller logic lives here.

use serde_json::Value;

use crate::blender::{self, BlenderParams, BlenderSource, BlenderSources, RefreshStatus};
use crate::error::BridgeError;
use crate::gradient::{self, SyntaxKind};
use crate::palette;
use crate::playlists::{self, ItemPatch, PlaylistUpsert};
use crate::scenes::{self, SceneUpdate};

use super::params::{
    ActivateSceneParams, ApplyBlenderParams, BlenderSourceParams, CreatePaletteParams,
    CreateSceneParams, FieldUpdate, ItemPatchParams, LiteralKind, PatchPlaylistItemsParams,
    UpdateSceneParams, UpsertPlaylistParams, ValidateLiteralParams,
};
use super::{ToolContext, ToolOutput};

fn to_data<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ── Gradients / palettes ─────────────────────────────────────────

pub async fn validate_literal(
    _ctx: &ToolContext<'_>,
    p: ValidateLiteralParams,
) -> Result<ToolOutput, BridgeError> {
    let kind = match p.kind {
        LiteralKind::Color => SyntaxKind::Color,
        LiteralKind::Gradient => SyntaxKind::Gradient,
    };
    gradient::validate(kind, &p.value)?;
    Ok(ToolOutput::unit(match kind {
        SyntaxKind::Color => "Valid color",
        SyntaxKind::Gradient => "Valid gradient",
    }))
}

pub async fn create_palette(
    ctx: &ToolContext<'_>,
    p: CreatePaletteParams,
) -> Result<ToolOutput, BridgeError> {
    let literal = palette::create_palette(ctx.controller, &p.name, &p.colors).await?;
    Ok(ToolOutput::new(
        format!("Created palette \"{}\"", p.name),
        Value::String(literal),
    ))
}

pub async fn delete_user_gradients(ctx: &ToolContext<'_>) -> Result<ToolOutput, BridgeError> {
    let count = palette::delete_all_user_gradients(ctx.controller).await?;
    Ok(ToolOutput::unit(format!("Deleted {count} user gradients")))
}

// ── Scenes ───────────────────────────────────────────────────────

pub async fn create_scene(
    ctx: &ToolContext<'_>,
    p: CreateSceneParams,
) -> Result<ToolOutput, BridgeError> {
    let scene =
        scenes::create_scene_validated(ctx.controller, &p.name, p.scene_tags.as_deref(), p.virtuals)
            .await?;
    Ok(ToolOutput::new(
        format!("Created scene \"{}\"", scene.name),
        to_data(&scene),
    ))
}

pub async fn update_scene(
    ctx: &ToolContext<'_>,
    p: UpdateSceneParams,
) -> Result<ToolOutput, BridgeError> {
    let update = SceneUpdate {
        name: p.name,
        scene_tags: p.scene_tags.map(FieldUpdate::into_option),
        virtuals: p.virtuals,
        snapshot_current: p.snapshot_current,
    };
    let scene = scenes::update_scene_in_place(ctx.controller, &p.scene_id, update).await?;
    Ok(ToolOutput::new(
        format!("Updated scene \"{}\"", scene.name),
        to_data(&scene),
    ))
}

pub async fn activate_scene(
    ctx: &ToolContext<'_>,
    p: ActivateSceneParams,
) -> Result<ToolOutput, BridgeError> {
    ctx.controller.activate_scene(&p.scene_id).await?;
    Ok(ToolOutput::unit(format!(
        "Activated scene \"{}\"",
        p.scene_id
    )))
}

pub async fn list_scenes(ctx: &ToolContext<'_>) -> Result<ToolOutput, BridgeError> {
    let scenes = ctx.controller.list_scenes().await?;
    Ok(ToolOutput::new(
        format!("{} scenes", scenes.len()),
        to_data(&scenes),
    ))
}

// ── Playlists ────────────────────────────────────────────────────

pub async fn upsert_playlist(
    ctx: &ToolContext<'_>,
    p: UpsertPlaylistParams,
) -> Result<ToolOutput, BridgeError> {
    let playlist = playlists::upsert_playlist(
        ctx.controller,
        PlaylistUpsert {
            id: p.id,
            name: p.name,
            mode: p.mode,
            default_duration_ms: p.default_duration_ms,
            scene_ids: p.scene_ids,
        },
    )
    .await?;
    Ok(ToolOutput::new(
        format!("Playlist \"{}\" now has {} items", playlist.name, playlist.items.len()),
        to_data(&playlist),
    ))
}

pub async fn patch_playlist_items(
    ctx: &ToolContext<'_>,
    p: PatchPlaylistItemsParams,
) -> Result<ToolOutput, BridgeError> {
    let patch = match p.patch {
        ItemPatchParams::Append {
            scene_id,
            duration_ms,
        } => ItemPatch::Append {
            scene_id,
            duration_ms,
        },
        ItemPatchParams::RemoveIndex { index } => ItemPatch::RemoveIndex { index },
        ItemPatchParams::RemoveScene { scene_id } => ItemPatch::RemoveScene { scene_id },
        ItemPatchParams::Move { index, to_index } => ItemPatch::Move { index, to_index },
        ItemPatchParams::SetDuration { index, duration_ms } => {
            ItemPatch::SetDuration { index, duration_ms }
        }
    };
    let playlist = playlists::patch_playlist_items(ctx.controller, &p.playlist_id, patch).await?;
    Ok(ToolOutput::new(
        format!("Playlist \"{}\" now has {} items", playlist.name, playlist.items.len()),
        to_data(&playlist),
    ))
}

// ── Blender ──────────────────────────────────────────────────────

fn into_source(p: BlenderSourceParams) -> BlenderSource {
    BlenderSource {
        virtual_id: p.virtual_id,
        effect_type: p.effect_type,
        config: p.config,
    }
}

pub async fn apply_blender(
    ctx: &ToolContext<'_>,
    p: ApplyBlenderParams,
) -> Result<ToolOutput, BridgeError> {
    let sources = BlenderSources {
        background: into_source(p.background),
        foreground: into_source(p.foreground),
        mask: into_source(p.mask),
    };
    let params = BlenderParams {
        mask_stretch: p.mask_stretch,
        mask_cutoff: p.mask_cutoff,
        invert_mask: p.invert_mask,
        brightness: p.brightness,
    };
    let outcome = blender::apply_blender(
        ctx.controller,
        ctx.config,
        &p.target_virtual_id,
        sources,
        params,
    )
    .await?;
    Ok(ToolOutput::new(
        format!("Composite running on \"{}\"", outcome.target_virtual_id),
        to_data(&outcome),
    ))
}

pub async fn refresh_blender_scenes(ctx: &ToolContext<'_>) -> Result<ToolOutput, BridgeError> {
    let reports = blender::refresh_blender_scenes(ctx.controller).await?;
    let refreshed = reports
        .iter()
        .filter(|r| r.status == RefreshStatus::Refreshed)
        .count();
    let failed = reports.len() - refreshed;
    Ok(ToolOutput::new(
        format!("Refreshed {refreshed} composite scenes ({failed} failed)"),
        to_data(&reports),
    ))
}

// ── Controller info ──────────────────────────────────────────────

pub async fn get_server_info(ctx: &ToolContext<'_>) -> Result<ToolOutput, BridgeError> {
    let info = ctx.controller.server_info().await?;
    Ok(ToolOutput::new("Controller info", info))
}

pub async fn list_virtuals(ctx: &ToolContext<'_>) -> Result<ToolOutput, BridgeError> {
    let virtuals = ctx.controller.list_virtuals().await?;
    Ok(ToolOutput::new(
        format!("{} virtuals", virtuals.len()),
        to_data(&virtuals),
    ))
}
