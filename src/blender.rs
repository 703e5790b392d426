//! Three-source composite ("blender") orchestration.
//!
//! The controller acknowledges effect writes before its internal
//! reconciliation has applied them, so a composite written immediately
//! after its sources can reference virtuals that are not actually
//! configured yet. Each step here is verified by re-reading the virtual
//! until it reports the expected effect type, within a bounded retry
//! budget. The composite is only written once all three sources confirm;
//! confirmed source writes are not rolled back on a later failure.

use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::controller::Controller;
use crate::error::BridgeError;
use crate::model::{Effect, EffectConfig, SceneEntry, BLENDER_EFFECT_TYPE};
use crate::palette;
use crate::scenes::{self, SceneUpdate};
use crate::validate;

// ── Request types ────────────────────────────────────────────────

/// One source layer: which virtual, and what effect to put on it.
#[derive(Debug, Clone)]
pub struct BlenderSource {
    pub virtual_id: String,
    pub effect_type: String,
    pub config: EffectConfig,
}

/// The three source layers by role.
#[derive(Debug, Clone)]
pub struct BlenderSources {
    pub background: BlenderSource,
    pub foreground: BlenderSource,
    pub mask: BlenderSource,
}

impl BlenderSources {
    /// Fixed application order, kept as observed against the controller:
    /// background, foreground, mask.
    fn ordered(&self) -> [(&'static str, &BlenderSource); 3] {
        [
            ("background", &self.background),
            ("foreground", &self.foreground),
            ("mask", &self.mask),
        ]
    }

    fn ordered_mut(&mut self) -> [(&'static str, &mut BlenderSource); 3] {
        [
            ("background", &mut self.background),
            ("foreground", &mut self.foreground),
            ("mask", &mut self.mask),
        ]
    }
}

/// Caller-tunable knobs merged into the composite's config.
#[derive(Debug, Clone, Default)]
pub struct BlenderParams {
    pub mask_stretch: Option<String>,
    pub mask_cutoff: Option<f64>,
    pub invert_mask: Option<bool>,
    pub brightness: Option<f64>,
}

/// What a successful composition touched. Callers capturing a scene
/// afterwards must keep these virtuals active.
#[derive(Debug, Clone, Serialize)]
pub struct BlenderOutcome {
    pub target_virtual_id: String,
    pub source_virtual_ids: Vec<String>,
}

// ── Orchestrator ─────────────────────────────────────────────────

/// Stand up a three-source composite on `target_virtual_id`.
///
/// All structural and reference validation happens before the first write;
/// each source write is verified by polling before the next begins; the
/// composite is written last and verified the same way.
pub async fn apply_blender(
    controller: &dyn Controller,
    config: &BridgeConfig,
    target_virtual_id: &str,
    mut sources: BlenderSources,
    params: BlenderParams,
) -> Result<BlenderOutcome, BridgeError> {
    validate_sources(controller, target_virtual_id, &sources).await?;

    // Resolve palette aliases and validate gradient literals in every
    // source config before anything is written.
    for (role, source) in sources.ordered_mut() {
        if let Some(Value::String(raw)) = source.config.get("gradient") {
            let resolved = palette::resolve_gradient(controller, raw).await.map_err(|e| {
                BridgeError::validation(format!("{role} source gradient: {e}"))
            })?;
            source
                .config
                .insert("gradient".to_string(), Value::String(resolved));
        }
    }

    // Configure and confirm each source in fixed order. A source that never
    // confirms aborts the whole composition; the composite is never written
    // over unconfirmed sources.
    for (role, source) in sources.ordered() {
        let step = format!("{role} source (virtual \"{}\")", source.virtual_id);
        let effect = Effect {
            effect_type: source.effect_type.clone(),
            config: source.config.clone(),
        };
        controller.set_virtual_effect(&source.virtual_id, &effect).await?;
        controller.set_virtual_active(&source.virtual_id, true).await?;
        confirm_effect(controller, config, &step, &source.virtual_id, &source.effect_type).await?;
    }

    let composite = Effect {
        effect_type: BLENDER_EFFECT_TYPE.to_string(),
        config: composite_config(&sources, &params),
    };
    controller.set_virtual_effect(target_virtual_id, &composite).await?;
    controller.set_virtual_active(target_virtual_id, true).await?;
    confirm_effect(
        controller,
        config,
        &format!("composite (virtual \"{target_virtual_id}\")"),
        target_virtual_id,
        BLENDER_EFFECT_TYPE,
    )
    .await?;

    Ok(BlenderOutcome {
        target_virtual_id: target_virtual_id.to_string(),
        source_virtual_ids: sources
            .ordered()
            .iter()
            .map(|(_, s)| s.virtual_id.clone())
            .collect(),
    })
}

/// Pre-write structural and reference checks. Rejects before any mutation.
async fn validate_sources(
    controller: &dyn Controller,
    target_virtual_id: &str,
    sources: &BlenderSources,
) -> Result<(), BridgeError> {
    let mut violations = Vec::new();

    let ordered = sources.ordered();
    for (role, source) in &ordered {
        if source.virtual_id.trim().is_empty() {
            violations.push(format!("{role} source needs a virtual id"));
        }
        if source.effect_type.trim().is_empty() {
            violations.push(format!("{role} source needs an effect type"));
        }
        // No nesting: a composite source would reference virtuals of its
        // own that this orchestrator never verified.
        if source.effect_type == BLENDER_EFFECT_TYPE {
            violations.push(format!(
                "{role} source must not itself be a {BLENDER_EFFECT_TYPE} effect"
            ));
        }
        if source.virtual_id == target_virtual_id {
            violations.push(format!(
                "{role} source cannot reuse the composite target \"{target_virtual_id}\""
            ));
        }
    }

    for (i, (role_a, a)) in ordered.iter().enumerate() {
        for (role_b, b) in ordered.iter().skip(i + 1) {
            if a.virtual_id == b.virtual_id {
                violations.push(format!(
                    "{role_a} and {role_b} sources reuse virtual \"{}\"",
                    a.virtual_id
                ));
            }
        }
    }

    let virtuals = controller.list_virtuals().await?;
    let schemas = controller.get_effect_schemas().await?;
    if !virtuals.iter().any(|v| v.id == target_virtual_id) {
        violations.push(format!("Unknown target virtual \"{target_virtual_id}\""));
    }
    // The composite effect itself must exist on this controller; otherwise
    // the source writes would all land and the operation would only fail at
    // the final confirm.
    if !schemas.contains_key(BLENDER_EFFECT_TYPE) {
        violations.push(format!(
            "Controller has no \"{BLENDER_EFFECT_TYPE}\" effect type; composites are unsupported"
        ));
    }
    for (role, source) in &ordered {
        if !virtuals.iter().any(|v| v.id == source.virtual_id) {
            violations.push(format!(
                "Unknown virtual \"{}\" for {role} source",
                source.virtual_id
            ));
        }
        if !source.effect_type.is_empty() && !schemas.contains_key(&source.effect_type) {
            violations.push(format!(
                "Unknown effect type \"{}\" for {role} source",
                source.effect_type
            ));
        }
    }

    validate::ensure_valid(violations)
}

fn composite_config(sources: &BlenderSources, params: &BlenderParams) -> EffectConfig {
    let mut config = EffectConfig::new();
    config.insert(
        "background".to_string(),
        Value::String(sources.background.virtual_id.clone()),
    );
    config.insert(
        "foreground".to_string(),
        Value::String(sources.foreground.virtual_id.clone()),
    );
    config.insert(
        "mask".to_string(),
        Value::String(sources.mask.virtual_id.clone()),
    );
    if let Some(stretch) = &params.mask_stretch {
        config.insert("mask_stretch".to_string(), Value::String(stretch.clone()));
    }
    if let Some(cutoff) = params.mask_cutoff {
        if let Some(n) = serde_json::Number::from_f64(cutoff) {
            config.insert("mask_cutoff".to_string(), Value::Number(n));
        }
    }
    if let Some(invert) = params.invert_mask {
        config.insert("invert_mask".to_string(), Value::Bool(invert));
    }
    if let Some(brightness) = params.brightness {
        if let Some(n) = serde_json::Number::from_f64(brightness) {
            config.insert("brightness".to_string(), Value::Number(n));
        }
    }
    config
}

/// Poll until the virtual reports the expected effect type, or the retry
/// budget is exhausted. The write acknowledgement alone proves nothing:
/// the controller applies effects asynchronously.
async fn confirm_effect(
    controller: &dyn Controller,
    config: &BridgeConfig,
    step: &str,
    virtual_id: &str,
    expected_type: &str,
) -> Result<(), BridgeError> {
    let attempts = config.poll_attempts.max(1);
    for attempt in 1..=attempts {
        let current = controller.get_virtual(virtual_id).await?;
        if current.effect_type() == Some(expected_type) {
            debug!("{step}: confirmed \"{expected_type}\" after {attempt} poll(s)");
            return Ok(());
        }
        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
        }
    }
    Err(BridgeError::precondition(
        step,
        format!(
            "virtual \"{virtual_id}\" did not report effect \"{expected_type}\" \
             within {attempts} polls"
        ),
    ))
}

// ── Batch scene refresh ──────────────────────────────────────────

/// Per-scene outcome of a batch refresh.
#[derive(Debug, Clone, Serialize)]
pub struct SceneRefreshReport {
    pub scene_id: String,
    pub name: String,
    pub status: RefreshStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    Refreshed,
    Failed,
}

/// Re-write every scene that captures a composite entry, in place, through
/// the same validation as a manual update. The failure unit is one scene:
/// a bad scene is reported and the batch continues.
pub async fn refresh_blender_scenes(
    controller: &dyn Controller,
) -> Result<Vec<SceneRefreshReport>, BridgeError> {
    let catalog = controller.list_scenes().await?;
    let mut reports = Vec::new();

    for scene in catalog {
        if !scene.virtuals.values().any(SceneEntry::is_blender) {
            continue;
        }
        let update = SceneUpdate {
            virtuals: Some(scene.virtuals.clone()),
            ..SceneUpdate::default()
        };
        match scenes::update_scene_in_place(controller, &scene.id, update).await {
            Ok(_) => reports.push(SceneRefreshReport {
                scene_id: scene.id,
                name: scene.name,
                status: RefreshStatus::Refreshed,
                error: None,
            }),
            Err(e) => {
                warn!("refresh of scene \"{}\" failed: {e}", scene.id);
                reports.push(SceneRefreshReport {
                    scene_id: scene.id,
                    name: scene.name,
                    status: RefreshStatus::Failed,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    Ok(reports)
}
