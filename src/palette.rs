//! Palette alias resolution and gradient synthesis.
//!
//! A palette is a naming convention, not a stored type: user gradient ids
//! carrying the `palette:` prefix. Aliases resolve to the literal gradient
//! before any write, so the controller only ever sees literals it can
//! render.

use log::debug;

use crate::controller::Controller;
use crate::error::BridgeError;
use crate::gradient;
use crate::model::PALETTE_PREFIX;

/// Resolve a gradient value to a literal the controller can store.
///
/// `palette:<name>` aliases are looked up among user gradients first, then
/// builtins; anything else is treated as a literal and syntax-validated
/// (hex color or linear-gradient).
pub async fn resolve_gradient(
    controller: &dyn Controller,
    value: &str,
) -> Result<String, BridgeError> {
    let value = value.trim();
    if value.starts_with(PALETTE_PREFIX) {
        let store = controller.get_gradients().await?;
        if let Some(literal) = store.user.get(value).or_else(|| store.builtin.get(value)) {
            return Ok(literal.clone());
        }
        return Err(BridgeError::NotFound {
            what: format!("Palette \"{value}\""),
        });
    }
    if value.starts_with('#') {
        gradient::validate_color(value)?;
    } else {
        gradient::validate_gradient(value)?;
    }
    Ok(value.to_string())
}

/// Build a `linear-gradient(90deg, ...)` from an ordered color list, stops
/// spaced evenly by index. A single color yields a two-stop gradient with
/// identical colors at 0% and 100%, so the output always satisfies the
/// two-stop minimum.
pub fn synthesize_gradient(colors: &[String]) -> Result<String, BridgeError> {
    if colors.is_empty() {
        return Err(BridgeError::validation(
            "Palette needs at least one color".to_string(),
        ));
    }
    for color in colors {
        gradient::validate_color(color)?;
    }

    let stops: Vec<String> = if colors.len() == 1 {
        let only = colors.first().map(String::as_str).unwrap_or_default();
        vec![format!("{only} 0%"), format!("{only} 100%")]
    } else {
        let last = colors.len() - 1;
        colors
            .iter()
            .enumerate()
            .map(|(i, color)| {
                let pct = (i as f64) * 100.0 / (last as f64);
                format!("{color} {}%", format_percent(pct))
            })
            .collect()
    };

    Ok(format!("linear-gradient(90deg, {})", stops.join(", ")))
}

/// Format a stop percentage without trailing zeros (50, not 50.00).
fn format_percent(pct: f64) -> String {
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}", pct.round() as i64)
    } else {
        let s = format!("{pct:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Synthesize a palette gradient, validate the synthesized output, and
/// upsert it as the user gradient `palette:<name>`. Returns the literal.
pub async fn create_palette(
    controller: &dyn Controller,
    name: &str,
    colors: &[String],
) -> Result<String, BridgeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BridgeError::validation("Palette name must not be empty"));
    }
    let literal = synthesize_gradient(colors)?;
    // Self-check: the synthesizer's output must pass the same validation as
    // any caller-supplied gradient.
    gradient::validate_gradient(&literal)?;
    let id = format!("{PALETTE_PREFIX}{name}");
    controller.set_gradient(&id, &literal).await?;
    Ok(literal)
}

/// Enumerate all user-gradient identifiers.
pub async fn list_user_gradient_ids(
    controller: &dyn Controller,
) -> Result<Vec<String>, BridgeError> {
    let store = controller.get_gradients().await?;
    Ok(store.user.keys().cloned().collect())
}

/// Delete every user gradient individually (the controller has no bulk
/// delete). Returns the count deleted.
pub async fn delete_all_user_gradients(controller: &dyn Controller) -> Result<usize, BridgeError> {
    let ids = list_user_gradient_ids(controller).await?;
    for id in &ids {
        debug!("deleting user gradient {id}");
        controller.delete_gradient(id).await?;
    }
    Ok(ids.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::MockController;

    fn colors(values: &[&str]) -> Vec<String> {
        values.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn synthesizes_evenly_spaced_stops() {
        let g = synthesize_gradient(&colors(&["#112233", "#445566", "#778899"])).unwrap();
        assert_eq!(
            g,
            "linear-gradient(90deg, #112233 0%, #445566 50%, #778899 100%)"
        );
    }

    #[test]
    fn single_color_duplicates_at_both_ends() {
        let g = synthesize_gradient(&colors(&["#AABBCC"])).unwrap();
        assert_eq!(g, "linear-gradient(90deg, #AABBCC 0%, #AABBCC 100%)");
    }

    #[test]
    fn synthesized_output_passes_validation() {
        for n in 1..=6 {
            let palette: Vec<String> = (0..n).map(|i| format!("#0000{i:02X}")).collect();
            let g = synthesize_gradient(&palette).unwrap();
            assert!(
                crate::gradient::validate_gradient(&g).is_ok(),
                "synthesized gradient failed validation: {g}"
            );
            assert_eq!(g.matches('%').count(), n.max(2));
            assert!(g.contains(" 0%"));
            assert!(g.ends_with("100%)"));
        }
    }

    #[test]
    fn rejects_invalid_input_color() {
        assert!(synthesize_gradient(&colors(&["#112233", "red"])).is_err());
        assert!(synthesize_gradient(&[]).is_err());
    }

    #[tokio::test]
    async fn resolves_user_palette_before_builtin() {
        let mock = MockController::new()
            .with_user_gradient("palette:sunset", "linear-gradient(90deg, #FF0000 0%, #FFAA00 100%)")
            .with_builtin_gradient("palette:sunset", "linear-gradient(90deg, #000000 0%, #FFFFFF 100%)");
        let literal = resolve_gradient(&mock, "palette:sunset").await.unwrap();
        assert!(literal.contains("#FF0000"));
    }

    #[tokio::test]
    async fn missing_palette_is_not_found() {
        let mock = MockController::new();
        let err = resolve_gradient(&mock, "palette:nope").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound { .. }));
        assert!(err.to_string().contains("palette:nope"));
    }

    #[tokio::test]
    async fn literal_values_are_validated_through() {
        let mock = MockController::new();
        let ok = resolve_gradient(&mock, "linear-gradient(90deg, #FF0000 0%, #00FF00 100%)")
            .await
            .unwrap();
        assert!(ok.starts_with("linear-gradient"));
        assert!(resolve_gradient(&mock, "#FF00").await.is_err());
        assert!(
            resolve_gradient(&mock, "linear-gradient(90deg, #FF0000, #00FF00)")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn create_palette_writes_prefixed_user_gradient() {
        let mock = MockController::new();
        let literal = create_palette(&mock, "dusk", &colors(&["#112233", "#445566"]))
            .await
            .unwrap();
        assert!(literal.starts_with("linear-gradient(90deg,"));
        assert_eq!(mock.write_log(), vec!["set_gradient:palette:dusk"]);
    }

    #[tokio::test]
    async fn bulk_delete_counts_individual_deletions() {
        let mock = MockController::new()
            .with_user_gradient("palette:a", "linear-gradient(90deg, #000000 0%, #FFFFFF 100%)")
            .with_user_gradient("custom-g", "linear-gradient(90deg, #111111 0%, #222222 100%)");
        let deleted = delete_all_user_gradients(&mock).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(
            mock.write_log(),
            vec!["delete_gradient:palette:a", "delete_gradient:custom-g"]
        );
    }
}
