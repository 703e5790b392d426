//! The tool surface: one named, schema-described entry point per operation,
//! so an AI tool-calling interface and the CLI dispatch through the same
//! executor.

pub mod handlers;
pub mod params;

use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::controller::Controller;
use crate::error::BridgeError;

use params::{
    ActivateSceneParams, ApplyBlenderParams, CreatePaletteParams, CreateSceneParams,
    PatchPlaylistItemsParams, UpdateSceneParams, UpsertPlaylistParams, ValidateLiteralParams,
};

// ── Dispatch context ────────────────────────────────────────────

/// Shared handler dependencies: the controller connection and the bridge
/// configuration (retry budgets etc.).
pub struct ToolContext<'a> {
    pub controller: &'a dyn Controller,
    pub config: &'a BridgeConfig,
}

// ── Tool metadata and output ────────────────────────────────────

pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Tools that write to the controller. Read-only tools are safe to
    /// retry; mutating ones are not.
    pub mutating: bool,
}

/// Result of executing a tool. `message` serves the LLM/CLI transcript,
/// `data` carries the structured payload.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ToolOutput {
    pub fn new(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    pub fn unit(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Value::Null,
        }
    }
}

/// A catalog entry: metadata + JSON schema for the params.
#[derive(Debug, Clone, Serialize)]
pub struct ToolRegistryEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub mutating: bool,
    pub param_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

fn schema_value<T: schemars::JsonSchema>() -> Value {
    let root = schema_for!(T);
    serde_json::to_value(root).unwrap_or(empty_object_schema())
}

fn de<T: serde::de::DeserializeOwned>(input: &Value) -> Result<T, BridgeError> {
    serde_json::from_value(input.clone())
        .map_err(|e| BridgeError::validation(format!("Invalid tool params: {e}")))
}

// ── define_tools! macro ─────────────────────────────────────────

/// Single source of truth for the tool surface. Generates the `Tool` enum,
/// `Tool::info()`, `Tool::registry_entries()`, `Tool::from_tool_call()`,
/// and `Tool::dispatch()`. Adding a variant causes compiler errors until
/// it is fully handled.
macro_rules! define_tools {
    (
        params {
            $(
                [ $( $pf:ident )? ]
                $pv:ident ( $pp:ty ) => $ph:path, $pn:literal : $pd:literal ;
            )*
        }
        no_params {
            $(
                [ $( $nf:ident )? ]
                $nv:ident => $nh:path, $nn:literal : $nd:literal ;
            )*
        }
    ) => {
        /// Every surface dispatches through the same executor.
        #[derive(Debug, Clone, Deserialize)]
        #[serde(tag = "tool", content = "params")]
        pub enum Tool {
            $( $pv($pp), )*
            $( $nv, )*
        }

        impl Tool {
            pub fn info(&self) -> ToolInfo {
                match self {
                    $( Tool::$pv(_) => ToolInfo {
                        name: $pn,
                        description: $pd,
                        mutating: define_tools!(@has_flag mutating; $($pf)?),
                    }, )*
                    $( Tool::$nv => ToolInfo {
                        name: $nn,
                        description: $nd,
                        mutating: define_tools!(@has_flag mutating; $($nf)?),
                    }, )*
                }
            }

            pub fn registry_entries() -> Vec<ToolRegistryEntry> {
                vec![
                    $( ToolRegistryEntry {
                        name: $pn,
                        description: $pd,
                        mutating: define_tools!(@has_flag mutating; $($pf)?),
                        param_schema: schema_value::<$pp>(),
                    }, )*
                    $( ToolRegistryEntry {
                        name: $nn,
                        description: $nd,
                        mutating: define_tools!(@has_flag mutating; $($nf)?),
                        param_schema: empty_object_schema(),
                    }, )*
                ]
            }

            pub fn from_tool_call(name: &str, input: &Value) -> Result<Tool, BridgeError> {
                match name {
                    $( $pn => Ok(Tool::$pv(de(input)?)), )*
                    $( $nn => Ok(Tool::$nv), )*
                    _ => Err(BridgeError::validation(format!("Unknown tool: {name}"))),
                }
            }

            pub async fn dispatch(
                self,
                ctx: &ToolContext<'_>,
            ) -> Result<ToolOutput, BridgeError> {
                match self {
                    $( Tool::$pv(p) => $ph(ctx, p).await, )*
                    $( Tool::$nv => $nh(ctx).await, )*
                }
            }
        }
    };

    (@has_flag mutating; mutating) => { true };
    (@has_flag mutating;) => { false };
}

// ── Tool definitions ────────────────────────────────────────────

define_tools! {
    params {
        []
        ValidateLiteral(ValidateLiteralParams)
        => handlers::validate_literal, "validate_literal": "Check a hex color or linear-gradient string without touching the controller.";

        [mutating]
        CreatePalette(CreatePaletteParams)
        => handlers::create_palette, "create_palette": "Synthesize an evenly spaced gradient from a color list and store it as a named palette.";

        [mutating]
        CreateScene(CreateSceneParams)
        => handlers::create_scene, "create_scene": "Create a scene, validating any supplied virtual map against live controller state first.";

        [mutating]
        UpdateScene(UpdateSceneParams)
        => handlers::update_scene, "update_scene": "Update scene fields in place. Unsupplied fields keep their current values.";

        [mutating]
        ActivateScene(ActivateSceneParams)
        => handlers::activate_scene, "activate_scene": "Activate a scene on the controller.";

        [mutating]
        UpsertPlaylist(UpsertPlaylistParams)
        => handlers::upsert_playlist, "upsert_playlist": "Create a playlist if absent, otherwise update the supplied fields in place.";

        [mutating]
        PatchPlaylistItems(PatchPlaylistItemsParams)
        => handlers::patch_playlist_items, "patch_playlist_items": "Apply one item operation (append, remove, move, set duration) to a playlist.";

        [mutating]
        ApplyBlender(ApplyBlenderParams)
        => handlers::apply_blender, "apply_blender": "Stand up a verified three-source composite (background, foreground, mask) on a target virtual.";
    }
    no_params {
        [mutating]
        DeleteUserGradients
        => handlers::delete_user_gradients, "delete_user_gradients": "Delete every user-stored gradient, including palettes.";

        [mutating]
        RefreshBlenderScenes
        => handlers::refresh_blender_scenes, "refresh_blender_scenes": "Re-save every scene containing a composite entry, reporting per-scene results.";

        []
        GetServerInfo
        => handlers::get_server_info, "get_server_info": "Get controller version and device summary.";

        []
        ListVirtuals
        => handlers::list_virtuals, "list_virtuals": "List all virtuals with their current effects.";

        []
        ListScenes
        => handlers::list_scenes, "list_scenes": "List all scenes with their virtual maps.";
    }
}

/// Generate the JSON-schema-formatted tool list for an AI tool interface.
pub fn to_json_schema() -> Value {
    Value::Array(
        Tool::registry_entries()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "description": e.description,
                    "input_schema": e.param_schema,
                })
            })
            .collect(),
    )
}

/// Deserialize and execute a tool call in one step.
pub async fn dispatch_tool_call(
    ctx: &ToolContext<'_>,
    name: &str,
    input: &Value,
) -> Result<ToolOutput, BridgeError> {
    Tool::from_tool_call(name, input)?.dispatch(ctx).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::MockController;

    #[test]
    fn every_entry_has_an_object_schema() {
        let entries = Tool::registry_entries();
        assert_eq!(entries.len(), 13);
        for entry in &entries {
            assert!(entry.param_schema.is_object(), "{} schema", entry.name);
        }
    }

    #[test]
    fn unknown_tool_is_a_validation_error() {
        let err = Tool::from_tool_call("launch_fireworks", &Value::Null).unwrap_err();
        assert!(matches!(err, BridgeError::Validation { .. }));
        assert!(err.to_string().contains("launch_fireworks"));
    }

    #[test]
    fn bad_params_name_the_defect() {
        let err =
            Tool::from_tool_call("create_palette", &serde_json::json!({"name": 7})).unwrap_err();
        assert!(err.to_string().contains("Invalid tool params"));
    }

    #[tokio::test]
    async fn dispatch_routes_to_the_handler() {
        let mock = MockController::new();
        let config = BridgeConfig::default();
        let ctx = ToolContext {
            controller: &mock,
            config: &config,
        };

        let out = dispatch_tool_call(
            &ctx,
            "validate_literal",
            &serde_json::json!({"kind": "color", "value": "#aabbcc"}),
        )
        .await
        .unwrap();
        assert_eq!(out.message, "Valid color");

        let err = dispatch_tool_call(
            &ctx,
            "validate_literal",
            &serde_json::json!({"kind": "color", "value": "red"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BridgeError::Validation { .. }));
    }

    #[tokio::test]
    async fn mutating_flag_matches_the_handler_behavior() {
        let mock = MockController::new();
        let config = BridgeConfig::default();
        let ctx = ToolContext {
            controller: &mock,
            config: &config,
        };

        dispatch_tool_call(&ctx, "list_virtuals", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(mock.write_count(), 0);

        let info = Tool::from_tool_call("list_virtuals", &serde_json::json!({}))
            .unwrap()
            .info();
        assert!(!info.mutating);
        let info = Tool::from_tool_call(
            "create_palette",
            &serde_json::json!({"name": "p", "colors": ["#112233"]}),
        )
        .unwrap()
        .info();
        assert!(info.mutating);
    }
}
