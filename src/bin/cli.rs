// CLI binary — panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable, clippy::indexing_slicing)]

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde_json::Value;

use glowlink::config::BridgeConfig;
use glowlink::controller::HttpController;
use glowlink::tools::{self, Tool, ToolContext, ToolOutput};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "glowlink-cli", about = "Glowlink controller bridge CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Controller base URL (overrides config and GLOWLINK_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a hex color string offline
    ValidateColor { value: String },
    /// Check a linear-gradient string offline
    ValidateGradient { value: String },
    /// Palette management
    Palette {
        #[command(subcommand)]
        action: PaletteAction,
    },
    /// Scene management
    Scenes {
        #[command(subcommand)]
        action: SceneAction,
    },
    /// Playlist management
    Playlists {
        #[command(subcommand)]
        action: PlaylistAction,
    },
    /// Three-source composite management
    Blender {
        #[command(subcommand)]
        action: BlenderAction,
    },
    /// List all virtuals with their current effects
    Virtuals,
    /// Get controller version and device summary
    Info,
    /// Print the tool catalog as JSON schemas
    Tools,
}

#[derive(Subcommand)]
enum PaletteAction {
    /// Create a palette from an ordered color list
    Create {
        name: String,
        /// Hex colors, first at 0%, last at 100%
        colors: Vec<String>,
    },
    /// Delete every user gradient, including palettes
    Clear,
}

#[derive(Subcommand)]
enum SceneAction {
    /// List all scenes
    List,
    /// Create a scene from the controller's currently active effects
    Create {
        name: String,
        #[arg(long)]
        tags: Option<String>,
    },
    /// Update scene fields in place
    Update {
        scene_id: String,
        #[arg(long)]
        name: Option<String>,
        /// Set the tags string
        #[arg(long, conflicts_with = "clear_tags")]
        tags: Option<String>,
        /// Clear the tags string
        #[arg(long)]
        clear_tags: bool,
        /// Replace the virtual map with a capture of current state
        #[arg(long)]
        snapshot: bool,
    },
    /// Activate a scene
    Activate { scene_id: String },
}

#[derive(Subcommand)]
enum PlaylistAction {
    /// Create or update a playlist
    Upsert {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// "sequence" or "shuffle"
        #[arg(long)]
        mode: Option<String>,
        /// Default per-item duration in milliseconds
        #[arg(long)]
        duration: Option<u64>,
        /// Comma-separated scene ids replacing the item list
        #[arg(long)]
        scenes: Option<String>,
    },
    /// Append a scene to the item list
    Append {
        playlist_id: String,
        scene_id: String,
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Remove the item at an index
    RemoveIndex { playlist_id: String, index: usize },
    /// Remove the first item referencing a scene
    RemoveScene {
        playlist_id: String,
        scene_id: String,
    },
    /// Move an item to a new index
    Move {
        playlist_id: String,
        index: usize,
        to_index: usize,
    },
    /// Set the duration of the item at an index
    SetDuration {
        playlist_id: String,
        index: usize,
        duration: u64,
    },
}

#[derive(Subcommand)]
enum BlenderAction {
    /// Stand up a composite from a JSON request (see `tools` for the schema)
    Apply {
        /// Full apply_blender params as JSON
        params: String,
    },
    /// Re-save every scene containing a composite entry
    Refresh,
}

// ── Tool call building ───────────────────────────────────────────

fn build_tool_call(cmd: &Commands) -> (&'static str, Value) {
    match cmd {
        Commands::ValidateColor { value } => (
            "validate_literal",
            serde_json::json!({ "kind": "color", "value": value }),
        ),
        Commands::ValidateGradient { value } => (
            "validate_literal",
            serde_json::json!({ "kind": "gradient", "value": value }),
        ),
        Commands::Palette { action } => match action {
            PaletteAction::Create { name, colors } => (
                "create_palette",
                serde_json::json!({ "name": name, "colors": colors }),
            ),
            PaletteAction::Clear => ("delete_user_gradients", serde_json::json!({})),
        },
        Commands::Scenes { action } => match action {
            SceneAction::List => ("list_scenes", serde_json::json!({})),
            SceneAction::Create { name, tags } => (
                "create_scene",
                serde_json::json!({ "name": name, "scene_tags": tags }),
            ),
            SceneAction::Update {
                scene_id,
                name,
                tags,
                clear_tags,
                snapshot,
            } => {
                let mut params = serde_json::json!({
                    "scene_id": scene_id,
                    "snapshot_current": snapshot,
                });
                if let Some(name) = name {
                    params["name"] = Value::String(name.clone());
                }
                // Absent leaves tags alone; null clears them.
                if *clear_tags {
                    params["scene_tags"] = Value::Null;
                } else if let Some(tags) = tags {
                    params["scene_tags"] = Value::String(tags.clone());
                }
                ("update_scene", params)
            }
            SceneAction::Activate { scene_id } => (
                "activate_scene",
                serde_json::json!({ "scene_id": scene_id }),
            ),
        },
        Commands::Playlists { action } => match action {
            PlaylistAction::Upsert {
                id,
                name,
                mode,
                duration,
                scenes,
            } => {
                let scene_ids: Option<Vec<&str>> =
                    scenes.as_deref().map(|s| s.split(',').map(str::trim).collect());
                (
                    "upsert_playlist",
                    serde_json::json!({
                        "id": id,
                        "name": name,
                        "mode": mode,
                        "default_duration_ms": duration,
                        "scene_ids": scene_ids,
                    }),
                )
            }
            PlaylistAction::Append {
                playlist_id,
                scene_id,
                duration,
            } => (
                "patch_playlist_items",
                serde_json::json!({
                    "playlist_id": playlist_id,
                    "op": "append",
                    "scene_id": scene_id,
                    "duration_ms": duration,
                }),
            ),
            PlaylistAction::RemoveIndex { playlist_id, index } => (
                "patch_playlist_items",
                serde_json::json!({
                    "playlist_id": playlist_id,
                    "op": "remove_index",
                    "index": index,
                }),
            ),
            PlaylistAction::RemoveScene {
                playlist_id,
                scene_id,
            } => (
                "patch_playlist_items",
                serde_json::json!({
                    "playlist_id": playlist_id,
                    "op": "remove_scene",
                    "scene_id": scene_id,
                }),
            ),
            PlaylistAction::Move {
                playlist_id,
                index,
                to_index,
            } => (
                "patch_playlist_items",
                serde_json::json!({
                    "playlist_id": playlist_id,
                    "op": "move",
                    "index": index,
                    "to_index": to_index,
                }),
            ),
            PlaylistAction::SetDuration {
                playlist_id,
                index,
                duration,
            } => (
                "patch_playlist_items",
                serde_json::json!({
                    "playlist_id": playlist_id,
                    "op": "set_duration",
                    "index": index,
                    "duration_ms": duration,
                }),
            ),
        },
        Commands::Blender { action } => match action {
            BlenderAction::Apply { params } => {
                let parsed: Value = serde_json::from_str(params).unwrap_or_else(|e| {
                    eprintln!("Error: params is not valid JSON: {e}");
                    process::exit(2);
                });
                ("apply_blender", parsed)
            }
            BlenderAction::Refresh => ("refresh_blender_scenes", serde_json::json!({})),
        },
        Commands::Virtuals => ("list_virtuals", serde_json::json!({})),
        Commands::Info => ("get_server_info", serde_json::json!({})),
        // Tools is handled separately before this function is called
        Commands::Tools => unreachable!(),
    }
}

// ── Output formatting ────────────────────────────────────────────

fn print_output(output: &ToolOutput, raw_json: bool) {
    if raw_json {
        println!(
            "{}",
            serde_json::to_string_pretty(output).unwrap_or_default()
        );
        return;
    }

    println!("{}", output.message);
    match &output.data {
        Value::Null => {}
        Value::String(s) => println!("{s}"),
        data => println!(
            "{}",
            serde_json::to_string_pretty(data).unwrap_or_default()
        ),
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // Catalog printing needs no controller connection.
    if matches!(cli.command, Commands::Tools) {
        println!(
            "{}",
            serde_json::to_string_pretty(&tools::to_json_schema()).unwrap_or_default()
        );
        return;
    }

    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            process::exit(2);
        }),
        None => BridgeConfig::from_env(),
    };
    if let Some(url) = &cli.url {
        config.base_url = url.trim_end_matches('/').to_string();
    }

    let controller = HttpController::new(&config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(2);
    });
    let ctx = ToolContext {
        controller: &controller,
        config: &config,
    };

    let (name, params) = build_tool_call(&cli.command);
    let tool = Tool::from_tool_call(name, &params).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(2);
    });

    match tool.dispatch(&ctx).await {
        Ok(output) => print_output(&output, cli.json),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
