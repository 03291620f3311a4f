//! CLI command implementations.

pub mod deps;
pub mod devalue;
pub mod render;

use clap::{Args, ValueEnum};

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Render tree in JSON.
    pub tree: String,

    /// Client manifest path. Defaults to `manifest` in the config file.
    #[arg(short, long)]
    pub manifest: Option<String>,

    /// Request URL. A static payload URL answers with JSONP.
    #[arg(short, long, default_value = "/")]
    pub url: String,

    /// JSON document handed to the client as state.
    #[arg(long)]
    pub payload: Option<String>,

    /// Serve the client-only shell.
    #[arg(long)]
    pub spa: bool,

    /// Stream the application markup in chunks instead of a full document.
    #[arg(long)]
    pub stream: bool,

    /// Streamed chunk size in bytes.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Cache components across repeated renders.
    #[arg(long)]
    pub cache: bool,

    /// Render the page this many times.
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,

    /// Write the body to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// How resolved dependencies are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DepsFormat {
    /// Grouped resource list.
    Summary,
    /// The link and script tags a page would carry.
    Links,
    Json,
}

/// Arguments for the deps command.
#[derive(Args)]
pub struct DepsArgs {
    /// Module ids to resolve.
    pub modules: Vec<String>,

    /// Client manifest path. Defaults to `manifest` in the config file.
    #[arg(short, long)]
    pub manifest: Option<String>,

    /// URL prefix for client assets.
    #[arg(long)]
    pub public_path: Option<String>,

    /// Resolve the modules alone, without the manifest entrypoints.
    #[arg(long)]
    pub no_entries: bool,

    #[arg(short, long, value_enum, default_value_t = DepsFormat::Summary)]
    pub format: DepsFormat,
}

/// Arguments for the devalue command.
#[derive(Args)]
pub struct DevalueArgs {
    /// JSON input file, or `-` for stdin.
    #[arg(default_value = "-")]
    pub input: String,

    /// Wrap the expression in an inline state script for this global.
    #[arg(long, conflicts_with = "payload_url")]
    pub global: Option<String>,

    /// Wrap the expression in a JSONP payload for this URL.
    #[arg(long)]
    pub payload_url: Option<String>,
}
