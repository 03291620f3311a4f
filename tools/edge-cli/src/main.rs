//! Edge CLI - Command line tool for the edge streaming render engine.
//!
//! Commands:
//! - `edge render` - Render a page from a manifest and a JSON tree
//! - `edge deps` - Resolve and print the dependencies of modules
//! - `edge devalue` - Serialize JSON into a script expression

mod commands;
mod config;
mod context;
mod output;
mod tree;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{DepsArgs, DevalueArgs, RenderArgs};

/// Edge CLI - Render pages and inspect client manifests
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a page from a client manifest and a JSON render tree
    Render(RenderArgs),

    /// Resolve the dependencies of modules against a client manifest
    Deps(DepsArgs),

    /// Serialize a JSON document as a script expression
    Devalue(DevalueArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    let result = match cli.command {
        Commands::Render(args) => commands::render::run(args, &ctx).await,
        Commands::Deps(args) => commands::deps::run(args, &ctx).await,
        Commands::Devalue(args) => commands::devalue::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
