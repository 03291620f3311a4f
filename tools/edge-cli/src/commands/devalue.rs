//! Devalue command - serialize JSON into a script expression.

use anyhow::{Context as _, Result};
use edge_devalue::{Serializer, Value};
use edge_server::{inline_state_script, render_payload};
use tokio::io::AsyncReadExt;

use crate::commands::DevalueArgs;
use crate::context::Context;

/// Execute the devalue command.
pub async fn run(args: DevalueArgs, ctx: &Context) -> Result<()> {
    let input = if args.input == "-" {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("Failed to read stdin")?;
        input
    } else {
        let path = ctx.resolve_path(&args.input);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read input: {}", path.display()))?
    };

    let json: serde_json::Value = serde_json::from_str(&input).context("Input is not valid JSON")?;
    let value = Value::from(json);

    let output = match (&args.global, &args.payload_url) {
        (_, Some(url)) => render_payload(url, &value),
        (global, None) => {
            let mut serializer = Serializer::new();
            let expression = serializer.serialize(&value);
            for warning in serializer.warnings() {
                ctx.output.warn(warning);
            }
            match global {
                Some(global) => inline_state_script(global, &expression),
                None => expression,
            }
        }
    };

    println!("{}", output);
    Ok(())
}
