//! Derived identifiers and server configuration

use anyhow::{Context as _, Result};
use colored::Colorize;
use serde_json::Value;

use super::Context;
use crate::utils::output::{self, OutputFormat};

/// Handle get-env
pub fn get_env(ctx: &Context) -> Result<()> {
    let report = ctx.environment().report();

    match ctx.output {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Text => {
            let value = serde_json::to_value(&report)?;
            if let Value::Object(fields) = value {
                for (key, field) in &fields {
                    println!("{}: {}", key.bold(), output::cell(Some(field)));
                }
            }
            Ok(())
        }
    }
}

/// Handle get-server-config
pub fn get_server_config(ctx: &Context) -> Result<()> {
    let config = ctx
        .client()?
        .get_server_config()
        .context("Failed to get server config")?;

    if ctx.output == OutputFormat::Json {
        return output::print_json(&config);
    }

    let rows: Vec<Vec<String>> = config
        .valid_versions
        .iter()
        .map(|v| {
            vec![
                v.version.clone(),
                output::cell(v.enabled.map(Value::Bool).as_ref()),
                output::cell(v.end_of_life.map(Value::Bool).as_ref()),
            ]
        })
        .collect();
    println!("{}", output::format_table(&["VERSION", "ENABLED", "END_OF_LIFE"], &rows));
    println!();
    println!(
        "{} {}",
        "Supported Azure regions:".bold(),
        config.supported_azure_regions.join(", ")
    );
    Ok(())
}
