//! Long-running operation queries

use anyhow::{Context as _, Result};

use super::{Context, print_operation, warn_if_truncated};
use crate::utils::output;

const OPERATION_LIST_FIELDS: &[&str] = &["name", "done", "metadata.verb", "metadata.target"];

/// Handle get-operation
pub fn get(ctx: &Context, operation: &str) -> Result<()> {
    let op = ctx
        .client()?
        .get_operation(operation)
        .with_context(|| format!("Failed to get operation {}", operation))?;
    print_operation(&op, ctx.output)
}

/// Handle list-operations
pub fn list(ctx: &Context) -> Result<()> {
    let response = ctx
        .client()?
        .list_operations()
        .context("Failed to list operations")?;
    warn_if_truncated(&response.next_page_token);

    let items = response
        .operations
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    output::print_list(&items, OPERATION_LIST_FIELDS, ctx.output)
}
