//! Rendering of API responses: raw JSON or projected text

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};

/// How command results are printed on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Projected key fields, one row per item for lists
    #[default]
    Text,
    /// The full JSON document as returned by the API
    Json,
}

/// Look up a dotted path such as `controlPlane.vmSize`
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
}

/// Keep only the listed dotted paths, flattened into a single-level object.
/// Missing paths are skipped.
pub fn project(value: &Value, fields: &[&str]) -> Value {
    let mut out = Map::new();
    for field in fields {
        if let Some(found) = lookup(value, field) {
            out.insert((*field).to_string(), found.clone());
        }
    }
    Value::Object(out)
}

/// Render a scalar for a text cell; structured values fall back to compact JSON
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Last segment of a resource name (`projects/p/.../azureClusters/demo` -> `demo`)
pub fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Format rows as left-aligned columns
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(headers.iter().map(|h| h.to_string()).collect())];
    lines.extend(rows.iter().map(|row| render(row.clone())));
    lines.join("\n")
}

/// Print a serializable document as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a document either as JSON or as `key: value` lines for the given fields
pub fn print_document(value: &Value, fields: &[&str], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Text => {
            let projected = project(value, fields);
            for field in fields {
                println!("{}: {}", field.bold(), cell(projected.get(*field)));
            }
            Ok(())
        }
    }
}

/// Print a list either as a JSON array or as a table of the given fields
pub fn print_list(items: &[Value], fields: &[&str], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&items),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", "No resources found".dimmed());
                return Ok(());
            }
            let headers: Vec<String> = fields.iter().map(|f| header_for(f)).collect();
            let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
            let rows: Vec<Vec<String>> = items
                .iter()
                .map(|item| {
                    fields
                        .iter()
                        .map(|field| {
                            let rendered = cell(lookup(item, field));
                            if *field == "name" {
                                short_name(&rendered).to_string()
                            } else {
                                rendered
                            }
                        })
                        .collect()
                })
                .collect();
            println!("{}", format_table(&header_refs, &rows));
            Ok(())
        }
    }
}

/// `controlPlane.vmSize` -> `VM_SIZE`
fn header_for(field: &str) -> String {
    let last = field.rsplit('.').next().unwrap_or(field);
    let mut header = String::new();
    for (i, ch) in last.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            header.push('_');
        }
        header.push(ch.to_ascii_uppercase());
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_dotted_paths() {
        let doc = json!({
            "name": "projects/p/locations/l/azureClusters/demo",
            "state": "RUNNING",
            "controlPlane": {"vmSize": "Standard_DS2_v2", "version": "1.25.5"}
        });
        let projected = project(&doc, &["state", "controlPlane.vmSize", "missing.path"]);
        assert_eq!(
            projected,
            json!({"state": "RUNNING", "controlPlane.vmSize": "Standard_DS2_v2"})
        );
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell(None), "-");
        assert_eq!(cell(Some(&json!(null))), "-");
        assert_eq!(cell(Some(&json!("x"))), "x");
        assert_eq!(cell(Some(&json!(true))), "true");
        assert_eq!(cell(Some(&json!(3))), "3");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("projects/p/locations/l/azureClusters/demo"), "demo");
        assert_eq!(short_name("demo"), "demo");
    }

    #[test]
    fn test_header_for() {
        assert_eq!(header_for("name"), "NAME");
        assert_eq!(header_for("controlPlane.vmSize"), "VM_SIZE");
    }

    #[test]
    fn test_format_table_alignment() {
        let table = format_table(
            &["NAME", "STATE"],
            &[
                vec!["demo".to_string(), "RUNNING".to_string()],
                vec!["a-much-longer-name".to_string(), "-".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "NAME                STATE");
        assert_eq!(lines[1], "demo                RUNNING");
        assert_eq!(lines[2], "a-much-longer-name  -");
    }
}
