//! Output formatters for CLI commands.
//!
//! Every command renders its result through [`format_output`] so JSON, text
//! and pretty output stay consistent.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::OutputFormat;

/// Format data according to the specified output format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Examples
///
/// ```
/// use mountfs_cli::OutputFormat;
/// use mountfs_cli::formatters::format_output;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Mount {
///     physical_path: String,
///     mount_location: String,
/// }
///
/// let mount = Mount {
///     physical_path: "/srv/base".to_string(),
///     mount_location: "/".to_string(),
/// };
///
/// let output = format_output(&mount, OutputFormat::Json)?;
/// assert!(output.contains("\"mount_location\""));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(data),
        OutputFormat::Text => text::format(data),
        OutputFormat::Pretty => pretty::format(data),
    }
}

/// JSON output formatting.
pub mod json {
    use super::{Result, Serialize};

    /// Format data as JSON with 2-space indentation.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Format data as compact JSON.
    pub fn format_compact<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string(data)?)
    }
}

/// Plain text output formatting.
pub mod text {
    use super::{Result, Serialize};

    /// Format data as plain text.
    ///
    /// Scalars print bare, arrays print one element per line and objects
    /// print `key: value` lines, so the output pipes well into `grep`.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut out = String::new();
        write_value(&mut out, &value, "");
        Ok(out.trim_end().to_string())
    }

    fn write_value(out: &mut String, value: &serde_json::Value, prefix: &str) {
        use serde_json::Value;

        match value {
            Value::Array(items) => {
                for item in items {
                    write_value(out, item, prefix);
                }
            }
            Value::Object(obj) => {
                for (key, val) in obj {
                    let key = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    match val {
                        Value::Array(_) | Value::Object(_) => write_value(out, val, &key),
                        _ => out.push_str(&format!("{key}: {}\n", scalar(val))),
                    }
                }
            }
            _ => {
                out.push_str(&scalar(value));
                out.push('\n');
            }
        }
    }

    fn scalar(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Pretty (human-readable) output formatting.
pub mod pretty {
    use super::{Colorize, Result, Serialize};

    /// Format data as colorized, human-readable output.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        Ok(format_value(&value, 0))
    }

    /// Recursively format a JSON value with colors and indentation.
    fn format_value(value: &serde_json::Value, indent: usize) -> String {
        use serde_json::Value;

        let indent_str = "  ".repeat(indent);
        let next_indent_str = "  ".repeat(indent + 1);

        match value {
            Value::Null => "null".dimmed().to_string(),
            Value::Bool(b) => b.to_string().yellow().to_string(),
            Value::Number(n) => n.to_string().cyan().to_string(),
            Value::String(s) => format!("\"{}\"", s.green()),
            Value::Array(arr) => {
                if arr.is_empty() {
                    return "[]".to_string();
                }

                let mut result = "[\n".to_string();
                for (i, item) in arr.iter().enumerate() {
                    result.push_str(&next_indent_str);
                    result.push_str(&format_value(item, indent + 1));
                    if i < arr.len() - 1 {
                        result.push(',');
                    }
                    result.push('\n');
                }
                result.push_str(&indent_str);
                result.push(']');
                result
            }
            Value::Object(obj) => {
                if obj.is_empty() {
                    return "{}".to_string();
                }

                let mut result = "{\n".to_string();
                for (i, (key, val)) in obj.iter().enumerate() {
                    result.push_str(&next_indent_str);
                    result.push_str(&format!("\"{}\": ", key.blue().bold()));
                    result.push_str(&format_value(val, indent + 1));
                    if i < obj.len() - 1 {
                        result.push(',');
                    }
                    result.push('\n');
                }
                result.push_str(&indent_str);
                result.push('}');
                result
            }
        }
    }
}
