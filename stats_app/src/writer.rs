//! Statistics output
//!
//! Sections are collected in order and written either as aligned text or as
//! a JSON object keyed by section title.

use anyhow::Result;
use serde_json::{Map, Value};
use std::io::Write;

/// A named statistic
pub type Item = (String, Value);

/// Build an [`Item`]
pub fn item(name: impl Into<String>, value: impl Into<Value>) -> Item {
    (name.into(), value.into())
}

/// Build an item whose value is a nested list of items
pub fn group(name: impl Into<String>, items: Vec<Item>) -> Item {
    (name.into(), Value::Object(items.into_iter().collect()))
}

/// Format a duration in seconds the way every timing is reported
pub fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}s (wall)")
}

/// Format a byte count in megabytes
pub fn format_memory(bytes: u64) -> String {
    format!("{:.3}M", bytes as f64 / (1024.0 * 1024.0))
}

/// Ordered collection of statistics sections
#[derive(Debug, Default)]
pub struct StatsWriter {
    sections: Map<String, Value>,
}

impl StatsWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section, replacing any earlier one with the same title
    pub fn section(&mut self, title: &str, items: Vec<Item>) {
        let items: Map<String, Value> = items.into_iter().filter(|(name, _)| !name.is_empty()).collect();
        self.sections.insert(title.to_string(), Value::Object(items));
    }

    /// Render as aligned text
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (title, items) in &self.sections {
            out.push_str(&format!("{title} :\n\n"));
            if let Value::Object(items) = items {
                write_items(&mut out, items);
            }
            out.push_str("\n\n");
        }
        out
    }

    /// Render as pretty printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.sections)?)
    }

    /// Write every section to `out`
    pub fn write_to(&self, out: &mut dyn Write, json: bool) -> Result<()> {
        if json {
            writeln!(out, "{}", self.to_json()?)?;
        } else {
            out.write_all(self.to_text().as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }
}

fn column_width(items: &Map<String, Value>) -> usize {
    items.keys().map(String::len).max().unwrap_or(0) + 4
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn write_items(out: &mut String, items: &Map<String, Value>) {
    let width = column_width(items);
    for (name, value) in items {
        match value {
            Value::Object(nested) => {
                let nested_width = column_width(nested);
                out.push_str(&format!("  {name}\n\n"));
                for (nested_name, nested_value) in nested {
                    out.push_str(&format!(
                        "    {nested_name:<nested_width$}{}\n",
                        display(nested_value)
                    ));
                }
                out.push('\n');
            }
            _ => out.push_str(&format!("  {name:<width$}{}\n", display(value))),
        }
    }
}
