//! `nbsync schema`: describe resource kinds

use anyhow::{Context as _, Result};
use colored::Colorize;
use declarative::{Presence, Schema, SchemaRegistry};
use serde_json::Value as JsonValue;

use crate::resource;
use crate::ui;

pub fn run(kind: Option<&str>, json: bool) -> Result<()> {
    let registry = resource::registry().schemas();
    let schemas = select(&registry, kind)?;

    if json {
        let doc = JsonValue::Array(schemas.iter().map(|s| s.to_json()).collect());
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).context("Failed to serialize schema")?
        );
        return Ok(());
    }

    for schema in schemas {
        print_schema(schema);
    }
    Ok(())
}

/// One kind, or all of them
fn select<'a>(registry: &'a SchemaRegistry, kind: Option<&str>) -> Result<Vec<&'a Schema>> {
    match kind {
        Some(kind) => Ok(vec![registry.get(kind)?]),
        None => Ok(registry.iter().collect()),
    }
}

fn presence_label(presence: &Presence) -> &'static str {
    match presence {
        Presence::Required => "required",
        Presence::Optional => "optional",
        Presence::Computed => "computed",
        Presence::OptionalComputed => "optional, computed",
    }
}

fn print_schema(schema: &Schema) {
    ui::header(&schema.kind);
    ui::dim(&schema.description);
    println!();

    for attribute in &schema.attributes {
        let mut notes: Vec<String> = vec![presence_label(&attribute.presence).to_string()];
        if let Some(default) = &attribute.default {
            notes.push(format!("default {default}"));
        }
        if attribute.force_new {
            notes.push("forces replacement".to_string());
        }
        notes.extend(attribute.constraints.iter().map(ToString::to_string));

        println!(
            "  {:<18} {:<12} {}",
            attribute.name.bold(),
            attribute.ty.to_string().cyan(),
            notes.join("; ").dimmed()
        );
        if !attribute.description.is_empty() {
            println!("  {:<18} {}", "", attribute.description);
        }
    }

    if !schema.rules.is_empty() {
        println!();
        for rule in &schema.rules {
            ui::kv("rule", &rule.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_one_kind() {
        let registry = resource::registry().schemas();
        let schemas = select(&registry, Some("service")).unwrap();
        assert_eq!(schemas.len(), 1);
        assert!(schemas[0].get("ports").is_some());
    }

    #[test]
    fn test_select_all() {
        let registry = resource::registry().schemas();
        assert_eq!(select(&registry, None).unwrap().len(), 3);
    }

    #[test]
    fn test_select_unknown_kind() {
        let registry = resource::registry().schemas();
        assert!(select(&registry, Some("device")).is_err());
    }

    #[test]
    fn test_json_describes_force_new() {
        let registry = resource::registry().schemas();
        let json = registry.get("service").unwrap().to_json();
        assert_eq!(json["kind"], "service");
        assert!(json["attributes"]["device_id"].is_object());
    }
}
