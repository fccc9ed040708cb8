//! `deckhand services`: show the resolved service registry.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use deckhand_core::registry::ServiceRegistry;
use deckhand_infra::config::{ConfigOverrides, load_config};

/// Print which service tracks which image, as a table or JSON.
pub async fn list_services(overrides: &ConfigOverrides, json: bool) -> Result<()> {
    let config = load_config(overrides)
        .await
        .context("failed to load configuration")?;
    let registry = ServiceRegistry::new(&config.services);

    if json {
        println!("{}", serde_json::to_string_pretty(&registry_json(&registry))?);
        return Ok(());
    }

    if registry.is_empty() {
        println!();
        println!(
            "  {} No services configured. Add one with: {}",
            style("i").blue().bold(),
            style("SER_<service-id>=<image>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Service").fg(Color::White),
        Cell::new("Image").fg(Color::White),
    ]);

    for (service_id, image) in registry.iter() {
        table.add_row(vec![
            Cell::new(service_id).fg(Color::Cyan),
            Cell::new(image),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} service{} on {}",
        style(registry.len()).bold(),
        if registry.len() == 1 { "" } else { "s" },
        style(&config.docker.host).dim()
    );
    println!();

    Ok(())
}

fn registry_json(registry: &ServiceRegistry) -> serde_json::Value {
    registry
        .iter()
        .map(|(service_id, image)| {
            serde_json::json!({
                "service_id": service_id.as_str(),
                "image": image.as_str(),
            })
        })
        .collect()
}
