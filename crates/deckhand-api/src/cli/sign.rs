//! `deckhand sign`: compute the signature header for a payload.

use std::path::Path;

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use tokio::io::AsyncReadExt;

use deckhand_infra::config::{ConfigOverrides, load_config};
use deckhand_infra::webhook::compute_signature_header;
use deckhand_types::event::SIGNATURE_HEADER;

/// Sign the payload at `file` (or stdin for `-`) with the configured secret.
///
/// The bytes are signed exactly as read, so a trailing newline matters.
pub async fn sign_payload(overrides: &ConfigOverrides, file: &Path, json: bool) -> Result<()> {
    let config = load_config(overrides)
        .await
        .context("failed to load configuration")?;
    let body = read_payload(file).await?;

    let signature = compute_signature_header(config.secret.expose_secret().as_bytes(), &body)?;

    if json {
        println!(
            "{}",
            serde_json::json!({"header": SIGNATURE_HEADER, "value": signature, "bytes": body.len()})
        );
    } else {
        println!("{signature}");
    }

    Ok(())
}

async fn read_payload(file: &Path) -> Result<Vec<u8>> {
    if file == Path::new("-") {
        let mut body = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut body)
            .await
            .context("failed to read payload from stdin")?;
        return Ok(body);
    }

    tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read payload from {}", file.display()))
}
