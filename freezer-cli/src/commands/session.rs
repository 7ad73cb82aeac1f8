//! Session commands: create, show, list, delete.

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::client::ApiClient;

/// Build the document sent on create.
fn new_document(description: &str, hold_off: Option<i64>) -> Value {
    let mut document = json!({ "description": description });
    if let Some(hold_off) = hold_off {
        document["hold_off"] = json!(hold_off);
    }
    document
}

/// Create a session and print its id.
pub async fn create(client: &ApiClient, description: &str, hold_off: Option<i64>) -> Result<String> {
    let session_id = client
        .create_session(&new_document(description, hold_off))
        .await
        .context("Failed to create session")?;
    println!("{session_id}");
    Ok(session_id)
}

/// Print one session as pretty JSON.
pub async fn show(client: &ApiClient, session_id: &str) -> Result<()> {
    let session = client.get_session(session_id).await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

/// Print one line per session.
pub async fn list(client: &ApiClient, limit: Option<u32>, offset: Option<u32>) -> Result<usize> {
    let sessions = client.list_sessions(limit, offset).await?;

    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(0);
    }

    for session in &sessions {
        let status = if session.status.as_str().is_empty() {
            "idle"
        } else {
            session.status.as_str()
        };
        println!(
            "{}  tag={:<4} status={:<10} jobs={:<3} {}",
            session.session_id,
            session.session_tag,
            status,
            session.jobs.len(),
            session.description
        );
    }
    Ok(sessions.len())
}

/// Delete a session.
pub async fn delete(client: &ApiClient, session_id: &str) -> Result<()> {
    client.delete_session(session_id).await?;
    println!("Deleted session {session_id}");
    Ok(())
}
