//! Session inspection commands.

use anyhow::Context;

use fincoach_protocol::{SessionDeleted, SessionsList};

pub async fn list(backend_url: &str) -> anyhow::Result<()> {
    let list: SessionsList = reqwest::get(format!("{}/sessions", base(backend_url)))
        .await?
        .error_for_status()?
        .json()
        .await
        .context("backend returned an unexpected session list")?;

    if list.sessions.is_empty() {
        println!("no active sessions");
        return Ok(());
    }
    for session in &list.sessions {
        println!(
            "{}  created {}  last active {}",
            session.id,
            session.created_at.as_deref().unwrap_or("-"),
            session.last_active.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

pub async fn delete(backend_url: &str, id: &str) -> anyhow::Result<()> {
    let ack: SessionDeleted = reqwest::Client::new()
        .delete(format!("{}/sessions/{id}", base(backend_url)))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("backend returned an unexpected deletion acknowledgment")?;
    println!("{}", ack.message);
    Ok(())
}

fn base(url: &str) -> &str {
    url.trim_end_matches('/')
}
