//! Interactive coaching chat.
//!
//! The flow the UI contract requires: obtain a session once at
//! start-up, keep one supervised channel open, refuse submission while
//! not connected, and show channel-layer failures as inline messages
//! without ever taking the loop down.

use std::io::Write as _;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use fincoach_channel::{ChannelConfig, ConnectionState, ReconnectPolicy, Supervisor};
use fincoach_protocol::{ChatRequest, CoachReply, SessionCreated};

use crate::render;

const CONNECT_WAIT: Duration = Duration::from_secs(10);

pub struct ChatOpts {
    pub backend_url: String,
    pub channel_url: String,
    pub one_shot_goal: Option<String>,
}

pub async fn run(opts: ChatOpts) -> anyhow::Result<()> {
    let session = create_session(&opts.backend_url)
        .await
        .context("could not obtain a session from the backend")?;
    info!(
        component = "chat",
        event = "chat.session_created",
        session_id = %session.session_id,
        "Session created"
    );

    let supervisor = Supervisor::start(
        ChannelConfig::new(&opts.channel_url),
        ReconnectPolicy::default(),
    );
    supervisor
        .wait_until_connected(CONNECT_WAIT)
        .await
        .with_context(|| format!("could not reach the coaching channel at {}", opts.channel_url))?;

    if let Some(goal) = opts.one_shot_goal {
        match submit(&supervisor, &session.session_id, &goal).await {
            Ok(rendered) => println!("{rendered}"),
            Err(inline) => println!("! {inline}"),
        }
        supervisor.close().await;
        return Ok(());
    }

    println!("Connected. Describe your financial goal (ctrl-d to quit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        // Fail fast instead of queueing into a dead channel.
        match supervisor.state() {
            ConnectionState::Connected => {}
            state => {
                println!("! cannot send while {state}; wait for the connection to recover");
                continue;
            }
        }

        match submit(&supervisor, &session.session_id, text).await {
            Ok(rendered) => println!("{rendered}"),
            Err(inline) => println!("! {inline}"),
        }
    }

    supervisor.close().await;
    Ok(())
}

/// Send one goal and turn the reply into printable output. Failures
/// come back as the inline message shown to the user.
async fn submit(
    supervisor: &Supervisor,
    session_id: &str,
    text: &str,
) -> Result<String, String> {
    let request = ChatRequest::new(session_id, text);
    let reply = supervisor
        .request(&request)
        .await
        .map_err(|e| e.to_string())?;
    render_reply(&reply)
}

fn render_reply(reply: &CoachReply) -> Result<String, String> {
    if !reply.success {
        return Err(reply.failure_text().to_string());
    }
    match &reply.data {
        Some(plan) => Ok(render::plan(plan)),
        None if !reply.message.is_empty() => Ok(reply.message.clone()),
        None => Err("the backend reported success but sent no plan".to_string()),
    }
}

async fn create_session(backend_url: &str) -> anyhow::Result<SessionCreated> {
    let created = reqwest::Client::new()
        .post(format!("{}/sessions", backend_url.trim_end_matches('/')))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .send()
        .await?
        .error_for_status()?
        .json::<SessionCreated>()
        .await?;
    Ok(created)
}
