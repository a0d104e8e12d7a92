//! blueprint-cli: drive a blueprint conversation from the terminal
//!
//! Talks to a running `blueprint-server` over its HTTP API.
//!
//! # Subcommands
//! - `start --idea <text> --email <addr> [--json]`: first blueprint, prints the session id
//! - `message <session> <text> [--json]`          : revise the blueprint
//! - `finalize <session>`                         : render, email, close the session
//! - `status`                                     : show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

/// Completion calls can take a while on the server side.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "blueprint-cli",
    version,
    about = "Generate, revise and deliver website blueprints"
)]
struct Cli {
    /// Blueprint HTTP server URL (overrides BLUEPRINT_HTTP_URL env var)
    #[arg(long, env = "BLUEPRINT_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start a new blueprint conversation
    Start {
        /// The website idea to design for
        #[arg(long)]
        idea: String,

        /// Where the finished blueprint is emailed
        #[arg(long)]
        email: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Send a revision request for an open session
    Message {
        /// Session id returned by `start`
        session: String,

        /// Revision request text
        text: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Render the current blueprint to PDF and email it
    Finalize {
        /// Session id returned by `start`
        session: String,
    },

    /// Show blueprint server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: String,
    pub blueprint: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub reply: String,
    pub blueprint: String,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: Option<String>,
}

/// Human-readable failure line for a non-success response.
pub fn describe_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => match err.kind {
            Some(kind) => format!("server returned {} ({}): {}", status, kind, err.error),
            None => format!("server returned {}: {}", status, err.error),
        },
        Err(_) if body.trim().is_empty() => format!("server returned {}", status),
        Err(_) => format!("server returned {}: {}", status, body.trim()),
    }
}

pub fn format_status(body: &serde_json::Value) -> String {
    format!(
        "Blueprint server: {}\nVersion:          {}\nOpen sessions:    {}\nCompletion:       {}",
        body["status"].as_str().unwrap_or("unknown"),
        body["version"].as_str().unwrap_or("?"),
        body["sessions"]
            .as_u64()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string()),
        body["completion"].as_str().unwrap_or("?"),
    )
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

/// POST `body` to `{server}{route}` and return the raw JSON on success.
fn post(server: &str, route: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let url = format!("{}{}", server, route);

    let resp = match client()?.post(&url).json(&body).send() {
        Ok(r) => r,
        Err(e) => anyhow::bail!("connection failed to {}: {}", url, e),
    };

    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!(describe_failure(status.as_u16(), &text));
    }

    serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("failed to parse response from {}: {}", route, e))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn do_start(server: &str, idea: &str, email: &str, json: bool) -> anyhow::Result<()> {
    let raw = post(
        server,
        "/agent/start",
        serde_json::json!({ "idea": idea, "email": email }),
    )?;
    if json {
        return print_json(&raw);
    }

    let resp: StartResponse = serde_json::from_value(raw)?;
    println!("Session: {}\n", resp.session_id);
    println!("{}", resp.blueprint);
    Ok(())
}

fn do_message(server: &str, session: &str, text: &str, json: bool) -> anyhow::Result<()> {
    let raw = post(
        server,
        "/agent/message",
        serde_json::json!({ "sessionId": session, "message": text }),
    )?;
    if json {
        return print_json(&raw);
    }

    let resp: MessageResponse = serde_json::from_value(raw)?;
    println!("{}", resp.blueprint);
    Ok(())
}

fn do_finalize(server: &str, session: &str) -> anyhow::Result<()> {
    let raw = post(
        server,
        "/agent/finalize",
        serde_json::json!({ "sessionId": session }),
    )?;
    let resp: FinalizeResponse = serde_json::from_value(raw)?;
    println!("{}", resp.message);
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);

    match client()?.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("{}", format_status(&body));
            Ok(())
        }
        Ok(r) => anyhow::bail!("server unhealthy (HTTP {})", r.status()),
        Err(e) => anyhow::bail!("cannot reach {}: {}", url, e),
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Start { idea, email, json } => do_start(&server, &idea, &email, json),
        Commands::Message {
            session,
            text,
            json,
        } => do_message(&server, &session, &text, json),
        Commands::Finalize { session } => do_finalize(&server, &session),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("blueprint-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
