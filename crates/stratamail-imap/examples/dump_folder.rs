#![allow(clippy::expect_used, clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: dump message summaries of one folder
//!
//! Connects with implicit TLS, logs in, selects a folder read-only and
//! prints one line per message, fetching in batches.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=stratamail_imap=debug cargo run --package stratamail-imap --example dump_folder
//! ```
//!
//! Extra fetch items can be passed as arguments, for example `X-GM-MSGID`
//! on Gmail.

use std::io::{self, Write};

use anyhow::Context;
use stratamail_imap::{
    Config, FetchOptions, ImapClient, ParseFailures, SequenceRange, DEFAULT_BATCH_SIZE,
    uid_batches,
};
use tracing_subscriber::EnvFilter;

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stratamail_imap=debug")),
        )
        .init();

    let extension_names: Vec<String> = std::env::args().skip(1).collect();
    let extension_names: Vec<&str> = extension_names.iter().map(String::as_str).collect();

    let host = prompt("IMAP host")?;
    let username = prompt("Username")?;
    let password = prompt("Password")?;
    let mut folder_name = prompt("Folder [INBOX]")?;
    if folder_name.is_empty() {
        folder_name = "INBOX".to_string();
    }

    let config = Config::new(host);
    println!("\nConnecting to {}:{}...", config.host, config.port);
    let client = ImapClient::connect(&config)
        .await
        .context("connecting to server")?;
    let client = client
        .login(&username, &password)
        .await
        .context("logging in")?;
    println!("✓ Authenticated");

    let (mut client, folder) = client
        .examine(&folder_name)
        .await
        .with_context(|| format!("opening {folder_name}"))?;
    println!(
        "✓ {}: {} messages, {} recent, uid validity {:?}\n",
        folder.name,
        folder.exists,
        folder.recent,
        folder.known_uid_validity()
    );

    let uids = client.fetch_uids(SequenceRange::all(), false).await?;
    let mut failures = ParseFailures::new();

    for range in uid_batches(&uids, DEFAULT_BATCH_SIZE) {
        let messages = client
            .fetch_messages(range, FetchOptions::all(), &extension_names, Some(&mut failures))
            .await?;

        for message in messages {
            let from = message
                .from
                .as_ref()
                .map_or_else(|| "(unknown)".to_string(), ToString::to_string);
            let date = message
                .timestamp
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
            println!(
                "{:>8}  {}  {:<40}  {}  ({} parts)",
                message.uid,
                date,
                from,
                message.subject,
                message.body_parts.len()
            );
            for (name, value) in &message.extension_parameters {
                println!("          {name} = {value:?}");
            }
        }
    }

    if !failures.is_empty() {
        println!("\n{} entries could not be parsed:", failures.len());
        for failure in failures.drain() {
            println!("  {}: {}", failure.error, failure.line);
        }
    }

    client.logout().await?;
    println!("\n✓ Logged out");
    Ok(())
}
