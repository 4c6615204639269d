/// Takeover chat - interactive terminal client
use colored::*;
use std::env;
use takeover_core::client::{ChatClient, ChatEvent};
use takeover_core::types::LastMessage;
use takeover_core::Config;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let (deep_link, args) = extract_deep_link(args)?;
    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let client = ChatClient::new(config);
    client.start();

    if let Err(e) = client.load_conversations().await {
        // Best-effort: start with an empty directory, live updates still flow
        eprintln!("{} Could not load conversations: {}", "✗".red().bold(), e);
    }

    if let Some((listing_id, receiver_id)) = deep_link {
        match client.open_conversation(listing_id, &receiver_id).await {
            Ok(conversation) => {
                println!(
                    "{} Opened conversation about {}",
                    "✓".green().bold(),
                    conversation.listing.title.cyan()
                );
            }
            Err(e) => eprintln!("{} Could not open conversation: {}", "✗".red().bold(), e),
        }
    }

    print_help();
    print_directory(&client).await;

    let mut events = client.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                let Ok(Some(line)) = maybe_line else { break };
                if !handle_line(&client, line.trim()).await {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => handle_event(&client, event).await,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    client.shutdown().await;
    println!("{}", "Bye".dimmed());
    Ok(())
}

/// Pull `--listing <id> --to <user>` out of the argument list; the rest is
/// plain client configuration
fn extract_deep_link(args: Vec<String>) -> anyhow::Result<(Option<(i64, String)>, Vec<String>)> {
    let mut listing_id: Option<i64> = None;
    let mut receiver_id: Option<String> = None;
    let mut rest = Vec::with_capacity(args.len());

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--listing" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--listing requires an id argument"))?;
                listing_id = Some(value.parse()?);
                i += 2;
            }
            "--to" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--to requires a user id argument"))?;
                receiver_id = Some(value.clone());
                i += 2;
            }
            other => {
                rest.push(other.to_string());
                i += 1;
            }
        }
    }

    match (listing_id, receiver_id) {
        (Some(listing), Some(receiver)) => Ok((Some((listing, receiver)), rest)),
        (None, None) => Ok((None, rest)),
        _ => Err(anyhow::anyhow!("--listing and --to must be given together")),
    }
}

/// Returns false when the user asked to quit
async fn handle_line(client: &ChatClient, line: &str) -> bool {
    match line {
        "" => true,
        ":quit" | ":q" => false,
        ":help" => {
            print_help();
            true
        }
        ":list" => {
            print_directory(client).await;
            true
        }
        _ if line.starts_with(":open") => {
            let index = line
                .trim_start_matches(":open")
                .trim()
                .parse::<usize>()
                .unwrap_or(0);
            open_by_index(client, index).await;
            true
        }
        _ if line.starts_with(":new") => {
            let mut parts = line.trim_start_matches(":new").trim().split_whitespace();
            let listing = parts.next().and_then(|s| s.parse::<i64>().ok());
            let receiver = parts.next();
            match (listing, receiver) {
                (Some(listing_id), Some(receiver_id)) => {
                    match client.open_conversation(listing_id, receiver_id).await {
                        Ok(_) => print_thread(client).await,
                        Err(e) => {
                            eprintln!("{} Could not open conversation: {}", "✗".red().bold(), e)
                        }
                    }
                }
                _ => eprintln!("{}", "Usage: :new <listingId> <userId>".yellow()),
            }
            true
        }
        _ if line.starts_with(':') => {
            eprintln!("{} Unknown command: {}", "✗".red().bold(), line.red());
            true
        }
        text => {
            if let Err(e) = client.send_message(text).await {
                eprintln!("{} {}", "✗".red().bold(), e);
            }
            true
        }
    }
}

async fn handle_event(client: &ChatClient, event: ChatEvent) {
    match event {
        ChatEvent::IncomingMessage { conversation_id } => {
            let open = client.thread().conversation_id().await;
            if open == Some(conversation_id) {
                if let Some(message) = client.thread().messages().await.last() {
                    if !message.is_from(&client.config().user_id) {
                        print_message_line(client, message);
                    }
                }
            } else if let Some(entry) = client.directory().get(conversation_id).await {
                println!(
                    "{}",
                    format!(
                        "· new message about {} from {}",
                        entry.conversation.listing.title,
                        entry
                            .conversation
                            .other_participant(&client.config().user_id)
                            .display_name
                    )
                    .dimmed()
                );
            }
        }
        ChatEvent::Notification(record) => {
            let title = record["title"].as_str().unwrap_or("notification");
            println!("{}", format!("· {}", title).dimmed());
        }
        ChatEvent::DirectoryChanged | ChatEvent::ThreadChanged { .. } => {}
    }
}

async fn open_by_index(client: &ChatClient, index: usize) {
    let entries = client.directory().entries().await;
    if index == 0 || index > entries.len() {
        eprintln!("{}", "Usage: :open <n>  (see :list)".yellow());
        return;
    }
    let conversation_id = entries[index - 1].conversation.id;
    client.select_conversation(conversation_id).await;
    print_thread(client).await;
}

fn print_help() {
    println!("{}", "Takeover Messages".bright_cyan().bold());
    println!(
        "  {}        list conversations",
        ":list".cyan()
    );
    println!(
        "  {}    open the n-th conversation",
        ":open <n>".cyan()
    );
    println!(
        "  {}  start a conversation about a listing",
        ":new <listingId> <userId>".cyan()
    );
    println!(
        "  {}        quit; anything else is sent to the open thread",
        ":quit".cyan()
    );
}

async fn print_directory(client: &ChatClient) {
    let entries = client.directory().entries().await;
    let user_id = &client.config().user_id;

    if entries.is_empty() {
        println!("{}", "No conversations yet".yellow());
        return;
    }

    println!(
        "{}",
        format!("Conversations ({})", entries.len())
            .bright_cyan()
            .bold()
    );
    println!("{}", "─".repeat(60).dimmed());
    for (i, entry) in entries.iter().enumerate() {
        let other = entry.conversation.other_participant(user_id);
        let preview = entry
            .last_message
            .as_ref()
            .map(|last| last.preview(40))
            .unwrap_or_else(|| "No messages yet".italic().dimmed().to_string());
        let time = entry
            .last_message
            .as_ref()
            .map(|last| format_time(last))
            .unwrap_or_default();
        println!(
            "  {} {} {} {}",
            format!("{}.", i + 1).bold(),
            entry.conversation.listing.title.cyan(),
            format!("({})", other.display_name).green(),
            time.dimmed()
        );
        println!("     {}", preview);
    }
}

async fn print_thread(client: &ChatClient) {
    let Some(conversation_id) = client.thread().conversation_id().await else {
        return;
    };
    let user_id = client.config().user_id.clone();

    if let Some(entry) = client.directory().get(conversation_id).await {
        let other = entry.conversation.other_participant(&user_id);
        println!(
            "{}",
            format!(
                "── {} · {} ──",
                entry.conversation.listing.title, other.display_name
            )
            .bright_cyan()
            .bold()
        );
    }

    for message in client.thread().messages().await.iter() {
        print_message_line(client, message);
    }
}

fn print_message_line(client: &ChatClient, message: &takeover_core::types::Message) {
    let time = message
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M");
    let marker = if message.pending { "…" } else { " " };
    if message.is_from(&client.config().user_id) {
        println!(
            "  {} {} {}{}",
            time.to_string().dimmed(),
            "me:".green().bold(),
            message.content,
            marker.dimmed()
        );
    } else {
        println!(
            "  {} {} {}",
            time.to_string().dimmed(),
            format!("{}:", message.sender.display_name).cyan().bold(),
            message.content
        );
    }
}

/// Preview timestamps: time of day under 24h, weekday under a week, date
/// otherwise
fn format_time(last: &LastMessage) -> String {
    let local = last.created_at.with_timezone(&chrono::Local);
    let age = chrono::Utc::now().signed_duration_since(last.created_at);
    if age.num_hours() < 24 {
        local.format("%H:%M").to_string()
    } else if age.num_days() < 7 {
        local.format("%a").to_string()
    } else {
        local.format("%b %e").to_string()
    }
}
