use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use foliochat::api::ApiClient;
use foliochat::config::Config;
use foliochat::policy::{CacheOptions, RateLimitOptions, RateLimiter, ResponseCache};
use foliochat::session::{ChatSession, SendError, SessionOptions, TranscriptUpdate};
use foliochat::types::ToolResult;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let client = ApiClient::new(&config);
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let mut session = ChatSession::new(client, SessionOptions::from_config(&config))
        .with_rate_limiter(RateLimiter::new(RateLimitOptions::default()))
        .with_cache(ResponseCache::new(CacheOptions::default()))
        .with_update_channel(update_tx);

    let printer = tokio::spawn(print_updates(update_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt().await?;
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "/quit" | "/exit" => break,
            "/new" => session.reset(),
            _ => {
                if let Err(error) = session.send(input).await {
                    match error {
                        SendError::RateLimited { retry_after } => {
                            eprintln!("rate limited, retry in {}s", retry_after.as_secs());
                        }
                        other => eprintln!("{other}"),
                    }
                }
            }
        }
        print_prompt().await?;
    }

    drop(session);
    let _ = printer.await;
    Ok(())
}

async fn print_prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;
    Ok(())
}

async fn print_updates(mut update_rx: mpsc::UnboundedReceiver<TranscriptUpdate>) {
    while let Some(update) = update_rx.recv().await {
        match update {
            TranscriptUpdate::UserMessage(_) | TranscriptUpdate::TurnStarted => {}
            TranscriptUpdate::ContentDelta(delta) => {
                print!("{delta}");
                let _ = std::io::Write::flush(&mut std::io::stdout());
            }
            TranscriptUpdate::ToolResult(result) => print_card(&result),
            TranscriptUpdate::Finalized(_) => println!(),
            TranscriptUpdate::Reset => println!("--- new conversation ---"),
        }
    }
}

fn print_card(result: &ToolResult) {
    match result {
        ToolResult::ProjectRecommendation { projects, reason } => {
            println!();
            for project in projects {
                if project.title.is_empty() {
                    println!("[project] {}", project.id);
                } else {
                    println!("[project] {} - {}", project.id, project.title);
                }
            }
            if !reason.is_empty() {
                println!("  reason: {reason}");
            }
        }
        ToolResult::SkillDetail { skill } => {
            println!();
            if skill.level.is_empty() {
                println!("[skill] {}", skill.name);
            } else {
                println!("[skill] {} ({})", skill.name, skill.level);
            }
        }
        ToolResult::ExperienceDetail { experience } => {
            println!();
            for entry in experience {
                if entry.title.is_empty() {
                    println!("[experience] {}", entry.company);
                } else {
                    println!("[experience] {} - {}", entry.company, entry.title);
                }
            }
        }
    }
}
