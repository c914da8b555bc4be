use anyhow::Result;
use clap::Parser;
use log::info;
use philomena_search::board::ImageBoard;
use philomena_search::board_clients::philomena::PhilomenaClient;
use philomena_search::command::{CommandHandler, Invocation, Reply};
use philomena_search::config::{AppConfig, StorageKind};
use philomena_search::engine::SearchEngine;
use philomena_search::group_config::GroupConfigStore;
use philomena_search::store::GroupConfigRepo;
use philomena_search::stores::{memory::MemoryGroupConfigRepo, sqlite::SqliteGroupConfigRepo};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const COMMAND_WORDS: &[&str] = &["搜图", "search"];

/// Console stand-in for a chat host: one command per line on stdin.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Group the commands come from. Omit to act as a private chat.
    #[arg(long)]
    group: Option<String>,

    /// Sender's authority level.
    #[arg(long, default_value_t = 0)]
    authority: u8,
}

fn strip_command_word(line: &str) -> &str {
    let line = line.trim();
    COMMAND_WORDS
        .iter()
        .filter_map(|word| line.strip_prefix(word))
        .find(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        .map(str::trim_start)
        .unwrap_or(line)
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Text(text) => println!("{}", text),
        Reply::Image { url, info } => println!("[image] {}\n{}", url, info),
        Reply::Video { url } => println!("[video] {}", url),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(AppConfig::new()?);

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting philomena-search");

    let repo: Arc<dyn GroupConfigRepo> = match config.storage {
        StorageKind::Sqlite => Arc::new(SqliteGroupConfigRepo::new(&config.database_url).await?),
        StorageKind::Memory => Arc::new(MemoryGroupConfigRepo::default()),
    };
    let board: Arc<dyn ImageBoard> = Arc::new(PhilomenaClient::new(&config)?);

    let handler = CommandHandler::new(
        GroupConfigStore::new(repo, config.clone()),
        SearchEngine::new(board, config.clone()),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let invocation = Invocation {
            group_id: cli.group.clone(),
            authority: Some(cli.authority),
            args: strip_command_word(&line).to_string(),
        };
        match handler.handle(&invocation).await {
            Ok(reply) => print_reply(&reply),
            Err(e) => log::error!("Command failed: {}", e),
        }
    }

    info!("philomena-search finished");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::strip_command_word;

    #[test]
    fn strips_leading_command_word() {
        assert_eq!(strip_command_word("搜图 cute, solo"), "cute, solo");
        assert_eq!(strip_command_word("  search --status"), "--status");
        assert_eq!(strip_command_word("search"), "");
        assert_eq!(strip_command_word("searching, cute"), "searching, cute");
        assert_eq!(strip_command_word("cute"), "cute");
    }
}
