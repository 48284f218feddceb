use anyhow::Result;
use clap::{Parser, Subcommand};

mod config;
mod controller;
mod events;
mod prompts;
mod segment;
mod speech;
mod storage;
mod transport;
mod ui;

use config::Config;
use events::{Author, Message};
use storage::{FileSnapshotStore, SnapshotStore};
use ui::App;

#[derive(Parser)]
#[command(name = "agri-advisor")]
#[command(version)]
#[command(about = "Chat advisor for agricultural market opportunities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete the saved conversation
    Reset,
    /// Print the saved conversation
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        None => {
            if !config.has_api_key() {
                println!(
                    "🔑 No Gemini API key found. Set GEMINI_API_KEY or add gemini_api_key to {}",
                    config.advisor_home.join("config.toml").display()
                );
                return Ok(());
            }
            let app = App::new(&config)?;
            app.run().await
        }
        Some(Commands::Reset) => {
            let mut store = FileSnapshotStore::new(&config.advisor_home);
            store.remove()?;
            println!("🧹 Saved conversation cleared ({}).", store.path().display());
            Ok(())
        }
        Some(Commands::History) => print_history(&config),
    }
}

fn print_history(config: &Config) -> Result<()> {
    let store = FileSnapshotStore::new(&config.advisor_home);

    let Some(raw) = store.get()? else {
        println!("📭 No saved conversation yet. Run 'agri-advisor' to start one!");
        return Ok(());
    };

    match serde_json::from_str::<Vec<Message>>(&raw) {
        Ok(messages) if !messages.is_empty() => {
            for message in messages {
                let who = match message.author {
                    Author::User => "You",
                    Author::Bot => "Advisor",
                };
                println!("[{}] {}:", message.timestamp.format("%Y-%m-%d %H:%M"), who);
                println!("{}\n", message.text);
            }
            Ok(())
        }
        _ => {
            println!("📭 Saved conversation is empty or unreadable.");
            Ok(())
        }
    }
}
