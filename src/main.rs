use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;

mod app;
mod attachment;
mod config;
mod dictation;
mod error;
mod export;
mod format;
mod gemini;
mod handler;
mod input;
mod mode;
mod state;
mod tui;
mod ui;

use app::App;
use attachment::ImageAttachment;
use config::Config;
use dictation::Dictation;
use error::SearchError;
use gemini::{Content, GeminiClient};
use mode::Mode;

#[derive(Parser)]
#[command(name = "grounded-search")]
#[command(version, about = "Ask Gemini questions with answers grounded in Google Search")]
struct Cli {
    /// Mode to start in: text, image or conversation
    #[arg(short, long)]
    mode: Option<String>,
    /// Gemini model to use
    #[arg(long)]
    model: Option<String>,
    /// Image to attach on startup (switches to image mode)
    #[arg(short, long)]
    image: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the grounded answer
    Ask {
        /// Your question
        question: String,
        /// Image to ask about
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Gemini model to use
        #[arg(long)]
        model: Option<String>,
    },
}

fn init_logging() -> Result<()> {
    let log_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?
        .join("grounded-search");
    fs::create_dir_all(&log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("grounded-search.log"))?;

    // The terminal belongs to the TUI, so logs go to a file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn build_client(config: &Config, model: &str) -> Option<GeminiClient> {
    config
        .api_key()
        .map(|key| GeminiClient::new(&key, model, &config.api_base()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Could not load config, using defaults: {}", e);
        Config::new()
    });

    match cli.command {
        Some(Commands::Ask { question, image, model }) => {
            let model = model.or(cli.model).unwrap_or_else(|| config.model());
            ask(&config, &model, &question, image.as_deref()).await
        }
        None => {
            let mode = match cli.mode.as_deref() {
                Some(name) => Mode::from_str(name)
                    .ok_or_else(|| anyhow!("Unknown mode '{}' (use text, image or conversation)", name))?,
                None => config.mode(),
            };
            let model = cli.model.unwrap_or_else(|| config.model());
            run_tui(&config, mode, model, cli.image).await
        }
    }
}

async fn run_tui(config: &Config, mode: Mode, model: String, image: Option<PathBuf>) -> Result<()> {
    let client = build_client(config, &model);
    if client.is_none() {
        log::warn!("No Gemini API key found in GEMINI_API_KEY, API_KEY or the config file");
    }
    let dictation = config
        .dictation_command
        .as_deref()
        .and_then(Dictation::from_command);

    let mut app = App::new(mode, model, client, dictation);
    if let Some(path) = image {
        app.set_mode(Mode::Image);
        app.attach_image(&path)?;
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    log::info!("Started in {} mode with {}", app.mode.as_str(), app.model);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event).await?;
            app.poll_tasks().await;
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn ask(config: &Config, model: &str, question: &str, image: Option<&std::path::Path>) -> Result<()> {
    let Some(client) = build_client(config, model) else {
        eprintln!("{}", SearchError::ApiKey.to_string().red());
        std::process::exit(1);
    };

    let contents = match image {
        Some(path) => {
            let attachment = ImageAttachment::from_path(path)?;
            vec![Content::user_with_image(question, attachment.to_inline_data().await?)]
        }
        None => vec![Content::user_text(question)],
    };

    println!("{} {}", "🔎".blue(), format!("Asking {}...", client.model()).dimmed());

    let answer = match client.generate(&contents).await {
        Ok(answer) => answer,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            std::process::exit(1);
        }
    };

    println!();
    println!("{}", format::to_ansi(&format::parse(&answer.text)));

    if !answer.sources.is_empty() {
        println!("\n{}", "Sources".bold().magenta());
        for (i, source) in answer.sources.iter().enumerate() {
            println!("  {}. {}", i + 1, source.title.bright_blue().bold());
            println!("     {}", source.uri.dimmed());
        }
    }

    Ok(())
}
