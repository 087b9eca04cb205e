//! `ask` - send one message to a chat web app and print the reply.

use anyhow::{bail, Context, Result};
use chatdrive_browser::{ChatMessage, ChromiumFactory, Completion, Session, SessionOptions};
use chatdrive_common::logging::init_logging_with_exclusions;
use chatdrive_common::util::parse_duration;
use chatdrive_common::{Config, DelayRange, TypingMode};
use clap::Parser;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shortest per-character delay when `--type-speed` is given.
const MIN_CHAR_DELAY_SECS: f64 = 0.001;

#[derive(Parser, Debug)]
#[command(name = "ask")]
#[command(version)]
#[command(about = "Send a message to a chat web app through a real browser and print the reply.", long_about = None)]
struct Cli {
    /// Message text. Read from stdin when stdin is not a terminal.
    text: Option<String>,

    /// Show the browser window
    #[arg(long)]
    no_headless: bool,

    /// Maximum delay between typed characters, in seconds
    #[arg(long, value_name = "SECS")]
    type_speed: Option<f64>,

    /// Browser user data directory
    #[arg(long, value_name = "DIR")]
    profile: Option<String>,

    /// Instructions prepended to the message
    #[arg(long)]
    prompt: Option<String>,

    /// Continue an existing conversation
    #[arg(long, value_name = "UUID")]
    conversation: Option<String>,

    /// Give up waiting for the reply after this long (e.g. 30s, 5m)
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Set the message in one step instead of typing it
    #[arg(long)]
    direct: bool,

    /// Print the whole transcript as JSON
    #[arg(long)]
    json: bool,

    /// Config file (default: ~/.chatdrive/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        config.apply_env_overrides();

        if self.no_headless {
            config.browser.headless = false;
        }
        if let Some(dir) = &self.profile {
            config.browser.profile_dir = Some(dir.clone());
        }
        if let Some(max) = self.type_speed {
            config.typing.char_delay = DelayRange::new(MIN_CHAR_DELAY_SECS, max);
        }
        if self.direct {
            config.typing.mode = TypingMode::Direct;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
        Ok(config)
    }

    fn message(&self) -> Result<String> {
        let stdin = std::io::stdin();
        let text = if stdin.is_terminal() {
            self.text.clone().unwrap_or_default()
        } else {
            let mut buf = String::new();
            stdin
                .lock()
                .read_to_string(&mut buf)
                .context("Failed to read message from stdin")?;
            buf
        };

        let text = text.trim();
        if text.is_empty() {
            bail!("No message given: pass TEXT or pipe it on stdin");
        }

        Ok(match &self.prompt {
            Some(prompt) => format!("{prompt}\n\n{text}"),
            None => text.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    let text = cli.message()?;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let factory = ChromiumFactory::from_config(&config.browser);
    let mut session = Session::new(factory, SessionOptions::from_config(&config));

    let result = tokio::select! {
        result = converse(&mut session, &cli, &text, &cancel) => result,
        _ = cancel.cancelled() => {
            warn!("Interrupted");
            Ok(None)
        }
    };
    session.quit().await;

    let Some(messages) = result? else {
        return Ok(());
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else if let Some(last) = messages.last().filter(|m| m.is_assistant()) {
        println!("{}", last.text().trim());
    }
    Ok(())
}

/// One exchange: start, send, wait, read. `None` when cancelled.
async fn converse(
    session: &mut Session<ChromiumFactory>,
    cli: &Cli,
    text: &str,
    cancel: &CancellationToken,
) -> Result<Option<Vec<ChatMessage>>> {
    session
        .start(cli.conversation.as_deref())
        .await
        .context("Failed to start session")?;
    session
        .send_message(text)
        .await
        .context("Failed to send message")?;

    let timeout = cli.timeout.unwrap_or(Duration::ZERO);
    match session.wait_completion(timeout, cancel).await? {
        Completion::Completed => {}
        Completion::Cancelled => return Ok(None),
    }

    if let Some(id) = session.current_conversation_id().await? {
        info!(conversation = %id, "Conversation");
    }
    Ok(Some(session.get_messages().await?))
}
