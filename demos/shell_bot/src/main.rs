//! Shell Bot Example
//!
//! A hark bot you talk to from the terminal. Every line is addressed to the
//! bot; start a line with `>` to say it to the channel instead.
//!
//! ```text
//! ping                   PONG!
//! echo -u hello          HELLO
//! remember -g tea green
//! remember tea           tea = green (set globally)
//! alias t remember tea
//! t                      tea = green (set globally)
//! > thanks everyone      you're welcome, alice
//! help
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package shell-bot -- --user alice --channel '#general'
//! HARK_WEBHOOK__ENABLED=true cargo run --package shell-bot
//! curl -d 'deploy finished' http://127.0.0.1:8080/bot/say
//! ```

mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use clap::{Arg, ArgAction, Parser};
use hark::framework::{HandlerFn, HearsFn, WebHookFn};
use hark::prelude::*;
use hark::runtime::{BotConfig, HarkConfig, HarkRuntime};
use regex::Regex;
use tracing::info;

use shell::ShellAdapter;

#[derive(Parser, Debug)]
#[command(version, about = "Chat with a hark bot from the terminal")]
struct Cli {
    /// Configuration file (defaults to hark.toml in the working directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Who you are in the conversation
    #[arg(short, long, default_value = "alice")]
    user: String,

    /// The channel you are talking in
    #[arg(long, default_value = "#shell")]
    channel: String,
}

// ============================================================================
// Handlers
// ============================================================================

fn echo() -> CommandHandler {
    CommandHandler::new(|| {
        Command::new("echo [text...]")
            .short("Repeat what you said")
            .flag(
                Arg::new("upper")
                    .short('u')
                    .long("upper")
                    .help("shout it back")
                    .action(ArgAction::SetTrue),
            )
            .run(|mut inv| async move {
                let text = inv.args.join(" ");
                let text = if inv.flag("upper") {
                    text.to_uppercase()
                } else {
                    text
                };
                inv.reply(text).await?;
                Ok(Outcome::Handled)
            })
    })
}

fn properties(inv: &Invocation) -> Result<PropertyStore, CommandError> {
    let store = inv
        .message
        .store
        .clone()
        .ok_or_else(|| CommandError::invalid("no property store for this message"))?;
    Ok(PropertyStore::for_message(store, &inv.message))
}

fn remember() -> CommandHandler {
    CommandHandler::new(|| {
        let mut node = Command::new("remember <key> [value...]")
            .short("Remember a value, or recall one")
            .long(
                "With a key and a value, stores the value for you in this channel \
                 unless a scope is given. With only a key, shows what is remembered.",
            );
        for arg in ScopeFlags::args() {
            node = node.flag(arg);
        }
        node.run(|mut inv| async move {
            let scope = ScopeFlags::from_matches(&inv.matches, Scope::ChannelUser)?;
            let Some((key, value)) = inv.args.split_first() else {
                return Err(CommandError::invalid("remember needs a key").into());
            };
            let (key, value) = (key.clone(), value.join(" "));
            let props = properties(&inv)?;

            let text = if value.is_empty() {
                match props.get_with_scope(&key).await? {
                    Some((scope, value)) => format!("{key} = {value} ({})", props.describe(scope)),
                    None => format!("I don't remember {key}"),
                }
            } else {
                props.set(scope, &key, &value).await?;
                format!("Remembered {key} ({})", props.describe(scope))
            };
            inv.reply(text).await?;
            Ok(Outcome::SkipHears)
        })
    })
}

fn thanks() -> Result<HearsFn> {
    Ok(hears_fn(
        "thanks",
        "Accept gratitude",
        Regex::new(r"(?i)\bthanks?\b")?,
        |_cancel, mut w, m: Message, _groups| async move {
            w.write_str(format!("you're welcome, {}", m.from)).await?;
            Ok::<_, BoxError>(Outcome::Handled)
        },
    ))
}

fn log_everything() -> HandlerFn {
    handler_fn("log", "Log every message", |_cancel, _w, m: Message| async move {
        info!(from = %m.from, channel = %m.channel, to_bot = m.to_bot, text = %m.text, "Heard");
        HandlerResult::Ok(Outcome::Handled)
    })
}

fn say(channel: String) -> WebHookFn {
    webhook_fn("say", "Post the request body to the channel", move |mut w, req: Request| {
        let channel = channel.clone();
        async move {
            let Ok(body) = to_bytes(req.into_body(), 64 * 1024).await else {
                return StatusCode::PAYLOAD_TOO_LARGE.into_response();
            };
            w.set_channel(channel);
            match w.write(&body).await {
                Ok(_) => StatusCode::NO_CONTENT.into_response(),
                Err(_) => StatusCode::BAD_GATEWAY.into_response(),
            }
        }
    })
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = HarkRuntime::builder().merge(HarkConfig {
        bot: BotConfig {
            description: "A bot you talk to from the terminal".into(),
            ..Default::default()
        },
        ..Default::default()
    });
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    let runtime = builder.build()?;

    let mux = runtime.mux();
    mux.add_command(ping())?;
    mux.add_command(echo())?;
    mux.add_command(remember())?;
    mux.add_hears(thanks()?);
    mux.add_raw(log_everything());
    mux.add_webhook(say(cli.channel.clone()))?;

    if let Some(url) = mux.url() {
        info!(url = %url, "Webhooks are published under this URL");
    }

    runtime.add_adapter(Arc::new(ShellAdapter::new(cli.user, cli.channel)));
    runtime.run().await?;
    Ok(())
}
