//! An adapter that chats over stdin and stdout.

use async_trait::async_trait;
use hark::core::{AdapterResult, Message, Receiver, Sender};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

/// Every line typed is a message from one user in one channel.
///
/// Lines are addressed to the bot unless they start with `>`, which says
/// them to the channel instead. Replies are printed to stdout.
pub struct ShellAdapter {
    user: String,
    channel: String,
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ShellAdapter {
    pub fn new(user: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            channel: channel.into(),
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    fn parse(&self, line: &str) -> Message {
        let message = match line.strip_prefix('>') {
            Some(said) => Message::new(said.trim()),
            None => Message::to_bot(line.trim()),
        };
        message
            .with_from(self.user.clone())
            .with_user_id(self.user.clone())
            .with_channel(self.channel.clone())
    }
}

#[async_trait]
impl Sender for ShellAdapter {
    async fn send(&self, message: Message) -> AdapterResult<()> {
        let channel = if message.channel.is_empty() {
            &self.channel
        } else {
            &message.channel
        };
        let mut out = message.text.clone();
        for attachment in &message.attachments {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&attachment.plain_text());
        }
        for line in out.lines() {
            println!("[{channel}] {line}");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "shell"
    }

    fn is_text_only(&self) -> bool {
        true
    }
}

#[async_trait]
impl Receiver for ShellAdapter {
    async fn receive(&self) -> Option<Message> {
        let mut lines = self.lines.lock().await;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some(self.parse(&line)),
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    return None;
                }
            }
        }
    }
}
