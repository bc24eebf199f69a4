use crate::command::{CommandHandler, command};
use crate::error::Outcome;

/// `ping`: replies `PONG!`.
pub fn ping() -> CommandHandler {
    command("ping", "Check the bot is alive", |mut inv| async move {
        inv.reply("PONG!").await?;
        Ok(Outcome::Handled)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hark_core::testing::RecordingSender;
    use hark_core::{Message, ResponseWriter};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::command::{CommandMessage, Commander};
    use crate::handler::Describe;

    #[tokio::test]
    async fn test_ping_replies_pong() {
        let sender = Arc::new(RecordingSender::new());
        let inbound = Message::to_bot("ping").with_from("alice");
        let mut w = ResponseWriter::for_message(sender.clone(), &inbound);
        let mut m = CommandMessage::new(inbound);

        let outcome = ping()
            .command(&CancellationToken::new(), &mut w, &mut m)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(sender.texts(), ["PONG!"]);
        assert_eq!(ping().describe().0, "ping");
    }
}
