use std::sync::Weak;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use hark_core::ResponseWriter;

use crate::command::{CommandMessage, Commander};
use crate::error::{CommandError, HandlerResult, Outcome};
use crate::handler::{Describe, Helper};

/// The `help` command.
///
/// `help` writes the overview produced by its [`Helper`]; `help <command>...`
/// writes the usage of that command. A failed lookup is written back as
/// text. Hears handlers never run on a help request.
pub struct HelpCommand {
    helper: Weak<dyn Helper>,
}

impl HelpCommand {
    /// Creates a help command asking `helper` for its text.
    ///
    /// The reference is weak so a router can own its own help command.
    pub fn new(helper: Weak<dyn Helper>) -> Self {
        Self { helper }
    }
}

impl Describe for HelpCommand {
    fn describe(&self) -> (String, String) {
        ("help".to_string(), "Describe the available commands".to_string())
    }
}

#[async_trait]
impl Commander for HelpCommand {
    async fn command(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: &mut CommandMessage,
    ) -> HandlerResult {
        m.parse()?;
        let helper = self
            .helper
            .upgrade()
            .ok_or_else(|| CommandError::invalid("help is not available"))?;

        let text = match helper.help(cancel, m).await {
            Ok(text) => text,
            Err(err) => err.to_string(),
        };
        w.write_str(text).await?;
        Ok(Outcome::SkipHears)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hark_core::Message;
    use hark_core::testing::RecordingSender;

    use super::*;
    use crate::error::BoxError;

    struct Echo;

    struct Failing;

    #[async_trait]
    impl Helper for Failing {
        async fn help(
            &self,
            _cancel: &CancellationToken,
            _m: &mut CommandMessage,
        ) -> Result<String, BoxError> {
            Err(CommandError::UnknownCommand {
                wanted: "bogus".into(),
                available: vec![],
            }
            .into())
        }
    }

    #[async_trait]
    impl Helper for Echo {
        async fn help(
            &self,
            _cancel: &CancellationToken,
            m: &mut CommandMessage,
        ) -> Result<String, BoxError> {
            Ok(format!("help for {:?}", m.args()?))
        }
    }

    #[tokio::test]
    async fn test_help_passes_remaining_args() {
        let helper: Arc<dyn Helper> = Arc::new(Echo);
        let cmd = HelpCommand::new(Arc::downgrade(&helper));
        let sender = Arc::new(RecordingSender::new());
        let mut w = ResponseWriter::new(sender.clone(), Message::default(), "test");
        let mut m = CommandMessage::new(Message::to_bot("help ping"));

        let outcome = cmd
            .command(&CancellationToken::new(), &mut w, &mut m)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::SkipHears);
        assert_eq!(sender.texts(), [r#"help for ["ping"]"#]);
    }

    #[tokio::test]
    async fn test_helper_error_is_written_and_skips_hears() {
        let helper: Arc<dyn Helper> = Arc::new(Failing);
        let cmd = HelpCommand::new(Arc::downgrade(&helper));
        let sender = Arc::new(RecordingSender::new());
        let mut w = ResponseWriter::new(sender.clone(), Message::default(), "test");
        let mut m = CommandMessage::new(Message::to_bot("help bogus"));

        let outcome = cmd
            .command(&CancellationToken::new(), &mut w, &mut m)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::SkipHears);
        assert_eq!(sender.texts(), ["unknown command 'bogus'"]);
    }

    #[tokio::test]
    async fn test_dropped_helper_is_an_error() {
        let helper: Arc<dyn Helper> = Arc::new(Echo);
        let cmd = HelpCommand::new(Arc::downgrade(&helper));
        drop(helper);

        let mut w = ResponseWriter::null(Message::default());
        let mut m = CommandMessage::new(Message::to_bot("help"));
        let result = cmd.command(&CancellationToken::new(), &mut w, &mut m).await;
        tokio_test::assert_err!(result);
    }
}
