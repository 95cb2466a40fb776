//! Two-party conversation loop

use convoy_core::{Agent, Message, Result, deliver};
use tracing::{debug, info, instrument};

/// Run a conversation between `sender` and `recipient` starting with `message`
///
/// Both auto-reply counters are reset first. With `clear_history` the two
/// agents also forget what they said to each other before. The message is
/// delivered to `recipient`, then the two take turns replying until one of
/// them has nothing to say.
///
/// Returns the number of replies exchanged.
#[instrument(skip_all, fields(sender = %sender.name(), recipient = %recipient.name()))]
pub async fn initiate_chat(
    sender: &dyn Agent,
    recipient: &dyn Agent,
    message: Message,
    clear_history: bool,
) -> Result<usize> {
    sender.reset_consecutive_auto_reply_counter(Some(recipient.name()));
    recipient.reset_consecutive_auto_reply_counter(Some(sender.name()));
    if clear_history {
        sender.clear_history(Some(recipient.name()));
        recipient.clear_history(Some(sender.name()));
    }

    deliver(&message, sender, recipient);

    let (mut speaker, mut listener) = (recipient, sender);
    let mut replies = 0;
    while let Some(reply) = speaker.generate_reply(listener).await? {
        debug!(from = %speaker.name(), to = %listener.name(), "Reply");
        deliver(&reply, speaker, listener);
        replies += 1;
        std::mem::swap(&mut speaker, &mut listener);
    }

    info!(replies, "Conversation finished");
    Ok(replies)
}
