//! Telegram update handlers.
//!
//! Commands are parsed here, handed to the core `MapBot`, and the resulting
//! reply is delivered through the (throttled) messenger. Plain text is ignored.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::debug;

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(&msg, text, state).await;
    }

    debug!(chat_id = msg.chat.id.0, "ignoring plain text");
    Ok(())
}
