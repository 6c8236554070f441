use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};

use mapbot_core::{
    commands::{Command, Reply},
    domain::ChatId,
    formatting::truncate_for_telegram,
    messaging::{port::MessagingPort, types::ChatAction},
};

use crate::router::AppState;

const DELIVERY_FAILURE: &str = "Could not send the map. Please try again later.";

pub async fn handle_command(
    msg: &Message,
    text: &str,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(command) = Command::parse(text) else {
        return Ok(());
    };

    let chat_id = ChatId(msg.chat.id.0);
    info!(chat_id = chat_id.0, command = command.name(), "command received");

    if produces_map(&command) {
        // Cosmetic; a failed chat action must not block the reply.
        let _ = state
            .messenger
            .send_chat_action(chat_id, ChatAction::UploadPhoto)
            .await;
    }

    let reply = state.map_bot.handle(chat_id, &command).await;
    deliver(
        state.messenger.as_ref(),
        state.cfg.telegram_safe_limit,
        chat_id,
        reply,
    )
    .await;
    Ok(())
}

/// Commands that may answer with a rendered map.
///
/// Decided before the store is read, so `/show_my_cities` with an empty list
/// still gets the upload action ahead of its text reply.
fn produces_map(command: &Command) -> bool {
    match command {
        Command::ShowCity(name) => !name.trim().is_empty(),
        Command::ShowMyCities => true,
        _ => false,
    }
}

/// Send `reply`; the rendered image (if any) is removed when this returns.
async fn deliver(
    messenger: &dyn MessagingPort,
    safe_limit: usize,
    chat_id: ChatId,
    reply: Reply,
) {
    match reply {
        Reply::Text(html) => {
            let limit = safe_limit.clamp(200, messenger.capabilities().max_message_len);
            let body = truncate_for_telegram(&html, limit);
            if let Err(e) = messenger.send_html(chat_id, &body).await {
                error!(chat_id = chat_id.0, "failed to send reply: {e}");
            }
        }
        Reply::Photo(map) => {
            if let Err(e) = messenger.send_photo(chat_id, map.path()).await {
                warn!(
                    chat_id = chat_id.0,
                    path = %map.path().display(),
                    "failed to send map: {e}"
                );
                if let Err(e) = messenger.send_html(chat_id, DELIVERY_FAILURE).await {
                    error!(chat_id = chat_id.0, "failed to send fallback reply: {e}");
                }
            }
        }
    }
}
