//! `send_message` and `get_messages`.
//!
//! Direct messages are persisted first and then pushed to the recipient's
//! live connections, if any. A recipient who is offline reads them later
//! through `get_messages`; nothing is replayed on reconnect.

use chirp_core::{
  content::NewMessage,
  event::{Audience, DomainEvent},
  protocol::Reply,
  user::User,
  validate,
};
use chirp_hub::ConnectionId;

use crate::{AppState, Backend, Error, Result};

pub async fn send<S: Backend>(
  state: &AppState<S>,
  connection: ConnectionId,
  sender: &User,
  recipient: &str,
  content: &str,
) -> Result<()> {
  let content = validate::content("message", content, false)?;
  let recipient = state
    .store
    .find_by_username(recipient.trim().to_owned())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("recipient"))?;
  if recipient.id == sender.id {
    return Err(chirp_core::Error::SelfMessage.into());
  }

  let message = state
    .store
    .append_message(NewMessage {
      sender_id: sender.id.clone(),
      recipient_id: recipient.id.clone(),
      content,
    })
    .await
    .map_err(Error::store)?;

  let delivery = state.hub.broadcast(
    DomainEvent::DirectMessage(message.clone()),
    Audience::SpecificUser(recipient.id),
  );
  tracing::debug!(
    from = %sender.username,
    to = %recipient.username,
    delivered = delivery.delivered,
    "direct message stored"
  );

  state.hub.send(connection, Reply::MessageSent(message));
  Ok(())
}

/// Reply with the latest messages the user sent or received, oldest first.
/// The requested `limit` is capped at `message_history_limit`.
pub async fn history<S: Backend>(
  state: &AppState<S>,
  connection: ConnectionId,
  user: &User,
  limit: Option<usize>,
) -> Result<()> {
  let max = state.config.message_history_limit;
  let limit = limit.map_or(max, |l| l.min(max));
  let messages = state
    .store
    .messages_for(user.id.clone(), limit)
    .await
    .map_err(Error::store)?;

  state.hub.send(connection, Reply::Messages { messages });
  Ok(())
}
