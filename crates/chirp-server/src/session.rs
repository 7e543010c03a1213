//! Per-connection dispatch: decode a client frame, route it to its handler,
//! and turn any failure into a reply for this connection only.

use chirp_core::{protocol::ClientMessage, user::User};
use chirp_hub::{ConnectionId, handshake::Handshake};

use crate::{
  AppState, Backend, Error, Result,
  handlers::{auth, messages, polls, posts, presence},
};

pub struct Session<S> {
  state:     AppState<S>,
  handshake: Handshake,
}

impl<S: Backend> Session<S> {
  /// `connection` must already be open on the hub.
  pub fn new(state: AppState<S>, connection: ConnectionId) -> Self {
    Self { state, handshake: Handshake::new(connection) }
  }

  pub fn connection(&self) -> ConnectionId { self.handshake.connection() }

  pub fn user(&self) -> Option<&User> { self.handshake.user() }

  /// Handle one text frame. Frames that are not a valid [`ClientMessage`]
  /// get an `invalid_input` error reply.
  pub async fn handle_text(&mut self, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
      Ok(msg) => self.handle(msg).await,
      Err(e) => {
        tracing::debug!(connection = %self.connection(), error = %e, "undecodable frame");
        self.report(Error::Decode(e));
      }
    }
  }

  pub async fn handle(&mut self, msg: ClientMessage) {
    let action = msg.action();
    if let Err(e) = self.dispatch(msg).await {
      tracing::debug!(connection = %self.connection(), action, error = %e, "action rejected");
      if let Some(source) = e.store_source() {
        tracing::error!(connection = %self.connection(), action, error = %source, "store failure");
      }
      self.report(e);
    }
  }

  async fn dispatch(&mut self, msg: ClientMessage) -> Result<()> {
    let state = &self.state;
    let connection = self.handshake.connection();

    match msg {
      ClientMessage::Authenticate { session_id } => {
        auth::login(state, &mut self.handshake, &session_id).await
      }
      ClientMessage::Register { username, avatar_url } => {
        auth::register(state, &mut self.handshake, &username, avatar_url.as_deref()).await
      }
      ClientMessage::NewPost { content, image_url, gif_url } => {
        let user = self.handshake.require_user()?;
        posts::create(state, user, &content, image_url.as_deref(), gif_url.as_deref()).await
      }
      ClientMessage::CreatePoll { question, options } => {
        let user = self.handshake.require_user()?;
        polls::create(state, user, &question, &options).await
      }
      ClientMessage::LikePost { post_id } => {
        let user = self.handshake.require_user()?;
        posts::like(state, user, post_id).await
      }
      ClientMessage::Comment { post_id, content } => {
        let user = self.handshake.require_user()?;
        posts::comment(state, user, post_id, &content).await
      }
      ClientMessage::VotePoll { poll_id, option_id } => {
        let user = self.handshake.require_user()?;
        polls::vote(state, user, poll_id, option_id).await
      }
      ClientMessage::SendMessage { recipient, content } => {
        let user = self.handshake.require_user()?;
        messages::send(state, connection, user, &recipient, &content).await
      }
      ClientMessage::GetMessages { limit } => {
        let user = self.handshake.require_user()?;
        messages::history(state, connection, user, limit).await
      }
      ClientMessage::OnlineUsers => {
        self.handshake.require_user()?;
        presence::send_online_users(state, connection);
        Ok(())
      }
    }
  }

  fn report(&self, e: Error) { self.state.hub.send(self.connection(), e.into_reply()); }

  /// Unregister the connection, announcing the user offline if this was
  /// their last one.
  pub fn close(self) {
    let connection = self.connection();
    let departure = self.state.hub.disconnect(connection);
    self.state.hub.transport().detach(connection);

    if let Some(departure) = departure {
      presence::depart(&self.state, departure);
    }
  }
}
