//! One actor per WebSocket connection.
//!
//! The socket is split. A writer task owns the sink and drains two queues:
//! control frames (pings, closes) from this module, and [`ServerEvent`]s
//! from the hub's transport. The reader loop below owns the stream and the
//! connection's [`Session`], handling frames strictly one at a time.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use chirp_core::protocol::ServerEvent;
use futures_util::{
  SinkExt, StreamExt,
  stream::SplitSink,
};
use tokio::{
  sync::mpsc,
  time::{interval, sleep, timeout},
};

use crate::{AppState, Backend, session::Session, ws::transport::EventReceiver};

/// Server sends a WebSocket ping every 30 seconds.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// A connection that has not answered a ping within 10 seconds is closed.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Close code for a connection that never authenticated.
pub const CLOSE_AUTH_TIMEOUT: u16 = 4008;

const CLOSE_GOING_AWAY: u16 = 1001;

type ControlSender = mpsc::UnboundedSender<Message>;

pub async fn run_connection<S: Backend>(socket: WebSocket, state: AppState<S>) {
  let (ws_sender, mut ws_receiver) = socket.split();

  let connection = state.hub.allocate();
  let events = state.hub.transport().attach(connection);
  state.hub.open(connection);

  let (control_tx, control_rx) = mpsc::unbounded_channel::<Message>();
  let mut writer_handle = tokio::spawn(writer_task(ws_sender, events, control_rx));

  let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
  let ping_handle = tokio::spawn(ping_task(control_tx.clone(), pong_rx));

  tracing::info!(%connection, "connection opened");

  let auth_timeout = state.config.auth_timeout();
  let auth_deadline = sleep(auth_timeout.unwrap_or(Duration::MAX));
  tokio::pin!(auth_deadline);
  let mut auth_armed = auth_timeout.is_some();

  let mut session = Session::new(state, connection);

  loop {
    let frame = tokio::select! {
      frame = ws_receiver.next() => frame,
      _ = &mut auth_deadline, if auth_armed => {
        auth_armed = false;
        if session.user().is_none() {
          tracing::info!(%connection, "authentication timed out, closing");
          close(&control_tx, CLOSE_AUTH_TIMEOUT, "authentication timeout");
        }
        continue;
      }
      // The writer stops after sending a close frame or on a dead socket.
      _ = &mut writer_handle => break,
    };

    match frame {
      Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()).await,
      Some(Ok(Message::Binary(data))) => {
        tracing::debug!(%connection, len = data.len(), "ignoring binary frame");
      }
      Some(Ok(Message::Pong(_))) => {
        let _ = pong_tx.send(());
      }
      // Pings are answered by the websocket layer itself.
      Some(Ok(Message::Ping(_))) => {}
      Some(Ok(Message::Close(frame))) => {
        tracing::info!(%connection, reason = ?frame, "client initiated close");
        break;
      }
      Some(Err(e)) => {
        tracing::warn!(%connection, error = %e, "websocket receive error");
        break;
      }
      None => {
        tracing::info!(%connection, "websocket stream ended");
        break;
      }
    }
  }

  writer_handle.abort();
  ping_handle.abort();
  session.close();

  tracing::info!(%connection, "connection closed");
}

fn close(control: &ControlSender, code: u16, reason: &'static str) {
  let _ = control.send(Message::Close(Some(CloseFrame { code, reason: reason.into() })));
}

/// Forwards control frames and serialised events to the WebSocket sink.
async fn writer_task(
  mut ws_sender: SplitSink<WebSocket, Message>,
  mut events: EventReceiver,
  mut control: mpsc::UnboundedReceiver<Message>,
) {
  loop {
    let msg = tokio::select! {
      biased;
      Some(msg) = control.recv() => msg,
      Some(event) = events.recv() => match encode(&event) {
        Some(msg) => msg,
        None => continue,
      },
      else => break,
    };

    let closing = matches!(msg, Message::Close(_));
    if ws_sender.send(msg).await.is_err() || closing {
      break;
    }
  }
}

fn encode(event: &ServerEvent) -> Option<Message> {
  match serde_json::to_string(event) {
    Ok(text) => Some(Message::Text(text.into())),
    Err(e) => {
      tracing::error!(error = %e, "failed to serialise outbound event");
      None
    }
  }
}

/// Sends periodic pings and closes the connection when a pong is late.
async fn ping_task(control: ControlSender, mut pong_rx: mpsc::UnboundedReceiver<()>) {
  let mut ping_timer = interval(PING_INTERVAL);
  // The first tick completes immediately.
  ping_timer.tick().await;

  loop {
    ping_timer.tick().await;

    if control.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
      break;
    }

    match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
      Ok(Some(())) => {}
      _ => {
        tracing::warn!("pong timeout, closing connection");
        close(&control, CLOSE_GOING_AWAY, "pong timeout");
        break;
      }
    }
  }
}
