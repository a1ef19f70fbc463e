//! Live order WebSocket endpoint
//!
//! GET /api/orders/{id}/live?token=<JWT>
//! Auth: JWT via query parameter (browser WebSocket cannot set headers)
//!
//! Protocol:
//! - Server → Client: LiveMessage (Ready, CountdownUpdate, StatusChanged, ProgressUpdated)
//! - Client → Server: LiveCommand (StartCountdown, order managers only)

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::error::AppError;
use shared::live::{LiveCommand, LiveMessage};
use shared::models::User;
use tokio::sync::broadcast;
use tokio::time::Duration;

use super::orders::{apply_countdown, load, load_visible};
use crate::auth::{Actor, CurrentUser};
use crate::db;
use crate::error::ServiceError;
use crate::live::ready_message;
use crate::state::AppState;
use crate::util::now_millis;

const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

pub async fn handle_live_ws(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Query(query): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ServiceError> {
    let current = CurrentUser::from_token(&state, &query.token).await?;
    load_visible(&state, &current.actor, order_id).await?;

    Ok(ws.on_upgrade(move |socket| live_session(socket, state, current.actor, order_id)))
}

async fn live_session(socket: WebSocket, state: AppState, actor: Actor, order_id: i64) {
    let (mut sink, mut stream) = socket.split();
    let mut rx = state.live.subscribe(order_id);

    tracing::info!(order_id, user_id = actor.user_id, "Live WS connected");

    if send_ready(&state, &mut sink, order_id).await.is_err() {
        drop(rx);
        state.live.release(order_id);
        return;
    }

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = rx.recv() => {
                match event {
                    Ok(msg) => {
                        if send_message(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    // The receiver resumes from the oldest retained message
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(order_id, lagged = n, "Live subscriber lagged, resending Ready");
                        if send_ready(&state, &mut sink, order_id).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<LiveCommand>(&text) {
                            Ok(cmd) => handle_command(&state, &actor, order_id, cmd).await,
                            Err(e) => tracing::debug!(order_id, error = %e, "Ignoring malformed live command"),
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    drop(rx);
    state.live.release(order_id);
    tracing::info!(order_id, user_id = actor.user_id, "Live WS disconnected");
}

/// The result reaches every socket, this one included, through the room
async fn handle_command(state: &AppState, actor: &Actor, order_id: i64, cmd: LiveCommand) {
    match cmd {
        LiveCommand::StartCountdown { total_time } => {
            let result = async {
                let order = load(state, order_id).await?;
                let user = db::users::find_by_id(&state.pool, actor.user_id)
                    .await?
                    .ok_or_else(AppError::not_authenticated)?;
                countdown_manager(&user, order.branch_id)?;
                apply_countdown(state, &order, total_time, None).await
            }
            .await;

            if let Err(e) = result {
                tracing::warn!(order_id, user_id = actor.user_id, error = ?e, "StartCountdown rejected");
            }
        }
    }
}

/// The socket outlives the upgrade request, so each command is checked
/// against the user as currently stored
fn countdown_manager(user: &User, branch_id: i64) -> Result<Actor, AppError> {
    let actor = Actor::from(user);
    actor.require_manages_orders_of(branch_id)?;
    Ok(actor)
}

async fn send_ready<S>(state: &AppState, sink: &mut S, order_id: i64) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let order = load(state, order_id).await.map_err(|e| {
        tracing::warn!(order_id, error = ?e, "Live WS could not load order");
    })?;
    send_message(sink, &ready_message(&order, now_millis())).await
}

async fn send_message<S>(sink: &mut S, msg: &LiveMessage) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn staff(branch_id: Option<i64>) -> User {
        User {
            id: 3,
            name: None,
            email: "staff@example.com".into(),
            password_hash: None,
            image: None,
            super_admin: false,
            is_admin: false,
            is_staff: branch_id.is_some(),
            branch_id,
            google_auth: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn branch_staff_may_start_countdown() {
        let actor = countdown_manager(&staff(Some(10)), 10).unwrap();
        assert_eq!(actor.role, Role::Staff);
    }

    #[test]
    fn non_manager_countdown_is_refused() {
        let customer = staff(None);
        let err = countdown_manager(&customer, 10).unwrap_err();
        assert_eq!(err.code, shared::error::ErrorCode::PermissionDenied);
    }

    #[test]
    fn role_change_applies_to_open_socket() {
        // Same user id, record reloaded after a move to another branch
        let moved = staff(Some(11));
        assert!(countdown_manager(&moved, 10).is_err());
        assert!(countdown_manager(&moved, 11).is_ok());
    }
}
