use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::state::AppState;
use crate::ws::channel::WsChannel;

pub mod channel;
pub mod enroll;
pub mod session;
pub mod verify;

#[cfg(test)]
mod testing;

pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/", get(attendance_ws_handler))
}

/// GET /ws — upgrades to the persistent attendance connection. Each socket
/// gets its own task owning all session state for that connection.
async fn attendance_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        session::run(WsChannel::new(socket), state).await;
    })
}
