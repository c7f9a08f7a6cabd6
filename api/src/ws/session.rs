//! Per-connection message loop.
//!
//! The first message of each exchange carries `id_empleado` and a `registrar`
//! flag that routes to enrollment or verification. The chosen session then
//! drives its own receive/send cycles until a terminal outcome; the loop goes
//! back to waiting for the next exchange on the same connection. Any receive
//! failure ends the task and drops all in-memory session state.

use base64::Engine;
use serde_json::Value;

use crate::state::AppState;
use crate::ws::channel::Channel;
use crate::ws::{enroll, verify};

pub async fn run<C: Channel>(mut channel: C, state: AppState) {
    loop {
        let start = match channel.recv_json().await {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!("attendance connection ended: {err}");
                break;
            }
        };

        let employee_id = start.get("id_empleado").and_then(Value::as_i64);
        let registrar = start
            .get("registrar")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let result = match (registrar, employee_id) {
            (true, Some(employee_id)) => {
                enroll::enroll_employee(&mut channel, &state, employee_id)
                    .await
                    .map(|outcome| tracing::info!(employee_id, ?outcome, "enrollment finished"))
            }
            _ => verify::verify_identity(&mut channel, &state, &start)
                .await
                .map(|outcome| tracing::info!(?outcome, "verification finished")),
        };

        if let Err(err) = result {
            tracing::debug!("attendance session aborted: {err}");
            break;
        }
    }
}

/// Pulls a base64 image field out of a client message.
pub(crate) fn decode_image_field(message: &Value, field: &str) -> Option<Vec<u8>> {
    let raw = message.get(field)?.as_str()?;
    base64::engine::general_purpose::STANDARD.decode(raw).ok()
}
