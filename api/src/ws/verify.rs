//! Liveness-challenge verification session.
//!
//! `MatchIdentity → Challenge(round) → Recorded | Rejected | Exhausted`.
//! Identity matching is one-shot; the gesture challenge gets up to three
//! rounds. A gesture match hands the claimed identity and the client-supplied
//! timestamp to the attendance timing engine, whose outcome (or typed
//! failure) becomes the single final status message.

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use serde_json::Value;
use services::attendance;
use services::error::AttendanceError;
use services::recognition::Gesture;

use crate::state::AppState;
use crate::ws::channel::{Channel, ChannelError};
use crate::ws::session::decode_image_field;

const MAX_ROUNDS: u32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// One attendance event was persisted.
    Recorded,
    /// Live identity proven, but the timestamp predates the recordable window.
    OutsideWindow,
    Rejected,
    Exhausted,
}

/// Pending identity claim plus the challenge the client must answer.
struct ChallengeSession {
    employee_id: i64,
    punched_at: NaiveDateTime,
    gesture: Gesture,
}

/// What one challenge round concluded; anything but `Matched` consumes the
/// round and the session moves on.
enum RoundOutcome {
    Matched,
    NoFace,
    Mismatch,
    ProcessingError,
}

pub async fn verify_identity<C: Channel>(
    channel: &mut C,
    state: &AppState,
    start: &Value,
) -> Result<VerifyOutcome, ChannelError> {
    // MatchIdentity: one shot, no retries at this stage.
    let Some(image) = decode_image_field(start, "imagen") else {
        channel.send_text("Error procesando la imagen").await;
        return Ok(VerifyOutcome::Rejected);
    };

    let vector = match state.matcher().extract(&image).await {
        Ok(Some(vector)) => vector,
        Ok(None) => {
            channel.send_text("No se detectó un rostro válido").await;
            return Ok(VerifyOutcome::Rejected);
        }
        Err(err) => {
            tracing::warn!("face extraction failed: {err}");
            channel.send_text("Error procesando la imagen").await;
            return Ok(VerifyOutcome::Rejected);
        }
    };

    let employee_id = match state.matcher().best_match(&vector).await {
        Ok(Some((employee_id, distance))) => {
            tracing::debug!(employee_id, distance, "identity claim");
            employee_id
        }
        Ok(None) => {
            channel.send_text("Persona no reconocida").await;
            return Ok(VerifyOutcome::Rejected);
        }
        Err(err) => {
            tracing::warn!("identity lookup failed: {err}");
            channel.send_text("Error procesando la imagen").await;
            return Ok(VerifyOutcome::Rejected);
        }
    };

    let Some(punched_at) = start
        .get("fecha_hora")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
    else {
        channel.send_text("Fecha y hora inválidas").await;
        return Ok(VerifyOutcome::Rejected);
    };

    // One random challenge per session, fixed across all rounds.
    let gesture = *Gesture::CHALLENGES
        .choose(&mut rand::thread_rng())
        .unwrap_or(&Gesture::Sonrisa);
    let session = ChallengeSession {
        employee_id,
        punched_at,
        gesture,
    };

    for round in 0..MAX_ROUNDS {
        if round == 0 {
            channel
                .send_text(&format!("Por favor, realiza el gesto: {}", session.gesture))
                .await;
        } else {
            channel
                .send_text(&format!(
                    "Gesto incorrecto. Por favor, realiza el gesto: {}",
                    session.gesture
                ))
                .await;
        }

        match challenge_round(channel, state, &session).await? {
            RoundOutcome::Matched => return record_punch(channel, state, &session).await,
            RoundOutcome::NoFace => {
                channel
                    .send_text("No se detectó rostro en la imagen del gesto")
                    .await;
            }
            RoundOutcome::ProcessingError => {
                channel
                    .send_text("Error procesando imagen del gesto")
                    .await;
            }
            // Wrong gesture: stay silent now, the next round's prompt carries
            // the correction.
            RoundOutcome::Mismatch => {}
        }
    }

    channel
        .send_text("Verificación fallida luego de 3 intentos.")
        .await;
    Ok(VerifyOutcome::Exhausted)
}

async fn challenge_round<C: Channel>(
    channel: &mut C,
    state: &AppState,
    session: &ChallengeSession,
) -> Result<RoundOutcome, ChannelError> {
    let message = match channel.recv_json().await {
        Ok(message) => message,
        Err(err) => {
            channel
                .send_text("La conexión fue cerrada inesperadamente")
                .await;
            return Err(err);
        }
    };

    let Some(image) = decode_image_field(&message, "imagen") else {
        return Ok(RoundOutcome::ProcessingError);
    };

    match state.matcher().extract(&image).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(RoundOutcome::NoFace),
        Err(err) => {
            tracing::warn!("face extraction failed in challenge round: {err}");
            return Ok(RoundOutcome::ProcessingError);
        }
    }

    match state.detector().detect(&image, session.gesture).await {
        Ok(true) => Ok(RoundOutcome::Matched),
        Ok(false) => Ok(RoundOutcome::Mismatch),
        Err(err) => {
            tracing::warn!("gesture detection failed: {err}");
            Ok(RoundOutcome::ProcessingError)
        }
    }
}

async fn record_punch<C: Channel>(
    channel: &mut C,
    state: &AppState,
    session: &ChallengeSession,
) -> Result<VerifyOutcome, ChannelError> {
    match attendance::classify_and_record(state.db(), session.employee_id, session.punched_at).await
    {
        Ok(Some(event)) => {
            channel
                .send_text(&format!(
                    "Se registró la {} del empleado {} a las {} del {}",
                    event.kind,
                    session.employee_id,
                    event.event_time.format("%H:%M"),
                    event.event_date.format("%Y-%m-%d"),
                ))
                .await;
            Ok(VerifyOutcome::Recorded)
        }
        Ok(None) => {
            channel
                .send_text("Entrada fuera del rango permitido.")
                .await;
            Ok(VerifyOutcome::OutsideWindow)
        }
        Err(AttendanceError::Database(err)) => {
            tracing::error!("attendance transaction failed: {err}");
            channel
                .send_text("Error al registrar la asistencia, intenta más tarde")
                .await;
            Ok(VerifyOutcome::Rejected)
        }
        Err(err) => {
            channel.send_text(&err.to_string()).await;
            Ok(VerifyOutcome::Rejected)
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::testing::{image_message, start_message, test_state, FakeDetector, FakeMatcher, ScriptedChannel};
    use chrono::{NaiveDate, NaiveTime};
    use db::models::attendance_event;
    use db::test_utils::{seed_employee, seed_schedule, setup_test_db};
    use sea_orm::{EntityTrait, PaginatorTrait};
    use std::sync::Arc;

    /// One employee with a 9-to-5 schedule; the matcher recognizes them.
    async fn enrolled_state(detector: FakeDetector) -> (crate::state::AppState, i64) {
        let db = setup_test_db().await;
        let employee = seed_employee(&db, "Ana Torres").await;
        seed_schedule(
            &db,
            employee.id,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
        .await;
        let matcher = FakeMatcher::recognizing(employee.id);
        (
            test_state(db, Arc::new(matcher), Arc::new(detector)),
            employee.id,
        )
    }

    async fn event_count(state: &crate::state::AppState) -> u64 {
        attendance_event::Entity::find()
            .count(state.db())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn no_face_on_first_image_rejects_immediately() {
        let db = setup_test_db().await;
        let state = test_state(
            db,
            Arc::new(FakeMatcher::never_sees_a_face()),
            Arc::new(FakeDetector::always(true)),
        );
        let mut channel = ScriptedChannel::new(vec![]);

        let outcome = verify_identity(&mut channel, &state, &start_message("2026-08-25T09:03:00"))
            .await
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::Rejected);
        assert_eq!(channel.sent, vec!["No se detectó un rostro válido"]);
        assert_eq!(event_count(&state).await, 0);
    }

    #[tokio::test]
    async fn unknown_identity_is_rejected() {
        let db = setup_test_db().await;
        let state = test_state(
            db,
            Arc::new(FakeMatcher::unmatched()),
            Arc::new(FakeDetector::always(true)),
        );
        let mut channel = ScriptedChannel::new(vec![]);

        let outcome = verify_identity(&mut channel, &state, &start_message("2026-08-25T09:03:00"))
            .await
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::Rejected);
        assert_eq!(channel.sent, vec!["Persona no reconocida"]);
    }

    #[tokio::test]
    async fn three_mismatches_exhaust_the_session_without_recording() {
        let (state, _) = enrolled_state(FakeDetector::always(false)).await;

        let mut channel = ScriptedChannel::new(vec![
            image_message("imagen"),
            image_message("imagen"),
            image_message("imagen"),
        ]);

        let outcome = verify_identity(&mut channel, &state, &start_message("2026-08-25T09:03:00"))
            .await
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::Exhausted);
        assert_eq!(channel.sent.len(), 4); // 3 prompts + failure notice
        assert!(channel.sent[0].starts_with("Por favor, realiza el gesto:"));
        assert!(channel.sent[1].starts_with("Gesto incorrecto."));
        assert!(channel.sent[2].starts_with("Gesto incorrecto."));
        assert_eq!(channel.sent[3], "Verificación fallida luego de 3 intentos.");
        assert_eq!(event_count(&state).await, 0);
    }

    #[tokio::test]
    async fn match_on_second_round_records_exactly_one_event() {
        let (state, employee_id) =
            enrolled_state(FakeDetector::scripted(vec![false, true])).await;

        let mut channel = ScriptedChannel::new(vec![
            image_message("imagen"),
            image_message("imagen"),
        ]);

        let outcome = verify_identity(&mut channel, &state, &start_message("2026-08-25T09:03:00"))
            .await
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::Recorded);
        assert_eq!(event_count(&state).await, 1);

        let event = attendance_event::Entity::find()
            .one(state.db())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.employee_id, employee_id);
        assert_eq!(event.status, "A tiempo");

        // Prompt, re-prompt, then the single success notice; no further prompting.
        assert_eq!(channel.sent.len(), 3);
        assert!(channel.sent[2].starts_with("Se registró la Entrada"));
    }

    #[tokio::test]
    async fn no_face_in_a_round_consumes_it_with_a_notice() {
        let (base, employee_id) = enrolled_state(FakeDetector::always(true)).await;
        // Face on the start image, none on the first challenge image, then a
        // face again on the retry.
        let matcher = FakeMatcher::recognizing(employee_id).with_face_script(vec![true, false, true]);
        let state = test_state(
            base.db().clone(),
            Arc::new(matcher),
            Arc::new(FakeDetector::always(true)),
        );

        let mut channel = ScriptedChannel::new(vec![
            image_message("imagen"),
            image_message("imagen"),
        ]);

        let outcome = verify_identity(&mut channel, &state, &start_message("2026-08-25T09:03:00"))
            .await
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::Recorded);
        assert!(channel
            .sent
            .contains(&"No se detectó rostro en la imagen del gesto".to_string()));
    }

    #[tokio::test]
    async fn duplicate_punch_is_surfaced_verbatim() {
        let (state, _) = enrolled_state(FakeDetector::always(true)).await;

        let mut first = ScriptedChannel::new(vec![image_message("imagen")]);
        verify_identity(&mut first, &state, &start_message("2026-08-25T09:03:00"))
            .await
            .unwrap();

        let mut second = ScriptedChannel::new(vec![image_message("imagen")]);
        let outcome = verify_identity(&mut second, &state, &start_message("2026-08-25T09:04:00"))
            .await
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::Rejected);
        assert_eq!(
            second.sent.last().unwrap(),
            "Ya se registró una entrada hoy para este empleado."
        );
        assert_eq!(event_count(&state).await, 1);
    }

    #[tokio::test]
    async fn too_early_punch_reports_outside_window() {
        let (state, _) = enrolled_state(FakeDetector::always(true)).await;

        let mut channel = ScriptedChannel::new(vec![image_message("imagen")]);
        let outcome = verify_identity(&mut channel, &state, &start_message("2026-08-25T06:00:00"))
            .await
            .unwrap();

        assert_eq!(outcome, VerifyOutcome::OutsideWindow);
        assert_eq!(
            channel.sent.last().unwrap(),
            "Entrada fuera del rango permitido."
        );
        assert_eq!(event_count(&state).await, 0);
    }

    #[tokio::test]
    async fn disconnect_mid_challenge_aborts_with_notice() {
        let (state, _) = enrolled_state(FakeDetector::always(true)).await;

        // No challenge replies queued: the first round's receive fails.
        let mut channel = ScriptedChannel::new(vec![]);
        let result =
            verify_identity(&mut channel, &state, &start_message("2026-08-25T09:03:00")).await;

        assert!(matches!(result, Err(ChannelError::Closed)));
        assert_eq!(
            channel.sent.last().unwrap(),
            "La conexión fue cerrada inesperadamente"
        );
        assert_eq!(event_count(&state).await, 0);
    }

    #[test]
    fn timestamps_parse_with_and_without_offset() {
        let expected = NaiveDate::from_ymd_opt(2026, 8, 25)
            .unwrap()
            .and_hms_opt(9, 3, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2026-08-25T09:03:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-08-25T09:03:00-03:00"), Some(expected));
        assert_eq!(parse_timestamp("not a date"), None);
    }
}
