//! Gesture enrollment session.
//!
//! Walks the client through the fixed capture sequence (neutral, smile,
//! head-turn), validating each frame before moving on. A capture that fails
//! validation is re-prompted indefinitely; only a transport failure aborts.
//! Templates hit the database in a single batch once every capture passed, so
//! a dropped connection mid-sequence leaves nothing behind.

use services::recognition::{FaceVector, Gesture};
use services::template;

use crate::state::AppState;
use crate::ws::channel::{Channel, ChannelError};
use crate::ws::session::decode_image_field;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnrollOutcome {
    Registered,
    Incomplete,
}

pub async fn enroll_employee<C: Channel>(
    channel: &mut C,
    state: &AppState,
    employee_id: i64,
) -> Result<EnrollOutcome, ChannelError> {
    let mut captured: Vec<(Gesture, FaceVector)> = Vec::new();

    for &(capture, required) in &Gesture::ENROLLMENT_SEQUENCE {
        channel
            .send_text(&format!("Por favor, envía imagen del gesto: '{capture}'"))
            .await;

        // Re-prompt until this capture passes; only transport errors abort.
        let vector = loop {
            let message = channel.recv_json().await?;

            let field = format!("imagen_{capture}");
            let Some(image) = decode_image_field(&message, &field) else {
                channel
                    .send_text(&format!("Error procesando imagen '{capture}'"))
                    .await;
                continue;
            };

            let vector = match state.matcher().extract(&image).await {
                Ok(Some(vector)) => vector,
                Ok(None) => {
                    channel
                        .send_text(&format!(
                            "No se detectó rostro en imagen '{capture}', intenta de nuevo"
                        ))
                        .await;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(employee_id, "face extraction failed during enrollment: {err}");
                    channel
                        .send_text(&format!("Error procesando imagen '{capture}'"))
                        .await;
                    continue;
                }
            };

            if let Some(gesture) = required {
                match state.detector().detect(&image, gesture).await {
                    Ok(true) => {}
                    Ok(false) => {
                        channel
                            .send_text(&format!(
                                "El gesto '{gesture}' no fue detectado correctamente, intenta de nuevo"
                            ))
                            .await;
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(
                            employee_id,
                            "gesture detection failed during enrollment: {err}"
                        );
                        channel
                            .send_text(&format!("Error procesando imagen '{capture}'"))
                            .await;
                        continue;
                    }
                }
            }

            break vector;
        };

        captured.push((capture, vector));
    }

    if captured.len() != Gesture::ENROLLMENT_SEQUENCE.len() {
        channel
            .send_text("No se completaron todos los gestos requeridos, registro cancelado")
            .await;
        return Ok(EnrollOutcome::Incomplete);
    }

    match template::save_template(state.db(), employee_id, &captured).await {
        Ok(()) => {
            channel
                .send_text(&format!(
                    "Persona '{employee_id}' registrada correctamente con gestos"
                ))
                .await;
            Ok(EnrollOutcome::Registered)
        }
        Err(err) => {
            tracing::error!(employee_id, "template persistence failed: {err}");
            channel
                .send_text("Error al guardar el registro, intenta más tarde")
                .await;
            Ok(EnrollOutcome::Incomplete)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::testing::{image_message, test_state, FakeDetector, FakeMatcher, ScriptedChannel};
    use db::models::face_template;
    use db::test_utils::{seed_employee, setup_test_db};
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
    use std::sync::Arc;

    #[tokio::test]
    async fn full_sequence_persists_one_template_per_gesture() {
        let db = setup_test_db().await;
        let employee = seed_employee(&db, "Luis Mora").await;
        let state = test_state(
            db,
            Arc::new(FakeMatcher::always_extracting()),
            Arc::new(FakeDetector::always(true)),
        );

        let mut channel = ScriptedChannel::new(vec![
            image_message("imagen_normal"),
            image_message("imagen_sonrisa"),
            image_message("imagen_giro"),
        ]);

        let outcome = enroll_employee(&mut channel, &state, employee.id)
            .await
            .unwrap();

        assert_eq!(outcome, EnrollOutcome::Registered);
        let rows = face_template::Entity::find()
            .filter(face_template::Column::EmployeeId.eq(employee.id))
            .all(state.db())
            .await
            .unwrap();
        let mut gestures: Vec<_> = rows.iter().map(|r| r.gesture.clone()).collect();
        gestures.sort();
        assert_eq!(gestures, vec!["giro", "normal", "sonrisa"]);
        assert_eq!(
            channel.sent.last().unwrap(),
            &format!("Persona '{}' registrada correctamente con gestos", employee.id)
        );

        // Every capture in the sequence was prompted, in order.
        assert_eq!(
            channel.sent[..3],
            [
                "Por favor, envía imagen del gesto: 'normal'".to_string(),
                "Por favor, envía imagen del gesto: 'sonrisa'".to_string(),
                "Por favor, envía imagen del gesto: 'giro'".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failed_gesture_is_reprompted_then_accepted() {
        let db = setup_test_db().await;
        let employee = seed_employee(&db, "Luis Mora").await;
        // The smile capture misses once before passing; neutral has no
        // gesture check and the head-turn passes first try.
        let state = test_state(
            db,
            Arc::new(FakeMatcher::always_extracting()),
            Arc::new(FakeDetector::scripted(vec![false, true, true])),
        );

        let mut channel = ScriptedChannel::new(vec![
            image_message("imagen_normal"),
            image_message("imagen_sonrisa"),
            image_message("imagen_sonrisa"),
            image_message("imagen_giro"),
        ]);

        let outcome = enroll_employee(&mut channel, &state, employee.id)
            .await
            .unwrap();

        assert_eq!(outcome, EnrollOutcome::Registered);
        assert!(channel.sent.iter().any(|m| m.starts_with("El gesto 'sonrisa' no fue detectado")));
        let count = face_template::Entity::find()
            .count(state.db())
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn wrong_field_name_is_reported_and_retried() {
        let db = setup_test_db().await;
        let employee = seed_employee(&db, "Luis Mora").await;
        let state = test_state(
            db,
            Arc::new(FakeMatcher::always_extracting()),
            Arc::new(FakeDetector::always(true)),
        );

        let mut channel = ScriptedChannel::new(vec![
            image_message("imagen"), // wrong key for the neutral capture
            image_message("imagen_normal"),
            image_message("imagen_sonrisa"),
            image_message("imagen_giro"),
        ]);

        let outcome = enroll_employee(&mut channel, &state, employee.id)
            .await
            .unwrap();

        assert_eq!(outcome, EnrollOutcome::Registered);
        assert!(channel
            .sent
            .contains(&"Error procesando imagen 'normal'".to_string()));
    }

    #[tokio::test]
    async fn disconnect_mid_sequence_leaves_no_templates() {
        let db = setup_test_db().await;
        let employee = seed_employee(&db, "Luis Mora").await;
        let state = test_state(
            db,
            Arc::new(FakeMatcher::always_extracting()),
            Arc::new(FakeDetector::always(true)),
        );

        // Client vanishes after the first capture.
        let mut channel = ScriptedChannel::new(vec![image_message("imagen_normal")]);

        let result = enroll_employee(&mut channel, &state, employee.id).await;

        assert!(matches!(result, Err(ChannelError::Closed)));
        let count = face_template::Entity::find()
            .count(state.db())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
