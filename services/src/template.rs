//! Biometric template persistence.
//!
//! A template is the full set of reference vectors captured at enrollment,
//! one per gesture. It is only ever written as a whole: the delete of any
//! previous rows and the inserts of the new set share one transaction.

use chrono::Utc;
use db::models::face_template;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::recognition::{FaceVector, Gesture};

/// Replaces `employee_id`'s stored template with `vectors`, atomically.
pub async fn save_template(
    db: &DatabaseConnection,
    employee_id: i64,
    vectors: &[(Gesture, FaceVector)],
) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    face_template::Entity::delete_many()
        .filter(face_template::Column::EmployeeId.eq(employee_id))
        .exec(&txn)
        .await?;

    for (gesture, vector) in vectors {
        let embedding = serde_json::to_string(vector)
            .map_err(|e| DbErr::Custom(format!("failed to encode embedding: {e}")))?;
        face_template::ActiveModel {
            employee_id: Set(employee_id),
            gesture: Set(gesture.as_str().to_owned()),
            embedding: Set(embedding),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    tracing::info!(employee_id, gestures = vectors.len(), "face template saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::test_utils::{seed_employee, setup_test_db};
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn saves_one_row_per_gesture() {
        let db = setup_test_db().await;
        let employee = seed_employee(&db, "Luis Vega").await;

        let vectors = vec![
            (Gesture::Normal, vec![0.1, 0.2]),
            (Gesture::Sonrisa, vec![0.3, 0.4]),
            (Gesture::Giro, vec![0.5, 0.6]),
        ];
        save_template(&db, employee.id, &vectors).await.unwrap();

        let rows = face_template::Entity::find().all(&db).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.employee_id == employee.id));
        let normal = rows.iter().find(|r| r.gesture == "normal").unwrap();
        assert_eq!(normal.vector().unwrap(), vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn re_enrollment_replaces_previous_template() {
        let db = setup_test_db().await;
        let employee = seed_employee(&db, "Luis Vega").await;

        save_template(&db, employee.id, &[(Gesture::Normal, vec![1.0])])
            .await
            .unwrap();
        save_template(
            &db,
            employee.id,
            &[
                (Gesture::Normal, vec![2.0]),
                (Gesture::Sonrisa, vec![3.0]),
                (Gesture::Giro, vec![4.0]),
            ],
        )
        .await
        .unwrap();

        let count = face_template::Entity::find().count(&db).await.unwrap();
        assert_eq!(count, 3);
        let normal = face_template::Entity::find()
            .filter(face_template::Column::Gesture.eq("normal"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(normal.vector().unwrap(), vec![2.0]);
    }
}
