use db::models::attendance_event::PunchKind;
use sea_orm::DbErr;
use thiserror::Error;

/// Business-rule and persistence failures of the attendance timing engine.
///
/// The first three carry client-facing Spanish messages and are surfaced
/// verbatim; `Database` is logged server-side and shown as a generic failure.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("No se encontró información laboral para el empleado")]
    NoSchedule,
    #[error("Ya se registró una {} hoy para este empleado.", kind_lower(.0))]
    DuplicatePunch(PunchKind),
    #[error("No se puede registrar una salida sin haber registrado una entrada.")]
    MissingEntry,
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

fn kind_lower(kind: &PunchKind) -> String {
    kind.to_string().to_lowercase()
}
