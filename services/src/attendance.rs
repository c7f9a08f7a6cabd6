//! Attendance timing engine.
//!
//! Classifies a punch timestamp against the employee's shift into an
//! Entrada/Salida event with a punctuality status and records it inside one
//! transaction. Classification is a pure function over an ordered
//! first-match-wins interval table so each branch (and the tie-break order)
//! can be tested in isolation.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use db::models::{attendance_event, attendance_period, attendance_setting, work_schedule};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::error::AttendanceError;

pub use db::models::attendance_event::PunchKind;

const SETTING_KEYS: [&str; 5] = [
    "entrada_temprana",
    "tolerancia",
    "retraso_min",
    "salida_valida",
    "salida_fuera",
];

/// Named tolerance windows around shift start/end, loaded per call so edits
/// to `attendance_settings` take effect without a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tolerances {
    pub entrada_temprana: Duration,
    pub tolerancia: Duration,
    pub retraso_min: Duration,
    pub salida_valida: Duration,
    pub salida_fuera: Duration,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            entrada_temprana: Duration::hours(1),
            tolerancia: Duration::minutes(5),
            retraso_min: Duration::minutes(15),
            salida_valida: Duration::minutes(30),
            salida_fuera: Duration::hours(2),
        }
    }
}

impl Tolerances {
    /// Reads the five named durations, falling back to the default for any
    /// key that is absent.
    pub async fn load<C: ConnectionTrait>(conn: &C) -> Result<Self, sea_orm::DbErr> {
        let rows = attendance_setting::Entity::find()
            .filter(attendance_setting::Column::Key.is_in(SETTING_KEYS))
            .all(conn)
            .await?;

        let mut tolerances = Self::default();
        for row in rows {
            let value = Duration::seconds(row.value_seconds);
            match row.key.as_str() {
                "entrada_temprana" => tolerances.entrada_temprana = value,
                "tolerancia" => tolerances.tolerancia = value,
                "retraso_min" => tolerances.retraso_min = value,
                "salida_valida" => tolerances.salida_valida = value,
                "salida_fuera" => tolerances.salida_fuera = value,
                _ => {}
            }
        }
        Ok(tolerances)
    }
}

/// Punctuality label persisted with each event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PunchStatus {
    Temprana,
    ATiempo,
    RetrasoMinimo,
    Tarde,
    FueraDeRango,
}

impl std::fmt::Display for PunchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PunchStatus::Temprana => "Temprana",
            PunchStatus::ATiempo => "A tiempo",
            PunchStatus::RetrasoMinimo => "Retraso mínimo",
            PunchStatus::Tarde => "Tarde",
            PunchStatus::FueraDeRango => "Fuera de rango",
        };
        write!(f, "{label}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub kind: PunchKind,
    pub status: PunchStatus,
}

fn entry(status: PunchStatus) -> Option<Classification> {
    Some(Classification {
        kind: PunchKind::Entrada,
        status,
    })
}

fn exit(status: PunchStatus) -> Option<Classification> {
    Some(Classification {
        kind: PunchKind::Salida,
        status,
    })
}

/// Classifies a minute-truncated timestamp against the shift boundaries.
///
/// `None` means the punch is earlier than `shift_start - entrada_temprana`
/// and is not recordable at all.
pub fn classify(
    actual: NaiveDateTime,
    shift_start: NaiveDateTime,
    shift_end: NaiveDateTime,
    tol: &Tolerances,
) -> Option<Classification> {
    // Inside the exit tolerance window the label depends on which side of the
    // exact shift-end minute the punch falls on. The equality case is only
    // reachable at that exact minute because inputs are minute-truncated.
    let exit_window_status = match actual.cmp(&shift_end) {
        Ordering::Less => PunchStatus::Temprana,
        Ordering::Equal => PunchStatus::ATiempo,
        Ordering::Greater => PunchStatus::Tarde,
    };

    // Ordered interval table, first match wins. Row order is contractual:
    // ties between adjacent intervals resolve to the earlier row.
    let table = [
        (actual < shift_start - tol.entrada_temprana, None),
        (actual < shift_start, entry(PunchStatus::Temprana)),
        (
            actual <= shift_start + tol.tolerancia,
            entry(PunchStatus::ATiempo),
        ),
        (
            actual <= shift_start + tol.retraso_min,
            entry(PunchStatus::RetrasoMinimo),
        ),
        // Entries later than retraso_min still count as (very) late entries
        // up to three hours before shift end.
        (
            actual < shift_end - Duration::hours(3),
            entry(PunchStatus::Tarde),
        ),
        (
            actual < shift_end - tol.salida_valida,
            exit(PunchStatus::Temprana),
        ),
        (
            actual <= shift_end + tol.salida_valida,
            exit(exit_window_status),
        ),
        (
            actual <= shift_end + tol.salida_fuera,
            exit(PunchStatus::Tarde),
        ),
        (true, exit(PunchStatus::FueraDeRango)),
    ];

    table
        .into_iter()
        .find(|(matched, _)| *matched)
        .and_then(|(_, classification)| classification)
}

/// Drops seconds and sub-second precision; punches are compared and stored at
/// minute resolution.
pub fn truncate_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Classifies `at` for `employee_id` and persists the resulting event.
///
/// Runs schedule lookup, period resolution, tolerance load, classification,
/// the duplicate and ordering checks, and the insert inside one transaction;
/// any failure rolls the transaction back and surfaces the original cause.
/// `Ok(None)` means the punch was too early to record and nothing was written.
pub async fn classify_and_record(
    db: &DatabaseConnection,
    employee_id: i64,
    at: NaiveDateTime,
) -> Result<Option<attendance_event::Model>, AttendanceError> {
    let txn = db.begin().await?;

    let schedule = work_schedule::Entity::find_by_id(employee_id)
        .one(&txn)
        .await?
        .ok_or(AttendanceError::NoSchedule)?;

    let event_date = at.date();
    let period = get_or_create_period(&txn, employee_id, event_date).await?;
    let tolerances = Tolerances::load(&txn).await?;

    let actual = truncate_to_minute(at);
    let shift_start = event_date.and_time(schedule.shift_start);
    let shift_end = event_date.and_time(schedule.shift_end);

    let Some(classification) = classify(actual, shift_start, shift_end, &tolerances) else {
        // Too early to be a punch at all; the open transaction rolls back on drop.
        return Ok(None);
    };

    if has_event(&txn, employee_id, event_date, classification.kind).await? {
        return Err(AttendanceError::DuplicatePunch(classification.kind));
    }
    if classification.kind == PunchKind::Salida
        && !has_event(&txn, employee_id, event_date, PunchKind::Entrada).await?
    {
        return Err(AttendanceError::MissingEntry);
    }

    let event = attendance_event::ActiveModel {
        employee_id: Set(employee_id),
        period_id: Set(period.id),
        position_id: Set(schedule.position_id),
        kind: Set(classification.kind),
        event_date: Set(event_date),
        event_time: Set(actual.time()),
        status: Set(classification.status.to_string()),
        shift: Set(schedule.shift.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        employee_id,
        kind = %event.kind,
        status = %event.status,
        "attendance event recorded"
    );
    Ok(Some(event))
}

async fn get_or_create_period<C: ConnectionTrait>(
    conn: &C,
    employee_id: i64,
    date: NaiveDate,
) -> Result<attendance_period::Model, sea_orm::DbErr> {
    if let Some(existing) = attendance_period::Entity::find()
        .filter(attendance_period::Column::EmployeeId.eq(employee_id))
        .filter(attendance_period::Column::PeriodDate.eq(date))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    attendance_period::ActiveModel {
        employee_id: Set(employee_id),
        period_date: Set(date),
        ..Default::default()
    }
    .insert(conn)
    .await
}

async fn has_event<C: ConnectionTrait>(
    conn: &C,
    employee_id: i64,
    date: NaiveDate,
    kind: PunchKind,
) -> Result<bool, sea_orm::DbErr> {
    let existing = attendance_event::Entity::find()
        .filter(attendance_event::Column::EmployeeId.eq(employee_id))
        .filter(attendance_event::Column::EventDate.eq(date))
        .filter(attendance_event::Column::Kind.eq(kind))
        .one(conn)
        .await?;
    Ok(existing.is_some())
}
