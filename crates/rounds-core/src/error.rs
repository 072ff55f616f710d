use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::types::TreatmentType;

#[derive(Debug, Error)]
pub enum RoundsError {
    #[error("attendance not found: {0}")]
    AttendanceNotFound(Uuid),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("completion requires notes or recommendations")]
    MissingCompletionData,

    #[error("cancellation requires a reason")]
    MissingCancellationReason,

    #[error("queue '{0}' is empty")]
    EmptyQueue(String),

    #[error("section not operated today: {0}")]
    SectionClosed(TreatmentType),

    #[error("no active course for patient {patient_id} ({treatment_type})")]
    NoActiveCourse {
        patient_id: Uuid,
        treatment_type: TreatmentType,
    },

    #[error("course for patient {patient_id} ({treatment_type}) is already finished")]
    CourseAlreadyFinished {
        patient_id: Uuid,
        treatment_type: TreatmentType,
    },

    #[error("active course already exists for patient {patient_id} ({treatment_type})")]
    CourseExists {
        patient_id: Uuid,
        treatment_type: TreatmentType,
    },

    #[error("invalid session total: {0} (must be at least 1)")]
    InvalidSessionTotal(u32),

    #[error("{0} attendances remain unresolved")]
    UnresolvedAttendances(usize),

    #[error("day {0} is sealed")]
    DaySealed(NaiveDate),

    #[error("unknown treatment type: {0}")]
    UnknownTreatmentType(String),

    #[error("unknown priority: {0}")]
    UnknownPriority(String),

    #[error("unknown attendance status: {0}")]
    UnknownStatus(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RoundsError>;
