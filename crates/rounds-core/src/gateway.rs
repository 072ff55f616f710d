//! Collaborator seams: the patient directory and the persistence gateway.
//!
//! The core treats both as synchronous, fallible calls. Retry policy belongs
//! to the calling layer; failures surface as ordinary error returns.

use crate::attendance::AttendanceRecord;
use crate::course::TreatmentCourse;
use crate::error::Result;
use crate::types::TreatmentType;
use chrono::NaiveDate;
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PatientDirectory
// ---------------------------------------------------------------------------

/// Patient id to display name, used only for operator-facing roster lines
/// and summaries. Patients themselves are owned elsewhere.
pub trait PatientDirectory {
    fn display_name(&self, patient_id: Uuid) -> Option<String>;
}

/// Map-backed directory for hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<Uuid, String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, patient_id: Uuid, name: impl Into<String>) {
        self.names.insert(patient_id, name.into());
    }
}

impl PatientDirectory for StaticDirectory {
    fn display_name(&self, patient_id: Uuid) -> Option<String> {
        self.names.get(&patient_id).cloned()
    }
}

// ---------------------------------------------------------------------------
// AttendanceStore
// ---------------------------------------------------------------------------

/// Persistence gateway. Implementations map their own failures into
/// `RoundsError::Persistence` (or the transparent io/yaml variants).
pub trait AttendanceStore {
    fn load_attendances_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>>;

    fn save_attendance(&self, record: &AttendanceRecord) -> Result<()>;

    fn load_course(
        &self,
        patient_id: Uuid,
        treatment_type: TreatmentType,
    ) -> Result<Option<TreatmentCourse>>;

    fn save_course(&self, course: &TreatmentCourse) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
