//! YAML-file persistence: one document per day under `.clinic/days/`, plus
//! the course ledger at `.clinic/courses.yaml`.
//!
//! Layout:
//!   .clinic/days/2026-03-14.yaml   - phase, sealed_at, attendance list
//!   .clinic/courses.yaml           - all treatment courses

use crate::attendance::AttendanceRecord;
use crate::config::ClinicConfig;
use crate::course::{CourseLedger, TreatmentCourse};
use crate::day::{ClinicDay, DayPhase};
use crate::error::Result;
use crate::gateway::AttendanceStore;
use crate::io;
use crate::paths;
use crate::types::TreatmentType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// DayFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DayFile {
    date: NaiveDate,
    #[serde(default = "default_phase")]
    phase: DayPhase,
    #[serde(default)]
    sealed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    attendances: Vec<AttendanceRecord>,
}

fn default_phase() -> DayPhase {
    DayPhase::Open
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persists the whole day: records, phase, and the course ledger.
    pub fn save_day(&self, day: &ClinicDay) -> Result<()> {
        let file = DayFile {
            date: day.date(),
            phase: day.phase(),
            sealed_at: day.sealed_at(),
            attendances: day.attendances().to_vec(),
        };
        self.write_day_file(&file)?;
        self.write_courses(day.courses().courses())
    }

    /// Reassembles a persisted day, sealed phase included. Returns `None`
    /// when no day file exists for the date.
    pub fn load_day(&self, date: NaiveDate, config: ClinicConfig) -> Result<Option<ClinicDay>> {
        let Some(file) = self.read_day_file(date)? else {
            return Ok(None);
        };
        let courses = CourseLedger::from_courses(self.load_all_courses()?);
        Ok(Some(ClinicDay::restore(
            date,
            file.phase,
            file.sealed_at,
            file.attendances,
            courses,
            config,
        )))
    }

    pub fn load_all_courses(&self) -> Result<Vec<TreatmentCourse>> {
        let path = paths::courses_path(&self.root);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&path)?;
        let courses: Vec<TreatmentCourse> = serde_yaml::from_str(&data)?;
        Ok(courses)
    }

    fn write_courses(&self, courses: &[TreatmentCourse]) -> Result<()> {
        let data = serde_yaml::to_string(courses)?;
        io::atomic_write(&paths::courses_path(&self.root), data.as_bytes())
    }

    fn read_day_file(&self, date: NaiveDate) -> Result<Option<DayFile>> {
        let path = paths::day_file(&self.root, date);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        let file: DayFile = serde_yaml::from_str(&data)?;
        Ok(Some(file))
    }

    fn write_day_file(&self, file: &DayFile) -> Result<()> {
        let path = paths::day_file(&self.root, file.date);
        let data = serde_yaml::to_string(file)?;
        io::atomic_write(&path, data.as_bytes())
    }
}

impl AttendanceStore for FileStore {
    fn load_attendances_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        Ok(self
            .read_day_file(date)?
            .map(|f| f.attendances)
            .unwrap_or_default())
    }

    fn save_attendance(&self, record: &AttendanceRecord) -> Result<()> {
        let mut file = self
            .read_day_file(record.scheduled_date)?
            .unwrap_or(DayFile {
                date: record.scheduled_date,
                phase: DayPhase::Open,
                sealed_at: None,
                attendances: Vec::new(),
            });
        match file.attendances.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => file.attendances.push(record.clone()),
        }
        self.write_day_file(&file)
    }

    /// Returns the active course for the pair, falling back to the most
    /// recently opened one.
    fn load_course(
        &self,
        patient_id: Uuid,
        treatment_type: TreatmentType,
    ) -> Result<Option<TreatmentCourse>> {
        let courses = self.load_all_courses()?;
        let mut matching: Vec<TreatmentCourse> = courses
            .into_iter()
            .filter(|c| c.patient_id == patient_id && c.treatment_type == treatment_type)
            .collect();
        if let Some(at) = matching.iter().position(|c| c.is_active()) {
            return Ok(Some(matching.swap_remove(at)));
        }
        matching.sort_by_key(|c| c.created_at);
        Ok(matching.pop())
    }

    fn save_course(&self, course: &TreatmentCourse) -> Result<()> {
        let mut courses = self.load_all_courses()?;
        // Identity is (patient, type, created_at): `new` stamps creation.
        let existing = courses.iter_mut().find(|c| {
            c.patient_id == course.patient_id
                && c.treatment_type == course.treatment_type
                && c.created_at == course.created_at
        });
        match existing {
            Some(existing) => *existing = course.clone(),
            None => courses.push(course.clone()),
        }
        self.write_courses(&courses)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
