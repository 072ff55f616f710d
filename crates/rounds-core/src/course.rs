use crate::attendance::AttendanceRecord;
use crate::error::{Result, RoundsError};
use crate::types::{AttendanceStatus, TreatmentType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CourseStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Active,
    Finished,
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CourseStatus::Active => "active",
            CourseStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// TreatmentCourse
// ---------------------------------------------------------------------------

/// A recommended run of sessions for one patient and treatment type. One
/// active course per (patient, type); each completed attendance counts one
/// session, and the course closes itself on reaching the recommended total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentCourse {
    pub patient_id: Uuid,
    pub treatment_type: TreatmentType,
    pub total_sessions_recommended: u32,
    pub sessions_completed: u32,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TreatmentCourse {
    pub fn new(patient_id: Uuid, treatment_type: TreatmentType, total: u32) -> Result<Self> {
        if total == 0 {
            return Err(RoundsError::InvalidSessionTotal(total));
        }
        let now = Utc::now();
        Ok(Self {
            patient_id,
            treatment_type,
            total_sessions_recommended: total,
            sessions_completed: 0,
            status: CourseStatus::Active,
            created_at: now,
            updated_at: now,
            finished_at: None,
        })
    }

    /// Counts one completed session, closing the course when the total is
    /// reached.
    pub fn record_session(&mut self) -> Result<()> {
        if self.status == CourseStatus::Finished {
            return Err(RoundsError::CourseAlreadyFinished {
                patient_id: self.patient_id,
                treatment_type: self.treatment_type,
            });
        }
        self.sessions_completed += 1;
        let now = Utc::now();
        self.updated_at = now;
        if self.sessions_completed == self.total_sessions_recommended {
            self.status = CourseStatus::Finished;
            self.finished_at = Some(now);
        }
        Ok(())
    }

    pub fn remaining(&self) -> u32 {
        self.total_sessions_recommended
            .saturating_sub(self.sessions_completed)
    }

    pub fn is_active(&self) -> bool {
        self.status == CourseStatus::Active
    }
}

// ---------------------------------------------------------------------------
// CourseProgress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub total_sessions_recommended: u32,
    pub sessions_completed: u32,
    pub next_session_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// CourseLedger
// ---------------------------------------------------------------------------

/// The session tracker: all courses known to the current business day.
#[derive(Debug, Clone, Default)]
pub struct CourseLedger {
    courses: Vec<TreatmentCourse>,
}

impl CourseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_courses(courses: Vec<TreatmentCourse>) -> Self {
        Self { courses }
    }

    /// Opens a fresh course. Fails if an active course already exists for
    /// the pair.
    pub fn open_course(
        &mut self,
        patient_id: Uuid,
        treatment_type: TreatmentType,
        total: u32,
    ) -> Result<()> {
        if self.active_course(patient_id, treatment_type).is_some() {
            return Err(RoundsError::CourseExists {
                patient_id,
                treatment_type,
            });
        }
        let course = TreatmentCourse::new(patient_id, treatment_type, total)?;
        self.courses.push(course);
        Ok(())
    }

    /// Counts one completed session against the active course for the pair.
    /// A pair with only finished courses fails `CourseAlreadyFinished`; a
    /// pair with no course at all fails `NoActiveCourse`, and the caller
    /// decides whether to auto-create or surface it.
    pub fn record_completion(
        &mut self,
        patient_id: Uuid,
        treatment_type: TreatmentType,
    ) -> Result<&TreatmentCourse> {
        let at = self
            .courses
            .iter()
            .position(|c| c.patient_id == patient_id && c.treatment_type == treatment_type && c.is_active());
        match at {
            Some(at) => {
                self.courses[at].record_session()?;
                Ok(&self.courses[at])
            }
            None if self.has_finished_course(patient_id, treatment_type) => {
                Err(RoundsError::CourseAlreadyFinished {
                    patient_id,
                    treatment_type,
                })
            }
            None => Err(RoundsError::NoActiveCourse {
                patient_id,
                treatment_type,
            }),
        }
    }

    /// Progress for the pair's most recent course, with the next due date
    /// computed from the patient's scheduled attendances of the same type on
    /// or after `from`.
    pub fn progress(
        &self,
        patient_id: Uuid,
        treatment_type: TreatmentType,
        attendances: &[AttendanceRecord],
        from: NaiveDate,
    ) -> Result<CourseProgress> {
        let course = self
            .active_course(patient_id, treatment_type)
            .or_else(|| self.latest_course(patient_id, treatment_type))
            .ok_or(RoundsError::NoActiveCourse {
                patient_id,
                treatment_type,
            })?;

        let next_session_date = attendances
            .iter()
            .filter(|a| {
                a.patient_id == patient_id
                    && a.treatment_type == treatment_type
                    && a.status == AttendanceStatus::Scheduled
                    && a.scheduled_date >= from
            })
            .map(|a| a.scheduled_date)
            .min();

        Ok(CourseProgress {
            total_sessions_recommended: course.total_sessions_recommended,
            sessions_completed: course.sessions_completed,
            next_session_date,
        })
    }

    pub fn active_course(
        &self,
        patient_id: Uuid,
        treatment_type: TreatmentType,
    ) -> Option<&TreatmentCourse> {
        self.courses
            .iter()
            .find(|c| c.patient_id == patient_id && c.treatment_type == treatment_type && c.is_active())
    }

    pub fn courses(&self) -> &[TreatmentCourse] {
        &self.courses
    }

    pub fn into_courses(self) -> Vec<TreatmentCourse> {
        self.courses
    }

    fn latest_course(
        &self,
        patient_id: Uuid,
        treatment_type: TreatmentType,
    ) -> Option<&TreatmentCourse> {
        self.courses
            .iter()
            .filter(|c| c.patient_id == patient_id && c.treatment_type == treatment_type)
            .max_by_key(|c| c.created_at)
    }

    fn has_finished_course(&self, patient_id: Uuid, treatment_type: TreatmentType) -> bool {
        self.courses.iter().any(|c| {
            c.patient_id == patient_id
                && c.treatment_type == treatment_type
                && c.status == CourseStatus::Finished
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
