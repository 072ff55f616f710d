//! The business day: owns the date's attendances, call queues, and course
//! ledger, and drives end-of-day reconciliation.
//!
//! The day itself is a state machine: `Open → Reconciling → Sealed`. Live
//! operations run while open or reconciling; sealing freezes the date and
//! every further mutation fails with `DaySealed`.

use crate::attendance::{AttendanceRecord, CompletionOutcome, TransitionPayload};
use crate::config::ClinicConfig;
use crate::course::{CourseLedger, CourseProgress};
use crate::error::{Result, RoundsError};
use crate::gateway::PatientDirectory;
use crate::queue::CallQueue;
use crate::types::{AttendanceStatus, Priority, TreatmentType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Cancellation reason that marks a reschedule; excluded from `missed_count`.
pub const RESCHEDULED_REASON: &str = "rescheduled";

// ---------------------------------------------------------------------------
// DayPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPhase {
    Open,
    Reconciling,
    Sealed,
}

impl fmt::Display for DayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DayPhase::Open => "open",
            DayPhase::Reconciling => "reconciling",
            DayPhase::Sealed => "sealed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// DaySummary
// ---------------------------------------------------------------------------

/// Emitted by `seal_day`. `missed_count` counts cancellations that were not
/// reschedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_attendances: usize,
    pub completed_count: usize,
    pub missed_count: usize,
    pub sealed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// CourseUpdate
// ---------------------------------------------------------------------------

/// What happened to the treatment course when an attendance completed. The
/// transition itself never fails on course anomalies; they are reported here
/// for the calling layer to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseUpdate {
    Recorded {
        sessions_completed: u32,
        total_sessions_recommended: u32,
        finished: bool,
    },
    /// No active course existed; one was opened per `auto_open_course` and
    /// this completion counted as its first session.
    AutoOpened {
        sessions_completed: u32,
        total_sessions_recommended: u32,
    },
    NoActiveCourse,
    AlreadyFinished,
}

// ---------------------------------------------------------------------------
// ResolutionReport
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Resolution {
    Completed(CourseUpdate),
    /// The straggler was cancelled and a fresh scheduled attendance created
    /// for the new date. The caller routes the replacement to that day's
    /// storage; it does not belong to this one.
    Rescheduled { replacement: AttendanceRecord },
}

#[derive(Debug)]
pub struct ResolutionEntry {
    pub id: Uuid,
    pub outcome: Result<Resolution>,
}

/// Per-id results of a bulk resolution. Partial success is normal: one bad
/// id never aborts its siblings.
#[derive(Debug, Default)]
pub struct ResolutionReport {
    pub entries: Vec<ResolutionEntry>,
}

impl ResolutionReport {
    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.resolved_count()
    }

    pub fn outcome_for(&self, id: Uuid) -> Option<&Result<Resolution>> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.outcome)
    }

    /// Replacement records created by reschedules, in request order.
    pub fn replacements(&self) -> Vec<&AttendanceRecord> {
        self.entries
            .iter()
            .filter_map(|e| match &e.outcome {
                Ok(Resolution::Rescheduled { replacement }) => Some(replacement),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ClinicDay
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ClinicDay {
    date: NaiveDate,
    phase: DayPhase,
    sealed_at: Option<DateTime<Utc>>,
    attendances: Vec<AttendanceRecord>,
    queues: HashMap<(TreatmentType, AttendanceStatus), CallQueue>,
    courses: CourseLedger,
    config: ClinicConfig,
}

impl ClinicDay {
    pub fn open(date: NaiveDate, config: ClinicConfig) -> Self {
        Self {
            date,
            phase: DayPhase::Open,
            sealed_at: None,
            attendances: Vec::new(),
            queues: HashMap::new(),
            courses: CourseLedger::new(),
            config,
        }
    }

    /// Opens a day over already-persisted records and courses. Records
    /// scheduled for another date are dropped with a warning.
    pub fn with_roster(
        date: NaiveDate,
        records: Vec<AttendanceRecord>,
        courses: CourseLedger,
        config: ClinicConfig,
    ) -> Self {
        Self::restore(date, DayPhase::Open, None, records, courses, config)
    }

    /// Reassembles a day from persisted state, phase included, so a sealed
    /// day stays sealed across restarts. Queue order is rebuilt from record
    /// state; manual placements are session-local and do not survive.
    pub fn restore(
        date: NaiveDate,
        phase: DayPhase,
        sealed_at: Option<DateTime<Utc>>,
        records: Vec<AttendanceRecord>,
        courses: CourseLedger,
        config: ClinicConfig,
    ) -> Self {
        let mut attendances = Vec::with_capacity(records.len());
        for record in records {
            if record.scheduled_date != date {
                tracing::warn!(
                    id = %record.id,
                    expected = %date,
                    actual = %record.scheduled_date,
                    "dropping attendance scheduled for another day"
                );
                continue;
            }
            attendances.push(record);
        }
        let mut day = Self {
            date,
            phase,
            sealed_at,
            attendances,
            queues: HashMap::new(),
            courses,
            config,
        };
        day.rebuild_queues();
        day
    }

    // ---------------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------------

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn phase(&self) -> DayPhase {
        self.phase
    }

    pub fn sealed_at(&self) -> Option<DateTime<Utc>> {
        self.sealed_at
    }

    pub fn attendance(&self, id: Uuid) -> Option<&AttendanceRecord> {
        self.attendances.iter().find(|r| r.id == id)
    }

    pub fn attendances(&self) -> &[AttendanceRecord] {
        &self.attendances
    }

    pub fn courses(&self) -> &CourseLedger {
        &self.courses
    }

    /// Courses outlive the day; hosts open and adjust them through here.
    pub fn courses_mut(&mut self) -> &mut CourseLedger {
        &mut self.courses
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    pub fn queue(&self, section: TreatmentType, status: AttendanceStatus) -> Option<&CallQueue> {
        self.queues.get(&(section, status))
    }

    /// Read-only projection behind "select all incomplete": checked-in or
    /// on-going records, not yet resolved.
    pub fn incomplete(&self) -> Vec<&AttendanceRecord> {
        self.attendances.iter().filter(|r| r.is_incomplete()).collect()
    }

    /// Operator-facing lines for the forced-resolution screen. Unknown
    /// patients fall back to the raw id.
    pub fn incomplete_roster(&self, directory: &dyn PatientDirectory) -> Vec<String> {
        self.incomplete()
            .iter()
            .map(|r| {
                let name = directory
                    .display_name(r.patient_id)
                    .unwrap_or_else(|| r.patient_id.to_string());
                format!("{name}: {} ({})", r.treatment_type, r.status)
            })
            .collect()
    }

    /// Course progress for a patient, with the next due date computed from
    /// this day's scheduled attendances.
    pub fn progress(&self, patient_id: Uuid, section: TreatmentType) -> Result<CourseProgress> {
        self.courses
            .progress(patient_id, section, &self.attendances, self.date)
    }

    // ---------------------------------------------------------------------------
    // Live operations
    // ---------------------------------------------------------------------------

    /// Creates a scheduled attendance for this date.
    pub fn schedule(
        &mut self,
        patient_id: Uuid,
        section: TreatmentType,
        priority: Priority,
    ) -> Result<Uuid> {
        self.guard_not_sealed()?;
        if !self.config.operates(section) {
            return Err(RoundsError::SectionClosed(section));
        }
        let record = AttendanceRecord::new(patient_id, section, priority, self.date);
        let id = record.id;
        self.attendances.push(record);
        Ok(id)
    }

    /// Checks a patient in and places them in the section's call queue.
    pub fn check_in(&mut self, id: Uuid) -> Result<()> {
        self.guard_not_sealed()?;
        let record = self.record_mut(id)?;
        record.transition(AttendanceStatus::CheckedIn, &TransitionPayload::default())?;
        let (section, priority, arrived) = (
            record.treatment_type,
            record.priority,
            record.arrived_at(),
        );
        self.bucket_mut(section, AttendanceStatus::CheckedIn)
            .insert(id, priority, arrived);
        Ok(())
    }

    /// Starts treatment: leaves the checked-in queue, enters the on-going
    /// bucket at the tail.
    pub fn begin_treatment(&mut self, id: Uuid) -> Result<()> {
        self.guard_not_sealed()?;
        let record = self.record_mut(id)?;
        record.transition(AttendanceStatus::OnGoing, &TransitionPayload::default())?;
        let (section, priority, arrived) = (
            record.treatment_type,
            record.priority,
            record.arrived_at(),
        );
        if let Some(q) = self.queues.get_mut(&(section, AttendanceStatus::CheckedIn)) {
            q.remove(id);
        }
        self.bucket_mut(section, AttendanceStatus::OnGoing)
            .push_back(id, priority, arrived);
        Ok(())
    }

    /// Calls the next patient for a section: the head of the checked-in
    /// queue starts treatment.
    pub fn call_next(&mut self, section: TreatmentType) -> Result<Uuid> {
        self.guard_not_sealed()?;
        let id = self
            .queues
            .get(&(section, AttendanceStatus::CheckedIn))
            .and_then(|q| q.peek())
            .ok_or_else(|| {
                RoundsError::EmptyQueue(format!("{section}/{}", AttendanceStatus::CheckedIn))
            })?;
        self.begin_treatment(id)?;
        Ok(id)
    }

    /// Completes an attendance and credits the session to the patient's
    /// course. Course anomalies are reported in the returned `CourseUpdate`,
    /// never as transition failures.
    pub fn complete(&mut self, id: Uuid, outcome: CompletionOutcome) -> Result<CourseUpdate> {
        self.guard_not_sealed()?;
        let record = self.record_mut(id)?;
        record.transition(
            AttendanceStatus::Completed,
            &TransitionPayload::completed(outcome),
        )?;
        let (section, patient_id) = (record.treatment_type, record.patient_id);
        self.drop_from_queues(id, section);
        Ok(self.credit_session(patient_id, section))
    }

    pub fn cancel(&mut self, id: Uuid, reason: impl Into<String>) -> Result<()> {
        self.guard_not_sealed()?;
        let record = self.record_mut(id)?;
        record.transition(
            AttendanceStatus::Cancelled,
            &TransitionPayload::cancelled(reason),
        )?;
        let section = record.treatment_type;
        self.drop_from_queues(id, section);
        Ok(())
    }

    /// Manual queue placement; the entry keeps the position until it leaves
    /// the bucket.
    pub fn reorder(
        &mut self,
        section: TreatmentType,
        status: AttendanceStatus,
        id: Uuid,
        new_index: usize,
    ) -> Result<()> {
        self.guard_not_sealed()?;
        match self.queues.get_mut(&(section, status)) {
            Some(q) => q.reorder(id, new_index),
            None => Err(RoundsError::AttendanceNotFound(id)),
        }
    }

    // ---------------------------------------------------------------------------
    // End-of-day reconciliation
    // ---------------------------------------------------------------------------

    /// Moves the day into reconciliation and returns the stragglers that
    /// must be resolved before sealing. Re-entry while reconciling is a
    /// no-op that recomputes the list.
    pub fn begin_end_of_day(&mut self) -> Result<Vec<Uuid>> {
        if self.phase == DayPhase::Sealed {
            return Err(RoundsError::DaySealed(self.date));
        }
        self.phase = DayPhase::Reconciling;
        Ok(self.incomplete().iter().map(|r| r.id).collect())
    }

    /// Force-completes stragglers with per-id outcome payloads. A
    /// checked-in straggler passes through on-going on its way out; a
    /// missing or empty payload fails that id alone.
    pub fn resolve_as_completed(
        &mut self,
        items: &[(Uuid, CompletionOutcome)],
    ) -> Result<ResolutionReport> {
        self.guard_reconciling("resolve_as_completed")?;
        let mut report = ResolutionReport::default();
        for (id, outcome) in items {
            report.entries.push(ResolutionEntry {
                id: *id,
                outcome: self.force_complete(*id, outcome),
            });
        }
        Ok(report)
    }

    /// Cancels stragglers with the reschedule reason and creates replacement
    /// scheduled attendances for `new_date`, returned in the report for the
    /// caller to persist.
    pub fn resolve_as_rescheduled(
        &mut self,
        ids: &[Uuid],
        new_date: NaiveDate,
    ) -> Result<ResolutionReport> {
        self.guard_reconciling("resolve_as_rescheduled")?;
        let mut report = ResolutionReport::default();
        for &id in ids {
            report.entries.push(ResolutionEntry {
                id,
                outcome: self.force_reschedule(id, new_date),
            });
        }
        Ok(report)
    }

    /// Seals the date. Fails while stragglers remain; succeeds exactly once.
    pub fn seal_day(&mut self) -> Result<DaySummary> {
        match self.phase {
            DayPhase::Sealed => return Err(RoundsError::DaySealed(self.date)),
            DayPhase::Open => {
                return Err(RoundsError::InvalidTransition {
                    from: DayPhase::Open.to_string(),
                    to: DayPhase::Sealed.to_string(),
                    reason: "end-of-day reconciliation has not begun".to_string(),
                })
            }
            DayPhase::Reconciling => {}
        }

        let unresolved = self.incomplete().len();
        if unresolved > 0 {
            return Err(RoundsError::UnresolvedAttendances(unresolved));
        }

        let sealed_at = Utc::now();
        let summary = DaySummary {
            date: self.date,
            total_attendances: self.attendances.len(),
            completed_count: self
                .attendances
                .iter()
                .filter(|r| r.status == AttendanceStatus::Completed)
                .count(),
            missed_count: self
                .attendances
                .iter()
                .filter(|r| {
                    r.status == AttendanceStatus::Cancelled
                        && r.cancellation_reason.as_deref() != Some(RESCHEDULED_REASON)
                })
                .count(),
            sealed_at,
        };
        self.phase = DayPhase::Sealed;
        self.sealed_at = Some(sealed_at);
        tracing::info!(
            date = %self.date,
            completed = summary.completed_count,
            missed = summary.missed_count,
            "day sealed"
        );
        Ok(summary)
    }

    // ---------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------

    fn force_complete(&mut self, id: Uuid, outcome: &CompletionOutcome) -> Result<Resolution> {
        // Validate the payload before touching the record, so a rejected id
        // is left exactly as it was.
        if outcome.is_empty() {
            return Err(RoundsError::MissingCompletionData);
        }
        let record = self.record_mut(id)?;
        if record.status == AttendanceStatus::CheckedIn {
            record.transition(AttendanceStatus::OnGoing, &TransitionPayload::default())?;
        }
        record.transition(
            AttendanceStatus::Completed,
            &TransitionPayload::completed(outcome.clone()),
        )?;
        let (section, patient_id) = (record.treatment_type, record.patient_id);
        self.drop_from_queues(id, section);
        Ok(Resolution::Completed(self.credit_session(patient_id, section)))
    }

    fn force_reschedule(&mut self, id: Uuid, new_date: NaiveDate) -> Result<Resolution> {
        let record = self.record_mut(id)?;
        record.transition(
            AttendanceStatus::Cancelled,
            &TransitionPayload::cancelled(RESCHEDULED_REASON),
        )?;
        let (section, patient_id, priority) =
            (record.treatment_type, record.patient_id, record.priority);
        self.drop_from_queues(id, section);
        let replacement = AttendanceRecord::new(patient_id, section, priority, new_date);
        Ok(Resolution::Rescheduled { replacement })
    }

    fn credit_session(&mut self, patient_id: Uuid, section: TreatmentType) -> CourseUpdate {
        match self.courses.record_completion(patient_id, section) {
            Ok(course) => CourseUpdate::Recorded {
                sessions_completed: course.sessions_completed,
                total_sessions_recommended: course.total_sessions_recommended,
                finished: !course.is_active(),
            },
            Err(RoundsError::NoActiveCourse { .. }) => {
                let Some(total) = self.config.auto_open_course else {
                    tracing::warn!(
                        patient = %patient_id,
                        section = %section,
                        "completed attendance has no active course"
                    );
                    return CourseUpdate::NoActiveCourse;
                };
                if let Err(e) = self.courses.open_course(patient_id, section, total) {
                    tracing::warn!(error = %e, "auto-open course failed");
                    return CourseUpdate::NoActiveCourse;
                }
                match self.courses.record_completion(patient_id, section) {
                    Ok(course) => CourseUpdate::AutoOpened {
                        sessions_completed: course.sessions_completed,
                        total_sessions_recommended: course.total_sessions_recommended,
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "auto-opened course rejected session");
                        CourseUpdate::NoActiveCourse
                    }
                }
            }
            Err(RoundsError::CourseAlreadyFinished { .. }) => {
                tracing::warn!(
                    patient = %patient_id,
                    section = %section,
                    "completed attendance against a finished course"
                );
                CourseUpdate::AlreadyFinished
            }
            Err(e) => {
                tracing::warn!(error = %e, "course ledger rejected session credit");
                CourseUpdate::NoActiveCourse
            }
        }
    }

    fn record_mut(&mut self, id: Uuid) -> Result<&mut AttendanceRecord> {
        self.attendances
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RoundsError::AttendanceNotFound(id))
    }

    fn bucket_mut(&mut self, section: TreatmentType, status: AttendanceStatus) -> &mut CallQueue {
        self.queues
            .entry((section, status))
            .or_insert_with(|| CallQueue::new(format!("{section}/{status}")))
    }

    fn drop_from_queues(&mut self, id: Uuid, section: TreatmentType) {
        for status in [AttendanceStatus::CheckedIn, AttendanceStatus::OnGoing] {
            if let Some(q) = self.queues.get_mut(&(section, status)) {
                q.remove(id);
            }
        }
    }

    fn rebuild_queues(&mut self) {
        let mut checked = Vec::new();
        let mut ongoing = Vec::new();
        for r in &self.attendances {
            match r.status {
                AttendanceStatus::CheckedIn => {
                    checked.push((r.id, r.treatment_type, r.priority, r.arrived_at()));
                }
                AttendanceStatus::OnGoing => {
                    ongoing.push((
                        r.id,
                        r.treatment_type,
                        r.priority,
                        r.arrived_at(),
                        r.started_at.unwrap_or(r.created_at),
                    ));
                }
                _ => {}
            }
        }
        for (id, section, priority, arrived) in checked {
            self.bucket_mut(section, AttendanceStatus::CheckedIn)
                .insert(id, priority, arrived);
        }
        ongoing.sort_by_key(|entry| entry.4);
        for (id, section, priority, arrived, _) in ongoing {
            self.bucket_mut(section, AttendanceStatus::OnGoing)
                .push_back(id, priority, arrived);
        }
    }

    fn guard_not_sealed(&self) -> Result<()> {
        if self.phase == DayPhase::Sealed {
            return Err(RoundsError::DaySealed(self.date));
        }
        Ok(())
    }

    fn guard_reconciling(&self, op: &str) -> Result<()> {
        match self.phase {
            DayPhase::Reconciling => Ok(()),
            DayPhase::Sealed => Err(RoundsError::DaySealed(self.date)),
            DayPhase::Open => Err(RoundsError::InvalidTransition {
                from: DayPhase::Open.to_string(),
                to: DayPhase::Reconciling.to_string(),
                reason: format!("{op} requires begin_end_of_day first"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::StaticDirectory;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn day() -> ClinicDay {
        ClinicDay::open(date(14), ClinicConfig::default())
    }

    fn completed_attendance(day: &mut ClinicDay, patient: Uuid) -> Uuid {
        let id = day
            .schedule(patient, TreatmentType::Spiritual, Priority::Standard)
            .unwrap();
        day.check_in(id).unwrap();
        day.begin_treatment(id).unwrap();
        day.complete(id, CompletionOutcome::with_notes("ok")).unwrap();
        id
    }

    #[test]
    fn end_to_end_reconciliation() {
        let mut day = day();
        completed_attendance(&mut day, Uuid::new_v4());
        completed_attendance(&mut day, Uuid::new_v4());

        let straggler_patient = Uuid::new_v4();
        let straggler = day
            .schedule(straggler_patient, TreatmentType::Rod, Priority::Standard)
            .unwrap();
        day.check_in(straggler).unwrap();

        let incomplete = day.begin_end_of_day().unwrap();
        assert_eq!(incomplete, vec![straggler]);

        let err = day.seal_day().unwrap_err();
        assert!(matches!(err, RoundsError::UnresolvedAttendances(1)));
        assert_eq!(day.phase(), DayPhase::Reconciling);

        let report = day
            .resolve_as_rescheduled(&[straggler], date(21))
            .unwrap();
        assert_eq!(report.resolved_count(), 1);
        let replacements = report.replacements();
        assert_eq!(replacements.len(), 1);
        assert_eq!(replacements[0].patient_id, straggler_patient);
        assert_eq!(replacements[0].scheduled_date, date(21));
        assert_eq!(replacements[0].status, AttendanceStatus::Scheduled);

        let summary = day.seal_day().unwrap();
        assert_eq!(summary.total_attendances, 3);
        assert_eq!(summary.completed_count, 2);
        assert_eq!(summary.missed_count, 0);
        assert_eq!(day.phase(), DayPhase::Sealed);
    }

    #[test]
    fn sealing_twice_fails_without_mutation() {
        let mut day = day();
        completed_attendance(&mut day, Uuid::new_v4());
        day.begin_end_of_day().unwrap();
        let summary = day.seal_day().unwrap();

        let err = day.seal_day().unwrap_err();
        assert!(matches!(err, RoundsError::DaySealed(_)));
        assert_eq!(day.sealed_at(), Some(summary.sealed_at));
        assert_eq!(day.phase(), DayPhase::Sealed);
    }

    #[test]
    fn sealed_day_rejects_all_writes() {
        let mut day = day();
        let done = completed_attendance(&mut day, Uuid::new_v4());
        day.begin_end_of_day().unwrap();
        day.seal_day().unwrap();

        assert!(matches!(
            day.schedule(Uuid::new_v4(), TreatmentType::Rod, Priority::Standard),
            Err(RoundsError::DaySealed(_))
        ));
        assert!(matches!(day.check_in(done), Err(RoundsError::DaySealed(_))));
        assert!(matches!(
            day.cancel(done, "late edit"),
            Err(RoundsError::DaySealed(_))
        ));
        assert!(matches!(
            day.begin_end_of_day(),
            Err(RoundsError::DaySealed(_))
        ));
        assert!(matches!(
            day.resolve_as_rescheduled(&[done], date(21)),
            Err(RoundsError::DaySealed(_))
        ));
    }

    #[test]
    fn seal_before_reconciliation_fails() {
        let mut day = day();
        assert!(matches!(
            day.seal_day(),
            Err(RoundsError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn resolution_requires_reconciling_phase() {
        let mut day = day();
        let id = day
            .schedule(Uuid::new_v4(), TreatmentType::Rod, Priority::Standard)
            .unwrap();
        day.check_in(id).unwrap();
        assert!(matches!(
            day.resolve_as_completed(&[(id, CompletionOutcome::with_notes("x"))]),
            Err(RoundsError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn bulk_completion_reports_per_id() {
        let mut day = day();
        let a = day
            .schedule(Uuid::new_v4(), TreatmentType::Spiritual, Priority::Standard)
            .unwrap();
        let b = day
            .schedule(Uuid::new_v4(), TreatmentType::Spiritual, Priority::Standard)
            .unwrap();
        day.check_in(a).unwrap();
        day.check_in(b).unwrap();
        day.begin_end_of_day().unwrap();

        let report = day
            .resolve_as_completed(&[
                (a, CompletionOutcome::default()),
                (b, CompletionOutcome::with_notes("recovered")),
            ])
            .unwrap();
        assert_eq!(report.resolved_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(matches!(
            report.outcome_for(a),
            Some(Err(RoundsError::MissingCompletionData))
        ));
        assert!(matches!(report.outcome_for(b), Some(Ok(_))));

        // The failed id is untouched and still blocks sealing.
        assert_eq!(
            day.attendance(a).unwrap().status,
            AttendanceStatus::CheckedIn
        );
        assert!(day.attendance(a).unwrap().started_at.is_none());
        assert_eq!(
            day.attendance(b).unwrap().status,
            AttendanceStatus::Completed
        );
        assert!(matches!(
            day.seal_day(),
            Err(RoundsError::UnresolvedAttendances(1))
        ));
    }

    #[test]
    fn bulk_completion_fast_forwards_checked_in() {
        let mut day = day();
        let id = day
            .schedule(Uuid::new_v4(), TreatmentType::LightBath, Priority::Standard)
            .unwrap();
        day.check_in(id).unwrap();
        day.begin_end_of_day().unwrap();

        day.resolve_as_completed(&[(id, CompletionOutcome::with_notes("done late"))])
            .unwrap();
        let record = day.attendance(id).unwrap();
        assert_eq!(record.status, AttendanceStatus::Completed);
        assert!(record.started_at.is_some());
        assert!(record.started_at.unwrap() <= record.completed_at.unwrap());
    }

    #[test]
    fn unknown_id_in_bulk_fails_that_id_only() {
        let mut day = day();
        let known = day
            .schedule(Uuid::new_v4(), TreatmentType::Rod, Priority::Standard)
            .unwrap();
        day.check_in(known).unwrap();
        day.begin_end_of_day().unwrap();

        let ghost = Uuid::new_v4();
        let report = day.resolve_as_rescheduled(&[ghost, known], date(21)).unwrap();
        assert!(matches!(
            report.outcome_for(ghost),
            Some(Err(RoundsError::AttendanceNotFound(_)))
        ));
        assert!(matches!(report.outcome_for(known), Some(Ok(_))));
        assert!(day.seal_day().is_ok());
    }

    #[test]
    fn call_order_follows_priority_then_arrival() {
        let mut day = day();
        let standard = day
            .schedule(Uuid::new_v4(), TreatmentType::Spiritual, Priority::Standard)
            .unwrap();
        let exception = day
            .schedule(Uuid::new_v4(), TreatmentType::Spiritual, Priority::Exception)
            .unwrap();
        let elderly = day
            .schedule(
                Uuid::new_v4(),
                TreatmentType::Spiritual,
                Priority::ElderlyOrChild,
            )
            .unwrap();
        day.check_in(standard).unwrap();
        day.check_in(exception).unwrap();
        day.check_in(elderly).unwrap();

        assert_eq!(day.call_next(TreatmentType::Spiritual).unwrap(), exception);
        assert_eq!(day.call_next(TreatmentType::Spiritual).unwrap(), elderly);
        assert_eq!(day.call_next(TreatmentType::Spiritual).unwrap(), standard);
        assert!(matches!(
            day.call_next(TreatmentType::Spiritual),
            Err(RoundsError::EmptyQueue(_))
        ));

        // All three moved to the on-going bucket in call order.
        let ongoing = day
            .queue(TreatmentType::Spiritual, AttendanceStatus::OnGoing)
            .unwrap();
        assert_eq!(ongoing.ids(), vec![exception, elderly, standard]);
    }

    #[test]
    fn completion_credits_active_course() {
        let mut day = day();
        let patient = Uuid::new_v4();
        day.courses_mut()
            .open_course(patient, TreatmentType::Spiritual, 2)
            .unwrap();

        let id = day
            .schedule(patient, TreatmentType::Spiritual, Priority::Standard)
            .unwrap();
        day.check_in(id).unwrap();
        day.begin_treatment(id).unwrap();
        let update = day
            .complete(id, CompletionOutcome::with_notes("first session"))
            .unwrap();
        assert_eq!(
            update,
            CourseUpdate::Recorded {
                sessions_completed: 1,
                total_sessions_recommended: 2,
                finished: false,
            }
        );

        let progress = day.progress(patient, TreatmentType::Spiritual).unwrap();
        assert_eq!(progress.sessions_completed, 1);
    }

    #[test]
    fn completion_without_course_is_reported_not_dropped() {
        let mut day = day();
        let patient = Uuid::new_v4();
        let id = day
            .schedule(patient, TreatmentType::Rod, Priority::Standard)
            .unwrap();
        day.check_in(id).unwrap();
        day.begin_treatment(id).unwrap();
        let update = day.complete(id, CompletionOutcome::with_notes("ok")).unwrap();
        assert_eq!(update, CourseUpdate::NoActiveCourse);
        // The transition itself still applied.
        assert_eq!(
            day.attendance(id).unwrap().status,
            AttendanceStatus::Completed
        );
    }

    #[test]
    fn auto_open_course_when_configured() {
        let config = ClinicConfig {
            auto_open_course: Some(4),
            ..ClinicConfig::default()
        };
        let mut day = ClinicDay::open(date(14), config);
        let patient = Uuid::new_v4();
        let id = day
            .schedule(patient, TreatmentType::LightBath, Priority::Standard)
            .unwrap();
        day.check_in(id).unwrap();
        day.begin_treatment(id).unwrap();
        let update = day.complete(id, CompletionOutcome::with_notes("ok")).unwrap();
        assert_eq!(
            update,
            CourseUpdate::AutoOpened {
                sessions_completed: 1,
                total_sessions_recommended: 4,
            }
        );
        assert!(day
            .courses()
            .active_course(patient, TreatmentType::LightBath)
            .is_some());
    }

    #[test]
    fn closed_section_rejects_scheduling() {
        let config = ClinicConfig {
            sections: vec![TreatmentType::Spiritual],
            ..ClinicConfig::default()
        };
        let mut day = ClinicDay::open(date(14), config);
        assert!(matches!(
            day.schedule(Uuid::new_v4(), TreatmentType::Rod, Priority::Standard),
            Err(RoundsError::SectionClosed(TreatmentType::Rod))
        ));
    }

    #[test]
    fn missed_count_excludes_reschedules() {
        let mut day = day();
        completed_attendance(&mut day, Uuid::new_v4());

        let missed = day
            .schedule(Uuid::new_v4(), TreatmentType::Rod, Priority::Standard)
            .unwrap();
        day.check_in(missed).unwrap();
        day.cancel(missed, "left before being seen").unwrap();

        let moved = day
            .schedule(Uuid::new_v4(), TreatmentType::Rod, Priority::Standard)
            .unwrap();
        day.check_in(moved).unwrap();
        day.begin_end_of_day().unwrap();
        day.resolve_as_rescheduled(&[moved], date(21)).unwrap();

        let summary = day.seal_day().unwrap();
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.missed_count, 1);
    }

    #[test]
    fn begin_end_of_day_with_nothing_pending_allows_immediate_seal() {
        let mut day = day();
        let incomplete = day.begin_end_of_day().unwrap();
        assert!(incomplete.is_empty());
        let summary = day.seal_day().unwrap();
        assert_eq!(summary.total_attendances, 0);
    }

    #[test]
    fn summary_serializes_for_hosts() {
        let mut day = day();
        completed_attendance(&mut day, Uuid::new_v4());
        day.begin_end_of_day().unwrap();
        let summary = day.seal_day().unwrap();

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"completed_count\":1"));
        let parsed: DaySummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn reorder_overrides_call_order() {
        let mut day = day();
        let a = day
            .schedule(Uuid::new_v4(), TreatmentType::Spiritual, Priority::Standard)
            .unwrap();
        let b = day
            .schedule(Uuid::new_v4(), TreatmentType::Spiritual, Priority::Standard)
            .unwrap();
        day.check_in(a).unwrap();
        day.check_in(b).unwrap();

        day.reorder(TreatmentType::Spiritual, AttendanceStatus::CheckedIn, b, 0)
            .unwrap();
        assert_eq!(day.call_next(TreatmentType::Spiritual).unwrap(), b);
    }

    #[test]
    fn roster_uses_directory_names() {
        let mut day = day();
        let patient = Uuid::new_v4();
        let id = day
            .schedule(patient, TreatmentType::LightBath, Priority::Standard)
            .unwrap();
        day.check_in(id).unwrap();

        let mut directory = StaticDirectory::new();
        directory.insert(patient, "Ana Souza");
        let roster = day.incomplete_roster(&directory);
        assert_eq!(roster.len(), 1);
        assert!(roster[0].contains("Ana Souza"));
        assert!(roster[0].contains("light_bath"));
    }

    #[test]
    fn restore_rebuilds_queues_and_drops_foreign_records() {
        let patient = Uuid::new_v4();
        let mut checked = AttendanceRecord::new(
            patient,
            TreatmentType::Spiritual,
            Priority::Standard,
            date(14),
        );
        checked.check_in().unwrap();
        let foreign = AttendanceRecord::new(
            Uuid::new_v4(),
            TreatmentType::Spiritual,
            Priority::Standard,
            date(15),
        );

        let day = ClinicDay::restore(
            date(14),
            DayPhase::Open,
            None,
            vec![checked.clone(), foreign],
            CourseLedger::new(),
            ClinicConfig::default(),
        );
        assert_eq!(day.attendances().len(), 1);
        let queue = day
            .queue(TreatmentType::Spiritual, AttendanceStatus::CheckedIn)
            .unwrap();
        assert_eq!(queue.ids(), vec![checked.id]);
    }

    #[test]
    fn restored_sealed_day_stays_sealed() {
        let day_date = date(14);
        let mut restored = ClinicDay::restore(
            day_date,
            DayPhase::Sealed,
            Some(Utc::now()),
            Vec::new(),
            CourseLedger::new(),
            ClinicConfig::default(),
        );
        assert!(matches!(
            restored.schedule(Uuid::new_v4(), TreatmentType::Rod, Priority::Standard),
            Err(RoundsError::DaySealed(d)) if d == day_date
        ));
    }
}
