use crate::error::{Result, RoundsError};
use crate::types::{AttendanceStatus, Priority, TreatmentType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CompletionOutcome
// ---------------------------------------------------------------------------

/// Outcome data attached when an attendance completes. At least one of the
/// two fields must be non-blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
}

impl CompletionOutcome {
    pub fn with_notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            recommendations: None,
        }
    }

    pub fn with_recommendations(recommendations: impl Into<String>) -> Self {
        Self {
            notes: None,
            recommendations: Some(recommendations.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        !is_present(&self.notes) && !is_present(&self.recommendations)
    }
}

fn is_present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

// ---------------------------------------------------------------------------
// TransitionPayload
// ---------------------------------------------------------------------------

/// Data accompanying a transition request. `outcome` is consumed by
/// `completed`, `reason` by `cancelled`; the other edges take no payload.
#[derive(Debug, Clone, Default)]
pub struct TransitionPayload {
    pub outcome: Option<CompletionOutcome>,
    pub reason: Option<String>,
}

impl TransitionPayload {
    pub fn completed(outcome: CompletionOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            reason: None,
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            outcome: None,
            reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// AttendanceRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub treatment_type: TreatmentType,
    pub priority: Priority,
    pub status: AttendanceStatus,
    pub scheduled_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl AttendanceRecord {
    pub fn new(
        patient_id: Uuid,
        treatment_type: TreatmentType,
        priority: Priority,
        scheduled_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            treatment_type,
            priority,
            status: AttendanceStatus::Scheduled,
            scheduled_date,
            created_at: Utc::now(),
            checked_in_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            notes: None,
            recommendations: None,
            cancellation_reason: None,
        }
    }

    // ---------------------------------------------------------------------------
    // State machine
    // ---------------------------------------------------------------------------

    /// Validates the edge without applying it. Re-entering the current
    /// non-terminal state is accepted (duplicate UI events); terminal states
    /// accept nothing further.
    pub fn can_transition_to(&self, target: AttendanceStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.invalid(target, "attendance is closed"));
        }
        if target == self.status {
            return Ok(());
        }

        let allowed = matches!(
            (self.status, target),
            (AttendanceStatus::Scheduled, AttendanceStatus::CheckedIn)
                | (AttendanceStatus::CheckedIn, AttendanceStatus::OnGoing)
                | (AttendanceStatus::OnGoing, AttendanceStatus::Completed)
                | (AttendanceStatus::Scheduled, AttendanceStatus::Cancelled)
                | (AttendanceStatus::CheckedIn, AttendanceStatus::Cancelled)
                | (AttendanceStatus::OnGoing, AttendanceStatus::Cancelled)
        );
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(target, "no such edge"))
        }
    }

    /// Applies a transition, setting the matching timestamp exactly once and
    /// consuming the payload the target requires.
    pub fn transition(&mut self, target: AttendanceStatus, payload: &TransitionPayload) -> Result<()> {
        self.can_transition_to(target)?;
        if target == self.status {
            // Duplicate event; timestamps stay untouched.
            return Ok(());
        }

        let now = Utc::now();
        match target {
            AttendanceStatus::CheckedIn => {
                if self.checked_in_at.is_none() {
                    self.checked_in_at = Some(now);
                }
            }
            AttendanceStatus::OnGoing => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            AttendanceStatus::Completed => {
                let outcome = payload
                    .outcome
                    .as_ref()
                    .filter(|o| !o.is_empty())
                    .ok_or(RoundsError::MissingCompletionData)?;
                self.notes = outcome.notes.clone().filter(|s| !s.trim().is_empty());
                self.recommendations = outcome
                    .recommendations
                    .clone()
                    .filter(|s| !s.trim().is_empty());
                self.completed_at = Some(now);
            }
            AttendanceStatus::Cancelled => {
                let reason = payload
                    .reason
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or(RoundsError::MissingCancellationReason)?;
                self.cancellation_reason = Some(reason.to_string());
                self.cancelled_at = Some(now);
            }
            AttendanceStatus::Scheduled => unreachable!("no edge re-enters scheduled"),
        }
        self.status = target;
        Ok(())
    }

    pub fn check_in(&mut self) -> Result<()> {
        self.transition(AttendanceStatus::CheckedIn, &TransitionPayload::default())
    }

    pub fn begin_treatment(&mut self) -> Result<()> {
        self.transition(AttendanceStatus::OnGoing, &TransitionPayload::default())
    }

    pub fn complete(&mut self, outcome: CompletionOutcome) -> Result<()> {
        self.transition(
            AttendanceStatus::Completed,
            &TransitionPayload::completed(outcome),
        )
    }

    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(
            AttendanceStatus::Cancelled,
            &TransitionPayload::cancelled(reason),
        )
    }

    /// Checked in or on-going: arrived but not yet resolved.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self.status,
            AttendanceStatus::CheckedIn | AttendanceStatus::OnGoing
        )
    }

    /// Arrival instant used for queue tiebreaks; records not yet checked in
    /// fall back to creation time.
    pub fn arrived_at(&self) -> DateTime<Utc> {
        self.checked_in_at.unwrap_or(self.created_at)
    }

    fn invalid(&self, target: AttendanceStatus, reason: &str) -> RoundsError {
        RoundsError::InvalidTransition {
            from: self.status.to_string(),
            to: target.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AttendanceRecord {
        AttendanceRecord::new(
            Uuid::new_v4(),
            TreatmentType::Spiritual,
            Priority::Standard,
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        )
    }

    #[test]
    fn full_lifecycle_sets_timestamps_in_order() {
        let mut r = record();
        r.check_in().unwrap();
        r.begin_treatment().unwrap();
        r.complete(CompletionOutcome::with_notes("responded well")).unwrap();

        assert_eq!(r.status, AttendanceStatus::Completed);
        let checked_in = r.checked_in_at.unwrap();
        let started = r.started_at.unwrap();
        let completed = r.completed_at.unwrap();
        assert!(checked_in <= started);
        assert!(started <= completed);
        assert!(r.cancelled_at.is_none());
    }

    #[test]
    fn check_in_is_idempotent() {
        let mut r = record();
        r.check_in().unwrap();
        let first = r.checked_in_at.unwrap();
        r.check_in().unwrap();
        assert_eq!(r.checked_in_at.unwrap(), first);
        assert_eq!(r.status, AttendanceStatus::CheckedIn);
    }

    #[test]
    fn skipping_states_is_rejected() {
        let mut r = record();
        let err = r
            .transition(AttendanceStatus::OnGoing, &TransitionPayload::default())
            .unwrap_err();
        assert!(matches!(err, RoundsError::InvalidTransition { .. }));

        let mut r = record();
        r.check_in().unwrap();
        assert!(r
            .complete(CompletionOutcome::with_notes("x"))
            .is_err());
    }

    #[test]
    fn completion_requires_outcome_data() {
        let mut r = record();
        r.check_in().unwrap();
        r.begin_treatment().unwrap();

        let err = r.complete(CompletionOutcome::default()).unwrap_err();
        assert!(matches!(err, RoundsError::MissingCompletionData));

        let err = r.complete(CompletionOutcome::with_notes("   ")).unwrap_err();
        assert!(matches!(err, RoundsError::MissingCompletionData));
        assert_eq!(r.status, AttendanceStatus::OnGoing);

        r.complete(CompletionOutcome::with_recommendations("return next week"))
            .unwrap();
        assert_eq!(r.recommendations.as_deref(), Some("return next week"));
        assert!(r.notes.is_none());
    }

    #[test]
    fn cancellation_requires_reason() {
        let mut r = record();
        let err = r
            .transition(AttendanceStatus::Cancelled, &TransitionPayload::default())
            .unwrap_err();
        assert!(matches!(err, RoundsError::MissingCancellationReason));
        assert_eq!(r.status, AttendanceStatus::Scheduled);

        r.cancel("patient left").unwrap();
        assert_eq!(r.cancellation_reason.as_deref(), Some("patient left"));
        assert!(r.cancelled_at.is_some());
    }

    #[test]
    fn cancel_reachable_from_every_open_state() {
        let mut r = record();
        r.cancel("no show").unwrap();
        assert_eq!(r.status, AttendanceStatus::Cancelled);

        let mut r = record();
        r.check_in().unwrap();
        r.cancel("felt unwell").unwrap();
        assert_eq!(r.status, AttendanceStatus::Cancelled);

        let mut r = record();
        r.check_in().unwrap();
        r.begin_treatment().unwrap();
        r.cancel("interrupted").unwrap();
        assert_eq!(r.status, AttendanceStatus::Cancelled);
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut r = record();
        r.check_in().unwrap();
        r.begin_treatment().unwrap();
        r.complete(CompletionOutcome::with_notes("done")).unwrap();

        for target in AttendanceStatus::all() {
            assert!(
                matches!(
                    r.can_transition_to(*target),
                    Err(RoundsError::InvalidTransition { .. })
                ),
                "completed record accepted transition to {target}"
            );
        }

        let mut r = record();
        r.cancel("gone").unwrap();
        assert!(r.check_in().is_err());
        assert!(r.cancel("again").is_err());
    }

    #[test]
    fn status_stays_within_known_set() {
        let mut r = record();
        let _ = r.check_in();
        let _ = r.begin_treatment();
        let _ = r.complete(CompletionOutcome::with_notes("ok"));
        assert!(AttendanceStatus::all().contains(&r.status));
    }
}
