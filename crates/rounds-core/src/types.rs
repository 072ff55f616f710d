use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TreatmentType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentType {
    Spiritual,
    LightBath,
    Rod,
}

impl TreatmentType {
    pub fn all() -> &'static [TreatmentType] {
        &[
            TreatmentType::Spiritual,
            TreatmentType::LightBath,
            TreatmentType::Rod,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TreatmentType::Spiritual => "spiritual",
            TreatmentType::LightBath => "light_bath",
            TreatmentType::Rod => "rod",
        }
    }
}

impl fmt::Display for TreatmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TreatmentType {
    type Err = crate::error::RoundsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spiritual" => Ok(TreatmentType::Spiritual),
            "light_bath" | "light-bath" => Ok(TreatmentType::LightBath),
            "rod" => Ok(TreatmentType::Rod),
            _ => Err(crate::error::RoundsError::UnknownTreatmentType(
                s.to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Call-order rank within a section. Variant order is the queue order:
/// `Exception` is served first, `Standard` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Exception,
    ElderlyOrChild,
    Standard,
}

impl Priority {
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Exception => "exception",
            Priority::ElderlyOrChild => "elderly_or_child",
            Priority::Standard => "standard",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::error::RoundsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exception" => Ok(Priority::Exception),
            "elderly_or_child" => Ok(Priority::ElderlyOrChild),
            "standard" => Ok(Priority::Standard),
            _ => Err(crate::error::RoundsError::UnknownPriority(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// AttendanceStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Scheduled,
    CheckedIn,
    OnGoing,
    Completed,
    Cancelled,
}

impl AttendanceStatus {
    pub fn all() -> &'static [AttendanceStatus] {
        &[
            AttendanceStatus::Scheduled,
            AttendanceStatus::CheckedIn,
            AttendanceStatus::OnGoing,
            AttendanceStatus::Completed,
            AttendanceStatus::Cancelled,
        ]
    }

    /// `Completed` and `Cancelled` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, AttendanceStatus::Completed | AttendanceStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Scheduled => "scheduled",
            AttendanceStatus::CheckedIn => "checked_in",
            AttendanceStatus::OnGoing => "on_going",
            AttendanceStatus::Completed => "completed",
            AttendanceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = crate::error::RoundsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AttendanceStatus::Scheduled),
            "checked_in" => Ok(AttendanceStatus::CheckedIn),
            "on_going" => Ok(AttendanceStatus::OnGoing),
            "completed" => Ok(AttendanceStatus::Completed),
            "cancelled" => Ok(AttendanceStatus::Cancelled),
            _ => Err(crate::error::RoundsError::UnknownStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
