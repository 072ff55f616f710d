use crate::error::Result;
use crate::io;
use crate::paths;
use crate::types::TreatmentType;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ClinicConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicConfig {
    /// Treatment sections the clinic operates. Scheduling into an unlisted
    /// section is rejected.
    #[serde(default = "default_sections")]
    pub sections: Vec<TreatmentType>,

    /// When set, completing an attendance with no active course opens one
    /// with this many recommended sessions and counts the completion as
    /// session one. When unset, the completion is reported as
    /// `NoActiveCourse` instead.
    #[serde(default)]
    pub auto_open_course: Option<u32>,
}

fn default_sections() -> Vec<TreatmentType> {
    TreatmentType::all().to_vec()
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            auto_open_course: None,
        }
    }
}

impl ClinicConfig {
    pub fn operates(&self, section: TreatmentType) -> bool {
        self.sections.contains(&section)
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Loads `.clinic/config.yaml`, falling back to defaults when the file
    /// does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: ClinicConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&path, data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
