use chrono::NaiveDate;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLINIC_DIR: &str = ".clinic";
pub const DAYS_DIR: &str = ".clinic/days";

pub const CONFIG_FILE: &str = ".clinic/config.yaml";
pub const COURSES_FILE: &str = ".clinic/courses.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn clinic_dir(root: &Path) -> PathBuf {
    root.join(CLINIC_DIR)
}

pub fn days_dir(root: &Path) -> PathBuf {
    root.join(DAYS_DIR)
}

/// One YAML document per calendar day, named by ISO date.
pub fn day_file(root: &Path, date: NaiveDate) -> PathBuf {
    days_dir(root).join(format!("{date}.yaml"))
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn courses_path(root: &Path) -> PathBuf {
    root.join(COURSES_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_file_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let path = day_file(Path::new("/clinic"), date);
        assert_eq!(path, PathBuf::from("/clinic/.clinic/days/2026-03-14.yaml"));
    }
}
