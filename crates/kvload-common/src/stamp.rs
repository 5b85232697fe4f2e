//! Run timestamps for naming per-run output files

use chrono::{DateTime, Local};

/// Format used in file names, e.g. `2024-01-18_09_05_33`
pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H_%M_%S";

/// Wall-clock instant a run started, captured once so every output file of
/// the run carries the same stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStamp(DateTime<Local>);

impl RunStamp {
    pub fn now() -> Self {
        Self(Local::now())
    }

    pub fn at(instant: DateTime<Local>) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> DateTime<Local> {
        self.0
    }

    /// `<prefix>_<stamp>.<ext>`
    pub fn file_name(&self, prefix: &str, ext: &str) -> String {
        format!("{}_{}.{}", prefix, self, ext)
    }
}

impl std::fmt::Display for RunStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_format() {
        let instant = Local.with_ymd_and_hms(2024, 1, 18, 9, 5, 33).unwrap();
        let stamp = RunStamp::at(instant);

        assert_eq!(stamp.to_string(), "2024-01-18_09_05_33");
        assert_eq!(stamp.file_name("errorData", "txt"), "errorData_2024-01-18_09_05_33.txt");
    }
}
