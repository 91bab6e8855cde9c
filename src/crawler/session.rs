//! Session file naming
//!
//! A session is one day of harvesting; every run on the same day shares one
//! queue database so an interrupted run resumes where it stopped.

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Session database file name for a date: `Psi-Report_YYYY-MM-DD.db`
pub fn session_file_name(date: NaiveDate) -> String {
    format!("Psi-Report_{}.db", date.format("%Y-%m-%d"))
}

/// Session database path for today's session inside `directory`
pub fn today_session_path(directory: &Path) -> PathBuf {
    directory.join(session_file_name(Local::now().date_naive()))
}

/// Replaces a leading `~` with the user's home directory
///
/// Paths such as `~user/...` are left alone, as is everything when `HOME`
/// is not set.
pub fn expand_home(path: &str) -> PathBuf {
    let home = match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home),
        None => return PathBuf::from(path),
    };

    if path == "~" {
        return home;
    }

    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}
