//! Student roster loaded from CSV.
//!
//! The roster maps a student identifier (the QR payload) to a display name.
//! It is loaded once at startup and shared read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// A single student from the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    /// Unique identifier encoded in the student's QR code.
    pub id: String,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
}

/// Mapping from student identifier to [`Student`].
///
/// Iteration is ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    students: BTreeMap<String, Student>,
}

impl Roster {
    /// Load a roster from a CSV file with `ID` and `Name` columns.
    ///
    /// Rows with an empty `ID` are skipped. A repeated `ID` replaces the
    /// earlier row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a row cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let roster_err = |source| Error::RosterRead {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(roster_err)?;

        let mut roster = Self::default();
        for row in reader.deserialize::<RosterRow>() {
            let row = row.map_err(roster_err)?;
            if row.id.is_empty() {
                warn!(path = %path.display(), "Skipping roster row without an ID");
                continue;
            }
            if let Some(previous) = roster.insert(Student {
                id: row.id,
                name: row.name,
            }) {
                warn!(id = %previous.id, "Duplicate roster ID, keeping the last row");
            }
        }

        info!(
            path = %path.display(),
            students = roster.len(),
            "Roster loaded"
        );
        Ok(roster)
    }

    /// Load a roster, falling back to an empty one on any error.
    ///
    /// The error is logged; callers must tolerate an empty roster.
    #[must_use]
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(roster) => roster,
            Err(e) => {
                error!(error = %e, "Could not load roster, continuing with an empty one");
                Self::default()
            }
        }
    }

    /// Build a roster from `(id, name)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut roster = Self::default();
        for (id, name) in pairs {
            roster.insert(Student {
                id: id.into(),
                name: name.into(),
            });
        }
        roster
    }

    /// Insert a student, returning the one it replaced.
    pub fn insert(&mut self, student: Student) -> Option<Student> {
        debug!(id = %student.id, "Adding student to roster");
        self.students.insert(student.id.clone(), student)
    }

    /// Look up a student by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    /// Number of students.
    #[must_use]
    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// Whether the roster has no students.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Iterate over students in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_roster(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_basic() {
        let (_dir, path) = write_roster("ID,Name\nS1,Alice\nS2,Bob\n");
        let roster = Roster::load(&path).unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get("S1").unwrap().name, "Alice");
        assert_eq!(roster.get("S2").unwrap().name, "Bob");
        assert!(roster.get("S3").is_none());
    }

    #[test]
    fn test_load_trims_whitespace_and_ignores_extra_columns() {
        let (_dir, path) = write_roster("ID, Name, Grade\n S1 , Alice Smith ,7\n");
        let roster = Roster::load(&path).unwrap();

        let student = roster.get("S1").unwrap();
        assert_eq!(student.id, "S1");
        assert_eq!(student.name, "Alice Smith");
    }

    #[test]
    fn test_load_duplicate_last_wins() {
        let (_dir, path) = write_roster("ID,Name\nS1,Alice\nS1,Alicia\n");
        let roster = Roster::load(&path).unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("S1").unwrap().name, "Alicia");
    }

    #[test]
    fn test_load_skips_empty_ids() {
        let (_dir, path) = write_roster("ID,Name\n,Nobody\nS2,Bob\n");
        let roster = Roster::load(&path).unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("S2").unwrap().name, "Bob");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = Roster::load("/nonexistent/students.csv").unwrap_err();
        assert!(matches!(err, Error::RosterRead { .. }));
    }

    #[test]
    fn test_load_missing_column_errors() {
        let (_dir, path) = write_roster("Identifier,Name\nS1,Alice\n");
        assert!(Roster::load(&path).is_err());
    }

    #[test]
    fn test_load_or_empty_missing_file() {
        crate::logging::init_test_logging();
        let roster = Roster::load_or_empty("/nonexistent/students.csv");
        assert!(roster.is_empty());
    }

    #[test]
    fn test_iter_is_ordered_by_id() {
        let roster = Roster::from_pairs([("S3", "Cara"), ("S1", "Alice"), ("S2", "Bob")]);
        let ids: Vec<&str> = roster.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn test_insert_returns_replaced() {
        let mut roster = Roster::from_pairs([("S1", "Alice")]);
        let replaced = roster.insert(Student {
            id: "S1".to_string(),
            name: "Alicia".to_string(),
        });
        assert_eq!(replaced.unwrap().name, "Alice");
    }
}
