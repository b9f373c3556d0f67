//!
//! Assignments
//! -----------
//! Admin-created coursework records: a title, a description, a due date and
//! the groups the assignment targets. Records live in their own keyspace
//! beside the profile documents; the admin dashboard creates them and renders
//! the current list. Local form validation runs before any write, mirroring
//! the profile and enrollment flows.

use std::collections::BTreeSet;
use std::fs;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::profile::FileProfileStore;

/// Groups an assignment can target. Profiles carry free-form group names,
/// but the dashboard offers these by default.
pub const DEFAULT_GROUPS: &[&str] = &["Math101", "Science202", "English303"];

/// A stored assignment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub groups: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw assignment form input. The due date stays a string until validation
/// parses it.
#[derive(Debug, Clone, Default)]
pub struct AssignmentForm {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub groups: BTreeSet<String>,
}

impl AssignmentForm {
    /// Local validation: every field filled, at least one group, and a
    /// parseable due date. Returns the parsed due date on success.
    pub fn validate(&self) -> Result<DateTime<Utc>, String> {
        if self.title.trim().is_empty()
            || self.description.trim().is_empty()
            || self.due_date.trim().is_empty()
            || self.groups.is_empty()
        {
            return Err("Please fill all fields and select at least one group".to_string());
        }
        parse_due_date(self.due_date.trim())
            .ok_or_else(|| format!("Could not read due date '{}'.", self.due_date.trim()))
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM` and bare `YYYY-MM-DD` (midnight UTC).
fn parse_due_date(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Validate the form and write a new assignment document.
pub fn create_assignment(
    docs: &FileProfileStore,
    form: &AssignmentForm,
) -> Result<Assignment, String> {
    let due_date = form.validate()?;
    let assignment = Assignment {
        id: Uuid::new_v4(),
        title: form.title.trim().to_string(),
        description: form.description.trim().to_string(),
        due_date,
        groups: form.groups.clone(),
        created_at: Utc::now(),
    };
    write_assignment(docs, &assignment).map_err(|e| {
        error!(target: "pursuva::assign", "assignment write failed: {}", e);
        "Failed to create assignment".to_string()
    })?;
    info!(
        target: "pursuva::assign",
        "assignment created id='{}' title='{}'", assignment.id, assignment.title
    );
    Ok(assignment)
}

fn write_assignment(docs: &FileProfileStore, assignment: &Assignment) -> Result<(), StoreError> {
    let dir = docs.root_path().join("assignments");
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.json", assignment.id));
    let text = serde_json::to_string_pretty(assignment).map_err(|e| StoreError::Corrupt {
        key: assignment.id.to_string(),
        detail: e.to_string(),
    })?;
    fs::write(path, text)?;
    Ok(())
}

/// Read back every assignment, oldest first. Unreadable documents are logged
/// and skipped so one bad file cannot hide the rest of the list.
pub fn list_assignments(docs: &FileProfileStore) -> Result<Vec<Assignment>, StoreError> {
    let dir = docs.root_path().join("assignments");
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let text = fs::read_to_string(&path)?;
        match serde_json::from_str::<Assignment>(&text) {
            Ok(assignment) => out.push(assignment),
            Err(e) => {
                error!(
                    target: "pursuva::assign",
                    "skipping unreadable assignment {}: {}", path.display(), e
                );
            }
        }
    }
    out.sort_by_key(|a| a.created_at);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn form() -> AssignmentForm {
        AssignmentForm {
            title: "Week 3 problem set".into(),
            description: "Chapters 5 and 6, all even exercises.".into(),
            due_date: "2026-09-14 17:00".into(),
            groups: ["Math101".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn empty_fields_and_no_groups_are_rejected() {
        let mut f = form();
        f.title.clear();
        assert!(f.validate().is_err());
        let mut f = form();
        f.groups.clear();
        assert_eq!(
            f.validate().unwrap_err(),
            "Please fill all fields and select at least one group"
        );
    }

    #[test]
    fn due_date_formats_parse() {
        assert!(parse_due_date("2026-09-14T17:00:00Z").is_some());
        assert!(parse_due_date("2026-09-14 17:00").is_some());
        assert!(parse_due_date("2026-09-14").is_some());
        assert!(parse_due_date("next tuesday").is_none());
    }

    #[test]
    fn create_then_list_round_trips() {
        let tmp = tempdir().unwrap();
        let docs = FileProfileStore::new(tmp.path()).unwrap();
        let created = create_assignment(&docs, &form()).unwrap();
        let listed = list_assignments(&docs).unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(listed[0].title, "Week 3 problem set");
        assert!(listed[0].groups.contains("Math101"));
        assert_eq!(created.due_date.to_rfc3339(), "2026-09-14T17:00:00+00:00");
    }

    #[test]
    fn list_is_ordered_and_skips_unreadable_documents() {
        let tmp = tempdir().unwrap();
        let docs = FileProfileStore::new(tmp.path()).unwrap();
        let mut older = form();
        older.title = "First".into();
        let mut newer = form();
        newer.title = "Second".into();
        create_assignment(&docs, &older).unwrap();
        create_assignment(&docs, &newer).unwrap();
        std::fs::write(tmp.path().join("assignments/broken.json"), "{not json").unwrap();
        let titles: Vec<_> =
            list_assignments(&docs).unwrap().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }
}
