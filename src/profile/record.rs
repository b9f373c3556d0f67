use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile role. Every profile is created as `Student` at enrollment time;
/// promotion to `Admin` happens only through `ProfileMutator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    /// The role a toggle action moves to (admin list "Make Admin" / "Remove Admin").
    pub fn toggled(&self) -> Role {
        match self {
            Role::Student => Role::Admin,
            Role::Admin => Role::Student,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The stored profile document, keyed by the identity's principal id.
///
/// Invariant: `uid` always equals the store key the record lives under; the
/// store checks this on every read and refuses mismatched documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub uid: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub enrolled_courses: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Partial update for a profile document. Only fields that are `Some` are
/// written; everything else is left untouched, so concurrent updates to
/// unrelated fields never clobber each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrolled_courses: Option<BTreeSet<String>>,
}

impl ProfilePatch {
    /// Single-field role patch, the only write the mutator issues.
    pub fn role(role: Role) -> Self {
        Self { role: Some(role), ..Default::default() }
    }

    /// Apply this patch to an existing record in place.
    pub fn apply_to(&self, record: &mut ProfileRecord) {
        if let Some(email) = &self.email {
            record.email = email.clone();
        }
        if let Some(name) = &self.display_name {
            record.display_name = Some(name.clone());
        }
        if let Some(role) = self.role {
            record.role = role;
        }
        if let Some(groups) = &self.groups {
            record.groups = groups.clone();
        }
        if let Some(courses) = &self.enrolled_courses {
            record.enrolled_courses = courses.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProfileRecord {
        ProfileRecord {
            uid: "u1".into(),
            email: "u1@example.com".into(),
            display_name: Some("User One".into()),
            role: Role::Student,
            groups: ["cohort-a".to_string()].into_iter().collect(),
            enrolled_courses: ["python".to_string()].into_iter().collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn record_round_trips_through_json() {
        let rec = sample();
        let text = serde_json::to_string(&rec).unwrap();
        let back: ProfileRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn patch_touches_only_present_fields() {
        let mut rec = sample();
        ProfilePatch::role(Role::Admin).apply_to(&mut rec);
        assert_eq!(rec.role, Role::Admin);
        // Untouched fields survive
        assert_eq!(rec.email, "u1@example.com");
        assert!(rec.enrolled_courses.contains("python"));
        assert!(rec.groups.contains("cohort-a"));
    }

    #[test]
    fn role_toggle_flips_both_ways() {
        assert_eq!(Role::Student.toggled(), Role::Admin);
        assert_eq!(Role::Admin.toggled(), Role::Student);
    }
}
