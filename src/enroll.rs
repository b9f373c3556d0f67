//!
//! Enrollment flow
//! ---------------
//! Creates the account, writes the initial profile document (always with
//! `role = student`), and appends an enrollment receipt. Local form
//! validation happens before any provider call; provider failures come back
//! as coded errors mapped to user-facing messages, never as panics.

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::identity::{Identity, IdentityClient};
use crate::profile::{FileProfileStore, ProfilePatch, ProfileStore, Role};

/// A course offered on the enrollment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Course {
    pub id: &'static str,
    pub label: &'static str,
}

/// Courses available at enrollment time.
pub const COURSE_CATALOG: &[Course] = &[
    Course { id: "python", label: "Python Programming" },
    Course { id: "java", label: "Java Fundamentals" },
    Course { id: "physics", label: "Physics Basics" },
];

pub fn course_by_id(id: &str) -> Option<&'static Course> {
    COURSE_CATALOG.iter().find(|c| c.id == id)
}

/// Raw enrollment form input.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub courses: BTreeSet<String>,
}

impl EnrollmentForm {
    /// Local validation, mirrored from the enrollment screen: these checks
    /// run before any provider call and return the message to display.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Please enter your full name.".to_string());
        }
        if self.password != self.confirm_password {
            return Err("Passwords do not match.".to_string());
        }
        if self.password.len() < 6 {
            return Err("Password must be at least 6 characters.".to_string());
        }
        for id in &self.courses {
            if course_by_id(id).is_none() {
                return Err(format!("Unknown course '{}'.", id));
            }
        }
        Ok(())
    }
}

/// Enrollment receipt, appended alongside the profile write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub enrolled_courses: BTreeSet<String>,
    pub enrolled_at: DateTime<Utc>,
}

/// Failure surface of the enrollment flow: either a local validation message
/// or a coded provider/store failure.
#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Store(#[from] crate::error::StoreError),
}

impl EnrollError {
    /// Message suitable for direct display on the form.
    pub fn user_message(&self) -> String {
        match self {
            EnrollError::Invalid(msg) => msg.clone(),
            EnrollError::Identity(e) => e.code.user_message().to_string(),
            EnrollError::Store(_) => "Could not save your enrollment. Please try again.".to_string(),
        }
    }
}

/// Run the full enrollment flow: validate, create the account, write the
/// initial profile (role `student`), and append the receipt. The account
/// creation signs the new identity in, so the session converges on its own
/// once this returns.
pub async fn enroll(
    client: &dyn IdentityClient,
    store: &Arc<dyn ProfileStore>,
    receipts: &FileProfileStore,
    form: &EnrollmentForm,
) -> Result<Identity, EnrollError> {
    form.validate().map_err(EnrollError::Invalid)?;

    let identity = client
        .sign_up(&form.email, &form.password, Some(form.name.trim()))
        .await?;

    store
        .set(
            &identity.uid,
            ProfilePatch {
                email: Some(identity.email.clone()),
                display_name: Some(form.name.trim().to_string()),
                role: Some(Role::Student),
                groups: None,
                enrolled_courses: Some(form.courses.clone()),
            },
        )
        .await?;

    let receipt = Enrollment {
        id: Uuid::new_v4(),
        user_id: identity.uid.clone(),
        name: form.name.trim().to_string(),
        email: identity.email.clone(),
        enrolled_courses: form.courses.clone(),
        enrolled_at: Utc::now(),
    };
    write_receipt(receipts, &receipt)?;
    info!(
        target: "pursuva::enroll",
        "enrolled uid='{}' courses={:?}", identity.uid, receipt.enrolled_courses
    );
    Ok(identity)
}

fn write_receipt(
    receipts: &FileProfileStore,
    receipt: &Enrollment,
) -> Result<(), crate::error::StoreError> {
    let dir = receipts.root_path().join("enrollments");
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.json", receipt.id));
    let text =
        serde_json::to_string_pretty(receipt).map_err(|e| crate::error::StoreError::Corrupt {
            key: receipt.id.to_string(),
            detail: e.to_string(),
        })?;
    fs::write(path, text)?;
    Ok(())
}

/// Read back every enrollment receipt for a user (admin tooling).
pub fn receipts_for(
    receipts: &FileProfileStore,
    uid: &str,
) -> Result<Vec<Enrollment>, crate::error::StoreError> {
    let dir = receipts.root_path().join("enrollments");
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
        if let Ok(receipt) = serde_json::from_str::<Enrollment>(&text) {
            if receipt.user_id == uid {
                out.push(receipt);
            }
        }
    }
    out.sort_by_key(|r| r.enrolled_at);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> EnrollmentForm {
        EnrollmentForm {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            password: "hunter22".into(),
            confirm_password: "hunter22".into(),
            courses: ["python".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let mut f = form();
        f.confirm_password = "different".into();
        assert_eq!(f.validate().unwrap_err(), "Passwords do not match.");
    }

    #[test]
    fn short_password_is_rejected() {
        let mut f = form();
        f.password = "abc".into();
        f.confirm_password = "abc".into();
        assert_eq!(f.validate().unwrap_err(), "Password must be at least 6 characters.");
    }

    #[test]
    fn unknown_course_is_rejected() {
        let mut f = form();
        f.courses.insert("basket-weaving".into());
        assert!(f.validate().unwrap_err().contains("Unknown course"));
    }

    #[test]
    fn catalog_lookup_by_id() {
        assert_eq!(course_by_id("python").unwrap().label, "Python Programming");
        assert!(course_by_id("klingon").is_none());
    }
}
