//! The single derived authentication+authorization view (`Session`), its
//! owning reconciler (`SessionManager`), and the pure route guard.

mod guard;
mod manager;

pub use guard::{decide, Decision, Requirement, HOME_ROUTE, LOGIN_ROUTE};
pub use manager::{SessionManager, SubscriptionId};

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::profile::ProfileRecord;

/// The core's single derived value. Exactly one `Session` is live at any
/// instant; transitions are monotonic: `Unknown` appears at most once and only
/// first, then the value moves between `Anonymous` and `Authenticated` for the
/// remaining lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Session {
    /// Identity state not yet determined (initial / in-flight).
    #[default]
    Unknown,
    /// No authenticated identity.
    Anonymous,
    /// An authenticated identity, with its profile when one was found.
    /// `profile` is `None` only when the identity has no stored profile
    /// (a profile-creation race or a never-enrolled account).
    Authenticated { identity: Identity, profile: Option<ProfileRecord> },
}

impl Session {
    /// Derived, never stored: true iff authenticated with an admin profile.
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Session::Authenticated { profile: Some(profile), .. } if profile.is_admin()
        )
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&ProfileRecord> {
        match self {
            Session::Authenticated { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Role;
    use chrono::Utc;

    fn profile(role: Role) -> ProfileRecord {
        ProfileRecord {
            uid: "u1".into(),
            email: "u1@example.com".into(),
            display_name: None,
            role,
            groups: Default::default(),
            enrolled_courses: Default::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn is_admin_is_derived_from_profile_role() {
        let identity = Identity::new("u1", "u1@example.com");
        assert!(!Session::Unknown.is_admin());
        assert!(!Session::Anonymous.is_admin());
        let student = Session::Authenticated {
            identity: identity.clone(),
            profile: Some(profile(Role::Student)),
        };
        assert!(!student.is_admin());
        let admin = Session::Authenticated {
            identity: identity.clone(),
            profile: Some(profile(Role::Admin)),
        };
        assert!(admin.is_admin());
        // Authenticated with no profile never counts as admin
        let no_profile = Session::Authenticated { identity, profile: None };
        assert!(!no_profile.is_admin());
        assert!(no_profile.is_authenticated());
    }
}
