//! Pure route-guard decision over a `Session` and a capability requirement.
//! No store or network access happens here: `decide` is a total function over
//! its two inputs, so every route decision is unit-testable without any
//! external collaborator. The redirect itself is the caller's explicit step.

use crate::profile::Role;
use crate::session::Session;

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/";

/// Capability a route demands of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AnyAuthenticated,
    Role(Role),
}

/// Guard decision. `Pending` means the session is still converging: show a
/// neutral loading state and re-evaluate on the next session publication;
/// never redirect while pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Pending,
    DenyRedirect(&'static str),
}

/// Decide whether the session satisfies the requirement.
pub fn decide(session: &Session, requirement: Requirement) -> Decision {
    match session {
        Session::Unknown => Decision::Pending,
        Session::Anonymous => Decision::DenyRedirect(LOGIN_ROUTE),
        Session::Authenticated { profile, .. } => match requirement {
            Requirement::AnyAuthenticated => Decision::Allow,
            Requirement::Role(required) => match profile {
                Some(profile) if profile.role == required => Decision::Allow,
                _ => Decision::DenyRedirect(HOME_ROUTE),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::profile::ProfileRecord;
    use chrono::Utc;

    fn authenticated(profile: Option<Role>) -> Session {
        Session::Authenticated {
            identity: Identity::new("u1", "u1@example.com"),
            profile: profile.map(|role| ProfileRecord {
                uid: "u1".into(),
                email: "u1@example.com".into(),
                display_name: None,
                role,
                groups: Default::default(),
                enrolled_courses: Default::default(),
                created_at: Utc::now(),
            }),
        }
    }

    #[test]
    fn unknown_is_always_pending() {
        assert_eq!(decide(&Session::Unknown, Requirement::AnyAuthenticated), Decision::Pending);
        assert_eq!(decide(&Session::Unknown, Requirement::Role(Role::Admin)), Decision::Pending);
    }

    #[test]
    fn anonymous_always_redirects_to_login() {
        assert_eq!(
            decide(&Session::Anonymous, Requirement::AnyAuthenticated),
            Decision::DenyRedirect(LOGIN_ROUTE)
        );
        assert_eq!(
            decide(&Session::Anonymous, Requirement::Role(Role::Admin)),
            Decision::DenyRedirect(LOGIN_ROUTE)
        );
    }

    #[test]
    fn any_authenticated_allows_regardless_of_profile() {
        assert_eq!(
            decide(&authenticated(Some(Role::Student)), Requirement::AnyAuthenticated),
            Decision::Allow
        );
        // Missing profile still counts as authenticated
        assert_eq!(
            decide(&authenticated(None), Requirement::AnyAuthenticated),
            Decision::Allow
        );
    }

    #[test]
    fn admin_requirement_checks_profile_role() {
        assert_eq!(
            decide(&authenticated(Some(Role::Admin)), Requirement::Role(Role::Admin)),
            Decision::Allow
        );
        assert_eq!(
            decide(&authenticated(Some(Role::Student)), Requirement::Role(Role::Admin)),
            Decision::DenyRedirect(HOME_ROUTE)
        );
        // Authenticated with no profile is denied the admin surface
        assert_eq!(
            decide(&authenticated(None), Requirement::Role(Role::Admin)),
            Decision::DenyRedirect(HOME_ROUTE)
        );
    }
}
