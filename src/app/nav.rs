//! Route surface and guarded navigation.
//! The guard decision is taken before anything renders; a deny produces a
//! redirect outcome, never a flash of protected content.

use crate::profile::Role;
use crate::session::{decide, Decision, Requirement, Session};

/// The application's route table. Anything else is `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Enroll,
    Login,
    Dashboard,
    Admin,
    AdminUsers,
    NotFound,
}

impl Route {
    pub fn parse(path: &str) -> Route {
        match path.trim_end_matches('/') {
            "" => Route::Home,
            "/enroll" => Route::Enroll,
            "/login" => Route::Login,
            "/dashboard" => Route::Dashboard,
            "/admin" => Route::Admin,
            "/admin/users" => Route::AdminUsers,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Enroll => "/enroll",
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Admin => "/admin",
            Route::AdminUsers => "/admin/users",
            Route::NotFound => "/404",
        }
    }

    /// Capability the route demands; `None` for unguarded routes.
    pub fn requirement(&self) -> Option<Requirement> {
        match self {
            Route::Dashboard => Some(Requirement::AnyAuthenticated),
            Route::Admin | Route::AdminUsers => Some(Requirement::Role(Role::Admin)),
            Route::Home | Route::Enroll | Route::Login | Route::NotFound => None,
        }
    }
}

/// Outcome of attempting to navigate to a route under a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Render the route.
    Render(Route),
    /// The guard denied; go to the redirect target instead.
    Redirect(Route),
    /// The session is still converging; wait for the next publication and
    /// re-evaluate. Nothing renders in the meantime.
    Wait,
}

/// Evaluate a navigation against the current session. Pure, like the guard
/// it wraps.
pub fn navigate(route: Route, session: &Session) -> NavOutcome {
    match route.requirement() {
        None => NavOutcome::Render(route),
        Some(requirement) => match decide(session, requirement) {
            Decision::Allow => NavOutcome::Render(route),
            Decision::Pending => NavOutcome::Wait,
            Decision::DenyRedirect(target) => NavOutcome::Redirect(Route::parse(target)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    #[test]
    fn paths_round_trip_through_parse() {
        for route in [Route::Home, Route::Enroll, Route::Login, Route::Dashboard, Route::Admin, Route::AdminUsers] {
            assert_eq!(Route::parse(route.path()), route);
        }
        assert_eq!(Route::parse("/no/such/page"), Route::NotFound);
        assert_eq!(Route::parse("/admin/users/"), Route::AdminUsers);
    }

    #[test]
    fn unguarded_routes_render_for_any_session() {
        for route in [Route::Home, Route::Enroll, Route::Login] {
            assert_eq!(navigate(route, &Session::Unknown), NavOutcome::Render(route));
            assert_eq!(navigate(route, &Session::Anonymous), NavOutcome::Render(route));
        }
    }

    #[test]
    fn guarded_routes_wait_while_session_unknown() {
        assert_eq!(navigate(Route::Dashboard, &Session::Unknown), NavOutcome::Wait);
        assert_eq!(navigate(Route::Admin, &Session::Unknown), NavOutcome::Wait);
    }

    #[test]
    fn anonymous_navigation_redirects_to_login() {
        assert_eq!(navigate(Route::Dashboard, &Session::Anonymous), NavOutcome::Redirect(Route::Login));
        assert_eq!(navigate(Route::AdminUsers, &Session::Anonymous), NavOutcome::Redirect(Route::Login));
    }

    #[test]
    fn non_admin_is_sent_home_from_admin_routes() {
        let session = Session::Authenticated {
            identity: Identity::new("u1", "u1@example.com"),
            profile: None,
        };
        assert_eq!(navigate(Route::Dashboard, &session), NavOutcome::Render(Route::Dashboard));
        assert_eq!(navigate(Route::Admin, &session), NavOutcome::Redirect(Route::Home));
    }
}
