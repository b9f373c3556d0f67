//! Page rendering for the route surface. Pages are plain text written to
//! stdout; every page receives the already-guarded session view and renders
//! read-only from it.

use crate::app::nav::Route;
use crate::app::table::render_table;
use crate::assign::list_assignments;
use crate::enroll::COURSE_CATALOG;
use crate::profile::{FileProfileStore, ProfileMutator, ProfileRecord};
use crate::session::Session;

pub fn render(route: Route, session: &Session, mutator: &ProfileMutator, docs: &FileProfileStore) {
    match route {
        Route::Home => render_home(session),
        Route::Enroll => render_enroll_intro(),
        Route::Login => render_login_intro(session),
        Route::Dashboard => render_dashboard(session),
        Route::Admin => render_admin(mutator, docs),
        Route::AdminUsers => render_admin_users(mutator),
        Route::NotFound => println!("404 — no such page. `go /` to head home."),
    }
}

fn render_home(session: &Session) {
    println!("Pursuva — learn something new.");
    println!();
    println!("Courses open for enrollment:");
    for course in COURSE_CATALOG {
        println!("  {:10} {}", course.id, course.label);
    }
    println!();
    match session {
        Session::Authenticated { identity, .. } => {
            let name = identity.display_name.as_deref().unwrap_or(&identity.email);
            println!("Signed in as {}. `go /dashboard` for your courses.", name);
        }
        _ => println!("`go /enroll` to create an account, `go /login` to sign in."),
    }
}

fn render_enroll_intro() {
    println!("Enrollment — create your Pursuva account.");
    println!("Run `enroll` to fill out the form.");
}

fn render_login_intro(session: &Session) {
    if session.is_authenticated() {
        println!("Already signed in. `logout` first to switch accounts.");
    } else {
        println!("Login — run `login` to sign in with your email and password.");
    }
}

fn render_dashboard(session: &Session) {
    // The guard admitted us, so the session is authenticated here
    let Session::Authenticated { identity, profile } = session else {
        return;
    };
    let name = identity.display_name.as_deref().unwrap_or(&identity.email);
    println!("Dashboard — welcome, {}.", name);
    match profile {
        Some(profile) => {
            if profile.enrolled_courses.is_empty() {
                println!("You are not enrolled in any courses yet.");
            } else {
                println!("Your courses:");
                for id in &profile.enrolled_courses {
                    let label =
                        crate::enroll::course_by_id(id).map(|c| c.label).unwrap_or(id.as_str());
                    println!("  - {}", label);
                }
            }
            if !profile.groups.is_empty() {
                println!("Groups: {}", profile.groups.iter().cloned().collect::<Vec<_>>().join(", "));
            }
        }
        None => {
            // Signed in but no stored profile yet; degrade, do not block
            println!("Your profile is still being set up. Course data will appear shortly.");
        }
    }
}

fn render_admin(mutator: &ProfileMutator, docs: &FileProfileStore) {
    let roster = mutator.roster();
    let admins = roster.iter().filter(|r| r.is_admin()).count();
    println!("Admin dashboard");
    println!("  users: {}  admins: {}  students: {}", roster.len(), admins, roster.len() - admins);
    println!();
    println!("Current assignments:");
    match list_assignments(docs) {
        Ok(assignments) if assignments.is_empty() => println!("  No assignments created yet"),
        Ok(assignments) => {
            for a in &assignments {
                let groups = a.groups.iter().cloned().collect::<Vec<_>>().join(", ");
                println!("  {} (due {})  [{}]", a.title, a.due_date.format("%Y-%m-%d %H:%M"), groups);
                println!("    {}", a.description);
            }
        }
        Err(e) => println!("  Could not read assignments: {}", e),
    }
    println!("`assign` to create an assignment, `go /admin/users` to manage roles.");
}

fn render_admin_users(mutator: &ProfileMutator) {
    let roster = mutator.roster();
    if roster.is_empty() {
        println!("No users loaded. `users reload` to fetch the roster.");
        return;
    }
    print!("{}", render_table(&["Uid", "Name", "Email", "Role"], &roster_rows(&roster)));
    println!("`promote <uid>` / `demote <uid>` to change a role, `users reload` to refresh.");
}

fn roster_rows(roster: &[ProfileRecord]) -> Vec<Vec<String>> {
    roster
        .iter()
        .map(|r| {
            vec![
                r.uid.clone(),
                r.display_name.clone().unwrap_or_else(|| "-".to_string()),
                r.email.clone(),
                r.role.to_string(),
            ]
        })
        .collect()
}
