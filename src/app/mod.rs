//!
//! Pursuva interactive shell
//! -------------------------
//! Terminal front end over the guarded route surface. The shell owns the
//! wiring: local identity provider, profile store, session manager and profile
//! mutator. Navigation goes through the guard before any page renders; a deny
//! moves straight to the redirect target, and a pending session parks the
//! navigation until the next session publication.

pub mod nav;
pub mod pages;
pub mod table;

use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::app::nav::{navigate, NavOutcome, Route};
use crate::assign::{create_assignment, AssignmentForm, DEFAULT_GROUPS};
use crate::enroll::{enroll, EnrollmentForm, COURSE_CATALOG};
use crate::identity::{IdentityClient, LocalIdentityClient};
use crate::profile::{FileProfileStore, ProfileMutator, ProfileStore, Role};
use crate::session::{decide, Decision, Requirement, Session, SessionManager};

const HELP: &str = "\
Commands:
  go <path>            navigate (/, /enroll, /login, /dashboard, /admin, /admin/users)
  login                sign in with email and password
  enroll               create an account and enroll in courses
  logout               sign out
  status               show the current session
  assign               create an assignment (admin only)
  users reload         refresh the admin roster (admin only)
  promote <uid>        make a user admin (admin only)
  demote <uid>         make a user student (admin only)
  help                 this help
  quit | exit          leave";

pub struct AppShell {
    client: Arc<LocalIdentityClient>,
    store: Arc<dyn ProfileStore>,
    docs: FileProfileStore,
    manager: SessionManager,
    mutator: ProfileMutator,
    session_rx: watch::Receiver<Session>,
    route: Route,
}

impl AppShell {
    /// Wire the core against a data folder and start session convergence.
    pub fn new(data_root: &str) -> Result<Self> {
        let client = Arc::new(
            LocalIdentityClient::new(data_root)
                .with_context(|| format!("opening identity registry under {}", data_root))?,
        );
        let docs = FileProfileStore::new(data_root)
            .with_context(|| format!("opening profile store under {}", data_root))?;
        let store: Arc<dyn ProfileStore> = Arc::new(docs.clone());
        let manager = SessionManager::new(store.clone());
        let session_rx = manager.watch();
        // Listen first, then ask the provider to report the current state so
        // the initial event lands on the stream.
        manager.start(client.auth_events());
        client.resume();
        let mutator = ProfileMutator::new(store.clone());
        Ok(Self { client, store, docs, manager, mutator, session_rx, route: Route::Home })
    }

    /// Run the interactive loop until quit or EOF.
    pub async fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        self.goto(Route::Home).await;
        loop {
            let prompt = format!("pursuva {}> ", self.route.path());
            match editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(&line);
                    if !self.dispatch(&mut editor, &line).await? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Handle one command line. Returns false to exit the loop.
    async fn dispatch(&mut self, editor: &mut DefaultEditor, line: &str) -> Result<bool> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        match cmd {
            "help" => println!("{}", HELP),
            "quit" | "exit" => return Ok(false),
            "go" => {
                let path = parts.next().unwrap_or("/");
                self.goto(Route::parse(path)).await;
            }
            "status" => self.print_status(),
            "login" => self.login(editor).await,
            "enroll" => self.enroll(editor).await,
            "logout" => {
                if let Err(e) = self.client.sign_out().await {
                    println!("Sign out failed: {}", e.code.user_message());
                } else {
                    self.goto(Route::Home).await;
                }
            }
            "assign" => {
                if self.admin_gate() {
                    self.assign(editor);
                }
            }
            "users" => {
                if parts.next() == Some("reload") {
                    if self.admin_gate() {
                        let outcome = self.mutator.load_roster().await;
                        if outcome.ok {
                            println!("Roster reloaded.");
                        } else if let Some(reason) = outcome.reason {
                            println!("{}", reason);
                        }
                    }
                } else {
                    println!("Usage: users reload");
                }
            }
            "promote" | "demote" => {
                let Some(uid) = parts.next() else {
                    println!("Usage: {} <uid>", cmd);
                    return Ok(true);
                };
                let role = if cmd == "promote" { Role::Admin } else { Role::Student };
                if self.admin_gate() {
                    let outcome = self.mutator.set_role(uid, role).await;
                    if outcome.ok {
                        println!("User role updated to {}", role);
                    } else if let Some(reason) = outcome.reason {
                        println!("{}", reason);
                    }
                }
            }
            other => println!("Unknown command '{}'. Try `help`.", other),
        }
        Ok(true)
    }

    /// Navigate through the guard, waiting out a converging session and
    /// following at most one redirect hop per evaluation.
    async fn goto(&mut self, mut route: Route) {
        loop {
            let session = self.manager.current();
            match navigate(route, &session) {
                NavOutcome::Render(target) => {
                    if matches!(target, Route::Admin | Route::AdminUsers)
                        && self.mutator.roster().is_empty()
                    {
                        // First admin visit pulls the roster
                        let _ = self.mutator.load_roster().await;
                    }
                    self.route = target;
                    pages::render(target, &session, &self.mutator, &self.docs);
                    return;
                }
                NavOutcome::Redirect(target) => {
                    debug!(target: "pursuva::app", "redirect {} -> {}", route.path(), target.path());
                    println!("(redirected to {})", target.path());
                    route = target;
                }
                NavOutcome::Wait => {
                    // Neutral loading state; re-evaluate on the next publication
                    println!("Loading...");
                    if self.session_rx.changed().await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Block navigation until the session reflects the given identity. Used
    /// after sign-in/sign-up so the follow-up navigation sees the converged
    /// session instead of racing it.
    async fn wait_for_identity(&mut self, uid: &str) {
        loop {
            {
                let session = self.session_rx.borrow_and_update();
                if let Session::Authenticated { identity, .. } = &*session {
                    if identity.uid == uid {
                        return;
                    }
                }
            }
            if self.session_rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn print_status(&self) {
        match self.manager.current() {
            Session::Unknown => println!("Session: still loading."),
            Session::Anonymous => println!("Session: not signed in."),
            Session::Authenticated { identity, profile } => {
                let role = profile.as_ref().map(|p| p.role.to_string());
                println!(
                    "Session: {} ({}) role={}",
                    identity.display_name.as_deref().unwrap_or("-"),
                    identity.email,
                    role.as_deref().unwrap_or("<no profile>")
                );
            }
        }
    }

    async fn login(&mut self, editor: &mut DefaultEditor) {
        let Ok(email) = editor.readline("email: ") else { return };
        let Ok(password) = editor.readline("password: ") else { return };
        match self.client.sign_in(email.trim(), &password).await {
            Ok(identity) => {
                info!(target: "pursuva::app", "login ok uid='{}'", identity.uid);
                println!("Signed in.");
                self.wait_for_identity(&identity.uid).await;
                self.goto(Route::Dashboard).await;
            }
            Err(e) => println!("{}", e.code.user_message()),
        }
    }

    async fn enroll(&mut self, editor: &mut DefaultEditor) {
        println!("Create your Pursuva account. Available courses:");
        for course in COURSE_CATALOG {
            println!("  {:10} {}", course.id, course.label);
        }
        let Ok(name) = editor.readline("full name: ") else { return };
        let Ok(email) = editor.readline("email: ") else { return };
        let Ok(password) = editor.readline("password: ") else { return };
        let Ok(confirm) = editor.readline("confirm password: ") else { return };
        let Ok(courses) = editor.readline("courses (space-separated ids): ") else { return };
        let form = EnrollmentForm {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password,
            confirm_password: confirm,
            courses: courses.split_whitespace().map(|s| s.to_string()).collect(),
        };
        match enroll(self.client.as_ref(), &self.store, &self.docs, &form).await {
            Ok(identity) => {
                println!(
                    "Account created! Welcome, {}.",
                    identity.display_name.as_deref().unwrap_or(&identity.email)
                );
                self.wait_for_identity(&identity.uid).await;
                self.goto(Route::Dashboard).await;
            }
            Err(e) => println!("{}", e.user_message()),
        }
    }

    fn assign(&self, editor: &mut DefaultEditor) {
        println!("Create an assignment. Suggested groups: {}", DEFAULT_GROUPS.join(", "));
        let Ok(title) = editor.readline("title: ") else { return };
        let Ok(description) = editor.readline("description: ") else { return };
        let Ok(due_date) = editor.readline("due date (YYYY-MM-DD [HH:MM]): ") else { return };
        let Ok(groups) = editor.readline("groups (space-separated): ") else { return };
        let form = AssignmentForm {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            due_date: due_date.trim().to_string(),
            groups: groups.split_whitespace().map(|s| s.to_string()).collect(),
        };
        match create_assignment(&self.docs, &form) {
            Ok(assignment) => {
                println!("Assignment created successfully ({})", assignment.title)
            }
            Err(msg) => println!("{}", msg),
        }
    }

    /// Section-level gate for admin commands: same decision function as the
    /// page guard, re-evaluated at action time.
    fn admin_gate(&self) -> bool {
        match decide(&self.manager.current(), Requirement::Role(Role::Admin)) {
            Decision::Allow => true,
            Decision::Pending => {
                println!("Loading...");
                false
            }
            Decision::DenyRedirect(_) => {
                println!("Admin access required.");
                false
            }
        }
    }
}
