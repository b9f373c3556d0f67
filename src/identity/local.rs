//!
//! Local identity provider
//! -----------------------
//! File-backed implementation of the `IdentityClient` contract for local
//! deployments: a JSON account registry with Argon2id PHC password hashes, a
//! persisted current-session file so a process restart resumes the signed-in
//! identity, and a broadcast auth-event stream consumed by the session core.
//!
//! Responsibilities:
//! - Account creation and credential verification (argon2 + PHC strings).
//! - Provider-coded failures: email-exists, bad-credential, invalid-email,
//!   weak-password, and rate limiting after repeated failures per email.
//! - Emitting `SignedIn` / `SignedOut` events in operation order, including
//!   the initial event on `resume()`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use base64::Engine;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use password_hash::{PasswordHash, SaltString};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::{AuthCode, IdentityError};
use crate::identity::{AuthEvent, Identity, IdentityClient};

/// Consecutive bad-credential failures per email before the provider reports
/// rate limiting.
const MAX_FAILED_ATTEMPTS: u32 = 5;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRow {
    uid: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    password_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AccountFile {
    /// Keyed by lowercased email.
    accounts: HashMap<String, AccountRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    uid: String,
}

struct ProviderState {
    accounts: AccountFile,
    /// Consecutive sign-in failures per lowercased email; reset on success.
    failed_attempts: HashMap<String, u32>,
}

/// File-backed identity provider. Clone-cheap via shared interior would be
/// overkill here; the shell holds it behind an `Arc<dyn IdentityClient>`.
pub struct LocalIdentityClient {
    root: PathBuf,
    state: Mutex<ProviderState>,
    events: broadcast::Sender<AuthEvent>,
}

fn gen_uid() -> Result<String> {
    // 256-bit random id, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

impl LocalIdentityClient {
    /// Open (or initialize) the provider rooted at the given data folder.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating identity root {}", root.display()))?;
        let accounts = Self::load_accounts(&root)?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            root,
            state: Mutex::new(ProviderState { accounts, failed_attempts: HashMap::new() }),
            events,
        })
    }

    fn accounts_path(root: &Path) -> PathBuf {
        root.join("accounts.json")
    }

    fn session_path(&self) -> PathBuf {
        self.root.join("session.json")
    }

    fn load_accounts(root: &Path) -> Result<AccountFile> {
        let path = Self::accounts_path(root);
        if !path.exists() {
            return Ok(AccountFile::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("decoding {}", path.display()))
    }

    fn save_accounts(&self, accounts: &AccountFile) -> Result<()> {
        let path = Self::accounts_path(&self.root);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(accounts)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn persist_session(&self, uid: Option<&str>) {
        let path = self.session_path();
        let result = match uid {
            Some(uid) => serde_json::to_string(&PersistedSession { uid: uid.to_string() })
                .map_err(anyhow::Error::from)
                .and_then(|text| fs::write(&path, text).map_err(Into::into)),
            None => {
                if path.exists() {
                    fs::remove_file(&path).map_err(Into::into)
                } else {
                    Ok(())
                }
            }
        };
        if let Err(e) = result {
            // Resume is best-effort; the live session is unaffected
            warn!(target: "pursuva::identity", "failed to persist session state: {}", e);
        }
    }

    fn emit(&self, event: AuthEvent) {
        // A send error only means no subscriber is listening yet
        let _ = self.events.send(event);
    }

    fn identity_of(row: &AccountRow) -> Identity {
        Identity {
            uid: row.uid.clone(),
            display_name: row.display_name.clone(),
            email: row.email.clone(),
        }
    }

    /// Report the current auth state onto the event stream: replays a
    /// persisted session if its account still exists, otherwise reports
    /// "no session" immediately. Call after the consumer has subscribed.
    pub fn resume(&self) {
        let path = self.session_path();
        let persisted: Option<PersistedSession> = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());
        if let Some(persisted) = persisted {
            let state = self.state.lock();
            if let Some(row) =
                state.accounts.accounts.values().find(|row| row.uid == persisted.uid)
            {
                info!(target: "pursuva::identity", "resumed session uid='{}'", row.uid);
                let identity = Self::identity_of(row);
                drop(state);
                self.emit(AuthEvent::SignedIn(identity));
                return;
            }
            warn!(
                target: "pursuva::identity",
                "persisted session references unknown account uid='{}'", persisted.uid
            );
        }
        self.emit(AuthEvent::SignedOut);
    }

    /// Seed an account if the registry does not already hold its email.
    /// Used for the first-run admin account; a no-op when present.
    pub fn ensure_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity> {
        let key = email.to_lowercase();
        let mut state = self.state.lock();
        if let Some(row) = state.accounts.accounts.get(&key) {
            return Ok(Self::identity_of(row));
        }
        let row = AccountRow {
            uid: gen_uid()?,
            email: email.to_string(),
            display_name: display_name.map(|s| s.to_string()),
            password_hash: hash_password(password)?,
        };
        let identity = Self::identity_of(&row);
        state.accounts.accounts.insert(key, row);
        self.save_accounts(&state.accounts)?;
        info!(target: "pursuva::identity", "seeded account '{}'", email);
        Ok(identity)
    }
}

#[async_trait]
impl IdentityClient for LocalIdentityClient {
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let key = email.to_lowercase();
        let identity = {
            let mut state = self.state.lock();
            let attempts = state.failed_attempts.get(&key).copied().unwrap_or(0);
            if attempts >= MAX_FAILED_ATTEMPTS {
                warn!(target: "pursuva::identity", "rate limited sign-in for '{}'", email);
                return Err(IdentityError::new(
                    AuthCode::RateLimited,
                    format!("too many failed attempts for {}", email),
                ));
            }
            let verified = state
                .accounts
                .accounts
                .get(&key)
                .filter(|row| verify_password(&row.password_hash, password))
                .map(Self::identity_of);
            match verified {
                Some(identity) => {
                    state.failed_attempts.remove(&key);
                    identity
                }
                None => {
                    *state.failed_attempts.entry(key).or_insert(0) += 1;
                    return Err(IdentityError::new(
                        AuthCode::BadCredential,
                        "email or password did not match",
                    ));
                }
            }
        };
        self.persist_session(Some(&identity.uid));
        info!(target: "pursuva::identity", "signed in uid='{}'", identity.uid);
        self.emit(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError> {
        if !EMAIL_RE.is_match(email) {
            return Err(IdentityError::new(
                AuthCode::InvalidEmail,
                format!("'{}' is not a valid email address", email),
            ));
        }
        if password.len() < 6 {
            return Err(IdentityError::new(
                AuthCode::WeakPassword,
                "password must be at least 6 characters",
            ));
        }
        let key = email.to_lowercase();
        let identity = {
            let mut state = self.state.lock();
            if state.accounts.accounts.contains_key(&key) {
                return Err(IdentityError::new(
                    AuthCode::EmailExists,
                    format!("an account already exists for {}", email),
                ));
            }
            let hash = hash_password(password).map_err(|e| {
                IdentityError::new(AuthCode::Unknown, format!("credential setup failed: {}", e))
            })?;
            let uid = gen_uid().map_err(|e| {
                IdentityError::new(AuthCode::Unknown, format!("credential setup failed: {}", e))
            })?;
            let row = AccountRow {
                uid,
                email: email.to_string(),
                display_name: display_name.map(|s| s.to_string()),
                password_hash: hash,
            };
            let identity = Self::identity_of(&row);
            state.accounts.accounts.insert(key, row);
            self.save_accounts(&state.accounts).map_err(|e| {
                IdentityError::new(AuthCode::Unknown, format!("account save failed: {}", e))
            })?;
            identity
        };
        self.persist_session(Some(&identity.uid));
        info!(target: "pursuva::identity", "account created uid='{}'", identity.uid);
        // Account creation signs the new identity in, provider semantics
        self.emit(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.persist_session(None);
        info!(target: "pursuva::identity", "signed out");
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generated_uids_are_distinct() {
        let a = gen_uid().unwrap();
        let b = gen_uid().unwrap();
        assert_ne!(a, b);
        // 32 random bytes encode to 43 base64url chars
        assert_eq!(a.len(), 43);
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_round_trips() {
        let tmp = tempdir().unwrap();
        let client = LocalIdentityClient::new(tmp.path()).unwrap();
        let created =
            client.sign_up("ada@example.com", "hunter22", Some("Ada")).await.unwrap();
        let signed_in = client.sign_in("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(created.uid, signed_in.uid);
        assert_eq!(signed_in.display_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn duplicate_email_reports_email_exists() {
        let tmp = tempdir().unwrap();
        let client = LocalIdentityClient::new(tmp.path()).unwrap();
        client.sign_up("ada@example.com", "hunter22", None).await.unwrap();
        let err = client.sign_up("ADA@example.com", "other-pass", None).await.unwrap_err();
        assert_eq!(err.code, AuthCode::EmailExists);
    }

    #[tokio::test]
    async fn invalid_email_and_weak_password_are_coded() {
        let tmp = tempdir().unwrap();
        let client = LocalIdentityClient::new(tmp.path()).unwrap();
        let err = client.sign_up("not-an-email", "hunter22", None).await.unwrap_err();
        assert_eq!(err.code, AuthCode::InvalidEmail);
        let err = client.sign_up("ada@example.com", "abc", None).await.unwrap_err();
        assert_eq!(err.code, AuthCode::WeakPassword);
    }

    #[tokio::test]
    async fn repeated_failures_rate_limit() {
        let tmp = tempdir().unwrap();
        let client = LocalIdentityClient::new(tmp.path()).unwrap();
        client.sign_up("ada@example.com", "hunter22", None).await.unwrap();
        for _ in 0..MAX_FAILED_ATTEMPTS {
            let err = client.sign_in("ada@example.com", "wrong").await.unwrap_err();
            assert_eq!(err.code, AuthCode::BadCredential);
        }
        // Even the right password is refused once the limit is hit
        let err = client.sign_in("ada@example.com", "hunter22").await.unwrap_err();
        assert_eq!(err.code, AuthCode::RateLimited);
    }

    #[tokio::test]
    async fn events_are_emitted_in_operation_order() {
        let tmp = tempdir().unwrap();
        let client = LocalIdentityClient::new(tmp.path()).unwrap();
        let mut rx = client.auth_events();
        let identity = client.sign_up("ada@example.com", "hunter22", None).await.unwrap();
        client.sign_out().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::SignedIn(identity));
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn resume_replays_persisted_session() {
        let tmp = tempdir().unwrap();
        let uid = {
            let client = LocalIdentityClient::new(tmp.path()).unwrap();
            client.sign_up("ada@example.com", "hunter22", None).await.unwrap().uid
        };
        // New provider over the same root resumes the signed-in identity
        let client = LocalIdentityClient::new(tmp.path()).unwrap();
        let mut rx = client.auth_events();
        client.resume();
        match rx.recv().await.unwrap() {
            AuthEvent::SignedIn(identity) => assert_eq!(identity.uid, uid),
            other => panic!("expected SignedIn, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn resume_without_session_reports_signed_out() {
        let tmp = tempdir().unwrap();
        let client = LocalIdentityClient::new(tmp.path()).unwrap();
        let mut rx = client.auth_events();
        client.resume();
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::SignedOut);
    }
}
