use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::IdentityError;
use crate::identity::Identity;

/// One event on the provider's serialized auth stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Identity),
    SignedOut,
}

/// Contract for the external identity provider.
///
/// The provider emits a serialized stream of auth-state events; sign-in,
/// sign-up and sign-out resolve or fail asynchronously with a provider code
/// (`IdentityError`). Sign-up signs the new account in, so a successful
/// `sign_up` is followed by a `SignedIn` event on the stream.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Subscribe to the auth-state stream. Events are delivered in emission
    /// order; the stream does not replay — callers wanting the initial state
    /// subscribe before asking the provider to resume/report it.
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;
}
