//! Identity provider surface: the principal type, the asynchronous auth-event
//! contract, and the local account-registry provider.
//! Keep the public surface thin and split implementation across sub-modules.

mod client;
mod local;
mod principal;

pub use client::{AuthEvent, IdentityClient};
pub use local::LocalIdentityClient;
pub use principal::Identity;
