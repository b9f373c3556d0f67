use serde::{Deserialize, Serialize};

/// Principal authenticated by the identity provider. Opaque to the core:
/// it exists for the lifetime of an authenticated session and is destroyed
/// on sign-out. Read-only everywhere outside the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub email: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self { uid: uid.into(), display_name: None, email: email.into() }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
