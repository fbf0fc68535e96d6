use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, RwLock};

/// OAuth token pair as returned by the token endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Process-wide current credential. Readers always observe a whole value;
/// replacement swaps it under the write lock.
#[derive(Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl CredentialStore {
    pub fn new(initial: Option<Credential>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn seeded(access_token: Option<&str>, refresh_token: Option<&str>) -> Self {
        let initial = access_token
            .filter(|token| !token.is_empty())
            .map(|token| Credential::new(token, refresh_token.map(str::to_string)));
        Self::new(initial)
    }

    pub fn current(&self) -> Option<Credential> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.current().map(|credential| credential.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current().and_then(|credential| credential.refresh_token)
    }

    pub fn replace(&self, credential: Credential) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(credential);
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("current", &self.current())
            .finish()
    }
}
