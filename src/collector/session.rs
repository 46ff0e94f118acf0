//! Session lifetime management.
//!
//! One session is opened per class spec, even when several specs share a
//! namespace. There is no pooling and no retry.

use tracing::debug;

use crate::collector::error::CollectError;
use crate::collector::traits::Automation;

/// Locale passed to the automation interface when connecting (US English).
pub const DEFAULT_LOCALE: &str = "MS_409";

/// Opens and closes sessions against an automation backend.
pub struct SessionManager<A: Automation> {
    automation: A,
    locale: String,
}

impl<A: Automation> SessionManager<A> {
    pub fn new(automation: A, locale: impl Into<String>) -> Self {
        Self {
            automation,
            locale: locale.into(),
        }
    }

    pub fn automation(&self) -> &A {
        &self.automation
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Opens a session bound to `namespace`.
    pub fn open(&self, namespace: &str) -> Result<A::Session, CollectError> {
        debug!("Connecting to {} (locale {})", namespace, self.locale);
        self.automation
            .connect(namespace, &self.locale)
            .map_err(|source| CollectError::Connection {
                namespace: namespace.to_string(),
                source,
            })
    }

    /// Releases a session and everything the backend holds for it.
    pub fn close(&self, session: A::Session) {
        drop(session);
        debug!("Session closed");
    }

    /// Runs `f` with a session opened for `namespace`.
    ///
    /// The session is closed when `f` returns, whatever the result. Cursors
    /// created inside `f` borrow the session and therefore cannot outlive it.
    pub fn scoped<R>(
        &self,
        namespace: &str,
        f: impl FnOnce(&A::Session) -> Result<R, CollectError>,
    ) -> Result<R, CollectError> {
        let session = self.open(namespace)?;
        let result = f(&session);
        self.close(session);
        result
    }
}
