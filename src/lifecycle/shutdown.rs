//! Shutdown coordination for the service.

use tokio_util::sync::CancellationToken;

/// Coordinator for graceful shutdown.
///
/// Two stages: `trigger` stops accepting and lets in-flight requests drain;
/// `force` additionally cancels every request context derived from the
/// abort token. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    drain: CancellationToken,
    abort: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin graceful shutdown.
    pub fn trigger(&self) {
        self.drain.cancel();
    }

    /// Cancel all in-flight work.
    pub fn force(&self) {
        self.drain.cancel();
        self.abort.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.drain.is_cancelled()
    }

    pub fn is_forced(&self) -> bool {
        self.abort.is_cancelled()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn triggered(&self) {
        self.drain.cancelled().await;
    }

    /// Parent token for request contexts.
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_drains_without_aborting() {
        let shutdown = Shutdown::new();
        let request = shutdown.abort_token().child_token();

        shutdown.clone().trigger();
        shutdown.triggered().await;

        assert!(shutdown.is_triggered());
        assert!(!shutdown.is_forced());
        assert!(!request.is_cancelled());
    }

    #[tokio::test]
    async fn test_force_cancels_request_contexts() {
        let shutdown = Shutdown::new();
        let request = shutdown.abort_token().child_token();

        shutdown.force();

        assert!(shutdown.is_triggered());
        assert!(request.is_cancelled());
    }
}
