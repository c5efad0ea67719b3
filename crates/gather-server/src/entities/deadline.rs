use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A fixed expiry paired with a cancellation signal.
///
/// The token is what fetches observe. It is cancelled either by the owner of
/// the upstream token (for example a dropped HTTP request) or explicitly via
/// [`Deadline::cancel`]. Reaching the expiry does not cancel the token by
/// itself; whoever waits on [`Deadline::expired`] decides what to tear down.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Instant,
    token: CancellationToken,
}

impl Deadline {
    /// Deadline `timeout` from now with a fresh token
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now() + timeout,
            token: CancellationToken::new(),
        }
    }

    /// Deadline scoped under an upstream token, at most `cap` from now
    pub fn within(parent: &CancellationToken, cap: Duration) -> Self {
        Self {
            expires_at: Instant::now() + cap,
            token: parent.child_token(),
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.expires_at
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the expiry passes or the token is cancelled
    pub async fn expired(&self) {
        tokio::select! {
            () = tokio::time::sleep_until(self.expires_at) => {}
            () = self.token.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expired_resolves_at_expiry() {
        let start = Instant::now();
        let deadline = Deadline::after(Duration::from_secs(2));
        assert!(!deadline.is_expired());

        deadline.expired().await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2010));
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
        // expiry alone leaves the token alone
        assert!(!deadline.token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_expires_early() {
        let parent = CancellationToken::new();
        let deadline = Deadline::within(&parent, Duration::from_secs(30));
        let start = Instant::now();

        let waiter = {
            let deadline = deadline.clone();
            tokio::spawn(async move { deadline.expired().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        parent.cancel();
        waiter.await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn test_cancel_does_not_reach_parent() {
        let parent = CancellationToken::new();
        let deadline = Deadline::within(&parent, Duration::from_secs(30));
        deadline.cancel();
        assert!(deadline.token().is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
