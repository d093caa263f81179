use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;
use tracing::info;

/// Why the process is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// SIGINT or SIGTERM.
    Signal,
    /// `exit`, `quit` or end of input at the shell.
    ShellExited,
    /// The query API could not bind or stopped on its own.
    ListenerFailed,
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Signal => write!(f, "termination signal"),
            Cause::ShellExited => write!(f, "shell exited"),
            Cause::ListenerFailed => write!(f, "query API failed"),
        }
    }
}

#[derive(Default)]
struct Inner {
    cause: OnceLock<Cause>,
    notify: Notify,
}

/// One-shot shutdown broadcast.
///
/// Any clone may [`raise`](Self::raise) it any number of times; only the first call
/// records a cause and wakes the waiters. Waiting after it was raised returns at once.
#[derive(Clone, Default)]
pub struct ShutdownNotice {
    inner: Arc<Inner>,
}

impl ShutdownNotice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the call that actually raised the notice.
    pub fn raise(&self, cause: Cause) -> bool {
        if self.inner.cause.set(cause).is_err() {
            return false;
        }
        info!("shutdown requested: {cause}");
        self.inner.notify.notify_waiters();
        true
    }

    /// The first cause raised, if any.
    pub fn cause(&self) -> Option<Cause> {
        self.inner.cause.get().copied()
    }

    pub fn is_raised(&self) -> bool {
        self.cause().is_some()
    }

    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // register before checking, so a raise in between still wakes us
        notified.as_mut().enable();
        if self.is_raised() {
            return;
        }
        notified.await;
    }
}
