use crate::shutdown::{Cause, ShutdownNotice};
use anyhow::anyhow;
use std::fmt;
use std::future::Future;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Running,
    ShuttingDown,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    QueryApi,
    Shell,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::QueryApi => write!(f, "query API"),
            Task::Shell => write!(f, "shell"),
        }
    }
}

/// Runs the query API and the shell side by side and brings both down together.
pub struct Orchestrator {
    cancel: CancellationToken,
    notice: ShutdownNotice,
    phase: Phase,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            notice: ShutdownNotice::new(),
            phase: Phase::Initializing,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// A handle on the shutdown notice, for anything else that may need to stop the process.
    pub fn notice(&self) -> ShutdownNotice {
        self.notice.clone()
    }

    /// Start both tasks and block until `terminate` resolves or the notice is raised.
    ///
    /// Both tasks are then cancelled and awaited, whatever state they are in. The
    /// first cause raised is returned; a task that failed turns the run into an error.
    pub async fn run<S, SF, H, HF, T>(
        &mut self,
        server: S,
        shell: H,
        terminate: T,
    ) -> anyhow::Result<Cause>
    where
        S: FnOnce(CancellationToken) -> SF,
        SF: Future<Output = anyhow::Result<()>> + Send + 'static,
        H: FnOnce(CancellationToken) -> HF,
        HF: Future<Output = anyhow::Result<()>> + Send + 'static,
        T: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();

        let server = server(self.cancel.child_token());
        let notice = self.notice.clone();
        tasks.spawn(async move {
            let result = server.await;
            if let Err(e) = &result {
                error!("query API failed: {e:#}");
            }
            // the API only returns on its own when something went wrong
            notice.raise(Cause::ListenerFailed);
            (Task::QueryApi, result)
        });

        let shell = shell(self.cancel.child_token());
        let notice = self.notice.clone();
        tasks.spawn(async move {
            let result = shell.await;
            notice.raise(Cause::ShellExited);
            (Task::Shell, result)
        });

        self.phase = Phase::Running;
        debug!("orchestrator running");

        tokio::select! {
            _ = terminate => {
                self.notice.raise(Cause::Signal);
            }
            _ = self.notice.wait() => {}
        }

        self.phase = Phase::ShuttingDown;
        let cause = self.notice.cause().unwrap_or(Cause::Signal);
        info!("shutting down ({cause}), waiting for tasks to finish");
        self.cancel.cancel();

        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((task, Ok(()))) => debug!("{task} finished"),
                Ok((task, Err(e))) => {
                    failure.get_or_insert(e.context(format!("{task} failed")));
                }
                Err(e) => {
                    error!("task aborted: {e}");
                    failure.get_or_insert(anyhow!("task aborted: {e}"));
                }
            }
        }

        self.phase = Phase::Terminated;
        info!("all tasks finished");
        match failure {
            Some(e) => Err(e),
            None => Ok(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Runs until cancelled, then takes `drain` to finish and records that it did.
    fn server(
        drain: Duration,
        done: Arc<AtomicBool>,
    ) -> impl FnOnce(CancellationToken) -> std::pin::Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> {
        move |cancel| {
            Box::pin(async move {
                cancel.cancelled().await;
                tokio::time::sleep(drain).await;
                done.store(true, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn shell_exit_stops_the_server() {
        let drained = Arc::new(AtomicBool::new(false));
        let mut orchestrator = Orchestrator::new();

        let cause = orchestrator
            .run(
                server(Duration::from_millis(50), drained.clone()),
                |_cancel| async { anyhow::Ok(()) },
                std::future::pending(),
            )
            .await
            .unwrap();

        assert_eq!(cause, Cause::ShellExited);
        assert!(drained.load(Ordering::SeqCst));
        assert_eq!(orchestrator.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn signal_cancels_both_tasks_and_waits_for_them() {
        let drained = Arc::new(AtomicBool::new(false));
        let shell_done = Arc::new(AtomicBool::new(false));
        let shell_flag = shell_done.clone();
        let mut orchestrator = Orchestrator::new();

        let cause = orchestrator
            .run(
                server(Duration::from_millis(50), drained.clone()),
                move |cancel| async move {
                    cancel.cancelled().await;
                    shell_flag.store(true, Ordering::SeqCst);
                    anyhow::Ok(())
                },
                tokio::time::sleep(Duration::from_millis(20)),
            )
            .await
            .unwrap();

        assert_eq!(cause, Cause::Signal);
        assert!(drained.load(Ordering::SeqCst));
        assert!(shell_done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn listener_failure_is_fatal() {
        let mut orchestrator = Orchestrator::new();
        let notice = orchestrator.notice();

        let result = orchestrator
            .run(
                |_cancel| async { Err::<(), _>(anyhow!("address in use")) },
                |cancel| async move {
                    cancel.cancelled().await;
                    anyhow::Ok(())
                },
                std::future::pending(),
            )
            .await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("address in use"));
        assert_eq!(notice.cause(), Some(Cause::ListenerFailed));
        assert_eq!(orchestrator.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn notice_raised_elsewhere_shuts_down_once() {
        let mut orchestrator = Orchestrator::new();
        let notice = orchestrator.notice();
        let drained = Arc::new(AtomicBool::new(false));

        let cause = orchestrator
            .run(
                server(Duration::ZERO, drained.clone()),
                move |cancel| async move {
                    notice.raise(Cause::Signal);
                    notice.raise(Cause::ShellExited);
                    cancel.cancelled().await;
                    anyhow::Ok(())
                },
                std::future::pending(),
            )
            .await
            .unwrap();

        assert_eq!(cause, Cause::Signal);
        assert!(drained.load(Ordering::SeqCst));
    }
}
