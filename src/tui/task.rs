// One-shot background work requested by the controller
//
// The controller never spawns anything itself. `App::update` returns a list
// of tasks and the event loop hands them to a TaskRunner. Every task yields
// at most one message back into the loop and then ends; anything periodic is
// re-armed by the handler that receives the message.

use super::msg::Msg;
use crate::brain::ActionIntake;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub enum Task {
    /// Handle this message before the next terminal event
    Ready(Msg),
    /// Deliver after a delay
    After(Duration, Msg),
    /// Run a future and deliver whatever it resolves to
    Spawn(BoxFuture<'static, Msg>),
    /// Wait for the next brain action request
    Intake(ActionIntake),
}

impl Task {
    pub fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Msg> + Send + 'static,
    {
        Task::Spawn(Box::pin(future))
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Ready(msg) => write!(f, "Ready({})", msg.name()),
            Task::After(delay, msg) => write!(f, "After({:?}, {})", delay, msg.name()),
            Task::Spawn(_) => f.write_str("Spawn(..)"),
            Task::Intake(_) => f.write_str("Intake(..)"),
        }
    }
}

/// Runs tasks on the tokio runtime, racing each against shutdown
pub struct TaskRunner {
    tx: mpsc::UnboundedSender<Msg>,
    cancel: CancellationToken,
}

impl TaskRunner {
    pub fn new(tx: mpsc::UnboundedSender<Msg>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Start every task. Ready messages go onto `ready` so the loop
    /// processes them ahead of any external event.
    pub fn run(&self, tasks: Vec<Task>, ready: &mut VecDeque<Msg>) {
        for task in tasks {
            match task {
                Task::Ready(msg) => ready.push_back(msg),
                Task::After(delay, msg) => self.deliver(async move {
                    tokio::time::sleep(delay).await;
                    Some(msg)
                }),
                Task::Spawn(future) => self.deliver(async move { Some(future.await) }),
                Task::Intake(mut intake) => self.deliver(async move {
                    Some(match intake.next().await {
                        Some(request) => Msg::Action { request, intake },
                        None => Msg::IntakeClosed,
                    })
                }),
            }
        }
    }

    fn deliver<F>(&self, future: F)
    where
        F: std::future::Future<Output = Option<Msg>> + Send + 'static,
    {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                msg = future => {
                    if let Some(msg) = msg {
                        // The loop is gone once the receiver drops; nothing to do
                        let _ = tx.send(msg);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_messages_stay_local() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = TaskRunner::new(tx, CancellationToken::new());
        let mut ready = VecDeque::new();

        runner.run(vec![Task::Ready(Msg::KeyUp)], &mut ready);

        assert_eq!(ready.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn timers_deliver_through_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = TaskRunner::new(tx, CancellationToken::new());
        let mut ready = VecDeque::new();

        runner.run(
            vec![Task::After(Duration::from_millis(1), Msg::HideError(1))],
            &mut ready,
        );

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, Msg::HideError(1)));
    }

    #[tokio::test]
    async fn cancelled_tasks_deliver_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let runner = TaskRunner::new(tx, cancel.clone());
        let mut ready = VecDeque::new();

        runner.run(
            vec![Task::After(Duration::from_secs(60), Msg::MetadataTick)],
            &mut ready,
        );
        cancel.cancel();
        drop(runner);

        // Every sender is dropped once the cancelled task exits
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn intake_yields_closed_when_senders_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = TaskRunner::new(tx, CancellationToken::new());
        let (sender, intake) = crate::brain::channel();
        drop(sender);

        runner.run(vec![Task::Intake(intake)], &mut VecDeque::new());

        assert!(matches!(rx.recv().await, Some(Msg::IntakeClosed)));
    }
}
