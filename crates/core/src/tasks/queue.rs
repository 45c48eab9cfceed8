//! Host thread task queue

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::LazyLock;

/// A task to execute on the host thread
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Capacity of the task queue, also the most tasks run per frame
const QUEUE_CAPACITY: usize = 256;

/// Errors returned when a task cannot be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Task queue is full")]
    Full,

    #[error("Task queue is disconnected")]
    Disconnected,
}

struct TaskQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
}

static TASK_QUEUE: LazyLock<TaskQueue> = LazyLock::new(|| {
    let (sender, receiver) = bounded(QUEUE_CAPACITY);
    TaskQueue { sender, receiver }
});

/// Queue a task to execute on the next frame
///
/// Safe to call from any thread. A full queue drops the task.
pub fn queue_task<F>(task: F) -> Result<(), QueueError>
where
    F: FnOnce() + Send + 'static,
{
    match TASK_QUEUE.sender.try_send(Box::new(task)) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            tracing::warn!("Task queue full, dropping task");
            Err(QueueError::Full)
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::error!("Task queue disconnected");
            Err(QueueError::Disconnected)
        }
    }
}

/// Run queued tasks on the host thread
///
/// Returns the number of tasks processed.
pub fn process_queued_tasks() -> usize {
    let mut count = 0;

    while count < QUEUE_CAPACITY {
        let Ok(task) = TASK_QUEUE.receiver.try_recv() else {
            break;
        };

        if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
            tracing::error!("Queued task panicked");
        }
        count += 1;
    }

    count
}
