use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::Argument;

/// A task whose lifetime is tracked via TACACS+ accounting records.
///
/// Created by [`Client::start_task()`](crate::Client::start_task) and closed out with
/// [`Client::stop_task()`](crate::Client::stop_task).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// The unique ID for this task.
    id: u32,

    /// When this task was started.
    start_time: SystemTime,
}

fn epoch_seconds(time: SystemTime) -> u64 {
    // a clock set before the epoch is reported as the epoch itself
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

impl Task {
    /// Creates a task with a random ID, starting now.
    pub fn new() -> Self {
        Self::with_start_time(rand::thread_rng().gen(), SystemTime::now())
    }

    /// Creates a task with a known ID & start time.
    pub fn with_start_time(id: u32, start_time: SystemTime) -> Self {
        Self { id, start_time }
    }

    /// The numeric ID of this task, as sent in the `task_id` argument.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// When this task was started.
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Arguments prepended to a start record, as specified in [RFC8907 section 8.3].
    ///
    /// [RFC8907 section 8.3]: https://www.rfc-editor.org/rfc/rfc8907.html#name-accounting-arguments
    pub fn start_arguments(&self) -> Vec<Argument> {
        vec![
            Argument::required("task_id", self.id.to_string()),
            Argument::required("start_time", epoch_seconds(self.start_time).to_string()),
        ]
    }

    /// Arguments prepended to a stop record sent at `stop_time`.
    ///
    /// `elapsed_time` is the difference between the `stop_time` and `start_time` values
    /// as sent on the wire, so a server can check one against the others exactly.
    pub fn stop_arguments(&self, stop_time: SystemTime) -> Vec<Argument> {
        let start_epoch = epoch_seconds(self.start_time);
        let stop_epoch = epoch_seconds(stop_time);

        vec![
            Argument::required("task_id", self.id.to_string()),
            Argument::required("stop_time", stop_epoch.to_string()),
            Argument::required(
                "elapsed_time",
                stop_epoch.saturating_sub(start_epoch).to_string(),
            ),
        ]
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}
