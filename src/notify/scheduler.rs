//! Turns a task's start time and deadline into alarm registrations.
//!
//! Registrations and revocations go through one channel drained by a single
//! worker, so they reach the notification center in call order. The caller
//! never waits for them and only the logs record the outcome.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{AlarmKind, AlarmRequest, CalendarTrigger, NotificationCenter};
use crate::domain::calendar::{clock_label, zero_seconds};
use crate::domain::task::{Task, TaskId};

const START_TITLE: &str = "Task Time! 😎";
const DEADLINE_TITLE: &str = "Task Time Over! ⏰";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSounds {
    pub start: Option<String>,
    pub deadline: Option<String>,
}

impl Default for AlarmSounds {
    fn default() -> Self {
        Self {
            start: Some("start_notif.mp3".to_string()),
            deadline: Some("deadline_notif.mp3".to_string()),
        }
    }
}

enum Command {
    Register(AlarmRequest),
    Revoke(Vec<String>),
    Flush(oneshot::Sender<()>),
}

pub struct NotificationScheduler {
    center: Arc<dyn NotificationCenter>,
    sounds: AlarmSounds,
    commands: mpsc::UnboundedSender<Command>,
}

impl NotificationScheduler {
    /// Spawns the worker on `runtime`; it exits once the scheduler is dropped.
    pub fn new(center: Arc<dyn NotificationCenter>, runtime: Handle) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_worker(Arc::clone(&center), rx));
        Self {
            center,
            sounds: AlarmSounds::default(),
            commands,
        }
    }

    pub fn with_sounds(mut self, sounds: AlarmSounds) -> Self {
        self.sounds = sounds;
        self
    }

    /// Zero, one or two requests: nothing without a start time, a start
    /// alarm, plus a deadline alarm when the task has one.
    pub fn alarms_for_task(&self, task: &Task) -> Vec<AlarmRequest> {
        let Some(start) = task.time.map(zero_seconds) else {
            return Vec::new();
        };
        let deadline = task.deadline.map(zero_seconds);

        let mut body = task.title.clone();
        if !task.note.trim().is_empty() {
            body.push('\n');
            body.push_str(task.note.trim());
        }

        let start_title = match deadline {
            Some(deadline) => format!("{START_TITLE} - Finish by {}", clock_label(deadline)),
            None => START_TITLE.to_string(),
        };
        let mut alarms = vec![AlarmRequest {
            identifier: AlarmKind::Start.identifier(task.id),
            trigger: CalendarTrigger::once_at(start),
            title: start_title,
            body,
            sound: self.sounds.start.clone(),
        }];

        if let Some(deadline) = deadline {
            alarms.push(AlarmRequest {
                identifier: AlarmKind::Deadline.identifier(task.id),
                trigger: CalendarTrigger::once_at(deadline),
                title: DEADLINE_TITLE.to_string(),
                body: task.title.clone(),
                sound: self.sounds.deadline.clone(),
            });
        }
        alarms
    }

    pub fn schedule_for_task(&self, task: &Task) {
        let alarms = self.alarms_for_task(task);
        if alarms.is_empty() {
            debug!(task = %task.id, "no start time, skipping alarms");
            return;
        }
        for request in alarms {
            self.send(Command::Register(request));
        }
    }

    pub fn cancel_for_task(&self, task: TaskId) {
        let identifiers: Vec<String> = AlarmKind::ALL
            .iter()
            .map(|kind| kind.identifier(task))
            .collect();
        debug!(%task, "cancelling alarms");
        self.send(Command::Revoke(identifiers));
    }

    /// Wait until everything sent so far has reached the center.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.send(Command::Flush(done)) {
            let _ = wait.await;
        }
    }

    pub async fn request_authorization(&self) -> bool {
        match self.center.request_authorization().await {
            Ok(true) => {
                info!("notification permission granted");
                true
            }
            Ok(false) => {
                warn!("notification permission denied");
                false
            }
            Err(e) => {
                warn!(error = %e, "failed to request notification permission");
                false
            }
        }
    }

    fn send(&self, command: Command) -> bool {
        let sent = self.commands.send(command).is_ok();
        if !sent {
            warn!("alarm worker has stopped, dropping request");
        }
        sent
    }
}

async fn run_worker(center: Arc<dyn NotificationCenter>, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Register(request) => {
                let identifier = request.identifier.clone();
                let fire_at = request.trigger.fire_time();
                match center.add(request).await {
                    Ok(()) => info!(%identifier, ?fire_at, "alarm scheduled"),
                    Err(e) => warn!(%identifier, error = %e, "failed to schedule alarm"),
                }
            }
            Command::Revoke(identifiers) => center.remove_pending(&identifiers),
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
