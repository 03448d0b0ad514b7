use std::collections::BTreeSet;

use time::{Date, OffsetDateTime};
use tracing::{debug, warn};

use crate::domain::task::Task;
use crate::notify::scheduler::NotificationScheduler;
use crate::repo::KeyValueStore;

/// Storage key the task list is written under.
pub const TASKS_KEY: &str = "tasksKey";

type Observer = Box<dyn Fn(&[Task])>;

/// Owns the task list. Every mutation is written through to storage and
/// announced to observers; nothing outside the store can edit the list.
pub struct TaskStore<S: KeyValueStore> {
    storage: S,
    key: String,
    scheduler: NotificationScheduler,
    tasks: Vec<Task>,
    observers: Vec<Observer>,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn new(storage: S, scheduler: NotificationScheduler) -> Self {
        Self::with_key(storage, TASKS_KEY, scheduler)
    }

    pub fn with_key(storage: S, key: impl Into<String>, scheduler: NotificationScheduler) -> Self {
        let mut store = Self {
            storage,
            key: key.into(),
            scheduler,
            tasks: Vec::new(),
            observers: Vec::new(),
        };
        store.load();
        store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks belonging to `day`, paired with their position in the store.
    pub fn tasks_on(&self, day: Date) -> Vec<(usize, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.date == day)
            .collect()
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn subscribe(&mut self, observer: impl Fn(&[Task]) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Append a task and schedule its alarms. Blank titles are ignored and
    /// yield `None`.
    pub fn add_task(
        &mut self,
        title: &str,
        note: &str,
        date: Date,
        time: Option<OffsetDateTime>,
        deadline: Option<OffsetDateTime>,
    ) -> Option<Task> {
        if title.trim().is_empty() {
            debug!("ignoring task with blank title");
            return None;
        }
        let task = Task::new(title, note, date, time, deadline);
        self.tasks.push(task.clone());
        self.changed();
        self.scheduler.schedule_for_task(&task);
        Some(task)
    }

    /// Flip completion on the stored task with the same id, if any.
    pub fn toggle_task(&mut self, task: &Task) {
        let Some(stored) = self.tasks.iter_mut().find(|t| t.id == task.id) else {
            return;
        };
        stored.is_done = !stored.is_done;
        self.changed();
    }

    /// Remove the tasks at `positions`, revoking their alarms first.
    ///
    /// # Panics
    ///
    /// Panics if any position is out of range for the current list.
    pub fn delete_tasks(&mut self, positions: impl IntoIterator<Item = usize>) {
        let positions: BTreeSet<usize> = positions.into_iter().collect();
        if positions.is_empty() {
            return;
        }
        let len = self.tasks.len();
        if let Some(&last) = positions.last() {
            assert!(last < len, "task position {last} out of range for {len} tasks");
        }
        for &pos in &positions {
            self.scheduler.cancel_for_task(self.tasks[pos].id);
        }
        for &pos in positions.iter().rev() {
            self.tasks.remove(pos);
        }
        self.changed();
    }

    fn changed(&mut self) {
        self.persist();
        for observer in &self.observers {
            observer(&self.tasks);
        }
    }

    fn persist(&mut self) {
        let encoded = match serde_json::to_vec(&self.tasks) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "failed to encode tasks");
                return;
            }
        };
        match self.storage.set(&self.key, &encoded) {
            Ok(()) => debug!(count = self.tasks.len(), "tasks saved"),
            Err(e) => warn!(error = %e, "failed to save tasks"),
        }
    }

    fn load(&mut self) {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "failed to read saved tasks");
                return;
            }
        };
        match serde_json::from_slice::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "tasks loaded");
                self.tasks = tasks;
            }
            Err(e) => warn!(error = %e, "discarding undecodable saved tasks"),
        }
    }
}
