use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::calendar::zero_seconds;

pub type TaskId = Uuid;

time::serde::format_description!(day_format, Date, "[year]-[month]-[day]");

/// One to-do entry. Only `is_done` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub note: String,
    #[serde(with = "day_format")]
    pub date: Date,
    /// When the task becomes active.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub time: Option<OffsetDateTime>,
    /// When the task should be finished.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    pub is_done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Done,
    Delayed,
    InProgress,
    Upcoming,
    Unscheduled,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        note: impl Into<String>,
        date: Date,
        time: Option<OffsetDateTime>,
        deadline: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            note: note.into(),
            date,
            time: time.map(zero_seconds),
            deadline: deadline.map(zero_seconds),
            is_done: false,
        }
    }

    pub fn status(&self, now: OffsetDateTime) -> TaskStatus {
        if self.is_done {
            return TaskStatus::Done;
        }
        if self.deadline.is_some_and(|deadline| now > deadline) {
            return TaskStatus::Delayed;
        }
        match self.time {
            Some(start) if now > start => TaskStatus::InProgress,
            Some(_) => TaskStatus::Upcoming,
            None => TaskStatus::Unscheduled,
        }
    }

    /// Fraction of the start..deadline window that has elapsed, clamped to
    /// `[0, 1]`. `None` unless both ends exist and the window is positive.
    pub fn progress(&self, now: OffsetDateTime) -> Option<f64> {
        let (start, deadline) = (self.time?, self.deadline?);
        let total = (deadline - start).as_seconds_f64();
        if total <= 0.0 {
            return None;
        }
        let elapsed = (now - start).as_seconds_f64();
        Some((elapsed / total).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    fn meeting() -> Task {
        Task::new(
            "Meeting",
            "",
            date!(2024-12-22),
            Some(datetime!(2024-12-22 10:00:42 UTC)),
            Some(datetime!(2024-12-22 11:00:07 UTC)),
        )
    }

    #[test]
    fn new_task_is_open_with_zeroed_seconds() {
        let task = meeting();
        assert!(!task.is_done);
        assert_eq!(task.time, Some(datetime!(2024-12-22 10:00 UTC)));
        assert_eq!(task.deadline, Some(datetime!(2024-12-22 11:00 UTC)));
        assert_ne!(task.id, meeting().id);
    }

    #[test]
    fn status_follows_clock() {
        let mut task = meeting();
        assert_eq!(task.status(datetime!(2024-12-22 9:00 UTC)), TaskStatus::Upcoming);
        assert_eq!(task.status(datetime!(2024-12-22 10:30 UTC)), TaskStatus::InProgress);
        assert_eq!(task.status(datetime!(2024-12-22 11:01 UTC)), TaskStatus::Delayed);
        task.is_done = true;
        assert_eq!(task.status(datetime!(2024-12-22 11:01 UTC)), TaskStatus::Done);

        let loose = Task::new("Read", "", date!(2024-12-22), None, None);
        assert_eq!(loose.status(datetime!(2024-12-22 11:01 UTC)), TaskStatus::Unscheduled);
    }

    #[test]
    fn progress_is_clamped() {
        let task = meeting();
        assert_eq!(task.progress(datetime!(2024-12-22 9:00 UTC)), Some(0.0));
        assert_eq!(task.progress(datetime!(2024-12-22 10:30 UTC)), Some(0.5));
        assert_eq!(task.progress(datetime!(2024-12-22 12:00 UTC)), Some(1.0));

        let open_ended = Task::new(
            "Read",
            "",
            date!(2024-12-22),
            Some(datetime!(2024-12-22 10:00 UTC)),
            None,
        );
        assert_eq!(open_ended.progress(datetime!(2024-12-22 10:30 UTC)), None);
    }

    #[test]
    fn serializes_with_field_names() {
        let task = meeting();
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["title"], "Meeting");
        assert_eq!(value["date"], "2024-12-22");
        assert_eq!(value["time"], "2024-12-22T10:00:00Z");
        assert_eq!(value["isDone"], false);

        let back: Task = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn missing_optional_times_decode_as_none() {
        let raw = r#"{
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "title": "Buy milk",
            "note": "",
            "date": "2024-12-22",
            "isDone": true
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.time, None);
        assert_eq!(task.deadline, None);
        assert!(task.is_done);
    }
}
