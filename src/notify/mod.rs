//! Alarm requests and the notification center they are registered with.

use anyhow::Result;
use async_trait::async_trait;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::domain::task::TaskId;

pub mod memory;
pub mod scheduler;
pub mod sqlite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    Start,
    Deadline,
}

impl AlarmKind {
    pub const ALL: [AlarmKind; 2] = [AlarmKind::Start, AlarmKind::Deadline];

    pub fn as_str(self) -> &'static str {
        match self {
            AlarmKind::Start => "start",
            AlarmKind::Deadline => "deadline",
        }
    }

    /// `"{task}-start"` or `"{task}-deadline"`.
    pub fn identifier(self, task: TaskId) -> String {
        format!("{task}-{}", self.as_str())
    }
}

/// Fires when the wall clock matches year/month/day/hour/minute in `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTrigger {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub offset: UtcOffset,
    pub repeats: bool,
}

impl CalendarTrigger {
    pub fn once_at(at: OffsetDateTime) -> Self {
        Self {
            year: at.year(),
            month: u8::from(at.month()),
            day: at.day(),
            hour: at.hour(),
            minute: at.minute(),
            offset: at.offset(),
            repeats: false,
        }
    }

    /// The instant the trigger matches, if its components form a valid date.
    pub fn fire_time(&self) -> Option<OffsetDateTime> {
        let month = Month::try_from(self.month).ok()?;
        let date = Date::from_calendar_date(self.year, month, self.day).ok()?;
        let clock = Time::from_hms(self.hour, self.minute, 0).ok()?;
        Some(PrimitiveDateTime::new(date, clock).assume_offset(self.offset))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    pub identifier: String,
    pub trigger: CalendarTrigger,
    pub title: String,
    pub body: String,
    pub sound: Option<String>,
}

/// The service alarms are handed to. Registration is async; revocation is
/// fire-and-forget and must tolerate unknown identifiers.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn request_authorization(&self) -> Result<bool> {
        Ok(true)
    }

    /// Register a request, replacing any pending one with the same identifier.
    async fn add(&self, request: AlarmRequest) -> Result<()>;

    fn remove_pending(&self, identifiers: &[String]);

    fn pending(&self) -> Vec<AlarmRequest>;

    /// Pending alarms whose trigger time is at or before `now`.
    fn due(&self, now: OffsetDateTime) -> Vec<AlarmRequest> {
        self.pending()
            .into_iter()
            .filter(|r| r.trigger.fire_time().is_some_and(|at| at <= now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn identifiers_are_derived_from_task_id() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            AlarmKind::Start.identifier(id),
            "67e55044-10b1-426f-9247-bb680e5fe0c8-start"
        );
        assert_eq!(
            AlarmKind::Deadline.identifier(id),
            "67e55044-10b1-426f-9247-bb680e5fe0c8-deadline"
        );
    }

    #[test]
    fn trigger_matches_minute_components() {
        let trigger = CalendarTrigger::once_at(datetime!(2024-12-22 14:30 +09:00));
        assert_eq!(
            (trigger.year, trigger.month, trigger.day, trigger.hour, trigger.minute),
            (2024, 12, 22, 14, 30)
        );
        assert!(!trigger.repeats);
        assert_eq!(trigger.fire_time(), Some(datetime!(2024-12-22 14:30 +09:00)));
    }

    #[test]
    fn invalid_components_have_no_fire_time() {
        let mut trigger = CalendarTrigger::once_at(datetime!(2024-02-10 8:00 UTC));
        trigger.day = 30;
        assert_eq!(trigger.fire_time(), None);
    }
}
