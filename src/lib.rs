//! Day-based task list with write-through persistence and start/deadline
//! alarms.

pub mod config;
pub mod domain;
pub mod notify;
pub mod repo;
pub mod store;
