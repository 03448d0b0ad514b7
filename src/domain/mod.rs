pub mod calendar;
pub mod suggest;
pub mod task;
