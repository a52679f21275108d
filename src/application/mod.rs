pub mod bootstrap;
pub mod calendar;
pub mod errors;
pub mod notifications;
pub mod oauth;
pub mod planner;
pub mod schedule_generator;
pub mod state;
pub mod ticker;
