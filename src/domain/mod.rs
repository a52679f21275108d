pub mod models;
pub mod prompt;
pub mod time;
