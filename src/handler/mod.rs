pub mod chat;
pub mod jobs;
pub mod payments;
pub mod tasks;
pub mod users;
