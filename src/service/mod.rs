pub mod acceptance_hooks;
pub mod chat_service;
pub mod error;
pub mod escrow_service;
pub mod job_service;
pub mod task_service;
