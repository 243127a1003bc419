//! Core engine — the wait → scan → record loop.

pub mod clock;
pub mod scanner;
pub mod scheduler;
