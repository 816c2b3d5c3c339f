pub mod demo;
pub mod logs;
pub mod retry;
