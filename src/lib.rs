pub mod broker;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod exchange;
pub mod ipc;
pub mod queue;
pub mod session;
pub mod storage;
pub mod tool;
