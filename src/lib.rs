pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod error;
pub mod guard;
pub mod list;
pub mod navigation;
pub mod notify;
pub mod query;
pub mod session;
pub mod shell;
pub mod task;
pub mod timer;
pub mod view;

#[cfg(test)]
mod test_helpers;
