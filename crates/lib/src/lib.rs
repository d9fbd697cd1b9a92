//! Fable core library — chat-session state machine and remote-service
//! client used by the CLI.

pub mod config;
pub mod context;
pub mod pager;
pub mod remote;
pub mod session;
pub mod settings;
pub mod store;
pub mod turn;

#[cfg(test)]
pub(crate) mod testutil;
