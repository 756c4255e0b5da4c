//! Change notification for extraction roots

pub mod watcher;

pub use watcher::{Subscription, WatchConfig, WatchError, WatchRegistry};
