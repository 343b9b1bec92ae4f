//! Rust IRC Daemon Core
//!
//! This crate provides the channel and user mode engine of a modular IRC
//! daemon: the mode registry and change pipeline, the users and channels
//! modes apply to, and the module interface modes are provided through.

pub mod channel;
pub mod config;
pub mod error;
pub mod extensible;
pub mod message;
pub mod mode;
pub mod module;
pub mod network;
pub mod numeric;
pub mod server;
pub mod sync;
pub mod user;
pub mod utils;

pub use channel::{Channel, ChannelMember};
pub use config::Config;
pub use error::{Error, Result};
pub use extensible::Extensible;
pub use message::{Message, MessageType, Prefix};
pub use mode::{
    Change, ChangeList, ModResult, ModeAction, ModeHandler, ModeParser, ModeTarget, ModeType,
    ParamSpec, ProcessFlags,
};
pub use module::{Module, ModuleManager, ModuleResult};
pub use network::{Delivery, Network};
pub use numeric::NumericReply;
pub use server::Server;
pub use sync::ChannelBurst;
pub use user::{OperInfo, User, UserId};

/// Re-exports for convenience
pub use serde::{Deserialize, Serialize};
pub use tracing::{debug, error, info, warn};
