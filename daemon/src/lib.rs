//! Session state for Warden: the set of installed games, the current game
//! and the bookkeeping around them, kept consistent across settings reloads
//! and safe to share between threads.

pub mod config;
pub mod error;
pub mod event;
pub mod game;
pub mod logging;
pub mod paths;
pub mod registry;
pub mod selector;
pub mod session;
pub mod status;

pub use error::SessionError;
pub use game::{GameEntry, GameHandle, GameProbe, GameSettings};
pub use session::SessionState;
