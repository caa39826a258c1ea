mod action;
mod agent;
mod display_message;
mod event;
mod gateway;
mod message;
mod placeholder;
mod textarea;

pub use action::*;
pub use agent::*;
pub use display_message::*;
pub use event::*;
pub use gateway::*;
pub use message::*;
pub use placeholder::*;
pub use textarea::*;
