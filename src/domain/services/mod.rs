pub mod actions;
mod app_state;
mod chat_list;
pub mod events;
pub mod loader;
mod normalizer;
mod scroll;
mod store;

pub use app_state::*;
pub use chat_list::*;
pub use normalizer::*;
pub use scroll::*;
pub use store::*;
