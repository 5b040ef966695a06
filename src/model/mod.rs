pub mod task;
pub mod list;
pub mod state;
pub mod auth;
pub mod config;

pub use task::*;
pub use list::*;
pub use state::*;
pub use auth::*;
pub use config::*;
