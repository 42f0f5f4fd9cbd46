pub mod category;
pub mod config;
pub mod item;
pub mod state;

pub use category::*;
pub use config::*;
pub use item::*;
pub use state::*;
