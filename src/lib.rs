mod app;
mod config;
mod constants;
mod dispatch;
mod errors;
mod gateway;
mod hub;
mod resource;
mod store;
mod sync;

pub use app::*;
pub use config::*;
pub use dispatch::*;
pub use errors::*;
pub use gateway::*;
pub use hub::*;
pub use resource::*;
pub use store::*;
pub use sync::*;
