pub mod auth;
pub mod chat;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod presence;
pub mod router;

pub use dispatcher::Dispatcher;
pub use error::CoreError;
