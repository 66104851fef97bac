pub mod endpoints;
pub mod error;
pub mod fanout;
pub mod push;
pub mod queue;
pub mod sweep;

pub use fanout::{DispatchReport, FanOut};
pub use queue::{NotificationJob, NotificationQueue};
