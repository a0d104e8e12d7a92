pub mod message;
pub mod session;

pub use message::{ChatMessage, Role};
pub use session::Session;
