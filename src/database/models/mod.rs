pub mod document;
pub mod protocol;
pub mod user;

pub use document::Document;
pub use protocol::{Protocol, ProtocolStatus};
pub use user::User;
