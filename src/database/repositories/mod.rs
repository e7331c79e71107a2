pub mod documents;
pub mod protocols;
pub mod users;

pub use documents::{DocumentRepository, NewDocument, PgDocumentRepository};
pub use protocols::{NewProtocol, PgProtocolRepository, ProtocolRepository};
pub use users::{PgUserRepository, UserRepository};
