pub mod db;
pub mod events;
pub mod memory;
pub mod password;

pub use db::DbAdapter;
pub use events::AccountEvents;
pub use memory::{InMemoryDocumentStore, InMemoryIdentityProvider};
