//! Anchor service: persistent sessions over the engine
//!
//! Sessions live in a `SessionStore` as snapshot records between requests.
//! Every request for a session id runs under that id's lock, covering the
//! whole load, mutate and save cycle.

pub mod service;
pub mod store;

pub use service::{AnchorService, Reply};
pub use store::{FileStore, InMemoryStore, SessionStore, StoredSnapshot};
