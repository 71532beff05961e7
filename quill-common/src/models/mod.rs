// File: quill-common/src/models/mod.rs
pub mod account;
pub mod stream;

pub use account::{AccountId, AccountSnapshot, CredentialKind, StreamAccount};
pub use stream::{DeletionEvent, ListChange, SessionState, Status, StreamEvent, User};
