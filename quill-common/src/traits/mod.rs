// File: quill-common/src/traits/mod.rs
pub mod collaborators;
pub mod streaming;

pub use collaborators::{AccountProvider, StatusStore, StreamIndicator};
pub use streaming::{StreamHandler, StreamTransport, TransportFactory};
