// quill-streaming/src/lib.rs

pub mod logging;
pub mod presenter;
pub mod registry;
pub mod router;
pub mod service;
pub mod store;
pub mod supervisor;
pub mod test_utils;
pub mod watcher;

pub use quill_common::error::{Error, ProtocolError};
pub use registry::{SessionRegistry, StreamSession};
pub use service::StreamingService;
pub use supervisor::StreamingSupervisor;
