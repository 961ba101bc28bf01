//! Conversation engine for Phantom.
//!
//! Owns the in-memory session store, the response generator contract, and the
//! orchestrator that runs one request/response cycle at a time while merging
//! voice input into the same message pipeline.

pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod store;

pub use error::ChatError;
pub use generator::{
    EchoGenerator, GenerationError, GenerationRequest, GenerationSettings, ResponseGenerator,
};
pub use orchestrator::Orchestrator;
pub use store::SessionStore;
