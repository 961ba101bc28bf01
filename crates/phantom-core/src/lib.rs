//! Phantom core crate - shared data model, attachment codec, configuration,
//! errors and domain events.

pub mod attachment;
pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use attachment::mime_type_for_path;
pub use config::PhantomConfig;
pub use error::{PhantomError, Result};
pub use events::DomainEvent;
pub use types::*;
