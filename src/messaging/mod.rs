//! # Messaging Module
//!
//! Background job handoff between the serving path and the enrichment worker.

pub mod errors;
pub mod message;
pub mod queue;

pub use errors::{MessagingError, MessagingResult};
pub use message::EnrichmentJob;
pub use queue::{InMemoryJobQueue, JobPublisher, JobReceiver};
