//! # cnote-jobs
//!
//! Background job worker for cnote.
//!
//! Note indexing runs out of band: creates and updates queue a durable
//! re-index job, and this worker drains the queue, chunking and embedding
//! note content into the vector store. Transient failures go back to the
//! queue until the attempt budget runs out.

pub mod handler;
pub mod reindex;
pub mod worker;

pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use reindex::ReindexHandler;
pub use worker::{JobWorker, WorkerConfig, WorkerHandle};
