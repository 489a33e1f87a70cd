//! The translation pipeline: frame queue, chunk assembly, and the session
//! coordinator that runs chunks through the service ports.
//!
//! Two threads per session: the capture device's callback thread pushes
//! frames, and one processing worker drains them, connected by a bounded
//! crossbeam channel for backpressure.

pub mod assembler;
pub mod coordinator;
pub mod observer;
pub mod types;

pub use assembler::{ChunkAssembler, ChunkingParams, SharedChunking, shared_chunking, update_chunking};
pub use coordinator::{Coordinator, CoordinatorConfig, SessionPorts};
pub use observer::{CollectorObserver, SessionObserver};
pub use types::{AudioFrame, Chunk, PipelineResult, TranscriptionResult};
