//! Streaming Ingestion Pipeline
//!
//! The client side of a time-series Ingestion Service: frames go in, wire
//! requests come out. Oversized frames are decomposed under the transport
//! message limit, converted into requests carrying process-unique ids, and
//! queued for a downstream consumer that drives the RPC stream.
//!
//! Two entry points:
//!
//! - [`UnaryIngestClient`] — serial façade: bin, convert, one RPC per
//!   message, acknowledgements in order.
//! - [`IngestionFrameProcessor`] — the multi-stage pipeline with worker
//!   pools, producer back-pressure, and coordinated shutdown, exposing a
//!   blocking message supply via `take`/`poll`.

pub mod config;
pub mod convert;
pub mod error;
pub mod metrics;
pub mod processor;
pub mod request;
pub mod service;
pub mod unary;

mod queue;
mod state;

// Re-export main types
pub use config::{BackPressure, Concurrency, FrameDecomposition, ProcessorConfig, MAX_MESSAGE_SIZE};
pub use convert::{create_request, RequestConverter, RequestIdAllocator};
pub use error::IngestError;
pub use metrics::ProcessorMetrics;
pub use processor::IngestionFrameProcessor;
pub use request::{
    EventMetadata, FramePayload, IngestDataRequest, IngestRequestUid, IngestionResult,
    ProviderRegistration, ProviderUid,
};
pub use service::{IngestionService, IngestionServiceBoxed, JsonFileService, NullService};
pub use state::PipelineState;
pub use unary::UnaryIngestClient;
