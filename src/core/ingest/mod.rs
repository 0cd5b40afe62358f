//! Job execution
//!
//! [`IngestPipeline`] takes one accepted job from `pending` to a terminal
//! state; [`WorkerPool`] runs many of them concurrently.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sinan_ingest::adapters::database::MemoryStore;
//! use sinan_ingest::config::PipelineConfig;
//! use sinan_ingest::core::ingest::IngestPipeline;
//! use sinan_ingest::domain::{Disease, UploadJobBuilder};
//!
//! # async fn run() -> sinan_ingest::domain::Result<()> {
//! let pipeline = IngestPipeline::new(Arc::new(MemoryStore::new()), PipelineConfig::default());
//! let job = UploadJobBuilder::new()
//!     .disease(Disease::Dengue)
//!     .year(2024)
//!     .source("DENGBR24.csv")
//!     .build()
//!     .map_err(sinan_ingest::domain::IngestError::Validation)?;
//! let outcome = pipeline.run(&job).await?;
//! println!("{} inserted", outcome.inserted);
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod pipeline;
pub mod pool;
pub mod residue;
pub mod staging;
pub mod summary;

pub use commit::CommitOutcome;
pub use pipeline::IngestPipeline;
pub use pool::WorkerPool;
pub use residue::ResidueWriter;
pub use staging::StagingLoader;
pub use summary::{IngestSummary, JobOutcome};
