//! Domain models and types for sinan-ingest.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`JobId`], [`Geocode`])
//! - **Upload jobs** ([`UploadJob`], [`Disease`], [`Uf`])
//! - **Typed rows** ([`NotificationRecord`], [`UniqueKey`])
//! - **Epidemiological weeks** ([`Epiweek`])
//! - **Error types** ([`IngestError`], [`SourceError`]) and the [`Result`] alias
//!
//! # Builder Pattern
//!
//! ```rust
//! use sinan_ingest::domain::{Disease, Uf, UploadJobBuilder};
//!
//! # fn example() -> Result<(), String> {
//! let job = UploadJobBuilder::new()
//!     .disease(Disease::Dengue)
//!     .uf(Some(Uf::SP))
//!     .year(2024)
//!     .source("/uploads/dengue_2024.csv")
//!     .owner("analyst")
//!     .build()?;
//! assert_eq!(job.disease.cid10(), "A90");
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod epiweek;
pub mod errors;
pub mod ids;
pub mod job;
pub mod record;
pub mod result;

pub use epiweek::Epiweek;
pub use errors::{IngestError, SourceError};
pub use ids::{Geocode, JobId};
pub use job::{Disease, Uf, UploadJob, UploadJobBuilder};
pub use record::{NotificationRecord, UniqueKey};
pub use result::Result;
