//! # Trueno-Sweep: Resumable Cross-Session Benchmark Sweeps
//!
//! **Version**: 0.1.0
//!
//! Trueno-Sweep evaluates a catalog of transfer-learning classifiers on
//! multi-session recordings (e.g. motor-imagery EEG): for each subject, the
//! last session recorded is the target domain, a small stratified slice of
//! it is used for calibration, and the rest is held out for scoring.
//!
//! ## Design Principles
//!
//! - **Append-only ledger**: one durable JSON line per completed model; the
//!   ledger is both the checkpoint and the output
//! - **At-most-once**: a model already in the ledger is never re-run, so an
//!   interrupted sweep resumes where it stopped
//! - **Fault isolation**: a model that errors or panics is logged and
//!   skipped; the rest of the catalog still runs
//!
//! ## Pipeline
//!
//! ```text
//! Dataset ─> encode_sessions ─> TransferSplitter ─> run_catalog ─> JsonlLedger
//!                                                       ▲
//!                                    build_catalog ─────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use trueno_sweep::data::{encode_sessions, Label, SessionData, SessionId, Trial};
//! use trueno_sweep::split::TransferSplitter;
//!
//! # fn main() -> trueno_sweep::Result<()> {
//! let session = |id: &str, n: usize| SessionData {
//!     session: SessionId::new(id),
//!     trials: vec![Trial::from_vector(vec![0.0; 8]); n],
//!     labels: (0..n).map(|i| Label::new(if i % 2 == 0 { "left" } else { "right" })).collect(),
//! };
//!
//! let encoded = encode_sessions(vec![session("0train", 20), session("1test", 10)])?;
//! let target = encoded.target_domain();
//! assert_eq!(target.to_string(), "S2");
//!
//! let split = TransferSplitter::new(target, 0.2)?
//!     .split(encoded.domains(), encoded.labels())?
//!     .next()
//!     .expect("one split");
//! assert_eq!(split.train.len(), 22); // 20 source + 2 calibration
//! assert_eq!(split.test.len(), 8);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod ledger;
pub mod report;
pub mod runner;
pub mod split;
pub mod sweep;
pub mod telemetry;

pub use error::{Error, Result};
