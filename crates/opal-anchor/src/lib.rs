//! Rolling checkpoint anchors for the Opal ledger.
//!
//! [`AnchorBuilder`] folds committed transaction hashes into a tamper-evident
//! chain; [`AnchorWorker`] runs the compute/publish/persist cycle as a
//! host-managed background task behind the [`AnchorRecorder`] contract.

pub mod builder;
pub mod error;
pub mod recorder;
pub mod worker;

pub use builder::AnchorBuilder;
pub use error::{AnchorError, AnchorResult};
pub use recorder::{AnchorRecorder, LoggingAnchorRecorder};
pub use worker::AnchorWorker;
