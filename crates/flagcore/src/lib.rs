//! Pure decision-engine logic shared by the control plane (for compiling
//! snapshots), the decision service and the in-process SDK.
//!
//! Nothing in this crate performs I/O: given a snapshot and a user, it
//! answers deterministically and synchronously. Everything that talks to
//! Postgres, an object store, or the network lives one layer up.

pub mod assigner;
pub mod bucket;
pub mod evaluator;
pub mod snapshot;

pub use assigner::{assign, Assignment};
pub use bucket::bucket as bucket_user;
pub use evaluator::evaluate;
pub use snapshot::{
    ConfigExperiment, ConfigSnapshot, Operator, SnapshotAllocation, SnapshotVariant,
    TargetingCondition, TargetingRule, VersionIndex,
};
