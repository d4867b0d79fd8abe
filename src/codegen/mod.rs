//! Everything downstream of the catalog.
//!
//! ```text
//! ArtifactCatalog → Layout (OutputTree) → TreeWriter (write | check) → GenerationReceipt
//! ```
//!
//! - **layout**: catalog keys to repository paths, plus the per-language index,
//!   README, example `.bazelrc` files and the CI matrix
//! - **writer**: atomic writes, or drift detection with unified diffs
//! - **receipt**: provenance hashes for a run

pub mod layout;
pub mod receipt;
pub mod writer;

pub use layout::{Layout, OutputTree, PRESUBMIT_PATH, example_dir, implementation_path};
pub use receipt::{GenerationReceipt, compute_string_hash, registry_fingerprint};
pub use writer::{Drift, TreeWriter, WriteMode, WriteReport};
