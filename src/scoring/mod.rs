//! Per-source candidate scoring.
//!
//! One scorer per knowledge shape: the rubric scorer walks the graded
//! repertory tree, the dictionary scorer scans flat keynote entries. Both
//! are pure CPU work over an immutable knowledge base and a normalized
//! keyword set, and both emit `CandidateScore` values labeled with their
//! source.

pub mod dictionary;
pub mod rubric;

pub use dictionary::score_dictionary;
pub use rubric::score_rubrics;

/// Upper bound enforced on every per-source score.
pub const SCORE_CAP: u32 = 100;
