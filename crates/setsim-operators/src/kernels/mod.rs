//! Pure kernels over borrowed column buffers.
//!
//! Nothing in here knows about tables, plans, or budgets; callers hand in
//! column views and a `Parallelism` and get owned result buffers back.

pub mod chunk;
pub mod jaccard;
pub mod sum;

pub use chunk::Parallelism;
pub use jaccard::{jaccard, SimilarityResult};
pub use sum::{sum_column, sum_grouped};
