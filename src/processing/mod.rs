//! Index building and similarity ranking

pub mod builder;
pub mod rank;

pub use builder::{indexable, BuildStats, IndexBuilder};
pub use rank::{rank, RankedEntry};
