//! Cross-domain implicit matrix-factorization training engine.
//!
//! Learns low-rank user/item factors from positive-only feedback so that
//! unobserved target-domain items can be ranked per user. The auxiliary
//! source domain influences target factors through one of two cross-domain
//! couplings on item factors:
//!
//! - [`simmf::SimMf`] regresses item factors toward an external pairwise
//!   similarity score.
//! - [`neighbormf::NeighborMf`] pulls item factors toward a weighted
//!   centroid of their item neighborhood.
//!
//! [`als::ImplicitAls`] is the Hu-Koren-Volinsky baseline (exact per-row LU
//! solve). [`fastals::FastAls`] and the two cross-domain variants replace
//! that solve with a single RR1 coordinate-descent cycle per outer
//! iteration.

pub mod als;
pub mod error;
pub mod fastals;
pub mod hyper;
pub mod index;
pub mod loader;
pub mod matrix;
pub mod neighbormf;
pub mod neighbors;
pub mod partition;
pub mod similarity;
pub mod simmf;
pub mod topn;

pub use als::ImplicitAls;
pub use error::{RecomfError, Result};
pub use fastals::FastAls;
pub use hyper::{HyperParameters, HyperParametersBuilder};
pub use index::{ItemId, PreferenceData, PreferenceIndex, UserId};
pub use matrix::FactorStore;
pub use neighbormf::NeighborMf;
pub use neighbors::ItemNeighborhoods;
pub use partition::DomainPartition;
pub use similarity::{PairwiseSimilarity, SimilarityOracle};
pub use simmf::SimMf;
