//! Online near-duplicate filtering and k-means grouping of face embeddings.
//!
//! The crate is model-agnostic: embeddings are plain `f32` vectors produced
//! by whatever face model the caller runs.
//!
//! # Usage
//!
//! ```
//! use bytes::Bytes;
//! use facegroup_faceid::{ClusterEngine, EmbeddingStore, FaceEmbedding};
//!
//! let store = EmbeddingStore::new(2);
//! for (v, img) in [([1.0f32, 0.0], "a"), ([0.99, 0.1], "b"), ([-1.0, 0.0], "c")] {
//!     let emb = FaceEmbedding::from(v.to_vec());
//!     store.admit_if_new(emb, Bytes::from(img), 0.8).unwrap();
//! }
//! assert_eq!(store.len(), 2);
//!
//! let clustering = ClusterEngine::new(5, 100).with_seed(7).cluster(&store.snapshot());
//! assert_eq!(clustering.len(), 2);
//! ```
//!
//! # Design
//!
//! [`EmbeddingStore::admit_if_new`] runs the similarity gate and the append
//! under one lock, so two near-duplicates offered concurrently can never
//! both be admitted. [`ClusterEngine`] always works on a snapshot and
//! assigns run-scoped cluster ids: the same person may get a different id
//! in the next run.

mod embedding;
mod error;
mod kmeans;
mod similarity;
mod store;

pub use embedding::FaceEmbedding;
pub use error::FaceIdError;
pub use kmeans::{Cluster, ClusterEngine, Clustering};
pub use similarity::{DEFAULT_THRESHOLD, cosine_similarity, euclidean_sq, is_new_face};
pub use store::{Admission, EmbeddingStore, RetainedFace};
