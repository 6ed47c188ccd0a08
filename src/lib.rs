//! # vecviz - A Vector Database Walkthrough
//!
//! vecviz is a learning project that walks through the lifecycle of a
//! vector database: documents are turned into vectors, stored, and later
//! ranked against a query by cosine similarity.
//!
//! The "embedding" is a deterministic pseudo-random projection of the text
//! (see [`vector::generate`]), so the same text always maps to the same
//! 16-dimensional vector, but there is no semantic meaning behind it.
//!
//! ## Example
//!
//! ```
//! use vecviz::{generate, top_k, VectorStore};
//!
//! let mut store = VectorStore::new();
//!
//! // Embed and store documents
//! store.add("The cat sat on the mat");
//! store.add("Vector databases store embeddings");
//! store.add("A sunny day at the beach");
//!
//! // Rank them against a query
//! let query = generate("a SUNNY day at the beach");
//! let results = top_k(&query, store.items(), 2);
//! assert_eq!(results.len(), 2);
//! assert_eq!(results[0].item.text(), "A sunny day at the beach"); // Most similar
//! ```

pub mod config;
pub mod error;
pub mod flow;
pub mod ranker;
pub mod render;
pub mod store;
pub mod vector;

// Re-export the core as the primary public API
pub use config::Config;
pub use error::{Error, Result};
pub use flow::{FlowEvent, FlowObserver, FlowStep, Walkthrough};
pub use ranker::{cosine_similarity, top_k, ScoredItem};
pub use store::{StoredItem, VectorStore};
pub use vector::{generate, Vector, DIMENSION};
