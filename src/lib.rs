//! # medrag
//!
//! Retrieval-augmented question answering over a corpus of medical
//! transcription samples.
//!
//! Two stages share one persisted artifact:
//!
//! ```text
//! ┌───────────┐   ┌──────────────────────┐   ┌──────────────┐
//! │  CSV      │──▶│ Documents → Chunks →  │──▶│ index.sqlite │
//! │ dataset   │   │ Embeddings (indexer) │   │  (vectors)   │
//! └───────────┘   └──────────────────────┘   └──────┬───────┘
//!                                                   │
//!                      ┌────────────────────────────┤
//!                      ▼                            ▼
//!                 ┌──────────┐                ┌──────────┐
//!                 │   CLI    │                │   HTTP   │
//!                 │ (medrag) │                │  + UI    │
//!                 └──────────┘                └──────────┘
//! ```
//!
//! The domain logic (chunking, retrieval, prompt assembly) lives in
//! `medrag-core`; this crate adds configuration, the dataset reader,
//! provider clients, index persistence, and the CLI and HTTP surfaces.
//!
//! ## Quick Start
//!
//! ```bash
//! medrag index                   # build ./vectorstore from ./mtsamples.csv
//! export GOOGLE_API_KEY=...
//! medrag ask "What are the symptoms of allergic rhinitis?"
//! medrag serve                   # web UI on http://127.0.0.1:8501
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`dataset`] | CSV dataset reader |
//! | [`embedding`] | Embedding providers |
//! | [`generation`] | Text-generation providers |
//! | [`index_store`] | Index persistence |
//! | [`indexer`] | Offline index build |
//! | [`context`] | Query-side startup state |
//! | [`server`] | HTTP server and web UI |

pub mod ask;
pub mod config;
pub mod context;
pub mod dataset;
pub mod db;
pub mod embedding;
pub mod eval;
pub mod generation;
pub mod index_store;
pub mod indexer;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod server;
pub mod stats;
