//! # medrag core
//!
//! Shared, I/O-free logic for medrag: the data model, document synthesis,
//! the sliding-window chunker, the embedding and generation traits, the
//! in-memory vector index, prompt assembly, and the retrieval-augmented
//! answer pipeline that ties them together.
//!
//! This crate contains no tokio, sqlx, filesystem, or network code. The
//! `medrag` application crate supplies concrete embedders, generators, and
//! index persistence.
//!
//! ## Query flow
//!
//! ```text
//! query ──▶ embed ──▶ retrieve top-K ──▶ assemble prompt ──▶ generate ──▶ Answer
//! ```

pub mod answer;
pub mod chunk;
pub mod document;
pub mod embedding;
pub mod generate;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod prompt;
