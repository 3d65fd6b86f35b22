#![doc = "file-converter: conversion orchestration engine."]

//! Detects an uploaded file's format, offers the formats it can be converted
//! into, and dispatches the chosen conversion to a backend while enforcing
//! size limits and cleaning up temporary state on every exit path.
//!
//! Leaf-first:
//! - [`format`]: the [`format::Format`] enumeration and the upload classifier
//! - [`matrix`]: which targets each source may be converted into
//! - [`job_store`]: pending jobs with single consumption and TTL sweep
//! - [`backend`]: converter implementations
//! - [`router`]: `(source, target)` to converter dispatch, checked against the matrix
//! - [`download`]: HTTP fetcher for upload bytes
//! - [`orchestrate`]: the accept/select lifecycle with guaranteed cleanup
//!
//! The chat-platform glue that turns interactions into `accept`/`select`
//! calls lives outside this crate; [`cli`] drives the same lifecycle from the
//! command line.

pub mod backend;
pub mod cli;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod format;
pub mod job_store;
pub mod load_config;
pub mod matrix;
pub mod orchestrate;
pub mod router;

pub use contract::{ConvertedFile, Offer, SourceFile};
pub use error::ConversionError;
pub use format::Format;
pub use orchestrate::Orchestrator;
