#![doc = "docpress-core: the draft-to-post publishing pipeline."]

//! This crate holds the data model, capability traits and every stage of the
//! pipeline that turns Word drafts into static-site blog posts. The binary
//! crate only adds CLI glue, config loading and the HTTP generation client.
//!
//! # Usage
//! Build a [`config::PipelineConfig`], pick a [`contract::DocumentReader`]
//! (usually [`extract::DocxReader`]), a [`contract::TextGenerator`] and a
//! [`contract::DeploymentNotifier`], then call [`pipeline::publish_batch`].

pub mod archive;
pub mod config;
pub mod contract;
pub mod deploy;
pub mod discover;
pub mod error;
pub mod extract;
pub mod images;
pub mod metadata;
pub mod pipeline;
pub mod publish;
pub mod transform;
