//! # sixx-core
//!
//! A personal contacts database. Contacts are written as blocks of `key value` lines in
//! plain text files, parsed into a typed node/link graph, and listed as phonebook-style
//! reports.
//!
//! ## Overview
//!
//! Every entity (a person, a family, a company, a telephone number, a country) is a node
//! of a [`graph::Graph`]. Relations between entities are links, and links are nodes too,
//! so a `Works_at` link can carry its own telephone numbers and position. Names, places
//! and sort keys are derived from the graph rather than stored, see [`named`].
//!
//! ### Key Features
//!
//! - **Forward references**: blocks refer to each other by name in any order; a block
//!   whose lookup fails is parked and replayed once more of the input is known
//! - **Places**: countries and areas give telephone numbers and addresses a home, and
//!   entries inherit places from the things they are linked to
//! - **Predicates**: composable selections over nodes and links, also parsed from the
//!   command line by [`query::parse_predicate`]
//! - **Collation**: one entry may be listed under several names, with references culled
//!   when the entry itself is close by, see [`sort`]
//!
//! ## Architecture
//!
//! - **[`graph`]**: nodes, links, traversal and predicates
//! - **[`entity`]**: the payload of each node type, with its parser and formatter
//! - **[`codec`]**: input text to graph (`BlockCompiler`, `BlockBuilder`, `Dataset`)
//! - **[`model`]**: the graph of one parse run plus its name registry
//! - **[`report`]**: dump, phone, email and stats reports
//! - **[`config`]**: report settings read from TOML
//!
//! ## Quick Start
//!
//! ```rust
//! use sixx_core::{codec::BlockCompiler, report};
//!
//! # fn main() -> Result<(), sixx_core::SixxError> {
//! let mut compiler = BlockCompiler::default();
//! compiler.parse_source("fn Jo\nln Bloggs\nwork Acme\n\nco Acme\n", "contacts.sixx")?;
//! compiler.finish_parsing()?;
//! let model = compiler.into_model();
//!
//! let listing = report::dump(&model, &report::default_selection(), &Default::default())?;
//! assert!(listing.contains("works at Acme"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `sixx` command line report generator

pub mod codec;
pub mod config;
pub mod date;
pub mod entity;
pub mod error;
pub mod graph;
pub mod input;
pub mod model;
pub mod multilang;
pub mod named;
pub mod query;
pub mod report;
pub mod sort;
pub mod text;
#[cfg(test)]
mod tests;

pub use error::*;
pub use graph::{Graph, NodeId, NodeType};
pub use model::Model;
