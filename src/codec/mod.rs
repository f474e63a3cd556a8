//! Parsing input text into a [`Model`](crate::model::Model).
//!
//! ## Key Components
//!
//! - [`parse`] - Splits lines into blocks, control lines and delimited parts
//! - [`Dataset`] - The key/value lines of a part, nested by indentation
//! - [`BlockBuilder`] - Builds the entries of one data block
//! - [`BlockCompiler`] - Runs control blocks and drives data blocks to completion
//! - [`UnresolvedReference`] - A lookup a parked data block is waiting on
//!
//! ## Forward References
//!
//! Data blocks refer to each other by name, in any order. A block whose lookup finds
//! nothing is parked and retried once the rest of the input has been parsed; see
//! [`BlockCompiler`] for the retry rounds and how unresolvable references are reported.

pub mod builder;
pub mod compiler;
pub mod dataset;
pub mod diagnostic;
pub mod parse;

pub use builder::{BlockBuilder, Defaults, Journal};
pub use compiler::BlockCompiler;
pub use dataset::{Dataset, DatasetMemo};
pub use diagnostic::{Interrupt, UnresolvedReference};
pub use parse::Part;
