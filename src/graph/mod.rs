//! The contacts graph: typed nodes, links that are nodes themselves, and the predicates
//! used to select them.

pub mod predicate;
pub mod store;
pub mod types;

pub use predicate::{LinkPredicate, NodePredicate, SelectionPredicate};
pub use store::Graph;
pub use types::{type_names, Context, Element, Ends, Entity, Incidence, NodeId, NodeType, PhoneKind};
