//! Diagnostic types for reference resolution.
//!
//! A data block that names an entry not yet parsed is parked until the rest of the input
//! has had a chance to define it. These types describe what a parked block is waiting
//! for, and how a block run ended.

use enumset::EnumSet;
use std::fmt;

use crate::{
    error::SixxError,
    graph::{type_names, NodeType},
    input::{Loc, Located, Text},
};

/// A lookup by name that found nothing.
///
/// During compilation this is expected: the named entry may be defined further down
/// the input. Once no parked block can make progress, the first one still waiting
/// reports its reference as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedReference {
    /// The types the lookup accepted.
    pub types: EnumSet<NodeType>,

    /// The name that was looked up.
    pub name: String,

    /// Where the name appears in the input.
    pub reference_location: Option<Loc>,
}

impl UnresolvedReference {
    pub fn new(types: EnumSet<NodeType>, name: &Text) -> Self {
        Self {
            types,
            name: name.to_string(),
            reference_location: name.loc(),
        }
    }

    /// The error reported when the reference can never be resolved.
    pub fn to_error(&self) -> SixxError {
        SixxError::input(
            &self.reference_location,
            format!("no such {} \"{}\"", type_names(self.types), self.name),
        )
    }
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "find({}, \"{}\")", type_names(self.types), self.name)?;
        if let Some(loc) = &self.reference_location {
            write!(f, " at {loc}")?;
        }
        Ok(())
    }
}

/// Why a run of a data block stopped before the end.
#[derive(Debug, Clone, PartialEq)]
pub enum Interrupt {
    /// The block is waiting for a name to be defined; run it again later.
    Suspend(UnresolvedReference),
    /// The block is in error; no retry can fix it.
    Fail(SixxError),
}

impl Interrupt {
    pub fn is_suspend(&self) -> bool {
        matches!(self, Self::Suspend(_))
    }

    pub fn as_unresolved_reference(&self) -> Option<&UnresolvedReference> {
        match self {
            Self::Suspend(unresolved) => Some(unresolved),
            Self::Fail(_) => None,
        }
    }
}

impl From<SixxError> for Interrupt {
    fn from(err: SixxError) -> Self {
        Interrupt::Fail(err)
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspend(unresolved) => write!(f, "suspended on {unresolved}"),
            Self::Fail(err) => write!(f, "failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Text {
        Text::new("Acme", Some(Loc::new("in.sixx", 7, Some(6))))
    }

    #[test]
    fn test_unresolved_reference_creation() {
        let unresolved = UnresolvedReference::new(EnumSet::only(NodeType::Company), &acme());
        assert_eq!(unresolved.name, "Acme");
        assert_eq!(
            unresolved.reference_location,
            Some(Loc::new("in.sixx", 7, Some(6)))
        );
        assert_eq!(
            unresolved.to_string(),
            "find(Company, \"Acme\") at 'in.sixx', line 7, column 6"
        );
    }

    #[test]
    fn test_unresolved_reference_error() {
        let unresolved = UnresolvedReference::new(
            NodeType::Organisation | NodeType::Residence,
            &acme(),
        );
        let err = unresolved.to_error();
        assert_eq!(err.message(), "no such Organisation/Residence \"Acme\"");
        assert_eq!(err.loc().map(|l| l.line), Some(7));
    }

    #[test]
    fn test_interrupt_from_error() {
        let interrupt: Interrupt = SixxError::unlocated("bad").into();
        assert!(!interrupt.is_suspend());
        assert!(interrupt.as_unresolved_reference().is_none());

        let suspended =
            Interrupt::Suspend(UnresolvedReference::new(EnumSet::only(NodeType::Family), &acme()));
        assert!(suspended.is_suspend());
        assert!(suspended.as_unresolved_reference().is_some());
    }
}
