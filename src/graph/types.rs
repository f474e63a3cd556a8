use chrono::NaiveDate;
use enumset::{EnumSet, EnumSetType};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use crate::{
    entity::{
        address::Address,
        comment::Comment,
        data::Data,
        email::{Email, Uri},
        family::Family,
        keyword::Keyword,
        org::Organisation,
        person::{Birthday, Person},
        telephone::Telephone,
        world::{Area, Country, Place},
    },
    multilang::Multilang,
};

/// Identity of a node or link in a [`crate::graph::Graph`]. Links are nodes too, so a
/// single id space covers both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) NodeIndex);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0.index()
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}", self.0.index())
    }
}

/// [NodeType] names every kind of node in the contacts graph. The first six variants are
/// abstract: no node is ever created with them, but they group the concrete types for
/// [crate::graph::predicate::instance_p] tests and for [crate::model::Model::find].
#[derive(Debug, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(repr = "u64")]
pub enum NodeType {
    Node,
    Link,
    /// Person, Family or Organisation
    NamedNode,
    /// Company or Department
    Organisation,
    /// Residence or PostalAddress
    Address,
    /// Works_at, Located_at, With or Ex
    Association,

    Model,
    Person,
    Family,
    Company,
    Department,
    Residence,
    PostalAddress,
    Telephone,
    Email,
    Uri,
    Comment,
    Keyword,
    Data,
    Country,
    Area,
    Birthday,

    InModel,
    HasCountry,
    HasArea,
    IsIn,
    BelongsTo,
    WorksAt,
    LocatedAt,
    HasDepartment,
    ResidesAt,
    HasPostalAddress,
    HasPhone,
    HasEmail,
    HasWebPage,
    With,
    Ex,
    KeyedWith,
    HasComment,
    HasContext,
    BornOn,
}

impl NodeType {
    /// The immediate supertype, `None` only for [NodeType::Node].
    pub fn parent(self) -> Option<NodeType> {
        use NodeType::*;
        match self {
            Node => None,
            Link | NamedNode | Address | Model | Telephone | Email | Uri | Comment | Keyword
            | Data | Country | Area | Birthday => Some(Node),
            Organisation | Person | Family => Some(NamedNode),
            Company | Department => Some(Organisation),
            Residence | PostalAddress => Some(Address),
            WorksAt | LocatedAt | With | Ex => Some(Association),
            _ => Some(Link),
        }
    }

    /// This type and all its supertypes.
    pub fn lineage(self) -> EnumSet<NodeType> {
        let mut set = EnumSet::only(self);
        let mut cursor = self.parent();
        while let Some(t) = cursor {
            set.insert(t);
            cursor = t.parent();
        }
        set
    }

    pub fn is_a(self, ancestor: NodeType) -> bool {
        self.lineage().contains(ancestor)
    }

    pub fn is_link(self) -> bool {
        self.is_a(NodeType::Link)
    }

    pub fn is_abstract(self) -> bool {
        use NodeType::*;
        matches!(
            self,
            Node | Link | NamedNode | Organisation | Address | Association
        )
    }

    /// The permitted (source, sink) node types of a link type. A node qualifies when its
    /// lineage meets the set.
    pub fn endpoints(self) -> Option<(EnumSet<NodeType>, EnumSet<NodeType>)> {
        use NodeType::*;
        let named_or_assoc = NamedNode | Association;
        let ends = match self {
            InModel => (EnumSet::only(Node), EnumSet::only(Model)),
            HasCountry => (EnumSet::only(Model), EnumSet::only(Country)),
            HasArea => (EnumSet::only(Country), EnumSet::only(Area)),
            IsIn => (EnumSet::only(Node), Country | Area),
            BelongsTo => (EnumSet::only(Person), EnumSet::only(Family)),
            WorksAt => (EnumSet::only(Person), Organisation | Residence),
            LocatedAt => (EnumSet::only(Organisation), EnumSet::only(Organisation)),
            HasDepartment => (EnumSet::only(Company), EnumSet::only(Department)),
            ResidesAt => (EnumSet::only(NamedNode), EnumSet::only(Residence)),
            HasPostalAddress => (named_or_assoc, EnumSet::only(PostalAddress)),
            HasPhone => (
                named_or_assoc | Residence | ResidesAt,
                EnumSet::only(Telephone),
            ),
            HasEmail => (named_or_assoc | ResidesAt, EnumSet::only(Email)),
            HasWebPage => (named_or_assoc | ResidesAt, EnumSet::only(Uri)),
            With | Ex => (named_or_assoc, EnumSet::only(NamedNode)),
            KeyedWith => (named_or_assoc, EnumSet::only(Keyword)),
            HasComment => (EnumSet::only(Node), EnumSet::only(Comment)),
            HasContext => (
                EnumSet::only(Data),
                Association | IsIn | NamedNode,
            ),
            BornOn => (EnumSet::only(Person), EnumSet::only(Birthday)),
            _ => return None,
        };
        Some(ends)
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use NodeType::*;
        let name = match self {
            Uri => "URI",
            InModel => "In_model",
            HasCountry => "Has_country",
            HasArea => "Has_area",
            IsIn => "Is_in",
            BelongsTo => "Belongs_to",
            WorksAt => "Works_at",
            LocatedAt => "Located_at",
            HasDepartment => "Has_department",
            ResidesAt => "Resides_at",
            HasPostalAddress => "Has_postal_address",
            HasPhone => "Has_phone",
            HasEmail => "Has_email",
            HasWebPage => "Has_web_page",
            KeyedWith => "Keyed_with",
            HasComment => "Has_comment",
            HasContext => "Has_context",
            BornOn => "Born_on",
            other => return write!(f, "{other:?}"),
        };
        f.write_str(name)
    }
}

/// "T1/T2/..." naming of a type set, as used in lookup errors.
pub fn type_names(types: EnumSet<NodeType>) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneKind {
    Mobile,
    Fixed,
    Fax,
}

/// Whether a contact detail is for home or work use, or neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Context {
    #[default]
    None,
    Home,
    Work,
}

impl Context {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Context::None => None,
            Context::Home => Some("home"),
            Context::Work => Some("work"),
        }
    }
}

/// The payload of a node or link. Link variants carry the link's own attributes; the
/// endpoints live in [Ends].
#[derive(Debug, Clone)]
pub enum Entity {
    Model,
    Person(Person),
    Family(Family),
    Company(Organisation),
    Department(Organisation),
    Residence(Address),
    PostalAddress(Address),
    Telephone(Telephone),
    Email(Email),
    Uri(Uri),
    Comment(Comment),
    Keyword(Keyword),
    Data(Data),
    Country(Country),
    Area(Area),
    Birthday(Birthday),

    InModel {
        principal: bool,
    },
    HasCountry,
    HasArea,
    IsIn,
    BelongsTo {
        is_head: bool,
        sequence: Option<usize>,
    },
    WorksAt {
        position: Option<Multilang>,
        is_head: bool,
        sequence: Option<usize>,
    },
    LocatedAt {
        sequence: Option<usize>,
    },
    HasDepartment {
        is_head: bool,
    },
    ResidesAt,
    HasPostalAddress,
    HasPhone {
        kind: PhoneKind,
        context: Context,
        comment: Option<String>,
    },
    HasEmail {
        context: Context,
        comment: Option<String>,
    },
    HasWebPage {
        comment: Option<String>,
    },
    With {
        position: Option<Multilang>,
    },
    Ex {
        position: Option<Multilang>,
    },
    KeyedWith,
    HasComment,
    HasContext,
    BornOn {
        year: Option<i32>,
    },
}

impl Entity {
    pub fn node_type(&self) -> NodeType {
        match self {
            Entity::Model => NodeType::Model,
            Entity::Person(_) => NodeType::Person,
            Entity::Family(_) => NodeType::Family,
            Entity::Company(_) => NodeType::Company,
            Entity::Department(_) => NodeType::Department,
            Entity::Residence(_) => NodeType::Residence,
            Entity::PostalAddress(_) => NodeType::PostalAddress,
            Entity::Telephone(_) => NodeType::Telephone,
            Entity::Email(_) => NodeType::Email,
            Entity::Uri(_) => NodeType::Uri,
            Entity::Comment(_) => NodeType::Comment,
            Entity::Keyword(_) => NodeType::Keyword,
            Entity::Data(_) => NodeType::Data,
            Entity::Country(_) => NodeType::Country,
            Entity::Area(_) => NodeType::Area,
            Entity::Birthday(_) => NodeType::Birthday,
            Entity::InModel { .. } => NodeType::InModel,
            Entity::HasCountry => NodeType::HasCountry,
            Entity::HasArea => NodeType::HasArea,
            Entity::IsIn => NodeType::IsIn,
            Entity::BelongsTo { .. } => NodeType::BelongsTo,
            Entity::WorksAt { .. } => NodeType::WorksAt,
            Entity::LocatedAt { .. } => NodeType::LocatedAt,
            Entity::HasDepartment { .. } => NodeType::HasDepartment,
            Entity::ResidesAt => NodeType::ResidesAt,
            Entity::HasPostalAddress => NodeType::HasPostalAddress,
            Entity::HasPhone { .. } => NodeType::HasPhone,
            Entity::HasEmail { .. } => NodeType::HasEmail,
            Entity::HasWebPage { .. } => NodeType::HasWebPage,
            Entity::With { .. } => NodeType::With,
            Entity::Ex { .. } => NodeType::Ex,
            Entity::KeyedWith => NodeType::KeyedWith,
            Entity::HasComment => NodeType::HasComment,
            Entity::HasContext => NodeType::HasContext,
            Entity::BornOn { .. } => NodeType::BornOn,
        }
    }

    /// A named boolean attribute, for [crate::graph::predicate::test_attr].
    pub fn attr(&self, name: &str) -> Option<bool> {
        match (self, name) {
            (Entity::InModel { principal }, "principal") => Some(*principal),
            (Entity::BelongsTo { is_head, .. }, "is_head")
            | (Entity::WorksAt { is_head, .. }, "is_head")
            | (Entity::HasDepartment { is_head }, "is_head") => Some(*is_head),
            _ => None,
        }
    }

    pub fn sequence(&self) -> Option<usize> {
        match self {
            Entity::BelongsTo { sequence, .. }
            | Entity::WorksAt { sequence, .. }
            | Entity::LocatedAt { sequence } => *sequence,
            _ => None,
        }
    }

    pub fn position(&self) -> Option<&Multilang> {
        match self {
            Entity::WorksAt { position, .. }
            | Entity::With { position }
            | Entity::Ex { position } => position.as_ref(),
            _ => None,
        }
    }

    /// The free-text comment carried by a contact link.
    pub fn comment(&self) -> Option<&str> {
        match self {
            Entity::HasPhone { comment, .. }
            | Entity::HasEmail { comment, .. }
            | Entity::HasWebPage { comment } => comment.as_deref(),
            _ => None,
        }
    }

    pub fn as_organisation(&self) -> Option<&Organisation> {
        match self {
            Entity::Company(org) | Entity::Department(org) => Some(org),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Entity::Residence(ad) | Entity::PostalAddress(ad) => Some(ad),
            _ => None,
        }
    }
}

/// Edge weight of the underlying petgraph: a link `L` from `a` to `b` is stored as the
/// edges `a -Source-> L` and `L -Sink-> b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incidence {
    Source,
    Sink,
}

/// The endpoints of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ends {
    pub node1: NodeId,
    pub node2: NodeId,
    pub timestamp: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub entity: Entity,
    /// The directly assigned place, if any.
    pub place: Option<Place>,
    /// Present exactly when the element is a link.
    pub ends: Option<Ends>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn lineage_walks_to_node() {
        let lineage = NodeType::Company.lineage();
        assert!(lineage.contains(NodeType::Organisation));
        assert!(lineage.contains(NodeType::NamedNode));
        assert!(lineage.contains(NodeType::Node));
        assert!(!lineage.contains(NodeType::Link));
        assert!(NodeType::WorksAt.is_a(NodeType::Association));
        assert!(NodeType::HasPhone.is_link());
        assert!(!NodeType::Telephone.is_link());
    }

    #[test]
    fn display_uses_link_names() {
        assert_eq!(NodeType::WorksAt.to_string(), "Works_at");
        assert_eq!(NodeType::PostalAddress.to_string(), "PostalAddress");
        assert_eq!(
            type_names(NodeType::Organisation | NodeType::Residence),
            "Organisation/Residence"
        );
    }

    #[test]
    fn every_concrete_link_has_endpoints() {
        for t in EnumSet::<NodeType>::all() {
            assert_eq!(
                t.endpoints().is_some(),
                t.is_link() && !t.is_abstract(),
                "{t}"
            );
        }
    }
}
