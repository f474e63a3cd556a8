//! The contacts model: the graph, its root node, and the registry of entries that can be
//! found by name.

use enumset::EnumSet;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    entity::{
        address::{add_address, Address},
        person::Birthday,
        world::{Place, World},
        Keyword,
    },
    error::SixxError,
    graph::{
        predicate::{incoming, outgoing, SelectionPredicate},
        type_names, Entity, Graph, NodeId, NodeType,
    },
    input::Text,
};

/// The result of looking up a registered node by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(NodeId),
    Ambiguous(Vec<NodeId>),
    NotFound,
}

impl Lookup {
    /// Convert to a result, naming the looked-up types and text in the error.
    pub fn into_result(self, types: EnumSet<NodeType>, text: &str) -> Result<NodeId, SixxError> {
        match self {
            Lookup::Found(id) => Ok(id),
            Lookup::Ambiguous(_) => Err(SixxError::Ambiguous(format!(
                "ambiguous {} \"{text}\"",
                type_names(types)
            ))),
            Lookup::NotFound => Err(SixxError::NotFound(format!(
                "no such {} \"{text}\"",
                type_names(types)
            ))),
        }
    }
}

/// Value identity of the node types that are shared rather than repeated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RegKey {
    Keyword(String),
    Address(NodeType, Address),
    Birthday(Birthday),
}

impl RegKey {
    fn of(entity: &Entity) -> Option<RegKey> {
        match entity {
            Entity::Keyword(keyword) => Some(RegKey::Keyword(keyword.keyword.clone())),
            Entity::Residence(ad) | Entity::PostalAddress(ad) => {
                Some(RegKey::Address(entity.node_type(), ad.clone()))
            }
            Entity::Birthday(birthday) => Some(RegKey::Birthday(*birthday)),
            _ => None,
        }
    }
}

/// The graph of one parse run, with the registry of nodes that can be found by name.
///
/// Every registered node is linked to the root [Entity::Model] node by an `In_model`
/// link, whose `principal` flag says whether the node is a top-level report entry.
#[derive(Debug, Clone)]
pub struct Model {
    pub graph: Graph,
    pub root: NodeId,
    pub world: World,
    /// The language names are displayed and sorted in.
    pub language: String,
    registry: BTreeMap<NodeType, Vec<NodeId>>,
    shared: HashMap<RegKey, NodeId>,
    data_keys: HashSet<(NodeId, String)>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Model {
        let mut graph = Graph::new();
        let root = graph.0.add_node(crate::graph::Element {
            entity: Entity::Model,
            place: None,
            ends: None,
        });
        Model {
            graph,
            root: NodeId(root),
            world: World::new(),
            language: "en".to_string(),
            registry: BTreeMap::new(),
            shared: HashMap::new(),
            data_keys: HashSet::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Model {
        self.language = language.into();
        self
    }

    /// Register an existing node, linking it to the root.
    pub fn register(&mut self, id: NodeId, principal: bool) -> Result<NodeId, SixxError> {
        let node_type = self.graph.node_type(id);
        self.registry.entry(node_type).or_default().push(id);
        self.graph
            .add_link(id, self.root, Entity::InModel { principal }, None)?;
        tracing::debug!(
            "[Model] registered {node_type} {id} \"{}\"{}",
            self.graph.display_name(id, &self.language),
            if principal { "" } else { " (not principal)" }
        );
        Ok(id)
    }

    /// Create and register a node, or return the registered node equal to it for the
    /// types that are shared by value: keywords, addresses and birthdays.
    pub fn intern(
        &mut self,
        entity: Entity,
        place: Option<Place>,
        principal: bool,
    ) -> Result<NodeId, SixxError> {
        let key = RegKey::of(&entity);
        if let Some(id) = key.as_ref().and_then(|k| self.shared.get(k)) {
            return Ok(*id);
        }
        let id = match entity.node_type() {
            NodeType::Residence | NodeType::PostalAddress => add_address(&mut self.graph, entity)?,
            _ => self.graph.add_placed_node(entity, place)?,
        };
        if let Some(key) = key {
            self.shared.insert(key, id);
        }
        self.register(id, principal)
    }

    /// Link `dept` under `company`. A department has at most one parent, so a second
    /// parent is an input error at `at`.
    pub fn add_department(
        &mut self,
        company: NodeId,
        dept: NodeId,
        is_head: bool,
        at: &Text,
    ) -> Result<NodeId, SixxError> {
        if let Some(parent) = self.graph.node(dept, incoming() & NodeType::HasDepartment)? {
            return Err(SixxError::input(
                at,
                format!(
                    "{} is already a department of {}",
                    self.graph.display_name(dept, &self.language),
                    self.graph.display_name(parent, &self.language)
                ),
            ));
        }
        self.graph
            .add_link(company, dept, Entity::HasDepartment { is_head }, None)
    }

    /// Every registered node of a type in `types`, in type then registration order.
    pub fn registered(&self, types: EnumSet<NodeType>) -> Vec<NodeId> {
        self.registry
            .iter()
            .filter(|(t, _)| !t.lineage().is_disjoint(types))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Find the registered node of one of the given types that `text` refers to.
    pub fn find(&self, types: impl Into<EnumSet<NodeType>>, text: &str) -> Lookup {
        let types = types.into();
        let found: Vec<NodeId> = self
            .registered(types)
            .into_iter()
            .filter(|id| self.graph.matches(*id, text))
            .collect();
        match found.as_slice() {
            [] => Lookup::NotFound,
            [id] => Lookup::Found(*id),
            _ => Lookup::Ambiguous(found),
        }
    }

    /// The place named by a country or area.
    pub fn lookup_place(&self, name: &str) -> Result<Place, SixxError> {
        let types = NodeType::Country | NodeType::Area;
        let id = self.find(types, name).into_result(types, name)?;
        match self.graph.area(id) {
            Some(area) => Ok(Place::in_area(area.country, id)),
            None => Ok(Place::in_country(id)),
        }
    }

    /// The registered keyword with the given text.
    pub fn keyword(&self, text: &str) -> Option<NodeId> {
        self.shared.get(&RegKey::Keyword(text.to_string())).copied()
    }

    /// Register (or reuse) the keyword for each word of `text`.
    pub fn keywords(&mut self, text: &Text) -> Result<Vec<NodeId>, SixxError> {
        let mut ids = Vec::new();
        for word in text.split_whitespace() {
            let (keyword, _) = Keyword::parse(&word)?;
            ids.push(self.intern(Entity::Keyword(keyword), None, true)?);
        }
        Ok(ids)
    }

    /// Parse a `%country` definition, register the country and link it to the root.
    pub fn add_country(&mut self, text: &Text) -> Result<NodeId, SixxError> {
        let id = self.world.add_country(&mut self.graph, text)?;
        self.register(id, true)?;
        self.graph.add_link(self.root, id, Entity::HasCountry, None)?;
        Ok(id)
    }

    /// Parse an `%area` definition within `country` and register the area.
    pub fn add_area(&mut self, country: NodeId, text: &Text) -> Result<NodeId, SixxError> {
        let id = self.world.add_area(&mut self.graph, country, text)?;
        self.register(id, true)
    }

    /// Record a data id for a context node. Each id may be given once per context.
    pub fn claim_data_key(&mut self, context: NodeId, id: &str) -> bool {
        self.data_keys.insert((context, id.to_string()))
    }

    /// The registered nodes whose `In_model` links satisfy `sel`, in registration order.
    /// A node predicate tests the registered node itself.
    pub fn nodes(&self, sel: impl Into<SelectionPredicate>) -> Vec<NodeId> {
        self.graph.nodes(self.root, sel)
    }

    /// The countries in definition order.
    pub fn countries(&self) -> Vec<NodeId> {
        self.graph
            .nodes(self.root, outgoing() & NodeType::HasCountry)
    }

    /// Number of nodes of each concrete type, links included.
    pub fn counts(&self) -> BTreeMap<NodeType, usize> {
        let mut counts = BTreeMap::new();
        for id in self.graph.ids() {
            *counts.entry(self.graph.node_type(id)).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::{Family, Organisation},
        graph::predicate::{incoming, instance_p, is_other, is_principal},
        input::Loc,
        multilang::Multilang,
    };
    use test_log::test;

    fn t(s: &str) -> Text {
        Text::new(s, Some(Loc::new("m", 1, Some(1))))
    }

    fn company(model: &mut Model, name: &str, aka: &[&str]) -> NodeId {
        let org = Organisation::new(
            Multilang::plain(name),
            aka.iter().map(|a| Multilang::plain(*a)).collect(),
            None,
        );
        model.intern(Entity::Company(org), None, true).unwrap()
    }

    #[test]
    fn find_distinguishes_missing_and_ambiguous() {
        let mut model = Model::new();
        let acme = company(&mut model, "Acme", &["ACME Corp"]);
        company(&mut model, "Acme Holdings", &["Holdings"]);
        assert_eq!(model.find(NodeType::Company, "Acme"), Lookup::Found(acme));
        assert_eq!(model.find(NodeType::Organisation, "ACME Corp"), Lookup::Found(acme));
        assert_eq!(model.find(NodeType::Person, "Acme"), Lookup::NotFound);
        assert_eq!(model.find(NodeType::Company, "Nobody"), Lookup::NotFound);

        company(&mut model, "Acme", &[]);
        assert!(matches!(model.find(NodeType::Company, "Acme"), Lookup::Ambiguous(ids) if ids.len() == 2));
        let err = model
            .find(NodeType::Company, "Acme")
            .into_result(EnumSet::only(NodeType::Company), "Acme")
            .unwrap_err();
        assert_eq!(err, SixxError::Ambiguous("ambiguous Company \"Acme\"".to_string()));
        let err = Lookup::NotFound
            .into_result(NodeType::Company | NodeType::Department, "X")
            .unwrap_err();
        assert_eq!(err, SixxError::NotFound("no such Company/Department \"X\"".to_string()));
    }

    #[test]
    fn shared_nodes_are_interned() {
        let mut model = Model::new();
        let a = model.keywords(&t("friend work")).unwrap();
        let b = model.keywords(&t("friend")).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0], b[0]);
        assert_eq!(model.keyword("friend"), Some(a[0]));
        assert_eq!(model.keyword("enemy"), None);
        assert_eq!(model.find(NodeType::Keyword, "work"), Lookup::Found(a[1]));

        let jan1 = Birthday { month: 1, day: 1 };
        let x = model.intern(Entity::Birthday(jan1), None, true).unwrap();
        let y = model.intern(Entity::Birthday(jan1), None, true).unwrap();
        assert_eq!(x, y);
        let fam1 = model.intern(Entity::Family(Family::default()), None, true).unwrap();
        let fam2 = model.intern(Entity::Family(Family::default()), None, true).unwrap();
        assert_ne!(fam1, fam2);
    }

    #[test]
    fn places_and_principal_nodes() {
        let mut model = Model::new();
        let au = model
            .add_country(&t("AU lang=en cc=61 ap=0 \"Australia\""))
            .unwrap();
        let sa = model.add_area(au, &t("ac=8 \"South Australia\" / \"SA\"")).unwrap();
        assert_eq!(model.countries(), vec![au]);
        assert_eq!(model.lookup_place("australia").unwrap(), Place::in_country(au));
        assert_eq!(model.lookup_place("SA").unwrap(), Place::in_area(au, sa));
        assert!(matches!(model.lookup_place("Atlantis"), Err(SixxError::NotFound(_))));

        let acme = company(&mut model, "Acme", &[]);
        let family = Entity::Family(Family::default());
        let hidden = model.intern(family, None, false).unwrap();
        let principal = model.nodes(is_other(instance_p(NodeType::NamedNode)) & is_principal());
        assert_eq!(principal, vec![acme]);
        let named = model.nodes(instance_p(NodeType::NamedNode));
        assert_eq!(named, vec![acme, hidden]);
        assert_eq!(model.counts().get(&NodeType::InModel), Some(&4));
    }

    #[test]
    fn department_has_one_parent() {
        let mut model = Model::new();
        let acme = company(&mut model, "Acme", &[]);
        let globex = company(&mut model, "Globex", &[]);
        let org = Organisation::new(Multilang::plain("Sales"), vec![], None);
        let sales = model.intern(Entity::Department(org), None, true).unwrap();

        let link = model.add_department(acme, sales, true, &t("Sales")).unwrap();
        assert_eq!(model.graph.node1(link), Some(acme));
        let err = model
            .add_department(globex, sales, false, &t("Sales"))
            .unwrap_err();
        assert_eq!(err.message(), "Sales is already a department of Acme");
        assert_eq!(err.loc().map(|l| l.line), Some(1));
        assert_eq!(model.graph.links(sales, incoming()), vec![link]);
    }
}
