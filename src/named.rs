//! Names and places of the named entities: people, families and organisations.
//!
//! A node's place is derived from its links when it has none of its own. Each kind of
//! named entity tries a fixed list of link kinds in order, and the first kind whose links
//! agree on a single place decides (see [Graph::derive_only_place]).

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::{
    entity::world::Place,
    graph::{
        predicate::{incoming, is_link, outgoing, LinkPredicate, SelectionPredicate},
        Entity, Graph, NodeId, NodeType, PhoneKind,
    },
    multilang::Multilang,
    text::{text_match_key, uniq, SortStr},
};

/// The order in which entries are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Every name an entry has, first name and last name forms alike.
    #[default]
    AllNames,
    FirstName,
    LastName,
}

/// A name of a named entity: either a person's name form, which may collate on only part
/// of its text, or a name in one or more languages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    Sort(SortStr),
    Multi(Multilang),
}

impl Name {
    /// Whether the search key `itext` occurs in this name.
    pub fn imatches(&self, itext: &str) -> bool {
        match self {
            Name::Sort(s) => text_match_key(s.as_str()).contains(itext),
            Name::Multi(m) => m.imatches(itext),
        }
    }

    /// The forms of the name, the given language first.
    pub fn texts(&self, lang: &str) -> Vec<SortStr> {
        match self {
            Name::Sort(s) => vec![s.clone()],
            Name::Multi(m) => m.texts(lang).into_iter().map(|t| SortStr::new(t.as_str())).collect(),
        }
    }

    pub fn display_in(&self, lang: &str) -> String {
        match self {
            Name::Sort(s) => s.to_string(),
            Name::Multi(m) => m.display_in(lang).to_string(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Sort(s) => write!(f, "{s}"),
            Name::Multi(m) => write!(f, "{m}"),
        }
    }
}

impl From<SortStr> for Name {
    fn from(s: SortStr) -> Name {
        Name::Sort(s)
    }
}

impl From<Multilang> for Name {
    fn from(m: Multilang) -> Name {
        Name::Multi(m)
    }
}

/// Outgoing fixed and fax telephone links. Mobile numbers carry a country but say
/// nothing reliable about area, so they never place anything.
fn fixed_phones() -> SelectionPredicate {
    outgoing()
        & NodeType::HasPhone
        & is_link(LinkPredicate::new(|g, l| {
            !matches!(g.entity(l), Entity::HasPhone { kind: PhoneKind::Mobile, .. })
        }))
}

fn expand(names: Vec<Name>, lang: &str) -> Vec<SortStr> {
    uniq(names.iter().flat_map(|name| name.texts(lang)))
}

impl Graph {
    /// The place a node has of its own: its directly assigned place, or for addresses and
    /// telephone numbers, the place they are in.
    pub fn intrinsic_place(&self, id: NodeId) -> Option<Place> {
        self.place(id).or_else(|| match self.entity(id) {
            Entity::Residence(ad) | Entity::PostalAddress(ad) => Some(ad.place),
            Entity::Telephone(tel) => Some(tel.place),
            _ => None,
        })
    }

    /// The single place a node or link pertains to, if it can be determined.
    pub fn only_place(&self, id: NodeId) -> Option<Place> {
        let out = |t: NodeType| outgoing() & t;
        match self.entity(id) {
            Entity::Company(_) | Entity::Department(_) => self.place(id).or_else(|| {
                self.derive_only_place(
                    id,
                    &[
                        out(NodeType::ResidesAt),
                        out(NodeType::HasPostalAddress),
                        fixed_phones(),
                        incoming() & NodeType::HasDepartment,
                    ],
                )
            }),
            Entity::Person(_) => self.derive_only_place(
                id,
                &[
                    out(NodeType::ResidesAt),
                    out(NodeType::HasPostalAddress),
                    out(NodeType::BelongsTo),
                    fixed_phones(),
                ],
            ),
            Entity::Family(_) => self.derive_only_place(
                id,
                &[
                    out(NodeType::ResidesAt),
                    out(NodeType::HasPostalAddress),
                    fixed_phones(),
                ],
            ),
            // A residence of unknown place can still be placed by the phone numbers of
            // the people living there.
            Entity::ResidesAt => self
                .node2(id)
                .and_then(|res| self.only_place(res))
                .or_else(|| self.derive_only_place(id, &[fixed_phones()])),
            Entity::HasPostalAddress | Entity::BelongsTo { .. } | Entity::HasPhone { .. } => {
                if matches!(self.entity(id), Entity::HasPhone { kind: PhoneKind::Mobile, .. }) {
                    return None;
                }
                self.node2(id).and_then(|n| self.only_place(n))
            }
            Entity::HasDepartment { .. } => self.node1(id).and_then(|co| self.only_place(co)),
            _ => self.intrinsic_place(id),
        }
    }

    /// Every place a node pertains to through its own place and those of the nodes and
    /// links reachable along its place-bearing links.
    pub fn all_places(&self, id: NodeId) -> Vec<Place> {
        let traverse: Option<SelectionPredicate> = match self.node_type(id) {
            NodeType::Company | NodeType::Department => Some(
                (outgoing() & NodeType::ResidesAt)
                    | (outgoing() & NodeType::HasPostalAddress)
                    | (outgoing() & NodeType::HasDepartment)
                    | (outgoing() & NodeType::HasPhone),
            ),
            NodeType::Person => Some(
                (outgoing() & NodeType::ResidesAt)
                    | (outgoing() & NodeType::WorksAt)
                    | (incoming() & NodeType::HasDepartment)
                    | (outgoing() & NodeType::BelongsTo)
                    | (outgoing() & NodeType::HasPostalAddress)
                    | (outgoing() & NodeType::HasPhone),
            ),
            NodeType::Family => Some(
                (outgoing() & NodeType::ResidesAt)
                    | (outgoing() & NodeType::HasPostalAddress)
                    | (incoming() & NodeType::BelongsTo)
                    | (outgoing() & NodeType::HasPhone),
            ),
            _ => None,
        };
        let mut places: Vec<Place> = self.intrinsic_place(id).into_iter().collect();
        if let Some(traverse) = traverse {
            places.extend(
                self.find_nodes(id, traverse, None, None)
                    .iter()
                    .filter_map(|path| path.last())
                    .filter_map(|n| self.intrinsic_place(*n)),
            );
        }
        uniq(places)
    }

    /// The names of a named entity, principal name first.
    pub fn names(&self, id: NodeId, with_aka: bool) -> Vec<Name> {
        let mut names: Vec<Name> = Vec::new();
        let aka: &[Multilang] = match self.entity(id) {
            Entity::Person(person) => {
                names.extend(person.name.informal_index_name().map(Name::Sort));
                names.push(Name::Sort(person.name.complete_name()));
                &person.aka
            }
            Entity::Family(family) => {
                names.push(Name::Sort(SortStr::new(self.family_name(id, None, false))));
                &family.aka
            }
            Entity::Company(org) | Entity::Department(org) => {
                return uniq(org.names(with_aka).into_iter().cloned().map(Name::Multi));
            }
            _ => &[],
        };
        if with_aka {
            names.extend(aka.iter().cloned().map(Name::Multi));
        }
        uniq(names)
    }

    /// Every key a named entity may be listed under in the given order, with names in
    /// several languages expanded into each of them.
    pub fn sort_keys(&self, id: NodeId, mode: SortMode, lang: &str) -> Vec<SortStr> {
        let mut keys: Vec<Name> = Vec::new();
        let aka: &[Multilang] = match self.entity(id) {
            Entity::Person(person) => {
                let name = &person.name;
                let first = match mode {
                    SortMode::LastName => name.collation_name(),
                    _ => name.informal_index_name(),
                };
                let yielded = first.is_some();
                keys.extend(first.map(Name::Sort));
                if mode == SortMode::AllNames || !yielded {
                    keys.push(Name::Sort(name.formal_index_name()));
                }
                if mode == SortMode::AllNames {
                    keys.extend(name.collation_name().map(Name::Sort));
                }
                &person.aka
            }
            Entity::Family(family) => {
                let heads = self.family_heads(id);
                for head in &heads {
                    keys.push(Name::Sort(SortStr::new(self.family_name(
                        id,
                        Some(*head),
                        mode == SortMode::LastName,
                    ))));
                }
                if mode == SortMode::AllNames {
                    let mut surnames: Vec<String> = Vec::new();
                    let mut given: BTreeMap<String, Vec<String>> = BTreeMap::new();
                    for person in heads.iter().filter_map(|h| self.person(*h)) {
                        let Some(cn) = person.name.collation_name() else {
                            continue;
                        };
                        let Some((surname, gn)) = cn.as_str().split_once(", ") else {
                            continue;
                        };
                        if !given.contains_key(surname) {
                            surnames.push(surname.to_string());
                        }
                        given.entry(surname.to_string()).or_default().push(gn.to_string());
                    }
                    for surname in surnames {
                        let gns = given.get(&surname).map(|g| g.join(" & ")).unwrap_or_default();
                        keys.push(Name::Sort(SortStr::new(format!("{surname}, {gns}"))));
                    }
                }
                &family.aka
            }
            Entity::Company(_) | Entity::Department(_) => {
                return expand(self.names(id, true), lang);
            }
            _ => &[],
        };
        keys.extend(aka.iter().cloned().map(Name::Multi));
        expand(keys, lang)
    }

    /// Whether `text` refers to the node, as used to resolve references in the input.
    pub fn matches(&self, id: NodeId, text: &str) -> bool {
        match self.entity(id) {
            Entity::Person(person) => person.matches(text),
            Entity::Family(_) => self.family_matches(id, text),
            Entity::Company(org) | Entity::Department(org) => org.matches(text),
            Entity::Residence(ad) | Entity::PostalAddress(ad) => ad.matches(text),
            Entity::Country(country) => country.matches(text),
            Entity::Area(area) => area.matches(text),
            Entity::Keyword(keyword) => keyword.keyword == text,
            _ => false,
        }
    }

    /// The name to show for a node in a listing.
    pub fn display_name(&self, id: NodeId, lang: &str) -> String {
        match self.entity(id) {
            Entity::Person(person) => person.name.complete_name().to_string(),
            Entity::Family(_) => self.family_name(id, None, false),
            Entity::Company(org) | Entity::Department(org) => org
                .names(false)
                .first()
                .map(|name| name.display_in(lang).to_string())
                .unwrap_or_default(),
            Entity::Residence(ad) | Entity::PostalAddress(ad) => ad.as_string(self, false),
            Entity::Country(country) => country.display_name(),
            Entity::Area(area) => area.display_name(),
            Entity::Keyword(keyword) => keyword.keyword.clone(),
            other => other.node_type().to_string(),
        }
    }

    /// The named-entity view of a node, if it is one.
    pub fn named(&self, id: NodeId) -> Option<Named<'_>> {
        self.is_a(id, NodeType::NamedNode)
            .then_some(Named { graph: self, id })
    }
}

/// A person, family or organisation, seen through the operations common to all three.
#[derive(Clone, Copy)]
pub struct Named<'g> {
    graph: &'g Graph,
    id: NodeId,
}

impl<'g> Named<'g> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn names(&self, with_aka: bool) -> Vec<Name> {
        self.graph.names(self.id, with_aka)
    }

    pub fn sort_keys(&self, mode: SortMode, lang: &str) -> Vec<SortStr> {
        self.graph.sort_keys(self.id, mode, lang)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.graph.matches(self.id, text)
    }

    pub fn only_place(&self) -> Option<Place> {
        self.graph.only_place(self.id)
    }

    pub fn all_places(&self) -> Vec<Place> {
        self.graph.all_places(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::{
            person::{NameFields, Person, PersonName},
            telephone::Telephone,
            world::World,
            Address, Family, Organisation,
        },
        graph::Context,
        input::{Loc, Text},
    };
    use test_log::test;

    fn t(s: &str) -> Text {
        Text::new(s, Some(Loc::new("n", 1, Some(1))))
    }

    fn person(graph: &mut Graph, pairs: &[(&str, &str)]) -> NodeId {
        let mut fields = NameFields::default();
        for (key, value) in pairs {
            fields.set(key, Text::plain(*value));
        }
        let name = PersonName::from_fields(&fields).unwrap();
        graph
            .add_node(Entity::Person(Person::new(name, Vec::new())))
            .unwrap()
    }

    struct Places {
        graph: Graph,
        au: NodeId,
        sa: NodeId,
        nsw: NodeId,
        world: World,
    }

    fn places() -> Places {
        let mut graph = Graph::new();
        let mut world = World::new();
        let au = world
            .add_country(&mut graph, &t("AU lang=en cc=61 ap=0 \"Australia\""))
            .unwrap();
        let sa = world.add_area(&mut graph, au, &t("ac=8 \"SA\"")).unwrap();
        let nsw = world.add_area(&mut graph, au, &t("ac=2 \"NSW\"")).unwrap();
        Places {
            graph,
            au,
            sa,
            nsw,
            world,
        }
    }

    impl Places {
        fn phone(&mut self, who: NodeId, number: &str, kind: PhoneKind) {
            let au = Place::in_country(self.au);
            let (tel, _) =
                Telephone::parse(&t(number), &self.world, &self.graph, None, Some(au)).unwrap();
            let place = tel.place;
            let id = self
                .graph
                .add_placed_node(Entity::Telephone(tel), Some(place))
                .unwrap();
            self.graph
                .add_link(
                    who,
                    id,
                    Entity::HasPhone {
                        kind,
                        context: Context::None,
                        comment: None,
                    },
                    None,
                )
                .unwrap();
        }

        fn residence(&mut self, who: NodeId, text: &str) {
            let au = Place::in_country(self.au);
            let ad = Address::parse(&t(text), &self.world, &self.graph, None, Some(au)).unwrap();
            let res = crate::entity::add_address(&mut self.graph, Entity::Residence(ad)).unwrap();
            self.graph.add_link(who, res, Entity::ResidesAt, None).unwrap();
        }
    }

    #[test]
    fn residence_beats_phone() {
        let mut p = places();
        let jane = person(&mut p.graph, &[("fn", "Jane"), ("ln", "Smith")]);
        p.phone(jane, "02 9123-4567", PhoneKind::Fixed);
        p.phone(jane, "08 8123-4567", PhoneKind::Fixed);
        assert_eq!(p.graph.only_place(jane), None);
        p.residence(jane, "50 Clifton St, Maylands SA 5069");
        assert_eq!(p.graph.only_place(jane), Some(Place::in_area(p.au, p.sa)));
    }

    #[test]
    fn mobiles_do_not_place() {
        let mut p = places();
        let jane = person(&mut p.graph, &[("fn", "Jane"), ("ln", "Smith")]);
        p.phone(jane, "0411 123-456", PhoneKind::Mobile);
        assert_eq!(p.graph.only_place(jane), None);
        p.phone(jane, "02 9123-4567", PhoneKind::Fixed);
        assert_eq!(p.graph.only_place(jane), Some(Place::in_area(p.au, p.nsw)));
        let all = p.graph.all_places(jane);
        assert!(all.contains(&Place::in_area(p.au, p.nsw)));
        assert!(all.contains(&Place::in_country(p.au)));
    }

    #[test]
    fn department_inherits_company_place() {
        let mut p = places();
        let co = p
            .graph
            .add_placed_node(
                Entity::Company(Organisation::new(Multilang::plain("Acme"), vec![], None)),
                Some(Place::in_area(p.au, p.sa)),
            )
            .unwrap();
        let de = p
            .graph
            .add_node(Entity::Department(Organisation::new(
                Multilang::plain("Sales"),
                vec![],
                None,
            )))
            .unwrap();
        p.graph
            .add_link(co, de, Entity::HasDepartment { is_head: true }, None)
            .unwrap();
        assert_eq!(p.graph.only_place(de), Some(Place::in_area(p.au, p.sa)));
        assert_eq!(p.graph.company(de), Some(co));
        assert!(p.graph.matches(de, "Sales"));
        assert!(p.graph.named(de).is_some());
    }

    #[test]
    fn family_names_and_keys() {
        let mut graph = Graph::new();
        let john = person(&mut graph, &[("fn", "John"), ("ln", "Smith")]);
        let jane = person(&mut graph, &[("fn", "Jane"), ("ln", "Smith")]);
        let kid = person(&mut graph, &[("fn", "Kid"), ("ln", "Smith")]);
        let fam = graph.add_node(Entity::Family(Family::default())).unwrap();
        for (seq, (who, head)) in [(john, true), (jane, true), (kid, false)].into_iter().enumerate() {
            graph
                .add_link(
                    who,
                    fam,
                    Entity::BelongsTo {
                        is_head: head,
                        sequence: Some(seq + 1),
                    },
                    None,
                )
                .unwrap();
        }
        assert_eq!(graph.family_heads(fam), vec![john, jane]);
        assert_eq!(graph.family_tails(fam), vec![kid]);
        assert_eq!(graph.family_name(fam, None, false), "John & Jane Smith");
        assert_eq!(graph.family_name(fam, Some(jane), false), "Jane & John Smith");
        assert_eq!(graph.family_name(fam, None, true), "Smith, John & Jane");

        let keys: Vec<String> = graph
            .sort_keys(fam, SortMode::AllNames, "en")
            .into_iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(
            keys,
            vec!["John & Jane Smith", "Jane & John Smith", "Smith, John & Jane"]
        );
        assert!(graph.matches(fam, "John & Jane"));
        assert!(graph.matches(fam, "John Smith & Jane Smith"));
        assert!(!graph.matches(fam, "Jane & John"));
        assert!(!graph.matches(fam, "John"));
    }

    #[test]
    fn person_sort_keys_by_mode() {
        let mut graph = Graph::new();
        let zack = person(
            &mut graph,
            &[("fn", "Zacharias"), ("fn-", "Zack"), ("ln", "Smith")],
        );
        let keys = |mode| -> Vec<String> {
            graph
                .sort_keys(zack, mode, "en")
                .into_iter()
                .map(|k| k.to_string())
                .collect()
        };
        assert_eq!(
            keys(SortMode::AllNames),
            vec!["Zack Smith", "Zacharias Smith", "Smith, Zacharias"]
        );
        assert_eq!(keys(SortMode::FirstName), vec!["Zack Smith"]);
        assert_eq!(keys(SortMode::LastName), vec!["Smith, Zacharias"]);
        let names: Vec<String> = graph.names(zack, true).iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["Zack Smith", "Zacharias Smith"]);
    }
}
