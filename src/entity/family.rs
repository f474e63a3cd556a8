//! Families: people grouped in the input without a common organisation.

use crate::{
    entity::person::Person,
    graph::{
        predicate::{incoming, is_link, test_attr},
        Entity, Graph, NodeId, NodeType,
    },
    multilang::Multilang,
};

/// A family is named after its heads, the people joined with `+` delimiters. Its
/// contact details are shared by every member.
#[derive(Debug, Clone, Default)]
pub struct Family {
    pub aka: Vec<Multilang>,
}

impl Family {
    pub fn new(aka: Vec<Multilang>) -> Family {
        Family { aka }
    }
}

impl Graph {
    pub fn person(&self, id: NodeId) -> Option<&Person> {
        match self.entity(id) {
            Entity::Person(person) => Some(person),
            _ => None,
        }
    }

    pub fn family(&self, id: NodeId) -> Option<&Family> {
        match self.entity(id) {
            Entity::Family(family) => Some(family),
            _ => None,
        }
    }

    /// The heads of a family: those whose full names are known first, then in input
    /// order, then by name.
    pub fn family_heads(&self, family: NodeId) -> Vec<NodeId> {
        let mut heads: Vec<(bool, usize, Vec<String>, NodeId)> = self
            .links(
                family,
                incoming() & NodeType::BelongsTo & is_link(test_attr("is_head")),
            )
            .into_iter()
            .filter_map(|link| {
                let id = self.node1(link)?;
                let person = self.person(id)?;
                Some((
                    !person.full_name_known(),
                    self.entity(link).sequence().unwrap_or(0),
                    person.name.sortkey(),
                    id,
                ))
            })
            .collect();
        heads.sort();
        heads.into_iter().map(|(.., id)| id).collect()
    }

    /// Members of a family who are not heads, in link order.
    pub fn family_tails(&self, family: NodeId) -> Vec<NodeId> {
        self.nodes(
            family,
            incoming() & NodeType::BelongsTo & !is_link(test_attr("is_head")),
        )
    }

    /// The family's name formed from its heads, optionally starting with `first`. A
    /// surname shared by adjacent heads is written once, as in "John & Jane Smith", or
    /// "Smith, John & Jane" when `by_last_name`.
    pub fn family_name(&self, family: NodeId, first: Option<NodeId>, by_last_name: bool) -> String {
        let mut people: Vec<NodeId> = first.into_iter().collect();
        people.extend(
            self.family_heads(family)
                .into_iter()
                .filter(|id| Some(*id) != first),
        );
        let mut r: Vec<String> = Vec::new();
        let mut surname: Option<String> = None;
        let mut group_start = 0;
        let flush = |r: &mut Vec<String>, surname: &str, at: usize| {
            if by_last_name {
                r.insert(at, format!("{surname}, "));
            } else {
                r.push(format!(" {surname}"));
            }
        };
        for person in people.iter().filter_map(|id| self.person(*id)) {
            let mut hn = person.family_head_name();
            let mut tn = person.name.title_name();
            if let Some(t) = &tn {
                match hn.strip_suffix(&format!(" {t}")) {
                    Some(stripped) => hn = stripped.to_string(),
                    None => tn = None,
                }
            }
            let changed = surname != tn;
            if changed {
                if let Some(s) = &surname {
                    flush(&mut r, s, group_start);
                }
                surname = tn;
            }
            if !r.is_empty() {
                r.push(" & ".to_string());
            }
            if changed {
                group_start = r.len();
            }
            r.push(hn);
        }
        if let Some(s) = &surname {
            flush(&mut r, s, group_start);
        }
        r.concat()
    }

    /// Whether `text` names this family: either it splits on `&` into one part per head,
    /// each matching that head in order, or it matches an aka.
    pub fn family_matches(&self, family: NodeId, text: &str) -> bool {
        let heads = self.family_heads(family);
        let parts: Vec<&str> = text
            .split('&')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() == heads.len()
            && heads
                .iter()
                .zip(&parts)
                .all(|(head, part)| self.person(*head).is_some_and(|p| p.matches(part)))
        {
            return true;
        }
        self.family(family)
            .is_some_and(|f| f.aka.iter().any(|aka| aka.matches(text)))
    }
}
