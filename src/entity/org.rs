use crate::{
    graph::{
        predicate::{incoming, instance_p},
        Entity, Graph, NodeId, NodeType,
    },
    multilang::Multilang,
};

/// A company or department: a named entity where people work or can be contacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organisation {
    /// Full legal name.
    pub name: Multilang,
    pub aka: Vec<Multilang>,
    /// The name that appeared first in the input.
    pub prefer: Option<Multilang>,
}

impl Organisation {
    pub fn new(name: Multilang, aka: Vec<Multilang>, prefer: Option<Multilang>) -> Organisation {
        Organisation { name, aka, prefer }
    }

    /// Preferred name first, then the legal name, then other names.
    pub fn names(&self, with_aka: bool) -> Vec<&Multilang> {
        let mut names: Vec<&Multilang> = self.prefer.iter().collect();
        names.push(&self.name);
        if with_aka {
            names.extend(self.aka.iter());
        }
        let mut unique: Vec<&Multilang> = Vec::new();
        for name in names {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        unique
    }

    pub fn matches(&self, text: &str) -> bool {
        self.names(true).iter().any(|name| name.matches(text))
    }
}

impl Graph {
    pub fn organisation(&self, id: NodeId) -> Option<&Organisation> {
        self.entity(id).as_organisation()
    }

    /// The company a department belongs to, through any intermediate departments.
    pub fn company(&self, dept: NodeId) -> Option<NodeId> {
        if matches!(self.entity(dept), Entity::Company(_)) {
            return Some(dept);
        }
        let select = instance_p(NodeType::Company);
        self.find_nodes(dept, incoming() & NodeType::HasDepartment, Some(&select), None)
            .into_iter()
            .next()
            .and_then(|path| path.last().copied())
    }

    /// Every organisation this one is a department of, nearest first.
    pub fn all_parents(&self, org: NodeId) -> Vec<NodeId> {
        let mut parents = Vec::new();
        for parent in self.nodes(org, incoming() & NodeType::HasDepartment) {
            parents.push(parent);
            parents.extend(self.all_parents(parent));
        }
        parents
    }
}
