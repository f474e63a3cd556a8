//! Plain text reports over a parsed model.
//!
//! Each report selects the registered named entries satisfying a predicate, lists them
//! in collating order, and renders each as an indented block of lines.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    config::SixxConfig,
    entity::Place,
    error::SixxError,
    graph::{
        predicate::{incoming, instance_p, is_other, is_principal, outgoing, NodePredicate},
        Context, Entity, Graph, NodeId, NodeType, PhoneKind,
    },
    model::Model,
    named::SortMode,
    sort::{cull_references, Itemiser, SortItem},
};

/// Settings shared by the reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub language: String,
    pub sort_mode: SortMode,
    pub horizon: usize,
    /// Phone numbers and addresses are written as seen from this place.
    pub home: Option<Place>,
}

impl ReportOptions {
    /// Options from a configuration, resolving its home place in `model`.
    pub fn from_config(config: &SixxConfig, model: &Model) -> Result<ReportOptions, SixxError> {
        let home = match &config.home {
            Some(name) => Some(model.lookup_place(name)?),
            None => None,
        };
        Ok(ReportOptions {
            language: config.language.clone(),
            sort_mode: config.sort_mode,
            horizon: config.horizon,
            home,
        })
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        let config = SixxConfig::default();
        ReportOptions {
            language: config.language,
            sort_mode: config.sort_mode,
            horizon: config.horizon,
            home: None,
        }
    }
}

/// Entries listed when no selection is given.
pub fn default_selection() -> NodePredicate {
    is_principal()
}

/// Indented output lines.
#[derive(Debug, Default)]
struct Tree {
    out: String,
    depth: usize,
}

impl Tree {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn gap(&mut self) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
    }

}

fn phone_label(kind: PhoneKind, context: Context) -> String {
    let kind = match kind {
        PhoneKind::Mobile => "mobile",
        PhoneKind::Fixed => "phone",
        PhoneKind::Fax => "fax",
    };
    match context {
        Context::None => kind.to_string(),
        Context::Home => format!("{kind} (home)"),
        Context::Work => format!("{kind} (work)"),
    }
}

fn with_comment(text: String, comment: &Option<String>) -> String {
    match comment {
        Some(comment) => format!("{text} {comment}"),
        None => text,
    }
}

struct Renderer<'m> {
    model: &'m Model,
    opts: &'m ReportOptions,
    tree: Tree,
}

impl<'m> Renderer<'m> {
    fn new(model: &'m Model, opts: &'m ReportOptions) -> Self {
        Renderer {
            model,
            opts,
            tree: Tree::default(),
        }
    }

    fn graph(&self) -> &'m Graph {
        &self.model.graph
    }

    fn name(&self, id: NodeId) -> String {
        self.graph().display_name(id, &self.opts.language)
    }

    fn heading(&self, id: NodeId) -> String {
        let graph = self.graph();
        let name = self.name(id);
        let mut heading = name.clone();
        if let Some(company) = graph.company(id).filter(|c| *c != id) {
            heading.push_str(", ");
            heading.push_str(&self.name(company));
        }
        let aka: Vec<String> = match graph.entity(id) {
            Entity::Person(person) => person.aka.iter().map(|m| m.to_string()).collect(),
            Entity::Family(family) => family.aka.iter().map(|m| m.to_string()).collect(),
            Entity::Company(org) | Entity::Department(org) => {
                org.aka.iter().map(|m| m.display_in(&self.opts.language).to_string()).collect()
            }
            _ => Vec::new(),
        };
        for other in aka.iter().filter(|a| **a != name) {
            heading.push_str(&format!(" ({other})"));
        }
        heading
    }

    fn position(&self, link: NodeId) -> String {
        self.graph()
            .entity(link)
            .position()
            .map(|p| format!(", {}", p.display_in(&self.opts.language)))
            .unwrap_or_default()
    }

    /// The phone numbers of a node or link.
    fn phones(&mut self, who: NodeId, qualifier: Option<&str>) {
        let graph = self.graph();
        for link in graph.links(who, outgoing() & NodeType::HasPhone) {
            let (Entity::HasPhone { kind, context, comment }, Some(tel)) =
                (graph.entity(link), graph.node2(link))
            else {
                continue;
            };
            let Entity::Telephone(tel) = graph.entity(tel) else {
                continue;
            };
            let number = with_comment(tel.relative(graph, self.opts.home), comment);
            let line = match qualifier {
                Some(q) => format!("{}: {number} ({q})", phone_label(*kind, *context)),
                None => format!("{}: {number}", phone_label(*kind, *context)),
            };
            self.tree.line(line);
        }
    }

    /// Contact details of a node or link, other than its associations.
    fn contacts(&mut self, who: NodeId) {
        let graph = self.graph();
        self.phones(who, None);
        for link in graph.links(who, outgoing()) {
            let Some(other) = graph.node2(link) else {
                continue;
            };
            let line = match (graph.entity(link), graph.entity(other)) {
                (Entity::HasEmail { context, comment }, Entity::Email(email)) => {
                    let label = match context {
                        Context::None => "email",
                        Context::Home => "email (home)",
                        Context::Work => "email (work)",
                    };
                    format!("{label}: {}", with_comment(email.address.clone(), comment))
                }
                (Entity::HasWebPage { comment }, Entity::Uri(uri)) => {
                    format!("www: {}", with_comment(uri.uri.clone(), comment))
                }
                (Entity::HasPostalAddress, Entity::PostalAddress(ad)) => {
                    format!("postal: {}", ad.relative(graph, self.opts.home))
                }
                (Entity::HasComment, Entity::Comment(comment)) => format!("-- {}", comment.text),
                (Entity::BornOn { year }, Entity::Birthday(birthday)) => {
                    format!("born: {}", birthday.format(*year))
                }
                _ => continue,
            };
            self.tree.line(line);
        }
        let keywords: Vec<String> = graph
            .nodes(who, outgoing() & NodeType::KeyedWith)
            .into_iter()
            .map(|kw| self.name(kw))
            .collect();
        if !keywords.is_empty() {
            self.tree.line(format!("key: {}", keywords.join(" ")));
        }
        self.data(who, None);
        for link in graph.links(who, outgoing() & NodeType::IsIn) {
            let place = graph.place(link).map(|p| graph.place_name(&p));
            self.data(link, place);
        }
    }

    fn data(&mut self, context: NodeId, place: Option<String>) {
        let graph = self.graph();
        for data in graph.nodes(context, incoming() & NodeType::HasContext) {
            if let Entity::Data(d) = graph.entity(data) {
                match &place {
                    Some(place) => self.tree.line(format!("{} = {} (in {place})", d.id, d.value)),
                    None => self.tree.line(format!("{} = {}", d.id, d.value)),
                }
            }
        }
    }

    /// The associations of an entry, each with its own contact details nested below.
    fn relations(&mut self, who: NodeId) {
        let graph = self.graph();
        for link in graph.links(who, outgoing()) {
            let Some(other) = graph.node2(link) else {
                continue;
            };
            let line = match graph.entity(link) {
                Entity::ResidesAt => match graph.entity(other) {
                    Entity::Residence(ad) => format!("home: {}", ad.relative(graph, self.opts.home)),
                    _ => continue,
                },
                Entity::WorksAt { .. } => format!("works at {}{}", self.heading(other), self.position(link)),
                Entity::LocatedAt { .. } => format!("located at {}", self.heading(other)),
                Entity::With { .. } => format!("with {}{}", self.heading(other), self.position(link)),
                Entity::Ex { .. } => format!("formerly with {}{}", self.heading(other), self.position(link)),
                Entity::BelongsTo { .. } => format!("member of {}", self.name(other)),
                Entity::HasDepartment { .. } => format!("department: {}", self.name(other)),
                _ => continue,
            };
            self.tree.line(line);
            self.tree.depth += 1;
            self.contacts(link);
            if graph.node_type(other) == NodeType::Residence {
                self.contacts(other);
            }
            self.tree.depth -= 1;
        }
        for link in graph.links(who, incoming()) {
            let Some(other) = graph.node1(link) else {
                continue;
            };
            let line = match graph.entity(link) {
                Entity::BelongsTo { is_head, .. } => {
                    format!("{}{}", self.name(other), if *is_head { "" } else { " (dependant)" })
                }
                Entity::WorksAt { .. } => format!("staff: {}{}", self.name(other), self.position(link)),
                _ => continue,
            };
            self.tree.line(line);
        }
    }

    fn entry(&mut self, id: NodeId) {
        self.tree.gap();
        self.tree.line(self.heading(id));
        self.tree.depth += 1;
        self.contacts(id);
        self.relations(id);
        self.tree.depth -= 1;
    }

    fn reference(&mut self, item: &SortItem) {
        self.tree.gap();
        self.tree.line(format!("{} -> see {}", item.key, item.canonical));
    }

    /// Phone numbers reached along a path from an entry, qualified by how.
    fn qualified_phones(&mut self, path: &[NodeId]) {
        let graph = self.graph();
        let Some(&last) = path.last() else {
            return;
        };
        let mut qualifier = Vec::new();
        for &node in path {
            match graph.entity(node) {
                Entity::ResidesAt => qualifier.push("home".to_string()),
                Entity::WorksAt { .. } => {
                    if let Some(org) = graph.node2(node) {
                        qualifier.push(format!("work, {}", self.heading(org)));
                    }
                }
                Entity::BelongsTo { .. } => {
                    if let Some(family) = graph.node2(node) {
                        qualifier.push(self.name(family));
                    }
                }
                _ => {}
            }
        }
        let qualifier = qualifier.join("; ");
        self.phones(last, (!qualifier.is_empty()).then_some(qualifier.as_str()));
    }

    fn phone_entry(&mut self, id: NodeId) {
        let graph = self.graph();
        self.tree.gap();
        self.tree.line(self.heading(id));
        self.tree.depth += 1;
        self.phones(id, None);
        let along = outgoing() & (NodeType::ResidesAt | NodeType::WorksAt | NodeType::BelongsTo);
        for path in graph.find_nodes(id, along, None, None) {
            self.qualified_phones(&path);
        }
        for link in graph.links(id, incoming() & (NodeType::WorksAt | NodeType::BelongsTo)) {
            let Some(person) = graph.node1(link) else {
                continue;
            };
            self.tree.line(format!("{}{}", self.name(person), self.position(link)));
            self.tree.depth += 1;
            self.phones(link, None);
            self.phones(person, None);
            self.tree.depth -= 1;
        }
        for dept in graph.nodes(id, outgoing() & NodeType::HasDepartment) {
            self.tree.line(self.name(dept));
            self.tree.depth += 1;
            self.phones(dept, None);
            self.tree.depth -= 1;
        }
        self.tree.depth -= 1;
    }
}

/// The itemiser of the named entries satisfying `select`.
fn itemise<'m>(model: &'m Model, select: &NodePredicate, opts: &ReportOptions) -> Itemiser<'m> {
    let mut itemiser = Itemiser::new(&model.graph, opts.sort_mode, opts.language.clone());
    itemiser.update(model.nodes(is_other(instance_p(NodeType::NamedNode) & select.clone())));
    itemiser
}

/// Every selected entry with all its details. Non-principal family members are listed
/// as references to their family.
pub fn dump(model: &Model, select: &NodePredicate, opts: &ReportOptions) -> Result<String, SixxError> {
    let itemiser = itemise(model, select, opts);
    let mut aliases = Vec::new();
    for family in itemiser.nodes().filter(|n| model.graph.node_type(*n) == NodeType::Family) {
        for member in model.graph.nodes(family, incoming() & NodeType::BelongsTo) {
            if !itemiser.contains(member) {
                aliases.push((member, family));
            }
        }
    }
    let mut items = itemiser.sorted(&aliases)?;
    cull_references(&mut items, opts.horizon);
    tracing::debug!("[Report] dump of {} entries, {} items", itemiser.len(), items.len());

    let mut renderer = Renderer::new(model, opts);
    for item in &items {
        match item.node {
            Some(node) if item.single => renderer.entry(node),
            Some(_) => renderer.reference(item),
            None => {}
        }
    }
    Ok(renderer.tree.out)
}

/// Phone numbers of the selected people, families and organisations. A family is left
/// out when one of its heads is listed.
pub fn phone(model: &Model, select: &NodePredicate, opts: &ReportOptions) -> Result<String, SixxError> {
    let mut itemiser = itemise(model, select, opts);
    let people: Vec<NodeId> = itemiser
        .nodes()
        .filter(|n| model.graph.node_type(*n) == NodeType::Person)
        .collect();
    for person in people {
        for link in model.graph.links(person, outgoing() & NodeType::BelongsTo) {
            let is_head = model.graph.entity(link).attr("is_head").unwrap_or(false);
            if let (true, Some(family)) = (is_head, model.graph.node2(link)) {
                itemiser.discard(family);
            }
        }
    }
    let mut renderer = Renderer::new(model, opts);
    for item in itemiser.sorted(&[])? {
        if let (true, Some(node)) = (item.single, item.node) {
            renderer.phone_entry(node);
        }
    }
    Ok(renderer.tree.out)
}

/// `Name <address>` lines for the email addresses of the selected entries, and of the
/// associations they have.
pub fn email(model: &Model, select: &NodePredicate, opts: &ReportOptions) -> Result<String, SixxError> {
    let graph = &model.graph;
    let itemiser = itemise(model, select, opts);
    let mut lines = Vec::new();
    for item in itemiser.sorted(&[])? {
        let (true, Some(node)) = (item.single, item.node) else {
            continue;
        };
        let name = match graph.entity(node) {
            Entity::Person(person) => person.email_address_name(),
            _ => graph.display_name(node, &opts.language),
        };
        let mut holders = vec![node];
        holders.extend(graph.links(node, outgoing() & (NodeType::WorksAt | NodeType::With)));
        for holder in holders {
            for address in graph.nodes(holder, outgoing() & NodeType::HasEmail) {
                if let Entity::Email(email) = graph.entity(address) {
                    lines.push(email.format(Some(&name)));
                }
            }
        }
    }
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

/// Counts of what a model holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub nodes: usize,
    pub links: usize,
    pub principal: usize,
    pub countries: Vec<String>,
    pub types: BTreeMap<String, usize>,
}

impl Stats {
    pub fn of(model: &Model) -> Stats {
        let graph = &model.graph;
        let mut stats = Stats {
            nodes: 0,
            links: 0,
            principal: model.nodes(is_other(instance_p(NodeType::NamedNode)) & is_other(is_principal())).len(),
            countries: model.countries().into_iter().map(|c| graph.display_name(c, &model.language)).collect(),
            types: BTreeMap::new(),
        };
        for (node_type, count) in model.counts() {
            if node_type.is_link() {
                stats.links += count;
            } else {
                stats.nodes += count;
            }
            stats.types.insert(node_type.to_string(), count);
        }
        stats
    }
}

/// The statistics of a model as pretty-printed JSON.
pub fn stats(model: &Model) -> Result<String, SixxError> {
    Ok(serde_json::to_string_pretty(&Stats::of(model))?)
}
