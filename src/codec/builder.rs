//! Building graph entries from the parts of a data block.
//!
//! A data block may refer by name to entries defined further down the input. When a
//! lookup finds nothing, the block run stops with [Interrupt::Suspend] and the block is
//! parked. Each retry runs the block again from the top. A [Journal] records every node
//! and link the earlier runs created and every reference they resolved, so a retry
//! replays those results instead of creating anything twice, and continues from the
//! lookup that stopped it.
//!
//! Every graph mutation goes through [BlockBuilder::produce] and every lookup through
//! [BlockBuilder::find], in the same order on every run. Values read from the block are
//! recorded in a [DatasetMemo] so that lines no handler consumed are reported.

use chrono::NaiveDate;
use enumset::EnumSet;
use std::collections::HashMap;

use crate::{
    codec::{
        dataset::DatasetMemo,
        diagnostic::{Interrupt, UnresolvedReference},
        parse::Part,
    },
    date::PartialDate,
    entity::{
        add_address, add_data,
        person::{NAME_KEYS, SINGLE_NAME_KEY},
        Address, Birthday, Comment, Data, DataFactory, Email, Family, Keyword, NameFields,
        Organisation, Person, PersonName, Place, Telephone, Uri,
    },
    error::SixxError,
    graph::{
        predicate::{outgoing, to_node},
        type_names, Context, Entity, NodeId, NodeType, PhoneKind,
    },
    input::{Located, Text},
    model::{Lookup, Model},
    multilang::Multilang,
};

pub type BuildResult<T> = Result<T, Interrupt>;

/// Settings made by `%default` controls, copied into each data block when it is first
/// parsed so that later controls do not affect a parked block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    /// The place assumed for telephone numbers and addresses that do not name one.
    pub place: Option<Place>,
    /// Keywords given to every entry.
    pub keywords: Vec<NodeId>,
}

/// What the earlier runs of one data block produced and resolved.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    produced: Vec<NodeId>,
    cursor: usize,
    finds: Vec<NodeId>,
    find_cursor: usize,
    woken: bool,
    attempted: bool,
}

impl Journal {
    /// Prepare for another run from the top of the block.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.find_cursor = 0;
        self.attempted = false;
    }

    /// Allow the next run to attempt one new lookup. A block that has never been woken
    /// parks at its first lookup, so that every block before it gets to define its
    /// entries first.
    pub fn wake(&mut self) {
        self.woken = true;
    }

    /// Number of references resolved so far.
    pub fn resolved(&self) -> usize {
        self.finds.len()
    }

    /// Number of nodes and links created so far.
    pub fn produced(&self) -> usize {
        self.produced.len()
    }
}

/// Split a `data` value or `%data` declaration into its id and the value after the
/// first `=`, if there is one.
pub fn split_data(text: &Text) -> (String, Option<String>) {
    match text.split_once('=') {
        Some((id, value)) => (
            id.trim_end().to_string(),
            Some(value.trim_start().to_string()),
        ),
        None => (text.trim_end().to_string(), None),
    }
}

fn parse_update(data: &DatasetMemo) -> Result<Option<NaiveDate>, SixxError> {
    match data.optvalue("upd")? {
        Some(text) => Ok(Some(PartialDate::parse(text)?.as_date(text)?)),
        None => Ok(None),
    }
}

fn akas(data: &DatasetMemo) -> Result<Vec<Multilang>, SixxError> {
    data.mgetvalue("aka")?
        .into_iter()
        .map(Multilang::optparse)
        .collect()
}

/// The name that appears first in the input.
fn preferred(name: &Multilang, aka: &[Multilang]) -> Multilang {
    std::iter::once(name)
        .chain(aka)
        .min_by_key(|m| m.loc())
        .unwrap_or(name)
        .clone()
}

/// A part or sub-dataset of a data block, with the context its values are read in.
#[derive(Debug, Clone)]
struct Section<'d> {
    data: DatasetMemo<'d>,
    /// For parts, whether the delimiter makes its person a head (anything but `-`).
    is_head: Option<bool>,
    /// Position among the member parts, counting from 1.
    sequence: Option<usize>,
    place: Option<Place>,
    updated: Option<NaiveDate>,
    defaults: Defaults,
    /// The sub-datasets of `in` lines.
    ins: Vec<Section<'d>>,
}

impl<'d> Section<'d> {
    fn child(
        &self,
        data: DatasetMemo<'d>,
        place: Option<Place>,
        updated: Option<NaiveDate>,
    ) -> Section<'d> {
        Section {
            data,
            is_head: None,
            sequence: None,
            place,
            updated,
            defaults: self.defaults.clone(),
            ins: Vec::new(),
        }
    }
}

/// The kind of contact detail a field holds, and how it is linked.
#[derive(Debug, Clone, Copy)]
enum Contact {
    Phone(PhoneKind, Context),
    Postal,
    Email(Context),
    WebPage,
    Comment,
}

const MOBILE: Contact = Contact::Phone(PhoneKind::Mobile, Context::None);
const FIXED: Contact = Contact::Phone(PhoneKind::Fixed, Context::None);
const FAX: Contact = Contact::Phone(PhoneKind::Fax, Context::None);
const MOBILE_HOME: Contact = Contact::Phone(PhoneKind::Mobile, Context::Home);
const FIXED_HOME: Contact = Contact::Phone(PhoneKind::Fixed, Context::Home);
const FAX_HOME: Contact = Contact::Phone(PhoneKind::Fax, Context::Home);
const MOBILE_WORK: Contact = Contact::Phone(PhoneKind::Mobile, Context::Work);
const FIXED_WORK: Contact = Contact::Phone(PhoneKind::Fixed, Context::Work);
const FAX_WORK: Contact = Contact::Phone(PhoneKind::Fax, Context::Work);

#[derive(Debug, Clone, Copy)]
enum Assoc {
    WorksAt,
    With,
    Ex,
}

/// Which contact details the sub-dataset of an association line may give.
#[derive(Debug, Clone, Copy)]
enum AssocContacts {
    General,
    Work,
    Nothing,
}

/// One run of one data block against the model.
pub struct BlockBuilder<'a> {
    model: &'a mut Model,
    factories: &'a HashMap<String, DataFactory>,
    journal: &'a mut Journal,
    no_suspend: bool,
}

impl<'a> BlockBuilder<'a> {
    /// `factories` maps data ids to the way their context is chosen. With `no_suspend`,
    /// a lookup that finds nothing is an error instead of a reason to park the block.
    pub fn new(
        model: &'a mut Model,
        factories: &'a HashMap<String, DataFactory>,
        journal: &'a mut Journal,
        no_suspend: bool,
    ) -> BlockBuilder<'a> {
        BlockBuilder {
            model,
            factories,
            journal,
            no_suspend,
        }
    }

    /// Create something in the model, unless an earlier run already did.
    fn produce<F>(&mut self, f: F) -> BuildResult<NodeId>
    where
        F: FnOnce(&mut Model) -> Result<NodeId, SixxError>,
    {
        if let Some(id) = self.journal.produced.get(self.journal.cursor).copied() {
            self.journal.cursor += 1;
            return Ok(id);
        }
        let id = f(self.model)?;
        self.journal.produced.push(id);
        self.journal.cursor += 1;
        Ok(id)
    }

    /// Resolve a reference by name. At most one new lookup is attempted per run.
    fn find(&mut self, types: impl Into<EnumSet<NodeType>>, text: &Text) -> BuildResult<NodeId> {
        let types = types.into();
        if let Some(id) = self.journal.finds.get(self.journal.find_cursor).copied() {
            self.journal.find_cursor += 1;
            return Ok(id);
        }
        let unresolved = UnresolvedReference::new(types, text);
        if !self.journal.woken || self.journal.attempted {
            return Err(Interrupt::Suspend(unresolved));
        }
        self.journal.attempted = true;
        match self.model.find(types, text) {
            Lookup::Found(id) => {
                tracing::trace!("[Builder] resolved {unresolved} to {id}");
                self.journal.finds.push(id);
                self.journal.find_cursor += 1;
                Ok(id)
            }
            Lookup::Ambiguous(_) => Err(SixxError::input(
                text,
                format!("ambiguous {} \"{text}\"", type_names(types)),
            )
            .into()),
            Lookup::NotFound if self.no_suspend => Err(unresolved.to_error().into()),
            Lookup::NotFound => Err(Interrupt::Suspend(unresolved)),
        }
    }

    /// Parse the `upd` and `in` lines of a part and its `in` sub-datasets.
    fn prepare<'d>(
        &self,
        data: DatasetMemo<'d>,
        is_head: Option<bool>,
        defaults: &Defaults,
        default_updated: Option<NaiveDate>,
    ) -> Result<Section<'d>, SixxError> {
        let updated = parse_update(&data)?.or(default_updated);
        let mut sec = Section {
            data,
            is_head,
            sequence: None,
            place: None,
            updated,
            defaults: defaults.clone(),
            ins: Vec::new(),
        };
        let mut found_in = false;
        for (value, sub) in sec.data.mget("in") {
            let place = self.model.world.parse_place(&self.model.graph, value)?;
            match sub {
                Some(sub) => {
                    let updated = parse_update(&sub)?.or(sec.updated);
                    let child = sec.child(sub, Some(place), updated);
                    sec.ins.push(child);
                }
                None if found_in => {
                    return Err(SixxError::input_line(value, "duplicate \"in\""));
                }
                None => {
                    sec.place = Some(place);
                    found_in = true;
                }
            }
        }
        Ok(sec)
    }

    /// Build the entries of a data block from its parts.
    ///
    /// A block of one part defines an organisation, a person, both (a person working
    /// there), or failing those a residence. A block of several parts needs an `=` part
    /// in common to the others: with one other part, the common part is an organisation
    /// and the member a department or person of it; with more, the common part is an
    /// organisation, or else a family of the people in the member parts.
    pub fn build(&mut self, parts: &[Part], defaults: &Defaults) -> BuildResult<()> {
        let Some(first) = parts.first() else {
            return Ok(());
        };
        for part in parts {
            if !matches!(part.delim, None | Some('+') | Some('-') | Some('=')) {
                return Err(SixxError::input_line(&part.data, "illegal delimiter").into());
            }
        }
        let (common, members): (&Part, Vec<&Part>) = if parts.len() == 1 {
            (first, Vec::new())
        } else {
            let mut commons = parts.iter().filter(|p| p.delim == Some('='));
            let common = commons
                .next()
                .ok_or_else(|| SixxError::input_line(&first.data, "missing \"=\" part"))?;
            if let Some(dup) = commons.next() {
                return Err(SixxError::input_line(&dup.data, "duplicate \"=\" part").into());
            }
            let members = parts.iter().filter(|p| p.delim != Some('=')).collect();
            (common, members)
        };

        let common = self.prepare(
            DatasetMemo::new(&common.data),
            Some(common.delim != Some('-')),
            defaults,
            None,
        )?;
        let mut sections = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            let mut sec = self.prepare(
                DatasetMemo::new(&member.data),
                Some(member.delim != Some('-')),
                defaults,
                common.updated,
            )?;
            sec.sequence = Some(i + 1);
            sections.push((member.delim, sec));
        }

        match sections.as_slice() {
            [] => self.build_single(&common)?,
            [(delim, member)] => self.build_pair(&common, member, *delim == Some('+'))?,
            _ => self.build_group(&common, &sections)?,
        }

        let missed = std::iter::once(&common)
            .chain(sections.iter().map(|(_, sec)| sec))
            .flat_map(|sec| sec.data.unconsumed())
            .min();
        if let Some(loc) = missed {
            return Err(SixxError::input_line(&loc, "spurious line").into());
        }
        Ok(())
    }

    fn build_single(&mut self, common: &Section) -> BuildResult<()> {
        let org = self.parse_company_or_dept(common, true)?;
        let per = self.parse_person(common, true, org.is_none(), org.is_none())?;
        if let Some(who) = org.or(per) {
            self.parse_residences(common, Some(who))?;
        }
        // Contact details come after every named entry of the block is registered, as
        // they may look entries up.
        match (org, per) {
            (Some(org), per) => {
                self.parse_org_con(common, org)?;
                match per {
                    Some(per) => {
                        self.parse_works_at(common, per, org)?;
                    }
                    None => self.parse_org_extra(common, org)?,
                }
            }
            (None, Some(per)) => self.parse_contacts_work(common, per)?,
            (None, None) => {
                let (value, sub) = common.data.get("ad")?;
                let (res, _) = self.parse_ad(common, value, sub)?;
                self.parse_con(common, res, "ph", FIXED)?;
                self.parse_con(common, res, "fax", FAX)?;
                self.parse_con(common, res, "com", Contact::Comment)?;
            }
        }
        // A works-at link may place the person, so their own details come last.
        if let Some(per) = per {
            self.parse_person_con(common, per, org)?;
        }
        Ok(())
    }

    fn build_pair(&mut self, common: &Section, member: &Section, principal: bool) -> BuildResult<()> {
        let org = self
            .parse_company_or_dept(common, false)?
            .ok_or_else(|| SixxError::input_line(&common.data, "missing company or department"))?;
        self.parse_residences(common, Some(org))?;
        let dept = if self.model.graph.node_type(org) == NodeType::Department {
            None
        } else {
            self.parse_dept(member, Some(org), true, true)?
        };
        let per = self.parse_person(member, dept.is_some(), dept.is_none(), principal)?;
        if let Some(who) = dept.or(per) {
            self.parse_residences(member, Some(who))?;
        }

        self.parse_org_con(common, org)?;
        self.parse_org_extra(common, org)?;
        if let Some(dept) = dept {
            self.parse_org_con(member, dept)?;
        }
        match (per, dept) {
            (Some(per), dept) => {
                self.parse_works_at(member, per, dept.unwrap_or(org))?;
                self.parse_person_con(member, per, dept)?;
            }
            (None, Some(dept)) => self.parse_org_extra(member, dept)?,
            (None, None) => {}
        }
        Ok(())
    }

    fn build_group(&mut self, common: &Section, members: &[(Option<char>, Section)]) -> BuildResult<()> {
        let org = self.parse_company_or_dept(common, true)?;
        let family = match org {
            Some(org) => {
                self.parse_residences(common, Some(org))?;
                None
            }
            None => {
                let aka = akas(&common.data)?;
                let family = self.produce(|m| m.graph.add_node(Entity::Family(Family::new(aka))))?;
                self.parse_residences(common, Some(family))?;
                Some(family)
            }
        };
        let company = org.filter(|org| self.model.graph.node_type(*org) != NodeType::Department);

        let mut roles = Vec::with_capacity(members.len());
        for (delim, member) in members {
            let dept = match company {
                Some(company) => self.parse_dept(member, Some(company), true, true)?,
                None => None,
            };
            let person =
                self.parse_person(member, dept.is_some(), dept.is_none(), *delim != Some('-'))?;
            if let (Some(family), Some(person)) = (family, person) {
                let is_head = *delim != Some('-');
                let (sequence, updated) = (member.sequence, member.updated);
                self.produce(|m| {
                    m.graph
                        .add_link(person, family, Entity::BelongsTo { is_head, sequence }, updated)
                })?;
            }
            if let Some(who) = dept.or(person) {
                self.parse_residences(member, Some(who))?;
            }
            roles.push((dept, person));
        }
        // A family is known by the names of its members, so it can only be found once
        // they all belong to it.
        if let Some(family) = family {
            self.produce(|m| m.register(family, true))?;
        }

        match (org, family) {
            (Some(org), _) => {
                self.parse_org_con(common, org)?;
                self.parse_org_extra(common, org)?;
            }
            (None, Some(family)) => self.parse_family_con(common, family)?,
            (None, None) => {}
        }
        for ((_, member), (dept, person)) in members.iter().zip(roles) {
            if let Some(dept) = dept {
                self.parse_org_con(member, dept)?;
            }
            match (org, person) {
                (Some(org), Some(person)) => {
                    self.parse_works_at(member, person, dept.unwrap_or(org))?;
                }
                (Some(_), None) => {
                    if let Some(dept) = dept {
                        self.parse_org_extra(member, dept)?;
                    }
                }
                (None, Some(person)) => self.parse_contacts_work(member, person)?,
                (None, None) => {}
            }
            if let Some(person) = person {
                self.parse_person_con(member, person, dept)?;
            }
        }
        Ok(())
    }

    fn parse_company_or_dept(&mut self, sec: &Section, optional: bool) -> BuildResult<Option<NodeId>> {
        if !optional && !["co", "de", "de-"].iter().any(|k| sec.data.contains(k)) {
            return Err(SixxError::input_line(&sec.data, "missing company or department").into());
        }
        let mut company = None;
        if let Some(value) = sec.data.optvalue("co")? {
            let name = Multilang::optparse(value)?;
            let aka = akas(&sec.data)?;
            let prefer = preferred(&name, &aka);
            let place = sec.place;
            let org = Organisation::new(name, aka, Some(prefer));
            company = Some(self.produce(|m| m.intern(Entity::Company(org), place, true))?);
        }
        let dept = self.parse_dept(sec, company, company.is_some() || optional, company.is_none())?;
        Ok(dept.or(company))
    }

    fn parse_dept(
        &mut self,
        sec: &Section,
        company: Option<NodeId>,
        optional: bool,
        with_aka: bool,
    ) -> BuildResult<Option<NodeId>> {
        let (text, is_head) = match sec.data.optvalue("de")? {
            Some(text) => (text, true),
            None if optional && !sec.data.contains("de-") => return Ok(None),
            None => (sec.data.getvalue("de-")?, false),
        };
        let name = Multilang::optparse(text)?;
        let aka = if with_aka { akas(&sec.data)? } else { Vec::new() };
        let prefer = preferred(&name, &aka);
        let place = sec.place;
        let org = Organisation::new(name, aka, Some(prefer));
        let dept = self.produce(|m| m.intern(Entity::Department(org), place, true))?;
        let company = match company {
            Some(company) => company,
            None => {
                let of = sec.data.getvalue("of")?;
                self.find(NodeType::Company, of)?
            }
        };
        self.produce(|m| m.add_department(company, dept, is_head, text))?;
        Ok(Some(dept))
    }

    fn parse_person(
        &mut self,
        sec: &Section,
        optional: bool,
        with_aka: bool,
        principal: bool,
    ) -> BuildResult<Option<NodeId>> {
        let mut fields = NameFields::default();
        match sec.data.optvalue(SINGLE_NAME_KEY)? {
            Some(single) => fields.set(SINGLE_NAME_KEY, single.clone()),
            None => {
                for key in NAME_KEYS {
                    if let Some(value) = sec.data.optvalue(key)? {
                        fields.set(key, value.clone());
                    }
                }
            }
        }
        if fields.is_empty() {
            if optional {
                return Ok(None);
            }
            return Err(SixxError::input_line(&sec.data, "missing person").into());
        }
        let name = PersonName::from_fields(&fields)?;
        let aka = if with_aka { akas(&sec.data)? } else { Vec::new() };
        let person = Person::new(name, aka);
        let id = self.produce(|m| m.intern(Entity::Person(person), None, principal))?;
        if let Some(text) = sec.data.optvalue("bd")? {
            let (birthday, year) = Birthday::parse(text)?;
            self.produce(|m| {
                let day = m.intern(Entity::Birthday(birthday), None, true)?;
                m.graph.add_link(id, day, Entity::BornOn { year }, None)
            })?;
        }
        Ok(Some(id))
    }

    /// Details that could belong to an organisation. Mobile numbers are left for
    /// [Self::parse_org_extra] in case the part also defines a person.
    fn parse_org_con(&mut self, sec: &Section, org: NodeId) -> BuildResult<()> {
        self.parse_homes(sec, org)?;
        self.parse_locations(sec, org)?;
        self.parse_con(sec, org, "po", Contact::Postal)?;
        self.parse_con(sec, org, "ph", FIXED)?;
        self.parse_con(sec, org, "fax", FAX)?;
        self.parse_con(sec, org, "em", Contact::Email(Context::None))?;
        self.parse_con(sec, org, "www", Contact::WebPage)?;
        self.parse_con(sec, org, "com", Contact::Comment)?;
        self.parse_data(sec, org)?;
        self.parse_assoc(sec, org, "with", Assoc::With, AssocContacts::General, None)?;
        self.parse_assoc(sec, org, "ex", Assoc::Ex, AssocContacts::General, None)?;
        self.parse_keywords(sec, org)?;
        for sub in &sec.ins {
            self.parse_homes(sub, org)?;
            self.parse_locations(sub, org)?;
            self.parse_con(sub, org, "po", Contact::Postal)?;
            self.parse_con(sub, org, "ph", FIXED_HOME)?;
            self.parse_con(sub, org, "fax", FAX_HOME)?;
            self.parse_data(sub, org)?;
        }
        Ok(())
    }

    fn parse_org_extra(&mut self, sec: &Section, org: NodeId) -> BuildResult<()> {
        self.parse_con(sec, org, "mob", MOBILE)?;
        for sub in &sec.ins {
            self.parse_con(sub, org, "mob", MOBILE_HOME)?;
        }
        Ok(())
    }

    fn parse_family_con(&mut self, sec: &Section, family: NodeId) -> BuildResult<()> {
        self.parse_homes(sec, family)?;
        self.parse_con(sec, family, "phh", FIXED_HOME)?;
        self.parse_con(sec, family, "faxh", FAX_HOME)?;
        self.parse_con(sec, family, "ph", FIXED)?;
        self.parse_con(sec, family, "fax", FAX)?;
        self.parse_con(sec, family, "po", Contact::Postal)?;
        self.parse_con(sec, family, "mob", MOBILE_HOME)?;
        self.parse_con(sec, family, "em", Contact::Email(Context::Home))?;
        self.parse_con(sec, family, "www", Contact::WebPage)?;
        self.parse_con(sec, family, "com", Contact::Comment)?;
        self.parse_data(sec, family)?;
        self.parse_assoc(sec, family, "with", Assoc::With, AssocContacts::General, None)?;
        self.parse_assoc(sec, family, "ex", Assoc::Ex, AssocContacts::General, None)?;
        self.parse_keywords(sec, family)?;
        for sub in &sec.ins {
            self.parse_homes(sub, family)?;
            self.parse_con(sub, family, "po", Contact::Postal)?;
            self.parse_con(sub, family, "mob", MOBILE_HOME)?;
            self.parse_con(sub, family, "ph", FIXED_HOME)?;
            self.parse_con(sub, family, "fax", FAX_HOME)?;
            self.parse_data(sub, family)?;
        }
        Ok(())
    }

    /// A person's own details. When the part also defines the organisation `org`, the
    /// unqualified fields (`ph`, `em`, ...) belong to the organisation and only the
    /// `h`-suffixed home fields are the person's.
    fn parse_person_con(&mut self, sec: &Section, per: NodeId, org: Option<NodeId>) -> BuildResult<()> {
        let own = org.is_none();
        if own {
            self.parse_homes(sec, per)?;
            self.parse_con(sec, per, "po", Contact::Postal)?;
        }
        self.parse_con(sec, per, "mob", MOBILE)?;
        self.parse_con(sec, per, "phh", FIXED_HOME)?;
        self.parse_con(sec, per, "faxh", FAX_HOME)?;
        self.parse_con(sec, per, "emh", Contact::Email(Context::Home))?;
        self.parse_con(sec, per, "wwwh", Contact::WebPage)?;
        if own {
            self.parse_con(sec, per, "ph", FIXED)?;
            self.parse_con(sec, per, "fax", FAX)?;
            self.parse_con(sec, per, "em", Contact::Email(Context::None))?;
            self.parse_con(sec, per, "www", Contact::WebPage)?;
            self.parse_con(sec, per, "com", Contact::Comment)?;
            self.parse_data(sec, per)?;
            self.parse_keywords(sec, per)?;
            self.parse_assoc(sec, per, "work", Assoc::WorksAt, AssocContacts::Work, Some(true))?;
            self.parse_assoc(sec, per, "work-", Assoc::WorksAt, AssocContacts::Work, Some(false))?;
            self.parse_assoc(sec, per, "with", Assoc::With, AssocContacts::General, None)?;
            self.parse_assoc(sec, per, "ex", Assoc::Ex, AssocContacts::General, None)?;
        }
        for sub in &sec.ins {
            self.parse_con(sub, per, "mob", MOBILE)?;
            self.parse_con(sub, per, "phh", FIXED_HOME)?;
            self.parse_con(sub, per, "faxh", FAX_HOME)?;
            if own {
                self.parse_homes(sub, per)?;
                self.parse_con(sub, per, "po", Contact::Postal)?;
                self.parse_con(sub, per, "ph", FIXED_HOME)?;
                self.parse_con(sub, per, "fax", FAX_HOME)?;
                self.parse_data(sub, per)?;
            }
        }
        Ok(())
    }

    /// The implicit works-at link of a part that defines both a person and the
    /// organisation they belong to.
    fn parse_works_at(&mut self, sec: &Section, who: NodeId, org: NodeId) -> BuildResult<NodeId> {
        let link = self.make_assoc(Some(sec), who, org, Assoc::WorksAt, sec.updated, None)?;
        self.parse_con(sec, link, "comw", Contact::Comment)?;
        for text in sec.data.mgetvalue("keyw")? {
            for keyword in self.split_keywords(text)? {
                self.add_keyword(link, keyword, sec.updated)?;
            }
        }
        self.parse_contacts_work(sec, link)?;
        Ok(link)
    }

    fn parse_contacts_work(&mut self, sec: &Section, who: NodeId) -> BuildResult<()> {
        self.parse_con(sec, who, "pow", Contact::Postal)?;
        self.parse_con(sec, who, "mobw", MOBILE_WORK)?;
        self.parse_con(sec, who, "phw", FIXED_WORK)?;
        self.parse_con(sec, who, "faxw", FAX_WORK)?;
        self.parse_con(sec, who, "emw", Contact::Email(Context::Work))?;
        Ok(())
    }

    /// Association lines (`work`, `with`, ...): look up the named entry and link to it.
    /// An indented sub-dataset gives details of the association itself.
    fn parse_assoc(
        &mut self,
        sec: &Section,
        who: NodeId,
        key: &str,
        assoc: Assoc,
        contacts: AssocContacts,
        is_head: Option<bool>,
    ) -> BuildResult<()> {
        let types: EnumSet<NodeType> = match assoc {
            Assoc::WorksAt => NodeType::Organisation | NodeType::Residence,
            Assoc::With | Assoc::Ex => EnumSet::only(NodeType::NamedNode),
        };
        for (name, sub) in sec.data.mget(key) {
            let other = self.find(types, name)?;
            let sub = match sub {
                Some(sub) => {
                    let updated = parse_update(&sub)?.or(sec.updated);
                    let mut sub = sec.child(sub, sec.place, updated);
                    sub.defaults.keywords.clear();
                    Some(sub)
                }
                None => None,
            };
            let timestamp = sub.as_ref().map_or(sec.updated, |s| s.updated);
            let link = self.make_assoc(sub.as_ref(), who, other, assoc, timestamp, is_head)?;
            if let Some(sub) = &sub {
                match contacts {
                    AssocContacts::General => self.parse_assoc_contacts(sub, link)?,
                    AssocContacts::Work => self.parse_assoc_contacts_work(sub, link)?,
                    AssocContacts::Nothing => {}
                }
                self.parse_keywords(sub, link)?;
                self.parse_data(sub, link)?;
                self.parse_con(sub, link, "com", Contact::Comment)?;
            }
        }
        Ok(())
    }

    fn make_assoc(
        &mut self,
        sec: Option<&Section>,
        who: NodeId,
        other: NodeId,
        assoc: Assoc,
        timestamp: Option<NaiveDate>,
        is_head: Option<bool>,
    ) -> BuildResult<NodeId> {
        let is_head = is_head.or_else(|| sec.and_then(|s| s.is_head)).unwrap_or(false);
        let sequence = sec.and_then(|s| s.sequence);
        let position = match sec {
            Some(sec) => sec.data.optvalue("pos")?.map(Multilang::optparse).transpose()?,
            None => None,
        };
        let entity = match assoc {
            Assoc::WorksAt => Entity::WorksAt {
                position,
                is_head,
                sequence,
            },
            Assoc::With => Entity::With { position },
            Assoc::Ex => Entity::Ex { position },
        };
        self.produce(|m| m.graph.add_link(who, other, entity, timestamp))
    }

    fn parse_assoc_contacts(&mut self, sec: &Section, link: NodeId) -> BuildResult<()> {
        self.parse_con(sec, link, "mob", MOBILE)?;
        self.parse_con(sec, link, "ph", FIXED)?;
        self.parse_con(sec, link, "fax", FAX)?;
        self.parse_con(sec, link, "em", Contact::Email(Context::None))?;
        Ok(())
    }

    fn parse_assoc_contacts_work(&mut self, sec: &Section, link: NodeId) -> BuildResult<()> {
        self.parse_con(sec, link, "po", Contact::Postal)?;
        self.parse_con(sec, link, "pow", Contact::Postal)?;
        self.parse_con(sec, link, "mobw", MOBILE_WORK)?;
        self.parse_con(sec, link, "phw", FIXED_WORK)?;
        self.parse_con(sec, link, "faxw", FAX_WORK)?;
        self.parse_con(sec, link, "emw", Contact::Email(Context::Work))?;
        self.parse_con(sec, link, "mob", MOBILE_WORK)?;
        self.parse_con(sec, link, "ph", FIXED_WORK)?;
        self.parse_con(sec, link, "fax", FAX_WORK)?;
        self.parse_con(sec, link, "em", Contact::Email(Context::Work))?;
        self.parse_assoc(sec, link, "with", Assoc::With, AssocContacts::Nothing, None)?;
        self.parse_assoc(sec, link, "ex", Assoc::Ex, AssocContacts::Nothing, None)?;
        Ok(())
    }

    /// Every value of `key` as a contact detail of `who`.
    fn parse_con(&mut self, sec: &Section, who: NodeId, key: &str, contact: Contact) -> BuildResult<()> {
        for text in sec.data.mgetvalue(key)? {
            let (place, fallback, updated) = (sec.place, sec.defaults.place, sec.updated);
            self.produce(|m| {
                let default_place = m.graph.only_place(who).or(fallback);
                let (node, link) = match contact {
                    Contact::Phone(kind, context) => {
                        let (tel, comment) =
                            Telephone::parse(text, &m.world, &m.graph, place, default_place)?;
                        let tel_place = tel.place;
                        let node = m
                            .graph
                            .add_placed_node(Entity::Telephone(tel), Some(tel_place))?;
                        (node, Entity::HasPhone { kind, context, comment })
                    }
                    Contact::Postal => {
                        let address =
                            Address::parse(text, &m.world, &m.graph, place, default_place)?;
                        let node = add_address(&mut m.graph, Entity::PostalAddress(address))?;
                        (node, Entity::HasPostalAddress)
                    }
                    Contact::Email(context) => {
                        let (email, comment) = Email::parse(text)?;
                        let node = m.graph.add_node(Entity::Email(email))?;
                        (node, Entity::HasEmail { context, comment })
                    }
                    Contact::WebPage => {
                        let (uri, comment) = Uri::parse(text)?;
                        let node = m.graph.add_node(Entity::Uri(uri))?;
                        (node, Entity::HasWebPage { comment })
                    }
                    Contact::Comment => {
                        let node = m.graph.add_node(Entity::Comment(Comment::parse(text)))?;
                        (node, Entity::HasComment)
                    }
                };
                m.graph.add_link(who, node, link, updated)
            })?;
        }
        Ok(())
    }

    /// `ad` lines of a part and of its `in` sub-datasets, each a residence of `who`.
    fn parse_residences(&mut self, sec: &Section, who: Option<NodeId>) -> BuildResult<()> {
        let mut found = Vec::new();
        for (value, sub) in sec.data.mget("ad") {
            found.push(self.parse_ad(sec, value, sub)?);
        }
        for insub in &sec.ins {
            for (value, sub) in insub.data.mget("ad") {
                found.push(self.parse_ad(insub, value, sub)?);
            }
        }
        if let Some(who) = who {
            for (res, updated) in found {
                self.produce(|m| m.graph.add_link(who, res, Entity::ResidesAt, updated))?;
            }
        }
        Ok(())
    }

    /// A residence, with the phone numbers and comments of its sub-dataset. Returns the
    /// residence and the date the line was last updated.
    fn parse_ad<'d>(
        &mut self,
        sec: &Section<'d>,
        value: &Text,
        sub: Option<DatasetMemo<'d>>,
    ) -> BuildResult<(NodeId, Option<NaiveDate>)> {
        let (place, default_place) = (sec.place, sec.defaults.place);
        let res = self.produce(|m| {
            let address = Address::parse(value, &m.world, &m.graph, place, default_place)?;
            m.intern(Entity::Residence(address), None, true)
        })?;
        let Some(sub) = sub else {
            return Ok((res, sec.updated));
        };
        let updated = parse_update(&sub)?.or(sec.updated);
        let sub = sec.child(sub, self.model.graph.only_place(res), updated);
        self.parse_con(&sub, res, "ph", FIXED)?;
        self.parse_con(&sub, res, "fax", FAX)?;
        self.parse_con(&sub, res, "com", Contact::Comment)?;
        Ok((res, updated))
    }

    /// `home` lines: residences defined elsewhere, looked up by their first line.
    fn parse_homes(&mut self, sec: &Section, who: NodeId) -> BuildResult<()> {
        for (value, sub) in sec.data.mget("home") {
            let res = self.find(NodeType::Residence, value)?;
            let sub = match sub {
                Some(sub) => {
                    let updated = parse_update(&sub)?.or(sec.updated);
                    Some(sec.child(sub, self.model.graph.only_place(res), updated))
                }
                None => None,
            };
            let updated = sub.as_ref().map_or(sec.updated, |s| s.updated);
            let link = self.produce(|m| m.graph.add_link(who, res, Entity::ResidesAt, updated))?;
            if let Some(sub) = &sub {
                self.parse_con(sub, link, "ph", FIXED)?;
                self.parse_con(sub, link, "fax", FAX)?;
                self.parse_con(sub, link, "com", Contact::Comment)?;
            }
        }
        Ok(())
    }

    /// `loc` lines: organisations that host this one.
    fn parse_locations(&mut self, sec: &Section, who: NodeId) -> BuildResult<()> {
        for (value, sub) in sec.data.mget("loc") {
            let host = self.find(NodeType::Organisation, value)?;
            let sub = match sub {
                Some(sub) => {
                    let updated = parse_update(&sub)?.or(sec.updated);
                    Some(sec.child(sub, self.model.graph.only_place(host), updated))
                }
                None => None,
            };
            let updated = sub.as_ref().map_or(sec.updated, |s| s.updated);
            let link = self.produce(|m| {
                m.graph
                    .add_link(who, host, Entity::LocatedAt { sequence: None }, updated)
            })?;
            if let Some(sub) = &sub {
                self.parse_con(sub, link, "ph", FIXED)?;
                self.parse_con(sub, link, "fax", FAX)?;
                self.parse_con(sub, link, "com", Contact::Comment)?;
            }
        }
        Ok(())
    }

    /// `key` lines and the default keywords, less those named by `key-` lines.
    fn parse_keywords(&mut self, sec: &Section, node: NodeId) -> BuildResult<()> {
        let mut omit = Vec::new();
        for text in sec.data.mgetvalue("key-")? {
            omit.extend(self.split_keywords(text)?);
        }
        for keyword in &sec.defaults.keywords {
            if !omit.contains(keyword) {
                self.add_keyword(node, *keyword, sec.updated)?;
            }
        }
        for text in sec.data.mgetvalue("key")? {
            for keyword in self.split_keywords(text)? {
                if !omit.contains(&keyword) {
                    self.add_keyword(node, keyword, sec.updated)?;
                }
            }
        }
        Ok(())
    }

    fn split_keywords(&mut self, text: &Text) -> BuildResult<Vec<NodeId>> {
        let mut ids = Vec::new();
        for word in text.split_whitespace() {
            let (keyword, _) = Keyword::parse(&word)?;
            ids.push(self.produce(|m| m.intern(Entity::Keyword(keyword), None, true))?);
        }
        Ok(ids)
    }

    /// Link `node` to `keyword` unless it already is.
    fn add_keyword(&mut self, node: NodeId, keyword: NodeId, updated: Option<NaiveDate>) -> BuildResult<NodeId> {
        self.produce(|m| {
            match m
                .graph
                .link(node, outgoing() & NodeType::KeyedWith & to_node(keyword))?
            {
                Some(link) => Ok(link),
                None => m.graph.add_link(node, keyword, Entity::KeyedWith, updated),
            }
        })
    }

    /// `data` lines: `id = value` facts, in the context chosen for the id by `%data`.
    fn parse_data(&mut self, sec: &Section, who: NodeId) -> BuildResult<()> {
        for text in sec.data.mgetvalue("data")? {
            let (id, value) = split_data(text);
            let value = value.ok_or_else(|| SixxError::input(text, "missing \"=\""))?;
            let factory = self
                .factories
                .get(&id)
                .copied()
                .unwrap_or(DataFactory::Context);
            let (place, updated) = (sec.place, sec.updated);
            self.produce(|m| {
                let context = factory.context(&mut m.graph, who, place, text)?;
                if !m.claim_data_key(context, &id) {
                    return Err(SixxError::input(text, format!("duplicate data '{id}'")));
                }
                add_data(&mut m.graph, context, Data { id, value }, updated)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::parse::parts, input::lines};
    use test_log::test;

    fn build(model: &mut Model, journal: &mut Journal, source: &str) -> BuildResult<()> {
        let block = lines(source, "b.sixx");
        let parts = parts(&block)?;
        let factories = HashMap::new();
        BlockBuilder::new(model, &factories, journal, false).build(&parts, &Defaults::default())
    }

    #[test]
    fn split_data_at_first_equals() {
        assert_eq!(
            split_data(&Text::plain("size = 10 = ten")),
            ("size".to_string(), Some("10 = ten".to_string()))
        );
        assert_eq!(split_data(&Text::plain("size ")), ("size".to_string(), None));
    }

    #[test]
    fn replay_reuses_produced_nodes() {
        let mut model = Model::new();
        let mut journal = Journal::default();
        build(&mut model, &mut journal, "co Acme\nwww http://acme.example\n").unwrap();
        let count = model.graph.len();
        assert!(journal.produced() > 0);

        journal.rewind();
        build(&mut model, &mut journal, "co Acme\nwww http://acme.example\n").unwrap();
        assert_eq!(model.graph.len(), count);
    }

    #[test]
    fn lookups_suspend_until_woken() {
        let mut model = Model::new();
        let mut journal = Journal::default();
        let source = "fn Jo\nln Bloggs\nwork Acme\n";
        let err = build(&mut model, &mut journal, source).unwrap_err();
        assert!(err.is_suspend());
        assert_eq!(err.as_unresolved_reference().map(|u| u.name.as_str()), Some("Acme"));

        // Woken, the lookup is attempted once per run.
        journal.rewind();
        journal.wake();
        assert!(build(&mut model, &mut journal, source).unwrap_err().is_suspend());
        assert_eq!(journal.resolved(), 0);

        let mut other = Journal::default();
        build(&mut model, &mut other, "co Acme\n").unwrap();
        journal.rewind();
        build(&mut model, &mut journal, source).unwrap();
        assert_eq!(journal.resolved(), 1);
        assert_eq!(model.registered(EnumSet::only(NodeType::Person)).len(), 1);
    }

    #[test]
    fn ambiguous_lookup_fails() {
        let mut model = Model::new();
        for _ in 0..2 {
            build(&mut model, &mut Journal::default(), "co Acme\n").unwrap();
        }
        let mut journal = Journal::default();
        journal.wake();
        let err = build(&mut model, &mut journal, "fn Jo\nwork Acme\n").unwrap_err();
        match err {
            Interrupt::Fail(err) => {
                assert_eq!(err.message(), "ambiguous Organisation/Residence \"Acme\"")
            }
            other => panic!("expected failure, got {other}"),
        }
    }

    #[test]
    fn block_layout_errors() {
        let msg = |source: &str| match build(&mut Model::new(), &mut Journal::default(), source) {
            Err(Interrupt::Fail(err)) => err.message(),
            other => panic!("expected failure, got {other:?}"),
        };
        assert_eq!(msg("co A\n*\nfn B\n"), "illegal delimiter");
        assert_eq!(msg("co A\n+\nfn B\n"), "missing \"=\" part");
        assert_eq!(msg("=\nco A\n=\nco B\n"), "duplicate \"=\" part");
        assert_eq!(msg("=\nfn A\n+\nfn B\n"), "missing company or department");
        assert_eq!(msg("fn A\nzz top\n"), "spurious line");
        assert_eq!(msg("co A\ndata size\n"), "missing \"=\"");
    }
}
