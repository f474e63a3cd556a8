//! Countries, areas and places.
//!
//! A [Country] or [Area] is a node in the graph; a [Place] is a plain value naming a
//! country and optionally one of its areas. The [World] indexes the country and area nodes
//! for lookup by code and by name.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::{
    error::SixxError,
    graph::{Entity, Graph, NodeId},
    input::Text,
    multilang::{Multilang, DEFAULT_LANGUAGE},
};

static NUMERIC_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(cc|ap|sp|ac)=(\d+)\s*").expect("numeric attribute pattern"));
static LANG_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^lang=([a-z]{2}(?:_[A-Z]{2})?)\s*").expect("lang pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    /// ISO 3166 alpha-2 code, e.g. `AU`.
    pub iso: String,
    /// Locale of the country's own language, always `xx_YY`.
    pub language: String,
    /// International dialling code.
    pub ccode: String,
    /// Trunk prefix that precedes an area code in national dialling, if the country has
    /// area codes.
    pub aprefix: Option<String>,
    /// Prefix of national service numbers that need no area code.
    pub sprefix: Option<String>,
    pub name: Multilang,
    pub fullname: Multilang,
}

/// Matching shared by countries and areas: case-insensitive exact comparison against any
/// of the names.
fn names_match(names: &[&Multilang], text: &str) -> bool {
    let upper = text.to_uppercase();
    names.iter().any(|name| name.to_uppercase().matches(&upper))
}

/// Parse a run of `name [/ fullname]` multilang texts interleaved with attributes.
struct Description {
    attrs: BTreeMap<String, String>,
    name: Option<Multilang>,
    fullname: Option<Multilang>,
}

fn parse_description(text: &Text, what: &str) -> Result<Description, SixxError> {
    let mut desc = Description {
        attrs: BTreeMap::new(),
        name: None,
        fullname: None,
    };
    let mut rest = text.clone();
    while !rest.is_empty() {
        if let Some(caps) = NUMERIC_ATTR_RE.captures(&rest) {
            desc.attrs.insert(caps[1].to_string(), caps[2].to_string());
            rest = rest.tail(caps[0].len());
            continue;
        }
        if let Some(caps) = LANG_ATTR_RE.captures(&rest) {
            desc.attrs.insert("lang".to_string(), caps[1].to_string());
            rest = rest.tail(caps[0].len());
            continue;
        }
        if desc.name.is_none() {
            let (after, name) = Multilang::parse(&rest)?;
            if name.is_none() {
                return Err(SixxError::input(&rest, format!("missing {what} name")));
            }
            desc.name = name;
            rest = after;
            continue;
        }
        if let Some(after_slash) = rest.strip_prefix("/") {
            if desc.fullname.is_some() {
                return Err(SixxError::input(&rest, "too many \"/\" separators"));
            }
            let (after, fullname) = Multilang::parse(&after_slash.trim_start())?;
            if fullname.is_none() {
                return Err(SixxError::input(&after, format!("missing {what} full name")));
            }
            desc.fullname = fullname;
            rest = after;
            continue;
        }
        return Err(SixxError::input(
            &rest,
            format!("malformed {what} description"),
        ));
    }
    Ok(desc)
}

impl Country {
    /// Parse a `%country` definition, e.g. `AU lang=en cc=61 ap=0 sp=1 "Australia"`.
    pub fn parse(text: &Text) -> Result<Country, SixxError> {
        let (iso, rest) = text
            .split_first_word()
            .ok_or_else(|| SixxError::input_line(text, "missing country code"))?;
        if !(iso.chars().count() == 2 && iso.chars().all(|c| c.is_ascii_uppercase())) {
            return Err(SixxError::input(
                &iso,
                format!("invalid ISO3166 country code '{iso}'"),
            ));
        }
        let rest = rest.unwrap_or_else(|| iso.tail(iso.len()));
        let mut desc = parse_description(&rest, "country")?;
        let ccode = desc
            .attrs
            .remove("cc")
            .ok_or_else(|| SixxError::input_line(text, "missing cc="))?;
        let aprefix = desc.attrs.remove("ap");
        let sprefix = desc.attrs.remove("sp");
        match (&aprefix, &sprefix) {
            (Some(ap), Some(sp)) if ap == sp => {
                return Err(SixxError::input_line(text, "sp= and ap= must be different"))
            }
            (None, Some(_)) => return Err(SixxError::input_line(text, "sp= without ap=")),
            _ => {}
        }
        let mut language = desc
            .attrs
            .remove("lang")
            .ok_or_else(|| SixxError::input_line(text, "missing lang="))?;
        if language.len() == 2 {
            language = format!("{language}_{iso}");
        }
        if !desc.attrs.is_empty() {
            return Err(SixxError::input(&rest, "malformed country description"));
        }
        let name = desc
            .name
            .ok_or_else(|| SixxError::input_line(text, "missing name"))?;
        Ok(Country {
            iso: iso.to_string(),
            language,
            ccode,
            aprefix,
            sprefix,
            fullname: desc.fullname.unwrap_or_else(|| name.clone()),
            name,
        })
    }

    /// Exact, case-insensitive match against the ISO code, name or full name.
    pub fn matches(&self, text: &str) -> bool {
        self.iso == text.to_uppercase() || names_match(&[&self.name, &self.fullname], text)
    }

    pub fn display_name(&self) -> String {
        self.name.display_in(DEFAULT_LANGUAGE).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    pub country: NodeId,
    /// Area code, without the country's area prefix.
    pub acode: String,
    pub name: Multilang,
    pub fullname: Multilang,
}

impl Area {
    /// Parse an `%area` definition, e.g. `ac=8 "SA" / "South Australia"`.
    pub fn parse(text: &Text, country: NodeId) -> Result<Area, SixxError> {
        let mut desc = parse_description(text, "area")?;
        let acode = desc
            .attrs
            .remove("ac")
            .ok_or_else(|| SixxError::input_line(text, "missing ac="))?;
        if !desc.attrs.is_empty() {
            return Err(SixxError::input(text, "malformed area description"));
        }
        let name = desc
            .name
            .ok_or_else(|| SixxError::input_line(text, "missing name"))?;
        Ok(Area {
            country,
            acode,
            fullname: desc.fullname.unwrap_or_else(|| name.clone()),
            name,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        names_match(&[&self.name, &self.fullname], text)
    }

    pub fn display_name(&self) -> String {
        self.name.display_in(DEFAULT_LANGUAGE).to_string()
    }
}

/// A country, optionally narrowed to one of its areas. Equality is by node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Place {
    pub country: NodeId,
    pub area: Option<NodeId>,
}

impl Place {
    pub fn in_country(country: NodeId) -> Place {
        Place {
            country,
            area: None,
        }
    }

    pub fn in_area(country: NodeId, area: NodeId) -> Place {
        Place {
            country,
            area: Some(area),
        }
    }

    /// The node the place is named after: the area if there is one, else the country.
    pub fn node(&self) -> NodeId {
        self.area.unwrap_or(self.country)
    }
}

impl Graph {
    pub fn country(&self, id: NodeId) -> Option<&Country> {
        match self.entity(id) {
            Entity::Country(c) => Some(c),
            _ => None,
        }
    }

    pub fn area(&self, id: NodeId) -> Option<&Area> {
        match self.entity(id) {
            Entity::Area(a) => Some(a),
            _ => None,
        }
    }

    /// "SA, Australia" or "Australia".
    pub fn place_name(&self, place: &Place) -> String {
        let country = self
            .country(place.country)
            .map(Country::display_name)
            .unwrap_or_default();
        match place.area.and_then(|a| self.area(a)) {
            Some(area) => format!("{}, {country}", area.display_name()),
            None => country,
        }
    }

    /// Name of the narrowest part of a place, as used in "must be in X" errors.
    pub fn place_node_name(&self, place: &Place) -> String {
        match place.area.and_then(|a| self.area(a)) {
            Some(area) => area.display_name(),
            None => self
                .country(place.country)
                .map(Country::display_name)
                .unwrap_or_default(),
        }
    }
}

/// Index of the country and area nodes.
#[derive(Debug, Clone, Default)]
pub struct World {
    countries: BTreeMap<String, NodeId>,
    ccodes: BTreeMap<String, NodeId>,
    areas: BTreeMap<NodeId, BTreeMap<String, NodeId>>,
}

impl World {
    pub fn new() -> World {
        World::default()
    }

    /// Parse a country definition and add a node for it. The ISO code and the dialling code
    /// must both be new.
    pub fn add_country(&mut self, graph: &mut Graph, text: &Text) -> Result<NodeId, SixxError> {
        let country = Country::parse(text)?;
        if self.countries.contains_key(&country.iso) {
            return Err(SixxError::input_line(
                text,
                format!("duplicate country {}", country.iso),
            ));
        }
        if self.ccodes.contains_key(&country.ccode) {
            return Err(SixxError::input_line(
                text,
                format!("duplicate country code {}", country.ccode),
            ));
        }
        let (iso, ccode) = (country.iso.clone(), country.ccode.clone());
        let id = graph.add_node(Entity::Country(country))?;
        self.countries.insert(iso, id);
        self.ccodes.insert(ccode, id);
        tracing::debug!("[World] added country {}", graph.place_name(&Place::in_country(id)));
        Ok(id)
    }

    /// Parse an area definition within `country`, adding the area node and its `Has_area`
    /// link. Area names are unique within a country, in the country's own language.
    pub fn add_area(
        &mut self,
        graph: &mut Graph,
        country: NodeId,
        text: &Text,
    ) -> Result<NodeId, SixxError> {
        let area = Area::parse(text, country)?;
        let (language, country_name) = graph
            .country(country)
            .map(|c| (c.language.clone(), c.display_name()))
            .ok_or_else(|| SixxError::invariant(format!("{country} is not a country")))?;
        let local = area
            .name
            .local(&language)
            .map(|t| t.to_string())
            .unwrap_or_else(|| area.display_name());
        let areas = self.areas.entry(country).or_default();
        if areas.contains_key(&local) {
            return Err(SixxError::input_line(
                text,
                format!("duplicate area \"{local}\" in {country_name}"),
            ));
        }
        let id = graph.add_node(Entity::Area(area))?;
        graph.add_link(country, id, Entity::HasArea, None)?;
        areas.insert(local, id);
        Ok(id)
    }

    pub fn countries(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.countries.values().copied()
    }

    pub fn areas(&self, country: NodeId) -> Vec<NodeId> {
        self.areas
            .get(&country)
            .map(|areas| areas.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn lookup_ccode(&self, ccode: &str) -> Option<NodeId> {
        self.ccodes.get(ccode).copied()
    }

    /// The area of `country` with the given telephone area code.
    pub fn lookup_acode(&self, graph: &Graph, country: NodeId, acode: &str) -> Option<NodeId> {
        self.areas(country)
            .into_iter()
            .find(|id| graph.area(*id).is_some_and(|area| area.acode == acode))
    }

    fn unique<'a>(
        graph: &Graph,
        what: &str,
        name: &str,
        matched: impl Iterator<Item = &'a NodeId>,
    ) -> Result<Option<NodeId>, SixxError> {
        let matched: Vec<NodeId> = matched.copied().collect();
        match matched.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(*id)),
            _ => {
                let names: Vec<String> = matched
                    .iter()
                    .map(|id| match graph.entity(*id) {
                        Entity::Country(c) => c.display_name(),
                        Entity::Area(a) => a.display_name(),
                        _ => id.to_string(),
                    })
                    .collect();
                Err(SixxError::Ambiguous(format!(
                    "ambiguous {what} name '{name}' matches {}",
                    names.join(" and ")
                )))
            }
        }
    }

    pub fn lookup_country(&self, graph: &Graph, name: &str) -> Result<Option<NodeId>, SixxError> {
        let matched = self
            .countries
            .values()
            .filter(|id| graph.country(**id).is_some_and(|c| c.matches(name)));
        Self::unique(graph, "country", name, matched)
    }

    /// Look up an area by name in any country.
    pub fn lookup_area(&self, graph: &Graph, name: &str) -> Result<Option<NodeId>, SixxError> {
        let matched = self
            .areas
            .values()
            .flat_map(|areas| areas.values())
            .filter(|id| graph.area(**id).is_some_and(|a| a.matches(name)));
        Self::unique(graph, "area", name, matched)
    }

    /// Look up an area by name within one country.
    pub fn country_area(
        &self,
        graph: &Graph,
        country: NodeId,
        name: &str,
    ) -> Result<Option<NodeId>, SixxError> {
        let matched = self
            .areas
            .get(&country)
            .into_iter()
            .flat_map(|areas| areas.values())
            .filter(|id| graph.area(**id).is_some_and(|a| a.matches(name)));
        Self::unique(graph, "area", name, matched)
    }

    /// A country by name, failing that an area by name.
    pub fn lookup_place(&self, graph: &Graph, name: &str) -> Result<Place, SixxError> {
        if let Some(country) = self.lookup_country(graph, name)? {
            return Ok(Place::in_country(country));
        }
        if let Some(area) = self.lookup_area(graph, name)? {
            if let Some(a) = graph.area(area) {
                return Ok(Place::in_area(a.country, area));
            }
        }
        Err(SixxError::NotFound(format!(
            "no country or area matching \"{name}\""
        )))
    }

    /// [World::lookup_place] for input text, reporting failures at the text.
    pub fn parse_place(&self, graph: &Graph, text: &Text) -> Result<Place, SixxError> {
        self.lookup_place(graph, text).map_err(|err| match err {
            SixxError::NotFound(msg) | SixxError::Ambiguous(msg) => SixxError::input(text, msg),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn t(s: &str) -> Text {
        Text::new(s, Some(crate::input::Loc::new("w", 1, Some(1))))
    }

    #[test]
    fn parse_country_definition() {
        let au = Country::parse(&t("AU lang=en cc=61 ap=0 sp=1 \"Australia\"")).unwrap();
        assert_eq!(au.iso, "AU");
        assert_eq!(au.language, "en_AU");
        assert_eq!(au.ccode, "61");
        assert_eq!(au.aprefix.as_deref(), Some("0"));
        assert_eq!(au.sprefix.as_deref(), Some("1"));
        assert!(au.matches("au"));
        assert!(au.matches("australia"));
        assert!(!au.matches("Aust"));

        let es = Country::parse(&t("ES lang=es cc=34 en:\"Spain\" es:\"España\" / en:\"Kingdom of Spain\""))
            .unwrap();
        assert!(es.matches("ESPAÑA"));
        assert!(es.matches("kingdom of spain"));
    }

    #[test]
    fn country_definition_errors() {
        let msg = |s: &str| Country::parse(&t(s)).unwrap_err().message();
        assert_eq!(msg("Au lang=en cc=61 \"A\""), "invalid ISO3166 country code 'Au'");
        assert_eq!(msg("AU lang=en \"Australia\""), "missing cc=");
        assert_eq!(msg("AU lang=en cc=61 sp=1 \"A\""), "sp= without ap=");
        assert_eq!(msg("AU lang=en cc=61 ap=1 sp=1 \"A\""), "sp= and ap= must be different");
        assert_eq!(msg("AU cc=61 \"A\""), "missing lang=");
        assert_eq!(msg("AU lang=en cc=61"), "missing name");
        assert_eq!(msg("AU lang=en cc=61 xyz"), "missing country name");
        assert_eq!(msg("AU lang=en cc=61 \"A\" xyz"), "malformed country description");
        assert_eq!(msg("AU lang=en cc=61 \"A\" / \"B\" / \"C\""), "too many \"/\" separators");
    }

    #[test]
    fn world_lookups() {
        let mut graph = Graph::new();
        let mut world = World::new();
        let au = world
            .add_country(&mut graph, &t("AU lang=en cc=61 ap=0 \"Australia\""))
            .unwrap();
        let sa = world
            .add_area(&mut graph, au, &t("ac=8 \"SA\" / \"South Australia\""))
            .unwrap();
        let err = world
            .add_country(&mut graph, &t("AU lang=en cc=62 \"Oz\""))
            .unwrap_err();
        assert_eq!(err.message(), "duplicate country AU");
        let err = world
            .add_country(&mut graph, &t("NZ lang=en cc=61 \"New Zealand\""))
            .unwrap_err();
        assert_eq!(err.message(), "duplicate country code 61");
        let err = world.add_area(&mut graph, au, &t("ac=9 \"SA\"")).unwrap_err();
        assert_eq!(err.message(), "duplicate area \"SA\" in Australia");

        assert_eq!(world.lookup_place(&graph, "au").unwrap(), Place::in_country(au));
        assert_eq!(
            world.lookup_place(&graph, "south australia").unwrap(),
            Place::in_area(au, sa)
        );
        assert_eq!(world.lookup_ccode("61"), Some(au));
        assert_eq!(graph.place_name(&Place::in_area(au, sa)), "SA, Australia");
        let err = world.parse_place(&graph, &t("Narnia")).unwrap_err();
        assert_eq!(err.message(), "no country or area matching \"Narnia\"");
    }
}
