use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    entity::world::{Place, World},
    error::SixxError,
    graph::Graph,
    input::Text,
};

static TELEPHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\+(?P<ccode>\d+) )?(?:(?P<acode>\d+) )?(?P<local>\d+(?:-\d+)*)")
        .expect("telephone pattern")
});

/// A telephone number, held as the country (and area, if known) it is in, the area code
/// without trunk prefix, and the local number with its hyphens.
#[derive(Debug, Clone)]
pub struct Telephone {
    pub place: Place,
    pub acode: Option<String>,
    pub local: String,
}

impl PartialEq for Telephone {
    fn eq(&self, other: &Self) -> bool {
        self.place.country == other.place.country
            && self.acode == other.acode
            && self.local == other.local
    }
}

impl Eq for Telephone {}

impl Telephone {
    /// Parse a telephone number, in international form (`+61 8 8123-4567`) or national
    /// form relative to `place` or `default_place` (`08 8123-4567`, `8123-4567`). The text
    /// after the number is returned as a comment. If `place` is given, the number must be
    /// in it.
    pub fn parse(
        text: &Text,
        world: &World,
        graph: &Graph,
        place: Option<Place>,
        default_place: Option<Place>,
    ) -> Result<(Telephone, Option<String>), SixxError> {
        let caps = TELEPHONE_RE
            .captures(text)
            .ok_or_else(|| SixxError::input(text, "malformed telephone number"))?;
        let whole = caps.get(0).map_or(0, |m| m.end());
        let at = |name: &str| {
            caps.name(name)
                .map(|m| (text.slice(m.range()), m.as_str().to_string()))
        };
        let (local_text, mut local) = at("local")
            .ok_or_else(|| SixxError::input(text, "malformed telephone number"))?;
        let comment = Some(text.tail(whole).trim().to_string()).filter(|c| !c.is_empty());
        let ccode = at("ccode");

        let country = match &ccode {
            None => place
                .or(default_place)
                .map(|p| p.country)
                .ok_or_else(|| SixxError::input(text, "missing country code"))?,
            Some((ccode_text, ccode)) => world.lookup_ccode(ccode).ok_or_else(|| {
                SixxError::input(ccode_text, format!("unknown country code {ccode}"))
            })?,
        };
        let info = graph
            .country(country)
            .ok_or_else(|| SixxError::invariant(format!("{country} is not a country")))?;

        let mut acode = at("acode");
        let mut area = None;
        if let Some(aprefix) = info.aprefix.as_deref() {
            let sprefix = info.sprefix.as_deref();
            match acode.take() {
                Some((acode_text, code)) => {
                    if let Some(sp) = sprefix {
                        if code.starts_with(sp) {
                            return Err(SixxError::input(
                                &acode_text,
                                format!("area code cannot start with {sp}"),
                            ));
                        }
                        if local.starts_with(sp) {
                            return Err(SixxError::input(
                                &acode_text,
                                format!("local number cannot start with {sp}"),
                            ));
                        }
                    }
                    if ccode.is_some() {
                        if code.starts_with(aprefix) {
                            return Err(SixxError::input(&acode_text, "area prefix not permitted"));
                        }
                        acode = Some((acode_text, code));
                    } else {
                        let Some(stripped) = code.strip_prefix(aprefix) else {
                            return Err(SixxError::input(text, "missing area prefix"));
                        };
                        if stripped.is_empty() {
                            return Err(SixxError::input(text, "missing area code"));
                        }
                        acode = Some((acode_text, stripped.to_string()));
                    }
                }
                // With a country code the local part may carry its own area code, as
                // mobile numbers do.
                None if ccode.is_some() => {}
                None => {
                    if let Some(stripped) = local.strip_prefix(aprefix) {
                        local = stripped.to_string();
                    } else if sprefix.is_some_and(|sp| local.starts_with(sp)) {
                    } else if let Some(a) = place.and_then(|p| p.area) {
                        area = Some(a);
                    } else if let Some(a) = default_place.and_then(|p| p.area) {
                        area = Some(a);
                    } else {
                        return Err(SixxError::input(&local_text, "missing area code"));
                    }
                    if let Some(a) = area.and_then(|a| graph.area(a)) {
                        acode = Some((local_text.clone(), a.acode.clone()));
                    }
                }
            }
        } else if let Some((acode_text, _)) = &acode {
            return Err(SixxError::input(
                acode_text,
                format!("{} does not have area codes", info.display_name()),
            ));
        }
        let acode = acode.map(|(_, code)| code);

        let place = match place {
            Some(place) => {
                if country != place.country {
                    return Err(SixxError::input(
                        text,
                        format!(
                            "telephone number must be in {}",
                            graph.place_node_name(&Place::in_country(place.country))
                        ),
                    ));
                }
                if let Some(required) = place.area.and_then(|a| graph.area(a)) {
                    if acode.as_deref() != Some(required.acode.as_str()) {
                        return Err(SixxError::input(
                            text,
                            format!(
                                "telephone number must be in {}",
                                graph.place_node_name(&place)
                            ),
                        ));
                    }
                }
                place
            }
            // An explicit area code places the number in the area that owns it.
            None => Place {
                country,
                area: area.or_else(|| {
                    acode
                        .as_deref()
                        .and_then(|code| world.lookup_acode(graph, country, code))
                }),
            },
        };
        Ok((
            Telephone {
                place,
                acode,
                local,
            },
            comment,
        ))
    }

    /// International form, e.g. `+61 8 8123-4567`.
    pub fn absolute(&self, graph: &Graph) -> String {
        let ccode = graph
            .country(self.place.country)
            .map(|c| c.ccode.as_str())
            .unwrap_or_default();
        let parts: Vec<&str> = [Some(ccode), self.acode.as_deref(), Some(self.local.as_str())]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        format!("+{}", parts.join(" "))
    }

    /// The number as dialled from `place`: the local number alone within the same area,
    /// with the trunk prefix and area code within the same country, and in international
    /// form otherwise.
    pub fn relative(&self, graph: &Graph, place: Option<Place>) -> String {
        let Some(place) = place.filter(|p| p.country == self.place.country) else {
            return self.absolute(graph);
        };
        let Some(country) = graph.country(place.country) else {
            return self.absolute(graph);
        };
        let aprefix = country.aprefix.as_deref().unwrap_or_default();
        match &self.acode {
            Some(acode) => {
                let same_area = place
                    .area
                    .and_then(|a| graph.area(a))
                    .is_some_and(|a| &a.acode == acode);
                if same_area {
                    self.local.clone()
                } else {
                    format!("{aprefix}{acode} {}", self.local)
                }
            }
            None => {
                let service = country
                    .sprefix
                    .as_deref()
                    .is_some_and(|sp| self.local.starts_with(sp));
                if service {
                    self.local.clone()
                } else {
                    format!("{aprefix}{}", self.local)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::NodeId, input::Loc};
    use test_log::test;

    fn t(s: &str) -> Text {
        Text::new(s, Some(Loc::new("t", 1, Some(1))))
    }

    struct Fixture {
        graph: Graph,
        world: World,
        au: NodeId,
        sa: NodeId,
        us: NodeId,
    }

    fn fixture() -> Fixture {
        let mut graph = Graph::new();
        let mut world = World::new();
        let au = world
            .add_country(&mut graph, &t("AU lang=en cc=61 ap=0 sp=1 \"Australia\""))
            .unwrap();
        let sa = world.add_area(&mut graph, au, &t("ac=8 \"SA\"")).unwrap();
        world.add_area(&mut graph, au, &t("ac=2 \"NSW\"")).unwrap();
        let us = world
            .add_country(&mut graph, &t("US lang=en cc=1 ap=1 \"U.S.A.\""))
            .unwrap();
        world
            .add_country(&mut graph, &t("NL lang=nl cc=31 \"Netherlands\""))
            .unwrap();
        Fixture {
            graph,
            world,
            au,
            sa,
            us,
        }
    }

    impl Fixture {
        fn parse(&self, s: &str, place: Option<Place>, default: Option<Place>) -> Result<(Telephone, Option<String>), SixxError> {
            Telephone::parse(&t(s), &self.world, &self.graph, place, default)
        }
    }

    #[test]
    fn international_numbers() {
        let f = fixture();
        let (tel, comment) = f.parse("+1 234 567-8901 wah", None, None).unwrap();
        assert_eq!(tel.place, Place::in_country(f.us));
        assert_eq!(tel.acode.as_deref(), Some("234"));
        assert_eq!(tel.local, "567-8901");
        assert_eq!(comment.as_deref(), Some("wah"));
        assert_eq!(tel.absolute(&f.graph), "+1 234 567-8901");

        let (tel, _) = f.parse("+61 411-123-456", None, None).unwrap();
        assert_eq!(tel.acode, None);
        assert_eq!(tel.relative(&f.graph, Some(Place::in_country(f.au))), "0411-123-456");
    }

    #[test]
    fn national_numbers_use_place() {
        let f = fixture();
        let sa = Place::in_area(f.au, f.sa);
        let (tel, _) = f.parse("08 8123-4567", None, Some(Place::in_country(f.au))).unwrap();
        assert_eq!(tel.acode.as_deref(), Some("8"));
        assert_eq!(tel.place, sa);
        assert_eq!(tel.relative(&f.graph, Some(sa)), "8123-4567");
        assert_eq!(tel.relative(&f.graph, Some(Place::in_country(f.au))), "08 8123-4567");
        assert_eq!(tel.relative(&f.graph, Some(Place::in_country(f.us))), "+61 8 8123-4567");

        let (tel, _) = f.parse("8123-4567", None, Some(sa)).unwrap();
        assert_eq!(tel.place, sa);
        assert_eq!(tel.acode.as_deref(), Some("8"));

        let (tel, _) = f.parse("131-151", None, Some(Place::in_country(f.au))).unwrap();
        assert_eq!(tel.relative(&f.graph, Some(sa)), "131-151");
    }

    #[test]
    fn parse_errors() {
        let f = fixture();
        let msg = |s: &str, place, default| f.parse(s, place, default).unwrap_err().message();
        let au = Some(Place::in_country(f.au));
        assert_eq!(msg("abc", None, None), "malformed telephone number");
        assert_eq!(msg("8123-4567", None, None), "missing country code");
        assert_eq!(msg("+99 8123-4567", None, None), "unknown country code 99");
        assert_eq!(msg("8 8123-4567", None, au), "missing area prefix");
        assert_eq!(msg("0 8123-4567", None, au), "missing area code");
        assert_eq!(msg("8123-4567", None, au), "missing area code");
        assert_eq!(msg("+61 08 8123-4567", None, None), "area prefix not permitted");
        assert_eq!(msg("+61 18 8123-4567", None, None), "area code cannot start with 1");
        assert_eq!(msg("+31 20 123-4567", None, None), "Netherlands does not have area codes");
        assert_eq!(
            msg("+1 234 567-8901", au, None),
            "telephone number must be in Australia"
        );
        assert_eq!(
            msg("02 9123-4567", Some(Place::in_area(f.au, f.sa)), None),
            "telephone number must be in SA"
        );
    }
}
