use crate::{
    entity::world::{Place, World},
    error::SixxError,
    graph::{Entity, Graph, NodeId},
    input::Text,
};

/// A residential or postal address: a list of lines and the place it is in. Two addresses
/// are equal when both their lines and their place are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub lines: Vec<String>,
    pub place: Place,
}

/// At least one cased character, and no lower case ones.
fn is_upper(s: &str) -> bool {
    s.chars().any(|c| c.is_uppercase()) && !s.chars().any(|c| c.is_lowercase())
}

impl Address {
    /// Parse an address. Lines are separated by `;` if the text contains one, otherwise by
    /// `,`. An upper case last line names the country; otherwise the country comes from
    /// `place`, then `default_place`. The last all-alphabetic word of the last remaining line
    /// is looked up as an area of the country. If `place` is given, the address must lie
    /// within it.
    pub fn parse(
        text: &Text,
        world: &World,
        graph: &Graph,
        place: Option<Place>,
        default_place: Option<Place>,
    ) -> Result<Address, SixxError> {
        let sep = if text.contains(';') { ';' } else { ',' };
        let mut lines: Vec<Text> = text
            .split(sep)
            .into_iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();
        let Some(last) = lines.last().cloned() else {
            return Err(SixxError::input(text, "address too short"));
        };
        let found = world
            .lookup_country(graph, &last)
            .map_err(|e| SixxError::input(&last, e.message()))?;
        let country = match (found, place, default_place) {
            (Some(country), _, _) => {
                lines.pop();
                country
            }
            (None, _, _) if is_upper(&last) => {
                return Err(SixxError::input(
                    &last,
                    format!("unknown country \"{last}\""),
                ))
            }
            (None, Some(place), _) => place.country,
            (None, None, Some(default)) => default.country,
            (None, None, None) => return Err(SixxError::input(text, "missing country")),
        };
        let Some(last) = lines.last() else {
            return Err(SixxError::input(text, "address too short"));
        };
        let area_word = last
            .split_whitespace()
            .into_iter()
            .filter(|word| word.chars().all(char::is_alphabetic))
            .last();
        let area = match area_word {
            Some(word) => world
                .country_area(graph, country, &word)
                .map_err(|e| SixxError::input(&word, e.message()))?,
            None => None,
        };
        if let Some(place) = place {
            if country != place.country {
                return Err(SixxError::input(
                    last,
                    format!(
                        "address must be in {}",
                        graph.place_node_name(&Place::in_country(place.country))
                    ),
                ));
            }
            if place.area.is_some() && area != place.area {
                return Err(SixxError::input(
                    last,
                    format!("address must be in {}", graph.place_node_name(&place)),
                ));
            }
        }
        Ok(Address {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            place: Place { country, area },
        })
    }

    /// The lines joined with `"; "`, optionally followed by the country in upper case.
    pub fn as_string(&self, graph: &Graph, with_country: bool) -> String {
        let mut lines = self.lines.clone();
        if with_country {
            lines.push(
                graph
                    .place_node_name(&Place::in_country(self.place.country))
                    .to_uppercase(),
            );
        }
        lines.join("; ")
    }

    /// The address as written for a reader in `place`: the country is omitted when it is
    /// the reader's own.
    pub fn relative(&self, graph: &Graph, place: Option<Place>) -> String {
        let local = place.is_some_and(|p| p.country == self.place.country);
        self.as_string(graph, !local)
    }

    /// An address is referred to by its first line.
    pub fn matches(&self, text: &str) -> bool {
        self.lines.first().is_some_and(|line| line == text)
    }
}

/// Add a Residence or PostalAddress node, placed and linked by `Is_in` to its place.
pub fn add_address(graph: &mut Graph, entity: Entity) -> Result<NodeId, SixxError> {
    let place = entity
        .as_address()
        .map(|address| address.place)
        .ok_or_else(|| SixxError::invariant(format!("{} is not an address", entity.node_type())))?;
    let id = graph.add_placed_node(entity, Some(place))?;
    graph.add_placed_link(id, place.node(), Entity::IsIn, Some(place), None)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Loc;
    use test_log::test;

    fn t(s: &str) -> Text {
        Text::new(s, Some(Loc::new("a", 1, Some(1))))
    }

    fn world() -> (Graph, World, NodeId, NodeId) {
        let mut graph = Graph::new();
        let mut world = World::new();
        world
            .add_country(&mut graph, &t("ES lang=es cc=34 en:\"Spain\" es:\"España\""))
            .unwrap();
        let au = world
            .add_country(&mut graph, &t("AU lang=en cc=61 ap=0 \"Australia\""))
            .unwrap();
        let sa = world
            .add_area(&mut graph, au, &t("ac=8 \"SA\" / \"South Australia\""))
            .unwrap();
        world.add_area(&mut graph, au, &t("ac=2 \"NSW\"")).unwrap();
        (graph, world, au, sa)
    }

    #[test]
    fn parse_with_country_line() {
        let (graph, world, au, sa) = world();
        let a = Address::parse(
            &t("50 Clifton St, Maylands SA 5069, AUSTRALIA"),
            &world,
            &graph,
            None,
            None,
        )
        .unwrap();
        assert_eq!(a.lines, vec!["50 Clifton St", "Maylands SA 5069"]);
        assert_eq!(a.place, Place::in_area(au, sa));
        assert_eq!(
            a.as_string(&graph, true),
            "50 Clifton St; Maylands SA 5069; AUSTRALIA"
        );
        assert_eq!(a.relative(&graph, Some(Place::in_country(au))), "50 Clifton St; Maylands SA 5069");
        assert!(a.matches("50 Clifton St"));

        let b = Address::parse(
            &t("50 Clifton St, Maylands SA 5069"),
            &world,
            &graph,
            Some(Place::in_area(au, sa)),
            None,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_errors() {
        let (graph, world, au, sa) = world();
        let err = Address::parse(
            &t("C/ Bienandanza, 6; 45216 Carranque Toledo; ESPAÑA"),
            &world,
            &graph,
            Some(Place::in_country(au)),
            None,
        )
        .unwrap_err();
        assert_eq!(err.message(), "address must be in Australia");

        let err = Address::parse(
            &t("1A Campbell St, Balmain NSW 2041"),
            &world,
            &graph,
            Some(Place::in_area(au, sa)),
            None,
        )
        .unwrap_err();
        assert_eq!(err.message(), "address must be in SA");

        let err = Address::parse(&t("1 Main St, NARNIA"), &world, &graph, None, None).unwrap_err();
        assert_eq!(err.message(), "unknown country \"NARNIA\"");
        assert_eq!(err.loc().and_then(|l| l.column), Some(12));

        let err = Address::parse(&t("1 Main St"), &world, &graph, None, None).unwrap_err();
        assert_eq!(err.message(), "missing country");

        let err = Address::parse(&t("AUSTRALIA"), &world, &graph, None, None).unwrap_err();
        assert_eq!(err.message(), "address too short");
    }

    #[test]
    fn default_place_supplies_country_only() {
        let (graph, world, au, sa) = world();
        let a = Address::parse(
            &t("C/ Bienandanza, 6; 45216 SA; ESPAÑA"),
            &world,
            &graph,
            None,
            Some(Place::in_area(au, sa)),
        )
        .unwrap();
        assert_ne!(a.place.country, au);
        assert_eq!(a.place.area, None);
    }
}
