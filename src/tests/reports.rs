use crate::{
    graph::NodeType,
    query::parse_predicate,
    report::{default_selection, dump, phone, ReportOptions},
    tests::helpers::{compile, find},
};
use enumset::EnumSet;
use test_log::test;

const FAMILY: &str = "\
=
in SA
ph 8234-5678
+
fn Jo
ln Bloggs
+
fn Al
ln Bloggs
-
fn Kid
ln Bloggs

fn Cy
ln Young
in NZ
ph +64 9 555-0101
";

#[test]
fn dependants_are_listed_under_their_family() {
    let model = compile(FAMILY).unwrap();
    let families = model.registered(EnumSet::only(NodeType::Family));
    assert_eq!(families.len(), 1);
    let heading = model.graph.display_name(families[0], "en");

    let out = dump(&model, &default_selection(), &ReportOptions::default()).unwrap();
    assert!(out.lines().any(|l| l == heading), "{out}");
    assert!(out.contains("  Kid Bloggs (dependant)\n"), "{out}");
    for line in out.lines().filter(|l| l.contains("Kid")) {
        assert!(line.starts_with(' ') || line.contains("-> see"), "{line}");
    }
}

#[test]
fn phone_list_folds_family_into_heads() {
    let model = compile(FAMILY).unwrap();
    let family = model.registered(EnumSet::only(NodeType::Family))[0];
    let name = model.graph.display_name(family, "en");

    let out = phone(&model, &default_selection(), &ReportOptions::default()).unwrap();
    assert!(!out.lines().any(|l| l == name), "{out}");
    assert!(out.contains(&format!("  phone: +61 8 8234-5678 ({name})\n")), "{out}");
    assert!(out.contains("Cy Young\n  phone: +64 9 555-0101\n"), "{out}");
}

#[test]
fn place_selection_follows_derived_places() {
    let model = compile(FAMILY).unwrap();
    let cy = find(&model, NodeType::Person, "Cy Young");
    assert!(model.graph.only_place(cy).is_some());

    let nz = parse_predicate(&model, &["in:NZ"]).unwrap();
    let out = dump(&model, &nz, &ReportOptions::default()).unwrap();
    assert!(out.starts_with("Cy Young\n"), "{out}");
    assert!(!out.contains("Bloggs"), "{out}");
}
