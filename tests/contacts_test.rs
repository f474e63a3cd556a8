use enumset::EnumSet;
use tempfile::tempdir;
use test_log::test;

use sixx_core::{
    config::{ConfigProvider, TomlConfigProvider},
    entity::Telephone,
    graph::{
        predicate::{outgoing, NodePredicate},
        Entity,
    },
    model::Lookup,
    report::{self, ReportOptions},
    sort::{cull_references, SortItem, DEFAULT_HORIZON},
    text::SortStr,
    Model, NodeId, NodeType, SixxError,
};

mod common;
use common::{compile, compile_paths, create_contacts_dir};

const WORLD: &str = "\
%country AU lang=en cc=61 ap=0 \"Australia\"
%area ac=8 \"South Australia\" / \"SA\"
%area ac=2 \"New South Wales\" / \"NSW\"
";

fn with_world(source: &str) -> Result<Model, SixxError> {
    compile(&format!("{WORLD}\n{source}"))
}

fn only(model: &Model, node_type: NodeType) -> NodeId {
    let ids = model.registered(EnumSet::only(node_type));
    assert_eq!(ids.len(), 1, "one {node_type} expected");
    ids[0]
}

fn found(model: &Model, node_type: NodeType, name: &str) -> NodeId {
    match model.find(node_type, name) {
        Lookup::Found(id) => id,
        other => panic!("{node_type} {name:?}: {other:?}"),
    }
}

#[test]
fn company_and_worker_end_to_end() {
    let model = with_world(
        "fn Jane\nln Smith\nwork John's Pty Ltd\n\nco John's Pty Ltd\nin AU\nph 08 1234-5678\n",
    )
    .unwrap();
    let company = only(&model, NodeType::Company);
    let jane = only(&model, NodeType::Person);
    assert_eq!(model.graph.display_name(company, "en"), "John's Pty Ltd");
    assert_eq!(model.graph.display_name(jane, "en"), "Jane Smith");

    let works_at = model.graph.links(jane, outgoing() & NodeType::WorksAt);
    assert_eq!(works_at.len(), 1);
    assert_eq!(model.graph.node2(works_at[0]), Some(company));

    let tel = model.graph.nodes(company, outgoing() & NodeType::HasPhone);
    assert_eq!(tel.len(), 1);
    let Entity::Telephone(Telephone { place, .. }) = model.graph.entity(tel[0]) else {
        panic!("not a telephone");
    };
    let au = model.lookup_place("AU").unwrap();
    assert_eq!(place.country, au.country);
    assert_eq!(place.area, None);
}

#[test]
fn references_resolve_in_any_order() {
    let model = with_world(
        "fn Jo\nln Bloggs\nwith Al Young\n\nfn Al\nln Young\nwork Acme\n\nco Acme\nwith Jo Bloggs\n",
    )
    .unwrap();
    let jo = found(&model, NodeType::Person, "Jo Bloggs");
    let al = found(&model, NodeType::Person, "Al Young");
    let acme = found(&model, NodeType::Company, "Acme");
    assert_eq!(model.graph.nodes(jo, outgoing() & NodeType::With), vec![al]);
    assert_eq!(model.graph.nodes(al, outgoing() & NodeType::WorksAt), vec![acme]);
    assert_eq!(model.graph.nodes(acme, outgoing() & NodeType::With), vec![jo]);
}

#[test]
fn unresolvable_references_fail_in_input_order() {
    let err = compile("fn Jo\nwork Nowhere\n\nfn Al\nwork Neverland\n").unwrap_err();
    assert_eq!(err.message(), "no such Organisation/Residence \"Nowhere\"");
    assert_eq!(err.loc().map(|l| l.line), Some(2));
    assert!(err.to_string().contains("Nowhere"));
}

#[test]
fn mutual_references_without_an_order_fail() {
    let source = "fn Jo\nln Bloggs\nwork Al Young\n\nfn Al\nln Young\nwork Jo Bloggs\n";
    for _ in 0..2 {
        let err = compile(source).unwrap_err();
        assert_eq!(err.message(), "no such Organisation/Residence \"Al Young\"");
        assert_eq!(err.loc().map(|l| l.line), Some(3));
    }
}

#[test]
fn ambiguous_reference_fails() {
    let err = compile("co Acme\n\nco Acme\n\nfn Jo\nwork Acme\n").unwrap_err();
    assert_eq!(err.message(), "ambiguous Organisation/Residence \"Acme\"");
}

#[test]
fn unread_lines_are_spurious() {
    let err = compile("co Acme\nwww http://acme.example\nzz top\n").unwrap_err();
    assert_eq!(err.message(), "spurious line");
    assert_eq!(err.loc().map(|l| l.line), Some(3));
}

#[test]
fn residence_beats_phone_for_place() {
    let model = with_world(
        "fn Jo\nln Bloggs\nad 1 Main St, Adelaide SA, AUSTRALIA\nph +61 2 9123-4567\n\n\
         fn Al\nln Young\nph +61 8 8123-4567\nph +61 2 9123-4567\n",
    )
    .unwrap();
    let jo = found(&model, NodeType::Person, "Jo Bloggs");
    let place = model.graph.only_place(jo).unwrap();
    assert_eq!(model.graph.place_node_name(&place), "South Australia");

    let al = found(&model, NodeType::Person, "Al Young");
    assert_eq!(model.graph.only_place(al), None);
}

#[test]
fn mobile_numbers_do_not_place() {
    let source = "co Acme\nph +61 8 8123-4567\nmob +61 412 345-678\n\n\
                  =\nph +61 8 8234-5678\nmob +61 413 345-678\n+\nfn Jo\nln Bloggs\n";
    let model = with_world(source).unwrap();
    let acme = only(&model, NodeType::Company);
    let family = only(&model, NodeType::Family);
    for id in [acme, family] {
        let place = model.graph.only_place(id).unwrap();
        assert_eq!(model.graph.place_node_name(&place), "South Australia");
    }

    let mobile_only = with_world("co Acme\nmob +61 412 345-678\n").unwrap();
    let acme = only(&mobile_only, NodeType::Company);
    assert_eq!(mobile_only.graph.only_place(acme), None);
}

#[test]
fn cull_references_respects_prefix_and_horizon() {
    let model = with_world("co Aa\n\nco Bb\n\nco Cc\n").unwrap();
    let ids = model.registered(EnumSet::only(NodeType::Company));
    let (x, y) = (ids[0], ids[1]);
    let item = |node, key: &str, single| SortItem::new(node, SortStr::new(key), single, SortStr::new("x"));

    let mut near = vec![
        item(x, "abc one", false),
        item(y, "abc two", true),
        item(y, "abc three", false),
        item(x, "abc four", false),
    ];
    cull_references(&mut near, DEFAULT_HORIZON);
    assert!(near[0].node.is_some());
    assert!(near[3].node.is_none());

    let mut far: Vec<SortItem> = (0..11)
        .map(|i| match i {
            0 | 10 => item(x, &format!("abc {i}"), false),
            5..=9 => item(y, &format!("xyz {i}"), false),
            _ => item(ids[2], &format!("abc {i}"), true),
        })
        .collect();
    cull_references(&mut far, DEFAULT_HORIZON);
    assert!(far[10].node.is_some());
}

#[test]
fn directory_input_and_config_drive_reports() {
    let temp_dir = tempdir().unwrap();
    let dir = create_contacts_dir(
        &temp_dir,
        &[
            ("00-world.sixx", WORLD),
            ("people.sixx", "fn Jo\nln Bloggs\nwork Acme\nem jo@example.com\n"),
            ("orgs.txt", "co Acme\nin SA\nph 8123-4567\n"),
        ],
    );
    let model = compile_paths(&[&dir]).unwrap();
    assert_eq!(model.registered(NodeType::Person | NodeType::Company).len(), 2);

    let config_path = temp_dir.path().join("sixx.toml");
    std::fs::write(&config_path, "home = \"SA\"\n").unwrap();
    let config = TomlConfigProvider::new(config_path).get_config().unwrap();
    let opts = ReportOptions::from_config(&config, &model).unwrap();

    let select = report::default_selection();
    let phones = report::phone(&model, &select, &opts).unwrap();
    assert!(phones.contains("  phone: 8123-4567 (work, Acme)\n"), "{phones}");
    let emails = report::email(&model, &select, &opts).unwrap();
    assert!(emails.contains("<jo@example.com>"), "{emails}");

    let only_acme = NodePredicate::new(move |g, n| g.node_type(n) == NodeType::Company);
    let dump = report::dump(&model, &only_acme, &opts).unwrap();
    assert!(dump.starts_with("Acme\n"), "{dump}");
    assert!(!dump.contains("works at"), "{dump}");
}
