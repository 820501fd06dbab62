#![no_main]

use arbitrary::Arbitrary;
use famgrid_core::{FamilyGraph, Gender, ParentKind, PartnerKind, Partnership, Person, PersonId};
use famgrid_layout::{DisplayOptions, LayoutRequest, build_full_tree};
use libfuzzer_sys::fuzz_target;

const PEOPLE: u8 = 16;

#[derive(Debug, Arbitrary)]
struct Input {
    genders: Vec<u8>,
    births: Vec<(u8, u16)>,
    parent_links: Vec<(u8, Option<u8>, Option<u8>, u8)>,
    partnerships: Vec<(u8, u8, u8, bool, bool)>,
    focal: u8,
    marked: Option<u8>,
    depths: (u8, u8, u8),
    flip: bool,
    display: (bool, bool, bool),
}

fn id(n: u8) -> String {
    // Ids past PEOPLE never get a record, so they dangle.
    format!("p{}", n % (PEOPLE + 4))
}

fn build_graph(input: &Input) -> FamilyGraph {
    let mut graph: FamilyGraph = (0..PEOPLE)
        .map(|n| {
            let gender = match input.genders.get(usize::from(n)).map(|g| g % 3) {
                Some(0) => Gender::Male,
                Some(1) => Gender::Female,
                _ => Gender::Other,
            };
            Person::new(&id(n), &id(n), gender).with_index(u32::from(n))
        })
        .collect();

    for &(who, year) in input.births.iter().take(32) {
        if let Some(person) = graph.get_mut(&id(who)) {
            person.birth = Some(format!("{:08}", u32::from(year) * 7919 % 100_000_000));
        }
    }

    let kinds = [
        ParentKind::Biological,
        ParentKind::Adoptive,
        ParentKind::Foster,
        ParentKind::Step,
        ParentKind::Guardian,
        ParentKind::Unspecified,
    ];
    for &(child, mother, father, kind) in input.parent_links.iter().take(64) {
        let mother = mother.map(id);
        let father = father.map(id);
        graph.link_parents(
            &id(child),
            mother.as_deref(),
            father.as_deref(),
            kinds[usize::from(kind) % kinds.len()],
        );
    }

    let partner_kinds = [
        PartnerKind::Married,
        PartnerKind::Separated,
        PartnerKind::Divorced,
        PartnerKind::Engaged,
        PartnerKind::Dating,
    ];
    for &(a, b, kind, mutual, primary) in input.partnerships.iter().take(64) {
        let details = Partnership::of_kind(partner_kinds[usize::from(kind) % partner_kinds.len()])
            .with_marriage(&format!("19{:02}0000", kind % 100));
        if mutual {
            graph.link_partners(&id(a), &id(b), details);
        } else if let Some(person) = graph.get_mut(&id(a)) {
            person.partners.insert(PersonId::from(id(b)), details);
        }
        if primary {
            graph.set_spouses(&id(a), &id(b));
        }
    }
    graph
}

fuzz_target!(|input: Input| {
    let graph = build_graph(&input);
    let (ancestors, descendants, siblings) = input.depths;
    let mut request = LayoutRequest::new(id(input.focal % PEOPLE))
        .depths(ancestors % 8, descendants % 8, siblings % 8)
        .flipped(input.flip)
        .display(DisplayOptions {
            marriage_dates: input.display.0,
            divorce_dates: input.display.1,
            relationship_dates: input.display.2,
        });
    request.marked = input.marked.map(|m| PersonId::from(id(m)));

    let layout = build_full_tree(&graph, &request).expect("focal is always in the graph");

    // Post-conditions that must always hold:
    let focal: Vec<_> = layout.entities.values().filter(|e| e.focal).collect();
    assert_eq!(focal.len(), 1, "exactly one focal box");
    assert!(focal[0].x.abs() < 1e-9 && focal[0].y == 0, "focal off origin");

    let entities: Vec<_> = layout.entities.values().collect();
    for (i, a) in entities.iter().enumerate() {
        for b in &entities[i + 1..] {
            assert!(
                a.y != b.y || (a.x - b.x).abs() >= 1.0 - 1e-6,
                "boxes overlap on row {}",
                a.y
            );
        }
    }
});
