mod common;

use common::{compdat, deck, kw, rec, s, start, wconprod, welspecs};
use rsched::{DeckItem, DeckValue, ParseContext, Schedule, SummaryState, UnitSystem};

fn udq_keyword(entries: &[(&str, &str, &str)]) -> rsched::DeckKeyword {
    let records = entries
        .iter()
        .map(|(action, quantity, data)| {
            rec(vec![
                s("ACTION", action),
                s("QUANTITY", quantity),
                DeckItem::list(
                    "DATA",
                    data.split_whitespace()
                        .map(|t| DeckValue::String(t.to_string()))
                        .collect(),
                ),
            ])
        })
        .collect();
    kw("UDQ", records)
}

fn producer_deck(udq: rsched::DeckKeyword) -> Schedule {
    Schedule::from_deck(
        start(),
        &deck(vec![
            welspecs("OP-1", "G1"),
            welspecs("OP-2", "G1"),
            compdat("OP-1", 1, 1, "OPEN"),
            compdat("OP-2", 1, 1, "OPEN"),
            wconprod("OP-1", "OPEN", 1000.0),
            wconprod("OP-2", "OPEN", 500.0),
            udq,
        ]),
        UnitSystem::Metric,
        &ParseContext::lenient(),
    )
    .unwrap()
}

fn summary() -> SummaryState {
    let mut summary = SummaryState::new(start());
    summary.update_well_var("OP-1", "WOPR", 100.0);
    summary.update_well_var("OP-2", "WOPR", 40.0);
    summary.update_well_var("OP-1", "WWPR", 25.0);
    summary.update_well_var("OP-2", "WWPR", 10.0);
    summary
}

#[test]
fn define_evaluates_per_well_arithmetic() {
    let schedule = producer_deck(udq_keyword(&[(
        "DEFINE",
        "WUWCT",
        "WWPR / ( WWPR + WOPR )",
    )]));
    let mut summary = summary();
    schedule.update_udq(0, &mut summary).unwrap();

    assert!((summary.get_well_var("OP-1", "WUWCT").unwrap() - 0.2).abs() < 1e-12);
    assert!((summary.get_well_var("OP-2", "WUWCT").unwrap() - 0.2).abs() < 1e-12);
}

#[test]
fn assign_broadcasts_and_later_defines_see_earlier_results() {
    let schedule = producer_deck(udq_keyword(&[
        ("ASSIGN", "WUBASE", "2.0"),
        ("DEFINE", "WUDOUBLE", "WUBASE * WOPR"),
    ]));
    let mut summary = summary();
    schedule.update_udq(0, &mut summary).unwrap();

    assert!((summary.get_well_var("OP-1", "WUDOUBLE").unwrap() - 200.0).abs() < 1e-12);
    assert!((summary.get_well_var("OP-2", "WUDOUBLE").unwrap() - 80.0).abs() < 1e-12);
}

#[test]
fn division_by_zero_leaves_the_member_undefined() {
    let schedule = producer_deck(udq_keyword(&[(
        "DEFINE",
        "WURATIO",
        "WOPR / WWPR",
    )]));
    let mut summary = summary();
    summary.update_well_var("OP-2", "WWPR", 0.0);
    schedule.update_udq(0, &mut summary).unwrap();

    assert!((summary.get_well_var("OP-1", "WURATIO").unwrap() - 4.0).abs() < 1e-12);
    // Undefined members are not written into the summary.
    assert!(summary.get_well_var("OP-2", "WURATIO").is_none());
}

#[test]
fn aggregates_collapse_well_sets_to_field_scalars() {
    let schedule = producer_deck(udq_keyword(&[(
        "DEFINE",
        "FUTOTAL",
        "SUM ( WOPR )",
    )]));
    let mut summary = summary();
    schedule.update_udq(0, &mut summary).unwrap();

    assert!((summary.get("FUTOTAL").unwrap() - 140.0).abs() < 1e-12);
}

#[test]
fn selector_restricts_the_well_set() {
    let schedule = producer_deck(udq_keyword(&[(
        "DEFINE",
        "FUONE",
        "SUM ( WOPR 'OP-1' )",
    )]));
    let mut summary = summary();
    schedule.update_udq(0, &mut summary).unwrap();

    assert!((summary.get("FUONE").unwrap() - 100.0).abs() < 1e-12);
}

#[test]
fn comparison_operators_yield_indicator_values() {
    let schedule = producer_deck(udq_keyword(&[(
        "DEFINE",
        "WUHIGH",
        "WOPR > 50",
    )]));
    let mut summary = summary();
    schedule.update_udq(0, &mut summary).unwrap();

    assert!((summary.get_well_var("OP-1", "WUHIGH").unwrap() - 1.0).abs() < 1e-12);
    assert!((summary.get_well_var("OP-2", "WUHIGH").unwrap() - 0.0).abs() < 1e-12);
}

#[test]
fn unary_functions_respect_domains() {
    let schedule = producer_deck(udq_keyword(&[
        ("DEFINE", "WUSQRT", "SQRT ( WOPR )"),
        ("DEFINE", "WULOG", "LN ( WOPR - 100 )"),
    ]));
    let mut summary = summary();
    schedule.update_udq(0, &mut summary).unwrap();

    assert!((summary.get_well_var("OP-1", "WUSQRT").unwrap() - 10.0).abs() < 1e-12);
    // ln(0) is out of domain: undefined, not an error.
    assert!(summary.get_well_var("OP-1", "WULOG").is_none());
}

#[test]
fn units_are_recorded_per_quantity() {
    let schedule = producer_deck(udq_keyword(&[
        ("DEFINE", "WUWCT", "WWPR / ( WWPR + WOPR )"),
        ("UNITS", "WUWCT", "''"),
    ]));
    let config = schedule.state().udq.get(0).cloned().unwrap();
    assert_eq!(config.unit_of("WUWCT"), Some("''"));
    assert_eq!(config.len(), 1);
}
