mod common;

use common::{compdat, deck, i, kw, rec, s, start, wconprod, welspecs};
use rsched::well::WellStatus;
use rsched::{
    DeckItem, DeckKeyword, DeckValue, ParseContext, Schedule, SummaryState, UnitSystem,
};

fn actionx(name: &str, max_run: i64, condition: &str, body: Vec<DeckKeyword>) -> Vec<DeckKeyword> {
    let mut keywords = vec![kw(
        "ACTIONX",
        vec![
            rec(vec![s("NAME", name), i("NUM", max_run), DeckItem::defaulted("MIN_WAIT", DeckValue::Double(0.0))]),
            rec(vec![s("CONDITION", condition)]),
        ],
    )];
    keywords.extend(body);
    keywords.push(kw("ENDACTIO", Vec::new()));
    keywords
}

fn shut_matched() -> DeckKeyword {
    kw(
        "WELOPEN",
        vec![rec(vec![
            s("WELL", "?"),
            s("STATUS", "SHUT"),
            DeckItem::defaulted("I", DeckValue::Int(0)),
            DeckItem::defaulted("J", DeckValue::Int(0)),
            DeckItem::defaulted("K", DeckValue::Int(0)),
        ])],
    )
}

fn base_deck(action: Vec<DeckKeyword>) -> Vec<DeckKeyword> {
    let mut keywords = vec![
        welspecs("OP-1", "G1"),
        welspecs("OP-2", "G1"),
        compdat("OP-1", 1, 1, "OPEN"),
        compdat("OP-2", 1, 1, "OPEN"),
        wconprod("OP-1", "OPEN", 1000.0),
        wconprod("OP-2", "OPEN", 500.0),
    ];
    keywords.extend(action);
    keywords
}

fn build(keywords: Vec<DeckKeyword>) -> Schedule {
    Schedule::from_deck(
        start(),
        &deck(keywords),
        UnitSystem::Metric,
        &ParseContext::lenient(),
    )
    .unwrap()
}

#[test]
fn matched_wells_flow_into_the_replayed_body() {
    let mut schedule = build(base_deck(actionx(
        "HIWCT",
        0,
        "WWCT '*' > 0.5",
        vec![shut_matched()],
    )));

    let mut summary = SummaryState::new(start());
    summary.update_well_var("OP-1", "WWCT", 0.7);
    summary.update_well_var("OP-2", "WWCT", 0.2);

    let updates = schedule.eval_actions(0, &mut summary).unwrap();
    assert_eq!(updates.len(), 1);
    let (name, update) = &updates[0];
    assert_eq!(name, "HIWCT");
    assert_eq!(update.affected_wells, vec!["OP-1".to_string()]);

    // Only the well past the threshold shut.
    assert_eq!(schedule.get_well("OP-1", 0).unwrap().status, WellStatus::Shut);
    assert_eq!(schedule.get_well("OP-2", 0).unwrap().status, WellStatus::Open);
}

#[test]
fn scalar_false_conjunct_empties_the_match() {
    let mut schedule = build(base_deck(actionx(
        "GATED",
        0,
        "WWCT '*' > 0.5 AND FWPT > 1000",
        vec![shut_matched()],
    )));

    let mut summary = SummaryState::new(start());
    summary.update_well_var("OP-1", "WWCT", 0.7);
    summary.update("FWPT", 10.0);

    let updates = schedule.eval_actions(0, &mut summary).unwrap();
    assert!(updates.is_empty());
    assert_eq!(schedule.get_well("OP-1", 0).unwrap().status, WellStatus::Open);
}

#[test]
fn max_run_and_rearming() {
    let mut schedule = build(base_deck(actionx(
        "ONCE",
        1,
        "WWCT '*' > 0.5",
        vec![shut_matched()],
    )));

    let mut summary = SummaryState::new(start());
    summary.update_well_var("OP-1", "WWCT", 0.7);

    let first = schedule.eval_actions(0, &mut summary).unwrap();
    assert_eq!(first.len(), 1);
    // Exhausted: the same condition no longer triggers.
    let second = schedule.eval_actions(0, &mut summary).unwrap();
    assert!(second.is_empty());
}

#[test]
fn illegal_keyword_inside_action_follows_error_policy() {
    let keywords = || {
        vec![
            welspecs("OP-1", "G1"),
            kw(
                "ACTIONX",
                vec![
                    rec(vec![s("NAME", "BAD"), i("NUM", 1)]),
                    rec(vec![s("CONDITION", "FWPT > 1")]),
                ],
            ),
            // WELSPECS is not replayable inside an action block.
            welspecs("OP-2", "G1"),
            shut_matched(),
            kw("ENDACTIO", Vec::new()),
        ]
    };

    // Default and lenient policies skip the keyword and keep the rest
    // of the body.
    let schedule = Schedule::from_deck(
        start(),
        &deck(keywords()),
        UnitSystem::Metric,
        &ParseContext::lenient(),
    )
    .unwrap();
    let actions = schedule.actions(0);
    let action = actions.get("BAD").unwrap();
    assert_eq!(action.keywords.len(), 1);
    assert_eq!(action.keywords[0].name, "WELOPEN");

    // A strict policy escalates it to a load failure.
    let result = Schedule::from_deck(
        start(),
        &deck(keywords()),
        UnitSystem::Metric,
        &ParseContext::strict(),
    );
    assert!(result.is_err());
}

#[test]
fn unterminated_action_is_structural() {
    let keywords = vec![
        welspecs("OP-1", "G1"),
        kw(
            "ACTIONX",
            vec![
                rec(vec![s("NAME", "OPEN-ENDED"), i("NUM", 1)]),
                rec(vec![s("CONDITION", "FWPT > 1")]),
            ],
        ),
        shut_matched(),
    ];
    let result = Schedule::from_deck(
        start(),
        &deck(keywords),
        UnitSystem::Metric,
        &ParseContext::lenient(),
    );
    assert!(result.is_err());
}

#[test]
fn condition_source_survives_capture() {
    let schedule = build(base_deck(actionx(
        "KEEP",
        0,
        "WWCT 'OP-1' > 0.5",
        vec![shut_matched()],
    )));
    let actions = schedule.actions(0);
    let action = actions.get("KEEP").unwrap();
    assert_eq!(action.condition_source, "WWCT 'OP-1' > 0.5");
    assert_eq!(action.keywords.len(), 1);
    assert_eq!(action.keywords[0].name, "WELOPEN");
}
