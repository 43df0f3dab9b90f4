mod common;

use common::{
    compdat, d, dates, deck, i, kw, rec, s, start, tstep, wconinje, wconprod, welspecs,
};
use rsched::well::{ConnectionState, ProducerCMode, WellStatus};
use rsched::{DeckItem, DeckValue, ParseContext, Schedule, UnitSystem};

fn build(keywords: Vec<rsched::DeckKeyword>) -> Schedule {
    Schedule::from_deck(
        start(),
        &deck(keywords),
        UnitSystem::Metric,
        &ParseContext::lenient(),
    )
    .unwrap()
}

#[test]
fn settings_persist_until_changed() {
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        compdat("OP-1", 1, 3, "OPEN"),
        wconprod("OP-1", "OPEN", 1000.0),
        dates(1, "FEB", 2020),
        dates(1, "MAR", 2020),
        wconprod("OP-1", "OPEN", 500.0),
        dates(1, "APR", 2020),
    ]);

    // Metric deck: 1000 sm3/day becomes sm3/s.
    let day = 86_400.0;
    assert!((schedule.get_well("OP-1", 0).unwrap().production.oil_rate - 1000.0 / day).abs() < 1e-12);
    assert!((schedule.get_well("OP-1", 1).unwrap().production.oil_rate - 1000.0 / day).abs() < 1e-12);
    assert!((schedule.get_well("OP-1", 2).unwrap().production.oil_rate - 500.0 / day).abs() < 1e-12);
    assert!((schedule.get_well("OP-1", 3).unwrap().production.oil_rate - 500.0 / day).abs() < 1e-12);
}

#[test]
fn identical_rewrite_stores_no_snapshot() {
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        compdat("OP-1", 1, 3, "OPEN"),
        wconprod("OP-1", "OPEN", 1000.0),
        dates(1, "FEB", 2020),
        // Same record again: must not create a new snapshot.
        wconprod("OP-1", "OPEN", 1000.0),
        dates(1, "MAR", 2020),
        wconprod("OP-1", "OPEN", 500.0),
    ]);

    let history = schedule.state().well_history("OP-1").unwrap();
    // One change point for the step-0 setup, one for the real edit at
    // step 2. The identical rewrite at step 1 stores nothing.
    assert_eq!(history.num_changes(), 2);
    assert_eq!(history.first_step(), Some(0));
}

#[test]
fn unknown_well_and_pre_creation_steps_fail() {
    let schedule = build(vec![
        dates(1, "FEB", 2020),
        welspecs("OP-1", "G1"),
        dates(1, "MAR", 2020),
    ]);

    assert!(schedule.get_well("NOSUCH", 0).is_err());
    assert!(schedule.get_well("OP-1", 0).is_err());
    assert!(schedule.get_well("OP-1", 1).is_ok());
}

#[test]
fn time_map_mixes_dates_and_tstep() {
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        dates(11, "JAN", 2020),
        tstep(&[10.0, 20.0]),
    ]);

    assert_eq!(schedule.num_steps(), 4);
    assert!((schedule.time_map().days(1).unwrap() - 10.0).abs() < 1e-9);
    assert!((schedule.time_map().days(2).unwrap() - 20.0).abs() < 1e-9);
    assert!((schedule.time_map().days(3).unwrap() - 40.0).abs() < 1e-9);
}

#[test]
fn welopen_well_form_versus_connection_form() {
    let well_form = kw(
        "WELOPEN",
        vec![rec(vec![
            s("WELL", "OP-1"),
            s("STATUS", "SHUT"),
            DeckItem::defaulted("I", DeckValue::Int(0)),
            DeckItem::defaulted("J", DeckValue::Int(0)),
            DeckItem::defaulted("K", DeckValue::Int(0)),
        ])],
    );
    let connection_form = kw(
        "WELOPEN",
        vec![rec(vec![
            s("WELL", "OP-2"),
            s("STATUS", "SHUT"),
            DeckItem::defaulted("I", DeckValue::Int(0)),
            DeckItem::defaulted("J", DeckValue::Int(0)),
            i("K", 2),
        ])],
    );
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        welspecs("OP-2", "G1"),
        compdat("OP-1", 1, 3, "OPEN"),
        compdat("OP-2", 1, 3, "OPEN"),
        wconprod("OP-1", "OPEN", 100.0),
        wconprod("OP-2", "OPEN", 100.0),
        well_form,
        connection_form,
    ]);

    // All items after WELL/STATUS defaulted: the whole well shuts.
    assert_eq!(schedule.get_well("OP-1", 0).unwrap().status, WellStatus::Shut);

    // A set K: only the matching connection shuts.
    let op2 = schedule.get_well("OP-2", 0).unwrap();
    assert_eq!(op2.status, WellStatus::Open);
    let states: Vec<ConnectionState> = op2.connections.iter().map(|c| c.state).collect();
    assert_eq!(
        states,
        vec![
            ConnectionState::Open,
            ConnectionState::Shut,
            ConnectionState::Open
        ]
    );
}

#[test]
fn all_connections_shut_shuts_the_well_at_step_close() {
    let shut_all = kw(
        "WELOPEN",
        vec![rec(vec![
            s("WELL", "OP-1"),
            s("STATUS", "SHUT"),
            DeckItem::defaulted("I", DeckValue::Int(0)),
            DeckItem::defaulted("J", DeckValue::Int(0)),
            i("K", 1),
        ])],
    );
    let shut_rest = kw(
        "WELOPEN",
        vec![rec(vec![
            s("WELL", "OP-1"),
            s("STATUS", "SHUT"),
            DeckItem::defaulted("I", DeckValue::Int(0)),
            DeckItem::defaulted("J", DeckValue::Int(0)),
            i("K", 2),
        ])],
    );
    let shut_last = kw(
        "WELOPEN",
        vec![rec(vec![
            s("WELL", "OP-1"),
            s("STATUS", "SHUT"),
            DeckItem::defaulted("I", DeckValue::Int(0)),
            DeckItem::defaulted("J", DeckValue::Int(0)),
            i("K", 3),
        ])],
    );
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        compdat("OP-1", 1, 3, "OPEN"),
        wconprod("OP-1", "OPEN", 100.0),
        shut_all,
        shut_rest,
        shut_last,
        dates(1, "FEB", 2020),
    ]);

    let well = schedule.get_well("OP-1", 0).unwrap();
    assert!(well.all_connections_shut());
    assert_eq!(well.status, WellStatus::Shut);
}

#[test]
fn wconhist_resets_bhp_and_whistctl_overrides_control() {
    let whistctl = kw("WHISTCTL", vec![rec(vec![s("CMODE", "GRAT")])]);
    let wconhist = kw(
        "WCONHIST",
        vec![rec(vec![
            s("WELL", "OP-1"),
            s("STATUS", "OPEN"),
            s("CMODE", "ORAT"),
            d("ORAT", 800.0),
        ])],
    );
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        compdat("OP-1", 1, 1, "OPEN"),
        whistctl,
        wconhist,
    ]);

    let well = schedule.get_well("OP-1", 0).unwrap();
    assert!(!well.production.predict);
    assert_eq!(well.production.cmode, Some(ProducerCMode::Grat));
    assert!((well.production.bhp_limit - rsched::well::DEFAULT_BHP_LIMIT).abs() < 1e-9);
}

#[test]
fn injector_producer_switch_resets_the_other_side() {
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        compdat("OP-1", 1, 1, "OPEN"),
        wconprod("OP-1", "OPEN", 1000.0),
        dates(1, "FEB", 2020),
        wconinje("OP-1", "WATER", "OPEN", 500.0),
    ]);

    assert!(schedule.get_well("OP-1", 0).unwrap().is_producer());
    let later = schedule.get_well("OP-1", 1).unwrap();
    assert!(later.is_injector());
    // The producer-side BHP limit fell back to its default on switch.
    assert!((later.production.bhp_limit - rsched::well::DEFAULT_BHP_LIMIT).abs() < 1e-9);
}

#[test]
fn wlist_and_glob_name_resolution() {
    let wlist = kw(
        "WLIST",
        vec![rec(vec![
            s("NAME", "*PRD"),
            s("ACTION", "NEW"),
            DeckItem::list(
                "WELLS",
                vec![
                    DeckValue::String("OP-1".to_string()),
                    DeckValue::String("OP-2".to_string()),
                ],
            ),
        ])],
    );
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        welspecs("OP-2", "G1"),
        welspecs("WI-1", "G1"),
        wlist,
    ]);

    assert_eq!(schedule.well_names("*PRD", 0), vec!["OP-1", "OP-2"]);
    assert_eq!(schedule.well_names("OP*", 0), vec!["OP-1", "OP-2"]);
    assert_eq!(
        schedule.well_names("*", 0),
        vec!["OP-1", "OP-2", "WI-1"]
    );
    assert_eq!(schedule.well_names("WI-1", 0), vec!["WI-1"]);
}

#[test]
fn gruptree_builds_hierarchy_and_rejects_cycles() {
    let tree = kw(
        "GRUPTREE",
        vec![
            rec(vec![s("CHILD", "PLAT-A"), s("PARENT", "FIELD")]),
            rec(vec![s("CHILD", "G1"), s("PARENT", "PLAT-A")]),
        ],
    );
    let schedule = build(vec![welspecs("OP-1", "G1"), tree]);

    let g1 = schedule.get_group("G1", 0).unwrap();
    assert_eq!(g1.parent.as_deref(), Some("PLAT-A"));
    assert!(g1.wells.contains("OP-1"));
    let plat = schedule.get_group("PLAT-A", 0).unwrap();
    assert!(plat.groups.contains("G1"));

    let cycle = kw(
        "GRUPTREE",
        vec![
            rec(vec![s("CHILD", "A"), s("PARENT", "B")]),
            rec(vec![s("CHILD", "B"), s("PARENT", "A")]),
        ],
    );
    let result = Schedule::from_deck(
        start(),
        &deck(vec![cycle]),
        UnitSystem::Metric,
        &ParseContext::lenient(),
    );
    assert!(result.is_err());
}

#[test]
fn exit_status_is_recorded() {
    let exit = kw("EXIT", vec![rec(vec![i("STATUS", 7)])]);
    let schedule = build(vec![welspecs("OP-1", "G1"), exit]);
    assert_eq!(schedule.exit_status(), Some(7));
}

#[test]
fn weltarg_updates_one_target_in_place() {
    let weltarg = kw(
        "WELTARG",
        vec![rec(vec![
            s("WELL", "OP-1"),
            s("CMODE", "ORAT"),
            d("NEW_VALUE", 250.0),
        ])],
    );
    let schedule = build(vec![
        welspecs("OP-1", "G1"),
        compdat("OP-1", 1, 1, "OPEN"),
        wconprod("OP-1", "OPEN", 1000.0),
        weltarg,
    ]);

    let well = schedule.get_well("OP-1", 0).unwrap();
    let day = 86_400.0;
    assert!((well.production.oil_rate - 250.0 / day).abs() < 1e-12);
    // Everything else survives the targeted edit.
    assert_eq!(well.production.cmode, Some(ProducerCMode::Orat));
}
