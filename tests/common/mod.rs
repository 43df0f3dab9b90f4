//! Deck-building helpers shared by the integration suites.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rsched::{Deck, DeckItem, DeckKeyword, DeckRecord, DeckValue};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().unwrap()
}

pub fn s(name: &str, value: &str) -> DeckItem {
    DeckItem::new(name, DeckValue::String(value.to_string()))
}

pub fn i(name: &str, value: i64) -> DeckItem {
    DeckItem::new(name, DeckValue::Int(value))
}

pub fn d(name: &str, value: f64) -> DeckItem {
    DeckItem::new(name, DeckValue::Double(value))
}

pub fn def_i(name: &str) -> DeckItem {
    DeckItem::defaulted(name, DeckValue::Int(0))
}

pub fn def_d(name: &str, fallback: f64) -> DeckItem {
    DeckItem::defaulted(name, DeckValue::Double(fallback))
}

pub fn kw(name: &str, records: Vec<DeckRecord>) -> DeckKeyword {
    DeckKeyword::new(name, records)
}

pub fn rec(items: Vec<DeckItem>) -> DeckRecord {
    DeckRecord::new(items)
}

pub fn welspecs(well: &str, group: &str) -> DeckKeyword {
    kw(
        "WELSPECS",
        vec![rec(vec![
            s("WELL", well),
            s("GROUP", group),
            i("HEAD_I", 5),
            i("HEAD_J", 5),
            s("PHASE", "OIL"),
        ])],
    )
}

pub fn compdat(well: &str, k1: i64, k2: i64, state: &str) -> DeckKeyword {
    kw(
        "COMPDAT",
        vec![rec(vec![
            s("WELL", well),
            i("I", 5),
            i("J", 5),
            i("K1", k1),
            i("K2", k2),
            s("STATE", state),
            d("CTF", 10.0),
            d("DIAMETER", 0.2),
        ])],
    )
}

pub fn wconprod(well: &str, status: &str, orat: f64) -> DeckKeyword {
    kw(
        "WCONPROD",
        vec![rec(vec![
            s("WELL", well),
            s("STATUS", status),
            s("CMODE", "ORAT"),
            d("ORAT", orat),
            d("BHP", 50.0),
        ])],
    )
}

pub fn wconinje(well: &str, fluid: &str, status: &str, rate: f64) -> DeckKeyword {
    kw(
        "WCONINJE",
        vec![rec(vec![
            s("WELL", well),
            s("TYPE", fluid),
            s("STATUS", status),
            s("CMODE", "RATE"),
            d("RATE", rate),
        ])],
    )
}

pub fn dates(day: i64, month: &str, year: i64) -> DeckKeyword {
    kw(
        "DATES",
        vec![rec(vec![
            i("DAY", day),
            s("MONTH", month),
            i("YEAR", year),
        ])],
    )
}

pub fn tstep(days: &[f64]) -> DeckKeyword {
    kw(
        "TSTEP",
        vec![rec(vec![DeckItem::list(
            "DAYS",
            days.iter().copied().map(DeckValue::Double).collect(),
        )])],
    )
}

pub fn deck(keywords: Vec<DeckKeyword>) -> Deck {
    Deck::new(keywords)
}
