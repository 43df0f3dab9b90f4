//! # rsched - Reservoir Schedule State Machine
//!
//! rsched turns the SCHEDULE section of a simulation deck into a
//! queryable, versioned state machine: every well, group and control
//! setting, at every report step, behind a copy-on-write storage layer
//! that keeps one snapshot per actual change.
//!
//! ## Core Concepts
//!
//! - **Report step**: one tick of the [`time_map::TimeMap`] clock,
//!   advanced by DATES and TSTEP
//! - **Snapshot**: an immutable [`well::Well`] or [`group::Group`] at a
//!   step; mutation clones, edits and stores only on change
//! - **UDQ**: user-defined quantities evaluated against live
//!   [`summary::SummaryState`] values
//! - **ACTIONX**: captured keyword blocks replayed when a summary
//!   condition triggers, with the matched wells bound to `?`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rsched::{Deck, ParseContext, Schedule, UnitSystem};
//!
//! let deck = Deck::new(keywords);
//! let schedule = Schedule::from_deck(start, &deck, UnitSystem::Metric, &ParseContext::lenient())?;
//!
//! let well = schedule.get_well("OP-1", 3)?;
//! assert!(well.is_producer());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Deck-facing surface
pub mod context;
pub mod deck;
pub mod error;
pub mod units;

// Versioned storage primitives
pub mod dynamic_state;
pub mod events;
pub mod time_map;

// Schedule entities
pub mod group;
pub mod guide_rate;
pub mod name_match;
pub mod rft;
pub mod tuning;
pub mod vfp;
pub mod well;
pub mod wlist;

// Condition engines
pub mod action;
pub mod summary;
pub mod udq;

// Orchestration, restart and external seams
pub mod grid;
pub mod rst;
pub mod schedule;
pub mod script;

// Re-export primary types at crate root for convenience
pub use context::{ErrorGuard, ErrorKind, ErrorPolicy, ParseContext};
pub use deck::{Deck, DeckItem, DeckKeyword, DeckRecord, DeckValue, KeywordLocation};
pub use dynamic_state::DynamicState;
pub use error::{SchedError, SchedResult, StructuralError};
pub use group::Group;
pub use schedule::{Schedule, ScheduleState, SimulatorUpdate};
pub use summary::SummaryState;
pub use time_map::{TimeDirective, TimeMap};
pub use units::UnitSystem;
pub use well::Well;
