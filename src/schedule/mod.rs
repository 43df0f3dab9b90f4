//! Deck ingestion and the report-step query surface.
//!
//! [`Schedule::from_deck`] walks the SCHEDULE keywords once, in file
//! order, dispatching each to its handler against the versioned
//! [`ScheduleState`]. DATES and TSTEP advance the report-step clock;
//! everything between two time keywords mutates the current step.
//! Conditional blocks (ACTIONX, PYACTION) are captured, not applied,
//! and replayed later through [`Schedule::apply_action`] when the
//! simulator reports a matching condition.

pub mod cmp;
pub(crate) mod handlers;
mod state;

pub use state::ScheduleState;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, warn};

use crate::action::{
    is_allowed_keyword, ActionContext, ActionExpr, ActionState, ActionX, Actions,
};
use crate::context::{ErrorGuard, ErrorKind, ParseContext};
use crate::deck::{Deck, DeckKeyword, DeckRecord};
use crate::error::{SchedError, SchedResult, StructuralError};
use crate::events::{Events, ScheduleEvent};
use crate::group::Group;
use crate::name_match::{MatchResult, NameMatcher};
use crate::rft::RftConfig;
use crate::rst::RstState;
use crate::script::ScriptRunner;
use crate::summary::SummaryState;
use crate::time_map::{TimeDirective, TimeMap};
use crate::tuning::Tuning;
use crate::units::UnitSystem;
use crate::vfp::{VfpInjTable, VfpProdTable};
use crate::well::{
    Connection, ConnectionOrder, ConnectionState, InjectorType, Phase, Segment, Well,
    WellSegments, WellStatus, WellType,
};
use crate::wlist::WListManager;

use handlers::HandlerContext;

/// What a schedule mutation asks of the running simulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatorUpdate {
    /// Wells whose constraints or completions changed.
    pub affected_wells: Vec<String>,
    /// Wells whose connection factors must be rescaled to a
    /// productivity-index target.
    pub welpi_wells: Vec<String>,
    /// Time stepping controls changed.
    pub tuning_changed: bool,
    /// EXIT was requested with this status.
    pub exit_status: Option<i32>,
}

impl SimulatorUpdate {
    fn merge(&mut self, other: SimulatorUpdate) {
        for well in other.affected_wells {
            if !self.affected_wells.contains(&well) {
                self.affected_wells.push(well);
            }
        }
        for well in other.welpi_wells {
            if !self.welpi_wells.contains(&well) {
                self.welpi_wells.push(well);
            }
        }
        self.tuning_changed |= other.tuning_changed;
        self.exit_status = other.exit_status.or(self.exit_status);
    }
}

/// The full dynamic input of a run: every well, group and control
/// setting at every report step.
#[derive(Debug, Clone)]
pub struct Schedule {
    time_map: TimeMap,
    state: ScheduleState,
    rft: RftConfig,
    units: UnitSystem,
    parse_context: ParseContext,
    action_state: ActionState,
    exit_status: Option<i32>,
}

impl Schedule {
    /// Ingests a SCHEDULE section.
    ///
    /// # Errors
    ///
    /// Structural deck problems always fail; recoverable ones follow
    /// the [`ParseContext`] policies.
    pub fn from_deck(
        start: DateTime<Utc>,
        deck: &Deck,
        units: UnitSystem,
        parse_context: &ParseContext,
    ) -> SchedResult<Self> {
        let mut schedule = Self {
            time_map: TimeMap::new(start),
            state: ScheduleState::new(),
            rft: RftConfig::new(),
            units,
            parse_context: parse_context.clone(),
            action_state: ActionState::new(),
            exit_status: None,
        };
        let mut guard = ErrorGuard::new();
        let mut step = 0usize;

        let mut idx = 0;
        while idx < deck.keywords.len() {
            let keyword = &deck.keywords[idx];
            match keyword.name.as_str() {
                "DATES" => {
                    for record in keyword.iter() {
                        schedule.close_step(step)?;
                        let date = parse_date(keyword, record)?;
                        schedule.time_map.advance(TimeDirective::Dates(date))?;
                        step += 1;
                    }
                }
                "TSTEP" => {
                    let record = keyword.iter().next().ok_or_else(|| {
                        StructuralError::InvalidDeck {
                            reason: format!("{}: TSTEP needs a record", keyword.location),
                        }
                    })?;
                    let item = record.get_item("DAYS").ok_or_else(|| {
                        StructuralError::InvalidDeck {
                            reason: format!("{}: TSTEP needs day lengths", keyword.location),
                        }
                    })?;
                    for value_idx in 0..item.values.len() {
                        if let Some(days) = item.get_double(value_idx) {
                            schedule.close_step(step)?;
                            schedule.time_map.advance(TimeDirective::TStep(days))?;
                            step += 1;
                        }
                    }
                }
                "ACTIONX" => {
                    let (action, consumed) =
                        parse_actionx(deck, idx, parse_context, &mut guard)?;
                    let mut actions = schedule
                        .state
                        .actions
                        .get(step)
                        .cloned()
                        .unwrap_or_default();
                    info!(action = %action.name, step, "registered conditional action");
                    actions.add(action);
                    schedule.state.actions.update_if_changed(step, actions);
                    idx += consumed;
                    continue;
                }
                "ENDACTIO" => {
                    return Err(StructuralError::InvalidDeck {
                        reason: format!("{}: ENDACTIO without ACTIONX", keyword.location),
                    }
                    .into());
                }
                _ => {
                    let update =
                        schedule.run_handler(keyword, step, None, &mut guard)?;
                    schedule.exit_status = update.exit_status.or(schedule.exit_status);
                }
            }
            idx += 1;
        }
        schedule.close_step(step)?;
        guard.check()?;
        Ok(schedule)
    }

    fn run_handler(
        &mut self,
        keyword: &DeckKeyword,
        step: usize,
        action_wells: Option<&[String]>,
        guard: &mut ErrorGuard,
    ) -> SchedResult<SimulatorUpdate> {
        let Some(handler) = handlers::lookup(&keyword.name) else {
            warn!(keyword = %keyword.name, location = %keyword.location, "ignoring unhandled keyword");
            return Ok(SimulatorUpdate::default());
        };
        let mut update = SimulatorUpdate::default();
        let mut ctx = HandlerContext {
            state: &mut self.state,
            step,
            units: self.units,
            parse_context: &self.parse_context,
            guard,
            action_wells,
            rft: &mut self.rft,
            update: &mut update,
        };
        handler(&mut ctx, keyword)?;
        Ok(update)
    }

    /// Shuts every open well whose connections are all shut. Runs when
    /// a report step closes.
    fn close_step(&mut self, step: usize) -> SchedResult<()> {
        let names = self.state.well_names(step);
        for name in names {
            let well = self.state.well(&name, step)?;
            if well.status == WellStatus::Open && well.all_connections_shut() {
                let mut well = well.clone();
                warn!(well = %name, step, "all connections shut, shutting well");
                well.update_status(WellStatus::Shut);
                self.state
                    .add_entity_event(step, &name, ScheduleEvent::WellStatusChange);
                self.state.update_well(well, step);
            }
        }
        Ok(())
    }

    /// Simulation start time.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.time_map.start()
    }

    /// Report-step clock.
    #[must_use]
    pub const fn time_map(&self) -> &TimeMap {
        &self.time_map
    }

    /// Number of report steps, including the initial one.
    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.time_map.len()
    }

    /// EXIT status, when the deck requested one.
    #[must_use]
    pub const fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Versioned state, for inspection and diffing.
    #[must_use]
    pub const fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// RFT output configuration.
    #[must_use]
    pub const fn rft_config(&self) -> &RftConfig {
        &self.rft
    }

    /// A well's snapshot at a report step.
    ///
    /// # Errors
    ///
    /// Unknown names and pre-creation steps fail.
    pub fn get_well(&self, name: &str, step: usize) -> SchedResult<&Well> {
        self.state.well(name, step)
    }

    /// A group's snapshot at a report step.
    ///
    /// # Errors
    ///
    /// Unknown names and pre-creation steps fail.
    pub fn get_group(&self, name: &str, step: usize) -> SchedResult<&Group> {
        self.state.group(name, step)
    }

    /// Resolves a name pattern against the wells of a step, honoring
    /// well lists and list patterns.
    #[must_use]
    pub fn well_names(&self, pattern: &str, step: usize) -> Vec<String> {
        let names = self.state.well_names(step);
        let wlists = self.state.wlists.get(step).cloned().unwrap_or_default();
        let matcher = NameMatcher::new(&names).with_wlists(&wlists);
        match matcher.resolve(pattern) {
            MatchResult::Matched(matched) => matched,
            MatchResult::Empty | MatchResult::UndefinedList(_) => Vec::new(),
        }
    }

    /// Time stepping controls at a step.
    #[must_use]
    pub fn tuning(&self, step: usize) -> Tuning {
        self.state.tuning.get(step).cloned().unwrap_or_default()
    }

    /// NUPCOL at a step.
    #[must_use]
    pub fn nupcol(&self, step: usize) -> i32 {
        self.state.nupcol.get(step).copied().unwrap_or(12)
    }

    /// Conditional actions registered at a step.
    #[must_use]
    pub fn actions(&self, step: usize) -> Actions {
        self.state.actions.get(step).cloned().unwrap_or_default()
    }

    /// Well lists at a step.
    #[must_use]
    pub fn wlists(&self, step: usize) -> WListManager {
        self.state.wlists.get(step).cloned().unwrap_or_default()
    }

    /// A production VFP table defined at or before a step.
    #[must_use]
    pub fn get_vfp_prod_table(&self, table_id: i32, step: usize) -> Option<&VfpProdTable> {
        self.state.vfp_prod_table(table_id, step)
    }

    /// An injection VFP table defined at or before a step.
    #[must_use]
    pub fn get_vfp_inj_table(&self, table_id: i32, step: usize) -> Option<&VfpInjTable> {
        self.state.vfp_inj_table(table_id, step)
    }

    /// Events recorded at a step.
    #[must_use]
    pub fn events(&self, step: usize) -> Events {
        self.state.events(step)
    }

    /// Shuts a well from outside the deck, typically on an economic
    /// limit.
    ///
    /// # Errors
    ///
    /// Unknown wells fail.
    pub fn shut_well(&mut self, name: &str, step: usize) -> SchedResult<()> {
        self.set_well_status(name, step, WellStatus::Shut)
    }

    /// Stops a well: surface flow off, wellbore crossflow allowed.
    ///
    /// # Errors
    ///
    /// Unknown wells fail.
    pub fn stop_well(&mut self, name: &str, step: usize) -> SchedResult<()> {
        self.set_well_status(name, step, WellStatus::Stop)
    }

    /// Reopens a well.
    ///
    /// # Errors
    ///
    /// Unknown wells fail.
    pub fn open_well(&mut self, name: &str, step: usize) -> SchedResult<()> {
        self.set_well_status(name, step, WellStatus::Open)
    }

    fn set_well_status(&mut self, name: &str, step: usize, status: WellStatus) -> SchedResult<()> {
        let mut well = self.state.well(name, step)?.clone();
        if well.update_status(status) {
            info!(well = %name, step, ?status, "well status forced");
            self.state
                .add_entity_event(step, name, ScheduleEvent::WellStatusChange);
            self.state.update_well(well, step);
        }
        Ok(())
    }

    /// Refreshes user-defined quantities at a step, writing the results
    /// into the summary.
    ///
    /// # Errors
    ///
    /// Expression evaluation failures propagate.
    pub fn update_udq(&self, step: usize, summary: &mut SummaryState) -> SchedResult<()> {
        let Some(config) = self.state.udq.get(step) else {
            return Ok(());
        };
        let wlists = self.state.wlists.get(step).cloned();
        let wells = self.state.well_names(step);
        let groups = self.state.group_names(step);
        config.eval(summary, wlists.as_ref(), &wells, &groups)?;
        Ok(())
    }

    /// Evaluates every ready action against the summary, replaying the
    /// bodies of those that trigger. Returns the applied updates in
    /// action order.
    ///
    /// # Errors
    ///
    /// Replay failures propagate; evaluation itself cannot fail.
    pub fn eval_actions(
        &mut self,
        step: usize,
        summary: &mut SummaryState,
    ) -> SchedResult<Vec<(String, SimulatorUpdate)>> {
        self.update_udq(step, summary)?;

        let actions = self.actions(step);
        let wlists = self.state.wlists.get(step).cloned();
        let wells = self.state.well_names(step);
        let groups = self.state.group_names(step);
        let elapsed = summary.elapsed();

        let mut triggered = Vec::new();
        for action in actions.iter() {
            if !action.ready(&self.action_state, elapsed) {
                continue;
            }
            let ctx = ActionContext {
                summary,
                wlists: wlists.as_ref(),
                wells: &wells,
                groups: &groups,
            };
            let result = action.eval(&ctx);
            if result.truthy {
                triggered.push((action.name.clone(), result.matching_wells().to_vec()));
            }
        }

        let mut updates = Vec::new();
        for (name, matched) in triggered {
            info!(action = %name, step, "action triggered");
            self.action_state.register_run(&name, elapsed);
            let update = self.apply_action(step, &name, &matched)?;
            updates.push((name, update));
        }
        Ok(updates)
    }

    /// Replays a captured action body at a step with the condition's
    /// matched wells bound to `?`.
    ///
    /// # Errors
    ///
    /// Unknown action names and handler failures fail.
    pub fn apply_action(
        &mut self,
        step: usize,
        name: &str,
        matched_wells: &[String],
    ) -> SchedResult<SimulatorUpdate> {
        let actions = self.actions(step);
        let action = actions.get(name).ok_or_else(|| SchedError::Internal {
            message: format!("no action '{name}' at step {step}"),
        })?;

        let before = self.state.entity_event_names(step);
        self.state.add_event(step, ScheduleEvent::ActionxTriggered);

        let mut guard = ErrorGuard::new();
        let mut total = SimulatorUpdate::default();
        for keyword in &action.keywords {
            let update = self.run_handler(keyword, step, Some(matched_wells), &mut guard)?;
            total.merge(update);
        }
        guard.check()?;

        for name in self.state.entity_event_names(step) {
            if !before.contains(&name)
                && self.state.has_well(&name)
                && !total.affected_wells.contains(&name)
            {
                total.affected_wells.push(name);
            }
        }
        for well in matched_wells {
            if self.state.has_well(well) && !total.affected_wells.contains(well) {
                total.affected_wells.push(well.clone());
            }
        }
        self.exit_status = total.exit_status.or(self.exit_status);
        Ok(total)
    }

    /// Runs every registered script action through the provided
    /// runtime.
    ///
    /// # Errors
    ///
    /// Script failures propagate.
    pub fn run_scripts(
        &mut self,
        step: usize,
        summary: &mut SummaryState,
        runner: &mut dyn ScriptRunner,
    ) -> SchedResult<bool> {
        let actions = self.actions(step);
        let mut changed = false;
        for script in actions.pyactions() {
            changed |= runner.run(&script.name, &script.filename, summary)?;
        }
        Ok(changed)
    }

    /// Installs the well and group snapshots of a restart file at the
    /// step before the requested report step, so ingestion of the
    /// remaining deck continues from a consistent picture.
    ///
    /// # Errors
    ///
    /// Inconsistent restart data fails with
    /// [`SchedError::RestartInconsistency`].
    pub fn load_rst(&mut self, rst: &RstState) -> SchedResult<()> {
        let step = rst
            .report_step
            .checked_sub(1)
            .ok_or_else(|| SchedError::RestartInconsistency {
                reason: "cannot restart at report step 0".to_string(),
            })?;
        if step >= self.time_map.len() {
            return Err(SchedError::RestartInconsistency {
                reason: format!(
                    "restart step {} beyond the {}-step schedule",
                    rst.report_step,
                    self.time_map.len()
                ),
            });
        }
        info!(report_step = rst.report_step, wells = rst.wells.len(), "loading restart state");

        for rst_group in &rst.groups {
            let parent = if rst_group.name == crate::group::FIELD {
                None
            } else if rst_group.parent.is_empty() {
                Some(crate::group::FIELD.to_string())
            } else {
                Some(rst_group.parent.clone())
            };
            let mut group = if self.state.has_group(&rst_group.name) {
                self.state.group(&rst_group.name, step)?.clone()
            } else {
                Group::new(
                    &rst_group.name,
                    self.state.next_group_index(),
                    step,
                    parent.clone(),
                )
            };
            group.parent = parent;
            if self.state.has_group(&rst_group.name) {
                self.state.update_group(group, step);
            } else {
                self.state.add_group(group, step);
            }
        }
        for rst_group in &rst.groups {
            if let Some(parent) = self.state.group(&rst_group.name, step)?.parent.clone() {
                let mut parent_group = self.state.group(&parent, step)?.clone();
                if parent_group.add_group(&rst_group.name) {
                    self.state.update_group(parent_group, step);
                }
            }
        }

        for rst_well in &rst.wells {
            let well = restart_well(self, rst_well, step)?;
            let group = well.group.clone();
            let name = well.name.clone();
            self.state.force_well(well, step);
            let mut parent = self.state.group(&group, step)?.clone();
            if parent.add_well(&name) {
                self.state.update_group(parent, step);
            }
        }

        if let Some(tuning) = &rst.tuning {
            self.state.tuning.update_if_changed(step, tuning.clone());
        }
        Ok(())
    }
}

/// Converts one restart well into a schedule snapshot.
fn restart_well(
    schedule: &Schedule,
    rst: &crate::rst::RstWell,
    step: usize,
) -> SchedResult<Well> {
    let inconsistent = |reason: String| SchedError::RestartInconsistency { reason };

    let status = WellStatus::from_deck(&rst.status).ok_or_else(|| {
        inconsistent(format!("well {}: bad status '{}'", rst.name, rst.status))
    })?;
    let phase = Phase::from_deck(&rst.preferred_phase).ok_or_else(|| {
        inconsistent(format!(
            "well {}: bad preferred phase '{}'",
            rst.name, rst.preferred_phase
        ))
    })?;
    let well_type = match rst.well_type.as_str() {
            "PROD" => WellType::Producer,
            "WINJ" => WellType::Injector {
                fluid: InjectorType::Water,
            },
            "GINJ" => WellType::Injector {
                fluid: InjectorType::Gas,
            },
            "OINJ" => WellType::Injector {
                fluid: InjectorType::Oil,
            },
        "MINJ" => WellType::Injector {
            fluid: InjectorType::Multi,
        },
        other => {
            return Err(inconsistent(format!(
                "well {}: bad well type '{other}'",
                rst.name
            )))
        }
    };

    let insert_index = schedule
        .state
        .well(&rst.name, step)
        .map_or_else(|_| schedule.state.num_wells(), |w| w.insert_index);

    let mut well = Well::new(
        rst.name.clone(),
        rst.group.clone(),
        step,
        insert_index,
        rst.head_i,
        rst.head_j,
        phase,
        ConnectionOrder::Input,
    );
    well.ref_depth = Some(rst.ref_depth);
    well.allow_crossflow = rst.allow_crossflow;
    well.well_type = well_type;
    well.status = status;
    well.efficiency_factor = rst.efficiency_factor;

    let mut connections =
        crate::well::WellConnections::new(ConnectionOrder::Input, rst.head_i, rst.head_j);
    for rc in &rst.connections {
        let state = ConnectionState::from_deck(&rc.state).ok_or_else(|| {
            inconsistent(format!(
                "well {}: bad connection state '{}'",
                rst.name, rc.state
            ))
        })?;
        let mut connection = Connection::new(rc.i, rc.j, rc.k);
        connection.state = state;
        connection.complnum = rc.complnum;
        connection.ctf = rc.ctf;
        connection.skin = rc.skin;
        connection.depth = rc.depth;
        if rc.segment > 0 {
            connection.segment = Some(rc.segment);
        }
        connections.add(connection);
    }
    well.connections = connections;

    if !rst.segments.is_empty() {
        let segments: Vec<Segment> = rst
            .segments
            .iter()
            .map(|rs| Segment {
                number: rs.number,
                branch: rs.branch,
                outlet: (rs.outlet > 0).then_some(rs.outlet),
                depth: rs.depth,
                length: rs.length,
                diameter: rs.diameter,
                roughness: 0.0,
            })
            .collect();
        well.segments = Some(
            WellSegments::from_records(&rst.name, segments)
                .map_err(|err| inconsistent(format!("well {}: {err}", rst.name)))?,
        );
    }
    Ok(well)
}

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

fn parse_date(keyword: &DeckKeyword, record: &DeckRecord) -> SchedResult<DateTime<Utc>> {
    let bad = |reason: String| StructuralError::InvalidDeck {
        reason: format!("{}: {reason}", keyword.location),
    };
    let day = record
        .get_item("DAY")
        .and_then(|i| i.get_int(0))
        .ok_or_else(|| bad("DATES needs a day".to_string()))?;
    let month_token = record
        .get_item("MONTH")
        .and_then(|i| i.get_string(0))
        .ok_or_else(|| bad("DATES needs a month".to_string()))?;
    // ECL spells July as JLY; accept both.
    let month_token = if month_token == "JLY" { "JUL" } else { month_token };
    let month = MONTHS
        .iter()
        .position(|m| *m == month_token)
        .ok_or_else(|| bad(format!("bad month '{month_token}'")))?
        + 1;
    let year = record
        .get_item("YEAR")
        .and_then(|i| i.get_int(0))
        .ok_or_else(|| bad("DATES needs a year".to_string()))?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Utc.with_ymd_and_hms(year as i32, month as u32, day as u32, 0, 0, 0)
        .single()
        .ok_or_else(|| bad(format!("bad date {day} {month_token} {year}")).into())
}

/// Parses an ACTIONX block starting at `idx`. Returns the action and
/// the number of keywords consumed, ENDACTIO included.
///
/// Keywords that cannot be replayed inside an action are routed through
/// the [`ActionIllegalKeyword`](ErrorKind::ActionIllegalKeyword) policy
/// and dropped from the body; only a missing ENDACTIO is structural.
fn parse_actionx(
    deck: &Deck,
    idx: usize,
    parse_context: &ParseContext,
    guard: &mut ErrorGuard,
) -> SchedResult<(ActionX, usize)> {
    let keyword = &deck.keywords[idx];
    let header = keyword.iter().next().ok_or_else(|| {
        StructuralError::InvalidDeck {
            reason: format!("{}: ACTIONX needs a header record", keyword.location),
        }
    })?;
    let name = header
        .get_item("NAME")
        .and_then(|i| i.get_string(0))
        .ok_or_else(|| StructuralError::InvalidDeck {
            reason: format!("{}: ACTIONX needs a name", keyword.location),
        })?
        .to_string();
    let max_run = header
        .get_item("NUM")
        .and_then(|i| i.get_int(0))
        .unwrap_or(1)
        .max(0) as usize;
    let min_wait = header
        .get_item("MIN_WAIT")
        .and_then(|i| i.get_double(0))
        .unwrap_or(0.0)
        * 86_400.0;

    let mut condition = String::new();
    for record in keyword.iter().skip(1) {
        if let Some(line) = record.get_item("CONDITION").and_then(|i| i.get_string(0)) {
            if !condition.is_empty() {
                condition.push(' ');
            }
            condition.push_str(line);
        }
    }
    let expr = ActionExpr::parse(&name, &condition)?;

    let mut body = Vec::new();
    let mut consumed = 1;
    for inner in &deck.keywords[idx + 1..] {
        consumed += 1;
        if inner.name == "ENDACTIO" {
            let action = ActionX::new(name, max_run, min_wait, expr, condition, body);
            return Ok((action, consumed));
        }
        if inner.name == "ACTIONX" || !is_allowed_keyword(&inner.name) {
            parse_context.handle(
                ErrorKind::ActionIllegalKeyword,
                SchedError::UnsupportedKeyword {
                    keyword: inner.name.clone(),
                    reason: format!("not allowed inside ACTIONX '{name}'"),
                    location: inner.location.clone(),
                },
                guard,
            );
            guard.check()?;
            continue;
        }
        body.push(inner.clone());
    }
    Err(StructuralError::UnterminatedAction { name }.into())
}
