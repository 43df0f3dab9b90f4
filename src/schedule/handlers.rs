//! Keyword handlers.
//!
//! Every handler follows the same read-modify-write protocol: resolve
//! the target names, clone the current snapshot, apply the keyword's
//! field updates through the snapshot's `update_*` methods, and write
//! the clone back only when something changed, emitting typed events.

use tracing::{debug, warn};

use crate::action::PyAction;
use crate::context::ErrorKind;
use crate::deck::{DeckKeyword, DeckRecord, KeywordLocation};
use crate::error::{SchedError, SchedResult, StructuralError};
use crate::events::ScheduleEvent;
use crate::group::{
    check_group_cycle, Group, GroupInjectionProperties, GroupInjectorCMode,
    GroupProducerCMode, GroupProductionProperties, FIELD,
};
use crate::guide_rate::{GuideRateModel, GuideRateTarget};
use crate::name_match::{MatchResult, NameMatcher};
use crate::rft::RftMode;
use crate::schedule::state::ScheduleState;
use crate::schedule::SimulatorUpdate;
use crate::tuning::OilVaporizationProperties;
use crate::units::{Dimension, UnitSystem};
use crate::vfp::{VfpAlqKind, VfpFlowKind, VfpInjTable, VfpProdTable};
use crate::well::{
    Connection, ConnectionOrder, ConnectionState, EconLimits, InjectionProperties, InjectorCMode,
    InjectorType, Phase, ProducerCMode, ProductionProperties, Segment, Well, WellGuideRate,
    WellSegments, WellStatus,
};
use crate::wlist::WListAction;

/// Default injector BHP limit when WCONINJE item 7 is defaulted, in
/// deck pressure units.
const WCONINJE_BHP_DEFAULT: f64 = 6895.0;

/// Everything one handler invocation may touch.
pub(crate) struct HandlerContext<'a> {
    pub state: &'a mut ScheduleState,
    pub step: usize,
    pub units: UnitSystem,
    pub parse_context: &'a crate::context::ParseContext,
    pub guard: &'a mut crate::context::ErrorGuard,
    /// Wells matched by an enclosing ACTIONX condition, for `?`.
    pub action_wells: Option<&'a [String]>,
    pub rft: &'a mut crate::rft::RftConfig,
    pub update: &'a mut SimulatorUpdate,
}

pub(crate) type Handler = fn(&mut HandlerContext<'_>, &DeckKeyword) -> SchedResult<()>;

/// Dispatch table.
pub(crate) fn lookup(name: &str) -> Option<Handler> {
    Some(match name {
        "WELSPECS" => handle_welspecs,
        "COMPDAT" => handle_compdat,
        "COMPORD" => handle_compord,
        "COMPSEGS" => handle_compsegs,
        "WELSEGS" => handle_welsegs,
        "WCONPROD" => handle_wconprod,
        "WCONHIST" => handle_wconhist,
        "WCONINJE" => handle_wconinje,
        "WCONINJH" => handle_wconinjh,
        "WELOPEN" => handle_welopen,
        "WELPI" => handle_welpi,
        "WECON" => handle_wecon,
        "WEFAC" => handle_wefac,
        "WELTARG" => handle_weltarg,
        "WGRUPCON" => handle_wgrupcon,
        "WHISTCTL" => handle_whistctl,
        "WLIST" => handle_wlist,
        "WSOLVENT" => handle_wsolvent,
        "WFOAM" => handle_wfoam,
        "WPOLYMER" => handle_wpolymer,
        "WSALT" => handle_wsalt,
        "WTRACER" => handle_wtracer,
        "GRUPTREE" => handle_gruptree,
        "GCONPROD" => handle_gconprod,
        "GCONINJE" => handle_gconinje,
        "GEFAC" => handle_gefac,
        "GUIDERAT" => handle_guiderat,
        "TUNING" => handle_tuning,
        "NUPCOL" => handle_nupcol,
        "MESSAGES" => handle_messages,
        "VAPPARS" => handle_vappars,
        "VFPPROD" => handle_vfpprod,
        "VFPINJ" => handle_vfpinj,
        "UDQ" => handle_udq,
        "WRFT" => handle_wrft,
        "WRFTPLT" => handle_wrftplt,
        "EXIT" => handle_exit,
        "PYACTION" => handle_pyaction,
        "MULTX" | "MULTY" | "MULTZ" | "MULTFLT" | "MULTPV" | "MULTR" => handle_geo_modifier,
        _ => return None,
    })
}

fn invalid(keyword: &DeckKeyword, reason: impl Into<String>) -> SchedError {
    StructuralError::InvalidDeck {
        reason: format!("{}: {}", keyword.location, reason.into()),
    }
    .into()
}

fn req_string<'a>(
    keyword: &DeckKeyword,
    record: &'a DeckRecord,
    item: &str,
) -> SchedResult<&'a str> {
    record
        .get_item(item)
        .and_then(|i| i.get_string(0))
        .ok_or_else(|| invalid(keyword, format!("missing item {item}")))
}

fn opt_double(record: &DeckRecord, item: &str) -> Option<f64> {
    record.get_item(item).and_then(|i| i.get_double(0))
}

fn opt_int(record: &DeckRecord, item: &str) -> Option<i64> {
    record.get_item(item).and_then(|i| i.get_int(0))
}

fn opt_string<'a>(record: &'a DeckRecord, item: &str) -> Option<&'a str> {
    record.get_item(item).and_then(|i| i.get_string(0))
}

/// True when the record explicitly set the item (present and not
/// flagged defaulted).
fn item_set(record: &DeckRecord, item: &str) -> bool {
    record
        .get_item(item)
        .is_some_and(|i| !i.default_applied(0) && !i.values.is_empty())
}

fn yes_no(token: &str) -> bool {
    matches!(token, "YES" | "Y" | "1")
}

/// Deck 1-based cell index to 0-based; 0 and defaulted mean wildcard.
fn cell_index(record: &DeckRecord, item: &str) -> Option<usize> {
    match opt_int(record, item) {
        Some(v) if v > 0 => Some((v - 1) as usize),
        _ => None,
    }
}

/// Resolves a well name pattern against wells defined at the current
/// step. Undefined well lists are structural; a pattern matching
/// nothing is policy-gated and resolves to the empty set.
fn resolve_wells(
    ctx: &mut HandlerContext<'_>,
    pattern: &str,
    location: &KeywordLocation,
) -> SchedResult<Vec<String>> {
    let names = ctx.state.well_names(ctx.step);
    let wlists = ctx.state.wlists.get(ctx.step).cloned().unwrap_or_default();
    let mut matcher = NameMatcher::new(&names).with_wlists(&wlists);
    if let Some(action_wells) = ctx.action_wells {
        matcher = matcher.with_action_wells(action_wells);
    }
    match matcher.resolve(pattern) {
        MatchResult::Matched(matched) => Ok(matched),
        MatchResult::UndefinedList(list) => Err(StructuralError::UndefinedWellList {
            list,
            location: location.clone(),
        }
        .into()),
        MatchResult::Empty => {
            ctx.parse_context.handle(
                ErrorKind::InvalidNamePattern,
                SchedError::NamePattern {
                    pattern: pattern.to_string(),
                    location: location.clone(),
                },
                ctx.guard,
            );
            Ok(Vec::new())
        }
    }
}

fn resolve_groups(
    ctx: &mut HandlerContext<'_>,
    pattern: &str,
    location: &KeywordLocation,
) -> SchedResult<Vec<String>> {
    let names = ctx.state.group_names(ctx.step);
    let matcher = NameMatcher::new(&names);
    match matcher.resolve(pattern) {
        MatchResult::Matched(matched) => Ok(matched),
        MatchResult::Empty | MatchResult::UndefinedList(_) => {
            ctx.parse_context.handle(
                ErrorKind::InvalidNamePattern,
                SchedError::NamePattern {
                    pattern: pattern.to_string(),
                    location: location.clone(),
                },
                ctx.guard,
            );
            Ok(Vec::new())
        }
    }
}

/// Ensures a group exists, creating it (and linking it under FIELD)
/// when first mentioned.
fn ensure_group(ctx: &mut HandlerContext<'_>, name: &str) -> SchedResult<()> {
    if ctx.state.has_group(name) {
        return Ok(());
    }
    let group = Group::new(
        name,
        ctx.state.next_group_index(),
        ctx.step,
        Some(FIELD.to_string()),
    );
    ctx.state.add_group(group, ctx.step);
    let mut field = ctx.state.group(FIELD, ctx.step)?.clone();
    if field.add_group(name) {
        ctx.state.update_group(field, ctx.step);
    }
    ctx.state
        .add_entity_event(ctx.step, name, ScheduleEvent::NewGroup);
    Ok(())
}

fn handle_welspecs(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let name = req_string(keyword, record, "WELL")?.to_string();
        let group = req_string(keyword, record, "GROUP")?.to_string();
        let head_i = cell_index(record, "HEAD_I")
            .ok_or_else(|| invalid(keyword, "WELSPECS needs a wellhead I index"))?;
        let head_j = cell_index(record, "HEAD_J")
            .ok_or_else(|| invalid(keyword, "WELSPECS needs a wellhead J index"))?;
        let phase = opt_string(record, "PHASE")
            .and_then(Phase::from_deck)
            .ok_or_else(|| invalid(keyword, "WELSPECS needs a preferred phase"))?;

        ensure_group(ctx, &group)?;

        if ctx.state.has_well(&name) {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            let mut changed = well.update_group(group.clone());
            if let Some(depth) = opt_double(record, "REF_DEPTH") {
                let depth = ctx.units.to_si(Dimension::Length, depth);
                if well.ref_depth != Some(depth) {
                    well.ref_depth = Some(depth);
                    changed = true;
                }
            }
            if changed {
                move_well_to_group(ctx, &name, &group)?;
                ctx.state.update_well(well, ctx.step);
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::WellWelspecsUpdate);
            }
            continue;
        }

        let order = ConnectionOrder::default();
        let mut well = Well::new(
            name.clone(),
            group.clone(),
            ctx.step,
            ctx.state.next_well_index(),
            head_i,
            head_j,
            phase,
            order,
        );
        well.ref_depth = opt_double(record, "REF_DEPTH")
            .map(|d| ctx.units.to_si(Dimension::Length, d));
        well.drainage_radius = opt_double(record, "DRAINAGE_RADIUS")
            .map_or(0.0, |r| ctx.units.to_si(Dimension::Length, r));
        well.allow_crossflow = opt_string(record, "CROSSFLOW").map_or(true, yes_no);
        well.auto_shutin = opt_string(record, "AUTO_SHUTIN")
            .map_or(false, |token| token == "SHUT");
        well.pvt_table = opt_int(record, "PVT_TABLE").unwrap_or(0) as i32;

        debug!(well = %name, group = %group, step = ctx.step, "new well");
        ctx.state.add_well(well, ctx.step);
        let mut parent = ctx.state.group(&group, ctx.step)?.clone();
        if parent.add_well(&name) {
            ctx.state.update_group(parent, ctx.step);
        }
        ctx.state
            .add_entity_event(ctx.step, &name, ScheduleEvent::NewWell);
    }
    Ok(())
}

fn move_well_to_group(ctx: &mut HandlerContext<'_>, well: &str, new_group: &str) -> SchedResult<()> {
    let groups = ctx.state.group_names(ctx.step);
    for name in groups {
        if name == new_group {
            continue;
        }
        let group = ctx.state.group(&name, ctx.step)?;
        if group.wells.contains(well) {
            let mut group = group.clone();
            group.del_well(well);
            ctx.state.update_group(group, ctx.step);
        }
    }
    let mut target = ctx.state.group(new_group, ctx.step)?.clone();
    if target.add_well(well) {
        ctx.state.update_group(target, ctx.step);
    }
    Ok(())
}

fn handle_compdat(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            let i = cell_index(record, "I").unwrap_or(well.head_i);
            let j = cell_index(record, "J").unwrap_or(well.head_j);
            let k1 = cell_index(record, "K1")
                .ok_or_else(|| invalid(keyword, "COMPDAT needs K1"))?;
            let k2 = cell_index(record, "K2").unwrap_or(k1);
            if k2 < k1 {
                return Err(invalid(keyword, "COMPDAT K2 before K1"));
            }
            let state = opt_string(record, "STATE")
                .and_then(ConnectionState::from_deck)
                .unwrap_or(ConnectionState::Open);

            let mut connections = well.connections.clone();
            for k in k1..=k2 {
                let mut connection = Connection::new(i, j, k);
                connection.state = state;
                connection.ctf = opt_double(record, "CTF")
                    .map_or(0.0, |v| ctx.units.to_si(Dimension::Transmissibility, v));
                connection.diameter = opt_double(record, "DIAMETER")
                    .map_or(0.0, |v| ctx.units.to_si(Dimension::Length, v));
                connection.skin = opt_double(record, "SKIN").unwrap_or(0.0);
                connection.depth = opt_double(record, "DEPTH")
                    .map_or(0.0, |v| ctx.units.to_si(Dimension::Length, v));
                if let Some(dir) = opt_string(record, "DIR") {
                    connection.direction = crate::well::ConnectionDirection::from_deck(dir)
                        .ok_or_else(|| invalid(keyword, "bad COMPDAT direction"))?;
                }
                connections.add(connection);
            }
            if well.update_connections(connections) {
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::CompletionChange);
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_compord(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let token = req_string(keyword, record, "ORDER")?.to_string();
        let order = ConnectionOrder::from_deck(&token, &keyword.location)?;
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well.connections.ordering() != order {
                // Ordering policy is fixed at creation; a differing
                // COMPORD before any COMPDAT replaces the empty
                // collection, afterwards it is unsupported.
                if well.connections.is_empty() {
                    let conns =
                        crate::well::WellConnections::new(order, well.head_i, well.head_j);
                    well.update_connections(conns);
                    ctx.state.update_well(well, ctx.step);
                } else {
                    ctx.parse_context.handle(
                        ErrorKind::UnsupportedKeywordVariant,
                        SchedError::UnsupportedKeyword {
                            keyword: "COMPORD".to_string(),
                            reason: format!(
                                "cannot reorder existing connections of well '{name}'"
                            ),
                            location: keyword.location.clone(),
                        },
                        ctx.guard,
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_welsegs(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let mut records = keyword.iter();
    let header = records
        .next()
        .ok_or_else(|| invalid(keyword, "WELSEGS needs a header record"))?;
    let name = req_string(keyword, header, "WELL")?.to_string();
    let top_depth = opt_double(header, "TOP_DEPTH")
        .map_or(0.0, |d| ctx.units.to_si(Dimension::Length, d));

    let mut well = ctx.state.well(&name, ctx.step)?.clone();
    let mut segments = WellSegments::new(Segment::top(top_depth));
    for record in records {
        let number = opt_int(record, "SEGMENT")
            .ok_or_else(|| invalid(keyword, "WELSEGS record needs a segment number"))?
            as i32;
        let branch = opt_int(record, "BRANCH").unwrap_or(1) as i32;
        let outlet = opt_int(record, "OUTLET").unwrap_or(1) as i32;
        segments.add(Segment {
            number,
            branch,
            outlet: Some(outlet),
            depth: opt_double(record, "DEPTH")
                .map_or(top_depth, |d| ctx.units.to_si(Dimension::Length, d)),
            length: opt_double(record, "LENGTH")
                .map_or(0.0, |l| ctx.units.to_si(Dimension::Length, l)),
            diameter: opt_double(record, "DIAMETER")
                .map_or(0.0, |d| ctx.units.to_si(Dimension::Length, d)),
            roughness: opt_double(record, "ROUGHNESS")
                .map_or(0.0, |r| ctx.units.to_si(Dimension::Length, r)),
        });
    }
    if well.update_segments(segments) {
        ctx.state
            .add_entity_event(ctx.step, &name, ScheduleEvent::CompletionChange);
        ctx.state.update_well(well, ctx.step);
    }
    Ok(())
}

fn handle_compsegs(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let mut records = keyword.iter();
    let header = records
        .next()
        .ok_or_else(|| invalid(keyword, "COMPSEGS needs a header record"))?;
    let name = req_string(keyword, header, "WELL")?.to_string();
    let mut well = ctx.state.well(&name, ctx.step)?.clone();
    if !well.is_multi_segment() {
        return Err(invalid(
            keyword,
            format!("COMPSEGS for well '{name}' without WELSEGS"),
        ));
    }

    let mut connections = well.connections.clone();
    let mut changed = false;
    for record in records {
        let i = cell_index(record, "I");
        let j = cell_index(record, "J");
        let k = cell_index(record, "K");
        let segment = opt_int(record, "SEGMENT")
            .ok_or_else(|| invalid(keyword, "COMPSEGS record needs a segment number"))?
            as i32;
        let mut updated = connections.clone();
        let mut hit = false;
        let mapped: Vec<Connection> = updated
            .iter()
            .cloned()
            .map(|mut c| {
                if c.matches_cell(i, j, k) && c.segment != Some(segment) {
                    c.segment = Some(segment);
                    hit = true;
                }
                c
            })
            .collect();
        if hit {
            let mut rebuilt = crate::well::WellConnections::new(
                connections.ordering(),
                well.head_i,
                well.head_j,
            );
            for c in mapped {
                rebuilt.add(c);
            }
            updated = rebuilt;
            connections = updated;
            changed = true;
        }
    }
    if changed && well.update_connections(connections) {
        ctx.state
            .add_entity_event(ctx.step, &name, ScheduleEvent::CompletionChange);
        ctx.state.update_well(well, ctx.step);
    }
    Ok(())
}

fn production_from_record(
    ctx: &HandlerContext<'_>,
    record: &DeckRecord,
    predict: bool,
) -> ProductionProperties {
    let mut props = ProductionProperties {
        predict,
        ..ProductionProperties::default()
    };
    props.oil_rate = opt_double(record, "ORAT")
        .map_or(0.0, |v| ctx.units.to_si(Dimension::LiquidSurfaceRate, v));
    props.water_rate = opt_double(record, "WRAT")
        .map_or(0.0, |v| ctx.units.to_si(Dimension::LiquidSurfaceRate, v));
    props.gas_rate = opt_double(record, "GRAT")
        .map_or(0.0, |v| ctx.units.to_si(Dimension::GasSurfaceRate, v));
    props.liquid_rate = opt_double(record, "LRAT")
        .map_or(0.0, |v| ctx.units.to_si(Dimension::LiquidSurfaceRate, v));
    props.resv_rate = opt_double(record, "RESV")
        .map_or(0.0, |v| ctx.units.to_si(Dimension::ReservoirRate, v));
    props.bhp_limit = opt_double(record, "BHP").map_or(
        crate::well::DEFAULT_BHP_LIMIT,
        |v| ctx.units.to_si(Dimension::Pressure, v),
    );
    props.thp_limit = opt_double(record, "THP")
        .map_or(0.0, |v| ctx.units.to_si(Dimension::Pressure, v));
    props.alq = opt_double(record, "ALQ").unwrap_or(0.0);
    props.vfp_table = opt_int(record, "VFP_TABLE").unwrap_or(0) as i32;

    if item_set(record, "ORAT") {
        props.add_control(ProducerCMode::Orat);
    }
    if item_set(record, "WRAT") {
        props.add_control(ProducerCMode::Wrat);
    }
    if item_set(record, "GRAT") {
        props.add_control(ProducerCMode::Grat);
    }
    if item_set(record, "LRAT") {
        props.add_control(ProducerCMode::Lrat);
    }
    if item_set(record, "RESV") {
        props.add_control(ProducerCMode::Resv);
    }
    if item_set(record, "THP") {
        props.add_control(ProducerCMode::Thp);
    }
    props.add_control(ProducerCMode::Bhp);
    props
}

fn apply_status(
    ctx: &mut HandlerContext<'_>,
    well: &mut Well,
    status: Option<WellStatus>,
) -> bool {
    match status {
        Some(status) if well.update_status(status) => {
            ctx.state
                .add_entity_event(ctx.step, &well.name, ScheduleEvent::WellStatusChange);
            true
        }
        _ => false,
    }
}

/// Shuts a well whose active control block forbids flow: zero rates
/// with crossflow banned.
fn shut_if_zero_rate(ctx: &mut HandlerContext<'_>, well: &mut Well) -> bool {
    if well.status == WellStatus::Open && well.must_shut_on_zero_rate() {
        warn!(well = %well.name, step = ctx.step, "zero-rate well with crossflow banned, shutting");
        well.update_status(WellStatus::Shut);
        ctx.state
            .add_entity_event(ctx.step, &well.name, ScheduleEvent::WellStatusChange);
        true
    } else {
        false
    }
}

fn handle_wconprod(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let status = opt_string(record, "STATUS").and_then(WellStatus::from_deck);
        let cmode = opt_string(record, "CMODE").and_then(ProducerCMode::from_deck);
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            let switched = well.is_injector();
            let mut props = production_from_record(ctx, record, true);
            props.cmode = cmode;
            props.has_produced = well.production.has_produced || !props.is_zero_rate();

            let mut changed = well.update_production(props);
            changed |= apply_status(ctx, &mut well, status);
            changed |= shut_if_zero_rate(ctx, &mut well);
            if changed {
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::ProductionUpdate);
                if switched {
                    ctx.state.add_entity_event(
                        ctx.step,
                        &name,
                        ScheduleEvent::WellSwitchedInjectorProducer,
                    );
                }
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wconhist(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let whistctl = ctx.state.whistctl.get(ctx.step).copied().flatten();
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let status = opt_string(record, "STATUS").and_then(WellStatus::from_deck);
        let record_cmode = opt_string(record, "CMODE").and_then(ProducerCMode::from_deck);
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            let switched = well.is_injector();
            let mut props = production_from_record(ctx, record, false);
            // WHISTCTL overrides the record's control for every
            // history-mode producer.
            props.cmode = whistctl.or(record_cmode);
            props.reset_default_bhp_limit();
            props.has_produced = true;

            let mut changed = well.update_production(props);
            changed |= apply_status(ctx, &mut well, status);
            if changed {
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::ProductionUpdate);
                if switched {
                    ctx.state.add_entity_event(
                        ctx.step,
                        &name,
                        ScheduleEvent::WellSwitchedInjectorProducer,
                    );
                }
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn injection_from_record(
    ctx: &HandlerContext<'_>,
    keyword: &DeckKeyword,
    record: &DeckRecord,
    predict: bool,
) -> SchedResult<InjectionProperties> {
    let injector_type = req_string(keyword, record, "TYPE")
        .ok()
        .and_then(InjectorType::from_deck)
        .ok_or_else(|| invalid(keyword, "bad injector type"))?;
    let rate_dim = match injector_type {
        InjectorType::Gas => Dimension::GasSurfaceRate,
        _ => Dimension::LiquidSurfaceRate,
    };
    let mut props = InjectionProperties {
        injector_type,
        predict,
        ..InjectionProperties::default()
    };
    props.surface_rate = opt_double(record, "RATE")
        .map_or(0.0, |v| ctx.units.to_si(rate_dim, v));
    props.reservoir_rate = opt_double(record, "RESV")
        .map_or(0.0, |v| ctx.units.to_si(Dimension::ReservoirRate, v));
    props.bhp_limit = ctx.units.to_si(
        Dimension::Pressure,
        opt_double(record, "BHP").unwrap_or(WCONINJE_BHP_DEFAULT),
    );
    props.thp_limit = opt_double(record, "THP")
        .map_or(0.0, |v| ctx.units.to_si(Dimension::Pressure, v));
    props.vfp_table = opt_int(record, "VFP_TABLE").unwrap_or(0) as i32;

    if item_set(record, "RATE") {
        props.add_control(InjectorCMode::Rate);
    }
    if item_set(record, "RESV") {
        props.add_control(InjectorCMode::Resv);
    }
    if item_set(record, "THP") {
        props.add_control(InjectorCMode::Thp);
    }
    props.add_control(InjectorCMode::Bhp);
    props.has_injected = !props.is_zero_rate();
    Ok(props)
}

fn handle_wconinje(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let status = opt_string(record, "STATUS").and_then(WellStatus::from_deck);
        let cmode = opt_string(record, "CMODE").and_then(InjectorCMode::from_deck);
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            let switched = well.is_producer();
            let previous_type = match well.well_type {
                crate::well::WellType::Injector { fluid } => Some(fluid),
                crate::well::WellType::Producer => None,
            };
            let mut props = injection_from_record(ctx, keyword, record, true)?;
            props.cmode = cmode;
            props.has_injected = well.injection.has_injected || props.has_injected;
            let new_type = props.injector_type;

            let mut changed = well.update_injection(props);
            changed |= apply_status(ctx, &mut well, status);
            changed |= shut_if_zero_rate(ctx, &mut well);
            if changed {
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::InjectionUpdate);
                if switched {
                    ctx.state.add_entity_event(
                        ctx.step,
                        &name,
                        ScheduleEvent::WellSwitchedInjectorProducer,
                    );
                } else if previous_type.is_some_and(|t| t != new_type) {
                    ctx.state.add_entity_event(
                        ctx.step,
                        &name,
                        ScheduleEvent::InjectionTypeChanged,
                    );
                }
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wconinjh(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let status = opt_string(record, "STATUS").and_then(WellStatus::from_deck);
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            let switched = well.is_producer();
            let mut props = injection_from_record(ctx, keyword, record, false)?;
            props.cmode = Some(InjectorCMode::Rate);
            props.has_injected = true;

            let mut changed = well.update_injection(props);
            changed |= apply_status(ctx, &mut well, status);
            if changed {
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::InjectionUpdate);
                if switched {
                    ctx.state.add_entity_event(
                        ctx.step,
                        &name,
                        ScheduleEvent::WellSwitchedInjectorProducer,
                    );
                }
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_welopen(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let status_token = req_string(keyword, record, "STATUS")?.to_string();
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;

        // All cell/completion items defaulted: a plain status change.
        // Any of them set: a connection-state change.
        let well_level = record.all_defaulted_after(2);
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well_level {
                let status = WellStatus::from_deck(&status_token)
                    .ok_or_else(|| invalid(keyword, "bad WELOPEN status"))?;
                let opened = status == WellStatus::Open && well.status != WellStatus::Open;
                if apply_status(ctx, &mut well, Some(status)) {
                    if opened {
                        ctx.state.add_entity_event(
                            ctx.step,
                            &name,
                            ScheduleEvent::RequestOpenWell,
                        );
                        if ctx.rft.rft_on_open(ctx.step) {
                            ctx.rft.update(name.clone(), ctx.step, RftMode::Rft);
                        }
                    }
                    ctx.state.update_well(well, ctx.step);
                }
            } else {
                let state = ConnectionState::from_deck(&status_token)
                    .ok_or_else(|| invalid(keyword, "bad WELOPEN connection status"))?;
                let i = cell_index(record, "I");
                let j = cell_index(record, "J");
                let k = cell_index(record, "K");
                let mut connections = well.connections.clone();
                let changed = connections.set_state(i, j, k, state);
                if changed > 0 {
                    well.update_connections(connections);
                    ctx.state
                        .add_entity_event(ctx.step, &name, ScheduleEvent::CompletionChange);
                    ctx.state.update_well(well, ctx.step);
                }
            }
        }
    }
    Ok(())
}

fn handle_welpi(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        // Productivity-index targets are consumed by the simulator; the
        // schedule only records which wells need their CTFs rescaled.
        for name in wells {
            if !ctx.update.welpi_wells.contains(&name) {
                ctx.update.welpi_wells.push(name);
            }
        }
    }
    Ok(())
}

fn handle_wecon(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let limits = EconLimits {
            min_oil_rate: opt_double(record, "MIN_OIL_RATE")
                .map_or(0.0, |v| ctx.units.to_si(Dimension::LiquidSurfaceRate, v)),
            min_gas_rate: opt_double(record, "MIN_GAS_RATE")
                .map_or(0.0, |v| ctx.units.to_si(Dimension::GasSurfaceRate, v)),
            max_water_cut: opt_double(record, "MAX_WATER_CUT").unwrap_or(0.0),
            max_gas_oil_ratio: opt_double(record, "MAX_GOR").unwrap_or(0.0),
            max_water_gas_ratio: opt_double(record, "MAX_WGR").unwrap_or(0.0),
            end_run: opt_string(record, "END_RUN").map_or(false, yes_no),
        };
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well.update_econ_limits(limits.clone()) {
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wefac(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let factor = opt_double(record, "EFFICIENCY_FACTOR").unwrap_or(1.0);
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well.update_efficiency_factor(factor) {
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_weltarg(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let target = req_string(keyword, record, "CMODE")?.to_string();
        let raw = opt_double(record, "NEW_VALUE")
            .ok_or_else(|| invalid(keyword, "WELTARG needs a new value"))?;
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            let changed = if well.is_producer() {
                let mut props = well.production.clone();
                match target.as_str() {
                    "ORAT" => props.oil_rate = ctx.units.to_si(Dimension::LiquidSurfaceRate, raw),
                    "WRAT" => props.water_rate = ctx.units.to_si(Dimension::LiquidSurfaceRate, raw),
                    "GRAT" => props.gas_rate = ctx.units.to_si(Dimension::GasSurfaceRate, raw),
                    "LRAT" => props.liquid_rate = ctx.units.to_si(Dimension::LiquidSurfaceRate, raw),
                    "RESV" => props.resv_rate = ctx.units.to_si(Dimension::ReservoirRate, raw),
                    "BHP" => props.bhp_limit = ctx.units.to_si(Dimension::Pressure, raw),
                    "THP" => props.thp_limit = ctx.units.to_si(Dimension::Pressure, raw),
                    "VFP" => props.vfp_table = raw as i32,
                    "LIFT" => props.alq = raw,
                    other => {
                        return Err(invalid(keyword, format!("bad WELTARG target {other}")))
                    }
                }
                well.update_production(props)
            } else {
                let mut props = well.injection.clone();
                match target.as_str() {
                    "ORAT" | "WRAT" | "GRAT" | "RATE" => {
                        let dim = match props.injector_type {
                            InjectorType::Gas => Dimension::GasSurfaceRate,
                            _ => Dimension::LiquidSurfaceRate,
                        };
                        props.surface_rate = ctx.units.to_si(dim, raw);
                    }
                    "RESV" => props.reservoir_rate = ctx.units.to_si(Dimension::ReservoirRate, raw),
                    "BHP" => props.bhp_limit = ctx.units.to_si(Dimension::Pressure, raw),
                    "THP" => props.thp_limit = ctx.units.to_si(Dimension::Pressure, raw),
                    "VFP" => props.vfp_table = raw as i32,
                    other => {
                        return Err(invalid(keyword, format!("bad WELTARG target {other}")))
                    }
                }
                well.update_injection(props)
            };
            if changed {
                let event = if well.is_producer() {
                    ScheduleEvent::ProductionUpdate
                } else {
                    ScheduleEvent::InjectionUpdate
                };
                ctx.state.add_entity_event(ctx.step, &name, event);
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wgrupcon(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let guide = WellGuideRate {
            available: opt_string(record, "GROUP_CONTROLLED").map_or(true, yes_no),
            guide_rate: opt_double(record, "GUIDE_RATE").unwrap_or(-1.0),
            phase: opt_string(record, "PHASE").and_then(Phase::from_deck),
            scaling_factor: opt_double(record, "SCALING_FACTOR").unwrap_or(1.0),
        };
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well.update_guide_rate(guide.clone()) {
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_whistctl(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let record = keyword
        .iter()
        .next()
        .ok_or_else(|| invalid(keyword, "WHISTCTL needs a record"))?;
    let token = req_string(keyword, record, "CMODE")?;
    let cmode = match token {
        "NONE" => None,
        other => Some(
            ProducerCMode::from_deck(other)
                .ok_or_else(|| invalid(keyword, format!("bad WHISTCTL mode {other}")))?,
        ),
    };
    if opt_string(record, "BHP_TERMINATE").is_some_and(yes_no) {
        let err = SchedError::UnsupportedKeyword {
            keyword: "WHISTCTL".to_string(),
            reason: "terminating the run on BHP history control is not supported".to_string(),
            location: keyword.location.clone(),
        };
        ctx.parse_context
            .handle(ErrorKind::BhpHistoryTerminate, err, ctx.guard);
        ctx.guard.check()?;
    }
    ctx.state.whistctl.update(ctx.step, cmode);

    // Re-point every history-mode producer at the new control.
    let wells = ctx.state.well_names(ctx.step);
    for name in wells {
        let well = ctx.state.well(&name, ctx.step)?;
        if well.is_producer() && !well.production.predict {
            let mut well = well.clone();
            let mut props = well.production.clone();
            props.cmode = cmode.or(props.cmode);
            if well.update_production(props) {
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::ProductionUpdate);
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wlist(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let name = req_string(keyword, record, "NAME")?.to_string();
        if !name.starts_with('*') || name.len() < 2 {
            return Err(invalid(
                keyword,
                format!("well list name '{name}' must start with '*'"),
            ));
        }
        let action = req_string(keyword, record, "ACTION")?;
        let action = WListAction::from_deck(action)
            .ok_or_else(|| invalid(keyword, format!("bad WLIST action {action}")))?;

        let mut wells = Vec::new();
        if let Some(item) = record.get_item("WELLS") {
            for idx in 0..item.values.len() {
                if let Some(pattern) = item.get_string(idx) {
                    wells.extend(resolve_wells(ctx, pattern, &keyword.location)?);
                }
            }
        }

        let mut manager = ctx.state.wlists.get(ctx.step).cloned().unwrap_or_default();
        let ok = match action {
            WListAction::New => {
                manager.new_list(&name, &wells);
                true
            }
            WListAction::Add => manager.add_wells(&name, &wells),
            WListAction::Del => manager.del_wells(&name, &wells),
            WListAction::Mov => manager.move_wells(&name, &wells),
        };
        if !ok {
            return Err(StructuralError::UndefinedWellList {
                list: name,
                location: keyword.location.clone(),
            }
            .into());
        }
        ctx.state.wlists.update(ctx.step, manager);
    }
    Ok(())
}

fn handle_wsolvent(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let fraction = opt_double(record, "SOLVENT_FRACTION").unwrap_or(0.0);
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well.update_solvent_fraction(fraction) {
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wfoam(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let foam = crate::well::FoamProperties {
            concentration: opt_double(record, "FOAM_CONCENTRATION").unwrap_or(0.0),
        };
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well.update_foam(foam) {
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wpolymer(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let polymer = crate::well::PolymerProperties {
            polymer_concentration: opt_double(record, "POLYMER_CONCENTRATION").unwrap_or(0.0),
            salt_concentration: opt_double(record, "SALT_CONCENTRATION").unwrap_or(0.0),
        };
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well.update_polymer(polymer) {
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wsalt(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let brine = crate::well::BrineProperties {
            concentration: opt_double(record, "CONCENTRATION").unwrap_or(0.0),
        };
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            if well.update_brine(brine) {
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_wtracer(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let tracer = req_string(keyword, record, "TRACER")?.to_string();
        let concentration = opt_double(record, "CONCENTRATION").unwrap_or(0.0);
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            let mut well = ctx.state.well(&name, ctx.step)?.clone();
            let mut tracers = well.tracers.clone();
            tracers.set(tracer.clone(), concentration);
            if well.update_tracers(tracers) {
                ctx.state.update_well(well, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_gruptree(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let child = req_string(keyword, record, "CHILD")?.to_string();
        let parent = opt_string(record, "PARENT").unwrap_or(FIELD).to_string();
        if child == FIELD {
            return Err(invalid(keyword, "FIELD cannot be reparented"));
        }
        ensure_group(ctx, &parent)?;
        ensure_group(ctx, &child)?;

        // Walk parent links on current snapshots to reject cycles.
        let step = ctx.step;
        let parents: std::collections::HashMap<String, String> = ctx
            .state
            .group_names(step)
            .into_iter()
            .filter_map(|name| {
                let p = ctx.state.group(&name, step).ok()?.parent.clone()?;
                Some((name, p))
            })
            .collect();
        check_group_cycle(&child, &parent, |name| {
            parents.get(name).map(String::as_str)
        })?;

        let mut group = ctx.state.group(&child, ctx.step)?.clone();
        let old_parent = group.parent.clone();
        if group.update_parent(parent.clone()) {
            if let Some(old) = old_parent {
                let mut old_group = ctx.state.group(&old, ctx.step)?.clone();
                old_group.del_group(&child);
                ctx.state.update_group(old_group, ctx.step);
            }
            let mut new_parent = ctx.state.group(&parent, ctx.step)?.clone();
            new_parent.add_group(&child);
            ctx.state.update_group(new_parent, ctx.step);
            ctx.state.update_group(group, ctx.step);
            ctx.state
                .add_entity_event(ctx.step, &child, ScheduleEvent::GroupChange);
        }
    }
    Ok(())
}

fn handle_gconprod(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "GROUP")?.to_string();
        let props = GroupProductionProperties {
            cmode: opt_string(record, "CMODE").and_then(GroupProducerCMode::from_deck),
            oil_target: opt_double(record, "OIL_TARGET")
                .map_or(0.0, |v| ctx.units.to_si(Dimension::LiquidSurfaceRate, v)),
            water_target: opt_double(record, "WATER_TARGET")
                .map_or(0.0, |v| ctx.units.to_si(Dimension::LiquidSurfaceRate, v)),
            gas_target: opt_double(record, "GAS_TARGET")
                .map_or(0.0, |v| ctx.units.to_si(Dimension::GasSurfaceRate, v)),
            liquid_target: opt_double(record, "LIQUID_TARGET")
                .map_or(0.0, |v| ctx.units.to_si(Dimension::LiquidSurfaceRate, v)),
            resv_target: opt_double(record, "RESV_TARGET")
                .map_or(0.0, |v| ctx.units.to_si(Dimension::ReservoirRate, v)),
            respond_to_parent: opt_string(record, "RESPOND").map_or(true, yes_no),
        };
        let groups = resolve_groups(ctx, &pattern, &keyword.location)?;
        for name in groups {
            let mut group = ctx.state.group(&name, ctx.step)?.clone();
            if group.update_production(props.clone()) {
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::GroupProductionUpdate);
                ctx.state.update_group(group, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_gconinje(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "GROUP")?.to_string();
        let phase = opt_string(record, "PHASE")
            .and_then(Phase::from_deck)
            .ok_or_else(|| invalid(keyword, "GCONINJE needs a phase"))?;
        let rate_dim = match phase {
            Phase::Gas => Dimension::GasSurfaceRate,
            _ => Dimension::LiquidSurfaceRate,
        };
        let props = GroupInjectionProperties {
            phase,
            cmode: opt_string(record, "CMODE").and_then(GroupInjectorCMode::from_deck),
            surface_target: opt_double(record, "SURFACE_TARGET")
                .map_or(0.0, |v| ctx.units.to_si(rate_dim, v)),
            resv_target: opt_double(record, "RESV_TARGET")
                .map_or(0.0, |v| ctx.units.to_si(Dimension::ReservoirRate, v)),
            reinjection_fraction: opt_double(record, "REIN_FRACTION").unwrap_or(0.0),
            voidage_fraction: opt_double(record, "VREP_FRACTION").unwrap_or(0.0),
            respond_to_parent: opt_string(record, "RESPOND").map_or(true, yes_no),
        };
        let groups = resolve_groups(ctx, &pattern, &keyword.location)?;
        for name in groups {
            let mut group = ctx.state.group(&name, ctx.step)?.clone();
            if group.update_injection(props.clone()) {
                ctx.state
                    .add_entity_event(ctx.step, &name, ScheduleEvent::GroupInjectionUpdate);
                ctx.state.update_group(group, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_gefac(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "GROUP")?.to_string();
        let factor = opt_double(record, "EFFICIENCY_FACTOR").unwrap_or(1.0);
        let groups = resolve_groups(ctx, &pattern, &keyword.location)?;
        for name in groups {
            let mut group = ctx.state.group(&name, ctx.step)?.clone();
            if group.update_efficiency_factor(factor) {
                ctx.state.update_group(group, ctx.step);
            }
        }
    }
    Ok(())
}

fn handle_guiderat(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let record = keyword
        .iter()
        .next()
        .ok_or_else(|| invalid(keyword, "GUIDERAT needs a record"))?;
    let model = GuideRateModel {
        time_interval: opt_double(record, "TIME_INTERVAL")
            .map_or(0.0, |d| ctx.units.to_si(Dimension::Time, d)),
        target: opt_string(record, "TARGET")
            .and_then(GuideRateTarget::from_deck)
            .unwrap_or_default(),
        coefficients: [
            opt_double(record, "A").unwrap_or(0.0),
            opt_double(record, "B").unwrap_or(0.0),
            opt_double(record, "C").unwrap_or(0.0),
            opt_double(record, "D").unwrap_or(0.0),
            opt_double(record, "E").unwrap_or(0.0),
            opt_double(record, "F").unwrap_or(0.0),
        ],
        allow_increase: opt_string(record, "ALLOW_INCREASE").map_or(true, yes_no),
        damping_factor: opt_double(record, "DAMPING_FACTOR").unwrap_or(1.0),
    };
    let mut config = ctx
        .state
        .guide_rate
        .get(ctx.step)
        .cloned()
        .unwrap_or_default();
    if config.update_model(model) {
        ctx.state.guide_rate.update(ctx.step, config);
    }
    Ok(())
}

fn handle_tuning(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let record = keyword
        .iter()
        .next()
        .ok_or_else(|| invalid(keyword, "TUNING needs a record"))?;
    let mut tuning = ctx.state.tuning.get(ctx.step).cloned().unwrap_or_default();
    if let Some(v) = opt_double(record, "TSINIT") {
        tuning.tsinit = ctx.units.to_si(Dimension::Time, v);
    }
    if let Some(v) = opt_double(record, "TSMAXZ") {
        tuning.tsmaxz = ctx.units.to_si(Dimension::Time, v);
    }
    if let Some(v) = opt_double(record, "TSMINZ") {
        tuning.tsminz = ctx.units.to_si(Dimension::Time, v);
    }
    if let Some(v) = opt_double(record, "TFDIFF") {
        tuning.tfdiff = v;
    }
    if let Some(v) = opt_double(record, "TRGTTE") {
        tuning.trgtte = v;
    }
    if let Some(v) = opt_int(record, "NEWTMX") {
        tuning.newtmx = v as i32;
    }
    if let Some(v) = opt_int(record, "NEWTMN") {
        tuning.newtmn = v as i32;
    }
    if let Some(v) = opt_int(record, "LITMAX") {
        tuning.litmax = v as i32;
    }
    if ctx.state.tuning.update_if_changed(ctx.step, tuning) {
        ctx.state.add_event(ctx.step, ScheduleEvent::TuningChange);
        ctx.update.tuning_changed = true;
    }
    Ok(())
}

fn handle_nupcol(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let record = keyword
        .iter()
        .next()
        .ok_or_else(|| invalid(keyword, "NUPCOL needs a record"))?;
    let value = opt_int(record, "NUM").unwrap_or(12) as i32;
    ctx.state.nupcol.update_if_changed(ctx.step, value);
    Ok(())
}

fn handle_messages(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let record = keyword
        .iter()
        .next()
        .ok_or_else(|| invalid(keyword, "MESSAGES needs a record"))?;
    let mut limits = ctx
        .state
        .message_limits
        .get(ctx.step)
        .cloned()
        .unwrap_or_default();
    if let Some(v) = opt_int(record, "MESSAGE_PRINT_LIMIT") {
        limits.message_print = v as i32;
    }
    if let Some(v) = opt_int(record, "COMMENT_PRINT_LIMIT") {
        limits.comment_print = v as i32;
    }
    if let Some(v) = opt_int(record, "WARNING_PRINT_LIMIT") {
        limits.warning_print = v as i32;
    }
    if let Some(v) = opt_int(record, "PROBLEM_PRINT_LIMIT") {
        limits.problem_print = v as i32;
    }
    if let Some(v) = opt_int(record, "ERROR_PRINT_LIMIT") {
        limits.error_print = v as i32;
    }
    if let Some(v) = opt_int(record, "WARNING_STOP_LIMIT") {
        limits.warning_stop = v as i32;
    }
    if let Some(v) = opt_int(record, "PROBLEM_STOP_LIMIT") {
        limits.problem_stop = v as i32;
    }
    if let Some(v) = opt_int(record, "ERROR_STOP_LIMIT") {
        limits.error_stop = v as i32;
    }
    ctx.state.message_limits.update_if_changed(ctx.step, limits);
    Ok(())
}

fn handle_vappars(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let record = keyword
        .iter()
        .next()
        .ok_or_else(|| invalid(keyword, "VAPPARS needs a record"))?;
    let props = OilVaporizationProperties {
        vap1: opt_double(record, "VAP1").unwrap_or(0.0),
        vap2: opt_double(record, "VAP2").unwrap_or(0.0),
    };
    ctx.state.oil_vaporization.update_if_changed(ctx.step, props);
    Ok(())
}

fn axis(keyword: &DeckKeyword, record: &DeckRecord, item: &str) -> SchedResult<Vec<f64>> {
    let item_ref = record
        .get_item(item)
        .ok_or_else(|| invalid(keyword, format!("missing VFP axis {item}")))?;
    let values: Vec<f64> = (0..item_ref.values.len())
        .filter_map(|idx| item_ref.get_double(idx))
        .collect();
    if values.is_empty() {
        return Err(invalid(keyword, format!("empty VFP axis {item}")));
    }
    Ok(values)
}

fn handle_vfpprod(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let mut records = keyword.iter();
    let header = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPPROD needs a header record"))?;
    let table_id = opt_int(header, "TABLE")
        .ok_or_else(|| invalid(keyword, "VFPPROD needs a table number"))? as i32;
    let flow_kind = opt_string(header, "RATE_TYPE")
        .and_then(VfpFlowKind::from_deck)
        .ok_or_else(|| invalid(keyword, "bad VFPPROD rate type"))?;
    let alq_kind = opt_string(header, "ALQ_TYPE")
        .and_then(VfpAlqKind::from_deck)
        .unwrap_or_default();

    let flo = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPPROD needs a flow axis record"))?;
    let thp = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPPROD needs a THP axis record"))?;
    let wfr = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPPROD needs a WFR axis record"))?;
    let gfr = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPPROD needs a GFR axis record"))?;
    let alq = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPPROD needs an ALQ axis record"))?;

    let mut bhp_values = Vec::new();
    for record in records {
        if let Some(item) = record.get_item("BHP") {
            for idx in 0..item.values.len() {
                if let Some(v) = item.get_double(idx) {
                    bhp_values.push(ctx.units.to_si(Dimension::Pressure, v));
                }
            }
        }
    }

    let table = VfpProdTable {
        table_id,
        datum_depth: opt_double(header, "DATUM_DEPTH")
            .map_or(0.0, |d| ctx.units.to_si(Dimension::Length, d)),
        flow_kind,
        alq_kind,
        flo_axis: axis(keyword, flo, "FLO")?,
        thp_axis: axis(keyword, thp, "THP")?
            .into_iter()
            .map(|v| ctx.units.to_si(Dimension::Pressure, v))
            .collect(),
        wfr_axis: axis(keyword, wfr, "WFR")?,
        gfr_axis: axis(keyword, gfr, "GFR")?,
        alq_axis: axis(keyword, alq, "ALQ")?,
        bhp_values,
    };
    if !table.is_consistent() {
        return Err(invalid(
            keyword,
            format!(
                "VFPPROD table {table_id} has {} BHP values, expected {}",
                table.bhp_values.len(),
                table.expected_values()
            ),
        ));
    }
    ctx.state.update_vfp_prod(table, ctx.step);
    Ok(())
}

fn handle_vfpinj(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let mut records = keyword.iter();
    let header = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPINJ needs a header record"))?;
    let table_id = opt_int(header, "TABLE")
        .ok_or_else(|| invalid(keyword, "VFPINJ needs a table number"))? as i32;
    let flow_kind = opt_string(header, "RATE_TYPE")
        .and_then(VfpFlowKind::from_deck)
        .ok_or_else(|| invalid(keyword, "bad VFPINJ rate type"))?;
    let flo = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPINJ needs a flow axis record"))?;
    let thp = records
        .next()
        .ok_or_else(|| invalid(keyword, "VFPINJ needs a THP axis record"))?;

    let mut bhp_values = Vec::new();
    for record in records {
        if let Some(item) = record.get_item("BHP") {
            for idx in 0..item.values.len() {
                if let Some(v) = item.get_double(idx) {
                    bhp_values.push(ctx.units.to_si(Dimension::Pressure, v));
                }
            }
        }
    }

    let table = VfpInjTable {
        table_id,
        datum_depth: opt_double(header, "DATUM_DEPTH")
            .map_or(0.0, |d| ctx.units.to_si(Dimension::Length, d)),
        flow_kind,
        flo_axis: axis(keyword, flo, "FLO")?,
        thp_axis: axis(keyword, thp, "THP")?
            .into_iter()
            .map(|v| ctx.units.to_si(Dimension::Pressure, v))
            .collect(),
        bhp_values,
    };
    if !table.is_consistent() {
        return Err(invalid(
            keyword,
            format!("VFPINJ table {table_id} value block does not match its axes"),
        ));
    }
    ctx.state.update_vfp_inj(table, ctx.step);
    Ok(())
}

fn handle_udq(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let mut config = ctx.state.udq.get(ctx.step).cloned().unwrap_or_default();
    for record in keyword.iter() {
        let action = req_string(keyword, record, "ACTION")?;
        let quantity = req_string(keyword, record, "QUANTITY")?.to_string();
        let data = record.get_item("DATA");
        match action {
            "DEFINE" => {
                let tokens: Vec<&str> = data
                    .map(|item| {
                        (0..item.values.len())
                            .filter_map(|idx| item.get_string(idx))
                            .collect()
                    })
                    .unwrap_or_default();
                config.add_define(quantity.as_str(), &tokens.join(" "))?;
            }
            "ASSIGN" => {
                let item = data.ok_or_else(|| invalid(keyword, "ASSIGN needs data"))?;
                let count = item.values.len();
                if count == 0 {
                    return Err(invalid(keyword, "ASSIGN needs a value"));
                }
                let value = item
                    .get_double(count - 1)
                    .or_else(|| item.get_string(count - 1).and_then(|s| s.parse().ok()))
                    .ok_or_else(|| invalid(keyword, "ASSIGN needs a numeric value"))?;
                let selectors: Vec<String> = (0..count - 1)
                    .filter_map(|idx| item.get_string(idx).map(str::to_string))
                    .collect();
                config.add_assign(quantity.as_str(), selectors, value);
            }
            "UNITS" => {
                let unit = data
                    .and_then(|item| item.get_string(0))
                    .ok_or_else(|| invalid(keyword, "UNITS needs a unit string"))?;
                config.add_unit(quantity.as_str(), unit);
            }
            other => {
                return Err(invalid(keyword, format!("bad UDQ action {other}")));
            }
        }
    }
    ctx.state.udq.update_if_changed(ctx.step, config);
    Ok(())
}

fn handle_wrft(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let mut any_well = false;
    for record in keyword.iter() {
        if let Some(pattern) = opt_string(record, "WELL") {
            let pattern = pattern.to_string();
            any_well = true;
            let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
            for name in wells {
                ctx.rft.update(name, ctx.step, RftMode::Rft);
            }
        }
    }
    if !any_well {
        // A bare WRFT arms RFT output for every well opened later.
        ctx.rft.set_rft_on_open(ctx.step);
    }
    Ok(())
}

fn handle_wrftplt(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    for record in keyword.iter() {
        let pattern = req_string(keyword, record, "WELL")?.to_string();
        let mode = opt_string(record, "OUTPUT")
            .and_then(RftMode::from_deck)
            .unwrap_or(RftMode::No);
        let wells = resolve_wells(ctx, &pattern, &keyword.location)?;
        for name in wells {
            ctx.rft.update(name, ctx.step, mode);
        }
    }
    Ok(())
}

fn handle_exit(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let status = keyword
        .iter()
        .next()
        .and_then(|record| opt_int(record, "STATUS"))
        .unwrap_or(0) as i32;
    ctx.update.exit_status = Some(status);
    Ok(())
}

fn handle_pyaction(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    let record = keyword
        .iter()
        .next()
        .ok_or_else(|| invalid(keyword, "PYACTION needs a record"))?;
    let name = req_string(keyword, record, "NAME")?.to_string();
    let filename = req_string(keyword, record, "FILENAME")?.to_string();

    ctx.parse_context.handle(
        ErrorKind::ScriptRuntimeMissing,
        SchedError::UnsupportedKeyword {
            keyword: "PYACTION".to_string(),
            reason: format!("no script runtime installed, action '{name}' will not run"),
            location: keyword.location.clone(),
        },
        ctx.guard,
    );

    let mut actions = ctx.state.actions.get(ctx.step).cloned().unwrap_or_default();
    actions.add_pyaction(PyAction { name, filename });
    ctx.state.actions.update_if_changed(ctx.step, actions);
    Ok(())
}

fn handle_geo_modifier(ctx: &mut HandlerContext<'_>, keyword: &DeckKeyword) -> SchedResult<()> {
    ctx.parse_context.handle(
        ErrorKind::UnsupportedGeoModifier,
        SchedError::UnsupportedKeyword {
            keyword: keyword.name.clone(),
            reason: "geo modifiers in SCHEDULE are recorded but not applied".to_string(),
            location: keyword.location.clone(),
        },
        ctx.guard,
    );
    ctx.state.add_event(ctx.step, ScheduleEvent::GeoModifier);
    Ok(())
}
