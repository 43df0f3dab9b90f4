//! Relative-tolerance schedule comparison.
//!
//! Restart verification needs "same schedule" to tolerate the float
//! noise a serialization round trip introduces. Scalars compare with a
//! relative tolerance, everything else exactly, and each difference is
//! reported as a human-readable line naming the entity and field.

use crate::well::Well;

use super::Schedule;

/// Default relative tolerance for float comparisons.
pub const DEFAULT_RTOL: f64 = 1.0e-6;

/// True when `a` and `b` agree within the relative tolerance. Exact
/// zeros only match exactly, so a vanished quantity never hides behind
/// the tolerance.
#[must_use]
pub fn close(a: f64, b: f64, rtol: f64) -> bool {
    if a == b {
        return true;
    }
    if a == 0.0 || b == 0.0 {
        return false;
    }
    (a - b).abs() <= rtol * a.abs().max(b.abs())
}

struct Diff {
    lines: Vec<String>,
    rtol: f64,
}

impl Diff {
    fn scalar(&mut self, entity: &str, field: &str, a: f64, b: f64) {
        if !close(a, b, self.rtol) {
            self.lines.push(format!("{entity}: {field} {a} != {b}"));
        }
    }

    fn exact<T: PartialEq + std::fmt::Debug>(&mut self, entity: &str, field: &str, a: &T, b: &T) {
        if a != b {
            self.lines.push(format!("{entity}: {field} {a:?} != {b:?}"));
        }
    }
}

fn diff_well(diff: &mut Diff, a: &Well, b: &Well) {
    let entity = format!("well {}", a.name);
    diff.exact(&entity, "group", &a.group, &b.group);
    diff.exact(&entity, "status", &a.status, &b.status);
    diff.exact(&entity, "type", &a.well_type, &b.well_type);
    diff.exact(&entity, "head", &(a.head_i, a.head_j), &(b.head_i, b.head_j));
    diff.scalar(
        &entity,
        "efficiency factor",
        a.efficiency_factor,
        b.efficiency_factor,
    );
    if a.is_producer() && b.is_producer() {
        let (pa, pb) = (&a.production, &b.production);
        diff.exact(&entity, "control mode", &pa.cmode, &pb.cmode);
        diff.scalar(&entity, "oil rate", pa.oil_rate, pb.oil_rate);
        diff.scalar(&entity, "water rate", pa.water_rate, pb.water_rate);
        diff.scalar(&entity, "gas rate", pa.gas_rate, pb.gas_rate);
        diff.scalar(&entity, "liquid rate", pa.liquid_rate, pb.liquid_rate);
        diff.scalar(&entity, "resv rate", pa.resv_rate, pb.resv_rate);
        diff.scalar(&entity, "bhp limit", pa.bhp_limit, pb.bhp_limit);
        diff.scalar(&entity, "thp limit", pa.thp_limit, pb.thp_limit);
    } else if a.is_injector() && b.is_injector() {
        let (ia, ib) = (&a.injection, &b.injection);
        diff.exact(&entity, "injector type", &ia.injector_type, &ib.injector_type);
        diff.exact(&entity, "control mode", &ia.cmode, &ib.cmode);
        diff.scalar(&entity, "surface rate", ia.surface_rate, ib.surface_rate);
        diff.scalar(&entity, "reservoir rate", ia.reservoir_rate, ib.reservoir_rate);
        diff.scalar(&entity, "bhp limit", ia.bhp_limit, ib.bhp_limit);
    }

    diff.exact(
        &entity,
        "connection count",
        &a.connections.len(),
        &b.connections.len(),
    );
    for (ca, cb) in a.connections.iter().zip(b.connections.iter()) {
        let cell = format!("{entity} connection ({},{},{})", ca.i + 1, ca.j + 1, ca.k + 1);
        diff.exact(&cell, "cell", &(ca.i, ca.j, ca.k), &(cb.i, cb.j, cb.k));
        diff.exact(&cell, "state", &ca.state, &cb.state);
        diff.scalar(&cell, "ctf", ca.ctf, cb.ctf);
        diff.exact(&cell, "segment", &ca.segment, &cb.segment);
    }

    match (&a.segments, &b.segments) {
        (Some(sa), Some(sb)) => {
            diff.exact(&entity, "segment count", &sa.len(), &sb.len());
            for (x, y) in sa.iter().zip(sb.iter()) {
                let seg = format!("{entity} segment {}", x.number);
                diff.exact(&seg, "branch", &x.branch, &y.branch);
                diff.exact(&seg, "outlet", &x.outlet, &y.outlet);
                diff.scalar(&seg, "depth", x.depth, y.depth);
                diff.scalar(&seg, "length", x.length, y.length);
            }
        }
        (None, None) => {}
        _ => diff.lines.push(format!("{entity}: multi-segment on one side only")),
    }
}

/// Compares two schedules at a report step. Returns one line per
/// difference; an empty result means the schedules agree within the
/// tolerance.
#[must_use]
pub fn diff_schedules(lhs: &Schedule, rhs: &Schedule, step: usize, rtol: f64) -> Vec<String> {
    let mut diff = Diff {
        lines: Vec::new(),
        rtol,
    };

    let lhs_wells = lhs.state().well_names(step);
    let rhs_wells = rhs.state().well_names(step);
    diff.exact("schedule", "well set", &lhs_wells, &rhs_wells);
    for name in lhs_wells.iter().filter(|n| rhs_wells.contains(n)) {
        if let (Ok(a), Ok(b)) = (lhs.get_well(name, step), rhs.get_well(name, step)) {
            diff_well(&mut diff, a, b);
        }
    }

    let lhs_groups = lhs.state().group_names(step);
    let rhs_groups = rhs.state().group_names(step);
    diff.exact("schedule", "group set", &lhs_groups, &rhs_groups);
    for name in lhs_groups.iter().filter(|n| rhs_groups.contains(n)) {
        if let (Ok(a), Ok(b)) = (lhs.get_group(name, step), rhs.get_group(name, step)) {
            let entity = format!("group {name}");
            diff.exact(&entity, "parent", &a.parent, &b.parent);
            diff.exact(&entity, "wells", &a.wells, &b.wells);
            diff.exact(&entity, "children", &a.groups, &b.groups);
            diff.scalar(
                &entity,
                "efficiency factor",
                a.efficiency_factor,
                b.efficiency_factor,
            );
        }
    }

    let ta = lhs.tuning(step);
    let tb = rhs.tuning(step);
    diff.scalar("tuning", "tsinit", ta.tsinit, tb.tsinit);
    diff.scalar("tuning", "tsmaxz", ta.tsmaxz, tb.tsmaxz);
    diff.scalar("tuning", "tsminz", ta.tsminz, tb.tsminz);
    diff.exact("tuning", "newtmx", &ta.newtmx, &tb.newtmx);

    diff.lines
}
