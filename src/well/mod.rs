//! Immutable well snapshots.
//!
//! A [`Well`] describes one well's full configuration at one report
//! step. Keyword handlers never mutate a stored snapshot in place: they
//! clone the current one, call the `update_*` methods on the clone, and
//! push the clone back into the well's `DynamicState` only when at
//! least one update reported a change.

pub mod connection;
pub mod properties;
pub mod segment;

use serde::{Deserialize, Serialize};

pub use connection::{
    Connection, ConnectionDirection, ConnectionOrder, ConnectionState, WellConnections,
};
pub use properties::{
    BrineProperties, EconLimits, FoamProperties, InjectionProperties, InjectorCMode, InjectorType,
    Phase, PolymerProperties, ProducerCMode, ProductionProperties, TracerProperties,
    WellGuideRate, DEFAULT_BHP_LIMIT,
};
pub use segment::{Segment, WellSegments};

/// Well status.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WellStatus {
    Open,
    /// Fully closed, no wellbore flow.
    Shut,
    /// Closed at surface, crossflow in the wellbore still possible.
    Stop,
    /// Opens automatically when economics allow.
    Auto,
}

impl WellStatus {
    /// Parses a deck status token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "OPEN" => Some(Self::Open),
            "SHUT" => Some(Self::Shut),
            "STOP" => Some(Self::Stop),
            "AUTO" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Producer or injector role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WellType {
    /// Producing well.
    Producer,
    /// Injecting well.
    Injector {
        /// Injected fluid.
        fluid: InjectorType,
    },
}

/// One well's configuration at one report step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Well {
    /// Unique well name.
    pub name: String,
    /// Parent group name, a back-reference into the group tree.
    pub group: String,
    /// Report step the well was introduced at (first WELSPECS).
    pub init_step: usize,
    /// Sequence index, insertion order across all wells.
    pub insert_index: usize,
    /// 0-based wellhead grid I index.
    pub head_i: usize,
    /// 0-based wellhead grid J index.
    pub head_j: usize,
    /// BHP reference depth, SI; defaulted from the top connection.
    pub ref_depth: Option<f64>,
    /// Drainage radius, SI.
    pub drainage_radius: f64,
    /// Crossflow between connections allowed.
    pub allow_crossflow: bool,
    /// Shut (rather than stop) the well when it is closed automatically.
    pub auto_shutin: bool,
    /// PVT table id.
    pub pvt_table: i32,
    /// Preferred phase from WELSPECS.
    pub preferred_phase: Phase,
    /// Producer or injector.
    pub well_type: WellType,
    /// Current status.
    pub status: WellStatus,
    /// Group-control guide rate parameters.
    pub guide_rate: WellGuideRate,
    /// Efficiency factor (WEFAC), 1.0 if unset.
    pub efficiency_factor: f64,
    /// Solvent fraction in the injection stream (WSOLVENT).
    pub solvent_fraction: f64,
    /// Production configuration.
    pub production: ProductionProperties,
    /// Injection configuration.
    pub injection: InjectionProperties,
    /// Economic limits (WECON).
    pub econ_limits: EconLimits,
    /// Foam injection properties (WFOAM).
    pub foam: FoamProperties,
    /// Polymer injection properties (WPOLYMER).
    pub polymer: PolymerProperties,
    /// Brine injection properties (WSALT).
    pub brine: BrineProperties,
    /// Tracer injection properties (WTRACER).
    pub tracers: TracerProperties,
    /// Grid connections.
    pub connections: WellConnections,
    /// Segment structure, multi-segment wells only.
    pub segments: Option<WellSegments>,
}

impl Well {
    /// A new well as introduced by WELSPECS: a shut producer with no
    /// connections, preferred phase from the deck.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        init_step: usize,
        insert_index: usize,
        head_i: usize,
        head_j: usize,
        preferred_phase: Phase,
        order: ConnectionOrder,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            init_step,
            insert_index,
            head_i,
            head_j,
            ref_depth: None,
            drainage_radius: 0.0,
            allow_crossflow: true,
            auto_shutin: false,
            pvt_table: 0,
            preferred_phase,
            well_type: WellType::Producer,
            status: WellStatus::Shut,
            guide_rate: WellGuideRate::default(),
            efficiency_factor: 1.0,
            solvent_fraction: 0.0,
            production: ProductionProperties::default(),
            injection: InjectionProperties::default(),
            econ_limits: EconLimits::default(),
            foam: FoamProperties::default(),
            polymer: PolymerProperties::default(),
            brine: BrineProperties::default(),
            tracers: TracerProperties::default(),
            connections: WellConnections::new(order, head_i, head_j),
            segments: None,
        }
    }

    /// True for producers.
    #[must_use]
    pub const fn is_producer(&self) -> bool {
        matches!(self.well_type, WellType::Producer)
    }

    /// True for injectors.
    #[must_use]
    pub const fn is_injector(&self) -> bool {
        matches!(self.well_type, WellType::Injector { .. })
    }

    /// True if the well has segments.
    #[must_use]
    pub const fn is_multi_segment(&self) -> bool {
        self.segments.is_some()
    }

    /// Sets the status. Returns true when it actually changed.
    pub fn update_status(&mut self, status: WellStatus) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }

    /// Installs a production property block and makes the well a
    /// producer. Switching from injector resets the injection BHP
    /// limit. Returns true on any observable change.
    pub fn update_production(&mut self, production: ProductionProperties) -> bool {
        let switched = self.switch_to_producer();
        if self.production == production {
            return switched;
        }
        self.production = production;
        true
    }

    /// Installs an injection property block and makes the well an
    /// injector of the block's fluid. Switching from producer restores
    /// the default producer BHP limit. Returns true on any observable
    /// change.
    pub fn update_injection(&mut self, injection: InjectionProperties) -> bool {
        let switched = self.switch_to_injector(injection.injector_type);
        if self.injection == injection {
            return switched;
        }
        self.injection = injection;
        true
    }

    /// Makes the well a producer. Returns true if it was an injector.
    pub fn switch_to_producer(&mut self) -> bool {
        if self.is_producer() {
            return false;
        }
        self.well_type = WellType::Producer;
        self.injection.reset_bhp_limit();
        true
    }

    /// Makes the well an injector. Returns true if the role or the
    /// injected fluid changed.
    pub fn switch_to_injector(&mut self, fluid: InjectorType) -> bool {
        let target = WellType::Injector { fluid };
        if self.well_type == target {
            return false;
        }
        if self.is_producer() {
            self.production.reset_default_bhp_limit();
        }
        self.well_type = target;
        true
    }

    /// Replaces the connection collection. Returns true if different.
    pub fn update_connections(&mut self, connections: WellConnections) -> bool {
        if self.connections == connections {
            return false;
        }
        self.connections = connections;
        true
    }

    /// Installs a segment structure. Returns true if different.
    pub fn update_segments(&mut self, segments: WellSegments) -> bool {
        if self.segments.as_ref() == Some(&segments) {
            return false;
        }
        self.segments = Some(segments);
        true
    }

    /// Sets the efficiency factor. Returns true if different.
    pub fn update_efficiency_factor(&mut self, factor: f64) -> bool {
        if self.efficiency_factor == factor {
            return false;
        }
        self.efficiency_factor = factor;
        true
    }

    /// Sets the solvent fraction. Returns true if different.
    pub fn update_solvent_fraction(&mut self, fraction: f64) -> bool {
        if self.solvent_fraction == fraction {
            return false;
        }
        self.solvent_fraction = fraction;
        true
    }

    /// Installs economic limits. Returns true if different.
    pub fn update_econ_limits(&mut self, limits: EconLimits) -> bool {
        if self.econ_limits == limits {
            return false;
        }
        self.econ_limits = limits;
        true
    }

    /// Installs group-control guide rate parameters. Returns true if
    /// different.
    pub fn update_guide_rate(&mut self, guide_rate: WellGuideRate) -> bool {
        if self.guide_rate == guide_rate {
            return false;
        }
        self.guide_rate = guide_rate;
        true
    }

    /// Moves the well to a different parent group. Returns true if
    /// different.
    pub fn update_group(&mut self, group: impl Into<String>) -> bool {
        let group = group.into();
        if self.group == group {
            return false;
        }
        self.group = group;
        true
    }

    /// Installs foam properties. Returns true if different.
    pub fn update_foam(&mut self, foam: FoamProperties) -> bool {
        if self.foam == foam {
            return false;
        }
        self.foam = foam;
        true
    }

    /// Installs polymer properties. Returns true if different.
    pub fn update_polymer(&mut self, polymer: PolymerProperties) -> bool {
        if self.polymer == polymer {
            return false;
        }
        self.polymer = polymer;
        true
    }

    /// Installs brine properties. Returns true if different.
    pub fn update_brine(&mut self, brine: BrineProperties) -> bool {
        if self.brine == brine {
            return false;
        }
        self.brine = brine;
        true
    }

    /// Installs tracer properties. Returns true if different.
    pub fn update_tracers(&mut self, tracers: TracerProperties) -> bool {
        if self.tracers == tracers {
            return false;
        }
        self.tracers = tracers;
        true
    }

    /// True if the well has connections and every one is shut. Such a
    /// well is shut automatically when the report step advances.
    #[must_use]
    pub fn all_connections_shut(&self) -> bool {
        self.connections.all_shut()
    }

    /// True if the well's active control block specifies zero rates and
    /// crossflow is not allowed. Such a well cannot flow and is shut
    /// immediately by the keyword handler.
    #[must_use]
    pub fn must_shut_on_zero_rate(&self) -> bool {
        if self.allow_crossflow {
            return false;
        }
        match self.well_type {
            WellType::Producer => self.production.is_zero_rate(),
            WellType::Injector { .. } => self.injection.is_zero_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well() -> Well {
        Well::new("OP-1", "PLATFORM", 0, 0, 5, 5, Phase::Oil, ConnectionOrder::Track)
    }

    #[test]
    fn new_well_is_shut_producer() {
        let w = well();
        assert!(w.is_producer());
        assert_eq!(w.status, WellStatus::Shut);
        assert!(w.connections.is_empty());
        assert!(!w.is_multi_segment());
    }

    #[test]
    fn status_update_reports_change() {
        let mut w = well();
        assert!(w.update_status(WellStatus::Open));
        assert!(!w.update_status(WellStatus::Open));
    }

    #[test]
    fn identical_production_block_is_not_a_change() {
        let mut w = well();
        let props = w.production.clone();
        assert!(!w.update_production(props));
    }

    #[test]
    fn producer_to_injector_resets_producer_bhp() {
        let mut w = well();
        let mut props = w.production.clone();
        props.bhp_limit = 5.0e7;
        assert!(w.update_production(props));

        let mut inj = InjectionProperties::default();
        inj.injector_type = InjectorType::Water;
        inj.surface_rate = 100.0;
        assert!(w.update_injection(inj));
        assert!(w.is_injector());
        assert_eq!(w.production.bhp_limit, DEFAULT_BHP_LIMIT);
    }

    #[test]
    fn injector_to_producer_resets_injection_bhp() {
        let mut w = well();
        let mut inj = InjectionProperties::default();
        inj.bhp_limit = 4.0e7;
        inj.surface_rate = 100.0;
        w.update_injection(inj);

        assert!(w.switch_to_producer());
        assert_eq!(w.injection.bhp_limit, 0.0);
    }

    #[test]
    fn zero_rate_shut_depends_on_crossflow() {
        let mut w = well();
        assert!(!w.must_shut_on_zero_rate());
        w.allow_crossflow = false;
        assert!(w.must_shut_on_zero_rate());
        let mut props = w.production.clone();
        props.oil_rate = 10.0;
        w.update_production(props);
        assert!(!w.must_shut_on_zero_rate());
    }

    #[test]
    fn all_connections_shut_sweep_predicate() {
        let mut w = well();
        assert!(!w.all_connections_shut());
        let mut conns = w.connections.clone();
        let mut c = Connection::new(5, 5, 1);
        c.state = ConnectionState::Shut;
        conns.add(c);
        assert!(w.update_connections(conns));
        assert!(w.all_connections_shut());
    }

    #[test]
    fn group_move() {
        let mut w = well();
        assert!(w.update_group("NORTH"));
        assert!(!w.update_group("NORTH"));
        assert_eq!(w.group, "NORTH");
    }
}
