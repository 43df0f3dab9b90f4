//! Deck-unit to SI conversion.
//!
//! All physical quantities are SI-normalized at ingestion time; the
//! schedule stores SI only. The conversion factors follow the standard
//! METRIC/FIELD/LAB deck conventions.

use serde::{Deserialize, Serialize};

/// Physical dimension of a deck item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Lengths and depths.
    Length,
    /// Well bore diameters share Length in METRIC but inches in FIELD.
    Pressure,
    /// Surface liquid volume rate.
    LiquidSurfaceRate,
    /// Surface gas volume rate.
    GasSurfaceRate,
    /// Reservoir volume rate.
    ReservoirRate,
    /// Cumulative surface liquid volume.
    LiquidSurfaceVolume,
    /// Cumulative surface gas volume.
    GasSurfaceVolume,
    /// Time in days.
    Time,
    /// Temperature difference/absolute (treated as affine-free here).
    Temperature,
    /// Transmissibility-like connection factor.
    Transmissibility,
    /// Unitless quantities: efficiency factors, fractions, counts.
    Dimensionless,
}

/// Deck unit conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    /// Metric: bars, m3/day, metres.
    #[default]
    Metric,
    /// Field: psi, stb/day, Mscf/day, feet.
    Field,
    /// Lab: atm, cm3/hr, cm.
    Lab,
}

const BAR: f64 = 100_000.0;
const PSI: f64 = 6_894.757_293_168;
const ATM: f64 = 101_325.0;
const DAY: f64 = 86_400.0;
const HOUR: f64 = 3_600.0;
const FEET: f64 = 0.3048;
const STB: f64 = 0.158_987_294_928;
const MSCF: f64 = 28.316_846_592;
const CM3: f64 = 1.0e-6;

impl UnitSystem {
    /// Multiplier taking a deck value of `dim` to SI.
    #[must_use]
    pub fn si_factor(self, dim: Dimension) -> f64 {
        match (self, dim) {
            (_, Dimension::Dimensionless | Dimension::Temperature) => 1.0,

            (Self::Metric, Dimension::Length) => 1.0,
            (Self::Metric, Dimension::Pressure) => BAR,
            (Self::Metric, Dimension::LiquidSurfaceRate | Dimension::GasSurfaceRate | Dimension::ReservoirRate) => {
                1.0 / DAY
            }
            (Self::Metric, Dimension::LiquidSurfaceVolume | Dimension::GasSurfaceVolume) => 1.0,
            (Self::Metric, Dimension::Time) => DAY,
            (Self::Metric, Dimension::Transmissibility) => CM3 * BAR / DAY * 1.0e6,

            (Self::Field, Dimension::Length) => FEET,
            (Self::Field, Dimension::Pressure) => PSI,
            (Self::Field, Dimension::LiquidSurfaceRate | Dimension::ReservoirRate) => STB / DAY,
            (Self::Field, Dimension::GasSurfaceRate) => MSCF / DAY,
            (Self::Field, Dimension::LiquidSurfaceVolume) => STB,
            (Self::Field, Dimension::GasSurfaceVolume) => MSCF,
            (Self::Field, Dimension::Time) => DAY,
            (Self::Field, Dimension::Transmissibility) => CM3 * PSI / DAY * 1.0e6,

            (Self::Lab, Dimension::Length) => 0.01,
            (Self::Lab, Dimension::Pressure) => ATM,
            (Self::Lab, Dimension::LiquidSurfaceRate | Dimension::GasSurfaceRate | Dimension::ReservoirRate) => {
                CM3 / HOUR
            }
            (Self::Lab, Dimension::LiquidSurfaceVolume | Dimension::GasSurfaceVolume) => CM3,
            (Self::Lab, Dimension::Time) => HOUR,
            (Self::Lab, Dimension::Transmissibility) => CM3 * ATM / HOUR * 1.0e6,
        }
    }

    /// Converts a deck value to SI.
    #[must_use]
    pub fn to_si(self, dim: Dimension, value: f64) -> f64 {
        value * self.si_factor(dim)
    }

    /// Converts an SI value back to deck units.
    #[must_use]
    pub fn from_si(self, dim: Dimension, value: f64) -> f64 {
        value / self.si_factor(dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_pressure_is_bars() {
        let si = UnitSystem::Metric.to_si(Dimension::Pressure, 250.0);
        assert!((si - 25_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn field_pressure_is_psi() {
        let si = UnitSystem::Field.to_si(Dimension::Pressure, 1.0);
        assert!((si - 6_894.757_293_168).abs() < 1e-6);
    }

    #[test]
    fn metric_rate_is_m3_per_day() {
        // 86400 m3/day is exactly 1 m3/s.
        let si = UnitSystem::Metric.to_si(Dimension::LiquidSurfaceRate, 86_400.0);
        assert!((si - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dimensionless_is_identity() {
        for us in [UnitSystem::Metric, UnitSystem::Field, UnitSystem::Lab] {
            assert_eq!(us.to_si(Dimension::Dimensionless, 0.73), 0.73);
        }
    }

    #[test]
    fn round_trip_through_si() {
        let us = UnitSystem::Field;
        for dim in [
            Dimension::Length,
            Dimension::Pressure,
            Dimension::GasSurfaceRate,
            Dimension::Time,
        ] {
            let v = 123.456;
            let back = us.from_si(dim, us.to_si(dim, v));
            assert!((back - v).abs() < 1e-9, "{dim:?}");
        }
    }
}
