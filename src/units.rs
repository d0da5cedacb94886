//! Typed unit-conversion table for stream quantities.
//!
//! Replaces string-keyed conversion-factor dictionaries: a conversion is
//! only defined between units of the same physical dimension, and a
//! cross-dimension request fails loudly instead of silently missing a key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BalanceError;

/// Physical dimension of a stream quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Energy carriers (electricity, hydrogen, ...).
    Energy,
    /// Emission or resource mass (captured carbon, ...).
    Mass,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Energy => write!(f, "energy"),
            Dimension::Mass => write!(f, "mass"),
        }
    }
}

/// Unit of a stream quantity, serialized by its conventional symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Terawatt-hours.
    #[serde(rename = "TWh")]
    TerawattHour,
    /// Petajoules.
    #[serde(rename = "PJ")]
    Petajoule,
    /// Million tonnes of oil equivalent.
    #[serde(rename = "Mtoe")]
    MillionTonneOilEquivalent,
    /// Megatonnes.
    #[serde(rename = "Mt")]
    Megatonne,
    /// Gigatonnes.
    #[serde(rename = "Gt")]
    Gigatonne,
}

impl Unit {
    /// The physical dimension this unit measures.
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::TerawattHour | Unit::Petajoule | Unit::MillionTonneOilEquivalent => {
                Dimension::Energy
            }
            Unit::Megatonne | Unit::Gigatonne => Dimension::Mass,
        }
    }

    /// Conventional symbol (`"TWh"`, `"Mt"`, ...).
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::TerawattHour => "TWh",
            Unit::Petajoule => "PJ",
            Unit::MillionTonneOilEquivalent => "Mtoe",
            Unit::Megatonne => "Mt",
            Unit::Gigatonne => "Gt",
        }
    }

    /// How many base units (TWh for energy, Mt for mass) one of `self` is.
    fn base_units(&self) -> f64 {
        match self {
            Unit::TerawattHour => 1.0,
            // 1 PJ = 1/3.6 TWh
            Unit::Petajoule => 1.0 / 3.6,
            // 1 Mtoe = 11.63 TWh (IEA convention)
            Unit::MillionTonneOilEquivalent => 11.63,
            Unit::Megatonne => 1.0,
            Unit::Gigatonne => 1000.0,
        }
    }

    /// Multiplicative factor converting a quantity in `self` to `other`.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::UnitMismatch`] when the dimensions differ.
    pub fn factor_to(&self, other: Unit) -> Result<f64, BalanceError> {
        if self.dimension() != other.dimension() {
            return Err(BalanceError::UnitMismatch {
                from: self.symbol().to_string(),
                from_dim: self.dimension().to_string(),
                to: other.symbol().to_string(),
                to_dim: other.dimension().to_string(),
            });
        }
        Ok(self.base_units() / other.base_units())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_factor_is_one() {
        let f = Unit::TerawattHour
            .factor_to(Unit::TerawattHour)
            .expect("same unit");
        assert_eq!(f, 1.0);
    }

    #[test]
    fn twh_to_pj() {
        let f = Unit::TerawattHour
            .factor_to(Unit::Petajoule)
            .expect("same dimension");
        assert!((f - 3.6).abs() < 1e-12);
    }

    #[test]
    fn pj_to_twh_inverts() {
        let fwd = Unit::TerawattHour.factor_to(Unit::Petajoule).ok();
        let back = Unit::Petajoule.factor_to(Unit::TerawattHour).ok();
        let product = fwd.zip(back).map(|(a, b)| a * b);
        assert!(product.map(|p| (p - 1.0).abs() < 1e-12).unwrap_or(false));
    }

    #[test]
    fn gt_to_mt() {
        let f = Unit::Gigatonne.factor_to(Unit::Megatonne).expect("mass");
        assert_eq!(f, 1000.0);
    }

    #[test]
    fn cross_dimension_rejected() {
        let err = Unit::TerawattHour.factor_to(Unit::Megatonne).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("TWh") && msg.contains("Mt"), "got: {msg}");
    }

    #[test]
    fn serde_round_trip_by_symbol() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Holder {
            unit: Unit,
        }
        let parsed: Holder = toml::from_str("unit = \"Mtoe\"").expect("symbol should parse");
        assert_eq!(parsed.unit, Unit::MillionTonneOilEquivalent);
    }
}
