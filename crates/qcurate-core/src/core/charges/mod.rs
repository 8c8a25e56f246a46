//! Partial-charge assignment.
//!
//! A [`ChargeAssigner`] maps a molecule (with its conformers) and a method name onto one
//! partial charge per atom. The built-in [`elf::Elf10ChargeAssigner`] delegates the
//! per-conformer charge model to a [`ConformerChargeEngine`]; [`qeq::QeqEngine`] is the
//! engine shipped with the crate.

pub mod elf;
pub mod qeq;

use crate::core::models::ModelError;
use crate::core::models::molecule::{Conformer, Molecule};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ToolkitError {
    #[error("Charge calculation failed: {0}")]
    ChargeCalculation(String),

    #[error("No usable conformer: {0}")]
    ConformerGeneration(String),

    #[error("Charge method '{0}' is not available")]
    ChargeMethodUnavailable(String),

    #[error("Invalid molecule: {0}")]
    InvalidMolecule(#[from] ModelError),
}

impl ToolkitError {
    /// True for the two failure kinds that mark a molecule as unsuitable rather than
    /// signalling a broken setup.
    pub fn is_charge_failure(&self) -> bool {
        matches!(
            self,
            Self::ChargeCalculation(_) | Self::ConformerGeneration(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargeMethod {
    Am1BccElf10,
    Am1Bcc,
    FormalCharge,
    Zeros,
}

impl ChargeMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Am1BccElf10 => "am1bccelf10",
            Self::Am1Bcc => "am1bcc",
            Self::FormalCharge => "formal_charge",
            Self::Zeros => "zeros",
        }
    }
}

impl fmt::Display for ChargeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChargeMethod {
    type Err = ToolkitError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "am1bccelf10" => Ok(Self::Am1BccElf10),
            "am1bcc" => Ok(Self::Am1Bcc),
            "formal_charge" => Ok(Self::FormalCharge),
            "zeros" => Ok(Self::Zeros),
            _ => Err(ToolkitError::ChargeMethodUnavailable(s.to_string())),
        }
    }
}

/// Assigns partial charges to a molecule using a named method.
pub trait ChargeAssigner: Send + Sync {
    /// Returns one partial charge (in units of e) per atom.
    ///
    /// # Errors
    ///
    /// [`ToolkitError::ChargeCalculation`] and [`ToolkitError::ConformerGeneration`] mean the
    /// molecule could not be charged; any other variant is a usage error.
    fn assign_partial_charges(
        &self,
        molecule: &Molecule,
        method: &str,
    ) -> Result<Vec<f64>, ToolkitError>;
}

/// A charge model evaluated on a single conformer.
pub trait ConformerChargeEngine: Send + Sync {
    fn name(&self) -> &str;

    fn compute_charges(
        &self,
        molecule: &Molecule,
        conformer: &Conformer,
    ) -> Result<Vec<f64>, ToolkitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_round_trip_and_unknown_names_are_unavailable() {
        for method in [
            ChargeMethod::Am1BccElf10,
            ChargeMethod::Am1Bcc,
            ChargeMethod::FormalCharge,
            ChargeMethod::Zeros,
        ] {
            assert_eq!(method.name().parse::<ChargeMethod>().unwrap(), method);
        }
        assert_eq!(
            "gasteiger".parse::<ChargeMethod>(),
            Err(ToolkitError::ChargeMethodUnavailable("gasteiger".into()))
        );
    }

    #[test]
    fn only_calculation_and_conformer_errors_are_charge_failures() {
        assert!(ToolkitError::ChargeCalculation("x".into()).is_charge_failure());
        assert!(ToolkitError::ConformerGeneration("x".into()).is_charge_failure());
        assert!(!ToolkitError::ChargeMethodUnavailable("x".into()).is_charge_failure());
        assert!(!ToolkitError::InvalidMolecule(ModelError::SelfBond(0)).is_charge_failure());
    }
}
