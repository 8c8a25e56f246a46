use crate::core::charges::ChargeMethod;
use crate::core::chem::connectivity::DEFAULT_BOND_TOLERANCE;
use crate::core::models::element::Element;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Elements every curated molecule may contain. Iodine is opt-in.
pub const DEFAULT_ALLOWED_ELEMENTS: [Element; 9] = [
    Element::H,
    Element::C,
    Element::N,
    Element::O,
    Element::S,
    Element::P,
    Element::F,
    Element::CL,
    Element::BR,
];
pub const DEFAULT_MAX_CONFORMERS: usize = 12;
pub const DEFAULT_RMSD_TOLERANCE: f64 = 0.25;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Validated settings of the curation pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub denylist: HashSet<u64>,
    pub include_iodine: bool,
    pub max_conformers: usize,
    /// Bond-guessing tolerance as a multiple of the summed covalent radii.
    pub tolerance: f64,
    /// Minimum RMSD (Å) between two retained conformers of one molecule.
    pub rmsd_tolerance: f64,
    pub charge_method: String,
    pub base_elements: BTreeSet<Element>,
}

impl FilterConfig {
    /// The element allow-list, with iodine added when it is enabled.
    pub fn allowed_elements(&self) -> BTreeSet<Element> {
        let mut allowed = self.base_elements.clone();
        if self.include_iodine {
            allowed.insert(Element::I);
        }
        allowed
    }

    /// Checks the numeric tunables and the charge method.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_conformers == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_conformers",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "tolerance",
                reason: format!("{} is not a positive number", self.tolerance),
            });
        }
        if !(self.rmsd_tolerance.is_finite() && self.rmsd_tolerance >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "rmsd_tolerance",
                reason: format!("{} is not a non-negative number", self.rmsd_tolerance),
            });
        }
        if self.charge_method.trim().is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "charge_method",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            denylist: HashSet::new(),
            include_iodine: false,
            max_conformers: DEFAULT_MAX_CONFORMERS,
            tolerance: DEFAULT_BOND_TOLERANCE,
            rmsd_tolerance: DEFAULT_RMSD_TOLERANCE,
            charge_method: ChargeMethod::Am1BccElf10.name().to_string(),
            base_elements: DEFAULT_ALLOWED_ELEMENTS.into_iter().collect(),
        }
    }
}

/// Builds a [`FilterConfig`]. The numeric tunables and the charge method are required; the
/// denylist, iodine switch and element list fall back to the defaults.
#[derive(Default)]
pub struct FilterConfigBuilder {
    denylist: HashSet<u64>,
    include_iodine: bool,
    max_conformers: Option<usize>,
    tolerance: Option<f64>,
    rmsd_tolerance: Option<f64>,
    charge_method: Option<String>,
    base_elements: Option<BTreeSet<Element>>,
}

impl FilterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(mut self, record_id: u64) -> Self {
        self.denylist.insert(record_id);
        self
    }
    pub fn denylist(mut self, record_ids: impl IntoIterator<Item = u64>) -> Self {
        self.denylist.extend(record_ids);
        self
    }
    pub fn include_iodine(mut self, include: bool) -> Self {
        self.include_iodine = include;
        self
    }
    pub fn max_conformers(mut self, n: usize) -> Self {
        self.max_conformers = Some(n);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn rmsd_tolerance(mut self, tolerance: f64) -> Self {
        self.rmsd_tolerance = Some(tolerance);
        self
    }
    pub fn charge_method(mut self, method: impl Into<String>) -> Self {
        self.charge_method = Some(method.into());
        self
    }
    pub fn base_elements(mut self, elements: impl IntoIterator<Item = Element>) -> Self {
        self.base_elements = Some(elements.into_iter().collect());
        self
    }

    pub fn build(self) -> Result<FilterConfig, ConfigError> {
        let max_conformers = self
            .max_conformers
            .ok_or(ConfigError::MissingParameter("max_conformers"))?;
        let tolerance = self
            .tolerance
            .ok_or(ConfigError::MissingParameter("tolerance"))?;
        let rmsd_tolerance = self
            .rmsd_tolerance
            .ok_or(ConfigError::MissingParameter("rmsd_tolerance"))?;
        let charge_method = self
            .charge_method
            .ok_or(ConfigError::MissingParameter("charge_method"))?;
        let config = FilterConfig {
            denylist: self.denylist,
            include_iodine: self.include_iodine,
            max_conformers,
            tolerance,
            rmsd_tolerance,
            charge_method,
            base_elements: self
                .base_elements
                .unwrap_or_else(|| DEFAULT_ALLOWED_ELEMENTS.into_iter().collect()),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> FilterConfigBuilder {
        FilterConfigBuilder::new()
            .max_conformers(12)
            .tolerance(1.2)
            .rmsd_tolerance(0.25)
            .charge_method("am1bccelf10")
    }

    #[test]
    fn builder_matches_defaults() {
        assert_eq!(complete_builder().build().unwrap(), FilterConfig::default());
    }

    #[test]
    fn builder_reports_first_missing_parameter() {
        let result = FilterConfigBuilder::new().tolerance(1.2).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("max_conformers")));
        let result = FilterConfigBuilder::new()
            .max_conformers(3)
            .tolerance(1.2)
            .rmsd_tolerance(0.1)
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("charge_method")));
    }

    #[test]
    fn builder_rejects_out_of_range_values() {
        assert!(matches!(
            complete_builder().max_conformers(0).build(),
            Err(ConfigError::InvalidParameter { name: "max_conformers", .. })
        ));
        assert!(matches!(
            complete_builder().tolerance(f64::NAN).build(),
            Err(ConfigError::InvalidParameter { name: "tolerance", .. })
        ));
        assert!(matches!(
            complete_builder().rmsd_tolerance(-0.1).build(),
            Err(ConfigError::InvalidParameter { name: "rmsd_tolerance", .. })
        ));
    }

    #[test]
    fn validate_catches_fields_edited_after_building() {
        let mut config = complete_builder().build().unwrap();
        assert_eq!(config.validate(), Ok(()));
        config.max_conformers = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "max_conformers", .. })
        ));
        config.max_conformers = 4;
        config.charge_method = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "charge_method", .. })
        ));
    }

    #[test]
    fn iodine_is_only_allowed_when_enabled() {
        let config = complete_builder().build().unwrap();
        assert!(!config.allowed_elements().contains(&Element::I));
        assert_eq!(config.allowed_elements().len(), 9);

        let config = complete_builder().include_iodine(true).build().unwrap();
        assert!(config.allowed_elements().contains(&Element::I));
    }

    #[test]
    fn duplicate_denylist_entries_collapse() {
        let config = complete_builder().deny(7).deny(7).denylist([7, 8]).build().unwrap();
        assert_eq!(config.denylist, HashSet::from([7, 8]));
    }
}
