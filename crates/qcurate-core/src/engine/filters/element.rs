use super::RecordFilter;
use crate::core::models::ModelError;
use crate::core::models::element::Element;
use crate::core::models::record::Record;
use crate::engine::error::FilterError;
use serde_json::json;
use std::collections::BTreeSet;

/// Keeps records whose molecule is built only from allowed elements.
#[derive(Debug, Clone)]
pub struct ElementFilter {
    allowed: BTreeSet<Element>,
}

impl ElementFilter {
    pub fn new(allowed: impl IntoIterator<Item = Element>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Builds the allow-list from element symbols (`"Cl"`) or atomic numbers (`"17"`).
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ModelError> {
        let allowed = names
            .iter()
            .map(|name| name.as_ref().parse::<Element>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { allowed })
    }

    pub fn allowed(&self) -> &BTreeSet<Element> {
        &self.allowed
    }
}

impl RecordFilter for ElementFilter {
    fn name(&self) -> &'static str {
        "ElementFilter"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "allowed_elements": self.allowed })
    }

    fn keep(&self, record: &Record) -> Result<bool, FilterError> {
        Ok(record.molecule.elements().is_subset(&self.allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::Molecule;
    use crate::core::models::record::RecordStatus;

    fn record(smiles: &str) -> Record {
        Record::new(1, RecordStatus::Complete, Molecule::from_smiles(smiles).unwrap())
    }

    #[test]
    fn names_and_atomic_numbers_are_accepted() {
        let filter = ElementFilter::from_names(&["H", "6", "Cl"]).unwrap();
        assert_eq!(
            filter.allowed(),
            &BTreeSet::from([Element::H, Element::C, Element::CL])
        );
        assert!(matches!(
            ElementFilter::from_names(&["Xx"]),
            Err(ModelError::UnknownElement(_))
        ));
        // Symbols are case-sensitive.
        assert!(ElementFilter::from_names(&["cl"]).is_err());
    }

    #[test]
    fn molecules_with_foreign_elements_are_dropped() {
        let filter = ElementFilter::new([Element::H, Element::C, Element::O]);
        assert!(filter.keep(&record("CCO")).unwrap());
        assert!(!filter.keep(&record("CCI")).unwrap());
    }
}
