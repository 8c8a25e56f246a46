use super::CollectionFilter;
use crate::core::models::collection::ResultCollection;
use crate::core::models::molecule::Conformer;
use crate::core::models::record::Record;
use crate::core::utils::geometry::kabsch_rmsd;
use crate::engine::error::FilterError;
use serde_json::json;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Keeps a maximally diverse set of geometries per molecule.
///
/// Entries are grouped by molecule identity and the conformers of a group are pooled in
/// entry order. Selection starts from the first conformer and then repeatedly takes the
/// candidate whose summed Kabsch RMSD to the selected set is largest, skipping candidates
/// closer than `rmsd_tolerance` to any selected conformer, until `max_conformers` are
/// selected. A record survives only if all of its conformers were selected.
#[derive(Debug, Clone, Copy)]
pub struct ConformerRmsdFilter {
    pub max_conformers: usize,
    pub rmsd_tolerance: f64,
}

impl ConformerRmsdFilter {
    pub fn new(max_conformers: usize, rmsd_tolerance: f64) -> Self {
        Self {
            max_conformers,
            rmsd_tolerance,
        }
    }

    /// Indices into `conformers`, in selection order.
    fn select_diverse(&self, conformers: &[&Conformer]) -> Vec<usize> {
        let n = conformers.len();
        if n == 0 || self.max_conformers == 0 {
            return Vec::new();
        }
        // A failed alignment counts as maximally distant.
        let mut distances = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let rmsd = kabsch_rmsd(conformers[i], conformers[j]).unwrap_or(f64::INFINITY);
                distances[i][j] = rmsd;
                distances[j][i] = rmsd;
            }
        }

        let mut selected = vec![0];
        let mut candidates: Vec<usize> = (1..n).collect();
        while selected.len() < self.max_conformers {
            candidates.retain(|&c| {
                selected
                    .iter()
                    .all(|&s| distances[c][s] >= self.rmsd_tolerance)
            });
            let best = candidates
                .iter()
                .enumerate()
                .map(|(position, &c)| {
                    let spread: f64 = selected.iter().map(|&s| distances[c][s]).sum();
                    (position, spread)
                })
                .fold(None, |best: Option<(usize, f64)>, (position, spread)| match best {
                    Some((_, top)) if top >= spread => best,
                    _ => Some((position, spread)),
                });
            let Some((position, _)) = best else {
                break;
            };
            selected.push(candidates.remove(position));
        }
        selected
    }

    fn reject_in_group(&self, records: &[&Record]) -> Vec<u64> {
        let mut owners = Vec::new();
        let mut conformers: Vec<&Conformer> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            for conformer in record.molecule.conformers() {
                owners.push(index);
                conformers.push(conformer);
            }
        }

        let mut selected_per_record = vec![0usize; records.len()];
        for chosen in self.select_diverse(&conformers) {
            selected_per_record[owners[chosen]] += 1;
        }
        records
            .iter()
            .zip(selected_per_record)
            .filter(|(record, selected)| *selected < record.molecule.conformers().len())
            .map(|(record, _)| record.id)
            .collect()
    }
}

impl CollectionFilter for ConformerRmsdFilter {
    fn name(&self) -> &'static str {
        "ConformerRMSDFilter"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "max_conformers": self.max_conformers,
            "rmsd_tolerance": self.rmsd_tolerance,
        })
    }

    fn rejected(&self, collection: &ResultCollection) -> Result<BTreeSet<u64>, FilterError> {
        let mut group_index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Record>> = Vec::new();
        let mut seen = HashSet::new();
        for (_, entry) in collection.iter_entries() {
            if !seen.insert(entry.record_id) {
                continue;
            }
            let record = collection
                .record(entry.record_id)
                .ok_or(FilterError::MissingRecord(entry.record_id))?;
            let index = *group_index.entry(entry.molecule_key()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[index].push(record);
        }
        debug!(molecules = groups.len(), "Grouped records by molecule.");

        #[cfg(feature = "parallel")]
        let rejected = groups
            .par_iter()
            .flat_map_iter(|group| self.reject_in_group(group))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let rejected = groups
            .iter()
            .flat_map(|group| self.reject_in_group(group))
            .collect();

        Ok(rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::collection::CollectionKind;
    use crate::core::models::collection::tests::entry;
    use crate::core::models::molecule::Molecule;
    use crate::core::models::molecule::tests::water;
    use crate::core::models::record::RecordStatus;
    use nalgebra::{Point3, Rotation3, Vector3};

    const KEY: &str = "server";

    /// Water with the H-O-H angle opened to `angle` degrees.
    fn water_at(angle: f64) -> Molecule {
        let radians = angle.to_radians();
        water()
            .with_conformers(vec![vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.9575, 0.0, 0.0),
                Point3::new(0.9575 * radians.cos(), 0.9575 * radians.sin(), 0.0),
            ]])
            .unwrap()
    }

    fn collection(molecules: Vec<(u64, &str, Molecule)>) -> ResultCollection {
        let mut collection = ResultCollection::new(CollectionKind::Optimization);
        for (id, identity, molecule) in molecules {
            collection.add_entry(
                KEY,
                entry(CollectionKind::Optimization, id, identity),
                Record::new(id, RecordStatus::Complete, molecule),
            );
        }
        collection
    }

    #[test]
    fn rigidly_moved_duplicates_are_rejected() {
        let base = water_at(104.5);
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7);
        let moved: Conformer = base.conformers()[0]
            .iter()
            .map(|p| rotation * p + Vector3::new(3.0, -1.0, 2.0))
            .collect();
        let moved = base.with_conformers(vec![moved]).unwrap();

        let collection = collection(vec![(1, "W", base), (2, "W", moved), (3, "W", water_at(170.0))]);
        let rejected = ConformerRmsdFilter::new(12, 0.1)
            .rejected(&collection)
            .unwrap();
        assert_eq!(rejected, BTreeSet::from([2]));
    }

    #[test]
    fn at_most_max_conformers_survive_per_molecule() {
        let angles = [90.0, 120.0, 150.0, 180.0];
        let mut molecules: Vec<(u64, &str, Molecule)> = angles
            .iter()
            .enumerate()
            .map(|(i, &a)| (i as u64 + 1, "W", water_at(a)))
            .collect();
        // A different molecule identity has its own budget.
        molecules.push((10, "OTHER", water_at(90.0)));
        molecules.push((11, "OTHER", water_at(180.0)));

        let rejected = ConformerRmsdFilter::new(2, 0.05)
            .rejected(&collection(molecules))
            .unwrap();
        assert_eq!(rejected, BTreeSet::from([2, 3]));
    }

    #[test]
    fn most_distant_conformer_is_preferred_over_entry_order() {
        let molecules = vec![
            (1, "W", water_at(100.0)),
            (2, "W", water_at(101.0)),
            (3, "W", water_at(102.0)),
            (4, "W", water_at(180.0)),
        ];
        let rejected = ConformerRmsdFilter::new(2, 0.005)
            .rejected(&collection(molecules))
            .unwrap();
        assert_eq!(rejected, BTreeSet::from([2, 3]));
    }

    #[test]
    fn candidates_close_to_the_selection_are_skipped() {
        let filter = ConformerRmsdFilter::new(3, 0.05);
        let molecules: Vec<Molecule> = [100.0, 179.9, 140.0, 180.0]
            .into_iter()
            .map(water_at)
            .collect();
        let conformers: Vec<&Conformer> =
            molecules.iter().map(|m| &m.conformers()[0]).collect();
        assert_eq!(filter.select_diverse(&conformers), vec![0, 3, 2]);
    }

    #[test]
    fn zero_max_conformers_rejects_the_whole_group() {
        let collection = collection(vec![(1, "W", water_at(104.5)), (2, "W", water_at(150.0))]);
        let rejected = ConformerRmsdFilter::new(0, 0.1)
            .rejected(&collection)
            .unwrap();
        assert_eq!(rejected, BTreeSet::from([1, 2]));
    }

    #[test]
    fn zero_tolerance_keeps_exact_duplicates() {
        let collection = collection(vec![(1, "W", water_at(104.5)), (2, "W", water_at(104.5))]);
        let rejected = ConformerRmsdFilter::new(12, 0.0)
            .rejected(&collection)
            .unwrap();
        assert!(rejected.is_empty());
    }
}
