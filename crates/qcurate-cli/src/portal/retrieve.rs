use super::models::{
    DatasetEntry, DatasetInfo, DatasetRecordItem, OptimizationRecordData, PortalMolecule,
    TorsionDriveRecordData,
};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use nalgebra::Point3;
use qcurate::core::models::collection::{CollectionKind, Entry, ResultCollection};
use qcurate::core::models::element::Element;
use qcurate::core::models::molecule::{Conformer, Molecule};
use qcurate::core::models::record::{Record, RecordStatus, TorsionScan};
use qcurate::engine::progress::{Progress, ProgressReporter};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

pub const BOHR_TO_ANGSTROM: f64 = 0.529177210903;

/// The read-only view of a QCArchive server that retrieval needs.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// The server address; used as the dataset key of retrieved entries.
    fn address(&self) -> &str;

    async fn find_dataset(&self, kind: CollectionKind, name: &str) -> Result<DatasetInfo>;

    async fn entries(&self, dataset: &DatasetInfo) -> Result<Vec<DatasetEntry>>;

    /// The records attached to the named entries under one specification.
    async fn record_items(
        &self,
        dataset: &DatasetInfo,
        entry_names: &[String],
        spec_name: &str,
    ) -> Result<Vec<DatasetRecordItem>>;

    async fn optimization_records(&self, ids: &[u64]) -> Result<Vec<OptimizationRecordData>>;

    async fn torsiondrive_records(&self, ids: &[u64]) -> Result<Vec<TorsionDriveRecordData>>;

    /// The lowest-energy optimization of every grid point, keyed by the JSON-encoded grid id.
    async fn minimum_optimizations(
        &self,
        torsiondrive_id: u64,
    ) -> Result<BTreeMap<String, OptimizationRecordData>>;

    async fn molecules(&self, ids: &[u64]) -> Result<Vec<PortalMolecule>>;
}

/// A record as fetched, before its geometries are attached.
struct FetchedRecord {
    status: RecordStatus,
    geometry_ids: Vec<u64>,
    scan: Option<TorsionScan>,
}

/// Downloads the named datasets into one collection keyed by the server address.
///
/// Entries without a record under `spec_name` are skipped. Any other failure aborts the
/// retrieval.
#[instrument(skip_all, name = "retrieve_collection")]
pub async fn retrieve_collection(
    source: &dyn ArchiveSource,
    kind: CollectionKind,
    datasets: &[String],
    spec_name: &str,
    reporter: &ProgressReporter<'_>,
) -> Result<ResultCollection> {
    let mut collection = ResultCollection::new(kind);

    for name in datasets {
        let dataset = source.find_dataset(kind, name).await?;
        info!(
            "Retrieving {} dataset '{}' (id {}).",
            kind, dataset.name, dataset.id
        );

        let entries = source.entries(&dataset).await?;
        let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        let record_ids: HashMap<String, u64> = source
            .record_items(&dataset, &names, spec_name)
            .await?
            .into_iter()
            .filter(|item| item.specification_name == spec_name)
            .map(|item| (item.entry_name, item.record_id))
            .collect();

        reporter.report(Progress::StageStart {
            name: "Fetching records",
            total_records: entries.len() as u64,
        });

        let mut resolved = Vec::with_capacity(entries.len());
        let mut skipped = 0u64;
        for entry in &entries {
            match record_ids.get(&entry.name) {
                Some(&id) => resolved.push((entry, id)),
                None => {
                    warn!(
                        "Entry '{}' of dataset '{}' has no record for specification '{}'; skipping.",
                        entry.name, dataset.name, spec_name
                    );
                    skipped += 1;
                    reporter.report(Progress::RecordEvaluated);
                }
            }
        }

        let ids: Vec<u64> = resolved.iter().map(|(_, id)| *id).collect();
        let records = match kind {
            CollectionKind::Optimization => fetch_optimizations(source, &ids).await?,
            CollectionKind::TorsionDrive => fetch_torsiondrives(source, &ids).await?,
        };

        let molecule_ids: Vec<u64> = records
            .values()
            .flat_map(|r| r.geometry_ids.iter().copied())
            .collect();
        let molecules: HashMap<u64, PortalMolecule> = source
            .molecules(&molecule_ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        debug!(
            records = records.len(),
            molecules = molecules.len(),
            "Fetched records and geometries."
        );

        let mut added = 0u64;
        for (entry, id) in resolved {
            let fetched = records
                .get(&id)
                .ok_or_else(|| CliError::Archive(format!("Record {id} was not returned")))?;
            let record = build_record(id, entry, fetched, &molecules)?;
            let cmiles = entry.cmiles().unwrap_or_default().to_string();
            collection.add_entry(
                source.address(),
                Entry {
                    entry_type: kind.entry_type(),
                    record_id: id,
                    cmiles,
                    inchi_key: entry.inchi_key().unwrap_or_default().to_string(),
                },
                record,
            );
            added += 1;
            reporter.report(Progress::RecordEvaluated);
        }

        reporter.report(Progress::StageFinish {
            kept: added,
            dropped: skipped,
        });
        info!(
            "Dataset '{}': {} entries retrieved, {} skipped.",
            dataset.name, added, skipped
        );
    }

    info!(
        "Retrieved {} results for {} molecules.",
        collection.n_results(),
        collection.n_molecules()
    );
    Ok(collection)
}

async fn fetch_optimizations(
    source: &dyn ArchiveSource,
    ids: &[u64],
) -> Result<HashMap<u64, FetchedRecord>> {
    let mut fetched = HashMap::with_capacity(ids.len());
    for record in source.optimization_records(ids).await? {
        let geometry = record.geometry_molecule_id().ok_or_else(|| {
            CliError::Archive(format!("Optimization record {} has no molecule", record.id))
        })?;
        fetched.insert(
            record.id,
            FetchedRecord {
                status: record.status,
                geometry_ids: vec![geometry],
                scan: None,
            },
        );
    }
    Ok(fetched)
}

async fn fetch_torsiondrives(
    source: &dyn ArchiveSource,
    ids: &[u64],
) -> Result<HashMap<u64, FetchedRecord>> {
    let mut fetched = HashMap::with_capacity(ids.len());
    for record in source.torsiondrive_records(ids).await? {
        let minima = source.minimum_optimizations(record.id).await?;
        let mut points = Vec::with_capacity(minima.len());
        for (key, optimization) in minima {
            let grid_id: Vec<i32> = serde_json::from_str(&key).map_err(|e| {
                CliError::Archive(format!(
                    "Torsion drive {} has a malformed grid id '{}': {}",
                    record.id, key, e
                ))
            })?;
            let geometry = optimization.geometry_molecule_id().ok_or_else(|| {
                CliError::Archive(format!(
                    "Optimization {} of torsion drive {} has no molecule",
                    optimization.id, record.id
                ))
            })?;
            points.push((grid_id, geometry));
        }
        points.sort();

        let (grid_ids, geometry_ids): (Vec<Vec<i32>>, Vec<u64>) = points.into_iter().unzip();
        fetched.insert(
            record.id,
            FetchedRecord {
                status: record.status,
                geometry_ids,
                scan: Some(TorsionScan {
                    dihedrals: record.specification.keywords.dihedrals,
                    grid_ids,
                }),
            },
        );
    }
    Ok(fetched)
}

fn build_record(
    id: u64,
    entry: &DatasetEntry,
    fetched: &FetchedRecord,
    molecules: &HashMap<u64, PortalMolecule>,
) -> Result<Record> {
    let cmiles = entry.cmiles().ok_or_else(|| {
        CliError::Archive(format!("Entry '{}' carries no mapped SMILES", entry.name))
    })?;
    let graph = Molecule::from_smiles(cmiles)?;

    let conformers = fetched
        .geometry_ids
        .iter()
        .map(|molecule_id| {
            let portal = molecules.get(molecule_id).ok_or_else(|| {
                CliError::Archive(format!("Molecule {molecule_id} was not returned"))
            })?;
            conformer_from_portal(&graph, portal)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut record = Record::new(id, fetched.status, graph.with_conformers(conformers)?);
    if let Some(scan) = &fetched.scan {
        record = record.with_torsion_scan(scan.clone());
    }
    record.validate()?;
    Ok(record)
}

/// Converts a QCSchema geometry (bohr) into a conformer (Å) of `graph`, checking that the
/// atoms line up.
fn conformer_from_portal(graph: &Molecule, portal: &PortalMolecule) -> Result<Conformer> {
    if portal.symbols.len() != graph.n_atoms() || portal.geometry.len() != 3 * graph.n_atoms() {
        return Err(CliError::Archive(format!(
            "Molecule {} has {} atoms and {} coordinates, expected {} atoms",
            portal.id,
            portal.symbols.len(),
            portal.geometry.len(),
            graph.n_atoms()
        )));
    }
    for (index, (symbol, atom)) in portal.symbols.iter().zip(graph.atoms()).enumerate() {
        if Element::from_symbol_ignore_case(symbol) != Some(atom.element) {
            return Err(CliError::Archive(format!(
                "Molecule {} has '{}' at position {} where the mapped SMILES has '{}'",
                portal.id,
                symbol,
                index,
                atom.element.symbol()
            )));
        }
    }
    Ok(portal
        .geometry
        .chunks_exact(3)
        .map(|xyz| {
            Point3::new(xyz[0], xyz[1], xyz[2]) * BOHR_TO_ANGSTROM
        })
        .collect())
}
