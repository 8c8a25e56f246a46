use crate::cli::{LabelArgs, MoleculeSource};
use crate::error::{CliError, Result};
use qcurate::core::forcefield::labels::{ParameterStore, label_molecules};
use qcurate::core::forcefield::params::{ForceField, HandlerKind, Parameter};
use qcurate::core::io::cache::load_collection;
use qcurate::core::models::molecule::Molecule;
use qcurate::core::models::system::Topology;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// One labeled term: the atoms it covers plus the parameter assigned to them.
#[derive(Serialize)]
struct LabeledTerm<'a> {
    atoms: &'a [usize],
    #[serde(flatten)]
    parameter: &'a Parameter,
}

#[derive(Serialize)]
struct MoleculeLabels<'a> {
    formula: String,
    n_atoms: usize,
    parameters: BTreeMap<&'static str, Vec<LabeledTerm<'a>>>,
}

pub async fn run(args: LabelArgs) -> Result<()> {
    info!("Loading force field from {:?}", &args.forcefield);
    let forcefield = ForceField::load(&args.forcefield)?;

    let topology = build_topology(&args.molecules)?;
    println!(
        "Labeling {} molecule(s) with {} parameters...",
        topology.n_molecules(),
        forcefield.n_parameters()
    );

    let labels = tokio::task::block_in_place(|| label_molecules(&forcefield, &topology));
    let rendered = render_labels(&topology.unique_molecules(), &labels);

    info!("Writing parameter assignments to {:?}", &args.output);
    write_labels(&args.output, &rendered)?;

    println!(
        "✓ Labels for {} unique molecule(s) written to: {}",
        rendered.len(),
        args.output.display()
    );
    Ok(())
}

fn write_labels(path: &Path, rendered: &[MoleculeLabels]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, rendered).map_err(io::Error::from)?;
    writer.flush()?;
    Ok(())
}

fn build_topology(source: &MoleculeSource) -> Result<Topology> {
    if let Some(path) = &source.collection {
        info!("Collecting record molecules from {:?}", path);
        let collection = load_collection(path)?;
        return Ok(Topology::from_molecules(
            collection.records().map(|r| r.molecule.clone()).collect(),
        ));
    }
    if source.smiles.is_empty() {
        return Err(CliError::Argument(
            "Provide at least one --smiles or a --collection".to_string(),
        ));
    }
    let molecules = source
        .smiles
        .iter()
        .map(|smiles| Molecule::from_smiles(smiles))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Topology::from_molecules(molecules))
}

fn render_labels<'a>(
    molecules: &[&Molecule],
    labels: &'a [BTreeMap<HandlerKind, ParameterStore>],
) -> Vec<MoleculeLabels<'a>> {
    molecules
        .iter()
        .zip(labels)
        .map(|(molecule, handlers)| MoleculeLabels {
            formula: molecule.hill_formula(),
            n_atoms: molecule.n_atoms(),
            parameters: handlers
                .iter()
                .map(|(kind, store)| {
                    let terms: Vec<LabeledTerm> = store
                        .iter()
                        .map(|(atoms, parameter)| LabeledTerm { atoms, parameter })
                        .collect();
                    (kind.name(), terms)
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORCEFIELD: &str = r#"
[[Bonds]]
id = "b1"
smirks = "[#6X4:1]-[#6X4:2]"
k = 620.0

[[Bonds]]
id = "b2"
smirks = "[#6:1]-[#1:2]"
length = "1.09 * angstrom"

[[vdW]]
id = "n1"
smirks = "[#1:1]"
epsilon = 0.0157
"#;

    #[test]
    fn labels_render_as_plain_json() {
        let forcefield = ForceField::from_toml_str(FORCEFIELD).unwrap();
        let topology = Topology::from_molecules(vec![
            Molecule::from_smiles("CC").unwrap(),
            Molecule::from_smiles("CC").unwrap(),
        ]);
        let labels = label_molecules(&forcefield, &topology);
        let rendered = render_labels(&topology.unique_molecules(), &labels);
        let value = serde_json::to_value(&rendered).unwrap();

        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["formula"], "C2H6");
        let bonds = value[0]["parameters"]["Bonds"].as_array().unwrap();
        assert_eq!(bonds.len(), 7);
        assert_eq!(bonds[0]["atoms"], serde_json::json!([0, 1]));
        assert_eq!(bonds[0]["id"], "b1");
        assert_eq!(bonds[0]["k"], 620.0);
        assert_eq!(bonds[1]["length"], "1.09 * angstrom");
        assert_eq!(value[0]["parameters"]["vdW"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn labels_are_written_as_pretty_json() {
        let forcefield = ForceField::from_toml_str(FORCEFIELD).unwrap();
        let topology = Topology::from_molecules(vec![Molecule::from_smiles("C").unwrap()]);
        let labels = label_molecules(&forcefield, &topology);
        let rendered = render_labels(&topology.unique_molecules(), &labels);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        write_labels(&path, &rendered).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["formula"], "CH4");
        assert_eq!(value[0]["parameters"]["Bonds"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn unwritable_output_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("labels.json");
        assert!(matches!(write_labels(&path, &[]), Err(CliError::Io(_))));
    }

    #[test]
    fn smiles_source_builds_one_molecule_per_string() {
        let source = MoleculeSource {
            smiles: vec!["O".into(), "[H][H]".into()],
            collection: None,
        };
        let topology = build_topology(&source).unwrap();
        assert_eq!(topology.n_molecules(), 2);
        assert_eq!(topology.molecules()[1].n_atoms(), 2);

        let bad = MoleculeSource {
            smiles: vec!["C(".into()],
            collection: None,
        };
        assert!(matches!(build_topology(&bad), Err(CliError::Model(_))));
    }
}
