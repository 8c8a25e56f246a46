use super::smirks::{Smirks, SmirksError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// A free-form parameter attribute such as `k = "500.0 * kilocalorie_per_mole"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<AttributeValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: String,
    pub smirks: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// The parameter sections a force field may contain, in labeling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandlerKind {
    Bonds,
    Angles,
    ProperTorsions,
    ImproperTorsions,
    #[serde(rename = "vdW")]
    VdW,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 5] = [
        Self::Bonds,
        Self::Angles,
        Self::ProperTorsions,
        Self::ImproperTorsions,
        Self::VdW,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bonds => "Bonds",
            Self::Angles => "Angles",
            Self::ProperTorsions => "ProperTorsions",
            Self::ImproperTorsions => "ImproperTorsions",
            Self::VdW => "vdW",
        }
    }

    /// Number of tagged atoms every SMIRKS in this section must carry.
    pub fn tagged_atoms(&self) -> usize {
        match self {
            Self::Bonds => 2,
            Self::Angles => 3,
            Self::ProperTorsions | Self::ImproperTorsions => 4,
            Self::VdW => 1,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum ForceFieldError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Parameter '{id}' has an invalid SMIRKS: {source}")]
    Smirks { id: String, source: SmirksError },
    #[error("Parameter '{id}' in {handler} tags {found} atoms, expected {expected}")]
    TaggedAtoms {
        id: String,
        handler: HandlerKind,
        expected: usize,
        found: usize,
    },
    #[error("Parameter id '{0}' is used more than once")]
    DuplicateId(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForceFieldFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    aromaticity_model: Option<String>,
    #[serde(rename = "Bonds", default)]
    bonds: Vec<Parameter>,
    #[serde(rename = "Angles", default)]
    angles: Vec<Parameter>,
    #[serde(rename = "ProperTorsions", default)]
    proper_torsions: Vec<Parameter>,
    #[serde(rename = "ImproperTorsions", default)]
    improper_torsions: Vec<Parameter>,
    #[serde(rename = "vdW", default)]
    vdw: Vec<Parameter>,
}

/// One parameter section with its SMIRKS patterns compiled, in file order.
#[derive(Debug, Clone)]
pub struct ParameterHandler {
    pub kind: HandlerKind,
    pub parameters: Vec<(Parameter, Smirks)>,
}

#[derive(Debug, Clone)]
pub struct ForceField {
    pub version: Option<String>,
    pub aromaticity_model: Option<String>,
    handlers: Vec<ParameterHandler>,
}

impl ForceField {
    pub fn load(path: &Path) -> Result<Self, ForceFieldError> {
        let content = std::fs::read_to_string(path).map_err(|e| ForceFieldError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: ForceFieldFile = toml::from_str(&content).map_err(|e| ForceFieldError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let forcefield = Self::from_file(file)?;
        debug!(
            path = %path.display(),
            parameters = forcefield.n_parameters(),
            "Loaded force field."
        );
        Ok(forcefield)
    }

    /// Builds a force field from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ForceFieldError> {
        let file: ForceFieldFile = toml::from_str(content).map_err(|e| ForceFieldError::Toml {
            path: "<string>".to_string(),
            source: e,
        })?;
        Self::from_file(file)
    }

    fn from_file(file: ForceFieldFile) -> Result<Self, ForceFieldError> {
        let sections = [
            (HandlerKind::Bonds, file.bonds),
            (HandlerKind::Angles, file.angles),
            (HandlerKind::ProperTorsions, file.proper_torsions),
            (HandlerKind::ImproperTorsions, file.improper_torsions),
            (HandlerKind::VdW, file.vdw),
        ];
        let mut ids = HashSet::new();
        let mut handlers = Vec::new();
        for (kind, parameters) in sections {
            if parameters.is_empty() {
                continue;
            }
            let mut compiled = Vec::with_capacity(parameters.len());
            for parameter in parameters {
                if !ids.insert(parameter.id.clone()) {
                    return Err(ForceFieldError::DuplicateId(parameter.id));
                }
                let smirks =
                    Smirks::parse(&parameter.smirks).map_err(|source| ForceFieldError::Smirks {
                        id: parameter.id.clone(),
                        source,
                    })?;
                if smirks.n_tagged() != kind.tagged_atoms() {
                    return Err(ForceFieldError::TaggedAtoms {
                        id: parameter.id,
                        handler: kind,
                        expected: kind.tagged_atoms(),
                        found: smirks.n_tagged(),
                    });
                }
                compiled.push((parameter, smirks));
            }
            handlers.push(ParameterHandler {
                kind,
                parameters: compiled,
            });
        }
        Ok(Self {
            version: file.version,
            aromaticity_model: file.aromaticity_model,
            handlers,
        })
    }

    pub fn handlers(&self) -> &[ParameterHandler] {
        &self.handlers
    }

    pub fn handler(&self, kind: HandlerKind) -> Option<&ParameterHandler> {
        self.handlers.iter().find(|h| h.kind == kind)
    }

    pub fn n_parameters(&self) -> usize {
        self.handlers.iter().map(|h| h.parameters.len()).sum()
    }
}
