use qcurate::core::charges::ChargeMethod;
use qcurate::engine::config::{DEFAULT_MAX_CONFORMERS, DEFAULT_RMSD_TOLERANCE};
use qcurate::core::chem::connectivity::DEFAULT_BOND_TOLERANCE;

pub struct DefaultsConfig {
    pub address: String,
    pub spec_name: String,
    pub include_iodine: bool,
    pub max_conformers: usize,
    pub tolerance: f64,
    pub rmsd_tolerance: f64,
    pub charge_method: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            address: "https://api.qcarchive.molssi.org:443".to_string(),
            spec_name: "default".to_string(),
            include_iodine: false,
            max_conformers: DEFAULT_MAX_CONFORMERS,
            tolerance: DEFAULT_BOND_TOLERANCE,
            rmsd_tolerance: DEFAULT_RMSD_TOLERANCE,
            charge_method: ChargeMethod::Am1BccElf10.name().to_string(),
        }
    }
}
