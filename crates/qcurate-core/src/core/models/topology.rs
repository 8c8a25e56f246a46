use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Bond order as used in valence bookkeeping; aromatic bonds count as 1.5.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Single => 1.0,
            Self::Double => 2.0,
            Self::Triple => 3.0,
            Self::Aromatic => 1.5,
        }
    }

    /// Maps a QCSchema connectivity order onto a bond order. Fractional orders between
    /// 1 and 2 are treated as aromatic.
    pub fn from_qcschema(order: f64) -> Self {
        if (order - 1.5).abs() < 0.25 {
            Self::Aromatic
        } else if order >= 2.5 {
            Self::Triple
        } else if order >= 1.75 {
            Self::Double
        } else {
            Self::Single
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "ar" | "aromatic" | "1.5" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bond {
    pub atom1: usize, // index of the first atom
    pub atom2: usize, // index of the second atom
    pub order: BondOrder,
}

impl Bond {
    pub fn new(atom1: usize, atom2: usize, order: BondOrder) -> Self {
        Self {
            atom1,
            atom2,
            order,
        }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atom1 == atom || self.atom2 == atom
    }

    /// The atom on the other end of the bond, if `atom` is part of it.
    pub fn partner(&self, atom: usize) -> Option<usize> {
        if self.atom1 == atom {
            Some(self.atom2)
        } else if self.atom2 == atom {
            Some(self.atom1)
        } else {
            None
        }
    }

    /// The atom pair with the lower index first, independent of bond direction.
    pub fn key(&self) -> (usize, usize) {
        if self.atom1 <= self.atom2 {
            (self.atom1, self.atom2)
        } else {
            (self.atom2, self.atom1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_order_from_str_parses_valid_strings() {
        assert_eq!("1".parse::<BondOrder>().unwrap(), BondOrder::Single);
        assert_eq!("S".parse::<BondOrder>().unwrap(), BondOrder::Single);
        assert_eq!("double".parse::<BondOrder>().unwrap(), BondOrder::Double);
        assert_eq!("T".parse::<BondOrder>().unwrap(), BondOrder::Triple);
        assert_eq!("1.5".parse::<BondOrder>().unwrap(), BondOrder::Aromatic);
        assert!("quadruple".parse::<BondOrder>().is_err());
        assert!("".parse::<BondOrder>().is_err());
    }

    #[test]
    fn bond_order_from_qcschema_rounds_fractional_orders() {
        assert_eq!(BondOrder::from_qcschema(1.0), BondOrder::Single);
        assert_eq!(BondOrder::from_qcschema(1.5), BondOrder::Aromatic);
        assert_eq!(BondOrder::from_qcschema(2.0), BondOrder::Double);
        assert_eq!(BondOrder::from_qcschema(3.0), BondOrder::Triple);
    }

    #[test]
    fn bond_key_is_direction_independent() {
        let forward = Bond::new(3, 7, BondOrder::Single);
        let backward = Bond::new(7, 3, BondOrder::Single);
        assert_eq!(forward.key(), backward.key());
        assert_eq!(forward.key(), (3, 7));
    }

    #[test]
    fn bond_partner_returns_other_atom() {
        let bond = Bond::new(1, 2, BondOrder::Double);
        assert_eq!(bond.partner(1), Some(2));
        assert_eq!(bond.partner(2), Some(1));
        assert_eq!(bond.partner(5), None);
        assert!(bond.contains(1));
        assert!(!bond.contains(5));
    }
}
