use crate::core::models::ModelError;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct ParsedAtom {
    element: Element,
    aromatic: bool,
    charge: i8,
    // `None` for organic-subset atoms, whose hydrogens are implied by valence.
    h_count: Option<u8>,
    map: Option<u32>,
}

type ParsedGraph = (Vec<ParsedAtom>, Vec<(usize, usize, Option<BondOrder>)>);

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    atoms: Vec<ParsedAtom>,
    bonds: Vec<(usize, usize, Option<BondOrder>)>,
}

impl<'a> Parser<'a> {
    fn new(smiles: &'a str) -> Self {
        Self {
            bytes: smiles.as_bytes(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ModelError {
        ModelError::Smiles {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn parse(mut self) -> Result<ParsedGraph, ModelError> {
        let mut previous: Option<usize> = None;
        let mut branches: Vec<Option<usize>> = Vec::new();
        let mut pending_bond: Option<BondOrder> = None;
        let mut has_pending_bond = false;
        let mut rings: HashMap<u32, (usize, Option<BondOrder>)> = HashMap::new();

        while let Some(c) = self.peek() {
            match c {
                b'(' => {
                    if previous.is_none() {
                        return Err(self.error("branch opened before any atom"));
                    }
                    branches.push(previous);
                    self.pos += 1;
                }
                b')' => {
                    previous = branches
                        .pop()
                        .ok_or_else(|| self.error("unmatched ')'"))?;
                    self.pos += 1;
                }
                b'.' => {
                    previous = None;
                    self.pos += 1;
                }
                b'-' | b'=' | b'#' | b':' | b'/' | b'\\' => {
                    if has_pending_bond {
                        return Err(self.error("two consecutive bond symbols"));
                    }
                    pending_bond = Some(match c {
                        b'=' => BondOrder::Double,
                        b'#' => BondOrder::Triple,
                        b':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    });
                    has_pending_bond = true;
                    self.pos += 1;
                }
                b'0'..=b'9' | b'%' => {
                    let atom = previous.ok_or_else(|| self.error("ring bond before any atom"))?;
                    let label = self.parse_ring_label()?;
                    match rings.remove(&label) {
                        Some((partner, opening_bond)) => {
                            if partner == atom {
                                return Err(self.error("ring closure onto the same atom"));
                            }
                            let order = match (opening_bond, pending_bond) {
                                (Some(a), Some(b)) if a != b => {
                                    return Err(self.error("conflicting ring-closure bond orders"));
                                }
                                (a, b) => a.or(b),
                            };
                            self.bonds.push((partner, atom, order));
                        }
                        None => {
                            rings.insert(label, (atom, pending_bond));
                        }
                    }
                    pending_bond = None;
                    has_pending_bond = false;
                }
                _ => {
                    let atom = self.parse_atom()?;
                    if let Some(prev) = previous {
                        self.bonds.push((prev, atom, pending_bond));
                    } else if has_pending_bond {
                        return Err(self.error("bond symbol without a preceding atom"));
                    }
                    pending_bond = None;
                    has_pending_bond = false;
                    previous = Some(atom);
                }
            }
        }

        if has_pending_bond {
            return Err(self.error("dangling bond at end of input"));
        }
        if !branches.is_empty() {
            return Err(self.error("unclosed branch"));
        }
        if let Some(label) = rings.keys().min() {
            return Err(self.error(format!("unclosed ring bond {label}")));
        }
        if self.atoms.is_empty() {
            return Err(self.error("no atoms"));
        }
        Ok((self.atoms, self.bonds))
    }

    fn parse_ring_label(&mut self) -> Result<u32, ModelError> {
        if self.peek() == Some(b'%') {
            self.pos += 1;
            let digits = [self.peek_at(0), self.peek_at(1)];
            match digits {
                [Some(a), Some(b)] if a.is_ascii_digit() && b.is_ascii_digit() => {
                    self.pos += 2;
                    Ok(((a - b'0') * 10 + (b - b'0')) as u32)
                }
                _ => Err(self.error("expected two digits after '%'")),
            }
        } else {
            let digit = self.peek().unwrap_or(b'0');
            self.pos += 1;
            Ok((digit - b'0') as u32)
        }
    }

    fn parse_atom(&mut self) -> Result<usize, ModelError> {
        let atom = if self.peek() == Some(b'[') {
            self.parse_bracket_atom()?
        } else {
            self.parse_organic_atom()?
        };
        self.atoms.push(atom);
        Ok(self.atoms.len() - 1)
    }

    fn parse_organic_atom(&mut self) -> Result<ParsedAtom, ModelError> {
        let two = (self.peek(), self.peek_at(1));
        let (element, aromatic, width) = match two {
            (Some(b'C'), Some(b'l')) => (Element::CL, false, 2),
            (Some(b'B'), Some(b'r')) => (Element::BR, false, 2),
            (Some(b'B'), _) => (Element::B, false, 1),
            (Some(b'C'), _) => (Element::C, false, 1),
            (Some(b'N'), _) => (Element::N, false, 1),
            (Some(b'O'), _) => (Element::O, false, 1),
            (Some(b'P'), _) => (Element::P, false, 1),
            (Some(b'S'), _) => (Element::S, false, 1),
            (Some(b'F'), _) => (Element::F, false, 1),
            (Some(b'I'), _) => (Element::I, false, 1),
            (Some(b'b'), _) => (Element::B, true, 1),
            (Some(b'c'), _) => (Element::C, true, 1),
            (Some(b'n'), _) => (Element::N, true, 1),
            (Some(b'o'), _) => (Element::O, true, 1),
            (Some(b'p'), _) => (Element::P, true, 1),
            (Some(b's'), _) => (Element::S, true, 1),
            (Some(c), _) => {
                return Err(self.error(format!("unexpected character '{}'", c as char)));
            }
            (None, _) => return Err(self.error("unexpected end of input")),
        };
        self.pos += width;
        Ok(ParsedAtom {
            element,
            aromatic,
            charge: 0,
            h_count: None,
            map: None,
        })
    }

    fn parse_bracket_atom(&mut self) -> Result<ParsedAtom, ModelError> {
        self.pos += 1;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }

        let (element, aromatic) = self.parse_bracket_symbol()?;

        while self.peek() == Some(b'@') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_uppercase() && c != b'H') {
            // Extended chirality classes such as @TH1 or @SP2.
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let mut h_count = 0u8;
        if self.peek() == Some(b'H') {
            self.pos += 1;
            h_count = match self.parse_number() {
                Some(n) => u8::try_from(n)
                    .map_err(|_| self.error(format!("hydrogen count {n} is out of range")))?,
                None => 1,
            };
        }

        let mut charge = 0i8;
        while let Some(sign @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let magnitude = self.parse_number().unwrap_or(1);
            charge = i8::try_from(magnitude)
                .ok()
                .and_then(|m| match sign {
                    b'+' => charge.checked_add(m),
                    _ => charge.checked_sub(m),
                })
                .ok_or_else(|| self.error("formal charge is out of range"))?;
        }

        let mut map = None;
        if self.peek() == Some(b':') {
            self.pos += 1;
            map = Some(
                self.parse_number()
                    .ok_or_else(|| self.error("expected atom map number after ':'"))?,
            );
        }

        if self.peek() != Some(b']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;

        Ok(ParsedAtom {
            element,
            aromatic,
            charge,
            h_count: Some(h_count),
            map,
        })
    }

    fn parse_bracket_symbol(&mut self) -> Result<(Element, bool), ModelError> {
        let first = self.peek().ok_or_else(|| self.error("unexpected end of input"))?;
        if first.is_ascii_lowercase() {
            for (symbol, width) in [("Se", 2usize), ("As", 2), ("Te", 2)] {
                let text = &self.bytes[self.pos..(self.pos + width).min(self.bytes.len())];
                if text.eq_ignore_ascii_case(symbol.as_bytes()) && text[0].is_ascii_lowercase() {
                    self.pos += width;
                    let element = Element::from_symbol(symbol).ok_or_else(|| self.error(symbol))?;
                    return Ok((element, true));
                }
            }
            let symbol = (first as char).to_ascii_uppercase().to_string();
            let element = Element::from_symbol(&symbol)
                .ok_or_else(|| self.error(format!("unknown aromatic atom '{}'", first as char)))?;
            self.pos += 1;
            return Ok((element, true));
        }

        if let Some(second) = self.peek_at(1).filter(u8::is_ascii_lowercase) {
            let symbol = format!("{}{}", first as char, second as char);
            if let Some(element) = Element::from_symbol(&symbol) {
                self.pos += 2;
                return Ok((element, false));
            }
        }
        let symbol = (first as char).to_string();
        let element = Element::from_symbol(&symbol)
            .ok_or_else(|| self.error(format!("unknown element '{symbol}'")))?;
        self.pos += 1;
        Ok((element, false))
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
    }
}

fn default_valences(element: Element) -> &'static [u8] {
    match element.atomic_number() {
        5 => &[3],
        6 => &[4],
        7 | 15 => &[3, 5],
        8 => &[2],
        16 => &[2, 4, 6],
        9 | 17 | 35 | 53 => &[1],
        _ => &[],
    }
}

fn implicit_hydrogens(atom: &ParsedAtom, bond_orders: &[BondOrder]) -> u8 {
    let mut used: u8 = bond_orders
        .iter()
        .map(|order| match order {
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Single | BondOrder::Aromatic => 1,
        })
        .sum();
    let aromatic_needs_extra = matches!(atom.element.atomic_number(), 5 | 6 | 7 | 15);
    if atom.aromatic && aromatic_needs_extra {
        used += 1;
    }
    default_valences(atom.element)
        .iter()
        .find(|&&valence| valence >= used)
        .map_or(0, |&valence| valence - used)
}

impl Molecule {
    /// Builds a molecule from a SMILES string, adding every implicit hydrogen as an explicit
    /// atom.
    ///
    /// If every written atom carries a distinct atom-map number from 1 to N, the atoms are
    /// reordered so that atom `k` is the one mapped `k + 1` (the CMILES convention); added
    /// hydrogens always follow the written atoms. Stereo markers are accepted and ignored.
    pub fn from_smiles(smiles: &str) -> Result<Self, ModelError> {
        let (atoms, raw_bonds) = Parser::new(smiles.trim()).parse()?;

        let bonds: Vec<(usize, usize, BondOrder)> = raw_bonds
            .into_iter()
            .map(|(a, b, order)| {
                let order = order.unwrap_or(if atoms[a].aromatic && atoms[b].aromatic {
                    BondOrder::Aromatic
                } else {
                    BondOrder::Single
                });
                (a, b, order)
            })
            .collect();

        let n_written = atoms.len();
        let mut order: Vec<usize> = (0..n_written).collect();
        let maps: Vec<Option<u32>> = atoms.iter().map(|a| a.map).collect();
        if maps.iter().all(Option::is_some) {
            let mut seen = vec![false; n_written];
            let complete = maps.iter().flatten().all(|&m| {
                let index = m as usize;
                (1..=n_written).contains(&index) && !std::mem::replace(&mut seen[index - 1], true)
            });
            if complete {
                for (written, map) in maps.iter().flatten().enumerate() {
                    order[written] = *map as usize - 1;
                }
            }
        }

        let mut placed: Vec<Option<&ParsedAtom>> = vec![None; n_written];
        for (written, atom) in atoms.iter().enumerate() {
            placed[order[written]] = Some(atom);
        }

        let mut molecule = Molecule::new();
        for atom in placed.into_iter().flatten() {
            molecule.add_atom(atom.element, atom.charge, atom.aromatic);
        }
        for &(a, b, bond_order) in &bonds {
            molecule
                .add_bond(order[a], order[b], bond_order)
                .map_err(|e| ModelError::Smiles {
                    position: 0,
                    message: e.to_string(),
                })?;
        }

        for (written, atom) in atoms.iter().enumerate() {
            let count = match atom.h_count {
                Some(count) => count,
                None => {
                    let orders: Vec<BondOrder> = bonds
                        .iter()
                        .filter(|(a, b, _)| *a == written || *b == written)
                        .map(|(_, _, order)| *order)
                        .collect();
                    implicit_hydrogens(atom, &orders)
                }
            };
            for _ in 0..count {
                let hydrogen = molecule.add_atom(Element::H, 0, false);
                molecule.add_bond(order[written], hydrogen, BondOrder::Single)?;
            }
        }

        Ok(molecule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_subset_gets_implicit_hydrogens() {
        let ethanol = Molecule::from_smiles("CCO").unwrap();
        assert_eq!(ethanol.n_atoms(), 9);
        assert_eq!(ethanol.n_bonds(), 8);
        assert_eq!(ethanol.hill_formula(), "C2H6O");
        assert_eq!(ethanol.hydrogen_count(2), 1);
    }

    #[test]
    fn aromatic_ring_closure_builds_benzene() {
        let benzene = Molecule::from_smiles("c1ccccc1").unwrap();
        assert_eq!(benzene.hill_formula(), "C6H6");
        let aromatic = benzene
            .bonds()
            .iter()
            .filter(|b| b.order == BondOrder::Aromatic)
            .count();
        assert_eq!(aromatic, 6);
        assert!(benzene.atom(0).unwrap().is_aromatic);
    }

    #[test]
    fn heteroaromatics_follow_valence_rules() {
        assert_eq!(Molecule::from_smiles("c1ccncc1").unwrap().hill_formula(), "C5H5N");
        assert_eq!(Molecule::from_smiles("c1cc[nH]c1").unwrap().hill_formula(), "C4H5N");
        assert_eq!(Molecule::from_smiles("c1ccsc1").unwrap().hill_formula(), "C4H4S");
    }

    #[test]
    fn bracket_atoms_carry_charge_and_explicit_hydrogens() {
        let ammonium = Molecule::from_smiles("[NH4+]").unwrap();
        assert_eq!(ammonium.n_atoms(), 5);
        assert_eq!(ammonium.total_formal_charge(), 1);

        let acetate = Molecule::from_smiles("CC(=O)[O-]").unwrap();
        assert_eq!(acetate.hill_formula(), "C2H3O2");
        assert_eq!(acetate.total_formal_charge(), -1);
    }

    #[test]
    fn fully_mapped_smiles_orders_atoms_by_map_number() {
        let water = Molecule::from_smiles("[H:2][O:1][H:3]").unwrap();
        assert_eq!(water.n_atoms(), 3);
        assert_eq!(water.atom(0).unwrap().element, Element::O);
        assert!(water.bond_between(0, 1).is_some());
        assert!(water.bond_between(0, 2).is_some());

        let methanol = Molecule::from_smiles("[C:2]([O:1][H:6])([H:3])([H:4])[H:5]").unwrap();
        assert_eq!(methanol.atom(0).unwrap().element, Element::O);
        assert_eq!(methanol.atom(1).unwrap().element, Element::C);
        assert!(methanol.bond_between(0, 5).is_some());
        assert_eq!(methanol.n_atoms(), 6);
    }

    #[test]
    fn partially_mapped_smiles_keeps_written_order() {
        let mol = Molecule::from_smiles("[CH3:5][OH]").unwrap();
        assert_eq!(mol.atom(0).unwrap().element, Element::C);
        assert_eq!(mol.n_atoms(), 6);
    }

    #[test]
    fn multiple_bond_symbols_and_branches() {
        let acetonitrile = Molecule::from_smiles("CC#N").unwrap();
        assert_eq!(acetonitrile.bond_between(1, 2).unwrap().order, BondOrder::Triple);
        let isobutane = Molecule::from_smiles("CC(C)C").unwrap();
        assert_eq!(isobutane.degree(1), 4);
        let salt = Molecule::from_smiles("[Na+].[Cl-]").unwrap();
        assert_eq!(salt.n_bonds(), 0);
    }

    #[test]
    fn malformed_smiles_are_rejected_with_position() {
        for bad in ["C1CC", "C(C", "CC)", "C==C", "Xx", "", "[C", "C%1"] {
            assert!(
                matches!(Molecule::from_smiles(bad), Err(ModelError::Smiles { .. })),
                "{bad} should fail"
            );
        }
    }

    #[test]
    fn charge_and_hydrogen_overflow_is_a_parse_error() {
        let pluses = format!("[C{}]", "+".repeat(130));
        for bad in [pluses.as_str(), "[C+200]", "[O-100-100]", "[CH300]"] {
            assert!(
                matches!(Molecule::from_smiles(bad), Err(ModelError::Smiles { .. })),
                "{bad} should fail"
            );
        }
        let oxide = Molecule::from_smiles("[O--]").unwrap();
        assert_eq!(oxide.total_formal_charge(), -2);
    }
}
