use crate::core::chem::rings::RingInfo;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SmirksError {
    #[error("Invalid SMIRKS at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Atom map tags must be unique and numbered 1..={expected}, found {found:?}")]
    MapTags { expected: usize, found: Vec<u32> },
}

/// A logical expression over primitives, in SMARTS precedence order.
#[derive(Debug, Clone)]
enum Expr<P> {
    Prim(P),
    Not(Box<Expr<P>>),
    And(Vec<Expr<P>>),
    Or(Vec<Expr<P>>),
}

impl<P> Expr<P> {
    fn eval<F: Fn(&P) -> bool>(&self, test: &F) -> bool {
        match self {
            Self::Prim(p) => test(p),
            Self::Not(e) => !e.eval(test),
            Self::And(terms) => terms.iter().all(|e| e.eval(test)),
            Self::Or(terms) => terms.iter().any(|e| e.eval(test)),
        }
    }
}

#[derive(Debug, Clone)]
enum AtomPrimitive {
    Any,
    AtomicNumber(u8),
    Element { element: Element, aromatic: bool },
    Aromatic,
    Aliphatic,
    Degree(usize),
    Connectivity(usize),
    HydrogenCount(usize),
    Charge(i8),
    InRing,
    RingCount(usize),
    RingSize(usize),
    RingConnectivity(usize),
    Recursive(Box<Smirks>),
}

#[derive(Debug, Clone, Copy)]
enum BondPrimitive {
    Single,
    Double,
    Triple,
    Aromatic,
    Any,
    Ring,
}

#[derive(Debug, Clone)]
struct QueryAtom {
    expr: Expr<AtomPrimitive>,
    map: Option<u32>,
}

#[derive(Debug, Clone)]
struct QueryBond {
    atom1: usize,
    atom2: usize,
    // `None` is the implicit bond: single or aromatic.
    expr: Option<Expr<BondPrimitive>>,
}

/// A parsed SMIRKS (SMARTS with atom map tags) pattern.
#[derive(Debug, Clone)]
pub struct Smirks {
    source: String,
    atoms: Vec<QueryAtom>,
    bonds: Vec<QueryBond>,
    adjacency: Vec<Vec<(usize, usize)>>,
    // Query atoms in search order, each with an already-visited neighbor if it has one.
    order: Vec<(usize, Option<usize>)>,
    tagged: Vec<usize>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, base: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            base,
        }
    }

    fn error(&self, message: impl Into<String>) -> SmirksError {
        SmirksError::Syntax {
            position: self.base + self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn base_is_lone_h(&self) -> bool {
        self.bytes == b"H"
    }

    fn number(&mut self) -> Option<usize> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
    }

    /// Index one past the parenthesis closing the one at `open`.
    fn matching_paren(&self, open: usize) -> Result<usize, SmirksError> {
        let mut depth = 0usize;
        for (i, &c) in self.bytes.iter().enumerate().skip(open) {
            match c {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i + 1);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced parentheses"))
    }
}

trait Primitive: Sized {
    fn starts(c: u8) -> bool;
    fn parse(cursor: &mut Cursor) -> Result<Self, SmirksError>;
}

impl Primitive for BondPrimitive {
    fn starts(c: u8) -> bool {
        matches!(c, b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'/' | b'\\' | b'!')
    }

    fn parse(cursor: &mut Cursor) -> Result<Self, SmirksError> {
        let primitive = match cursor.peek() {
            Some(b'-' | b'/' | b'\\') => Self::Single,
            Some(b'=') => Self::Double,
            Some(b'#') => Self::Triple,
            Some(b':') => Self::Aromatic,
            Some(b'~') => Self::Any,
            Some(b'@') => Self::Ring,
            _ => return Err(cursor.error("expected a bond primitive")),
        };
        cursor.pos += 1;
        Ok(primitive)
    }
}

impl Primitive for AtomPrimitive {
    fn starts(c: u8) -> bool {
        c.is_ascii_alphabetic() || matches!(c, b'*' | b'#' | b'+' | b'-' | b'$' | b'!')
    }

    fn parse(cursor: &mut Cursor) -> Result<Self, SmirksError> {
        let c = cursor.peek().ok_or_else(|| cursor.error("expected an atom primitive"))?;
        let next = cursor.peek_at(1);
        let primitive = match c {
            b'*' => {
                cursor.pos += 1;
                Self::Any
            }
            b'#' => {
                cursor.pos += 1;
                let z = cursor
                    .number()
                    .ok_or_else(|| cursor.error("expected an atomic number after '#'"))?;
                let z = u8::try_from(z)
                    .map_err(|_| cursor.error(format!("atomic number {z} is out of range")))?;
                Self::AtomicNumber(z)
            }
            b'+' | b'-' => {
                cursor.pos += 1;
                let magnitude = match cursor.number() {
                    Some(n) => n,
                    None => {
                        let mut count = 1usize;
                        while cursor.peek() == Some(c) {
                            cursor.pos += 1;
                            count += 1;
                        }
                        count
                    }
                };
                let magnitude = i8::try_from(magnitude)
                    .map_err(|_| cursor.error(format!("charge {magnitude} is out of range")))?;
                Self::Charge(if c == b'+' { magnitude } else { -magnitude })
            }
            b'$' => {
                if next != Some(b'(') {
                    return Err(cursor.error("expected '(' after '$'"));
                }
                let open = cursor.pos + 1;
                let close = cursor.matching_paren(open)?;
                let inner = std::str::from_utf8(&cursor.bytes[open + 1..close - 1])
                    .map_err(|_| cursor.error("invalid UTF-8 in recursive SMARTS"))?;
                let pattern = Smirks::parse_graph(inner, cursor.base + open + 1)?;
                cursor.pos = close;
                Self::Recursive(Box::new(pattern))
            }
            b'a' => {
                cursor.pos += 1;
                Self::Aromatic
            }
            b'A' if !next.is_some_and(|n| n.is_ascii_lowercase()) => {
                cursor.pos += 1;
                Self::Aliphatic
            }
            b'D' | b'X' | b'R' | b'r' | b'x' => {
                cursor.pos += 1;
                let n = cursor.number();
                match (c, n) {
                    (b'D', n) => Self::Degree(n.unwrap_or(1)),
                    (b'X', n) => Self::Connectivity(n.unwrap_or(1)),
                    (b'R' | b'r' | b'x', None) => Self::InRing,
                    (b'R', Some(n)) => Self::RingCount(n),
                    (b'r', Some(n)) => Self::RingSize(n),
                    (_, Some(n)) => Self::RingConnectivity(n),
                    _ => Self::InRing,
                }
            }
            b'H' => {
                cursor.pos += 1;
                match cursor.number() {
                    Some(n) => Self::HydrogenCount(n),
                    // A lone `[H]` is a hydrogen atom, not "one attached hydrogen".
                    None if cursor.base_is_lone_h() => Self::AtomicNumber(1),
                    None => Self::HydrogenCount(1),
                }
            }
            c if c.is_ascii_lowercase() => {
                let (symbol, width) = match (c, next) {
                    (b's', Some(b'e')) => ("Se", 2),
                    (b'c', _) => ("C", 1),
                    (b'n', _) => ("N", 1),
                    (b'o', _) => ("O", 1),
                    (b's', _) => ("S", 1),
                    (b'p', _) => ("P", 1),
                    (b'b', _) => ("B", 1),
                    _ => return Err(cursor.error(format!("unknown primitive '{}'", c as char))),
                };
                let element = Element::from_symbol(symbol)
                    .ok_or_else(|| cursor.error(format!("unknown element '{symbol}'")))?;
                cursor.pos += width;
                Self::Element {
                    element,
                    aromatic: true,
                }
            }
            c if c.is_ascii_uppercase() => {
                if let Some(n) = next.filter(u8::is_ascii_lowercase) {
                    let symbol = format!("{}{}", c as char, n as char);
                    if let Some(element) = Element::from_symbol(&symbol) {
                        cursor.pos += 2;
                        return Ok(Self::Element {
                            element,
                            aromatic: false,
                        });
                    }
                }
                let symbol = (c as char).to_string();
                let element = Element::from_symbol(&symbol)
                    .ok_or_else(|| cursor.error(format!("unknown element '{symbol}'")))?;
                cursor.pos += 1;
                Self::Element {
                    element,
                    aromatic: false,
                }
            }
            _ => return Err(cursor.error(format!("unexpected '{}'", c as char))),
        };
        Ok(primitive)
    }
}

fn parse_expression<P: Primitive>(cursor: &mut Cursor) -> Result<Expr<P>, SmirksError> {
    let mut terms = vec![parse_or(cursor)?];
    while cursor.peek() == Some(b';') {
        cursor.pos += 1;
        terms.push(parse_or(cursor)?);
    }
    if !cursor.at_end() {
        return Err(cursor.error("unexpected trailing characters"));
    }
    Ok(collapse(terms, Expr::And))
}

fn parse_or<P: Primitive>(cursor: &mut Cursor) -> Result<Expr<P>, SmirksError> {
    let mut terms = vec![parse_high_and(cursor)?];
    while cursor.peek() == Some(b',') {
        cursor.pos += 1;
        terms.push(parse_high_and(cursor)?);
    }
    Ok(collapse(terms, Expr::Or))
}

fn parse_high_and<P: Primitive>(cursor: &mut Cursor) -> Result<Expr<P>, SmirksError> {
    let mut terms = vec![parse_not(cursor)?];
    loop {
        match cursor.peek() {
            Some(b'&') => {
                cursor.pos += 1;
                terms.push(parse_not(cursor)?);
            }
            Some(c) if P::starts(c) => terms.push(parse_not(cursor)?),
            _ => break,
        }
    }
    Ok(collapse(terms, Expr::And))
}

fn parse_not<P: Primitive>(cursor: &mut Cursor) -> Result<Expr<P>, SmirksError> {
    if cursor.peek() == Some(b'!') {
        cursor.pos += 1;
        return Ok(Expr::Not(Box::new(parse_not(cursor)?)));
    }
    Ok(Expr::Prim(P::parse(cursor)?))
}

fn collapse<P>(mut terms: Vec<Expr<P>>, join: fn(Vec<Expr<P>>) -> Expr<P>) -> Expr<P> {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        join(terms)
    }
}

fn is_bond_char(c: u8) -> bool {
    matches!(
        c,
        b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'/' | b'\\' | b'!' | b'&' | b',' | b';'
    )
}

impl Smirks {
    /// Parses a full SMIRKS pattern. Map tags, when present, must be exactly `1..=k`.
    pub fn parse(pattern: &str) -> Result<Self, SmirksError> {
        let smirks = Self::parse_graph(pattern.trim(), 0)?;
        let mut maps: Vec<u32> = smirks.atoms.iter().filter_map(|a| a.map).collect();
        maps.sort_unstable();
        let expected: Vec<u32> = (1..=maps.len() as u32).collect();
        if maps != expected {
            return Err(SmirksError::MapTags {
                expected: maps.len(),
                found: maps,
            });
        }
        Ok(smirks)
    }

    fn parse_graph(pattern: &str, base: usize) -> Result<Self, SmirksError> {
        let mut cursor = Cursor::new(pattern, base);
        let mut atoms: Vec<QueryAtom> = Vec::new();
        let mut bonds: Vec<QueryBond> = Vec::new();
        let mut previous: Option<usize> = None;
        let mut branches: Vec<Option<usize>> = Vec::new();
        let mut pending: Option<Expr<BondPrimitive>> = None;
        let mut rings: std::collections::HashMap<usize, (usize, Option<Expr<BondPrimitive>>)> =
            Default::default();

        while let Some(c) = cursor.peek() {
            match c {
                b'(' => {
                    if previous.is_none() {
                        return Err(cursor.error("branch opened before any atom"));
                    }
                    branches.push(previous);
                    cursor.pos += 1;
                }
                b')' => {
                    previous = branches.pop().ok_or_else(|| cursor.error("unmatched ')'"))?;
                    cursor.pos += 1;
                }
                b'.' => {
                    previous = None;
                    cursor.pos += 1;
                }
                b'0'..=b'9' | b'%' => {
                    let atom = previous.ok_or_else(|| cursor.error("ring bond before any atom"))?;
                    let label = if c == b'%' {
                        cursor.pos += 1;
                        let start = cursor.pos;
                        let label = cursor.number();
                        if cursor.pos - start != 2 {
                            return Err(cursor.error("expected two digits after '%'"));
                        }
                        label.unwrap_or(0)
                    } else {
                        cursor.pos += 1;
                        (c - b'0') as usize
                    };
                    match rings.remove(&label) {
                        Some((partner, opening)) => bonds.push(QueryBond {
                            atom1: partner,
                            atom2: atom,
                            expr: opening.or(pending.take()),
                        }),
                        None => {
                            rings.insert(label, (atom, pending.take()));
                        }
                    }
                    pending = None;
                }
                c if is_bond_char(c) => {
                    if pending.is_some() {
                        return Err(cursor.error("two consecutive bond expressions"));
                    }
                    let start = cursor.pos;
                    while cursor.peek().is_some_and(is_bond_char) {
                        cursor.pos += 1;
                    }
                    let text = std::str::from_utf8(&cursor.bytes[start..cursor.pos])
                        .map_err(|_| cursor.error("invalid bond expression"))?;
                    let mut bond_cursor = Cursor::new(text, cursor.base + start);
                    pending = Some(parse_expression::<BondPrimitive>(&mut bond_cursor)?);
                }
                _ => {
                    let atom = Self::parse_atom(&mut cursor)?;
                    atoms.push(atom);
                    let index = atoms.len() - 1;
                    if let Some(prev) = previous {
                        bonds.push(QueryBond {
                            atom1: prev,
                            atom2: index,
                            expr: pending.take(),
                        });
                    } else if pending.is_some() {
                        return Err(cursor.error("bond without a preceding atom"));
                    }
                    previous = Some(index);
                }
            }
        }

        if pending.is_some() {
            return Err(cursor.error("dangling bond"));
        }
        if !branches.is_empty() {
            return Err(cursor.error("unclosed branch"));
        }
        if !rings.is_empty() {
            return Err(cursor.error("unclosed ring bond"));
        }
        if atoms.is_empty() {
            return Err(cursor.error("pattern has no atoms"));
        }

        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (index, bond) in bonds.iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, index));
            adjacency[bond.atom2].push((bond.atom1, index));
        }
        let order = search_order(&adjacency);

        let mut tagged: Vec<(u32, usize)> = atoms
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.map.map(|m| (m, i)))
            .collect();
        tagged.sort_unstable();

        Ok(Self {
            source: pattern.to_string(),
            atoms,
            bonds,
            adjacency,
            order,
            tagged: tagged.into_iter().map(|(_, i)| i).collect(),
        })
    }

    fn parse_atom(cursor: &mut Cursor) -> Result<QueryAtom, SmirksError> {
        if cursor.peek() != Some(b'[') {
            let c = cursor.peek().unwrap_or(b' ');
            let (expr, width) = match (c, cursor.peek_at(1)) {
                (b'*', _) => (Expr::Prim(AtomPrimitive::Any), 1),
                (b'C', Some(b'l')) => (aliphatic(Element::CL), 2),
                (b'B', Some(b'r')) => (aliphatic(Element::BR), 2),
                (b'B', _) => (aliphatic(Element::B), 1),
                (b'C', _) => (aliphatic(Element::C), 1),
                (b'N', _) => (aliphatic(Element::N), 1),
                (b'O', _) => (aliphatic(Element::O), 1),
                (b'P', _) => (aliphatic(Element::P), 1),
                (b'S', _) => (aliphatic(Element::S), 1),
                (b'F', _) => (aliphatic(Element::F), 1),
                (b'I', _) => (aliphatic(Element::I), 1),
                (b'c', _) => (aromatic(Element::C), 1),
                (b'n', _) => (aromatic(Element::N), 1),
                (b'o', _) => (aromatic(Element::O), 1),
                (b's', _) => (aromatic(Element::S), 1),
                (b'p', _) => (aromatic(Element::P), 1),
                (b'b', _) => (aromatic(Element::B), 1),
                _ => return Err(cursor.error(format!("unexpected '{}'", c as char))),
            };
            cursor.pos += width;
            return Ok(QueryAtom { expr, map: None });
        }

        let open = cursor.pos;
        let mut depth = 0usize;
        let mut close = None;
        for (i, &c) in cursor.bytes.iter().enumerate().skip(open + 1) {
            match c {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b']' if depth == 0 => {
                    close = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| cursor.error("unclosed '['"))?;
        let body = &cursor.bytes[open + 1..close];

        let mut depth = 0usize;
        let mut map_at = None;
        for (i, &c) in body.iter().enumerate() {
            match c {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b':' if depth == 0 => map_at = Some(i),
                _ => {}
            }
        }
        let (expr_bytes, map) = match map_at {
            Some(i) => {
                let digits = std::str::from_utf8(&body[i + 1..]).unwrap_or("");
                let map = digits
                    .parse::<u32>()
                    .map_err(|_| cursor.error("invalid atom map tag"))?;
                (&body[..i], Some(map))
            }
            None => (body, None),
        };
        let text = std::str::from_utf8(expr_bytes).map_err(|_| cursor.error("invalid UTF-8"))?;
        if text.is_empty() {
            return Err(cursor.error("empty bracket atom"));
        }
        let mut inner = Cursor::new(text, cursor.base + open + 1);
        let expr = parse_expression::<AtomPrimitive>(&mut inner)?;
        cursor.pos = close + 1;
        Ok(QueryAtom { expr, map })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of atoms carrying a map tag.
    pub fn n_tagged(&self) -> usize {
        self.tagged.len()
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Every distinct tuple of molecule atoms matched by the tagged query atoms, in tag
    /// order. Patterns without tags report the full match.
    pub fn find_matches(&self, context: &MatchContext) -> Vec<Vec<usize>> {
        let mut mapping = vec![None; self.atoms.len()];
        let mut used = vec![false; context.molecule.n_atoms()];
        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        self.search(context, 0, &mut mapping, &mut used, &mut |mapping| {
            let key: Vec<usize> = if self.tagged.is_empty() {
                mapping.iter().flatten().copied().collect()
            } else {
                self.tagged.iter().filter_map(|&q| mapping[q]).collect()
            };
            if seen.insert(key.clone()) {
                matches.push(key);
            }
            false
        });
        matches
    }

    /// True if the pattern matches with its first atom on `root`.
    fn matches_rooted(&self, context: &MatchContext, root: usize) -> bool {
        if !context.atom_matches(&self.atoms[0].expr, root) {
            return false;
        }
        let mut mapping = vec![None; self.atoms.len()];
        let mut used = vec![false; context.molecule.n_atoms()];
        mapping[0] = Some(root);
        used[root] = true;
        self.search(context, 1, &mut mapping, &mut used, &mut |_| true)
    }

    /// Depth-first assignment of query atoms; `visit` returns `true` to stop the search.
    fn search(
        &self,
        context: &MatchContext,
        depth: usize,
        mapping: &mut [Option<usize>],
        used: &mut [bool],
        visit: &mut dyn FnMut(&[Option<usize>]) -> bool,
    ) -> bool {
        if depth == self.order.len() {
            return visit(mapping);
        }
        let (query, parent) = self.order[depth];
        let candidates: Vec<usize> = match parent.and_then(|p| mapping[p]) {
            Some(anchor) => context.adjacency[anchor].iter().map(|&(n, _)| n).collect(),
            None => (0..context.molecule.n_atoms()).collect(),
        };
        for candidate in candidates {
            if used[candidate] || !context.atom_matches(&self.atoms[query].expr, candidate) {
                continue;
            }
            let bonds_ok = self.adjacency[query].iter().all(|&(other, bond)| {
                match mapping[other] {
                    Some(image) => context
                        .bond_between(candidate, image)
                        .is_some_and(|b| context.bond_matches(self.bonds[bond].expr.as_ref(), b)),
                    None => true,
                }
            });
            if !bonds_ok {
                continue;
            }
            mapping[query] = Some(candidate);
            used[candidate] = true;
            let stop = self.search(context, depth + 1, mapping, used, visit);
            mapping[query] = None;
            used[candidate] = false;
            if stop {
                return true;
            }
        }
        false
    }
}

impl FromStr for Smirks {
    type Err = SmirksError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn aliphatic(element: Element) -> Expr<AtomPrimitive> {
    Expr::Prim(AtomPrimitive::Element {
        element,
        aromatic: false,
    })
}

fn aromatic(element: Element) -> Expr<AtomPrimitive> {
    Expr::Prim(AtomPrimitive::Element {
        element,
        aromatic: true,
    })
}

fn search_order(adjacency: &[Vec<(usize, usize)>]) -> Vec<(usize, Option<usize>)> {
    let mut visited = vec![false; adjacency.len()];
    let mut order = Vec::with_capacity(adjacency.len());
    for start in 0..adjacency.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut stack = vec![(start, None)];
        while let Some((atom, parent)) = stack.pop() {
            order.push((atom, parent));
            for &(next, _) in adjacency[atom].iter().rev() {
                if !visited[next] {
                    visited[next] = true;
                    stack.push((next, Some(atom)));
                }
            }
        }
    }
    order
}

/// Per-molecule data shared by all pattern matches against that molecule.
pub struct MatchContext<'a> {
    molecule: &'a Molecule,
    rings: RingInfo,
    adjacency: Vec<Vec<(usize, usize)>>,
    hydrogens: Vec<usize>,
}

impl<'a> MatchContext<'a> {
    pub fn new(molecule: &'a Molecule) -> Self {
        let mut adjacency = vec![Vec::new(); molecule.n_atoms()];
        for (index, bond) in molecule.bonds().iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, index));
            adjacency[bond.atom2].push((bond.atom1, index));
        }
        let hydrogens = (0..molecule.n_atoms())
            .map(|i| molecule.hydrogen_count(i))
            .collect();
        Self {
            molecule,
            rings: RingInfo::perceive(molecule),
            adjacency,
            hydrogens,
        }
    }

    fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency[a]
            .iter()
            .find(|&&(n, _)| n == b)
            .map(|&(_, bond)| bond)
    }

    fn atom_matches(&self, expr: &Expr<AtomPrimitive>, atom: usize) -> bool {
        expr.eval(&|primitive| self.atom_primitive(primitive, atom))
    }

    fn atom_primitive(&self, primitive: &AtomPrimitive, index: usize) -> bool {
        let atom = &self.molecule.atoms()[index];
        match primitive {
            AtomPrimitive::Any => true,
            AtomPrimitive::AtomicNumber(z) => atom.element.atomic_number() == *z,
            AtomPrimitive::Element { element, aromatic } => {
                atom.element == *element && atom.is_aromatic == *aromatic
            }
            AtomPrimitive::Aromatic => atom.is_aromatic,
            AtomPrimitive::Aliphatic => !atom.is_aromatic,
            AtomPrimitive::Degree(n) | AtomPrimitive::Connectivity(n) => {
                self.adjacency[index].len() == *n
            }
            AtomPrimitive::HydrogenCount(n) => self.hydrogens[index] == *n,
            AtomPrimitive::Charge(q) => atom.formal_charge == *q,
            AtomPrimitive::InRing => self.rings.is_ring_atom(index),
            AtomPrimitive::RingCount(n) => self.rings.atom_ring_count(index) == *n,
            AtomPrimitive::RingSize(n) => {
                self.rings.atom_smallest_ring(index).unwrap_or(0) == *n
            }
            AtomPrimitive::RingConnectivity(n) => {
                self.rings.atom_ring_connectivity(index) == *n
            }
            AtomPrimitive::Recursive(pattern) => pattern.matches_rooted(self, index),
        }
    }

    fn bond_matches(&self, expr: Option<&Expr<BondPrimitive>>, bond_index: usize) -> bool {
        let order = self.molecule.bonds()[bond_index].order;
        match expr {
            None => matches!(order, BondOrder::Single | BondOrder::Aromatic),
            Some(expr) => expr.eval(&|primitive| match primitive {
                BondPrimitive::Single => order == BondOrder::Single,
                BondPrimitive::Double => order == BondOrder::Double,
                BondPrimitive::Triple => order == BondOrder::Triple,
                BondPrimitive::Aromatic => order == BondOrder::Aromatic,
                BondPrimitive::Any => true,
                BondPrimitive::Ring => self.rings.is_ring_bond(bond_index),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, smiles: &str) -> Vec<Vec<usize>> {
        let molecule = Molecule::from_smiles(smiles).unwrap();
        let context = MatchContext::new(&molecule);
        let mut found = Smirks::parse(pattern).unwrap().find_matches(&context);
        found.sort();
        found
    }

    #[test]
    fn tagged_bond_matches_both_directions() {
        // Ethane: C0, C1, then three hydrogens on each carbon.
        let found = matches("[#6X4:1]-[#6X4:2]", "CC");
        assert_eq!(found, vec![vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn hydrogen_patterns_use_atomic_number_and_connectivity() {
        let found = matches("[#6:1]-[#1:2]", "C");
        assert_eq!(found.len(), 4);
        assert!(found.iter().all(|m| m[0] == 0));

        let found = matches("[#1:1]-[#8X2H1:2]", "CO");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn aromatic_and_ring_primitives() {
        assert_eq!(matches("[c:1]:[c:2]", "c1ccccc1").len(), 12);
        assert!(matches("[C:1]-[C:2]", "c1ccccc1").is_empty());
        assert_eq!(matches("[#6r6:1]@[#6:2]", "C1CCCCC1C").len(), 12);
        assert_eq!(matches("[#6R0:1]-[#6R1:2]", "C1CCCCC1C").len(), 1);
        assert_eq!(matches("[#6x2:1]", "C1CCCCC1C").len(), 6);
    }

    #[test]
    fn logical_operators_follow_smarts_precedence() {
        // Oxygen or nitrogen, and carrying exactly one hydrogen.
        let found = matches("[#8,#7;H1:1]", "NCO");
        assert_eq!(found.len(), 1);
        let found = matches("[!#1:1]", "CO");
        assert_eq!(found, vec![vec![0], vec![1]]);
        let found = matches("[#6&!H3:1]", "CCO");
        assert_eq!(found, vec![vec![1]]);
    }

    #[test]
    fn charges_and_degree() {
        assert_eq!(matches("[#8-1:1]", "CC(=O)[O-]").len(), 1);
        assert_eq!(matches("[#7+:1]", "[NH4+]").len(), 1);
        assert_eq!(matches("[#6D3:1]", "CC(=O)[O-]").len(), 1);
    }

    #[test]
    fn recursive_smarts_constrains_environment() {
        // Carbon attached to a hydroxyl oxygen.
        let found = matches("[#6;$([#6]-[#8H1]):1]", "CCO");
        assert_eq!(found, vec![vec![1]]);
    }

    #[test]
    fn bond_orders_and_wildcards() {
        assert_eq!(matches("[*:1]=[*:2]", "C=CC").len(), 2);
        assert_eq!(matches("[*:1]#[*:2]", "CC#N").len(), 2);
        assert_eq!(matches("[#6:1]~[#7:2]", "CC#N").len(), 1);
        assert_eq!(matches("[*:1]~[*:2]~[*:3]", "O").len(), 2);
    }

    #[test]
    fn untagged_atoms_constrain_without_being_reported() {
        let found = matches("[#1:1]-[#6:2](-[#8])", "CCO");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m[1] == 1));
    }

    #[test]
    fn ring_closures_in_patterns() {
        assert_eq!(matches("[#6:1]1-[#6]-[#6]-[#6]-[#6]-[#6]-1", "C1CCCCC1").len(), 6);
        assert!(matches("[#6:1]1-[#6]-[#6]-[#6]-[#6]-1", "C1CCCCC1").is_empty());
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert!(matches!(
            Smirks::parse("[#6:1]-[#6:3]"),
            Err(SmirksError::MapTags { .. })
        ));
        for bad in ["[#6:1", "[#6:1](", "[#6:1]-", "[Qq:1]", "[$(#6:1]", "[:1]"] {
            assert!(Smirks::parse(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn out_of_range_numbers_are_syntax_errors() {
        let pluses = format!("[#6{}:1]", "+".repeat(200));
        for bad in ["[#300:1]", "[#6+200:1]", pluses.as_str()] {
            assert!(
                matches!(Smirks::parse(bad), Err(SmirksError::Syntax { .. })),
                "{bad} should fail"
            );
        }
        assert_eq!(matches("[#6:1]", "C").len(), 1);
        assert_eq!(matches("[#8--:1]", "[O-2]").len(), 1);
    }
}
