use std::fmt;

/// The closed alphabet a column cell's major base can take.
///
/// Ordered `A, C, G, T, D, N, InsA, InsC, InsG, InsT` so that iterating the
/// variants in declaration order reproduces the tie-break rule `major()`
/// uses: ties go to whichever of `ACGTDN` comes first, then to whichever
/// insertion base comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nt {
    A,
    C,
    G,
    T,
    D,
    N,
    InsA,
    InsC,
    InsG,
    InsT,
}

pub const NT_COUNT: usize = 10;
pub const ALL_NT: [Nt; NT_COUNT] = [
    Nt::A,
    Nt::C,
    Nt::G,
    Nt::T,
    Nt::D,
    Nt::N,
    Nt::InsA,
    Nt::InsC,
    Nt::InsG,
    Nt::InsT,
];

impl Nt {
    pub fn index(self) -> usize {
        match self {
            Nt::A => 0,
            Nt::C => 1,
            Nt::G => 2,
            Nt::T => 3,
            Nt::D => 4,
            Nt::N => 5,
            Nt::InsA => 6,
            Nt::InsC => 7,
            Nt::InsG => 8,
            Nt::InsT => 9,
        }
    }

    /// Parse a base letter (`A`, `C`, `G`, `T`) into its non-insertion `Nt`.
    pub fn base(b: u8) -> Nt {
        match b {
            b'A' => Nt::A,
            b'C' => Nt::C,
            b'G' => Nt::G,
            b'T' => Nt::T,
            _ => panic!("invalid base byte {}", b as char),
        }
    }

    /// Parse a two-character insertion token (`IA`, `IC`, `IG`, `IT`) base.
    pub fn insertion(b: u8) -> Nt {
        match b {
            b'A' => Nt::InsA,
            b'C' => Nt::InsC,
            b'G' => Nt::InsG,
            b'T' => Nt::InsT,
            _ => panic!("invalid insertion base byte {}", b as char),
        }
    }

    pub fn is_insertion(self) -> bool {
        matches!(self, Nt::InsA | Nt::InsC | Nt::InsG | Nt::InsT)
    }

    pub fn is_acgt(self) -> bool {
        matches!(self, Nt::A | Nt::C | Nt::G | Nt::T)
    }

    /// The plain base letter this `Nt` represents, stripping the `I` tag
    /// for insertions. `D`/`N` have no base letter.
    pub fn base_letter(self) -> Option<u8> {
        match self {
            Nt::A | Nt::InsA => Some(b'A'),
            Nt::C | Nt::InsC => Some(b'C'),
            Nt::G | Nt::InsG => Some(b'G'),
            Nt::T | Nt::InsT => Some(b'T'),
            Nt::D | Nt::N => None,
        }
    }

    /// Parse the token form used at the assembly engine's read-record
    /// boundary: `"A"`, `"C"`, `"G"`, `"T"`, `"D"`, `"N"`, or `"IA"`..`"IT"`.
    pub fn parse(token: &str) -> Nt {
        let bytes = token.as_bytes();
        match bytes.len() {
            1 => match bytes[0] {
                b'D' => Nt::D,
                b'N' => Nt::N,
                b => Nt::base(b),
            },
            2 => {
                assert_eq!(bytes[0], b'I', "malformed nt token: {}", token);
                Nt::insertion(bytes[1])
            }
            _ => panic!("malformed nt token: {}", token),
        }
    }
}

impl fmt::Display for Nt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nt::A => write!(f, "A"),
            Nt::C => write!(f, "C"),
            Nt::G => write!(f, "G"),
            Nt::T => write!(f, "T"),
            Nt::D => write!(f, "D"),
            Nt::N => write!(f, "N"),
            Nt::InsA => write!(f, "IA"),
            Nt::InsC => write!(f, "IC"),
            Nt::InsG => write!(f, "IG"),
            Nt::InsT => write!(f, "IT"),
        }
    }
}

/// The identity attached to a base observation in a column cell.
///
/// `Empty` carries no information (the base matches backbone and no read
/// flagged it otherwise); `Unknown` marks a base that differs from backbone
/// but isn't explained by any cataloged variant; `Gap` marks a synthesized
/// bridging cell; `Known` names a catalog variant id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum VarId {
    #[default]
    Empty,
    Unknown,
    Gap,
    Known(String),
}

impl VarId {
    pub fn is_empty(&self) -> bool {
        matches!(self, VarId::Empty)
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            VarId::Known(id) => Some(id.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarId::Empty => write!(f, ""),
            VarId::Unknown => write!(f, "unknown"),
            VarId::Gap => write!(f, "gap"),
            VarId::Known(id) => write!(f, "{}", id),
        }
    }
}

/// A single column observation: a small map from base (or `D`/`N`/`I*`) to
/// `(count, var_id)`, plus an overflow list for secondary `var_id`s that
/// explain the *same* major base differently (spec §3's "multiple var_ids
/// per cell are permitted when distinct variants explain the same base").
///
/// Kept as a fixed 10-slot array rather than a hash map per spec §9's
/// design note: this is the hot loop in `overlap_with`/`combine_with`.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    slots: [Option<(u32, VarId)>; NT_COUNT],
    secondary: Vec<(Nt, VarId)>,
}

impl Cell {
    pub fn new() -> Cell {
        Cell::default()
    }

    /// A cell with a single observation, as produced by node construction.
    pub fn single(nt: Nt, var_id: VarId) -> Cell {
        let mut cell = Cell::new();
        cell.slots[nt.index()] = Some((1, var_id));
        cell
    }

    /// Synthetic bridging cell: `{N: (1, "")}`.
    pub fn gap() -> Cell {
        Cell::single(Nt::N, VarId::Empty)
    }

    pub fn get(&self, nt: Nt) -> Option<&(u32, VarId)> {
        self.slots[nt.index()].as_ref()
    }

    pub fn count(&self, nt: Nt) -> u32 {
        self.slots[nt.index()].as_ref().map(|(c, _)| *c).unwrap_or(0)
    }

    pub fn total_count(&self) -> u32 {
        self.slots.iter().filter_map(|s| s.as_ref()).map(|(c, _)| *c).sum()
    }

    /// Add an observation, merging into an existing slot when present.
    /// A differing non-empty `var_id` on an already-occupied slot is never
    /// allowed to overwrite the existing one; it is recorded as a
    /// secondary entry instead (spec §4.1 `combine_with`).
    pub fn add(&mut self, nt: Nt, count: u32, var_id: VarId) {
        match &mut self.slots[nt.index()] {
            Some((existing_count, existing_var)) => {
                *existing_count += count;
                if !var_id.is_empty() && *existing_var != var_id {
                    if existing_var.is_empty() {
                        *existing_var = var_id;
                    } else if !self.secondary.iter().any(|(n, v)| *n == nt && *v == var_id) {
                        self.secondary.push((nt, var_id));
                    }
                }
            }
            slot @ None => {
                *slot = Some((count, var_id));
            }
        }
    }

    /// The major base: the entry with the highest count, ties broken by
    /// `Nt`'s declaration order (`ACGTDN` then insertion bases).
    pub fn major(&self) -> Nt {
        let mut best = None;
        let mut best_count = 0u32;
        for nt in ALL_NT {
            if let Some((count, _)) = &self.slots[nt.index()] {
                if *count > best_count {
                    best_count = *count;
                    best = Some(nt);
                }
            }
        }
        best.expect("cell has no observations")
    }

    /// All `var_id`s recorded for the given base, primary slot first.
    pub fn var_ids_for(&self, nt: Nt) -> impl Iterator<Item = &VarId> {
        self.slots[nt.index()]
            .iter()
            .map(|(_, v)| v)
            .chain(self.secondary.iter().filter(move |(n, _)| *n == nt).map(|(_, v)| v))
    }

    /// All occupied `(nt, count, var_id)` triples, including secondary
    /// entries, in `Nt` declaration order.
    pub fn entries(&self) -> Vec<(Nt, u32, &VarId)> {
        let mut out = Vec::new();
        for nt in ALL_NT {
            if let Some((count, var)) = &self.slots[nt.index()] {
                out.push((nt, *count, var));
            }
        }
        for (nt, var) in &self.secondary {
            out.push((*nt, 0, var));
        }
        out
    }
}

/// `match_score(a, b) = max over nt in ACGT present in both of
/// count_a(nt)/(2*sum_a) + count_b(nt)/(2*sum_b)`.
pub fn match_score(a: &Cell, b: &Cell) -> f64 {
    let total_a = a.total_count() as f64 * 2.0;
    let total_b = b.total_count() as f64 * 2.0;
    let mut best = 0.0f64;
    for nt in [Nt::A, Nt::C, Nt::G, Nt::T] {
        let (Some((ca, _)), Some((cb, _))) = (a.get(nt), b.get(nt)) else {
            continue;
        };
        let candidate = (*ca as f64) / total_a + (*cb as f64) / total_b;
        if candidate > best {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_picks_highest_count_with_tie_break() {
        let mut cell = Cell::new();
        cell.add(Nt::C, 3, VarId::Empty);
        cell.add(Nt::A, 3, VarId::Empty);
        assert_eq!(cell.major(), Nt::A);
    }

    #[test]
    fn add_accumulates_counts_and_keeps_first_var_id() {
        let mut cell = Cell::single(Nt::A, VarId::Known("v1".to_string()));
        cell.add(Nt::A, 2, VarId::Unknown);
        assert_eq!(cell.count(Nt::A), 3);
        assert_eq!(cell.get(Nt::A).unwrap().1, VarId::Known("v1".to_string()));
        let secondary: Vec<_> = cell.var_ids_for(Nt::A).collect();
        assert!(secondary.contains(&&VarId::Unknown));
    }

    #[test]
    fn match_score_rewards_shared_major_base() {
        let a = Cell::single(Nt::A, VarId::Empty);
        let b = Cell::single(Nt::A, VarId::Empty);
        assert!((match_score(&a, &b) - 1.0).abs() < 1e-9);

        let c = Cell::single(Nt::G, VarId::Empty);
        assert_eq!(match_score(&a, &c), 0.0);
    }
}
