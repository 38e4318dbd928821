use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SequenceError {
    #[error("Invalid nucleotide '{symbol}' at position {position}")]
    InvalidSymbol { symbol: char, position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Base {
    A,
    C,
    G,
    U,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::U];

    /// Accepts RNA and DNA letters in either case; `T` maps to `U`.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Base::A),
            'C' => Some(Base::C),
            'G' => Some(Base::G),
            'U' | 'T' => Some(Base::U),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Base::A => 'A',
            Base::C => 'C',
            Base::G => 'G',
            Base::U => 'U',
        }
    }

    pub fn is_strong(self) -> bool {
        matches!(self, Base::G | Base::C)
    }

    /// The three bases that differ from `self`, in alphabet order.
    pub fn alternatives(self) -> [Base; 3] {
        let mut out = [Base::A; 3];
        let mut i = 0;
        for b in Base::ALL {
            if b != self {
                out[i] = b;
                i += 1;
            }
        }
        out
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// An immutable RNA sequence over `{A, C, G, U}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sequence {
    bases: Vec<Base>,
}

impl Sequence {
    pub fn new(bases: Vec<Base>) -> Self {
        Self { bases }
    }

    pub fn bases(&self) -> &[Base] {
        &self.bases
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<Base> {
        self.bases.get(position).copied()
    }

    /// Returns a copy with the base at `position` replaced.
    pub fn with_substitution(&self, position: usize, base: Base) -> Self {
        let mut bases = self.bases.clone();
        bases[position] = base;
        Self { bases }
    }

    pub fn random(length: usize, rng: &mut impl rand::Rng) -> Self {
        let bases = (0..length)
            .map(|_| Base::ALL[rng.gen_range(0..Base::ALL.len())])
            .collect();
        Self { bases }
    }
}

impl From<Vec<Base>> for Sequence {
    fn from(bases: Vec<Base>) -> Self {
        Self::new(bases)
    }
}

impl FromStr for Sequence {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .chars()
            .enumerate()
            .map(|(position, symbol)| {
                Base::from_char(symbol).ok_or(SequenceError::InvalidSymbol { symbol, position })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }
}

impl TryFrom<String> for Sequence {
    type Error = SequenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sequence> for String {
    fn from(seq: Sequence) -> Self {
        seq.to_string()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for base in &self.bases {
            write!(f, "{}", base.to_char())?;
        }
        Ok(())
    }
}
