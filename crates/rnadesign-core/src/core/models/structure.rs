use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StructureError {
    #[error("Invalid dot-bracket symbol '{symbol}' at position {position}")]
    InvalidSymbol { symbol: char, position: usize },
    #[error("Unbalanced brackets in dot-bracket string at position {position}")]
    Unbalanced { position: usize },
}

/// A secondary structure in dot-bracket notation.
///
/// Only `(`, `)` and `.` are accepted and brackets must balance. Two sequences are
/// structure-equivalent exactly when their predicted `Structure`s compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Structure(String);

impl Structure {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.0.bytes().filter(|&b| b == b'(').count()
    }
}

impl FromStr for Structure {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut depth: usize = 0;
        for (position, symbol) in s.chars().enumerate() {
            match symbol {
                '.' => {}
                '(' => depth += 1,
                ')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or(StructureError::Unbalanced { position })?;
                }
                _ => return Err(StructureError::InvalidSymbol { symbol, position }),
            }
        }
        if depth != 0 {
            return Err(StructureError::Unbalanced { position: s.len() });
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Structure {
    type Error = StructureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Structure> for String {
    fn from(structure: Structure) -> Self {
        structure.0
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_balanced_hairpin() {
        let s: Structure = "((((....))))".parse().unwrap();
        assert_eq!(s.len(), 12);
        assert_eq!(s.pair_count(), 4);
    }

    #[test]
    fn rejects_closing_bracket_without_opening() {
        assert_eq!(
            "..)(".parse::<Structure>(),
            Err(StructureError::Unbalanced { position: 2 })
        );
    }

    #[test]
    fn rejects_unclosed_brackets() {
        assert_eq!(
            "((..)".parse::<Structure>(),
            Err(StructureError::Unbalanced { position: 5 })
        );
    }

    #[test]
    fn rejects_pseudoknot_symbols() {
        assert!(matches!(
            "[[..]]".parse::<Structure>(),
            Err(StructureError::InvalidSymbol { symbol: '[', .. })
        ));
    }
}
