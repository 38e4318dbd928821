use super::traits::OutputFile;
use crate::core::models::{Group, Sequence};
use std::io::{self, Write};

/// Ordered variant list, one record per sequence, headers `>scaffold_{i}` (0-based).
pub struct VariantFasta;

impl OutputFile for VariantFasta {
    type Content = [Sequence];
    type Error = io::Error;

    fn write_to(content: &[Sequence], writer: &mut impl Write) -> io::Result<()> {
        for (i, seq) in content.iter().enumerate() {
            writeln!(writer, ">scaffold_{i}\n{seq}")?;
        }
        Ok(())
    }
}

/// Groups flattened into one file, headers `>Group{g}_Var{v}` (both 1-based).
pub struct GroupFasta;

impl OutputFile for GroupFasta {
    type Content = [Group];
    type Error = io::Error;

    fn write_to(content: &[Group], writer: &mut impl Write) -> io::Result<()> {
        for (g, group) in content.iter().enumerate() {
            for (v, seq) in group.iter().enumerate() {
                writeln!(writer, ">Group{}_Var{}\n{}", g + 1, v + 1, seq)?;
            }
        }
        Ok(())
    }
}
