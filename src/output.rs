use std::io::{self, Write};

use serde::Serialize;

use crate::app::{FastaResult, HierarchyResult, OrganismResult, VirusResult};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_hierarchy(result: &HierarchyResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_organisms(result: &OrganismResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_viruses(result: &VirusResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_fasta(result: &FastaResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
