//! Gene tables to FASTA.
//!
//! Each gene contributes at most one entry per stream: amino acid or
//! nucleotide, split by whether the gene has a KO assignment.

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::error::KeggError;
use crate::store::FastaPaths;
use crate::table::{GeneRow, read_tsv};

pub const HEADER_DELIMITER: &str = "|";

/// Entry counts per stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FastaCounts {
    pub aa_ko: usize,
    pub aa_no_ko: usize,
    pub nt_ko: usize,
    pub nt_no_ko: usize,
}

pub struct FastaSink<W: Write> {
    aa_ko: W,
    aa_no_ko: W,
    nt_ko: W,
    nt_no_ko: W,
    counts: FastaCounts,
}

impl FastaSink<BufWriter<File>> {
    pub fn create(paths: &FastaPaths) -> Result<Self, KeggError> {
        Ok(Self::new(
            create_file(&paths.aa_ko)?,
            create_file(&paths.aa_no_ko)?,
            create_file(&paths.nt_ko)?,
            create_file(&paths.nt_no_ko)?,
        ))
    }
}

impl<W: Write> FastaSink<W> {
    pub fn new(aa_ko: W, aa_no_ko: W, nt_ko: W, nt_no_ko: W) -> Self {
        Self {
            aa_ko,
            aa_no_ko,
            nt_ko,
            nt_no_ko,
            counts: FastaCounts::default(),
        }
    }

    pub fn write_row(&mut self, row: &GeneRow) -> Result<(), KeggError> {
        let header = fasta_header(row);
        let has_ko = row.koid.is_some();
        if let Some(aaseq) = row.aaseq.as_deref() {
            let (out, count) = if has_ko {
                (&mut self.aa_ko, &mut self.counts.aa_ko)
            } else {
                (&mut self.aa_no_ko, &mut self.counts.aa_no_ko)
            };
            write_entry(out, &header, aaseq)?;
            *count += 1;
        }
        if let Some(ntseq) = row.ntseq.as_deref() {
            let (out, count) = if has_ko {
                (&mut self.nt_ko, &mut self.counts.nt_ko)
            } else {
                (&mut self.nt_no_ko, &mut self.counts.nt_no_ko)
            };
            write_entry(out, &header, ntseq)?;
            *count += 1;
        }
        Ok(())
    }

    pub fn counts(&self) -> FastaCounts {
        self.counts
    }

    pub fn finish(mut self) -> Result<FastaCounts, KeggError> {
        for out in [
            &mut self.aa_ko,
            &mut self.aa_no_ko,
            &mut self.nt_ko,
            &mut self.nt_no_ko,
        ] {
            out.flush()
                .map_err(|err| KeggError::Filesystem(err.to_string()))?;
        }
        Ok(self.counts)
    }
}

/// `kegg_gene_id|desc|koid`, with an empty last field when there is no KO.
pub fn fasta_header(row: &GeneRow) -> String {
    [
        row.kegg_gene_id.as_str(),
        row.desc.as_str(),
        row.koid.as_deref().unwrap_or(""),
    ]
    .join(HEADER_DELIMITER)
}

/// Converts every table in `files` into the four streams of `paths`.
pub fn convert_tables(
    files: &[impl AsRef<Utf8Path>],
    paths: &FastaPaths,
) -> Result<FastaCounts, KeggError> {
    let mut sink = FastaSink::create(paths)?;
    for file in files {
        let file = file.as_ref();
        info!(path = %file, "converting gene table");
        let rows: Vec<GeneRow> = read_tsv(file)?;
        for row in &rows {
            sink.write_row(row)?;
        }
    }
    sink.finish()
}

fn write_entry<W: Write>(out: &mut W, header: &str, sequence: &str) -> Result<(), KeggError> {
    writeln!(out, ">{header}\n{sequence}").map_err(|err| KeggError::Filesystem(err.to_string()))
}

fn create_file(path: &Utf8Path) -> Result<BufWriter<File>, KeggError> {
    File::create(path.as_std_path())
        .map(BufWriter::new)
        .map_err(|err| KeggError::Filesystem(format!("create {path}: {err}")))
}
