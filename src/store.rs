use std::fs;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::Builder;

use crate::domain::{BriteId, OrgCode};
use crate::error::KeggError;
use crate::table;

pub const ORGANISM_TABLE: &str = "organism_table.txt";
pub const VIRUS_TABLE: &str = "virus_table.txt";
pub const GENE_INFO_DIR: &str = "kegg_gene_info";
pub const VIRUS_GENE_TABLE: &str = "gene_table.txt";
/// Prefix of in-progress table writes. Hidden so a crash never leaves a file
/// that looks like a gene table.
pub const TEMP_PREFIX: &str = ".kegg-harvest";

/// The four FASTA streams produced from gene tables.
#[derive(Debug, Clone)]
pub struct FastaPaths {
    pub aa_ko: Utf8PathBuf,
    pub aa_no_ko: Utf8PathBuf,
    pub nt_ko: Utf8PathBuf,
    pub nt_no_ko: Utf8PathBuf,
}

/// File layout under the output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), KeggError> {
        if !self.root.as_std_path().exists() {
            tracing::info!(path = %self.root, "output directory does not exist, creating it");
        }
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| KeggError::Filesystem(err.to_string()))
    }

    pub fn ensure_gene_dir(&self) -> Result<(), KeggError> {
        fs::create_dir_all(self.gene_dir().as_std_path())
            .map_err(|err| KeggError::Filesystem(err.to_string()))
    }

    pub fn organism_table(&self) -> Utf8PathBuf {
        self.root.join(ORGANISM_TABLE)
    }

    pub fn virus_table(&self) -> Utf8PathBuf {
        self.root.join(VIRUS_TABLE)
    }

    pub fn gene_dir(&self) -> Utf8PathBuf {
        self.root.join(GENE_INFO_DIR)
    }

    pub fn organism_gene_table(&self, org: &OrgCode) -> Utf8PathBuf {
        self.gene_dir().join(format!("{org}_kegg_genes.txt"))
    }

    pub fn virus_gene_table(&self) -> Utf8PathBuf {
        self.gene_dir().join(VIRUS_GENE_TABLE)
    }

    pub fn edge_table(&self, brite: &BriteId) -> Utf8PathBuf {
        self.root
            .join(format!("kegg_ko_edge_df_{}.txt", brite.qualified()))
    }

    pub fn fasta_paths(&self) -> FastaPaths {
        FastaPaths {
            aa_ko: self.root.join("kegg_genes_KO.faa"),
            aa_no_ko: self.root.join("kegg_genes_No_KO.faa"),
            nt_ko: self.root.join("kegg_genes_KO.fna"),
            nt_no_ko: self.root.join("kegg_genes_No_KO.fna"),
        }
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }
}

/// Writes a TSV table through a temp file in the destination directory so a
/// crashed run never leaves a half-written table that later looks complete.
pub fn write_table_atomic<T, I>(path: &Utf8Path, rows: I) -> Result<usize, KeggError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    write_atomic(path, |writer| table::write_tsv(writer, rows))
}

pub fn write_header_atomic(path: &Utf8Path, columns: &[&str]) -> Result<(), KeggError> {
    write_atomic(path, |writer| table::write_header(writer, columns))
}

pub fn write_atomic<T, F>(path: &Utf8Path, write: F) -> Result<T, KeggError>
where
    F: FnOnce(&mut dyn Write) -> Result<T, KeggError>,
{
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| KeggError::Filesystem(err.to_string()))?;
    let temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent.as_std_path())
        .map_err(|err| KeggError::Filesystem(err.to_string()))?;
    let value = {
        let mut writer = BufWriter::new(temp.as_file());
        let value = write(&mut writer as &mut dyn Write)?;
        writer
            .flush()
            .map_err(|err| KeggError::Filesystem(err.to_string()))?;
        value
    };
    temp.persist(path.as_std_path())
        .map_err(|err| KeggError::Filesystem(err.to_string()))?;
    Ok(value)
}

/// Regular, non-hidden files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, KeggError> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| KeggError::Filesystem(format!("read {dir}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| KeggError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|_| KeggError::Filesystem("non-utf8 file path in gene dir".to_string()))?;
        if path.file_name().is_some_and(|name| name.starts_with('.')) {
            tracing::debug!(path = %path, "skipping hidden file");
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}
