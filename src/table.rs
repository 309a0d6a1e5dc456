//! Tab separated tables with a header row and no index column.

use std::fs::File;
use std::io::{Read, Write};

use camino::Utf8Path;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::batch::GeneDetail;
use crate::error::KeggError;

const ID_LIST_SEPARATOR: &str = ";";

/// One line of `list/<org>`, `list/vg` or `list/vp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneListing {
    pub kegg_gene_id: String,
    #[serde(default)]
    pub desc: String,
}

impl GeneListing {
    pub fn parse_list(text: &str) -> Vec<GeneListing> {
        text.lines()
            .filter_map(|line| {
                let mut fields = line.split('\t');
                let id = fields.next()?.trim();
                if id.is_empty() {
                    return None;
                }
                // newer listings carry type and position columns before the description
                Some(GeneListing {
                    kegg_gene_id: id.to_string(),
                    desc: fields.last().unwrap_or("").trim_end().to_string(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRow {
    pub kegg_gene_id: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub koid: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub aaseq: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub ntseq: Option<String>,
}

impl GeneRow {
    pub fn from_parts(listing: &GeneListing, detail: Option<&GeneDetail>) -> Self {
        let record = detail.map(|d| d.record.clone()).unwrap_or_default();
        Self {
            kegg_gene_id: listing.kegg_gene_id.clone(),
            desc: listing.desc.clone(),
            koid: record.koid,
            aaseq: record.aaseq,
            ntseq: record.ntseq,
        }
    }
}

/// Gene table row of the virus job, which also carries the taxonomy id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirusGeneRow {
    pub kegg_gene_id: String,
    pub taxaid: Option<String>,
    pub koid: Option<String>,
    pub aaseq: Option<String>,
    pub ntseq: Option<String>,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganismRow {
    #[serde(rename = "T_number")]
    pub t_number: String,
    pub org_code: String,
    pub name: String,
    pub lineage: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub taxaid: Option<String>,
    #[serde(
        default,
        serialize_with = "join_ids",
        deserialize_with = "split_ids"
    )]
    pub gb_ncbi_seq_id: Vec<String>,
    #[serde(
        default,
        serialize_with = "join_ids",
        deserialize_with = "split_ids"
    )]
    pub rs_ncbi_seq_ids: Vec<String>,
}

impl OrganismRow {
    /// Case-insensitive match of any `;`-separated lineage level against `groups`.
    pub fn in_groups(&self, groups: &[String]) -> bool {
        self.lineage
            .split(';')
            .map(|level| level.trim().to_lowercase())
            .any(|level| groups.iter().any(|group| group.to_lowercase() == level))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirusRow {
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub taxaid: Option<String>,
    #[serde(
        default,
        serialize_with = "join_ids",
        deserialize_with = "split_ids"
    )]
    pub rs_ncbi_seq_ids: Vec<String>,
    #[serde(
        default,
        serialize_with = "join_ids",
        deserialize_with = "split_ids"
    )]
    pub gb_ncbi_seq_id: Vec<String>,
}

pub fn write_tsv<W, T, I>(writer: W, rows: I) -> Result<usize, KeggError>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    let mut count = 0usize;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer
        .flush()
        .map_err(|err| KeggError::Table(err.to_string()))?;
    Ok(count)
}

/// Writes only a header row, for tables with no rows.
pub fn write_header<W: Write>(writer: W, columns: &[&str]) -> Result<(), KeggError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    writer.write_record(columns)?;
    writer
        .flush()
        .map_err(|err| KeggError::Table(err.to_string()))
}

pub fn read_tsv_from<R: Read, T: DeserializeOwned>(reader: R) -> Result<Vec<T>, KeggError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(reader);
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(KeggError::from)
}

pub fn read_tsv<T: DeserializeOwned>(path: &Utf8Path) -> Result<Vec<T>, KeggError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| KeggError::Filesystem(format!("open {path}: {err}")))?;
    read_tsv_from(file).map_err(|err| KeggError::Table(format!("{path}: {err}")))
}

/// Column names of an existing table, or `None` for an empty file.
pub fn read_header(path: &Utf8Path) -> Result<Option<Vec<String>>, KeggError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| KeggError::Filesystem(format!("open {path}: {err}")))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(file);
    let headers = reader.headers()?;
    if headers.is_empty() {
        warn!(%path, "table has no header");
        return Ok(None);
    }
    Ok(Some(headers.iter().map(str::to_string).collect()))
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

fn join_ids<S>(ids: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ids.join(ID_LIST_SEPARATOR))
}

fn split_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(value
        .split(ID_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gene_table_keeps_missing_values_empty() {
        let rows = vec![
            GeneRow {
                kegg_gene_id: "eco:b0001".to_string(),
                desc: "thrL; thr operon leader peptide".to_string(),
                koid: Some("ko:K08278".to_string()),
                aaseq: Some("MKRIST".to_string()),
                ntseq: None,
            },
            GeneRow {
                kegg_gene_id: "eco:b0002".to_string(),
                ..GeneRow::default()
            },
        ];
        let mut buffer = Vec::new();
        assert_eq!(write_tsv(&mut buffer, &rows).unwrap(), 2);
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("kegg_gene_id\tdesc\tkoid\taaseq\tntseq\n"));
        assert!(text.contains("eco:b0002\t\t\t\t\n"));

        let parsed: Vec<GeneRow> = read_tsv_from(buffer.as_slice()).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn gene_rows_ignore_extra_columns() {
        let text = "kegg_gene_id\ttaxaid\tkoid\taaseq\tntseq\tdesc\nvg:1\t10239\t\tMK\tatg\tcapsid\n";
        let rows: Vec<GeneRow> = read_tsv_from(text.as_bytes()).unwrap();
        assert_eq!(rows[0].desc, "capsid");
        assert_eq!(rows[0].koid, None);
        assert_eq!(rows[0].ntseq.as_deref(), Some("atg"));
    }

    #[test]
    fn organism_id_lists_are_joined() {
        let row = OrganismRow {
            t_number: "T00007".to_string(),
            org_code: "eco".to_string(),
            name: "Escherichia coli K-12 MG1655".to_string(),
            lineage: "Prokaryotes;Bacteria;Gammaproteobacteria".to_string(),
            taxaid: Some("511145".to_string()),
            gb_ncbi_seq_id: vec!["U00096".to_string()],
            rs_ncbi_seq_ids: vec!["NC_000913".to_string(), "NC_000914".to_string()],
        };
        let mut buffer = Vec::new();
        write_tsv(&mut buffer, [&row]).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.contains("NC_000913;NC_000914"));
        let parsed: Vec<OrganismRow> = read_tsv_from(buffer.as_slice()).unwrap();
        assert_eq!(parsed, vec![row.clone()]);

        assert!(row.in_groups(&["bacteria".to_string()]));
        assert!(!row.in_groups(&["archaea".to_string(), "fungi".to_string()]));
    }

    #[test]
    fn listing_skips_blank_lines() {
        let text = "eco:b0001\tCDS\t190..255\tthrL; leader\n\neco:b0002\tthrA\n";
        let rows = GeneListing::parse_list(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].desc, "thrL; leader");
        assert_eq!(rows[1].desc, "thrA");
        assert_eq!(rows[1].kegg_gene_id, "eco:b0002");
    }
}
