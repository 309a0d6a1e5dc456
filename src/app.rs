use std::collections::HashMap;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::batch::{BatchFetcher, GeneDetail, map_parallel};
use crate::config::ResolvedConfig;
use crate::domain::{BriteId, OrgCode};
use crate::error::KeggError;
use crate::fasta::{FastaCounts, convert_tables};
use crate::hierarchy::{
    FlattenOptions, LeafPaths, ShortCodeLabels, brite_qualifier, build_edges, build_edges_with,
    flatten_json, ko_qualifier,
};
use crate::kegg::KeggClient;
use crate::organism::{OrganismListing, organism_row, parse_organism_list, parse_organism_page};
use crate::store::{OutputLayout, list_files, write_header_atomic, write_table_atomic};
use crate::table::{
    GeneListing, GeneRow, OrganismRow, VirusGeneRow, VirusRow, read_header, read_tsv,
};
use crate::virus::{VIRUS_GENE_LISTS, parse_virus_brite};

pub const VIRUS_BRITE: &str = "br08620";

#[derive(Debug, Clone)]
pub struct HierarchyOptions {
    pub brite: BriteId,
    pub short_labels: bool,
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyResult {
    pub brite: String,
    pub identifiers: usize,
    pub paths: usize,
    pub edges: usize,
    pub edge_table: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganismResult {
    pub organisms_listed: usize,
    pub organisms_selected: usize,
    pub gene_tables: Vec<GeneTableResult>,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneTableResult {
    pub org_code: String,
    pub action: String,
    pub genes: usize,
    pub with_ko: usize,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VirusResult {
    pub viruses: usize,
    pub genes_listed: usize,
    pub genes_written: usize,
    pub virus_table: String,
    pub gene_table: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FastaResult {
    pub tables: usize,
    pub counts: FastaCounts,
    pub outputs: Vec<String>,
    pub finished_at: String,
}

#[derive(Clone)]
pub struct App<K: KeggClient> {
    client: K,
    config: ResolvedConfig,
    layout: OutputLayout,
}

impl<K: KeggClient> App<K> {
    pub fn new(client: K, config: ResolvedConfig) -> Self {
        let layout = OutputLayout::new(config.out_dir.clone());
        Self {
            client,
            config,
            layout,
        }
    }

    pub fn client(&self) -> &K {
        &self.client
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Downloads a brite hierarchy and writes its parent/child edge table.
    pub fn ko_hierarchy(&self, options: &HierarchyOptions) -> Result<HierarchyResult, KeggError> {
        self.layout.ensure_root()?;
        info!(brite = %options.brite, "downloading brite hierarchy");
        let document = self.client.get_brite_json(&options.brite)?;

        let flatten_options = FlattenOptions {
            prefix: String::new(),
            max_depth: options.max_depth,
        };
        let paths: LeafPaths = if options.brite.is_orthology() {
            flatten_json(&document, ko_qualifier(), &flatten_options)?
        } else {
            flatten_json(&document, brite_qualifier(), &flatten_options)?
        };
        let edges = if options.short_labels {
            build_edges_with(&paths, &ShortCodeLabels)
        } else {
            build_edges(&paths)
        };

        let path = self.layout.edge_table(&options.brite);
        if edges.is_empty() {
            warn!(brite = %options.brite, "hierarchy produced no edges");
            write_header_atomic(&path, &["parent", "child"])?;
        } else {
            write_table_atomic(&path, &edges)?;
        }
        info!(identifiers = paths.len(), edges = edges.len(), path = %path, "edge table written");

        Ok(HierarchyResult {
            brite: options.brite.qualified(),
            identifiers: paths.len(),
            paths: paths.values().map(|set| set.len()).sum(),
            edges: edges.len(),
            edge_table: path.to_string(),
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Builds (or reuses) the organism table, then writes an enriched gene
    /// table for every organism whose lineage matches `groups`.
    pub fn organisms(&self, groups: &[String]) -> Result<OrganismResult, KeggError> {
        self.layout.ensure_root()?;
        let organisms = self.organism_table()?;
        let organisms_listed = organisms.len();

        let selected = organisms
            .into_iter()
            .filter(|row| row.taxaid.is_some() && row.in_groups(groups))
            .collect::<Vec<_>>();
        info!(
            listed = organisms_listed,
            selected = selected.len(),
            groups = ?groups,
            "organisms selected"
        );

        self.layout.ensure_gene_dir()?;
        let mut gene_tables = Vec::with_capacity(selected.len());
        for row in &selected {
            let org = match row.org_code.parse::<OrgCode>() {
                Ok(org) => org,
                Err(err) => {
                    warn!(error = %err, "skipping organism");
                    continue;
                }
            };
            gene_tables.push(self.organism_genes(&org)?);
        }

        Ok(OrganismResult {
            organisms_listed,
            organisms_selected: selected.len(),
            gene_tables,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn organism_table(&self) -> Result<Vec<OrganismRow>, KeggError> {
        let path = self.layout.organism_table();
        if self.layout.exists(&path) {
            info!(path = %path, "reusing organism table");
            return read_tsv(&path);
        }

        let listings = parse_organism_list(&self.client.list("organism")?);
        info!(organisms = listings.len(), "organism table downloaded");
        let rows = map_parallel(self.config.batch.workers, &listings, |listing| {
            self.scrape_organism(listing)
        })?;
        write_table_atomic(&path, &rows)?;
        Ok(rows)
    }

    fn scrape_organism(&self, listing: &OrganismListing) -> OrganismRow {
        let page = match listing.org_code.parse::<OrgCode>() {
            Ok(org) => match self.client.show_organism(&org) {
                Ok(html) => Some(parse_organism_page(&html)),
                Err(err) => {
                    warn!(org = %org, error = %err, "failed to fetch organism page");
                    None
                }
            },
            Err(err) => {
                warn!(error = %err, "skipping organism page");
                None
            }
        };
        if page.as_ref().and_then(|p| p.taxaid.as_ref()).is_none() {
            warn!(org = %listing.org_code, "no taxonomy id found");
        }
        organism_row(listing, page.as_ref())
    }

    fn organism_genes(&self, org: &OrgCode) -> Result<GeneTableResult, KeggError> {
        let path = self.layout.organism_gene_table(org);
        let listing = if self.layout.exists(&path) {
            let header = read_header(&path)?.unwrap_or_default();
            if header.iter().any(|column| column == "koid") {
                info!(org = %org, "gene table already enriched, skipping");
                return Ok(GeneTableResult {
                    org_code: org.to_string(),
                    action: "skipped".to_string(),
                    genes: 0,
                    with_ko: 0,
                    path: Some(path.to_string()),
                });
            }
            read_tsv::<GeneListing>(&path)?
        } else {
            match self.client.list(org.as_str()) {
                Ok(text) => {
                    let listing = GeneListing::parse_list(&text);
                    info!(org = %org, genes = listing.len(), "gene list downloaded");
                    write_table_atomic(&path, &listing)?;
                    listing
                }
                Err(err) if err.is_status() => {
                    warn!(org = %org, error = %err, "failed to download gene list");
                    return Ok(GeneTableResult {
                        org_code: org.to_string(),
                        action: "failed".to_string(),
                        genes: 0,
                        with_ko: 0,
                        path: None,
                    });
                }
                Err(err) => return Err(err),
            }
        };

        let details = self.fetch_details(&listing)?;
        let rows = listing
            .iter()
            .map(|entry| GeneRow::from_parts(entry, details.get(&entry.kegg_gene_id)))
            .collect::<Vec<_>>();
        let with_ko = rows.iter().filter(|row| row.koid.is_some()).count();
        write_table_atomic(&path, &rows)?;
        info!(org = %org, genes = rows.len(), with_ko, "gene table written");

        Ok(GeneTableResult {
            org_code: org.to_string(),
            action: "written".to_string(),
            genes: rows.len(),
            with_ko,
            path: Some(path.to_string()),
        })
    }

    /// Downloads the virus classification and the virus gene table.
    pub fn viruses(&self) -> Result<VirusResult, KeggError> {
        self.layout.ensure_root()?;
        let virus_path = self.layout.virus_table();
        let viruses: Vec<VirusRow> = if self.layout.exists(&virus_path) {
            info!(path = %virus_path, "reusing virus table");
            read_tsv(&virus_path)?
        } else {
            let brite: BriteId = VIRUS_BRITE.parse()?;
            let rows = parse_virus_brite(&self.client.get_brite_text(&brite)?);
            info!(viruses = rows.len(), "virus table downloaded");
            write_table_atomic(&virus_path, &rows)?;
            rows
        };

        let mut listing = Vec::new();
        for target in VIRUS_GENE_LISTS {
            match self.client.list(target) {
                Ok(text) => listing.extend(GeneListing::parse_list(&text)),
                Err(err) if err.is_status() => {
                    warn!(list = target, error = %err, "failed to access virus gene list");
                }
                Err(err) => return Err(err),
            }
        }

        let details = self.fetch_details(&listing)?;
        let rows = listing
            .iter()
            .filter_map(|entry| {
                details.get(&entry.kegg_gene_id).map(|detail| VirusGeneRow {
                    kegg_gene_id: entry.kegg_gene_id.clone(),
                    taxaid: detail.record.taxaid.clone(),
                    koid: detail.record.koid.clone(),
                    aaseq: detail.record.aaseq.clone(),
                    ntseq: detail.record.ntseq.clone(),
                    desc: entry.desc.clone(),
                })
            })
            .collect::<Vec<_>>();

        self.layout.ensure_gene_dir()?;
        let gene_path = self.layout.virus_gene_table();
        if rows.is_empty() {
            write_header_atomic(
                &gene_path,
                &["kegg_gene_id", "taxaid", "koid", "aaseq", "ntseq", "desc"],
            )?;
        } else {
            write_table_atomic(&gene_path, &rows)?;
        }
        info!(genes = rows.len(), path = %gene_path, "virus gene table written");

        Ok(VirusResult {
            viruses: viruses.len(),
            genes_listed: listing.len(),
            genes_written: rows.len(),
            virus_table: virus_path.to_string(),
            gene_table: gene_path.to_string(),
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn fetch_details(
        &self,
        listing: &[GeneListing],
    ) -> Result<HashMap<String, GeneDetail>, KeggError> {
        let ids = listing
            .iter()
            .map(|entry| entry.kegg_gene_id.clone())
            .collect::<Vec<_>>();
        let fetcher = BatchFetcher::new(
            &self.client,
            self.config.batch.clone(),
            self.config.retry.clone(),
        );
        Ok(fetcher
            .fetch_details(&ids)?
            .into_iter()
            .map(|detail| (detail.kegg_gene_id.clone(), detail))
            .collect())
    }
}

/// Converts every gene table in `gene_dir` into the FASTA files of `layout`.
pub fn to_fasta(gene_dir: &Utf8Path, layout: &OutputLayout) -> Result<FastaResult, KeggError> {
    if !gene_dir.as_std_path().is_dir() {
        return Err(KeggError::MissingSourceDir(gene_dir.as_std_path().to_path_buf()));
    }
    layout.ensure_root()?;
    let files = list_files(gene_dir)?;
    let paths = layout.fasta_paths();
    let counts = convert_tables(&files, &paths)?;
    info!(tables = files.len(), ?counts, "FASTA conversion finished");

    Ok(FastaResult {
        tables: files.len(),
        counts,
        outputs: [&paths.aa_ko, &paths.aa_no_ko, &paths.nt_ko, &paths.nt_no_ko]
            .iter()
            .map(|path| path.to_string())
            .collect(),
        finished_at: chrono::Utc::now().to_rfc3339(),
    })
}
