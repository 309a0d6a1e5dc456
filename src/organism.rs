use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::warn;

use crate::domain::SeqDb;
use crate::table::OrganismRow;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

const TAXONOMY_HREF: &str = "Taxonomy";
const GENBANK_HREF: &str = "www.ncbi.nlm.nih.gov/nuccore";
const REFSEQ_HREF: &str = "www.genome.jp/dbget-bin/www_bget?refseq";

/// One line of `list/organism`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganismListing {
    pub t_number: String,
    pub org_code: String,
    pub name: String,
    pub lineage: String,
}

pub fn parse_organism_list(text: &str) -> Vec<OrganismListing> {
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let fields = line.split('\t').collect::<Vec<_>>();
        if fields[0].trim().is_empty() {
            continue;
        }
        let [t_number, org_code, name, lineage, ..] = fields.as_slice() else {
            warn!(line = index + 1, content = line, "skipping malformed organism line");
            continue;
        };
        rows.push(OrganismListing {
            t_number: t_number.trim().to_string(),
            org_code: org_code.trim().to_string(),
            name: name.trim().to_string(),
            lineage: lineage.trim().to_string(),
        });
    }
    rows
}

/// Links scraped from a `show_organism` page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganismPage {
    pub taxaid: Option<String>,
    pub genbank: Vec<String>,
    pub refseq: Vec<String>,
}

impl OrganismPage {
    pub fn sequence_ids(&self, db: SeqDb) -> &[String] {
        match db {
            SeqDb::GenBank => &self.genbank,
            SeqDb::RefSeq => &self.refseq,
        }
    }
}

pub fn parse_organism_page(html: &str) -> OrganismPage {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").unwrap();

    let mut page = OrganismPage::default();
    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let text = element.text().collect::<String>().trim().to_string();
        if text.is_empty() {
            continue;
        }
        if page.taxaid.is_none() && href.contains(TAXONOMY_HREF) {
            page.taxaid = DIGITS.find(&text).map(|m| m.as_str().to_string());
        } else if href.contains(GENBANK_HREF) {
            page.genbank.push(text);
        } else if href.contains(REFSEQ_HREF) {
            page.refseq.push(text);
        }
    }
    page
}

pub fn organism_row(listing: &OrganismListing, page: Option<&OrganismPage>) -> OrganismRow {
    OrganismRow {
        t_number: listing.t_number.clone(),
        org_code: listing.org_code.clone(),
        name: listing.name.clone(),
        lineage: listing.lineage.clone(),
        taxaid: page.and_then(|p| p.taxaid.clone()),
        gb_ncbi_seq_id: page
            .map(|p| p.sequence_ids(SeqDb::GenBank).to_vec())
            .unwrap_or_default(),
        rs_ncbi_seq_ids: page
            .map(|p| p.sequence_ids(SeqDb::RefSeq).to_vec())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body><table>
<tr><td>Taxonomy</td><td>TAX: <a href="https://www.ncbi.nlm.nih.gov/Taxonomy/Browser/wwwtax.cgi?mode=Info&id=511145">511145</a></td></tr>
<tr><td>Sequence</td><td>
  <a href="https://www.ncbi.nlm.nih.gov/nuccore/U00096">U00096</a>
  <a href="/dbget-bin/www_bget?refseq:NC_000913">NC_000913</a>
  <a href="https://www.genome.jp/dbget-bin/www_bget?refseq:NC_000913">NC_000913</a>
</td></tr>
</table></body></html>
"#;

    #[test]
    fn scrapes_taxonomy_and_sequence_links() {
        let page = parse_organism_page(PAGE);
        assert_eq!(page.taxaid.as_deref(), Some("511145"));
        assert_eq!(page.sequence_ids(SeqDb::GenBank), ["U00096".to_string()]);
        assert_eq!(page.sequence_ids(SeqDb::RefSeq), ["NC_000913".to_string()]);
    }

    #[test]
    fn page_without_taxonomy_link() {
        let page = parse_organism_page("<html><body><p>No such organism</p></body></html>");
        assert_eq!(page, OrganismPage::default());
    }

    #[test]
    fn organism_list_lines() {
        let text = "T00007\teco\tEscherichia coli K-12 MG1655\tProkaryotes;Bacteria;Gammaproteobacteria\n\
                    T00001\thsa\n\
                    \n\
                    T01001\tsce\tSaccharomyces cerevisiae\tEukaryotes;Fungi;Ascomycetes\n";
        let rows = parse_organism_list(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].org_code, "eco");
        assert_eq!(rows[1].lineage, "Eukaryotes;Fungi;Ascomycetes");
    }
}
