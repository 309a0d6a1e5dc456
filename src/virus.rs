//! The virus brite (`br:br08620`) in its plain-text form.

use std::sync::LazyLock;

use regex::Regex;

use crate::table::VirusRow;

static LEVEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w\s*").unwrap());
static TAX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"TAX:(\d+)").unwrap());
static REFSEQ: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"RS:([a-zA-Z0-9_ ]*)").unwrap());
static GENBANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"GN:([a-zA-Z0-9_ ]*)").unwrap());

/// Virus gene listings fetched alongside the brite.
pub const VIRUS_GENE_LISTS: [&str; 2] = ["vg", "vp"];

pub fn parse_virus_brite(text: &str) -> Vec<VirusRow> {
    text.lines()
        .filter(|line| line.contains("TAX"))
        .map(parse_virus_line)
        .collect()
}

fn parse_virus_line(line: &str) -> VirusRow {
    let stripped = LEVEL.replace(line, "");
    let entry = stripped.rsplit("  ").next().unwrap_or("");
    let name = entry.split(" [").next().unwrap_or("").trim().to_string();

    VirusRow {
        name,
        taxaid: TAX.captures(entry).map(|caps| caps[1].to_string()),
        rs_ncbi_seq_ids: id_list(&REFSEQ, entry),
        gb_ncbi_seq_id: id_list(&GENBANK, entry),
    }
}

fn id_list(pattern: &Regex, entry: &str) -> Vec<String> {
    pattern
        .captures(entry)
        .map(|caps| {
            caps[1]
                .split(' ')
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_virus_lines() {
        let text = "\
+D\tVirus
#<h2>Virus classification</h2>
A<b>Riboviria</b>
D      Tobacco mosaic virus [TAX:12242] [RS:NC_001367] [GN:V01408 J02415]
D      Unplaced virus [TAX:10239]
";
        let rows = parse_virus_brite(text);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].name, "Tobacco mosaic virus");
        assert_eq!(rows[0].taxaid.as_deref(), Some("12242"));
        assert_eq!(rows[0].rs_ncbi_seq_ids, vec!["NC_001367".to_string()]);
        assert_eq!(
            rows[0].gb_ncbi_seq_id,
            vec!["V01408".to_string(), "J02415".to_string()]
        );

        assert_eq!(rows[1].name, "Unplaced virus");
        assert!(rows[1].rs_ncbi_seq_ids.is_empty());
    }
}
