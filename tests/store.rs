use camino::Utf8PathBuf;

use kegg_harvest::domain::OrgCode;
use kegg_harvest::store::{OutputLayout, list_files, write_header_atomic};
use kegg_harvest::table::read_header;

#[test]
fn layout_paths() {
    let layout = OutputLayout::new("kegg_data");
    let org: OrgCode = "hsa".parse().unwrap();

    assert!(layout.organism_table().ends_with("kegg_data/organism_table.txt"));
    assert!(layout.virus_table().ends_with("kegg_data/virus_table.txt"));
    assert!(
        layout
            .organism_gene_table(&org)
            .ends_with("kegg_gene_info/hsa_kegg_genes.txt")
    );
    assert!(layout.virus_gene_table().ends_with("kegg_gene_info/gene_table.txt"));

    let fasta = layout.fasta_paths();
    assert!(fasta.aa_ko.ends_with("kegg_genes_KO.faa"));
    assert!(fasta.aa_no_ko.ends_with("kegg_genes_No_KO.faa"));
    assert!(fasta.nt_ko.ends_with("kegg_genes_KO.fna"));
}

#[test]
fn ensure_root_creates_missing_directory() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("nested/out")).unwrap();
    let layout = OutputLayout::new(root.clone());
    layout.ensure_root().unwrap();
    layout.ensure_gene_dir().unwrap();
    assert!(root.as_std_path().is_dir());
    assert!(layout.gene_dir().as_std_path().is_dir());
}

#[test]
fn header_only_table_is_readable() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("edges.txt")).unwrap();
    write_header_atomic(&path, &["parent", "child"]).unwrap();

    let header = read_header(&path).unwrap();
    assert_eq!(
        header,
        Some(vec!["parent".to_string(), "child".to_string()])
    );
}

#[test]
fn list_files_skips_directories_hidden_files_and_sorts() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    std::fs::write(dir.join("vg_kegg_genes.txt").as_std_path(), "").unwrap();
    std::fs::write(dir.join("eco_kegg_genes.txt").as_std_path(), "").unwrap();
    std::fs::write(dir.join(".kegg-harvestAb12Cd").as_std_path(), "partial").unwrap();
    std::fs::create_dir(dir.join("nested").as_std_path()).unwrap();

    let files = list_files(&dir).unwrap();
    let names = files
        .iter()
        .map(|path| path.file_name().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["eco_kegg_genes.txt", "vg_kegg_genes.txt"]);
}
