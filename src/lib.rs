pub mod app;
pub mod batch;
pub mod config;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod flat_record;
pub mod hierarchy;
pub mod kegg;
pub mod organism;
pub mod output;
pub mod store;
pub mod table;
pub mod virus;
