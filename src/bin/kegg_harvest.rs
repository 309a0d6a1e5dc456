use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kegg_harvest::app::{App, HierarchyOptions, to_fasta};
use kegg_harvest::config::ConfigLoader;
use kegg_harvest::domain::BriteId;
use kegg_harvest::error::KeggError;
use kegg_harvest::kegg::KeggHttpClient;
use kegg_harvest::output::JsonOutput;
use kegg_harvest::store::OutputLayout;

#[derive(Parser)]
#[command(name = "kegg-harvest")]
#[command(about = "Scrape KEGG hierarchies, organism and virus gene tables into flat files")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    out_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Flatten a brite hierarchy into a parent/child edge table")]
    KoHierarchy {
        #[arg(long, default_value = "ko00001")]
        brite: BriteId,

        #[arg(long)]
        short_labels: bool,

        #[arg(long)]
        max_depth: Option<usize>,
    },
    #[command(about = "Build the organism table and per-organism gene tables")]
    Organisms {
        #[arg(long, num_args = 1.., default_values_t = default_groups())]
        organisms: Vec<String>,
    },
    #[command(about = "Build the virus table and the virus gene table")]
    Viruses,
    #[command(about = "Convert gene tables into KO / no-KO FASTA files")]
    ToFasta {
        #[arg(long)]
        gene_dir: Option<Utf8PathBuf>,
    },
}

fn default_groups() -> Vec<String> {
    ["archaea", "bacteria", "fungi"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kegg) = report.downcast_ref::<KeggError>() {
            return ExitCode::from(map_exit_code(kegg));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KeggError) -> u8 {
    match error {
        KeggError::MissingSourceDir(_) => 2,
        KeggError::ConfigRead(_) | KeggError::ConfigParse(_) | KeggError::InvalidConfig(_) => 2,
        KeggError::InvalidBriteId(_) | KeggError::InvalidOrgCode(_) => 2,
        KeggError::KeggHttp(_)
        | KeggError::KeggStatus { .. }
        | KeggError::RetriesExhausted { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(out_dir) = cli.out_dir {
        config.out_dir = out_dir;
    }

    match cli.command {
        Commands::KoHierarchy {
            brite,
            short_labels,
            max_depth,
        } => {
            let app = App::new(KeggHttpClient::new(&config)?, config);
            let result = app.ko_hierarchy(&HierarchyOptions {
                brite,
                short_labels,
                max_depth,
            })?;
            JsonOutput::print_hierarchy(&result).into_diagnostic()
        }
        Commands::Organisms { organisms } => {
            let app = App::new(KeggHttpClient::new(&config)?, config);
            let result = app.organisms(&organisms)?;
            JsonOutput::print_organisms(&result).into_diagnostic()
        }
        Commands::Viruses => {
            let app = App::new(KeggHttpClient::new(&config)?, config);
            let result = app.viruses()?;
            JsonOutput::print_viruses(&result).into_diagnostic()
        }
        Commands::ToFasta { gene_dir } => {
            let layout = OutputLayout::new(config.out_dir.clone());
            let gene_dir = gene_dir.unwrap_or_else(|| layout.gene_dir());
            let result = to_fasta(&gene_dir, &layout)?;
            JsonOutput::print_fasta(&result).into_diagnostic()
        }
    }
}
