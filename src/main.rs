use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use sastore::jasix::{IndexCreator, QueryProcessor, FILE_EXTENSION};
use sastore::sa::SaReader;

#[derive(Parser, Debug)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a position index for a JSON annotation file
    Index {
        /// Input JSON annotation file
        #[clap(short = 'i', long)]
        input: PathBuf,

        /// Output index path [default: <input>.jsi]
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Queries an indexed JSON annotation file
    Query(QueryArgs),

    /// Prints the stored record at a position of an annotation store
    Lookup {
        /// Annotation store (.nsa), its .nsa.idx must sit next to it
        #[clap(short = 'i', long)]
        input: PathBuf,

        /// Position on the chromosome
        #[clap(short = 'p', long)]
        position: u32,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Input JSON annotation file
    #[clap(short = 'i', long)]
    input: PathBuf,

    /// Index path [default: <input>.jsi]
    #[clap(short = 'x', long)]
    index: Option<PathBuf>,

    /// Query in the form chr:begin-end, chr:position or chr
    #[clap(short = 'q', long)]
    query: Vec<String>,

    /// Prints the JSON header before the positions
    #[clap(long)]
    print_header: bool,

    /// Lists the indexed chromosomes
    #[clap(short = 'l', long, visible_alias = "list", conflicts_with_all = ["query", "header_only"])]
    list_chromosomes: bool,

    /// Prints only the JSON header
    #[clap(long, conflicts_with = "query")]
    header_only: bool,
}

fn create_index(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| {
        let mut path = input.as_os_str().to_owned();
        path.push(FILE_EXTENSION);
        PathBuf::from(path)
    });

    let reader = BufReader::new(File::open(input)?);
    let index = IndexCreator::new(reader).create()?;
    index.write_to_path(&output)?;
    info!(
        "Indexed {} chromosomes into {}",
        index.chromosomes().count(),
        output.display()
    );
    Ok(())
}

fn run_query(args: &QueryArgs) -> Result<()> {
    let mut processor = QueryProcessor::from_paths(&args.input, args.index.as_ref())?;
    let mut out = BufWriter::new(io::stdout().lock());

    if args.list_chromosomes {
        processor.print_chromosome_list(&mut out)?;
    } else if args.header_only {
        processor.print_header(&mut out)?;
    } else if args.query.is_empty() {
        bail!("Expected one of --list-chromosomes, --header-only or --query");
    } else {
        for query in &args.query {
            processor.process_query(query, args.print_header, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn lookup(input: &Path, position: u32) -> Result<()> {
    let mut reader = SaReader::from_path(input)?;
    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "#chromosome\t{}", reader.header().chromosome)?;
    writeln!(out, "#refMinor\t{}", reader.is_ref_minor(position))?;

    match reader.get_annotation(position)? {
        Some(record) => {
            if let Some(allele) = &record.global_major_allele {
                writeln!(out, "#globalMajorAllele\t{allele}")?;
            }
            for data in &record.records {
                for entry in &data.entries {
                    writeln!(out, "{}\t{entry}", data.key)?;
                }
            }
        }
        None => info!("No annotation stored at position {position}"),
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Index { input, output } => create_index(&input, output),
        Command::Query(args) => run_query(&args),
        Command::Lookup { input, position } => lookup(&input, position),
    }
}
