use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use annox_core::{AlignFormat, Span, Strand};

mod commands;
mod config;
mod error;

use commands::{parse_span, parse_strand};
use config::Config;

#[derive(Parser)]
#[command(name = "annox")]
#[command(about = "Annox - genome annotation alignment and masking toolkit")]
#[command(version)]
#[command(long_about = "
Annox decodes the alignment strings found in annotation sources (exonerate
CIGAR and VULGAR, Ensembl and BAM CIGAR, GFF3 Gap) into coordinate blocks,
converts between dialects, applies sequence edits and checks masking styles.

Examples:
  annox decode --format bam-cigar --ref 100-116 --match 1-15 10M2D5M
  annox convert --from exonerate-cigar --to exonerate-vulgar 'M 10 D 2 M 5'
  annox variant --start 10 --at 12-13 --edit 'AC>A' aacgtt
  annox styles --strict
  annox config --example
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project an alignment string onto reference and match coordinates
    Decode {
        /// Alignment string
        align: String,

        /// Dialect of the string (defaults to [align].format)
        #[arg(long)]
        format: Option<AlignFormat>,

        /// Reference span covered by the alignment (START-END)
        #[arg(long = "ref", value_parser = parse_span)]
        ref_span: Span,

        /// Reference strand
        #[arg(long, default_value = "+", value_parser = parse_strand, allow_hyphen_values = true)]
        ref_strand: Strand,

        /// Match sequence span (START-END)
        #[arg(long = "match", value_parser = parse_span)]
        match_span: Span,

        /// Match strand
        #[arg(long, default_value = "+", value_parser = parse_strand, allow_hyphen_values = true)]
        match_strand: Strand,

        /// Missing query bases tolerated by the perfect test (defaults to [align].align_error)
        #[arg(long)]
        align_error: Option<u32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Rewrite an alignment string in another dialect
    Convert {
        /// Alignment string
        align: String,

        /// Dialect of the input
        #[arg(long)]
        from: AlignFormat,

        /// Dialect to write
        #[arg(long)]
        to: AlignFormat,
    },

    /// Apply one old>new edit to a sequence
    Variant {
        /// Sequence to edit
        sequence: String,

        /// Reference position of the sequence's first base
        #[arg(long, default_value = "1")]
        start: i64,

        /// Bases the edit covers (START-END)
        #[arg(long, value_parser = parse_span)]
        at: Span,

        /// Edit in old>new form, e.g. AC>A or >AT
        #[arg(long, allow_hyphen_values = true)]
        edit: String,
    },

    /// List configured styles and their mask lists
    Styles {
        /// Fail when a mask list names an unknown featureset
        #[arg(long)]
        strict: bool,
    },

    /// Show the active configuration
    Config {
        /// Print an example configuration instead
        #[arg(long)]
        example: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8, quiet: bool, default_level: &str) -> Result<()> {
    if quiet {
        std::env::set_var("RUST_LOG", "error");
    } else if verbose > 0 || std::env::var_os("RUST_LOG").is_none() {
        let level = match verbose {
            0 => default_level,
            1 => "debug",
            _ => "trace",
        };
        std::env::set_var("RUST_LOG", level);
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration first, so its log level can apply
    let config = Config::load(cli.config.as_deref())?;

    setup_logging(cli.verbose, cli.quiet, &config.general.log_level)?;

    let result = match cli.command {
        Commands::Decode {
            align,
            format,
            ref_span,
            ref_strand,
            match_span,
            match_strand,
            align_error,
            json,
        } => commands::decode::execute(
            &config,
            align,
            format,
            ref_span,
            ref_strand,
            match_span,
            match_strand,
            align_error,
            json,
        ),

        Commands::Convert { align, from, to } => commands::convert::execute(align, from, to),

        Commands::Variant {
            sequence,
            start,
            at,
            edit,
        } => commands::variant::execute(sequence, start, at, edit),

        Commands::Styles { strict } => commands::styles::execute(&config, strict),

        Commands::Config { example, output } => commands::config::execute(&config, example, output),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", error::format_error_with_suggestions(&err));
        std::process::exit(1);
    }

    Ok(())
}
