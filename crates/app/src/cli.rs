use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Extract the census and claims tables from DHA annual reports and price
/// the census.
#[derive(Debug, Parser)]
#[command(name = "gmpricing", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: platform config dir, gmpricing.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract the four sections from a report or a directory of reports
    Extract(ExtractArgs),
    /// Extract a report and price it against a price table
    Price(PriceArgs),
    /// Run extraction, validation and pricing and save a summary
    Analyze(AnalyzeArgs),
    /// Show available external tools, engine order and supported inputs
    Info,
    /// Write a synthetic report to try the pipeline on
    Sample(SampleArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// PDF, image, SpreadsheetML or text file, or a directory of them
    pub path: PathBuf,

    /// Output directory for csv and json (default from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (default from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Skip the OCR fallback
    #[arg(long)]
    pub no_ocr: bool,

    /// Engine order override, comma separated
    #[arg(long, value_delimiter = ',')]
    pub engines: Option<Vec<String>>,
}

#[derive(Debug, Args)]
pub struct PriceArgs {
    /// Report to price
    pub path: PathBuf,

    /// Price table (TOML)
    #[arg(short, long)]
    pub prices: PathBuf,

    /// Write the pricing result as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Price every extracted section, not only the census
    #[arg(long)]
    pub all_sections: bool,

    #[arg(long)]
    pub no_ocr: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Report or directory of reports
    pub path: PathBuf,

    /// Price table (TOML); pricing is left out without one
    #[arg(short, long)]
    pub prices: Option<PathBuf>,

    /// Analysis JSON file (default: analysis.json in the output directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub no_ocr: bool,
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Directory to write the sample report into
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_arguments() {
        let cli = Cli::try_parse_from([
            "gmpricing", "-vv", "extract", "reports", "--format", "csv", "--engines", "xml,text-layer", "--no-ocr",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_file.is_none());
        let Commands::Extract(args) = cli.command else { panic!("not extract") };
        assert_eq!(args.format, Some(OutputFormat::Csv));
        assert_eq!(args.engines.unwrap(), ["xml", "text-layer"]);
        assert!(args.no_ocr);
        assert!(args.output.is_none());
    }

    #[test]
    fn price_needs_a_table() {
        assert!(Cli::try_parse_from(["gmpricing", "price", "report.pdf"]).is_err());
        let cli = Cli::try_parse_from(["gmpricing", "price", "report.pdf", "-p", "prices.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Price(PriceArgs { all_sections: false, .. })));
    }

    #[test]
    fn analyze_prices_optionally() {
        let cli = Cli::try_parse_from(["gmpricing", "analyze", "reports"]).unwrap();
        let Commands::Analyze(args) = cli.command else { panic!("not analyze") };
        assert!(args.prices.is_none() && args.output.is_none());

        let cli = Cli::try_parse_from([
            "gmpricing", "analyze", "reports", "-p", "p.toml", "-o", "a.json", "--log-file", "run.log",
        ])
        .unwrap();
        assert_eq!(cli.log_file.as_deref(), Some(std::path::Path::new("run.log")));
        let Commands::Analyze(args) = cli.command else { panic!("not analyze") };
        assert_eq!(args.prices.as_deref(), Some(std::path::Path::new("p.toml")));
    }
}
