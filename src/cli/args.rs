//! Command-line argument definitions for the MGD77 codec
//!
//! The interface is defined with the clap derive API. Every subcommand takes
//! a single input file, or a cruise name that is looked up in the MGD77 data
//! directories.

use crate::app::models::Format;
use crate::config::Config;
use crate::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the MGD77 codec
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mgd77_codec",
    version,
    about = "Read, convert and list MGD77 marine geophysical track-line data",
    long_about = "Reads and writes MGD77 track-line files in the fixed-width MGD77 layout, \
                  the tab-delimited MGD77T layout, plain tabular DAT files and the MGD77+ \
                  columnar container. Columns can be selected and filtered, stored bitflags \
                  honoured and correction tables applied on the way out."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding the mgd77_paths.txt search list
    ///
    /// Overrides the MGD77_HOME environment variable.
    #[arg(long = "home", value_name = "DIR", global = true)]
    pub home: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose",
        help = "Suppress output except errors"
    )]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Convert a file to another MGD77 format
    Convert(ConvertArgs),
    /// Show the header items and column table of a file
    Info(InfoArgs),
    /// Print selected columns as tab-separated text
    List(ListArgs),
}

/// Arguments for the convert command
#[derive(Debug, Clone, Parser)]
pub struct ConvertArgs {
    /// Input file or cruise name
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output format: m77, m77t, dat or nc
    #[arg(short = 't', long = "to", value_name = "FORMAT")]
    pub to: Format,

    /// Output file
    ///
    /// Defaults to the input file name with the extension of the target
    /// format, in the current directory.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write the original header copy instead of the revised one
    #[arg(long = "original")]
    pub original: bool,

    /// Store raw values without secondary scaling
    #[arg(long = "no-corrections")]
    pub no_corrections: bool,

    /// Ignore stored bitflags
    #[arg(long = "no-flags")]
    pub no_flags: bool,

    /// Store mag, diur, msd, eot and faa as 4-byte integers
    #[arg(long = "high-resolution")]
    pub high_resolution: bool,

    /// Author recorded in new containers
    #[arg(long = "author", value_name = "NAME")]
    pub author: Option<String>,

    /// Overwrite an existing output file
    #[arg(long = "force")]
    pub force: bool,
}

/// Arguments for the info command
#[derive(Debug, Clone, Parser)]
pub struct InfoArgs {
    /// Input file or cruise name
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Show header items that are blank too
    #[arg(long = "all")]
    pub all: bool,
}

/// Arguments for the list command
#[derive(Debug, Clone, Parser)]
pub struct ListArgs {
    /// Input file or cruise name
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Column selection, constraints and bit tests
    ///
    /// A comma-separated list of column names, optionally followed by
    /// constraints such as depth>1000 and, after a colon, bit tests such as
    /// +faa or -mag. An empty bit list (a trailing colon) ignores the
    /// stored bitflags. Upper-case names require a valid value.
    #[arg(short = 'F', long = "fields", value_name = "SELECTION")]
    pub fields: Option<String>,

    /// Correction table applied to the listed values
    #[arg(long = "corrections", value_name = "FILE")]
    pub corrections: Option<PathBuf>,

    /// Ignore stored bitflags
    #[arg(long = "no-flags")]
    pub no_flags: bool,

    /// Skip secondary scaling and stored recomputes
    #[arg(long = "no-corrections")]
    pub no_corrections: bool,

    /// Omit the column name line
    #[arg(long = "no-header")]
    pub no_header: bool,
}

impl Args {
    /// Tracing level implied by the verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Build the library configuration from the environment and flags
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::from_env();
        if let Some(home) = &self.home {
            config = config.with_home(home);
        }
        match &self.command {
            Some(Commands::Convert(args)) => {
                if args.original {
                    config = config.with_original_header();
                }
                if args.no_corrections {
                    config = config.without_corrections();
                }
                if args.no_flags {
                    config = config.without_flags();
                }
                if args.high_resolution {
                    config = config.with_high_resolution();
                }
                if let Some(author) = &args.author {
                    config = config.with_author(author.as_str());
                }
            }
            Some(Commands::List(args)) => {
                if args.no_corrections {
                    config = config.without_corrections();
                }
                if args.no_flags {
                    config = config.without_flags();
                }
            }
            Some(Commands::Info(_)) | None => {}
        }
        config.validate()?;
        Ok(config)
    }
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Convert(_) => "convert",
            Self::Info(_) => "info",
            Self::List(_) => "list",
        }
    }
}

impl ConvertArgs {
    /// Output path, derived from the input name when not given
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => {
                let stem = self.input.file_stem().unwrap_or(self.input.as_os_str());
                PathBuf::from(stem).with_extension(self.to.extension())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let output = self.output_path();
        if output == self.input {
            return Err(Error::bad_argument(format!(
                "output {} would overwrite the input",
                output.display()
            )));
        }
        if output.exists() && !self.force {
            return Err(Error::bad_argument(format!(
                "output {} exists (use --force to overwrite)",
                output.display()
            )));
        }
        Ok(())
    }
}
