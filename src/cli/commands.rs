//! Command implementations for the MGD77 codec CLI
//!
//! Each subcommand drives a [`Session`] and reports a short colored summary
//! on stderr. Listed data goes to stdout.

use crate::app::models::{ColumnData, Dataset, Header};
use crate::app::services::codec::format_general;
use crate::app::services::session::{read_dataset, write_dataset};
use crate::cli::args::{Args, Commands, ConvertArgs, InfoArgs, ListArgs};
use crate::config::Config;
use crate::{Error, Result, Session};
use chrono::DateTime;
use colored::*;
use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What a command did, for the final summary
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub records: usize,
    pub columns: usize,
    /// Values that could not be stored
    pub errors: usize,
    pub elapsed: Duration,
}

/// Run the selected subcommand
pub fn run(args: Args) -> Result<RunSummary> {
    let start = Instant::now();
    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    let config = args.config()?;
    let mut summary = match &args.command {
        Some(Commands::Convert(convert)) => run_convert(convert, &config)?,
        Some(Commands::Info(info)) => run_info(info, &config)?,
        Some(Commands::List(list)) => run_list(list, &config)?,
        None => return Err(Error::bad_argument("no command given")),
    };
    summary.elapsed = start.elapsed();
    info!("Finished in {:.2?}", summary.elapsed);
    Ok(summary)
}

/// Install the tracing subscriber, writing to stderr
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mgd77_codec={}", log_level)));

    let layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(io::stderr);
    let installed = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_timer(fmt::time::uptime()))
            .try_init()
    };
    installed.map_err(|e| Error::configuration(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn run_convert(args: &ConvertArgs, config: &Config) -> Result<RunSummary> {
    args.validate()?;
    let output = args.output_path();
    info!("Converting {} to {}", args.input.display(), output.display());

    let mut session = Session::new(config);
    let dataset = read_dataset(&args.input, &mut session)?;
    let from = session.format;
    write_dataset(&output, &dataset, &mut session)?;

    eprintln!(
        "{} {} ({}) {} {} ({})",
        "Converted".bright_green().bold(),
        args.input.display(),
        from,
        "->".dimmed(),
        output.display(),
        session.format
    );
    eprintln!(
        "   {} records, {} columns",
        dataset.n_records().to_string().bright_white().bold(),
        dataset.order.len().to_string().bright_white().bold()
    );
    if session.errors > 0 {
        eprintln!(
            "   {} values did not fit their storage type",
            session.errors.to_string().bright_red().bold()
        );
    }

    Ok(RunSummary {
        records: dataset.n_records(),
        columns: dataset.order.len(),
        errors: session.errors,
        ..Default::default()
    })
}

fn run_info(args: &InfoArgs, config: &Config) -> Result<RunSummary> {
    let mut session = Session::new(config);
    let header = session.open_read(&args.input)?;
    session.close()?;

    let out = io::stdout();
    let mut out = out.lock();
    print_header(&mut out, &header, args.all)
        .map_err(|e| Error::io("Failed to write header listing", e))?;

    let columns = header.present_columns().len();
    eprintln!(
        "{} {} ({}): {} records, {} columns",
        "Cruise".bright_green().bold(),
        header.survey_id().trim(),
        session.format,
        header.n_records.to_string().bright_white().bold(),
        columns.to_string().bright_white().bold()
    );
    Ok(RunSummary {
        records: header.n_records,
        columns,
        ..Default::default()
    })
}

/// Print header items and the column table
fn print_header(out: &mut dyn Write, header: &Header, all: bool) -> io::Result<()> {
    writeln!(out, "{}", "Header".bold())?;
    for (item, value) in header.params[Header::ORIGINAL].iter() {
        let value = value.trim();
        if all || !value.is_empty() {
            writeln!(out, "  {:<40} {}", item.name, value)?;
        }
    }
    if !header.history.is_empty() {
        writeln!(out, "  {:<40} {}", "history", header.history.trim())?;
    }

    writeln!(out, "{}", "Columns".bold())?;
    writeln!(
        out,
        "  {:<8} {:<32} {:<12} {:<8} {:>12} {:>12}",
        "abbrev", "name", "units", "type", "factor", "offset"
    )?;
    for col in header.present_columns() {
        let column = header.descriptor(col);
        let kind = if column.is_text() {
            "text".to_string()
        } else {
            format!("{:?}", column.storage).to_lowercase()
        };
        writeln!(
            out,
            "  {:<8} {:<32} {:<12} {:<8} {:>12} {:>12}{}",
            column.abbrev,
            column.name,
            column.units,
            kind,
            format_general(column.factor, 6),
            format_general(column.offset, 6),
            if column.constant { " (constant)" } else { "" }
        )?;
    }
    Ok(())
}

fn run_list(args: &ListArgs, config: &Config) -> Result<RunSummary> {
    let mut session = Session::new(config);
    if let Some(fields) = &args.fields {
        session.select(fields)?;
    }
    if let Some(table) = &args.corrections {
        session.load_corrections(table)?;
    }
    let dataset = read_dataset(&args.input, &mut session)?;

    let out = io::stdout();
    let mut out = BufWriter::new(out.lock());
    write_listing(&mut out, &dataset, !args.no_header)
        .and_then(|_| out.flush())
        .map_err(|e| Error::io("Failed to write listing", e))?;

    eprintln!(
        "{} {} records of {} columns from {}",
        "Listed".bright_green().bold(),
        dataset.n_records().to_string().bright_white().bold(),
        dataset.order.len().to_string().bright_white().bold(),
        args.input.display()
    );
    Ok(RunSummary {
        records: dataset.n_records(),
        columns: dataset.order.len(),
        ..Default::default()
    })
}

fn format_time(t: f64) -> String {
    if !t.is_finite() {
        return "NaN".to_string();
    }
    match DateTime::from_timestamp_millis((t * 1000.0).round() as i64) {
        Some(time) => time.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        None => "NaN".to_string(),
    }
}

/// Write a dataset as tab-separated text
pub fn write_listing(out: &mut dyn Write, dataset: &Dataset, header: bool) -> io::Result<()> {
    let names: Vec<&str> = (0..dataset.order.len())
        .map(|col| dataset.descriptor(col).abbrev.as_str())
        .collect();
    if header {
        writeln!(out, "#{}", names.join("\t"))?;
    }

    let mut fields = Vec::with_capacity(names.len());
    for rec in 0..dataset.n_records() {
        fields.clear();
        for (col, values) in dataset.values.iter().enumerate() {
            fields.push(match values {
                ColumnData::Text(words) => words[rec].clone(),
                ColumnData::Numeric(v) if names[col] == "time" => format_time(v[rec]),
                ColumnData::Numeric(v) if v[rec].is_nan() => "NaN".to_string(),
                ColumnData::Numeric(v) => format_general(v[rec], 10),
            });
        }
        writeln!(out, "{}", fields.join("\t"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::container::tests::sample_dataset;

    #[test]
    fn test_listing_layout() {
        let mut dataset = sample_dataset();
        let depth = dataset.column_index("depth").unwrap();
        dataset.values[depth].as_numeric_mut().unwrap()[2] = f64::NAN;

        let mut out = Vec::new();
        write_listing(&mut out, &dataset, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with('#'));
        let names: Vec<&str> = lines[0][1..].split('\t').collect();
        let row: Vec<&str> = lines[3].split('\t').collect();
        assert_eq!(names.len(), row.len());
        let at = names.iter().position(|n| *n == "depth").unwrap();
        assert_eq!(row[at], "NaN");
        let at = names.iter().position(|n| *n == "id").unwrap();
        assert_eq!(row[at], "01010083");
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_time(0.0), "1970-01-01T00:00:00.000");
        assert_eq!(format_time(90.5), "1970-01-01T00:01:30.500");
        assert_eq!(format_time(f64::NAN), "NaN");
    }

    #[test]
    fn test_header_listing() {
        let dataset = sample_dataset();
        let mut out = Vec::new();
        print_header(&mut out, &dataset.header, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("01010083"));
        assert!(text.contains("depth"));
    }
}
