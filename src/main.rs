use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use mgd77_codec::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    // Without a subcommand, show help and exit cleanly
    if args.command.is_none() {
        let _ = Args::command().print_help();
        println!();
        process::exit(0);
    }

    match run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), error);
            let code = error
                .downcast_ref::<mgd77_codec::Error>()
                .map_or(1, mgd77_codec::Error::code);
            process::exit(code.max(1));
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let name = args.command.as_ref().map_or("mgd77_codec", |c| c.name());
    commands::run(args).with_context(|| format!("{} failed", name))?;
    Ok(())
}
