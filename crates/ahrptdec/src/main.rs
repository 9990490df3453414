use std::io;

use anyhow::{anyhow, Context};
use clap::Parser;
use log::{info, LevelFilter};

use ahrptsync::{ViterbiSync, ViterbiSyncBuilder};

mod app;
mod cli;

use cli::{Args, CliError};

fn main() {
    match ahrptdec() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn ahrptdec() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // create the decoder
    let mut sync = sync_setup(&args);

    if args.demo {
        return Ok(app::demo(&args, &mut sync)?);
    }

    // file setup: locks stdin and stdout in case we need them
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut inbuf = file_setup(&args, stdin.lock())?;
    let mut outbuf = output_setup(&args, stdout.lock())?;

    // processing
    let summary = app::run(&args, &mut sync, &mut inbuf, &mut outbuf)?;
    info!("{}", summary);

    Ok(())
}

fn sync_setup(args: &Args) -> ViterbiSync {
    ViterbiSyncBuilder::new()
        .with_sync_check(!args.no_sync_check)
        .with_ber_threshold(args.ber_threshold)
        .with_insync_after(args.insync_after)
        .with_outsync_after(args.outsync_after)
        .with_reset_after(args.reset_after)
        .build()
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            3 | _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("ahrptsync", log_filter)
            .filter_module("ahrptdec", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn file_setup<'stdin>(
    args: &Args,
    stdin: std::io::StdinLock<'stdin>,
) -> Result<Box<dyn io::BufRead + 'stdin>, anyhow::Error> {
    if args.input_is_stdin() {
        info!("AHRPT decoder reading standard input");
        if !is_terminal(&std::io::stdin()) {
            Ok(Box::new(io::BufReader::new(stdin)))
        } else {
            Err(anyhow!(
                "cowardly refusing to read symbols from a terminal.

Pipe a source of raw demodulated symbols into this program, or
specify an input --file."
            ))
        }
    } else {
        info!("AHRPT decoder reading file: \"{}\"", &args.file);
        Ok(Box::new(io::BufReader::new(
            std::fs::File::open(&args.file)
                .with_context(|| format!("Unable to open --file \"{}\"", args.file))?,
        )))
    }
}

fn output_setup<'stdout>(
    args: &Args,
    stdout: std::io::StdoutLock<'stdout>,
) -> Result<Box<dyn io::Write + 'stdout>, anyhow::Error> {
    if args.output_is_stdout() {
        if !is_terminal(&std::io::stdout()) {
            Ok(Box::new(io::BufWriter::new(stdout)))
        } else {
            Err(anyhow!(
                "cowardly refusing to write decoded bytes to a terminal.

Redirect standard output or specify an --output file."
            ))
        }
    } else {
        info!("AHRPT decoder writing file: \"{}\"", &args.output);
        Ok(Box::new(io::BufWriter::new(
            std::fs::File::create(&args.output)
                .with_context(|| format!("Unable to create --output \"{}\"", args.output))?,
        )))
    }
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::fd::AsRawFd,
{
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::windows::io::AsRawHandle,
{
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}
