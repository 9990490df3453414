use std::fmt::Display;

use ahrptsync::{SampleFormat, UnknownSampleFormat};
use clap::{error::ErrorKind, value_parser, CommandFactory, Parser};

/// Standard input or output filename
const STDIO_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program accepts QPSK symbols from an AHRPT demodulator, one complex sample per symbol, resolves the demodulator's phase ambiguity, and writes the Viterbi-decoded bitstream as raw bytes.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program accepts QPSK symbols from an AHRPT demodulator, one complex sample per symbol, resolves the demodulator's phase ambiguity, and writes the Viterbi-decoded bitstream as raw bytes.

Symbols may be complex 32-bit floats (--format cf32) or signed 8-bit soft symbols (--format i8), interleaved I/Q, in native byte order.

    ahrptdec --file symbols.s8 --format i8 --output decoded.bin

The decoded bytes are a continuous bitstream with no framing. Pass them to a CADU deframer. Nothing is written until the decoder has acquired sync, and the first byte after each acquisition is unreliable.

To check your build, run

    ahrptdec --demo

which decodes a built-in signal with a 90° phase error and reports whether the demonstration message was recovered.
"#;

const ADVANCED: &str = "Advanced Sync Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING, not even the --demo result
    #[arg(short, long)]
    pub quiet: bool,

    /// Input file (or "-" for stdin)
    #[arg(long, default_value_t = STDIO_FILE.to_string())]
    pub file: String,

    /// Output file (or "-" for stdout)
    #[arg(short, long, default_value_t = STDIO_FILE.to_string())]
    pub output: String,

    /// Input sample format
    #[arg(long, default_value_t = SampleFormat::ComplexF32)]
    #[arg(value_parser = parse_format)]
    pub format: SampleFormat,

    /// Symbols per chunk
    ///
    /// The decoder tests and monitors its sync once per chunk.
    /// Chunks shorter than 256 symbols cannot be tested.
    #[arg(long, default_value_t = 8192)]
    #[arg(value_parser = value_parser!(u32).range(256..))]
    pub chunk: u32,

    /// Decode a built-in demonstration signal and exit
    ///
    /// No input is read, and no output is written. Exits
    /// with an error if the demonstration message is not
    /// recovered.
    #[arg(long)]
    pub demo: bool,

    /// Bit error rate required for sync (0.0 ≤ BER ≤ 0.5)
    #[arg(long, default_value_t = 0.17)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub ber_threshold: f32,

    /// Bad chunks permitted before sync is dropped
    #[arg(long, default_value_t = 5)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub outsync_after: u32,

    /// Good chunks required for sync (reserved)
    #[arg(long, default_value_t = 1)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub insync_after: u32,

    /// Reset interval (reserved)
    #[arg(long, default_value_t = 50)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub reset_after: u32,

    /// Never drop sync once acquired
    #[arg(long)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub no_sync_check: bool,
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file == STDIO_FILE
    }

    /// Return true if the user requests output to stdout
    pub fn output_is_stdout(&self) -> bool {
        self.output == STDIO_FILE
    }
}

fn parse_format(inp: &str) -> Result<SampleFormat, UnknownSampleFormat> {
    SampleFormat::try_from(inp)
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}
