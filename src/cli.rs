// Command-line front end for the SCSU codec.
//
// Subcommands: encode (UTF-8 -> SCSU), decode (SCSU -> UTF-8), inspect
// (dump decoder events), config (build and protocol constants).

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::codec::decoder::{Decoder, Event};
use crate::codec::encoder::EncodeOptions;
use crate::codec::tags;
use crate::codec::window::Mode;
use crate::io::{self as scsu_io, DecodeStats, EncodeStats};

const DEFAULT_DEFINE_RUN: usize = 2;
const DEFAULT_UNICODE_RUN: usize = 2;
const MAX_RUN: usize = 64;

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Standard Compression Scheme for Unicode (UTS #6) encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "scsu",
    version,
    about = "SCSU (UTS #6) encoder/decoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode UTF-8 text as SCSU.
    Encode(EncodeArgs),
    /// Decode SCSU into UTF-8 text.
    Decode(DecodeArgs),
    /// Print every command and value in an SCSU stream.
    Inspect(InspectArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Values that must share a new window before it is defined.
    #[arg(long = "define-run", value_parser = run_length, default_value_t = DEFAULT_DEFINE_RUN)]
    define_run: usize,

    /// Values without window locality needed to enter unicode mode.
    #[arg(long = "unicode-run", value_parser = run_length, default_value_t = DEFAULT_UNICODE_RUN)]
    unicode_run: usize,

    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct IoArgs {
    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// SCSU input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

fn run_length(s: &str) -> Result<usize, String> {
    let n: usize = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid run length '{s}': {e}"))?;
    if (1..=MAX_RUN).contains(&n) {
        Ok(n)
    } else {
        Err(format!("run length must be between 1 and {MAX_RUN}"))
    }
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    Inspect,
    Config,
}

struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    encode: EncodeOptions,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        encode: EncodeOptions::default(),
        input_file: None,
        output_file: None,
    };

    match cli.command {
        Cmd::Encode(args) => {
            opts.command = Command::Encode;
            opts.encode = EncodeOptions {
                define_threshold: args.define_run,
                unicode_threshold: args.unicode_run,
            };
            opts.use_stdout = args.io.stdout;
            opts.input_file = args.io.input;
            opts.output_file = args.io.output;
        }
        Cmd::Decode(args) => {
            opts.command = Command::Decode;
            opts.use_stdout = args.io.stdout;
            opts.input_file = args.io.input;
            opts.output_file = args.io.output;
        }
        Cmd::Inspect(args) => {
            opts.command = Command::Inspect;
            opts.input_file = Some(args.input);
        }
        Cmd::Config => {}
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("scsu".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Shared I/O setup
// ---------------------------------------------------------------------------

fn open_input(opts: &Options) -> Result<Box<dyn Read>, String> {
    match &opts.input_file {
        Some(path) => File::open(path)
            .map(|f| Box::new(BufReader::with_capacity(BUF_SIZE, f)) as Box<dyn Read>)
            .map_err(|e| format!("input file: {}: {e}", path.display())),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn open_output(opts: &Options) -> Result<Box<dyn Write>, String> {
    match (opts.use_stdout, &opts.output_file) {
        (true, _) | (_, None) => Ok(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
        (false, Some(path)) => {
            if path.exists() && !opts.force {
                return Err(format!(
                    "output file exists, use -f to overwrite: {}",
                    path.display()
                ));
            }
            File::create(path)
                .map(|f| Box::new(BufWriter::with_capacity(BUF_SIZE, f)) as Box<dyn Write>)
                .map_err(|e| format!("output file: {}: {e}", path.display()))
        }
    }
}

/// Remove a partially written output file after a failed command.
fn discard_output(opts: &Options) {
    if opts.use_stdout {
        return;
    }
    if let Some(path) = &opts.output_file
        && let Err(e) = std::fs::remove_file(path)
    {
        log::warn!("could not remove partial output {}: {e}", path.display());
    }
}

fn digest_field(digest: Option<[u8; 32]>) -> serde_json::Value {
    digest.map_or(serde_json::Value::Null, |d| scsu_io::hex(&d).into())
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("scsu version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    eprintln!("FILE_IO={file_io}");
    eprintln!("DEFAULT_DEFINE_RUN={DEFAULT_DEFINE_RUN}");
    eprintln!("DEFAULT_UNICODE_RUN={DEFAULT_UNICODE_RUN}");
    eprintln!("GAP_THRESHOLD={:#04X}", tags::GAP_THRESHOLD);
    eprintln!("GAP_OFFSET={:#06X}", tags::GAP_OFFSET);
    eprintln!("RESERVED_START={:#04X}", tags::RESERVED_START);
    eprintln!("FIXED_THRESHOLD={:#04X}", tags::FIXED_THRESHOLD);
    let join = |offsets: &[u32]| {
        offsets
            .iter()
            .map(|o| format!("{o:04X}"))
            .collect::<Vec<_>>()
            .join(",")
    };
    eprintln!("STATIC_OFFSETS={}", join(&tags::STATIC_OFFSETS[..]));
    eprintln!("INITIAL_DYNAMIC_OFFSETS={}", join(&tags::INITIAL_DYNAMIC_OFFSETS[..]));
    eprintln!("FIXED_OFFSETS={}", join(&tags::FIXED_OFFSETS[..]));

    0
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(opts: &Options) -> i32 {
    let (reader, writer) = match open_input(opts).and_then(|r| Ok((r, open_output(opts)?))) {
        Ok(rw) => rw,
        Err(msg) => {
            eprintln!("scsu: {msg}");
            return 1;
        }
    };

    let stats: EncodeStats = match scsu_io::encode_stream(reader, writer, opts.encode) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("scsu: encode error: {e}");
            discard_output(opts);
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "scsu: encoder: values: {}, input size: {}, output size: {}, vs UTF-16: {:.3}",
            stats.chars,
            stats.text_size,
            stats.encoded_size,
            stats.ratio_vs_utf16()
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "encode",
            "chars": stats.chars,
            "text_size": stats.text_size,
            "encoded_size": stats.encoded_size,
            "text_sha256": digest_field(stats.text_sha256),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let (reader, writer) = match open_input(opts).and_then(|r| Ok((r, open_output(opts)?))) {
        Ok(rw) => rw,
        Err(msg) => {
            eprintln!("scsu: {msg}");
            return 1;
        }
    };

    let stats: DecodeStats = match scsu_io::decode_stream(reader, writer) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("scsu: decode error: {e}");
            discard_output(opts);
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "scsu: decoder: values: {}, input size: {}, output size: {}",
            stats.chars, stats.encoded_size, stats.text_size
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "decode",
            "chars": stats.chars,
            "encoded_size": stats.encoded_size,
            "text_size": stats.text_size,
            "text_sha256": digest_field(stats.text_sha256),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

fn describe(event: &Event) -> String {
    match *event {
        Event::Char(ch) if ch.is_control() || ch.is_whitespace() => {
            format!("U+{:04X}", u32::from(ch))
        }
        Event::Char(ch) => format!("U+{:04X} '{ch}'", u32::from(ch)),
        Event::Select { window } => format!("select window {window}"),
        Event::Define { window, offset } => {
            format!("define window {window} at U+{offset:04X}")
        }
        Event::EnterUnicode => "enter unicode mode".to_string(),
    }
}

fn cmd_inspect(opts: &Options) -> i32 {
    let Some(path) = &opts.input_file else {
        eprintln!("scsu: inspect: no input file");
        return 1;
    };
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("scsu: input file: {}: {e}", path.display());
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut decoder = Decoder::new(&data[..]);
    let mut chars = 0u64;

    loop {
        let start = decoder.bytes_read() as usize;
        let mode = decoder.state().mode();
        let event = match decoder.next_event() {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(e) => {
                let _ = out.flush();
                eprintln!("scsu: decode error: {e}");
                return 1;
            }
        };
        let end = decoder.bytes_read() as usize;
        let raw = &data[start..end];
        let tag = match mode {
            Mode::SingleByte => tags::single_byte_tag_name(raw[0]),
            Mode::Unicode => tags::unicode_tag_name(raw[0]),
        };
        let hex: Vec<String> = raw.iter().map(|b| format!("{b:02X}")).collect();
        if matches!(event, Event::Char(_)) {
            chars += 1;
        }
        let line = format!(
            "{start:>8}  {:<14} {:<4} {}",
            hex.join(" "),
            tag.unwrap_or(""),
            describe(&event)
        );
        if writeln!(out, "{line}").is_err() {
            return 1;
        }
    }

    if out.flush().is_err() {
        return 1;
    }
    if !opts.quiet {
        eprintln!("scsu: {} bytes, {chars} values", data.len());
    }
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    let default_level = match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && let Some(path) = opts.output_file.take()
        && !opts.quiet
    {
        log::warn!("-c option overrides output filename: {}", path.display());
    }

    let exit_code = match opts.command {
        Command::Encode => cmd_encode(&opts),
        Command::Decode => cmd_decode(&opts),
        Command::Inspect => cmd_inspect(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("scsu".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    #[test]
    fn encode_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "encode",
            "--define-run",
            "3",
            "--unicode-run",
            "4",
            "in.txt",
            "out.scsu",
        ]);
        assert_eq!(opts.command, Command::Encode);
        assert_eq!(opts.encode.define_threshold, 3);
        assert_eq!(opts.encode.unicode_threshold, 4);
        assert_eq!(opts.input_file, Some(PathBuf::from("in.txt")));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.scsu")));
    }

    #[test]
    fn encode_defaults_match_library() {
        let opts = parse_opts(&["encode"]);
        assert_eq!(opts.encode, EncodeOptions::default());
        assert!(opts.input_file.is_none());
        assert!(opts.output_file.is_none());
    }

    #[test]
    fn run_length_is_bounded() {
        assert_eq!(run_length("1"), Ok(1));
        assert_eq!(run_length(" 64 "), Ok(64));
        assert!(run_length("0").is_err());
        assert!(run_length("65").is_err());
        assert!(run_length("x").is_err());
    }

    #[test]
    fn decode_subcommand_maps_correctly() {
        let opts = parse_opts(&["--quiet", "decode", "-c", "in.scsu"]);
        assert_eq!(opts.command, Command::Decode);
        assert!(opts.quiet);
        assert!(opts.use_stdout);
        assert_eq!(opts.input_file, Some(PathBuf::from("in.scsu")));
    }

    #[test]
    fn global_flags() {
        let opts = parse_opts(&["--force", "--json", "decode", "in", "out"]);
        assert!(opts.force);
        assert!(opts.json_output);
    }

    #[test]
    fn verbose_is_capped() {
        let verbose = parse_opts(&["-v", "-v", "-v", "encode", "in", "out"]);
        assert_eq!(verbose.verbose, 2);
    }

    #[test]
    fn inspect_and_config_map() {
        let opts = parse_opts(&["inspect", "x.scsu"]);
        assert_eq!(opts.command, Command::Inspect);
        assert_eq!(opts.input_file, Some(PathBuf::from("x.scsu")));
        assert_eq!(parse_opts(&["config"]).command, Command::Config);
    }

    #[test]
    fn discard_output_removes_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.scsu");
        std::fs::write(&path, b"partial").unwrap();

        let mut opts = parse_opts(&["decode", "-c", "in.scsu"]);
        opts.output_file = Some(path.clone());
        discard_output(&opts);
        assert!(path.exists());

        let mut opts = parse_opts(&["decode", "in.scsu"]);
        opts.output_file = Some(path.clone());
        discard_output(&opts);
        assert!(!path.exists());

        // Already gone: nothing to do.
        discard_output(&opts);
    }

    #[test]
    fn describe_events() {
        assert_eq!(describe(&Event::Char('Ж')), "U+0416 'Ж'");
        assert_eq!(describe(&Event::Char('\n')), "U+000A");
        assert_eq!(
            describe(&Event::Define {
                window: 2,
                offset: 0x0400
            }),
            "define window 2 at U+0400"
        );
    }
}
