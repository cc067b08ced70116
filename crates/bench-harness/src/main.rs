//! CLI entry point for the REX-7 benchmark harness.

use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use bench_harness::compiler::{
    CommandCompiler, CompileError, CompileOptions, PatternCompiler,
};
use bench_harness::corpus::{load_inputs, load_patterns};
use bench_harness::measure::{DeviceMeasurer, Measurer, ReferenceMeasurer};
use bench_harness::oracle::RegexGoldenModel;
use bench_harness::orchestrator::{run_batch, BatchOptions, NullProgress, ProgressSink};
use bench_harness::report::write_csv;
use bench_harness::table::{Cell, MeasureValue, MeasurementTable};
use driver_core::{
    available_ports, DeviceConfig, DeviceSession, Program, ResultCode, SerialConfig,
    SerialTransport, SimulatedDevice, DEFAULT_BAUD_RATE, DEFAULT_CLOCK_HZ,
};
use regex as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing as _;
use tracing_subscriber::EnvFilter;

const USAGE_TEXT: &str = "\
Usage: rex7-bench <command> [options]

Commands:
  run         Measure a pattern corpus on the device and the reference
  selftest    Run the harness against the in-process simulated device
  list-ports  List serial ports visible on this host

Run options:
  --port <port>        Serial port of the device (required)
  --patterns <file>    Pattern corpus, one pattern per line (required)
  --inputs <file>      Input corpus, one input per line (required)
  --compiler <exe>     External pattern compiler executable (required)
  --baud <rate>        Baud rate (default: 9600)
  --timeout-ms <ms>    Read timeout in milliseconds (default: 1000)
  --clock-hz <hz>      Device clock frequency (default: 24000000)
  --strict             Stop on the first failing pattern
  --no-reference       Skip the golden-model reference measurer
  -o, --output <file>  Write the CSV report here instead of stdout
  -h, --help           Show this help message

Examples:
  rex7-bench run --port /dev/ttyACM0 --patterns patterns.txt \\
      --inputs inputs.txt --compiler rex7-compile -o results.csv
  rex7-bench selftest
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(Box<RunArgs>),
    Selftest,
    ListPorts,
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    port: String,
    patterns: PathBuf,
    inputs: PathBuf,
    compiler: PathBuf,
    baud: u32,
    timeout_ms: u64,
    clock_hz: u32,
    strict: bool,
    no_reference: bool,
    output: Option<PathBuf>,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "run" => parse_run_args(args)
            .map(|run| Command::Run(Box::new(run)))
            .map(ParseResult::Command),
        "selftest" => reject_extra_args(args, "selftest")
            .map(|()| ParseResult::Command(Command::Selftest)),
        "list-ports" => reject_extra_args(args, "list-ports")
            .map(|()| ParseResult::Command(Command::ListPorts)),
        other => Err(format!("unknown command: {other}")),
    }
}

fn reject_extra_args(
    mut args: impl Iterator<Item = OsString>,
    command: &str,
) -> Result<(), String> {
    match args.next() {
        None => Ok(()),
        Some(arg) if arg == "--help" || arg == "-h" => Err(USAGE_TEXT.to_string()),
        Some(arg) => Err(format!(
            "{command} takes no arguments (got {})",
            arg.to_string_lossy()
        )),
    }
}

#[allow(clippy::too_many_lines)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut port: Option<String> = None;
    let mut patterns: Option<PathBuf> = None;
    let mut inputs: Option<PathBuf> = None;
    let mut compiler: Option<PathBuf> = None;
    let mut baud = DEFAULT_BAUD_RATE;
    let mut timeout_ms = 1_000u64;
    let mut clock_hz = DEFAULT_CLOCK_HZ;
    let mut strict = false;
    let mut no_reference = false;
    let mut output: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--strict" {
            strict = true;
            continue;
        }

        if arg == "--no-reference" {
            no_reference = true;
            continue;
        }

        if arg == "--port" {
            let value = next_value(&mut args, "--port")?;
            port = Some(value.to_string_lossy().to_string());
            continue;
        }

        if arg == "--patterns" {
            patterns = Some(PathBuf::from(next_value(&mut args, "--patterns")?));
            continue;
        }

        if arg == "--inputs" {
            inputs = Some(PathBuf::from(next_value(&mut args, "--inputs")?));
            continue;
        }

        if arg == "--compiler" {
            compiler = Some(PathBuf::from(next_value(&mut args, "--compiler")?));
            continue;
        }

        if arg == "--baud" {
            baud = parse_number(&next_value(&mut args, "--baud")?, "--baud")?;
            continue;
        }

        if arg == "--timeout-ms" {
            timeout_ms = parse_number(&next_value(&mut args, "--timeout-ms")?, "--timeout-ms")?;
            continue;
        }

        if arg == "--clock-hz" {
            clock_hz = parse_number(&next_value(&mut args, "--clock-hz")?, "--clock-hz")?;
            continue;
        }

        if arg == "-o" || arg == "--output" {
            output = Some(PathBuf::from(next_value(&mut args, "--output")?));
            continue;
        }

        return Err(format!("unknown option: {}", arg.to_string_lossy()));
    }

    Ok(RunArgs {
        port: port.ok_or_else(|| "missing required option --port".to_string())?,
        patterns: patterns.ok_or_else(|| "missing required option --patterns".to_string())?,
        inputs: inputs.ok_or_else(|| "missing required option --inputs".to_string())?,
        compiler: compiler.ok_or_else(|| "missing required option --compiler".to_string())?,
        baud,
        timeout_ms,
        clock_hz,
        strict,
        no_reference,
        output,
    })
}

fn next_value(
    args: &mut dyn Iterator<Item = OsString>,
    option: &str,
) -> Result<OsString, String> {
    args.next()
        .ok_or_else(|| format!("missing value for {option}"))
}

fn parse_number<T: std::str::FromStr>(value: &OsString, option: &str) -> Result<T, String> {
    value
        .to_string_lossy()
        .parse()
        .map_err(|_| format!("invalid value for {option}: {}", value.to_string_lossy()))
}

/// Progress reporter printing one line per finished pair.
struct ConsoleProgress {
    pairs_done: usize,
    pairs_total: usize,
    inputs_processed: usize,
}

impl ConsoleProgress {
    const fn new(pairs_total: usize) -> Self {
        Self {
            pairs_done: 0,
            pairs_total,
            inputs_processed: 0,
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn pair_finished(&mut self, pattern: &str, measurer: &str, inputs_processed: usize) {
        self.pairs_done += 1;
        self.inputs_processed += inputs_processed;
        eprintln!(
            "[{}/{}] {measurer} finished {pattern:?} ({} inputs processed so far)",
            self.pairs_done, self.pairs_total, self.inputs_processed
        );
    }
}

fn run_run(args: &RunArgs) -> Result<(), i32> {
    let patterns = load_patterns(&args.patterns).map_err(|err| {
        eprintln!("error: {err}");
        1
    })?;
    let inputs = load_inputs(&args.inputs).map_err(|err| {
        eprintln!("error: {err}");
        1
    })?;

    let serial = SerialConfig {
        port: args.port.clone(),
        baud_rate: args.baud,
        timeout: Duration::from_millis(args.timeout_ms),
    };
    let transport = SerialTransport::open(&serial).map_err(|err| {
        eprintln!("error: {err}");
        1
    })?;
    let session = DeviceSession::new(
        Box::new(transport),
        DeviceConfig {
            clock_hz: args.clock_hz,
        },
    );

    let mut measurers = vec![Measurer::Device(DeviceMeasurer::new(
        session,
        Box::new(CommandCompiler::new(&args.compiler)),
    ))];
    if !args.no_reference {
        measurers.push(Measurer::Reference(ReferenceMeasurer::new(Box::new(
            RegexGoldenModel,
        ))));
    }

    let options = BatchOptions {
        compile: CompileOptions::default(),
        skip_failures: !args.strict,
    };
    let mut progress = ConsoleProgress::new(patterns.len() * measurers.len());
    let table = run_batch(&mut measurers, &patterns, &inputs, &options, &mut progress)
        .map_err(|err| {
            eprintln!("error: {err}");
            1
        })?;

    write_report(&table, args.output.as_deref())
}

fn write_report(table: &MeasurementTable, output: Option<&std::path::Path>) -> Result<(), i32> {
    let result = match output {
        Some(path) => File::create(path).and_then(|mut file| write_csv(table, &mut file)),
        None => write_csv(table, &mut io::stdout().lock()),
    };
    result.map_err(|err| {
        eprintln!("error: failed to write report: {err}");
        1
    })?;
    if let Some(path) = output {
        eprintln!("wrote {} cells to {}", table.len(), path.display());
    }
    Ok(())
}

/// Stand-in compiler for the selftest: every pattern becomes the same small
/// program, and the simulated device's scripted outcomes stand in for real
/// executions.
struct FixedProgramCompiler;

impl PatternCompiler for FixedProgramCompiler {
    fn compile(&self, _pattern: &str, _options: &CompileOptions) -> Result<Program, CompileError> {
        Ok(Program::from_words(&[0x0049, 0x2062, 0x0063, 0x00FE])?)
    }
}

fn run_selftest() -> Result<(), i32> {
    let pattern = "a+(b|c)+".to_owned();
    let inputs = vec![b"aaab".to_vec(), b"fdkllwk".to_vec()];

    let mut device = SimulatedDevice::new();
    device.push_outcome(ResultCode::MatchFound, 120);
    device.push_outcome(ResultCode::MatchNotFound, 45);
    let session = DeviceSession::new(Box::new(device), DeviceConfig::default());

    let mut measurers = vec![
        Measurer::Device(DeviceMeasurer::new(session, Box::new(FixedProgramCompiler))),
        Measurer::Reference(ReferenceMeasurer::new(Box::new(RegexGoldenModel))),
    ];
    let patterns = vec![pattern.clone()];
    let table = run_batch(
        &mut measurers,
        &patterns,
        &inputs,
        &BatchOptions::default(),
        &mut NullProgress,
    )
    .map_err(|err| {
        eprintln!("selftest failed: {err}");
        1
    })?;

    let checks: &[(&str, &[u8], MeasureValue)] = &[
        ("rex7_match[bool]", b"aaab", MeasureValue::Bool(true)),
        ("rex7_exec[cc]", b"aaab", MeasureValue::Cycles(120)),
        ("rex7_match[bool]", b"fdkllwk", MeasureValue::Bool(false)),
        ("rex7_exec[cc]", b"fdkllwk", MeasureValue::Cycles(45)),
        ("reference_match[bool]", b"aaab", MeasureValue::Bool(true)),
        ("reference_match[bool]", b"fdkllwk", MeasureValue::Bool(false)),
    ];
    for (column, input, expected) in checks {
        match table.cell(&pattern, input, column) {
            Cell::Value(value) if value == expected => {}
            other => {
                eprintln!(
                    "selftest failed: {column} for {:?} is {other:?}, expected {expected:?}",
                    String::from_utf8_lossy(input)
                );
                return Err(1);
            }
        }
    }

    let expected_cells = inputs.len() * 4;
    if table.len() != expected_cells {
        eprintln!(
            "selftest failed: expected {expected_cells} cells, found {}",
            table.len()
        );
        return Err(1);
    }

    println!("selftest passed ({} cells recorded)", table.len());
    Ok(())
}

fn run_list_ports() -> Result<(), i32> {
    let ports = available_ports().map_err(|err| {
        eprintln!("error: {err}");
        1
    })?;
    if ports.is_empty() {
        println!("no serial ports found");
        return Ok(());
    }
    for (name, kind) in ports {
        println!("{name}\t{kind}");
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            print!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(command)) => {
            let result = match command {
                Command::Run(args) => run_run(&args),
                Command::Selftest => run_selftest(),
                Command::ListPorts => run_list_ports(),
            };
            match result {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("run with --help for usage");
            2
        }
    };

    std::process::exit(exit_code);
}
