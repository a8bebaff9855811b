//! Sharded bounded-buffer run.
//!
//! Moves a target number of items from producer threads to consumer threads
//! through N independently locked ring buffers, then prints a run report.
//!
//! Run with: `cargo run --release --bin ringshard -- --buffers 4 --producers 16 --consumers 32`

use ringshard::{
    init_tracing, Config, Harness, PollStrategy, RunReport, NON_SCALING_CONFIG, SHARDED_CONFIG,
};
use std::ffi::OsString;
use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config: Config,
    baseline: bool,
    json: bool,
    verbose: bool,
    show_help: bool,
}

fn main() {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let exit_code = run(std::env::args_os(), &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, W, E>(args: I, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    init_tracing(options.verbose);

    let harness = match Harness::new(options.config) {
        Ok(harness) => harness,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            return 2;
        }
    };

    let report = match harness.run() {
        Ok(report) => report,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            return 2;
        }
    };

    let baseline = if options.baseline && options.config.buffer_count > 1 {
        match Harness::new(options.config.as_baseline()).and_then(|h| h.run()) {
            Ok(report) => Some(report),
            Err(error) => {
                let _ = writeln!(err, "error: baseline run: {error}");
                None
            }
        }
    } else {
        None
    };

    let written = if options.json {
        write_json(out, &report, baseline.as_ref())
    } else {
        write_text(out, &report, baseline.as_ref())
    };

    // A finished run exits 0 even if some workers never started.
    if let Err(error) = written {
        let _ = writeln!(err, "error: {error}");
    }
    0
}

fn write_text<W: Write>(out: &mut W, report: &RunReport, baseline: Option<&RunReport>) -> io::Result<()> {
    writeln!(out, "{report}")?;
    if let Some(baseline) = baseline {
        writeln!(out)?;
        writeln!(out, "{baseline}")?;
        writeln!(out)?;
        writeln!(
            out,
            "Speed-up of {} buffers over 1: {:.2}x",
            report.config.buffer_count,
            report.speedup_over(baseline)
        )?;
    }
    Ok(())
}

fn write_json<W: Write>(out: &mut W, report: &RunReport, baseline: Option<&RunReport>) -> io::Result<()> {
    let value = match baseline {
        Some(baseline) => serde_json::json!({
            "run": report,
            "baseline": baseline,
            "speedup": report.speedup_over(baseline),
        }),
        None => serde_json::json!({ "run": report }),
    };
    let text = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
    writeln!(out, "{text}")
}

fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut config = Config::default();
    let mut preset_seen = false;
    let mut overrides: Vec<(String, String)> = Vec::new();
    let mut baseline = false;
    let mut json = false;
    let mut verbose = false;
    let mut show_help = false;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy().into_owned();

        match arg.as_str() {
            "-h" | "--help" => show_help = true,
            "-v" | "--verbose" => verbose = true,
            "--baseline" => baseline = true,
            "--json" => json = true,
            _ => {
                let (flag, value) = match arg.split_once('=') {
                    Some((flag, value)) if flag.starts_with("--") => (flag.to_owned(), value.to_owned()),
                    _ if arg.starts_with("--") => {
                        let value = iter
                            .next()
                            .ok_or_else(|| format!("missing argument for `{arg}`"))?;
                        (arg.clone(), value.to_string_lossy().into_owned())
                    }
                    _ => return Err(format!("unexpected argument `{arg}`")),
                };

                if flag == "--preset" {
                    if preset_seen {
                        return Err(String::from("`--preset` may only be provided once"));
                    }
                    preset_seen = true;
                    config = match value.as_str() {
                        "default" => Config::default(),
                        "non-scaling" => NON_SCALING_CONFIG,
                        "sharded" => SHARDED_CONFIG,
                        other => return Err(format!("unknown preset `{other}`")),
                    };
                } else {
                    overrides.push((flag, value));
                }
            }
        }
    }

    // Individual options win over the preset regardless of order.
    for (flag, value) in overrides {
        config = match flag.as_str() {
            "--capacity" => config.with_capacity(parse_usize_option(&value, &flag)?),
            "--buffers" => config.with_buffers(parse_usize_option(&value, &flag)?),
            "--producers" => config.with_producers(parse_usize_option(&value, &flag)?),
            "--consumers" => config.with_consumers(parse_usize_option(&value, &flag)?),
            "--items" => config.with_items(parse_u64_option(&value, &flag)?),
            "--poll" => config.with_poll(
                PollStrategy::parse(&value)
                    .ok_or_else(|| format!("invalid value for `--poll`: `{value}` (expected spin or backoff)"))?,
            ),
            other => return Err(format!("unknown option `{other}`")),
        };
    }

    Ok(CliOptions {
        config,
        baseline,
        json,
        verbose,
        show_help,
    })
}

fn parse_usize_option(value: &str, flag: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("invalid integer for `{flag}`: `{value}`"))
}

fn parse_u64_option(value: &str, flag: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| format!("invalid integer for `{flag}`: `{value}`"))
}

fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Usage: ringshard [OPTIONS]")?;
    writeln!(out)?;
    writeln!(out, "Options:")?;
    writeln!(out, "  --preset NAME        default | non-scaling | sharded")?;
    writeln!(out, "  --capacity N         slots per buffer")?;
    writeln!(out, "  --buffers N          number of buffers (one lock each)")?;
    writeln!(out, "  --producers N        producer threads")?;
    writeln!(out, "  --consumers N        consumer threads")?;
    writeln!(out, "  --items N            total items to send (split evenly, remainder dropped)")?;
    writeln!(out, "  --poll spin|backoff  what workers do when their buffer is full/empty")?;
    writeln!(out, "  --baseline           also run the same workload through a single buffer")?;
    writeln!(out, "  --json               print the report as JSON")?;
    writeln!(out, "  -v, --verbose        log every worker start and finish")?;
    writeln!(out, "  -h, --help           show this help")
}
