#![allow(unknown_lints)]

extern crate chrono;
extern crate fern;
extern crate metricline;

#[macro_use]
extern crate log;

use chrono::Utc;
use metricline::buckets::Buckets;
use metricline::config::{self, Args};
use metricline::metric::Metric;
use metricline::protocols::statsd;
use metricline::time;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process;

fn emit<W: Write>(out: &mut W, metrics: &[Metric]) -> io::Result<()> {
    for metric in metrics {
        writeln!(out, "{}", statsd::encode(metric))?;
    }
    out.flush()
}

fn run<R: BufRead, W: Write>(args: &Args, input: R, out: &mut W) -> io::Result<()> {
    let mut buckets = Buckets::new(args.bin_width);
    let mut observations = Vec::new();
    // the newest timestamp seen so far decides which windows have closed, so
    // replayed input aggregates the same as live input
    let mut high_water = i64::min_value();

    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        observations.clear();
        if !statsd::parse_statsd(&line, time::now(), &mut observations) {
            warn!("rejected line {}: {}", lineno + 1, line);
            continue;
        }
        for mut obs in observations.drain(..) {
            obs.tags.merge(&args.tags);
            let ts = obs.timestamp;
            match buckets.add(obs) {
                Ok(()) => high_water = high_water.max(ts),
                Err(e) => warn!("rejected observation on line {}: {}", lineno + 1, e),
            }
        }

        let closed = buckets.flush(high_water);
        emit(out, &closed)?;
        if buckets.weight() > args.max_weight {
            debug!(
                "weight {} exceeds {}, flushing all windows",
                buckets.weight(),
                args.max_weight
            );
            emit(out, &buckets.flush_all())?;
        }
    }

    emit(out, &buckets.flush_all())
}

fn main() {
    let args = match config::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // stdout carries the metric lines, logs go to stderr
    let logger = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("metricline"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply();
    if let Err(e) = logger {
        eprintln!("could not set up logging: {}", e);
        process::exit(1);
    }

    info!("metricline - {}", args.version);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let res = match args.input {
        Some(ref path) => match File::open(path) {
            Ok(fp) => run(&args, BufReader::new(fp), &mut out),
            Err(e) => {
                error!("could not open {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => {
            let stdin = io::stdin();
            let input = stdin.lock();
            run(&args, input, &mut out)
        }
    };

    if let Err(e) = res {
        error!("{}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run_str(args: &Args, input: &str) -> String {
        let mut out = Vec::new();
        run(args, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn aggregates_and_flushes_at_end() {
        let args = Args::default();
        let out = run_str(&args, "a:1|c|T100\na:2|c|T105\n\nbogus\n");
        assert_eq!("a@none:3|c|T100\n", out);
    }

    #[test]
    fn flushes_closed_windows_in_order() {
        let args = Args::default();
        let out = run_str(&args, "a:1|c|T100\na:1|c|T111\na:1|c|T125\n");
        assert_eq!("a@none:1|c|T100\na@none:1|c|T110\na@none:1|c|T120\n", out);
    }

    #[test]
    fn global_tags_do_not_override() {
        let mut args = Args::default();
        args.tags.insert("env", "prod");
        args.tags.insert("host", "a");
        let out = run_str(&args, "k:1|c|#host:b|T0\n");
        assert_eq!("k@none:1|c|#env:prod,host:b|T0\n", out);
    }

    #[test]
    fn flushes_when_over_weight() {
        let mut args = Args::default();
        args.max_weight = 2;
        let out = run_str(&args, "d:1:2:3|d|T0\nd:4|d|T0\n");
        assert_eq!("d@none:1:2:3|d|T0\nd@none:4|d|T0\n", out);
    }
}
