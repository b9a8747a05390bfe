// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `packed12-cli`: the command-line front-end (C11, spec.md §6 "CLI (external collaborator)").
//!
//! Grounded on `examples/original_source/src/main.c`: parses flags with `getopt_long`-equivalent
//! semantics (`-h/--help`, `-i/--input`, `-t/--threads N`, `-v/--verbose`), reads newline-delimited
//! paths from stdin when `-i` is given (max 255 bytes per path, matching `FPATH_BUF_SIZE`), fills
//! a [`queue::WorkQueue`] once, and fans the work out across `--threads` worker threads — the main
//! thread itself runs as one of them, exactly as `worker_thread(&queue)` is called directly from
//! `main` after spawning `num_threads - 1` others. Exit codes match spec.md §6 exactly: `0`
//! success, `1` usage/setup/push failure, `2` worker join failure.

mod queue;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Arg, ArgAction, Command};
use log::{debug, error, info};

use queue::WorkQueue;

/// Longest path `-i`/`--input` will accept per line, matching `FPATH_BUF_SIZE` in the original.
const MAX_STDIN_PATH_BYTES: usize = 255;

fn cli() -> Command {
    Command::new("packed12")
        .about("Bit-exact in-place log-encode transform for packed 12-bit image files")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("Read newline-delimited file paths from stdin, in addition to any PATH arguments")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("N")
                .help("Number of worker threads (default: available parallelism)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print per-file progress and a completion percentage")
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("paths").value_name("PATH").num_args(0..).value_parser(clap::value_parser!(PathBuf)))
}

/// Reads newline-delimited paths from stdin (spec.md §6 "max 255 bytes per path"); a path that
/// exceeds the limit is a usage error, matching the original's "File path is too large" rejection.
fn read_paths_from_stdin() -> io::Result<Vec<PathBuf>> {
    let stdin = io::stdin();
    let mut out = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        if line.len() > MAX_STDIN_PATH_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("file path is too large; max path size is {MAX_STDIN_PATH_BYTES} bytes"),
            ));
        }
        out.push(PathBuf::from(line));
    }
    Ok(out)
}

fn worker(queue: &WorkQueue, verbose: bool) {
    while let Some(path) = queue.pop() {
        if verbose {
            info!("* Start processing: {}", path.display());
        }
        if let Err(err) = packed12_driver::transform_file(path) {
            match err.code() {
                -101 => error!("system error while processing {}: {err}", path.display()),
                -102 => error!("unable to process {}: {err}", path.display()),
                code => error!("internal error ({code}) while processing {}: {err}", path.display()),
            }
        }
        if verbose {
            info!("* Finished processing: {}", path.display());
            info!("* Finished: {:.1}%", queue.percentage_claimed());
        }
    }
}

fn run() -> Result<(), ExitCode> {
    let matches = cli().get_matches();

    let verbose = matches.get_flag("verbose");
    env_logger::Builder::from_default_env()
        .filter_level(if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    if verbose {
        info!("* VERBOSE option set");
    }

    let mut paths: Vec<PathBuf> = matches.get_many::<PathBuf>("paths").map(|v| v.cloned().collect()).unwrap_or_default();

    if matches.get_flag("input") {
        if verbose {
            info!("* Reading file paths from STDIN");
        }
        match read_paths_from_stdin() {
            Ok(mut stdin_paths) => paths.append(&mut stdin_paths),
            Err(e) => {
                error!("{e}");
                return Err(ExitCode::from(1));
            }
        }
    }

    if paths.is_empty() {
        error!("no files to process");
        eprintln!("{}", cli().render_usage());
        return Err(ExitCode::from(1));
    }

    let num_threads = matches
        .get_one::<usize>("threads")
        .copied()
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
        .max(1);

    let queue = Arc::new(WorkQueue::new(paths));
    debug!("queued {} files across {num_threads} threads", queue.len());

    let timer = Instant::now();

    let mut handles = Vec::with_capacity(num_threads.saturating_sub(1));
    for _ in 1..num_threads {
        let queue = Arc::clone(&queue);
        handles.push(std::thread::spawn(move || worker(&queue, verbose)));
    }

    worker(&queue, verbose);

    for handle in handles {
        if handle.join().is_err() {
            error!("error while joining a worker thread");
            return Err(ExitCode::from(2));
        }
    }

    info!("processed {} files in {:.3}s", queue.len(), timer.elapsed().as_secs_f64());
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_threads_and_verbose() {
        let m = cli().get_matches_from(["packed12", "-t", "4", "-v", "a.bin", "b.bin"]);
        assert_eq!(m.get_one::<usize>("threads").copied(), Some(4));
        assert!(m.get_flag("verbose"));
        let paths: Vec<_> = m.get_many::<PathBuf>("paths").unwrap().collect();
        assert_eq!(paths, vec![&PathBuf::from("a.bin"), &PathBuf::from("b.bin")]);
    }

    #[test]
    fn cli_defaults_to_no_flags() {
        let m = cli().get_matches_from(["packed12", "a.bin"]);
        assert!(!m.get_flag("verbose"));
        assert!(!m.get_flag("input"));
        assert_eq!(m.get_one::<usize>("threads"), None);
    }
}
