// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 psyx developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! psyx command line runner
//!
//! Boots a board from a BIOS image, a PSX-EXE (detected by its magic) or
//! a saved board dump, runs it for a tick budget, and optionally dumps
//! the machine on exit.
//!
//! Exit codes: 0 success, 1 missing/unreadable input, 2 load failure,
//! 99 fatal interpreter error.

use clap::Parser;
use psyx::core::board::Board;
use psyx::EmulatorError;
use std::fs;
use std::path::PathBuf;

const EXIT_BAD_INPUT: i32 = 1;
const EXIT_LOAD_FAILURE: i32 = 2;
const EXIT_INTERPRETER_FAULT: i32 = 99;

/// A PlayStation (PSX) core emulator
#[derive(Parser, Debug)]
#[command(name = "psyx", version, about)]
struct Args {
    /// Raise the log level to debug
    #[arg(short, long)]
    verbose: bool,

    /// CPU ticks to run before exiting
    #[arg(long, default_value_t = 10_000)]
    ticks: u64,

    /// Write a board dump next to the input file on exit
    #[arg(long)]
    dump_on_exit: bool,

    /// Treat the input as a board dump instead of a BIOS image
    #[arg(long)]
    restore: bool,

    /// BIOS image, PSX-EXE or board dump
    input: PathBuf,
}

fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    std::process::exit(run(args));
}

fn run(args: Args) -> i32 {
    let data = match fs::read(&args.input) {
        Ok(data) => data,
        Err(err) => {
            log::error!("cannot read {}: {}", args.input.display(), err);
            return EXIT_BAD_INPUT;
        }
    };

    let mut board = Board::new();
    let loaded = if args.restore {
        board.restore(&mut data.as_slice())
    } else if data.starts_with(b"PS-X EXE") {
        board.load_exe(&data).map(|info| {
            log::info!(
                "exe \"{}\": entry {:08x}, {} bytes at {:08x}",
                info.marker,
                info.pc,
                info.exe_size,
                info.load_address
            );
        })
    } else {
        board.load_bios(&data)
    };
    if let Err(err) = loaded {
        log::error!("cannot load {}: {}", args.input.display(), err);
        return EXIT_LOAD_FAILURE;
    }

    let target = board.cpu().ticks() + args.ticks;
    log::info!(
        "running until tick {} (clock starts at {})",
        target,
        board.cpu().ticks()
    );

    if let Err(err) = board.run(target) {
        log::error!("fatal interpreter error: {}", err);
        return EXIT_INTERPRETER_FAULT;
    }

    log::info!("stopped at tick {}", board.cpu().ticks());

    if args.dump_on_exit {
        let mut name = args.input.into_os_string();
        name.push(".dump");
        let path = PathBuf::from(name);
        if let Err(err) = write_dump(&board, &path) {
            log::error!("cannot write dump {}: {}", path.display(), err);
            return EXIT_LOAD_FAILURE;
        }
        log::info!("board dumped to {}", path.display());
    }

    0
}

fn write_dump(board: &Board, path: &PathBuf) -> Result<(), EmulatorError> {
    let mut file = fs::File::create(path)?;
    board.dump(&mut file)
}
