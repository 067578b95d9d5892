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

//! psyx: a PlayStation (PSX) core emulator
//!
//! This crate models the heart of the console: a cycle-stepped MIPS R3000A
//! interpreter, a memory-mapped data bus with address mirroring and
//! write-side-effect data ports, the cop0 exception engine, a GPU command
//! front-end, and the scanline scheduler that interleaves them.
//!
//! # Architecture
//!
//! - [`core::cpu`]: MIPS R3000A CPU emulation
//! - [`core::bus`]: data bus, device trait and data ports
//! - [`core::memory`]: RAM and BIOS ROM devices
//! - [`core::interrupt`]: interrupt controller
//! - [`core::dma`]: DMA controller front-end
//! - [`core::timer`]: the three timer channels
//! - [`core::spu`]: SPU register front-end
//! - [`core::gpu`]: GPU command front-end (GP0/GP1)
//! - [`core::board`]: device aggregation, memory map, dump/restore
//! - [`core::scheduler`]: CPU/GPU scanline interleaving
//! - [`core::loader`]: BIOS and PSX-EXE loading
//!
//! # Example
//!
//! ```no_run
//! use psyx::core::board::Board;
//!
//! let mut board = Board::new();
//! // board.load_bios(&bios_bytes)?;
//! // board.run(10_000)?;
//! # Ok::<(), psyx::EmulatorError>(())
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an
//! alias for `Result<T, EmulatorError>`. Conditions belonging to the
//! emulated machine (bus misses, alignment faults, arithmetic overflow)
//! are never host errors: they surface as open-bus reads, dropped writes
//! or cop0 exceptions inside the machine.

pub mod core;

// Re-export commonly used types
pub use core::error::{EmulatorError, Result};
