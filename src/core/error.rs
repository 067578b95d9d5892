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

//! Crate-wide error type
//!
//! There are three families of failures:
//!
//! - **Invariant violations** (`InvalidMask`, `PortOverlap`,
//!   `PortOutOfRange`): raised at construction time, before the machine
//!   runs. They indicate a bug in a device definition and fail fast.
//! - **Resource exhaustion** (`FifoFull`, `FifoEmpty`): returned to the
//!   caller; the GPU front-end logs and drops the overflowing command.
//! - **Host-side failures** (`BiosImage`, `ExeImage`,
//!   `UnsupportedRevision`, `Io`, `UnimplementedCop`): load/dump problems
//!   and the one fatal interpreter path. These abort the process with a
//!   diagnostic in the CLI.
//!
//! Conditions of the *emulated* machine (unmapped bus accesses, alignment
//! faults, arithmetic overflow) are deliberately absent: the bus answers
//! with open-bus values or dropped writes, the CPU raises cop0 exceptions.

use thiserror::Error;

/// Emulator error type
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// A bit mask must contain exactly one contiguous run of 1-bits
    #[error("invalid bit mask 0x{mask:08X}: empty or non-contiguous")]
    InvalidMask { mask: u32 },

    /// A data port overlaps the port that precedes it
    #[error("data port at offset {offset} overlaps the previous port ending at {end}")]
    PortOverlap { offset: usize, end: usize },

    /// A data port extends beyond the device memory
    #[error("data port [{offset}..{offset}+{size}) lies outside the {memory}-byte device memory")]
    PortOutOfRange {
        offset: usize,
        size: usize,
        memory: usize,
    },

    /// Push on a full FIFO
    #[error("fifo full")]
    FifoFull,

    /// Pop from an empty FIFO
    #[error("fifo empty")]
    FifoEmpty,

    /// Dump file written by an incompatible board revision
    #[error("unsupported dump revision 0x{found:04X} (expected 0x{expected:04X})")]
    UnsupportedRevision { found: u16, expected: u16 },

    /// BIOS image with the wrong size
    #[error("BIOS image must be {expected} bytes, got {found}")]
    BiosImage { found: usize, expected: usize },

    /// Malformed or truncated PSX-EXE image
    #[error("malformed PSX-EXE image: {0}")]
    ExeImage(String),

    /// Truncated dump file
    #[error("truncated dump file: {0}")]
    TruncatedDump(&'static str),

    /// Coprocessor control command the interpreter does not implement
    ///
    /// This is the one fatal interpreter error: regular unknown opcodes
    /// raise the Ri exception inside the machine instead.
    #[error("unimplemented coprocessor command 0x{command:07X} at pc=0x{pc:08X}")]
    UnimplementedCop { command: u32, pc: u32 },

    /// Host I/O failure during load or dump
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EmulatorError>;
