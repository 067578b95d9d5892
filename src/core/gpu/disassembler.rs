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

//! GPU command naming for diagnostics
//!
//! Maps GP0/GP1 command words to their psx-spx names, used by the
//! controller's command logging. Debug aid only.

/// Name a GP0 (rendering / VRAM access) command word
pub fn gp0_mnemonic(word: u32) -> &'static str {
    match word >> 24 {
        0x00 => "nop",
        0x01 => "clear cache",
        0x02 => "fill rectangle in VRAM",
        0x1F => "interrupt request (IRQ1)",
        0x20..=0x3F => "render polygon",
        0x40..=0x5F => "render line",
        0x60..=0x7F => "render rectangle",
        0x80..=0x9F => "copy rectangle (VRAM to VRAM)",
        0xA0..=0xBF => "copy rectangle (CPU to VRAM)",
        0xC0..=0xDF => "copy rectangle (VRAM to CPU)",
        0xE1 => "draw mode setting",
        0xE2 => "texture window setting",
        0xE3 => "set drawing area top left",
        0xE4 => "set drawing area bottom right",
        0xE5 => "set drawing offset",
        0xE6 => "mask bit setting",
        _ => "unknown",
    }
}

/// Name a GP1 (display control) command word
pub fn gp1_mnemonic(word: u32) -> &'static str {
    match word >> 24 {
        0x00 => "reset GPU",
        0x01 => "reset command buffer",
        0x02 => "acknowledge GPU interrupt (IRQ1)",
        0x03 => "display enable",
        0x04 => "DMA direction / data request",
        0x05 => "start of display area in VRAM",
        0x06 => "horizontal display range",
        0x07 => "vertical display range",
        0x08 => "display mode",
        0x10..=0x1F => "get GPU info",
        _ => "unknown",
    }
}
