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

//! BIOS and PSX-EXE loading
//!
//! A BIOS image is copied verbatim into ROM; the reset vector points at
//! its first word. A PSX-EXE is parsed (little-endian header below),
//! placed into RAM, and started through a small synthesized boot stub
//! stamped into ROM:
//!
//! ```text
//! 0x000  "PS-X EXE"        0x01C  exe size (multiple of 2048)
//! 0x010  initial PC        0x028  memfill start (zero-fill)
//! 0x014  initial GP (r28)  0x02C  memfill size
//! 0x018  load address      0x030  SP/FP base
//!                          0x034  SP/FP offset
//! 0x04C  ASCII marker      0x800  code image
//! ```

use crate::core::error::{EmulatorError, Result};
use crate::core::memory::{Ram, Rom};

/// Byte offset of the code image inside a PSX-EXE file
const EXE_CODE_OFFSET: usize = 0x800;

/// ROM offset where the boot stub expects its three argument words
const EXE_ARGS_OFFSET: usize = 0x1000;

/// A minimal BIOS used to start an EXE
///
/// Expects three words at 0x1FC01000: the initial GP, the initial
/// SP/FP, and the entry PC. Loads them and jumps.
const EXE_BOOT_STUB: [u32; 8] = [
    0x3C08_1FC0, // lui t0, 0x1fc0
    0x3508_1000, // ori t0, t0, 0x1000
    0x8D1C_0000, // lw gp, 0x0(t0)
    0x8D1D_0004, // lw sp, 0x4(t0)
    0x8D1E_0004, // lw fp, 0x4(t0)
    0x8D09_0008, // lw t1, 0x8(t0)
    0x0120_0008, // jr t1
    0x0000_0000, // nop (delay slot)
];

/// What the loader derived from a PSX-EXE header
#[derive(Debug, Clone)]
pub struct ExeInfo {
    pub pc: u32,
    pub gp: u32,
    pub sp: u32,
    pub load_address: u32,
    pub exe_size: u32,
    pub marker: String,
}

/// Load a BIOS image into ROM
///
/// The blob is copied as-is; no parsing is performed.
///
/// # Errors
///
/// [`EmulatorError::BiosImage`] unless the image is exactly ROM-sized.
pub fn load_bios(data: &[u8], rom: &mut Rom) -> Result<()> {
    if data.len() != Rom::SIZE {
        return Err(EmulatorError::BiosImage {
            found: data.len(),
            expected: Rom::SIZE,
        });
    }
    rom.bytes_mut().copy_from_slice(data);
    log::info!("BIOS image loaded ({} bytes)", data.len());
    Ok(())
}

fn header_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// RAM offset of a KUSEG/KSEG0/KSEG1 address
fn ram_offset(addr: u32) -> usize {
    (addr as usize) & (Ram::SIZE - 1)
}

/// Load a PSX-EXE into RAM and stamp the boot stub into ROM
///
/// The load runs in three steps: zero the requested memfill window,
/// copy the code image to its load address, then install the stub that
/// materialises GP/SP/FP/PC and jumps to the entry point.
///
/// # Errors
///
/// [`EmulatorError::ExeImage`] for truncated files or images that do
/// not fit in RAM.
pub fn load_exe(data: &[u8], ram: &mut Ram, rom: &mut Rom) -> Result<ExeInfo> {
    if data.len() < EXE_CODE_OFFSET {
        return Err(EmulatorError::ExeImage(format!(
            "file too short for a header: {} bytes",
            data.len()
        )));
    }

    // no validation beyond the magic, just diagnostics to ease debugging
    if &data[0..8] != b"PS-X EXE" {
        log::warn!("header magic string not found, loading anyway");
    }

    let pc = header_u32(data, 0x10);
    let gp = header_u32(data, 0x14);
    let load_address = header_u32(data, 0x18);
    let exe_size = header_u32(data, 0x1C);
    let memfill_start = header_u32(data, 0x28);
    let memfill_size = header_u32(data, 0x2C);
    let sp_base = header_u32(data, 0x30);
    let sp_offset = header_u32(data, 0x34);
    let sp = sp_base.wrapping_add(sp_offset);

    let marker: String = data[0x4C..0x4C + 56]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect();

    log::trace!(
        "exe header PC={:08x} GP={:08x} SP/FP=({:08x} + {:08x})",
        pc,
        gp,
        sp_base,
        sp_offset
    );
    log::trace!("exe header ZEROFILL={:08x}#{}", memfill_start, memfill_size);
    if exe_size % 2048 != 0 {
        log::warn!("exe size should be a multiple of 2048, it is {}", exe_size);
    }

    if memfill_start != 0 && memfill_size != 0 {
        let start = ram_offset(memfill_start);
        let end = start + memfill_size as usize;
        if end > Ram::SIZE {
            return Err(EmulatorError::ExeImage(format!(
                "memfill window {:08x}#{} leaves RAM",
                memfill_start, memfill_size
            )));
        }
        ram.bytes_mut()[start..end].fill(0);
    }

    let code_end = EXE_CODE_OFFSET + exe_size as usize;
    if data.len() < code_end {
        return Err(EmulatorError::ExeImage(format!(
            "code image truncated: {} bytes of {}",
            data.len() - EXE_CODE_OFFSET,
            exe_size
        )));
    }
    let dest = ram_offset(load_address);
    if dest + exe_size as usize > Ram::SIZE {
        return Err(EmulatorError::ExeImage(format!(
            "code image {:08x}#{} leaves RAM",
            load_address, exe_size
        )));
    }
    ram.bytes_mut()[dest..dest + exe_size as usize]
        .copy_from_slice(&data[EXE_CODE_OFFSET..code_end]);

    log::info!(
        "loading {} bytes at address {:08x}, exe from \"{}\"",
        exe_size,
        load_address,
        marker
    );

    // the stub boots the image: code at the reset vector, arguments at
    // the fixed offset it reads them from
    for (ix, word) in EXE_BOOT_STUB.iter().enumerate() {
        rom.bytes_mut()[ix * 4..ix * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }
    for (ix, word) in [gp, sp, pc].iter().enumerate() {
        let at = EXE_ARGS_OFFSET + ix * 4;
        rom.bytes_mut()[at..at + 4].copy_from_slice(&word.to_le_bytes());
    }

    Ok(ExeInfo {
        pc,
        gp,
        sp,
        load_address,
        exe_size,
        marker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::Board;

    fn sample_exe() -> Vec<u8> {
        let mut exe = vec![0u8; EXE_CODE_OFFSET + 2048];
        exe[0..8].copy_from_slice(b"PS-X EXE");
        exe[0x10..0x14].copy_from_slice(&0x8001_0000u32.to_le_bytes()); // pc
        exe[0x14..0x18].copy_from_slice(&0x8001_F000u32.to_le_bytes()); // gp
        exe[0x18..0x1C].copy_from_slice(&0x8001_0000u32.to_le_bytes()); // load address
        exe[0x1C..0x20].copy_from_slice(&2048u32.to_le_bytes()); // exe size
        exe[0x28..0x2C].copy_from_slice(&0x8002_0000u32.to_le_bytes()); // memfill start
        exe[0x2C..0x30].copy_from_slice(&256u32.to_le_bytes()); // memfill size
        exe[0x30..0x34].copy_from_slice(&0x801F_FF00u32.to_le_bytes()); // sp base
        exe[0x34..0x38].copy_from_slice(&0x0000_0100u32.to_le_bytes()); // sp offset
        exe[0x4C..0x52].copy_from_slice(b"sample");

        // entry code: ori r2, r0, 0x42
        exe[EXE_CODE_OFFSET..EXE_CODE_OFFSET + 4].copy_from_slice(&0x3402_0042u32.to_le_bytes());
        exe
    }

    #[test]
    fn test_bios_must_be_rom_sized() {
        let mut rom = Rom::new();
        assert!(matches!(
            load_bios(&[0u8; 16], &mut rom),
            Err(EmulatorError::BiosImage {
                found: 16,
                expected: Rom::SIZE,
            })
        ));

        let image = vec![0xA5u8; Rom::SIZE];
        load_bios(&image, &mut rom).unwrap();
        assert_eq!(rom.bytes()[0], 0xA5);
        assert_eq!(rom.bytes()[Rom::SIZE - 1], 0xA5);
    }

    #[test]
    fn test_exe_lands_in_ram_with_the_stub_in_rom() {
        let mut ram = Ram::new();
        let mut rom = Rom::new();

        // dirty the memfill window first
        ram.bytes_mut()[0x20000] = 0xFF;

        let info = load_exe(&sample_exe(), &mut ram, &mut rom).unwrap();
        assert_eq!(info.pc, 0x8001_0000);
        assert_eq!(info.sp, 0x8020_0000);
        assert_eq!(info.marker, "sample");

        // code copied, memfill zeroed
        assert_eq!(
            u32::from_le_bytes(ram.bytes()[0x10000..0x10004].try_into().unwrap()),
            0x3402_0042
        );
        assert_eq!(ram.bytes()[0x20000], 0);

        // the stub sits at the reset vector, its arguments at 0x1000
        assert_eq!(
            u32::from_le_bytes(rom.bytes()[0..4].try_into().unwrap()),
            EXE_BOOT_STUB[0]
        );
        assert_eq!(
            u32::from_le_bytes(rom.bytes()[0x1008..0x100C].try_into().unwrap()),
            0x8001_0000
        );
    }

    #[test]
    fn test_truncated_exe_is_rejected() {
        let mut ram = Ram::new();
        let mut rom = Rom::new();

        assert!(load_exe(&[0u8; 64], &mut ram, &mut rom).is_err());

        let mut short = sample_exe();
        short.truncate(EXE_CODE_OFFSET + 100);
        assert!(matches!(
            load_exe(&short, &mut ram, &mut rom),
            Err(EmulatorError::ExeImage(_))
        ));
    }

    #[test]
    fn test_loaded_exe_boots_through_the_stub() {
        let mut board = Board::new();
        board.load_exe(&sample_exe()).unwrap();

        board.run(30).unwrap();
        assert_eq!(board.cpu().reg(28), 0x8001_F000, "gp");
        assert_eq!(board.cpu().reg(29), 0x8020_0000, "sp");
        assert_eq!(board.cpu().reg(30), 0x8020_0000, "fp");
        assert_eq!(board.cpu().reg(2), 0x42, "the entry code ran");
    }
}
