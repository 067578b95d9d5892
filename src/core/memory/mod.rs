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

//! RAM and BIOS ROM devices
//!
//! Plain memory devices with no data ports. Main RAM is 2 MiB, the BIOS
//! ROM 512 KiB; the board maps both into the KUSEG, KSEG0 and KSEG1
//! windows. The reset vector 0x1FC00000 points at the first ROM word.

use crate::core::bus::BusDevice;

/// Main RAM (2 MiB)
pub struct Ram {
    memory: Vec<u8>,
}

impl Ram {
    pub const SIZE: usize = 2 * 1024 * 1024;

    pub fn new() -> Self {
        Self {
            memory: vec![0u8; Self::SIZE],
        }
    }

    /// Direct access for the loader and dump/restore
    pub fn bytes(&self) -> &[u8] {
        &self.memory
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

impl BusDevice for Ram {
    fn name(&self) -> &'static str {
        "RAM"
    }

    fn readable_memory(&self) -> &[u8] {
        &self.memory
    }

    fn writable_memory(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

/// BIOS ROM (512 KiB)
///
/// Connected to the bus like any other device; the loader is the only
/// component meant to fill it.
pub struct Rom {
    memory: Vec<u8>,
}

impl Rom {
    pub const SIZE: usize = 512 * 1024;

    pub fn new() -> Self {
        Self {
            memory: vec![0u8; Self::SIZE],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.memory
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

impl BusDevice for Rom {
    fn name(&self) -> &'static str {
        "ROM"
    }

    fn readable_memory(&self) -> &[u8] {
        &self.memory
    }

    fn writable_memory(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

impl Default for Rom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_the_memory_map() {
        assert_eq!(Ram::new().bytes().len(), 2 * 1024 * 1024);
        assert_eq!(Rom::new().bytes().len(), 512 * 1024);
    }

    #[test]
    fn test_memory_starts_zeroed() {
        let ram = Ram::new();
        assert!(ram.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_no_data_ports() {
        assert!(Ram::new().ports().is_empty());
        assert!(Rom::new().ports().is_empty());
    }
}
