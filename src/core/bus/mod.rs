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

//! Data bus, devices and data ports
//!
//! The [`DataBus`] connects the CPU to the board devices. It routes 8-,
//! 16- and 32-bit little-endian accesses to the first connected
//! [`AddressRange`] containing the address; the same device may be
//! connected several times (address mirroring). Unmapped reads answer
//! with [`OPEN_BUS`], unmapped writes are dropped, both with a warning.
//!
//! A device is a contiguous memory range plus an ordered list of
//! non-overlapping [`DataPort`]s. After a write lands in the device
//! memory, the bus invokes the write hook of every touched port, in
//! ascending offset order, with the port's new and old word values.
//!
//! Devices may keep distinct read and write memory halves: the GPU
//! controller uses this to expose GPUREAD/GPUSTAT at the same offsets
//! where GP0/GP1 are written.

mod iomap;

pub use iomap::guess_io_port;

use crate::core::error::{EmulatorError, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// The value returned by an unmapped read, truncated to the access width
pub const OPEN_BUS: u32 = 0xFFFF_FFFF;

/// A half-open `[start, end)` window of the 32-bit address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    pub start: u32,
    pub end: u32,
}

impl AddressRange {
    /// Range from `start` spanning `len` bytes
    pub const fn with_len(start: u32, len: u32) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// True when `addr` falls inside the window
    #[inline(always)]
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Device-relative offset of `addr`
    #[inline(always)]
    pub const fn offset(&self, addr: u32) -> usize {
        (addr - self.start) as usize
    }
}

/// A sub-range of a device with a write-side-effect hook
///
/// Ports are 1, 2 or 4 bytes wide. The bus reports every write touching
/// the port to [`BusDevice::post_write`] as zero-extended 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPort {
    pub offset: usize,
    pub size: usize,
}

impl DataPort {
    pub const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    /// Validate a device's port table
    ///
    /// Ports must be sorted by offset, non-overlapping, and end within the
    /// device memory. Devices call this once at construction, so a broken
    /// layout fails fast instead of corrupting dispatch later.
    ///
    /// # Errors
    ///
    /// [`EmulatorError::PortOverlap`] or [`EmulatorError::PortOutOfRange`].
    pub fn check_layout(ports: &[DataPort], memory: usize) -> Result<()> {
        let mut end = 0usize;
        for port in ports {
            assert!(
                matches!(port.size, 1 | 2 | 4),
                "unsupported port size {}",
                port.size
            );
            if port.offset < end {
                return Err(EmulatorError::PortOverlap {
                    offset: port.offset,
                    end,
                });
            }
            end = port.offset + port.size;
            if end > memory {
                return Err(EmulatorError::PortOutOfRange {
                    offset: port.offset,
                    size: port.size,
                    memory,
                });
            }
        }
        Ok(())
    }
}

/// Interface a device implements to be connectable to a [`DataBus`]
///
/// `readable_memory` and `writable_memory` usually return the same
/// buffer; devices with write-only command ports return distinct halves.
/// `post_write` is called by the bus after the device memory has been
/// updated, once per touched port; the default accepts the write
/// silently.
pub trait BusDevice {
    /// Device name used in bus diagnostics
    fn name(&self) -> &'static str {
        "unknown device"
    }

    /// The memory half reads are served from
    fn readable_memory(&self) -> &[u8];

    /// The memory half writes land in
    fn writable_memory(&mut self) -> &mut [u8];

    /// The device data ports, sorted by offset
    fn ports(&self) -> &[DataPort] {
        &[]
    }

    /// Write hook for the port at `port` in [`BusDevice::ports`]
    ///
    /// `new_value` is read back from the already-updated device memory,
    /// `old_value` is the port's pre-write word; both zero-extended.
    fn post_write(&mut self, port: usize, new_value: u32, old_value: u32) {
        let _ = (port, new_value, old_value);
    }
}

/// Shared handle to a connected device
pub type DeviceHandle = Rc<RefCell<dyn BusDevice>>;

struct DeviceMap {
    range: AddressRange,
    device: DeviceHandle,
}

/// The bus connecting the CPU to the board devices
///
/// # Example
///
/// ```
/// use psyx::core::bus::{AddressRange, DataBus};
/// use psyx::core::memory::Ram;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let ram = Rc::new(RefCell::new(Ram::new()));
/// let mut bus = DataBus::new();
/// bus.connect(AddressRange::with_len(0, Ram::SIZE as u32), ram);
///
/// bus.write32(0x100, 0xDEAD_BEEF);
/// assert_eq!(bus.read32(0x100), 0xDEAD_BEEF);
/// ```
pub struct DataBus {
    devices: Vec<DeviceMap>,
}

impl DataBus {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Connect a device to the bus
    ///
    /// The device is mapped to the given address range. The same device
    /// can be connected multiple times to different ranges; the routing
    /// table is searched in connection order.
    pub fn connect(&mut self, range: AddressRange, device: DeviceHandle) {
        self.devices.push(DeviceMap { range, device });
    }

    pub fn read8(&self, addr: u32) -> u8 {
        self.read_sized(addr, 1) as u8
    }

    pub fn read16(&self, addr: u32) -> u16 {
        self.read_sized(addr, 2) as u16
    }

    pub fn read32(&self, addr: u32) -> u32 {
        self.read_sized(addr, 4)
    }

    pub fn write8(&mut self, addr: u32, val: u8) {
        self.write_sized(addr, 1, val as u32);
    }

    pub fn write16(&mut self, addr: u32, val: u16) {
        self.write_sized(addr, 2, val as u32);
    }

    pub fn write32(&mut self, addr: u32, val: u32) {
        self.write_sized(addr, 4, val);
    }

    fn find(&self, addr: u32) -> Option<&DeviceMap> {
        self.devices.iter().find(|m| m.range.contains(addr))
    }

    fn read_sized(&self, addr: u32, size: usize) -> u32 {
        let Some(map) = self.find(addr) else {
            log::warn!(
                "[BUS] unmapped read of {} bytes at {:08x} ({})",
                size,
                addr,
                guess_io_port(addr)
            );
            return OPEN_BUS;
        };

        let offset = map.range.offset(addr);
        let device = map.device.borrow();
        let memory = device.readable_memory();
        if offset + size > memory.len() {
            log::warn!(
                "[BUS] read of {} bytes at {:08x} overruns device {}",
                size,
                addr,
                device.name()
            );
            return OPEN_BUS;
        }

        let mut bytes = [0u8; 4];
        bytes[..size].copy_from_slice(&memory[offset..offset + size]);
        u32::from_le_bytes(bytes)
    }

    fn write_sized(&mut self, addr: u32, size: usize, val: u32) {
        let Some(map) = self.find(addr) else {
            log::warn!(
                "[BUS] unmapped write of {} bytes at {:08x} ({:08x}) ({})",
                size,
                addr,
                val,
                guess_io_port(addr)
            );
            return;
        };

        let offset = map.range.offset(addr);
        let mut device = map.device.borrow_mut();
        if offset + size > device.readable_memory().len() {
            log::warn!(
                "[BUS] write of {} bytes at {:08x} overruns device {}",
                size,
                addr,
                device.name()
            );
            return;
        }

        // mutate the writable half, keeping the pre-image for the hooks
        let mut pre = [0u8; 4];
        {
            let memory = device.writable_memory();
            pre[..size].copy_from_slice(&memory[offset..offset + size]);
            memory[offset..offset + size].copy_from_slice(&val.to_le_bytes()[..size]);
        }

        self.touch_data_ports(&mut *device, offset, size, &pre);
    }

    /// Fire the write hook of every port intersecting the written window
    ///
    /// Hooks run strictly after the memory mutation, in ascending offset
    /// order. Each port's words are read right before its hook fires, so
    /// a hook that mutates its device is visible to the hooks after it.
    fn touch_data_ports(&self, device: &mut dyn BusDevice, offset: usize, size: usize, pre: &[u8; 4]) {
        for ix in 0..device.ports().len() {
            let port = device.ports()[ix];
            let p_start = port.offset;
            let p_end = port.offset + port.size;
            if p_end <= offset || p_start >= offset + size {
                continue;
            }

            let mut new = [0u8; 4];
            new[..port.size].copy_from_slice(&device.writable_memory()[p_start..p_end]);

            // the old word is the pre-image patched into the port's
            // prior contents: only the physically overwritten bytes differ
            let mut old = new;
            for b in p_start.max(offset)..p_end.min(offset + size) {
                old[b - p_start] = pre[b - offset];
            }

            device.post_write(ix, u32::from_le_bytes(new), u32::from_le_bytes(old));
        }
    }
}

impl Default for DataBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REG1: usize = 0;
    const REG2: usize = 1;
    const REG3: usize = 2;
    const REG4: usize = 3;

    /// Test device with ports {0:4, 4:2, 6:2, 8:4}, recording every hook
    struct Controller {
        memory: [u8; 12],
        writes: Vec<(usize, u32, u32)>,
    }

    impl Controller {
        const PORTS: [DataPort; 4] = [
            DataPort::new(0, 4),
            DataPort::new(4, 2),
            DataPort::new(6, 2),
            DataPort::new(8, 4),
        ];

        fn new() -> Self {
            let mut memory = [0u8; 12];
            for (ix, byte) in memory.iter_mut().enumerate() {
                *byte = ix as u8;
            }
            DataPort::check_layout(&Self::PORTS, memory.len()).unwrap();
            Self {
                memory,
                writes: Vec::new(),
            }
        }
    }

    impl BusDevice for Controller {
        fn name(&self) -> &'static str {
            "test controller"
        }

        fn readable_memory(&self) -> &[u8] {
            &self.memory
        }

        fn writable_memory(&mut self) -> &mut [u8] {
            &mut self.memory
        }

        fn ports(&self) -> &[DataPort] {
            &Self::PORTS
        }

        fn post_write(&mut self, port: usize, new_value: u32, old_value: u32) {
            self.writes.push((port, new_value, old_value));
        }
    }

    /// Plain 10-byte buffer, no ports
    struct Buffer {
        memory: [u8; 10],
    }

    impl BusDevice for Buffer {
        fn readable_memory(&self) -> &[u8] {
            &self.memory
        }

        fn writable_memory(&mut self) -> &mut [u8] {
            &mut self.memory
        }
    }

    const CTRL_ADDR: u32 = 0x1000_0000;
    const CTRL_ALIAS_ADDR: u32 = 0x2000_0000;
    const BUFFER_ADDR: u32 = 0x1000_000C;

    struct TestBoard {
        ctrl: Rc<RefCell<Controller>>,
        bus: DataBus,
    }

    impl TestBoard {
        fn new() -> Self {
            let ctrl = Rc::new(RefCell::new(Controller::new()));
            let mut memory = [0u8; 10];
            for (ix, byte) in memory.iter_mut().enumerate() {
                *byte = 12 + ix as u8;
            }
            let buffer = Rc::new(RefCell::new(Buffer { memory }));

            let mut bus = DataBus::new();
            bus.connect(AddressRange::with_len(CTRL_ADDR, 12), ctrl.clone());
            bus.connect(AddressRange::with_len(CTRL_ALIAS_ADDR, 12), ctrl.clone());
            bus.connect(AddressRange::with_len(BUFFER_ADDR, 10), buffer);

            Self { ctrl, bus }
        }
    }

    #[test]
    fn test_same_location_reads_at_every_width() {
        let board = TestBoard::new();
        assert_eq!(board.bus.read8(CTRL_ADDR), 0x00);
        assert_eq!(board.bus.read16(CTRL_ADDR), 0x0100);
        assert_eq!(board.bus.read32(CTRL_ADDR), 0x0302_0100);
    }

    #[test]
    fn test_unmapped_read_returns_open_bus() {
        let board = TestBoard::new();
        assert_eq!(board.bus.read32(0), 0xFFFF_FFFF);
        assert_eq!(board.bus.read16(0), 0xFFFF);
        assert_eq!(board.bus.read8(0), 0xFF);
    }

    #[test]
    fn test_device_mapped_at_multiple_addresses() {
        let mut board = TestBoard::new();
        assert_eq!(
            board.bus.read32(CTRL_ADDR),
            board.bus.read32(CTRL_ALIAS_ADDR)
        );

        board.bus.write32(CTRL_ADDR, 0xFFFF_FFFF);
        assert_eq!(board.bus.read32(CTRL_ALIAS_ADDR), 0xFFFF_FFFF);
    }

    #[test]
    fn test_reads_ignore_the_port_layout() {
        let board = TestBoard::new();
        // a whole port
        assert_eq!(board.bus.read16(CTRL_ADDR + 4), 0x0504);
        // part of a port
        assert_eq!(board.bus.read8(CTRL_ADDR + 4), 0x04);
        // two ports at once
        assert_eq!(board.bus.read32(CTRL_ADDR + 4), 0x0706_0504);
        // across port boundaries
        assert_eq!(board.bus.read32(CTRL_ADDR + 3), 0x0605_0403);
    }

    #[test]
    fn test_same_location_writes_at_every_width() {
        let mut board = TestBoard::new();

        board.bus.write8(CTRL_ADDR, 0xFF);
        assert_eq!(board.bus.read32(CTRL_ADDR), 0x0302_01FF);

        board.bus.write16(CTRL_ADDR, 0xFFFF);
        assert_eq!(board.bus.read32(CTRL_ADDR), 0x0302_FFFF);

        board.bus.write32(CTRL_ADDR, 0xFFFF_FFFF);
        assert_eq!(board.bus.read32(CTRL_ADDR), 0xFFFF_FFFF);
    }

    #[test]
    fn test_unmapped_write_is_a_noop() {
        let mut board = TestBoard::new();
        board.bus.write32(0, 0x0000_0000);
        assert_eq!(board.bus.read32(0), 0xFFFF_FFFF);
    }

    #[test]
    fn test_port_write_invokes_the_hook() {
        let mut board = TestBoard::new();

        board.bus.write16(CTRL_ADDR + 6, 0xAA00);
        {
            let ctrl = board.ctrl.borrow();
            assert_eq!(ctrl.writes.len(), 1);
            assert_eq!(ctrl.writes[0], (REG3, 0xAA00, 0x0706));
        }

        board.bus.write16(CTRL_ADDR + 6, 0xAA01);
        let ctrl = board.ctrl.borrow();
        assert_eq!(ctrl.writes.len(), 2);
        assert_eq!(ctrl.writes[1], (REG3, 0xAA01, 0xAA00));
    }

    #[test]
    fn test_write_spanning_ports_fans_out_in_offset_order() {
        let mut board = TestBoard::new();

        // bring reg3 to a known state first (bytes 6..8 = 01 AA)
        board.bus.write16(CTRL_ADDR + 6, 0xAA00);
        board.bus.write16(CTRL_ADDR + 6, 0xAA01);
        board.ctrl.borrow_mut().writes.clear();

        // touches bytes 3..7: reg1, reg2 and reg3, but not reg4
        board.bus.write32(CTRL_ADDR + 3, 0xDEAD_BEEF);

        let ctrl = board.ctrl.borrow();
        let touched: Vec<usize> = ctrl.writes.iter().map(|w| w.0).collect();
        assert_eq!(touched, vec![REG1, REG2, REG3]);

        // new values come from the mutated memory, old values differ only
        // in the bytes the write physically changed
        assert_eq!(ctrl.writes[0], (REG1, 0xEF02_0100, 0x0302_0100));
        assert_eq!(ctrl.writes[1], (REG2, 0xADBE, 0x0504));
        assert_eq!(ctrl.writes[2], (REG3, 0xAADE, 0xAA01));
        assert!(!touched.contains(&REG4));
    }

    #[test]
    fn test_port_words_are_zero_extended() {
        let mut board = TestBoard::new();
        board.bus.write8(CTRL_ADDR + 4, 0x80);

        // the full 2-byte port is reported, high word clear; the old
        // word differs only in the single written byte
        let ctrl = board.ctrl.borrow();
        assert_eq!(ctrl.writes.last().unwrap(), &(REG2, 0x0580, 0x0504));
    }

    #[test]
    fn test_port_layout_validation() {
        // sorted and in range
        let good = [DataPort::new(0, 4), DataPort::new(4, 2), DataPort::new(6, 2)];
        assert!(DataPort::check_layout(&good, 8).is_ok());

        // overlapping
        let overlap = [DataPort::new(0, 4), DataPort::new(2, 2)];
        assert!(matches!(
            DataPort::check_layout(&overlap, 8),
            Err(EmulatorError::PortOverlap { offset: 2, end: 4 })
        ));

        // out of order counts as overlap
        let unsorted = [DataPort::new(4, 2), DataPort::new(0, 4)];
        assert!(DataPort::check_layout(&unsorted, 8).is_err());

        // past the end of the device memory
        let outside = [DataPort::new(6, 4)];
        assert!(matches!(
            DataPort::check_layout(&outside, 8),
            Err(EmulatorError::PortOutOfRange { .. })
        ));
    }

    #[test]
    fn test_read_overrunning_a_device_returns_open_bus() {
        let board = TestBoard::new();
        // buffer is 10 bytes; a 4-byte read at offset 8 overruns it
        assert_eq!(board.bus.read32(BUFFER_ADDR + 8), 0xFFFF_FFFF);
    }
}
