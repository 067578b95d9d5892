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

//! Core emulation components

pub mod bitmask;
pub mod board;
pub mod bus;
pub mod cpu;
pub mod dma;
pub mod error;
pub mod fifo;
pub mod gpu;
pub mod interrupt;
pub mod loader;
pub mod memory;
pub mod scheduler;
pub mod spu;
pub mod timer;
