// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A deterministic RNG for tests, cycling through a fixed byte sequence

use rand::{CryptoRng, Error, RngCore};

/// A fake RNG which repeats the given sequence of bytes forever. With a
/// single zero byte it acts as an all-zero randomness source.
pub struct CycleRng {
    values: Vec<u8>,
    index: usize,
}

impl CycleRng {
    pub fn new(values: Vec<u8>) -> Self {
        assert!(!values.is_empty());
        Self { values, index: 0 }
    }
}

impl RngCore for CycleRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest.iter_mut() {
            *byte = self.values[self.index];
            self.index = (self.index + 1) % self.values.len();
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for CycleRng {}
