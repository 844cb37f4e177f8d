use log::trace;

use crate::error::{Error, Result};

/// Zero-initialised, auto-extending machine memory.
///
/// Every non-negative address is valid. Addresses past the end of the backing
/// buffer read as 0, and writing to them grows the buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<i64>,
}

impl Memory {
    pub fn new(code: Vec<i64>) -> Self {
        Memory { cells: code }
    }

    fn index(addr: i64) -> Result<usize> {
        usize::try_from(addr).map_err(|_| Error::InvalidAddress(addr))
    }

    pub fn fetch(&self, addr: i64) -> Result<i64> {
        let idx = Self::index(addr)?;
        Ok(self.cells.get(idx).copied().unwrap_or(0))
    }

    pub fn store(&mut self, addr: i64, val: i64) -> Result<()> {
        let idx = Self::index(addr)?;
        trace!("Write[{}]={}", idx, val);
        if self.cells.len() <= idx {
            let extra = idx + 1 - self.cells.len();
            self.cells
                .try_reserve(extra)
                .map_err(|_| Error::OutOfMemory(addr))?;
            self.cells.resize(idx + 1, 0);
        }
        self.cells[idx] = val;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }
}

impl From<Vec<i64>> for Memory {
    fn from(code: Vec<i64>) -> Self {
        Memory::new(code)
    }
}
