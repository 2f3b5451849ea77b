use crate::error::{QError, QResult};

// classical dit store of the engine. every dit starts at 0 and is only
// written by measurements.
#[derive(Debug, Clone, Default)]
pub struct DitStore {
    dits: Vec<usize>,
}

impl DitStore {
    pub fn new(n: usize) -> Self {
        DitStore { dits: vec![0; n] }
    }

    fn check_idx(&self, idx: usize) -> QResult<()> {
        if idx < self.dits.len() {
            Ok(())
        } else {
            Err(QError::OutOfRange {
                what: "classical dit",
                index: idx,
                limit: self.dits.len(),
            })
        }
    }

    pub fn get(&self, idx: usize) -> QResult<usize> {
        self.check_idx(idx)?;
        Ok(self.dits[idx])
    }

    pub fn set(&mut self, idx: usize, val: usize) -> QResult<()> {
        self.check_idx(idx)?;
        self.dits[idx] = val;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.dits.iter_mut().for_each(|d| *d = 0);
    }

    pub fn len(&self) -> usize {
        self.dits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dits.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.dits
    }

    // c[n-1] .. c[0], the usual way registers are printed
    pub fn to_bitstring(&self) -> String {
        self.dits.iter().rev().map(|d| d.to_string()).collect()
    }
}
