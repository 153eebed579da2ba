//! Per-function bit assignment

use crate::errors::{InvariantViolation, Result};
use crate::shared::models::{FunctionId, InstId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Unsafe call sites of one function and the flag bits they use.
///
/// Bits are dense: the `n`-th distinct call site registered gets bit `n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDomainRecord {
    pub function: FunctionId,
    /// Call sites in bit order (`call_sites[b]` owns bit `b`)
    call_sites: Vec<InstId>,
    /// Bits in the callee's record this call site must assert
    arg_bits: BTreeMap<InstId, BTreeSet<u32>>,
}

impl FunctionDomainRecord {
    pub fn new(function: FunctionId) -> Self {
        Self {
            function,
            call_sites: Vec::new(),
            arg_bits: BTreeMap::new(),
        }
    }

    /// Bit of `call_site`, assigning the next free one on first sight
    pub fn assign(&mut self, call_site: InstId, max_bits: u32) -> Result<u32> {
        if let Some(bit) = self.bit(call_site) {
            return Ok(bit);
        }
        let next = self.call_sites.len() as u32;
        if next >= max_bits {
            return Err(InvariantViolation::FlagBitsExhausted {
                function: self.function,
                max: max_bits,
            }
            .into());
        }
        self.call_sites.push(call_site);
        Ok(next)
    }

    pub fn bit(&self, call_site: InstId) -> Option<u32> {
        self.call_sites
            .iter()
            .position(|&cs| cs == call_site)
            .map(|b| b as u32)
    }

    pub fn add_arg_bit(&mut self, call_site: InstId, bit: u32) {
        self.arg_bits.entry(call_site).or_default().insert(bit);
    }

    pub fn arg_bits(&self, call_site: InstId) -> impl Iterator<Item = u32> + '_ {
        self.arg_bits.get(&call_site).into_iter().flatten().copied()
    }

    /// OR of the argument bits as a flag value
    pub fn arg_mask(&self, call_site: InstId) -> u64 {
        self.arg_bits(call_site).fold(0, |mask, bit| mask | (1u64 << bit))
    }

    /// `(call_site, bit)` pairs in bit order
    pub fn call_sites(&self) -> impl Iterator<Item = (InstId, u32)> + '_ {
        self.call_sites
            .iter()
            .enumerate()
            .map(|(bit, &cs)| (cs, bit as u32))
    }

    pub fn contains(&self, call_site: InstId) -> bool {
        self.call_sites.contains(&call_site)
    }

    pub fn len(&self) -> usize {
        self.call_sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.call_sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_are_dense_and_stable() {
        let mut record = FunctionDomainRecord::new(FunctionId(1));
        assert_eq!(record.assign(InstId(10), 64).unwrap(), 0);
        assert_eq!(record.assign(InstId(20), 64).unwrap(), 1);
        assert_eq!(record.assign(InstId(10), 64).unwrap(), 0);
        assert_eq!(record.assign(InstId(30), 64).unwrap(), 2);

        let pairs: Vec<_> = record.call_sites().collect();
        assert_eq!(pairs, vec![(InstId(10), 0), (InstId(20), 1), (InstId(30), 2)]);
    }

    #[test]
    fn test_exhaustion() {
        let mut record = FunctionDomainRecord::new(FunctionId(1));
        record.assign(InstId(1), 2).unwrap();
        record.assign(InstId(2), 2).unwrap();
        // Re-registering an existing call site never exhausts.
        assert_eq!(record.assign(InstId(2), 2).unwrap(), 1);
        let err = record.assign(InstId(3), 2).unwrap_err();
        assert!(err.to_string().contains("more than 2 flag bits"));
    }

    #[test]
    fn test_arg_mask_accumulates() {
        let mut record = FunctionDomainRecord::new(FunctionId(1));
        record.add_arg_bit(InstId(5), 0);
        record.add_arg_bit(InstId(5), 3);
        record.add_arg_bit(InstId(5), 0);
        assert_eq!(record.arg_mask(InstId(5)), 0b1001);
        assert_eq!(record.arg_mask(InstId(6)), 0);
    }

    #[test]
    fn test_top_bit() {
        let mut record = FunctionDomainRecord::new(FunctionId(1));
        record.add_arg_bit(InstId(5), 63);
        assert_eq!(record.arg_mask(InstId(5)), 1u64 << 63);
    }
}
