//! Assembly buffer for a global array written slot by slot from partitions.
//!
//! Unset slots are `None` rather than a numeric sentinel, so an unwritten
//! entry can never be mistaken for data. [`GlobalField::into_values`] is the
//! only way out and fails while any slot is unset.

use crate::mesh_error::ReconstructionError;

/// Global array under assembly; every slot remembers the partition that wrote it.
#[derive(Clone, Debug)]
pub struct GlobalField<T> {
    what: String,
    slots: Vec<Option<(usize, T)>>,
}

impl<T: Copy> GlobalField<T> {
    /// An array of `len` unset slots; `what` names it in errors.
    pub fn new(what: impl Into<String>, len: usize) -> Self {
        Self {
            what: what.into(),
            slots: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write slot `global` on behalf of `partition`; the slot must be unset.
    pub fn write(&mut self, partition: usize, global: usize, value: T) -> Result<(), ReconstructionError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(global)
            .ok_or_else(|| ReconstructionError::AddressOutOfRange {
                partition,
                what: self.what.clone(),
                address: global,
                len,
            })?;
        if let Some((first, _)) = slot {
            return Err(ReconstructionError::DuplicateCoverage {
                what: self.what.clone(),
                global,
                first: *first,
                second: partition,
            });
        }
        *slot = Some((partition, value));
        Ok(())
    }

    /// Write slot `global` even if already set. Used for edges that lie on a
    /// partition cut, where the later (higher-rank) partition wins.
    pub fn overwrite(&mut self, partition: usize, global: usize, value: T) -> Result<(), ReconstructionError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(global)
            .ok_or_else(|| ReconstructionError::AddressOutOfRange {
                partition,
                what: self.what.clone(),
                address: global,
                len,
            })?;
        *slot = Some((partition, value));
        Ok(())
    }

    /// Writer and value of a slot, if set.
    pub fn get(&self, global: usize) -> Option<(usize, T)> {
        self.slots.get(global).copied().flatten()
    }

    /// Number of unset slots.
    pub fn unset_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Finish assembly, keeping the writer of every slot. Fails with
    /// [`ReconstructionError::IncompleteCoverage`] if any slot was never written.
    pub fn into_entries(self) -> Result<Vec<(usize, T)>, ReconstructionError> {
        let total = self.slots.len();
        let missing = self.unset_count();
        if missing > 0 {
            let first = self.slots.iter().position(Option::is_none).unwrap_or(0);
            return Err(ReconstructionError::IncompleteCoverage {
                what: self.what,
                missing,
                total,
                first,
            });
        }
        Ok(self.slots.into_iter().flatten().collect())
    }

    /// Finish assembly, keeping only the values.
    pub fn into_values(self) -> Result<Vec<T>, ReconstructionError> {
        Ok(self.into_entries()?.into_iter().map(|(_, v)| v).collect())
    }
}
