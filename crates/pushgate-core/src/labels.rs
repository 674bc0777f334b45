//! Fixed-capacity label tables.
//!
//! A [`LabelSet`] holds up to `N` borrowed `(key, value)` pairs in a
//! contiguous prefix with an explicit length. Keys and values are never
//! copied; the caller keeps them alive for `'a`.

use crate::error::{CapacityExceeded, LabelError};

/// A single `key="value"` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl Label<'static> {
    const EMPTY: Self = Label { key: "", value: "" };
}

impl<'a> Label<'a> {
    pub const fn new(key: &'a str, value: &'a str) -> Self {
        Self { key, value }
    }
}

/// Ordered label table with compile-time capacity `N`.
///
/// Slots `0..len` are occupied, the rest are unused. Insertion order is
/// emission order.
#[derive(Debug, Clone, Copy)]
pub struct LabelSet<'a, const N: usize> {
    slots: [Label<'a>; N],
    len: usize,
}

impl<'a, const N: usize> LabelSet<'a, N> {
    /// An empty table.
    pub const fn new() -> Self {
        Self {
            slots: [Label::EMPTY; N],
            len: 0,
        }
    }

    /// Build a table from `(key, value)` pairs, in order.
    pub fn from_pairs(pairs: &[(&'a str, &'a str)]) -> Result<Self, LabelError> {
        let mut set = Self::new();
        for &(key, value) in pairs {
            set.push(key, value)?;
        }
        Ok(set)
    }

    /// Store a label at `index`.
    ///
    /// Overwrites an occupied slot or appends when `index == len()`. Any other
    /// index is rejected and the table is left untouched.
    pub fn set(&mut self, index: usize, key: &'a str, value: &'a str) -> Result<(), LabelError> {
        if index >= N {
            return Err(self.full().into());
        }
        if index > self.len {
            return Err(LabelError::NonContiguous {
                index,
                len: self.len,
            });
        }
        if key.is_empty() {
            return Err(LabelError::EmptyKey);
        }
        self.slots[index] = Label::new(key, value);
        if index == self.len {
            self.len += 1;
        }
        Ok(())
    }

    /// Append a label after the occupied prefix.
    pub fn push(&mut self, key: &'a str, value: &'a str) -> Result<(), LabelError> {
        self.set(self.len, key, value)
    }

    /// Replace the value of an occupied slot, keeping its key.
    pub fn set_value(&mut self, index: usize, value: &'a str) -> Result<(), LabelError> {
        if index >= N {
            return Err(self.full().into());
        }
        if index >= self.len {
            return Err(LabelError::NonContiguous {
                index,
                len: self.len,
            });
        }
        self.slots[index].value = value;
        Ok(())
    }

    /// Re-derive every value from its key, in table order.
    pub fn refresh_values<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> &'a str,
    {
        for label in &mut self.slots[..self.len] {
            label.value = f(label.key);
        }
    }

    pub fn get(&self, index: usize) -> Option<&Label<'a>> {
        self.as_slice().get(index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// The occupied labels, in insertion order.
    pub fn as_slice(&self) -> &[Label<'a>] {
        &self.slots[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label<'a>> {
        self.as_slice().iter()
    }

    fn full(&self) -> CapacityExceeded {
        CapacityExceeded {
            what: "label set",
            capacity: N,
        }
    }
}

impl<const N: usize> Default for LabelSet<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s, 'a, const N: usize> IntoIterator for &'s LabelSet<'a, N> {
    type Item = &'s Label<'a>;
    type IntoIter = std::slice::Iter<'s, Label<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
