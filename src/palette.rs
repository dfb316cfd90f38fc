//! Per-category display colors.
//!
//! Colors are drawn from a fixed-seed RNG in ascending category-id order, so
//! the same category set always gets the same colors. When categories are
//! renamed the colors move with them instead of being redrawn.

use rand::{rngs::StdRng, RngExt, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::dataset::{CategoryId, Dataset};

const PALETTE_SEED: u64 = 42;

/// An sRGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Category id -> display color.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryColors {
    colors: BTreeMap<CategoryId, Rgb>,
}

impl CategoryColors {
    /// Assigns a color to every category of the dataset.
    pub fn assign(dataset: &Dataset) -> Self {
        let ids: BTreeSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();
        let mut rng = StdRng::seed_from_u64(PALETTE_SEED);
        let colors = ids
            .into_iter()
            .map(|id| {
                let color = Rgb(
                    rng.random_range(0..=255),
                    rng.random_range(0..=255),
                    rng.random_range(0..=255),
                );
                (id, color)
            })
            .collect();
        Self { colors }
    }

    pub fn get(&self, id: CategoryId) -> Option<Rgb> {
        self.colors.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Moves colors to new keys; all moves happen at once, so swaps work.
    pub(crate) fn rekey(&mut self, renames: &BTreeMap<CategoryId, CategoryId>) {
        let mut moved = BTreeMap::new();
        for (old, new) in renames {
            if let Some(color) = self.colors.remove(old) {
                moved.insert(*new, color);
            }
        }
        self.colors.extend(moved);
    }

    pub(crate) fn remove_all(&mut self, ids: &BTreeSet<CategoryId>) {
        self.colors.retain(|id, _| !ids.contains(id));
    }

    /// Entries in ascending category-id order.
    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, Rgb)> + '_ {
        self.colors.iter().map(|(id, color)| (*id, *color))
    }
}
