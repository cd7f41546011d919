//! Per-identity chain state (spec.md §3 "Chain").

use std::collections::{HashMap, HashSet};

use crate::core::types::{Breadcrumb, CellId, Hash32, IdentityKey};

/// Append-only ordered sequence of breadcrumbs for one identity, with the
/// derived state the Chain Validator and downstream analysis depend on.
/// Created on the first accepted breadcrumb; never truncated.
#[derive(Clone, Debug)]
pub struct Chain {
    pub identity: IdentityKey,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub head_index: Option<u64>,
    pub head_hash: Option<Hash32>,
    pub cell_counts: HashMap<CellId, u32>,
    pub unique_cells: HashSet<CellId>,
    /// Index of the last breadcrumb in each sealed epoch, in order.
    pub epoch_boundaries: Vec<u64>,
}

impl Chain {
    pub fn new(identity: IdentityKey) -> Self {
        Self {
            identity,
            breadcrumbs: Vec::new(),
            head_index: None,
            head_hash: None,
            cell_counts: HashMap::new(),
            unique_cells: HashSet::new(),
            epoch_boundaries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.breadcrumbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breadcrumbs.is_empty()
    }

    pub fn unique_cell_count(&self) -> u64 {
        self.unique_cells.len() as u64
    }

    pub fn first_timestamp(&self) -> Option<u64> {
        self.breadcrumbs.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.breadcrumbs.last().map(|b| b.timestamp)
    }

    /// Record one validated breadcrumb, updating all derived state. The
    /// caller (chain::validator) is responsible for having already
    /// verified it; this method trusts its input.
    pub(crate) fn push_validated(&mut self, breadcrumb: Breadcrumb, block_hash: Hash32) {
        *self.cell_counts.entry(breadcrumb.cell).or_insert(0) += 1;
        self.unique_cells.insert(breadcrumb.cell);
        self.head_index = Some(breadcrumb.index);
        self.head_hash = Some(block_hash);
        self.breadcrumbs.push(breadcrumb);
    }

    pub fn seal_epoch(&mut self, last_index: u64) {
        self.epoch_boundaries.push(last_index);
    }
}
