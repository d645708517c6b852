//! [`ControllerRegistry`] – known controllers and the authority holder.
//!
//! The holder is stored once, separately from the entry list, and each
//! entry's `is_authorized` flag is derived from it.  Two simultaneous holders
//! therefore cannot be represented.

use helm_types::{ControllerId, ControllerState, ControllerStatus};
use tracing::{debug, info};

/// Registered controllers in first-seen order, plus the current holder.
///
/// # Example
///
/// ```
/// use helm_kernel::ControllerRegistry;
/// use helm_types::ControllerId;
///
/// let roc1: ControllerId = "ROC_1".parse().unwrap();
/// let roc2: ControllerId = "ROC_2".parse().unwrap();
///
/// let mut reg = ControllerRegistry::new(roc1.clone());
/// assert!(reg.is_holder(&roc1));
///
/// reg.transfer_to(roc2.clone());
/// assert!(reg.is_holder(&roc2));
/// assert_eq!(reg.statuses().iter().filter(|s| s.is_authorized).count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ControllerRegistry {
    holder: ControllerId,
    entries: Vec<(ControllerId, ControllerState)>,
}

impl ControllerRegistry {
    /// A registry whose only entry is `holder`, which holds authority.
    pub fn new(holder: ControllerId) -> Self {
        Self {
            entries: vec![(holder.clone(), ControllerState::default())],
            holder,
        }
    }

    pub fn holder(&self) -> &ControllerId {
        &self.holder
    }

    pub fn is_holder(&self, id: &ControllerId) -> bool {
        &self.holder == id
    }

    pub fn contains(&self, id: &ControllerId) -> bool {
        self.entries.iter().any(|(known, _)| known == id)
    }

    /// Register `id` as a monitoring, unauthorized controller.  Returns
    /// `true` when the id was not known before.
    pub fn ensure_registered(&mut self, id: &ControllerId) -> bool {
        if self.contains(id) {
            return false;
        }
        debug!(controller = %id, "controller registered");
        self.entries.push((id.clone(), ControllerState::default()));
        true
    }

    /// Hand authority to `id`, registering it first if needed.  Returns the
    /// previous holder.
    pub fn transfer_to(&mut self, id: ControllerId) -> ControllerId {
        self.ensure_registered(&id);
        let previous = std::mem::replace(&mut self.holder, id);
        info!(from = %previous, to = %self.holder, "authority transferred");
        previous
    }

    /// Snapshot for `roc_status` telemetry.
    pub fn statuses(&self) -> Vec<ControllerStatus> {
        self.entries
            .iter()
            .map(|(id, state)| ControllerStatus {
                id: id.clone(),
                state: *state,
                is_authorized: self.is_holder(id),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
