//! Fixed 16-slot inventory with stack-aware placement and equip tracking.
//!
//! Every operation validates its inputs and reports success as a plain
//! `bool`. Failures are expected outcomes (full inventory, bad index,
//! unequippable item) and never panic or raise an error across the wire.

use crate::items::{item_def, ItemId};
use serde::{Deserialize, Serialize};

pub const INVENTORY_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InventorySlot {
    pub item: Option<ItemId>,
    pub quantity: u32,
}

impl InventorySlot {
    pub fn is_empty(&self) -> bool {
        self.item.is_none() || self.quantity == 0
    }

    pub fn clear(&mut self) {
        self.item = None;
        self.quantity = 0;
    }
}

/// A validated inventory mutation, replicated verbatim from the authority
/// to every peer so replicas stay converged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InventoryOp {
    Add { item: ItemId, quantity: u32 },
    Remove { slot: u8, quantity: u32 },
    Move { from: u8, to: u8 },
    Equip { slot: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    slots: [InventorySlot; INVENTORY_SLOTS],
    equipped_slot: Option<usize>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    pub fn new() -> Self {
        Inventory {
            slots: [InventorySlot::default(); INVENTORY_SLOTS],
            equipped_slot: None,
        }
    }

    pub fn slots(&self) -> &[InventorySlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&InventorySlot> {
        self.slots.get(index)
    }

    pub fn equipped_slot(&self) -> Option<usize> {
        self.equipped_slot
    }

    /// Item currently marked as equipped, if the marked slot still holds one.
    pub fn equipped_item(&self) -> Option<ItemId> {
        let slot = self.slots.get(self.equipped_slot?)?;
        if slot.is_empty() {
            None
        } else {
            slot.item
        }
    }

    fn first_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_empty())
    }

    /// Stack-aware placement. Stackable items top up existing stacks of
    /// the same item first; any remainder then goes into the first empty
    /// slot, capped at one full stack, and whatever still does not fit
    /// is dropped. Non-stackables take the first empty slot. Returns
    /// false only when nothing could be placed.
    pub fn add_item(&mut self, item: ItemId, quantity: u32) -> bool {
        let Some(def) = item_def(item) else {
            return false;
        };
        if quantity == 0 {
            return false;
        }

        if !def.stackable {
            return match self.first_empty_slot() {
                Some(index) => {
                    self.slots[index] = InventorySlot {
                        item: Some(item),
                        quantity,
                    };
                    true
                }
                None => false,
            };
        }

        let mut remaining = quantity;

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.item == Some(item) && !slot.is_empty() && slot.quantity < def.max_stack {
                let space = def.max_stack - slot.quantity;
                let moved = space.min(remaining);
                slot.quantity += moved;
                remaining -= moved;
            }
        }

        if remaining > 0 {
            if let Some(index) = self.first_empty_slot() {
                let moved = remaining.min(def.max_stack);
                self.slots[index] = InventorySlot {
                    item: Some(item),
                    quantity: moved,
                };
                remaining -= moved;
            }
        }

        remaining < quantity
    }

    /// Removes up to `quantity` from a slot; the slot clears once its
    /// count reaches zero. Removing from an empty or out-of-range slot
    /// fails.
    pub fn remove_item(&mut self, slot: usize, quantity: u32) -> bool {
        let Some(entry) = self.slots.get_mut(slot) else {
            return false;
        };
        if entry.is_empty() || quantity == 0 {
            return false;
        }

        if quantity >= entry.quantity {
            entry.clear();
            if self.equipped_slot == Some(slot) {
                self.equipped_slot = None;
            }
        } else {
            entry.quantity -= quantity;
        }
        true
    }

    /// Swaps two slots. The equipped marker follows the item it pointed
    /// at. Swapping a slot with itself succeeds without changes.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= INVENTORY_SLOTS || to >= INVENTORY_SLOTS {
            return false;
        }
        if from == to {
            return true;
        }

        self.slots.swap(from, to);
        self.equipped_slot = match self.equipped_slot {
            Some(marked) if marked == from => Some(to),
            Some(marked) if marked == to => Some(from),
            other => other,
        };
        true
    }

    /// Marks a slot as equipped. Fails on out-of-range, empty, or
    /// non-equippable contents. Returns the equipped item on success;
    /// re-equipping the already equipped slot succeeds again.
    pub fn equip_item(&mut self, slot: usize) -> Option<ItemId> {
        let entry = self.slots.get(slot)?;
        if entry.is_empty() {
            return None;
        }
        let item = entry.item?;
        let def = item_def(item)?;
        if !def.equippable {
            return None;
        }

        self.equipped_slot = Some(slot);
        Some(item)
    }

    /// Applies a replicated operation. A false return means this replica
    /// disagrees with the authority about the operation's validity.
    pub fn apply(&mut self, op: InventoryOp) -> bool {
        match op {
            InventoryOp::Add { item, quantity } => self.add_item(item, quantity),
            InventoryOp::Remove { slot, quantity } => self.remove_item(slot as usize, quantity),
            InventoryOp::Move { from, to } => self.move_item(from as usize, to as usize),
            InventoryOp::Equip { slot } => self.equip_item(slot as usize).is_some(),
        }
    }

    /// Replaces the whole inventory with a snapshot, used when joining a
    /// session already in progress.
    pub fn load_state(&mut self, slots: &[InventorySlot], equipped_slot: Option<usize>) {
        for (index, entry) in self.slots.iter_mut().enumerate() {
            *entry = slots.get(index).copied().unwrap_or_default();
        }
        self.equipped_slot = equipped_slot.filter(|slot| *slot < INVENTORY_SLOTS);
    }

    pub fn count_item(&self, item: ItemId) -> u32 {
        self.slots
            .iter()
            .filter(|slot| slot.item == Some(item))
            .map(|slot| slot.quantity)
            .sum()
    }

    pub fn empty_slot_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_empty()).count()
    }

    pub fn is_full(&self) -> bool {
        self.empty_slot_count() == 0
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        self.equipped_slot = None;
    }
}
