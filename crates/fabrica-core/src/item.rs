use serde::{Deserialize, Serialize};

use crate::id::ItemTypeId;

/// A stack of fungible items. `count` is always at least one; an empty
/// slot is represented by [`ItemSlot`] holding `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemTypeId,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: ItemTypeId, count: u32) -> Self {
        Self { item, count }
    }
}

/// A single-item-type machine slot (fuel, input or output).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlot {
    stack: Option<ItemStack>,
}

impl ItemSlot {
    pub fn empty() -> Self {
        Self { stack: None }
    }

    /// A slot pre-filled with `stack`. A zero count yields an empty slot.
    pub fn with(stack: ItemStack) -> Self {
        Self {
            stack: (stack.count > 0).then_some(stack),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_none()
    }

    pub fn stack(&self) -> Option<ItemStack> {
        self.stack
    }

    pub fn item(&self) -> Option<ItemTypeId> {
        self.stack.map(|s| s.item)
    }

    pub fn count(&self) -> u32 {
        self.stack.map_or(0, |s| s.count)
    }

    /// Whether `count` more of `item` would fit under `limit`.
    pub fn has_room_for(&self, item: ItemTypeId, count: u32, limit: u32) -> bool {
        match self.stack {
            None => count <= limit,
            Some(s) => s.item == item && s.count.saturating_add(count) <= limit,
        }
    }

    /// Add items, up to `limit` per slot. Returns the amount that didn't fit
    /// (everything, if the slot holds a different item).
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn insert(&mut self, item: ItemTypeId, count: u32, limit: u32) -> u32 {
        match &mut self.stack {
            Some(s) if s.item != item => count,
            Some(s) => {
                let to_add = count.min(limit.saturating_sub(s.count));
                s.count += to_add;
                count - to_add
            }
            None => {
                let to_add = count.min(limit);
                if to_add > 0 {
                    self.stack = Some(ItemStack::new(item, to_add));
                }
                count - to_add
            }
        }
    }

    /// Remove up to `count` items. Returns what was actually removed; the
    /// slot becomes empty once its count reaches zero.
    #[must_use = "returns the stack actually removed, which may be smaller than requested"]
    pub fn take(&mut self, count: u32) -> Option<ItemStack> {
        let s = self.stack.as_mut()?;
        let taken = count.min(s.count);
        if taken == 0 {
            return None;
        }
        s.count -= taken;
        let item = s.item;
        if s.count == 0 {
            self.stack = None;
        }
        Some(ItemStack::new(item, taken))
    }
}
