//! Player inventory: 41 slots (hotbar 0..8, main 9..35, armor 36..39,
//! offhand 40) and a minimal crafting table.

pub const INVENTORY_SIZE: usize = 41;
pub const HOTBAR_LEN: u8 = 9;
pub const OFFHAND_SLOT: usize = 40;

pub const EMPTY: ItemStack = ItemStack {
    item_id: 0,
    count: 0,
};

/// One inventory slot. `item_id == 0` means empty regardless of `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemStack {
    pub item_id: u8,
    pub count: u8,
}

impl ItemStack {
    pub fn new(item_id: u8, count: u8) -> Self {
        ItemStack { item_id, count }
    }

    pub fn is_empty(self) -> bool {
        self.item_id == 0 || self.count == 0
    }
}

pub struct PlayerInventory {
    pub slots: [ItemStack; INVENTORY_SIZE],
    pub selected_slot: u8,
}

impl Default for PlayerInventory {
    fn default() -> Self {
        PlayerInventory {
            slots: [ItemStack::default(); INVENTORY_SIZE],
            selected_slot: 0,
        }
    }
}

impl PlayerInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The item in the currently selected hotbar slot.
    pub fn held_item(&self) -> ItemStack {
        self.slots[self.selected_slot as usize]
    }

    pub fn select_slot(&mut self, slot: u8) {
        if slot < HOTBAR_LEN {
            self.selected_slot = slot;
        }
    }

    /// Add `stack` to the first empty or compatible slot. Returns any
    /// remainder that didn't fit (inventory full, or stack overflow past
    /// `max_stack`).
    pub fn add_item(&mut self, mut stack: ItemStack, max_stack: u8) -> ItemStack {
        if stack.is_empty() {
            return EMPTY;
        }

        for slot in self.slots.iter_mut() {
            if slot.item_id == stack.item_id && slot.count < max_stack {
                let room = max_stack - slot.count;
                let moved = room.min(stack.count);
                slot.count += moved;
                stack.count -= moved;
                if stack.count == 0 {
                    return EMPTY;
                }
            }
        }

        for slot in self.slots.iter_mut() {
            if slot.is_empty() {
                *slot = stack;
                return EMPTY;
            }
        }

        stack
    }

    /// Remove up to `count` of `item_id`, draining across slots. Returns
    /// how many were actually removed.
    pub fn take_item(&mut self, item_id: u8, count: u8) -> u8 {
        let mut remaining = count;
        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.item_id == item_id && !slot.is_empty() {
                let taken = slot.count.min(remaining);
                slot.count -= taken;
                remaining -= taken;
                if slot.count == 0 {
                    *slot = EMPTY;
                }
            }
        }
        count - remaining
    }
}

/// A fixed 2x2 crafting recipe: four input item ids (0 = empty slot, in
/// reading order) mapping to one output stack.
#[derive(Debug, Clone, Copy)]
pub struct Recipe {
    pub inputs: [u8; 4],
    pub output: ItemStack,
}

pub struct RecipeBook {
    recipes: Vec<Recipe>,
}

impl Default for RecipeBook {
    fn default() -> Self {
        RecipeBook { recipes: Vec::new() }
    }
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, recipe: Recipe) {
        self.recipes.push(recipe);
    }

    /// Find a recipe whose inputs match the 2x2 grid exactly (order
    /// sensitive, matching the shaped-crafting convention).
    pub fn match_grid(&self, grid: [u8; 4]) -> Option<ItemStack> {
        self.recipes
            .iter()
            .find(|r| r.inputs == grid)
            .map(|r| r.output)
    }
}
