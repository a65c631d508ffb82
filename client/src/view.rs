//! Read-only views a frontend draws from.
//!
//! The HUD projection is rebuilt from replica state on demand. Nothing
//! in here mutates the session; intents go through the session methods
//! instead.

use shared::{item_name, INVENTORY_SLOTS, PLAYER_MAX_HEALTH};

use crate::replica::{ReplicaWorld, SessionStatus};

/// One inventory slot as the HUD shows it. Empty slots stay default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotView {
    pub item_name: Option<&'static str>,
    pub quantity: u32,
    pub equipped: bool,
}

/// Everything the local player's HUD needs for one frame.
#[derive(Debug, Clone)]
pub struct HudView {
    pub health: i32,
    pub max_health: i32,
    pub equipped_item_name: Option<&'static str>,
    pub slots: [SlotView; INVENTORY_SLOTS],
    pub status: SessionStatus,
}

/// Projects the local player's replica into a HUD. Before the local
/// spawn arrives the view is an empty bar with the session status.
pub fn hud_view(replica: &ReplicaWorld, status: &SessionStatus) -> HudView {
    let mut slots = [SlotView::default(); INVENTORY_SLOTS];

    let player = match replica.local_player() {
        Some(player) => player,
        None => {
            return HudView {
                health: 0,
                max_health: PLAYER_MAX_HEALTH,
                equipped_item_name: None,
                slots,
                status: status.clone(),
            }
        }
    };

    for (index, slot) in player.inventory.slots().iter().enumerate() {
        if slot.is_empty() {
            continue;
        }
        slots[index] = SlotView {
            item_name: slot.item.and_then(item_name),
            quantity: slot.quantity,
            equipped: player.inventory.equipped_slot() == Some(index),
        };
    }

    HudView {
        health: player.health,
        max_health: player.max_health,
        equipped_item_name: player.equipped_item().and_then(item_name),
        slots,
        status: status.clone(),
    }
}
