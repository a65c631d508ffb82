//! Item definitions and the static content catalog.
//!
//! Items are referenced everywhere by `ItemId`, an index into [`CATALOG`].
//! Definitions are immutable templates; live state (stack counts, weapon
//! cooldowns) lives in the inventory and combat structures that reference
//! them.

use serde::{Deserialize, Serialize};

pub type ItemId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Weapon,
    Consumable,
    Collectible,
    Material,
    Quest,
}

/// Weapon behavior selector. Dispatch is a `match` on this enum; melee
/// and ranged share the common fields in [`WeaponParams`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeaponKind {
    Melee {
        sweep_duration: f32,
    },
    Ranged {
        projectile_speed: f32,
        projectile_area: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponParams {
    pub damage: i32,
    pub cooldown: f32,
    pub range: f32,
    pub kind: WeaponKind,
}

impl WeaponParams {
    /// Flight time of a ranged weapon's projectile. Always derived from
    /// range and speed, never stored separately.
    pub fn projectile_lifetime(&self) -> Option<f32> {
        match self.kind {
            WeaponKind::Ranged {
                projectile_speed, ..
            } => Some(self.range / projectile_speed),
            WeaponKind::Melee { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: &'static str,
    pub category: ItemCategory,
    pub equippable: bool,
    pub stackable: bool,
    pub max_stack: u32,
    pub weapon: Option<WeaponParams>,
}

pub const SWORD: ItemId = 0;
pub const BOW: ItemId = 1;
pub const LONGBOW: ItemId = 2;
pub const TONIC: ItemId = 3;
pub const SCRAP: ItemId = 4;

pub const CATALOG: &[ItemDef] = &[
    ItemDef {
        id: SWORD,
        name: "Sword",
        category: ItemCategory::Weapon,
        equippable: true,
        stackable: false,
        max_stack: 1,
        weapon: Some(WeaponParams {
            damage: 1,
            cooldown: 0.5,
            range: 80.0,
            kind: WeaponKind::Melee {
                sweep_duration: 0.2,
            },
        }),
    },
    ItemDef {
        id: BOW,
        name: "Bow",
        category: ItemCategory::Weapon,
        equippable: true,
        stackable: false,
        max_stack: 1,
        weapon: Some(WeaponParams {
            damage: 1,
            cooldown: 0.8,
            range: 1500.0,
            kind: WeaponKind::Ranged {
                projectile_speed: 750.0,
                projectile_area: 50.0,
            },
        }),
    },
    ItemDef {
        id: LONGBOW,
        name: "Longbow",
        category: ItemCategory::Weapon,
        equippable: true,
        stackable: false,
        max_stack: 1,
        weapon: Some(WeaponParams {
            damage: 1,
            cooldown: 0.25,
            range: 2000.0,
            kind: WeaponKind::Ranged {
                projectile_speed: 1200.0,
                projectile_area: 15.0,
            },
        }),
    },
    ItemDef {
        id: TONIC,
        name: "Tonic",
        category: ItemCategory::Consumable,
        equippable: false,
        stackable: true,
        max_stack: 5,
        weapon: None,
    },
    ItemDef {
        id: SCRAP,
        name: "Scrap Metal",
        category: ItemCategory::Material,
        equippable: false,
        stackable: true,
        max_stack: 99,
        weapon: None,
    },
];

pub fn item_def(id: ItemId) -> Option<&'static ItemDef> {
    let def = CATALOG.get(id as usize)?;
    debug_assert_eq!(def.id, id);
    Some(def)
}

pub fn item_name(id: ItemId) -> Option<&'static str> {
    item_def(id).map(|def| def.name)
}

pub fn weapon_params(id: ItemId) -> Option<WeaponParams> {
    item_def(id).and_then(|def| def.weapon)
}
