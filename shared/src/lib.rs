pub mod channel;
pub mod combat;
pub mod input;
pub mod inventory;
pub mod items;
pub mod level;
pub mod player;
pub mod protocol;
pub mod vec;
pub mod world;

pub type PeerId = u32;

pub const PROTOCOL_VERSION: u16 = 1;
pub const HOST_PEER_ID: PeerId = 1;
pub const MAX_PEERS: usize = 4;
pub const TICK_RATE: u32 = 60;
pub const PEER_TIMEOUT_SECS: u64 = 5;

pub const GRAVITY: f32 = 980.0;
pub const MOVE_SPEED: f32 = 300.0;
pub const JUMP_VELOCITY: f32 = -750.0;
pub const DASH_SPEED: f32 = 800.0;
pub const DASH_DURATION: f32 = 0.2;
pub const DASH_COOLDOWN: f32 = 0.5;

pub const PLAYER_SIZE: f32 = 32.0;
pub const PLAYER_HALF: f32 = PLAYER_SIZE / 2.0;
pub const PLAYER_MAX_HEALTH: i32 = 5;
pub const DAMAGE_FLASH_DURATION: f32 = 0.3;

pub const WORLD_WIDTH: f32 = 1920.0;
pub const WORLD_HEIGHT: f32 = 1080.0;
pub const HOST_SPAWN_X: f32 = 960.0;
pub const CLIENT_SPAWN_MIN_X: f32 = 400.0;
pub const CLIENT_SPAWN_MAX_X: f32 = 1520.0;
pub const SPAWN_Y: f32 = 300.0;

pub const PROJECTILE_SPAWN_OFFSET: f32 = 60.0;
pub const MELEE_RADIUS_SCALE: f32 = 0.7;

pub use channel::{ReliableChannel, GIVE_UP_AGE, RESEND_INTERVAL};
pub use combat::{EquippedWeapon, MeleeSweep, Projectile};
pub use input::InputSample;
pub use inventory::{Inventory, InventoryOp, InventorySlot, INVENTORY_SLOTS};
pub use items::{
    item_def, item_name, weapon_params, ItemCategory, ItemDef, ItemId, WeaponKind, WeaponParams,
    BOW, LONGBOW, SCRAP, SWORD, TONIC,
};
pub use level::{Level, MoveResult, Rect};
pub use player::{PlayerState, Tuning};
pub use protocol::{
    decode_frame, encode_frame, Frame, Message, PlayerPose, WireError, MAX_DATAGRAM,
};
pub use vec::{move_toward, Vec2};
pub use world::{SimEvent, World};
