//! Game simulation modules

pub mod color;
pub mod ghost;
pub mod grid;
pub mod history;
pub mod player;
pub mod registry;
pub mod room;

pub use player::{Player, PlayerProfile, ProgressRecord};
pub use registry::{run_room, RoomRegistry};
