use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hood_engine::content::write_file_atomic;
use hood_engine::hash::sha256_hex;
use hood_engine::module::{create_child, leave_module, module_ref, spawn_module, update_child};
use hood_engine::resource::ResourceHandle;
use hood_engine::scene::{
    add_hotspot, insert_player, insert_sprite, player_position, scene_mut, send_to_self,
    set_message_list, set_message_list2, spawn_scene,
};
use hood_engine::sprite::{
    current_state, finish_state, goto_state, move_by_frame_delta, move_horizontally,
    pick_weighted, set_cleanup, set_next_state, sprite_mut, sprite_ref, start_animation,
    start_animation_range, stop_animation, FidgetTimer, IdleEntry, IdleTable,
};
use hood_engine::{
    format_hash, name_hash, opcode, AnimatedSprite, AnimationEnd, ChildSpec, EntityId,
    EntityWorld, Message, Module, ModuleClass, ModuleTable, Point, RandomSource, Rect,
    ResourceFacade, SavedVar, Scene, SceneClass, SceneData, Services, SpriteClass,
    StateBehavior, TransitionArm, VariableStore,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

include!("klayman.rs");
include!("hall.rs");
include!("cutscene.rs");
include!("modules.rs");
include!("game_module.rs");
include!("save.rs");

/// Builds the entity world with the root GameModule already running
/// `start`.
pub(crate) fn build_world(
    resources: Box<dyn ResourceFacade>,
    rng: Box<dyn RandomSource>,
    content: GameContent,
    start: ModuleId,
) -> (EntityWorld, EntityId) {
    let mut world = EntityWorld::new(Services::new(resources, rng));
    let root = spawn_game_module(&mut world, content);
    start_game(&mut world, root, start);
    (world, root)
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
