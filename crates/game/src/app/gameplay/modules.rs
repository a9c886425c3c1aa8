/// Set once the player has walked through the hall door.
pub(crate) const V_DOOR_PASSED: u32 = 0x2090590C;

const HALL_SCENE_NUM: i32 = 0;

/// Module owning the hall scene.
pub(crate) struct HallModule {
    module: Module,
    scene_data: Arc<SceneData>,
}

impl ModuleClass for HallModule {
    fn module(&self) -> &Module {
        &self.module
    }

    fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    fn update(world: &mut EntityWorld, id: EntityId) {
        if update_child::<HallModule>(world, id) {
            return;
        }
        let result = module_ref::<HallModule>(world, id).map_or(0, |module| module.module_result);
        if result == 1 {
            world.services.vars.set_global_var(V_DOOR_PASSED, 1);
            leave_module(world, id, 0);
        } else {
            leave_module(world, id, 1);
        }
    }
}

pub(crate) fn spawn_hall_module(
    world: &mut EntityWorld,
    parent: EntityId,
    scene_data: Arc<SceneData>,
    which: i32,
) -> EntityId {
    let id = spawn_module(
        world,
        Some(parent),
        HallModule {
            module: Module::default(),
            scene_data,
        },
    );
    let (scene_num, scene_which) = match which {
        which if which < 0 => (world.services.game_state.scene_num, -1),
        1 => (HALL_SCENE_NUM, 0),
        2 => (HALL_SCENE_NUM, 3),
        _ => (HALL_SCENE_NUM, 1),
    };
    create_hall_scene(world, id, scene_num, scene_which);
    id
}

fn create_hall_scene(world: &mut EntityWorld, id: EntityId, scene_num: i32, which: i32) {
    if scene_num != HALL_SCENE_NUM {
        warn!(module = %id, scene_num, "unknown_scene_num");
    }
    world.services.game_state.scene_num = HALL_SCENE_NUM;
    let Some(data) = world.data::<HallModule>(id).map(|hall| Arc::clone(&hall.scene_data)) else {
        return;
    };
    create_child::<HallModule>(world, id, |world, parent| {
        spawn_hall_scene(world, parent, data, which)
    });
    debug!(module = %id, scene_num = HALL_SCENE_NUM, which, "scene_selected");
}

/// Module that plays one cutscene and leaves with its result.
pub(crate) struct CutsceneModule {
    module: Module,
}

impl ModuleClass for CutsceneModule {
    fn module(&self) -> &Module {
        &self.module
    }

    fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    fn update(world: &mut EntityWorld, id: EntityId) {
        if update_child::<CutsceneModule>(world, id) {
            return;
        }
        let result = module_ref::<CutsceneModule>(world, id).map_or(0, |module| module.module_result);
        leave_module(world, id, result);
    }
}

fn spawn_cutscene_module(world: &mut EntityWorld, parent: EntityId, spec: CutsceneSpec) -> EntityId {
    let id = spawn_module(
        world,
        Some(parent),
        CutsceneModule {
            module: Module::default(),
        },
    );
    create_child::<CutsceneModule>(world, id, |world, parent| spawn_cutscene(world, parent, spec));
    id
}

pub(crate) fn spawn_intro_module(world: &mut EntityWorld, parent: EntityId) -> EntityId {
    spawn_cutscene_module(world, parent, INTRO_CUTSCENE)
}

pub(crate) fn spawn_passage_module(world: &mut EntityWorld, parent: EntityId) -> EntityId {
    spawn_cutscene_module(world, parent, PASSAGE_CUTSCENE)
}
