/// Global holding the name hash of the running top-level module.
pub(crate) const V_MODULE_NAME: u32 = 0x91080831;

/// Sub-var table of puzzles whose solutions have been rolled.
const V_PUZZLES_SEEDED: u32 = 0x40050052;

const PUZZLE_LOCK: u32 = 0x25400B10;
const LOCK_CODE: u32 = 0x0C10A000;
const LOCK_DECOY: u32 = 0xA010B810;
const LOCK_SYMBOLS: u32 = 16;

const PUZZLE_CANNON: u32 = 0x8C9819C2;
const CANNON_TARGET: u32 = 0x00504B86;
const CANNON_START: u32 = 0x0A4C0A9A;
const CANNON_SYMBOLS: u32 = 12;

const PUZZLE_DIGITS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ModuleId {
    Intro,
    Hall,
    Passage,
}

impl ModuleId {
    pub(crate) fn name_hash(self) -> u32 {
        match self {
            Self::Intro => 0x00F10114,
            Self::Hall => 0x10A10C14,
            Self::Passage => 0x1A214010,
        }
    }

    /// Parses the `HOOD_START_MODULE` value.
    pub(crate) fn parse_start(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "intro" => Some(Self::Intro),
            "hall" => Some(Self::Hall),
            _ => None,
        }
    }
}

const MODULE_ARMS: &[TransitionArm<ModuleId>] = &[
    TransitionArm {
        from: ModuleId::Intro,
        result: None,
        to: ChildSpec {
            module: ModuleId::Hall,
            which: 0,
        },
    },
    TransitionArm {
        from: ModuleId::Hall,
        result: Some(0),
        to: ChildSpec {
            module: ModuleId::Passage,
            which: 0,
        },
    },
    TransitionArm {
        from: ModuleId::Hall,
        result: Some(1),
        to: ChildSpec {
            module: ModuleId::Intro,
            which: 0,
        },
    },
    TransitionArm {
        from: ModuleId::Passage,
        result: Some(0),
        to: ChildSpec {
            module: ModuleId::Hall,
            which: 1,
        },
    },
];

pub(crate) const MODULE_FLOW: ModuleTable<ModuleId> = ModuleTable::new(MODULE_ARMS);

/// Authored data shared by every module instance.
#[derive(Debug, Clone)]
pub(crate) struct GameContent {
    pub(crate) hall: Arc<SceneData>,
}

/// Root of the entity tree.
pub(crate) struct GameModule {
    module: Module,
    content: GameContent,
    current: Option<ModuleId>,
}

impl ModuleClass for GameModule {
    fn module(&self) -> &Module {
        &self.module
    }

    fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    fn update(world: &mut EntityWorld, id: EntityId) {
        game_module_update(world, id);
    }
}

pub(crate) fn spawn_game_module(world: &mut EntityWorld, content: GameContent) -> EntityId {
    spawn_module(
        world,
        None,
        GameModule {
            module: Module::default(),
            content,
            current: None,
        },
    )
}

/// Seeds the puzzles and enters `start` as a fresh game.
pub(crate) fn start_game(world: &mut EntityWorld, root: EntityId, start: ModuleId) {
    seed_puzzles(&mut world.services);
    world.services.game_state.scene_num = 0;
    create_module(world, root, start, -1);
}

pub(crate) fn current_module(world: &EntityWorld, root: EntityId) -> Option<ModuleId> {
    world.data::<GameModule>(root).and_then(|game| game.current)
}

/// Replaces the running module; the new one is ticked once before returning.
pub(crate) fn create_module(world: &mut EntityWorld, root: EntityId, module: ModuleId, which: i32) {
    world.services.vars.set_global_var(V_MODULE_NAME, module.name_hash());
    let Some(content) = world.data_mut::<GameModule>(root).map(|game| {
        game.current = Some(module);
        game.content.clone()
    }) else {
        return;
    };
    create_child::<GameModule>(world, root, |world, parent| match module {
        ModuleId::Intro => spawn_intro_module(world, parent),
        ModuleId::Hall => spawn_hall_module(world, parent, content.hall, which),
        ModuleId::Passage => spawn_passage_module(world, parent),
    });
    info!(module = ?module, which, "module_created");
}

/// A finished child with no transition stays in place; only the done flag
/// is cleared.
fn game_module_update(world: &mut EntityWorld, id: EntityId) {
    let Some(child) = module_ref::<GameModule>(world, id).and_then(|module| module.child) else {
        return;
    };
    world.update_entity(child);

    let finished = match world.data_mut::<GameModule>(id) {
        Some(game) if game.module.done => {
            game.module.done = false;
            game.current.map(|current| (current, game.module.module_result))
        }
        _ => None,
    };
    let Some((from, result)) = finished else {
        return;
    };
    match MODULE_FLOW.next(from, result) {
        Ok(next) => create_module(world, id, next.module, next.which),
        Err(error) => error!(module = %id, error = %error, "module_transition_failed"),
    }
}

pub(crate) fn handle_mouse_move(world: &mut EntityWorld, root: EntityId, at: Point) {
    forward_point(world, root, opcode::MOUSE_MOVE, at);
}

pub(crate) fn handle_mouse_down(world: &mut EntityWorld, root: EntityId, at: Point) {
    forward_point(world, root, opcode::MOUSE_CLICK, at);
}

fn forward_point(world: &mut EntityWorld, root: EntityId, num: u32, at: Point) {
    if let Some(child) = module_ref::<GameModule>(world, root).and_then(|module| module.child) {
        world.send_point_message(root, child, num, at);
    }
}

/// Rolls every puzzle solution not yet rolled.
pub(crate) fn seed_puzzles(services: &mut Services) {
    seed_lock_puzzle(services);
    seed_cannon_puzzle(services);
}

fn seed_lock_puzzle(services: &mut Services) {
    if services.vars.sub_var(V_PUZZLES_SEEDED, PUZZLE_LOCK) != 0 {
        return;
    }
    let mut code = Vec::with_capacity(PUZZLE_DIGITS as usize);
    for _ in 0..PUZZLE_DIGITS {
        let digit = draw_excluding(services, LOCK_SYMBOLS, &code);
        code.push(digit);
    }
    let mut decoy: Vec<u32> = Vec::with_capacity(PUZZLE_DIGITS as usize);
    for &code_digit in &code {
        let mut excluded = decoy.clone();
        excluded.push(code_digit);
        let digit = draw_excluding(services, LOCK_SYMBOLS, &excluded);
        decoy.push(digit);
    }
    for (index, (&code_digit, &decoy_digit)) in (0u32..).zip(code.iter().zip(&decoy)) {
        services.vars.set_sub_var(LOCK_CODE, index, code_digit);
        services.vars.set_sub_var(LOCK_DECOY, index, decoy_digit);
    }
    services.vars.set_sub_var(V_PUZZLES_SEEDED, PUZZLE_LOCK, 1);
    debug!(puzzle = %format_hash(PUZZLE_LOCK), "puzzle_seeded");
}

fn seed_cannon_puzzle(services: &mut Services) {
    if services.vars.sub_var(V_PUZZLES_SEEDED, PUZZLE_CANNON) != 0 {
        return;
    }
    for index in 0..PUZZLE_DIGITS {
        let target = services.random_number(CANNON_SYMBOLS - 1);
        services.vars.set_sub_var(CANNON_TARGET, index, target);
        let start = services.random_number(CANNON_SYMBOLS - 1);
        services.vars.set_sub_var(CANNON_START, index, start);
    }
    services.vars.set_sub_var(V_PUZZLES_SEEDED, PUZZLE_CANNON, 1);
    debug!(puzzle = %format_hash(PUZZLE_CANNON), "puzzle_seeded");
}

/// Uniform pick from `0..symbols` minus `excluded`.
fn draw_excluding(services: &mut Services, symbols: u32, excluded: &[u32]) -> u32 {
    let candidates: Vec<u32> = (0..symbols).filter(|value| !excluded.contains(value)).collect();
    let Some(last) = candidates.len().checked_sub(1) else {
        return 0;
    };
    let pick = services.random_number(last as u32) as usize;
    candidates.get(pick).copied().unwrap_or(0)
}
