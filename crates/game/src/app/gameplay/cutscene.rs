/// Which film a cutscene plays and whether a click skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CutsceneSpec {
    pub(crate) film: &'static str,
    pub(crate) skippable: bool,
}

pub(crate) const INTRO_CUTSCENE: CutsceneSpec = CutsceneSpec {
    film: "IntroFilm",
    skippable: true,
};

pub(crate) const PASSAGE_CUTSCENE: CutsceneSpec = CutsceneSpec {
    film: "PassageFilm",
    skippable: true,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CutscenePhase {
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reel(u32);

pub(crate) struct Film {
    sprite: AnimatedSprite<Reel>,
}

impl SpriteClass for Film {
    type State = Reel;

    fn sprite(&self) -> &AnimatedSprite<Reel> {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut AnimatedSprite<Reel> {
        &mut self.sprite
    }

    fn behavior(state: Reel) -> StateBehavior<Reel> {
        StateBehavior {
            animation: Some(state.0),
            end: AnimationEnd::Finish,
            ..StateBehavior::default()
        }
    }
}

/// Plays one film to its last frame, then leaves the module.
pub(crate) struct Cutscene {
    scene: Scene,
    spec: CutsceneSpec,
    phase: CutscenePhase,
    film: Option<EntityId>,
}

impl SceneClass for Cutscene {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn handle_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
        let film = world.data::<Cutscene>(id).and_then(|cutscene| cutscene.film);
        if message.num == opcode::SPRITE_FINISHED && film == Some(message.sender) {
            finish_cutscene(world, id, "film_ended");
        }
        0
    }

    fn before_update(world: &mut EntityWorld, id: EntityId) {
        let skip = world.data::<Cutscene>(id).is_some_and(|cutscene| {
            cutscene.phase == CutscenePhase::Playing
                && cutscene.spec.skippable
                && cutscene.scene.is_mouse_click_pending()
        });
        if skip {
            finish_cutscene(world, id, "skipped");
        }
    }
}

pub(crate) fn spawn_cutscene(world: &mut EntityWorld, parent: EntityId, spec: CutsceneSpec) -> EntityId {
    let scene = spawn_scene(
        world,
        Some(parent),
        Cutscene {
            scene: Scene::new(Arc::new(SceneData::default())),
            spec,
            phase: CutscenePhase::Playing,
            film: None,
        },
    );
    let reel = Reel(name_hash(spec.film));
    let film = insert_sprite::<Cutscene, Film>(
        world,
        scene,
        Film {
            sprite: AnimatedSprite::new(320, 480, reel),
        },
        reel,
        0,
    );
    if let Some(cutscene) = world.data_mut::<Cutscene>(scene) {
        cutscene.film = Some(film);
    }
    debug!(scene = %scene, film = spec.film, "cutscene_started");
    scene
}

pub(crate) fn cutscene_phase(world: &EntityWorld, id: EntityId) -> Option<CutscenePhase> {
    world.data::<Cutscene>(id).map(|cutscene| cutscene.phase)
}

fn finish_cutscene(world: &mut EntityWorld, id: EntityId, reason: &'static str) {
    let film = match world.data_mut::<Cutscene>(id) {
        Some(cutscene) if cutscene.phase == CutscenePhase::Playing => {
            cutscene.phase = CutscenePhase::Finished;
            cutscene.film
        }
        _ => return,
    };
    if let Some(film) = film {
        stop_animation::<Film>(world, film);
    }
    info!(scene = %id, reason, "cutscene_finished");
    leave_module(world, id, 0);
}
