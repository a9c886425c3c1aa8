    use super::*;
    use hood_engine::content::{load_resource_manifest, load_scene_data};
    use hood_engine::resource::{AnimationInfo, FrameImage, ResourceType};
    use hood_engine::scene::scene_ref;
    use hood_engine::sprite::spawn_sprite;
    use hood_engine::{ListStatus, MemoryResources, SavedSubVar, ScriptedRandom, SeededRandom};
    use serde_json::Value;
    use tempfile::TempDir;

    fn asset(relative: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets")
            .join(relative)
    }

    fn manifest() -> MemoryResources {
        load_resource_manifest(&asset("resources/resources.xml")).expect("resources manifest")
    }

    fn hall_data() -> Arc<SceneData> {
        Arc::new(load_scene_data(&asset("scenes/hall.xml")).expect("hall scene"))
    }

    fn world_with(rng: Box<dyn RandomSource>) -> EntityWorld {
        EntityWorld::new(Services::new(Box::new(manifest()), rng))
    }

    fn tick(world: &mut EntityWorld, id: EntityId, ticks: u32) {
        for _ in 0..ticks {
            world.update_entity(id);
        }
    }

    struct HallFixture {
        world: EntityWorld,
        scene: EntityId,
        props: HallProps,
        player: EntityId,
    }

    impl HallFixture {
        fn door_status(&self) -> u32 {
            scene_ref::<HallScene>(&self.world, self.scene)
                .map(|scene| scene.local(door_status_key()))
                .expect("hall scene")
        }

        fn scene(&self) -> &Scene {
            scene_ref::<HallScene>(&self.world, self.scene).expect("hall scene")
        }

        fn place_player(&mut self, x: i32) {
            let sprite = sprite_mut::<Klayman>(&mut self.world, self.player).expect("player");
            sprite.x = x;
            sprite.dest_x = x;
        }
    }

    fn hall_fixture(which: i32, setup: impl FnOnce(&mut EntityWorld)) -> HallFixture {
        let mut world = world_with(Box::new(ScriptedRandom::default()));
        setup(&mut world);
        let module = world.spawn(None, ());
        let scene = spawn_hall_scene(&mut world, module, hall_data(), which);
        let (props, player) = world
            .data::<HallScene>(scene)
            .and_then(|hall| hall.props.zip(hall.scene.player))
            .expect("hall props");
        HallFixture {
            world,
            scene,
            props,
            player,
        }
    }

    fn press_floor_button(fixture: &mut HallFixture) {
        let (player, button) = (fixture.player, fixture.props.button);
        fixture
            .world
            .send_message(player, button, opcode::BUTTON_PRESSED, 0u32);
    }

    fn game_world(start: ModuleId) -> (EntityWorld, EntityId) {
        build_world(
            Box::new(manifest()),
            Box::new(ScriptedRandom::default()),
            GameContent { hall: hall_data() },
            start,
        )
    }

    fn active_child(world: &EntityWorld, root: EntityId) -> Option<EntityId> {
        module_ref::<GameModule>(world, root).and_then(|module| module.child)
    }

    fn tick_until(
        world: &mut EntityWorld,
        root: EntityId,
        limit: u32,
        done: impl Fn(&EntityWorld) -> bool,
    ) -> bool {
        for _ in 0..limit {
            if done(world) {
                return true;
            }
            world.update_entity(root);
            world.reclaim_destroyed();
        }
        done(world)
    }

    fn seeded_services(seed: u64) -> Services {
        Services::new(
            Box::new(MemoryResources::new()),
            Box::new(SeededRandom::from_seed(seed)),
        )
    }

    #[test]
    fn klayman_walks_to_the_target_and_stops_on_it() {
        let mut world = world_with(Box::new(ScriptedRandom::default()));
        let klayman = spawn_sprite(
            &mut world,
            None,
            Klayman::new(300, 438, Arc::new(SceneData::default())),
            KlaymanState::Idle,
        );

        world.send_point_message(klayman, klayman, opcode::WALK_TO, Point::new(100, 438));
        assert_eq!(
            current_state::<Klayman>(&world, klayman),
            Some(KlaymanState::WalkStart)
        );
        assert!(sprite_ref::<Klayman>(&world, klayman).expect("sprite").do_delta_x);

        assert!(settles_idle(&mut world, klayman, klayman, 200), "walk never came to rest");
        let sprite = sprite_ref::<Klayman>(&world, klayman).expect("sprite");
        assert_eq!(sprite.x, 100);
        assert_eq!(sprite.y, 438);
        assert!(!world.data::<Klayman>(klayman).expect("klayman").walking);
    }

    /// Ticks `driver` until the player is back in `Idle`.
    fn settles_idle(world: &mut EntityWorld, driver: EntityId, player: EntityId, limit: u32) -> bool {
        (0..limit).any(|_| {
            world.update_entity(driver);
            current_state::<Klayman>(world, player) == Some(KlaymanState::Idle)
        })
    }

    #[test]
    fn walk_ordered_outside_a_message_list_ends_idle_in_the_hall() {
        let mut fixture = hall_fixture(-1, |_| {});
        let (scene, player) = (fixture.scene, fixture.player);
        tick(&mut fixture.world, scene, 1);
        assert_eq!(fixture.scene().list_status(), ListStatus::Free);

        fixture
            .world
            .send_point_message(scene, player, opcode::WALK_TO, Point::new(200, HALL_FLOOR_Y));
        assert_ne!(current_state::<Klayman>(&fixture.world, player), Some(KlaymanState::Idle));

        assert!(settles_idle(&mut fixture.world, scene, player, 200), "stuck after the walk");
        assert_eq!(sprite_ref::<Klayman>(&fixture.world, player).expect("player").x, 200);
    }

    #[test]
    fn short_step_outside_a_message_list_ends_idle() {
        let mut world = world_with(Box::new(ScriptedRandom::default()));
        let klayman = spawn_sprite(
            &mut world,
            None,
            Klayman::new(300, 438, Arc::new(SceneData::default())),
            KlaymanState::Idle,
        );
        world.send_point_message(klayman, klayman, opcode::WALK_TO, Point::new(340, 438));
        assert_eq!(current_state::<Klayman>(&world, klayman), Some(KlaymanState::Step));

        assert!(settles_idle(&mut world, klayman, klayman, 60), "step never came to rest");
        assert_eq!(sprite_ref::<Klayman>(&world, klayman).expect("sprite").x, 340);
    }

    /// Resources that never become resident.
    struct NoResidency(MemoryResources);

    impl ResourceFacade for NoResidency {
        fn load(&mut self, hash: u32) -> Option<ResourceHandle> {
            self.0.load(hash)
        }
        fn unload(&mut self, handle: ResourceHandle) {
            self.0.unload(handle);
        }
        fn use_resource(&mut self, hash: u32) -> Option<ResourceHandle> {
            self.0.use_resource(hash)
        }
        fn unuse_resource(&mut self, handle: ResourceHandle) {
            self.0.unuse_resource(handle);
        }
        fn resource_type(&self, handle: ResourceHandle) -> Option<ResourceType> {
            self.0.resource_type(handle)
        }
        fn load_resource(&mut self, _handle: ResourceHandle) -> Option<Arc<[u8]>> {
            None
        }
        fn is_resource_data_valid(&self, _handle: ResourceHandle) -> bool {
            false
        }
        fn animation(&self, hash: u32) -> Option<Arc<AnimationInfo>> {
            self.0.animation(hash)
        }
        fn frame_image(&self, hash: u32, frame_index: usize) -> Option<&FrameImage> {
            self.0.frame_image(hash, frame_index)
        }
    }

    #[test]
    fn failed_fidget_load_falls_back_to_idle() {
        let mut world = EntityWorld::new(Services::new(
            Box::new(NoResidency(manifest())),
            Box::new(ScriptedRandom::default()),
        ));
        let klayman = spawn_sprite(
            &mut world,
            None,
            Klayman::new(300, 438, Arc::new(SceneData::default())),
            KlaymanState::Idle,
        );

        tick(&mut world, klayman, FidgetTimer::MIN_TICKS);
        assert_eq!(current_state::<Klayman>(&world, klayman), Some(KlaymanState::Idle));
        let klayman_data = world.data::<Klayman>(klayman).expect("klayman");
        assert_eq!(klayman_data.fidget_timer.remaining(), FidgetTimer::MIN_TICKS);
        assert!(klayman_data.preload.is_none());
    }

    #[test]
    fn short_walk_finishes_in_place() {
        let mut world = world_with(Box::new(ScriptedRandom::default()));
        let klayman = spawn_sprite(
            &mut world,
            None,
            Klayman::new(300, 438, Arc::new(SceneData::default())),
            KlaymanState::Idle,
        );

        world.send_point_message(klayman, klayman, opcode::WALK_TO, Point::new(320, 438));
        assert_eq!(current_state::<Klayman>(&world, klayman), Some(KlaymanState::Idle));
        assert_eq!(sprite_ref::<Klayman>(&world, klayman).expect("sprite").x, 300);
    }

    #[test]
    fn only_the_stop_stance_request_is_answered() {
        let mut world = world_with(Box::new(ScriptedRandom::default()));
        let klayman = spawn_sprite(
            &mut world,
            None,
            Klayman::new(300, 438, Arc::new(SceneData::default())),
            KlaymanState::Idle,
        );

        assert_eq!(
            world.send_message(klayman, klayman, opcode::SET_STOP_STANCE, STANCE_STANDING),
            1
        );
        assert_eq!(world.send_message(klayman, klayman, opcode::GOTO_IDLE, 0u32), 0);
        assert_eq!(
            world.send_message(klayman, klayman, opcode::QUERY_INTERRUPTIBLE, 0u32),
            1
        );
    }

    #[test]
    fn idle_countdown_plays_a_weighted_fidget_then_idles_again() {
        // Countdown 24 + 10, then the third of five equal weights.
        let mut world = world_with(Box::new(ScriptedRandom::new([10, 2])));
        let klayman = spawn_sprite(
            &mut world,
            None,
            Klayman::new(300, 438, Arc::new(SceneData::default())),
            KlaymanState::Idle,
        );

        tick(&mut world, klayman, 33);
        assert_eq!(current_state::<Klayman>(&world, klayman), Some(KlaymanState::Idle));
        tick(&mut world, klayman, 1);
        assert_eq!(
            current_state::<Klayman>(&world, klayman),
            Some(KlaymanState::FidgetPreload(Fidget::Whistle))
        );
        tick(&mut world, klayman, 1);
        assert_eq!(
            current_state::<Klayman>(&world, klayman),
            Some(KlaymanState::Fidget(Fidget::Whistle))
        );

        tick(&mut world, klayman, 40);
        assert_eq!(current_state::<Klayman>(&world, klayman), Some(KlaymanState::Idle));
    }

    #[test]
    fn silenced_idle_table_blinks_instead() {
        let mut world = world_with(Box::new(ScriptedRandom::default()));
        let klayman = spawn_sprite(
            &mut world,
            None,
            Klayman::new(300, 438, Arc::new(SceneData::default())),
            KlaymanState::Idle,
        );
        world.data_mut::<Klayman>(klayman).expect("klayman").idle_table = NO_IDLE;

        tick(&mut world, klayman, FidgetTimer::MIN_TICKS);
        assert_eq!(current_state::<Klayman>(&world, klayman), Some(KlaymanState::Blink));
    }

    #[test]
    fn restored_entry_uses_the_open_hall_areas() {
        let fixture = hall_fixture(-1, |_| {});
        let player = sprite_ref::<Klayman>(&fixture.world, fixture.player).expect("player");
        assert_eq!((player.x, player.y), (380, HALL_FLOOR_Y));
        assert_eq!(fixture.scene().rect_list(), Some(RECT_LIST_HALL));
        assert_eq!(fixture.scene().message_list_id(), Some(LIST_ENTER_RESTORED));
        assert_eq!(fixture.door_status(), DOOR_CLOSED);
        assert_eq!(
            current_state::<Door>(&fixture.world, fixture.props.door),
            Some(DoorState::Hidden)
        );
    }

    #[test]
    fn left_entries_restrict_areas_and_silence_fidgets() {
        let fixture = hall_fixture(0, |_| {});
        assert_eq!(fixture.scene().rect_list(), Some(RECT_LIST_HALL_RESTRICTED));
        assert_eq!(fixture.scene().message_list_id(), Some(LIST_ENTER_LEFT));
        let klayman = fixture.world.data::<Klayman>(fixture.player).expect("klayman");
        assert!(klayman.idle_table.is_empty());
        assert_eq!(klayman.sprite.x, 115);
        let clip = klayman.sprite.clip_rect.expect("clip rect");
        assert_eq!(clip.x2, 639);

        let corner = hall_fixture(2, |_| {});
        assert_eq!(corner.scene().message_list_id(), Some(LIST_ENTER_LEFT_CORNER));
        let tapes = hall_fixture(3, |_| {});
        assert_eq!(tapes.scene().message_list_id(), Some(LIST_ENTER_LEFT_TAPES));
    }

    #[test]
    fn entering_from_the_passage_closes_the_open_door_behind() {
        let mut fixture = hall_fixture(1, |_| {});
        assert_eq!(
            current_state::<Door>(&fixture.world, fixture.props.door),
            Some(DoorState::Open)
        );
        assert_eq!(fixture.door_status(), DOOR_OPEN_ON_ENTRY);

        let scene = fixture.scene;
        tick(&mut fixture.world, scene, DOOR_ENTRY_TICKS - 1);
        assert_eq!(fixture.door_status(), DOOR_OPEN_ON_ENTRY);
        tick(&mut fixture.world, scene, 1);
        assert_eq!(fixture.door_status(), DOOR_CLOSED);
        assert_eq!(
            current_state::<Door>(&fixture.world, fixture.props.door),
            Some(DoorState::Closing)
        );
        assert_eq!(
            current_state::<HitEffect>(&fixture.world, fixture.props.hit_effect),
            Some(HitEffectState::Hidden)
        );
    }

    #[test]
    fn floor_button_opens_the_door_until_the_countdown_ends() {
        let mut fixture = hall_fixture(-1, |_| {});
        let scene = fixture.scene;
        tick(&mut fixture.world, scene, 1);

        press_floor_button(&mut fixture);
        assert_eq!(fixture.door_status(), DOOR_OPENED_BY_BUTTON);
        assert_eq!(
            current_state::<Door>(&fixture.world, fixture.props.door),
            Some(DoorState::Opening)
        );
        assert_eq!(
            current_state::<FloorButton>(&fixture.world, fixture.props.button),
            Some(ButtonState::Down)
        );

        // A second press while open changes nothing.
        press_floor_button(&mut fixture);
        assert_eq!(
            world_countdown(&fixture),
            DOOR_BUTTON_TICKS,
        );

        tick(&mut fixture.world, scene, BUTTON_RESET_TICKS + 1);
        assert_eq!(
            current_state::<FloorButton>(&fixture.world, fixture.props.button),
            Some(ButtonState::Up)
        );

        tick(&mut fixture.world, scene, DOOR_BUTTON_TICKS - BUTTON_RESET_TICKS - 2);
        assert_eq!(fixture.door_status(), DOOR_OPENED_BY_BUTTON);
        tick(&mut fixture.world, scene, 1);
        assert_eq!(fixture.door_status(), DOOR_CLOSED);
        assert!(matches!(
            current_state::<Door>(&fixture.world, fixture.props.door),
            Some(DoorState::Closing | DoorState::Hidden)
        ));
    }

    fn world_countdown(fixture: &HallFixture) -> u32 {
        fixture
            .world
            .data::<HallScene>(fixture.scene)
            .map(|hall| hall.door_countdown)
            .expect("hall scene")
    }

    #[test]
    fn door_slams_on_a_player_standing_in_the_doorway() {
        let mut fixture = hall_fixture(-1, |_| {});
        let scene = fixture.scene;
        tick(&mut fixture.world, scene, 1);
        fixture.place_player(520);

        press_floor_button(&mut fixture);
        tick(&mut fixture.world, scene, DOOR_BUTTON_TICKS);

        assert_eq!(fixture.door_status(), DOOR_CLOSED);
        assert_eq!(fixture.scene().message_list_id(), Some(LIST_HIT_BY_DOOR));
        assert_eq!(
            current_state::<Klayman>(&fixture.world, fixture.player),
            Some(KlaymanState::HitByDoor)
        );
        assert_eq!(
            current_state::<HitEffect>(&fixture.world, fixture.props.hit_effect),
            Some(HitEffectState::Playing)
        );
        let effect = sprite_ref::<HitEffect>(&fixture.world, fixture.props.hit_effect).expect("effect");
        assert_eq!((effect.x, effect.y), (520, HALL_FLOOR_Y - HIT_EFFECT_RAISE));
        assert!(!sprite_ref::<Klayman>(&fixture.world, fixture.player).expect("player").do_delta_x);
    }

    #[test]
    fn countdown_expiry_past_the_doorway_leaves_the_door_open() {
        let mut fixture = hall_fixture(-1, |_| {});
        let scene = fixture.scene;
        tick(&mut fixture.world, scene, 1);
        fixture.place_player(600);

        press_floor_button(&mut fixture);
        tick(&mut fixture.world, scene, DOOR_BUTTON_TICKS);

        assert_eq!(world_countdown(&fixture), 0);
        assert_eq!(fixture.door_status(), DOOR_OPENED_BY_BUTTON);
        assert!(!matches!(
            current_state::<Door>(&fixture.world, fixture.props.door),
            Some(DoorState::Closing | DoorState::Hidden)
        ));
        assert_ne!(fixture.scene().message_list_id(), Some(LIST_HIT_BY_DOOR));
        assert_eq!(
            current_state::<HitEffect>(&fixture.world, fixture.props.hit_effect),
            Some(HitEffectState::Hidden)
        );
        assert!(!fixture.scene().can_accept_input);
    }

    #[test]
    fn player_past_the_doorway_blocks_input_while_the_door_is_open() {
        let mut fixture = hall_fixture(-1, |_| {});
        let scene = fixture.scene;
        tick(&mut fixture.world, scene, 1);
        fixture.place_player(600);

        press_floor_button(&mut fixture);
        tick(&mut fixture.world, scene, 1);
        assert!(!fixture.scene().can_accept_input);
    }

    #[test]
    fn closed_door_with_a_preload_hint_leaves_through_it() {
        let mut fixture = hall_fixture(-1, |_| {});
        let scene = fixture.scene;
        tick(&mut fixture.world, scene, 1);
        fixture.place_player(520);
        fixture
            .world
            .data_mut::<HallScene>(scene)
            .expect("hall scene")
            .scene
            .message_value = 0;

        tick(&mut fixture.world, scene, 1);
        assert_eq!(fixture.scene().message_list_id(), Some(LIST_LEAVE_THROUGH_DOOR));
        assert_eq!(fixture.scene().list_status(), ListStatus::Locked);
    }

    #[test]
    fn clicking_the_button_walks_over_and_steps_on_it() {
        let mut fixture = hall_fixture(-1, |_| {});
        let scene = fixture.scene;
        tick(&mut fixture.world, scene, 1);

        fixture
            .world
            .send_point_message(fixture.player, scene, opcode::MOUSE_CLICK, Point::new(276, 440));
        tick(&mut fixture.world, scene, 1);
        assert_eq!(fixture.scene().message_list_id(), Some(0x004B8E90));

        let mut opened = false;
        for _ in 0..150 {
            tick(&mut fixture.world, scene, 1);
            if fixture.door_status() == DOOR_OPENED_BY_BUTTON {
                opened = true;
                break;
            }
        }
        assert!(opened, "door never opened");
        assert_eq!(
            current_state::<Door>(&fixture.world, fixture.props.door),
            Some(DoorState::Opening)
        );
        let klayman = fixture.world.data::<Klayman>(fixture.player).expect("klayman");
        assert_eq!(klayman.attached, Some(fixture.props.button));
        assert_eq!(klayman.sprite.x, 276);
    }

    #[test]
    fn tape_in_reach_is_picked_up_and_recorded() {
        let mut fixture = hall_fixture(-1, |_| {});
        let scene = fixture.scene;
        tick(&mut fixture.world, scene, 1);
        let tape = fixture.props.tapes[1];

        let reply = fixture.world.send_point_message(
            fixture.player,
            tape,
            opcode::HOTSPOT_CLICK,
            Point::new(441, 443),
        );
        assert_eq!(reply, 1);
        assert_eq!(fixture.scene().message_list_id(), Some(LIST_PICK_UP_TAPE));

        tick(&mut fixture.world, scene, 60);
        assert_eq!(fixture.world.services.vars.sub_var(V_TAPES_TAKEN, 11), 1);
        assert_eq!(fixture.world.services.vars.sub_var(V_TAPES_TAKEN, 18), 0);
        assert_eq!(current_state::<Tape>(&fixture.world, tape), Some(TapeState::Taken));
        assert!(!fixture.world.has_message_handler(tape));
        assert!(!sprite_ref::<Tape>(&fixture.world, tape).expect("tape").visible);
    }

    #[test]
    fn tape_out_of_reach_starts_the_approach() {
        let mut fixture = hall_fixture(0, |_| {});
        let scene = fixture.scene;
        tick(&mut fixture.world, scene, 1);
        fixture.place_player(150);

        let tape = fixture.props.tapes[0];
        fixture
            .world
            .send_point_message(fixture.player, tape, opcode::HOTSPOT_CLICK, Point::new(412, 443));
        assert_eq!(fixture.scene().message_list_id(), Some(LIST_APPROACH_TAPES));
    }

    #[test]
    fn taken_tape_is_created_without_a_handler() {
        let fixture = hall_fixture(-1, |world| {
            world.services.vars.set_sub_var(V_TAPES_TAKEN, 18, 1);
        });
        let [taken, lying] = fixture.props.tapes;
        assert_eq!(current_state::<Tape>(&fixture.world, taken), Some(TapeState::Taken));
        assert!(!fixture.world.has_message_handler(taken));
        assert_eq!(current_state::<Tape>(&fixture.world, lying), Some(TapeState::Lying));
        assert!(fixture.world.has_message_handler(lying));
    }

    #[test]
    fn module_flow_table_matches_the_story_order() {
        let cases = [
            (ModuleId::Intro, 0, ModuleId::Hall, 0),
            (ModuleId::Intro, 7, ModuleId::Hall, 0),
            (ModuleId::Hall, 0, ModuleId::Passage, 0),
            (ModuleId::Hall, 1, ModuleId::Intro, 0),
            (ModuleId::Passage, 0, ModuleId::Hall, 1),
        ];
        for (from, result, module, which) in cases {
            let next = MODULE_FLOW.next(from, result).expect("transition");
            assert_eq!((next.module, next.which), (module, which), "{from:?} -> {result}");
        }

        let error = MODULE_FLOW.next(ModuleId::Passage, 3).expect_err("unhandled");
        assert!(matches!(
            error,
            hood_engine::FlowError::UnhandledResult { ref module, result: 3 } if module == "Passage"
        ));
    }

    #[test]
    fn unhandled_result_keeps_the_running_child() {
        let (mut world, root) = game_world(ModuleId::Passage);
        let child = active_child(&world, root).expect("child");
        {
            let game = world.data_mut::<GameModule>(root).expect("game module");
            game.module.done = true;
            game.module.module_result = 3;
        }

        world.update_entity(root);
        assert_eq!(current_module(&world, root), Some(ModuleId::Passage));
        assert_eq!(active_child(&world, root), Some(child));
        assert!(world.is_alive(child));
        assert!(!module_ref::<GameModule>(&world, root).expect("module").done);
    }

    #[test]
    fn intro_plays_to_its_last_frame_then_enters_the_hall() {
        let (mut world, root) = game_world(ModuleId::Intro);
        assert_eq!(current_module(&world, root), Some(ModuleId::Intro));
        assert_eq!(
            world.services.vars.global_var(V_MODULE_NAME),
            ModuleId::Intro.name_hash()
        );

        tick(&mut world, root, 80);
        assert_eq!(current_module(&world, root), Some(ModuleId::Intro));

        let entered = tick_until(&mut world, root, 60, |world| {
            current_module(world, root) == Some(ModuleId::Hall)
        });
        assert!(entered, "intro never finished");
        assert_eq!(
            world.services.vars.global_var(V_MODULE_NAME),
            ModuleId::Hall.name_hash()
        );
        assert_eq!(world.services.game_state.scene_num, 0);
    }

    #[test]
    fn click_skips_the_intro() {
        let (mut world, root) = game_world(ModuleId::Intro);
        tick(&mut world, root, 3);
        let cutscene_module = active_child(&world, root).expect("intro module");
        let cutscene = module_ref::<CutsceneModule>(&world, cutscene_module)
            .and_then(|module| module.child)
            .expect("cutscene");
        assert_eq!(cutscene_phase(&world, cutscene), Some(CutscenePhase::Playing));

        handle_mouse_down(&mut world, root, Point::new(10, 10));
        world.update_entity(root);
        assert_eq!(current_module(&world, root), Some(ModuleId::Hall));
        assert!(!world.is_alive(cutscene_module));
    }

    #[test]
    fn walking_through_the_door_leads_to_the_passage() {
        let (mut world, root) = game_world(ModuleId::Hall);
        let hall_module = active_child(&world, root).expect("hall module");
        let scene = module_ref::<HallModule>(&world, hall_module)
            .and_then(|module| module.child)
            .expect("hall scene");

        leave_module(&mut world, scene, 1);
        world.update_entity(root);
        assert_eq!(current_module(&world, root), Some(ModuleId::Passage));
        assert_eq!(world.services.vars.global_var(V_DOOR_PASSED), 1);
    }

    #[test]
    fn puzzle_seeding_runs_once() {
        let mut services = seeded_services(7);
        seed_puzzles(&mut services);
        let first = services.vars.to_saved();
        seed_puzzles(&mut services);
        assert_eq!(services.vars.to_saved(), first);
        assert_eq!(services.vars.sub_var(V_PUZZLES_SEEDED, PUZZLE_LOCK), 1);
        assert_eq!(services.vars.sub_var(V_PUZZLES_SEEDED, PUZZLE_CANNON), 1);
    }

    #[test]
    fn same_seed_rolls_the_same_puzzles() {
        let mut left = seeded_services(42);
        let mut right = seeded_services(42);
        seed_puzzles(&mut left);
        seed_puzzles(&mut right);
        assert_eq!(left.vars.to_saved(), right.vars.to_saved());
    }

    #[test]
    fn lock_code_and_decoy_never_share_a_digit_position() {
        for seed in 0..32 {
            let mut services = seeded_services(seed);
            seed_puzzles(&mut services);
            let code: Vec<u32> = (0..PUZZLE_DIGITS)
                .map(|index| services.vars.sub_var(LOCK_CODE, index))
                .collect();
            let decoy: Vec<u32> = (0..PUZZLE_DIGITS)
                .map(|index| services.vars.sub_var(LOCK_DECOY, index))
                .collect();

            let unique: HashSet<u32> = code.iter().copied().collect();
            assert_eq!(unique.len(), code.len(), "seed {seed}: {code:?}");
            let unique: HashSet<u32> = decoy.iter().copied().collect();
            assert_eq!(unique.len(), decoy.len(), "seed {seed}: {decoy:?}");
            for (code_digit, decoy_digit) in code.iter().zip(&decoy) {
                assert_ne!(code_digit, decoy_digit, "seed {seed}");
                assert!(*code_digit < LOCK_SYMBOLS && *decoy_digit < LOCK_SYMBOLS);
            }
            for index in 0..PUZZLE_DIGITS {
                assert!(services.vars.sub_var(CANNON_TARGET, index) < CANNON_SYMBOLS);
                assert!(services.vars.sub_var(CANNON_START, index) < CANNON_SYMBOLS);
            }
        }
    }

    #[test]
    fn save_then_load_restores_vars_and_module() {
        let temp = TempDir::new().expect("temp");
        let path = save_path(temp.path());
        let (mut world, root) = game_world(ModuleId::Hall);
        world.services.vars.set_sub_var(V_TAPES_TAKEN, 18, 1);
        let before = world.services.vars.to_saved();

        save_game(&world, root, &path).expect("save");
        world.services.vars.set_sub_var(V_TAPES_TAKEN, 18, 0);
        world.services.vars.set_global_var(V_DOOR_PASSED, 1);
        create_module(&mut world, root, ModuleId::Intro, -1);

        let module = load_game(&mut world, root, &path).expect("load");
        assert_eq!(module, ModuleId::Hall);
        assert_eq!(current_module(&world, root), Some(ModuleId::Hall));
        assert_eq!(world.services.vars.to_saved(), before);
        assert_eq!(world.services.vars.global_var(V_DOOR_PASSED), 0);
    }

    #[test]
    fn tampered_save_is_rejected_and_the_game_keeps_running() {
        let temp = TempDir::new().expect("temp");
        let path = save_path(temp.path());
        let (mut world, root) = game_world(ModuleId::Hall);
        save_game(&world, root, &path).expect("save");

        let raw = fs::read_to_string(&path).expect("read");
        let mut json: Value = serde_json::from_str(&raw).expect("json");
        json["scene_num"] = Value::from(4);
        fs::write(&path, serde_json::to_string(&json).expect("encode")).expect("write");

        create_module(&mut world, root, ModuleId::Passage, 0);
        let error = load_game(&mut world, root, &path).expect_err("tampered");
        assert!(matches!(error, SaveError::Checksum { .. }), "{error}");
        assert_eq!(current_module(&world, root), Some(ModuleId::Passage));
        assert_eq!(world.services.game_state.scene_num, 0);
    }

    #[test]
    fn parse_errors_name_the_offending_field() {
        let raw = r#"{
            "save_version": 1,
            "module": "attic",
            "scene_num": 0,
            "vars": [],
            "checksum": ""
        }"#;
        let error = parse_save_json(raw).expect_err("bad module");
        match error {
            SaveError::Parse { ref path, .. } => assert_eq!(path, "module"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(error.to_string().starts_with("parse save json at module:"));

        let error = parse_save_json("42").expect_err("not an object");
        assert!(matches!(error, SaveError::Parse { ref path, .. } if path == "."));
    }

    #[test]
    fn validation_reports_version_and_duplicates() {
        let mut services = seeded_services(1);
        services.vars.set_global_var(0x1000_0001, 5);
        let mut save = SaveGame::capture(&services, ModuleId::Hall).expect("capture");
        assert!(validate_save(&save).is_ok());

        save.save_version = 9;
        assert!(matches!(
            validate_save(&save),
            Err(SaveError::Version {
                expected: SAVE_VERSION,
                actual: 9
            })
        ));

        save.save_version = SAVE_VERSION;
        save.vars = vec![
            SavedVar {
                name_hash: 0x10,
                value: 1,
                sub_vars: vec![
                    SavedSubVar {
                        sub_name_hash: 2,
                        value: 1,
                    },
                    SavedSubVar {
                        sub_name_hash: 2,
                        value: 3,
                    },
                ],
            },
        ];
        save.checksum = seal(save.module, save.scene_num, &save.vars).expect("seal");
        let error = validate_save(&save).expect_err("duplicate sub-var");
        assert!(matches!(
            error,
            SaveError::Invalid { ref path, .. } if path == "vars[0].sub_vars[1].sub_name_hash"
        ));

        save.vars.push(SavedVar {
            name_hash: 0x10,
            value: 2,
            sub_vars: Vec::new(),
        });
        save.vars[0].sub_vars.pop();
        save.checksum = seal(save.module, save.scene_num, &save.vars).expect("seal");
        let error = validate_save(&save).expect_err("duplicate var");
        assert!(matches!(
            error,
            SaveError::Invalid { ref path, .. } if path == "vars[1].name_hash"
        ));
    }

    #[test]
    fn missing_save_reports_the_path() {
        let temp = TempDir::new().expect("temp");
        let path = save_path(temp.path());
        let error = read_save(&path).expect_err("missing");
        assert!(matches!(error, SaveError::Io { action: "read", .. }));
        assert!(error.to_string().contains("slot0.json"));
    }
