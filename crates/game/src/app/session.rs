use std::path::PathBuf;

use hood_engine::{DrawSurface, EntityId, EntityWorld, InputSnapshot, Session};
use tracing::{info, warn};

use super::gameplay;

/// One running game: the entity world plus the slot it saves into.
pub(crate) struct GameSession {
    world: EntityWorld,
    root: EntityId,
    save_path: PathBuf,
    ticks: u64,
}

impl GameSession {
    pub(crate) fn new(world: EntityWorld, root: EntityId, save_path: PathBuf) -> Self {
        Self {
            world,
            root,
            save_path,
            ticks: 0,
        }
    }

    fn save(&self) {
        if let Err(error) = gameplay::save_game(&self.world, self.root, &self.save_path) {
            warn!(error = %error, path = %self.save_path.display(), "save_failed");
        }
    }

    fn load(&mut self) {
        if let Err(error) = gameplay::load_game(&mut self.world, self.root, &self.save_path) {
            warn!(error = %error, path = %self.save_path.display(), "load_failed");
        }
    }
}

impl Session for GameSession {
    fn update(&mut self, input: &InputSnapshot) {
        if let Some(cursor) = input.cursor() {
            gameplay::handle_mouse_move(&mut self.world, self.root, cursor);
        }
        if let Some(click) = input.click() {
            gameplay::handle_mouse_down(&mut self.world, self.root, click);
        }

        self.world.update_entity(self.root);
        self.world.reclaim_destroyed();
        self.ticks += 1;

        if input.save_pressed() {
            self.save();
        }
        if input.load_pressed() {
            self.load();
            self.world.reclaim_destroyed();
        }
    }

    fn draw(&self, surface: &mut dyn DrawSurface) {
        self.world.draw_entity(self.root, surface);
    }

    fn shutdown(&mut self) {
        info!(
            ticks = self.ticks,
            entities = self.world.entity_count(),
            module = ?gameplay::current_module(&self.world, self.root),
            "session_shutdown"
        );
    }

    fn entity_count(&self) -> usize {
        self.world.entity_count()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use hood_engine::content::{load_resource_manifest, load_scene_data};
    use hood_engine::{Point, RecordingSurface, ScriptedRandom};
    use tempfile::TempDir;

    use super::*;
    use crate::app::gameplay::{build_world, GameContent, ModuleId, SAVE_SLOT_FILE};

    fn session(start: ModuleId, saves: &TempDir) -> GameSession {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets");
        let resources =
            load_resource_manifest(&assets.join("resources/resources.xml")).expect("resources");
        let hall = load_scene_data(&assets.join("scenes/hall.xml")).expect("hall scene");
        let (world, root) = build_world(
            Box::new(resources),
            Box::new(ScriptedRandom::default()),
            GameContent {
                hall: Arc::new(hall),
            },
            start,
        );
        GameSession::new(world, root, saves.path().join(SAVE_SLOT_FILE))
    }

    fn input(click: Option<Point>, save: bool, load: bool) -> InputSnapshot {
        InputSnapshot::new(false, click, click, save, load)
    }

    #[test]
    fn click_is_forwarded_and_skips_the_intro() {
        let saves = TempDir::new().expect("temp");
        let mut session = session(ModuleId::Intro, &saves);
        session.update(&input(None, false, false));
        session.update(&input(Some(Point::new(20, 20)), false, false));
        assert_eq!(
            gameplay::current_module(&session.world, session.root),
            Some(ModuleId::Hall)
        );
    }

    #[test]
    fn save_key_writes_the_slot_and_load_key_restores_it() {
        let saves = TempDir::new().expect("temp");
        let mut session = session(ModuleId::Hall, &saves);
        session.update(&input(None, true, false));
        assert!(saves.path().join(SAVE_SLOT_FILE).is_file());

        gameplay::create_module(&mut session.world, session.root, ModuleId::Passage, 0);
        session.update(&input(None, false, true));
        assert_eq!(
            gameplay::current_module(&session.world, session.root),
            Some(ModuleId::Hall)
        );
    }

    #[test]
    fn failed_load_keeps_the_game_running() {
        let saves = TempDir::new().expect("temp");
        let mut session = session(ModuleId::Hall, &saves);
        session.update(&input(None, false, true));
        assert_eq!(
            gameplay::current_module(&session.world, session.root),
            Some(ModuleId::Hall)
        );
        assert!(session.entity_count() > 0);
    }

    #[test]
    fn draw_walks_the_tree_without_panicking() {
        let saves = TempDir::new().expect("temp");
        let session = session(ModuleId::Hall, &saves);
        let mut surface = RecordingSurface::default();
        session.draw(&mut surface);
        assert!(!surface.frames().is_empty());
    }
}
