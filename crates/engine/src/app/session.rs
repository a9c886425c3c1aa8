use crate::surface::DrawSurface;

use super::InputSnapshot;

/// What the tick loop drives: one running game.
pub trait Session {
    fn update(&mut self, input: &InputSnapshot);
    fn draw(&self, surface: &mut dyn DrawSurface);
    fn shutdown(&mut self);

    /// Reported with the periodic loop metrics.
    fn entity_count(&self) -> usize {
        0
    }
}
