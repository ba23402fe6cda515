use codeatlas_core::SurfaceEvent;
use crossbeam_channel::Receiver;

use crate::scene::Scene;

// Upper bound per pump so one frame cannot starve.
pub const MAX_EVENTS_PER_PUMP: usize = 100_000;

// Drains pending surface events on the presentation thread. Ticks advance
// positions and a layout request is acknowledged before `present` sees it,
// so the next mutation announces itself again.
pub fn pump(scene: &Scene, rx: &Receiver<SurfaceEvent>, mut present: impl FnMut(SurfaceEvent)) -> usize {
    let mut handled = 0;
    for ev in rx.try_iter().take(MAX_EVENTS_PER_PUMP) {
        match ev {
            SurfaceEvent::AdvancePositions => scene.advance_positions(),
            SurfaceEvent::LayoutDirty => {
                scene.take_layout_dirty();
            }
            _ => {}
        }
        present(ev);
        handled += 1;
    }
    handled
}
