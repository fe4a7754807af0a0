use std::collections::VecDeque;

use super::scene::TilePos;

/// Per-tick input, already resolved to tile coordinates by the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    quit_requested: bool,
    pointer_down_tile: Option<TilePos>,
    pointer_tile: Option<TilePos>,
    button_pressed: Option<u32>,
    reset_pressed: bool,
    viewport_resized: bool,
    dump_requested: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit() -> Self {
        Self {
            quit_requested: true,
            ..Self::default()
        }
    }

    pub fn with_pointer_down_tile(mut self, tile: Option<TilePos>) -> Self {
        self.pointer_down_tile = tile;
        self
    }

    pub fn with_pointer_tile(mut self, tile: Option<TilePos>) -> Self {
        self.pointer_tile = tile;
        self
    }

    pub fn with_button_pressed(mut self, callback_id: Option<u32>) -> Self {
        self.button_pressed = callback_id;
        self
    }

    pub fn with_reset_pressed(mut self, reset_pressed: bool) -> Self {
        self.reset_pressed = reset_pressed;
        self
    }

    pub fn with_viewport_resized(mut self, viewport_resized: bool) -> Self {
        self.viewport_resized = viewport_resized;
        self
    }

    pub fn with_dump_requested(mut self, dump_requested: bool) -> Self {
        self.dump_requested = dump_requested;
        self
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn pointer_down_tile(&self) -> Option<TilePos> {
        self.pointer_down_tile
    }

    pub fn pointer_tile(&self) -> Option<TilePos> {
        self.pointer_tile
    }

    pub fn button_pressed(&self) -> Option<u32> {
        self.button_pressed
    }

    pub fn reset_pressed(&self) -> bool {
        self.reset_pressed
    }

    pub fn viewport_resized(&self) -> bool {
        self.viewport_resized
    }

    pub fn dump_requested(&self) -> bool {
        self.dump_requested
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

pub type InputSourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Supplies one snapshot per simulation tick. `Ok(None)` ends the run.
pub trait InputSource {
    fn next_snapshot(&mut self) -> Result<Option<InputSnapshot>, InputSourceError>;
}

/// Fixed queue of snapshots, mostly for tests and replays.
#[derive(Debug, Default)]
pub struct QueuedInput {
    pending: VecDeque<InputSnapshot>,
}

impl QueuedInput {
    pub fn new(snapshots: impl IntoIterator<Item = InputSnapshot>) -> Self {
        Self {
            pending: snapshots.into_iter().collect(),
        }
    }

    pub fn push(&mut self, snapshot: InputSnapshot) {
        self.pending.push_back(snapshot);
    }

    pub fn push_idle_ticks(&mut self, count: usize) {
        self.pending
            .extend(std::iter::repeat(InputSnapshot::empty()).take(count));
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl InputSource for QueuedInput {
    fn next_snapshot(&mut self) -> Result<Option<InputSnapshot>, InputSourceError> {
        Ok(self.pending.pop_front())
    }
}
