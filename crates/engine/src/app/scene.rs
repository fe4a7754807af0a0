use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::input::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Reset,
    Quit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Grid cell coordinate. Negative values are legal and mean "off the map".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Saturates at the `i32` range instead of wrapping.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn cell_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(self, tile: TilePos) -> bool {
        tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < self.width && (tile.y as u32) < self.height
    }
}

/// Axis-aligned tile rectangle covering `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRect {
    pub origin: TilePos,
    pub size: GridSize,
}

impl TileRect {
    pub const fn new(origin: TilePos, size: GridSize) -> Self {
        Self { origin, size }
    }

    pub fn left(&self) -> i32 {
        self.origin.x
    }

    pub fn top(&self) -> i32 {
        self.origin.y
    }

    /// Exclusive right edge, saturated at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.origin.x.saturating_add_unsigned(self.size.width)
    }

    /// Exclusive bottom edge, saturated at `i32::MAX`.
    pub fn bottom(&self) -> i32 {
        self.origin.y.saturating_add_unsigned(self.size.height)
    }

    pub fn contains(&self, tile: TilePos) -> bool {
        tile.x >= self.left() && tile.x < self.right() && tile.y >= self.top() && tile.y < self.bottom()
    }

    /// Half-open overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &TileRect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// Edges are compared as `i64`; a rect whose edge saturated never fits.
    pub fn is_within(&self, bounds: GridSize) -> bool {
        let right = i64::from(self.left()) + i64::from(self.size.width);
        let bottom = i64::from(self.top()) + i64::from(self.size.height);
        self.left() >= 0
            && self.top() >= 0
            && right <= i64::from(bounds.width)
            && bottom <= i64::from(bounds.height)
    }

    pub fn cells(&self) -> impl Iterator<Item = TilePos> + '_ {
        (self.top()..self.bottom())
            .flat_map(move |y| (self.left()..self.right()).map(move |x| TilePos::new(x, y)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
    #[error("row count mismatch: expected {expected}, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },
    #[error("row {row} has width {actual}, expected {expected}")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{name} mask is {actual_width}x{actual_height}, scene is {expected_width}x{expected_height}")]
    SizeMismatch {
        name: &'static str,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// Row-major boolean grid. Out-of-range lookups read as unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolGrid {
    size: GridSize,
    cells: Vec<bool>,
}

impl BoolGrid {
    pub fn new(size: GridSize, cells: Vec<bool>) -> Result<Self, MaskError> {
        let expected = size.cell_count();
        let actual = cells.len();
        if expected != actual {
            return Err(MaskError::CellCountMismatch { expected, actual });
        }
        Ok(Self { size, cells })
    }

    pub fn empty(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![false; size.cell_count()],
        }
    }

    /// Parses text rows where `.` is unset and any other character is set.
    pub fn from_rows<S: AsRef<str>>(size: GridSize, rows: &[S]) -> Result<Self, MaskError> {
        if rows.len() != size.height as usize {
            return Err(MaskError::RowCountMismatch {
                expected: size.height as usize,
                actual: rows.len(),
            });
        }
        let mut cells = Vec::with_capacity(size.cell_count());
        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let width = row.chars().count();
            if width != size.width as usize {
                return Err(MaskError::RowWidthMismatch {
                    row: row_index,
                    expected: size.width as usize,
                    actual: width,
                });
            }
            cells.extend(row.chars().map(|cell| cell != '.'));
        }
        Self::new(size, cells)
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn index_of(&self, tile: TilePos) -> Option<usize> {
        if !self.size.contains(tile) {
            return None;
        }
        Some(tile.y as usize * self.size.width as usize + tile.x as usize)
    }

    pub fn is_set(&self, tile: TilePos) -> bool {
        self.index_of(tile)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(false)
    }

    pub fn set(&mut self, tile: TilePos, value: bool) -> bool {
        let Some(index) = self.index_of(tile) else {
            return false;
        };
        self.cells[index] = value;
        true
    }
}

/// Water and blocking masks, written once at scene load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainMasks {
    water: BoolGrid,
    blocking: BoolGrid,
}

impl TerrainMasks {
    pub fn new(size: GridSize, water: BoolGrid, blocking: BoolGrid) -> Result<Self, MaskError> {
        for (name, grid) in [("water", &water), ("blocking", &blocking)] {
            if grid.size() != size {
                return Err(MaskError::SizeMismatch {
                    name,
                    expected_width: size.width,
                    expected_height: size.height,
                    actual_width: grid.size().width,
                    actual_height: grid.size().height,
                });
            }
        }
        Ok(Self { water, blocking })
    }

    pub fn empty(size: GridSize) -> Self {
        Self {
            water: BoolGrid::empty(size),
            blocking: BoolGrid::empty(size),
        }
    }

    pub fn size(&self) -> GridSize {
        self.water.size()
    }

    pub fn water_at(&self, tile: TilePos) -> bool {
        self.water.is_set(tile)
    }

    pub fn blocking_at(&self, tile: TilePos) -> bool {
        self.blocking.is_set(tile)
    }
}

pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn render(&mut self) {}
    fn unload(&mut self);
    /// Called for [`SceneCommand::Reset`]. Defaults to a full reload.
    fn reset(&mut self) {
        self.unload();
        self.load();
    }
    fn debug_title(&self) -> Option<String> {
        None
    }
}

pub struct SceneRuntime {
    scene: Box<dyn Scene>,
    is_loaded: bool,
}

impl SceneRuntime {
    pub fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            is_loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load();
        self.is_loaded = true;
    }

    pub fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if !self.is_loaded {
            return SceneCommand::None;
        }
        self.scene.update(fixed_dt_seconds, input)
    }

    pub fn render(&mut self) {
        if self.is_loaded {
            self.scene.render();
        }
    }

    pub fn reset(&mut self) {
        if !self.is_loaded {
            self.load();
            return;
        }
        self.scene.reset();
        info!(title = ?self.scene.debug_title(), "scene_reset");
    }

    pub fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload();
            self.is_loaded = false;
        }
    }

    pub fn debug_title(&self) -> Option<String> {
        self.scene.debug_title()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn rect(x: i32, y: i32, width: u32, height: u32) -> TileRect {
        TileRect::new(TilePos::new(x, y), GridSize::new(width, height))
    }

    #[derive(Default)]
    struct CallLog {
        loads: u32,
        unloads: u32,
        updates: u32,
    }

    struct CountingScene {
        log: Rc<RefCell<CallLog>>,
    }

    impl Scene for CountingScene {
        fn load(&mut self) {
            self.log.borrow_mut().loads += 1;
        }

        fn update(&mut self, _fixed_dt_seconds: f32, _input: &InputSnapshot) -> SceneCommand {
            self.log.borrow_mut().updates += 1;
            SceneCommand::None
        }

        fn unload(&mut self) {
            self.log.borrow_mut().unloads += 1;
        }
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = rect(10, 6, 3, 2);
        assert!(!a.overlaps(&rect(13, 6, 3, 2)));
        assert!(!a.overlaps(&rect(10, 8, 3, 2)));
        assert!(a.overlaps(&rect(12, 7, 3, 2)));
        assert!(a.overlaps(&rect(11, 7, 1, 1)));
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = rect(5, 8, 2, 3);
        assert!(r.contains(TilePos::new(5, 8)));
        assert!(r.contains(TilePos::new(6, 10)));
        assert!(!r.contains(TilePos::new(7, 10)));
        assert!(!r.contains(TilePos::new(5, 11)));
    }

    #[test]
    fn rect_within_bounds_rejects_negative_and_overflowing() {
        let bounds = GridSize::new(30, 30);
        assert!(rect(0, 0, 3, 2).is_within(bounds));
        assert!(rect(27, 28, 3, 2).is_within(bounds));
        assert!(!rect(-1, 6, 3, 2).is_within(bounds));
        assert!(!rect(28, 6, 3, 2).is_within(bounds));
    }

    #[test]
    fn rect_edges_saturate_near_i32_max() {
        let far = rect(i32::MAX, 0, 1, 1);
        assert_eq!(far.right(), i32::MAX);
        assert!(!far.is_within(GridSize::new(4, 4)));

        let wide = rect(0, 0, u32::MAX, 1);
        assert_eq!(wide.right(), i32::MAX);
        assert!(!wide.is_within(GridSize::new(4, 4)));
        assert!(!rect(0, 0, 1, i32::MAX as u32 + 1).is_within(GridSize::new(4, 4)));
    }

    #[test]
    fn tile_offset_saturates() {
        assert_eq!(TilePos::new(i32::MIN, 3).offset(-1, 2), TilePos::new(i32::MIN, 5));
        assert_eq!(TilePos::new(i32::MAX, 0).offset(5, 0).x, i32::MAX);
    }

    #[test]
    fn rect_cells_cover_footprint_row_major() {
        let cells: Vec<TilePos> = rect(1, 2, 2, 2).cells().collect();
        assert_eq!(
            cells,
            vec![
                TilePos::new(1, 2),
                TilePos::new(2, 2),
                TilePos::new(1, 3),
                TilePos::new(2, 3),
            ]
        );
    }

    #[test]
    fn bool_grid_rejects_wrong_cell_count() {
        let error = BoolGrid::new(GridSize::new(2, 2), vec![false; 3]).unwrap_err();
        assert_eq!(
            error,
            MaskError::CellCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn bool_grid_parses_rows_and_reads_out_of_range_as_unset() {
        let grid = BoolGrid::from_rows(GridSize::new(3, 2), &["..~", "#.."]).expect("grid");
        assert!(grid.is_set(TilePos::new(2, 0)));
        assert!(grid.is_set(TilePos::new(0, 1)));
        assert!(!grid.is_set(TilePos::new(1, 1)));
        assert!(!grid.is_set(TilePos::new(-1, 0)));
        assert!(!grid.is_set(TilePos::new(3, 0)));
    }

    #[test]
    fn bool_grid_reports_ragged_rows() {
        let error = BoolGrid::from_rows(GridSize::new(3, 2), &["...", ".."]).unwrap_err();
        assert_eq!(
            error,
            MaskError::RowWidthMismatch {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn terrain_masks_require_scene_size() {
        let size = GridSize::new(4, 4);
        let error = TerrainMasks::new(
            size,
            BoolGrid::empty(size),
            BoolGrid::empty(GridSize::new(4, 3)),
        )
        .unwrap_err();
        assert!(matches!(error, MaskError::SizeMismatch { name: "blocking", .. }));
    }

    #[test]
    fn runtime_loads_once_and_resets_by_reloading() {
        let log = Rc::new(RefCell::new(CallLog::default()));
        let mut runtime = SceneRuntime::new(Box::new(CountingScene { log: log.clone() }));

        assert_eq!(runtime.update(0.1, &InputSnapshot::empty()), SceneCommand::None);
        assert_eq!(log.borrow().updates, 0);

        runtime.load();
        runtime.load();
        let _ = runtime.update(0.1, &InputSnapshot::empty());
        runtime.reset();
        runtime.shutdown();

        let log = log.borrow();
        assert_eq!(log.loads, 2);
        assert_eq!(log.unloads, 2);
        assert_eq!(log.updates, 1);
        assert!(!runtime.is_loaded());
    }

    #[test]
    fn vec2_distance_is_euclidean() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((a.distance_to(b) - 5.0).abs() < 1e-6);
    }
}
