use farmsim_engine::{GridSize, TerrainMasks, TilePos, TileRect};

use super::types::{ObjectId, PlacementReason, PlacementValidity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OverlapHit {
    pub(crate) id: ObjectId,
    pub(crate) name: String,
}

/// Answers "does `rect` overlap any object other than `subject`?".
pub(crate) trait IntersectionProbe {
    fn first_overlap(&self, subject: ObjectId, rect: TileRect) -> Option<OverlapHit>;
}

pub(crate) fn check_bounds(rect: TileRect, bounds: GridSize) -> Option<PlacementReason> {
    (!rect.is_within(bounds)).then_some(PlacementReason::OutOfBounds)
}

/// Water wins over blocking for a cell that carries both.
pub(crate) fn check_terrain(rect: TileRect, masks: &TerrainMasks) -> Option<PlacementReason> {
    for cell in rect.cells() {
        if masks.water_at(cell) {
            return Some(PlacementReason::OnWater);
        }
        if masks.blocking_at(cell) {
            return Some(PlacementReason::OnBlocking);
        }
    }
    None
}

pub(crate) fn check_intersection(
    subject: ObjectId,
    rect: TileRect,
    probe: &dyn IntersectionProbe,
) -> Option<PlacementReason> {
    probe
        .first_overlap(subject, rect)
        .map(|hit| PlacementReason::Occupied(hit.name))
}

pub(crate) fn validate(
    subject: ObjectId,
    rect: TileRect,
    bounds: GridSize,
    masks: &TerrainMasks,
    probe: Option<&dyn IntersectionProbe>,
) -> PlacementValidity {
    let failure = check_bounds(rect, bounds)
        .or_else(|| check_terrain(rect, masks))
        .or_else(|| probe.and_then(|probe| check_intersection(subject, rect, probe)));
    match failure {
        Some(reason) => PlacementValidity::invalid(reason),
        None => PlacementValidity::valid(),
    }
}

/// Clamps a desired top-left so the footprint stays inside `bounds`.
pub(crate) fn clamp_origin(desired: TilePos, footprint: GridSize, bounds: GridSize) -> TilePos {
    let max_origin = |extent: u32, span: u32| {
        i32::try_from(extent.saturating_sub(span)).unwrap_or(i32::MAX)
    };
    TilePos::new(
        desired.x.clamp(0, max_origin(bounds.width, footprint.width)),
        desired.y.clamp(0, max_origin(bounds.height, footprint.height)),
    )
}

#[cfg(test)]
mod tests {
    use farmsim_engine::BoolGrid;

    use super::*;

    struct FixedProbe(Vec<(ObjectId, &'static str, TileRect)>);

    impl IntersectionProbe for FixedProbe {
        fn first_overlap(&self, subject: ObjectId, rect: TileRect) -> Option<OverlapHit> {
            self.0
                .iter()
                .find(|(id, _, other)| *id != subject && rect.overlaps(other))
                .map(|(id, name, _)| OverlapHit {
                    id: *id,
                    name: name.to_string(),
                })
        }
    }

    fn rect(x: i32, y: i32, width: u32, height: u32) -> TileRect {
        TileRect::new(TilePos::new(x, y), GridSize::new(width, height))
    }

    fn masks_with(size: GridSize, water: &[TilePos], blocking: &[TilePos]) -> TerrainMasks {
        let mut water_grid = BoolGrid::empty(size);
        for tile in water {
            water_grid.set(*tile, true);
        }
        let mut blocking_grid = BoolGrid::empty(size);
        for tile in blocking {
            blocking_grid.set(*tile, true);
        }
        TerrainMasks::new(size, water_grid, blocking_grid).expect("masks")
    }

    #[test]
    fn out_of_bounds_takes_priority_over_terrain() {
        let size = GridSize::new(10, 10);
        let masks = masks_with(size, &[TilePos::new(0, 0)], &[]);
        let validity = validate(ObjectId(1), rect(-1, 0, 2, 2), size, &masks, None);
        assert_eq!(validity.reason, Some(PlacementReason::OutOfBounds));
    }

    #[test]
    fn water_is_reported_before_blocking_on_the_same_cell() {
        let size = GridSize::new(10, 10);
        let tile = TilePos::new(4, 4);
        let masks = masks_with(size, &[tile], &[tile]);
        let validity = validate(ObjectId(1), rect(3, 3, 2, 2), size, &masks, None);
        assert!(!validity.valid);
        assert_eq!(validity.reason, Some(PlacementReason::OnWater));
    }

    #[test]
    fn blocking_reported_when_no_water_is_covered() {
        let size = GridSize::new(10, 10);
        let masks = masks_with(size, &[TilePos::new(9, 9)], &[TilePos::new(3, 4)]);
        let validity = validate(ObjectId(1), rect(3, 3, 2, 2), size, &masks, None);
        assert_eq!(validity.reason, Some(PlacementReason::OnBlocking));
    }

    #[test]
    fn occupied_names_the_other_object_and_ignores_self() {
        let size = GridSize::new(30, 30);
        let masks = TerrainMasks::empty(size);
        let probe = FixedProbe(vec![
            (ObjectId(1), "barn", rect(10, 6, 3, 2)),
            (ObjectId(2), "shed", rect(11, 7, 3, 2)),
        ]);

        let validity = validate(ObjectId(2), rect(11, 7, 3, 2), size, &masks, Some(&probe));
        assert_eq!(
            validity.reason,
            Some(PlacementReason::Occupied("barn".to_string()))
        );

        let touching = validate(ObjectId(2), rect(13, 6, 3, 2), size, &masks, Some(&probe));
        assert!(touching.valid);
    }

    #[test]
    fn probe_is_skipped_when_absent() {
        let size = GridSize::new(30, 30);
        let masks = TerrainMasks::empty(size);
        let validity = validate(ObjectId(2), rect(10, 6, 3, 2), size, &masks, None);
        assert_eq!(validity, PlacementValidity::valid());
    }

    #[test]
    fn clamp_origin_keeps_footprint_inside() {
        let bounds = GridSize::new(30, 30);
        let footprint = GridSize::new(3, 2);
        assert_eq!(
            clamp_origin(TilePos::new(-1, 6), footprint, bounds),
            TilePos::new(0, 6)
        );
        assert_eq!(
            clamp_origin(TilePos::new(40, 29), footprint, bounds),
            TilePos::new(27, 28)
        );
    }
}
