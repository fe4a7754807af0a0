use std::f32::consts::TAU;

use farmsim_engine::{GridSize, TerrainMasks, TilePos, TileRect};
use tracing::{debug, warn};

use super::placement::{self, IntersectionProbe};
use super::types::{
    ActionId, ActionOutcome, GameSession, Health, ObjectId, ObjectKind, PlacementValidity,
};
use super::{
    DRAG_ACTIVATION_DELAY_SECONDS, SELECTION_PULSE_CYCLE_SECONDS, SELECTION_PULSE_MAX_OFFSET_PX,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionState {
    pub(crate) current: Option<ActionId>,
    pub(crate) in_progress: bool,
}

/// A placeable object on the tile grid.
///
/// `position` is the committed top-left and only changes through
/// [`WorldObject::accept_placement`] or a drag cancel. While dragging, the
/// visible position is `position + drag_offset`.
#[derive(Debug, Clone)]
pub(crate) struct WorldObject {
    id: ObjectId,
    name: String,
    kind: ObjectKind,
    footprint: GridSize,
    position: TilePos,
    drag_offset: (i32, i32),
    original_position: TilePos,
    anchor_delta: (i32, i32),
    selected: bool,
    selection_phase_seconds: f32,
    dragging: bool,
    drag_delay_remaining_seconds: f32,
    validity: PlacementValidity,
    action: ActionState,
    health: Option<Health>,
}

impl WorldObject {
    pub(crate) fn new(
        id: ObjectId,
        name: impl Into<String>,
        kind: ObjectKind,
        position: TilePos,
        footprint: GridSize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            footprint,
            position,
            drag_offset: (0, 0),
            original_position: position,
            anchor_delta: (0, 0),
            selected: false,
            selection_phase_seconds: 0.0,
            dragging: false,
            drag_delay_remaining_seconds: 0.0,
            validity: PlacementValidity::valid(),
            action: ActionState::default(),
            health: kind.default_health().map(Health::full),
        }
    }

    pub(crate) fn with_health(mut self, max: u32) -> Self {
        if self.health.is_some() {
            self.health = Some(Health::full(max.max(1)));
        }
        self
    }

    pub(crate) fn id(&self) -> ObjectId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub(crate) fn footprint(&self) -> GridSize {
        self.footprint
    }

    pub(crate) fn position(&self) -> TilePos {
        self.position
    }

    pub(crate) fn drag_offset(&self) -> (i32, i32) {
        self.drag_offset
    }

    pub(crate) fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub(crate) fn drag_activation_pending(&self) -> bool {
        self.dragging && self.drag_delay_remaining_seconds > 0.0
    }

    pub(crate) fn placement_validity(&self) -> &PlacementValidity {
        &self.validity
    }

    pub(crate) fn action_state(&self) -> ActionState {
        self.action
    }

    pub(crate) fn health(&self) -> Option<Health> {
        self.health
    }

    pub(crate) fn committed_rect(&self) -> TileRect {
        TileRect::new(self.position, self.footprint)
    }

    pub(crate) fn current_rect(&self) -> TileRect {
        TileRect::new(
            self.position.offset(self.drag_offset.0, self.drag_offset.1),
            self.footprint,
        )
    }

    pub(crate) fn rect_at(&self, origin: TilePos) -> TileRect {
        TileRect::new(origin, self.footprint)
    }

    pub(crate) fn capabilities(&self) -> &'static [ActionId] {
        self.kind.capabilities()
    }

    pub(crate) fn can_perform(&self, action: ActionId) -> bool {
        self.capabilities().contains(&action)
    }

    pub(crate) fn select(&mut self, tile: TilePos) -> bool {
        if self.dragging || self.action.in_progress {
            return false;
        }
        self.selected = true;
        self.anchor_delta = (
            tile.x.saturating_sub(self.position.x),
            tile.y.saturating_sub(self.position.y),
        );
        self.selection_phase_seconds = 0.0;
        self.drag_offset = (0, 0);
        self.drag_delay_remaining_seconds = 0.0;
        true
    }

    pub(crate) fn start_dragging(&mut self) -> bool {
        if !self.selected || !self.can_perform(ActionId::Move) {
            return false;
        }
        self.original_position = self.position;
        self.selected = false;
        self.dragging = true;
        self.drag_offset = (0, 0);
        self.drag_delay_remaining_seconds = DRAG_ACTIVATION_DELAY_SECONDS;
        true
    }

    /// Moves the drag preview so the grabbed tile follows `pointer`.
    pub(crate) fn update_drag_position(
        &mut self,
        pointer: TilePos,
        bounds: GridSize,
        masks: &TerrainMasks,
        probe: Option<&dyn IntersectionProbe>,
    ) {
        if !self.dragging {
            return;
        }
        if self.drag_delay_remaining_seconds <= 0.0 {
            let desired = TilePos::new(
                pointer.x.saturating_sub(self.anchor_delta.0),
                pointer.y.saturating_sub(self.anchor_delta.1),
            );
            let clamped = placement::clamp_origin(desired, self.footprint, bounds);
            self.drag_offset = (clamped.x - self.position.x, clamped.y - self.position.y);
        }
        self.refresh_placement(bounds, masks, probe);
    }

    pub(crate) fn validate_placement(
        &self,
        bounds: GridSize,
        masks: &TerrainMasks,
        probe: Option<&dyn IntersectionProbe>,
    ) -> PlacementValidity {
        placement::validate(self.id, self.current_rect(), bounds, masks, probe)
    }

    pub(crate) fn refresh_placement(
        &mut self,
        bounds: GridSize,
        masks: &TerrainMasks,
        probe: Option<&dyn IntersectionProbe>,
    ) -> &PlacementValidity {
        self.validity = self.validate_placement(bounds, masks, probe);
        &self.validity
    }

    /// Commits the drag offset only when the last validation passed; the drag
    /// ends either way.
    pub(crate) fn accept_placement(&mut self) -> bool {
        if !self.dragging {
            return false;
        }
        if self.validity.valid {
            self.position = self.position.offset(self.drag_offset.0, self.drag_offset.1);
        }
        self.end_drag();
        true
    }

    pub(crate) fn cancel_dragging(&mut self) -> bool {
        if !self.dragging {
            return false;
        }
        self.position = self.original_position;
        self.end_drag();
        true
    }

    pub(crate) fn cancel_selection(&mut self) -> bool {
        if !self.selected {
            return false;
        }
        self.selected = false;
        self.selection_phase_seconds = 0.0;
        true
    }

    pub(crate) fn cancel_action(&mut self) -> bool {
        if !self.action.in_progress && self.action.current.is_none() {
            return false;
        }
        self.action = ActionState::default();
        true
    }

    pub(crate) fn perform_action(
        &mut self,
        action: ActionId,
        session: &mut GameSession,
    ) -> ActionOutcome {
        if !self.can_perform(action) {
            warn!(
                object = %self.id,
                kind = self.kind.as_token(),
                action = action.as_token(),
                "action_not_supported"
            );
            return ActionOutcome::Blocked;
        }

        let outcome = match (self.kind, action) {
            (ObjectKind::Building, ActionId::Move) => {
                if self.start_dragging() {
                    ActionOutcome::Continued
                } else {
                    ActionOutcome::Blocked
                }
            }
            (ObjectKind::Tree, ActionId::Water) => self.water(session),
            (ObjectKind::Tree, ActionId::Axe) | (ObjectKind::Rock, ActionId::Pickaxe) => {
                self.hit(action, session)
            }
            _ => ActionOutcome::Blocked,
        };
        debug!(
            object = %self.id,
            action = action.as_token(),
            outcome = ?outcome,
            health = ?self.health.map(|health| health.current),
            "action_performed"
        );
        outcome
    }

    fn hit(&mut self, action: ActionId, session: &mut GameSession) -> ActionOutcome {
        self.action = ActionState {
            current: Some(action),
            in_progress: true,
        };
        let Some(health) = self.health.as_mut() else {
            self.action = ActionState::default();
            return ActionOutcome::Blocked;
        };
        health.current = health.current.saturating_sub(1);
        let depleted = health.is_depleted();
        session.record_hit(action);

        if depleted {
            self.action = ActionState::default();
            return ActionOutcome::Destroyed;
        }
        if !action.is_repeatable() {
            self.action = ActionState::default();
        }
        ActionOutcome::Continued
    }

    fn water(&mut self, session: &mut GameSession) -> ActionOutcome {
        self.action = ActionState {
            current: Some(ActionId::Water),
            in_progress: true,
        };
        if let Some(health) = self.health.as_mut() {
            health.current = health.max;
        }
        session.record_hit(ActionId::Water);
        self.action = ActionState::default();
        ActionOutcome::Continued
    }

    pub(crate) fn advance_selection_phase(&mut self, dt_seconds: f32) {
        if !self.selected {
            return;
        }
        self.selection_phase_seconds =
            (self.selection_phase_seconds + dt_seconds) % SELECTION_PULSE_CYCLE_SECONDS;
    }

    pub(crate) fn advance_drag_delay(&mut self, dt_seconds: f32) {
        if self.dragging {
            self.drag_delay_remaining_seconds =
                (self.drag_delay_remaining_seconds - dt_seconds).max(0.0);
        }
    }

    pub(crate) fn selection_pulse_offset(&self) -> i32 {
        if !self.selected {
            return 0;
        }
        let cycle = self.selection_phase_seconds / SELECTION_PULSE_CYCLE_SECONDS;
        let wave = ((cycle * TAU).sin() + 1.0) * 0.5;
        (wave * SELECTION_PULSE_MAX_OFFSET_PX).trunc() as i32
    }

    pub(crate) fn reset(&mut self) {
        self.drag_offset = (0, 0);
        self.original_position = self.position;
        self.anchor_delta = (0, 0);
        self.selected = false;
        self.selection_phase_seconds = 0.0;
        self.dragging = false;
        self.drag_delay_remaining_seconds = 0.0;
        self.validity = PlacementValidity::valid();
        self.action = ActionState::default();
    }

    fn end_drag(&mut self) {
        self.drag_offset = (0, 0);
        self.dragging = false;
        self.drag_delay_remaining_seconds = 0.0;
    }
}
