use farmsim_engine::{GridSize, TilePos, TileRect, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::interaction::InteractionController;
use super::types::{ActionId, ActionOutcome, Facing, GameSession, ObjectId, ObjectKind};
use super::TILE_SIZE_PX;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AgentTuning {
    pub(crate) move_speed_px_per_second: f32,
    pub(crate) wander_speed_px_per_second: f32,
    pub(crate) arrival_epsilon_px: f32,
    pub(crate) swing_duration_seconds: f32,
    pub(crate) wander_interval_min_seconds: f32,
    pub(crate) wander_interval_max_seconds: f32,
    pub(crate) blocked_cooldown_seconds: f32,
    pub(crate) walk_cycle_seconds: f32,
    pub(crate) lookahead_px: f32,
    pub(crate) hitbox_inset_px: f32,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            move_speed_px_per_second: 64.0,
            wander_speed_px_per_second: 24.0,
            arrival_epsilon_px: 1.0,
            swing_duration_seconds: 0.6,
            wander_interval_min_seconds: 1.0,
            wander_interval_max_seconds: 3.0,
            blocked_cooldown_seconds: 0.25,
            walk_cycle_seconds: 0.4,
            lookahead_px: 4.0,
            hitbox_inset_px: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum AgentState {
    #[default]
    Idle,
    Wandering,
    MovingToTarget,
    PerformingAction,
}

impl AgentState {
    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Wandering => "wandering",
            Self::MovingToTarget => "moving_to_target",
            Self::PerformingAction => "performing_action",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum WanderDirection {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl WanderDirection {
    const ALL: [WanderDirection; 5] = [Self::None, Self::Up, Self::Down, Self::Left, Self::Right];

    fn unit(self) -> Vec2 {
        match self {
            Self::None => Vec2::ZERO,
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActionTarget {
    pub(crate) object: ObjectId,
    pub(crate) action: ActionId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PixelRect {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl PixelRect {
    fn from_tiles(rect: TileRect) -> Self {
        Self {
            left: rect.left() as f32 * TILE_SIZE_PX,
            top: rect.top() as f32 * TILE_SIZE_PX,
            right: rect.right() as f32 * TILE_SIZE_PX,
            bottom: rect.bottom() as f32 * TILE_SIZE_PX,
        }
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    fn is_within(&self, bounds: GridSize) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right <= bounds.width as f32 * TILE_SIZE_PX
            && self.bottom <= bounds.height as f32 * TILE_SIZE_PX
    }
}

/// Tile the agent walks to before acting on an object occupying `rect`.
///
/// Trees are approached along their bottom row; everything else from the
/// side, centered vertically. Equal distances pick the left side.
pub(crate) fn approach_tile(rect: TileRect, kind: ObjectKind, agent_column: i32) -> TilePos {
    let left_column = match kind {
        ObjectKind::Tree => rect.left(),
        ObjectKind::Building | ObjectKind::Rock => rect.left() - 1,
    };
    let right_column = rect.right();
    let column = if (agent_column - left_column).abs() <= (right_column - agent_column).abs() {
        left_column
    } else {
        right_column
    };
    let row = match kind {
        ObjectKind::Tree => rect.bottom() - 1,
        ObjectKind::Building | ObjectKind::Rock => {
            rect.top() + rect.size.height as i32 / 2
        }
    };
    TilePos::new(column, row)
}

fn tile_to_px(tile: TilePos) -> Vec2 {
    Vec2::new(tile.x as f32 * TILE_SIZE_PX, tile.y as f32 * TILE_SIZE_PX)
}

fn step_toward(
    current: Vec2,
    target: Vec2,
    speed: f32,
    fixed_dt_seconds: f32,
    arrival_threshold: f32,
) -> (Vec2, bool) {
    let distance = current.distance_to(target);
    let max_step = speed * fixed_dt_seconds;
    if distance <= arrival_threshold || max_step >= distance {
        return (target, true);
    }

    let scale = max_step / distance;
    (
        Vec2::new(
            current.x + (target.x - current.x) * scale,
            current.y + (target.y - current.y) * scale,
        ),
        false,
    )
}

/// The single controllable character. `position` is the top-left pixel of
/// a one-tile sprite.
pub(crate) struct AgentController {
    position: Vec2,
    facing: Facing,
    state: AgentState,
    wander_direction: WanderDirection,
    wander_cooldown_seconds: f32,
    target: Option<ActionTarget>,
    move_target: Option<Vec2>,
    action_timer_seconds: f32,
    walk_progress: f32,
    action_progress: f32,
    rng: StdRng,
    tuning: AgentTuning,
}

impl AgentController {
    pub(crate) fn new(spawn: TilePos, seed: u64, tuning: AgentTuning) -> Self {
        Self {
            position: tile_to_px(spawn),
            facing: Facing::default(),
            state: AgentState::Idle,
            wander_direction: WanderDirection::None,
            wander_cooldown_seconds: 0.0,
            target: None,
            move_target: None,
            action_timer_seconds: 0.0,
            walk_progress: 0.0,
            action_progress: 0.0,
            rng: StdRng::seed_from_u64(seed),
            tuning,
        }
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn state(&self) -> AgentState {
        self.state
    }

    pub(crate) fn target(&self) -> Option<ActionTarget> {
        self.target
    }

    #[cfg(test)]
    pub(crate) fn move_target(&self) -> Option<Vec2> {
        self.move_target
    }

    pub(crate) fn is_walking(&self) -> bool {
        matches!(self.state, AgentState::Wandering | AgentState::MovingToTarget)
    }

    pub(crate) fn walk_progress(&self) -> f32 {
        self.walk_progress
    }

    pub(crate) fn action_progress(&self) -> f32 {
        self.action_progress
    }

    pub(crate) fn tile_column(&self) -> i32 {
        ((self.position.x + TILE_SIZE_PX * 0.5) / TILE_SIZE_PX).floor() as i32
    }

    pub(crate) fn tile(&self) -> TilePos {
        TilePos::new(
            self.tile_column(),
            ((self.position.y + TILE_SIZE_PX * 0.5) / TILE_SIZE_PX).floor() as i32,
        )
    }

    pub(crate) fn request_action(
        &mut self,
        object: ObjectId,
        action: ActionId,
        controller: &mut InteractionController,
    ) -> bool {
        let Some(target) = controller.object(object) else {
            debug!(object = %object, action = action.as_token(), "agent_target_missing");
            return false;
        };
        if !target.can_perform(action) {
            debug!(
                object = %object,
                action = action.as_token(),
                "agent_target_lacks_capability"
            );
            return false;
        }
        let approach = approach_tile(target.current_rect(), target.kind(), self.tile_column());

        if let Some(previous) = self.target.take() {
            if previous.object != object {
                controller.cancel_object_action(previous.object);
            }
        }
        self.target = Some(ActionTarget { object, action });
        self.move_target = Some(tile_to_px(approach));
        self.state = AgentState::MovingToTarget;
        self.wander_direction = WanderDirection::None;
        self.action_timer_seconds = 0.0;
        self.action_progress = 0.0;
        info!(
            object = %object,
            action = action.as_token(),
            approach_x = approach.x,
            approach_y = approach.y,
            "agent_action_requested"
        );
        true
    }

    /// Hard abort of a pending or running action.
    pub(crate) fn interrupt(&mut self, controller: &mut InteractionController) -> bool {
        if !matches!(
            self.state,
            AgentState::MovingToTarget | AgentState::PerformingAction
        ) {
            return false;
        }
        if let Some(target) = self.target {
            controller.cancel_object_action(target.object);
            info!(
                object = %target.object,
                action = target.action.as_token(),
                state = self.state.as_token(),
                "agent_interrupted"
            );
        }
        self.return_to_idle();
        true
    }

    pub(crate) fn update(
        &mut self,
        dt_seconds: f32,
        controller: &mut InteractionController,
        session: &mut GameSession,
    ) {
        match self.state {
            AgentState::Idle | AgentState::Wandering => self.update_wander(dt_seconds, controller),
            AgentState::MovingToTarget => self.update_moving(dt_seconds, controller),
            AgentState::PerformingAction => {
                self.update_performing(dt_seconds, controller, session)
            }
        }
    }

    fn update_moving(&mut self, dt_seconds: f32, controller: &InteractionController) {
        let Some(target) = self.target else {
            self.return_to_idle();
            return;
        };
        let Some(object) = controller.object(target.object) else {
            debug!(object = %target.object, "agent_target_vanished");
            self.return_to_idle();
            return;
        };
        let Some(destination) = self.move_target else {
            self.begin_action(target.action, object.current_rect());
            return;
        };

        let (next, arrived) = step_toward(
            self.position,
            destination,
            self.tuning.move_speed_px_per_second,
            dt_seconds,
            self.tuning.arrival_epsilon_px,
        );
        self.face_along(next.x - self.position.x);
        self.advance_walk_cycle(dt_seconds);
        self.position = next;

        if arrived {
            self.position = destination;
            self.move_target = None;
            self.begin_action(target.action, object.current_rect());
        }
    }

    fn begin_action(&mut self, action: ActionId, target_rect: TileRect) {
        self.state = AgentState::PerformingAction;
        self.walk_progress = 0.0;
        self.action_timer_seconds = 0.0;
        self.action_progress = 0.0;
        if action == ActionId::Axe {
            let center = target_rect.left() as f32 + target_rect.size.width as f32 * 0.5;
            self.facing = if (self.tile_column() as f32) < center {
                Facing::Right
            } else {
                Facing::Left
            };
        }
        debug!(
            action = action.as_token(),
            facing = self.facing.as_token(),
            "agent_arrived"
        );
    }

    fn update_performing(
        &mut self,
        dt_seconds: f32,
        controller: &mut InteractionController,
        session: &mut GameSession,
    ) {
        let Some(target) = self.target else {
            self.return_to_idle();
            return;
        };
        if controller.object(target.object).is_none() {
            debug!(object = %target.object, "agent_target_vanished");
            self.return_to_idle();
            return;
        }

        let swing = self.tuning.swing_duration_seconds.max(f32::EPSILON);
        self.action_timer_seconds += dt_seconds;
        self.action_progress = (self.action_timer_seconds / swing).min(1.0);
        if self.action_timer_seconds < swing {
            return;
        }

        let outcome = controller.perform_action(target.object, target.action, session);
        let survives = controller
            .object(target.object)
            .and_then(|object| object.health())
            .is_some_and(|health| !health.is_depleted());
        debug!(
            object = %target.object,
            action = target.action.as_token(),
            outcome = ?outcome,
            "agent_swing"
        );

        if target.action.is_repeatable() && outcome == ActionOutcome::Continued && survives {
            self.action_timer_seconds = 0.0;
            self.action_progress = 0.0;
            return;
        }
        if outcome == ActionOutcome::Blocked {
            controller.cancel_object_action(target.object);
        }
        info!(
            object = %target.object,
            action = target.action.as_token(),
            outcome = ?outcome,
            "agent_action_finished"
        );
        self.return_to_idle();
    }

    fn update_wander(&mut self, dt_seconds: f32, controller: &InteractionController) {
        self.wander_cooldown_seconds -= dt_seconds;
        if self.wander_cooldown_seconds <= 0.0 {
            self.wander_direction = self.pick_wander_direction(controller);
            self.wander_cooldown_seconds = self.next_wander_interval();
        }

        let unit = self.wander_direction.unit();
        if unit == Vec2::ZERO {
            self.state = AgentState::Idle;
            self.walk_progress = 0.0;
            return;
        }
        self.state = AgentState::Wandering;

        let step = self.tuning.wander_speed_px_per_second * dt_seconds;
        let delta = Vec2::new(unit.x * step, unit.y * step);
        let (primary, secondary) = if delta.x.abs() >= delta.y.abs() {
            (Vec2::new(delta.x, 0.0), Vec2::new(0.0, delta.y))
        } else {
            (Vec2::new(0.0, delta.y), Vec2::new(delta.x, 0.0))
        };

        let moved = [primary, secondary]
            .into_iter()
            .filter(|candidate| *candidate != Vec2::ZERO)
            .find(|candidate| !self.is_blocked(self.offset_position(*candidate), controller));
        match moved {
            Some(applied) => {
                self.face_along(applied.x);
                self.advance_walk_cycle(dt_seconds);
                self.position = self.offset_position(applied);
            }
            None => {
                self.wander_direction = WanderDirection::None;
                self.wander_cooldown_seconds = self.tuning.blocked_cooldown_seconds;
                self.state = AgentState::Idle;
                self.walk_progress = 0.0;
            }
        }
    }

    fn pick_wander_direction(&mut self, controller: &InteractionController) -> WanderDirection {
        let lookahead = self.tuning.lookahead_px;
        let open = WanderDirection::ALL
            .into_iter()
            .filter(|direction| {
                let unit = direction.unit();
                *direction == WanderDirection::None
                    || !self.is_blocked(
                        self.offset_position(Vec2::new(unit.x * lookahead, unit.y * lookahead)),
                        controller,
                    )
            })
            .collect::<Vec<_>>();
        let index = self.rng.gen_range(0..open.len());
        open.get(index).copied().unwrap_or_default()
    }

    fn next_wander_interval(&mut self) -> f32 {
        let min = self.tuning.wander_interval_min_seconds.max(0.0);
        let max = self.tuning.wander_interval_max_seconds;
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Objects the agent already overlaps never block it, so it can walk out
    /// of a footprint it was placed inside.
    fn is_blocked(&self, candidate: Vec2, controller: &InteractionController) -> bool {
        let next = self.hitbox_at(candidate);
        if !next.is_within(controller.bounds()) {
            return true;
        }
        let current = self.hitbox_at(self.position);
        controller.object_rects().into_iter().any(|(_, rect)| {
            let object = PixelRect::from_tiles(rect);
            object.overlaps(&next) && !object.overlaps(&current)
        })
    }

    fn hitbox_at(&self, position: Vec2) -> PixelRect {
        let inset = self.tuning.hitbox_inset_px.clamp(0.0, TILE_SIZE_PX * 0.5 - 0.5);
        PixelRect {
            left: position.x + inset,
            top: position.y + inset,
            right: position.x + TILE_SIZE_PX - inset,
            bottom: position.y + TILE_SIZE_PX - inset,
        }
    }

    fn offset_position(&self, delta: Vec2) -> Vec2 {
        Vec2::new(self.position.x + delta.x, self.position.y + delta.y)
    }

    fn face_along(&mut self, dx: f32) {
        if dx > 0.0 {
            self.facing = Facing::Right;
        } else if dx < 0.0 {
            self.facing = Facing::Left;
        }
    }

    fn advance_walk_cycle(&mut self, dt_seconds: f32) {
        let cycle = self.tuning.walk_cycle_seconds.max(f32::EPSILON);
        self.walk_progress = (self.walk_progress + dt_seconds / cycle).fract();
    }

    fn return_to_idle(&mut self) {
        self.state = AgentState::Idle;
        self.target = None;
        self.move_target = None;
        self.action_timer_seconds = 0.0;
        self.action_progress = 0.0;
        self.walk_progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use farmsim_engine::TerrainMasks;

    use super::*;

    fn tree_rect() -> TileRect {
        TileRect::new(TilePos::new(5, 8), GridSize::new(2, 3))
    }

    #[test]
    fn tree_approach_uses_bottom_row_nearest_edge() {
        assert_eq!(
            approach_tile(tree_rect(), ObjectKind::Tree, 0),
            TilePos::new(5, 10)
        );
        assert_eq!(
            approach_tile(tree_rect(), ObjectKind::Tree, 12),
            TilePos::new(7, 10)
        );
        assert_eq!(
            approach_tile(tree_rect(), ObjectKind::Tree, 6),
            TilePos::new(5, 10),
            "equal distance picks the left edge"
        );
    }

    #[test]
    fn side_approach_is_vertically_centered() {
        let rock = TileRect::new(TilePos::new(10, 4), GridSize::new(2, 2));
        assert_eq!(
            approach_tile(rock, ObjectKind::Rock, 0),
            TilePos::new(9, 5)
        );
        assert_eq!(
            approach_tile(rock, ObjectKind::Rock, 20),
            TilePos::new(12, 5)
        );
        let barn = TileRect::new(TilePos::new(10, 6), GridSize::new(3, 3));
        assert_eq!(
            approach_tile(barn, ObjectKind::Building, 11),
            TilePos::new(9, 7)
        );
    }

    #[test]
    fn step_toward_moves_by_speed_times_dt_without_overshoot() {
        let (next, arrived) = step_toward(Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0, 0.5, 0.1);
        assert!(!arrived);
        assert!((next.x - 1.0).abs() < 0.0001);
        assert!(next.y.abs() < 0.0001);
    }

    #[test]
    fn step_toward_arrives_and_snaps_at_threshold() {
        let (next, arrived) =
            step_toward(Vec2::ZERO, Vec2::new(0.05, 0.0), 5.0, 1.0 / 60.0, 0.1);
        assert!(arrived);
        assert!((next.x - 0.05).abs() < 0.0001);
    }

    #[test]
    fn wander_with_same_seed_is_reproducible() {
        let bounds = GridSize::new(20, 20);
        let mut controller = InteractionController::new(bounds, TerrainMasks::empty(bounds));
        controller.spawn_object(
            "barn",
            ObjectKind::Building,
            TilePos::new(8, 8),
            GridSize::new(3, 2),
            None,
        );

        let mut first = AgentController::new(TilePos::new(2, 2), 42, AgentTuning::default());
        let mut second = AgentController::new(TilePos::new(2, 2), 42, AgentTuning::default());
        let mut session = GameSession::default();
        for _ in 0..600 {
            first.update(1.0 / 60.0, &mut controller, &mut session);
            second.update(1.0 / 60.0, &mut controller, &mut session);
            assert_eq!(first.position(), second.position());
            assert_eq!(first.state(), second.state());
        }
    }

    #[test]
    fn wander_stays_inside_bounds_and_out_of_objects() {
        let bounds = GridSize::new(6, 6);
        let mut controller = InteractionController::new(bounds, TerrainMasks::empty(bounds));
        controller.spawn_object(
            "rock",
            ObjectKind::Rock,
            TilePos::new(3, 3),
            GridSize::new(1, 1),
            None,
        );
        let rock = PixelRect::from_tiles(TileRect::new(TilePos::new(3, 3), GridSize::new(1, 1)));
        let tuning = AgentTuning {
            wander_speed_px_per_second: 48.0,
            ..AgentTuning::default()
        };
        let mut agent = AgentController::new(TilePos::new(1, 1), 7, tuning);
        let mut session = GameSession::default();
        for _ in 0..3000 {
            agent.update(1.0 / 60.0, &mut controller, &mut session);
            let hitbox = agent.hitbox_at(agent.position());
            assert!(hitbox.is_within(bounds), "{:?}", agent.position());
            assert!(!hitbox.overlaps(&rock), "{:?}", agent.position());
        }
    }

    #[test]
    fn wander_blocked_on_every_side_falls_back_to_none() {
        let bounds = GridSize::new(1, 1);
        let controller = InteractionController::new(bounds, TerrainMasks::empty(bounds));
        let mut agent = AgentController::new(TilePos::new(0, 0), 3, AgentTuning::default());
        for _ in 0..20 {
            assert_eq!(
                agent.pick_wander_direction(&controller),
                WanderDirection::None
            );
        }
    }

    #[test]
    fn request_action_rejects_missing_or_incapable_targets() {
        let bounds = GridSize::new(20, 20);
        let mut controller = InteractionController::new(bounds, TerrainMasks::empty(bounds));
        let rock = controller.spawn_object(
            "rock",
            ObjectKind::Rock,
            TilePos::new(3, 3),
            GridSize::new(1, 1),
            None,
        );
        let mut agent = AgentController::new(TilePos::new(0, 0), 1, AgentTuning::default());
        assert!(!agent.request_action(rock, ActionId::Axe, &mut controller));
        assert!(!agent.request_action(ObjectId(99), ActionId::Axe, &mut controller));
        assert_eq!(agent.state(), AgentState::Idle);
        assert!(agent.request_action(rock, ActionId::Pickaxe, &mut controller));
        assert_eq!(agent.state(), AgentState::MovingToTarget);
        assert_eq!(agent.move_target(), Some(tile_to_px(TilePos::new(2, 3))));
    }

    #[test]
    fn interrupt_only_applies_to_action_states() {
        let bounds = GridSize::new(20, 20);
        let mut controller = InteractionController::new(bounds, TerrainMasks::empty(bounds));
        let tree = controller.spawn_object(
            "oak",
            ObjectKind::Tree,
            TilePos::new(5, 8),
            GridSize::new(2, 3),
            None,
        );
        let mut agent = AgentController::new(TilePos::new(0, 0), 1, AgentTuning::default());
        assert!(!agent.interrupt(&mut controller));
        assert!(agent.request_action(tree, ActionId::Axe, &mut controller));
        assert!(agent.interrupt(&mut controller));
        assert_eq!(agent.state(), AgentState::Idle);
        assert_eq!(agent.target(), None);
        assert_eq!(agent.move_target(), None);
        assert!(!agent.interrupt(&mut controller));
    }
}
