use farmsim_engine::TileRect;
use serde::Serialize;

use super::agent::AgentController;
use super::interaction::InteractionController;
use super::types::GameSession;
use super::world_object::WorldObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct RectView {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl From<TileRect> for RectView {
    fn from(rect: TileRect) -> Self {
        Self {
            x: rect.origin.x,
            y: rect.origin.y,
            width: rect.size.width,
            height: rect.size.height,
        }
    }
}

/// Read-only snapshot of one object for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ObjectView {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) kind: &'static str,
    pub(crate) committed: RectView,
    pub(crate) current: RectView,
    pub(crate) selected: bool,
    pub(crate) pulse_offset_px: i32,
    pub(crate) dragging: bool,
    pub(crate) drag_pending: bool,
    pub(crate) action_in_progress: bool,
    pub(crate) placement_valid: bool,
    pub(crate) placement_reason: Option<String>,
    pub(crate) health: Option<u32>,
}

impl ObjectView {
    pub(crate) fn from_object(object: &WorldObject) -> Self {
        let validity = object.placement_validity();
        Self {
            id: object.id().0,
            name: object.name().to_string(),
            kind: object.kind().as_token(),
            committed: object.committed_rect().into(),
            current: object.current_rect().into(),
            selected: object.is_selected(),
            pulse_offset_px: object.selection_pulse_offset(),
            dragging: object.is_dragging(),
            drag_pending: object.drag_activation_pending(),
            action_in_progress: object.action_state().in_progress,
            placement_valid: validity.valid,
            placement_reason: validity.reason.as_ref().map(ToString::to_string),
            health: object.health().map(|health| health.current),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AgentView {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) tile: (i32, i32),
    pub(crate) target: Option<u64>,
    pub(crate) facing: &'static str,
    pub(crate) state: &'static str,
    pub(crate) walking: bool,
    pub(crate) walk_progress: f32,
    pub(crate) action_progress: f32,
}

impl AgentView {
    pub(crate) fn from_agent(agent: &AgentController) -> Self {
        let position = agent.position();
        let tile = agent.tile();
        Self {
            x: position.x,
            y: position.y,
            tile: (tile.x, tile.y),
            target: agent.target().map(|target| target.object.0),
            facing: agent.facing().as_token(),
            state: agent.state().as_token(),
            walking: agent.is_walking(),
            walk_progress: agent.walk_progress(),
            action_progress: agent.action_progress(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct SessionView {
    pub(crate) wood: u32,
    pub(crate) stone: u32,
    pub(crate) waterings: u32,
}

impl From<&GameSession> for SessionView {
    fn from(session: &GameSession) -> Self {
        Self {
            wood: session.wood,
            stone: session.stone,
            waterings: session.waterings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SceneView {
    pub(crate) scene: String,
    pub(crate) tick: u64,
    pub(crate) objects: Vec<ObjectView>,
    pub(crate) agent: AgentView,
    pub(crate) session: SessionView,
    pub(crate) buttons: Vec<&'static str>,
}

impl SceneView {
    pub(crate) fn capture(
        scene: &str,
        tick: u64,
        controller: &InteractionController,
        agent: &AgentController,
        session: &GameSession,
    ) -> Self {
        Self {
            scene: scene.to_string(),
            tick,
            objects: controller.objects().map(ObjectView::from_object).collect(),
            agent: AgentView::from_agent(agent),
            session: session.into(),
            buttons: controller.derive_button_configuration().labels(),
        }
    }

    pub(crate) fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
