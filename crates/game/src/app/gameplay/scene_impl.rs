use farmsim_engine::{InputSnapshot, Scene, SceneCommand, TilePos};
use tracing::{debug, info, warn};

use super::agent::AgentController;
use super::buttons::{ButtonCallback, ButtonPresenter};
use super::interaction::InteractionController;
use super::scene_def::{SceneDef, SceneDefError};
use super::types::{ActionId, GameSession};
use super::view::SceneView;

/// Farm scene driven by tile-level input: one interaction registry, one agent.
pub(crate) struct FarmScene {
    scene_name: String,
    controller: InteractionController,
    agent: AgentController,
    session: GameSession,
    tick: u64,
}

impl FarmScene {
    pub(crate) fn new(
        def: &SceneDef,
        seed: u64,
        presenter: Box<dyn ButtonPresenter>,
    ) -> Result<Self, SceneDefError> {
        let (mut controller, agent) = def.build(seed)?;
        controller.attach_presenter(presenter);
        Ok(Self {
            scene_name: def.name.clone(),
            controller,
            agent,
            session: GameSession::default(),
            tick: 0,
        })
    }

    #[cfg(test)]
    pub(crate) fn controller(&self) -> &InteractionController {
        &self.controller
    }

    #[cfg(test)]
    pub(crate) fn agent(&self) -> &AgentController {
        &self.agent
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &GameSession {
        &self.session
    }

    pub(crate) fn view(&self) -> SceneView {
        SceneView::capture(
            &self.scene_name,
            self.tick,
            &self.controller,
            &self.agent,
            &self.session,
        )
    }

    fn handle_pointer_down(&mut self, tile: TilePos) {
        if self.controller.dragging().is_some() {
            self.controller.update_drag_position(tile);
            return;
        }
        if self.controller.object_at(tile).is_none() {
            self.agent.interrupt(&mut self.controller);
        }
        self.controller.select_object_at(tile);
    }

    fn handle_button(&mut self, callback_id: u32) {
        let Some(callback) = ButtonCallback::from_id(callback_id) else {
            warn!(callback_id, "button_unknown");
            return;
        };
        let configured = self
            .controller
            .configured_buttons()
            .is_some_and(|spec| spec.contains(callback));
        if !configured {
            debug!(callback_id, "button_ignored_not_configured");
            return;
        }

        match callback {
            ButtonCallback::Perform(ActionId::Move) => {
                if let Some(id) = self.controller.selected() {
                    let outcome = self
                        .controller
                        .perform_action(id, ActionId::Move, &mut self.session);
                    if !outcome.is_accepted() {
                        debug!(object = %id, "move_refused");
                    }
                }
            }
            ButtonCallback::Perform(action) => {
                if let Some(id) = self.controller.selected() {
                    self.agent.request_action(id, action, &mut self.controller);
                }
            }
            ButtonCallback::AcceptDrag => {
                self.controller.accept_drag();
            }
            ButtonCallback::CancelDrag => {
                self.controller.cancel_drag();
            }
            ButtonCallback::CancelSelection => {
                self.agent.interrupt(&mut self.controller);
                self.controller.cancel_selection();
            }
        }
    }

    fn dump_view(&self) {
        match self.view().to_json() {
            Ok(json) => info!(scene = %self.scene_name, tick = self.tick, view = %json, "scene_dump"),
            Err(error) => warn!(scene = %self.scene_name, error = %error, "scene_dump_failed"),
        }
    }
}

impl Scene for FarmScene {
    fn load(&mut self) {
        self.controller.sync_buttons(true);
        info!(
            scene = %self.scene_name,
            objects = self.controller.object_count(),
            width = self.controller.bounds().width,
            height = self.controller.bounds().height,
            "scene_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if let Some(tile) = input.pointer_down_tile() {
            self.handle_pointer_down(tile);
        }
        if let Some(tile) = input.pointer_tile() {
            self.controller.update_drag_position(tile);
        }
        if let Some(callback_id) = input.button_pressed() {
            self.handle_button(callback_id);
        }

        self.controller.update_tick(fixed_dt_seconds);
        self.agent
            .update(fixed_dt_seconds, &mut self.controller, &mut self.session);
        self.controller.sync_buttons(input.viewport_resized());
        self.tick = self.tick.saturating_add(1);

        if input.dump_requested() {
            self.dump_view();
        }
        if input.reset_pressed() {
            return SceneCommand::Reset;
        }
        SceneCommand::None
    }

    fn unload(&mut self) {
        info!(
            scene = %self.scene_name,
            objects = self.controller.object_count(),
            ticks = self.tick,
            wood = self.session.wood,
            stone = self.session.stone,
            waterings = self.session.waterings,
            "scene_unload"
        );
        self.agent.interrupt(&mut self.controller);
        self.controller.reset_transient_state();
    }

    /// Drops selection, drags and any agent action; committed positions and
    /// removed objects stay as they are.
    fn reset(&mut self) {
        self.agent.interrupt(&mut self.controller);
        self.controller.reset_transient_state();
        self.controller.sync_buttons(true);
        info!(scene = %self.scene_name, tick = self.tick, "scene_reset");
    }

    fn debug_title(&self) -> Option<String> {
        let position = self.agent.position();
        Some(format!(
            "Farm | Scene {} | Agent ({:.1}, {:.1}) {} | Objects {} | Wood {} Stone {}",
            self.scene_name,
            position.x,
            position.y,
            self.agent.state().as_token(),
            self.controller.object_count(),
            self.session.wood,
            self.session.stone
        ))
    }
}
