use std::collections::BTreeMap;

use farmsim_engine::{GridSize, TerrainMasks, TilePos, TileRect};
use tracing::{debug, info};

use super::buttons::{ButtonPresenter, ButtonSetSpec};
use super::placement::{IntersectionProbe, OverlapHit};
use super::types::{
    ActionId, ActionOutcome, GameSession, ObjectId, ObjectIdAllocator, ObjectKind,
    PlacementValidity,
};
use super::world_object::WorldObject;

struct RegistryProbe<'a> {
    objects: &'a BTreeMap<ObjectId, WorldObject>,
}

impl IntersectionProbe for RegistryProbe<'_> {
    fn first_overlap(&self, subject: ObjectId, rect: TileRect) -> Option<OverlapHit> {
        self.objects
            .values()
            .filter(|object| object.id() != subject)
            .find(|object| rect.overlaps(&object.current_rect()))
            .map(|object| OverlapHit {
                id: object.id(),
                name: object.name().to_string(),
            })
    }
}

/// Owns every [`WorldObject`] in the scene and keeps selection and drag
/// exclusive across the whole registry.
pub(crate) struct InteractionController {
    objects: BTreeMap<ObjectId, WorldObject>,
    ids: ObjectIdAllocator,
    bounds: GridSize,
    masks: TerrainMasks,
    selected: Option<ObjectId>,
    dragging: Option<ObjectId>,
    presenter: Option<Box<dyn ButtonPresenter>>,
    configured_buttons: Option<ButtonSetSpec>,
}

impl InteractionController {
    pub(crate) fn new(bounds: GridSize, masks: TerrainMasks) -> Self {
        Self {
            objects: BTreeMap::new(),
            ids: ObjectIdAllocator::default(),
            bounds,
            masks,
            selected: None,
            dragging: None,
            presenter: None,
            configured_buttons: None,
        }
    }

    pub(crate) fn attach_presenter(&mut self, presenter: Box<dyn ButtonPresenter>) {
        self.presenter = Some(presenter);
        self.configured_buttons = None;
    }

    pub(crate) fn spawn_object(
        &mut self,
        name: impl Into<String>,
        kind: ObjectKind,
        position: TilePos,
        footprint: GridSize,
        health: Option<u32>,
    ) -> ObjectId {
        let id = self.ids.allocate();
        let mut object = WorldObject::new(id, name, kind, position, footprint);
        if let Some(max) = health {
            object = object.with_health(max);
        }
        debug!(
            object = %id,
            name = object.name(),
            kind = kind.as_token(),
            x = position.x,
            y = position.y,
            "object_spawned"
        );
        self.objects.insert(id, object);
        id
    }

    pub(crate) fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    pub(crate) fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    pub(crate) fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    pub(crate) fn dragging(&self) -> Option<ObjectId> {
        self.dragging
    }

    pub(crate) fn bounds(&self) -> GridSize {
        self.bounds
    }

    pub(crate) fn masks(&self) -> &TerrainMasks {
        &self.masks
    }

    pub(crate) fn object_rects(&self) -> Vec<(ObjectId, TileRect)> {
        self.objects
            .values()
            .map(|object| (object.id(), object.current_rect()))
            .collect()
    }

    pub(crate) fn configured_buttons(&self) -> Option<&ButtonSetSpec> {
        self.configured_buttons.as_ref()
    }

    /// Topmost object under `tile`: larger Y first, then the newest object.
    pub(crate) fn object_at(&self, tile: TilePos) -> Option<ObjectId> {
        self.objects
            .values()
            .filter(|object| object.current_rect().contains(tile))
            .max_by_key(|object| (object.current_rect().origin.y, object.id()))
            .map(WorldObject::id)
    }

    pub(crate) fn select_object_at(&mut self, tile: TilePos) -> bool {
        if self.dragging.is_some() {
            debug!(x = tile.x, y = tile.y, "select_ignored_while_dragging");
            return false;
        }

        let Some(id) = self.object_at(tile) else {
            self.cancel_selection();
            return false;
        };

        self.clear_selection_flags();
        let selected = self
            .objects
            .get_mut(&id)
            .is_some_and(|object| object.select(tile));
        if selected {
            self.selected = Some(id);
        }
        info!(object = %id, x = tile.x, y = tile.y, selected, "object_select");
        selected
    }

    pub(crate) fn perform_action(
        &mut self,
        id: ObjectId,
        action: ActionId,
        session: &mut GameSession,
    ) -> ActionOutcome {
        if action != ActionId::Axe && self.selected != Some(id) {
            debug!(
                object = %id,
                action = action.as_token(),
                "action_refused_not_selected"
            );
            return ActionOutcome::Blocked;
        }
        let Some(object) = self.objects.get_mut(&id) else {
            debug!(object = %id, action = action.as_token(), "action_target_missing");
            return ActionOutcome::Blocked;
        };

        let outcome = object.perform_action(action, session);
        match (action, outcome) {
            (ActionId::Move, ActionOutcome::Continued) => {
                self.clear_selection_flags();
                self.dragging = Some(id);
                self.refresh_drag_validity();
                info!(object = %id, "drag_started");
            }
            (_, ActionOutcome::Destroyed) => {
                self.remove_object(id);
            }
            _ => {}
        }
        outcome
    }

    pub(crate) fn update_drag_position(&mut self, tile: TilePos) {
        let Some(id) = self.dragging else {
            return;
        };
        let Some(mut object) = self.objects.remove(&id) else {
            self.dragging = None;
            return;
        };
        let probe = RegistryProbe {
            objects: &self.objects,
        };
        object.update_drag_position(tile, self.bounds, &self.masks, Some(&probe));
        self.objects.insert(id, object);
    }

    /// Commits the dragged object only when its last validation passed.
    pub(crate) fn accept_drag(&mut self) -> bool {
        let Some(id) = self.dragging else {
            return false;
        };
        let Some(object) = self.objects.get_mut(&id) else {
            self.dragging = None;
            return false;
        };
        let validity = object.placement_validity();
        if !validity.valid {
            info!(
                object = %id,
                reason = %validity.reason.as_ref().map(ToString::to_string).unwrap_or_default(),
                "drag_accept_refused"
            );
            return false;
        }
        object.accept_placement();
        let position = object.position();
        self.dragging = None;
        info!(object = %id, x = position.x, y = position.y, "drag_accepted");
        true
    }

    pub(crate) fn cancel_drag(&mut self) -> bool {
        let Some(id) = self.dragging.take() else {
            return false;
        };
        let cancelled = self
            .objects
            .get_mut(&id)
            .is_some_and(WorldObject::cancel_dragging);
        info!(object = %id, "drag_cancelled");
        cancelled
    }

    pub(crate) fn cancel_selection(&mut self) -> bool {
        let Some(id) = self.selected.take() else {
            return false;
        };
        self.clear_selection_flags();
        debug!(object = %id, "selection_cancelled");
        true
    }

    pub(crate) fn cancel_object_action(&mut self, id: ObjectId) -> bool {
        self.objects
            .get_mut(&id)
            .is_some_and(WorldObject::cancel_action)
    }

    /// Footprint of `id` placed at `tile` against every other object's
    /// current rectangle.
    pub(crate) fn check_object_intersection(
        &self,
        id: ObjectId,
        tile: TilePos,
    ) -> Option<ObjectId> {
        let object = self.objects.get(&id)?;
        self.first_overlap(id, object.rect_at(tile)).map(|hit| hit.id)
    }

    pub(crate) fn update_tick(&mut self, dt_seconds: f32) {
        for object in self.objects.values_mut() {
            object.advance_selection_phase(dt_seconds);
        }
        if let Some(object) = self
            .dragging
            .and_then(|id| self.objects.get_mut(&id))
        {
            object.advance_drag_delay(dt_seconds);
        }
    }

    pub(crate) fn derive_button_configuration(&self) -> ButtonSetSpec {
        if self.dragging.is_some() {
            return ButtonSetSpec::drag_confirm();
        }
        match self.selected.and_then(|id| self.objects.get(&id)) {
            Some(object) => ButtonSetSpec::selection_actions(object.capabilities()),
            None => ButtonSetSpec::empty(),
        }
    }

    /// Pushes the derived button set when it changed, or always when `force`.
    pub(crate) fn sync_buttons(&mut self, force: bool) -> bool {
        let spec = self.derive_button_configuration();
        if !force && self.configured_buttons.as_ref() == Some(&spec) {
            return false;
        }
        let Some(presenter) = self.presenter.as_mut() else {
            debug!("button_presenter_missing");
            return false;
        };
        presenter.configure(&spec);
        self.configured_buttons = Some(spec);
        true
    }

    pub(crate) fn reset_transient_state(&mut self) {
        for object in self.objects.values_mut() {
            object.reset();
        }
        self.selected = None;
        self.dragging = None;
        info!(objects = self.objects.len(), "interaction_reset");
    }

    #[cfg(test)]
    pub(crate) fn placement_of(&self, id: ObjectId) -> Option<&PlacementValidity> {
        self.objects.get(&id).map(WorldObject::placement_validity)
    }

    fn refresh_drag_validity(&mut self) {
        let Some(id) = self.dragging else {
            return;
        };
        let Some(mut object) = self.objects.remove(&id) else {
            return;
        };
        let probe = RegistryProbe {
            objects: &self.objects,
        };
        object.refresh_placement(self.bounds, &self.masks, Some(&probe));
        self.objects.insert(id, object);
    }

    fn clear_selection_flags(&mut self) {
        for object in self.objects.values_mut() {
            object.cancel_selection();
        }
        self.selected = None;
    }

    fn remove_object(&mut self, id: ObjectId) {
        let Some(object) = self.objects.remove(&id) else {
            return;
        };
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.dragging == Some(id) {
            self.dragging = None;
        }
        info!(
            object = %id,
            name = object.name(),
            kind = object.kind().as_token(),
            "object_removed"
        );
    }
}

impl IntersectionProbe for InteractionController {
    fn first_overlap(&self, subject: ObjectId, rect: TileRect) -> Option<OverlapHit> {
        RegistryProbe {
            objects: &self.objects,
        }
        .first_overlap(subject, rect)
    }
}
