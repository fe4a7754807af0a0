use tracing::info;

use super::types::ActionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ButtonCallback {
    Perform(ActionId),
    AcceptDrag,
    CancelDrag,
    CancelSelection,
}

impl ButtonCallback {
    pub(crate) fn id(self) -> u32 {
        match self {
            Self::Perform(ActionId::Move) => 1,
            Self::Perform(ActionId::Axe) => 2,
            Self::Perform(ActionId::Water) => 3,
            Self::Perform(ActionId::Pickaxe) => 4,
            Self::AcceptDrag => 10,
            Self::CancelDrag => 11,
            Self::CancelSelection => 12,
        }
    }

    pub(crate) fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::Perform(ActionId::Move)),
            2 => Some(Self::Perform(ActionId::Axe)),
            3 => Some(Self::Perform(ActionId::Water)),
            4 => Some(Self::Perform(ActionId::Pickaxe)),
            10 => Some(Self::AcceptDrag),
            11 => Some(Self::CancelDrag),
            12 => Some(Self::CancelSelection),
            _ => None,
        }
    }

    /// Script-facing names: action tokens plus `accept`, `cancel` and
    /// `cancel_drag`.
    pub(crate) fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "accept" => Some(Self::AcceptDrag),
            "cancel" => Some(Self::CancelSelection),
            "cancel_drag" => Some(Self::CancelDrag),
            other => ActionId::from_token(other).map(Self::Perform),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Perform(ActionId::Move) => "Move",
            Self::Perform(ActionId::Axe) => "Chop",
            Self::Perform(ActionId::Water) => "Water",
            Self::Perform(ActionId::Pickaxe) => "Mine",
            Self::AcceptDrag => "Accept",
            Self::CancelDrag | Self::CancelSelection => "Cancel",
        }
    }

    fn icon_hint(self) -> &'static str {
        match self {
            Self::Perform(action) => action.as_token(),
            Self::AcceptDrag => "confirm",
            Self::CancelDrag | Self::CancelSelection => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ButtonEntry {
    pub(crate) label: &'static str,
    pub(crate) icon_hint: &'static str,
    pub(crate) callback: ButtonCallback,
}

impl ButtonEntry {
    fn for_callback(callback: ButtonCallback) -> Self {
        Self {
            label: callback.label(),
            icon_hint: callback.icon_hint(),
            callback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum ButtonKind {
    #[default]
    None,
    SelectionActions(Vec<ActionId>),
    DragConfirm,
}

/// Declarative button set handed to the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ButtonSetSpec {
    pub(crate) kind: ButtonKind,
    pub(crate) entries: Vec<ButtonEntry>,
}

impl ButtonSetSpec {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn selection_actions(capabilities: &[ActionId]) -> Self {
        let mut entries = capabilities
            .iter()
            .map(|action| ButtonEntry::for_callback(ButtonCallback::Perform(*action)))
            .collect::<Vec<_>>();
        entries.push(ButtonEntry::for_callback(ButtonCallback::CancelSelection));
        Self {
            kind: ButtonKind::SelectionActions(capabilities.to_vec()),
            entries,
        }
    }

    pub(crate) fn drag_confirm() -> Self {
        Self {
            kind: ButtonKind::DragConfirm,
            entries: vec![
                ButtonEntry::for_callback(ButtonCallback::AcceptDrag),
                ButtonEntry::for_callback(ButtonCallback::CancelDrag),
            ],
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn contains(&self, callback: ButtonCallback) -> bool {
        self.entries.iter().any(|entry| entry.callback == callback)
    }

    pub(crate) fn labels(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.label).collect()
    }
}

pub(crate) trait ButtonPresenter {
    fn configure(&mut self, spec: &ButtonSetSpec);
}

/// Headless presenter that reports each configuration through `tracing`.
#[derive(Debug, Default)]
pub(crate) struct LoggingButtonPresenter {
    configured: u32,
}

impl LoggingButtonPresenter {
    #[cfg(test)]
    pub(crate) fn configured_count(&self) -> u32 {
        self.configured
    }
}

impl ButtonPresenter for LoggingButtonPresenter {
    fn configure(&mut self, spec: &ButtonSetSpec) {
        self.configured = self.configured.saturating_add(1);
        let ids = spec
            .entries
            .iter()
            .map(|entry| entry.callback.id().to_string())
            .collect::<Vec<_>>()
            .join(",");
        info!(
            kind = ?spec.kind,
            labels = ?spec.labels(),
            ids = %ids,
            count = self.configured,
            "buttons_configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_ids_decode_back_to_the_same_callback() {
        let callbacks = ActionId::ALL
            .into_iter()
            .map(ButtonCallback::Perform)
            .chain([
                ButtonCallback::AcceptDrag,
                ButtonCallback::CancelDrag,
                ButtonCallback::CancelSelection,
            ]);
        for callback in callbacks {
            assert_eq!(ButtonCallback::from_id(callback.id()), Some(callback));
        }
        assert_eq!(ButtonCallback::from_id(0), None);
        assert_eq!(ButtonCallback::from_id(99), None);
    }

    #[test]
    fn tokens_map_to_callbacks() {
        assert_eq!(
            ButtonCallback::from_token("AXE"),
            Some(ButtonCallback::Perform(ActionId::Axe))
        );
        assert_eq!(
            ButtonCallback::from_token("cancel"),
            Some(ButtonCallback::CancelSelection)
        );
        assert_eq!(
            ButtonCallback::from_token("cancel_drag"),
            Some(ButtonCallback::CancelDrag)
        );
        assert_eq!(ButtonCallback::from_token("plant"), None);
    }

    #[test]
    fn selection_actions_end_with_cancel() {
        let spec = ButtonSetSpec::selection_actions(&[ActionId::Axe, ActionId::Water]);
        assert_eq!(spec.labels(), vec!["Chop", "Water", "Cancel"]);
        assert!(spec.contains(ButtonCallback::CancelSelection));
        assert!(!spec.contains(ButtonCallback::AcceptDrag));
    }

    #[test]
    fn drag_confirm_offers_accept_and_cancel() {
        let spec = ButtonSetSpec::drag_confirm();
        assert_eq!(spec.kind, ButtonKind::DragConfirm);
        assert!(spec.contains(ButtonCallback::AcceptDrag));
        assert!(spec.contains(ButtonCallback::CancelDrag));
        assert!(!ButtonSetSpec::empty().contains(ButtonCallback::CancelDrag));
        assert!(ButtonSetSpec::empty().is_empty());
    }
}
