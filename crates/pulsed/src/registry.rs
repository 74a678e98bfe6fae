//! Content registry — catalogue, container states, and the global mode.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use pulse_core::{
    ContainerStatus, ContentId, ContentItem, ContentType, InputScores, OperationalMode,
};

/// Catalogue used when the configuration names no content.
pub fn default_catalogue() -> Vec<ContentItem> {
    let games = [
        ("game-clicker-heroes", "Clicker Heroes", "fantasy"),
        ("game-mrmine", "Mr. Mine", "tech"),
        ("game-poker-quest", "Poker Quest", "cards"),
        ("game-grindcraft", "Grindcraft", "crafting"),
        ("game-fray-fight", "Fray Fight", "action"),
    ];

    let mut items: Vec<ContentItem> = games
        .iter()
        .map(|(id, title, theme)| ContentItem::new(id, ContentType::Game, theme).with_title(title))
        .collect();
    items.push(
        ContentItem::new("ai-service-tech", ContentType::AiService, "tech")
            .with_title("AI Assistant")
            .with_deployment("ai-service"),
    );
    items
}

struct RegistryState {
    items: Vec<ContentItem>,
    mode: OperationalMode,
}

/// Authoritative view of content and container state.
///
/// Callers get owned snapshots; nothing borrows into the registry.
pub struct ContentRegistry {
    catalogue: Vec<ContentItem>,
    state: RwLock<RegistryState>,
}

impl ContentRegistry {
    pub fn new(catalogue: Vec<ContentItem>) -> Self {
        let state = RegistryState {
            items: catalogue.clone(),
            mode: OperationalMode::default(),
        };
        Self {
            catalogue,
            state: RwLock::new(state),
        }
    }

    pub fn get_content_by_id(&self, content_id: &str) -> Option<ContentItem> {
        let state = self.state.read().expect("registry lock");
        state.items.iter().find(|c| c.id == content_id).cloned()
    }

    pub fn get_all_content(&self) -> Vec<ContentItem> {
        self.state.read().expect("registry lock").items.clone()
    }

    pub fn state_of(&self, content_id: &str) -> Option<ContainerStatus> {
        let state = self.state.read().expect("registry lock");
        state
            .items
            .iter()
            .find(|c| c.id == content_id)
            .map(|c| c.container_status)
    }

    /// Set a container state, returning the previous one. Unknown
    /// content is left untouched and yields `None`.
    pub fn set_state(&self, content_id: &str, status: ContainerStatus) -> Option<ContainerStatus> {
        let mut state = self.state.write().expect("registry lock");
        let item = state.items.iter_mut().find(|c| c.id == content_id)?;
        let old = item.container_status;
        item.container_status = status;
        debug!(content = %content_id, from = %old, to = %status, "container state updated");
        Some(old)
    }

    pub fn container_states(&self) -> HashMap<ContentId, ContainerStatus> {
        let state = self.state.read().expect("registry lock");
        state
            .items
            .iter()
            .map(|c| (c.id.clone(), c.container_status))
            .collect()
    }

    /// Copy live scores onto a content item.
    pub fn apply_scores(&self, content_id: &str, scores: &InputScores) {
        let mut state = self.state.write().expect("registry lock");
        if let Some(item) = state.items.iter_mut().find(|c| c.id == content_id) {
            item.apply_scores(scores);
        }
    }

    pub fn mode(&self) -> OperationalMode {
        self.state.read().expect("registry lock").mode
    }

    /// Set the global mode, returning the previous one.
    pub fn set_mode(&self, mode: OperationalMode) -> OperationalMode {
        let mut state = self.state.write().expect("registry lock");
        std::mem::replace(&mut state.mode, mode)
    }

    /// Restore the catalogue's initial states, scores, and mode.
    pub fn reset_states(&self) {
        let mut state = self.state.write().expect("registry lock");
        state.items = self.catalogue.clone();
        state.mode = OperationalMode::default();
    }
}
