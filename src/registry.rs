use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::database::StoreError;
use crate::types::{SlotBinding, SlotId};

/// Durable backing for the registry.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<SlotBinding>, StoreError>;
    async fn upsert(&self, binding: &SlotBinding) -> Result<(), StoreError>;
}

/// In-memory `name -> slot id` map with write-through persistence.
///
/// Owned by the scheduler and lent to the reconciler, so every mutation
/// happens on the single update loop and needs no locking.
pub struct SlotRegistry {
    bindings: HashMap<String, SlotId>,
    store: Arc<dyn SlotStore>,
}

impl SlotRegistry {
    /// Load every stored binding into memory.
    pub async fn load(store: Arc<dyn SlotStore>) -> Result<Self, StoreError> {
        let bindings = store
            .load_all()
            .await?
            .into_iter()
            .map(|binding| (binding.name, binding.id))
            .collect::<HashMap<_, _>>();

        info!("Slot registry loaded with {} bindings", bindings.len());
        Ok(Self { bindings, store })
    }

    pub fn lookup(&self, name: &str) -> Option<SlotId> {
        self.bindings.get(name).copied()
    }

    /// Bind `name` to `id`, replacing any previous binding.
    ///
    /// The in-memory binding is kept even when persisting fails, so the slot
    /// that was just created is reused for the rest of the process instead of
    /// being created again next cycle. The error is still returned.
    pub async fn record(&mut self, name: &str, id: SlotId) -> Result<(), StoreError> {
        if self.lookup(name) == Some(id) {
            return Ok(());
        }

        self.bindings.insert(name.to_string(), id);
        let binding = SlotBinding::new(name, id);
        if let Err(e) = self.store.upsert(&binding).await {
            error!(metric = name, slot_id = %id, "Failed to persist slot binding: {}", e);
            return Err(e);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
