//! Manager service integration.
//!
//! After a save or update, the owning identity of the touched document is
//! pushed to the external manager service. Delivery is best effort: the
//! call runs on a spawned task and its failure never reaches the write.

use std::sync::Arc;

use modelhooks_types::{Document, ManagerNotifier};

use super::hooks::Hooks;

/// Maps a document to the identifier the manager service is told about.
pub type OwnerResolver = Arc<dyn Fn(&Document) -> String + Send + Sync>;

/// Resolves to the document's own id.
pub fn default_owner_resolver() -> OwnerResolver {
    Arc::new(|doc: &Document| doc.id.to_string())
}

#[derive(Clone)]
pub struct ManagerIntegration {
    notifier: Arc<dyn ManagerNotifier>,
    enabled: bool,
    owner_resolver: OwnerResolver,
}

impl ManagerIntegration {
    pub fn new(notifier: Arc<dyn ManagerNotifier>, enabled: bool) -> Self {
        Self {
            notifier,
            enabled,
            owner_resolver: default_owner_resolver(),
        }
    }

    /// Replaces the default id-based owner resolution.
    pub fn owner_resolver(
        mut self,
        resolver: impl Fn(&Document) -> String + Send + Sync + 'static,
    ) -> Self {
        self.owner_resolver = Arc::new(resolver);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Registers the post-save and post-update notification hooks.
    ///
    /// Does nothing when the integration is disabled.
    pub(crate) fn install(&self, collection: &str, hooks: &mut Hooks) {
        if !self.enabled {
            tracing::debug!(%collection, "manager integration disabled");
            return;
        }

        let on_save = self.clone();
        let save_collection = collection.to_string();
        hooks.post_save(move |doc| on_save.send_data(&save_collection, doc));

        let on_update = self.clone();
        let update_collection = collection.to_string();
        hooks.post_update(move |doc| match doc {
            Some(doc) => on_update.send_data(&update_collection, doc),
            None => {
                tracing::debug!(collection = %update_collection, "update matched nothing; manager not notified")
            }
        });
    }

    fn send_data(&self, collection: &str, doc: &Document) {
        let owner_id = (self.owner_resolver)(doc);
        let notifier = Arc::clone(&self.notifier);
        let collection = collection.to_string();

        tokio::spawn(async move {
            match notifier.send_data(&owner_id).await {
                Ok(()) => tracing::debug!(%collection, %owner_id, "manager notified"),
                Err(e) => tracing::warn!(%collection, %owner_id, "manager notification failed: {}", e),
            }
        });
    }
}

impl std::fmt::Debug for ManagerIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerIntegration")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
