//! Lifecycle hook registry.
//!
//! Hooks are plain callbacks keyed by lifecycle event. They run in
//! registration order and never hold state of their own.

use std::sync::Arc;

use modelhooks_types::{AppError, Document, Filter, Query, Update};

pub type PreFindHook = Arc<dyn Fn(&mut Query) + Send + Sync>;
pub type PreSaveHook = Arc<dyn Fn(&mut Document) -> Result<(), AppError> + Send + Sync>;
pub type PreUpdateHook = Arc<dyn Fn(&mut UpdateContext<'_>) + Send + Sync>;
pub type PostSaveHook = Arc<dyn Fn(&Document) + Send + Sync>;
pub type PostUpdateHook = Arc<dyn Fn(Option<&Document>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    PreFind,
    PreSave,
    PreUpdate,
    PostSave,
    PostUpdate,
}

/// What a pre-update hook sees: the pending update and its filter.
///
/// Hooks may queue side-effect updates; the model applies them to the same
/// filter, in order, before the original update.
pub struct UpdateContext<'a> {
    pub filter: &'a Filter,
    pub update: &'a Update,
    side_effects: Vec<Update>,
}

impl<'a> UpdateContext<'a> {
    pub fn new(filter: &'a Filter, update: &'a Update) -> Self {
        Self {
            filter,
            update,
            side_effects: Vec::new(),
        }
    }

    pub fn side_effect(&mut self, update: Update) {
        self.side_effects.push(update);
    }

    pub fn into_side_effects(self) -> Vec<Update> {
        self.side_effects
    }
}

#[derive(Clone, Default)]
pub struct Hooks {
    pre_find: Vec<PreFindHook>,
    pre_save: Vec<PreSaveHook>,
    pre_update: Vec<PreUpdateHook>,
    post_save: Vec<PostSaveHook>,
    post_update: Vec<PostUpdateHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook for every find-class operation (`find`, `find_one`, `find_by_id`).
    pub fn pre_find(&mut self, hook: impl Fn(&mut Query) + Send + Sync + 'static) {
        self.pre_find.push(Arc::new(hook));
    }

    pub fn pre_save(
        &mut self,
        hook: impl Fn(&mut Document) -> Result<(), AppError> + Send + Sync + 'static,
    ) {
        self.pre_save.push(Arc::new(hook));
    }

    pub fn pre_update(&mut self, hook: impl Fn(&mut UpdateContext<'_>) + Send + Sync + 'static) {
        self.pre_update.push(Arc::new(hook));
    }

    pub fn post_save(&mut self, hook: impl Fn(&Document) + Send + Sync + 'static) {
        self.post_save.push(Arc::new(hook));
    }

    pub fn post_update(&mut self, hook: impl Fn(Option<&Document>) + Send + Sync + 'static) {
        self.post_update.push(Arc::new(hook));
    }

    /// Number of hooks registered for `event`.
    pub fn count(&self, event: HookEvent) -> usize {
        match event {
            HookEvent::PreFind => self.pre_find.len(),
            HookEvent::PreSave => self.pre_save.len(),
            HookEvent::PreUpdate => self.pre_update.len(),
            HookEvent::PostSave => self.post_save.len(),
            HookEvent::PostUpdate => self.post_update.len(),
        }
    }

    pub(crate) fn run_pre_find(&self, query: &mut Query) {
        for hook in &self.pre_find {
            hook(query);
        }
    }

    pub(crate) fn run_pre_save(&self, doc: &mut Document) -> Result<(), AppError> {
        for hook in &self.pre_save {
            hook(doc)?;
        }
        Ok(())
    }

    pub(crate) fn run_pre_update(&self, ctx: &mut UpdateContext<'_>) {
        for hook in &self.pre_update {
            hook(ctx);
        }
    }

    pub(crate) fn run_post_save(&self, doc: &Document) {
        for hook in &self.post_save {
            hook(doc);
        }
    }

    pub(crate) fn run_post_update(&self, doc: Option<&Document>) {
        for hook in &self.post_update {
            hook(doc);
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_find", &self.pre_find.len())
            .field("pre_save", &self.pre_save.len())
            .field("pre_update", &self.pre_update.len())
            .field("post_save", &self.post_save.len())
            .field("post_update", &self.post_update.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pre_find_runs_in_order() {
        let mut hooks = Hooks::new();
        hooks.pre_find(|q| q.populate("a"));
        hooks.pre_find(|q| q.populate("b"));

        let mut query = Query::default();
        hooks.run_pre_find(&mut query);

        assert_eq!(query.populate, vec!["a", "b"]);
        assert_eq!(hooks.count(HookEvent::PreFind), 2);
    }

    #[test]
    fn test_pre_save_error_stops_chain() {
        let mut hooks = Hooks::new();
        hooks.pre_save(|_| Err(AppError::BadRequest("nope".into())));
        hooks.pre_save(|doc| {
            doc.set("touched", json!(true));
            Ok(())
        });

        let mut doc = Document::new(Default::default());
        assert!(hooks.run_pre_save(&mut doc).is_err());
        assert!(doc.get("touched").is_none());
    }

    #[test]
    fn test_update_context_collects_side_effects() {
        let mut hooks = Hooks::new();
        hooks.pre_update(|ctx| ctx.side_effect(Update::default().set("x", json!(1))));

        let filter = Filter::default();
        let update = Update::default();
        let mut ctx = UpdateContext::new(&filter, &update);
        hooks.run_pre_update(&mut ctx);

        assert_eq!(ctx.into_side_effects().len(), 1);
    }
}
