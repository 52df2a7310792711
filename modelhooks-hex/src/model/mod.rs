//! Document models: a schema, a store and the hooks installed between them.
//!
//! `ModelBuilder::new` installs the populate cascade and the default
//! save/update hooks; `with_static_methods` and `with_manager_integration`
//! opt into the rest. The built `Model` is immutable and shared behind an
//! `Arc` by the HTTP layer.

pub mod hooks;
pub mod manager;
mod populate;

use std::sync::Arc;

use serde_json::{Map, Value};

use modelhooks_types::{
    AppError, Document, DocumentId, DocumentStore, Filter, Pagination, Query, Schema, SchemaError,
    Update, UpdateOutcome,
};

pub use hooks::{HookEvent, Hooks, UpdateContext};
pub use manager::{ManagerIntegration, OwnerResolver, default_owner_resolver};

/// Installs the populate cascade and default lifecycle hooks for `schema`.
///
/// Lifts array element population onto the array field, collects the
/// populate paths and registers:
/// - a pre-find hook populating every path (only if there are any);
/// - a no-op pre-save hook;
/// - a pre-update hook defaulting the active flag to `false` when the
///   schema declares it and the update leaves it unset.
///
/// Each call registers a fresh set of hooks.
pub fn install_populate_cascade(
    schema: &mut Schema,
    hooks: &mut Hooks,
) -> Result<Vec<String>, SchemaError> {
    schema.cascade_populate();
    let paths = schema.populate_paths()?;

    if !paths.is_empty() {
        let to_populate = paths.clone();
        hooks.pre_find(move |query| {
            for path in &to_populate {
                query.populate(path.as_str());
            }
        });
    }

    hooks.pre_save(|_| Ok(()));

    if schema.declares_active_flag() {
        let flag = schema.active_flag.clone();
        hooks.pre_update(move |ctx| {
            if !ctx.update.touches(&flag) {
                ctx.side_effect(Update::default().set(flag.clone(), Value::Bool(false)));
            }
        });
    }

    Ok(paths)
}

pub struct ModelBuilder<S: DocumentStore> {
    schema: Schema,
    store: Arc<S>,
    hooks: Hooks,
    populate_paths: Vec<String>,
    statics: bool,
}

impl<S: DocumentStore> ModelBuilder<S> {
    /// Starts a model, installing the populate cascade right away.
    ///
    /// Fails if a populate directive points at something other than a
    /// reference field of the schema.
    pub fn new(mut schema: Schema, store: Arc<S>) -> Result<Self, SchemaError> {
        let mut hooks = Hooks::new();
        let populate_paths = install_populate_cascade(&mut schema, &mut hooks)?;

        tracing::debug!(
            collection = %schema.collection,
            populate = ?populate_paths,
            "installed populate cascade"
        );

        Ok(Self {
            schema,
            store,
            hooks,
            populate_paths,
            statics: false,
        })
    }

    /// Exposes `get`, `list` and `list_actives` through `Model::statics`.
    pub fn with_static_methods(mut self) -> Self {
        self.statics = true;
        self
    }

    /// Notifies the manager service after saves and updates, if enabled.
    pub fn with_manager_integration(mut self, integration: ManagerIntegration) -> Self {
        integration.install(&self.schema.collection, &mut self.hooks);
        self
    }

    /// Escape hatch for model-specific hooks.
    pub fn with_hooks(mut self, install: impl FnOnce(&mut Hooks)) -> Self {
        install(&mut self.hooks);
        self
    }

    pub fn build(self) -> Model<S> {
        Model {
            schema: self.schema,
            store: self.store,
            hooks: self.hooks,
            populate_paths: self.populate_paths,
            statics: self.statics,
        }
    }
}

/// A collection with its hooks installed.
pub struct Model<S: DocumentStore> {
    schema: Schema,
    store: Arc<S>,
    hooks: Hooks,
    populate_paths: Vec<String>,
    statics: bool,
}

impl<S: DocumentStore> Model<S> {
    pub fn collection(&self) -> &str {
        &self.schema.collection
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Paths the populate cascade expands on every find.
    pub fn populate_paths(&self) -> &[String] {
        &self.populate_paths
    }

    /// Static retrieval helpers, if the model was built with them.
    pub fn statics(&self) -> Option<Statics<'_, S>> {
        self.statics.then_some(Statics { model: self })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Find-class operations
    // ─────────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip(self), fields(collection = %self.schema.collection))]
    pub async fn find(&self, mut query: Query) -> Result<Vec<Document>, AppError> {
        self.hooks.run_pre_find(&mut query);

        let mut docs = self.store.find(&self.schema.collection, &query).await?;
        populate::resolve(&*self.store, &self.schema, &query.populate, &mut docs).await?;

        Ok(docs)
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Option<Document>, AppError> {
        let docs = self.find(Query::new(filter).limit(1)).await?;
        Ok(docs.into_iter().next())
    }

    pub async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, AppError> {
        self.find_one(Filter::by_id(id)).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────────

    /// Validates `fields` against the schema and saves a new document.
    ///
    /// The store assigns `_id` and `createdAt`; client values are dropped.
    pub async fn create(&self, fields: Map<String, Value>) -> Result<Document, AppError> {
        self.schema.validate(&fields)?;
        self.save(Document::new(fields)).await
    }

    /// Inserts or replaces `doc`, running save hooks around the write.
    #[tracing::instrument(skip(self, doc), fields(collection = %self.schema.collection, id = %doc.id))]
    pub async fn save(&self, mut doc: Document) -> Result<Document, AppError> {
        self.hooks.run_pre_save(&mut doc)?;
        self.store.save(&self.schema.collection, &doc).await?;
        self.hooks.run_post_save(&doc);
        Ok(doc)
    }

    /// Applies `update` to every document matching `filter`.
    ///
    /// Assignments to `_id` or `createdAt` are dropped.
    /// Side-effect updates queued by pre-update hooks run first, against the
    /// same filter. Post-update hooks receive the first matching document
    /// as it reads after the write.
    #[tracing::instrument(skip(self, update), fields(collection = %self.schema.collection))]
    pub async fn update(&self, filter: Filter, update: Update) -> Result<UpdateOutcome, AppError> {
        let collection = &self.schema.collection;
        let update = update.without_reserved();

        let mut ctx = UpdateContext::new(&filter, &update);
        self.hooks.run_pre_update(&mut ctx);
        let side_effects = ctx.into_side_effects();

        for side_effect in &side_effects {
            self.store
                .update_many(collection, &filter, side_effect)
                .await?;
        }

        let matched = self.store.update_many(collection, &filter, &update).await?;

        if self.hooks.count(HookEvent::PostUpdate) > 0 {
            let current = self
                .store
                .find(collection, &Query::new(filter.clone()).limit(1))
                .await?
                .into_iter()
                .next();
            self.hooks.run_post_update(current.as_ref());
        }

        Ok(UpdateOutcome {
            matched,
            side_effects: side_effects.len() as u64,
        })
    }
}

/// Convenience retrieval helpers, see `ModelBuilder::with_static_methods`.
pub struct Statics<'a, S: DocumentStore> {
    model: &'a Model<S>,
}

impl<S: DocumentStore> Statics<'_, S> {
    /// The document with `id`, or a not-found error.
    pub async fn get(&self, id: DocumentId) -> Result<Document, AppError> {
        self.model
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Element does not exist".into()))
    }

    /// Newest first, windowed by `page`.
    pub async fn list(&self, page: Pagination) -> Result<Vec<Document>, AppError> {
        self.list_matching(Filter::default(), page).await
    }

    /// Like `list`, restricted to documents whose active flag is `true`.
    pub async fn list_actives(&self, page: Pagination) -> Result<Vec<Document>, AppError> {
        let filter = Filter::default().eq(self.model.schema.active_flag.clone(), Value::Bool(true));
        self.list_matching(filter, page).await
    }

    async fn list_matching(
        &self,
        filter: Filter,
        page: Pagination,
    ) -> Result<Vec<Document>, AppError> {
        let page = page.normalized();
        self.model
            .find(Query::new(filter).skip(page.skip).limit(page.limit))
            .await
    }
}
