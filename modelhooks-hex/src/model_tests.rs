//! Model and hook installer unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use tokio::sync::mpsc;

    use modelhooks_repo::MemoryStore;
    use modelhooks_types::{
        AppError, Document, DocumentId, DocumentStore, Element, FieldDescriptor, FieldKind,
        Filter, ManagerNotifier, NotifyError, Pagination, Query, RepoError, Schema, SchemaError,
        Update,
    };

    use crate::model::{HookEvent, ManagerIntegration, Model, ModelBuilder, install_populate_cascade};
    use crate::model::Hooks;

    /// Memory store that counts `update_many` calls.
    #[derive(Default)]
    pub struct CountingStore {
        inner: MemoryStore,
        updates: AtomicUsize,
    }

    impl CountingStore {
        pub fn updates(&self) -> usize {
            self.updates.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn save(&self, collection: &str, doc: &Document) -> Result<(), RepoError> {
            self.inner.save(collection, doc).await
        }

        async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, RepoError> {
            self.inner.find(collection, query).await
        }

        async fn find_by_ids(
            &self,
            collection: &str,
            ids: &[DocumentId],
        ) -> Result<Vec<Document>, RepoError> {
            self.inner.find_by_ids(collection, ids).await
        }

        async fn update_many(
            &self,
            collection: &str,
            filter: &Filter,
            update: &Update,
        ) -> Result<u64, RepoError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update_many(collection, filter, update).await
        }
    }

    /// Notifier that forwards every owner id into a channel.
    pub struct RecordingNotifier {
        tx: mpsc::UnboundedSender<String>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Arc::new(Self { tx, fail: false }), rx)
        }

        pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Arc::new(Self { tx, fail: true }), rx)
        }
    }

    #[async_trait]
    impl ManagerNotifier for RecordingNotifier {
        async fn send_data(&self, owner_id: &str) -> Result<(), NotifyError> {
            let _ = self.tx.send(owner_id.to_string());
            if self.fail {
                return Err(NotifyError::Transport("connection refused".into()));
            }
            Ok(())
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn users_schema() -> Schema {
        Schema::new(
            "users",
            vec![
                FieldDescriptor::string("name").required(),
                FieldDescriptor::reference("company", "companies").populate(),
                FieldDescriptor::array_of("roles", Element::reference("roles").populate()),
                FieldDescriptor::boolean("isActive"),
            ],
        )
    }

    fn users(store: Arc<CountingStore>) -> Model<CountingStore> {
        ModelBuilder::new(users_schema(), store)
            .unwrap()
            .with_static_methods()
            .build()
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .ok()
            .flatten()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Populate cascade
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_install_registers_default_hooks() {
        let mut schema = users_schema();
        let mut hooks = Hooks::new();

        let paths = install_populate_cascade(&mut schema, &mut hooks).unwrap();

        assert_eq!(paths, vec!["company", "roles"]);
        assert_eq!(hooks.count(HookEvent::PreFind), 1);
        assert_eq!(hooks.count(HookEvent::PreSave), 1);
        assert_eq!(hooks.count(HookEvent::PreUpdate), 1);
        assert_eq!(hooks.count(HookEvent::PostSave), 0);
    }

    #[test]
    fn test_install_twice_double_registers() {
        let mut schema = users_schema();
        let mut hooks = Hooks::new();

        install_populate_cascade(&mut schema, &mut hooks).unwrap();
        install_populate_cascade(&mut schema, &mut hooks).unwrap();

        assert_eq!(hooks.count(HookEvent::PreFind), 2);
        assert_eq!(hooks.count(HookEvent::PreUpdate), 2);
    }

    #[test]
    fn test_no_populate_paths_no_find_hook() {
        let mut schema = Schema::new("tags", vec![FieldDescriptor::string("label")]);
        let mut hooks = Hooks::new();

        install_populate_cascade(&mut schema, &mut hooks).unwrap();

        assert_eq!(hooks.count(HookEvent::PreFind), 0);
        assert_eq!(hooks.count(HookEvent::PreUpdate), 0);
    }

    #[test]
    fn test_builder_rejects_unknown_alias() {
        let schema = Schema::new(
            "users",
            vec![FieldDescriptor::reference("company", "companies").populate_as("employer")],
        );

        let result = ModelBuilder::new(schema, Arc::new(CountingStore::default()));
        assert!(matches!(result, Err(SchemaError::UnknownPopulatePath { .. })));
    }

    #[tokio::test]
    async fn test_find_populates_references() {
        let store = Arc::new(CountingStore::default());
        let company = Document::new(fields(json!({ "name": "Acme" })));
        let admin = Document::new(fields(json!({ "name": "admin" })));
        store.save("companies", &company).await.unwrap();
        store.save("roles", &admin).await.unwrap();

        let model = users(store.clone());
        let user = model
            .create(fields(json!({
                "name": "Alice",
                "company": company.id.to_string(),
                "roles": [admin.id.to_string(), DocumentId::new().to_string()],
            })))
            .await
            .unwrap();

        let found = model.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.get("company").unwrap()["name"], "Acme");
        let roles = found.get("roles").unwrap().as_array().unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0]["name"], "admin");

        let listed = model.find(Query::default()).await.unwrap();
        assert_eq!(listed[0].get("company").unwrap()["name"], "Acme");
    }

    #[tokio::test]
    async fn test_alias_populated_on_every_find() {
        let store = Arc::new(CountingStore::default());
        let company = Document::new(fields(json!({ "name": "Acme" })));
        store.save("companies", &company).await.unwrap();

        let schema = Schema::new(
            "projects",
            vec![
                FieldDescriptor::string("companyName").populate_as("owner"),
                FieldDescriptor::reference("owner", "companies"),
            ],
        );
        let model = ModelBuilder::new(schema, store.clone())
            .unwrap()
            .with_static_methods()
            .build();
        assert_eq!(model.populate_paths(), ["owner".to_string()]);

        let project = model
            .save(Document::new(fields(json!({ "owner": company.id.to_string() }))))
            .await
            .unwrap();

        let statics = model.statics().unwrap();
        let by_get = statics.get(project.id).await.unwrap();
        let by_list = statics.list(Pagination::default()).await.unwrap();
        let by_find_one = model.find_one(Filter::default()).await.unwrap().unwrap();

        for doc in [&by_get, &by_list[0], &by_find_one] {
            assert_eq!(doc.get("owner").unwrap()["name"], "Acme");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Active flag defaulting
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_update_without_flag_defaults_it_first() {
        let store = Arc::new(CountingStore::default());
        let model = users(store.clone());
        let user = model
            .create(fields(json!({ "name": "Alice", "isActive": true })))
            .await
            .unwrap();

        let outcome = model
            .update(
                Filter::by_id(user.id),
                Update::default().set("name", json!("Alicia")),
            )
            .await
            .unwrap();

        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.side_effects, 1);
        assert_eq!(store.updates(), 2);

        let stored = model.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.get("isActive"), Some(&json!(false)));
        assert_eq!(stored.get("name"), Some(&json!("Alicia")));
    }

    #[tokio::test]
    async fn test_update_with_flag_has_no_side_effect() {
        let store = Arc::new(CountingStore::default());
        let model = users(store.clone());
        let user = model
            .create(fields(json!({ "name": "Alice", "isActive": false })))
            .await
            .unwrap();

        let outcome = model
            .update(
                Filter::by_id(user.id),
                Update::default().set("isActive", json!(true)),
            )
            .await
            .unwrap();

        assert_eq!(outcome.side_effects, 0);
        assert_eq!(store.updates(), 1);

        let stored = model.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.get("isActive"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_schema_without_flag_never_defaults() {
        let store = Arc::new(CountingStore::default());
        let schema = Schema::new("notes", vec![FieldDescriptor::string("text")]);
        let model = ModelBuilder::new(schema, store.clone()).unwrap().build();
        let note = model
            .save(Document::new(fields(json!({ "text": "hi" }))))
            .await
            .unwrap();

        let outcome = model
            .update(Filter::by_id(note.id), Update::default().set("text", json!("yo")))
            .await
            .unwrap();

        assert_eq!(outcome.side_effects, 0);
        assert_eq!(store.updates(), 1);
        let stored = model.find_by_id(note.id).await.unwrap().unwrap();
        assert!(stored.get("isActive").is_none());
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Static methods
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_statics_require_opt_in() {
        let store = Arc::new(CountingStore::default());
        let model = ModelBuilder::new(users_schema(), store).unwrap().build();

        assert!(model.statics().is_none());
    }

    #[tokio::test]
    async fn test_list_empty_collection() {
        let model = users(Arc::new(CountingStore::default()));

        let docs = model
            .statics()
            .unwrap()
            .list(Pagination::new(0, 50))
            .await
            .unwrap();

        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let model = users(Arc::new(CountingStore::default()));

        let result = model.statics().unwrap().get(DocumentId::new()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_existing() {
        let model = users(Arc::new(CountingStore::default()));
        let user = model.create(fields(json!({ "name": "Alice" }))).await.unwrap();

        let found = model.statics().unwrap().get(user.id).await.unwrap();

        assert_eq!(found.id, user.id);
        assert_eq!(found.get("name"), Some(&json!("Alice")));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_windows() {
        let model = users(Arc::new(CountingStore::default()));
        let base = chrono::Utc::now();
        let mut ids = Vec::new();
        for i in 0..5 {
            let doc = Document::from_parts(
                DocumentId::new(),
                base + chrono::Duration::seconds(i),
                fields(json!({ "name": format!("user-{i}"), "isActive": i % 2 == 0 })),
            );
            ids.push(model.save(doc).await.unwrap().id);
        }
        let statics = model.statics().unwrap();

        let page = statics.list(Pagination::new(1, 2)).await.unwrap();
        assert_eq!(
            page.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![ids[3], ids[2]]
        );

        let actives = statics.list_actives(Pagination::default()).await.unwrap();
        assert_eq!(
            actives.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![ids[4], ids[2], ids[0]]
        );
    }

    #[tokio::test]
    async fn test_create_validates() {
        let model = users(Arc::new(CountingStore::default()));

        let result = model.create(fields(json!({ "company": 7 }))).await;

        let Err(AppError::Validation(err)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(
            err.unified_message(),
            "\"name\" is required and \"company\" must be an id string"
        );
    }

    #[tokio::test]
    async fn test_client_cannot_choose_id_or_timestamp() {
        let model = users(Arc::new(CountingStore::default()));

        let created = model
            .create(fields(json!({ "name": "Acme", "_id": "spoofed", "createdAt": "x" })))
            .await
            .unwrap();

        let body = serde_json::to_value(&created).unwrap();
        assert_eq!(body["_id"], created.id.to_string());
        assert_ne!(body["createdAt"], "x");

        let statics = model.statics().unwrap();
        let fetched = statics.get(created.id).await.unwrap();
        assert!(fetched.get("_id").is_none());

        // Echoing a fetched document back must not rewrite its identity.
        let echoed = serde_json::to_value(&fetched).unwrap();
        let Value::Object(mut set) = echoed else {
            unreachable!()
        };
        set.insert("_id".into(), json!("spoofed"));
        set.insert("name".into(), json!("Acme 2"));
        let outcome = model
            .update(Filter::by_id(created.id), Update { set })
            .await
            .unwrap();
        assert_eq!(outcome.matched, 1);

        let listed = statics.list(Pagination::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].created_at, created.created_at);
        assert_eq!(listed[0].get("name"), Some(&json!("Acme 2")));
        assert!(listed[0].get("_id").is_none());
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Manager integration
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_manager_disabled_registers_nothing() {
        let (notifier, mut rx) = RecordingNotifier::new();
        let model = ModelBuilder::new(users_schema(), Arc::new(CountingStore::default()))
            .unwrap()
            .with_manager_integration(ManagerIntegration::new(notifier, false))
            .build();

        assert_eq!(model.hooks().count(HookEvent::PostSave), 0);
        assert_eq!(model.hooks().count(HookEvent::PostUpdate), 0);

        model.create(fields(json!({ "name": "Alice" }))).await.unwrap();
        assert!(recv(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_manager_notified_on_save_with_id() {
        let (notifier, mut rx) = RecordingNotifier::new();
        let model = ModelBuilder::new(users_schema(), Arc::new(CountingStore::default()))
            .unwrap()
            .with_manager_integration(ManagerIntegration::new(notifier, true))
            .build();

        let user = model.create(fields(json!({ "name": "Alice" }))).await.unwrap();

        assert_eq!(recv(&mut rx).await, Some(user.id.to_string()));
    }

    #[tokio::test]
    async fn test_manager_notified_on_update_with_resolved_owner() {
        let (notifier, mut rx) = RecordingNotifier::new();
        let integration = ManagerIntegration::new(notifier, true).owner_resolver(|doc| {
            doc.get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        });
        let model = ModelBuilder::new(users_schema(), Arc::new(CountingStore::default()))
            .unwrap()
            .with_manager_integration(integration)
            .build();

        let user = model.create(fields(json!({ "name": "Alice" }))).await.unwrap();
        assert_eq!(recv(&mut rx).await.as_deref(), Some("Alice"));

        model
            .update(
                Filter::by_id(user.id),
                Update::default().set("name", json!("Alicia")),
            )
            .await
            .unwrap();
        assert_eq!(recv(&mut rx).await.as_deref(), Some("Alicia"));
    }

    #[tokio::test]
    async fn test_manager_failure_does_not_fail_write() {
        let (notifier, mut rx) = RecordingNotifier::failing();
        let model = ModelBuilder::new(users_schema(), Arc::new(CountingStore::default()))
            .unwrap()
            .with_static_methods()
            .with_manager_integration(ManagerIntegration::new(notifier, true))
            .build();

        let user = model.create(fields(json!({ "name": "Alice" }))).await.unwrap();

        assert!(recv(&mut rx).await.is_some());
        assert!(model.statics().unwrap().get(user.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_matching_nothing_skips_notification() {
        let (notifier, mut rx) = RecordingNotifier::new();
        let model = ModelBuilder::new(users_schema(), Arc::new(CountingStore::default()))
            .unwrap()
            .with_manager_integration(ManagerIntegration::new(notifier, true))
            .build();

        let outcome = model
            .update(
                Filter::by_id(DocumentId::new()),
                Update::default().set("isActive", json!(true)),
            )
            .await
            .unwrap();

        assert_eq!(outcome.matched, 0);
        assert!(recv(&mut rx).await.is_none());
    }

    #[test]
    fn test_array_of_scalars_not_populated() {
        let schema = Schema::new(
            "posts",
            vec![FieldDescriptor::array_of(
                "tags",
                Element::scalar(FieldKind::String),
            )],
        );
        let model = ModelBuilder::new(schema, Arc::new(CountingStore::default()))
            .unwrap()
            .build();

        assert!(model.populate_paths().is_empty());
    }
}
