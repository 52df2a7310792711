//! Models served by the binary and the pipeline mounting them.

use std::sync::Arc;

use modelhooks_hex::{
    ModelBuilder,
    inbound::{Pipeline, PipelineConfig, resource_routes},
    model::ManagerIntegration,
};
use modelhooks_types::{
    Document, DocumentId, DocumentStore, Element, FieldDescriptor, Schema, SchemaError,
};

pub fn companies_schema() -> Schema {
    Schema::new(
        "companies",
        vec![
            FieldDescriptor::string("name").required(),
            FieldDescriptor::boolean("isActive"),
        ],
    )
}

pub fn roles_schema() -> Schema {
    Schema::new("roles", vec![FieldDescriptor::string("name").required()])
}

pub fn users_schema() -> Schema {
    Schema::new(
        "users",
        vec![
            FieldDescriptor::string("name").required(),
            FieldDescriptor::string("email").required(),
            FieldDescriptor::reference("company", "companies").populate(),
            FieldDescriptor::array_of("roles", Element::reference("roles").populate()),
            FieldDescriptor::boolean("isActive"),
        ],
    )
}

/// Users are synced under the company they belong to.
fn company_owner(doc: &Document) -> String {
    doc.get("company")
        .and_then(DocumentId::from_value)
        .unwrap_or(doc.id)
        .to_string()
}

/// Builds every model on `store` and mounts them on a pipeline.
pub fn build_pipeline<S: DocumentStore>(
    store: Arc<S>,
    pipeline: PipelineConfig,
    manager: ManagerIntegration,
) -> Result<Pipeline, SchemaError> {
    let companies = ModelBuilder::new(companies_schema(), store.clone())?
        .with_static_methods()
        .with_manager_integration(manager.clone())
        .build();

    let roles = ModelBuilder::new(roles_schema(), store.clone())?
        .with_static_methods()
        .build();

    let users = ModelBuilder::new(users_schema(), store)?
        .with_static_methods()
        .with_manager_integration(manager.owner_resolver(company_owner))
        .build();

    Ok(Pipeline::new(pipeline)
        .mount(resource_routes(Arc::new(companies)))
        .mount(resource_routes(Arc::new(roles)))
        .mount(resource_routes(Arc::new(users))))
}
