//! Reference expansion for find results.

use std::collections::HashMap;

use serde_json::Value;

use modelhooks_types::{Document, DocumentId, DocumentStore, RepoError, Schema};

/// Replaces reference ids under each populate path with the referenced
/// documents.
///
/// Single references that dangle become `null`; dangling entries of a
/// reference array are dropped. Paths the schema cannot resolve to a
/// reference are skipped.
pub(crate) async fn resolve<S>(
    store: &S,
    schema: &Schema,
    paths: &[String],
    docs: &mut [Document],
) -> Result<(), RepoError>
where
    S: DocumentStore + ?Sized,
{
    if docs.is_empty() {
        return Ok(());
    }

    for path in paths {
        let Some(target) = schema.field(path).and_then(|f| f.reference_target()) else {
            tracing::debug!(collection = %schema.collection, %path, "populate path is not a reference; skipped");
            continue;
        };

        let mut ids: Vec<DocumentId> = Vec::new();
        for doc in docs.iter() {
            collect_ids(doc.get(path), &mut ids);
        }
        ids.sort();
        ids.dedup();

        let found: HashMap<DocumentId, Value> = store
            .find_by_ids(target, &ids)
            .await?
            .into_iter()
            .map(|d| {
                let id = d.id;
                serde_json::to_value(d).map(|v| (id, v))
            })
            .collect::<Result<_, _>>()?;

        for doc in docs.iter_mut() {
            if let Some(value) = doc.fields.get_mut(path) {
                expand(value, &found);
            }
        }
    }

    Ok(())
}

fn collect_ids(value: Option<&Value>, ids: &mut Vec<DocumentId>) {
    match value {
        Some(Value::String(_)) => ids.extend(value.and_then(DocumentId::from_value)),
        Some(Value::Array(items)) => ids.extend(items.iter().filter_map(DocumentId::from_value)),
        _ => {}
    }
}

fn expand(value: &mut Value, found: &HashMap<DocumentId, Value>) {
    match value {
        Value::String(_) => {
            *value = DocumentId::from_value(value)
                .and_then(|id| found.get(&id).cloned())
                .unwrap_or(Value::Null);
        }
        Value::Array(items) => {
            let expanded: Vec<Value> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(_) => {
                        DocumentId::from_value(item).and_then(|id| found.get(&id).cloned())
                    }
                    // Already expanded or not an id: leave untouched.
                    other => Some(other.clone()),
                })
                .collect();
            *items = expanded;
        }
        _ => {}
    }
}
