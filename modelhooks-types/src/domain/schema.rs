//! Declarative collection schemas.
//!
//! A `Schema` lists the fields a model declares, including which of them
//! hold references that finds should expand. Everything here is plain data;
//! the hook installer in `modelhooks-hex` reads it once at build time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, SchemaError, ValidationError};

/// Default name of the soft-active flag.
pub const DEFAULT_ACTIVE_FLAG: &str = "isActive";

/// Type marker of a declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Date,
    Object,
    /// Holds the id of a document in `collection`.
    Reference { collection: String },
    Array(Box<Element>),
}

/// Element type of an array field, with its own population directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub kind: FieldKind,
    pub populate: Option<PopulateDirective>,
}

/// Marks a field for automatic population on every find.
///
/// `alias` replaces the field name as the populated path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulateDirective {
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub populate: Option<PopulateDirective>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            populate: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn reference(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Reference {
                collection: collection.into(),
            },
        )
    }

    /// An array field; `element.populate` is lifted onto this field when the
    /// populate cascade runs.
    pub fn array_of(name: impl Into<String>, element: Element) -> Self {
        Self::new(name, FieldKind::Array(Box::new(element)))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn populate(mut self) -> Self {
        self.populate = Some(PopulateDirective::default());
        self
    }

    pub fn populate_as(mut self, alias: impl Into<String>) -> Self {
        self.populate = Some(PopulateDirective {
            alias: Some(alias.into()),
        });
        self
    }

    /// Collection the field points into, for references and arrays of references.
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Reference { collection } => Some(collection),
            FieldKind::Array(element) => match &element.kind {
                FieldKind::Reference { collection } => Some(collection),
                _ => None,
            },
            _ => None,
        }
    }

    /// Path the populate cascade requests for this field, if any.
    pub fn populate_path(&self) -> Option<&str> {
        self.populate
            .as_ref()
            .map(|p| p.alias.as_deref().unwrap_or(&self.name))
    }
}

impl Element {
    pub fn reference(collection: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Reference {
                collection: collection.into(),
            },
            populate: None,
        }
    }

    pub fn scalar(kind: FieldKind) -> Self {
        Self {
            kind,
            populate: None,
        }
    }

    pub fn populate(mut self) -> Self {
        self.populate = Some(PopulateDirective::default());
        self
    }

    pub fn populate_as(mut self, alias: impl Into<String>) -> Self {
        self.populate = Some(PopulateDirective {
            alias: Some(alias.into()),
        });
        self
    }
}

/// Field layout of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub collection: String,
    pub fields: Vec<FieldDescriptor>,
    pub active_flag: String,
}

impl Schema {
    pub fn new(collection: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            collection: collection.into(),
            fields,
            active_flag: DEFAULT_ACTIVE_FLAG.to_string(),
        }
    }

    /// Renames the soft-active flag used by update defaulting and `list_actives`.
    pub fn with_active_flag(mut self, name: impl Into<String>) -> Self {
        self.active_flag = name.into();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn declares_active_flag(&self) -> bool {
        self.has_field(&self.active_flag)
    }

    /// Lifts array element population onto the array field itself.
    ///
    /// The element's directive replaces the parent's, absent or not.
    pub fn cascade_populate(&mut self) {
        for field in &mut self.fields {
            if let FieldKind::Array(element) = &field.kind {
                field.populate = element.populate.clone();
            }
        }
    }

    /// Relation paths to populate on every find, checked against the
    /// schema's own fields.
    ///
    /// Each path must name a declared reference field (or array of
    /// references); anything else is rejected.
    pub fn populate_paths(&self) -> Result<Vec<String>, SchemaError> {
        let mut paths: Vec<String> = Vec::new();

        for field in &self.fields {
            let Some(path) = field.populate_path() else {
                continue;
            };

            let target = self
                .field(path)
                .ok_or_else(|| SchemaError::UnknownPopulatePath {
                    collection: self.collection.clone(),
                    field: field.name.clone(),
                    path: path.to_string(),
                })?;

            if target.reference_target().is_none() {
                return Err(SchemaError::NotAReference {
                    collection: self.collection.clone(),
                    path: path.to_string(),
                });
            }

            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }

        Ok(paths)
    }

    /// Checks a request body against required fields and scalar kinds.
    pub fn validate(&self, body: &Map<String, Value>) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        for field in &self.fields {
            let mut messages = Vec::new();

            match body.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        messages.push(format!("\"{}\" is required", field.name));
                    }
                }
                Some(value) => {
                    if let Some(expected) = kind_mismatch(&field.kind, value) {
                        messages.push(format!("\"{}\" must be {}", field.name, expected));
                    }
                }
            }

            if !messages.is_empty() {
                errors.push(FieldError {
                    field: field.name.clone(),
                    location: "body".into(),
                    messages,
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(errors))
        }
    }
}

fn kind_mismatch(kind: &FieldKind, value: &Value) -> Option<&'static str> {
    let ok = match kind {
        FieldKind::String | FieldKind::Date | FieldKind::Reference { .. } => value.is_string(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Object => value.is_object(),
        FieldKind::Array(_) => value.is_array(),
    };

    if ok {
        return None;
    }

    Some(match kind {
        FieldKind::String | FieldKind::Date => "a string",
        FieldKind::Reference { .. } => "an id string",
        FieldKind::Number => "a number",
        FieldKind::Boolean => "a boolean",
        FieldKind::Object => "an object",
        FieldKind::Array(_) => "an array",
    })
}
