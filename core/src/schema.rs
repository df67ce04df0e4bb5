//! Response shape normalization.
//!
//! A [`Schema`] describes where entities live inside a nested JSON response.
//! [`normalize`] walks the response, moves every entity into a table keyed by
//! its id, and leaves the id behind in its place:
//!
//! ```text
//! {"id": "a1", "tracks": [{"id": "t1"}, {"id": "t2"}]}
//!
//! => result:   "a1"
//!    entities: albums: {"a1": {"id": "a1", "tracks": ["t1", "t2"]}}
//!              tracks: {"t1": {"id": "t1"}, "t2": {"id": "t2"}}
//! ```
//!
//! # Example
//!
//! ```
//! use call_api_core::schema::{normalize, Entity, Schema};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let track = Entity::new("tracks");
//! let album = Entity::new("albums");
//! album.define([("tracks", Schema::array(track))])?;
//!
//! let data = json!({"id": "a1", "tracks": [{"id": "t1"}, {"id": "t2"}]});
//! let normalized = normalize(&data, &album.into())?;
//!
//! assert_eq!(normalized.result, json!("a1"));
//! assert_eq!(normalized.entities["albums"]["a1"]["tracks"], json!(["t1", "t2"]));
//! assert_eq!(normalized.entities["tracks"].len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::descriptor::value_kind;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Default attribute holding an entity's id.
pub const DEFAULT_ID_ATTRIBUTE: &str = "id";

/// Errors raised while building a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// `define` was called twice on the same entity.
    #[error("entity schema `{0}` is already defined")]
    AlreadyDefined(String),
}

/// Errors raised while normalizing data against a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// An entity object has no id.
    #[error("`{entity}` entity is missing its `{id_attribute}` attribute")]
    MissingId {
        /// Entity table name.
        entity: String,
        /// Attribute that was looked up.
        id_attribute: String,
    },

    /// An entity id is neither a string nor a number.
    #[error("`{entity}` entity id is {found}, expected a string or a number")]
    InvalidId {
        /// Entity table name.
        entity: String,
        /// JSON kind of the id found.
        found: &'static str,
    },
}

/// An entity type: a table name, an id attribute, and the nested schemas of
/// its fields.
///
/// Cloning is cheap and shares the definition, so an entity can reference
/// itself or another entity that references it back. Define nested fields
/// after creating every entity involved.
///
/// Entities that reference each other form a reference cycle and are never
/// freed. Build cyclic schemas once and keep them for the life of the
/// program. Acyclic schemas are released when the last handle drops.
#[derive(Clone)]
pub struct Entity(Arc<EntityInner>);

struct EntityInner {
    key: String,
    id_attribute: String,
    definition: OnceLock<BTreeMap<String, Schema>>,
}

impl Entity {
    /// Create an entity stored under `key`, identified by its `id` attribute.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_id_attribute(key, DEFAULT_ID_ATTRIBUTE)
    }

    /// Create an entity identified by a custom attribute.
    #[must_use]
    pub fn with_id_attribute(key: impl Into<String>, id_attribute: impl Into<String>) -> Self {
        Self(Arc::new(EntityInner {
            key: key.into(),
            id_attribute: id_attribute.into(),
            definition: OnceLock::new(),
        }))
    }

    /// Declare which fields hold nested schemas.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::AlreadyDefined`] if this entity was defined before.
    pub fn define<I, K>(&self, fields: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        let fields = fields.into_iter().map(|(k, s)| (k.into(), s)).collect();
        self.0
            .definition
            .set(fields)
            .map_err(|_| SchemaError::AlreadyDefined(self.0.key.clone()))
    }

    /// The entity table name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.0.key
    }

    /// The attribute holding the id.
    #[must_use]
    pub fn id_attribute(&self) -> &str {
        &self.0.id_attribute
    }

    fn definition(&self) -> Option<&BTreeMap<String, Schema>> {
        self.0.definition.get()
    }
}

// Definitions may be cyclic, so only field names are printed.
impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self
            .definition()
            .map(|d| d.keys().map(String::as_str).collect())
            .unwrap_or_default();
        f.debug_struct("Entity")
            .field("key", &self.0.key)
            .field("id_attribute", &self.0.id_attribute)
            .field("fields", &fields)
            .finish()
    }
}

/// Describes the shape of a response.
#[derive(Clone, Debug)]
pub enum Schema {
    /// A single entity.
    Entity(Entity),

    /// A list whose items all follow the inner schema. Applied to an object,
    /// the object's values are normalized into a list.
    Array(Box<Schema>),

    /// A plain object where some fields follow nested schemas; other fields
    /// are copied as-is.
    Object(BTreeMap<String, Schema>),

    /// An object used as a map whose values all follow the inner schema.
    Values(Box<Schema>),
}

impl Schema {
    /// A list of `inner`.
    #[must_use]
    pub fn array(inner: impl Into<Self>) -> Self {
        Self::Array(Box::new(inner.into()))
    }

    /// A plain object with nested schemas on some fields.
    #[must_use]
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    /// A map whose values follow `inner`.
    #[must_use]
    pub fn values(inner: impl Into<Self>) -> Self {
        Self::Values(Box::new(inner.into()))
    }
}

impl From<Entity> for Schema {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

/// Entity tables: entity key → id → entity.
pub type EntityTables = BTreeMap<String, BTreeMap<String, Value>>;

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalized {
    /// The input with every entity replaced by its id.
    pub result: Value,
    /// Every entity found, by table and id.
    pub entities: EntityTables,
}

impl Normalized {
    /// Convert to `{"result": ..., "entities": {...}}`.
    #[must_use]
    pub fn into_value(self) -> Value {
        let entities = self
            .entities
            .into_iter()
            .map(|(key, table)| (key, Value::Object(table.into_iter().collect())))
            .collect::<Map<_, _>>();

        let mut out = Map::new();
        out.insert("result".to_string(), self.result);
        out.insert("entities".to_string(), Value::Object(entities));
        Value::Object(out)
    }
}

/// Flatten `data` into entity tables according to `schema`.
///
/// Values that do not have the shape the schema expects (a string where an
/// entity was described, `null` fields, ...) are copied unchanged. When the
/// same entity appears more than once, its occurrences are merged field by
/// field, later ones winning.
///
/// # Errors
///
/// - [`NormalizeError::MissingId`] if an entity object has no id
/// - [`NormalizeError::InvalidId`] if an id is not a string or number
pub fn normalize(data: &Value, schema: &Schema) -> Result<Normalized, NormalizeError> {
    let mut entities = EntityTables::new();
    let result = visit(data, schema, &mut entities)?;
    Ok(Normalized { result, entities })
}

fn visit(
    value: &Value,
    schema: &Schema,
    tables: &mut EntityTables,
) -> Result<Value, NormalizeError> {
    match schema {
        Schema::Entity(entity) => visit_entity(value, entity, tables),
        Schema::Array(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| visit(item, inner, tables))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => map
                .values()
                .map(|item| visit(item, inner, tables))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        },
        Schema::Object(fields) => match value {
            Value::Object(map) => visit_fields(map, fields, tables).map(Value::Object),
            other => Ok(other.clone()),
        },
        Schema::Values(inner) => match value {
            Value::Object(map) => map
                .iter()
                .map(|(key, item)| Ok((key.clone(), visit(item, inner, tables)?)))
                .collect::<Result<Map<_, _>, _>>()
                .map(Value::Object),
            other => Ok(other.clone()),
        },
    }
}

fn visit_fields(
    map: &Map<String, Value>,
    fields: &BTreeMap<String, Schema>,
    tables: &mut EntityTables,
) -> Result<Map<String, Value>, NormalizeError> {
    let mut out = map.clone();
    for (field, schema) in fields {
        if let Some(nested) = map.get(field).filter(|v| !v.is_null()) {
            let replaced = visit(nested, schema, tables)?;
            out.insert(field.clone(), replaced);
        }
    }
    Ok(out)
}

fn visit_entity(
    value: &Value,
    entity: &Entity,
    tables: &mut EntityTables,
) -> Result<Value, NormalizeError> {
    let Value::Object(map) = value else {
        return Ok(value.clone());
    };

    let processed = match entity.definition() {
        Some(fields) => visit_fields(map, fields, tables)?,
        None => map.clone(),
    };

    let id = match processed.get(entity.id_attribute()) {
        None | Some(Value::Null) => {
            return Err(NormalizeError::MissingId {
                entity: entity.key().to_string(),
                id_attribute: entity.id_attribute().to_string(),
            });
        }
        Some(id @ (Value::String(_) | Value::Number(_))) => id.clone(),
        Some(other) => {
            return Err(NormalizeError::InvalidId {
                entity: entity.key().to_string(),
                found: value_kind(other),
            });
        }
    };

    let id_key = match &id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let table = tables.entry(entity.key().to_string()).or_default();
    match table.get_mut(&id_key) {
        Some(Value::Object(existing)) => existing.extend(processed),
        _ => {
            table.insert(id_key, Value::Object(processed));
        }
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    fn album_schema() -> Schema {
        let track = Entity::new("tracks");
        let album = Entity::new("albums");
        album.define([("tracks", Schema::array(track))]).unwrap();
        album.into()
    }

    #[test]
    fn album_with_nested_tracks() {
        let data = json!({
            "id": "a1",
            "name": "Album",
            "tracks": [
                {"id": "t2", "name": "Second"},
                {"id": "t1", "name": "First"}
            ]
        });

        let normalized = normalize(&data, &album_schema()).unwrap();

        assert_eq!(normalized.result, json!("a1"));
        assert_eq!(
            normalized.entities["albums"]["a1"],
            json!({"id": "a1", "name": "Album", "tracks": ["t2", "t1"]})
        );
        assert_eq!(
            normalized.entities["tracks"]["t1"],
            json!({"id": "t1", "name": "First"})
        );
        assert_eq!(normalized.entities["tracks"].len(), 2);
    }

    #[test]
    fn array_of_entities_yields_list_of_ids() {
        let data = json!([{"id": 1}, {"id": 2}]);
        let normalized = normalize(&data, &Schema::array(Entity::new("items"))).unwrap();

        assert_eq!(normalized.result, json!([1, 2]));
        assert_eq!(normalized.entities["items"]["1"], json!({"id": 1}));
        assert_eq!(normalized.entities["items"]["2"], json!({"id": 2}));
    }

    #[test]
    fn repeated_entities_are_merged() {
        let artist = Entity::new("artists");
        let track = Entity::new("tracks");
        track.define([("artist", Schema::from(artist))]).unwrap();

        let data = json!([
            {"id": "t1", "artist": {"id": "ar1", "name": "A"}},
            {"id": "t2", "artist": {"id": "ar1", "genres": ["rock"]}}
        ]);
        let normalized = normalize(&data, &Schema::array(track)).unwrap();

        assert_eq!(
            normalized.entities["artists"]["ar1"],
            json!({"id": "ar1", "name": "A", "genres": ["rock"]})
        );
        assert_eq!(normalized.entities["tracks"]["t2"]["artist"], json!("ar1"));
    }

    #[test]
    fn object_schema_only_touches_described_fields() {
        let album = Entity::new("albums");
        let schema = Schema::object([("albums", Schema::array(album))]);

        let data = json!({"albums": [{"id": "a"}], "next": "page-2", "total": 1});
        let normalized = normalize(&data, &schema).unwrap();

        assert_eq!(
            normalized.result,
            json!({"albums": ["a"], "next": "page-2", "total": 1})
        );
    }

    #[test]
    fn values_schema_normalizes_each_value() {
        let schema = Schema::values(Entity::new("users"));
        let data = json!({"first": {"id": "u1"}, "second": {"id": "u2"}});
        let normalized = normalize(&data, &schema).unwrap();

        assert_eq!(normalized.result, json!({"first": "u1", "second": "u2"}));
        assert_eq!(normalized.entities["users"].len(), 2);
    }

    #[test]
    fn recursive_definitions() {
        let album = Entity::new("albums");
        let artist = Entity::new("artists");
        album.define([("artists", Schema::array(artist.clone()))]).unwrap();
        artist.define([("albums", Schema::array(album.clone()))]).unwrap();

        let data = json!({
            "id": "a1",
            "artists": [{"id": "ar1", "albums": [{"id": "a2"}]}]
        });
        let normalized = normalize(&data, &album.into()).unwrap();

        assert_eq!(normalized.entities["albums"].len(), 2);
        assert_eq!(normalized.entities["artists"]["ar1"]["albums"], json!(["a2"]));
    }

    #[test]
    fn cyclic_schema_outlives_its_handles() {
        fn build() -> Schema {
            let album = Entity::new("albums");
            let artist = Entity::new("artists");
            album.define([("artists", Schema::array(artist.clone()))]).unwrap();
            artist.define([("albums", Schema::array(album.clone()))]).unwrap();
            album.into()
        }

        let schema = build();
        let data = json!({"id": "a1", "artists": [{"id": "ar1", "albums": [{"id": "a1"}]}]});
        let normalized = normalize(&data, &schema).unwrap();
        assert_eq!(normalized.entities["artists"]["ar1"]["albums"], json!(["a1"]));
    }

    #[test]
    fn acyclic_schema_releases_entities() {
        let track = Entity::new("tracks");
        let album = Entity::new("albums");
        album.define([("tracks", Schema::array(track.clone()))]).unwrap();
        assert_eq!(Arc::strong_count(&track.0), 2);

        drop(album);
        assert_eq!(Arc::strong_count(&track.0), 1);
    }

    #[test]
    fn null_and_missing_nested_fields_are_kept() {
        let data = json!({"id": "a1", "tracks": null});
        let normalized = normalize(&data, &album_schema()).unwrap();
        assert_eq!(normalized.entities["albums"]["a1"]["tracks"], Value::Null);
        assert!(!normalized.entities.contains_key("tracks"));
    }

    #[test]
    fn missing_id_is_an_error() {
        let err = normalize(&json!({"name": "x"}), &album_schema()).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::MissingId {
                entity: "albums".to_string(),
                id_attribute: "id".to_string()
            }
        );
    }

    #[test]
    fn custom_id_attribute() {
        let user = Entity::with_id_attribute("users", "login");
        let normalized = normalize(&json!({"login": "ada"}), &user.into()).unwrap();
        assert_eq!(normalized.result, json!("ada"));
        assert!(normalized.entities["users"].contains_key("ada"));
    }

    #[test]
    fn define_twice_is_rejected() {
        let entity = Entity::new("albums");
        entity.define(Vec::<(String, Schema)>::new()).unwrap();
        assert_eq!(
            entity.define(Vec::<(String, Schema)>::new()),
            Err(SchemaError::AlreadyDefined("albums".to_string()))
        );
    }

    #[test]
    fn into_value_shape() {
        let normalized = normalize(&json!({"id": "t1"}), &Entity::new("tracks").into()).unwrap();
        assert_eq!(
            normalized.into_value(),
            json!({"result": "t1", "entities": {"tracks": {"t1": {"id": "t1"}}}})
        );
    }
}
