//! Records
//!
//! A [`Record`] is a live, typed instance of a registered record type: one
//! field proxy per binding, all targeting sub-paths of the same remote
//! document. The same type serves both top-level records (bound at the
//! document root) and nested record fields (bound at a sub-path); lifecycle
//! operations — delete, duplicate, pipeline scopes — are valid on top-level
//! records only.
//!
//! Construction binds proxies to the record's identity and the paths from
//! the bound schema; the identity can be deliberately reassigned later,
//! which re-targets every proxy through the shared handle.

use crate::handle::{RecordHandle, StoreContext};
use crate::proxy::{decode_field, encode_field, write_value, BindState, FieldProxy};
use crate::proxy::{ListProxy, MapProxy, ScalarProxy};
use docbind_concurrency::PipelineBatch;
use docbind_core::{DocPath, Error, FieldValue, RecordKey, Result};
use docbind_schema::{BindingKind, BoundSchema, PathBinding, SchemaRegistry};
use docbind_store::{DocumentStore, WireValue};
use std::sync::Arc;
use tracing::debug;

/// Options for a pipeline scope
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Skip the entry snapshot instead of failing when the record does not
    /// exist remotely
    pub ignore_if_deleted: bool,
}

/// A typed record bound to one remote JSON document
pub struct Record {
    handle: Arc<RecordHandle>,
    schema: Arc<BoundSchema>,
    binding: Option<Arc<PathBinding>>,
    path: DocPath,
    fields: Vec<(String, FieldProxy)>,
    root: bool,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("path", &self.path)
            .field(
                "fields",
                &self.fields.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Record {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Create a fresh record of `type_name` with a random primary key
    pub fn create(
        registry: &SchemaRegistry,
        type_name: &str,
        ctx: &StoreContext,
    ) -> Result<Record> {
        let schema = registry.bound(type_name)?;
        let handle = RecordHandle::new(ctx, RecordKey::generate(type_name));
        Ok(Self::from_parts(handle, schema, None, DocPath::root(), true))
    }

    /// Create a record of `type_name` with an explicit primary key
    pub fn create_with_primary_key(
        registry: &SchemaRegistry,
        type_name: &str,
        ctx: &StoreContext,
        primary_key: impl Into<String>,
    ) -> Result<Record> {
        let schema = registry.bound(type_name)?;
        let handle = RecordHandle::new(ctx, RecordKey::new(type_name, primary_key));
        Ok(Self::from_parts(handle, schema, None, DocPath::root(), true))
    }

    /// Fetch an existing record by its external key string
    ///
    /// Derives the type and primary key from `"{type_name}:{primary_key}"`
    /// and loads the document; [`Error::KeyNotFound`] when it is absent.
    pub fn get(registry: &SchemaRegistry, ctx: &StoreContext, external: &str) -> Result<Record> {
        let key = RecordKey::parse(external)?;
        let schema = registry.bound(key.type_name())?;
        let handle = RecordHandle::new(ctx, key);
        let mut record = Self::from_parts(handle, schema, None, DocPath::root(), true);
        record.load()?;
        Ok(record)
    }

    /// Whether a document exists under `external`
    pub fn exists_key(ctx: &StoreContext, external: &str) -> Result<bool> {
        ctx.store().exists(external)
    }

    /// Build the nested record proxy for a record-kind binding
    pub(crate) fn nested(
        handle: Arc<RecordHandle>,
        binding: Arc<PathBinding>,
        path: DocPath,
    ) -> Record {
        let schema = match &binding.kind {
            BindingKind::Record(schema) => schema.clone(),
            other => unreachable!("record proxy over {} binding", other.kind_name()),
        };
        Self::from_parts(handle, schema, Some(binding), path, false)
    }

    fn from_parts(
        handle: Arc<RecordHandle>,
        schema: Arc<BoundSchema>,
        binding: Option<Arc<PathBinding>>,
        path: DocPath,
        root: bool,
    ) -> Record {
        let fields = schema
            .fields
            .iter()
            .map(|field| {
                let field_path = path.clone().key(&field.name);
                (
                    field.name.clone(),
                    FieldProxy::build(handle.clone(), field.clone(), field_path),
                )
            })
            .collect();
        Record {
            handle,
            schema,
            binding,
            path,
            fields,
            root,
        }
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// The record's current key
    pub fn key(&self) -> RecordKey {
        self.handle.key()
    }

    /// The external key string
    pub fn external_key(&self) -> String {
        self.handle.external_key()
    }

    /// The registered type name
    pub fn type_name(&self) -> &str {
        &self.schema.type_name
    }

    /// Whether this is a top-level record (not a nested field)
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// The bound sub-path (root for top-level records)
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// Deliberately re-target the record (and every proxy) to a new primary
    /// key; the previously persisted document is left untouched
    pub fn set_primary_key(&self, primary_key: impl Into<String>) {
        let key = self.handle.key().with_primary_key(primary_key);
        self.handle.set_key(key);
    }

    // ========================================================================
    // Field access
    // ========================================================================

    /// The proxy for `name`
    pub fn field(&self, name: &str) -> Result<&FieldProxy> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, proxy)| proxy)
            .ok_or_else(|| self.no_field(name))
    }

    /// The mutable proxy for `name`
    pub fn field_mut(&mut self, name: &str) -> Result<&mut FieldProxy> {
        let err = self.no_field(name);
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, proxy)| proxy)
            .ok_or(err)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// The scalar proxy for `name`
    pub fn scalar_mut(&mut self, name: &str) -> Result<&mut ScalarProxy> {
        let err = self.wrong_kind(name, "scalar");
        self.field_mut(name)?.as_scalar_mut().ok_or(err)
    }

    /// The list proxy for `name`
    pub fn list_mut(&mut self, name: &str) -> Result<&mut ListProxy> {
        let err = self.wrong_kind(name, "list");
        self.field_mut(name)?.as_list_mut().ok_or(err)
    }

    /// The map proxy for `name`
    pub fn map_mut(&mut self, name: &str) -> Result<&mut MapProxy> {
        let err = self.wrong_kind(name, "map");
        self.field_mut(name)?.as_map_mut().ok_or(err)
    }

    /// The nested record proxy for `name`
    pub fn record_mut(&mut self, name: &str) -> Result<&mut Record> {
        let err = self.wrong_kind(name, "record");
        self.field_mut(name)?.as_record_mut().ok_or(err)
    }

    fn no_field(&self, name: &str) -> Error {
        Error::Usage(format!(
            "record type '{}' has no field '{}'",
            self.schema.type_name, name
        ))
    }

    fn wrong_kind(&self, name: &str, wanted: &str) -> Error {
        Error::Usage(format!(
            "field '{}' of record type '{}' is not a {}",
            name, self.schema.type_name, wanted
        ))
    }

    // ========================================================================
    // Load / save
    // ========================================================================

    /// Fetch the record's sub-document and rebind every field cache
    ///
    /// For a top-level record a missing document is [`Error::KeyNotFound`];
    /// for a nested record a missing sub-path resets the fields to their
    /// empty values.
    pub fn load(&mut self) -> Result<()> {
        let wire = if self.root {
            match self
                .handle
                .store()
                .get(&self.handle.external_key(), &self.path)?
            {
                Some(wire) => Some(wire),
                None => return Err(Error::KeyNotFound(self.handle.external_key())),
            }
        } else {
            crate::proxy::fetch_value(&self.handle, &self.path)?
        };
        match wire {
            Some(wire) => self.apply_wire(&wire)?,
            None => self.reset_empty()?,
        }
        self.mark_state(BindState::Bound);
        Ok(())
    }

    /// Serialize the whole record through its field proxies and write the
    /// full sub-document at once, then reapply the configured TTL
    pub fn save(&mut self, batch: Option<&mut PipelineBatch>) -> Result<()> {
        let wire = self.to_wire()?;
        let eager = batch.is_none();
        let state = write_value(&self.handle, &self.path, wire, batch)?;
        self.mark_state(state);
        if self.root && eager {
            self.handle.reapply_ttl()?;
            debug!(key = %self.handle.external_key(), "record saved");
        }
        Ok(())
    }

    /// Replace every field and write the whole sub-document at once
    pub fn set(&mut self, value: FieldValue, batch: Option<&mut PipelineBatch>) -> Result<()> {
        if value.is_null() && self.nullable() {
            self.reset_empty()?;
            let state = write_value(&self.handle, &self.path, WireValue::Null, batch)?;
            self.mark_state(state);
            return Ok(());
        }
        self.set_local(value)?;
        self.save(batch)
    }

    /// Detached copy of the whole record's values
    pub fn detach(&self) -> FieldValue {
        FieldValue::Record(
            self.fields
                .iter()
                .map(|(name, proxy)| (name.clone(), proxy.detach()))
                .collect(),
        )
    }

    /// The record's wire form, serialized through each field's proxy
    pub fn to_wire(&self) -> Result<WireValue> {
        let mut out = serde_json::Map::new();
        for (binding, (name, proxy)) in self.schema.fields.iter().zip(&self.fields) {
            let field_path = self.path.clone().key(name.as_str());
            out.insert(
                name.clone(),
                encode_field(binding, &field_path, &proxy.detach())?,
            );
        }
        Ok(WireValue::Object(out))
    }

    /// Whether the record's document exists remotely
    pub fn exists(&self) -> Result<bool> {
        self.handle.store().exists(&self.handle.external_key())
    }

    fn apply_wire(&mut self, wire: &WireValue) -> Result<()> {
        let obj = wire.as_object().ok_or_else(|| {
            Error::Serialization(format!(
                "expected object at '{}' for record type '{}'",
                self.path, self.schema.type_name
            ))
        })?;
        let schema = self.schema.clone();
        let base = self.path.clone();
        for (binding, (name, proxy)) in schema.fields.iter().zip(self.fields.iter_mut()) {
            let field_path = base.clone().key(name.as_str());
            let value = match obj.get(name) {
                Some(wire) => decode_field(binding, &field_path, wire)?,
                None => binding.empty_value(),
            };
            proxy.set_local(value)?;
        }
        Ok(())
    }

    fn reset_empty(&mut self) -> Result<()> {
        let schema = self.schema.clone();
        for (binding, (_, proxy)) in schema.fields.iter().zip(self.fields.iter_mut()) {
            proxy.set_local(binding.empty_value())?;
        }
        Ok(())
    }

    pub(crate) fn set_local(&mut self, value: FieldValue) -> Result<()> {
        match value {
            FieldValue::Null if self.nullable() => self.reset_empty(),
            FieldValue::Record(mut values) => {
                for key in values.keys() {
                    if self.schema.field(key).is_none() {
                        return Err(self.no_field(key));
                    }
                }
                let schema = self.schema.clone();
                for (binding, (name, proxy)) in schema.fields.iter().zip(self.fields.iter_mut()) {
                    let value = values
                        .remove(name)
                        .unwrap_or_else(|| binding.empty_value());
                    proxy.set_local(value)?;
                }
                Ok(())
            }
            other => Err(Error::type_mismatch(
                self.path.to_string(),
                "record",
                other.kind_name(),
            )),
        }
    }

    pub(crate) fn mark_state(&mut self, state: BindState) {
        for (_, proxy) in &mut self.fields {
            proxy.mark_state(state);
        }
    }

    fn nullable(&self) -> bool {
        self.binding.as_ref().map_or(false, |b| b.nullable)
    }

    // ========================================================================
    // Lifecycle (top-level only)
    // ========================================================================

    /// Remove the whole document; true when it existed
    ///
    /// Only valid on a top-level record — a record reached as a nested field
    /// signals [`Error::Usage`].
    pub fn delete(&self) -> Result<bool> {
        self.require_root("delete")?;
        self.handle.store().delete_doc(&self.handle.external_key())
    }

    /// Clone the field values into a new record with a fresh identity and
    /// persist it
    pub fn duplicate(&self) -> Result<Record> {
        self.require_root("duplicate")?;
        let key = RecordKey::generate(self.schema.type_name.as_str());
        let handle = self.handle.with_key(key);
        let mut copy = Record::from_parts(
            handle,
            self.schema.clone(),
            None,
            DocPath::root(),
            true,
        );
        for ((_, src), (_, dst)) in self.fields.iter().zip(copy.fields.iter_mut()) {
            dst.set_local(src.detach())?;
        }
        copy.save(None)?;
        Ok(copy)
    }

    /// Persist `n` independent duplicates
    pub fn duplicate_many(&self, n: usize) -> Result<Vec<Record>> {
        (0..n).map(|_| self.duplicate()).collect()
    }

    /// Run `f` inside a pipeline scope
    ///
    /// Entry snapshots the record's remote state into the local caches —
    /// skipped when the record does not exist and
    /// [`PipelineOptions::ignore_if_deleted`] is set, a [`Error::KeyNotFound`]
    /// otherwise. Writes inside the scope stage into the batch; a clean exit
    /// flushes them as one atomic commit and reapplies the configured TTL, an
    /// error discards the batch and propagates.
    pub fn with_pipeline<R>(
        &mut self,
        options: PipelineOptions,
        f: impl FnOnce(&mut Record, &mut PipelineBatch) -> Result<R>,
    ) -> Result<R> {
        self.require_root("pipeline")?;
        match self.load() {
            Ok(()) => {}
            Err(Error::KeyNotFound(_)) if options.ignore_if_deleted => {}
            Err(e) => return Err(e),
        }
        let mut batch = PipelineBatch::new();
        match f(self, &mut batch) {
            Ok(result) => {
                batch.flush(self.handle.store().as_ref())?;
                self.handle.reapply_ttl()?;
                self.mark_state(BindState::Bound);
                Ok(result)
            }
            Err(e) => {
                batch.discard();
                Err(e)
            }
        }
    }

    fn require_root(&self, op: &str) -> Result<()> {
        if self.root {
            Ok(())
        } else {
            Err(Error::Usage(format!(
                "{} is only valid on a top-level record, not a nested '{}' field at '{}'",
                op, self.schema.type_name, self.path
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbind_schema::{FieldType, RecordShape};
    use docbind_store::MemoryStore;

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry
            .register_all([
                RecordShape::builder("customer")
                    .field("name", FieldType::string())
                    .field("age", FieldType::integer())
                    .field("tags", FieldType::list(FieldType::string()))
                    .field("metadata", FieldType::map(FieldType::string()))
                    .field("address", FieldType::record("address"))
                    .build(),
                RecordShape::builder("address")
                    .field("city", FieldType::string())
                    .field("zip", FieldType::string())
                    .build(),
            ])
            .unwrap();
        registry
    }

    fn ctx() -> StoreContext {
        StoreContext::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_field_paths_follow_bindings() {
        let registry = registry();
        let mut record = Record::create(&registry, "customer", &ctx()).unwrap();
        assert_eq!(record.field("tags").unwrap().path().to_string(), "tags");
        let address = record.record_mut("address").unwrap();
        assert!(!address.is_root());
        assert_eq!(
            address.field("city").unwrap().path().to_string(),
            "address.city"
        );
    }

    #[test]
    fn test_unknown_field_is_usage_error() {
        let registry = registry();
        let mut record = Record::create(&registry, "customer", &ctx()).unwrap();
        assert!(matches!(record.field("ghost"), Err(Error::Usage(_))));
        assert!(matches!(record.scalar_mut("tags"), Err(Error::Usage(_))));
    }

    #[test]
    fn test_save_load_round_trip() {
        let registry = registry();
        let ctx = ctx();
        let mut record = Record::create(&registry, "customer", &ctx).unwrap();
        record
            .scalar_mut("name")
            .unwrap()
            .set(FieldValue::from("Alice"), None)
            .unwrap();
        record
            .record_mut("address")
            .unwrap()
            .scalar_mut("city")
            .unwrap()
            .set(FieldValue::from("Berlin"), None)
            .unwrap();
        record.save(None).unwrap();

        let loaded = Record::get(&registry, &ctx, &record.external_key()).unwrap();
        assert_eq!(
            loaded.field("name").unwrap().detach(),
            FieldValue::from("Alice")
        );
        let address = loaded.field("address").unwrap().as_record().unwrap();
        assert_eq!(
            address.field("city").unwrap().detach(),
            FieldValue::from("Berlin")
        );
    }

    #[test]
    fn test_get_missing_is_key_not_found() {
        let registry = registry();
        let err = Record::get(&registry, &ctx(), "customer:ghost").unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[test]
    fn test_nested_delete_is_usage_error() {
        let registry = registry();
        let mut record = Record::create(&registry, "customer", &ctx()).unwrap();
        let address = record.record_mut("address").unwrap();
        assert!(matches!(address.delete(), Err(Error::Usage(_))));
        assert!(matches!(address.duplicate(), Err(Error::Usage(_))));
    }

    #[test]
    fn test_set_primary_key_retargets_proxies() {
        let registry = registry();
        let ctx = ctx();
        let mut record = Record::create(&registry, "customer", &ctx).unwrap();
        record.set_primary_key("first");
        record
            .scalar_mut("name")
            .unwrap()
            .set(FieldValue::from("A"), None)
            .unwrap();
        record.set_primary_key("second");
        record
            .scalar_mut("name")
            .unwrap()
            .set(FieldValue::from("B"), None)
            .unwrap();

        assert_eq!(
            ctx.store()
                .get("customer:first", &"name".parse().unwrap())
                .unwrap(),
            Some(serde_json::json!("A"))
        );
        assert_eq!(
            ctx.store()
                .get("customer:second", &"name".parse().unwrap())
                .unwrap(),
            Some(serde_json::json!("B"))
        );
    }

    #[test]
    fn test_set_rejects_unknown_keys() {
        let registry = registry();
        let mut record = Record::create(&registry, "customer", &ctx()).unwrap();
        let mut values = std::collections::BTreeMap::new();
        values.insert("ghost".to_string(), FieldValue::from(1i64));
        let err = record.set(FieldValue::Record(values), None).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }
}
