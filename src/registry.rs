//! Caches of generated field configurations keyed by host type.

use std::{any::TypeId, collections::HashMap, sync::Arc};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::{
    Selectable,
    schema::{self, FieldConfigurations, SchemaError, TypeDescriptor},
};

/// Source of field configurations for host types.
pub trait Registry: Send + Sync {
    fn field_configurations(
        &self,
        type_id: TypeId,
        tag_name: &str,
        describe: &dyn Fn() -> TypeDescriptor,
    ) -> Result<Arc<FieldConfigurations>, SchemaError>;
}

impl dyn Registry + '_ {
    pub fn get<T: Selectable + 'static>(
        &self,
        tag_name: &str,
    ) -> Result<Arc<FieldConfigurations>, SchemaError> {
        self.field_configurations(TypeId::of::<T>(), tag_name, &T::describe)
    }
}

type Slot = Arc<OnceCell<Arc<FieldConfigurations>>>;

/// Thread-safe registry that generates each type's schema at most once.
///
/// Concurrent first requests for the same type block until the single
/// generation finishes. A failed generation is not cached.
#[derive(Default)]
pub struct SyncRegistry {
    entries: RwLock<HashMap<(TypeId, String), Slot>>,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of types with a cached schema.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: (TypeId, String)) -> Slot {
        if let Some(slot) = self.entries.read().get(&key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.entries.write().entry(key).or_default())
    }
}

impl Registry for SyncRegistry {
    fn field_configurations(
        &self,
        type_id: TypeId,
        tag_name: &str,
        describe: &dyn Fn() -> TypeDescriptor,
    ) -> Result<Arc<FieldConfigurations>, SchemaError> {
        let slot = self.slot((type_id, tag_name.to_string()));
        let fields = slot.get_or_try_init(|| {
            let descriptor = describe();
            log::debug!(
                "generating field configurations for {} (tag {:?})",
                descriptor.type_name(),
                tag_name
            );
            schema::generate_with_tag(&descriptor, tag_name).map(Arc::new)
        })?;
        Ok(Arc::clone(fields))
    }
}

/// Registry that caches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NilRegistry;

impl Registry for NilRegistry {
    fn field_configurations(
        &self,
        _type_id: TypeId,
        tag_name: &str,
        describe: &dyn Fn() -> TypeDescriptor,
    ) -> Result<Arc<FieldConfigurations>, SchemaError> {
        schema::generate_with_tag(&describe(), tag_name).map(Arc::new)
    }
}
