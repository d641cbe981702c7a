//! Entity registration.
//!
//! Entities are registered once at startup, either explicitly with
//! [`EntityRegistry::register`] or by submitting an [`EntityDef`] to
//! inventory and calling [`EntityRegistry::collect`]:
//!
//! ```ignore
//! struct User;
//!
//! impl Entity for User {
//!     fn descriptor() -> EntityDescriptor {
//!         EntityBuilder::new("user")
//!             .column("id", ColumnDescriptor::of::<i64>("id").primary_key())
//!             .build()
//!     }
//! }
//!
//! inventory::submit! { EntityDef::new::<User>() }
//! ```

use crate::{ConfigError, EntityDescriptor};
use indexmap::IndexMap;
use std::any::TypeId;

/// A type that describes a table.
pub trait Entity: 'static {
    fn descriptor() -> EntityDescriptor;
}

/// A registered entity definition, submitted to inventory.
pub struct EntityDef {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    descriptor: fn() -> EntityDescriptor,
}

impl EntityDef {
    pub const fn new<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>,
            type_name: std::any::type_name::<T>,
            descriptor: T::descriptor,
        }
    }

    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }
}

inventory::collect!(EntityDef);

#[derive(Debug)]
struct Registered {
    type_name: &'static str,
    descriptor: EntityDescriptor,
}

/// Entity descriptors keyed by type, in registration order.
///
/// Populated at startup and only read afterwards; share it by reference.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: IndexMap<TypeId, Registered>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every entity submitted with `inventory::submit!`, ordered by
    /// table name.
    pub fn collect() -> Result<Self, ConfigError> {
        let mut defs: Vec<(&EntityDef, EntityDescriptor)> = inventory::iter::<EntityDef>
            .into_iter()
            .map(|def| (def, (def.descriptor)()))
            .collect();
        defs.sort_by(|a, b| a.1.table_name.cmp(&b.1.table_name));

        let mut registry = Self::new();
        for (def, descriptor) in defs {
            registry.insert((def.type_id)(), def.type_name(), descriptor)?;
        }
        Ok(registry)
    }

    /// Register `T`. Registering the same type twice replaces the earlier
    /// descriptor.
    pub fn register<T: Entity>(&mut self) -> Result<&mut Self, ConfigError> {
        self.insert(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            T::descriptor(),
        )?;
        Ok(self)
    }

    fn insert(
        &mut self,
        type_id: TypeId,
        type_name: &'static str,
        descriptor: EntityDescriptor,
    ) -> Result<(), ConfigError> {
        descriptor.validate()?;

        if let Some((existing_id, existing)) = self
            .entries
            .iter()
            .find(|(_, r)| r.descriptor.table_name == descriptor.table_name)
            && *existing_id != type_id
        {
            return Err(ConfigError::DuplicateTable {
                table: descriptor.table_name,
                first: existing.type_name.to_string(),
                second: type_name.to_string(),
            });
        }

        self.entries.insert(
            type_id,
            Registered {
                type_name,
                descriptor,
            },
        );
        Ok(())
    }

    pub fn get<T: Entity>(&self) -> Option<&EntityDescriptor> {
        self.entries.get(&TypeId::of::<T>()).map(|r| &r.descriptor)
    }

    pub fn by_table(&self, table_name: &str) -> Option<&EntityDescriptor> {
        self.descriptors().find(|d| d.table_name == table_name)
    }

    /// All descriptors, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entries.values().map(|r| &r.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
