//! Entity descriptors and introspected schema types for keel.
//!
//! This crate holds the two inputs of a migration run:
//!
//! - [`EntityDescriptor`]: the declared shape of one table, built once at
//!   startup with [`EntityBuilder`] and registered in an [`EntityRegistry`].
//! - [`IntrospectedSchema`]: a point-in-time snapshot of the live database,
//!   produced by `keel::introspect`.
//!
//! ## Example
//!
//! ```
//! use keel_db_schema::{ColumnDescriptor, EntityBuilder, SqlType};
//!
//! let base = EntityBuilder::new("base")
//!     .column("id", ColumnDescriptor::new("id", SqlType::Other("uuid".into())).primary_key())
//!     .build();
//!
//! let post = EntityBuilder::new("post")
//!     .extends(&base)
//!     .column("title", ColumnDescriptor::of::<String>("title"))
//!     .column("authorId", ColumnDescriptor::of::<String>("author_id"))
//!     .foreign_key("authorId", "user", "id")
//!     .column("embedding", ColumnDescriptor::new("embedding", SqlType::Text))
//!     .vector("embedding", 1536)
//!     .build();
//!
//! assert_eq!(post.columns.keys().collect::<Vec<_>>(), ["id", "title", "authorId", "embedding"]);
//! assert!(post.validate().is_ok());
//! ```

use indexmap::IndexMap;

mod error;
pub use error::ConfigError;

mod registry;
pub use registry::{Entity, EntityDef, EntityRegistry};

mod snapshot;
pub use snapshot::{ColumnSnapshot, FkSnapshot, IndexSnapshot, IntrospectedSchema, TableSnapshot};

pub mod sql_type;
pub use sql_type::{ColumnType, SqlType, TypeHint};

/// A declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name in the database
    pub name: String,
    /// Whether this column is part of the primary key
    pub is_primary_key: bool,
    /// Whether the column allows NULL
    pub is_nullable: bool,
    /// Whether the column has a unique constraint
    pub is_unique: bool,
    /// Resolved column type
    pub sql_type: SqlType,
    /// Default value, either a function call (`now()`) or a literal
    pub default_expression: Option<String>,
    /// Whether the column holds a vector embedding
    pub is_vector: bool,
}

impl ColumnDescriptor {
    /// A non-null column of the given type with no constraints.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            is_primary_key: false,
            is_nullable: false,
            is_unique: false,
            sql_type,
            default_expression: None,
            is_vector: false,
        }
    }

    /// A column whose type and nullability are inferred from `T`.
    ///
    /// `Option<T>` yields a nullable column. Opaque types fall back to the
    /// column name heuristics, see [`sql_type::resolve_sql_type`].
    pub fn of<T: ColumnType>(name: impl Into<String>) -> Self {
        let name = name.into();
        let sql_type = sql_type::resolve_sql_type(T::HINT, None, &name);
        let mut col = Self::new(name, sql_type);
        col.is_nullable = T::NULLABLE;
        col
    }

    /// A column whose type is inferred from a type hint, a runtime sample
    /// value, and finally its name.
    pub fn inferred(
        name: impl Into<String>,
        hint: TypeHint,
        sample: Option<&serde_json::Value>,
    ) -> Self {
        let name = name.into();
        let sql_type = sql_type::resolve_sql_type(hint, sample, &name);
        Self::new(name, sql_type)
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default_expression = Some(expr.into());
        self
    }
}

/// A foreign key declared on a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyDescriptor {
    /// Referenced table
    pub referenced_table: String,
    /// Referenced column
    pub referenced_column: String,
}

/// A fixed-dimension vector column declared on a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorColumnDescriptor {
    pub dimensions: u32,
}

/// A foreign key with its local column resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedForeignKey<'a> {
    /// Local column name
    pub column: &'a str,
    pub referenced_table: &'a str,
    pub referenced_column: &'a str,
}

/// A vector column with its column name resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedVectorColumn<'a> {
    pub column: &'a str,
    pub dimensions: u32,
}

/// The declared shape of one table.
///
/// Maps are keyed by property name; each property maps to a column through
/// [`ColumnDescriptor::name`]. Ancestor columns are already merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    /// Table name
    pub table_name: String,
    /// Columns, in declaration order (ancestors first)
    pub columns: IndexMap<String, ColumnDescriptor>,
    /// Foreign keys, keyed by property
    pub foreign_keys: IndexMap<String, ForeignKeyDescriptor>,
    /// Vector columns, keyed by property
    pub vector_columns: IndexMap<String, VectorColumnDescriptor>,
}

impl EntityDescriptor {
    /// Start building a descriptor for `table_name`.
    pub fn builder(table_name: impl Into<String>) -> EntityBuilder {
        EntityBuilder::new(table_name)
    }

    /// Check that every foreign-key and vector property has a column, and that
    /// every column marked as a vector has dimensions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolved_foreign_keys()?;
        self.resolved_vector_columns()?;
        Ok(())
    }

    /// Whether the property is rendered through the vector pipeline.
    pub fn is_vector_property(&self, property: &str) -> bool {
        self.vector_columns.contains_key(property)
            || self.columns.get(property).is_some_and(|c| c.is_vector)
    }

    /// Columns rendered through the ordinary column pipeline, in declaration
    /// order.
    pub fn plain_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|(property, _)| !self.is_vector_property(property))
            .map(|(_, col)| col)
    }

    /// Names of the primary-key columns, in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.plain_columns()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Foreign keys with their local column names.
    pub fn resolved_foreign_keys(&self) -> Result<Vec<ResolvedForeignKey<'_>>, ConfigError> {
        self.foreign_keys
            .iter()
            .map(|(property, fk)| {
                let col =
                    self.columns
                        .get(property)
                        .ok_or_else(|| ConfigError::MissingForeignKeyColumn {
                            table: self.table_name.clone(),
                            property: property.clone(),
                        })?;
                Ok(ResolvedForeignKey {
                    column: &col.name,
                    referenced_table: &fk.referenced_table,
                    referenced_column: &fk.referenced_column,
                })
            })
            .collect()
    }

    /// Vector columns with their column names.
    pub fn resolved_vector_columns(&self) -> Result<Vec<ResolvedVectorColumn<'_>>, ConfigError> {
        if let Some((property, _)) = self
            .columns
            .iter()
            .find(|(property, col)| col.is_vector && !self.vector_columns.contains_key(*property))
        {
            return Err(ConfigError::VectorColumnWithoutDimensions {
                table: self.table_name.clone(),
                property: property.clone(),
            });
        }

        self.vector_columns
            .iter()
            .map(|(property, vector)| {
                let col =
                    self.columns
                        .get(property)
                        .ok_or_else(|| ConfigError::MissingVectorColumn {
                            table: self.table_name.clone(),
                            property: property.clone(),
                        })?;
                Ok(ResolvedVectorColumn {
                    column: &col.name,
                    dimensions: vector.dimensions,
                })
            })
            .collect()
    }
}

/// Builder for [`EntityDescriptor`].
///
/// Shared base fields are expressed by composition: [`EntityBuilder::extends`]
/// merges a parent descriptor in front of the entity's own declarations, and
/// the entity's own declarations win on name collision regardless of call
/// order.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    table_name: String,
    parents: Vec<EntityDescriptor>,
    columns: IndexMap<String, ColumnDescriptor>,
    foreign_keys: IndexMap<String, ForeignKeyDescriptor>,
    vector_columns: IndexMap<String, VectorColumnDescriptor>,
}

impl EntityBuilder {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            parents: Vec::new(),
            columns: IndexMap::new(),
            foreign_keys: IndexMap::new(),
            vector_columns: IndexMap::new(),
        }
    }

    /// Inherit the columns, foreign keys and vector columns of `parent`.
    ///
    /// Parents are merged in the order given, so a later parent overrides an
    /// earlier one.
    pub fn extends(mut self, parent: &EntityDescriptor) -> Self {
        self.parents.push(parent.clone());
        self
    }

    pub fn column(mut self, property: impl Into<String>, column: ColumnDescriptor) -> Self {
        self.columns.insert(property.into(), column);
        self
    }

    /// Declare a foreign key from `property` to `table.column`.
    pub fn foreign_key(
        mut self,
        property: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.insert(
            property.into(),
            ForeignKeyDescriptor {
                referenced_table: referenced_table.into(),
                referenced_column: referenced_column.into(),
            },
        );
        self
    }

    /// Declare `property` as a vector column of `dimensions` dimensions.
    pub fn vector(mut self, property: impl Into<String>, dimensions: u32) -> Self {
        self.vector_columns
            .insert(property.into(), VectorColumnDescriptor { dimensions });
        self
    }

    /// Flatten the ancestor chain and produce the descriptor.
    ///
    /// This does not validate; see [`EntityDescriptor::validate`].
    pub fn build(self) -> EntityDescriptor {
        let mut columns = IndexMap::new();
        let mut foreign_keys = IndexMap::new();
        let mut vector_columns = IndexMap::new();

        for parent in self.parents {
            columns.extend(parent.columns);
            foreign_keys.extend(parent.foreign_keys);
            vector_columns.extend(parent.vector_columns);
        }
        columns.extend(self.columns);
        foreign_keys.extend(self.foreign_keys);
        vector_columns.extend(self.vector_columns);

        for (property, col) in columns.iter_mut() {
            if vector_columns.contains_key(property) {
                col.is_vector = true;
            }
        }

        EntityDescriptor {
            table_name: self.table_name,
            columns,
            foreign_keys,
            vector_columns,
        }
    }
}

#[cfg(test)]
mod tests;
