use super::*;

fn base() -> EntityDescriptor {
    EntityBuilder::new("base")
        .column(
            "id",
            ColumnDescriptor::new("id", SqlType::Other("uuid".into())).primary_key(),
        )
        .column(
            "createdAt",
            ColumnDescriptor::of::<chrono::DateTime<chrono::Utc>>("created_at")
                .default_expr("now()"),
        )
        .build()
}

#[test]
fn test_extends_puts_ancestor_columns_first() {
    let post = EntityBuilder::new("post")
        .column("title", ColumnDescriptor::of::<String>("title"))
        .extends(&base())
        .build();

    let names: Vec<&str> = post.columns.values().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "created_at", "title"]);
    assert_eq!(post.table_name, "post");
}

#[test]
fn test_child_overrides_ancestor_on_collision() {
    let post = EntityBuilder::new("post")
        .extends(&base())
        .column("createdAt", ColumnDescriptor::of::<Option<String>>("created_on"))
        .build();

    let col = &post.columns["createdAt"];
    assert_eq!(col.name, "created_on");
    assert_eq!(col.sql_type, SqlType::Text);
    assert!(col.is_nullable);
    // Position is still the ancestor's.
    assert_eq!(post.columns.get_index_of("createdAt"), Some(1));
}

#[test]
fn test_grandparent_chain_is_flattened() {
    let audited = EntityBuilder::new("audited")
        .extends(&base())
        .column("updatedBy", ColumnDescriptor::of::<Option<String>>("updated_by"))
        .build();
    let doc = EntityBuilder::new("doc")
        .extends(&audited)
        .column("body", ColumnDescriptor::of::<String>("body"))
        .build();

    let names: Vec<&str> = doc.columns.values().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "created_at", "updated_by", "body"]);
}

#[test]
fn test_vector_property_marks_column() {
    let doc = EntityBuilder::new("doc")
        .vector("embedding", 3)
        .column("embedding", ColumnDescriptor::new("embedding", SqlType::Jsonb))
        .column("body", ColumnDescriptor::of::<String>("body"))
        .build();

    assert!(doc.columns["embedding"].is_vector);
    assert!(!doc.columns["body"].is_vector);
    let plain: Vec<&str> = doc.plain_columns().map(|c| c.name.as_str()).collect();
    assert_eq!(plain, ["body"]);
    assert_eq!(
        doc.resolved_vector_columns().unwrap(),
        vec![ResolvedVectorColumn {
            column: "embedding",
            dimensions: 3
        }]
    );
}

#[test]
fn test_resolved_foreign_keys_use_column_names() {
    let post = EntityBuilder::new("post")
        .column("authorId", ColumnDescriptor::of::<i64>("author_id"))
        .foreign_key("authorId", "user", "id")
        .build();

    assert_eq!(
        post.resolved_foreign_keys().unwrap(),
        vec![ResolvedForeignKey {
            column: "author_id",
            referenced_table: "user",
            referenced_column: "id",
        }]
    );
}

#[test]
fn test_validate_rejects_foreign_key_without_column() {
    let post = EntityBuilder::new("post")
        .foreign_key("authorId", "user", "id")
        .build();

    assert_eq!(
        post.validate(),
        Err(ConfigError::MissingForeignKeyColumn {
            table: "post".into(),
            property: "authorId".into(),
        })
    );
}

#[test]
fn test_validate_rejects_vector_without_column() {
    let doc = EntityBuilder::new("doc").vector("embedding", 8).build();

    assert_eq!(
        doc.validate(),
        Err(ConfigError::MissingVectorColumn {
            table: "doc".into(),
            property: "embedding".into(),
        })
    );
}

#[test]
fn test_validate_rejects_vector_column_without_dimensions() {
    let mut embedding = ColumnDescriptor::new("embedding", SqlType::Jsonb);
    embedding.is_vector = true;
    let doc = EntityBuilder::new("doc")
        .column("id", ColumnDescriptor::of::<i64>("id"))
        .column("embedding", embedding)
        .build();

    let expected = ConfigError::VectorColumnWithoutDimensions {
        table: "doc".into(),
        property: "embedding".into(),
    };
    assert_eq!(doc.validate(), Err(expected.clone()));
    assert_eq!(doc.resolved_vector_columns(), Err(expected));
}

#[test]
fn test_column_of_infers_type_and_nullability() {
    let col = ColumnDescriptor::of::<Option<bool>>("is_active");
    assert_eq!(col.sql_type, SqlType::Boolean);
    assert!(col.is_nullable);

    let col = ColumnDescriptor::of::<Vec<String>>("tags");
    assert_eq!(col.sql_type, SqlType::Jsonb);
    assert!(!col.is_nullable);
}

// ===== Registry =====

struct Tenant;

impl Entity for Tenant {
    fn descriptor() -> EntityDescriptor {
        EntityBuilder::new("tenant")
            .column("id", ColumnDescriptor::of::<i64>("id").primary_key())
            .build()
    }
}

struct Member;

impl Entity for Member {
    fn descriptor() -> EntityDescriptor {
        EntityBuilder::new("member")
            .column("id", ColumnDescriptor::of::<i64>("id").primary_key())
            .column("tenantId", ColumnDescriptor::of::<i64>("tenant_id"))
            .foreign_key("tenantId", "tenant", "id")
            .build()
    }
}

struct OtherTenant;

impl Entity for OtherTenant {
    fn descriptor() -> EntityDescriptor {
        EntityBuilder::new("tenant").build()
    }
}

struct Broken;

impl Entity for Broken {
    fn descriptor() -> EntityDescriptor {
        EntityBuilder::new("broken").vector("embedding", 4).build()
    }
}

inventory::submit! { EntityDef::new::<Tenant>() }
inventory::submit! { EntityDef::new::<Member>() }

#[test]
fn test_registry_preserves_registration_order() {
    let mut registry = EntityRegistry::new();
    registry
        .register::<Tenant>()
        .unwrap()
        .register::<Member>()
        .unwrap();

    let tables: Vec<&str> = registry
        .descriptors()
        .map(|d| d.table_name.as_str())
        .collect();
    assert_eq!(tables, ["tenant", "member"]);
    assert_eq!(registry.get::<Member>().unwrap().table_name, "member");
    assert_eq!(registry.by_table("tenant").unwrap().columns.len(), 1);
    assert!(registry.get::<Broken>().is_none());
}

#[test]
fn test_registry_rejects_duplicate_tables() {
    let mut registry = EntityRegistry::new();
    registry.register::<Tenant>().unwrap();
    let err = registry.register::<OtherTenant>().unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateTable { table, .. } if table == "tenant"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_rejects_malformed_entities() {
    let mut registry = EntityRegistry::new();
    let err = registry.register::<Broken>().unwrap_err();
    assert!(matches!(err, ConfigError::MissingVectorColumn { .. }));
    assert!(registry.is_empty());
}

#[test]
fn test_registry_collects_submitted_entities() {
    let registry = EntityRegistry::collect().unwrap();
    let tables: Vec<&str> = registry
        .descriptors()
        .map(|d| d.table_name.as_str())
        .collect();
    assert_eq!(tables, ["member", "tenant"]);
}
