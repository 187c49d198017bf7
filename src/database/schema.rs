//! Tenant table set. Every partition gets an identical copy, created in the
//! order of [`TENANT_TABLES`] so foreign keys resolve inside the same schema.

/// What happens to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

/// Schema-local foreign key, mirrored from the DDL
#[derive(Debug)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
    pub on_delete: OnDelete,
}

/// Static description of one tenant table.
#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    /// Single-column `UNIQUE` constraints
    pub unique: &'static [&'static str],
    pub references: &'static [ForeignKey],
    /// DDL with a `{schema}` placeholder for the quoted partition name
    ddl: &'static str,
}

impl TableDef {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// Look up one of the tenant tables by name
    pub fn named(name: &str) -> Option<&'static TableDef> {
        TENANT_TABLES.iter().find(|table| table.name == name)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement qualified with `quoted_schema`
    pub fn create_sql(&self, quoted_schema: &str) -> String {
        self.ddl.replace("{schema}", quoted_schema)
    }
}

pub const MENU_ITEMS: TableDef = TableDef {
    name: "menu_items",
    columns: &[
        "id",
        "name",
        "description",
        "category",
        "price_paise",
        "is_available",
        "created_at",
        "updated_at",
    ],
    unique: &[],
    references: &[],
    ddl: r#"
        CREATE TABLE IF NOT EXISTS {schema}."menu_items" (
            id           BIGSERIAL PRIMARY KEY,
            name         TEXT NOT NULL,
            description  TEXT,
            category     TEXT,
            price_paise  BIGINT NOT NULL CHECK (price_paise >= 0),
            is_available BOOLEAN NOT NULL DEFAULT TRUE,
            created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
};

pub const DINING_TABLES: TableDef = TableDef {
    name: "dining_tables",
    columns: &["id", "label", "seats", "qr_token", "created_at"],
    unique: &["label", "qr_token"],
    references: &[],
    ddl: r#"
        CREATE TABLE IF NOT EXISTS {schema}."dining_tables" (
            id         BIGSERIAL PRIMARY KEY,
            label      TEXT NOT NULL UNIQUE,
            seats      BIGINT NOT NULL DEFAULT 4 CHECK (seats > 0),
            qr_token   TEXT NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
};

pub const USERS: TableDef = TableDef {
    name: "users",
    columns: &["id", "name", "email", "role", "is_active", "created_at"],
    unique: &["email"],
    references: &[],
    ddl: r#"
        CREATE TABLE IF NOT EXISTS {schema}."users" (
            id         BIGSERIAL PRIMARY KEY,
            name       TEXT NOT NULL,
            email      TEXT NOT NULL UNIQUE,
            role       TEXT NOT NULL DEFAULT 'staff',
            is_active  BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
};

pub const ORDERS: TableDef = TableDef {
    name: "orders",
    columns: &[
        "id",
        "table_id",
        "customer_name",
        "status",
        "total_paise",
        "created_at",
        "updated_at",
    ],
    unique: &[],
    references: &[ForeignKey {
        column: "table_id",
        references: "dining_tables",
        on_delete: OnDelete::SetNull,
    }],
    ddl: r#"
        CREATE TABLE IF NOT EXISTS {schema}."orders" (
            id            BIGSERIAL PRIMARY KEY,
            table_id      BIGINT REFERENCES {schema}."dining_tables"(id) ON DELETE SET NULL,
            customer_name TEXT,
            status        TEXT NOT NULL DEFAULT 'placed',
            total_paise   BIGINT NOT NULL CHECK (total_paise >= 0),
            created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
};

pub const ORDER_ITEMS: TableDef = TableDef {
    name: "order_items",
    columns: &[
        "id",
        "order_id",
        "menu_item_id",
        "quantity",
        "unit_price_paise",
        "created_at",
    ],
    unique: &[],
    references: &[
        ForeignKey {
            column: "order_id",
            references: "orders",
            on_delete: OnDelete::Cascade,
        },
        ForeignKey {
            column: "menu_item_id",
            references: "menu_items",
            on_delete: OnDelete::Restrict,
        },
    ],
    ddl: r#"
        CREATE TABLE IF NOT EXISTS {schema}."order_items" (
            id               BIGSERIAL PRIMARY KEY,
            order_id         BIGINT NOT NULL REFERENCES {schema}."orders"(id) ON DELETE CASCADE,
            menu_item_id     BIGINT NOT NULL REFERENCES {schema}."menu_items"(id),
            quantity         BIGINT NOT NULL CHECK (quantity > 0),
            unit_price_paise BIGINT NOT NULL CHECK (unit_price_paise >= 0),
            created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
};

pub const RATINGS: TableDef = TableDef {
    name: "ratings",
    columns: &["id", "order_id", "score", "comment", "created_at"],
    unique: &[],
    references: &[ForeignKey {
        column: "order_id",
        references: "orders",
        on_delete: OnDelete::Cascade,
    }],
    ddl: r#"
        CREATE TABLE IF NOT EXISTS {schema}."ratings" (
            id         BIGSERIAL PRIMARY KEY,
            order_id   BIGINT NOT NULL REFERENCES {schema}."orders"(id) ON DELETE CASCADE,
            score      BIGINT NOT NULL CHECK (score BETWEEN 1 AND 5),
            comment    TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
};

/// Creation order matters: referenced tables come first.
pub const TENANT_TABLES: &[TableDef] = &[
    MENU_ITEMS,
    DINING_TABLES,
    USERS,
    ORDERS,
    ORDER_ITEMS,
    RATINGS,
];

/// Central registry table, kept in the shared (non-tenant) schema.
pub const REGISTRY_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS {schema}."restaurants" (
        id           BIGSERIAL PRIMARY KEY,
        slug         TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        partition    TEXT NOT NULL UNIQUE,
        is_active    BOOLEAN NOT NULL DEFAULT TRUE,
        created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_is_idempotent_and_never_destructive() {
        for table in TENANT_TABLES {
            let sql = table.create_sql("\"tenant_x\"").to_uppercase();
            assert!(sql.contains("CREATE TABLE IF NOT EXISTS"), "{}", table.name);
            assert!(!sql.contains("DROP"), "{}", table.name);
            assert!(!sql.contains("TRUNCATE"), "{}", table.name);
        }
    }

    #[test]
    fn foreign_keys_stay_inside_the_partition() {
        for table in TENANT_TABLES {
            let sql = table.create_sql("\"tenant_x\"");
            assert!(!sql.contains("{schema}"));
            for line in sql.lines().filter(|l| l.contains("REFERENCES")) {
                assert!(line.contains("REFERENCES \"tenant_x\"."), "{}: {}", table.name, line);
            }
        }
    }

    #[test]
    fn referenced_tables_are_created_first() {
        let position = |name: &str| TENANT_TABLES.iter().position(|t| t.name == name).unwrap();
        assert!(position("dining_tables") < position("orders"));
        assert!(position("orders") < position("order_items"));
        assert!(position("menu_items") < position("order_items"));
        assert!(position("orders") < position("ratings"));
    }

    #[test]
    fn constraint_metadata_matches_ddl() {
        for table in TENANT_TABLES {
            let sql = table.create_sql("\"tenant_x\"");
            for column in table.unique {
                assert!(table.has_column(column), "{}.{}", table.name, column);
                assert!(
                    sql.lines().any(|l| l.trim_start().starts_with(column) && l.contains("UNIQUE")),
                    "{}.{}",
                    table.name,
                    column
                );
            }
            for fk in table.references {
                let line = sql
                    .lines()
                    .find(|l| l.trim_start().starts_with(fk.column))
                    .unwrap();
                assert!(line.contains(&format!("\"{}\"(id)", fk.references)), "{}", line);
                match fk.on_delete {
                    OnDelete::Cascade => assert!(line.contains("ON DELETE CASCADE")),
                    OnDelete::SetNull => assert!(line.contains("ON DELETE SET NULL")),
                    OnDelete::Restrict => assert!(!line.contains("ON DELETE")),
                }
            }
        }
    }

    #[test]
    fn every_table_has_an_id_column() {
        for table in TENANT_TABLES {
            assert!(table.has_column("id"), "{}", table.name);
            assert!(!table.has_column("tenant_id"), "{}", table.name);
        }
    }
}
