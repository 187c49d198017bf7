//! SQL text for tenant row access. Every statement is qualified with the
//! bound partition, columns are checked against the table definition before
//! they get here, and values always travel as bind parameters.

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Postgres, Row as _};

use super::backend::Row;
use super::error::DatabaseError;
use super::schema::TableDef;
use crate::tenancy::PartitionName;

#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub query: String,
    pub params: Vec<Value>,
}

/// Quote SQL identifier to prevent injection
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(partition: &PartitionName, table: &TableDef) -> String {
    format!(
        "{}.{}",
        quote_identifier(partition.as_str()),
        quote_identifier(table.name)
    )
}

fn as_json_rows(inner: &str) -> String {
    format!("WITH t AS ({}) SELECT row_to_json(t) AS row FROM t", inner)
}

pub fn insert_sql(partition: &PartitionName, table: &TableDef, row: Row) -> SqlStatement {
    // NULLs are left to column defaults; a text-typed NULL would not coerce
    let values: Vec<(String, Value)> = row.into_iter().filter(|(_, v)| !v.is_null()).collect();

    let inner = if values.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING *", qualified(partition, table))
    } else {
        let columns: Vec<String> = values.iter().map(|(c, _)| quote_identifier(c)).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            qualified(partition, table),
            columns.join(", "),
            placeholders.join(", ")
        )
    };

    SqlStatement {
        query: as_json_rows(&inner),
        params: values.into_iter().map(|(_, v)| v).collect(),
    }
}

pub fn select_sql(partition: &PartitionName, table: &TableDef, filter: &Row) -> SqlStatement {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    for (column, value) in filter {
        if value.is_null() {
            clauses.push(format!("{} IS NULL", quote_identifier(column)));
        } else {
            params.push(value.clone());
            clauses.push(format!("{} = ${}", quote_identifier(column), params.len()));
        }
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    SqlStatement {
        query: format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM {}{} ORDER BY \"id\") t",
            qualified(partition, table),
            where_sql
        ),
        params,
    }
}

pub fn update_sql(partition: &PartitionName, table: &TableDef, id: i64, patch: Row) -> SqlStatement {
    let mut assignments = Vec::new();
    let mut params = Vec::new();

    for (column, value) in patch {
        if value.is_null() {
            assignments.push(format!("{} = NULL", quote_identifier(&column)));
        } else {
            params.push(value);
            assignments.push(format!("{} = ${}", quote_identifier(&column), params.len()));
        }
    }
    if table.has_column("updated_at") {
        assignments.push("\"updated_at\" = NOW()".to_string());
    }
    if assignments.is_empty() {
        assignments.push("\"id\" = \"id\"".to_string());
    }

    params.push(Value::from(id));
    let inner = format!(
        "UPDATE {} SET {} WHERE \"id\" = ${} RETURNING *",
        qualified(partition, table),
        assignments.join(", "),
        params.len()
    );

    SqlStatement {
        query: as_json_rows(&inner),
        params,
    }
}

pub fn delete_sql(partition: &PartitionName, table: &TableDef, id: i64) -> SqlStatement {
    SqlStatement {
        query: format!("DELETE FROM {} WHERE \"id\" = $1", qualified(partition, table)),
        params: vec![Value::from(id)],
    }
}

pub fn bind_param(
    q: sqlx::query::Query<'_, Postgres, PgArguments>,
    v: Value,
) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        other => q.bind(other),
    }
}

/// Decode the `row` column produced by `row_to_json`.
pub fn row_object(row: &PgRow) -> Result<Row, DatabaseError> {
    let value: Value = row.try_get("row")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::Decode(format!("expected JSON object, got {}", other))),
    }
}
