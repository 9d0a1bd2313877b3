// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! MySQL engine.
//!
//! The writer pool serves the per-block transactions and boot DDL, the reader
//! pool serves the metadata queries. Statements are rendered from
//! [`RowMutation`] and [`Select`] values with positional placeholders.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{
    MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow,
};
use sqlx::query::Query;
use sqlx::{Executor, MySql, MySqlPool, Row as _, Transaction};
use tracing::{debug, info};

use super::{check_bounded, Lookup, Store, StoreTx};
use crate::catalog::{self, ColumnType, TableDef};
use crate::conf::{DbCredentials, Params};
use crate::query::{Cond, Filter, Order, RowMutation, Select, Update};
use crate::schema_manager::{quote, SchemaManager};
use crate::value::{Row, Value};
use crate::DbError;

/// A rendered statement and its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

fn table_def(name: &str) -> Result<&'static TableDef, DbError> {
    catalog::table(name)
        .ok_or_else(|| DbError::Schema(format!("unknown table {name}")))
}

fn check_columns<'a>(
    def: &TableDef,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<(), DbError> {
    for column in columns {
        if def.column(column).is_none() {
            return Err(DbError::Schema(format!(
                "unknown column {}.{column}",
                def.name
            )));
        }
    }
    Ok(())
}

/// Escape `%`, `_` and `\` so a prefix is matched literally by `LIKE`.
pub fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render a filter as a `WHERE` body, `None` for the empty filter.
fn render_filter(filter: &Filter, args: &mut Vec<Value>) -> Option<String> {
    if filter.is_empty() {
        return None;
    }
    let parts: Vec<String> = filter
        .conditions()
        .iter()
        .map(|cond| {
            let column = quote(cond.column());
            match cond {
                Cond::Eq(_, v) => {
                    args.push(v.clone());
                    format!("{column} = ?")
                }
                Cond::In(_, vs) if vs.is_empty() => "1 = 0".to_owned(),
                Cond::In(_, vs) => {
                    args.extend(vs.iter().cloned());
                    let marks = vec!["?"; vs.len()].join(", ");
                    format!("{column} IN ({marks})")
                }
                Cond::LikePrefix(_, prefix) => {
                    args.push(Value::Text(format!("{}%", escape_like(prefix))));
                    format!("{column} LIKE ?")
                }
                Cond::Gte(_, v) => {
                    args.push(v.clone());
                    format!("{column} >= ?")
                }
                Cond::Lte(_, v) => {
                    args.push(v.clone());
                    format!("{column} <= ?")
                }
                Cond::CsvContains(_, v) => {
                    args.push(Value::Text(v.to_text()));
                    format!("FIND_IN_SET(?, {column}) > 0")
                }
            }
        })
        .collect();
    Some(parts.join(" AND "))
}

fn check_filter(def: &TableDef, filter: &Filter) -> Result<(), DbError> {
    check_columns(def, filter.conditions().iter().map(Cond::column))
}

pub fn render_select(select: &Select) -> Result<Statement, DbError> {
    let def = table_def(&select.table)?;
    check_filter(def, &select.filter)?;
    check_columns(def, select.order_by.iter().map(|(c, _)| c.as_str()))?;

    let columns = def
        .column_names()
        .map(quote)
        .collect::<Vec<_>>()
        .join(", ");
    let mut args = vec![];
    let mut sql = format!("SELECT {columns} FROM {}", quote(&def.name));
    if let Some(cond) = render_filter(&select.filter, &mut args) {
        sql.push_str(" WHERE ");
        sql.push_str(&cond);
    }
    if !select.order_by.is_empty() {
        let order = select
            .order_by
            .iter()
            .map(|(c, o)| {
                let dir = match o {
                    Order::Asc => "ASC",
                    Order::Desc => "DESC",
                };
                format!("{} {dir}", quote(c))
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }
    if let Some(limit) = select.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(Statement { sql, args })
}

pub fn render_count(table: &str, filter: &Filter) -> Result<Statement, DbError> {
    let def = table_def(table)?;
    check_filter(def, filter)?;
    let mut args = vec![];
    let mut sql = format!("SELECT COUNT(*) FROM {}", quote(&def.name));
    if let Some(cond) = render_filter(filter, &mut args) {
        sql.push_str(" WHERE ");
        sql.push_str(&cond);
    }
    Ok(Statement { sql, args })
}

/// `INSERT .. ON DUPLICATE KEY UPDATE` over `columns`, one tuple per row.
/// Columns a row does not set are written with their catalog default.
fn render_insert(
    def: &TableDef,
    keys: &[String],
    rows: &[Row],
    update: &Update,
) -> Result<Statement, DbError> {
    let mut columns: Vec<&str> = vec![];
    for row in rows {
        for column in row.columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }
    check_columns(def, columns.iter().copied())?;
    check_columns(def, keys.iter().map(String::as_str))?;
    if let Update::Only(cols) = update {
        check_columns(def, cols.iter().map(String::as_str))?;
    }

    let mut args = vec![];
    let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
    let tuples = vec![tuple; rows.len()].join(", ");
    for row in rows {
        for column in &columns {
            let value = match row.get(column) {
                Some(v) => v.clone(),
                None => def
                    .column(column)
                    .map(|c| c.col_type.default_value())
                    .unwrap_or(Value::Null),
            };
            args.push(value);
        }
    }

    let updates: Vec<String> = columns
        .iter()
        .filter(|c| update.touches(c, keys))
        .map(|c| format!("{0} = VALUES({0})", quote(c)))
        .collect();
    let on_conflict = if updates.is_empty() {
        // Keep the statement an upsert even when nothing may change
        let key = quote(keys.first().map(String::as_str).unwrap_or("id"));
        format!("{key} = {key}")
    } else {
        updates.join(", ")
    };

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {tuples} ON DUPLICATE KEY UPDATE {on_conflict}",
        quote(&def.name),
        columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
    );
    Ok(Statement { sql, args })
}

pub fn render_mutation(mutation: &RowMutation) -> Result<Statement, DbError> {
    check_bounded(mutation)?;
    let def = table_def(mutation.table())?;
    match mutation {
        RowMutation::Upsert {
            keys, row, update, ..
        } => render_insert(def, keys, std::slice::from_ref(row), update),
        RowMutation::BatchInsert { keys, rows, .. } => {
            render_insert(def, keys, rows, &Update::All)
        }
        RowMutation::UpdateWhere { filter, set, .. } => {
            check_columns(def, set.columns())?;
            check_filter(def, filter)?;
            let mut args: Vec<Value> = vec![];
            let assignments = set
                .iter()
                .map(|(c, v)| {
                    args.push(v.clone());
                    format!("{} = ?", quote(c))
                })
                .collect::<Vec<_>>()
                .join(", ");
            let cond = render_filter(filter, &mut args).unwrap_or_default();
            Ok(Statement {
                sql: format!(
                    "UPDATE {} SET {assignments} WHERE {cond}",
                    quote(&def.name)
                ),
                args,
            })
        }
        RowMutation::DeleteAny { filters, .. } => {
            let mut args = vec![];
            let mut parts = vec![];
            for filter in filters {
                check_filter(def, filter)?;
                if let Some(cond) = render_filter(filter, &mut args) {
                    parts.push(format!("({cond})"));
                }
            }
            Ok(Statement {
                sql: format!(
                    "DELETE FROM {} WHERE {}",
                    quote(&def.name),
                    parts.join(" OR ")
                ),
                args,
            })
        }
    }
}

fn bind(
    statement: &Statement,
) -> Query<'_, MySql, MySqlArguments> {
    let mut query = sqlx::query(&statement.sql);
    for arg in &statement.args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Text(s) => query.bind(s.clone()),
            Value::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

/// Decode a row by catalog column type.
fn decode(def: &TableDef, row: &MySqlRow) -> Result<Row, DbError> {
    let mut out = Row::new();
    for column in &def.columns {
        let value = match column.col_type {
            ColumnType::BigInt => {
                Value::from(row.try_get::<Option<i64>, _>(column.name)?)
            }
            ColumnType::Bool => {
                Value::from(row.try_get::<Option<bool>, _>(column.name)?)
            }
            _ => Value::from(row.try_get::<Option<String>, _>(column.name)?),
        };
        out.set(column.name, value);
    }
    Ok(out)
}

async fn timed<T, F>(timeout: Duration, fut: F) -> Result<T, DbError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res.map_err(DbError::from),
        Err(_) => Err(DbError::Io(format!("statement exceeded {timeout:?}"))),
    }
}

async fn fetch_rows<'e, E>(
    executor: E,
    select: &Select,
    timeout: Duration,
) -> Result<Vec<Row>, DbError>
where
    E: Executor<'e, Database = MySql>,
{
    let def = table_def(&select.table)?;
    let statement = render_select(select)?;
    debug!("SQL: {}", statement.sql);
    let rows = timed(timeout, bind(&statement).fetch_all(executor)).await?;
    rows.iter().map(|r| decode(def, r)).collect()
}

async fn fetch_count<'e, E>(
    executor: E,
    table: &str,
    filter: &Filter,
    timeout: Duration,
) -> Result<u64, DbError>
where
    E: Executor<'e, Database = MySql>,
{
    let statement = render_count(table, filter)?;
    let row = timed(timeout, bind(&statement).fetch_one(executor)).await?;
    let count: i64 = row.try_get(0)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// MySQL backed [`Store`].
#[derive(Debug, Clone)]
pub struct MySqlStore {
    writer: MySqlPool,
    reader: MySqlPool,
    statement_timeout: Duration,
}

impl MySqlStore {
    /// Open the writer and reader pools of `credentials`.
    pub async fn connect(
        params: &Params,
        credentials: &DbCredentials,
    ) -> Result<Self, DbError> {
        credentials
            .validate()
            .map_err(|e| DbError::Schema(e.to_string()))?;
        let (host, port) = credentials
            .host_port()
            .map_err(|e| DbError::Schema(e.to_string()))?;

        info!("Opening MySQL db {credentials}");

        let options = MySqlConnectOptions::new()
            .host(&host)
            .port(port)
            .username(&credentials.user)
            .password(&credentials.password)
            .database(&credentials.database)
            .charset("utf8mb4");

        let timeout = params.statement_timeout;
        let session = format!(
            "SET SESSION innodb_lock_wait_timeout = {}, \
             max_execution_time = {}",
            timeout.as_secs().max(1),
            timeout.as_millis()
        );
        let pool = |max: u32| {
            let session = session.clone();
            MySqlPoolOptions::new()
                .max_connections(max)
                .after_connect(move |conn, _meta| {
                    let session = session.clone();
                    Box::pin(async move {
                        conn.execute(session.as_str()).await?;
                        Ok(())
                    })
                })
        };

        let writer = pool(params.writer_max_connections)
            .connect_with(options.clone())
            .await?;
        let reader = pool(params.reader_max_connections)
            .connect_with(options)
            .await?;

        Ok(Self::from_pools(writer, reader, timeout))
    }

    pub fn from_pools(
        writer: MySqlPool,
        reader: MySqlPool,
        statement_timeout: Duration,
    ) -> Self {
        Self {
            writer,
            reader,
            statement_timeout,
        }
    }
}

/// An open MySQL transaction on the writer pool.
pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
    statement_timeout: Duration,
}

#[async_trait]
impl Lookup for MySqlTx {
    async fn select(&mut self, select: &Select) -> Result<Vec<Row>, DbError> {
        fetch_rows(&mut *self.tx, select, self.statement_timeout).await
    }

    async fn count(
        &mut self,
        table: &str,
        filter: &Filter,
    ) -> Result<u64, DbError> {
        fetch_count(&mut *self.tx, table, filter, self.statement_timeout).await
    }
}

#[async_trait]
impl StoreTx for MySqlTx {
    async fn apply(&mut self, mutation: &RowMutation) -> Result<u64, DbError> {
        let statement = render_mutation(mutation)?;
        debug!("SQL: {}", statement.sql);
        let res = timed(
            self.statement_timeout,
            bind(&statement).execute(&mut *self.tx),
        )
        .await?;
        Ok(res.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let timeout = self.statement_timeout;
        timed(timeout, self.tx.commit()).await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        let timeout = self.statement_timeout;
        timed(timeout, self.tx.rollback()).await
    }

    fn as_lookup(&mut self) -> &mut dyn Lookup {
        self
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DbError> {
        let tx = timed(self.statement_timeout, self.writer.begin()).await?;
        Ok(Box::new(MySqlTx {
            tx,
            statement_timeout: self.statement_timeout,
        }))
    }

    async fn select(&self, select: &Select) -> Result<Vec<Row>, DbError> {
        fetch_rows(&self.reader, select, self.statement_timeout).await
    }

    async fn count(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<u64, DbError> {
        fetch_count(&self.reader, table, filter, self.statement_timeout).await
    }

    async fn ensure_tables(&self, tables: &[TableDef]) -> Result<(), DbError> {
        for table in tables {
            SchemaManager::ensure_table(&self.writer, table).await?;
        }
        Ok(())
    }
}
