//! # Query Compilation & Paged Execution
//!
//! Turns validated predicate trees into parameterised SQL and runs the
//! paged query pipeline.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    fetch_page::<E>(…)                               │
//! │                                                                     │
//! │  1. structural predicate (caller-supplied, pre-validated)           │
//! │  2. dynamic filter string → parse → compile                         │
//! │       parse error? warn + run unfiltered                            │
//! │  3. dynamic order string → parse → render                           │
//! │       parse error or absent? order by id ASC                        │
//! │  4. SELECT COUNT(*) over the filtered, UNPAGED query                │
//! │  5. SELECT page: ORDER BY … LIMIT page_size OFFSET (page-1)*size    │
//! │  6. load includes for the returned rows only                        │
//! │  7. Page { items, metadata }                                        │
//! │                                                                     │
//! │  Every literal is bound (`?`), never rendered into SQL text.        │
//! │  Column names come only from the static allow-list definitions.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};
use std::fmt::Write as _;
use tracing::warn;

use crate::error::DbResult;
use crate::repository::{select_list, Entity};
use venda_core::filter::{parse_filter, parse_order, CmpOp, Expr, Literal, SortKey};
use venda_core::paging::{Page, PaginationParameters};

// =============================================================================
// Predicate Compilation
// =============================================================================

/// A compiled predicate: SQL text with `?` placeholders plus the literals
/// to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlFragment {
    pub sql: String,
    pub binds: Vec<Literal>,
}

/// Compiles a validated predicate tree to a parameterised SQL fragment.
///
/// Infallible: `Expr` can only be built through an allow-list, so every
/// field carries its backing column.
pub(crate) fn compile_expr(expr: &Expr) -> SqlFragment {
    let mut fragment = SqlFragment {
        sql: String::new(),
        binds: Vec::new(),
    };
    render_expr(expr, &mut fragment);
    fragment
}

fn render_expr(expr: &Expr, out: &mut SqlFragment) {
    match expr {
        Expr::Compare { field, op, value } => {
            let op_sql = match op {
                CmpOp::Eq => "=",
                CmpOp::Ne => "<>",
                CmpOp::Gt => ">",
                CmpOp::Ge => ">=",
                CmpOp::Lt => "<",
                CmpOp::Le => "<=",
            };
            // Column names come from static FieldDefs, never caller input.
            let _ = write!(out.sql, "{} {} ?", field.column(), op_sql);
            out.binds.push(value.clone());
        }
        Expr::Contains { field, needle } => {
            let _ = write!(out.sql, "{} LIKE ? ESCAPE '\\'", field.column());
            out.binds
                .push(Literal::Str(format!("%{}%", escape_like(needle))));
        }
        Expr::Not(inner) => {
            out.sql.push_str("NOT (");
            render_expr(inner, out);
            out.sql.push(')');
        }
        Expr::And(left, right) => {
            out.sql.push('(');
            render_expr(left, out);
            out.sql.push_str(" AND ");
            render_expr(right, out);
            out.sql.push(')');
        }
        Expr::Or(left, right) => {
            out.sql.push('(');
            render_expr(left, out);
            out.sql.push_str(" OR ");
            render_expr(right, out);
            out.sql.push(')');
        }
    }
}

/// Escapes LIKE wildcards so a containment needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Renders an `ORDER BY` list, appending `id ASC` as a final tiebreaker so
/// multi-key sorts stay deterministic across pages.
pub(crate) fn render_order(keys: &[SortKey]) -> String {
    let mut parts: Vec<String> = keys
        .iter()
        .map(|key| {
            format!(
                "{} {}",
                key.field.column(),
                if key.descending { "DESC" } else { "ASC" }
            )
        })
        .collect();
    if !keys.iter().any(|key| key.field.column() == "id") {
        parts.push("id ASC".to_string());
    }
    parts.join(", ")
}

const DEFAULT_ORDER: &str = "id ASC";

// =============================================================================
// Bind Helpers
// =============================================================================

/// Binds a literal onto a row query.
pub(crate) fn bind_literal<'q, O>(
    query: sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    literal: &Literal,
) -> sqlx::query::QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    match literal {
        Literal::Str(s) => query.bind(s.clone()),
        Literal::Int(i) => query.bind(*i),
        Literal::Bool(b) => query.bind(*b),
    }
}

/// Binds a literal onto a scalar query.
pub(crate) fn bind_literal_scalar<'q, O>(
    query: sqlx::query_scalar::QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>,
    literal: &Literal,
) -> sqlx::query_scalar::QueryScalar<'q, Sqlite, O, SqliteArguments<'q>> {
    match literal {
        Literal::Str(s) => query.bind(s.clone()),
        Literal::Int(i) => query.bind(*i),
        Literal::Bool(b) => query.bind(*b),
    }
}

// =============================================================================
// Paged Execution
// =============================================================================

/// Runs the paged query pipeline for one entity type.
///
/// The total count is computed against the filtered-but-unpaged query,
/// before `LIMIT`/`OFFSET` is applied, so a page number past the end
/// returns an empty item list with accurate totals.
pub(crate) async fn fetch_page<E: Entity>(
    pool: &SqlitePool,
    params: &PaginationParameters,
    predicate: Option<&Expr>,
    includes: &[E::Include],
) -> DbResult<Page<E>> {
    let table = E::field_table();

    let mut clauses: Vec<SqlFragment> = Vec::new();
    if let Some(expr) = predicate {
        clauses.push(compile_expr(expr));
    }

    // A malformed or out-of-allow-list filter must not fail the request:
    // the caller gets the unfiltered result set instead.
    if let Some(raw) = params.filter.as_deref().filter(|s| !s.trim().is_empty()) {
        match parse_filter(raw, table) {
            Ok(expr) => clauses.push(compile_expr(&expr)),
            Err(error) => warn!(
                entity = table.entity(),
                filter = raw,
                %error,
                "ignoring invalid filter expression"
            ),
        }
    }

    // Same contract for ordering, falling back to id ascending.
    let order_sql = match params.order_by.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => match parse_order(raw, table) {
            Ok(keys) => render_order(&keys),
            Err(error) => {
                warn!(
                    entity = table.entity(),
                    order_by = raw,
                    %error,
                    "ignoring invalid order expression"
                );
                DEFAULT_ORDER.to_string()
            }
        },
        None => DEFAULT_ORDER.to_string(),
    };

    let (where_sql, binds) = merge_clauses(&clauses);

    let count_sql = format!("SELECT COUNT(*) FROM {}{}", E::TABLE, where_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for literal in &binds {
        count_query = bind_literal_scalar(count_query, literal);
    }
    let total_count = count_query.fetch_one(pool).await?;

    let page_number = params.page_number();
    let page_size = params.page_size();

    let select_sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
        select_list::<E>(),
        E::TABLE,
        where_sql,
        order_sql
    );
    let mut select_query = sqlx::query_as::<_, E>(&select_sql);
    for literal in &binds {
        select_query = bind_literal(select_query, literal);
    }
    let mut items = select_query
        .bind(i64::from(page_size))
        .bind(params.offset() as i64)
        .fetch_all(pool)
        .await?;

    E::load_related(pool, &mut items, includes).await?;

    Ok(Page::new(items, page_number, page_size, total_count))
}

/// ANDs compiled clauses into one `WHERE` suffix (empty when unfiltered).
fn merge_clauses(clauses: &[SqlFragment]) -> (String, Vec<Literal>) {
    if clauses.is_empty() {
        return (String::new(), Vec::new());
    }
    let sql = clauses
        .iter()
        .map(|clause| format!("({})", clause.sql))
        .collect::<Vec<_>>()
        .join(" AND ");
    let binds = clauses
        .iter()
        .flat_map(|clause| clause.binds.iter().cloned())
        .collect();
    (format!(" WHERE {sql}"), binds)
}

// =============================================================================
// Unit Tests
// =============================================================================
