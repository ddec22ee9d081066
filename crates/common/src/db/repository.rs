//! Postgres-backed listing store
//!
//! Translates predicates into SeaORM conditions against the `listings`
//! table. All reads go to the replica when one is configured.

use crate::db::models::*;
use crate::db::{DbPool, FindQuery, ListingStore};
use crate::errors::Result;
use crate::listing::{Listing, ListingSummary};
use crate::metrics;
use crate::query::{Constraint, Field, Predicate, SortDirection, SortField, Value};
use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::PgBinOper;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use std::time::Instant;
use uuid::Uuid;

/// Repository for listing reads
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }
}

#[async_trait]
impl ListingStore for Repository {
    async fn find(&self, query: &FindQuery) -> Result<Vec<ListingSummary>> {
        let start = Instant::now();

        let rows = summary_select(query)
            .into_model::<SummaryRow>()
            .all(self.read_conn())
            .await?;

        metrics::record_store_query("find", start.elapsed().as_secs_f64());
        Ok(rows.into_iter().map(ListingSummary::from).collect())
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64> {
        let start = Instant::now();

        let total = ListingEntity::find()
            .filter(condition(predicate))
            .count(self.read_conn())
            .await?;

        metrics::record_store_query("count", start.elapsed().as_secs_f64());
        Ok(total)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        let start = Instant::now();

        let model = ListingEntity::find_by_id(id)
            .one(self.read_conn())
            .await?;

        metrics::record_store_query("find_by_id", start.elapsed().as_secs_f64());
        Ok(model.map(Listing::from))
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

/// Projected, filtered, ordered and paginated select for list views
fn summary_select(query: &FindQuery) -> Select<ListingEntity> {
    let mut select = ListingEntity::find()
        .select_only()
        .columns(SummaryRow::COLUMNS)
        .filter(condition(&query.predicate));

    if let Some(sort) = query.sort {
        let column = match sort.field {
            SortField::CreatedAt => ListingColumn::CreatedAt,
            SortField::Price => ListingColumn::Price,
        };
        let order = match sort.direction {
            SortDirection::Ascending => Order::Asc,
            SortDirection::Descending => Order::Desc,
        };
        select = select.order_by(column, order);
    }

    select
        .order_by_asc(ListingColumn::Id)
        .offset(query.skip)
        .limit(query.limit)
}

fn column(field: Field) -> ListingColumn {
    match field {
        Field::Id => ListingColumn::Id,
        Field::PurposeId => ListingColumn::PurposeId,
        Field::SubPurposeId => ListingColumn::SubPurposeId,
        Field::Status => ListingColumn::Status,
        Field::Location => ListingColumn::Location,
        Field::TypeId => ListingColumn::TypeId,
        Field::SubTypeId => ListingColumn::SubTypeId,
        Field::Bed => ListingColumn::Bed,
        Field::Bath => ListingColumn::Bath,
        Field::Price => ListingColumn::Price,
        Field::Size => ListingColumn::Size,
        Field::Keywords => ListingColumn::Keywords,
        Field::Video => ListingColumn::Video,
    }
}

fn sql_value(value: &Value) -> sea_orm::Value {
    match value {
        Value::Text(text) => text.clone().into(),
        Value::Number(number) => (*number).into(),
        Value::Id(id) => (*id).into(),
    }
}

/// Conjunction of every constraint in the predicate
fn condition(predicate: &Predicate) -> Condition {
    predicate
        .iter()
        .fold(Condition::all(), |all, (field, constraint)| {
            if field.is_array() {
                all.add(array_clause(field, constraint))
            } else {
                all.add(scalar_clause(field, constraint))
            }
        })
}

fn scalar_clause(field: Field, constraint: &Constraint) -> Condition {
    let column = column(field);
    let expr = match constraint {
        Constraint::Eq(value) => column.eq(sql_value(value)),
        Constraint::Ne(value) => column.ne(sql_value(value)),
        Constraint::In(values) => column.is_in(values.iter().map(sql_value)),
        Constraint::Range { min, max } => column.between(*min, *max),
        Constraint::NotNull => column.is_not_null(),
    };
    Condition::all().add(expr)
}

/// JSONB array columns: equality is containment (`@>`)
fn array_clause(field: Field, constraint: &Constraint) -> Condition {
    let contains = |value: &Value| -> SimpleExpr {
        let element = match value {
            Value::Text(text) => serde_json::Value::from(text.as_str()),
            Value::Number(number) => serde_json::Value::from(*number),
            Value::Id(id) => serde_json::Value::from(id.to_string()),
        };
        Expr::col((ListingEntity, column(field)))
            .binary(PgBinOper::Contains, Expr::value(serde_json::Value::Array(vec![element])))
    };

    match constraint {
        Constraint::Eq(value) => Condition::all().add(contains(value)),
        Constraint::Ne(value) => Condition::all().add(contains(value).not()),
        Constraint::In(values) => values
            .iter()
            .fold(Condition::any(), |any, value| any.add(contains(value))),
        Constraint::NotNull => Condition::all().add(column(field).is_not_null()),
        // ranges are meaningless on arrays and never match
        Constraint::Range { .. } => Condition::all().add(Expr::value(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListingsConfig;
    use crate::query::{Pagination, QueryParams, SortSpec};
    use sea_orm::{DbBackend, QueryTrait};

    fn sql(query: &FindQuery) -> String {
        summary_select(query).build(DbBackend::Postgres).to_string()
    }

    #[test]
    fn test_unfiltered_select_projects_summary_columns() {
        let sql = sql(&FindQuery::new(Predicate::new(), None, 0, 20));
        assert!(sql.contains(r#""listings"."reference_no""#));
        assert!(sql.contains(r#""listings"."images""#));
        assert!(!sql.contains("keywords"));
        assert!(!sql.contains("video"));
        assert!(!sql.contains(r#""listings"."status" ="#));
        assert!(sql.contains(r#"ORDER BY "listings"."id" ASC"#));
        assert!(sql.contains("LIMIT 20"));
    }

    #[test]
    fn test_constraints_become_where_clauses() {
        let predicate = Predicate::new()
            .with(Field::Status, Constraint::Eq("ready".into()))
            .with(Field::Location, Constraint::In(vec!["Banani".into(), "Gulshan".into()]))
            .with(Field::Price, Constraint::Range { min: 100.0, max: 500.0 })
            .with(Field::Video, Constraint::NotNull)
            .with(Field::Keywords, Constraint::Eq("lake".into()));

        let sql = sql(&FindQuery::new(predicate, None, 0, 20));

        assert!(sql.contains(r#""listings"."status" = 'ready'"#));
        assert!(sql.contains(r#""listings"."location" IN ('Banani', 'Gulshan')"#));
        assert!(sql.contains(r#""listings"."price" BETWEEN"#));
        assert!(sql.contains(r#""listings"."video" IS NOT NULL"#));
        assert!(sql.contains(r#""listings"."keywords" @>"#));
    }

    #[test]
    fn test_keyword_membership_is_disjunction() {
        let predicate = Predicate::new()
            .with(Field::Keywords, Constraint::In(vec!["gym".into(), "lake".into()]));
        let sql = sql(&FindQuery::new(predicate, None, 0, 20));
        assert_eq!(sql.matches("@>").count(), 2);
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_sort_precedes_id_tiebreak_and_pagination() {
        let query = FindQuery::new(
            Predicate::new(),
            Some(SortSpec::ascending(SortField::Price)),
            20,
            10,
        );
        let sql = sql(&query);
        assert!(sql.contains(r#"ORDER BY "listings"."price" ASC, "listings"."id" ASC"#));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
    }

    #[test]
    fn test_related_exclusion() {
        let id = Uuid::new_v4();
        let predicate = Predicate::new()
            .with(Field::Id, Constraint::Ne(Value::Id(id)))
            .with(Field::TypeId, Constraint::Eq("commercial".into()));
        let sql = sql(&FindQuery::new(predicate, None, 0, 3));
        assert!(sql.contains(r#""listings"."id" <>"#));
        assert!(sql.contains(r#""listings"."type_id" = 'commercial'"#));
        assert!(sql.contains("LIMIT 3"));
    }

    #[test]
    fn test_huge_page_binds_signed_offset() {
        let params = QueryParams::parse(Some("page=184467440737095516&limit=100"));
        let pagination = Pagination::from_params(&params, &ListingsConfig::default());
        let query = FindQuery::new(Predicate::new(), None, pagination.offset(), pagination.limit);

        let statement = summary_select(&query).build(DbBackend::Postgres);
        let values = statement.values.map(|values| values.0).unwrap_or_default();
        assert!(!values.is_empty());
        for value in values {
            if let sea_orm::Value::BigUnsigned(Some(n)) = value {
                assert!(i64::try_from(n).is_ok(), "{n} does not fit a BIGINT");
            }
        }

        assert!(sql(&query).contains(&format!("OFFSET {}", i64::MAX)));
    }
}
