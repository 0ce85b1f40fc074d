//! PostgreSQL stock repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{
    ErrorOrigin, NewStockError, NewStockProduct, StockError, StockErrorFilter, StockHistory,
    StockHistoryFilter, StockKey, StockProduct, StockProductFilter, Team, Warehouse,
};

use super::StockRepository;
use crate::error::{AppError, AppResult};

/// Stock repository backed by a Postgres pool
#[derive(Clone)]
pub struct PgStockRepository {
    db: PgPool,
}

impl PgStockRepository {
    /// Create a new PgStockRepository instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const TEAM_SELECT: &str = r#"
    SELECT t.id, t.name,
           COALESCE((SELECT array_agg(tm.user_id ORDER BY tm.seq)
                     FROM team_members tm WHERE tm.team_id = t.id), '{}'::uuid[]) AS list_user,
           t.created_at
    FROM teams t
"#;

const WAREHOUSE_SELECT: &str = r#"
    SELECT w.id, w.name,
           COALESCE((SELECT array_agg(wp.stock_product_id ORDER BY wp.seq)
                     FROM warehouse_products wp WHERE wp.warehouse_id = w.id), '{}'::uuid[]) AS list_product,
           COALESCE((SELECT array_agg(wt.team_id ORDER BY wt.seq)
                     FROM warehouse_teams wt WHERE wt.warehouse_id = w.id), '{}'::uuid[]) AS list_assigned_team,
           w.created_at
    FROM warehouses w
"#;

const PRODUCT_COLUMNS: &str =
    "id, reference, denomination, ean, quantity, warehouse_id, team_id, created_at";

const ERROR_SELECT: &str = r#"
    SELECT e.id, e.status, e.origin,
           COALESCE((SELECT array_agg(ep.product_id ORDER BY ep.position)
                     FROM stock_error_products ep WHERE ep.error_id = e.id), '{}'::uuid[]) AS product_ids,
           e.created_at
    FROM stock_errors e
"#;

#[derive(Debug, FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
    list_user: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            name: row.name,
            list_user: row.list_user,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    list_product: Vec<Uuid>,
    list_assigned_team: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            list_product: row.list_product,
            list_assigned_team: row.list_assigned_team,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockProductRow {
    id: Uuid,
    reference: String,
    denomination: String,
    ean: Option<String>,
    quantity: i64,
    warehouse_id: Uuid,
    team_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<StockProductRow> for StockProduct {
    fn from(row: StockProductRow) -> Self {
        StockProduct {
            id: row.id,
            reference: row.reference,
            denomination: row.denomination,
            ean: row.ean,
            quantity: row.quantity,
            warehouse_id: row.warehouse_id,
            team_id: row.team_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockHistoryRow {
    id: Uuid,
    quantity: i64,
    date: DateTime<Utc>,
    product_id: Uuid,
    warehouse_id: Uuid,
    team_id: Uuid,
}

impl From<StockHistoryRow> for StockHistory {
    fn from(row: StockHistoryRow) -> Self {
        StockHistory {
            id: row.id,
            quantity: row.quantity,
            date: row.date,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            team_id: row.team_id,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockErrorRow {
    id: Uuid,
    status: bool,
    origin: String,
    product_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StockErrorRow> for StockError {
    type Error = AppError;

    fn try_from(row: StockErrorRow) -> Result<Self, Self::Error> {
        let origin = ErrorOrigin::from_str(&row.origin)
            .ok_or_else(|| AppError::Internal(format!("Unknown stock error origin: {}", row.origin)))?;
        Ok(StockError {
            id: row.id,
            status: row.status,
            origin,
            product_ids: row.product_ids,
            created_at: row.created_at,
        })
    }
}

impl PgStockRepository {
    async fn fetch_warehouse(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!("{} WHERE w.id = $1", WAREHOUSE_SELECT))
            .bind(warehouse_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Warehouse::from))
    }

    async fn fetch_team(&self, team_id: Uuid) -> AppResult<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>(&format!("{} WHERE t.id = $1", TEAM_SELECT))
            .bind(team_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Team::from))
    }

    async fn fetch_error(&self, error_id: Uuid) -> AppResult<Option<StockError>> {
        sqlx::query_as::<_, StockErrorRow>(&format!("{} WHERE e.id = $1", ERROR_SELECT))
            .bind(error_id)
            .fetch_optional(&self.db)
            .await?
            .map(StockError::try_from)
            .transpose()
    }
}

#[async_trait]
impl StockRepository for PgStockRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn list_teams(&self) -> AppResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(&format!("{} ORDER BY t.seq", TEAM_SELECT))
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Team::from).collect())
    }

    async fn get_team(&self, team_id: Uuid) -> AppResult<Option<Team>> {
        self.fetch_team(team_id).await
    }

    async fn find_team_by_name(&self, name: &str) -> AppResult<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>(&format!(
            "{} WHERE t.name = $1 ORDER BY t.seq LIMIT 1",
            TEAM_SELECT
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Team::from))
    }

    async fn create_team(&self, name: &str, members: &[Uuid]) -> AppResult<Team> {
        let mut tx = self.db.begin().await?;

        let team_id = sqlx::query_scalar::<_, Uuid>("INSERT INTO teams (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id)
            SELECT $1, m.user_id FROM UNNEST($2::uuid[]) WITH ORDINALITY AS m(user_id, ord)
            ORDER BY m.ord
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(team_id)
        .bind(members)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.fetch_team(team_id)
            .await?
            .ok_or_else(|| AppError::Internal("Team vanished after insert".to_string()))
    }

    async fn delete_team(&self, team_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(team_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "{} ORDER BY w.seq",
            WAREHOUSE_SELECT
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Warehouse::from).collect())
    }

    async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>> {
        self.fetch_warehouse(warehouse_id).await
    }

    async fn find_warehouse_by_name(&self, name: &str) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "{} WHERE w.name = $1 ORDER BY w.seq LIMIT 1",
            WAREHOUSE_SELECT
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Warehouse::from))
    }

    async fn create_warehouse(&self, name: &str, teams: &[Uuid]) -> AppResult<Warehouse> {
        let mut tx = self.db.begin().await?;

        let warehouse_id =
            sqlx::query_scalar::<_, Uuid>("INSERT INTO warehouses (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO warehouse_teams (warehouse_id, team_id)
            SELECT $1, t.team_id FROM UNNEST($2::uuid[]) WITH ORDINALITY AS t(team_id, ord)
            ORDER BY t.ord
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(warehouse_id)
        .bind(teams)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.fetch_warehouse(warehouse_id)
            .await?
            .ok_or_else(|| AppError::Internal("Warehouse vanished after insert".to_string()))
    }

    async fn delete_warehouse(&self, warehouse_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(warehouse_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_team(&self, warehouse_id: Uuid, team_id: Uuid) -> AppResult<Option<Warehouse>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(warehouse_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO warehouse_teams (warehouse_id, team_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(warehouse_id)
        .bind(team_id)
        .execute(&self.db)
        .await?;

        self.fetch_warehouse(warehouse_id).await
    }

    async fn unassign_team(
        &self,
        warehouse_id: Uuid,
        team_id: Uuid,
    ) -> AppResult<Option<Warehouse>> {
        sqlx::query("DELETE FROM warehouse_teams WHERE warehouse_id = $1 AND team_id = $2")
            .bind(warehouse_id)
            .bind(team_id)
            .execute(&self.db)
            .await?;

        self.fetch_warehouse(warehouse_id).await
    }

    async fn append_warehouse_products(
        &self,
        warehouse_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouse_products (warehouse_id, stock_product_id)
            SELECT $1, p.product_id FROM UNNEST($2::uuid[]) WITH ORDINALITY AS p(product_id, ord)
            ORDER BY p.ord
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(warehouse_id)
        .bind(product_ids)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn reset_stock(&self) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM stock_histories").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM warehouse_products").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM stock_products").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_stock_product(&self, product: NewStockProduct) -> AppResult<StockProduct> {
        let row = sqlx::query_as::<_, StockProductRow>(&format!(
            r#"
            INSERT INTO stock_products (reference, denomination, ean, quantity, warehouse_id, team_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&product.reference)
        .bind(&product.denomination)
        .bind(&product.ean)
        .bind(product.quantity)
        .bind(product.warehouse_id)
        .bind(product.team_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn get_stock_product(&self, product_id: Uuid) -> AppResult<Option<StockProduct>> {
        let row = sqlx::query_as::<_, StockProductRow>(&format!(
            "SELECT {} FROM stock_products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(StockProduct::from))
    }

    async fn find_stock_product(
        &self,
        warehouse_id: Uuid,
        team_id: Uuid,
        reference: &str,
    ) -> AppResult<Option<StockProduct>> {
        let row = sqlx::query_as::<_, StockProductRow>(&format!(
            r#"
            SELECT {} FROM stock_products
            WHERE warehouse_id = $1 AND team_id = $2 AND reference = $3
            ORDER BY seq
            LIMIT 1
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(warehouse_id)
        .bind(team_id)
        .bind(reference)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(StockProduct::from))
    }

    async fn list_stock_products(&self, filter: &StockProductFilter) -> AppResult<Vec<StockProduct>> {
        let rows = sqlx::query_as::<_, StockProductRow>(&format!(
            r#"
            SELECT {} FROM stock_products
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
              AND ($2::uuid IS NULL OR team_id = $2)
              AND ($3::text IS NULL OR reference = $3)
            ORDER BY seq
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(filter.warehouse_id)
        .bind(filter.team_id)
        .bind(&filter.reference)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(StockProduct::from).collect())
    }

    async fn increase_quantity(
        &self,
        product_id: Uuid,
        amount: i64,
    ) -> AppResult<Option<StockProduct>> {
        let row = sqlx::query_as::<_, StockProductRow>(&format!(
            "UPDATE stock_products SET quantity = quantity + $2 WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(amount)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(StockProduct::from))
    }

    async fn increment_stock(&self, key: StockKey, delta: i64) -> AppResult<Option<StockProduct>> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, StockProductRow>(&format!(
            r#"
            SELECT {} FROM stock_products
            WHERE id = $1 AND warehouse_id = $2 AND team_id = $3
            FOR UPDATE
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(key.product_id)
        .bind(key.warehouse_id)
        .bind(key.team_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let quantity = current.quantity.checked_add(delta).ok_or_else(|| {
            AppError::ValidationError(format!(
                "{} holds {}, adding {} overflows the quantity",
                current.reference, current.quantity, delta
            ))
        })?;
        if quantity < 0 {
            return Err(AppError::InsufficientStock(format!(
                "{} holds {}, cannot apply {}",
                current.reference, current.quantity, delta
            )));
        }

        let updated = sqlx::query_as::<_, StockProductRow>(&format!(
            "UPDATE stock_products SET quantity = $2 WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(key.product_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_histories (quantity, product_id, warehouse_id, team_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(delta)
        .bind(key.product_id)
        .bind(key.warehouse_id)
        .bind(key.team_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated.into()))
    }

    async fn correct_stock(&self, key: StockKey, quantity: i64) -> AppResult<Option<StockProduct>> {
        let row = sqlx::query_as::<_, StockProductRow>(&format!(
            r#"
            UPDATE stock_products SET quantity = $4
            WHERE id = $1 AND warehouse_id = $2 AND team_id = $3
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(key.product_id)
        .bind(key.warehouse_id)
        .bind(key.team_id)
        .bind(quantity)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(StockProduct::from))
    }

    async fn delete_stock_product(&self, product_id: Uuid) -> AppResult<Option<StockProduct>> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM warehouse_products WHERE stock_product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, StockProductRow>(&format!(
            "DELETE FROM stock_products WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.map(StockProduct::from))
    }

    async fn list_stock_history(&self, filter: &StockHistoryFilter) -> AppResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistoryRow>(
            r#"
            SELECT id, quantity, date, product_id, warehouse_id, team_id
            FROM stock_histories
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND ($3::uuid IS NULL OR team_id = $3)
            ORDER BY seq DESC
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.team_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(StockHistory::from).collect())
    }

    async fn replace_stock_errors(&self, errors: Vec<NewStockError>) -> AppResult<Vec<StockError>> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM stock_errors").execute(&mut *tx).await?;

        let mut stored = Vec::with_capacity(errors.len());
        for error in errors {
            let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
                "INSERT INTO stock_errors (status, origin) VALUES (FALSE, $1) RETURNING id, created_at",
            )
            .bind(error.origin.as_str())
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO stock_error_products (error_id, product_id, position)
                SELECT $1, p.product_id, p.ord::int
                FROM UNNEST($2::uuid[]) WITH ORDINALITY AS p(product_id, ord)
                "#,
            )
            .bind(id)
            .bind(&error.product_ids)
            .execute(&mut *tx)
            .await?;

            stored.push(StockError {
                id,
                status: false,
                origin: error.origin,
                product_ids: error.product_ids,
                created_at,
            });
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn list_stock_errors(&self, filter: &StockErrorFilter) -> AppResult<Vec<StockError>> {
        sqlx::query_as::<_, StockErrorRow>(&format!(
            "{} WHERE ($1::bool IS NULL OR e.status = $1) ORDER BY e.seq",
            ERROR_SELECT
        ))
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(StockError::try_from)
        .collect()
    }

    async fn get_stock_error(&self, error_id: Uuid) -> AppResult<Option<StockError>> {
        self.fetch_error(error_id).await
    }

    async fn set_stock_error_status(
        &self,
        error_id: Uuid,
        status: bool,
    ) -> AppResult<Option<StockError>> {
        let result = sqlx::query("UPDATE stock_errors SET status = $2 WHERE id = $1")
            .bind(error_id)
            .bind(status)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_error(error_id).await
    }

    async fn count_unresolved_errors(&self) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stock_errors WHERE status = FALSE")
            .fetch_one(&self.db)
            .await?;
        Ok(count.max(0) as u64)
    }
}
