//! PostgreSQL account store.
//!
//! One row per account keyed by `user_id`; the device list is a JSONB array in
//! trust order. Mutations lock the row with `SELECT ... FOR UPDATE` inside a
//! transaction, so concurrent logins against one account serialize while
//! other accounts proceed independently.

use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{
    error::RegistryError,
    model::{Account, Device},
    store::AccountStore,
};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const SELECT_COLUMNS: &str =
    "user_id, email, name, phone_number, devices::text AS devices, max_devices";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and make sure the schema exists.
    ///
    /// # Errors
    /// Returns an error if the connection or the schema setup fails.
    pub async fn connect(dsn: &str) -> Result<Self, RegistryError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply `sql/schema.sql`; every statement is idempotent.
    ///
    /// # Errors
    /// Returns an error if a statement fails.
    pub async fn migrate(&self) -> Result<(), RegistryError> {
        let span = info_span!("db.migrate", db.system = "postgresql");
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn account_from_row(row: &PgRow) -> Result<Account, RegistryError> {
    let devices_json: String = row.try_get("devices")?;
    let devices: Vec<Device> = serde_json::from_str(&devices_json)
        .map_err(|err| RegistryError::CorruptRecord(format!("devices: {err}")))?;
    let max_devices: i32 = row.try_get("max_devices")?;
    let max_devices = usize::try_from(max_devices)
        .map_err(|_| RegistryError::CorruptRecord(format!("max_devices: {max_devices}")))?;

    Ok(Account {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        phone_number: row.try_get("phone_number")?,
        devices,
        max_devices,
    })
}

fn devices_json(account: &Account) -> Result<String, RegistryError> {
    serde_json::to_string(&account.devices)
        .map_err(|err| RegistryError::CorruptRecord(format!("devices: {err}")))
}

async fn write_account<'e, E>(executor: E, account: &Account) -> Result<u64, RegistryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = r"
        UPDATE accounts
        SET name = $2, phone_number = $3, devices = $4::jsonb, updated_at = NOW()
        WHERE user_id = $1
    ";
    let result = sqlx::query(query)
        .bind(account.user_id)
        .bind(account.name.as_deref())
        .bind(account.phone_number.as_deref())
        .bind(devices_json(account)?)
        .execute(executor)
        .instrument(db_span("UPDATE", query))
        .await?;
    Ok(result.rows_affected())
}

impl AccountStore for PgStore {
    async fn get_or_create(&self, email: &str, max_devices: usize) -> Result<Account, RegistryError> {
        let max_devices = i32::try_from(max_devices)
            .map_err(|_| RegistryError::Validation("max devices out of range"))?;

        // The unique email constraint makes concurrent first logins converge
        // on whichever insert landed first.
        let insert = r"
            INSERT INTO accounts (user_id, email, max_devices)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
        ";
        sqlx::query(insert)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(max_devices)
            .execute(&self.pool)
            .instrument(db_span("INSERT", insert))
            .await?;

        let select = format!("SELECT {SELECT_COLUMNS} FROM accounts WHERE email = $1");
        let row = sqlx::query(&select)
            .bind(email)
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", &select))
            .await?;
        account_from_row(&row)
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<Account>, RegistryError> {
        let select = format!("SELECT {SELECT_COLUMNS} FROM accounts WHERE user_id = $1");
        let row = sqlx::query(&select)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &select))
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn save(&self, account: &Account) -> Result<(), RegistryError> {
        match write_account(&self.pool, account).await? {
            0 => Err(RegistryError::NotFound),
            _ => Ok(()),
        }
    }

    async fn modify<T, F>(&self, user_id: Uuid, f: F) -> Result<Option<T>, RegistryError>
    where
        F: FnOnce(&mut Account) -> T + Send,
        T: Send,
    {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {SELECT_COLUMNS} FROM accounts WHERE user_id = $1 FOR UPDATE");
        let row = sqlx::query(&select)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .instrument(db_span("SELECT", &select))
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut account = account_from_row(&row)?;
        let before = account.clone();
        let output = f(&mut account);

        if account != before {
            write_account(&mut *tx, &account).await?;
        }
        tx.commit().await?;

        Ok(Some(output))
    }

    async fn ping(&self) -> Result<(), RegistryError> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        let mut conn = self.pool.acquire().await?;
        conn.ping().instrument(span).await?;
        Ok(())
    }
}
