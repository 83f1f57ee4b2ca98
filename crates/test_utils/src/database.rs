//! Database Test Utilities
//!
//! Provides a PostgreSQL testcontainer with the ledger schema applied, plus
//! helpers for seeding the records the ledger reads (customers, sales,
//! returns, receipts).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

use core_kernel::{CustomerId, ReceiptId, ReturnId, SaleId};

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "receivables_test";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A PostgreSQL test container with migrations applied, and a pool bound
/// to the runtime that created it
pub struct TestDatabase {
    _container: Arc<ContainerAsync<GenericImage>>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert_customer(&self, name: &str) -> Result<CustomerId, BoxError> {
        let customer_id = CustomerId::new_v7();
        sqlx::query("INSERT INTO customers (customer_id, name) VALUES ($1, $2)")
            .bind(Uuid::from(customer_id))
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(customer_id)
    }

    /// Inserts an approved sale
    pub async fn insert_sale(
        &self,
        customer_id: CustomerId,
        invoice_number: &str,
        total: Decimal,
        paid: Decimal,
        sale_date: DateTime<Utc>,
    ) -> Result<SaleId, BoxError> {
        let sale_id = SaleId::new_v7();
        sqlx::query(
            "INSERT INTO sales
                 (sale_id, customer_id, invoice_number, status, total, paid, sale_date)
             VALUES ($1, $2, $3, 'approved', $4, $5, $6)",
        )
        .bind(Uuid::from(sale_id))
        .bind(Uuid::from(customer_id))
        .bind(invoice_number)
        .bind(total)
        .bind(paid)
        .bind(sale_date)
        .execute(&self.pool)
        .await?;
        Ok(sale_id)
    }

    /// Inserts a sales return with the given status (`pending`, `approved`, `rejected`)
    pub async fn insert_return(
        &self,
        customer_id: CustomerId,
        return_number: &str,
        total: Decimal,
        status: &str,
        return_date: DateTime<Utc>,
    ) -> Result<ReturnId, BoxError> {
        let return_id = ReturnId::new_v7();
        sqlx::query(
            "INSERT INTO sales_returns
                 (return_id, customer_id, return_number, status, total, return_date)
             VALUES ($1, $2, $3, $4::return_status, $5, $6)",
        )
        .bind(Uuid::from(return_id))
        .bind(Uuid::from(customer_id))
        .bind(return_number)
        .bind(status)
        .bind(total)
        .bind(return_date)
        .execute(&self.pool)
        .await?;
        Ok(return_id)
    }

    /// Inserts a pending receipt for returned goods
    pub async fn insert_pending_return_receipt(
        &self,
        customer_id: CustomerId,
        return_id: Option<ReturnId>,
        amount: Decimal,
        transaction_date: DateTime<Utc>,
    ) -> Result<ReceiptId, BoxError> {
        let receipt_id = ReceiptId::new_v7();
        sqlx::query(
            "INSERT INTO receipts
                 (receipt_id, customer_id, amount, status, kind, return_id, description,
                  transaction_date)
             VALUES ($1, $2, $3, 'pending', 'return', $4, 'Refund for returned goods', $5)",
        )
        .bind(Uuid::from(receipt_id))
        .bind(Uuid::from(customer_id))
        .bind(amount)
        .bind(return_id.map(Uuid::from))
        .bind(transaction_date)
        .execute(&self.pool)
        .await?;
        Ok(receipt_id)
    }

    pub async fn ledger_row_count(&self, customer_id: CustomerId) -> Result<i64, BoxError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM customer_ledger_entries WHERE customer_id = $1",
        )
        .bind(Uuid::from(customer_id))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

async fn start_container() -> Result<(ContainerAsync<GenericImage>, TestDatabaseConfig), BoxError> {
    let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
        .with_exposed_port(5432.tcp())
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_USER", POSTGRES_USER)
        .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
        .with_env_var("POSTGRES_DB", POSTGRES_DB)
        .start()
        .await?;

    let port = container.get_host_port_ipv4(5432).await?;
    let host = container.get_host().await?.to_string();

    let config = TestDatabaseConfig {
        host,
        port,
        ..TestDatabaseConfig::default()
    };
    Ok((container, config))
}

async fn connect(config: &TestDatabaseConfig) -> Result<PgPool, BoxError> {
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.connection_url())
        .await?;
    Ok(pool)
}

/// A migrated container shared by every test in the binary
struct SharedContainer {
    container: Arc<ContainerAsync<GenericImage>>,
    config: TestDatabaseConfig,
}

static SHARED_CONTAINER: OnceCell<SharedContainer> = OnceCell::const_new();

/// Connects to the shared test container, starting it on first use
///
/// Each `#[tokio::test]` runs its own runtime, so every call opens a new
/// pool on the caller's runtime. Tests sharing the container should create
/// their own customers rather than clearing data, since they may run in
/// parallel.
///
/// # Panics
///
/// Panics if the container fails to start or cannot be reached
pub async fn get_shared_test_database() -> TestDatabase {
    let shared = SHARED_CONTAINER
        .get_or_init(|| async {
            let (container, config) = start_container()
                .await
                .expect("Failed to start shared test database");
            let pool = connect(&config)
                .await
                .expect("Failed to connect to shared test database");
            infra_db::run_migrations(&pool)
                .await
                .expect("Failed to migrate shared test database");
            pool.close().await;
            SharedContainer {
                container: Arc::new(container),
                config,
            }
        })
        .await;

    let pool = connect(&shared.config)
        .await
        .expect("Failed to connect to shared test database");
    TestDatabase {
        _container: shared.container.clone(),
        config: shared.config.clone(),
        pool,
    }
}
