//! Persistence gateway
//!
//! `TransactionStore` is the seam between the pipeline/dashboard and where the
//! records live. Writes are always full replacements of the previous batch.
//!
//! - `Database` - local SQLite file (optionally SQLCipher-encrypted)
//! - `RestStore` - hosted PostgREST table (Supabase)

mod rest;

pub use rest::RestStore;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction};

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Remove every stored record; returns the count when the store reports it
    async fn delete_all(&self) -> Result<Option<usize>>;

    /// Append records in order
    async fn insert_batch(&self, records: &[NewTransaction]) -> Result<()>;

    /// All records in insertion order
    async fn fetch_all(&self) -> Result<Vec<Transaction>>;

    /// Replace the stored set with `records`
    ///
    /// The default deletes then inserts with no rollback: if the insert fails
    /// the store is left empty.
    async fn replace_all(&self, records: &[NewTransaction]) -> Result<()> {
        let deleted = self.delete_all().await?;
        debug!(?deleted, "Cleared previous batch");
        if !records.is_empty() {
            self.insert_batch(records).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> bool;
}

#[async_trait]
impl TransactionStore for Database {
    async fn delete_all(&self) -> Result<Option<usize>> {
        Ok(Some(self.delete_all_transactions()?))
    }

    async fn insert_batch(&self, records: &[NewTransaction]) -> Result<()> {
        self.insert_transactions(records)?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Transaction>> {
        self.list_transactions()
    }

    /// Single SQLite transaction: delete and insert commit together
    async fn replace_all(&self, records: &[NewTransaction]) -> Result<()> {
        self.replace_transactions(records)?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.count_transactions().is_ok()
    }
}

/// Concrete store enum
#[derive(Clone)]
pub enum StoreClient {
    Sqlite(Database),
    Rest(RestStore),
}

impl StoreClient {
    /// Connect to the store named by `settings.database_url`
    ///
    /// `http(s)://` URLs are PostgREST endpoints; anything else is a SQLite
    /// path. The database key is the REST API key or the SQLCipher passphrase.
    pub fn connect(settings: &Settings) -> Result<Self> {
        if settings.uses_rest_store() {
            let key = settings.database_key.as_deref().ok_or_else(|| {
                Error::Config("A database key is required for a REST table store".into())
            })?;
            let store = RestStore::new(&settings.database_url, key, &settings.table);
            info!(url = %settings.database_url, table = %settings.table, "Using REST table store");
            Ok(StoreClient::Rest(store))
        } else {
            let db = Database::open(&settings.database_url, settings.database_key.as_deref())?;
            info!(path = db.path(), encrypted = db.is_encrypted(), "Using SQLite store");
            Ok(StoreClient::Sqlite(db))
        }
    }

    /// Short description for status output
    pub fn describe(&self) -> String {
        match self {
            StoreClient::Sqlite(db) => format!("sqlite:{}", db.path()),
            StoreClient::Rest(rest) => format!("rest:{}", rest.table_url()),
        }
    }
}

#[async_trait]
impl TransactionStore for StoreClient {
    async fn delete_all(&self) -> Result<Option<usize>> {
        match self {
            StoreClient::Sqlite(s) => s.delete_all().await,
            StoreClient::Rest(s) => s.delete_all().await,
        }
    }

    async fn insert_batch(&self, records: &[NewTransaction]) -> Result<()> {
        match self {
            StoreClient::Sqlite(s) => s.insert_batch(records).await,
            StoreClient::Rest(s) => s.insert_batch(records).await,
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Transaction>> {
        match self {
            StoreClient::Sqlite(s) => s.fetch_all().await,
            StoreClient::Rest(s) => s.fetch_all().await,
        }
    }

    async fn replace_all(&self, records: &[NewTransaction]) -> Result<()> {
        match self {
            StoreClient::Sqlite(s) => s.replace_all(records).await,
            StoreClient::Rest(s) => s.replace_all(records).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            StoreClient::Sqlite(s) => s.health_check().await,
            StoreClient::Rest(s) => s.health_check().await,
        }
    }
}

/// Stored records for display; a failed fetch is logged and shown as no data
pub async fn fetch_for_display<S: TransactionStore + ?Sized>(store: &S) -> Vec<Transaction> {
    match store.fetch_all().await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Failed to fetch records, showing empty dashboard");
            Vec::new()
        }
    }
}
