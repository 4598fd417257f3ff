//! PostgREST table store (Supabase)
//!
//! Columns follow the hosted `transacoes` table: `data_transacao`, `descricao`,
//! `valor`, `banco`, `categoria`, `comentarios`, plus the server-assigned `id`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction};

use super::TransactionStore;

#[derive(Clone)]
pub struct RestStore {
    http_client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

#[derive(Debug, Serialize)]
struct RowOut<'a> {
    data_transacao: NaiveDate,
    descricao: &'a str,
    valor: f64,
    banco: &'a str,
    categoria: &'a str,
    comentarios: &'a str,
}

impl<'a> From<&'a NewTransaction> for RowOut<'a> {
    fn from(tx: &'a NewTransaction) -> Self {
        Self {
            data_transacao: tx.date,
            descricao: &tx.description,
            valor: tx.amount,
            banco: &tx.source,
            categoria: &tx.category,
            comentarios: &tx.note,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RowIn {
    id: i64,
    data_transacao: NaiveDate,
    descricao: String,
    valor: f64,
    #[serde(default)]
    banco: Option<String>,
    #[serde(default)]
    categoria: Option<String>,
    #[serde(default)]
    comentarios: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<RowIn> for Transaction {
    fn from(row: RowIn) -> Self {
        Transaction {
            id: row.id,
            date: row.data_transacao,
            description: row.descricao,
            amount: row.valor,
            source: row.banco.unwrap_or_default(),
            category: row.categoria.unwrap_or_default(),
            note: row.comentarios.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        }
    }

    pub fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(Error::Api { status, body })
        }
    }
}

#[async_trait]
impl TransactionStore for RestStore {
    async fn delete_all(&self) -> Result<Option<usize>> {
        // PostgREST refuses unfiltered deletes; id is never 0
        let url = format!("{}?id=neq.0", self.table_url());
        let response = self
            .authed(self.http_client.delete(url))
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        Self::check(response).await?;
        debug!(table = %self.table, "Deleted all rows");
        Ok(None)
    }

    async fn insert_batch(&self, records: &[NewTransaction]) -> Result<()> {
        let rows: Vec<RowOut<'_>> = records.iter().map(RowOut::from).collect();
        let response = self
            .authed(self.http_client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        debug!(table = %self.table, rows = rows.len(), "Inserted rows");
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Transaction>> {
        let url = format!("{}?select=*&order=id.asc", self.table_url());
        let response = self.authed(self.http_client.get(url)).send().await?;
        let rows: Vec<RowIn> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}?select=id&limit=1", self.table_url());
        match self.authed(self.http_client.get(url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
