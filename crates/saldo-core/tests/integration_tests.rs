//! Integration tests for saldo-core
//!
//! These tests exercise the full PDF -> parse -> label -> store -> dashboard workflow.

use std::time::Duration;

use saldo_core::{
    ai::GeminiBackend,
    export::transactions_csv,
    test_utils::{statement_pdf, MockGeminiServer, MockRestServer},
    AIClient, CategoryLabeler, Dashboard, Database, LabelPolicy, MockBackend, NoProgress,
    RestStore, RetryPolicy, Settings, StatementProcessor, StoreClient, TransactionStore,
};

/// Two-page statement with a balance line and an unknown month mixed in
fn statement() -> Vec<u8> {
    statement_pdf(&[
        vec![
            "Extrato de conta",
            "05 JAN 2024",
            "Compra Padaria Real 12,50",
            "Saldo do dia 1.000,00",
            "Transferencia recebida 1.250,00",
        ],
        vec![
            "06 JAN 2024",
            "Compra Uber Trip 23,90",
            "Pagamento Netflix 39,90",
        ],
    ])
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.throttle = Duration::ZERO;
    settings
}

fn mock_labeler() -> CategoryLabeler<MockBackend> {
    CategoryLabeler::new(
        MockBackend::new(),
        RetryPolicy::default().immediate(),
        LabelPolicy::Strict,
    )
    .expect("embedded prompt")
}

// =============================================================================
// Local store workflow
// =============================================================================

#[tokio::test]
async fn test_pdf_to_dashboard_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let processor = StatementProcessor::new(&db, Some(mock_labeler()), &settings());

    let report = processor
        .process_pdf(&statement(), &NoProgress)
        .await
        .expect("Processing failed");

    assert_eq!(report.pages, 2);
    assert_eq!(report.transactions, 4);
    assert_eq!(report.fallback_labels, 0);

    let records = db.fetch_all().await.unwrap();
    let descriptions: Vec<_> = records.iter().map(|r| r.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec![
            "Compra Padaria Real",
            "Transferencia recebida",
            "Compra Uber Trip",
            "Pagamento Netflix"
        ]
    );
    assert_eq!(records[1].amount, 1250.0);
    assert_eq!(records[2].amount, -23.9);

    let dashboard = Dashboard::build(&records, &[]);
    assert!(!dashboard.is_empty);
    assert_eq!(dashboard.summary.income, 1250.0);
    assert!((dashboard.summary.expense + 76.3).abs() < 1e-9);
    assert_eq!(dashboard.daily_flow.len(), 2);
    assert_eq!(dashboard.expenses_by_category[0].category, "Lazer");
    assert_eq!(
        dashboard.categories,
        vec!["Alimentação", "Receita", "Transporte", "Lazer"]
    );

    // Newest first in the table
    assert_eq!(dashboard.transactions[0].date.to_string(), "2024-01-06");
}

#[tokio::test]
async fn test_second_upload_replaces_first() {
    let db = Database::in_memory().unwrap();
    let processor = StatementProcessor::new(&db, Some(mock_labeler()), &settings());

    processor.process_pdf(&statement(), &NoProgress).await.unwrap();
    let second = statement_pdf(&[vec!["10 FEV 2024", "Compra Mercado 50,00"]]);
    processor.process_pdf(&second, &NoProgress).await.unwrap();

    let records = db.list_transactions().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].description, "Compra Mercado");
    assert_eq!(records[0].date.to_string(), "2024-02-10");
}

#[tokio::test]
async fn test_filtered_export() {
    let db = Database::in_memory().unwrap();
    let processor = StatementProcessor::new(&db, Some(mock_labeler()), &settings());
    processor.process_pdf(&statement(), &NoProgress).await.unwrap();

    let records = db.list_transactions().unwrap();
    let dashboard = Dashboard::build(&records, &["Transporte".to_string()]);
    let csv = transactions_csv(&dashboard.transactions).unwrap();

    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "2024-01-06,Compra Uber Trip,Transporte,-23.90,Nubank");
}

// =============================================================================
// Remote model workflow
// =============================================================================

#[tokio::test]
async fn test_gemini_rate_limits_are_retried() {
    let server = MockGeminiServer::start_rate_limited(2).await;
    let client = AIClient::Gemini(GeminiBackend::with_api_key(
        &server.url(),
        "gemini-2.5-flash",
        "test-key",
    ));
    let labeler =
        CategoryLabeler::new(client, RetryPolicy::default().immediate(), LabelPolicy::Strict)
            .unwrap();

    let db = Database::in_memory().unwrap();
    let processor = StatementProcessor::new(&db, Some(labeler), &settings());
    let pdf = statement_pdf(&[vec!["05 JAN 2024", "Compra Uber 10,00"]]);
    let report = processor.process_pdf(&pdf, &NoProgress).await.unwrap();

    assert_eq!(report.fallback_labels, 0);
    assert_eq!(server.calls(), 3);
    assert_eq!(db.list_transactions().unwrap()[0].category, "Transporte");
}

#[tokio::test]
async fn test_gemini_persistent_rate_limit_falls_back() {
    let server = MockGeminiServer::start_rate_limited(10).await;
    let client = AIClient::Gemini(GeminiBackend::with_api_key(&server.url(), "m", "k"));
    let labeler =
        CategoryLabeler::new(client, RetryPolicy::default().immediate(), LabelPolicy::Strict)
            .unwrap();

    assert_eq!(labeler.label("Compra Uber", -10.0).await, "Outros");
    assert_eq!(server.calls(), 3);
}

// =============================================================================
// Hosted table workflow
// =============================================================================

#[tokio::test]
async fn test_rest_store_workflow() {
    let server = MockRestServer::start("anon-key").await;
    let store = StoreClient::Rest(RestStore::new(&server.url(), "anon-key", "transacoes"));
    let processor = StatementProcessor::new(&store, Some(mock_labeler()), &settings());

    processor.process_pdf(&statement(), &NoProgress).await.unwrap();

    let rows = server.rows();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["descricao"], "Compra Padaria Real");
    assert_eq!(rows[0]["banco"], "Nubank");
    assert_eq!(rows[0]["comentarios"], "Upload via SaaS Dashboard");

    let records = store.fetch_all().await.unwrap();
    let dashboard = Dashboard::build(&records, &[]);
    assert_eq!(dashboard.summary.transaction_count, 4);
}

#[tokio::test]
async fn test_store_connect_from_settings() {
    let server = MockRestServer::start("anon-key").await;

    let mut settings = settings();
    settings.database_url = server.url();
    assert!(StoreClient::connect(&settings).is_err());

    settings.database_key = Some("anon-key".to_string());
    let store = StoreClient::connect(&settings).unwrap();
    assert!(store.health_check().await);
    assert!(store.describe().starts_with("rest:"));
}
