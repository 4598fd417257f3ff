//! Statement processing pipeline
//!
//! extract -> parse -> label -> replace stored batch. One linear pass: lines
//! are labeled one at a time with a fixed pause after each call.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai::TextGenerator;
use crate::config::Settings;
use crate::error::Result;
use crate::extract::extract_pages;
use crate::labeler::CategoryLabeler;
use crate::models::{Category, NewTransaction};
use crate::statement::{parse_page, ParserRules};
use crate::store::TransactionStore;

/// Progress notifications during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    PageStarted { page: usize, total_pages: usize },
    Classifying { page: usize, description: String },
    PageFinished { page: usize, found: usize },
    Saving { records: usize },
    Done { records: usize },
}

/// Receives progress events
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards progress events
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Outcome of one processing run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub pages: usize,
    /// Pages with no extractable text
    pub empty_pages: usize,
    pub transactions: usize,
    /// Lines that received the fallback label
    pub fallback_labels: usize,
    pub income: f64,
    pub expense: f64,
    pub elapsed_ms: u64,
}

/// Drives a statement from bytes to stored records
pub struct StatementProcessor<'a, S, G> {
    store: &'a S,
    /// None skips remote classification and assigns the fallback label
    labeler: Option<CategoryLabeler<G>>,
    rules: ParserRules,
    throttle: Duration,
    issuer: String,
    note: String,
}

impl<'a, S, G> StatementProcessor<'a, S, G>
where
    S: TransactionStore,
    G: TextGenerator,
{
    pub fn new(store: &'a S, labeler: Option<CategoryLabeler<G>>, settings: &Settings) -> Self {
        Self {
            store,
            labeler,
            rules: settings.parser.clone(),
            throttle: settings.throttle,
            issuer: settings.issuer.clone(),
            note: settings.note.clone(),
        }
    }

    /// Override the pause after each classified line
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Process a PDF held in memory
    pub async fn process_pdf(&self, bytes: &[u8], progress: &dyn ProgressSink) -> Result<ProcessReport> {
        let pages = extract_pages(bytes)?;
        self.process_pages(&pages, progress).await
    }

    /// Process already-extracted page texts
    pub async fn process_pages<P: AsRef<str>>(
        &self,
        pages: &[P],
        progress: &dyn ProgressSink,
    ) -> Result<ProcessReport> {
        let started = Instant::now();
        let total_pages = pages.len();
        let mut report = ProcessReport {
            pages: total_pages,
            ..Default::default()
        };
        let mut records: Vec<NewTransaction> = Vec::new();

        for (index, page) in pages.iter().enumerate() {
            let page_num = index + 1;
            progress.report(ProgressEvent::PageStarted {
                page: page_num,
                total_pages,
            });

            let text = page.as_ref();
            if text.trim().is_empty() {
                report.empty_pages += 1;
                progress.report(ProgressEvent::PageFinished {
                    page: page_num,
                    found: 0,
                });
                continue;
            }

            let lines = parse_page(text, &self.rules);
            let found = lines.len();

            for line in lines {
                let category = match self.labeler {
                    Some(ref labeler) => {
                        progress.report(ProgressEvent::Classifying {
                            page: page_num,
                            description: line.description.clone(),
                        });
                        let label = labeler.label(&line.description, line.amount).await;
                        if !self.throttle.is_zero() {
                            tokio::time::sleep(self.throttle).await;
                        }
                        label
                    }
                    None => Category::FALLBACK.as_str().to_string(),
                };

                if category == Category::FALLBACK.as_str() {
                    report.fallback_labels += 1;
                }

                records.push(NewTransaction {
                    date: line.date,
                    description: line.description,
                    amount: line.amount,
                    source: self.issuer.clone(),
                    category,
                    note: self.note.clone(),
                });
            }

            progress.report(ProgressEvent::PageFinished {
                page: page_num,
                found,
            });
        }

        progress.report(ProgressEvent::Saving {
            records: records.len(),
        });
        self.store.replace_all(&records).await?;

        report.transactions = records.len();
        report.income = records.iter().map(|r| r.amount).filter(|a| *a > 0.0).sum();
        report.expense = records.iter().map(|r| r.amount).filter(|a| *a < 0.0).sum();
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        progress.report(ProgressEvent::Done {
            records: records.len(),
        });
        info!(
            pages = report.pages,
            transactions = report.transactions,
            fallback_labels = report.fallback_labels,
            elapsed_ms = report.elapsed_ms,
            "Statement processed"
        );

        Ok(report)
    }
}
