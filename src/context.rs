//! Bounded summaries for hand-off to an external text-generation service.
//!
//! The caps below are part of the contract: an [`AdvisoryContext`] never
//! carries more than [`MAX_CONTEXT_CATEGORIES`] categories,
//! [`MAX_CONTEXT_RECURRING`] recurring expenses or
//! [`MAX_CONTEXT_TRANSACTIONS`] transactions, whatever the configuration asks
//! for.

use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::sorted_by_date_desc;
use crate::classifier::classify_batch;
use crate::error::{InsightsError, Result};
use crate::insights::CategoryTotal;
use crate::schema::{Account, InsightsConfig, Transaction};
use crate::{AggregatedMetrics, InsightsEngine};

pub const MAX_CONTEXT_CATEGORIES: usize = 5;
pub const MAX_CONTEXT_RECURRING: usize = 5;
pub const MAX_CONTEXT_TRANSACTIONS: usize = 50;

/// A question about the user's finances plus the snapshot it refers to.
///
/// `transactions` is `None` when the caller supplied nothing, which is an
/// error; `Some(vec![])` is a legitimately empty history. Request bodies are
/// read with [`AdvisoryRequest::from_json`] so every record passes through
/// the classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    pub question: String,
    pub accounts: Vec<Account>,
    pub transactions: Option<Vec<Transaction>>,
}

impl AdvisoryRequest {
    /// Reads a request body whose transactions may be in any upstream shape.
    ///
    /// Fails when `transactions` is absent or not an array. Individual
    /// malformed transactions are normalized with defaults; accounts that
    /// cannot be read are skipped.
    pub fn from_json(body: &Value) -> Result<Self> {
        let question = body
            .get("question")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let transactions = match body.get("transactions") {
            None | Some(Value::Null) => return Err(InsightsError::missing("transactions")),
            Some(Value::Array(items)) => classify_batch(items).transactions,
            Some(other) => {
                return Err(InsightsError::NotACollection {
                    field: "transactions".to_string(),
                    found: json_kind(other).to_string(),
                })
            }
        };

        let accounts = match body.get("accounts") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match serde_json::from_value::<Account>(item.clone()) {
                    Ok(account) => Some(account),
                    Err(e) => {
                        warn!("Skipping unreadable account: {}", e);
                        None
                    }
                })
                .collect(),
            Some(other) => {
                return Err(InsightsError::NotACollection {
                    field: "accounts".to_string(),
                    found: json_kind(other).to_string(),
                })
            }
        };

        Ok(Self {
            question,
            accounts,
            transactions: Some(transactions),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryContext {
    #[schemars(description = "Sum of all account balances")]
    pub net_worth: f64,

    #[schemars(description = "Sum of credit transactions in the Income category")]
    pub monthly_income: f64,

    #[schemars(description = "Sum of absolute debit amounts")]
    pub monthly_expenses: f64,

    #[schemars(description = "Largest expense categories, at most 5")]
    pub top_categories: Vec<CategoryTotal>,

    #[schemars(description = "Small recurring expenses that are easiest to cut, at most 5")]
    pub recurring_expenses: Vec<Transaction>,

    #[schemars(description = "Combined magnitude of all small recurring expenses")]
    pub potential_savings: f64,

    #[schemars(description = "Most recent transactions, newest first, at most 50")]
    pub transactions: Vec<Transaction>,

    #[schemars(description = "Number of transactions the sample was drawn from")]
    pub transaction_count: usize,
}

impl AdvisoryContext {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AdvisoryContext)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

pub struct ContextBudgeter {
    config: InsightsConfig,
}

impl ContextBudgeter {
    pub fn new(config: InsightsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    /// Packs already-computed metrics and a transaction sample into a context.
    pub fn assemble(
        &self,
        transactions: Option<&[Transaction]>,
        metrics: &AggregatedMetrics,
    ) -> Result<AdvisoryContext> {
        let transactions = transactions.ok_or_else(|| InsightsError::missing("transactions"))?;

        let category_cap = self.config.top_categories.min(MAX_CONTEXT_CATEGORIES);
        let sample_cap = self.config.transaction_sample.min(MAX_CONTEXT_TRANSACTIONS);

        let top_categories: Vec<CategoryTotal> = metrics
            .expenses
            .categories
            .iter()
            .take(category_cap)
            .cloned()
            .collect();

        let recurring_expenses: Vec<Transaction> = metrics
            .savings
            .small_recurring_expenses
            .iter()
            .take(MAX_CONTEXT_RECURRING)
            .cloned()
            .collect();

        let mut sample = sorted_by_date_desc(transactions);
        sample.truncate(sample_cap);

        debug!(
            "Advisory context: {} categories, {} recurring expenses, {} of {} transactions",
            top_categories.len(),
            recurring_expenses.len(),
            sample.len(),
            transactions.len()
        );

        Ok(AdvisoryContext {
            net_worth: metrics.net_worth,
            monthly_income: metrics.monthly_income,
            monthly_expenses: metrics.monthly_expenses,
            top_categories,
            recurring_expenses,
            potential_savings: metrics.potential_savings(),
            transactions: sample,
            transaction_count: transactions.len(),
        })
    }

    /// Computes metrics for the request's snapshot and packs them.
    pub fn build(&self, request: &AdvisoryRequest) -> Result<AdvisoryContext> {
        let transactions = request
            .transactions
            .as_deref()
            .ok_or_else(|| InsightsError::missing("transactions"))?;

        let engine = InsightsEngine::new(self.config.clone())?;
        let metrics = engine.compute(transactions, &request.accounts);
        self.assemble(Some(transactions), &metrics)
    }
}

impl Default for ContextBudgeter {
    fn default() -> Self {
        Self::new(InsightsConfig::default())
    }
}
