use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InsightsError, Result};

/// Placeholder for missing merchant and description labels.
pub const PLACEHOLDER_LABEL: &str = "—";

/// Account reference used when a record carries none.
pub const UNKNOWN_ACCOUNT: &str = "unknown";

pub const DEFAULT_TOP_CATEGORIES: usize = 5;
pub const DEFAULT_SMALL_EXPENSE_THRESHOLD: f64 = 50.0;
pub const DEFAULT_TRANSACTION_SAMPLE: usize = 50;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum Category {
    #[schemars(description = "Rent, mortgage and home costs")]
    Housing,
    #[schemars(description = "Groceries, restaurants and coffee")]
    Food,
    #[schemars(description = "Fuel, transit, parking and ride share")]
    Transportation,
    Shopping,
    #[schemars(description = "Utilities, phone, internet and insurance bills")]
    Bills,
    Entertainment,
    Healthcare,
    Travel,
    #[schemars(description = "Salary, freelance and other inflows")]
    Income,
    #[schemars(description = "A labelled transaction that fits no other category")]
    Other,
    #[schemars(description = "The upstream record carried no category at all")]
    Unknown,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Housing,
        Category::Food,
        Category::Transportation,
        Category::Shopping,
        Category::Bills,
        Category::Entertainment,
        Category::Healthcare,
        Category::Travel,
        Category::Income,
        Category::Other,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Housing => "Housing",
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Entertainment => "Entertainment",
            Category::Healthcare => "Healthcare",
            Category::Travel => "Travel",
            Category::Income => "Income",
            Category::Other => "Other",
            Category::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[schemars(description = "Inflow; amount is zero or positive")]
    Credit,
    #[schemars(description = "Outflow; amount is zero or negative")]
    Debit,
}

impl TransactionType {
    /// Movement type implied by an amount's sign when no explicit indicator exists.
    pub fn from_amount(amount: f64) -> Self {
        if amount >= 0.0 {
            TransactionType::Credit
        } else {
            TransactionType::Debit
        }
    }

    /// Applies this movement type's sign to an amount's magnitude.
    pub fn signed(&self, amount: f64) -> f64 {
        if amount == 0.0 {
            return 0.0;
        }
        match self {
            TransactionType::Credit => amount.abs(),
            TransactionType::Debit => -amount.abs(),
        }
    }
}

/// A transaction normalized to the dashboard's canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    #[schemars(description = "Signed amount in currency units; negative is an outflow")]
    pub amount: f64,
    pub date: NaiveDate,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub merchant: String,
    pub description: String,
    #[serde(default)]
    pub is_recurring: bool,
}

impl Transaction {
    pub fn is_credit(&self) -> bool {
        self.transaction_type == TransactionType::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.transaction_type == TransactionType::Debit
    }

    pub fn is_income(&self) -> bool {
        self.is_credit() && self.category == Category::Income
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
    Credit,
    Loan,
    Investment,
    #[serde(other)]
    Other,
}

impl AccountType {
    pub fn is_debt(&self) -> bool {
        matches!(self, AccountType::Credit | AccountType::Loan)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[schemars(description = "Signed balance; debts are usually reported as negative")]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_months: Option<u32>,
    /// Upstream-reported figure; advisory only, see [`Account::available_credit`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_credit: Option<f64>,
}

impl Account {
    /// Outstanding amount regardless of the sign convention the source uses.
    pub fn outstanding(&self) -> f64 {
        self.balance.abs()
    }

    /// `creditLimit - |balance|` clamped at zero. `None` for non-credit accounts.
    pub fn available_credit(&self) -> Option<f64> {
        if self.account_type != AccountType::Credit {
            return None;
        }
        let limit = self.credit_limit.unwrap_or(0.0);
        Some((limit - self.outstanding()).max(0.0))
    }
}

/// Tunables for the insight calculators and the context budgeter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightsConfig {
    #[schemars(description = "How many expense categories to rank as top categories (default 5)")]
    pub top_categories: usize,

    #[schemars(
        description = "A recurring transaction whose magnitude is strictly below this is a small recurring expense (default 50)"
    )]
    pub small_expense_threshold: f64,

    #[schemars(description = "Most-recent transactions included in an advisory context (default 50)")]
    pub transaction_sample: usize,

    #[schemars(
        description = "Reference date for the six-month trend window. Defaults to today when omitted."
    )]
    pub now: Option<NaiveDate>,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            top_categories: DEFAULT_TOP_CATEGORIES,
            small_expense_threshold: DEFAULT_SMALL_EXPENSE_THRESHOLD,
            transaction_sample: DEFAULT_TRANSACTION_SAMPLE,
            now: None,
        }
    }
}

impl InsightsConfig {
    pub fn with_now(mut self, now: NaiveDate) -> Self {
        self.now = Some(now);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.small_expense_threshold.is_finite() || self.small_expense_threshold < 0.0 {
            return Err(InsightsError::InvalidConfig(format!(
                "small expense threshold must be a non-negative number, got {}",
                self.small_expense_threshold
            )));
        }
        Ok(())
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.now
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_serializes_in_dashboard_shape() {
        let txn = Transaction {
            id: "txn_001".to_string(),
            account_id: "acc_001".to_string(),
            amount: 6850.0,
            date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            category: Category::Income,
            subcategory: Some("Salary".to_string()),
            transaction_type: TransactionType::Credit,
            merchant: "Employer Inc.".to_string(),
            description: "Monthly Salary".to_string(),
            is_recurring: true,
        };

        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["accountId"], "acc_001");
        assert_eq!(json["type"], "credit");
        assert_eq!(json["category"], "Income");
        assert_eq!(json["isRecurring"], true);
        assert_eq!(json["date"], "2025-10-01");

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, txn);
    }

    #[test]
    fn test_available_credit_is_derived_and_clamped() {
        let mut card: Account = serde_json::from_str(
            r#"{"id":"acc_002","type":"credit","balance":-2450,"creditLimit":10000,"availableCredit":9999}"#,
        )
        .unwrap();
        assert_eq!(card.available_credit(), Some(7550.0));

        card.balance = -12000.0;
        assert_eq!(card.available_credit(), Some(0.0));

        let checking: Account =
            serde_json::from_str(r#"{"id":"acc_001","type":"checking","balance":48234}"#).unwrap();
        assert_eq!(checking.available_credit(), None);
    }

    #[test]
    fn test_unrecognised_account_type_is_other() {
        let acct: Account =
            serde_json::from_str(r#"{"id":"x","type":"brokerage-ira","balance":1}"#).unwrap();
        assert_eq!(acct.account_type, AccountType::Other);
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config: InsightsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, InsightsConfig::default());
        assert_eq!(config.top_categories, 5);
        assert_eq!(config.transaction_sample, 50);
        assert!(config.validate().is_ok());

        let bad = InsightsConfig {
            small_expense_threshold: -1.0,
            ..InsightsConfig::default()
        };
        assert!(matches!(bad.validate(), Err(InsightsError::InvalidConfig(_))));

        let nan = InsightsConfig {
            small_expense_threshold: f64::NAN,
            ..InsightsConfig::default()
        };
        assert!(nan.validate().is_err());
    }
}
