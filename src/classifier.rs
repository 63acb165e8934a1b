//! Normalization of loosely-shaped upstream transaction records.
//!
//! Three upstream shapes are recognised without configuration:
//!
//! - the dashboard shape (`accountId`, `isRecurring`, `type` = credit/debit)
//! - the bank API shape (`account_id`, `transaction_date`, `positive`, and a
//!   `type` that names the transaction kind rather than its direction)
//! - the agent shape (`account_id`, ISO datetime `date`, composite category
//!   labels such as "Food & Dining")
//!
//! Every lookup goes through [`RawTransaction`] so consumers never touch an
//! un-normalized record. A field that cannot be read falls back to a
//! documented default and is reported as a [`RecordIssue`]; classification
//! itself never fails.

use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::schema::{
    Category, Transaction, TransactionType, PLACEHOLDER_LABEL, UNKNOWN_ACCOUNT,
};
use crate::utils::parse_date_prefix;

const ID_FIELDS: &[&str] = &["id", "transaction_id", "transactionId", "_id"];
const ACCOUNT_FIELDS: &[&str] = &["accountId", "account_id", "account"];
const AMOUNT_FIELDS: &[&str] = &["amount", "value"];
const DATE_FIELDS: &[&str] = &[
    "date",
    "transaction_date",
    "transactionDate",
    "purchase_date",
    "posted_date",
];
const CATEGORY_FIELDS: &[&str] = &["category", "account_type"];
const SUBCATEGORY_FIELDS: &[&str] = &["subcategory", "sub_category", "subCategory"];
const MERCHANT_FIELDS: &[&str] = &["merchant", "nickname", "payee", "counterparty"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "memo"];
const RECURRING_FIELDS: &[&str] = &["isRecurring", "is_recurring", "recurring"];
const DIRECTION_FIELDS: &[&str] = &["positive", "isCredit", "is_credit"];

/// Date assigned to records whose date is missing or unreadable; sorts last
/// under a date-descending order.
pub fn fallback_date() -> NaiveDate {
    NaiveDate::default()
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordIssue {
    NotAnObject,
    MissingAmount,
    UnparseableAmount(String),
    MissingDate,
    UnparseableDate(String),
}

#[derive(Debug, Clone)]
pub struct Classified {
    pub transaction: Transaction,
    pub issues: Vec<RecordIssue>,
}

impl Classified {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassifiedBatch {
    pub transactions: Vec<Transaction>,
    /// Records that needed at least one fallback.
    pub malformed: usize,
}

/// An upstream record whose field names and value types are not yet trusted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawTransaction(Map<String, Value>);

impl RawTransaction {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wraps any JSON value; non-objects become an empty record.
    pub fn from_value(value: Value) -> (Self, bool) {
        match value {
            Value::Object(map) => (Self(map), true),
            _ => (Self::default(), false),
        }
    }

    fn first(&self, names: &[&str]) -> Option<&Value> {
        names
            .iter()
            .filter_map(|name| self.0.get(*name))
            .find(|v| !v.is_null())
    }

    /// First non-blank textual value among `names`, kept as supplied.
    /// Numbers are rendered.
    fn text(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| match self.0.get(*name)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    fn flag(&self, names: &[&str]) -> Option<bool> {
        names.iter().find_map(|name| parse_flag(self.0.get(*name)?))
    }
}

impl From<Map<String, Value>> for RawTransaction {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl Category {
    /// Maps a free-form upstream label onto the fixed taxonomy.
    ///
    /// Composite labels resolve by their leading word ("Bills & Utilities" is
    /// Bills). Blank labels are [`Category::Unknown`]; any other label that
    /// matches nothing is [`Category::Other`].
    pub fn classify_label(label: &str) -> Category {
        let normalized = label.trim().to_lowercase();
        if normalized.is_empty() {
            return Category::Unknown;
        }

        if let Some(category) = match_category_word(&normalized) {
            return category;
        }

        normalized
            .split(|c: char| c == '&' || c == '/' || c == ',' || c.is_whitespace())
            .filter(|word| !word.is_empty())
            .find_map(match_category_word)
            .unwrap_or(Category::Other)
    }
}

fn match_category_word(word: &str) -> Option<Category> {
    let category = match word {
        "housing" | "home" | "rent" | "mortgage" => Category::Housing,
        "food" | "groceries" | "grocery" | "dining" | "restaurants" => Category::Food,
        "transportation" | "transport" | "auto" | "gas" | "fuel" | "transit" => {
            Category::Transportation
        }
        "shopping" | "retail" => Category::Shopping,
        "bills" | "utilities" | "utility" => Category::Bills,
        "entertainment" | "streaming" => Category::Entertainment,
        "healthcare" | "health" | "medical" | "pharmacy" => Category::Healthcare,
        "travel" => Category::Travel,
        "income" | "salary" | "payroll" | "deposit" => Category::Income,
        "other" | "misc" | "miscellaneous" => Category::Other,
        "unknown" | "uncategorized" => Category::Unknown,
        _ => return None,
    };
    Some(category)
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_direction(label: &str) -> Option<TransactionType> {
    match label.trim().to_lowercase().as_str() {
        "credit" => Some(TransactionType::Credit),
        "debit" => Some(TransactionType::Debit),
        _ => None,
    }
}

/// Parses a numeric or textual amount. Currency symbols, thousands
/// separators and surrounding whitespace are tolerated.
pub fn parse_amount(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|amount| amount.is_finite())
}

/// Normalizes one upstream record into the canonical [`Transaction`].
pub fn classify(raw: &RawTransaction) -> Classified {
    let mut issues = Vec::new();

    let amount = match raw.first(AMOUNT_FIELDS) {
        None => {
            issues.push(RecordIssue::MissingAmount);
            0.0
        }
        Some(value) => parse_amount(value).unwrap_or_else(|| {
            issues.push(RecordIssue::UnparseableAmount(value.to_string()));
            0.0
        }),
    };

    let raw_date = raw.text(DATE_FIELDS);
    let date = match raw_date.as_deref() {
        None => {
            issues.push(RecordIssue::MissingDate);
            fallback_date()
        }
        Some(text) => parse_date_prefix(text).unwrap_or_else(|| {
            issues.push(RecordIssue::UnparseableDate(text.to_string()));
            fallback_date()
        }),
    };

    // `type` is a direction in the dashboard shape but a transaction kind
    // (deposit, purchase, ...) in the bank API shape.
    let kind = raw.text(&["type"]);
    let explicit_direction = raw
        .flag(DIRECTION_FIELDS)
        .map(|positive| {
            if positive {
                TransactionType::Credit
            } else {
                TransactionType::Debit
            }
        })
        .or_else(|| kind.as_deref().and_then(parse_direction));

    let transaction_type =
        explicit_direction.unwrap_or_else(|| TransactionType::from_amount(amount));
    let amount = transaction_type.signed(amount);

    let category = raw
        .text(CATEGORY_FIELDS)
        .map(|label| Category::classify_label(&label))
        .unwrap_or(Category::Unknown);

    let subcategory = raw.text(SUBCATEGORY_FIELDS).or_else(|| {
        kind.clone()
            .filter(|k| parse_direction(k).is_none())
    });

    let account_id = raw
        .text(ACCOUNT_FIELDS)
        .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string());

    let id = raw.text(ID_FIELDS).unwrap_or_else(|| {
        let kind_part = kind
            .clone()
            .unwrap_or_else(|| direction_label(transaction_type).to_string());
        let date_part = raw_date.clone().unwrap_or_else(|| date.to_string());
        format!("{}-{}-{}", account_id, kind_part, date_part)
    });

    let transaction = Transaction {
        id,
        account_id,
        amount,
        date,
        category,
        subcategory,
        transaction_type,
        merchant: raw
            .text(MERCHANT_FIELDS)
            .unwrap_or_else(|| PLACEHOLDER_LABEL.to_string()),
        description: raw
            .text(DESCRIPTION_FIELDS)
            .unwrap_or_else(|| PLACEHOLDER_LABEL.to_string()),
        is_recurring: raw.flag(RECURRING_FIELDS).unwrap_or(false),
    };

    if !issues.is_empty() {
        debug!(
            "Transaction {} normalized with fallbacks: {:?}",
            transaction.id, issues
        );
    }

    Classified {
        transaction,
        issues,
    }
}

fn direction_label(transaction_type: TransactionType) -> &'static str {
    match transaction_type {
        TransactionType::Credit => "credit",
        TransactionType::Debit => "debit",
    }
}

/// Classifies an arbitrary JSON value. Non-object values yield a record made
/// entirely of defaults.
pub fn classify_value(value: &Value) -> Classified {
    let (raw, is_object) = RawTransaction::from_value(value.clone());
    let mut classified = classify(&raw);
    if !is_object {
        classified.issues.insert(0, RecordIssue::NotAnObject);
    }
    classified
}

/// Classifies every record; a malformed record never blocks the rest.
pub fn classify_batch(values: &[Value]) -> ClassifiedBatch {
    let mut batch = ClassifiedBatch::default();
    for value in values {
        let classified = classify_value(value);
        if !classified.is_clean() {
            batch.malformed += 1;
        }
        batch.transactions.push(classified.transaction);
    }

    debug!(
        "Classified {} transactions ({} needed fallbacks)",
        batch.transactions.len(),
        batch.malformed
    );

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dashboard_shape() {
        let classified = classify_value(&json!({
            "id": "txn_003",
            "accountId": "acc_001",
            "amount": -1800,
            "description": "Monthly Rent",
            "category": "Housing",
            "subcategory": "Rent",
            "date": "2025-10-01",
            "type": "debit",
            "merchant": "Property Management",
            "isRecurring": true
        }));

        assert!(classified.is_clean());
        let txn = classified.transaction;
        assert_eq!(txn.id, "txn_003");
        assert_eq!(txn.account_id, "acc_001");
        assert_eq!(txn.amount, -1800.0);
        assert_eq!(txn.category, Category::Housing);
        assert_eq!(txn.subcategory.as_deref(), Some("Rent"));
        assert_eq!(txn.transaction_type, TransactionType::Debit);
        assert_eq!(txn.merchant, "Property Management");
        assert!(txn.is_recurring);
    }

    #[test]
    fn test_bank_api_shape_trusts_positive_indicator() {
        let classified = classify_value(&json!({
            "account_id": "5f1a",
            "account_type": "Checking",
            "nickname": "Everyday",
            "type": "purchase",
            "amount": 42.5,
            "positive": false,
            "transaction_date": "2025-09-12",
            "description": "Corner Store"
        }));

        let txn = classified.transaction;
        assert_eq!(txn.transaction_type, TransactionType::Debit);
        assert_eq!(txn.amount, -42.5);
        assert_eq!(txn.id, "5f1a-purchase-2025-09-12");
        assert_eq!(txn.subcategory.as_deref(), Some("purchase"));
        assert_eq!(txn.date, date(2025, 9, 12));
        assert_eq!(txn.merchant, "Everyday");
        assert_eq!(txn.category, Category::Other);
        assert!(!txn.is_recurring);
    }

    #[test]
    fn test_agent_shape_composite_category_and_datetime() {
        let txn = classify_value(&json!({
            "id": "hist_7",
            "account_id": "acc_9",
            "amount": -23.4,
            "merchant": "Chipotle",
            "category": "Food & Dining",
            "date": "2025-08-30T18:45:12.000123",
            "description": "Chipotle - Food & Dining",
            "type": "debit"
        }))
        .transaction;

        assert_eq!(txn.category, Category::Food);
        assert_eq!(txn.date, date(2025, 8, 30));
        assert_eq!(txn.subcategory, None);
    }

    #[test]
    fn test_direction_from_sign_when_no_indicator() {
        let credit = classify_value(&json!({"amount": "1,250.00", "date": "2025-01-02"}));
        assert_eq!(credit.transaction.transaction_type, TransactionType::Credit);
        assert_eq!(credit.transaction.amount, 1250.0);

        let debit = classify_value(&json!({"amount": "-$12.99", "date": "2025-01-02"}));
        assert_eq!(debit.transaction.transaction_type, TransactionType::Debit);
        assert_eq!(debit.transaction.amount, -12.99);

        let zero = classify_value(&json!({"amount": 0, "date": "2025-01-02"}));
        assert_eq!(zero.transaction.transaction_type, TransactionType::Credit);
    }

    #[test]
    fn test_explicit_type_reconciles_amount_sign() {
        let txn = classify_value(&json!({"amount": 60, "type": "DEBIT", "date": "2025-01-02"}))
            .transaction;
        assert_eq!(txn.transaction_type, TransactionType::Debit);
        assert_eq!(txn.amount, -60.0);
    }

    #[test]
    fn test_unparseable_amount_defaults_to_zero() {
        let classified = classify_value(&json!({
            "id": "bad",
            "amount": "twelve dollars",
            "date": "2025-01-02"
        }));
        assert_eq!(classified.transaction.amount, 0.0);
        assert_eq!(
            classified.issues,
            vec![RecordIssue::UnparseableAmount("\"twelve dollars\"".to_string())]
        );
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let classified = classify_value(&json!({}));
        let txn = &classified.transaction;
        assert_eq!(txn.merchant, PLACEHOLDER_LABEL);
        assert_eq!(txn.description, PLACEHOLDER_LABEL);
        assert_eq!(txn.category, Category::Unknown);
        assert_eq!(txn.account_id, UNKNOWN_ACCOUNT);
        assert_eq!(txn.date, fallback_date());
        assert!(!txn.id.is_empty());
        assert!(classified.issues.contains(&RecordIssue::MissingAmount));
        assert!(classified.issues.contains(&RecordIssue::MissingDate));
    }

    #[test]
    fn test_blank_strings_are_treated_as_missing() {
        let txn = classify_value(&json!({
            "amount": -5,
            "date": "2025-01-02",
            "category": "   ",
            "subcategory": "",
            "merchant": ""
        }))
        .transaction;
        assert_eq!(txn.category, Category::Unknown);
        assert_eq!(txn.subcategory, None);
        assert_eq!(txn.merchant, PLACEHOLDER_LABEL);
    }

    #[test]
    fn test_non_object_record_does_not_block_batch() {
        let batch = classify_batch(&[
            json!("garbage"),
            json!({"id": "ok", "amount": -10, "date": "2025-01-02", "category": "Food"}),
            json!({"id": "nan", "amount": "NaN", "date": "2025-01-02"}),
        ]);
        assert_eq!(batch.transactions.len(), 3);
        assert_eq!(batch.malformed, 2);
        assert_eq!(batch.transactions[1].category, Category::Food);
        assert_eq!(batch.transactions[2].amount, 0.0);
    }

    #[test]
    fn test_recurrence_flag_variants() {
        let yes = classify_value(&json!({"amount": -1, "date": "2025-01-02", "is_recurring": "yes"}));
        assert!(yes.transaction.is_recurring);
        let num = classify_value(&json!({"amount": -1, "date": "2025-01-02", "recurring": 1}));
        assert!(num.transaction.is_recurring);
    }

    #[test]
    fn test_classify_label() {
        assert_eq!(Category::classify_label("Bills & Utilities"), Category::Bills);
        assert_eq!(Category::classify_label("food"), Category::Food);
        assert_eq!(Category::classify_label("Income"), Category::Income);
        assert_eq!(Category::classify_label("Pet supplies"), Category::Other);
        assert_eq!(Category::classify_label(""), Category::Unknown);
        for category in Category::ALL {
            assert_eq!(Category::classify_label(category.as_str()), category);
        }
    }

    #[test]
    fn test_canonical_transaction_round_trips() {
        let original = Transaction {
            id: "txn_011".to_string(),
            account_id: "acc_001".to_string(),
            amount: -12.0,
            date: date(2025, 10, 16),
            category: Category::Other,
            subcategory: Some("Apps".to_string()),
            transaction_type: TransactionType::Debit,
            merchant: "App Store".to_string(),
            description: "App Subscription".to_string(),
            is_recurring: true,
        };

        let value = serde_json::to_value(&original).unwrap();
        let classified = classify_value(&value);
        assert!(classified.is_clean());
        assert_eq!(classified.transaction, original);

        let padded = Transaction {
            merchant: "Netflix ".to_string(),
            description: " Streaming".to_string(),
            ..original
        };
        let value = serde_json::to_value(&padded).unwrap();
        assert_eq!(classify_value(&value).transaction, padded);
    }
}
