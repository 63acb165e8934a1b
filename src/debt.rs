use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::aggregation::{percentage_of, stable_sum};
use crate::schema::{Account, AccountType};

/// Upstream available-credit figures within this distance of the derived
/// value are considered consistent.
const AVAILABLE_CREDIT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditUtilization {
    pub account_id: String,
    pub used: f64,
    pub limit: f64,
    pub available: f64,
    #[schemars(description = "Percent of the limit in use; 0 when the limit is 0")]
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebtAccount {
    pub account_id: String,
    pub name: String,
    pub account_type: AccountType,
    pub outstanding: f64,
    pub apr: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_months: Option<u32>,
}

impl From<&Account> for DebtAccount {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id.clone(),
            name: account.name.clone(),
            account_type: account.account_type,
            outstanding: account.outstanding(),
            apr: account.apr.unwrap_or(0.0),
            monthly_payment: account.monthly_payment,
            remaining_months: account.remaining_months,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebtSummary {
    #[schemars(description = "Outstanding balance across credit and loan accounts")]
    pub total_debt: f64,
    pub loan_balance: f64,
    pub monthly_payments: f64,
    pub credit_utilization: f64,
    /// Highest APR first.
    pub ranked: Vec<DebtAccount>,
    pub payoff_priority: Option<DebtAccount>,
}

pub fn net_worth(accounts: &[Account]) -> f64 {
    stable_sum(accounts.iter().map(|account| account.balance))
}

/// `|balance| / creditLimit * 100`, or 0 without a positive limit.
pub fn credit_utilization(account: &Account) -> f64 {
    match account.credit_limit {
        Some(limit) if limit > 0.0 => percentage_of(account.outstanding(), limit),
        _ => 0.0,
    }
}

fn credit_accounts(accounts: &[Account]) -> impl Iterator<Item = &Account> {
    accounts
        .iter()
        .filter(|account| account.account_type == AccountType::Credit)
}

/// Per-card utilization. Upstream `availableCredit` is ignored in favour of
/// the derived value; disagreements are logged.
pub fn credit_utilizations(accounts: &[Account]) -> Vec<CreditUtilization> {
    credit_accounts(accounts)
        .map(|account| {
            let available = account.available_credit().unwrap_or(0.0);
            if let Some(reported) = account.available_credit {
                if (reported - available).abs() > AVAILABLE_CREDIT_TOLERANCE {
                    warn!(
                        "Account {} reports available credit {:.2}, derived {:.2}; using derived",
                        account.id, reported, available
                    );
                }
            }

            CreditUtilization {
                account_id: account.id.clone(),
                used: account.outstanding(),
                limit: account.credit_limit.unwrap_or(0.0).max(0.0),
                available,
                utilization: credit_utilization(account),
            }
        })
        .collect()
}

/// Combined utilization across all credit accounts: total used over total limit.
pub fn aggregate_utilization(accounts: &[Account]) -> f64 {
    let used = stable_sum(credit_accounts(accounts).map(Account::outstanding));
    let limit = stable_sum(
        credit_accounts(accounts).map(|account| account.credit_limit.unwrap_or(0.0).max(0.0)),
    );
    if limit > 0.0 {
        percentage_of(used, limit)
    } else {
        0.0
    }
}

fn payoff_order(a: &DebtAccount, b: &DebtAccount) -> Ordering {
    b.apr
        .total_cmp(&a.apr)
        .then_with(|| b.outstanding.total_cmp(&a.outstanding))
}

/// Credit and loan accounts, highest APR first. Equal APRs put the larger
/// outstanding balance first.
pub fn rank_debts(accounts: &[Account]) -> Vec<DebtAccount> {
    let mut ranked: Vec<DebtAccount> = accounts
        .iter()
        .filter(|account| account.account_type.is_debt())
        .map(DebtAccount::from)
        .collect();
    ranked.sort_by(payoff_order);
    ranked
}

pub fn payoff_priority(accounts: &[Account]) -> Option<DebtAccount> {
    rank_debts(accounts).into_iter().next()
}

pub fn debt_summary(accounts: &[Account]) -> DebtSummary {
    let ranked = rank_debts(accounts);
    let total_debt = stable_sum(ranked.iter().map(|debt| debt.outstanding));
    let loan_balance = stable_sum(
        ranked
            .iter()
            .filter(|debt| debt.account_type == AccountType::Loan)
            .map(|debt| debt.outstanding),
    );
    let monthly_payments = stable_sum(ranked.iter().filter_map(|debt| debt.monthly_payment));

    DebtSummary {
        total_debt,
        loan_balance,
        monthly_payments,
        credit_utilization: aggregate_utilization(accounts),
        payoff_priority: ranked.first().cloned(),
        ranked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, account_type: AccountType, balance: f64) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            account_type,
            balance,
            credit_limit: None,
            apr: None,
            monthly_payment: None,
            remaining_months: None,
            available_credit: None,
        }
    }

    fn card(id: &str, balance: f64, limit: f64) -> Account {
        Account {
            credit_limit: Some(limit),
            ..account(id, AccountType::Credit, balance)
        }
    }

    fn with_apr(mut account: Account, apr: f64) -> Account {
        account.apr = Some(apr);
        account
    }

    #[test]
    fn test_credit_utilization() {
        assert!((credit_utilization(&card("c", -2450.0, 10000.0)) - 24.5).abs() < 0.01);
        assert_eq!(credit_utilization(&card("c", -500.0, 0.0)), 0.0);
        assert_eq!(credit_utilization(&card("c", -500.0, 500.0)), 100.0);
        assert_eq!(credit_utilization(&card("c", 500.0, 500.0)), 100.0);
        assert_eq!(
            credit_utilization(&account("c", AccountType::Credit, -10.0)),
            0.0
        );
    }

    #[test]
    fn test_aggregate_utilization() {
        let accounts = vec![
            card("a", -1000.0, 4000.0),
            card("b", -1000.0, 6000.0),
            account("chk", AccountType::Checking, 5000.0),
        ];
        assert!((aggregate_utilization(&accounts) - 20.0).abs() < 0.01);
        assert_eq!(aggregate_utilization(&[card("z", -10.0, 0.0)]), 0.0);
        assert_eq!(aggregate_utilization(&[]), 0.0);
    }

    #[test]
    fn test_credit_utilizations_derive_available_credit() {
        let mut quicksilver = card("acc_002", -2450.0, 10000.0);
        quicksilver.available_credit = Some(1.0);
        let rows = credit_utilizations(&[quicksilver]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].available, 7550.0);
        assert_eq!(rows[0].used, 2450.0);
    }

    #[test]
    fn test_rank_debts_by_apr() {
        let accounts = vec![
            with_apr(card("quicksilver", -2450.0, 10000.0), 18.99),
            with_apr(account("student", AccountType::Loan, -18500.0), 4.5),
            with_apr(account("auto", AccountType::Loan, -12800.0), 5.2),
            account("checking", AccountType::Checking, 48234.0),
        ];
        let aprs: Vec<f64> = rank_debts(&accounts).iter().map(|d| d.apr).collect();
        assert_eq!(aprs, vec![18.99, 5.2, 4.5]);
        assert_eq!(
            payoff_priority(&accounts).map(|d| d.account_id),
            Some("quicksilver".to_string())
        );
    }

    #[test]
    fn test_equal_apr_prefers_larger_balance() {
        let accounts = vec![
            with_apr(account("small", AccountType::Loan, -1000.0), 5.0),
            with_apr(account("large", AccountType::Loan, -2000.0), 5.0),
        ];
        let ranked = rank_debts(&accounts);
        assert_eq!(ranked[0].account_id, "large");
        assert_eq!(ranked[1].account_id, "small");
    }

    #[test]
    fn test_debt_summary() {
        let mut student = with_apr(account("student", AccountType::Loan, -18500.0), 4.5);
        student.monthly_payment = Some(285.0);
        let mut auto = with_apr(account("auto", AccountType::Loan, -12800.0), 5.2);
        auto.monthly_payment = Some(380.0);
        let accounts = vec![
            account("checking", AccountType::Checking, 48234.0),
            with_apr(card("quicksilver", -2450.0, 10000.0), 18.99),
            student,
            auto,
        ];

        let summary = debt_summary(&accounts);
        assert!((summary.total_debt - 33750.0).abs() < 0.01);
        assert!((summary.loan_balance - 31300.0).abs() < 0.01);
        assert!((summary.monthly_payments - 665.0).abs() < 0.01);
        assert!((summary.credit_utilization - 24.5).abs() < 0.01);
        assert_eq!(summary.ranked.len(), 3);
        assert_eq!(
            summary.payoff_priority.map(|d| d.account_id).as_deref(),
            Some("quicksilver")
        );
        assert!((net_worth(&accounts) - 14484.0).abs() < 0.01);
    }

    #[test]
    fn test_no_debt_accounts() {
        let summary = debt_summary(&[account("checking", AccountType::Checking, 10.0)]);
        assert!(summary.ranked.is_empty());
        assert!(summary.payoff_priority.is_none());
        assert_eq!(summary.total_debt, 0.0);
    }
}
