use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::context::{AdvisoryContext, AdvisoryRequest, ContextBudgeter};
use crate::error::{InsightsError, Result};

pub const ADVISOR_ROLE: &str = "You are a financial advisor AI analyzing a user's financial data. \
Provide helpful, conversational insights about their finances.";

pub const ADVISOR_GUIDANCE: &str = r#"Please provide a clear, actionable response focusing on:
1. Direct answer to the question
2. Key insights from the data
3. Practical recommendations
4. Any warnings or opportunities

Keep the response conversational and under 300 words."#;

/// Opaque text generation. The returned text is relayed to the user unmodified.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

impl<F> TextGenerator for F
where
    F: Fn(&str) -> Result<String>,
{
    fn generate(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// `1234567.891` -> `"1,234,567.89"`.
pub fn format_amount(amount: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, amount.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (formatted, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && formatted_is_nonzero(&grouped, fraction.as_deref()) {
        "-"
    } else {
        ""
    };

    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

fn formatted_is_nonzero(whole: &str, fraction: Option<&str>) -> bool {
    whole
        .chars()
        .chain(fraction.unwrap_or_default().chars())
        .any(|c| c.is_ascii_digit() && c != '0')
}

pub fn render_prompt(context: &AdvisoryContext, question: &str) -> Result<String> {
    let top_categories = serde_json::to_string_pretty(&context.top_categories)?;
    let recurring = serde_json::to_string_pretty(&context.recurring_expenses)?;

    Ok(format!(
        "{role}\n\n\
         Financial Data Context:\n\
         - Net Worth: ${net_worth}\n\
         - Monthly Income: ${income}\n\
         - Monthly Expenses: ${expenses}\n\
         - Top Expense Categories: {top_categories}\n\
         - Recurring Expenses: {recurring}\n\
         - Potential Monthly Savings: ${savings}\n\n\
         User Question: {question}\n\n\
         {guidance}\n",
        role = ADVISOR_ROLE,
        net_worth = format_amount(context.net_worth, 2),
        income = format_amount(context.monthly_income, 2),
        expenses = format_amount(context.monthly_expenses, 2),
        top_categories = top_categories,
        recurring = recurring,
        savings = format_amount(context.potential_savings, 0),
        question = question.trim(),
        guidance = ADVISOR_GUIDANCE,
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryAnswer {
    pub answer: String,
    pub context: AdvisoryContext,
}

pub struct Advisor<G> {
    generator: G,
    budgeter: ContextBudgeter,
}

impl<G: TextGenerator> Advisor<G> {
    pub fn new(generator: G, budgeter: ContextBudgeter) -> Self {
        Self {
            generator,
            budgeter,
        }
    }

    /// Ask a question about the request's snapshot.
    ///
    /// # Errors
    /// Input errors from the budgeter are returned before the generator is
    /// called. Generator failures surface as [`InsightsError::Generation`].
    pub fn ask(&self, request: &AdvisoryRequest) -> Result<AdvisoryAnswer> {
        let context = self.budgeter.build(request)?;
        let prompt = render_prompt(&context, &request.question)?;
        debug!("Advisor prompt is {} bytes", prompt.len());

        let answer = self.generator.generate(&prompt).map_err(|e| match e {
            InsightsError::Generation(_) => e,
            other => InsightsError::Generation(other.to_string()),
        })?;

        info!("Advisor answered with {} characters", answer.chars().count());
        Ok(AdvisoryAnswer { answer, context })
    }
}
