//! Bank accounts and the transfer log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::TransferId;
use crate::value_objects::GameRules;

/// A player's money.
///
/// # Invariants
///
/// - `balance >= 0`
/// - `0 <= credit <= max_credit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub balance: i64,
    pub total_income: i64,
    pub total_expenses: i64,
    pub monthly_income: i64,
    pub credit: i64,
    pub max_credit: i64,
}

impl BankAccount {
    /// Account handed to every player when the host starts the game.
    pub fn starting(rules: &GameRules) -> Self {
        Self {
            balance: rules.starting_balance,
            total_income: 0,
            total_expenses: 0,
            monthly_income: rules.monthly_income,
            credit: 0,
            max_credit: rules.max_credit(),
        }
    }

    /// Add money received from another player or the bank.
    pub fn deposit(&mut self, amount: i64) -> Result<(), DomainError> {
        ensure_positive(amount)?;
        self.balance = self.balance.saturating_add(amount);
        self.total_income = self.total_income.saturating_add(amount);
        Ok(())
    }

    /// Remove money, failing when the balance would go negative.
    pub fn withdraw(&mut self, amount: i64) -> Result<(), DomainError> {
        ensure_positive(amount)?;
        if amount > self.balance {
            return Err(DomainError::insufficient_funds(self.balance, amount));
        }
        self.balance -= amount;
        self.total_expenses = self.total_expenses.saturating_add(amount);
        Ok(())
    }

    /// PAYDAY: credit one month of income.
    ///
    /// Monthly income can drop to zero or below under heavy credit; a
    /// non-positive payday is recorded as an expense instead of an income.
    pub fn payday(&mut self) {
        let income = self.monthly_income;
        if income >= 0 {
            self.balance = self.balance.saturating_add(income);
            self.total_income = self.total_income.saturating_add(income);
        } else {
            let charge = income.saturating_neg().min(self.balance);
            self.balance -= charge;
            self.total_expenses = self.total_expenses.saturating_add(charge);
        }
    }

    pub fn take_credit(&mut self, amount: i64, rules: &GameRules) -> Result<(), DomainError> {
        ensure_step(amount, rules)?;
        if self.credit.saturating_add(amount) > self.max_credit {
            return Err(DomainError::constraint(format!(
                "Credit limit exceeded: {} of {} already used",
                self.credit, self.max_credit
            )));
        }
        self.credit += amount;
        self.balance = self.balance.saturating_add(amount);
        self.monthly_income -= amount / rules.credit_step * rules.credit_payment_per_step;
        Ok(())
    }

    pub fn payoff_credit(&mut self, amount: i64, rules: &GameRules) -> Result<(), DomainError> {
        ensure_step(amount, rules)?;
        if amount > self.credit {
            return Err(DomainError::constraint(format!(
                "Cannot pay off {} with only {} credit outstanding",
                amount, self.credit
            )));
        }
        if amount > self.balance {
            return Err(DomainError::insufficient_funds(self.balance, amount));
        }
        self.credit -= amount;
        self.balance -= amount;
        self.monthly_income += amount / rules.credit_step * rules.credit_payment_per_step;
        Ok(())
    }
}

impl Default for BankAccount {
    fn default() -> Self {
        Self {
            balance: 0,
            total_income: 0,
            total_expenses: 0,
            monthly_income: 0,
            credit: 0,
            max_credit: 0,
        }
    }
}

fn ensure_positive(amount: i64) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::validation("Amount must be positive"));
    }
    Ok(())
}

fn ensure_step(amount: i64, rules: &GameRules) -> Result<(), DomainError> {
    ensure_positive(amount)?;
    if amount % rules.credit_step != 0 {
        return Err(DomainError::validation(format!(
            "Credit amount must be a multiple of {}",
            rules.credit_step
        )));
    }
    Ok(())
}

/// One money movement between two players, appended to the room's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: TransferId,
    pub sender_index: usize,
    pub recipient_index: usize,
    pub amount: i64,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}
