//! Tunable game rules.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Money and lobby rules applied to every room created by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRules {
    /// Minimum players needed before the host may start
    pub min_players: usize,
    /// Maximum players a room accepts
    pub max_players: usize,
    /// Cash each player holds when the game starts
    pub starting_balance: i64,
    /// Income paid on every PAYDAY before credit payments
    pub monthly_income: i64,
    /// Credit is taken and repaid in multiples of this amount
    pub credit_step: i64,
    /// Monthly payment added per credit step
    pub credit_payment_per_step: i64,
    /// Credit limit is `monthly_income * credit_limit_multiplier`
    pub credit_limit_multiplier: i64,
}

impl GameRules {
    pub fn validate(self) -> Result<Self, DomainError> {
        if self.min_players == 0 || self.min_players > self.max_players {
            return Err(DomainError::validation(
                "min_players must be between 1 and max_players",
            ));
        }
        if self.starting_balance < 0 || self.monthly_income < 0 {
            return Err(DomainError::validation(
                "starting_balance and monthly_income cannot be negative",
            ));
        }
        if self.credit_step <= 0 || self.credit_payment_per_step < 0 {
            return Err(DomainError::validation("credit_step must be positive"));
        }
        Ok(self)
    }

    /// Maximum credit a player may hold.
    pub fn max_credit(&self) -> i64 {
        self.monthly_income.saturating_mul(self.credit_limit_multiplier)
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 6,
            starting_balance: 3000,
            monthly_income: 3000,
            credit_step: 1000,
            credit_payment_per_step: 100,
            credit_limit_multiplier: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let rules = GameRules::default().validate().unwrap();
        assert_eq!(rules.max_credit(), 30_000);
    }

    #[test]
    fn min_above_max_rejected() {
        let rules = GameRules {
            min_players: 7,
            ..GameRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn zero_credit_step_rejected() {
        let rules = GameRules {
            credit_step: 0,
            ..GameRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
