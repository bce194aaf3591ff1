use crate::outcome::{Color, Outcome, Size};
use crate::round::RoundId;
use crate::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for bet construction and validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BetError {
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("invalid stake or multiplier: {0}")]
    InvalidStakeOrMultiplier(String),
}

/// Kind of wager. Exactly one choice field is populated, matching the type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Color,
    Number,
    BigSmall,
}

/// The user's chosen value, tagged by bet type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Selection {
    Color(Color),
    Number(u8),
    Size(Size),
}

impl Selection {
    pub fn bet_type(&self) -> BetType {
        match self {
            Selection::Color(_) => BetType::Color,
            Selection::Number(_) => BetType::Number,
            Selection::Size(_) => BetType::BigSmall,
        }
    }

    /// Whether this selection wins against a settled outcome.
    pub fn wins_against(&self, outcome: &Outcome) -> bool {
        match self {
            Selection::Number(n) => *n == outcome.number,
            Selection::Color(c) => outcome.has_color(*c),
            Selection::Size(s) => *s == outcome.size,
        }
    }
}

/// Stake multiplier, restricted to the fixed set {1, 5, 10, 20, 50, 100}.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Multiplier {
    X1,
    X5,
    X10,
    X20,
    X50,
    X100,
}

impl Multiplier {
    pub const ALL: [Multiplier; 6] = [
        Multiplier::X1,
        Multiplier::X5,
        Multiplier::X10,
        Multiplier::X20,
        Multiplier::X50,
        Multiplier::X100,
    ];

    pub fn value(&self) -> u32 {
        match self {
            Multiplier::X1 => 1,
            Multiplier::X5 => 5,
            Multiplier::X10 => 10,
            Multiplier::X20 => 20,
            Multiplier::X50 => 50,
            Multiplier::X100 => 100,
        }
    }
}

impl From<Multiplier> for u32 {
    fn from(multiplier: Multiplier) -> u32 {
        multiplier.value()
    }
}

impl TryFrom<u32> for Multiplier {
    type Error = BetError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Multiplier::X1),
            5 => Ok(Multiplier::X5),
            10 => Ok(Multiplier::X10),
            20 => Ok(Multiplier::X20),
            50 => Ok(Multiplier::X50),
            100 => Ok(Multiplier::X100),
            other => Err(BetError::InvalidStakeOrMultiplier(format!(
                "multiplier {other} not in {{1,5,10,20,50,100}}"
            ))),
        }
    }
}

/// Canonical bet payload submitted to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRequest {
    pub round_id: RoundId,
    pub bet_type: BetType,
    pub selection: Selection,
    pub stake: Amount,
    pub multiplier: Multiplier,
    /// stake x multiplier. Advisory only; the backend recomputes and
    /// enforces the authoritative total.
    pub total_amount: Amount,
}

/// Validate a UI selection and produce the canonical bet payload.
///
/// Pure transformation; nothing is submitted here.
pub fn normalize(
    selection: Selection,
    stake: Amount,
    multiplier: Multiplier,
    round_id: RoundId,
) -> Result<BetRequest, BetError> {
    if stake == 0 {
        return Err(BetError::InvalidStakeOrMultiplier(
            "stake must be positive".to_string(),
        ));
    }
    if let Selection::Number(n) = selection {
        if n > 9 {
            return Err(BetError::InvalidSelection(format!(
                "number {n} out of range 0-9"
            )));
        }
    }
    let total_amount = stake
        .checked_mul(multiplier.value() as Amount)
        .ok_or_else(|| {
            BetError::InvalidStakeOrMultiplier("total amount overflows".to_string())
        })?;
    Ok(BetRequest {
        round_id,
        bet_type: selection.bet_type(),
        selection,
        stake,
        multiplier,
        total_amount,
    })
}

/// Settlement state of a placed bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettlementState {
    Pending,
    Won { payout: Amount },
    Lost,
}

/// One persisted wager against a specific round. Append-only history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: u64,
    pub round_id: RoundId,
    pub bet_type: BetType,
    pub selection: Selection,
    pub stake: Amount,
    pub multiplier: Multiplier,
    pub total_amount: Amount,
    pub settlement: SettlementState,
}

impl Bet {
    /// Resolve this bet against a settled outcome, computing the payout from
    /// the configured ratio table.
    pub fn settle(&mut self, outcome: &Outcome, table: &PayoutTable) {
        self.settlement = if self.selection.wins_against(outcome) {
            SettlementState::Won {
                payout: table.ratio_for(self.bet_type).payout_of(self.total_amount),
            }
        } else {
            SettlementState::Lost
        };
    }
}

/// Payout ratio in hundredths (e.g. 200 = 2.00x the wagered total).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRatio(pub u32);

impl PayoutRatio {
    pub fn payout_of(&self, total: Amount) -> Amount {
        total.saturating_mul(self.0 as Amount) / 100
    }
}

/// Payout ratios keyed by bet type. A backend business rule: there are no
/// default values, the table must be supplied by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutTable {
    pub number: PayoutRatio,
    pub color: PayoutRatio,
    pub big_small: PayoutRatio,
}

impl PayoutTable {
    pub fn ratio_for(&self, bet_type: BetType) -> PayoutRatio {
        match bet_type {
            BetType::Number => self.number,
            BetType::Color => self.color,
            BetType::BigSmall => self.big_small,
        }
    }
}
