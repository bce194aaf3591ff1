pub mod api;
pub mod bet;
pub mod outcome;
pub mod round;

pub use bet::{
    normalize, Bet, BetError, BetRequest, BetType, Multiplier, PayoutRatio, PayoutTable, Selection,
    SettlementState,
};
pub use outcome::{classify, ClassifyError, Color, Outcome, Size};
pub use round::{GameMode, Round, RoundError, RoundId, RoundStatus};

/// Currency amount in minor units (e.g. paise).
pub type Amount = u64;
