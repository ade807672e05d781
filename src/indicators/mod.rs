// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free series calculations. Each function returns one
// output per input close; rows that cannot be defined yet are `None` so
// callers are forced to handle warm-up and numerical edge cases.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
