mod cipher;
mod money;

pub mod op;
mod rate;
mod secret;

pub use cipher::{CipherError, FieldCipher};
pub use money::{Money, MoneyConversionError};
pub use rate::{Rate, RateParseError, SpreadPercent};
pub use secret::Secret;
