//! # The engine public API
//!
//! Typed wrappers over the storage traits. The HTTP layer (out of this crate's hands) calls
//! these, never the database modules directly.
pub mod balance_api;
pub mod errors;
pub mod fx_api;
pub mod settings_api;
pub mod verification_api;

pub use balance_api::{BalanceApi, SweepResult};
pub use errors::{FxApiError, LedgerError};
pub use fx_api::{Conversion, FxApi};
pub use settings_api::{keys as setting_keys, validate_spread, SettingsApi};
pub use verification_api::VerificationApi;
