//! The scheduled reserve release job.
//!
//! Once a day, after the configured UTC hour, every active merchant holding reserve funds gets
//! up to the configured cap released into their available bucket. The release amount is a flat
//! cap per run; deposits are not aged individually. Merchants that fail are skipped and picked
//! up again by the next day's run.

use chrono::{NaiveDate, Timelike, Utc};
use log::*;
use tokio::task::JoinHandle;

use crate::{
    events::EventProducers,
    mbe_api::{settings_api::keys, BalanceApi, SettingsApi},
    traits::{BalanceManagement, ExchangeRates, SettingsManagement},
};

pub const DEFAULT_RELEASE_HOUR_UTC: u32 = 6;

/// How often the worker wakes up to check whether today's sweep is due.
const CHECK_INTERVAL_SECS: u64 = 60;

/// Starts the reserve release worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
pub fn start_reserve_release_worker<B>(db: B, producers: EventProducers) -> JoinHandle<()>
where B: BalanceManagement + ExchangeRates + SettingsManagement + Clone + Send + Sync + 'static {
    tokio::spawn(async move {
        let settings = SettingsApi::new(db.clone());
        let api = BalanceApi::new(db, producers);
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(CHECK_INTERVAL_SECS));
        let mut last_run: Option<NaiveDate> = None;
        info!("🕰️ Reserve release worker started");
        loop {
            timer.tick().await;
            let now = Utc::now();
            if last_run == Some(now.date_naive()) {
                continue;
            }
            let release_hour = match settings.get_int(keys::RESERVE_RELEASE_HOUR_UTC).await {
                Ok(Some(hour)) if (0..24).contains(&hour) => hour as u32,
                Ok(_) => DEFAULT_RELEASE_HOUR_UTC,
                Err(e) => {
                    warn!("🕰️ Could not read the release hour setting: {e}. Using the default");
                    DEFAULT_RELEASE_HOUR_UTC
                },
            };
            if now.hour() < release_hour {
                continue;
            }
            info!("🕰️ Running the daily reserve release sweep");
            let reference = sweep_reference(now.date_naive());
            match api.run_release_sweep(&reference).await {
                Ok(_) => {
                    // Per-merchant failures are already counted and logged inside the sweep;
                    // the day still counts as run so they retry tomorrow.
                    last_run = Some(now.date_naive());
                },
                Err(e) => {
                    error!("🕰️ The reserve release sweep could not run: {e}. Will retry shortly");
                },
            }
        }
    })
}

/// The reference every release of a given day's sweep is tagged with.
pub fn sweep_reference(date: NaiveDate) -> String {
    format!("scheduled-release:{date}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sweep_references_are_dated() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        assert_eq!(sweep_reference(date), "scheduled-release:2024-06-12");
    }
}
