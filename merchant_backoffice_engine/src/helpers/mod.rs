use crate::db_types::CurrencyCode;

/// The currency pair a merchant operates in, derived from where they are registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyProfile {
    pub dashboard_currency: CurrencyCode,
    pub payout_currency: CurrencyCode,
}

/// Derives the dashboard and payout currencies for a merchant profile. Called by the upstream
/// profile service before persisting; nothing in this engine mutates currencies as a side
/// effect of a save.
///
/// Brazilian merchants operate in BRL, everyone else in USD. Merchants selling internationally
/// are paid out in USD regardless of where they dashboard.
pub fn derive_currency_profile(country: &str, sells_internationally: bool) -> CurrencyProfile {
    let dashboard_currency: CurrencyCode = if is_brazil(country) { "BRL".into() } else { "USD".into() };
    let payout_currency: CurrencyCode =
        if sells_internationally { "USD".into() } else { dashboard_currency.clone() };
    CurrencyProfile { dashboard_currency, payout_currency }
}

fn is_brazil(country: &str) -> bool {
    matches!(country.trim().to_ascii_uppercase().as_str(), "BR" | "BRA" | "BRAZIL" | "BRASIL")
}

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn brazilian_merchants_dashboard_in_brl() {
        let profile = derive_currency_profile("Brazil", false);
        assert_eq!(profile.dashboard_currency, "BRL".into());
        assert_eq!(profile.payout_currency, "BRL".into());
        let profile = derive_currency_profile("br", false);
        assert_eq!(profile.dashboard_currency, "BRL".into());
    }

    #[test]
    fn everyone_else_dashboards_in_usd() {
        for country in ["US", "Portugal", "JP", ""] {
            let profile = derive_currency_profile(country, false);
            assert_eq!(profile.dashboard_currency, "USD".into());
        }
    }

    #[test]
    fn international_sellers_pay_out_in_usd() {
        let profile = derive_currency_profile("Brazil", true);
        assert_eq!(profile.dashboard_currency, "BRL".into());
        assert_eq!(profile.payout_currency, "USD".into());
    }

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("yes".to_string()), false));
        assert!(!parse_boolean_flag(Some("off".to_string()), true));
        assert!(parse_boolean_flag(None, true));
        assert!(!parse_boolean_flag(Some("maybe".to_string()), false));
    }
}
