use std::sync::Arc;

use tracing::info;

use crate::adapters::RestExchangeGateway;
use crate::config::ExchangeConfig;
use crate::error::Result;

use super::{ExchangeGateway, PaperExchange};

/// Create the runtime exchange gateway from `ExchangeConfig`.
///
/// `dry_run` (from the command line) overrides the configured value when set.
pub fn build_gateway(config: &ExchangeConfig, dry_run: bool) -> Result<Arc<dyn ExchangeGateway>> {
    if dry_run || config.dry_run {
        info!("Using paper exchange (dry run)");
        return Ok(Arc::new(PaperExchange::new()));
    }

    let gateway = RestExchangeGateway::new(config)?;
    info!("Using REST exchange gateway at {}", gateway.base_url());
    Ok(Arc::new(gateway))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dry_run: bool) -> ExchangeConfig {
        ExchangeConfig {
            rest_url: "http://localhost:9000".into(),
            timeout_ms: 1000,
            dry_run,
            api_key: None,
            api_secret: None,
        }
    }

    #[test]
    fn dry_run_selects_paper_exchange() {
        assert!(build_gateway(&config(true), false).unwrap().is_dry_run());
        assert!(build_gateway(&config(false), true).unwrap().is_dry_run());
    }

    #[test]
    fn live_config_selects_rest_gateway() {
        let gateway = build_gateway(&config(false), false).unwrap();
        assert!(!gateway.is_dry_run());
        assert_eq!(gateway.name(), "rest");
    }
}
