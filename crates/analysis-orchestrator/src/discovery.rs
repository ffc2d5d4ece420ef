use analysis_core::{AnalysisError, TickerResolver};
use cvm_client::{CompanyRegistry, TickerRegistry};
use std::collections::BTreeSet;

/// Tickers of the active companies sharing the target's sector, excluding
/// the target itself. Companies without a known ticker are skipped.
pub fn sector_peers(
    target: &str,
    tickers: &TickerRegistry,
    registry: &CompanyRegistry,
) -> Result<Vec<String>, AnalysisError> {
    let target = target.trim().to_uppercase();
    let target_id = tickers
        .resolve_identifier(&target)
        .ok_or_else(|| AnalysisError::TargetUnresolved(target.clone()))?;
    let sector = registry.sector_of(&target_id).ok_or_else(|| {
        AnalysisError::MissingData(format!("no active sector registered for {}", target))
    })?;

    let companies = registry.companies_in_sector(sector);
    let peers: BTreeSet<String> = companies
        .iter()
        .filter(|c| c.registry_id != target_id)
        .filter_map(|c| tickers.ticker_for(&c.registry_id))
        .map(str::to_string)
        .collect();

    tracing::info!(
        "Sector '{}': {} active companies, {} with tickers",
        sector,
        companies.len(),
        peers.len()
    );
    Ok(peers.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (TickerRegistry, CompanyRegistry) {
        let tickers = TickerRegistry::from_reader(
            "1;AAAA3;Alfa\n2;BBBB3;Beta\n2;BBBB4;Beta\n4;DDDD3;Delta\n".as_bytes(),
        )
        .unwrap();
        let registry = CompanyRegistry::from_text(
            "CNPJ_CIA;DENOM_SOCIAL;DENOM_COMERC;SIT;SETOR_ATIV\n\
             1;ALFA SA;ALFA;ATIVO;Energia\n\
             2;BETA SA;BETA;ATIVO;Energia\n\
             3;GAMA SA;GAMA;ATIVO;Energia\n\
             4;DELTA SA;DELTA;ATIVO;Bancos\n",
        )
        .unwrap();
        (tickers, registry)
    }

    #[test]
    fn test_sector_peers() {
        let (tickers, registry) = fixtures();
        let peers = sector_peers("aaaa3", &tickers, &registry).unwrap();
        assert_eq!(peers, vec!["BBBB3"]);
    }

    #[test]
    fn test_unknown_target() {
        let (tickers, registry) = fixtures();
        assert!(matches!(
            sector_peers("ZZZZ3", &tickers, &registry),
            Err(AnalysisError::TargetUnresolved(_))
        ));
    }
}
