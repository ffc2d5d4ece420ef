use analysis_core::text::{decode_latin1, strip_bom};
use analysis_core::{AnalysisError, TickerResolver};
use std::collections::HashMap;
use std::path::Path;

/// Ticker <-> registry id map, loaded once from a headerless `;` file with
/// columns (registry id, ticker, company name).
#[derive(Debug, Clone, Default)]
pub struct TickerRegistry {
    by_ticker: HashMap<String, String>,
    by_id: HashMap<String, String>,
    names: HashMap<String, String>,
}

impl TickerRegistry {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Io(std::io::Error::new(
                e.kind(),
                format!("ticker map {}: {}", path.display(), e),
            ))
        })?;
        let registry = Self::from_reader(strip_bom(&raw).as_bytes())?;
        tracing::info!(
            "Loaded {} tickers from {}",
            registry.by_ticker.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, AnalysisError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut registry = Self::default();
        for record in rdr.records() {
            let record = record.map_err(|e| AnalysisError::InvalidData(e.to_string()))?;
            let id = record.get(0).map(str::trim).unwrap_or_default();
            let ticker = record
                .get(1)
                .map(|t| t.trim().to_uppercase())
                .unwrap_or_default();
            if id.is_empty() || ticker.is_empty() {
                continue;
            }
            let name = record.get(2).map(str::trim).unwrap_or_default();

            // First occurrence wins in both directions
            registry
                .by_ticker
                .entry(ticker.clone())
                .or_insert_with(|| id.to_string());
            registry
                .by_id
                .entry(id.to_string())
                .or_insert_with(|| ticker.clone());
            registry
                .names
                .entry(ticker)
                .or_insert_with(|| name.to_string());
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.by_ticker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }

    pub fn ticker_for(&self, registry_id: &str) -> Option<&str> {
        self.by_id.get(registry_id.trim()).map(String::as_str)
    }

    pub fn company_name(&self, ticker: &str) -> Option<&str> {
        self.names
            .get(&ticker.trim().to_uppercase())
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }

    /// All known tickers, sorted.
    pub fn tickers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.by_ticker.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }
}

impl TickerResolver for TickerRegistry {
    fn resolve_identifier(&self, symbol: &str) -> Option<String> {
        let found = self.by_ticker.get(&symbol.trim().to_uppercase()).cloned();
        if found.is_none() {
            tracing::warn!("Ticker {} not found in ticker map", symbol);
        }
        found
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredCompany {
    pub registry_id: String,
    pub name: String,
    pub sector: Option<String>,
}

/// Active companies from the regulator's `cad_cia_aberta.csv`.
#[derive(Debug, Clone, Default)]
pub struct CompanyRegistry {
    companies: Vec<RegisteredCompany>,
}

impl CompanyRegistry {
    /// Parse a Latin-1 registry file, keeping only rows with `SIT == ATIVO`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let bytes = std::fs::read(path.as_ref())?;
        let registry = Self::from_text(&decode_latin1(&bytes))?;
        tracing::info!(
            "Company registry loaded: {} active companies",
            registry.companies.len()
        );
        Ok(registry)
    }

    pub fn from_text(text: &str) -> Result<Self, AnalysisError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| AnalysisError::InvalidData(e.to_string()))?
            .clone();
        let col = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| AnalysisError::MissingColumn(format!("{name} in company registry")))
        };
        let id_col = col("CNPJ_CIA")?;
        let status_col = col("SIT")?;
        let sector_col = col("SETOR_ATIV")?;
        let social_col = col("DENOM_SOCIAL")?;
        let trade_col = headers.iter().position(|h| h.trim() == "DENOM_COMERC");

        let mut companies = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| AnalysisError::InvalidData(e.to_string()))?;
            let field = |i: usize| record.get(i).map(str::trim).unwrap_or_default();

            if field(status_col) != "ATIVO" {
                continue;
            }
            let trade_name = trade_col.map(field).unwrap_or_default();
            let name = if trade_name.is_empty() {
                field(social_col)
            } else {
                trade_name
            };
            let sector = Some(field(sector_col))
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            companies.push(RegisteredCompany {
                registry_id: field(id_col).to_string(),
                name: name.to_string(),
                sector,
            });
        }
        Ok(Self { companies })
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    pub fn sector_of(&self, registry_id: &str) -> Option<&str> {
        let found = self
            .companies
            .iter()
            .find(|c| c.registry_id == registry_id)
            .and_then(|c| c.sector.as_deref());
        if found.is_none() {
            tracing::warn!("Registry id {} not found among active companies", registry_id);
        }
        found
    }

    pub fn companies_in_sector(&self, sector: &str) -> Vec<&RegisteredCompany> {
        self.companies
            .iter()
            .filter(|c| c.sector.as_deref() == Some(sector))
            .collect()
    }
}
