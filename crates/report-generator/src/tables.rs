use analysis_core::{AnalysisError, CreditReport, IndicatorTable};
use std::path::{Path, PathBuf};

/// Persists the peer tables as `;`-delimited CSV.
pub struct TableWriter {
    dir: PathBuf,
}

impl TableWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn full_path(&self, target: &str, year: i32) -> PathBuf {
        self.dir
            .join(format!("peer_report_{}_{}_full.csv", target.to_uppercase(), year))
    }

    pub fn comparison_path(&self, target: &str, year: i32) -> PathBuf {
        self.dir
            .join(format!("peer_report_{}_{}_comparison.csv", target.to_uppercase(), year))
    }

    /// Write both tables of `report`; returns (full, comparison) paths.
    pub fn write(&self, report: &CreditReport) -> Result<(PathBuf, PathBuf), AnalysisError> {
        std::fs::create_dir_all(&self.dir)?;
        let full = self.full_path(&report.target, report.year);
        let comparison = self.comparison_path(&report.target, report.year);
        write_table(&full, &report.full)?;
        write_table(&comparison, &report.comparison)?;
        tracing::info!(
            "Peer tables written to {} and {}",
            full.display(),
            comparison.display()
        );
        Ok((full, comparison))
    }
}

/// Rows are indicator keys; undefined values are left empty.
pub fn write_table(path: &Path, table: &IndicatorTable) -> Result<(), AnalysisError> {
    let csv_err = |e: csv::Error| AnalysisError::InvalidData(format!("{}: {}", path.display(), e));
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(csv_err)?;

    let mut header = vec![table.index_name.clone()];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header).map_err(csv_err)?;

    for row in &table.rows {
        let mut record = vec![row.indicator.key().to_string()];
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}
