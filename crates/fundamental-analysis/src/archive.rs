use analysis_core::text::{decode_latin1, parse_amount};
use analysis_core::{AnalysisError, DocumentType, ScaleUnit, StatementKind, StatementRow, StatementVariant};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// How a statement table is read out of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Decode and filter row by row straight from the zip entry.
    #[default]
    Streaming,
    /// Inflate the whole entry into memory, then filter.
    Materialized,
}

/// An opened yearly filing archive.
pub struct FilingArchive {
    path: PathBuf,
    year: i32,
    document_type: DocumentType,
    zip: ZipArchive<BufReader<File>>,
    /// lowercase entry name -> stored entry name
    entries: HashMap<String, String>,
}

struct Columns {
    entity: usize,
    period: usize,
    account: usize,
    amount: usize,
    scale: Option<usize>,
}

impl FilingArchive {
    pub fn open(path: impl AsRef<Path>, year: i32, document_type: DocumentType) -> Result<Self, AnalysisError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let zip = ZipArchive::new(BufReader::new(file))
            .map_err(|e| AnalysisError::Archive(format!("{}: {}", path.display(), e)))?;
        let entries = zip
            .file_names()
            .map(|name| (name.to_lowercase(), name.to_string()))
            .collect();

        tracing::debug!("Opened archive {} ({} entries)", path.display(), zip.len());
        Ok(Self {
            path,
            year,
            document_type,
            zip,
            entries,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// e.g. `dfp_cia_aberta_bpa_con_2023.csv`
    pub fn entry_name(&self, kind: StatementKind, variant: StatementVariant) -> String {
        format!(
            "{}_cia_aberta_{}_{}_{}.csv",
            self.document_type.code(),
            kind.code(),
            variant.code(),
            self.year
        )
        .to_lowercase()
    }

    pub fn has_statement(&self, kind: StatementKind, variant: StatementVariant) -> bool {
        self.entries.contains_key(&self.entry_name(kind, variant))
    }

    /// Rows of one statement belonging to `entity_id` for the period marked
    /// `period_marker`. A statement absent from the archive yields no rows.
    pub fn read_filtered(
        &mut self,
        kind: StatementKind,
        variant: StatementVariant,
        entity_id: &str,
        period_marker: &str,
        mode: ScanMode,
    ) -> Result<Vec<StatementRow>, AnalysisError> {
        let key = self.entry_name(kind, variant);
        let Some(stored) = self.entries.get(&key).cloned() else {
            tracing::debug!("Archive {} has no entry {}", self.path.display(), key);
            return Ok(Vec::new());
        };

        let entry = self
            .zip
            .by_name(&stored)
            .map_err(|e| AnalysisError::Archive(format!("{}: {}", stored, e)))?;

        match mode {
            ScanMode::Streaming => filter_rows(entry, &stored, entity_id, period_marker),
            ScanMode::Materialized => {
                let mut bytes = Vec::new();
                let mut entry = entry;
                entry.read_to_end(&mut bytes)?;
                filter_rows(bytes.as_slice(), &stored, entity_id, period_marker)
            }
        }
    }
}

fn filter_rows<R: Read>(
    reader: R,
    entry: &str,
    entity_id: &str,
    period_marker: &str,
) -> Result<Vec<StatementRow>, AnalysisError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .byte_headers()
        .map_err(|e| AnalysisError::Archive(format!("{}: {}", entry, e)))?
        .clone();
    let columns = Columns::locate(&headers, entry)?;

    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while rdr
        .read_byte_record(&mut record)
        .map_err(|e| AnalysisError::Archive(format!("{}: {}", entry, e)))?
    {
        let field = |i: usize| decode_latin1(record.get(i).unwrap_or_default());

        if field(columns.entity).trim() != entity_id {
            continue;
        }
        if field(columns.period).trim() != period_marker {
            continue;
        }

        let account_code = field(columns.account).trim().to_string();
        let raw_amount = field(columns.amount);
        let amount = parse_amount(&raw_amount);
        if amount.is_none() {
            tracing::debug!(
                "{}: account {} has non-numeric amount '{}'",
                entry,
                account_code,
                raw_amount
            );
        }
        let scale = columns.scale.and_then(|i| ScaleUnit::parse(&field(i)));

        rows.push(StatementRow {
            account_code,
            amount,
            scale,
        });
    }
    Ok(rows)
}

impl Columns {
    fn locate(headers: &csv::ByteRecord, entry: &str) -> Result<Self, AnalysisError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| decode_latin1(h.strip_prefix(UTF8_BOM).unwrap_or(h)).trim().to_string())
            .collect();
        let find = |name: &str| names.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| AnalysisError::MissingColumn(format!("{} in {}", name, entry)))
        };

        Ok(Self {
            entity: require("CNPJ_CIA")?,
            period: require("ORDEM_EXERC")?,
            account: require("CD_CONTA")?,
            amount: require("VL_CONTA")?,
            scale: find("ESCALA_MOEDA"),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::Path;

    pub const HEADER: &str = "CNPJ_CIA;DENOM_CIA;ESCALA_MOEDA;ORDEM_EXERC;CD_CONTA;DS_CONTA;VL_CONTA";

    /// Encode test text as Latin-1, the archive's encoding.
    pub fn latin1(text: &str) -> Vec<u8> {
        text.chars().map(|c| c as u32 as u8).collect()
    }

    pub fn row(id: &str, scale: &str, period: &str, code: &str, amount: &str) -> String {
        format!("{id};COMPANY;{scale};{period};{code};ACCOUNT;{amount}")
    }

    pub fn table(rows: &[String]) -> Vec<u8> {
        let mut text = String::from(HEADER);
        for r in rows {
            text.push('\n');
            text.push_str(r);
        }
        text.push('\n');
        latin1(&text)
    }

    pub fn write_zip(path: &Path, entries: &[(String, Vec<u8>)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, bytes) in entries {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    const ID: &str = "11.111.111/0001-11";

    fn archive_with(entries: &[(String, Vec<u8>)]) -> (tempfile::TempDir, FilingArchive) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dfp_cia_aberta_2023.zip");
        write_zip(&path, entries);
        let archive = FilingArchive::open(&path, 2023, DocumentType::Dfp).unwrap();
        (dir, archive)
    }

    fn sample_bpa() -> Vec<u8> {
        table(&[
            row(ID, "MIL", "PENÚLTIMO", "1", "900"),
            row(ID, "MIL", "ÚLTIMO", "1", "1000"),
            row(ID, "MIL", "ÚLTIMO", "1.01", "400,5"),
            row("22.222.222/0001-22", "MIL", "ÚLTIMO", "1", "50"),
        ])
    }

    #[test]
    fn test_filters_entity_and_final_period() {
        let (_dir, mut archive) =
            archive_with(&[("dfp_cia_aberta_BPA_con_2023.csv".to_string(), sample_bpa())]);

        let rows = archive
            .read_filtered(
                StatementKind::Assets,
                StatementVariant::Consolidated,
                ID,
                "ÚLTIMO",
                ScanMode::Streaming,
            )
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].account_code, "1");
        assert_eq!(rows[0].amount, Some(1000.0));
        assert_eq!(rows[0].scale, Some(ScaleUnit::Thousand));
        assert_eq!(rows[1].amount, Some(400.5));
    }

    #[test]
    fn test_entry_names_are_case_insensitive() {
        let (_dir, archive) =
            archive_with(&[("DFP_CIA_ABERTA_BPA_CON_2023.CSV".to_string(), sample_bpa())]);
        assert!(archive.has_statement(StatementKind::Assets, StatementVariant::Consolidated));
        assert!(!archive.has_statement(StatementKind::Assets, StatementVariant::Standalone));
    }

    #[test]
    fn test_missing_entry_yields_no_rows() {
        let (_dir, mut archive) =
            archive_with(&[("dfp_cia_aberta_bpa_con_2023.csv".to_string(), sample_bpa())]);
        let rows = archive
            .read_filtered(
                StatementKind::Income,
                StatementVariant::Consolidated,
                ID,
                "ÚLTIMO",
                ScanMode::Streaming,
            )
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_scan_modes_agree() {
        let (_dir, mut archive) =
            archive_with(&[("dfp_cia_aberta_bpa_con_2023.csv".to_string(), sample_bpa())]);
        let mut read = |mode| {
            archive
                .read_filtered(
                    StatementKind::Assets,
                    StatementVariant::Consolidated,
                    ID,
                    "ÚLTIMO",
                    mode,
                )
                .unwrap()
        };
        let streamed = read(ScanMode::Streaming);
        let materialized = read(ScanMode::Materialized);
        assert_eq!(streamed, materialized);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let bytes = latin1("CNPJ_CIA;ORDEM_EXERC;VL_CONTA\n1;ÚLTIMO;10\n");
        let (_dir, mut archive) =
            archive_with(&[("dfp_cia_aberta_dre_con_2023.csv".to_string(), bytes)]);
        let err = archive
            .read_filtered(
                StatementKind::Income,
                StatementVariant::Consolidated,
                "1",
                "ÚLTIMO",
                ScanMode::Streaming,
            )
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn(_)));
    }

    #[test]
    fn test_non_numeric_amount_keeps_row() {
        let bytes = table(&[
            row(ID, "MIL", "ÚLTIMO", "3.99.01", ""),
            row(ID, "MIL", "ÚLTIMO", "3.11", "n/a"),
            row(ID, "MIL", "ÚLTIMO", "3.01", "42"),
        ]);
        let (_dir, mut archive) =
            archive_with(&[("dfp_cia_aberta_dre_con_2023.csv".to_string(), bytes)]);
        let rows = archive
            .read_filtered(
                StatementKind::Income,
                StatementVariant::Consolidated,
                ID,
                "ÚLTIMO",
                ScanMode::Streaming,
            )
            .unwrap();
        let amounts: Vec<Option<f64>> = rows.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![None, None, Some(42.0)]);
    }

    #[test]
    fn test_utf8_bom_on_header() {
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend(table(&[row(ID, "MIL", "ÚLTIMO", "1", "10")]));
        let (_dir, mut archive) =
            archive_with(&[("dfp_cia_aberta_bpa_con_2023.csv".to_string(), bytes)]);
        let rows = archive
            .read_filtered(
                StatementKind::Assets,
                StatementVariant::Consolidated,
                ID,
                "ÚLTIMO",
                ScanMode::Streaming,
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, Some(10.0));
    }

    #[test]
    fn test_corrupt_archive_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"not a zip").unwrap();
        let err = FilingArchive::open(&path, 2023, DocumentType::Dfp).err().unwrap();
        assert!(matches!(err, AnalysisError::Archive(_)));
    }
}
