pub mod registry;

pub use registry::{CompanyRegistry, RegisteredCompany, TickerRegistry};

use analysis_core::{AnalysisError, ArchiveFetcher, DocumentType};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_BASE_URL: &str = "https://dados.cvm.gov.br/dados/CIA_ABERTA/DOC/";
pub const DEFAULT_REGISTRY_URL: &str =
    "https://dados.cvm.gov.br/dados/CIA_ABERTA/CAD/DADOS/cad_cia_aberta.csv";
const REGISTRY_FILE: &str = "cad_cia_aberta.csv";

/// Downloads filing archives and the company registry from the CVM open
/// data portal into a local cache directory.
#[derive(Clone)]
pub struct CvmClient {
    client: Client,
    base_url: String,
    registry_url: String,
    archive_dir: PathBuf,
    registry_dir: PathBuf,
}

impl CvmClient {
    /// Cache layout: `{data_dir}/raw/cvm_filings/` for archives and
    /// `{data_dir}/raw/cvm_registry/` for the registry.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let raw = data_dir.as_ref().join("raw");
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            archive_dir: raw.join("cvm_filings"),
            registry_dir: raw.join("cvm_registry"),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_registry_url(mut self, registry_url: impl Into<String>) -> Self {
        self.registry_url = registry_url.into();
        self
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// `{base}{DOC}/DADOS/{doc}_cia_aberta_{year}.zip`
    pub fn archive_url(&self, year: i32, document_type: DocumentType) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!(
            "{}/{}/DADOS/{}",
            base,
            document_type.code(),
            document_type.archive_name(year)
        )
    }

    pub fn archive_path(&self, year: i32, document_type: DocumentType) -> PathBuf {
        self.archive_dir.join(document_type.archive_name(year))
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry_dir.join(REGISTRY_FILE)
    }

    /// Make sure the archive for `year` exists on disk. A present file is
    /// reused as-is; otherwise it is downloaded.
    pub async fn ensure_archive(
        &self,
        year: i32,
        document_type: DocumentType,
    ) -> Result<PathBuf, AnalysisError> {
        let path = self.archive_path(year, document_type);
        if path.exists() {
            tracing::info!("Archive {} already present, skipping download", path.display());
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.archive_dir).await?;
        let url = self.archive_url(year, document_type);
        tracing::info!("Downloading {} {} archive from {}", document_type.code(), year, url);
        self.download(&url, &path).await?;
        tracing::info!("Archive saved to {}", path.display());
        Ok(path)
    }

    /// Make sure a registry copy downloaded today exists on disk.
    pub async fn ensure_registry(&self) -> Result<PathBuf, AnalysisError> {
        let path = self.registry_path();
        if modified_today(&path) {
            tracing::info!("Using today's cached company registry");
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.registry_dir).await?;
        tracing::info!("Downloading company registry from {}", self.registry_url);
        self.download(&self.registry_url, &path).await?;
        Ok(path)
    }

    /// Download (if needed) and parse the registry of active companies.
    pub async fn load_company_registry(&self) -> Result<CompanyRegistry, AnalysisError> {
        let path = self.ensure_registry().await?;
        CompanyRegistry::from_path(&path)
    }

    /// Stream `url` into `{dest}.part`, then move it into place so an
    /// interrupted transfer never leaves a truncated file at `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<(), AnalysisError> {
        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        let result = self.stream_to(url, &part).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&part).await;
            return result;
        }
        tokio::fs::rename(&part, dest).await?;
        Ok(())
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<(), AnalysisError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AnalysisError::Network(format!("{}: {}", url, e)))?;

        let mut file = tokio::fs::File::create(part).await?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AnalysisError::Network(format!("{}: {}", url, e)))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ArchiveFetcher for CvmClient {
    async fn ensure_archive(
        &self,
        year: i32,
        document_type: DocumentType,
    ) -> Result<PathBuf, AnalysisError> {
        CvmClient::ensure_archive(self, year, document_type).await
    }
}

fn modified_today(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Local>::from(t).date_naive() == Local::now().date_naive())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    // Nothing listens on the discard port, so any request fails fast.
    const DEAD_URL: &str = "http://127.0.0.1:9/";

    /// Serves `body` to every connection on a local port and counts them.
    async fn serve(body: &'static [u8]) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{}/", addr), hits)
    }

    #[test]
    fn test_archive_url() {
        let client = CvmClient::new("data");
        assert_eq!(
            client.archive_url(2023, DocumentType::Dfp),
            "https://dados.cvm.gov.br/dados/CIA_ABERTA/DOC/DFP/DADOS/dfp_cia_aberta_2023.zip"
        );
        assert_eq!(
            client.archive_path(2023, DocumentType::Itr),
            Path::new("data/raw/cvm_filings/itr_cia_aberta_2023.zip")
        );
    }

    #[tokio::test]
    async fn test_present_archive_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let client = CvmClient::new(dir.path()).with_base_url(DEAD_URL);
        let path = client.archive_path(2022, DocumentType::Dfp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"cached").unwrap();

        let first = client.ensure_archive(2022, DocumentType::Dfp).await.unwrap();
        let second = client.ensure_archive(2022, DocumentType::Dfp).await.unwrap();
        assert_eq!(first, path);
        assert_eq!(second, path);
        assert_eq!(std::fs::read(&path).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_downloaded_archive_is_fetched_once() {
        let (url, hits) = serve(b"PK-fake-zip").await;
        let dir = tempfile::tempdir().unwrap();
        let client = CvmClient::new(dir.path()).with_base_url(url);

        let first = client.ensure_archive(2021, DocumentType::Dfp).await.unwrap();
        let second = client.ensure_archive(2021, DocumentType::Dfp).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(&first).unwrap(), b"PK-fake-zip");
        assert!(!first.with_extension("zip.part").exists());
    }

    #[tokio::test]
    async fn test_registry_download() {
        let (url, hits) = serve(b"CNPJ_CIA;DENOM_SOCIAL;DENOM_COMERC;SIT;SETOR_ATIV\n1;ALFA SA;ALFA;ATIVO;Energia\n").await;
        let dir = tempfile::tempdir().unwrap();
        let client = CvmClient::new(dir.path()).with_registry_url(url);

        let registry = client.load_company_registry().await.unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.sector_of("1"), Some("Energia"));

        client.ensure_registry().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_network_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = CvmClient::new(dir.path()).with_base_url(DEAD_URL);

        let err = client.ensure_archive(2022, DocumentType::Dfp).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Network(_)));

        let path = client.archive_path(2022, DocumentType::Dfp);
        assert!(!path.exists());
        assert!(!path.with_extension("zip.part").exists());
    }

    #[tokio::test]
    async fn test_registry_cached_today_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let client = CvmClient::new(dir.path()).with_registry_url(DEAD_URL);
        let path = client.registry_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"CNPJ_CIA;DENOM_SOCIAL;DENOM_COMERC;SIT;SETOR_ATIV\n").unwrap();

        assert_eq!(client.ensure_registry().await.unwrap(), path);
    }

    #[tokio::test]
    async fn test_missing_registry_needs_network() {
        let dir = tempfile::tempdir().unwrap();
        let client = CvmClient::new(dir.path()).with_registry_url(DEAD_URL);
        assert!(matches!(
            client.ensure_registry().await,
            Err(AnalysisError::Network(_))
        ));
    }
}
