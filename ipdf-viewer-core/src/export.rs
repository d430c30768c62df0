use std::borrow::Cow;
use std::io::Write;

use tracing::info;

use crate::config::DEFAULT_FILE_NAME;
use crate::error::ExportError;
use crate::fetch::Fetcher;
use crate::platform::Platform;
use crate::source::{sanitize_file_name, suggested_file_name, DocumentSource};

/// Downloads and prints the original document.
#[derive(Debug, Clone)]
pub struct Exporter<F> {
    fetcher: F,
    fallback_name: String,
}

impl<F: Fetcher> Exporter<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            fallback_name: DEFAULT_FILE_NAME.to_string(),
        }
    }

    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = name.into();
        self
    }

    /// Save the document's original bytes through the platform.
    ///
    /// URL sources are fetched again rather than taken from anything already
    /// rendered. The bytes are staged in a temporary file that is removed
    /// once the platform has taken it. Returns the name the file was saved as.
    pub async fn download<P: Platform>(
        &self,
        source: &DocumentSource,
        file_name: Option<&str>,
        platform: &P,
    ) -> Result<String, ExportError> {
        let name = file_name
            .map(sanitize_file_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| suggested_file_name(source, &self.fallback_name));

        let bytes: Cow<'_, [u8]> = match source {
            DocumentSource::Url(url) => Cow::Owned(self.fetcher.fetch(url).await?),
            DocumentSource::Bytes { data, .. } => Cow::Borrowed(&data[..]),
        };

        let mut staged = tempfile::Builder::new()
            .prefix("ipdf-download-")
            .tempfile()?;
        staged.write_all(&bytes)?;
        staged.flush()?;

        platform.save(staged.path(), &name).await?;
        staged.close()?;

        info!(file = %name, bytes = bytes.len(), "document exported");
        Ok(name)
    }

    pub fn print<P: Platform>(&self, platform: &P) -> Result<(), ExportError> {
        platform.print()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, PlatformCapabilityError};
    use crate::testing::{FakeFetcher, FakePlatform};

    const REPORT_URL: &str = "https://cdn.example.com/files/report.pdf";

    #[tokio::test]
    async fn download_refetches_and_names_after_url() {
        let fetcher = FakeFetcher::default().with_body(REPORT_URL, b"%PDF-report".to_vec());
        let exporter = Exporter::new(fetcher.clone());
        let platform = FakePlatform::default();

        let name = exporter
            .download(&DocumentSource::url(REPORT_URL), None, &platform)
            .await
            .unwrap();

        assert_eq!(name, "report.pdf");
        assert_eq!(fetcher.requests(), vec![REPORT_URL.to_string()]);
        let saved = platform.saved_files();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].file_name, "report.pdf");
        assert_eq!(saved[0].bytes, b"%PDF-report");
        assert!(!saved[0].staged_path.exists(), "staged file should be released");
    }

    #[tokio::test]
    async fn explicit_name_wins() {
        let fetcher = FakeFetcher::default().with_body(REPORT_URL, b"%PDF".to_vec());
        let exporter = Exporter::new(fetcher);
        let platform = FakePlatform::default();

        let name = exporter
            .download(&DocumentSource::url(REPORT_URL), Some("Q3/summary.pdf"), &platform)
            .await
            .unwrap();
        assert_eq!(name, "Q3_summary.pdf");
    }

    #[tokio::test]
    async fn byte_sources_are_saved_without_fetching() {
        let fetcher = FakeFetcher::default();
        let exporter = Exporter::new(fetcher.clone()).with_fallback_name("upload.pdf");
        let platform = FakePlatform::default();

        let source = DocumentSource::bytes(b"%PDF-inline".to_vec(), Some("application/pdf"));
        let name = exporter.download(&source, None, &platform).await.unwrap();

        assert_eq!(name, "upload.pdf");
        assert!(fetcher.requests().is_empty());
        assert_eq!(platform.saved_files()[0].bytes, b"%PDF-inline");
    }

    #[tokio::test]
    async fn failed_fetch_is_reported_and_saves_nothing() {
        let fetcher = FakeFetcher::default().with_status(REPORT_URL, 404);
        let exporter = Exporter::new(fetcher.clone());
        let platform = FakePlatform::default();

        let err = exporter
            .download(&DocumentSource::url(REPORT_URL), None, &platform)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Fetch(FetchError::Status(404))));
        assert!(platform.saved_files().is_empty());
        assert_eq!(fetcher.requests().len(), 1, "no retry");
    }

    #[test]
    fn print_delegates_to_platform() {
        let exporter = Exporter::new(FakeFetcher::default());
        let platform = FakePlatform::default();
        exporter.print(&platform).unwrap();
        assert_eq!(platform.print_count(), 1);

        platform.fail_print();
        assert!(matches!(
            exporter.print(&platform),
            Err(ExportError::Platform(PlatformCapabilityError::Failed(_)))
        ));
    }
}
