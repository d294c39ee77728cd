//! Rule source retrieval.
//!
//! A rule source is a local spreadsheet or CSV file, a directory of CSV
//! sheets, or an `http(s)` URL whose body is either a spreadsheet or a
//! single CSV sheet.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FetchError, FetchResult, PipelineResult};
use crate::logs::{log_info, log_success};
use crate::mining::CellSheet;
use crate::parser::{sheet_name, GridSheet, Workbook};

/// Sent with downloads; some publishers reject clients without one.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Where rules are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesSource {
    Path(PathBuf),
    Url(String),
}

impl RulesSource {
    /// Anything starting with `http` (any case) is a URL.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("http")) {
            Self::Url(raw.to_string())
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }

    /// Read the source into cell sheets, downloading if needed.
    pub async fn load(&self) -> PipelineResult<Vec<CellSheet>> {
        let workbook = match self {
            Self::Url(url) => {
                let bytes = download(url).await?;
                Workbook::from_bytes(url, &url_sheet_name(url), bytes)?
            }
            Self::Path(path) => {
                log_info(format!("Reading rule sheets from {}", path.display()));
                Workbook::open(path)?
            }
        };

        let sheets = workbook.read_all()?;
        Ok(sheets.iter().map(GridSheet::to_cell_sheet).collect())
    }
}

impl fmt::Display for RulesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Download a URL body.
pub async fn download(url: &str) -> FetchResult<Vec<u8>> {
    log_info(format!("Downloading rules from {}", url));

    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = response.bytes().await?;
    log_success(format!("Downloaded {} bytes", bytes.len()));
    Ok(bytes.to_vec())
}

/// Sheet name for a downloaded source: the stem of the last path segment.
pub fn url_sheet_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("rules");
    sheet_name(Path::new(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IngestError, PipelineError};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            RulesSource::parse("HTTPS://eba.europa.eu/rules.csv"),
            RulesSource::Url("HTTPS://eba.europa.eu/rules.csv".into())
        );
        assert_eq!(
            RulesSource::parse(" rules/overview.csv "),
            RulesSource::Path(PathBuf::from("rules/overview.csv"))
        );
        assert_eq!(RulesSource::parse("abc"), RulesSource::Path(PathBuf::from("abc")));
    }

    #[test]
    fn test_url_sheet_name() {
        assert_eq!(url_sheet_name("https://host/a/b/rules.csv?x=1"), "rules");
        assert_eq!(url_sheet_name("https://host/a/checks/"), "checks");
    }

    #[tokio::test]
    async fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overview.csv");
        fs::write(
            &path,
            "id;expression\nv1;with {tB_01.02, c0020}: not(isnull({c0020}))\n",
        )
        .unwrap();

        let sheets = RulesSource::Path(path).load().await.unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "overview");
        assert!(sheets[0]
            .cells
            .iter()
            .any(|c| c.row == 2 && c.column == 2));
    }

    #[tokio::test]
    async fn test_load_directory_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b_checks.csv"), "x,y").unwrap();
        fs::write(dir.path().join("a_overview.csv"), "x,y").unwrap();

        let sheets = RulesSource::Path(dir.path().to_path_buf()).load().await.unwrap();
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a_overview", "b_checks"]);
    }

    #[tokio::test]
    async fn test_spreadsheet_source_is_decoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.xlsx");
        fs::write(&path, b"PK\x03\x04truncated").unwrap();

        // Decoded as a spreadsheet, not as CSV text
        let err = RulesSource::Path(path).load().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Ingest(IngestError::Spreadsheet { .. })
        ));
    }

    #[test]
    fn test_default_source_is_a_spreadsheet_url() {
        use crate::config::DEFAULT_RULES_URL;
        use crate::parser::is_spreadsheet_path;

        assert!(matches!(RulesSource::parse(DEFAULT_RULES_URL), RulesSource::Url(_)));
        assert!(is_spreadsheet_path(Path::new(DEFAULT_RULES_URL)));
    }

    #[test]
    fn test_downloaded_csv_is_one_sheet() {
        let body = b"id;expression\nv1;with {tB_01.02, c0020}: not(isnull({c0020}))\n".to_vec();
        let workbook = Workbook::from_bytes("https://host/rules.csv", "rules", body).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["rules"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = RulesSource::parse("/nonexistent/rules.csv").load().await.unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(IngestError::Io { .. })));
    }
}
