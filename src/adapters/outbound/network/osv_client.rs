use super::http;
use crate::ports::outbound::{PackageAdvisories, VulnerabilitySource};
use crate::remediation::domain::{
    max_severity, AffectedRange, PackageId, PackageName, RangeKind, VulnerabilityRecord,
};
use crate::shared::error::RemediationError;
use crate::shared::security::validate_path_component;
use crate::shared::{Result, RetryPolicy};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SERVICE: &str = "OSV";

/// OSV API client for fetching vulnerability data
///
/// Uses the OSV.dev batch query endpoint to find advisory ids, then fetches
/// each advisory once for severity, ranges and aliases.
///
/// # Rate limiting
/// - Detail requests are spaced by `detail_throttle` across all in-flight
///   lookups, so concurrency never raises the aggregate request rate
/// - Detail lookups are memoized per advisory id for the client's lifetime
/// - Transient detail failures are retried under the configured policy
pub struct OsvClient {
    client: reqwest::Client,
    api_base: String,
    detail_throttle: Duration,
    retry: RetryPolicy,
    details: DashMap<String, Option<Arc<OsvVulnerability>>>,
    next_detail_slot: Mutex<Instant>,
}

impl OsvClient {
    pub const API_BASE: &'static str = "https://api.osv.dev";
    pub const TIMEOUT_SECONDS: u64 = 30;
    pub const RATE_LIMIT_MS: u64 = 100;
    const MAX_BATCH_SIZE: usize = 1000;
    const MAX_CONCURRENT_DETAILS: usize = 4;

    /// Creates a new OSV API client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(
            Self::API_BASE,
            Duration::from_secs(Self::TIMEOUT_SECONDS),
            Duration::from_millis(Self::RATE_LIMIT_MS),
            RetryPolicy::default(),
        )
    }

    pub fn with_config(
        api_base: &str,
        timeout: Duration,
        detail_throttle: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            detail_throttle,
            retry,
            details: DashMap::new(),
            next_detail_slot: Mutex::new(Instant::now()),
        })
    }

    async fn fetch_batch(&self, packages: &[PackageId]) -> Result<Vec<OsvResult>> {
        let batch_query = OsvBatchQuery {
            queries: packages
                .iter()
                .map(|id| OsvQuery {
                    package: OsvPackage {
                        name: id.name().to_string(),
                        ecosystem: "PyPI".to_string(),
                    },
                    version: id.version().to_string(),
                })
                .collect(),
        };

        let url = format!("{}/v1/querybatch", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(&batch_query)
            .send()
            .await
            .map_err(|e| RemediationError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(RemediationError::from_status(SERVICE, response.status()).into());
        }

        let batch_response: OsvBatchResponse = response
            .json()
            .await
            .map_err(|e| RemediationError::from_reqwest(SERVICE, e))?;

        if batch_response.results.len() != packages.len() {
            return Err(RemediationError::DataFormat {
                service: SERVICE.to_string(),
                details: format!(
                    "expected {} results, got {}",
                    packages.len(),
                    batch_response.results.len()
                ),
            }
            .into());
        }

        Ok(batch_response.results)
    }

    /// Fetches detailed vulnerability information by ID
    ///
    /// The batch API returns ids only. `None` means the advisory is unknown
    /// to the detail endpoint.
    async fn fetch_vulnerability_details(&self, vuln_id: &str) -> Result<Option<Arc<OsvVulnerability>>> {
        let cached = self.details.get(vuln_id).map(|entry| entry.value().clone());
        if let Some(cached) = cached {
            return Ok(cached);
        }

        validate_path_component(vuln_id, "Vulnerability id")?;
        let url = format!("{}/v1/vulns/{}", self.api_base, urlencoding::encode(vuln_id));

        tokio::time::sleep(self.reserve_detail_slot()).await;
        let operation = format!("fetch advisory {}", vuln_id);
        let detail: Option<OsvVulnerability> = self
            .retry
            .run(&operation, || http::get_json(&self.client, SERVICE, &url))
            .await?;

        let detail = detail.map(Arc::new);
        self.details.insert(vuln_id.to_string(), detail.clone());
        Ok(detail)
    }

    /// Time to wait before the next detail request may start
    fn reserve_detail_slot(&self) -> Duration {
        let now = Instant::now();
        let mut next = self
            .next_detail_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let start = (*next).max(now);
        *next = start + self.detail_throttle;
        start - now
    }

    /// Detail lookups run concurrently; records keep the batch's order.
    ///
    /// A detail lookup that still fails after retries fails the whole
    /// package rather than yielding a record without ranges.
    async fn records_for(&self, package: &PackageId, result: OsvResult) -> PackageAdvisories {
        let detail_lookup = |entry: OsvBatchEntry| async move {
            match self.fetch_vulnerability_details(&entry.id).await {
                Ok(Some(detail)) => Ok(convert_to_record(package.name(), &detail)),
                Ok(None) => {
                    debug!(advisory = %entry.id, "Advisory has no detail record");
                    Ok(minimal_record(&entry.id))
                }
                Err(e) => {
                    warn!(advisory = %entry.id, package = %package, error = %e, "Failed to fetch advisory details");
                    Err(format!("advisory {} details unavailable: {:#}", entry.id, e))
                }
            }
        };
        let lookups: Vec<std::result::Result<VulnerabilityRecord, String>> =
            stream::iter(result.vulns)
                .map(detail_lookup)
                .buffered(Self::MAX_CONCURRENT_DETAILS)
                .collect()
                .await;

        let errors: Vec<String> = lookups
            .iter()
            .filter_map(|lookup| lookup.as_ref().err().cloned())
            .collect();
        if !errors.is_empty() {
            return Err(errors.join("; "));
        }
        Ok(lookups.into_iter().flatten().collect())
    }
}

#[async_trait]
impl VulnerabilitySource for OsvClient {
    fn max_batch_size(&self) -> usize {
        Self::MAX_BATCH_SIZE
    }

    async fn query_batch(&self, packages: &[PackageId]) -> Result<Vec<PackageAdvisories>> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.fetch_batch(packages).await?;
        let mut records = Vec::with_capacity(packages.len());
        for (package, result) in packages.iter().zip(results) {
            if result.next_page_token.is_some() {
                debug!(package = %package, "Ignoring OSV pagination token");
            }
            records.push(self.records_for(package, result).await);
        }
        Ok(records)
    }
}

fn details_url(id: &str) -> String {
    format!("https://osv.dev/vulnerability/{}", id)
}

fn minimal_record(id: &str) -> VulnerabilityRecord {
    VulnerabilityRecord::new(
        id.to_string(),
        String::new(),
        details_url(id),
        None,
        Vec::new(),
        Vec::new(),
    )
}

/// Converts an OSV advisory to the domain record for one package
fn convert_to_record(package: &PackageName, osv_vuln: &OsvVulnerability) -> VulnerabilityRecord {
    let severity = max_severity(osv_vuln.severity.iter().map(|s| parse_severity(&s.score)));

    let ranges = osv_vuln
        .affected
        .iter()
        .filter(|a| affects_package(a, package))
        .flat_map(|a| a.ranges.iter())
        .map(to_range)
        .collect();

    VulnerabilityRecord::new(
        osv_vuln.id.clone(),
        osv_vuln.summary.clone().unwrap_or_default(),
        details_url(&osv_vuln.id),
        severity,
        ranges,
        osv_vuln.aliases.clone(),
    )
}

fn affects_package(affected: &OsvAffected, package: &PackageName) -> bool {
    let Some(declared) = &affected.package else {
        return true;
    };
    let same_name = PackageName::new(&declared.name).is_ok_and(|n| &n == package);
    let is_pypi = declared
        .ecosystem
        .as_deref()
        .map_or(true, |e| e.eq_ignore_ascii_case("PyPI"));
    same_name && is_pypi
}

/// Collapses an ordered event list into one range: the first `introduced`
/// and the last `fixed` event
fn to_range(range: &OsvRange) -> AffectedRange {
    let introduced = range.events.iter().find_map(|e| e.introduced.clone());
    let fixed = range.events.iter().rev().find_map(|e| e.fixed.clone());
    AffectedRange::new(introduced, fixed, RangeKind::from(range.range_type.as_str()))
}

/// Severity entries are either numeric scores or CVSS v3 vectors
fn parse_severity(score: &str) -> Option<f32> {
    let score = score.trim();
    if let Ok(value) = score.parse::<f32>() {
        return (0.0..=10.0).contains(&value).then_some(value);
    }
    if score.starts_with("CVSS:3") {
        return parse_cvss_score(score);
    }
    None
}

// OSV API request/response structures

#[derive(Debug, Serialize)]
struct OsvBatchQuery {
    queries: Vec<OsvQuery>,
}

#[derive(Debug, Serialize)]
struct OsvQuery {
    package: OsvPackage,
    version: String,
}

#[derive(Debug, Serialize)]
struct OsvPackage {
    name: String,
    ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct OsvBatchResponse {
    #[serde(default)]
    results: Vec<OsvResult>,
}

#[derive(Debug, Deserialize)]
struct OsvResult {
    #[serde(default)]
    vulns: Vec<OsvBatchEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsvBatchEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OsvVulnerability {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    severity: Vec<OsvSeverity>,
    #[serde(default)]
    affected: Vec<OsvAffected>,
}

#[derive(Debug, Deserialize)]
struct OsvSeverity {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    severity_type: String,
    score: String,
}

#[derive(Debug, Deserialize)]
struct OsvAffected {
    #[serde(default)]
    package: Option<OsvAffectedPackage>,
    #[serde(default)]
    ranges: Vec<OsvRange>,
}

#[derive(Debug, Deserialize)]
struct OsvAffectedPackage {
    name: String,
    #[serde(default)]
    ecosystem: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsvRange {
    #[serde(rename = "type")]
    range_type: String,
    #[serde(default)]
    events: Vec<OsvEvent>,
}

#[derive(Debug, Deserialize)]
struct OsvEvent {
    #[serde(default)]
    introduced: Option<String>,
    #[serde(default)]
    fixed: Option<String>,
}

/// Computes the CVSS v3 base score from a vector string
///
/// Example: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H" -> Some(9.8)
fn parse_cvss_score(cvss_vector: &str) -> Option<f32> {
    let metrics: std::collections::HashMap<&str, &str> = cvss_vector
        .split('/')
        .skip(1) // Skip "CVSS:3.1" or "CVSS:3.0"
        .filter_map(|part| {
            let mut split = part.split(':');
            Some((split.next()?, split.next()?))
        })
        .collect();

    let av = metrics.get("AV")?;
    let ac = metrics.get("AC")?;
    let pr = metrics.get("PR")?;
    let ui = metrics.get("UI")?;
    let s = metrics.get("S")?;
    let c = metrics.get("C")?;
    let i = metrics.get("I")?;
    let a = metrics.get("A")?;

    let av_score = match *av {
        "N" => 0.85,
        "A" => 0.62,
        "L" => 0.55,
        "P" => 0.2,
        _ => return None,
    };

    let ac_score = match *ac {
        "L" => 0.77,
        "H" => 0.44,
        _ => return None,
    };

    let pr_score = match (*pr, *s) {
        ("N", _) => 0.85,
        ("L", "U") => 0.62,
        ("L", "C") => 0.68,
        ("H", "U") => 0.27,
        ("H", "C") => 0.5,
        _ => return None,
    };

    let ui_score = match *ui {
        "N" => 0.85,
        "R" => 0.62,
        _ => return None,
    };

    let impact_value = |metric: &str| match metric {
        "N" => Some(0.0),
        "L" => Some(0.22),
        "H" => Some(0.56),
        _ => None,
    };
    let c_score: f64 = impact_value(c)?;
    let i_score: f64 = impact_value(i)?;
    let a_score: f64 = impact_value(a)?;

    // ISS (Impact Sub-Score)
    let iss = 1.0_f64 - ((1.0 - c_score) * (1.0 - i_score) * (1.0 - a_score));

    let impact = if *s == "U" {
        6.42 * iss
    } else {
        7.52 * (iss - 0.029) - 3.25 * (iss - 0.02_f64).powi(15)
    };

    let exploitability = 8.22 * av_score * ac_score * pr_score * ui_score;

    let base_score = if impact <= 0.0 {
        0.0
    } else if *s == "U" {
        f64::min(impact + exploitability, 10.0)
    } else {
        f64::min(1.08 * (impact + exploitability), 10.0)
    };

    // Round up to one decimal place
    Some(((base_score * 10.0).ceil() / 10.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::domain::PackageVersion;

    fn name(n: &str) -> PackageName {
        PackageName::new(n).unwrap()
    }

    #[test]
    fn test_osv_client_creation() {
        let client = OsvClient::new();
        assert!(client.is_ok());
        assert_eq!(client.unwrap().max_batch_size(), 1000);
    }

    #[test]
    fn test_detail_slots_are_spaced_by_throttle() {
        let client = OsvClient::with_config(
            OsvClient::API_BASE,
            Duration::from_secs(5),
            Duration::from_millis(100),
            RetryPolicy::none(),
        )
        .unwrap();

        let first = client.reserve_detail_slot();
        let second = client.reserve_detail_slot();
        let third = client.reserve_detail_slot();
        assert!(first <= Duration::from_millis(100));
        assert!(second > Duration::from_millis(50));
        assert!(third > second + Duration::from_millis(50));
    }

    #[test]
    fn test_parse_cvss_score_critical() {
        let score = parse_cvss_score("CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H").unwrap();
        assert!((score - 9.8).abs() < 0.01);
    }

    #[test]
    fn test_parse_cvss_score_medium() {
        let score = parse_cvss_score("CVSS:3.1/AV:N/AC:L/PR:L/UI:R/S:U/C:L/I:L/A:L").unwrap();
        assert!((4.0..7.0).contains(&score));
    }

    #[test]
    fn test_parse_cvss_score_none() {
        let score = parse_cvss_score("CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:N/I:N/A:N").unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_parse_cvss_score_invalid() {
        assert!(parse_cvss_score("invalid vector").is_none());
    }

    #[test]
    fn test_parse_severity_variants() {
        assert_eq!(parse_severity("7.5"), Some(7.5));
        assert!(parse_severity("CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H").is_some());
        assert_eq!(
            parse_severity("CVSS:4.0/AV:N/AC:L/AT:N/PR:N/UI:N/VC:H/VI:H/VA:H/SC:N/SI:N/SA:N"),
            None
        );
        assert_eq!(parse_severity("HIGH"), None);
        assert_eq!(parse_severity("42"), None);
    }

    #[test]
    fn test_range_uses_first_introduced_and_last_fixed() {
        let range: OsvRange = serde_json::from_str(
            r#"{"type": "ECOSYSTEM", "events": [
                {"introduced": "0"}, {"fixed": "1.2.0"},
                {"introduced": "2.0.0"}, {"fixed": "2.0.3"}
            ]}"#,
        )
        .unwrap();
        let range = to_range(&range);
        assert_eq!(range.introduced.as_deref(), Some("0"));
        assert_eq!(range.fixed.as_deref(), Some("2.0.3"));
        assert_eq!(range.kind, RangeKind::Ecosystem);
    }

    #[test]
    fn test_open_range_has_no_fix() {
        let range: OsvRange = serde_json::from_str(
            r#"{"type": "GIT", "events": [{"introduced": "abc123"}]}"#,
        )
        .unwrap();
        let range = to_range(&range);
        assert_eq!(range.fixed, None);
        assert_eq!(range.kind, RangeKind::Git);
    }

    #[test]
    fn test_convert_filters_ranges_to_package() {
        let json = r#"{
            "id": "GHSA-xxxx",
            "summary": "Header injection",
            "aliases": ["CVE-2023-0001"],
            "severity": [
                {"type": "CVSS_V3", "score": "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H"}
            ],
            "affected": [
                {
                    "package": {"name": "Requests", "ecosystem": "PyPI"},
                    "ranges": [{"type": "ECOSYSTEM", "events": [{"introduced": "0"}, {"fixed": "2.31.0"}]}]
                },
                {
                    "package": {"name": "urllib3", "ecosystem": "PyPI"},
                    "ranges": [{"type": "ECOSYSTEM", "events": [{"introduced": "0"}, {"fixed": "1.26.5"}]}]
                },
                {
                    "package": {"name": "requests", "ecosystem": "npm"},
                    "ranges": [{"type": "SEMVER", "events": [{"introduced": "0"}, {"fixed": "9.9.9"}]}]
                }
            ]
        }"#;
        let vuln: OsvVulnerability = serde_json::from_str(json).unwrap();
        let record = convert_to_record(&name("requests"), &vuln);

        assert_eq!(record.id(), "GHSA-xxxx");
        assert_eq!(record.ranges().len(), 1);
        assert_eq!(record.ranges()[0].fixed.as_deref(), Some("2.31.0"));
        assert_eq!(record.aliases(), ["CVE-2023-0001".to_string()]);
        assert_eq!(record.details_url(), "https://osv.dev/vulnerability/GHSA-xxxx");
        assert!(record.max_severity().unwrap() > 9.0);
    }

    #[test]
    fn test_minimal_record_has_only_identity() {
        let record = minimal_record("PYSEC-2023-1");
        assert_eq!(record.id(), "PYSEC-2023-1");
        assert!(record.ranges().is_empty());
        assert_eq!(record.max_severity(), None);
    }

    #[test]
    fn test_osv_result_deserialize_empty() {
        let result: OsvResult = serde_json::from_str(r#"{}"#).unwrap();
        assert!(result.vulns.is_empty());
        assert!(result.next_page_token.is_none());
    }

    #[test]
    fn test_osv_batch_query_serialize() {
        let query = OsvBatchQuery {
            queries: vec![OsvQuery {
                package: OsvPackage {
                    name: "requests".to_string(),
                    ecosystem: "PyPI".to_string(),
                },
                version: "2.31.0".to_string(),
            }],
        };

        let json = serde_json::to_string(&query).unwrap();
        assert!(json.contains("requests"));
        assert!(json.contains("PyPI"));
        assert!(json.contains("2.31.0"));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let client = OsvClient::with_config(
            "http://127.0.0.1:9",
            Duration::from_millis(10),
            Duration::ZERO,
            RetryPolicy::none(),
        )
        .unwrap();
        assert!(client.query_batch(&[]).await.unwrap().is_empty());
    }

    /// Serves one querybatch hit for GHSA-xxxx and answers every advisory
    /// detail request with `detail_status` and `detail_body`
    fn spawn_osv_stub(detail_status: &'static str, detail_body: &'static str) -> String {
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut content_length = 0;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header == "\r\n" || header.is_empty() {
                        break;
                    }
                    if let Some(value) = header.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                let mut body = vec![0; content_length];
                reader.read_exact(&mut body).unwrap();

                let (status, payload) = if request_line.starts_with("POST /v1/querybatch") {
                    ("200 OK", r#"{"results":[{"vulns":[{"id":"GHSA-xxxx"}]}]}"#)
                } else {
                    (detail_status, detail_body)
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    payload.len(),
                    payload
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        format!("http://{}", addr)
    }

    fn stub_client(base: &str) -> OsvClient {
        OsvClient::with_config(base, Duration::from_secs(5), Duration::ZERO, RetryPolicy::none())
            .unwrap()
    }

    fn requests() -> PackageId {
        PackageId::new(
            name("requests"),
            PackageVersion::parse("2.30.0").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_detail_outage_fails_the_package() {
        let client = stub_client(&spawn_osv_stub("503 Service Unavailable", "{}"));
        let results = client.query_batch(&[requests()]).await.unwrap();

        assert_eq!(results.len(), 1);
        let error = results[0].as_ref().unwrap_err();
        assert!(error.contains("GHSA-xxxx"));
        assert!(error.contains("503"));
    }

    #[tokio::test]
    async fn test_detail_record_carries_ranges() {
        let detail = r#"{
            "id": "GHSA-xxxx",
            "affected": [{
                "package": {"name": "requests", "ecosystem": "PyPI"},
                "ranges": [{"type": "ECOSYSTEM", "events": [{"introduced": "0"}, {"fixed": "2.31.0"}]}]
            }]
        }"#;
        let client = stub_client(&spawn_osv_stub("200 OK", detail));
        let results = client.query_batch(&[requests()]).await.unwrap();

        let records = results[0].as_ref().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ranges()[0].fixed.as_deref(), Some("2.31.0"));
    }
}
