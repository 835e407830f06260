//! Company registry client
//!
//! Resolves 14-digit company identifiers to [`RegistryRecord`]s, consulting
//! the persistent cache first and the configured upstream otherwise. Upstream
//! failures are retried with a fixed backoff and end up as error-tagged
//! records; only cache storage failures are returned as errors.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::normalizer::{classify_and_pad, company_rejection};
use crate::config::{RegistryProvider, RegistrySettings};
use crate::error::{ReconError, ReconResult};
use crate::models::{LookupFailure, Partner, RegistryRecord};
use crate::storage::RegistryCache;

const CNPJA_BASE_URL: &str = "https://api.cnpja.com";
const BRASILAPI_BASE_URL: &str = "https://brasilapi.com.br";
const USER_AGENT: &str = concat!("payee-reconciler/", env!("CARGO_PKG_VERSION"));

/// An upstream company registry
///
/// One call is one attempt; retrying is the client's job. The error string
/// is only logged and folded into the final failure message.
pub trait RegistrySource {
    /// Short name for log lines
    fn name(&self) -> &str;

    /// Fetch one normalized 14-digit identifier
    fn fetch(&self, tax_id: &str) -> Result<RegistryRecord, String>;

    /// Why this source cannot be queried at all, if it cannot
    fn unavailable(&self) -> Option<&str> {
        None
    }
}

fn http_client(timeout: Duration) -> ReconResult<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ReconError::Registry(format!("Failed to build HTTP client: {}", e)))
}

fn get_json<T: DeserializeOwned>(
    request: reqwest::blocking::RequestBuilder,
) -> Result<T, String> {
    let response = request.send().map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
    }
    let text = response.text().map_err(|e| e.to_string())?;
    serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| format!("unexpected response: {}", e))
}

fn join_address(parts: &[Option<&str>]) -> Option<String> {
    let parts: Vec<&str> = parts
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// CNPJa

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CnpjaOffice {
    tax_id: Option<String>,
    alias: Option<String>,
    company: CnpjaCompany,
    address: Option<CnpjaAddress>,
    status: Option<CnpjaText>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CnpjaCompany {
    name: Option<String>,
    members: Vec<CnpjaMember>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CnpjaMember {
    person: CnpjaPerson,
    role: Option<CnpjaText>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CnpjaPerson {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    age: Option<String>,
    tax_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CnpjaText {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CnpjaAddress {
    street: Option<String>,
    number: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
}

impl CnpjaOffice {
    fn into_record(self, tax_id: &str) -> RegistryRecord {
        let partners = self
            .company
            .members
            .into_iter()
            .filter_map(|member| {
                let name = non_empty(member.person.name)?;
                let role = member
                    .role
                    .and_then(|r| non_empty(r.text))
                    .or(non_empty(member.person.kind))
                    .unwrap_or_default();
                Some(Partner {
                    name,
                    role,
                    tax_id: member.person.tax_id.unwrap_or_default(),
                    age_range: non_empty(member.person.age),
                })
            })
            .collect();

        let address = self.address.and_then(|a| {
            let city = match (a.city.as_deref(), a.state.as_deref()) {
                (Some(city), Some(state)) => Some(format!("{}/{}", city, state)),
                (city, state) => city.or(state).map(str::to_string),
            };
            join_address(&[
                a.street.as_deref(),
                a.number.as_deref(),
                city.as_deref(),
                a.zip.as_deref(),
            ])
        });

        RegistryRecord {
            tax_id: non_empty(self.tax_id).unwrap_or_else(|| tax_id.to_string()),
            legal_name: self.company.name.unwrap_or_default(),
            trade_name: self.alias.unwrap_or_default(),
            partners,
            address,
            status: self.status.and_then(|s| non_empty(s.text)),
            error: None,
        }
    }
}

/// CNPJa commercial API, authorized with an API key
pub struct CnpjaSource {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl CnpjaSource {
    pub fn new(api_key: String, base_url: Option<String>, timeout: Duration) -> ReconResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.unwrap_or_else(|| CNPJA_BASE_URL.to_string()),
            api_key,
        })
    }
}

impl RegistrySource for CnpjaSource {
    fn name(&self) -> &str {
        "cnpja"
    }

    fn fetch(&self, tax_id: &str) -> Result<RegistryRecord, String> {
        let url = format!("{}/office/{}", self.base_url.trim_end_matches('/'), tax_id);
        let office: CnpjaOffice =
            get_json(self.http.get(url).header("Authorization", &self.api_key))?;
        Ok(office.into_record(tax_id))
    }
}

// BrasilAPI

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BrasilApiCompany {
    cnpj: Option<String>,
    razao_social: Option<String>,
    nome_fantasia: Option<String>,
    #[serde(deserialize_with = "nullable_list")]
    qsa: Vec<Partner>,
    descricao_situacao_cadastral: Option<String>,
    logradouro: Option<String>,
    numero: Option<String>,
    municipio: Option<String>,
    uf: Option<String>,
    cep: Option<String>,
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<Partner>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Partner>>::deserialize(deserializer)?.unwrap_or_default())
}

impl BrasilApiCompany {
    fn into_record(self, tax_id: &str) -> RegistryRecord {
        let city = match (self.municipio.as_deref(), self.uf.as_deref()) {
            (Some(city), Some(uf)) => Some(format!("{}/{}", city, uf)),
            (city, uf) => city.or(uf).map(str::to_string),
        };
        let address = join_address(&[
            self.logradouro.as_deref(),
            self.numero.as_deref(),
            city.as_deref(),
            self.cep.as_deref(),
        ]);

        RegistryRecord {
            tax_id: non_empty(self.cnpj)
                .map(|id| classify_and_pad(&id).1)
                .unwrap_or_else(|| tax_id.to_string()),
            legal_name: self.razao_social.unwrap_or_default(),
            trade_name: self.nome_fantasia.unwrap_or_default(),
            partners: self
                .qsa
                .into_iter()
                .filter(|p| !p.name.trim().is_empty())
                .collect(),
            address,
            status: non_empty(self.descricao_situacao_cadastral),
            error: None,
        }
    }
}

/// BrasilAPI public endpoint, no authorization
pub struct BrasilApiSource {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl BrasilApiSource {
    pub fn new(base_url: Option<String>, timeout: Duration) -> ReconResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.unwrap_or_else(|| BRASILAPI_BASE_URL.to_string()),
        })
    }
}

impl RegistrySource for BrasilApiSource {
    fn name(&self) -> &str {
        "brasilapi"
    }

    fn fetch(&self, tax_id: &str) -> Result<RegistryRecord, String> {
        let url = format!(
            "{}/api/cnpj/v1/{}",
            self.base_url.trim_end_matches('/'),
            tax_id
        );
        let company: BrasilApiCompany = get_json(self.http.get(url))?;
        Ok(company.into_record(tax_id))
    }
}

/// Stand-in for an upstream that is missing its credentials
///
/// Every lookup that misses the cache fails without a network call.
pub struct UnconfiguredSource {
    provider: &'static str,
    reason: String,
}

impl UnconfiguredSource {
    pub fn new(provider: &'static str, reason: impl Into<String>) -> Self {
        Self {
            provider,
            reason: reason.into(),
        }
    }
}

impl RegistrySource for UnconfiguredSource {
    fn name(&self) -> &str {
        self.provider
    }

    fn fetch(&self, _tax_id: &str) -> Result<RegistryRecord, String> {
        Err(self.reason.clone())
    }

    fn unavailable(&self) -> Option<&str> {
        Some(&self.reason)
    }
}

/// Build the upstream selected by the settings
///
/// The CNPJa key is read from the environment variable named in the
/// settings. Without it the source is [`UnconfiguredSource`]: cached
/// companies still resolve, everything else fails per lookup.
pub fn source_from_settings(settings: &RegistrySettings) -> ReconResult<Box<dyn RegistrySource>> {
    let timeout = Duration::from_secs(settings.timeout_seconds);
    match settings.provider {
        RegistryProvider::Cnpja => {
            let api_key = std::env::var(&settings.api_key_env)
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty());
            let Some(api_key) = api_key else {
                let reason = format!(
                    "CNPJa API key not set; export {} or switch the provider to brasilapi",
                    settings.api_key_env
                );
                warn!("{}", reason);
                return Ok(Box::new(UnconfiguredSource::new("cnpja", reason)));
            };
            Ok(Box::new(CnpjaSource::new(
                api_key,
                settings.base_url.clone(),
                timeout,
            )?))
        }
        RegistryProvider::BrasilApi => Ok(Box::new(BrasilApiSource::new(
            settings.base_url.clone(),
            timeout,
        )?)),
    }
}

/// Where a lookup result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOrigin {
    /// Served from the cache, no network
    Cache,
    /// Required at least one upstream call
    Upstream,
    /// Identifier rejected before any lookup
    Rejected,
    /// Cache miss with no usable upstream
    Skipped,
}

/// Result of a batch resolution
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// One record per distinct identifier, in first-seen order
    pub records: Vec<RegistryRecord>,
    pub from_cache: usize,
    pub fetched: usize,
    pub failed: usize,
}

/// Cache-backed registry client with retry and backoff
pub struct RegistryClient {
    cache: RegistryCache,
    source: Box<dyn RegistrySource>,
    max_retries: u32,
    backoff: Duration,
}

impl RegistryClient {
    pub fn new(
        cache: RegistryCache,
        source: Box<dyn RegistrySource>,
        max_retries: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            cache,
            source,
            max_retries: max_retries.max(1),
            backoff,
        }
    }

    /// Client configured from the registry settings
    pub fn from_settings(cache: RegistryCache, settings: &RegistrySettings) -> ReconResult<Self> {
        Ok(Self::new(
            cache,
            source_from_settings(settings)?,
            settings.max_retries,
            settings.backoff(),
        ))
    }

    /// The cache behind this client
    pub fn cache(&self) -> &RegistryCache {
        &self.cache
    }

    /// Fail with a configuration error when the upstream cannot be queried
    pub fn ensure_configured(&self) -> ReconResult<()> {
        match self.source.unavailable() {
            Some(reason) => Err(ReconError::Config(reason.to_string())),
            None => Ok(()),
        }
    }

    /// Resolve one identifier
    pub fn lookup(&self, raw: &str) -> ReconResult<RegistryRecord> {
        self.lookup_traced(raw).map(|(record, _)| record)
    }

    /// Resolve one identifier and report where the answer came from
    pub fn lookup_traced(&self, raw: &str) -> ReconResult<(RegistryRecord, LookupOrigin)> {
        // Person-width and invalid ids never reach 14 digits here
        let (_, tax_id) = classify_and_pad(raw);
        if let Some(reason) = company_rejection(&tax_id) {
            warn!(tax_id = %raw, %reason, "Skipping invalid company identifier");
            let failure = LookupFailure::InvalidIdentifier { reason };
            return Ok((RegistryRecord::failed(tax_id, failure), LookupOrigin::Rejected));
        }

        if let Some(record) = self.cache.get(&tax_id)? {
            debug!(tax_id = %tax_id, "Registry cache hit");
            return Ok((record, LookupOrigin::Cache));
        }

        if let Some(reason) = self.source.unavailable() {
            debug!(tax_id = %tax_id, source = self.source.name(), "Registry not configured, lookup skipped");
            let failure = LookupFailure::Unavailable {
                attempts: 0,
                message: reason.to_string(),
            };
            return Ok((RegistryRecord::failed(tax_id, failure), LookupOrigin::Skipped));
        }

        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            match self.source.fetch(&tax_id) {
                Ok(mut record) => {
                    record.tax_id = tax_id.clone();
                    record.error = None;
                    self.cache.put(&tax_id, &record)?;
                    info!(tax_id = %tax_id, source = self.source.name(), attempt, "Registry lookup succeeded");
                    return Ok((record, LookupOrigin::Upstream));
                }
                Err(e) => {
                    warn!(
                        tax_id = %tax_id,
                        source = self.source.name(),
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Registry lookup attempt failed"
                    );
                    last_error = e;
                    if attempt < self.max_retries && !self.backoff.is_zero() {
                        thread::sleep(self.backoff);
                    }
                }
            }
        }

        let failure = LookupFailure::Unavailable {
            attempts: self.max_retries,
            message: last_error,
        };
        warn!(tax_id = %tax_id, "{}", failure);
        Ok((RegistryRecord::failed(tax_id, failure), LookupOrigin::Upstream))
    }

    /// Resolve a list of identifiers in order, skipping repeats
    ///
    /// Sleeps `delay` after every identifier that needed an upstream call,
    /// except the last.
    pub fn lookup_batch<I, S>(&self, ids: I, delay: Duration) -> ReconResult<BatchOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .into_iter()
            .map(|id| classify_and_pad(id.as_ref()).1)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut outcome = BatchOutcome::default();
        let mut pending_sleep = false;
        for tax_id in unique {
            if pending_sleep && !delay.is_zero() {
                thread::sleep(delay);
            }
            let (record, origin) = self.lookup_traced(&tax_id)?;
            pending_sleep = origin == LookupOrigin::Upstream;
            match origin {
                LookupOrigin::Cache => outcome.from_cache += 1,
                LookupOrigin::Upstream => outcome.fetched += 1,
                LookupOrigin::Rejected | LookupOrigin::Skipped => {}
            }
            if !record.is_ok() {
                outcome.failed += 1;
            }
            outcome.records.push(record);
        }

        info!(
            resolved = outcome.records.len(),
            from_cache = outcome.from_cache,
            fetched = outcome.fetched,
            failed = outcome.failed,
            "Registry batch complete"
        );
        Ok(outcome)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedSource;
    use super::*;
    use std::rc::Rc;
    use tempfile::TempDir;

    const ACME: &str = "12345678000199";

    fn acme() -> RegistryRecord {
        let mut record = RegistryRecord::new(ACME);
        record.legal_name = "ACME COMERCIO LTDA".into();
        record
    }

    fn client(
        temp_dir: &TempDir,
        script: Vec<Result<RegistryRecord, String>>,
    ) -> (RegistryClient, Rc<ScriptedSource>) {
        let source = Rc::new(ScriptedSource::new(script));
        let cache = RegistryCache::new(temp_dir.path().join("cache.json"));
        let client = RegistryClient::new(cache, Box::new(Rc::clone(&source)), 3, Duration::ZERO);
        (client, source)
    }

    #[test]
    fn test_retries_until_success_and_caches_once() {
        let temp_dir = TempDir::new().unwrap();
        let (client, source) = client(
            &temp_dir,
            vec![Err("timeout".into()), Err("HTTP 502".into()), Ok(acme())],
        );

        let record = client.lookup("12.345.678/0001-99").unwrap();
        assert!(record.is_ok());
        assert_eq!(record.legal_name, "ACME COMERCIO LTDA");
        assert_eq!(source.calls.borrow().len(), 3);
        assert_eq!(client.cache().load().unwrap().len(), 1);

        // Second lookup is a cache hit
        let (again, origin) = client.lookup_traced(ACME).unwrap();
        assert_eq!(origin, LookupOrigin::Cache);
        assert_eq!(again, record);
        assert_eq!(source.calls.borrow().len(), 3);
    }

    #[test]
    fn test_exhaustion_is_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let (client, source) = client(&temp_dir, vec![]);

        let record = client.lookup(ACME).unwrap();
        assert_eq!(
            record.error,
            Some(LookupFailure::Unavailable {
                attempts: 3,
                message: "offline".into()
            })
        );
        assert_eq!(source.calls.borrow().len(), 3);
        assert!(client.cache().load().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_identifiers_make_no_calls() {
        let temp_dir = TempDir::new().unwrap();
        let (client, source) = client(&temp_dir, vec![Ok(acme())]);

        for raw in ["00000000000000", "123", "1234567890123456", ""] {
            let (record, origin) = client.lookup_traced(raw).unwrap();
            assert_eq!(origin, LookupOrigin::Rejected);
            assert!(matches!(
                record.error,
                Some(LookupFailure::InvalidIdentifier { .. })
            ));
        }
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn test_batch_dedupes_and_counts() {
        let temp_dir = TempDir::new().unwrap();
        let (client, source) = client(&temp_dir, vec![Ok(acme())]);

        let outcome = client
            .lookup_batch(
                ["12.345.678/0001-99", ACME, "00000000000000", ACME],
                Duration::ZERO,
            )
            .unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(source.calls.borrow().len(), 1);
    }

    #[test]
    fn test_cnpja_shape_is_normalized() {
        let json = r#"{
            "taxId": "12345678000199",
            "alias": "ACME",
            "company": {
                "name": "ACME COMERCIO LTDA",
                "members": [
                    {"person": {"name": "ANA SOUZA", "type": "NATURAL", "age": "41-50", "taxId": "***123456**"},
                     "role": {"id": 49, "text": "Sócio-Administrador"}},
                    {"person": {"name": null}}
                ]
            },
            "address": {"street": "Rua A", "number": "10", "city": "Curitiba", "state": "PR", "zip": "80000000"},
            "status": {"id": 2, "text": "Ativa"}
        }"#;
        let office: CnpjaOffice = serde_json::from_str(json).unwrap();
        let record = office.into_record(ACME);

        assert_eq!(record.legal_name, "ACME COMERCIO LTDA");
        assert_eq!(record.trade_name, "ACME");
        assert_eq!(record.partners.len(), 1);
        assert_eq!(record.partners[0].role, "Sócio-Administrador");
        assert_eq!(record.partners[0].age_range.as_deref(), Some("41-50"));
        assert_eq!(
            record.address.as_deref(),
            Some("Rua A, 10, Curitiba/PR, 80000000")
        );
        assert_eq!(record.status.as_deref(), Some("Ativa"));
    }

    #[test]
    fn test_brasilapi_shape_is_normalized() {
        let json = r#"{
            "cnpj": "12345678000199",
            "razao_social": "ACME COMERCIO LTDA",
            "nome_fantasia": null,
            "qsa": [{"nome_socio": "ANA SOUZA", "qualificacao_socio": "Sócio-Administrador"}],
            "descricao_situacao_cadastral": "ATIVA",
            "municipio": "CURITIBA",
            "uf": "PR"
        }"#;
        let company: BrasilApiCompany = serde_json::from_str(json).unwrap();
        let record = company.into_record(ACME);

        assert_eq!(record.tax_id, ACME);
        assert_eq!(record.trade_name, "");
        assert_eq!(record.partners[0].name, "ANA SOUZA");
        assert_eq!(record.address.as_deref(), Some("CURITIBA/PR"));
        assert_eq!(record.status.as_deref(), Some("ATIVA"));
    }

    #[test]
    fn test_unconfigured_source_fails_per_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RegistryCache::new(temp_dir.path().join("cache.json"));
        cache.put(ACME, &acme()).unwrap();
        let source = UnconfiguredSource::new("cnpja", "CNPJa API key not set");
        let client = RegistryClient::new(cache, Box::new(source), 3, Duration::from_secs(60));

        assert!(matches!(
            client.ensure_configured(),
            Err(ReconError::Config(msg)) if msg.contains("API key")
        ));

        let (cached, origin) = client.lookup_traced(ACME).unwrap();
        assert_eq!(origin, LookupOrigin::Cache);
        assert!(cached.is_ok());

        let outcome = client
            .lookup_batch(["98765432000100", ACME], Duration::from_secs(60))
            .unwrap();
        assert_eq!(outcome.from_cache, 1);
        assert_eq!(outcome.fetched, 0);
        assert_eq!(outcome.failed, 1);
        assert_eq!(
            outcome.records[0].error,
            Some(LookupFailure::Unavailable {
                attempts: 0,
                message: "CNPJa API key not set".into()
            })
        );
        assert_eq!(client.cache().load().unwrap().len(), 1);
    }
}
