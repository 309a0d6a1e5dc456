use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::config::ResolvedConfig;
use crate::domain::{BriteId, OrgCode};
use crate::error::KeggError;

pub trait KeggClient: Send + Sync {
    /// `list/<target>`: tab separated `id<TAB>description` lines.
    fn list(&self, target: &str) -> Result<String, KeggError>;
    /// `get/<id>+<id>...`: flat-file entries separated by `///`.
    fn get_entries(&self, ids: &[String]) -> Result<String, KeggError>;
    fn get_brite_json(&self, brite: &BriteId) -> Result<Value, KeggError>;
    fn get_brite_text(&self, brite: &BriteId) -> Result<String, KeggError>;
    /// The HTML organism page on the KEGG web site.
    fn show_organism(&self, org: &OrgCode) -> Result<String, KeggError>;
}

#[derive(Clone)]
pub struct KeggHttpClient {
    client: Client,
    api_base: String,
    web_base: String,
}

impl KeggHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, KeggError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kegg-harvest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KeggError::KeggHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| KeggError::KeggHttp(err.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            web_base: config.web_base.clone(),
        })
    }

    pub fn list_url(&self, target: &str) -> String {
        format!("{}/list/{target}", self.api_base)
    }

    pub fn get_url(&self, ids: &[String]) -> String {
        format!("{}/get/{}", self.api_base, ids.join("+"))
    }

    pub fn organism_url(&self, org: &OrgCode) -> String {
        format!(
            "{}/kegg-bin/show_organism?org={}",
            self.web_base,
            org.as_str()
        )
    }

    fn get_text(&self, url: &str) -> Result<String, KeggError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| KeggError::KeggHttp(err.to_string()))?;
        tracing::debug!(url, bytes = body.len(), "kegg.response");
        Ok(body)
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, KeggError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(KeggError::KeggHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, KeggError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "KEGG request failed".to_string());
        Err(KeggError::KeggStatus { status, message })
    }
}

impl KeggClient for KeggHttpClient {
    fn list(&self, target: &str) -> Result<String, KeggError> {
        self.get_text(&self.list_url(target))
    }

    fn get_entries(&self, ids: &[String]) -> Result<String, KeggError> {
        self.get_text(&self.get_url(ids))
    }

    fn get_brite_json(&self, brite: &BriteId) -> Result<Value, KeggError> {
        let url = format!("{}/get/{}/json", self.api_base, brite.qualified());
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| KeggError::Parse(format!("brite {brite} JSON: {err}")))
    }

    fn get_brite_text(&self, brite: &BriteId) -> Result<String, KeggError> {
        self.get_text(&format!("{}/get/{}", self.api_base, brite.qualified()))
    }

    fn show_organism(&self, org: &OrgCode) -> Result<String, KeggError> {
        self.get_text(&self.organism_url(org))
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
