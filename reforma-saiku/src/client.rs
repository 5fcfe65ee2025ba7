//! HTTP client for the Saiku REST endpoints: session establishment, level
//! member listing and query execution. The cookie store carries the service
//! session between the calls of one request; credentials go as basic auth.

use log::debug;
use reqwest::StatusCode;
use url::Url;

use reforma_core::{Element, ReportError};

use crate::model::{SaikuQuery, SaikuQueryResult, SaikuSetSession};

const SEARCH_LIMIT: u32 = 1000;

#[derive(Clone)]
pub struct SaikuClient {
    http: reqwest::Client,
    base_url: Url,
    login: String,
    password: String,
}

impl SaikuClient {
    pub fn new(base_url: &str, login: &str, password: &str) -> Result<Self, ReportError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ReportError::Upstream(format!("неверный адрес OLAP сервиса: {}", err)))?;

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(ReportError::upstream)?;

        Ok(SaikuClient {
            http,
            base_url,
            login: login.to_owned(),
            password: password.to_owned(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ReportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReportError::Upstream("неверный адрес OLAP сервиса".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ReportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ReportError::Upstream(match status {
            StatusCode::UNAUTHORIZED => "OLAP сервис отклонил авторизацию".to_owned(),
            _ => format!("OLAP сервис вернул {}: {}", status, body),
        }))
    }

    /// Establishes (or refreshes) the named query session.
    pub async fn set_session(&self, session: &SaikuSetSession) -> Result<(), ReportError> {
        let json = serde_json::to_string(session).map_err(ReportError::upstream)?;
        debug!("saiku session {}", session.name);

        let response = self
            .http
            .post(self.endpoint(&["query", &session.name])?)
            .basic_auth(&self.login, Some(&self.password))
            .form(&[("json", json)])
            .send()
            .await
            .map_err(ReportError::upstream)?;

        Self::ensure_success(response).await.map(|_| ())
    }

    /// Lists a level's members, optionally narrowed by a search string. The
    /// result count is capped server-side.
    pub async fn level_members(
        &self,
        session_name: &str,
        hierarchy: &str,
        level: &str,
        search: Option<&str>,
    ) -> Result<Vec<Element>, ReportError> {
        let mut url = self.endpoint(&[
            "query",
            session_name,
            "result",
            "metadata",
            "hierarchies",
            hierarchy,
            "levels",
            level,
        ])?;
        url.query_pairs_mut()
            .append_pair("searchlimit", &SEARCH_LIMIT.to_string());
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            url.query_pairs_mut().append_pair("search", search);
        }

        let response = self
            .http
            .get(url)
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await
            .map_err(ReportError::upstream)?;

        Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(ReportError::upstream)
    }

    pub async fn execute(&self, query: &SaikuQuery) -> Result<SaikuQueryResult, ReportError> {
        let response = self
            .http
            .post(self.endpoint(&["query", "execute"])?)
            .basic_auth(&self.login, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(query)
            .send()
            .await
            .map_err(ReportError::upstream)?;

        Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(ReportError::upstream)
    }
}
