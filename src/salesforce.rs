//! Remote fetch collaborator: given a query string, returns opportunity
//! rows or fails. The production implementation signs in with the SOAP
//! username-password flow (password + security token concatenated, the same
//! mechanism the platform's scripting clients use) and then runs the query
//! through the REST data API.

use crate::config::Credentials;
use crate::errors::FetchError;
use crate::models::Opportunity;
use crate::period::REFERENCE_TZ;
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

const API_VERSION: &str = "59.0";

#[async_trait]
pub trait OpportunityFetcher: Send + Sync {
    async fn fetch_opportunities(&self, soql: &str) -> Result<Vec<Opportunity>, FetchError>;
}

#[derive(Debug, Clone)]
struct SalesforceSession {
    session_id: String,
    instance_url: String,
}

pub struct SalesforceClient {
    http: reqwest::Client,
    credentials: Credentials,
    session: Mutex<Option<SalesforceSession>>,
}

impl SalesforceClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            session: Mutex::new(None),
        }
    }

    async fn session(&self) -> Result<SalesforceSession, FetchError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.login().await?;
        info!("signed in to {}", session.instance_url);
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn login(&self) -> Result<SalesforceSession, FetchError> {
        let username = self
            .credentials
            .username
            .as_deref()
            .ok_or_else(|| FetchError::Remote("SF_USERNAME_PRO is not set".into()))?;
        let password = self
            .credentials
            .password
            .as_deref()
            .ok_or_else(|| FetchError::Remote("SF_PASSWORD_PRO is not set".into()))?;
        let token = self
            .credentials
            .security_token
            .as_deref()
            .ok_or_else(|| FetchError::Remote("SF_SECURITY_TOKEN_PRO is not set".into()))?;

        let endpoint = format!(
            "{}/services/Soap/u/{API_VERSION}",
            self.credentials.login_url()
        );
        let body = login_envelope(username, &format!("{password}{token}"));

        let response = self
            .http
            .post(endpoint)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(body)
            .send()
            .await
            .map_err(|err| FetchError::Remote(err.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|err| FetchError::Remote(err.to_string()))?;

        if let Some(fault) = extract_tag(&text, "faultstring") {
            return Err(FetchError::Remote(fault.to_string()));
        }

        let session_id = extract_tag(&text, "sessionId")
            .ok_or_else(|| FetchError::Remote("login response had no sessionId".into()))?;
        let server_url = extract_tag(&text, "serverUrl")
            .ok_or_else(|| FetchError::Remote("login response had no serverUrl".into()))?;

        Ok(SalesforceSession {
            session_id: session_id.to_string(),
            instance_url: instance_base(server_url).to_string(),
        })
    }
}

#[async_trait]
impl OpportunityFetcher for SalesforceClient {
    async fn fetch_opportunities(&self, soql: &str) -> Result<Vec<Opportunity>, FetchError> {
        let session = self.session().await?;
        let endpoint = format!(
            "{}/services/data/v{API_VERSION}/query",
            session.instance_url
        );

        let response = self
            .http
            .get(endpoint)
            .bearer_auth(&session.session_id)
            .query(&[("q", soql)])
            .send()
            .await
            .map_err(|err| FetchError::Remote(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                // Session expired server-side; drop it so the next explicit
                // attempt signs in again. No automatic retry.
                *self.session.lock().await = None;
            }
            let detail = response.text().await.unwrap_or_default();
            return Err(FetchError::Remote(format!("query failed ({status}): {detail}")));
        }

        let payload: QueryResponse = response
            .json()
            .await
            .map_err(|err| FetchError::Remote(err.to_string()))?;

        payload
            .records
            .into_iter()
            .map(|row| {
                Ok(Opportunity {
                    created_at: parse_created_date(&row.created_date)?,
                    id: row.id,
                    name: row.name,
                    stage: row.stage_name,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    records: Vec<OpportunityRow>,
}

#[derive(Debug, Deserialize)]
struct OpportunityRow {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "StageName")]
    stage_name: String,
    #[serde(rename = "CreatedDate")]
    created_date: String,
}

fn login_envelope(username: &str, password: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:partner.soap.sforce.com">
  <env:Body>
    <urn:login>
      <urn:username>{}</urn:username>
      <urn:password>{}</urn:password>
    </urn:login>
  </env:Body>
</env:Envelope>"#,
        xml_escape(username),
        xml_escape(password)
    )
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Pulls the text of the first `<tag>...</tag>` pair out of a SOAP payload.
/// The two login fields we need are flat text nodes, so a full XML parser
/// would be overkill here.
fn extract_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(&xml[start..end])
}

/// `serverUrl` points at the SOAP endpoint; the REST base is its origin.
fn instance_base(server_url: &str) -> &str {
    server_url
        .split_once("/services/")
        .map(|(base, _)| base)
        .unwrap_or(server_url)
}

/// The API emits `2024-03-08T15:00:00.000+0000`; accept that and plain
/// RFC 3339, and normalize to the reference timezone.
fn parse_created_date(raw: &str) -> Result<DateTime<Tz>, FetchError> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|t| t.with_timezone(&REFERENCE_TZ))
        .map_err(|err| FetchError::Remote(format!("bad CreatedDate '{raw}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn extracts_flat_tags() {
        let xml = "<res><sessionId>abc123</sessionId><serverUrl>https://x/services/Soap/u/59.0/00D</serverUrl></res>";
        assert_eq!(extract_tag(xml, "sessionId"), Some("abc123"));
        assert_eq!(
            extract_tag(xml, "serverUrl"),
            Some("https://x/services/Soap/u/59.0/00D")
        );
        assert_eq!(extract_tag(xml, "faultstring"), None);
    }

    #[test]
    fn instance_base_strips_soap_path() {
        assert_eq!(
            instance_base("https://na139.salesforce.com/services/Soap/u/59.0/00Dxx"),
            "https://na139.salesforce.com"
        );
        assert_eq!(instance_base("https://plain.example"), "https://plain.example");
    }

    #[test]
    fn login_envelope_escapes_credentials() {
        let envelope = login_envelope("a&b@example.com", "p<w>d'\"");
        assert!(envelope.contains("a&amp;b@example.com"));
        assert!(envelope.contains("p&lt;w&gt;d&apos;&quot;"));
    }

    #[test]
    fn created_date_accepts_api_format() {
        let parsed = parse_created_date("2024-03-08T15:00:00.000+0000").unwrap();
        assert_eq!(parsed.hour(), 10);
        assert_eq!(parsed.format("%:z").to_string(), "-05:00");

        let rfc = parse_created_date("2024-03-08T15:00:00Z").unwrap();
        assert_eq!(rfc, parsed);
    }

    #[test]
    fn created_date_rejects_garbage() {
        assert!(matches!(
            parse_created_date("yesterday"),
            Err(FetchError::Remote(_))
        ));
    }
}
