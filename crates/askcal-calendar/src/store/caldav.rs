//! CalDAV client implementation

use std::time::Duration;

use askcal_core::CalDavConfig;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode, Url};
use tracing::{debug, error, info};

use crate::error::{CalendarError, Result};
use crate::ics::format_utc;
use crate::models::{CalendarHandle, StoredObject};

use super::xml::{DavResponse, parse_multistatus};

const PRINCIPAL_QUERY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:propfind xmlns:D="DAV:">
    <D:prop>
        <D:current-user-principal/>
    </D:prop>
</D:propfind>"#;

const HOME_SET_QUERY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:propfind xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <D:prop>
        <C:calendar-home-set/>
    </D:prop>
</D:propfind>"#;

const CALENDARS_QUERY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:propfind xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <D:prop>
        <D:resourcetype/>
        <D:displayname/>
    </D:prop>
</D:propfind>"#;

/// Low-level CalDAV client bound to one account
pub struct CalDavClient {
    client: Client,
    server_url: Url,
    username: String,
    password: String,
}

impl CalDavClient {
    /// Create a new CalDAV client
    pub fn new(config: &CalDavConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CalendarError::Configuration(e.to_string()))?;

        let server_url = Url::parse(&with_trailing_slash(&config.server_url))
            .map_err(|e| CalendarError::Configuration(format!("Invalid server URL: {}", e)))?;

        debug!("CalDAV client created for: {}", server_url);

        Ok(Self {
            client,
            server_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Resolve an href from a multistatus body against the server
    pub fn resolve(&self, href: &str) -> Result<Url> {
        self.server_url
            .join(href)
            .map_err(|e| CalendarError::CaldavError(format!("Invalid href {}: {}", href, e)))
    }

    /// Find the principal URL, falling back to the server URL
    pub async fn discover_principal(&self) -> Result<Url> {
        let responses = self
            .propfind(self.server_url.as_str(), "0", PRINCIPAL_QUERY)
            .await?;

        match responses.iter().find_map(|r| r.principal_href.as_deref()) {
            Some(href) => self.resolve(href),
            None => {
                debug!("No current-user-principal, using server URL");
                Ok(self.server_url.clone())
            }
        }
    }

    /// List the calendar collections under the principal's calendar home
    pub async fn fetch_calendars(&self, principal: &Url) -> Result<Vec<CalendarHandle>> {
        let home_responses = self.propfind(principal.as_str(), "0", HOME_SET_QUERY).await?;
        let home = match home_responses.iter().find_map(|r| r.home_set_href.as_deref()) {
            Some(href) => self.resolve(href)?,
            None => principal.clone(),
        };

        let responses = self.propfind(home.as_str(), "1", CALENDARS_QUERY).await?;

        let mut calendars = Vec::new();
        for response in responses.into_iter().filter(|r| r.is_calendar) {
            let url = self.resolve(&response.href)?;
            calendars.push(CalendarHandle {
                url: with_trailing_slash(url.as_str()),
                display_name: response.displayname,
            });
        }

        debug!("Found {} calendars under {}", calendars.len(), home);
        Ok(calendars)
    }

    /// Store a new object; refuses to overwrite an existing one
    pub async fn put_object(&self, url: &str, data: &str) -> Result<Option<String>> {
        debug!("Creating object: {}", url);

        let response = self
            .request(Method::PUT, url)
            .header("Content-Type", "text/calendar; charset=utf-8")
            .header("If-None-Match", "*")
            .body(data.to_string())
            .send()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        let response = check_status(response, "Create object").await?;
        let etag = etag_of(&response);

        info!("Created object: {}", url);
        Ok(etag)
    }

    /// Fetch one object by its URL
    pub async fn get_object(&self, url: &str) -> Result<StoredObject> {
        debug!("Fetching object: {}", url);

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CalendarError::EventNotFound(url.to_string()));
        }
        let response = check_status(response, "Fetch object").await?;
        let etag = etag_of(&response);
        let data = response
            .text()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        Ok(StoredObject {
            url: url.to_string(),
            etag,
            data,
        })
    }

    /// Run a calendar-query REPORT, optionally limited to a time range
    pub async fn query(
        &self,
        calendar_url: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<StoredObject>> {
        let body = calendar_query_body(range);

        debug!("Querying events from: {}", calendar_url);

        let response = self
            .request(dav_method("REPORT")?, calendar_url)
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Depth", "1")
            .body(body)
            .send()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        let response = check_status(response, "Calendar query").await?;
        let text = response
            .text()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        let mut objects = Vec::new();
        for r in parse_multistatus(&text)? {
            let Some(data) = r.calendar_data else {
                continue;
            };
            objects.push(StoredObject {
                url: self.resolve(&r.href)?.to_string(),
                etag: r.etag,
                data,
            });
        }

        info!("Fetched {} objects", objects.len());
        Ok(objects)
    }

    /// Delete one object by its URL
    pub async fn delete_object(&self, url: &str) -> Result<()> {
        debug!("Deleting object: {}", url);

        let response = self
            .request(Method::DELETE, url)
            .header("If-Match", "*")
            .send()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CalendarError::EventNotFound(url.to_string()));
        }
        check_status(response, "Delete object").await?;

        info!("Deleted object: {}", url);
        Ok(())
    }

    async fn propfind(
        &self,
        url: &str,
        depth: &str,
        body: &'static str,
    ) -> Result<Vec<DavResponse>> {
        let response = self
            .request(dav_method("PROPFIND")?, url)
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Depth", depth)
            .body(body)
            .send()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        let response = check_status(response, "PROPFIND").await?;
        let text = response
            .text()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        parse_multistatus(&text)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }
}

fn dav_method(name: &str) -> Result<Method> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| CalendarError::Configuration(format!("Invalid method {}: {}", name, e)))
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

fn etag_of(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Map non-2xx responses; 401/403 become authentication failures
async fn check_status(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    error!("{} failed: {} - {}", action, status, error_text);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(CalendarError::Authentication(format!("{} rejected: {}", action, status)));
    }
    Err(CalendarError::CaldavError(format!(
        "{} failed: {} - {}",
        action, status, error_text
    )))
}

fn calendar_query_body(range: Option<(DateTime<Utc>, DateTime<Utc>)>) -> String {
    let filter = match range {
        Some((start, end)) => format!(
            r#"<C:comp-filter name="VEVENT">
                <C:time-range start="{}" end="{}"/>
            </C:comp-filter>"#,
            format_utc(&start),
            format_utc(&end)
        ),
        None => r#"<C:comp-filter name="VEVENT"/>"#.to_string(),
    };

    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <D:prop>
        <D:getetag/>
        <C:calendar-data/>
    </D:prop>
    <C:filter>
        <C:comp-filter name="VCALENDAR">
            {}
        </C:comp-filter>
    </C:filter>
</C:calendar-query>"#,
        filter
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_query_body_range() {
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap();
        let body = calendar_query_body(Some((start, end)));
        assert!(body.contains(
            r#"<C:time-range start="20261016T000000Z" end="20261017T000000Z"/>"#
        ));

        let all = calendar_query_body(None);
        assert!(!all.contains("time-range"));
        assert!(all.contains(r#"<C:comp-filter name="VEVENT"/>"#));
    }

    #[test]
    fn test_resolve_href() {
        let config = CalDavConfig {
            server_url: "http://localhost:5232".to_string(),
            ..CalDavConfig::default()
        };
        let client = CalDavClient::new(&config).unwrap();
        assert_eq!(client.server_url().as_str(), "http://localhost:5232/");
        assert_eq!(
            client.resolve("/calendars/alice/").unwrap().as_str(),
            "http://localhost:5232/calendars/alice/"
        );
        assert_eq!(
            client.resolve("http://other:1/x/").unwrap().as_str(),
            "http://other:1/x/"
        );
    }

    #[test]
    fn test_invalid_server_url() {
        let config = CalDavConfig {
            server_url: "not a url".to_string(),
            ..CalDavConfig::default()
        };
        assert!(matches!(
            CalDavClient::new(&config),
            Err(CalendarError::Configuration(_))
        ));
    }
}
