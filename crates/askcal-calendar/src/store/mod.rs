//! Calendar store gateway
//!
//! Owns the one authenticated CalDAV session shared by every tool call.

mod caldav;
mod session;
mod xml;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use askcal_core::CalDavConfig;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{CalendarError, Result};
use crate::ics::IcsWriter;
use crate::models::{CalendarEvent, CalendarHandle};

pub use caldav::CalDavClient;
pub use session::SessionSlot;
pub use xml::{DavResponse, parse_multistatus};

/// An authenticated client plus the calendar new events go to
pub struct StoreSession {
    pub client: CalDavClient,
    pub primary: CalendarHandle,
}

/// Gateway to the calendar store
///
/// The session is established on first use. Concurrent first callers share
/// one handshake; an authentication failure drops the session so the next
/// call starts over.
pub struct CalendarStore {
    config: CalDavConfig,
    writer: IcsWriter,
    session: SessionSlot<StoreSession>,
    handshakes: AtomicUsize,
}

impl CalendarStore {
    pub fn new(config: CalDavConfig) -> Self {
        let writer = IcsWriter::new(config.uid_domain.clone());
        Self {
            config,
            writer,
            session: SessionSlot::new(),
            handshakes: AtomicUsize::new(0),
        }
    }

    pub fn writer(&self) -> &IcsWriter {
        &self.writer
    }

    /// Number of handshakes attempted so far
    pub fn handshake_count(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub async fn is_connected(&self) -> bool {
        self.session.is_connected().await
    }

    /// Current session, connecting if needed
    pub async fn session(&self) -> Result<Arc<StoreSession>> {
        self.session.get_or_connect(|| self.handshake()).await
    }

    async fn handshake(&self) -> Result<StoreSession> {
        let attempt = self.handshakes.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(attempt, "Connecting to CalDAV server {}", self.config.server_url);

        let client = CalDavClient::new(&self.config)?;
        let principal = client.discover_principal().await?;
        let primary = client
            .fetch_calendars(&principal)
            .await?
            .into_iter()
            .next()
            .ok_or(CalendarError::NoCalendars)?;

        info!(
            "CalDAV session established, primary calendar: {} ({})",
            primary.url,
            primary.display_name.as_deref().unwrap_or("unnamed")
        );

        Ok(StoreSession { client, primary })
    }

    /// Run `op` with a session, dropping the session if the store rejects it
    async fn with_session<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<StoreSession>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.session().await?;
        let result = op(Arc::clone(&session)).await;

        if let Err(e) = &result {
            if e.is_auth_failure() && self.session.invalidate(&session).await {
                warn!(error = %e, "CalDAV authentication failed, session reset");
            }
        }
        result
    }

    /// Validate, serialize and store `event` in the primary calendar
    ///
    /// Returns the locator of the new object.
    pub async fn create_event(&self, event: &CalendarEvent) -> Result<String> {
        event.validate()?;
        let document = self.writer.serialize(event);

        self.with_session(|session| async move {
            let locator = format!(
                "{}{}.ics",
                session.primary.url,
                object_name(document.uid())
            );
            session.client.put_object(&locator, document.as_str()).await?;
            Ok(locator)
        })
        .await
    }

    /// Raw document stored at `locator`
    pub async fn fetch_by_locator(&self, locator: &str) -> Result<String> {
        self.with_session(|session| async move {
            Ok(session.client.get_object(locator).await?.data)
        })
        .await
    }

    /// Every document in the primary calendar
    pub async fn list_all(&self) -> Result<Vec<String>> {
        self.with_session(|session| async move {
            let objects = session.client.query(&session.primary.url, None).await?;
            Ok(objects.into_iter().map(|o| o.data).collect())
        })
        .await
    }

    /// Documents with events overlapping `[start, end)`
    pub async fn list_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        self.with_session(|session| async move {
            let objects = session
                .client
                .query(&session.primary.url, Some((start, end)))
                .await?;
            Ok(objects.into_iter().map(|o| o.data).collect())
        })
        .await
    }

    pub async fn delete_event(&self, locator: &str) -> Result<()> {
        self.with_session(|session| async move { session.client.delete_object(locator).await })
            .await
    }
}

/// Path segment for an object named after `uid`
fn object_name(uid: &str) -> String {
    uid.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
