//! WebDAV multistatus parsing

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{CalendarError, Result};

/// Properties of one `<response>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavResponse {
    pub href: String,
    pub displayname: Option<String>,
    pub is_calendar: bool,
    pub etag: Option<String>,
    pub calendar_data: Option<String>,
    pub principal_href: Option<String>,
    pub home_set_href: Option<String>,
}

/// Properties collected inside one `<propstat>`, kept only if its status is 2xx
#[derive(Default)]
struct PropSet {
    displayname: Option<String>,
    is_calendar: bool,
    etag: Option<String>,
    calendar_data: Option<String>,
    principal_href: Option<String>,
    home_set_href: Option<String>,
    status_ok: Option<bool>,
}

impl PropSet {
    fn merge_into(self, response: &mut DavResponse) {
        if self.status_ok == Some(false) {
            return;
        }
        response.displayname = self.displayname.or(response.displayname.take());
        response.is_calendar |= self.is_calendar;
        response.etag = self.etag.or(response.etag.take());
        response.calendar_data = self.calendar_data.or(response.calendar_data.take());
        response.principal_href = self.principal_href.or(response.principal_href.take());
        response.home_set_href = self.home_set_href.or(response.home_set_href.take());
    }
}

/// Parse a `207 Multi-Status` body
pub fn parse_multistatus(body: &str) -> Result<Vec<DavResponse>> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut responses = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut response: Option<DavResponse> = None;
    let mut props: Option<PropSet> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"response" => response = Some(DavResponse::default()),
                    b"propstat" => props = Some(PropSet::default()),
                    _ => {}
                }
                text.clear();
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"calendar"
                    && stack.last().is_some_and(|n| n == b"resourcetype")
                {
                    if let Some(props) = props.as_mut() {
                        props.is_calendar = true;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let value = e
                    .unescape()
                    .map_err(|e| CalendarError::XmlParseError(e.to_string()))?;
                text.push_str(&value);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => {
                let name = e.local_name().as_ref().to_vec();
                stack.pop();
                let parent = stack.last().map(Vec::as_slice);
                let value = std::mem::take(&mut text);

                match (name.as_slice(), parent) {
                    (b"href", Some(b"response")) => {
                        if let Some(r) = response.as_mut() {
                            r.href = value.trim().to_string();
                        }
                    }
                    (b"href", Some(b"current-user-principal")) => {
                        if let Some(p) = props.as_mut() {
                            p.principal_href = Some(value.trim().to_string());
                        }
                    }
                    (b"href", Some(b"calendar-home-set")) => {
                        if let Some(p) = props.as_mut() {
                            p.home_set_href = Some(value.trim().to_string());
                        }
                    }
                    (b"displayname", _) => {
                        if let Some(p) = props.as_mut() {
                            p.displayname = Some(value).filter(|v| !v.is_empty());
                        }
                    }
                    (b"getetag", _) => {
                        if let Some(p) = props.as_mut() {
                            p.etag = Some(value).filter(|v| !v.is_empty());
                        }
                    }
                    (b"calendar-data", _) => {
                        if let Some(p) = props.as_mut() {
                            p.calendar_data = Some(value).filter(|v| !v.is_empty());
                        }
                    }
                    (b"calendar", Some(b"resourcetype")) => {
                        if let Some(p) = props.as_mut() {
                            p.is_calendar = true;
                        }
                    }
                    (b"status", Some(b"propstat")) => {
                        if let Some(p) = props.as_mut() {
                            p.status_ok = Some(status_is_success(&value));
                        }
                    }
                    (b"propstat", _) => {
                        if let (Some(p), Some(r)) = (props.take(), response.as_mut()) {
                            p.merge_into(r);
                        }
                    }
                    (b"response", _) => {
                        if let Some(r) = response.take() {
                            responses.push(r);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CalendarError::XmlParseError(e.to_string())),
            _ => {}
        }
    }

    Ok(responses)
}

/// `HTTP/1.1 200 OK` style status line
fn status_is_success(status: &str) -> bool {
    status
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .is_some_and(|code| (200..300).contains(&code))
}
