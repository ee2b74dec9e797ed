//! OGC service exception reports.
//!
//! Servers often answer a failed WMS request with HTTP 200 and an XML
//! exception report instead of the requested document. Both the WMS form
//! (`ServiceExceptionReport/ServiceException`) and the OWS form
//! (`ExceptionReport/Exception/ExceptionText`) are recognised.

use quick_xml::events::Event;
use quick_xml::Reader;
use wms_common::WmsError;

/// First exception found in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceException {
    pub code: Option<String>,
    pub locator: Option<String>,
    pub message: String,
}

impl From<ServiceException> for WmsError {
    fn from(e: ServiceException) -> Self {
        WmsError::ServiceException {
            code: e.code.unwrap_or_else(|| "NoApplicableCode".to_string()),
            message: e.message,
        }
    }
}

/// Parse an exception report, returning `None` for any other document.
pub fn parse_service_exception(xml: &str) -> Option<ServiceException> {
    if !xml.contains("ExceptionReport") {
        return None;
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_report = false;
    let mut current: Option<ServiceException> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ServiceExceptionReport" | b"ExceptionReport" => in_report = true,
                b"ServiceException" | b"Exception" if in_report => {
                    let mut exception = ServiceException {
                        code: None,
                        locator: None,
                        message: String::new(),
                    };
                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value().ok().map(|v| v.into_owned());
                        match attr.key.local_name().as_ref() {
                            b"code" | b"exceptionCode" => exception.code = value,
                            b"locator" => exception.locator = value,
                            _ => {}
                        }
                    }
                    // WMS puts the message directly inside ServiceException
                    in_text = e.local_name().as_ref() == b"ServiceException";
                    current = Some(exception);
                }
                b"ExceptionText" if current.is_some() => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if in_report && current.is_none() {
                    let name = e.local_name();
                    if name.as_ref() == b"ServiceException" || name.as_ref() == b"Exception" {
                        let code = e
                            .attributes()
                            .flatten()
                            .find(|a| {
                                matches!(a.key.local_name().as_ref(), b"code" | b"exceptionCode")
                            })
                            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                        return Some(ServiceException {
                            code,
                            locator: None,
                            message: String::new(),
                        });
                    }
                }
            }
            Ok(Event::Text(t)) if in_text => {
                if let (Some(exception), Ok(text)) = (current.as_mut(), t.unescape()) {
                    exception.message.push_str(text.trim());
                }
            }
            Ok(Event::CData(t)) if in_text => {
                if let Some(exception) = current.as_mut() {
                    exception
                        .message
                        .push_str(String::from_utf8_lossy(&t.into_inner()).trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"ServiceException" | b"Exception" => return current,
                b"ExceptionText" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    current
}
