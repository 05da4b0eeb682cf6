//! Decoding of GENA NOTIFY bodies into flat field maps
//!
//! AVTransport and RenderingControl publish a single evented variable,
//! `LastChange`, whose text is an escaped XML document:
//!
//! ```text
//! <e:propertyset>
//!   <e:property>
//!     <LastChange>&lt;Event&gt;&lt;InstanceID val="0"&gt;
//!         &lt;Volume channel="Master" val="42"/&gt; ...
//!     </LastChange>
//!   </e:property>
//! </e:propertyset>
//! ```
//!
//! Each child of `InstanceID` becomes one field named after the element with
//! the `val` attribute as value. Channel-scoped variables are kept only for
//! the `Master` channel. Plain evented variables are taken from their text.

use xmltree::{Element, XMLNode};

use crate::actions::MASTER_CHANNEL;
use crate::{ApiError, FieldMap, Result};

/// Parse a NOTIFY request body
pub fn parse_notify(body: &str) -> Result<FieldMap> {
    let root = Element::parse(body.as_bytes())
        .map_err(|e| ApiError::ParseError(format!("Invalid NOTIFY body: {}", e)))?;

    if root.name != "propertyset" {
        return Err(ApiError::ParseError(format!(
            "Expected propertyset, found {}",
            root.name
        )));
    }

    let mut fields = FieldMap::new();
    for property in elements(&root).filter(|e| e.name == "property") {
        for variable in elements(property) {
            let text = variable.get_text().unwrap_or_default();
            if variable.name == "LastChange" {
                parse_last_change(&text, &mut fields)?;
            } else {
                fields.insert(variable.name.clone(), text.trim());
            }
        }
    }

    Ok(fields)
}

fn parse_last_change(xml: &str, fields: &mut FieldMap) -> Result<()> {
    if xml.trim().is_empty() {
        return Ok(());
    }

    let event = Element::parse(xml.as_bytes())
        .map_err(|e| ApiError::ParseError(format!("Invalid LastChange document: {}", e)))?;

    for instance in elements(&event).filter(|e| e.name == "InstanceID") {
        for variable in elements(instance) {
            if let Some(channel) = variable.attributes.get("channel") {
                if channel != MASTER_CHANNEL {
                    continue;
                }
            }
            if let Some(value) = variable.attributes.get("val") {
                fields.insert(variable.name.clone(), value.clone());
            }
        }
    }

    Ok(())
}

fn elements(parent: &Element) -> impl Iterator<Item = &Element> {
    parent.children.iter().filter_map(XMLNode::as_element)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERING_NOTIFY: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/RCS/&quot;&gt;&lt;InstanceID val=&quot;0&quot;&gt;&lt;Volume channel=&quot;Master&quot; val=&quot;42&quot;/&gt;&lt;Volume channel=&quot;LF&quot; val=&quot;100&quot;/&gt;&lt;Mute channel=&quot;Master&quot; val=&quot;1&quot;/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

    const TRANSPORT_NOTIFY: &str = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/AVT/&quot;&gt;&lt;InstanceID val=&quot;0&quot;&gt;&lt;TransportState val=&quot;PAUSED_PLAYBACK&quot;/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

    #[test]
    fn test_rendering_control_last_change() {
        let fields = parse_notify(RENDERING_NOTIFY).unwrap();
        assert_eq!(fields.get("Volume"), Some("42"));
        assert_eq!(fields.get("Mute"), Some("1"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_transport_last_change() {
        let fields = parse_notify(TRANSPORT_NOTIFY).unwrap();
        assert_eq!(fields.get("TransportState"), Some("PAUSED_PLAYBACK"));
    }

    #[test]
    fn test_plain_evented_variable() {
        let body = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
            <e:property><TransportState>PLAYING</TransportState></e:property>
        </e:propertyset>"#;

        let fields = parse_notify(body).unwrap();
        assert_eq!(fields.get("TransportState"), Some("PLAYING"));
    }

    #[test]
    fn test_empty_last_change() {
        let body = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
            <e:property><LastChange></LastChange></e:property>
        </e:propertyset>"#;

        assert!(parse_notify(body).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_malformed_body() {
        assert!(matches!(parse_notify("<not closed"), Err(ApiError::ParseError(_))));
        assert!(matches!(parse_notify("<Event/>"), Err(ApiError::ParseError(_))));
    }
}
