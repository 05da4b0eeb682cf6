//! Device identity and descriptive metadata

use serde::{Deserialize, Serialize};

/// Descriptive fields from the device description document
///
/// Every field is optional: re-discovery may re-supply only some of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub udn: Option<String>,
    pub friendly_name: Option<String>,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
}

/// Stable identity of one renderer instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    usn: String,
    description: DeviceDescription,
}

impl DeviceIdentity {
    pub fn new(usn: impl Into<String>, description: DeviceDescription) -> Self {
        Self {
            usn: usn.into(),
            description,
        }
    }

    /// Unique service name; never changes
    pub fn usn(&self) -> &str {
        &self.usn
    }

    pub fn description(&self) -> &DeviceDescription {
        &self.description
    }

    /// Name for log lines: the friendly name when known, the USN otherwise
    pub fn display_name(&self) -> &str {
        self.description.friendly_name.as_deref().unwrap_or(&self.usn)
    }

    /// Merge a re-supplied description; absent fields keep their value
    pub fn update_description(&mut self, update: DeviceDescription) {
        let DeviceDescription {
            udn,
            friendly_name,
            manufacturer,
            model_name,
            serial_number,
        } = update;

        let current = &mut self.description;
        merge(&mut current.udn, udn);
        merge(&mut current.friendly_name, friendly_name);
        merge(&mut current.manufacturer, manufacturer);
        merge(&mut current.model_name, model_name);
        merge(&mut current.serial_number, serial_number);
    }
}

fn merge(field: &mut Option<String>, update: Option<String>) {
    if let Some(value) = update.filter(|v| !v.is_empty()) {
        *field = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new(
            "uuid:abc::urn:schemas-upnp-org:device:MediaRenderer:1",
            DeviceDescription {
                udn: Some("uuid:abc".to_string()),
                friendly_name: Some("Living Room TV".to_string()),
                manufacturer: Some("Acme".to_string()),
                model_name: Some("X1".to_string()),
                serial_number: None,
            },
        )
    }

    #[test]
    fn test_update_only_touches_supplied_fields() {
        let mut identity = identity();
        identity.update_description(DeviceDescription {
            model_name: Some("X2".to_string()),
            serial_number: Some("SN-9".to_string()),
            ..Default::default()
        });

        let description = identity.description();
        assert_eq!(description.friendly_name.as_deref(), Some("Living Room TV"));
        assert_eq!(description.manufacturer.as_deref(), Some("Acme"));
        assert_eq!(description.model_name.as_deref(), Some("X2"));
        assert_eq!(description.serial_number.as_deref(), Some("SN-9"));
    }

    #[test]
    fn test_empty_strings_are_not_supplied() {
        let mut identity = identity();
        identity.update_description(DeviceDescription {
            friendly_name: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(identity.display_name(), "Living Room TV");
    }

    #[test]
    fn test_display_name_falls_back_to_usn() {
        let identity = DeviceIdentity::new("uuid:xyz", DeviceDescription::default());
        assert_eq!(identity.display_name(), "uuid:xyz");
    }
}
