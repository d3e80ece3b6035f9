use serde::Deserialize;
use serde_json::Value;

use super::WebhookError;

pub const USER_CREATED: &str = "user.created";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

/// Payload of `user.created`. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreatedData {
    pub id: String,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub email_addresses: Option<Vec<EmailAddress>>,
}

impl UserCreatedData {
    pub fn email_addresses(&self) -> &[EmailAddress] {
        self.email_addresses.as_deref().unwrap_or_default()
    }

    /// The address whose id matches `primary_email_address_id`.
    pub fn primary_email(&self) -> Option<&str> {
        let primary_id = self.primary_email_address_id.as_deref()?;
        self.email_addresses()
            .iter()
            .find(|e| e.id == primary_id)
            .map(|e| e.email_address.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum ProvisioningEvent {
    UserCreated(UserCreatedData),
    Other { event_type: String },
}

impl ProvisioningEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        if envelope.event_type == USER_CREATED {
            let data: UserCreatedData = serde_json::from_value(envelope.data)?;
            Ok(ProvisioningEvent::UserCreated(data))
        } else {
            Ok(ProvisioningEvent::Other {
                event_type: envelope.event_type,
            })
        }
    }
}
