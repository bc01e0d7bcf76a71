use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Who authored a message or a typing signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Customer,
    Admin,
}

impl SenderRole {
    /// The role on the other side of the conversation.
    pub fn counterpart(self) -> Self {
        match self {
            SenderRole::Customer => SenderRole::Admin,
            SenderRole::Admin => SenderRole::Customer,
        }
    }
}

/// Domain model for one chat message.
///
/// The backend is not consistent about field casing, so the snake_case
/// spellings are accepted as aliases. Identifiers may arrive as JSON numbers.
/// `created_at` is display-only: a timestamp that cannot be read becomes
/// `None` rather than rejecting the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message: String,
    #[serde(default, alias = "sender_id", deserialize_with = "id_string")]
    pub sender_id: String,
    #[serde(alias = "sender_role", alias = "sender_type", alias = "senderType")]
    pub sender_role: SenderRole,
    #[serde(default, alias = "recipient_id", deserialize_with = "optional_id_string")]
    pub recipient_id: Option<String>,
    #[serde(
        default,
        alias = "created_at",
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// The signed-in customer, as stored by the storefront login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(alias = "_id", alias = "userId", deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
}

/// Credentials snapshot handed to a chat session when it is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    EpochMillis(i64),
    Other(IgnoredAny),
}

impl RawTimestamp {
    fn into_utc(self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Text(text) => parse_timestamp(&text),
            RawTimestamp::EpochMillis(millis) => DateTime::from_timestamp_millis(millis),
            RawTimestamp::Other(_) => None,
        }
    }
}

/// RFC 3339 first, then an offset-less datetime taken as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok());
    if naive.is_none() {
        log::debug!("Unreadable message timestamp {text:?}; showing none");
    }
    naive.map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawTimestamp>::deserialize(deserializer).map(|raw| raw.and_then(RawTimestamp::into_utc))
}
