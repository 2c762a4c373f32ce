//! Identity, time and role primitives shared by chains and documents
use super::error::ApprovalError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// bech32 encoded uuid7, see utils::new_uuid_to_bech32
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// encoded as a bare text string
impl<C> minicbor::Encode<C> for UserId {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for UserId {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(UserId(d.str()?.to_string()))
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum DocumentKind {
    #[n(0)]
    Requirement,
    #[n(1)]
    Quotation,
}

impl DocumentKind {
    /// Name of the sled tree holding documents of this kind
    pub fn tree_name(&self) -> &'static str {
        match self {
            DocumentKind::Requirement => "requirements",
            DocumentKind::Quotation => "quotations",
        }
    }
    /// Roles a chain of this kind may ever contain
    pub fn allowed_roles(&self) -> &'static [RoleTag] {
        match self {
            DocumentKind::Requirement => &[
                RoleTag::Requester,
                RoleTag::TechnicalOffice,
                RoleTag::Administration,
                RoleTag::Management,
            ],
            DocumentKind::Quotation => &[
                RoleTag::Requester,
                RoleTag::Logistics,
                RoleTag::Administration,
                RoleTag::Management,
            ],
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Requirement => f.write_str("requirement"),
            DocumentKind::Quotation => f.write_str("quotation"),
        }
    }
}

/// Organisational role expected to sign a slot
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "kebab-case")]
pub enum RoleTag {
    #[n(0)]
    Requester,
    #[n(1)]
    TechnicalOffice,
    #[n(2)]
    Administration,
    #[n(3)]
    Management,
    #[n(4)]
    Logistics,
}

impl RoleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::Requester => "requester",
            RoleTag::TechnicalOffice => "technical-office",
            RoleTag::Administration => "administration",
            RoleTag::Management => "management",
            RoleTag::Logistics => "logistics",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleTag {
    type Err = ApprovalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requester" => Ok(RoleTag::Requester),
            "technical-office" => Ok(RoleTag::TechnicalOffice),
            "administration" => Ok(RoleTag::Administration),
            "management" => Ok(RoleTag::Management),
            "logistics" => Ok(RoleTag::Logistics),
            other => Err(ApprovalError::InvalidConfiguration(format!(
                "unknown role tag '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn user_id_encodes_as_plain_string() {
        let user = UserId::from("user_1abc");

        let encoding = minicbor::to_vec(&user).unwrap();
        let as_string: String = minicbor::decode(&encoding).unwrap();

        assert_eq!(as_string, "user_1abc");
    }

    #[test]
    fn role_tags_parse_their_display_form() {
        for role in [
            RoleTag::Requester,
            RoleTag::TechnicalOffice,
            RoleTag::Administration,
            RoleTag::Management,
            RoleTag::Logistics,
        ] {
            assert_eq!(role.to_string().parse::<RoleTag>().unwrap(), role);
        }
        assert!(matches!(
            "purchasing".parse::<RoleTag>(),
            Err(ApprovalError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn requirement_and_quotation_differ_in_middle_role() {
        assert!(DocumentKind::Requirement
            .allowed_roles()
            .contains(&RoleTag::TechnicalOffice));
        assert!(!DocumentKind::Quotation
            .allowed_roles()
            .contains(&RoleTag::TechnicalOffice));
        assert!(DocumentKind::Quotation
            .allowed_roles()
            .contains(&RoleTag::Logistics));
    }
}
