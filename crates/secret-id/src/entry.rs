//! Stored SecretID and accessor entries.
//!
//! Both are JSON documents. Field names are the stored wire names, which are
//! shared with entries written by earlier releases and must not change.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{cidr::trim_leading_zeroes, ttl};

/// Storage namespace a SecretID lives in.
///
/// Replicated SecretIDs are visible cluster-wide; local ones stay on the node
/// that issued them. The two never share storage keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretIdScope {
    /// `secret_id/` and `accessor/`.
    #[default]
    Replicated,
    /// `secret_id_local/` and `accessor_local/`.
    Local,
}

impl SecretIdScope {
    /// Prefix under which SecretID entries are stored.
    #[must_use]
    pub fn secret_id_prefix(self) -> &'static str {
        match self {
            Self::Replicated => "secret_id/",
            Self::Local => "secret_id_local/",
        }
    }

    /// Prefix under which accessor entries are stored.
    #[must_use]
    pub fn accessor_prefix(self) -> &'static str {
        match self {
            Self::Replicated => "accessor/",
            Self::Local => "accessor_local/",
        }
    }

    pub(crate) fn role_prefix(self, role_digest: &str) -> String {
        format!("{}{role_digest}/", self.secret_id_prefix())
    }

    pub(crate) fn entry_key(self, role_digest: &str, secret_id_digest: &str) -> String {
        format!("{}{role_digest}/{secret_id_digest}", self.secret_id_prefix())
    }

    pub(crate) fn accessor_key(self, accessor_digest: &str) -> String {
        format!("{}{accessor_digest}", self.accessor_prefix())
    }
}

/// A registered SecretID.
///
/// Stored under `<scope prefix><digest(role)>/<digest(secret_id)>`. The
/// SecretID itself is never part of the entry.
///
/// # Example
///
/// ```
/// use chrono::TimeDelta;
/// use warden_secret_id::SecretIdEntry;
///
/// let template = SecretIdEntry::builder()
///     .num_uses(1)
///     .ttl(TimeDelta::minutes(10))
///     .cidr_list(vec!["10.0.0.0/24".to_owned()])
///     .build();
///
/// assert!(template.accessor.is_empty());
/// assert!(template.expires_at.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct SecretIdEntry {
    /// Opaque public handle for listing and revocation. Assigned at registration.
    #[serde(rename = "secret_id_accessor", default)]
    #[builder(default)]
    pub accessor: String,

    /// Remaining uses; `0` is unlimited.
    #[serde(rename = "secret_id_num_uses", default)]
    #[builder(default)]
    pub num_uses: u64,

    /// Requested lifetime, bounded by the system ceiling at registration.
    #[serde(rename = "secret_id_ttl", with = "ttl_nanos", default)]
    #[builder(default = TimeDelta::zero())]
    pub ttl: TimeDelta,

    /// When the entry was registered.
    #[serde(rename = "creation_time")]
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,

    /// When the entry stops being valid. `None` never expires.
    #[serde(rename = "expiration_time", default, deserialize_with = "optional_expiry")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Last write to the entry.
    #[serde(rename = "last_updated_time")]
    #[builder(default = Utc::now())]
    pub last_updated_at: DateTime<Utc>,

    /// Opaque caller metadata.
    #[serde(default)]
    #[builder(default)]
    pub metadata: BTreeMap<String, String>,

    /// Source blocks the SecretID may be redeemed from.
    #[serde(default, deserialize_with = "trimmed_cidrs")]
    #[builder(default)]
    pub cidr_list: Vec<String>,

    /// Blocks bound onto tokens minted with this SecretID.
    #[serde(
        rename = "token_cidr_list",
        alias = "token_bound_cidrs",
        default,
        deserialize_with = "trimmed_cidrs"
    )]
    #[builder(default)]
    pub token_bound_cidrs: Vec<String>,

    /// Deprecated use count kept in step with `num_uses`.
    #[serde(rename = "SecretIDNumUses", default)]
    #[builder(default)]
    pub legacy_num_uses: u64,
}

impl SecretIdEntry {
    /// Reconciles the deprecated use count with the canonical one.
    ///
    /// When the legacy field is set and the canonical one is unset or larger,
    /// the legacy value wins. When the canonical value is smaller, the legacy
    /// field is lowered to match. Returns `true` if the entry changed and
    /// should be written back.
    pub fn reconcile_deprecated_num_uses(&mut self) -> bool {
        let mut dirty = false;
        if self.legacy_num_uses != 0
            && (self.num_uses == 0 || self.legacy_num_uses < self.num_uses)
        {
            self.num_uses = self.legacy_num_uses;
            dirty = true;
        }
        if self.num_uses < self.legacy_num_uses {
            self.legacy_num_uses = self.num_uses;
            dirty = true;
        }
        dirty
    }

    /// Returns `true` if the entry has an expiration and `now` is past it.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Stamps creation and update times and derives the expiration.
    pub(crate) fn stamp_created(&mut self, now: DateTime<Utc>, effective_ttl: TimeDelta) {
        self.created_at = now;
        self.last_updated_at = now;
        self.ttl = effective_ttl;
        self.expires_at = ttl::expiration_for(now, effective_ttl);
    }
}

/// Secondary index entry: accessor to SecretID digest.
///
/// Stored under `<accessor prefix><digest(accessor)>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorEntry {
    /// Digest of the SecretID this accessor refers to.
    #[serde(rename = "secret_id_hmac")]
    pub secret_id_digest: String,
}

/// Entries written by older releases carry the zero timestamp
/// (`0001-01-01T00:00:00Z`) instead of omitting the expiration.
fn optional_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(value.filter(|t| t.timestamp() > ZERO_TIME_SECS))
}

/// Seconds from the Unix epoch to `0001-01-01T00:00:00Z`.
const ZERO_TIME_SECS: i64 = -62_135_596_800;

fn trimmed_cidrs<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.iter().map(|v| trim_leading_zeroes(v)).collect())
}

mod ttl_nanos {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer, ser::Error as _};

    pub(super) fn serialize<S>(ttl: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = ttl.num_nanoseconds().ok_or_else(|| S::Error::custom("ttl out of range"))?;
        serializer.serialize_i64(nanos)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(TimeDelta::nanoseconds)
    }
}
