//! Snapshot Loader
//!
//! Reads persisted `listchannels` / `listfunds` style JSON dumps into
//! validated channel records. Numbers may arrive as JSON numbers or as
//! decimal strings; both are accepted. Amount strings may carry a unit
//! suffix, which is honored per field.

use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{RebalanceError, Result};
use crate::types::{ChannelRecord, OwnChannel};

// ============================================
// RAW JSON SHAPES
// ============================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Int(u64),
    Text(String),
}

impl Numeric {
    fn into_u64<E: serde::de::Error>(self) -> std::result::Result<u64, E> {
        match self {
            Numeric::Int(n) => Ok(n),
            Numeric::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

/// Plain count such as a fee rate or a delay
fn numeric<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Numeric::deserialize(deserializer)?.into_u64()
}

/// Millisatoshi amount; a trailing `msat` is accepted
fn msat<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Numeric::deserialize(deserializer)? {
        Numeric::Text(s) => Numeric::Text(s.trim().trim_end_matches("msat").to_string()).into_u64(),
        n => n.into_u64(),
    }
}

/// Satoshi amount. A `sat` suffix is accepted; an `msat` suffix is converted,
/// rounding down to whole satoshis.
fn sat<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Numeric::deserialize(deserializer)? {
        Numeric::Text(s) => {
            let s = s.trim();
            match s.strip_suffix("msat") {
                Some(millis) => Numeric::Text(millis.to_string())
                    .into_u64()
                    .map(|millis: u64| millis / 1000),
                None => Numeric::Text(s.trim_end_matches("sat").to_string()).into_u64(),
            }
        }
        n => n.into_u64(),
    }
}

fn optional_sat<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    sat(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    #[serde(default)]
    source: String,
    #[serde(default)]
    destination: String,
    #[serde(default)]
    short_channel_id: String,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default, alias = "capacity_sat", deserialize_with = "optional_sat")]
    satoshis: Option<u64>,
    #[serde(default, deserialize_with = "msat")]
    base_fee_millisatoshi: u64,
    #[serde(default, deserialize_with = "numeric")]
    fee_per_millionth: u64,
    #[serde(default, deserialize_with = "numeric")]
    delay: u64,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default = "default_true")]
    public: bool,
}

#[derive(Debug, Deserialize)]
struct RawFund {
    #[serde(default)]
    peer_id: String,
    #[serde(default)]
    short_channel_id: Option<String>,
    #[serde(deserialize_with = "sat")]
    channel_sat: u64,
    #[serde(deserialize_with = "sat")]
    channel_total_sat: u64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    channels: Vec<T>,
}

impl TryFrom<RawChannel> for ChannelRecord {
    type Error = RebalanceError;

    fn try_from(raw: RawChannel) -> Result<Self> {
        let capacity_sat = raw.satoshis.unwrap_or(0);
        let delay = u32::try_from(raw.delay).map_err(|_| RebalanceError::InvalidChannel {
            id: raw.short_channel_id.clone(),
            reason: format!("delay {} out of range", raw.delay),
        })?;

        let record = ChannelRecord {
            channel_id: raw
                .channel_id
                .unwrap_or_else(|| raw.short_channel_id.clone()),
            source: raw.source,
            destination: raw.destination,
            short_channel_id: raw.short_channel_id,
            capacity_sat,
            base_fee_msat: raw.base_fee_millisatoshi,
            fee_per_millionth: raw.fee_per_millionth,
            delay,
            active: raw.active,
            public: raw.public,
        };
        record.validate()?;
        Ok(record)
    }
}

impl TryFrom<RawFund> for OwnChannel {
    type Error = RebalanceError;

    fn try_from(raw: RawFund) -> Result<Self> {
        let channel = OwnChannel::new(raw.peer_id, raw.channel_sat, raw.channel_total_sat)?;
        Ok(match raw.short_channel_id {
            Some(scid) => channel.with_short_channel_id(scid),
            None => channel,
        })
    }
}

// ============================================
// LOADERS
// ============================================

/// Parse a `{"channels": [...]}` network dump
pub fn parse_channels(json: &str) -> Result<Vec<ChannelRecord>> {
    let envelope: Envelope<RawChannel> = serde_json::from_str(json)?;
    envelope
        .channels
        .into_iter()
        .map(ChannelRecord::try_from)
        .collect()
}

/// Parse a `{"channels": [...]}` funds dump of our own channels.
/// Entries without a peer (unconfirmed or closing) are skipped.
pub fn parse_own_channels(json: &str) -> Result<Vec<OwnChannel>> {
    let envelope: Envelope<RawFund> = serde_json::from_str(json)?;
    let mut channels = Vec::with_capacity(envelope.channels.len());
    let mut skipped = 0;

    for raw in envelope.channels {
        if raw.peer_id.is_empty() || raw.channel_total_sat == 0 {
            skipped += 1;
            continue;
        }
        channels.push(OwnChannel::try_from(raw)?);
    }

    if skipped > 0 {
        warn!("Skipped {} own channels without peer or capacity", skipped);
    }
    Ok(channels)
}

pub fn load_channels<P: AsRef<Path>>(path: P) -> Result<Vec<ChannelRecord>> {
    let start = Instant::now();
    let content = fs::read_to_string(path.as_ref())?;
    let channels = parse_channels(&content)?;

    info!(
        "Loaded {} channel records from {} in {:?}",
        channels.len(),
        path.as_ref().display(),
        start.elapsed()
    );
    debug!(
        "  {} inactive, {} private",
        channels.iter().filter(|c| !c.active).count(),
        channels.iter().filter(|c| !c.public).count()
    );
    Ok(channels)
}

pub fn load_own_channels<P: AsRef<Path>>(path: P) -> Result<Vec<OwnChannel>> {
    let content = fs::read_to_string(path.as_ref())?;
    let channels = parse_own_channels(&content)?;

    info!(
        "Loaded {} own channels from {}",
        channels.len(),
        path.as_ref().display()
    );
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channels_accepts_strings_and_numbers() {
        let json = r#"{
            "channels": [
                {
                    "source": "A", "destination": "B",
                    "short_channel_id": "556297x1498x1",
                    "satoshis": "250000",
                    "base_fee_millisatoshi": 1000,
                    "fee_per_millionth": "10",
                    "delay": 14,
                    "active": true, "public": true
                },
                {
                    "source": "B", "destination": "A",
                    "short_channel_id": "556297x1498x1",
                    "channel_id": "deadbeef",
                    "capacity_sat": 250000,
                    "base_fee_millisatoshi": "0",
                    "fee_per_millionth": 1,
                    "delay": "144",
                    "active": false
                }
            ]
        }"#;

        let channels = parse_channels(json).unwrap();
        assert_eq!(channels.len(), 2);

        assert_eq!(channels[0].capacity_sat, 250_000);
        assert_eq!(channels[0].fee_per_millionth, 10);
        assert_eq!(channels[0].channel_id, "556297x1498x1");

        assert_eq!(channels[1].channel_id, "deadbeef");
        assert_eq!(channels[1].delay, 144);
        assert!(!channels[1].active);
        assert!(channels[1].public);
    }

    #[test]
    fn test_parse_channels_rejects_missing_endpoint() {
        let json = r#"{"channels": [{"destination": "B", "short_channel_id": "1x1x1", "satoshis": 10}]}"#;
        assert!(matches!(
            parse_channels(json),
            Err(RebalanceError::MissingEndpoint { .. })
        ));
    }

    #[test]
    fn test_parse_own_channels() {
        let json = r#"{
            "channels": [
                {"peer_id": "P1", "short_channel_id": "1x1x1", "channel_sat": "1", "channel_total_sat": "100"},
                {"peer_id": "P2", "channel_sat": 99, "channel_total_sat": 100},
                {"peer_id": "", "channel_sat": 0, "channel_total_sat": 0}
            ]
        }"#;

        let own = parse_own_channels(json).unwrap();
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].short_channel_id.as_deref(), Some("1x1x1"));
        assert_eq!(own[1].balance_sat, 99);
    }

    #[test]
    fn test_amount_suffixes_respect_units() {
        let json = r#"{
            "channels": [
                {"peer_id": "P1", "channel_sat": "5000msat", "channel_total_sat": "100000"},
                {"peer_id": "P2", "channel_sat": "7sat", "channel_total_sat": "100999msat"}
            ]
        }"#;
        let own = parse_own_channels(json).unwrap();
        assert_eq!(own[0].balance_sat, 5);
        assert_eq!(own[0].capacity_sat, 100_000);
        assert_eq!(own[1].balance_sat, 7);
        assert_eq!(own[1].capacity_sat, 100);

        let json = r#"{"channels": [{
            "source": "A", "destination": "B", "short_channel_id": "1x1x1",
            "satoshis": "250000000msat", "base_fee_millisatoshi": "1000msat",
            "fee_per_millionth": "10"
        }]}"#;
        let channels = parse_channels(json).unwrap();
        assert_eq!(channels[0].capacity_sat, 250_000);
        assert_eq!(channels[0].base_fee_msat, 1000);
    }

    #[test]
    fn test_unit_suffix_rejected_on_plain_counts() {
        let json = r#"{"channels": [{
            "source": "A", "destination": "B", "short_channel_id": "1x1x1",
            "satoshis": 10, "fee_per_millionth": "10msat"
        }]}"#;
        assert!(matches!(parse_channels(json), Err(RebalanceError::SerdeJson(_))));
    }

    #[test]
    fn test_parse_own_channels_rejects_overdrawn() {
        let json = r#"{"channels": [{"peer_id": "P1", "channel_sat": 101, "channel_total_sat": 100}]}"#;
        assert!(matches!(
            parse_own_channels(json),
            Err(RebalanceError::InvalidChannel { .. })
        ));
    }
}
