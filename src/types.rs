//! Channel data shared by the cartographer and the brain.

use serde::{Deserialize, Serialize};

use crate::errors::{RebalanceError, Result};

/// Opaque node identifier (hex-encoded public key in practice)
pub type NodeId = String;

/// One direction of a channel: the policy applied to traffic flowing
/// `source -> destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub source: NodeId,
    pub destination: NodeId,
    pub short_channel_id: String,
    pub channel_id: String,
    pub capacity_sat: u64,
    pub base_fee_msat: u64,
    pub fee_per_millionth: u64,
    /// CLTV delta in blocks
    pub delay: u32,
    pub active: bool,
    pub public: bool,
}

impl ChannelRecord {
    /// Create a fee-free record. Fees and delay are set with the `with_*` helpers.
    pub fn new(
        source: impl Into<NodeId>,
        destination: impl Into<NodeId>,
        short_channel_id: impl Into<String>,
        capacity_sat: u64,
    ) -> Self {
        let short_channel_id = short_channel_id.into();
        Self {
            source: source.into(),
            destination: destination.into(),
            channel_id: short_channel_id.clone(),
            short_channel_id,
            capacity_sat,
            base_fee_msat: 0,
            fee_per_millionth: 0,
            delay: 0,
            active: true,
            public: true,
        }
    }

    pub fn with_fees(mut self, base_fee_msat: u64, fee_per_millionth: u64) -> Self {
        self.base_fee_msat = base_fee_msat;
        self.fee_per_millionth = fee_per_millionth;
        self
    }

    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = delay;
        self
    }

    /// Reject records that cannot be placed in a graph
    pub fn validate(&self) -> Result<()> {
        if self.source.is_empty() {
            return Err(RebalanceError::MissingEndpoint {
                short_channel_id: self.short_channel_id.clone(),
                side: "source",
            });
        }
        if self.destination.is_empty() {
            return Err(RebalanceError::MissingEndpoint {
                short_channel_id: self.short_channel_id.clone(),
                side: "destination",
            });
        }
        if self.capacity_sat == 0 {
            return Err(RebalanceError::InvalidChannel {
                id: self.short_channel_id.clone(),
                reason: "capacity must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Fee this channel charges for forwarding `amount_msat`.
    /// The proportional part truncates, as on the wire.
    pub fn fee_for(&self, amount_msat: u64) -> Option<u64> {
        let proportional = (amount_msat as u128 * self.fee_per_millionth as u128) / 1_000_000;
        let proportional = u64::try_from(proportional).ok()?;
        self.base_fee_msat.checked_add(proportional)
    }
}

/// A funded channel of the local node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnChannel {
    pub peer_id: NodeId,
    pub short_channel_id: Option<String>,
    pub balance_sat: u64,
    pub capacity_sat: u64,
}

impl OwnChannel {
    pub fn new(peer_id: impl Into<NodeId>, balance_sat: u64, capacity_sat: u64) -> Result<Self> {
        let peer_id = peer_id.into();

        if peer_id.is_empty() {
            return Err(RebalanceError::MissingEndpoint {
                short_channel_id: "<own channel>".to_string(),
                side: "peer",
            });
        }
        if capacity_sat == 0 {
            return Err(RebalanceError::InvalidChannel {
                id: peer_id,
                reason: "capacity must be positive".to_string(),
            });
        }
        if balance_sat > capacity_sat {
            return Err(RebalanceError::InvalidChannel {
                reason: format!("balance {} exceeds capacity {}", balance_sat, capacity_sat),
                id: peer_id,
            });
        }

        Ok(Self {
            peer_id,
            short_channel_id: None,
            balance_sat,
            capacity_sat,
        })
    }

    pub fn with_short_channel_id(mut self, short_channel_id: impl Into<String>) -> Self {
        self.short_channel_id = Some(short_channel_id.into());
        self
    }

    /// Share of the capacity that sits on our side
    pub fn ratio(&self) -> f64 {
        self.balance_sat as f64 / self.capacity_sat as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_validation() {
        assert!(ChannelRecord::new("A", "B", "1x1x1", 100).validate().is_ok());

        let no_source = ChannelRecord::new("", "B", "1x1x1", 100);
        assert!(matches!(
            no_source.validate(),
            Err(RebalanceError::MissingEndpoint { side: "source", .. })
        ));

        let no_dest = ChannelRecord::new("A", "", "1x1x1", 100);
        assert!(matches!(
            no_dest.validate(),
            Err(RebalanceError::MissingEndpoint { side: "destination", .. })
        ));

        let empty = ChannelRecord::new("A", "B", "1x1x1", 0);
        assert!(matches!(empty.validate(), Err(RebalanceError::InvalidChannel { .. })));
    }

    #[test]
    fn test_fee_for_truncates() {
        let chan = ChannelRecord::new("A", "B", "1x1x1", 100).with_fees(2, 1000);
        assert_eq!(chan.fee_for(100_000), Some(102));
        // 999 * 1000 / 1e6 = 0.999 -> 0
        assert_eq!(chan.fee_for(999), Some(2));
    }

    #[test]
    fn test_own_channel_bounds() {
        let chan = OwnChannel::new("P1", 25, 100).unwrap();
        assert_eq!(chan.ratio(), 0.25);

        assert!(OwnChannel::new("P1", 101, 100).is_err());
        assert!(OwnChannel::new("P1", 0, 0).is_err());
        assert!(OwnChannel::new("", 1, 100).is_err());
    }
}
