//! Time-ordered unique IDs, minted application-side.
//!
//! A snowflake packs a millisecond timestamp relative to a deployment epoch,
//! the id of the minting node, and a per-node sequence counter into 63 bits,
//! so id order agrees with creation order.

use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u32 = 41;
pub const NODE_ID_BITS: u32 = 10;
pub const SEQUENCE_BITS: u32 = 12;

pub const TIMESTAMP_SHIFT: u32 = NODE_ID_BITS + SEQUENCE_BITS;
pub const NODE_ID_SHIFT: u32 = SEQUENCE_BITS;

/// The instant snowflake timestamps are measured from.
pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimeError {
    #[error("Time was before the snowflake epoch.")]
    BeforeEpoch,
    #[error("Time is too far past the epoch to fit the timestamp field.")]
    TooFarAhead,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct NodeId(u16);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct Sequence(u16);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake part was out of range: {0}")]
pub struct SnowflakePartOutOfRangeError(u16);

impl NodeId {
    #[must_use]
    pub fn new(id: u16) -> Option<Self> {
        (id < 1 << NODE_ID_BITS).then_some(Self(id))
    }

    #[must_use]
    pub fn new_unchecked(id: u16) -> Self {
        Self::new(id).expect("NodeId out of range.")
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for NodeId {
    type Error = SnowflakePartOutOfRangeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(SnowflakePartOutOfRangeError(value))
    }
}

impl Sequence {
    #[must_use]
    pub fn new(sequence: u16) -> Option<Self> {
        (sequence < 1 << SEQUENCE_BITS).then_some(Self(sequence))
    }

    #[must_use]
    pub fn new_unchecked(sequence: u16) -> Self {
        Self::new(sequence).expect("Sequence out of range.")
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn wrapping_next(self) -> Self {
        Self((self.0 + 1) % (1 << SEQUENCE_BITS))
    }
}

impl TryFrom<u16> for Sequence {
    type Error = SnowflakePartOutOfRangeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(SnowflakePartOutOfRangeError(value))
    }
}

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(millis_since_epoch: u64, node_id: NodeId, sequence: Sequence) -> Self {
        let snowflake = millis_since_epoch << TIMESTAMP_SHIFT
            | u64::from(node_id.get()) << NODE_ID_SHIFT
            | u64::from(sequence.get());

        Self::new(snowflake)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn millis_since_epoch(self) -> u64 {
        self.0 >> TIMESTAMP_SHIFT
    }

    #[must_use]
    pub fn node_id(self) -> NodeId {
        #[allow(clippy::cast_possible_truncation)]
        NodeId::new_unchecked(((self.0 >> NODE_ID_SHIFT) & ((1 << NODE_ID_BITS) - 1)) as u16)
    }

    #[must_use]
    pub fn sequence(self) -> Sequence {
        #[allow(clippy::cast_possible_truncation)]
        Sequence::new_unchecked((self.0 & ((1 << SEQUENCE_BITS) - 1)) as u16)
    }

    /// The creation instant embedded in the id.
    #[must_use]
    pub fn timestamp(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(self.millis_since_epoch().cast_signed())
    }

    pub fn millis_at(time: UtcDateTime) -> Result<u64, SnowflakeTimeError>
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        if millis < 0 {
            return Err(SnowflakeTimeError::BeforeEpoch);
        }
        let millis = u64::try_from(millis).map_err(|_| SnowflakeTimeError::TooFarAhead)?;
        if millis < 1 << TIMESTAMP_BITS {
            Ok(millis)
        } else {
            Err(SnowflakeTimeError::TooFarAhead)
        }
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    node_id: NodeId,
    next_sequence: Sequence,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            next_sequence: Sequence::default(),
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn generate_at(&mut self, time: UtcDateTime) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        let sequence = self.next_sequence;
        self.next_sequence = sequence.wrapping_next();

        let millis = Snowflake::<SnowflakeEpoch>::millis_at(time)
            .expect("Time outside the snowflake epoch range.");

        Snowflake::from_parts(millis, self.node_id, sequence)
    }

    pub fn generate(&mut self) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use crate::snowflake::{
        Epoch, NodeId, Sequence, Snowflake, SnowflakeGenerator, SnowflakeTimeError,
    };
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    struct TestEpoch;
    impl Epoch for TestEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2020-01-01 00:00);
    }

    #[test]
    fn part_ranges() {
        assert!(NodeId::new(0).is_some());
        assert!(NodeId::new(0x3FF).is_some());
        assert!(NodeId::new(0x400).is_none());
        assert!(NodeId::new(u16::MAX).is_none());

        assert!(Sequence::new(0).is_some());
        assert!(Sequence::new(0xFFF).is_some());
        assert!(Sequence::new(0x1000).is_none());
    }

    #[test]
    fn sequence_wraps() {
        assert_eq!(
            Sequence::new_unchecked(0).wrapping_next(),
            Sequence::new_unchecked(1)
        );
        assert_eq!(
            Sequence::new_unchecked(0xFFF).wrapping_next(),
            Sequence::new_unchecked(0)
        );
    }

    #[test]
    fn parts_round_trip() {
        let node_id = NodeId::new_unchecked(0b10_1010_1010);
        let sequence = Sequence::new_unchecked(0b1100_0011_0101);
        let snowflake = Snowflake::<TestEpoch>::from_parts(123_456_789, node_id, sequence);

        assert_eq!(snowflake.millis_since_epoch(), 123_456_789);
        assert_eq!(snowflake.node_id(), node_id);
        assert_eq!(snowflake.sequence(), sequence);
    }

    #[test]
    fn timestamp_embeds_creation_time() {
        let time = utc_datetime!(2024-06-15 12:30:45);
        let mut generator = SnowflakeGenerator::<TestEpoch>::new(NodeId::new_unchecked(3));

        let snowflake = generator.generate_at(time);
        assert_eq!(snowflake.timestamp(), time);
    }

    #[test]
    fn millis_at_bounds() {
        assert_eq!(Snowflake::<TestEpoch>::millis_at(TestEpoch::EPOCH_TIME), Ok(0));
        assert_eq!(
            Snowflake::<TestEpoch>::millis_at(TestEpoch::EPOCH_TIME - Duration::milliseconds(1)),
            Err(SnowflakeTimeError::BeforeEpoch)
        );
        assert_eq!(
            Snowflake::<TestEpoch>::millis_at(
                TestEpoch::EPOCH_TIME + Duration::milliseconds(1 << 41)
            ),
            Err(SnowflakeTimeError::TooFarAhead)
        );
    }

    #[test]
    fn generator_increments_sequence() {
        let time = utc_datetime!(2023-03-03 03:03);
        let node_id = NodeId::new_unchecked(7);
        let mut generator = SnowflakeGenerator::<TestEpoch>::new(node_id);

        let first = generator.generate_at(time);
        let second = generator.generate_at(time);

        assert_eq!(first.sequence(), Sequence::new_unchecked(0));
        assert_eq!(second.sequence(), Sequence::new_unchecked(1));
        assert!(first < second);
        assert_eq!(first.node_id(), node_id);
    }
}
