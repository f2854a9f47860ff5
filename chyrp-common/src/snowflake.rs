//! Time-ordered 64-bit ids.
//!
//! From the most significant bit down, a snowflake holds 42 bits of milliseconds since an
//! [`Epoch`], a 5 bit worker id, a 5 bit process id and a 12 bit per-process increment.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime, UtcDateTime};

pub const TIMESTAMP_LENGTH: u32 = 42;
pub const WORKER_ID_LENGTH: u32 = 5;
pub const PROCESS_ID_LENGTH: u32 = 5;
pub const INCREMENT_LENGTH: u32 = 12;

pub const INCREMENT_OFFSET: u32 = 0;
pub const PROCESS_ID_OFFSET: u32 = INCREMENT_OFFSET + INCREMENT_LENGTH;
pub const WORKER_ID_OFFSET: u32 = PROCESS_ID_OFFSET + PROCESS_ID_LENGTH;
pub const TIMESTAMP_OFFSET: u32 = WORKER_ID_OFFSET + WORKER_ID_LENGTH;

const fn low_bits(length: u32) -> u64 {
    (1 << length) - 1
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

macro_rules! id_part {
    ($name:ident, $length:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
        pub struct $name(u8);

        impl $name {
            #[must_use]
            pub fn new(id: u8) -> Option<Self> {
                (u64::from(id) <= low_bits($length)).then_some(Self(id))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }
    };
}

id_part!(WorkerId, WORKER_ID_LENGTH);
id_part!(ProcessId, PROCESS_ID_LENGTH);

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Snowflake<SnowflakeEpoch>(u64, PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    fn from_parts(millis: u64, worker_id: WorkerId, process_id: ProcessId, increment: u16) -> Self {
        Self::new(
            millis << TIMESTAMP_OFFSET
                | u64::from(worker_id.get()) << WORKER_ID_OFFSET
                | u64::from(process_id.get()) << PROCESS_ID_OFFSET
                | u64::from(increment) << INCREMENT_OFFSET,
        )
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Milliseconds between the epoch and the creation of this snowflake.
    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET & low_bits(TIMESTAMP_LENGTH)
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        WorkerId((self.0 >> WORKER_ID_OFFSET & low_bits(WORKER_ID_LENGTH)) as u8)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        ProcessId((self.0 >> PROCESS_ID_OFFSET & low_bits(PROCESS_ID_LENGTH)) as u8)
    }

    #[must_use]
    pub fn increment(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let increment = (self.0 >> INCREMENT_OFFSET & low_bits(INCREMENT_LENGTH)) as u16;
        increment
    }

    #[must_use]
    pub fn created_at(self) -> OffsetDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = i64::try_from(self.timestamp_millis()).unwrap_or(i64::MAX);
        OffsetDateTime::from(SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis))
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

fn millis_since_epoch<SnowflakeEpoch: Epoch>(time: UtcDateTime) -> Result<u64, SnowflakeError> {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeError::TimeBeforeEpoch);
    }

    u64::try_from(millis)
        .ok()
        .filter(|&millis| millis <= low_bits(TIMESTAMP_LENGTH))
        .ok_or(SnowflakeError::TimestampTooLarge)
}

/// Hands out strictly increasing snowflakes for one worker/process pair.
///
/// When the increment of a millisecond is exhausted, or the clock moves backwards, the
/// generator keeps counting from the last timestamp it handed out instead of repeating ids.
#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    last: Option<(u64, u16)>,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last: None,
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeError>
    where
        SnowflakeEpoch: Epoch,
    {
        let now_millis = millis_since_epoch::<SnowflakeEpoch>(time)?;

        let (millis, increment) = match self.last {
            Some((last_millis, last_increment)) if now_millis <= last_millis => {
                if u64::from(last_increment) < low_bits(INCREMENT_LENGTH) {
                    (last_millis, last_increment + 1)
                } else {
                    (last_millis + 1, 0)
                }
            }
            _ => (now_millis, 0),
        };

        if millis > low_bits(TIMESTAMP_LENGTH) {
            return Err(SnowflakeError::TimestampTooLarge);
        }

        self.last = Some((millis, increment));
        Ok(Snowflake::from_parts(
            millis,
            self.worker_id,
            self.process_id,
            increment,
        ))
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeError>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}
