//! Binary wire encodings tokio-postgres does not provide out of the box.
//!
//! - [`TimeTz`] - `TIME WITH TIME ZONE`
//! - [`JsonText`] - `JSON`/`JSONB` carried as already-serialized text, so the
//!   exact document produced by the loader is what gets stored

use bytes::{BufMut, BytesMut};
use chrono::{FixedOffset, NaiveTime, Timelike};
use postgres_types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use std::error::Error;

const MICROS_PER_SECOND: i64 = 1_000_000;
const JSONB_VERSION: u8 = 1;

/// Time of day with a UTC offset (PostgreSQL `TIMETZ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTz {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

impl TimeTz {
    pub fn new(time: NaiveTime, offset: FixedOffset) -> Self {
        Self { time, offset }
    }

    fn micros_since_midnight(&self) -> i64 {
        // Leap-second nanos are clamped into the last microsecond.
        let nanos = self.time.nanosecond().min(999_999_999) as i64;
        self.time.num_seconds_from_midnight() as i64 * MICROS_PER_SECOND + nanos / 1_000
    }
}

impl ToSql for TimeTz {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.put_i64(self.micros_since_midnight());
        // The wire format counts the zone in seconds west of UTC.
        out.put_i32(-self.offset.local_minus_utc());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::TIMETZ
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for TimeTz {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() != 12 {
            return Err(format!("invalid TIMETZ message length: {}", raw.len()).into());
        }
        let micros = i64::from_be_bytes(raw[..8].try_into()?);
        let zone_west = i32::from_be_bytes(raw[8..].try_into()?);

        let seconds = micros.div_euclid(MICROS_PER_SECOND);
        let nanos = micros.rem_euclid(MICROS_PER_SECOND) * 1_000;
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, nanos as u32)
            .ok_or("TIMETZ time out of range")?;
        let offset = FixedOffset::east_opt(-zone_west).ok_or("TIMETZ offset out of range")?;
        Ok(Self { time, offset })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::TIMETZ
    }
}

/// Serialized JSON document bound to a `JSON` or `JSONB` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonText(pub String);

impl JsonText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ToSql for JsonText {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if *ty == Type::JSONB {
            out.put_u8(JSONB_VERSION);
        }
        out.put_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::JSON || *ty == Type::JSONB
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for JsonText {
    fn from_sql(ty: &Type, mut raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if *ty == Type::JSONB {
            match raw.split_first() {
                Some((&JSONB_VERSION, rest)) => raw = rest,
                _ => return Err("unsupported JSONB encoding version".into()),
            }
        }
        Ok(Self(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::JSON || *ty == Type::JSONB
    }
}
