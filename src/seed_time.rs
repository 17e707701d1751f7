use chrono::prelude::*;
use chrono::Duration;

use crate::mseed_error::MSeedError;
use crate::sample_codec::ByteOrder;

/// The packed 10-byte time structure from the miniseed2 fixed header.
/// Sub-second precision is tenths of milliseconds, 0.0001 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTime {
    pub year: u16,
    pub day_of_year: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub tenth_milli: u16,
}

impl BTime {
    /// Unpack from 10 bytes, byte 7 is unused padding.
    pub fn from_bytes(buffer: &[u8], byte_order: ByteOrder) -> Result<BTime, MSeedError> {
        if buffer.len() < 10 {
            return Err(MSeedError::InsufficientBytes(buffer.len(), 10));
        }
        Ok(BTime {
            year: byte_order.u16_from(&buffer[0..2]),
            day_of_year: byte_order.u16_from(&buffer[2..4]),
            hour: buffer[4],
            minute: buffer[5],
            second: buffer[6],
            tenth_milli: byte_order.u16_from(&buffer[8..10]),
        })
    }

    /// Sub-second field as nanoseconds, the miniseed3 resolution.
    pub fn as_nanoseconds(&self) -> u32 {
        self.tenth_milli as u32 * 100_000
    }

    pub fn to_utc(&self) -> Result<DateTime<Utc>, MSeedError> {
        utc_from_parts(
            self.year,
            self.day_of_year,
            self.hour,
            self.minute,
            self.second,
            self.as_nanoseconds(),
        )
    }
}

impl std::fmt::Display for BTime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:03} {:02}:{:02}:{:02}.{:04}",
            self.year, self.day_of_year, self.hour, self.minute, self.second, self.tenth_milli
        )
    }
}

/// Build an instant from packed header fields. A second value of 60 is a
/// leap second and is carried on chrono's leap-second representation,
/// second 59 with the nanosecond field offset by one billion.
pub fn utc_from_parts(
    year: u16,
    day_of_year: u16,
    hour: u8,
    minute: u8,
    second: u8,
    nanosecond: u32,
) -> Result<DateTime<Utc>, MSeedError> {
    if second > 60 {
        return Err(MSeedError::TimeRange(format!("second {} > 60", second)));
    }
    if nanosecond >= 1_000_000_000 {
        return Err(MSeedError::TimeRange(format!(
            "nanosecond {} >= 10^9",
            nanosecond
        )));
    }
    let (sec, nanos) = if second == 60 {
        (59_u32, nanosecond + 1_000_000_000)
    } else {
        (second as u32, nanosecond)
    };
    let date = NaiveDate::from_yo_opt(year as i32, day_of_year as u32).ok_or_else(|| {
        MSeedError::TimeRange(format!("year {} day of year {}", year, day_of_year))
    })?;
    let naive = date
        .and_hms_nano_opt(hour as u32, minute as u32, sec, nanos)
        .ok_or_else(|| {
            MSeedError::TimeRange(format!("time {}:{}:{}.{:09}", hour, minute, second, nanos))
        })?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Split an instant back into packed header fields. Leap seconds come
/// back out as second 60.
pub fn parts_from_utc(start: DateTime<Utc>) -> (u16, u16, u8, u8, u8, u32) {
    let nanos = start.nanosecond();
    (
        start.year() as u16,
        start.ordinal() as u16,
        start.hour() as u8,
        start.minute() as u8,
        (start.second() + nanos / 1_000_000_000) as u8,
        nanos % 1_000_000_000,
    )
}

/// Nominal sample period in nanoseconds for a header rate/period value.
/// Positive is samples per second, negative is seconds per sample.
pub fn sample_period_ns(sample_rate_period: f64) -> i64 {
    if sample_rate_period < 0.0 {
        (-sample_rate_period * 1_000_000_000.0).round() as i64
    } else {
        (1_000_000_000.0 / sample_rate_period).round() as i64
    }
}

/// Time of the sample at the given index, start plus index periods,
/// rounded to nanosecond precision.
pub fn time_of_sample(
    start: DateTime<Utc>,
    sample_rate_period: f64,
    index: u32,
) -> DateTime<Utc> {
    start + Duration::nanoseconds(sample_period_ns(sample_rate_period) * index as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btime_unpack_big_endian() {
        // 2024-001 15:13:55.1234
        let buf: [u8; 10] = [0x07, 0xE8, 0x00, 0x01, 15, 13, 55, 0, 0x04, 0xD2];
        let bt = BTime::from_bytes(&buf, ByteOrder::Big).unwrap();
        assert_eq!(bt.year, 2024);
        assert_eq!(bt.day_of_year, 1);
        assert_eq!(bt.hour, 15);
        assert_eq!(bt.minute, 13);
        assert_eq!(bt.second, 55);
        assert_eq!(bt.tenth_milli, 1234);
        assert_eq!(bt.as_nanoseconds(), 123_400_000);
    }

    #[test]
    fn btime_unpack_little_endian() {
        let buf: [u8; 10] = [0xE8, 0x07, 0x01, 0x00, 15, 13, 55, 0, 0xD2, 0x04];
        let bt = BTime::from_bytes(&buf, ByteOrder::Little).unwrap();
        assert_eq!(bt.year, 2024);
        assert_eq!(bt.tenth_milli, 1234);
    }

    #[test]
    fn parts_round_trip() {
        let dt = utc_from_parts(2024, 187, 3, 19, 53, 123_456_789).unwrap();
        assert_eq!(
            parts_from_utc(dt),
            (2024, 187, 3, 19, 53, 123_456_789_u32)
        );
    }

    #[test]
    fn leap_second_preserved() {
        let dt = utc_from_parts(2016, 366, 23, 59, 60, 500_000_000).unwrap();
        let (year, doy, hour, minute, second, nanos) = parts_from_utc(dt);
        assert_eq!((year, doy, hour, minute), (2016, 366, 23, 59));
        assert_eq!(second, 60);
        assert_eq!(nanos, 500_000_000);
    }

    #[test]
    fn nanosecond_range_checked() {
        assert!(utc_from_parts(2024, 1, 0, 0, 0, 1_000_000_000).is_err());
        assert!(utc_from_parts(2024, 1, 0, 0, 61, 0).is_err());
        assert!(utc_from_parts(2024, 400, 0, 0, 0, 0).is_err());
    }

    #[test]
    fn period_from_rate_and_period() {
        assert_eq!(sample_period_ns(100.0), 10_000_000);
        assert_eq!(sample_period_ns(-20.0), 20_000_000_000);
        assert_eq!(sample_period_ns(1.0), 1_000_000_000);
    }

    #[test]
    fn sample_time_exact() {
        let start = utc_from_parts(2024, 1, 0, 0, 0, 0).unwrap();
        let t = time_of_sample(start, 100.0, 150);
        assert_eq!(t - start, Duration::nanoseconds(1_500_000_000));
    }
}
