//! Conversion of miniseed2 records to miniseed3. Values in blockettes
//! other than 100, 1000 and 1001 are dropped; the conversion is lossy
//! by design.

use serde_json::json;

use crate::data_encoding::DataEncoding;
use crate::encoded_timeseries::EncodedTimeseries;
use crate::extra_headers::ExtraHeaders;
use crate::fdsn_source_identifier::SourceIdentifier;
use crate::header::MSeed3Header;
use crate::mseed2::{Blockette, MiniseedRecord};
use crate::mseed_error::MSeedError;
use crate::record::MSeed3Record;
use crate::sample_codec::{self, ByteOrder};

/// Convert a miniseed2 record to miniseed3. Primitive payloads are
/// byte-swapped into little endian when needed; Steim payloads pass
/// through untouched since their frames are big endian in both formats.
pub fn mseed2_to_mseed3(ms2: &MiniseedRecord) -> Result<MSeed3Record, MSeedError> {
    let encoding = ms2
        .encoding()
        .ok_or_else(|| MSeedError::Unknown(String::from("missing blockette 1000")))?;

    let mut header = MSeed3Header::new(
        crate::seed_time::utc_from_parts(1970, 1, 0, 0, 0, 0)?,
        encoding,
        sample_rate_period(ms2.sample_rate()),
        ms2.header.num_samples as usize,
    );
    header.publication_version = 0;
    header.flags = convert_flags(
        ms2.header.activity_flags,
        ms2.header.io_flags,
        ms2.header.quality_flags,
    );

    let btime = &ms2.header.btime;
    header.year = btime.year;
    header.day_of_year = btime.day_of_year;
    header.hour = btime.hour;
    header.minute = btime.minute;
    header.second = btime.second;
    header.nanosecond = btime.as_nanoseconds();

    let mut extra_headers = ExtraHeaders::new();
    if matches!(ms2.header.data_quality, 'R' | 'Q' | 'M') {
        extra_headers.set(
            "/FDSN/DataQuality",
            json!(ms2.header.data_quality.to_string()),
        )?;
    }
    if let Some(Blockette::B1001 {
        time_quality,
        microseconds,
        ..
    }) = ms2.b1001()
    {
        extra_headers.set("/FDSN/Time/Quality", json!(time_quality))?;
        header.nanosecond += *microseconds as u32 * 1_000;
    }
    if btime.second == 60 {
        extra_headers.set("/FDSN/Time/LeapSecond", json!(1))?;
    }
    carry_nanoseconds(&mut header);

    let identifier = SourceIdentifier::Fdsn(ms2.source_id()?);
    let encoded_data = convert_payload(ms2, encoding)?;

    Ok(MSeed3Record::new(
        header,
        identifier,
        extra_headers,
        encoded_data,
    ))
}

/// Rates below one sample per second are stored as a negative period.
fn sample_rate_period(rate: f64) -> f64 {
    if rate > 0.0 && rate < 1.0 {
        -1.0 / rate
    } else {
        rate
    }
}

/// Map the v2 flag bytes onto the v3 flags: activity bit 0 is
/// calibration present, quality bit 7 is time questionable, io bit 5
/// is clock locked.
fn convert_flags(activity: u8, io: u8, quality: u8) -> u8 {
    (activity & 0x01) | ((quality & 0x80) >> 6) | ((io & 0x20) >> 3)
}

/// The blockette 1001 microseconds can push the nanosecond field past
/// one second; carry into the time fields with 60 second minutes.
fn carry_nanoseconds(header: &mut MSeed3Header) {
    if header.nanosecond < 1_000_000_000 {
        return;
    }
    header.nanosecond -= 1_000_000_000;
    header.second += 1;
    if header.second < 60 {
        return;
    }
    header.minute += header.second / 60;
    header.second %= 60;
    if header.minute >= 60 {
        header.minute -= 60;
        header.hour += 1;
        if header.hour >= 24 {
            header.hour -= 24;
            header.day_of_year += 1;
            let year = header.year as i32;
            let leap = year % 4 == 0 && (year % 100 != 0 || year % 400 == 0);
            let days = if leap { 366 } else { 365 };
            if header.day_of_year > days {
                header.day_of_year = 1;
                header.year += 1;
            }
        }
    }
}

fn convert_payload(
    ms2: &MiniseedRecord,
    encoding: DataEncoding,
) -> Result<EncodedTimeseries, MSeedError> {
    let mut bytes = ms2.encoded_data.clone();
    match encoding {
        DataEncoding::STEIM1 => {
            truncate_frames(&mut bytes, ms2);
            Ok(EncodedTimeseries::Steim1(bytes))
        }
        DataEncoding::STEIM2 => {
            truncate_frames(&mut bytes, ms2);
            Ok(EncodedTimeseries::Steim2(bytes))
        }
        enc if enc.is_primitive() => {
            // drop the record padding, then make the payload little endian
            let width = enc.bytes_per_sample().unwrap_or(1) as usize;
            let exact = width * ms2.header.num_samples as usize;
            if bytes.len() < exact {
                return Err(MSeedError::InsufficientBytes(bytes.len(), exact));
            }
            bytes.truncate(exact);
            if ms2.payload_byte_order() == ByteOrder::Big {
                sample_codec::swap_primitive_bytes(enc, &mut bytes)?;
            }
            Ok(EncodedTimeseries::Raw(bytes))
        }
        _ => Ok(EncodedTimeseries::Raw(bytes)),
    }
}

/// Trim a Steim payload to the frame count from blockette 1001 when one
/// is present, dropping record padding after the last frame.
fn truncate_frames(bytes: &mut Vec<u8>, ms2: &MiniseedRecord) {
    if let Some(Blockette::B1001 { frame_count, .. }) = ms2.b1001() {
        let frames = *frame_count as usize * 64;
        if *frame_count > 0 && frames <= bytes.len() {
            bytes.truncate(frames);
        }
    }
}
