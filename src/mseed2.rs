//! Read-only support for miniseed2 records: the 48-byte fixed header,
//! the blockette chain and the encoded payload. Only blockettes 100,
//! 1000 and 1001 carry semantics here; everything else is kept as
//! opaque bytes so the chain can be walked.

use chrono::prelude::*;
use chrono::Duration;
use std::fmt;
use std::io::prelude::*;

use crate::data_encoding::DataEncoding;
use crate::fdsn_source_identifier::FdsnSourceIdentifier;
use crate::mseed_error::MSeedError;
use crate::sample_codec::{self, ByteOrder, Samples};
use crate::seed_time::BTime;

/// Size in bytes of the miniseed2 fixed header.
pub const MSEED2_FIXED_HEADER_SIZE: usize = 48;

/// Record length used when no blockette 1000 is present.
pub const DEFAULT_RECORD_LENGTH: usize = 512;

/// The fixed section of a miniseed2 header.
#[derive(Debug, Clone)]
pub struct MiniseedHeader {
    pub sequence_number: String,
    pub data_quality: char,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub network: String,
    pub btime: BTime,
    pub num_samples: u16,
    pub sample_rate_factor: i16,
    pub sample_rate_multiplier: i16,
    pub activity_flags: u8,
    pub io_flags: u8,
    pub quality_flags: u8,
    pub num_blockettes: u8,
    pub time_correction: i32,
    pub data_offset: u16,
    pub blockette_offset: u16,
    /// Byte order of the fixed header, guessed from the year bytes and
    /// then confirmed or overridden by blockette 1000.
    pub byte_order: ByteOrder,
}

impl MiniseedHeader {
    /// Parse the fixed header, guessing the byte order from the BTIME
    /// year bytes. Years 1792 to 2303 have 0x07 or 0x08 in exactly one
    /// of the two bytes, which disambiguates the orders.
    pub fn from_bytes(buffer: &[u8]) -> Result<MiniseedHeader, MSeedError> {
        if buffer.len() < MSEED2_FIXED_HEADER_SIZE {
            return Err(MSeedError::InsufficientBytes(
                buffer.len(),
                MSEED2_FIXED_HEADER_SIZE,
            ));
        }
        let byte_order = guess_byte_order(buffer)?;
        let btime = BTime::from_bytes(&buffer[20..30], byte_order)?;
        Ok(MiniseedHeader {
            sequence_number: header_str(&buffer[0..6])?,
            data_quality: buffer[6] as char,
            station: header_str(&buffer[8..13])?,
            location: header_str(&buffer[13..15])?,
            channel: header_str(&buffer[15..18])?,
            network: header_str(&buffer[18..20])?,
            btime,
            num_samples: byte_order.u16_from(&buffer[30..32]),
            sample_rate_factor: byte_order.i16_from(&buffer[32..34]),
            sample_rate_multiplier: byte_order.i16_from(&buffer[34..36]),
            activity_flags: buffer[36],
            io_flags: buffer[37],
            quality_flags: buffer[38],
            num_blockettes: buffer[39],
            time_correction: byte_order.i32_from(&buffer[40..44]),
            data_offset: byte_order.u16_from(&buffer[44..46]),
            blockette_offset: byte_order.u16_from(&buffer[46..48]),
            byte_order,
        })
    }

    /// Nominal sample rate from the factor and multiplier fields.
    pub fn sample_rate_from_factor(&self) -> f64 {
        let f = self.sample_rate_factor as f64;
        let m = self.sample_rate_multiplier as f64;
        if self.sample_rate_factor == 0 || self.sample_rate_multiplier == 0 {
            return 0.0;
        }
        match (self.sample_rate_factor > 0, self.sample_rate_multiplier > 0) {
            (true, true) => f * m,
            (true, false) => -f / m,
            (false, true) => -m / f,
            (false, false) => 1.0 / (f * m),
        }
    }

    /// Dotted NET.STA.LOC.CHAN codes.
    pub fn codes(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

fn header_str(bytes: &[u8]) -> Result<String, MSeedError> {
    Ok(String::from_utf8(bytes.to_vec())?.trim().to_string())
}

fn guess_byte_order(buffer: &[u8]) -> Result<ByteOrder, MSeedError> {
    let hi = buffer[20];
    let lo = buffer[21];
    let hi_year = hi == 7 || hi == 8;
    let lo_year = lo == 7 || lo == 8;
    if hi_year && !lo_year {
        Ok(ByteOrder::Big)
    } else if lo_year && !hi_year {
        Ok(ByteOrder::Little)
    } else {
        Err(MSeedError::Unknown(format!(
            "unable to determine byte order from year bytes: {} {}",
            hi, lo
        )))
    }
}

/// A blockette from the chain following the fixed header. Types 100,
/// 1000 and 1001 are decoded, anything else is retained raw.
#[derive(Debug, Clone, PartialEq)]
pub enum Blockette {
    B100 {
        next_offset: u16,
        sample_rate: f32,
    },
    B1000 {
        next_offset: u16,
        encoding: u8,
        byte_order: u8,
        record_length_exp: u8,
    },
    B1001 {
        next_offset: u16,
        time_quality: u8,
        microseconds: u8,
        frame_count: u8,
    },
    Unknown {
        blockette_num: u16,
        next_offset: u16,
        /// Byte offset of the blockette from the record start.
        offset: u16,
        bytes: Vec<u8>,
    },
}

impl Blockette {
    pub fn blockette_num(&self) -> u16 {
        match self {
            Blockette::B100 { .. } => 100,
            Blockette::B1000 { .. } => 1000,
            Blockette::B1001 { .. } => 1001,
            Blockette::Unknown { blockette_num, .. } => *blockette_num,
        }
    }

    pub fn next_offset(&self) -> u16 {
        match self {
            Blockette::B100 { next_offset, .. }
            | Blockette::B1000 { next_offset, .. }
            | Blockette::B1001 { next_offset, .. }
            | Blockette::Unknown { next_offset, .. } => *next_offset,
        }
    }
}

/// A miniseed2 record. Samples stay encoded until asked for.
#[derive(Debug, Clone)]
pub struct MiniseedRecord {
    pub header: MiniseedHeader,
    pub blockettes: Vec<Blockette>,
    pub encoded_data: Vec<u8>,
}

impl MiniseedRecord {
    /// The last blockette 1000 in the chain, later ones win.
    pub fn b1000(&self) -> Option<&Blockette> {
        self.blockettes
            .iter()
            .filter(|b| matches!(b, Blockette::B1000 { .. }))
            .last()
    }

    pub fn b100(&self) -> Option<&Blockette> {
        self.blockettes
            .iter()
            .filter(|b| matches!(b, Blockette::B100 { .. }))
            .last()
    }

    pub fn b1001(&self) -> Option<&Blockette> {
        self.blockettes
            .iter()
            .filter(|b| matches!(b, Blockette::B1001 { .. }))
            .last()
    }

    /// Payload encoding from blockette 1000.
    pub fn encoding(&self) -> Option<DataEncoding> {
        match self.b1000() {
            Some(Blockette::B1000 { encoding, .. }) => Some(DataEncoding::from_int(*encoding)),
            _ => None,
        }
    }

    /// Payload byte order, blockette 1000 wins over the header guess.
    pub fn payload_byte_order(&self) -> ByteOrder {
        match self.b1000() {
            Some(Blockette::B1000 { byte_order, .. }) => ByteOrder::from_b1000(*byte_order),
            _ => self.header.byte_order,
        }
    }

    /// Record length in bytes, 2^exp from blockette 1000, 512 without one.
    pub fn record_length(&self) -> Result<usize, MSeedError> {
        match self.b1000() {
            Some(Blockette::B1000 {
                record_length_exp, ..
            }) => {
                if *record_length_exp < 8 || *record_length_exp > 12 {
                    return Err(MSeedError::BadBlockette(1000, *record_length_exp as usize));
                }
                Ok(1 << record_length_exp)
            }
            _ => Ok(DEFAULT_RECORD_LENGTH),
        }
    }

    /// Actual sample rate, the blockette 100 override when present,
    /// otherwise derived from the header factor and multiplier.
    pub fn sample_rate(&self) -> f64 {
        match self.b100() {
            Some(Blockette::B100 { sample_rate, .. }) => *sample_rate as f64,
            _ => self.header.sample_rate_from_factor(),
        }
    }

    /// Start of the first sample including the blockette 1001
    /// microsecond offset.
    pub fn start_as_utc(&self) -> Result<DateTime<Utc>, MSeedError> {
        let base = self.header.btime.to_utc()?;
        match self.b1001() {
            Some(Blockette::B1001 { microseconds, .. }) => {
                Ok(base + Duration::microseconds(*microseconds as i64))
            }
            _ => Ok(base),
        }
    }

    /// Time of the last sample.
    pub fn end_as_utc(&self) -> Result<DateTime<Utc>, MSeedError> {
        let start = self.start_as_utc()?;
        if self.header.num_samples == 0 {
            return Ok(start);
        }
        let period_ns = (1_000_000_000.0 / self.sample_rate()).round() as i64;
        Ok(start + Duration::nanoseconds(period_ns * (self.header.num_samples as i64 - 1)))
    }

    /// Source identifier synthesized from the NSLC codes.
    pub fn source_id(&self) -> Result<FdsnSourceIdentifier, MSeedError> {
        FdsnSourceIdentifier::from_nslc(
            &self.header.network,
            &self.header.station,
            &self.header.location,
            &self.header.channel,
        )
    }

    /// Decode the payload into samples.
    pub fn decompress(&self) -> Result<Samples, MSeedError> {
        let encoding = self
            .encoding()
            .ok_or_else(|| MSeedError::Unknown(String::from("no blockette 1000 in record")))?;
        sample_codec::decompress(
            encoding,
            &self.encoded_data,
            self.header.num_samples as usize,
            self.payload_byte_order(),
        )
    }
}

impl fmt::Display for MiniseedRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} Hz {} samples",
            self.header.codes(),
            self.header.btime,
            self.sample_rate(),
            self.header.num_samples
        )
    }
}

/// Parse one record from a complete byte slice.
pub fn unpack_miniseed2(record_bytes: &[u8]) -> Result<MiniseedRecord, MSeedError> {
    let header = MiniseedHeader::from_bytes(record_bytes)?;
    let blockettes = if header.num_blockettes > 0 {
        parse_blockettes(
            record_bytes,
            header.blockette_offset as usize,
            0,
            header.byte_order,
            header.data_offset as usize,
        )?
    } else {
        Vec::new()
    };
    let data_offset = header.data_offset as usize;
    if data_offset > record_bytes.len() || data_offset < MSEED2_FIXED_HEADER_SIZE {
        return Err(MSeedError::InsufficientBytes(
            record_bytes.len(),
            data_offset,
        ));
    }
    let record = MiniseedRecord {
        header,
        blockettes,
        encoded_data: Vec::new(),
    };
    let record_length = record.record_length()?.min(record_bytes.len());
    if record_length < data_offset {
        return Err(MSeedError::BadBlockette(1000, record_length));
    }
    Ok(MiniseedRecord {
        encoded_data: record_bytes[data_offset..record_length].to_vec(),
        ..record
    })
}

/// Walk the blockette chain. Offsets in the chain are relative to the
/// record start; `base` is subtracted to index into `bytes`.
fn parse_blockettes(
    bytes: &[u8],
    first_offset: usize,
    base: usize,
    byte_order: ByteOrder,
    data_offset: usize,
) -> Result<Vec<Blockette>, MSeedError> {
    let mut blockettes = Vec::new();
    let mut offset = first_offset;
    while offset != 0 {
        let rel = offset
            .checked_sub(base)
            .ok_or(MSeedError::BadBlockette(0, offset))?;
        if rel + 4 > bytes.len() {
            return Err(MSeedError::BadBlockette(0, offset));
        }
        let blockette_num = byte_order.u16_from(&bytes[rel..rel + 2]);
        let next_offset = byte_order.u16_from(&bytes[rel + 2..rel + 4]);
        let blockette = match blockette_num {
            100 => {
                if rel + 8 > bytes.len() {
                    return Err(MSeedError::BadBlockette(100, offset));
                }
                Blockette::B100 {
                    next_offset,
                    sample_rate: f32::from_bits(byte_order.u32_from(&bytes[rel + 4..rel + 8])),
                }
            }
            1000 => {
                if rel + 7 > bytes.len() {
                    return Err(MSeedError::BadBlockette(1000, offset));
                }
                Blockette::B1000 {
                    next_offset,
                    encoding: bytes[rel + 4],
                    byte_order: bytes[rel + 5],
                    record_length_exp: bytes[rel + 6],
                }
            }
            1001 => {
                if rel + 8 > bytes.len() {
                    return Err(MSeedError::BadBlockette(1001, offset));
                }
                Blockette::B1001 {
                    next_offset,
                    time_quality: bytes[rel + 4],
                    microseconds: bytes[rel + 5],
                    frame_count: bytes[rel + 7],
                }
            }
            num => {
                // keep raw bytes up to the next blockette, or to the
                // data when this is the last one
                let end = if next_offset != 0 {
                    next_offset as usize
                } else {
                    data_offset.max(offset + 4)
                };
                let end_rel = end
                    .checked_sub(base)
                    .filter(|e| *e <= bytes.len() && *e >= rel + 4)
                    .ok_or(MSeedError::BadBlockette(num, offset))?;
                Blockette::Unknown {
                    blockette_num: num,
                    next_offset,
                    offset: offset as u16,
                    bytes: bytes[rel..end_rel].to_vec(),
                }
            }
        };
        let next = blockette.next_offset() as usize;
        blockettes.push(blockette);
        if next != 0 && next <= offset {
            return Err(MSeedError::BadBlockette(blockette_num, next));
        }
        offset = next;
    }
    Ok(blockettes)
}

/// Pull-based iterator over miniseed2 records in an octet stream.
pub struct MiniseedRecordReader<R: BufRead> {
    reader: R,
    failed: bool,
}

impl<R: BufRead> MiniseedRecordReader<R> {
    pub fn new(reader: R) -> MiniseedRecordReader<R> {
        MiniseedRecordReader {
            reader,
            failed: false,
        }
    }

    fn read_record(&mut self) -> Result<MiniseedRecord, MSeedError> {
        let mut head_bytes = [0_u8; MSEED2_FIXED_HEADER_SIZE];
        read_full(&mut self.reader, &mut head_bytes)?;
        let header = MiniseedHeader::from_bytes(&head_bytes)?;
        let data_offset = header.data_offset as usize;
        if data_offset < MSEED2_FIXED_HEADER_SIZE {
            return Err(MSeedError::InsufficientBytes(
                data_offset,
                MSEED2_FIXED_HEADER_SIZE,
            ));
        }

        // blockettes sit between the fixed header and the data start
        let mut blockette_bytes = vec![0_u8; data_offset - MSEED2_FIXED_HEADER_SIZE];
        read_full(&mut self.reader, &mut blockette_bytes)?;
        let blockettes = if header.num_blockettes > 0 {
            parse_blockettes(
                &blockette_bytes,
                header.blockette_offset as usize,
                MSEED2_FIXED_HEADER_SIZE,
                header.byte_order,
                data_offset,
            )?
        } else {
            Vec::new()
        };

        let mut record = MiniseedRecord {
            header,
            blockettes,
            encoded_data: Vec::new(),
        };
        let record_length = record.record_length()?;
        if record_length < data_offset {
            return Err(MSeedError::BadBlockette(1000, record_length));
        }
        let mut data = vec![0_u8; record_length - data_offset];
        read_full(&mut self.reader, &mut data)?;
        record.encoded_data = data;
        Ok(record)
    }
}

impl<R: BufRead> Iterator for MiniseedRecordReader<R> {
    type Item = Result<MiniseedRecord, MSeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.fill_buf() {
            Ok(buf) if buf.is_empty() => return None,
            Ok(_) => {}
            Err(e) => {
                self.failed = true;
                return Some(Err(e.into()));
            }
        }
        match self.read_record() {
            Ok(rec) => Some(Ok(rec)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Read every miniseed2 record from the stream into memory.
pub fn read_miniseed2<R: BufRead>(reader: &mut R) -> Result<Vec<MiniseedRecord>, MSeedError> {
    MiniseedRecordReader::new(reader).collect()
}

fn read_full<R: BufRead>(reader: &mut R, buffer: &mut [u8]) -> Result<(), MSeedError> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..])?;
        if n == 0 {
            return Err(MSeedError::InsufficientBytes(filled, buffer.len()));
        }
        filled += n;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a big endian 512-byte v2 record with B1000 and optionally
    /// B100/B1001, holding int32 samples.
    pub(crate) fn build_v2_record(
        samples: &[i32],
        tenth_milli: u16,
        b1001: Option<(u8, u8)>,
        b100_rate: Option<f32>,
    ) -> Vec<u8> {
        let mut rec = vec![0_u8; 512];
        rec[0..6].copy_from_slice(b"000001");
        rec[6] = b'R';
        rec[7] = b' ';
        rec[8..13].copy_from_slice(b"HODGE");
        rec[13..15].copy_from_slice(b"00");
        rec[15..18].copy_from_slice(b"LHZ");
        rec[18..20].copy_from_slice(b"CO");
        // BTIME 2024-002 03:04:05 + tenth_milli
        rec[20..22].copy_from_slice(&2024_u16.to_be_bytes());
        rec[22..24].copy_from_slice(&2_u16.to_be_bytes());
        rec[24] = 3;
        rec[25] = 4;
        rec[26] = 5;
        rec[28..30].copy_from_slice(&tenth_milli.to_be_bytes());
        rec[30..32].copy_from_slice(&(samples.len() as u16).to_be_bytes());
        rec[32..34].copy_from_slice(&20_i16.to_be_bytes()); // 20 sps
        rec[34..36].copy_from_slice(&1_i16.to_be_bytes());

        let mut num_blockettes = 1_u8;
        let mut offset = 48_usize;
        rec[46..48].copy_from_slice(&(offset as u16).to_be_bytes());

        let mut next = if b1001.is_some() || b100_rate.is_some() {
            offset + 8
        } else {
            0
        };
        // B1000: encoding int32, big endian, 512 bytes
        rec[offset..offset + 2].copy_from_slice(&1000_u16.to_be_bytes());
        rec[offset + 2..offset + 4].copy_from_slice(&(next as u16).to_be_bytes());
        rec[offset + 4] = 3;
        rec[offset + 5] = 1;
        rec[offset + 6] = 9;
        offset += 8;

        if let Some((quality, micros)) = b1001 {
            num_blockettes += 1;
            next = if b100_rate.is_some() { offset + 8 } else { 0 };
            rec[offset..offset + 2].copy_from_slice(&1001_u16.to_be_bytes());
            rec[offset + 2..offset + 4].copy_from_slice(&(next as u16).to_be_bytes());
            rec[offset + 4] = quality;
            rec[offset + 5] = micros;
            rec[offset + 7] = 0;
            offset += 8;
        }
        if let Some(rate) = b100_rate {
            num_blockettes += 1;
            rec[offset..offset + 2].copy_from_slice(&100_u16.to_be_bytes());
            rec[offset + 2..offset + 4].copy_from_slice(&0_u16.to_be_bytes());
            rec[offset + 4..offset + 8].copy_from_slice(&rate.to_be_bytes());
            offset += 12;
        }
        rec[39] = num_blockettes;
        rec[44..46].copy_from_slice(&(offset as u16).to_be_bytes());
        for (i, s) in samples.iter().enumerate() {
            let at = offset + 4 * i;
            rec[at..at + 4].copy_from_slice(&s.to_be_bytes());
        }
        rec
    }

    #[test]
    fn fixed_header_big_endian() -> Result<(), MSeedError> {
        let bytes = build_v2_record(&[1, 2, 3], 4680, None, None);
        let rec = unpack_miniseed2(&bytes)?;
        assert_eq!(rec.header.network, "CO");
        assert_eq!(rec.header.station, "HODGE");
        assert_eq!(rec.header.location, "00");
        assert_eq!(rec.header.channel, "LHZ");
        assert_eq!(rec.header.data_quality, 'R');
        assert_eq!(rec.header.byte_order, ByteOrder::Big);
        assert_eq!(rec.header.btime.year, 2024);
        assert_eq!(rec.header.btime.tenth_milli, 4680);
        assert_eq!(rec.header.num_samples, 3);
        assert!((rec.header.sample_rate_from_factor() - 20.0).abs() < f64::EPSILON);
        assert_eq!(rec.record_length()?, 512);
        assert_eq!(rec.encoding(), Some(DataEncoding::INT32));
        Ok(())
    }

    #[test]
    fn little_endian_header_detected() -> Result<(), MSeedError> {
        let mut bytes = vec![0_u8; 512];
        bytes[0..6].copy_from_slice(b"000001");
        bytes[6] = b'D';
        bytes[8..13].copy_from_slice(b"STA  ");
        bytes[13..15].copy_from_slice(b"  ");
        bytes[15..18].copy_from_slice(b"BHZ");
        bytes[18..20].copy_from_slice(b"XX");
        bytes[20..22].copy_from_slice(&2023_u16.to_le_bytes());
        bytes[22..24].copy_from_slice(&100_u16.to_le_bytes());
        bytes[30..32].copy_from_slice(&0_u16.to_le_bytes());
        bytes[39] = 1;
        bytes[44..46].copy_from_slice(&56_u16.to_le_bytes());
        bytes[46..48].copy_from_slice(&48_u16.to_le_bytes());
        bytes[48..50].copy_from_slice(&1000_u16.to_le_bytes());
        bytes[52] = 3;
        bytes[53] = 0; // little endian payload
        bytes[54] = 9;
        let rec = unpack_miniseed2(&bytes)?;
        assert_eq!(rec.header.byte_order, ByteOrder::Little);
        assert_eq!(rec.header.btime.year, 2023);
        assert_eq!(rec.payload_byte_order(), ByteOrder::Little);
        Ok(())
    }

    #[test]
    fn samples_decode() -> Result<(), MSeedError> {
        let bytes = build_v2_record(&[10, -20, 30, -40], 0, None, None);
        let rec = unpack_miniseed2(&bytes)?;
        assert_eq!(rec.decompress()?, Samples::Int(vec![10, -20, 30, -40]));
        Ok(())
    }

    #[test]
    fn blockette_1001_and_100_read() -> Result<(), MSeedError> {
        let bytes = build_v2_record(&[5], 0, Some((80, 250)), Some(19.99));
        let rec = unpack_miniseed2(&bytes)?;
        assert_eq!(rec.blockettes.len(), 3);
        assert!(matches!(
            rec.b1001(),
            Some(Blockette::B1001 {
                time_quality: 80,
                microseconds: 250,
                ..
            })
        ));
        assert!((rec.sample_rate() - 19.99).abs() < 1e-6);
        // microseconds shift the start time
        let start = rec.start_as_utc()?;
        let base = rec.header.btime.to_utc()?;
        assert_eq!(start - base, Duration::microseconds(250));
        Ok(())
    }

    #[test]
    fn stream_reader_yields_all() -> Result<(), MSeedError> {
        let mut bytes = build_v2_record(&[1, 2], 0, None, None);
        bytes.extend(build_v2_record(&[3, 4, 5], 0, None, None));
        let recs = read_miniseed2(&mut &bytes[..])?;
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].header.num_samples, 2);
        assert_eq!(recs[1].header.num_samples, 3);
        Ok(())
    }

    #[test]
    fn rate_factor_combinations() {
        let mut header = MiniseedHeader::from_bytes(&build_v2_record(&[1], 0, None, None)).unwrap();
        header.sample_rate_factor = -50;
        header.sample_rate_multiplier = 1;
        assert!((header.sample_rate_from_factor() - 0.02).abs() < 1e-12);
        header.sample_rate_factor = 100;
        header.sample_rate_multiplier = -2;
        assert!((header.sample_rate_from_factor() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_blockette_skipped() -> Result<(), MSeedError> {
        let mut bytes = build_v2_record(&[7], 0, None, None);
        // append a type 201 blockette after B1000 by hand
        bytes[39] = 2;
        bytes[50..52].copy_from_slice(&56_u16.to_be_bytes()); // B1000 next
        bytes[56..58].copy_from_slice(&201_u16.to_be_bytes());
        bytes[58..60].copy_from_slice(&0_u16.to_be_bytes());
        // move data start past the new blockette
        let data_offset = 72_u16;
        bytes[44..46].copy_from_slice(&data_offset.to_be_bytes());
        bytes[72..76].copy_from_slice(&7_i32.to_be_bytes());
        let rec = unpack_miniseed2(&bytes)?;
        assert_eq!(rec.blockettes.len(), 2);
        assert!(matches!(
            rec.blockettes[1],
            Blockette::Unknown {
                blockette_num: 201,
                ..
            }
        ));
        assert_eq!(rec.decompress()?, Samples::Int(vec![7]));
        Ok(())
    }
}
