use byteorder::{LittleEndian, WriteBytesExt};
use crc::{Crc, CRC_32_ISCSI};
use std::fmt;
use std::io::prelude::*;
use std::io::BufWriter;
use tracing::warn;

use crate::data_encoding::DataEncoding;
use crate::encoded_timeseries::EncodedTimeseries;
use crate::extra_headers::ExtraHeaders;
use crate::fdsn_source_identifier::SourceIdentifier;
use crate::header::{MSeed3Header, CRC_OFFSET, FIXED_HEADER_SIZE};
use crate::mseed_error::MSeedError;
use crate::sample_codec::{self, ByteOrder, Samples};

pub const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// A miniseed3 record: fixed header, source identifier, extra header
/// tree and encoded payload.
#[derive(Debug, Clone)]
pub struct MSeed3Record {
    pub header: MSeed3Header,
    pub identifier: SourceIdentifier,
    pub extra_headers: ExtraHeaders,
    pub encoded_data: EncodedTimeseries,
}

impl MSeed3Record {
    /// Assemble a record, recalculating the header length fields and
    /// the number of samples from the inputs.
    pub fn new(
        header: MSeed3Header,
        identifier: SourceIdentifier,
        extra_headers: ExtraHeaders,
        encoded_data: EncodedTimeseries,
    ) -> MSeed3Record {
        let mut header = header;
        let eh_len = extra_headers.byte_len().unwrap_or(0);
        header.recalculated_lengths(
            identifier.calc_len(),
            eh_len,
            encoded_data.byte_len(),
            encoded_data.reconcile_num_samples(header.num_samples),
        );
        MSeed3Record {
            header,
            identifier,
            extra_headers,
            encoded_data,
        }
    }

    /// Read a single record, verifying the CRC.
    pub fn from_reader<R: BufRead>(buf_reader: &mut R) -> Result<MSeed3Record, MSeedError> {
        MSeed3Record::from_reader_with(buf_reader, true)
    }

    /// Read a single record. The whole record is consumed from the
    /// reader before any validation, so a caller can continue with the
    /// following record after a CRC or parse failure.
    pub fn from_reader_with<R: BufRead>(
        buf_reader: &mut R,
        check_crc: bool,
    ) -> Result<MSeed3Record, MSeedError> {
        let mut buffer = [0_u8; FIXED_HEADER_SIZE];
        read_full(buf_reader, &mut buffer)?;
        let header = MSeed3Header::try_from(&buffer)?;

        let id_bytes = read_exactly(buf_reader, header.raw_identifier_length() as usize)?;
        let eh_bytes = read_exactly(buf_reader, header.raw_extra_headers_length() as usize)?;
        let data_bytes = read_exactly(buf_reader, header.raw_data_length() as usize)?;

        if check_crc {
            // digest over the record with the CRC field zeroed
            buffer[CRC_OFFSET] = 0;
            buffer[CRC_OFFSET + 1] = 0;
            buffer[CRC_OFFSET + 2] = 0;
            buffer[CRC_OFFSET + 3] = 0;
            let mut digest = CASTAGNOLI.digest();
            digest.update(&buffer);
            digest.update(&id_bytes);
            digest.update(&eh_bytes);
            digest.update(&data_bytes);
            let crc_calc = digest.finalize();
            if crc_calc != header.crc {
                return Err(MSeedError::CrcInvalid(crc_calc, header.crc));
            }
        }

        let identifier = SourceIdentifier::try_from(id_bytes)?;
        let extra_headers = if eh_bytes.len() > 2 {
            String::from_utf8(eh_bytes)?.parse::<ExtraHeaders>()?
        } else {
            ExtraHeaders::new()
        };

        if let Some(width) = header.encoding.bytes_per_sample() {
            let expected = width as u64 * header.num_samples as u64;
            if header.raw_data_length() as u64 != expected {
                return Err(MSeedError::DataLength(
                    expected.min(u32::MAX as u64) as u32,
                    header.num_samples,
                    header.encoding.value(),
                    header.raw_data_length(),
                ));
            }
        }

        Ok(MSeed3Record {
            header,
            identifier,
            extra_headers,
            encoded_data: EncodedTimeseries::Raw(data_bytes),
        })
    }

    /// Writes the record, after calculating the CRC. The returned tuple contains the number
    /// of bytes written and the CRC value.
    /// This does recalculate the identifier length, extra headers length and data length headers.
    /// The number of samples is sanity checked against the data, but trusts the header in cases
    /// of compressed or opaque data.
    pub fn write_to<W>(&mut self, buf: &mut BufWriter<W>) -> Result<(u32, u32), MSeedError>
    where
        W: std::io::Write,
    {
        self.header.crc = 0;
        let mut out = Vec::new();
        {
            let mut inner_buf = BufWriter::new(&mut out);
            self.write_to_wocrc(&mut inner_buf)?;
            inner_buf.flush()?;
        }
        let crc = CASTAGNOLI.checksum(&out);
        self.header.crc = crc;
        buf.write_all(&out[0..CRC_OFFSET])?;
        buf.write_u32::<LittleEndian>(crc)?;
        buf.write_all(&out[(CRC_OFFSET + 4)..])?;
        buf.flush()?;
        Ok((out.len() as u32, crc))
    }

    /// Writes the record to the given buffer without calculating or setting the header CRC field.
    pub fn write_to_wocrc<W>(&mut self, buf: &mut BufWriter<W>) -> Result<(), MSeedError>
    where
        W: std::io::Write,
    {
        let id_bytes = self.identifier.as_bytes();
        let eh_bytes = if self.extra_headers.is_empty() {
            Vec::new()
        } else {
            self.extra_headers.to_json()?.into_bytes()
        };
        self.header.recalculated_lengths(
            id_bytes.len() as u8,
            eh_bytes.len() as u16,
            self.encoded_data.byte_len(),
            self.encoded_data
                .reconcile_num_samples(self.header.num_samples),
        );
        self.header.write_to(buf)?;
        buf.write_all(&id_bytes)?;
        buf.write_all(&eh_bytes)?;
        self.encoded_data.write_to(buf)?;
        buf.flush()?;
        Ok(())
    }

    /// The packed byte representation with a freshly computed CRC.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, MSeedError> {
        let mut out = Vec::new();
        {
            let mut writer = BufWriter::new(&mut out);
            self.write_to(&mut writer)?;
            writer.flush()?;
        }
        Ok(out)
    }

    /// Decode the payload into samples. Primitive payloads are little
    /// endian in miniseed3, Steim frames are big endian internally.
    pub fn decompress(&self) -> Result<Samples, MSeedError> {
        match &self.encoded_data {
            EncodedTimeseries::Int16(v) => {
                Ok(Samples::Int(v.iter().map(|&s| s as i32).collect()))
            }
            EncodedTimeseries::Int32(v) => Ok(Samples::Int(v.clone())),
            EncodedTimeseries::Float32(v) => Ok(Samples::Float(v.clone())),
            EncodedTimeseries::Float64(v) => Ok(Samples::Double(v.clone())),
            EncodedTimeseries::Raw(bytes)
            | EncodedTimeseries::Steim1(bytes)
            | EncodedTimeseries::Steim2(bytes)
            | EncodedTimeseries::Steim3(bytes)
            | EncodedTimeseries::Opaque(bytes) => sample_codec::decompress(
                self.header.encoding,
                bytes,
                self.header.num_samples as usize,
                ByteOrder::Little,
            ),
        }
    }

    /// A new record holding the same samples as a primitive encoding,
    /// useful before merging or rewriting compressed data.
    pub fn decompressed_record(&self) -> Result<MSeed3Record, MSeedError> {
        let samples = self.decompress()?;
        let (encoding, encoded_data) = match samples {
            Samples::Int(v) => (DataEncoding::INT32, EncodedTimeseries::Int32(v)),
            Samples::Float(v) => (DataEncoding::FLOAT32, EncodedTimeseries::Float32(v)),
            Samples::Double(v) => (DataEncoding::FLOAT64, EncodedTimeseries::Float64(v)),
            Samples::Text(s) => (DataEncoding::TEXT, EncodedTimeseries::Raw(s.into_bytes())),
        };
        let mut header = self.header.clone();
        header.encoding = encoding;
        Ok(MSeed3Record::new(
            header,
            self.identifier.clone(),
            self.extra_headers.clone(),
            encoded_data,
        ))
    }

    /// The payload as text for TEXT encoded records.
    pub fn text_data(&self) -> Result<String, MSeedError> {
        if self.header.encoding != DataEncoding::TEXT {
            return Err(MSeedError::UnknownEncoding(self.header.encoding.value()));
        }
        match self.decompress()? {
            Samples::Text(s) => Ok(s),
            _ => Err(MSeedError::Unknown(String::from(
                "text record did not decode to text",
            ))),
        }
    }

    pub fn get_record_size(&self) -> u32 {
        self.header.get_record_size()
    }
}

impl fmt::Display for MSeed3Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "  {}, {}", self.identifier, self.header)
    }
}

/// Pull-based iterator over concatenated records in an octet stream.
/// Fail-fast by default; in lenient mode a record failing CRC or parse
/// validation is logged and skipped, since the full record has already
/// been consumed from the stream.
pub struct MSeed3RecordReader<R: BufRead> {
    reader: R,
    check_crc: bool,
    lenient: bool,
    failed: bool,
}

impl<R: BufRead> MSeed3RecordReader<R> {
    pub fn new(reader: R) -> MSeed3RecordReader<R> {
        MSeed3RecordReader {
            reader,
            check_crc: true,
            lenient: false,
            failed: false,
        }
    }

    /// Skip and warn on damaged records instead of ending iteration.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn check_crc(mut self, check_crc: bool) -> Self {
        self.check_crc = check_crc;
        self
    }

    fn at_eof(&mut self) -> Result<bool, MSeedError> {
        Ok(self.reader.fill_buf()?.is_empty())
    }
}

impl<R: BufRead> Iterator for MSeed3RecordReader<R> {
    type Item = Result<MSeed3Record, MSeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.at_eof() {
                Ok(true) => return None,
                Ok(false) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
            match MSeed3Record::from_reader_with(&mut self.reader, self.check_crc) {
                Ok(rec) => return Some(Ok(rec)),
                Err(e) => {
                    let recoverable = matches!(
                        e,
                        MSeedError::CrcInvalid(_, _)
                            | MSeedError::DataLength(_, _, _, _)
                            | MSeedError::JsonError(_)
                            | MSeedError::FromUtf8Error(_)
                            | MSeedError::ExtraHeaderNotObject(_)
                    );
                    if self.lenient && recoverable {
                        warn!("skipping damaged record: {}", e);
                        continue;
                    }
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Read every record from the stream into memory.
pub fn read_mseed3<R: BufRead>(reader: &mut R) -> Result<Vec<MSeed3Record>, MSeedError> {
    MSeed3RecordReader::new(reader).collect()
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

fn read_exactly<R: BufRead>(reader: &mut R, len: usize) -> Result<Vec<u8>, MSeedError> {
    let mut buffer = Vec::new();
    let n = reader.by_ref().take(len as u64).read_to_end(&mut buffer)?;
    if n != len {
        return Err(MSeedError::InsufficientBytes(n, len));
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_time;

    pub(crate) fn dummy_record(samples: Vec<i32>) -> MSeed3Record {
        let start = seed_time::utc_from_parts(2024, 1, 15, 13, 55, 123_456_000).unwrap();
        let header = MSeed3Header::new(start, DataEncoding::INT32, 20.0, samples.len());
        MSeed3Record::new(
            header,
            SourceIdentifier::from("FDSN:XX_TEST__L_H_Z"),
            ExtraHeaders::new(),
            EncodedTimeseries::Int32(samples),
        )
    }

    #[test]
    fn record_round_trip() -> Result<(), MSeedError> {
        let mut rec = dummy_record(vec![0, -1, 2, -3, 4, -5]);
        let bytes = rec.to_bytes()?;
        assert_eq!(rec.get_record_size(), bytes.len() as u32);

        let rt = MSeed3Record::from_reader(&mut &bytes[..])?;
        assert_eq!(rt.header.crc, rec.header.crc);
        assert_eq!(rt.header.num_samples, 6);
        assert_eq!(rt.identifier.to_string(), "FDSN:XX_TEST__L_H_Z");
        assert_eq!(rt.decompress()?, Samples::Int(vec![0, -1, 2, -3, 4, -5]));

        // repack is byte identical
        let mut rt = rt;
        assert_eq!(rt.to_bytes()?, bytes);
        Ok(())
    }

    #[test]
    fn crc_detects_payload_flip() -> Result<(), MSeedError> {
        let mut rec = dummy_record(vec![1, 2, 3, 4]);
        let mut bytes = rec.to_bytes()?;
        let flip_at = bytes.len() - 3;
        bytes[flip_at] ^= 0x40;
        assert!(matches!(
            MSeed3Record::from_reader(&mut &bytes[..]),
            Err(MSeedError::CrcInvalid(_, _))
        ));
        // restoring the byte makes the record readable again
        bytes[flip_at] ^= 0x40;
        assert!(MSeed3Record::from_reader(&mut &bytes[..]).is_ok());
        // and an unchecked read accepts the damage
        bytes[flip_at] ^= 0x40;
        assert!(MSeed3Record::from_reader_with(&mut &bytes[..], false).is_ok());
        Ok(())
    }

    #[test]
    fn extra_headers_survive_round_trip() -> Result<(), MSeedError> {
        let mut rec = dummy_record(vec![5, 6]);
        rec.extra_headers
            .set("/FDSN/Time/Quality", serde_json::json!(80))?;
        let bytes = rec.to_bytes()?;
        let rt = MSeed3Record::from_reader(&mut &bytes[..])?;
        assert_eq!(
            rt.extra_headers.get("/FDSN/Time/Quality"),
            Some(serde_json::json!(80))
        );
        Ok(())
    }

    #[test]
    fn empty_extra_headers_written_as_absent() -> Result<(), MSeedError> {
        let mut rec = dummy_record(vec![1]);
        let bytes = rec.to_bytes()?;
        assert_eq!(rec.header.raw_extra_headers_length(), 0);
        let rt = MSeed3Record::from_reader(&mut &bytes[..])?;
        assert!(rt.extra_headers.is_empty());
        Ok(())
    }

    #[test]
    fn reader_yields_records_in_order() -> Result<(), MSeedError> {
        let mut bytes = Vec::new();
        bytes.extend(dummy_record(vec![1, 2]).to_bytes()?);
        bytes.extend(dummy_record(vec![3, 4, 5]).to_bytes()?);
        let recs = read_mseed3(&mut &bytes[..])?;
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].header.num_samples, 2);
        assert_eq!(recs[1].header.num_samples, 3);
        Ok(())
    }

    #[test]
    fn truncated_record_fails() -> Result<(), MSeedError> {
        let bytes = dummy_record(vec![1, 2, 3]).to_bytes()?;
        let cut = &bytes[..bytes.len() - 4];
        let result: Result<Vec<MSeed3Record>, MSeedError> = read_mseed3(&mut &cut[..]);
        assert!(matches!(result, Err(MSeedError::InsufficientBytes(_, _))));
        Ok(())
    }

    #[test]
    fn lenient_reader_skips_damage() -> Result<(), MSeedError> {
        let mut bytes = Vec::new();
        let first = dummy_record(vec![1, 2]).to_bytes()?;
        let first_len = first.len();
        bytes.extend(first);
        bytes.extend(dummy_record(vec![3, 4, 5]).to_bytes()?);
        bytes[first_len - 1] ^= 0xFF; // corrupt the first record payload

        let strict: Vec<_> = MSeed3RecordReader::new(&bytes[..]).collect();
        assert_eq!(strict.len(), 1);
        assert!(strict[0].is_err());

        let lenient: Vec<_> = MSeed3RecordReader::new(&bytes[..]).lenient(true).collect();
        assert_eq!(lenient.len(), 1);
        let rec = lenient[0].as_ref().map_err(|_| ()).unwrap();
        assert_eq!(rec.header.num_samples, 3);
        Ok(())
    }

    #[test]
    fn text_payload_accessor() -> Result<(), MSeedError> {
        let start = seed_time::utc_from_parts(2024, 1, 0, 0, 0, 0).unwrap();
        let msg = "station notes";
        let header = MSeed3Header::new(start, DataEncoding::TEXT, 0.0, msg.len());
        let mut rec = MSeed3Record::new(
            header,
            SourceIdentifier::from("FDSN:XX_TEST__L_H_Z"),
            ExtraHeaders::new(),
            EncodedTimeseries::Raw(msg.as_bytes().to_vec()),
        );
        let bytes = rec.to_bytes()?;
        let rt = MSeed3Record::from_reader(&mut &bytes[..])?;
        assert_eq!(rt.text_data()?, msg);
        Ok(())
    }
}
