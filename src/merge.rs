//! Merging of neighboring miniseed3 records. Records are assumed to be
//! in time sorted order per channel; only adjacent records are
//! compared, and a record that cannot extend the current group closes
//! it.

use chrono::Duration;
use tracing::debug;

use crate::data_encoding::DataEncoding;
use crate::encoded_timeseries::EncodedTimeseries;
use crate::header::FIXED_HEADER_SIZE;
use crate::mseed_error::MSeedError;
use crate::record::MSeed3Record;
use crate::sample_codec::{self, Samples};
use crate::steim1;
use crate::steim2;
use crate::steim_frame_block::FRAME_SIZE;

/// Options controlling the merge.
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// Decompress and re-encode, required to merge Steim payloads or
    /// records whose integer encodings differ.
    pub decompress: bool,
    /// Upper bound on the size of re-encoded output records.
    pub max_record_size: u32,
}

impl Default for MergeOptions {
    fn default() -> MergeOptions {
        MergeOptions {
            decompress: false,
            max_record_size: 4096,
        }
    }
}

/// Streaming merger. Push records in time order; whenever a record
/// cannot join the open group the finished group is returned. Call
/// finish at end of input for the final group.
pub struct Merger {
    options: MergeOptions,
    group: Vec<MSeed3Record>,
}

impl Merger {
    pub fn new(options: MergeOptions) -> Merger {
        Merger {
            options,
            group: Vec::new(),
        }
    }

    pub fn push(&mut self, record: MSeed3Record) -> Result<Vec<MSeed3Record>, MSeedError> {
        let extends = match self.group.last() {
            None => true,
            Some(last) => is_mergeable(last, &record, &self.options)?,
        };
        if extends {
            self.group.push(record);
            return Ok(Vec::new());
        }
        debug!(
            group_len = self.group.len(),
            "group closed by incompatible record"
        );
        let out = self.flush()?;
        self.group.push(record);
        Ok(out)
    }

    pub fn finish(&mut self) -> Result<Vec<MSeed3Record>, MSeedError> {
        self.flush()
    }

    fn flush(&mut self) -> Result<Vec<MSeed3Record>, MSeedError> {
        let group = std::mem::take(&mut self.group);
        match group.len() {
            0 => Ok(Vec::new()),
            1 => Ok(group),
            _ => merge_group(group, &self.options),
        }
    }
}

/// Merge an ordered set of records, returning the merged stream.
pub fn merge_records(
    records: Vec<MSeed3Record>,
    options: MergeOptions,
) -> Result<Vec<MSeed3Record>, MSeedError> {
    let mut merger = Merger::new(options);
    let mut out = Vec::new();
    for rec in records {
        out.extend(merger.push(rec)?);
    }
    out.extend(merger.finish()?);
    Ok(out)
}

/// Encodings whose decoded samples are 32-bit integers, the ones a
/// decompressing merge can re-encode.
fn decodes_to_int(encoding: DataEncoding) -> bool {
    matches!(
        encoding,
        DataEncoding::INT16 | DataEncoding::INT32 | DataEncoding::STEIM1 | DataEncoding::STEIM2
    )
}

/// Two neighboring records can merge when identity, rate, version and
/// encoding line up and the second starts one sample period after the
/// first ends, within half a period.
fn is_mergeable(
    a: &MSeed3Record,
    b: &MSeed3Record,
    options: &MergeOptions,
) -> Result<bool, MSeedError> {
    if a.identifier.to_string() != b.identifier.to_string() {
        return Ok(false);
    }
    if a.header.sample_rate_period != b.header.sample_rate_period {
        return Ok(false);
    }
    if a.header.publication_version != b.header.publication_version {
        return Ok(false);
    }
    let enc_a = a.header.encoding;
    let enc_b = b.header.encoding;
    let encodings_ok = if options.decompress {
        enc_a == enc_b && enc_a.is_primitive()
            || (decodes_to_int(enc_a) && decodes_to_int(enc_b))
    } else {
        enc_a == enc_b && enc_a.is_primitive()
    };
    if !encodings_ok {
        return Ok(false);
    }

    let predicted = a.header.predicted_next_start()?;
    let actual = b.header.start_as_utc()?;
    let gap_ns = match (actual - predicted).num_nanoseconds() {
        Some(ns) => ns,
        None => return Ok(false),
    };
    let tolerance_ns = a.header.sample_period_ns() / 2;
    Ok(gap_ns.abs() < tolerance_ns)
}

fn merge_group(
    group: Vec<MSeed3Record>,
    options: &MergeOptions,
) -> Result<Vec<MSeed3Record>, MSeedError> {
    let same_encoding = group
        .iter()
        .all(|r| r.header.encoding == group[0].header.encoding);
    if same_encoding && group[0].header.encoding.is_primitive() {
        return merge_primitive(group);
    }
    merge_reencoded(group, options)
}

/// Same primitive encoding: concatenate the payload bytes directly.
fn merge_primitive(group: Vec<MSeed3Record>) -> Result<Vec<MSeed3Record>, MSeedError> {
    let mut num_samples = 0_u32;
    let mut payload = Vec::new();
    for rec in &group {
        num_samples += rec.header.num_samples;
        payload.extend(rec.encoded_data.to_bytes()?);
    }
    let mut first = match group.into_iter().next() {
        Some(rec) => rec,
        None => return Ok(Vec::new()),
    };
    first.header.num_samples = num_samples;
    let merged = MSeed3Record::new(
        first.header,
        first.identifier,
        first.extra_headers,
        EncodedTimeseries::Raw(payload),
    );
    Ok(vec![merged])
}

/// Decompress the whole group, concatenate, and re-encode in the first
/// record's encoding, splitting so every output record stays within the
/// configured maximum size.
fn merge_reencoded(
    group: Vec<MSeed3Record>,
    options: &MergeOptions,
) -> Result<Vec<MSeed3Record>, MSeedError> {
    let mut samples: Vec<i32> = Vec::new();
    for rec in &group {
        match rec.decompress()? {
            Samples::Int(v) => samples.extend(v),
            other => {
                return Err(MSeedError::Merge(format!(
                    "can only re-encode integer samples, not {}",
                    other
                )))
            }
        }
    }
    let first = match group.into_iter().next() {
        Some(rec) => rec,
        None => return Ok(Vec::new()),
    };
    let target = first.header.encoding;
    let overhead = FIXED_HEADER_SIZE as u32
        + first.identifier.calc_len() as u32
        + first.extra_headers.byte_len()? as u32;
    if options.max_record_size <= overhead {
        return Err(MSeedError::Merge(format!(
            "max record size {} cannot fit the {} byte header",
            options.max_record_size, overhead
        )));
    }
    let allowed_payload = (options.max_record_size - overhead) as usize;
    let first_start = first.header.start_as_utc()?;
    let period_ns = first.header.sample_period_ns();

    let mut out = Vec::new();
    let mut offset = 0_usize;
    while offset < samples.len() {
        let (encoded, consumed) = match target {
            DataEncoding::STEIM1 => {
                let frames = steim_frames_for(allowed_payload)?;
                let block = steim1::encode(&samples[offset..], frames)?;
                (EncodedTimeseries::Steim1(block.pack()), block.num_samples)
            }
            DataEncoding::STEIM2 => {
                let frames = steim_frames_for(allowed_payload)?;
                let block = steim2::encode(&samples[offset..], frames)?;
                (EncodedTimeseries::Steim2(block.pack()), block.num_samples)
            }
            enc => {
                let width = enc
                    .bytes_per_sample()
                    .ok_or_else(|| MSeedError::Merge(format!("cannot re-encode as {}", enc)))?
                    as usize;
                let per_record = (allowed_payload / width).max(1);
                let take = per_record.min(samples.len() - offset);
                let chunk = Samples::Int(samples[offset..offset + take].to_vec());
                (sample_codec::encode(&chunk, enc)?, take)
            }
        };
        let mut header = first.header.clone();
        header.set_start_from_utc(first_start + Duration::nanoseconds(period_ns * offset as i64));
        header.num_samples = consumed as u32;
        out.push(MSeed3Record::new(
            header,
            first.identifier.clone(),
            first.extra_headers.clone(),
            encoded,
        ));
        offset += consumed;
    }
    Ok(out)
}

fn steim_frames_for(allowed_payload: usize) -> Result<usize, MSeedError> {
    let frames = allowed_payload / FRAME_SIZE;
    if frames == 0 {
        return Err(MSeedError::Merge(String::from(
            "max record size leaves no room for a steim frame",
        )));
    }
    Ok(frames)
}
