use std::fmt;

use crate::data_encoding::DataEncoding;
use crate::encoded_timeseries::EncodedTimeseries;
use crate::mseed_error::MSeedError;
use crate::steim1;
use crate::steim2;

/// Byte order of multi-byte values within a payload or v2 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// From the miniseed2 blockette 1000 flag, 1 is big endian.
    pub fn from_b1000(flag: u8) -> ByteOrder {
        if flag == 1 {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn u16_from(&self, b: &[u8]) -> u16 {
        let pair = [b[0], b[1]];
        match self {
            ByteOrder::Big => u16::from_be_bytes(pair),
            ByteOrder::Little => u16::from_le_bytes(pair),
        }
    }

    pub fn i16_from(&self, b: &[u8]) -> i16 {
        self.u16_from(b) as i16
    }

    pub fn u32_from(&self, b: &[u8]) -> u32 {
        let quad = [b[0], b[1], b[2], b[3]];
        match self {
            ByteOrder::Big => u32::from_be_bytes(quad),
            ByteOrder::Little => u32::from_le_bytes(quad),
        }
    }

    pub fn i32_from(&self, b: &[u8]) -> i32 {
        self.u32_from(b) as i32
    }

    pub fn f32_from(&self, b: &[u8]) -> f32 {
        f32::from_bits(self.u32_from(b))
    }

    pub fn f64_from(&self, b: &[u8]) -> f64 {
        let oct = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
        match self {
            ByteOrder::Big => f64::from_be_bytes(oct),
            ByteOrder::Little => f64::from_le_bytes(oct),
        }
    }
}

/// Decoded timeseries data as a contiguous typed buffer. Int16 payloads
/// widen to `Int` on decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Text(String),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Int(v) => v.len(),
            Samples::Float(v) => v.len(),
            Samples::Double(v) => v.len(),
            Samples::Text(s) => s.chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples as integer code points. For text payloads each unicode
    /// scalar becomes one integer; float payloads are refused.
    pub fn code_points(&self) -> Result<Vec<i32>, MSeedError> {
        match self {
            Samples::Int(v) => Ok(v.clone()),
            Samples::Text(s) => Ok(s.chars().map(|c| c as i32).collect()),
            _ => Err(MSeedError::Compression(String::from(
                "float samples have no integer code points",
            ))),
        }
    }
}

impl fmt::Display for Samples {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Samples::Int(v) => write!(f, "Int, {} samples", v.len()),
            Samples::Float(v) => write!(f, "Float, {} samples", v.len()),
            Samples::Double(v) => write!(f, "Double, {} samples", v.len()),
            Samples::Text(s) => write!(f, "Text, {} chars", s.chars().count()),
        }
    }
}

/// Decode a payload into samples. Primitive payloads honor the given
/// byte order, Steim payloads are big endian within their frames.
pub fn decompress(
    encoding: DataEncoding,
    bytes: &[u8],
    num_samples: usize,
    byte_order: ByteOrder,
) -> Result<Samples, MSeedError> {
    if num_samples == 0 && encoding != DataEncoding::TEXT {
        // detection-only records carry an encoding but no data
        return Ok(Samples::Int(Vec::new()));
    }
    match encoding {
        DataEncoding::TEXT => {
            let s = String::from_utf8(bytes.to_vec())?;
            Ok(Samples::Text(s))
        }
        DataEncoding::INT16 => {
            check_available(bytes, 2 * num_samples)?;
            let v = bytes[..2 * num_samples]
                .chunks_exact(2)
                .map(|c| byte_order.i16_from(c) as i32)
                .collect();
            Ok(Samples::Int(v))
        }
        DataEncoding::INT32 => {
            check_available(bytes, 4 * num_samples)?;
            let v = bytes[..4 * num_samples]
                .chunks_exact(4)
                .map(|c| byte_order.i32_from(c))
                .collect();
            Ok(Samples::Int(v))
        }
        DataEncoding::FLOAT32 => {
            check_available(bytes, 4 * num_samples)?;
            let v = bytes[..4 * num_samples]
                .chunks_exact(4)
                .map(|c| byte_order.f32_from(c))
                .collect();
            Ok(Samples::Float(v))
        }
        DataEncoding::FLOAT64 => {
            check_available(bytes, 8 * num_samples)?;
            let v = bytes[..8 * num_samples]
                .chunks_exact(8)
                .map(|c| byte_order.f64_from(c))
                .collect();
            Ok(Samples::Double(v))
        }
        DataEncoding::STEIM1 => Ok(Samples::Int(steim1::decode(bytes, num_samples)?)),
        DataEncoding::STEIM2 => Ok(Samples::Int(steim2::decode(bytes, num_samples)?)),
        DataEncoding::STEIM3 => Err(MSeedError::Compression(String::from(
            "Steim-3 decompression is not supported",
        ))),
        _ => Err(MSeedError::UnknownEncoding(encoding.value())),
    }
}

/// Encode samples into a payload of the requested encoding. Integer
/// samples may narrow to INT16 when every value fits.
pub fn encode(samples: &Samples, encoding: DataEncoding) -> Result<EncodedTimeseries, MSeedError> {
    match (encoding, samples) {
        (DataEncoding::TEXT, Samples::Text(s)) => {
            Ok(EncodedTimeseries::Raw(s.as_bytes().to_vec()))
        }
        (DataEncoding::INT16, Samples::Int(v)) => {
            let mut shorts = Vec::with_capacity(v.len());
            for &s in v {
                if s < i16::MIN as i32 || s > i16::MAX as i32 {
                    return Err(MSeedError::Compression(format!(
                        "sample {} does not fit in 16 bits",
                        s
                    )));
                }
                shorts.push(s as i16);
            }
            Ok(EncodedTimeseries::Int16(shorts))
        }
        (DataEncoding::INT32, Samples::Int(v)) => Ok(EncodedTimeseries::Int32(v.clone())),
        (DataEncoding::FLOAT32, Samples::Float(v)) => Ok(EncodedTimeseries::Float32(v.clone())),
        (DataEncoding::FLOAT64, Samples::Double(v)) => Ok(EncodedTimeseries::Float64(v.clone())),
        (DataEncoding::STEIM1, Samples::Int(v)) => {
            let block = steim1::encode(v, 0)?;
            Ok(EncodedTimeseries::Steim1(block.pack()))
        }
        (DataEncoding::STEIM2, Samples::Int(v)) => {
            let block = steim2::encode(v, 0)?;
            Ok(EncodedTimeseries::Steim2(block.pack()))
        }
        (enc, s) => Err(MSeedError::Compression(format!(
            "cannot encode {} as encoding {}",
            s,
            enc.value()
        ))),
    }
}

/// Swap a primitive payload between byte orders in place. Swapping
/// twice is the identity.
pub fn swap_primitive_bytes(encoding: DataEncoding, bytes: &mut [u8]) -> Result<(), MSeedError> {
    let width = encoding
        .bytes_per_sample()
        .ok_or_else(|| MSeedError::UnknownEncoding(encoding.value()))? as usize;
    if bytes.len() % width != 0 {
        return Err(MSeedError::InsufficientBytes(
            bytes.len(),
            bytes.len() + width - bytes.len() % width,
        ));
    }
    for chunk in bytes.chunks_exact_mut(width) {
        chunk.reverse();
    }
    Ok(())
}

fn check_available(bytes: &[u8], needed: usize) -> Result<(), MSeedError> {
    if bytes.len() < needed {
        return Err(MSeedError::InsufficientBytes(bytes.len(), needed));
    }
    Ok(())
}
