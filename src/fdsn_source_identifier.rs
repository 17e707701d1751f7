use crate::MSeedError;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryFrom;
use std::fmt;

lazy_static! {
    static ref PARSE_FDSN_REGEX: Regex = Regex::new(
        r"(?x)^
            FDSN:                      # prefix
            (?P<net>[A-Z0-9]{1,8})_    # network, 1-8 chars
            (?P<sta>[-A-Z0-9]{1,8})_   # station, 1-8 chars with dash
            (?P<loc>[-A-Z0-9]{0,8})_   # location, 0-8 chars with dash
            (?P<band>[A-Z0-9]*)_       # band, optional, usually single char
            (?P<source>[A-Z0-9]+)_     # source, one or more, usually single char
            (?P<subsource>[A-Z0-9]*)$  # subsource, optional, usually single char
"
    )
    .unwrap();
}

pub const PREFIX: &str = "FDSN:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceIdentifier {
    Raw(String),
    Fdsn(FdsnSourceIdentifier),
}

impl SourceIdentifier {
    pub fn calc_len(&self) -> u8 {
        match self {
            SourceIdentifier::Raw(s) => s.len() as u8,
            SourceIdentifier::Fdsn(f) => f.calc_len(),
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            SourceIdentifier::Raw(s) => Vec::from(s.as_bytes()),
            SourceIdentifier::Fdsn(f) => f.as_bytes(),
        }
    }
}

impl From<String> for SourceIdentifier {
    fn from(s: String) -> Self {
        match FdsnSourceIdentifier::parse(&s) {
            Ok(fdsn) => SourceIdentifier::Fdsn(fdsn),
            Err(_) => SourceIdentifier::Raw(s),
        }
    }
}

impl From<&str> for SourceIdentifier {
    fn from(s: &str) -> Self {
        match FdsnSourceIdentifier::parse(s) {
            Ok(fdsn) => SourceIdentifier::Fdsn(fdsn),
            Err(_) => SourceIdentifier::Raw(s.to_string()),
        }
    }
}

impl TryFrom<Vec<u8>> for SourceIdentifier {
    type Error = MSeedError;

    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        let s = String::from_utf8(v)?;
        Ok(SourceIdentifier::from(&*s))
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SourceIdentifier::Raw(s) => write!(f, "{}", s),
            SourceIdentifier::Fdsn(fdsn) => write!(f, "{}", fdsn),
        }
    }
}

impl Serialize for SourceIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SourceIdentifier::Raw(s) => serializer.serialize_str(s),
            SourceIdentifier::Fdsn(fdsn) => serializer.serialize_str(&fdsn.to_string()),
        }
    }
}

/// An FDSN Source Identifier string parsed into its component parts
/// See the specification at <http://docs.fdsn.org/projects/source-identifiers/en/v1.0/index.html>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdsnSourceIdentifier {
    pub network: String,
    pub station: String,
    pub location: String,
    pub band: String,
    pub source: String,
    pub subsource: String,
}

impl FdsnSourceIdentifier {
    /// Calculates the length when turned back into a string. This includes
    /// 5 bytes for the FDSN: prefix and the 5 underscore separators
    pub fn calc_len(&self) -> u8 {
        (10 + self.network.len()
            + self.station.len()
            + self.location.len()
            + self.band.len()
            + self.source.len()
            + self.subsource.len()) as u8
    }

    /// Returns a byte slice of this identifier.
    pub fn as_bytes(&self) -> Vec<u8> {
        Vec::from(self.to_string().as_bytes())
    }

    /// Parses identifier from Vec of bytes
    pub fn from_utf8(vec: Vec<u8>) -> Result<FdsnSourceIdentifier, MSeedError> {
        let text = String::from_utf8(vec)?;
        FdsnSourceIdentifier::parse(&text)
    }

    pub fn parse(id: &str) -> Result<FdsnSourceIdentifier, MSeedError> {
        let sid = match PARSE_FDSN_REGEX.captures(id) {
            Some(captures) => FdsnSourceIdentifier {
                network: capture_named(&captures, "net", id)?,
                station: capture_named(&captures, "sta", id)?,
                location: capture_named(&captures, "loc", id)?,
                band: capture_named(&captures, "band", id)?,
                source: capture_named(&captures, "source", id)?,
                subsource: capture_named(&captures, "subsource", id)?,
            },
            None => {
                return Err(MSeedError::IdentifierParse(
                    id.to_string(),
                    String::from("all"),
                ))
            }
        };
        Ok(sid)
    }

    /// Build an identifier from SEED network, station, location and
    /// channel codes. A 3-character channel splits into band, source
    /// and subsource; longer channels must use the `B_S_SS` form.
    pub fn from_nslc(
        net: &str,
        sta: &str,
        loc: &str,
        channel: &str,
    ) -> Result<FdsnSourceIdentifier, MSeedError> {
        let (band, source, subsource) = if channel.chars().count() == 3 {
            let mut chars = channel.chars();
            let b = chars.next().unwrap_or(' ');
            let s = chars.next().unwrap_or(' ');
            let ss = chars.next().unwrap_or(' ');
            (b.to_string(), s.to_string(), ss.to_string())
        } else {
            let items: Vec<&str> = channel.split('_').collect();
            if items.len() != 3 || items[1].is_empty() {
                return Err(MSeedError::IdentifierParse(
                    channel.to_string(),
                    String::from("channel"),
                ));
            }
            (
                items[0].to_string(),
                items[1].to_string(),
                items[2].to_string(),
            )
        };
        Ok(FdsnSourceIdentifier {
            network: net.trim().to_string(),
            station: sta.trim().to_string(),
            location: loc.trim().to_string(),
            band,
            source,
            subsource,
        })
    }

    /// Network, station, location and channel codes, the channel
    /// recomposed from band, source and subsource.
    pub fn as_nslc(&self) -> (String, String, String, String) {
        let chan = if self.band.len() <= 1 && self.source.len() == 1 && self.subsource.len() <= 1 {
            format!("{}{}{}", self.band, self.source, self.subsource)
        } else {
            format!("{}_{}_{}", self.band, self.source, self.subsource)
        };
        (
            self.network.clone(),
            self.station.clone(),
            self.location.clone(),
            chan,
        )
    }

    /// A placeholder identifier for data with no real metadata, the
    /// band code derived from the sample rate.
    pub fn create_unknown(
        sample_rate: Option<f64>,
        response_period: Option<f64>,
    ) -> Result<FdsnSourceIdentifier, MSeedError> {
        Ok(FdsnSourceIdentifier {
            network: String::from("XX"),
            station: String::from("ABC"),
            location: String::new(),
            band: band_code_for_rate(sample_rate, response_period)?.to_string(),
            source: String::from("H"),
            subsource: String::from("U"),
        })
    }
}

impl fmt::Display for FdsnSourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}_{}_{}_{}_{}_{}",
            PREFIX,
            self.network,
            self.station,
            self.location,
            self.band,
            self.source,
            self.subsource
        )
    }
}

fn capture_named(captures: &Captures, name: &str, id: &str) -> Result<String, MSeedError> {
    match captures.name(name) {
        Some(s) => Ok(s.as_str().to_string()),
        None => Err(MSeedError::IdentifierParse(
            id.to_string(),
            name.to_string(),
        )),
    }
}

/// Band code for a nominal sample rate, optionally distinguishing
/// broadband from short period with the response period in seconds.
/// When the response period is unknown the broadband row is chosen.
///
/// See <http://docs.fdsn.org/projects/source-identifiers/en/v1.0/channel-codes.html#band-code>
pub fn band_code_for_rate(
    sample_rate: Option<f64>,
    response_period: Option<f64>,
) -> Result<char, MSeedError> {
    let rate = match sample_rate {
        None => return Ok('I'),
        Some(r) => r,
    };
    let broadband = response_period.map_or(true, |p| p >= 10.0);

    let code = if rate >= 5000.0 {
        'J'
    } else if rate >= 1000.0 {
        if broadband {
            'F'
        } else {
            'G'
        }
    } else if rate >= 250.0 {
        if broadband {
            'C'
        } else {
            'D'
        }
    } else if rate >= 80.0 {
        if broadband {
            'H'
        } else {
            'E'
        }
    } else if rate >= 10.0 {
        if broadband {
            'B'
        } else {
            'S'
        }
    } else if rate > 1.0 {
        'M'
    } else if rate > 0.5 {
        // band code table is not clear about how far from 1 is L
        'L'
    } else if rate >= 0.1 {
        'V'
    } else if rate >= 0.01 {
        'U'
    } else if rate >= 0.001 {
        'W'
    } else if rate >= 0.0001 {
        'R'
    } else if rate >= 0.00001 {
        'P'
    } else if rate >= 0.000001 {
        'T'
    } else if rate > 0.0 {
        'Q'
    } else {
        return Err(MSeedError::BandCode(rate));
    };
    Ok(code)
}

/// Broadband band code for the rate plus the short-period alternative
/// where the row depends on the response period.
pub fn band_code_candidates(sample_rate: f64) -> Result<(char, Option<char>), MSeedError> {
    let broadband = band_code_for_rate(Some(sample_rate), None)?;
    let short_period = band_code_for_rate(Some(sample_rate), Some(1.0))?;
    if broadband == short_period {
        Ok((broadband, None))
    } else {
        Ok((broadband, Some(short_period)))
    }
}

struct BandCode {
    code: char,
    band_type: &'static str,
    rate: &'static str,
    response_lb: &'static str,
}

static BAND_CODES: &[BandCode] = &[
    BandCode { code: 'J', band_type: "General, > 5000 sps", rate: ">= 5000", response_lb: "" },
    BandCode { code: 'F', band_type: "General, 1000 to < 5000 sps", rate: ">= 1000 to < 5000", response_lb: ">= 10 sec" },
    BandCode { code: 'G', band_type: "General, 1000 to < 5000 sps", rate: ">= 1000 to < 5000", response_lb: "< 10 sec" },
    BandCode { code: 'D', band_type: "General, 250 to < 1000 sps", rate: ">= 250 to < 1000", response_lb: "< 10 sec" },
    BandCode { code: 'C', band_type: "General, 250 to < 1000 sps", rate: ">= 250 to < 1000", response_lb: ">= 10 sec" },
    BandCode { code: 'E', band_type: "Extremely Short Period", rate: ">= 80 to < 250", response_lb: "< 10 sec" },
    BandCode { code: 'H', band_type: "High Broadband", rate: ">= 80 to < 250", response_lb: ">= 10 sec" },
    BandCode { code: 'S', band_type: "Short Period", rate: ">= 10 to < 80", response_lb: "< 10 sec" },
    BandCode { code: 'B', band_type: "Broadband", rate: ">= 10 to < 80", response_lb: ">= 10 sec" },
    BandCode { code: 'M', band_type: "Mid Period", rate: "> 1 to < 10", response_lb: "" },
    BandCode { code: 'L', band_type: "Long Period", rate: "~ 1", response_lb: "" },
    BandCode { code: 'V', band_type: "Very Long Period", rate: "~ 0.1", response_lb: "" },
    BandCode { code: 'U', band_type: "Ultra Long Period", rate: "~ 0.01", response_lb: "" },
    BandCode { code: 'W', band_type: "Ultra-ultra Long Period", rate: ">= 0.001 to < 0.01", response_lb: "" },
    BandCode { code: 'R', band_type: "Extremely Long Period", rate: ">= 0.0001 to < 0.001", response_lb: "" },
    BandCode { code: 'P', band_type: "On the order of 0.1 to 1 day", rate: ">= 0.00001 to < 0.0001", response_lb: "" },
    BandCode { code: 'T', band_type: "On the order of 1 to 10 days", rate: ">= 0.000001 to < 0.00001", response_lb: "" },
    BandCode { code: 'Q', band_type: "Greater than 10 days", rate: "< 0.000001", response_lb: "" },
    BandCode { code: 'A', band_type: "Administrative Instrument Channel", rate: "variable", response_lb: "" },
    BandCode { code: 'O', band_type: "Opaque Instrument Channel", rate: "variable", response_lb: "" },
    BandCode { code: 'I', band_type: "Irregularly Sampled", rate: "variable", response_lb: "" },
];

static SOURCE_CODES: &[(char, &str)] = &[
    ('A', "Tilt Meter"),
    ('B', "Creep Meter"),
    ('C', "Calibration Input"),
    ('D', "Pressure"),
    ('E', "Electronic Test Point"),
    ('F', "Magnetometer"),
    ('G', "Gravimeter"),
    ('H', "High Gain Seismometer"),
    ('I', "Humidity"),
    ('J', "Rotational Sensor"),
    ('K', "Temperature"),
    ('L', "Low Gain Seismometer"),
    ('M', "Mass Position Seismometer"),
    ('N', "Accelerometer"),
    ('O', "Water Current"),
    ('P', "Geophone"),
    ('Q', "Electric Potential"),
    ('R', "Rainfall"),
    ('S', "Linear Strain"),
    ('T', "Tide"),
    ('U', "Bolometer"),
    ('V', "Volumetric Strain"),
    ('W', "Wind"),
    ('X', "Derived or generated channel"),
    ('Y', "Non-specific instruments"),
    ('Z', "Synthesized Beams"),
];

/// Describe a band code, like `Broadband, >= 10 to < 80 Hz, response period >= 10 sec`.
pub fn describe_band(code: char) -> Result<String, MSeedError> {
    let bc = BAND_CODES
        .iter()
        .find(|bc| bc.code == code)
        .ok_or(MSeedError::UnknownBandCode(code))?;
    if bc.response_lb.is_empty() {
        Ok(format!("{}, {} Hz", bc.band_type, bc.rate))
    } else {
        Ok(format!(
            "{}, {} Hz, response period {}",
            bc.band_type, bc.rate, bc.response_lb
        ))
    }
}

/// Describe a source code, like `High Gain Seismometer`.
pub fn describe_source(code: char) -> Result<String, MSeedError> {
    SOURCE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, d)| d.to_string())
        .ok_or(MSeedError::UnknownSourceCode(code))
}

struct SourceIdentifierVisitor;

impl<'de> Visitor<'de> for SourceIdentifierVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a source identifier string")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(String::from(value))
    }
}

impl<'de> Deserialize<'de> for SourceIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<SourceIdentifier, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(SourceIdentifier::from(
            deserializer.deserialize_str(SourceIdentifierVisitor)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_format_round_trip() -> Result<(), MSeedError> {
        for id in [
            "FDSN:IU_ABCD_00_B_H_Z",
            "FDSN:XX_TEST__L_H_Z",
            "FDSN:CO_JSC_00_H_H_3",
            "FDSN:XX_UNKN_00_L_H_U",
        ] {
            let sid = FdsnSourceIdentifier::parse(id)?;
            assert_eq!(id, sid.to_string());
            assert_eq!(id.len() as u8, sid.calc_len());
        }
        Ok(())
    }

    #[test]
    fn parse_fields() -> Result<(), MSeedError> {
        let sid = FdsnSourceIdentifier::parse("FDSN:IU_ABCD_00_B_H_Z")?;
        assert_eq!("IU", sid.network);
        assert_eq!("ABCD", sid.station);
        assert_eq!("00", sid.location);
        assert_eq!("B", sid.band);
        assert_eq!("H", sid.source);
        assert_eq!("Z", sid.subsource);
        Ok(())
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in [
            "IU_ABCD_00_B_H_Z",         // missing scheme
            "FDSN:IU_ABCD_00_B_H",      // five fields
            "FDSN:IU_ABCD_00_B_H_Z_Q",  // seven fields
            "FDSN:TOOLONGNET9_A__B_H_Z", // network over 8 chars
        ] {
            assert!(FdsnSourceIdentifier::parse(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn nslc_synthesis() -> Result<(), MSeedError> {
        let sid = FdsnSourceIdentifier::from_nslc("CO", "HODGE", "00", "LHZ")?;
        assert_eq!(sid.to_string(), "FDSN:CO_HODGE_00_L_H_Z");
        let (net, sta, loc, chan) = sid.as_nslc();
        assert_eq!((net.as_str(), sta.as_str()), ("CO", "HODGE"));
        assert_eq!((loc.as_str(), chan.as_str()), ("00", "LHZ"));
        Ok(())
    }

    #[test]
    fn band_code_boundaries() -> Result<(), MSeedError> {
        // broadband rows with unknown response period
        assert_eq!(band_code_for_rate(Some(5000.0), None)?, 'J');
        assert_eq!(band_code_for_rate(Some(1000.0), None)?, 'F');
        assert_eq!(band_code_for_rate(Some(250.0), None)?, 'C');
        assert_eq!(band_code_for_rate(Some(80.0), None)?, 'H');
        assert_eq!(band_code_for_rate(Some(10.0), None)?, 'B');
        assert_eq!(band_code_for_rate(Some(2.0), None)?, 'M');
        assert_eq!(band_code_for_rate(Some(1.0), None)?, 'L');
        assert_eq!(band_code_for_rate(Some(0.1), None)?, 'V');
        assert_eq!(band_code_for_rate(Some(0.01), None)?, 'U');
        assert_eq!(band_code_for_rate(Some(0.001), None)?, 'W');
        assert_eq!(band_code_for_rate(Some(0.0001), None)?, 'R');
        assert_eq!(band_code_for_rate(Some(0.00001), None)?, 'P');
        assert_eq!(band_code_for_rate(Some(0.000001), None)?, 'T');
        assert_eq!(band_code_for_rate(Some(0.0000001), None)?, 'Q');
        assert_eq!(band_code_for_rate(None, None)?, 'I');
        Ok(())
    }

    #[test]
    fn band_code_short_period_rows() -> Result<(), MSeedError> {
        assert_eq!(band_code_for_rate(Some(1000.0), Some(1.0))?, 'G');
        assert_eq!(band_code_for_rate(Some(250.0), Some(1.0))?, 'D');
        assert_eq!(band_code_for_rate(Some(100.0), Some(1.0))?, 'E');
        assert_eq!(band_code_for_rate(Some(20.0), Some(1.0))?, 'S');
        // at exactly 10 seconds the broadband row still applies
        assert_eq!(band_code_for_rate(Some(20.0), Some(10.0))?, 'B');
        Ok(())
    }

    #[test]
    fn band_code_candidates_expose_secondary() -> Result<(), MSeedError> {
        assert_eq!(band_code_candidates(100.0)?, ('H', Some('E')));
        assert_eq!(band_code_candidates(1.0)?, ('L', None));
        Ok(())
    }

    #[test]
    fn nonpositive_rate_fails() {
        assert!(band_code_for_rate(Some(0.0), None).is_err());
        assert!(band_code_for_rate(Some(-20.0), None).is_err());
    }

    #[test]
    fn unknown_sentinel() -> Result<(), MSeedError> {
        let sid = FdsnSourceIdentifier::create_unknown(Some(100.0), None)?;
        assert_eq!(sid.to_string(), "FDSN:XX_ABC__H_H_U");
        Ok(())
    }

    #[test]
    fn describe_tables() -> Result<(), MSeedError> {
        assert_eq!(
            describe_band('B')?,
            "Broadband, >= 10 to < 80 Hz, response period >= 10 sec"
        );
        assert_eq!(describe_source('H')?, "High Gain Seismometer");
        assert!(describe_band('8').is_err());
        assert!(describe_source('8').is_err());
        Ok(())
    }
}
