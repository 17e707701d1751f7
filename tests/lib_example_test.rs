use mseed::MSeedError;
use std::io::Write;

#[test]
fn lib_test() -> Result<(), MSeedError> {
    use chrono::{DateTime, Utc};
    use mseed::{DataEncoding, EncodedTimeseries, ExtraHeaders, SourceIdentifier};
    let start = "2014-11-28T12:00:09Z"
        .parse::<DateTime<Utc>>()
        .map_err(|e| MSeedError::Unknown(e.to_string()))?;
    let timeseries = vec![0, 1, -1, 5, 3, -5, 10, -1, 1, 0];
    let num_samples = timeseries.len();
    let encoded_data = EncodedTimeseries::Int32(timeseries);
    let header = mseed::MSeed3Header::new(start, DataEncoding::INT32, 10.0, num_samples);
    let identifier = SourceIdentifier::from("FDSN:CO_BIRD_00_H_H_Z");
    let extra_headers = ExtraHeaders::new();
    let mut record = mseed::MSeed3Record::new(header, identifier, extra_headers, encoded_data);

    let path = std::env::temp_dir().join("mseed_lib_example.ms3");
    let outfile = std::fs::File::create(&path)?;
    let mut buf_writer = std::io::BufWriter::new(outfile);
    record.write_to(&mut buf_writer)?; // writing a record mut's the header to fix crc, and the byte lengths
    buf_writer.flush()?;

    let my_mseed3_file = std::fs::File::open(&path)?;
    let mut buf_reader = std::io::BufReader::new(my_mseed3_file);
    let records = mseed::read_mseed3(&mut buf_reader)?;
    let first_record = match records.first() {
        Some(rec) => rec,
        None => return Err(MSeedError::Unknown(String::from("no records in file"))),
    };
    assert_eq!(first_record.identifier.to_string(), "FDSN:CO_BIRD_00_H_H_Z");
    assert_eq!(first_record.header.num_samples, 10);
    assert_eq!(first_record.header.crc, record.header.crc);
    std::fs::remove_file(&path)?;

    Ok(())
}
