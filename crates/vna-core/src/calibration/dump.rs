//! Calibration dump codec
//!
//! Durable binary form of a [`CalibrationSet`]. Little-endian throughout,
//! delimited by three text markers. Field order is a fixed contract:
//!
//! ```text
//! "START"  z0:f64  supported:string  [count:i32  freq:u64 x count]
//! "Data"   ten slots, each [count:i32  (re:f64 im:f64) x count]
//! "END"
//! ```
//!
//! Strings (markers and the '/'-joined supported-parameter list) are a
//! single length byte followed by UTF-8 bytes; every string this format
//! writes is far below the one-byte limit. An unset slot is written as a
//! zero count with no samples and decodes back to unset. Any new slot
//! must be introduced with a new marker, never by resizing the existing
//! section.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array1;
use num_complex::Complex64;
use thiserror::Error;

use crate::calibration::dataset::{CalSlot, CalibrationSet};
use crate::params::{ParamSet, SParam};

const TAG_START: &str = "START";
const TAG_DATA: &str = "Data";
const TAG_END: &str = "END";

/// Dump format errors
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("marker mismatch: expected {expected:?}, found {found:?}")]
    MarkerMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("negative array count {0}")]
    NegativeCount(i32),

    #[error("unknown parameter name {0:?} in supported-parameter list")]
    UnknownParam(String),

    #[error("string field is not valid UTF-8")]
    BadString,
}

/// Write `cal` to a file.
pub fn save<P: AsRef<Path>>(path: P, cal: &CalibrationSet) -> Result<(), DumpError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode(&mut writer, cal)
}

/// Read a dataset back from a file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<CalibrationSet, DumpError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    decode(&mut reader)
}

/// Serialize `cal` to a byte stream.
pub fn encode<W: Write>(writer: &mut W, cal: &CalibrationSet) -> Result<(), DumpError> {
    write_str(writer, TAG_START)?;
    writer.write_f64::<LittleEndian>(cal.z0())?;
    write_str(writer, &cal.supported().to_string())?;
    write_frequencies(writer, cal.frequencies())?;

    write_str(writer, TAG_DATA)?;
    for slot in CalSlot::ALL {
        write_trace(writer, cal.slot(slot))?;
    }

    write_str(writer, TAG_END)?;
    Ok(())
}

/// Reconstruct a dataset from a byte stream.
///
/// Fails on the first marker mismatch. Trace lengths are reconstructed
/// as declared; cross-slot consistency is the writer's responsibility.
pub fn decode<R: Read>(reader: &mut R) -> Result<CalibrationSet, DumpError> {
    expect_marker(reader, TAG_START)?;
    let z0 = reader.read_f64::<LittleEndian>()?;
    let supported = read_param_set(reader)?;
    let frequencies = read_frequencies(reader)?;

    expect_marker(reader, TAG_DATA)?;
    let mut cal = CalibrationSet::new();
    cal.set_sweep(frequencies, z0);
    cal.set_supported(supported);
    for slot in CalSlot::ALL {
        if let Some(trace) = read_trace(reader)? {
            cal.put(slot, trace);
        }
    }

    expect_marker(reader, TAG_END)?;
    Ok(cal)
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<(), DumpError> {
    debug_assert!(s.len() < 0x80);
    writer.write_u8(s.len() as u8)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn read_str<R: Read>(reader: &mut R) -> Result<String, DumpError> {
    let len = reader.read_u8()? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| DumpError::BadString)
}

fn expect_marker<R: Read>(reader: &mut R, expected: &'static str) -> Result<(), DumpError> {
    let found = read_str(reader)?;
    if found != expected {
        return Err(DumpError::MarkerMismatch { expected, found });
    }
    Ok(())
}

fn read_param_set<R: Read>(reader: &mut R) -> Result<ParamSet, DumpError> {
    let joined = read_str(reader)?;
    let mut set = ParamSet::EMPTY;
    for name in joined.split('/').filter(|t| !t.is_empty()) {
        let param =
            SParam::from_name(name).ok_or_else(|| DumpError::UnknownParam(name.to_string()))?;
        set.insert(param);
    }
    Ok(set)
}

fn write_frequencies<W: Write>(writer: &mut W, frequencies: &[u64]) -> Result<(), DumpError> {
    writer.write_i32::<LittleEndian>(frequencies.len() as i32)?;
    for &f in frequencies {
        writer.write_u64::<LittleEndian>(f)?;
    }
    Ok(())
}

fn read_frequencies<R: Read>(reader: &mut R) -> Result<Vec<u64>, DumpError> {
    let count = read_count(reader)?;
    let mut frequencies = Vec::with_capacity(count);
    for _ in 0..count {
        frequencies.push(reader.read_u64::<LittleEndian>()?);
    }
    Ok(frequencies)
}

fn write_trace<W: Write>(writer: &mut W, trace: Option<&Array1<Complex64>>) -> Result<(), DumpError> {
    match trace {
        None => writer.write_i32::<LittleEndian>(0)?,
        Some(trace) => {
            writer.write_i32::<LittleEndian>(trace.len() as i32)?;
            for c in trace {
                writer.write_f64::<LittleEndian>(c.re)?;
                writer.write_f64::<LittleEndian>(c.im)?;
            }
        }
    }
    Ok(())
}

fn read_trace<R: Read>(reader: &mut R) -> Result<Option<Array1<Complex64>>, DumpError> {
    let count = read_count(reader)?;
    if count == 0 {
        return Ok(None);
    }
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        let re = reader.read_f64::<LittleEndian>()?;
        let im = reader.read_f64::<LittleEndian>()?;
        samples.push(Complex64::new(re, im));
    }
    Ok(Some(Array1::from_vec(samples)))
}

fn read_count<R: Read>(reader: &mut R) -> Result<usize, DumpError> {
    let count = reader.read_i32::<LittleEndian>()?;
    if count < 0 {
        return Err(DumpError::NegativeCount(count));
    }
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::dataset::CalStandard;

    fn sample_set() -> CalibrationSet {
        let mut cal = CalibrationSet::new();
        let trace = Array1::from_vec(vec![
            Complex64::new(0.25, -0.75),
            Complex64::new(-1.5, 3.25),
        ]);
        cal.set(CalStandard::Short, SParam::S11, trace.clone()).unwrap();
        cal.set(CalStandard::Open, SParam::S11, trace.clone()).unwrap();
        cal.set(CalStandard::Load, SParam::S11, trace).unwrap();
        cal.set_sweep(vec![1_000_000, 2_000_000], 50.0);
        cal.set_supported(ParamSet::of(&[SParam::S11, SParam::S21]));
        cal
    }

    #[test]
    fn test_round_trip_in_memory() {
        let cal = sample_set();
        let mut bytes = Vec::new();
        encode(&mut bytes, &cal).unwrap();
        let back = decode(&mut bytes.as_slice()).unwrap();
        assert_eq!(back, cal);
    }

    #[test]
    fn test_unset_slots_stay_unset() {
        let cal = sample_set();
        let mut bytes = Vec::new();
        encode(&mut bytes, &cal).unwrap();
        let back = decode(&mut bytes.as_slice()).unwrap();
        assert!(back.slot(CalSlot::ShortS11).is_some());
        assert!(back.slot(CalSlot::ShortS22).is_none());
        assert!(back.slot(CalSlot::ThruS12).is_none());
    }

    #[test]
    fn test_bad_start_marker() {
        let mut bytes = Vec::new();
        encode(&mut bytes, &sample_set()).unwrap();
        bytes[1] = b'X';
        let err = decode(&mut bytes.as_slice()).unwrap_err();
        match err {
            DumpError::MarkerMismatch { expected, found } => {
                assert_eq!(expected, "START");
                assert_eq!(found, "XTART");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_stream_is_io_error() {
        let mut bytes = Vec::new();
        encode(&mut bytes, &sample_set()).unwrap();
        bytes.truncate(bytes.len() / 2);
        let err = decode(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, DumpError::Io(_)));
    }

    #[test]
    fn test_unknown_parameter_name() {
        let mut cal = sample_set();
        cal.set_supported(ParamSet::EMPTY);
        let mut bytes = Vec::new();
        encode(&mut bytes, &cal).unwrap();
        // splice a bogus name into the (empty) supported-set string
        let insert_at = 1 + TAG_START.len() + 8;
        assert_eq!(bytes[insert_at], 0);
        bytes[insert_at] = 3;
        bytes.splice(insert_at + 1..insert_at + 1, *b"S99");
        let err = decode(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, DumpError::UnknownParam(name) if name == "S99"));
    }
}
