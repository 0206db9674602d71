use super::{Frame, Profile, SYMBOLIC_LOCATION, Sample, ValueType, proto};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use prost::Message;
use std::collections::HashMap;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decode a pprof payload, gzip-compressed or raw protobuf
pub fn decode(payload: &[u8]) -> Result<Profile> {
    if payload.is_empty() {
        return Err(Error::Decode("empty payload".to_string()));
    }

    let raw;
    let bytes = if payload.starts_with(&GZIP_MAGIC) {
        let mut buf = Vec::new();
        GzDecoder::new(payload)
            .read_to_end(&mut buf)
            .map_err(|e| Error::Decode(format!("gzip: {}", e)))?;
        raw = buf;
        raw.as_slice()
    } else {
        payload
    };

    let message =
        proto::Profile::decode(bytes).map_err(|e| Error::Decode(format!("protobuf: {}", e)))?;

    if message.string_table.first().map(String::as_str) != Some("") {
        return Err(Error::Decode("not a pprof profile".to_string()));
    }

    from_proto(&message)
}

fn from_proto(message: &proto::Profile) -> Result<Profile> {
    let strings = &message.string_table;
    let string_at = |idx: i64| -> Result<String> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| strings.get(i))
            .cloned()
            .ok_or_else(|| Error::Decode(format!("string index {} out of range", idx)))
    };
    let value_type = |vt: &proto::ValueType| -> Result<ValueType> {
        Ok(ValueType {
            kind: string_at(vt.r#type)?,
            unit: string_at(vt.unit)?,
        })
    };

    let sample_types = message
        .sample_type
        .iter()
        .map(value_type)
        .collect::<Result<Vec<_>>>()?;

    let default_sample_type = if message.default_sample_type != 0 {
        let name = string_at(message.default_sample_type)?;
        sample_types.iter().position(|vt| vt.kind == name)
    } else {
        None
    };

    let mut functions: HashMap<u64, (String, String)> = HashMap::new();
    for f in &message.function {
        functions.insert(f.id, (string_at(f.name)?, string_at(f.filename)?));
    }

    // Location ids are remapped to addresses; purely symbolic locations keep their
    // id, tagged so it cannot collide with a real address.
    let mut addresses: HashMap<u64, u64> = HashMap::new();
    let mut profile = Profile {
        sample_types,
        default_sample_type,
        period_type: message.period_type.as_ref().map(value_type).transpose()?,
        period: message.period,
        time_nanos: message.time_nanos,
        duration_nanos: message.duration_nanos,
        ..Default::default()
    };

    for loc in &message.location {
        let addr = if loc.address != 0 {
            loc.address
        } else {
            loc.id | SYMBOLIC_LOCATION
        };
        addresses.insert(loc.id, addr);

        let frames = loc
            .line
            .iter()
            .map(|line| match functions.get(&line.function_id) {
                Some((name, file)) => Frame {
                    function: name.clone(),
                    file: file.clone(),
                    line: u32::try_from(line.line).unwrap_or(0),
                },
                None => Frame::unknown(),
            })
            .collect();
        profile.locations.insert(addr, frames);
    }

    let width = profile.sample_types.len();
    for s in &message.sample {
        if width != 0 && s.value.len() != width {
            return Err(Error::Decode(format!(
                "sample has {} values, expected {}",
                s.value.len(),
                width
            )));
        }
        let stack = s
            .location_id
            .iter()
            .map(|id| {
                addresses
                    .get(id)
                    .copied()
                    .ok_or_else(|| Error::Decode(format!("unknown location id {}", id)))
            })
            .collect::<Result<Vec<_>>>()?;
        profile.samples.push(Sample {
            stack,
            values: s.value.clone(),
        });
    }

    Ok(profile)
}
