//! Best-effort EXIF extraction

use crate::Result;
use exif::{Exif, In, Reader, Tag, Value};
use ipc_proto::ExifRecord;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read the EXIF summary of a photo.
///
/// Only I/O failures are errors. A file without EXIF, or with EXIF the
/// reader can't make sense of, yields an empty record.
pub fn read_exif(path: &Path) -> Result<ExifRecord> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::Io(e)) => return Err(e.into()),
        Err(e) => {
            tracing::debug!("No usable EXIF in {}: {}", path.display(), e);
            return Ok(ExifRecord::default());
        }
    };

    Ok(ExifRecord {
        date_taken: text(&exif, Tag::DateTimeOriginal).or_else(|| text(&exif, Tag::DateTime)),
        camera_make: text(&exif, Tag::Make),
        camera_model: text(&exif, Tag::Model),
        iso: number(&exif, Tag::PhotographicSensitivity),
        aperture: with_unit(&exif, Tag::FNumber),
        shutter_speed: with_unit(&exif, Tag::ExposureTime),
        focal_length: with_unit(&exif, Tag::FocalLength),
        gps_lat: gps_decimal(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef),
        gps_lon: gps_decimal(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef),
        width: number(&exif, Tag::PixelXDimension),
        height: number(&exif, Tag::PixelYDimension),
    })
}

fn text(exif: &Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY)
        .map(|f| f.display_value().to_string().trim_matches('"').trim().to_string())
        .filter(|s| !s.is_empty())
}

fn with_unit(exif: &Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY)
        .map(|f| f.display_value().with_unit(exif).to_string())
}

fn number(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY).and_then(|f| match f.value {
        Value::Short(ref v) => v.first().map(|&x| x as u32),
        Value::Long(ref v) => v.first().copied(),
        _ => None,
    })
}

/// Degrees/minutes/seconds to signed decimal degrees (south and west negative)
fn gps_decimal(exif: &Exif, tag: Tag, ref_tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let reference = exif.get_field(ref_tag, In::PRIMARY)?;

    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    if parts.len() < 3 {
        return None;
    }

    let decimal = parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0;
    let hemisphere = reference.display_value().to_string();
    if hemisphere.contains('S') || hemisphere.contains('W') {
        Some(-decimal)
    } else {
        Some(decimal)
    }
}
