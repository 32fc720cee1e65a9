//! Creation-date extraction from embedded media metadata.
//!
//! Still images (JPEG, PNG, TIFF, WebP, HEIF) go through the EXIF reader;
//! MP4/QuickTime movies through the `mvhd` box. The container is chosen from
//! the leading bytes, never from the file extension.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use exif::{In, Tag, Value};

use super::error::MetadataError;

/// Seconds between the QuickTime epoch (1904-01-01) and the Unix epoch.
const SECONDS_FROM_1904_TO_1970: i64 = 2_082_844_800;

/// EXIF date tags in preference order, each paired with its offset tag.
const EXIF_DATE_TAGS: &[(Tag, Tag)] = &[
    (Tag::DateTimeOriginal, Tag::OffsetTimeOriginal),
    (Tag::DateTimeDigitized, Tag::OffsetTimeDigitized),
    (Tag::DateTime, Tag::OffsetTime),
];

/// ISO-BMFF major brands that carry still images (and therefore EXIF).
const HEIF_BRANDS: &[&[u8]] = &[
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1", b"avif",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Exif,
    IsoMedia,
    /// QuickTime movie without an `ftyp` box.
    LegacyQuickTime,
}

fn sniff_container(head: &[u8]) -> Option<Container> {
    if head.starts_with(&[0xFF, 0xD8])
        || head.starts_with(b"\x89PNG\r\n\x1a\n")
        || head.starts_with(b"II*\0")
        || head.starts_with(b"MM\0*")
    {
        return Some(Container::Exif);
    }
    if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return Some(Container::Exif);
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        let brand = &head[8..12];
        if HEIF_BRANDS.contains(&brand) {
            return Some(Container::Exif);
        }
        return Some(Container::IsoMedia);
    }
    // Old QuickTime files may open straight onto a top-level atom.
    if head.len() >= 8 && matches!(&head[4..8], b"moov" | b"mdat" | b"wide" | b"free" | b"skip")
    {
        return Some(Container::LegacyQuickTime);
    }
    None
}

/// Read the embedded creation timestamp of a local media file.
///
/// Blocking; call from `spawn_blocking` in async contexts.
pub fn extract_creation_timestamp(path: &Path) -> Result<DateTime<Utc>, MetadataError> {
    let mut file = File::open(path)?;
    let mut head = Vec::with_capacity(16);
    file.by_ref().take(16).read_to_end(&mut head)?;
    file.seek(SeekFrom::Start(0))?;

    match sniff_container(&head).ok_or(MetadataError::UnknownFormat)? {
        Container::Exif => exif_creation_date(file),
        Container::IsoMedia => mp4_creation_date(file),
        Container::LegacyQuickTime => quicktime_creation_date(file),
    }
}

fn exif_creation_date(file: File) -> Result<DateTime<Utc>, MetadataError> {
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;

    for (date_tag, offset_tag) in EXIF_DATE_TAGS {
        let Some(raw) = exif
            .get_field(*date_tag, In::PRIMARY)
            .and_then(|f| first_ascii(&f.value))
        else {
            continue;
        };
        let mut dt = match exif::DateTime::from_ascii(raw) {
            Ok(dt) => dt,
            Err(e) => {
                tracing::debug!("Malformed EXIF {}: {}", date_tag, e);
                continue;
            }
        };
        if let Some(offset) = exif
            .get_field(*offset_tag, In::PRIMARY)
            .and_then(|f| first_ascii(&f.value))
        {
            if let Err(e) = dt.parse_offset(offset) {
                tracing::debug!("Ignoring malformed EXIF {}: {}", offset_tag, e);
            }
        }
        if let Some(ts) = exif_to_utc(&dt) {
            return Ok(ts);
        }
    }
    Err(MetadataError::NoCreationDate)
}

fn first_ascii(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Ascii(parts) => parts.first().map(Vec::as_slice),
        _ => None,
    }
}

/// EXIF dates are wall-clock times. Without an offset tag they are read in
/// the local zone; placeholder dates such as `0000:00:00` yield `None`.
fn exif_to_utc(dt: &exif::DateTime) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?
        .and_hms_opt(dt.hour.into(), dt.minute.into(), dt.second.into())?;
    match dt.offset {
        Some(minutes) => FixedOffset::east_opt(i32::from(minutes) * 60)?
            .from_local_datetime(&naive)
            .single()
            .map(|t| t.with_timezone(&Utc)),
        None => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
    }
}

fn mp4_creation_date(file: File) -> Result<DateTime<Utc>, MetadataError> {
    let size = file.metadata()?.len();
    let mp4 = mp4::Mp4Reader::read_header(BufReader::new(file), size)?;
    from_quicktime_epoch(mp4.moov.mvhd.creation_time)
}

/// `mp4` insists on a leading `ftyp`, so older movies are walked by hand:
/// top-level atoms until `moov`, then its children until `mvhd`.
fn quicktime_creation_date(file: File) -> Result<DateTime<Utc>, MetadataError> {
    let size = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let (moov_start, moov_end) =
        find_atom(&mut reader, 0, size, b"moov")?.ok_or(MetadataError::NoCreationDate)?;
    let (mvhd_start, _) = find_atom(&mut reader, moov_start, moov_end, b"mvhd")?
        .ok_or(MetadataError::NoCreationDate)?;

    reader.seek(SeekFrom::Start(mvhd_start))?;
    let mut version_flags = [0u8; 4];
    reader.read_exact(&mut version_flags)?;
    let creation_time = if version_flags[0] == 1 {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        u64::from_be_bytes(buf)
    } else {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        u64::from(u32::from_be_bytes(buf))
    };
    from_quicktime_epoch(creation_time)
}

/// Find the first atom named `name` among the siblings in `start..end`.
/// Returns the byte range of its payload.
fn find_atom<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    name: &[u8; 4],
) -> Result<Option<(u64, u64)>, MetadataError> {
    let mut pos = start;
    while pos + 8 <= end {
        reader.seek(SeekFrom::Start(pos))?;
        let mut header = [0u8; 8];
        reader.read_exact(&mut header)?;
        let mut header_len = 8u64;
        let atom_len = match u32::from_be_bytes([header[0], header[1], header[2], header[3]]) {
            0 => end - pos,
            1 => {
                let mut large = [0u8; 8];
                reader.read_exact(&mut large)?;
                header_len = 16;
                u64::from_be_bytes(large)
            }
            n => u64::from(n),
        };
        if atom_len < header_len || pos + atom_len > end {
            tracing::debug!("Malformed atom at offset {}", pos);
            return Ok(None);
        }
        if &header[4..8] == name {
            return Ok(Some((pos + header_len, pos + atom_len)));
        }
        pos += atom_len;
    }
    Ok(None)
}

fn from_quicktime_epoch(creation_time: u64) -> Result<DateTime<Utc>, MetadataError> {
    // Encoders that don't know the date write zero.
    if creation_time == 0 {
        return Err(MetadataError::NoCreationDate);
    }
    let unix = i64::try_from(creation_time)
        .map_err(|_| MetadataError::NoCreationDate)?
        - SECONDS_FROM_1904_TO_1970;
    Utc.timestamp_opt(unix, 0)
        .single()
        .ok_or(MetadataError::NoCreationDate)
}
