//! Fixed synthetic EXIF written onto archived originals.
//!
//! The payload is a big-endian TIFF structure with IFD0, an Exif sub-IFD and
//! a GPS sub-IFD. JPEG files carry it in an APP1 segment right after SOI;
//! PNG files carry it in an `eXIf` chunk right after IHDR. Any existing EXIF
//! block is replaced.

use std::path::Path;

use crc32fast::Hasher as Crc32;

use crate::shared::error::BoxError;

const MAKE: &str = "oldcamera";
const SOFTWARE: &str = "facewatch";
const ARTIST: &str = "0!code";
const RESOLUTION: (u32, u32) = (96, 1);
const DATE_TIME_ORIGINAL: &str = "2099:09:29 10:10:10";
const LENS_MAKE: &str = "LensMake";
const SHARPNESS: u16 = 65535;
const GPS_VERSION: [u8; 4] = [2, 0, 0, 0];
const GPS_ALTITUDE_REF: u8 = 1;
const GPS_DATE_STAMP: &str = "1999:99:99 99:99:99";

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

/// Container formats the stamper can write into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StampFormat {
    Jpeg,
    Png,
}

impl StampFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(StampFormat::Jpeg),
            "png" => Some(StampFormat::Png),
            _ => None,
        }
    }
}

/// Returns `bytes` with the synthetic EXIF block embedded.
pub fn stamp(bytes: &[u8], format: StampFormat) -> Result<Vec<u8>, BoxError> {
    let tiff = exif_payload();
    match format {
        StampFormat::Jpeg => stamp_jpeg(bytes, &tiff),
        StampFormat::Png => stamp_png(bytes, &tiff),
    }
}

// ---------------------------------------------------------------------------
// TIFF payload
// ---------------------------------------------------------------------------

const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

const TAG_MAKE: u16 = 0x010F;
const TAG_X_RESOLUTION: u16 = 0x011A;
const TAG_Y_RESOLUTION: u16 = 0x011B;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_ARTIST: u16 = 0x013B;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_SHARPNESS: u16 = 0xA40A;
const TAG_LENS_SPECIFICATION: u16 = 0xA432;
const TAG_LENS_MAKE: u16 = 0xA433;
const TAG_GPS_VERSION_ID: u16 = 0x0000;
const TAG_GPS_ALTITUDE_REF: u16 = 0x0005;
const TAG_GPS_DATE_STAMP: u16 = 0x001D;

enum TagValue {
    Bytes(Vec<u8>),
    Ascii(&'static str),
    Short(u16),
    Long(u32),
    Rationals(Vec<(u32, u32)>),
}

impl TagValue {
    fn type_code(&self) -> u16 {
        match self {
            TagValue::Bytes(_) => TYPE_BYTE,
            TagValue::Ascii(_) => TYPE_ASCII,
            TagValue::Short(_) => TYPE_SHORT,
            TagValue::Long(_) => TYPE_LONG,
            TagValue::Rationals(_) => TYPE_RATIONAL,
        }
    }

    fn count(&self) -> u32 {
        match self {
            TagValue::Bytes(b) => b.len() as u32,
            TagValue::Ascii(s) => s.len() as u32 + 1,
            TagValue::Short(_) | TagValue::Long(_) => 1,
            TagValue::Rationals(r) => r.len() as u32,
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            TagValue::Bytes(b) => b.clone(),
            TagValue::Ascii(s) => {
                let mut v = s.as_bytes().to_vec();
                v.push(0);
                v
            }
            TagValue::Short(n) => n.to_be_bytes().to_vec(),
            TagValue::Long(n) => n.to_be_bytes().to_vec(),
            TagValue::Rationals(r) => r
                .iter()
                .flat_map(|(num, den)| num.to_be_bytes().into_iter().chain(den.to_be_bytes()))
                .collect(),
        }
    }
}

type Ifd = Vec<(u16, TagValue)>;

/// Bytes an IFD occupies including its out-of-line values (word aligned).
fn ifd_size(ifd: &Ifd) -> usize {
    let overflow: usize = ifd
        .iter()
        .map(|(_, v)| v.encode().len())
        .filter(|&n| n > 4)
        .map(|n| n + n % 2)
        .sum();
    2 + 12 * ifd.len() + 4 + overflow
}

/// Appends `ifd` to `out`, which must currently end at `ifd`'s offset.
fn write_ifd(out: &mut Vec<u8>, ifd: &Ifd) {
    let start = out.len();
    let mut data_offset = start + 2 + 12 * ifd.len() + 4;
    let mut data = Vec::new();

    out.extend_from_slice(&(ifd.len() as u16).to_be_bytes());
    for (tag, value) in ifd {
        let encoded = value.encode();
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(&value.type_code().to_be_bytes());
        out.extend_from_slice(&value.count().to_be_bytes());
        if encoded.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..encoded.len()].copy_from_slice(&encoded);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&(data_offset as u32).to_be_bytes());
            let padded = encoded.len() + encoded.len() % 2;
            data.extend_from_slice(&encoded);
            data.resize(data.len() + padded - encoded.len(), 0);
            data_offset += padded;
        }
    }
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&data);
}

/// The TIFF-structured EXIF payload (without the `Exif\0\0` prefix).
pub fn exif_payload() -> Vec<u8> {
    let exif: Ifd = vec![
        (TAG_DATE_TIME_ORIGINAL, TagValue::Ascii(DATE_TIME_ORIGINAL)),
        (TAG_SHARPNESS, TagValue::Short(SHARPNESS)),
        (TAG_LENS_SPECIFICATION, TagValue::Rationals(vec![(1, 1); 4])),
        (TAG_LENS_MAKE, TagValue::Ascii(LENS_MAKE)),
    ];
    let gps: Ifd = vec![
        (TAG_GPS_VERSION_ID, TagValue::Bytes(GPS_VERSION.to_vec())),
        (TAG_GPS_ALTITUDE_REF, TagValue::Bytes(vec![GPS_ALTITUDE_REF])),
        (TAG_GPS_DATE_STAMP, TagValue::Ascii(GPS_DATE_STAMP)),
    ];

    // IFD0 has a fixed shape, so sub-IFD offsets are known before writing.
    let ifd0_template = ifd0(0, 0);
    let exif_offset = 8 + ifd_size(&ifd0_template);
    let gps_offset = exif_offset + ifd_size(&exif);
    let primary = ifd0(exif_offset as u32, gps_offset as u32);

    let mut out = Vec::with_capacity(gps_offset + ifd_size(&gps));
    out.extend_from_slice(b"MM");
    out.extend_from_slice(&42u16.to_be_bytes());
    out.extend_from_slice(&8u32.to_be_bytes());
    write_ifd(&mut out, &primary);
    write_ifd(&mut out, &exif);
    write_ifd(&mut out, &gps);
    out
}

fn ifd0(exif_offset: u32, gps_offset: u32) -> Ifd {
    vec![
        (TAG_MAKE, TagValue::Ascii(MAKE)),
        (TAG_X_RESOLUTION, TagValue::Rationals(vec![RESOLUTION])),
        (TAG_Y_RESOLUTION, TagValue::Rationals(vec![RESOLUTION])),
        (TAG_SOFTWARE, TagValue::Ascii(SOFTWARE)),
        (TAG_ARTIST, TagValue::Ascii(ARTIST)),
        (TAG_EXIF_IFD, TagValue::Long(exif_offset)),
        (TAG_GPS_IFD, TagValue::Long(gps_offset)),
    ]
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

fn stamp_jpeg(bytes: &[u8], tiff: &[u8]) -> Result<Vec<u8>, BoxError> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return Err("not a JPEG file (missing SOI)".into());
    }
    let segment_len = 2 + EXIF_HEADER.len() + tiff.len();
    if segment_len > u16::MAX as usize {
        return Err("EXIF payload too large for APP1".into());
    }

    let mut out = Vec::with_capacity(bytes.len() + segment_len + 2);
    out.extend_from_slice(&bytes[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&(segment_len as u16).to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(tiff);

    // Copy header segments, skipping any existing Exif APP1, until SOS.
    let mut index = 2usize;
    while index + 4 <= bytes.len() && bytes[index] == 0xFF {
        let marker = bytes[index + 1];
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let length = u16::from_be_bytes([bytes[index + 2], bytes[index + 3]]) as usize;
        let end = index + 2 + length;
        if length < 2 || end > bytes.len() {
            return Err("truncated JPEG segment".into());
        }
        let payload = &bytes[index + 4..end];
        let is_exif = marker == 0xE1 && payload.starts_with(EXIF_HEADER);
        if !is_exif {
            out.extend_from_slice(&bytes[index..end]);
        }
        index = end;
    }
    out.extend_from_slice(&bytes[index..]);
    Ok(out)
}

fn stamp_png(bytes: &[u8], tiff: &[u8]) -> Result<Vec<u8>, BoxError> {
    if bytes.len() < 8 || &bytes[..8] != PNG_SIGNATURE {
        return Err("not a PNG file (bad signature)".into());
    }

    let mut out = Vec::with_capacity(bytes.len() + tiff.len() + 12);
    out.extend_from_slice(PNG_SIGNATURE);

    let mut cursor = 8usize;
    let mut inserted = false;
    while cursor + 8 <= bytes.len() {
        let length = u32::from_be_bytes([
            bytes[cursor],
            bytes[cursor + 1],
            bytes[cursor + 2],
            bytes[cursor + 3],
        ]) as usize;
        let chunk_type = &bytes[cursor + 4..cursor + 8];
        let end = cursor + 8 + length + 4;
        if end > bytes.len() {
            return Err("truncated PNG chunk".into());
        }

        if chunk_type != b"eXIf" {
            out.extend_from_slice(&bytes[cursor..end]);
        }
        if chunk_type == b"IHDR" && !inserted {
            out.extend_from_slice(&exif_chunk(tiff));
            inserted = true;
        }
        cursor = end;
        if chunk_type == b"IEND" {
            break;
        }
    }

    if !inserted {
        return Err("PNG has no IHDR chunk".into());
    }
    Ok(out)
}

fn exif_chunk(tiff: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(12 + tiff.len());
    chunk.extend_from_slice(&(tiff.len() as u32).to_be_bytes());
    chunk.extend_from_slice(b"eXIf");
    chunk.extend_from_slice(tiff);

    let mut hasher = Crc32::new();
    hasher.update(b"eXIf");
    hasher.update(tiff);
    chunk.extend_from_slice(&hasher.finalize().to_be_bytes());
    chunk
}
