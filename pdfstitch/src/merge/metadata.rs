//! Document information dictionary of the merged output.
//!
//! Producer, creator and dates are always written; title, author, subject
//! and keywords only when the caller supplied them.

use crate::config::Metadata;
use crate::error::Result;
use crate::utils::encode_text_string;
use lopdf::{Dictionary, Document, Object, StringFormat};
use std::time::{SystemTime, UNIX_EPOCH};

/// Value of `/Producer` and `/Creator`.
pub const PRODUCER: &str = "pdfstitch";

/// Writes the Info dictionary.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataManager;

impl MetadataManager {
    /// Create a new metadata manager.
    pub fn new() -> Self {
        Self
    }

    /// Replace the document information with fresh values and `metadata`.
    pub fn set_metadata(&self, doc: &mut Document, metadata: &Metadata) -> Result<()> {
        let date = Object::String(format_pdf_date(SystemTime::now()).into_bytes(), StringFormat::Literal);

        let mut info = Dictionary::new();
        info.set("Producer", encode_text_string(PRODUCER));
        info.set("Creator", encode_text_string(PRODUCER));
        info.set("CreationDate", date.clone());
        info.set("ModDate", date);

        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                info.set(key, encode_text_string(value));
            }
        }

        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);
        Ok(())
    }
}

/// Format a time as a PDF date string in UTC, `D:YYYYMMDDHHmmSSZ`.
pub fn format_pdf_date(time: SystemTime) -> String {
    let secs = time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let days = (secs / 86_400) as i64;
    let (year, month, day) = civil_from_days(days);
    let time_of_day = secs % 86_400;

    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}Z",
        year,
        month,
        day,
        time_of_day / 3_600,
        (time_of_day % 3_600) / 60,
        time_of_day % 60
    )
}

/// Gregorian date of a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
