use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Post {
    pub title: String,
    pub date: NaiveDate,
    pub slug: String,
    pub body: String,
}

/// Metadata carried by a `YYYY-MM-DD-<slug>.md` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileName {
    pub date: NaiveDate,
    pub slug: String,
}

#[derive(Error, Debug)]
pub(crate) enum FileNameError {
    #[error("invalid filename format: {0}")]
    Format(String),

    #[error("invalid date in filename {name}")]
    Date {
        name: String,
        #[source]
        source: Option<chrono::ParseError>,
    },
}

pub(crate) fn is_markdown(path: &Path) -> bool {
    path.file_name()
        .map_or(false, |name| name.to_string_lossy().ends_with(".md"))
}

pub(crate) fn parse_file_name(name: &str) -> Result<FileName, FileNameError> {
    let parts: Vec<&str> = name.splitn(4, '-').collect();
    if parts.len() < 4 {
        return Err(FileNameError::Format(name.to_string()));
    }

    let date_str = parts[..3].join("-");
    // chrono accepts single-digit and space-padded fields, the file name does not
    let well_formed = date_str.len() == 10
        && date_str.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(FileNameError::Date {
            name: name.to_string(),
            source: None,
        });
    }
    let date =
        NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| FileNameError::Date {
            name: name.to_string(),
            source: Some(e),
        })?;

    let slug = parts[3].strip_suffix(".md").unwrap_or(parts[3]).to_string();

    Ok(FileName { date, slug })
}
