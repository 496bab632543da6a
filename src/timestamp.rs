//! Parsing of timestamps supplied by clients.

use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use crate::Error;

/// Parse a client-supplied timestamp.
///
/// Accepts full RFC 3339 strings and bare `YYYY-MM-DD` dates, which are
/// taken as midnight UTC. Everything else is an [Error::InvalidDate].
pub fn parse_timestamp(text: &str) -> Result<OffsetDateTime, Error> {
    if let Ok(timestamp) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(timestamp.to_offset(time::UtcOffset::UTC));
    }

    let date_only = format_description!("[year]-[month]-[day]");
    let date = Date::parse(text, &date_only).map_err(|_| Error::InvalidDate)?;

    Ok(date.midnight().assume_utc())
}
