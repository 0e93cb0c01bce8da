//! Author, committer and tagger identities
//!
//! A [`Signature`] is an owned value copied out of decoded objects. Setters on
//! commits and tags take a [`SignatureRef`], a borrowed view over
//! caller-owned strings, and copy it on the spot.
//!
//! ## Format
//!
//! `<name> <<email>> <seconds> <+hhmm>`
//!
//! Names and emails may not contain `<`, `>` or a newline, a name may not end
//! in a space, and offsets stay below 100 hours. Anything else is refused
//! when a commit or tag is encoded.

use crate::errors::{ErrorKind, Result};
use derive_new::new;

/// Largest offset, in minutes, that fits in `+hhmm`
const MAX_OFFSET_MINUTES: u32 = 99 * 60 + 59;

fn unencodable(
    operation: &'static str,
    field: &'static str,
    value: String,
) -> crate::errors::Error {
    ErrorKind::UnencodableField { field, value }.during(operation)
}

/// A point in time with the UTC offset it was recorded in.
///
/// Sub-second precision is not representable; it is truncated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, new)]
pub struct Time {
    /// Seconds since the Unix epoch
    seconds: i64,
    /// Offset from UTC in minutes
    offset_minutes: i32,
}

impl Time {
    /// Current local time, truncated to seconds
    pub fn now() -> Self {
        Self::from_datetime(chrono::Local::now().fixed_offset())
    }

    pub fn from_datetime(datetime: chrono::DateTime<chrono::FixedOffset>) -> Self {
        Time {
            seconds: datetime.timestamp(),
            offset_minutes: datetime.offset().local_minus_utc() / 60,
        }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        let offset = chrono::FixedOffset::east_opt(self.offset_minutes * 60)?;
        chrono::DateTime::from_timestamp(self.seconds, 0).map(|utc| utc.with_timezone(&offset))
    }

    /// Offset in git's `+hhmm` form
    pub fn format_offset(&self) -> String {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let minutes = self.offset_minutes.unsigned_abs();
        format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
    }

    pub(crate) fn ensure_encodable(&self, operation: &'static str) -> Result<()> {
        if self.offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
            return Err(unencodable(
                operation,
                "UTC offset",
                self.offset_minutes.to_string(),
            ));
        }
        Ok(())
    }

    fn parse_offset(offset: &str) -> Option<i32> {
        let (sign, digits) = match offset.as_bytes().first()? {
            b'+' => (1, &offset[1..]),
            b'-' => (-1, &offset[1..]),
            _ => return None,
        };
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let hours: i32 = digits[..2].parse().ok()?;
        let minutes: i32 = digits[2..].parse().ok()?;
        if minutes >= 60 {
            return None;
        }
        Some(sign * (hours * 60 + minutes))
    }

    /// Parse git's raw `<seconds> <+hhmm>` form
    pub fn parse_raw(raw: &str) -> Option<Self> {
        let (seconds, offset) = raw.trim().split_once(' ')?;
        Some(Time {
            seconds: seconds.parse().ok()?,
            offset_minutes: Self::parse_offset(offset)?,
        })
    }

    /// Human-readable form like "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable(&self) -> String {
        match self.to_datetime() {
            Some(datetime) => datetime.format("%a %b %-d %H:%M:%S %Y %z").to_string(),
            None => format!("{} {}", self.seconds, self.format_offset()),
        }
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.seconds, self.format_offset())
    }
}

/// Which identity to read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Author,
    Committer,
}

impl Role {
    fn env_prefix(&self) -> &'static str {
        match self {
            Role::Author => "GIT_AUTHOR",
            Role::Committer => "GIT_COMMITTER",
        }
    }
}

/// An owned identity with a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new)]
pub struct Signature {
    name: String,
    email: String,
    time: Time,
}

impl Signature {
    /// Load an identity from `GIT_{AUTHOR,COMMITTER}_{NAME,EMAIL,DATE}`
    ///
    /// The date may be RFC 2822, `%Y-%m-%d %H:%M:%S %z`, or git's raw
    /// `<seconds> <+hhmm>`. Without a date the current time is used.
    pub fn from_env(role: Role) -> Result<Self> {
        let prefix = role.env_prefix();
        let read = |suffix: &str| {
            let key = format!("{prefix}_{suffix}");
            std::env::var(&key).map_err(|_| {
                ErrorKind::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{key} not set"),
                ))
                .during("Signature.from_env")
            })
        };

        let name = read("NAME")?;
        let email = read("EMAIL")?;
        let time = read("DATE")
            .ok()
            .and_then(|date| {
                chrono::DateTime::parse_from_rfc2822(&date)
                    .or_else(|_| chrono::DateTime::parse_from_str(&date, "%Y-%m-%d %H:%M:%S %z"))
                    .map(Time::from_datetime)
                    .ok()
                    .or_else(|| Time::parse_raw(&date))
            })
            .unwrap_or_else(Time::now);

        Ok(Signature { name, email, time })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn as_view(&self) -> SignatureRef<'_> {
        SignatureRef {
            name: &self.name,
            email: &self.email,
            time: self.time,
        }
    }

    /// "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Canonical encoded form used in commit and tag headers
    pub fn encode(&self) -> String {
        self.as_view().encode()
    }

    pub(crate) fn ensure_encodable(&self, operation: &'static str) -> Result<()> {
        self.as_view().ensure_encodable(operation)
    }
}

impl TryFrom<&str> for Signature {
    type Error = crate::errors::Error;

    fn try_from(value: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            ErrorKind::corrupt(format!("invalid signature '{value}': {reason}"))
                .during("Signature.parse")
        };

        // Format: "name <email> timestamp timezone"
        // The email is located from the right since names may contain '<'
        let email_end = value.rfind('>').ok_or_else(|| invalid("missing '>'"))?;
        let email_start = value[..email_end]
            .rfind('<')
            .ok_or_else(|| invalid("missing '<'"))?;

        let name = value[..email_start].trim_end_matches(' ').to_string();
        let email = value[email_start + 1..email_end].to_string();
        let time = value[email_end + 1..]
            .strip_prefix(' ')
            .and_then(Time::parse_raw)
            .ok_or_else(|| invalid("invalid timestamp"))?;

        Ok(Signature { name, email, time })
    }
}

/// A signature borrowing caller-owned strings, valid for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct SignatureRef<'a> {
    name: &'a str,
    email: &'a str,
    time: Time,
}

impl SignatureRef<'_> {
    pub fn to_signature(&self) -> Signature {
        Signature {
            name: self.name.to_string(),
            email: self.email.to_string(),
            time: self.time,
        }
    }

    pub fn encode(&self) -> String {
        format!("{} <{}> {}", self.name, self.email, self.time)
    }

    /// Fail unless [`Self::encode`] parses back to this identity
    pub(crate) fn ensure_encodable(&self, operation: &'static str) -> Result<()> {
        const FORBIDDEN: [char; 3] = ['<', '>', '\n'];

        if self.name.contains(FORBIDDEN) || self.name.ends_with(' ') {
            return Err(unencodable(operation, "signature name", self.name.to_string()));
        }
        if self.email.contains(FORBIDDEN) {
            return Err(unencodable(operation, "signature email", self.email.to_string()));
        }
        self.time.ensure_encodable(operation)
    }
}

impl<'a> From<&'a Signature> for SignatureRef<'a> {
    fn from(signature: &'a Signature) -> Self {
        signature.as_view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("A U Thor <author@example.com> 1112911993 -0700", -420)]
    #[case("A U Thor <author@example.com> 1112911993 +0530", 330)]
    #[case("A U Thor <author@example.com> 1112911993 +0000", 0)]
    fn parse_and_encode_round_trip(#[case] raw: &str, #[case] offset: i32) {
        let signature = Signature::try_from(raw).unwrap();

        assert_eq!(signature.name(), "A U Thor");
        assert_eq!(signature.email(), "author@example.com");
        assert_eq!(signature.time().seconds(), 1112911993);
        assert_eq!(signature.time().offset_minutes(), offset);
        assert_eq!(signature.encode(), raw);
    }

    #[test]
    fn empty_name_is_allowed() {
        let signature = Signature::try_from(" <nobody@example.com> 0 +0000").unwrap();

        assert_eq!(signature.name(), "");
        assert_eq!(signature.encode(), " <nobody@example.com> 0 +0000");
    }

    #[rstest]
    #[case("no email 1 +0000")]
    #[case("Name <email> notanumber +0000")]
    #[case("Name <email> 1 0000")]
    #[case("Name <email>")]
    fn parse_rejects_malformed(#[case] raw: &str) {
        assert!(Signature::try_from(raw).is_err());
    }

    #[rstest]
    #[case("Eve\nparent 0000", "eve@example.com", 0)]
    #[case("Eve <x>", "eve@example.com", 0)]
    #[case("Eve ", "eve@example.com", 0)]
    #[case("Eve", "eve>@example.com", 0)]
    #[case("Eve", "eve@example.com", 6000)]
    #[case("Eve", "eve@example.com", -6000)]
    fn unencodable_identities_are_refused(
        #[case] name: &str,
        #[case] email: &str,
        #[case] offset: i32,
    ) {
        let view = SignatureRef::new(name, email, Time::new(1, offset));

        let err = view.ensure_encodable("Commit.encode").unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::UnencodableField { .. }));
        assert_eq!(err.operation(), "Commit.encode");
    }

    #[test]
    fn widest_offsets_still_encode() {
        let east = SignatureRef::new("A", "a@x", Time::new(1, 5999));
        let west = SignatureRef::new("A", "a@x", Time::new(1, i32::MIN));

        east.ensure_encodable("Commit.encode").unwrap();
        assert_eq!(east.encode(), "A <a@x> 1 +9959");
        assert!(west.ensure_encodable("Commit.encode").is_err());
    }

    #[test]
    fn offset_minutes_past_sixty_are_malformed() {
        assert!(Signature::try_from("A <a@x> 1 +0199").is_err());
    }

    #[test]
    fn datetime_conversion_truncates_subseconds() {
        let datetime = chrono::DateTime::parse_from_rfc3339("2024-01-01T12:00:00.987+02:00").unwrap();
        let time = Time::from_datetime(datetime);

        assert_eq!(time.seconds(), 1704103200);
        assert_eq!(time.offset_minutes(), 120);
        assert_eq!(time.to_string(), "1704103200 +0200");
    }

    #[test]
    fn borrowed_view_copies_into_owned() {
        let name = String::from("Grace");
        let email = String::from("grace@example.com");
        let view = SignatureRef::new(&name, &email, Time::new(10, -60));

        let owned = view.to_signature();
        drop(name);

        assert_eq!(owned.name(), "Grace");
        assert_eq!(owned.encode(), "Grace <grace@example.com> 10 -0100");
    }
}
