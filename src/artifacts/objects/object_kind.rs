use crate::errors::{ErrorKind, Result};
use std::io::BufRead;

/// The four kinds of object the database stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
        }
    }

    /// Canonical header: `<type> <byte-length>\0`
    pub fn header(&self, body_len: usize) -> String {
        format!("{} {}\0", self.as_str(), body_len)
    }

    /// Parse `<type> <size>\0` off the front of an encoded object
    ///
    /// Leaves the reader positioned at the first body byte.
    pub fn parse_header(data_reader: &mut impl BufRead) -> Result<(ObjectKind, usize)> {
        const OPERATION: &str = "Codec.decode";

        let mut object_kind = Vec::new();
        data_reader
            .read_until(b' ', &mut object_kind)
            .map_err(|e| ErrorKind::corrupt(e.to_string()).during(OPERATION))?;
        if object_kind.pop() != Some(b' ') {
            return Err(ErrorKind::corrupt("truncated object header").during(OPERATION));
        }

        let mut size = Vec::new();
        data_reader
            .read_until(b'\0', &mut size)
            .map_err(|e| ErrorKind::corrupt(e.to_string()).during(OPERATION))?;
        if size.pop() != Some(b'\0') {
            return Err(ErrorKind::corrupt("truncated object header").during(OPERATION));
        }

        let object_kind = std::str::from_utf8(&object_kind)
            .ok()
            .and_then(|kind| ObjectKind::try_from(kind).ok())
            .ok_or_else(|| {
                ErrorKind::corrupt(format!(
                    "unknown object type '{}'",
                    String::from_utf8_lossy(&object_kind)
                ))
                .during(OPERATION)
            })?;

        // git never writes leading zeros or signs in the length
        let size = std::str::from_utf8(&size)
            .ok()
            .filter(|size| !size.is_empty() && (size == &"0" || !size.starts_with('0')))
            .and_then(|size| size.parse::<usize>().ok())
            .ok_or_else(|| ErrorKind::corrupt("invalid object length").during(OPERATION))?;

        Ok((object_kind, size))
    }
}

impl TryFrom<&str> for ObjectKind {
    type Error = crate::errors::Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            "tag" => Ok(ObjectKind::Tag),
            _ => Err(ErrorKind::corrupt(format!("unknown object type '{value}'"))
                .during("ObjectKind.parse")),
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::{Cursor, Read};

    #[test]
    fn parse_header_leaves_body_unread() {
        let mut reader = Cursor::new(b"commit 11\0tree abcdef".to_vec());

        let (kind, size) = ObjectKind::parse_header(&mut reader).unwrap();
        let mut body = String::new();
        reader.read_to_string(&mut body).unwrap();

        assert_eq!(kind, ObjectKind::Commit);
        assert_eq!(size, 11);
        assert_eq!(body, "tree abcdef");
    }

    #[rstest]
    #[case(b"blob")]
    #[case(b"blob 5")]
    #[case(b"blobby 5\0hello")]
    #[case(b"blob -5\0hello")]
    #[case(b"blob 05\0hello")]
    #[case(b"blob \0hello")]
    fn parse_header_rejects_garbage(#[case] input: &[u8]) {
        let mut reader = Cursor::new(input.to_vec());
        let err = ObjectKind::parse_header(&mut reader).unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::CorruptObject { .. }));
    }
}
