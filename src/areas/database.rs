//! Loose object database
//!
//! Objects live at `objects/<first 2 hex>/<remaining 38 hex>`, zlib-compressed.
//! Writes go through a temporary file that is synced and then renamed into
//! place, so a stored object is either complete or absent. Reads check the
//! header length and re-hash the content against the requested id.

use crate::artifacts::objects::object::{AnyObject, Object, TypedObject};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::OBJECT_ID_HEX_LENGTH;
use crate::errors::{ErrorKind, Result, ResultExt};
use bytes::{BufMut, Bytes, BytesMut};
use fake::rand;
use std::cell::Cell;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    /// Shared with every store opened alongside this database
    closed: Rc<Cell<bool>>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database {
            path,
            closed: Rc::new(Cell::new(false)),
        }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Refuse every further operation on this database
    pub fn close(&self) {
        if !self.closed.replace(true) {
            debug!(path = %self.path.display(), "closed object database");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub(crate) fn closed_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.closed)
    }

    pub(crate) fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.closed.get() {
            return Err(ErrorKind::UseAfterClose.during(operation));
        }
        Ok(())
    }

    pub fn exists(&self, object_id: &ObjectId) -> Result<bool> {
        self.ensure_open("Database.exists")?;
        Ok(self.path.join(object_id.to_path()).is_file())
    }

    /// Load and decode any object
    pub fn read(&self, object_id: &ObjectId) -> Result<AnyObject> {
        const OPERATION: &str = "Database.read";
        self.ensure_open(OPERATION)?;

        let object_content = self.load(object_id, OPERATION)?;
        let object = AnyObject::decode(&object_content).map_err(|e| {
            ErrorKind::corrupt(format!("{object_id}: {}", e.kind())).during(OPERATION)
        })?;
        if object.id() != Some(object_id) {
            return Err(ErrorKind::corrupt(format!("{object_id}: content hash mismatch"))
                .during(OPERATION));
        }

        trace!(id = %object_id, kind = %object.kind(), "read object");
        Ok(object)
    }

    /// Load an object that must be of kind `T`
    pub fn lookup<T: TypedObject>(&self, object_id: &ObjectId) -> Result<T> {
        self.read(object_id)?.into_typed::<T>()
    }

    /// Load an object, optionally checking its kind
    pub fn lookup_kind(
        &self,
        object_id: &ObjectId,
        expected: Option<ObjectKind>,
    ) -> Result<AnyObject> {
        let object = self.read(object_id)?;
        match expected {
            Some(kind) if kind != object.kind() => Err(object.mismatch(kind)),
            _ => Ok(object),
        }
    }

    /// Kind and body of an object, verified but not decoded
    pub fn read_raw(&self, object_id: &ObjectId) -> Result<(ObjectKind, Bytes)> {
        const OPERATION: &str = "Database.read_raw";
        self.ensure_open(OPERATION)?;

        let object_content = self.load(object_id, OPERATION)?;
        if ObjectId::hash(&object_content) != *object_id {
            return Err(ErrorKind::corrupt(format!("{object_id}: content hash mismatch"))
                .during(OPERATION));
        }

        let mut reader = Cursor::new(&object_content[..]);
        let (kind, size) = ObjectKind::parse_header(&mut reader)?;
        let body = object_content.slice(reader.position() as usize..);
        if body.len() != size {
            return Err(ErrorKind::corrupt(format!(
                "{object_id}: header announces {size} bytes, body has {}",
                body.len()
            ))
            .during(OPERATION));
        }

        Ok((kind, body))
    }

    /// Kind and size from the header alone, without inflating the body
    pub fn read_header(&self, object_id: &ObjectId) -> Result<(ObjectKind, usize)> {
        const OPERATION: &str = "Database.read_header";
        self.ensure_open(OPERATION)?;

        let file = std::fs::File::open(self.path.join(object_id.to_path()))
            .map_err(|e| Self::open_error(e, object_id, OPERATION))?;
        let mut reader = BufReader::new(flate2::read::ZlibDecoder::new(file));

        ObjectKind::parse_header(&mut reader)
    }

    /// Store an object, returning its id
    ///
    /// Writing an object that is already present is a no-op.
    pub fn write(&self, object: &impl Object) -> Result<ObjectId> {
        const OPERATION: &str = "Database.write";
        self.ensure_open(OPERATION)?;

        let object_content = object.serialize()?;
        self.store(object.kind(), object_content, OPERATION)
    }

    /// Store a body of the given kind without decoding it first
    pub fn write_raw(&self, kind: ObjectKind, body: &[u8]) -> Result<ObjectId> {
        const OPERATION: &str = "Database.write_raw";
        self.ensure_open(OPERATION)?;

        let header = kind.header(body.len());
        let mut object_content = BytesMut::with_capacity(header.len() + body.len());
        object_content.put_slice(header.as_bytes());
        object_content.put_slice(body);

        self.store(kind, object_content.freeze(), OPERATION)
    }

    /// Number of loose objects on disk
    pub fn object_count(&self) -> Result<usize> {
        const OPERATION: &str = "Database.object_count";
        self.ensure_open(OPERATION)?;

        if !self.path.is_dir() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in walkdir::WalkDir::new(&self.path).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| {
                ErrorKind::Io(std::io::Error::other(e.to_string())).during(OPERATION)
            })?;
            if entry.file_type().is_file() && Self::is_object_path(entry.path()) {
                count += 1;
            }
        }

        Ok(count)
    }

    /// Find all objects whose id starts with the given hex prefix
    ///
    /// More than one match means the prefix is ambiguous.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        const OPERATION: &str = "Database.find_by_prefix";
        self.ensure_open(OPERATION)?;

        if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(Vec::new());
        }
        let prefix = prefix.to_ascii_lowercase();
        let directories: Vec<String> = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{i:02x}")).collect()
        };

        let mut matches = Vec::new();
        for dir_name in directories {
            let dir_path = self.path.join(&dir_name);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&dir_path).during(OPERATION)? {
                let file_name = entry.during(OPERATION)?.file_name();
                let full_oid = format!("{dir_name}{}", file_name.to_string_lossy());
                if full_oid.starts_with(&prefix)
                    && let Ok(oid) = ObjectId::from_hex(&full_oid)
                {
                    matches.push(oid);
                }
            }
        }

        matches.sort();
        Ok(matches)
    }

    fn is_object_path(path: &Path) -> bool {
        let is_hex = |s: &str| s.bytes().all(|b| b.is_ascii_hexdigit());
        let dir_name = path
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str());
        let file_name = path.file_name().and_then(|name| name.to_str());

        match (dir_name, file_name) {
            (Some(dir), Some(file)) => {
                dir.len() == 2
                    && file.len() == OBJECT_ID_HEX_LENGTH - 2
                    && is_hex(dir)
                    && is_hex(file)
            }
            _ => false,
        }
    }

    fn open_error(
        error: std::io::Error,
        object_id: &ObjectId,
        operation: &'static str,
    ) -> crate::errors::Error {
        match error.kind() {
            std::io::ErrorKind::NotFound => {
                ErrorKind::ObjectNotFound { id: *object_id }.during(operation)
            }
            _ => ErrorKind::Io(error).during(operation),
        }
    }

    /// Inflated canonical bytes of an object
    fn load(&self, object_id: &ObjectId, operation: &'static str) -> Result<Bytes> {
        let object_path = self.path.join(object_id.to_path());
        let compressed = std::fs::read(&object_path)
            .map_err(|e| Self::open_error(e, object_id, operation))?;

        Self::decompress(&compressed).map_err(|e| {
            ErrorKind::corrupt(format!("{object_id}: unable to inflate object: {e}"))
                .during(operation)
        })
    }

    fn store(
        &self,
        kind: ObjectKind,
        object_content: Bytes,
        operation: &'static str,
    ) -> Result<ObjectId> {
        let object_id = ObjectId::hash(&object_content);
        let object_path = self.path.join(object_id.to_path());

        if object_path.exists() {
            trace!(id = %object_id, %kind, "object already stored");
            return Ok(object_id);
        }

        let object_dir = object_path.parent().ok_or_else(|| {
            ErrorKind::Io(std::io::Error::other("invalid object path")).during(operation)
        })?;
        std::fs::create_dir_all(object_dir).during(operation)?;
        self.write_object(object_dir, &object_path, &object_content)
            .during(operation)?;

        debug!(id = %object_id, %kind, size = object_content.len(), "stored object");
        Ok(object_id)
    }

    fn write_object(
        &self,
        object_dir: &Path,
        object_path: &Path,
        object_content: &[u8],
    ) -> std::io::Result<()> {
        let temp_object_path = object_dir.join(Self::generate_temp_name());
        let object_content = Self::compress(object_content)?;

        let result = (|| {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_object_path)?;
            file.write_all(&object_content)?;
            file.sync_all()?;

            // rename the temp file to the object file to make it atomic
            std::fs::rename(&temp_object_path, object_path)
        })();

        if result.is_err() {
            let _ = std::fs::remove_file(&temp_object_path);
        }
        result
    }

    fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(data: &[u8]) -> std::io::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }
}
