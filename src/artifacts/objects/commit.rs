//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (zero for a root commit, several for a merge)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! <extra headers, e.g. gpgsig>
//!
//! <commit message>
//! ```

use crate::areas::database::Database;
use crate::artifacts::objects::object::{AnyObject, Object, Packable, TypedObject, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::signature::{Signature, SignatureRef, Time};
use crate::artifacts::objects::tree::Tree;
use crate::errors::{ErrorKind, Result};
use bytes::Bytes;

/// Git commit object
#[derive(Debug, Clone)]
pub struct Commit {
    /// Tree object ID representing the directory snapshot
    tree_oid: ObjectId,
    /// Parent commit IDs (empty for initial commit, multiple for merge commits)
    parents: Vec<ObjectId>,
    author: Signature,
    committer: Signature,
    /// Headers git itself doesn't interpret here (`gpgsig`, `encoding`, ...),
    /// kept verbatim so re-encoding is byte-identical
    extra_headers: Vec<(String, String)>,
    message: String,
    id: Option<ObjectId>,
}

impl Commit {
    pub fn new(
        tree_oid: ObjectId,
        author: Signature,
        committer: Signature,
        message: impl Into<String>,
    ) -> Self {
        Commit {
            tree_oid,
            parents: Vec::new(),
            author,
            committer,
            extra_headers: Vec::new(),
            message: message.into(),
            id: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// First line of the commit message
    ///
    /// Useful for short-form display (e.g., `git log --oneline`)
    pub fn message_short(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub fn author(&self) -> &Signature {
        &self.author
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    /// Commit time, taken from the committer
    pub fn time(&self) -> Time {
        self.committer.time()
    }

    pub fn tree_id(&self) -> &ObjectId {
        &self.tree_oid
    }

    /// Load the snapshot tree
    pub fn tree(&self, database: &Database) -> Result<Tree> {
        database.lookup::<Tree>(&self.tree_oid)
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    pub fn parent_ids(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn parent_id(&self, index: usize) -> Result<&ObjectId> {
        self.parents.get(index).ok_or_else(|| {
            ErrorKind::OutOfRange {
                index,
                len: self.parents.len(),
            }
            .during("Commit.parent_at")
        })
    }

    /// Load the parent at `index`
    pub fn parent_at(&self, index: usize, database: &Database) -> Result<Commit> {
        let parent_id = self.parent_id(index)?;
        database.lookup::<Commit>(parent_id)
    }

    pub fn extra_headers(&self) -> &[(String, String)] {
        &self.extra_headers
    }

    /// Append a parent; the parent must already be stored
    pub fn add_parent(&mut self, parent: &Commit) -> Result<()> {
        let parent_id = parent.require_id("Commit.add_parent")?;
        self.add_parent_id(parent_id);
        Ok(())
    }

    pub fn add_parent_id(&mut self, parent_id: ObjectId) {
        self.parents.push(parent_id);
        self.id = None;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.id = None;
    }

    pub fn set_author(&mut self, author: SignatureRef<'_>) {
        self.author = author.to_signature();
        self.id = None;
    }

    pub fn set_committer(&mut self, committer: SignatureRef<'_>) {
        self.committer = committer.to_signature();
        self.id = None;
    }

    /// Point the commit at a tree; the tree must already be stored
    pub fn set_tree(&mut self, tree: &Tree) -> Result<()> {
        let tree_id = tree.require_id("Commit.set_tree")?;
        self.set_tree_id(tree_id);
        Ok(())
    }

    pub fn set_tree_id(&mut self, tree_id: ObjectId) {
        self.tree_oid = tree_id;
        self.id = None;
    }

    pub fn write(&mut self, database: &Database) -> Result<ObjectId> {
        let id = database.write(&*self)?;
        self.id = Some(id);
        Ok(id)
    }

    pub(crate) fn assign_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.tree_oid == other.tree_oid
            && self.parents == other.parents
            && self.author == other.author
            && self.committer == other.committer
            && self.extra_headers == other.extra_headers
            && self.message == other.message
    }
}

impl Eq for Commit {}

impl Packable for Commit {
    fn serialize_body(&self) -> Result<Bytes> {
        const OPERATION: &str = "Commit.encode";
        self.author.ensure_encodable(OPERATION)?;
        self.committer.ensure_encodable(OPERATION)?;

        let mut object_content = String::new();

        object_content.push_str(&format!("tree {}\n", self.tree_oid));
        for parent in &self.parents {
            object_content.push_str(&format!("parent {parent}\n"));
        }
        object_content.push_str(&format!("author {}\n", self.author.encode()));
        object_content.push_str(&format!("committer {}\n", self.committer.encode()));
        push_extra_headers(&mut object_content, &self.extra_headers);
        object_content.push('\n');
        object_content.push_str(&self.message);

        Ok(Bytes::from(object_content))
    }
}

impl Unpackable for Commit {
    fn deserialize(body: Bytes) -> Result<Self> {
        const OPERATION: &str = "Commit.decode";
        let corrupt = |reason: &str| ErrorKind::corrupt(reason).during(OPERATION);

        let content =
            std::str::from_utf8(&body).map_err(|_| corrupt("commit is not valid UTF-8"))?;
        let (headers, message) = split_headers(content, OPERATION)?;
        let mut headers = headers.into_iter().peekable();

        let tree_oid = match headers.next() {
            Some(("tree", value)) => ObjectId::from_hex(&value)?,
            _ => return Err(corrupt("missing tree line")),
        };

        // Parse all parent lines (there can be 0, 1, or multiple parents)
        let mut parents = Vec::new();
        while let Some(("parent", value)) = headers.peek() {
            parents.push(ObjectId::from_hex(value)?);
            headers.next();
        }

        let author = match headers.next() {
            Some(("author", value)) => Signature::try_from(value.as_str())?,
            _ => return Err(corrupt("missing author line")),
        };
        let committer = match headers.next() {
            Some(("committer", value)) => Signature::try_from(value.as_str())?,
            _ => return Err(corrupt("missing committer line")),
        };

        let extra_headers = headers
            .map(|(key, value)| match key {
                "tree" | "parent" | "author" | "committer" => {
                    Err(corrupt(&format!("misplaced {key} line")))
                }
                _ => Ok((key.to_string(), value)),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Commit {
            tree_oid,
            parents,
            author,
            committer,
            extra_headers,
            message: message.to_string(),
            id: None,
        })
    }
}

impl Object for Commit {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Commit
    }

    fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }
}

impl TypedObject for Commit {
    const KIND: ObjectKind = ObjectKind::Commit;

    fn try_from_any(object: AnyObject) -> Result<Self> {
        match object {
            AnyObject::Commit(commit) => Ok(commit),
            other => Err(other.mismatch(Self::KIND)),
        }
    }
}

/// Split a commit or tag body into `(key, value)` headers and the message
///
/// Continuation lines (starting with a space) are folded into the previous
/// header's value with the leading space removed, as git does for `gpgsig`.
pub(crate) fn split_headers<'c>(
    content: &'c str,
    operation: &'static str,
) -> Result<(Vec<(&'c str, String)>, &'c str)> {
    let (header_block, message) = match content.find("\n\n") {
        Some(position) => (&content[..position + 1], &content[position + 2..]),
        None if content.ends_with('\n') => (content, ""),
        None => {
            return Err(ErrorKind::corrupt("missing blank line after headers").during(operation));
        }
    };

    let mut headers: Vec<(&str, String)> = Vec::new();
    for line in header_block.lines() {
        if let Some(continuation) = line.strip_prefix(' ') {
            let (_, value) = headers.last_mut().ok_or_else(|| {
                ErrorKind::corrupt("continuation line without header").during(operation)
            })?;
            value.push('\n');
            value.push_str(continuation);
            continue;
        }

        let (key, value) = line.split_once(' ').ok_or_else(|| {
            ErrorKind::corrupt(format!("malformed header line '{line}'")).during(operation)
        })?;
        headers.push((key, value.to_string()));
    }

    Ok((headers, message))
}

pub(crate) fn push_extra_headers(content: &mut String, headers: &[(String, String)]) {
    for (key, value) in headers {
        content.push_str(key);
        content.push(' ');
        content.push_str(&value.replace('\n', "\n "));
        content.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn author() -> Signature {
        Signature::try_from("A U Thor <author@example.com> 1112911993 -0700").unwrap()
    }

    #[fixture]
    fn tree_id() -> ObjectId {
        ObjectId::from_hex("4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap()
    }

    #[rstest]
    fn root_commit_encodes_like_git(author: Signature, tree_id: ObjectId) {
        let commit = Commit::new(tree_id, author.clone(), author, "initial\n");

        let body = commit.serialize_body().unwrap();

        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
             author A U Thor <author@example.com> 1112911993 -0700\n\
             committer A U Thor <author@example.com> 1112911993 -0700\n\
             \n\
             initial\n"
        );
    }

    #[rstest]
    fn merge_commit_keeps_parent_order(author: Signature, tree_id: ObjectId) {
        let first = ObjectId::hash(b"first");
        let second = ObjectId::hash(b"second");
        let mut commit = Commit::new(tree_id, author.clone(), author, "merge");
        commit.add_parent_id(first);
        commit.add_parent_id(second);

        let decoded = Commit::deserialize(commit.serialize_body().unwrap()).unwrap();

        assert_eq!(decoded.parent_count(), 2);
        assert_eq!(decoded.parent_id(0).unwrap(), &first);
        assert_eq!(decoded.parent_id(1).unwrap(), &second);
        let err = decoded.parent_id(2).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OutOfRange { index: 2, len: 2 }));
    }

    #[rstest]
    fn message_short_is_first_line(author: Signature, tree_id: ObjectId) {
        let commit = Commit::new(tree_id, author.clone(), author, "subject\n\nbody text\n");

        assert_eq!(commit.message_short(), "subject");
        assert_eq!(commit.message(), "subject\n\nbody text\n");
    }

    #[rstest]
    fn add_parent_requires_stored_parent(author: Signature, tree_id: ObjectId) {
        let parent = Commit::new(tree_id, author.clone(), author.clone(), "parent");
        let mut child = Commit::new(tree_id, author.clone(), author, "child");

        let err = child.add_parent(&parent).unwrap_err();

        assert!(matches!(
            err.kind(),
            ErrorKind::UnwrittenObject {
                kind: ObjectKind::Commit
            }
        ));
        assert_eq!(child.parent_count(), 0);
    }

    #[test]
    fn signed_commit_round_trips_byte_for_byte() {
        let body = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                    author A <a@example.com> 1 +0000\n\
                    committer A <a@example.com> 1 +0000\n\
                    gpgsig -----BEGIN PGP SIGNATURE-----\n \n line\n -----END PGP SIGNATURE-----\n\
                    \n\
                    signed\n";

        let commit = Commit::deserialize(Bytes::from(body)).unwrap();

        assert_eq!(commit.extra_headers().len(), 1);
        assert_eq!(commit.extra_headers()[0].0, "gpgsig");
        assert_eq!(commit.serialize_body().unwrap(), Bytes::from(body));
    }

    #[rstest]
    #[case("author A <a@example.com> 1 +0000\n\nmissing tree")]
    #[case("tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\nno author")]
    #[case("tree nothex\nauthor A <a@example.com> 1 +0000\ncommitter A <a@example.com> 1 +0000\n\nx")]
    #[case("tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\nauthor A <a@example.com> 1 +0000")]
    fn malformed_commits_are_rejected(#[case] body: &'static str) {
        assert!(Commit::deserialize(Bytes::from(body)).is_err());
    }
}
