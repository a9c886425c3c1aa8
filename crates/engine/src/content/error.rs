use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::hash::parse_hash_or_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    MissingAttribute,
    InvalidValue,
    DuplicateId,
    UnknownReference,
}

/// Load-time authoring error, naming the offending id and position.
#[derive(Debug, Clone)]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentError {}

pub(crate) fn read_error(path: &Path, source: std::io::Error) -> ContentError {
    ContentError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    }
}

pub(crate) fn parse_document<'input>(
    file_path: &Path,
    raw: &'input str,
) -> Result<Document<'input>, ContentError> {
    Document::parse(raw).map_err(|error| ContentError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

pub(crate) fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentError {
    let pos = doc.text_pos_at(node.range().start);
    ContentError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

/// Attribute readers sharing one file/document context.
pub(crate) struct XmlContext<'a, 'input> {
    pub file_path: &'a Path,
    pub doc: &'a Document<'input>,
}

impl<'a, 'input> XmlContext<'a, 'input> {
    pub fn error(&self, code: ContentErrorCode, message: String, node: Node<'_, '_>) -> ContentError {
        error_at_node(code, message, self.file_path, self.doc, node)
    }

    pub fn required_attr<'n>(&self, node: Node<'n, '_>, name: &str) -> Result<&'n str, ContentError> {
        node.attribute(name).ok_or_else(|| {
            self.error(
                ContentErrorCode::MissingAttribute,
                format!(
                    "missing required attribute '{}' on <{}>",
                    name,
                    node.tag_name().name()
                ),
                node,
            )
        })
    }

    pub fn hash_attr(&self, node: Node<'_, '_>, name: &str) -> Result<u32, ContentError> {
        let raw = self.required_attr(node, name)?;
        parse_hash_or_name(raw).ok_or_else(|| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("attribute '{}' value '{}' is not an id", name, raw),
                node,
            )
        })
    }

    pub fn optional_hash_attr(&self, node: Node<'_, '_>, name: &str) -> Result<Option<u32>, ContentError> {
        match node.attribute(name) {
            Some(_) => self.hash_attr(node, name).map(Some),
            None => Ok(None),
        }
    }

    pub fn i32_attr(&self, node: Node<'_, '_>, name: &str) -> Result<i32, ContentError> {
        let raw = self.required_attr(node, name)?;
        raw.trim().parse::<i32>().map_err(|_| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("attribute '{}' value '{}' is not an integer", name, raw),
                node,
            )
        })
    }

    pub fn optional_i32_attr(&self, node: Node<'_, '_>, name: &str) -> Result<Option<i32>, ContentError> {
        match node.attribute(name) {
            Some(_) => self.i32_attr(node, name).map(Some),
            None => Ok(None),
        }
    }
}
