use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use thiserror::Error;

use crate::snapshot::models::Snapshot;

pub const DATA_DIR: &str = "data";

/// `data/<user>/<repo>.json` under the tracking repository root.
pub fn snapshot_path(root: &Path, user: &str, repo: &str) -> PathBuf {
    root.join(DATA_DIR).join(user).join(format!("{repo}.json"))
}

#[derive(Debug, Error)]
pub enum LoadSnapshotError {
    #[error("ReadFile {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Deserialize {path}: {source}")]
    Deserialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reads a snapshot, or an empty one when the repository was never recorded.
pub async fn load_snapshot(path: &Path) -> Result<Snapshot, LoadSnapshotError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Snapshot::default()),
        Err(source) => {
            return Err(LoadSnapshotError::ReadFile {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&raw).map_err(|source| LoadSnapshotError::Deserialize {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum SaveSnapshotError {
    #[error("Serialize: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },

    #[error("CreateDir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("WriteFile {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Pretty printing with every character outside printable ASCII written as
/// lowercase `\uXXXX` escapes, astral characters as surrogate pairs.
struct AsciiFormatter<'a>(PrettyFormatter<'a>);

impl Formatter for AsciiFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..index].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// One-space indentation, sorted keys, ASCII-only, no trailing newline: the
/// layout of the files already in the tracking repository. Together with
/// `Timestamp` keeping its stored text, an unchanged snapshot renders back to
/// the bytes it was read from.
pub fn render_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = AsciiFormatter(PrettyFormatter::with_indent(b" "));
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    snapshot.serialize(&mut serializer)?;
    Ok(buf)
}

pub async fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), SaveSnapshotError> {
    let rendered = render_snapshot(snapshot)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SaveSnapshotError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, rendered)
        .await
        .map_err(|source| SaveSnapshotError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
}
