use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{PondError, Result};
use crate::transfer::AdapterEvent;
use crate::util::varint::{read_uvarint, write_uvarint, MAX_VARINT_LEN};

const MAGIC: &[u8; 8] = b"PONDLOG\0";
const VERSION: u8 = 1;
const HEADER_LEN: u64 = MAGIC.len() as u64 + 1;

/// Append-only log of adapter events, one length-delimited CBOR record each.
///
/// Ids are handed out deterministically, so replaying the log into a
/// coordinator built from the same options reproduces the session.
pub struct EventLog {
    f: File,
    path: PathBuf,
}

impl EventLog {
    /// Starts a fresh log, truncating whatever was at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        f.write_all(MAGIC)?;
        f.write_all(&[VERSION])?;
        f.flush()?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
        })
    }

    /// Opens an existing log for appending, or creates one.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Self::create(path);
        }
        let mut f = OpenOptions::new().read(true).write(true).open(path)?;
        check_header(&mut f, path)?;
        f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, event: &AdapterEvent) -> Result<()> {
        let mut plain = Vec::with_capacity(64);
        ciborium::ser::into_writer(event, &mut plain)
            .map_err(|e| PondError::Format(format!("event encode: {e}")))?;
        let mut lenv = Vec::with_capacity(MAX_VARINT_LEN);
        write_uvarint(&mut lenv, plain.len() as u64)?;
        self.f.seek(SeekFrom::End(0))?;
        self.f.write_all(&lenv)?;
        self.f.write_all(&plain)?;
        self.f.flush()?;
        Ok(())
    }

    /// Every complete record from the start; a torn tail is dropped.
    pub fn read_all(path: &Path) -> Result<Vec<AdapterEvent>> {
        let mut f = File::open(path)?;
        check_header(&mut f, path)?;
        let mut r = BufReader::new(f);
        let mut out = Vec::new();
        while let Some(event) = read_next(&mut r)? {
            out.push(event);
        }
        Ok(out)
    }
}

fn check_header(f: &mut File, path: &Path) -> Result<()> {
    let mut header = [0u8; HEADER_LEN as usize];
    f.seek(SeekFrom::Start(0))?;
    if let Err(e) = f.read_exact(&mut header) {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(PondError::Format(format!(
                "{}: too short for an event log",
                path.display()
            )));
        }
        return Err(e.into());
    }
    if &header[..MAGIC.len()] != MAGIC {
        return Err(PondError::Format(format!(
            "{}: not an event log",
            path.display()
        )));
    }
    if header[MAGIC.len()] != VERSION {
        return Err(PondError::Format(format!(
            "{}: unsupported log version {}",
            path.display(),
            header[MAGIC.len()]
        )));
    }
    Ok(())
}

fn read_next<R: Read>(r: &mut R) -> Result<Option<AdapterEvent>> {
    let len = match read_uvarint(r) {
        Ok(Some(n)) => n,
        Ok(None) => return Ok(None),
        Err(PondError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    // The prefix is untrusted; the buffer only grows as bytes actually arrive.
    let mut buf = Vec::new();
    r.take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        tracing::warn!(len, got = buf.len(), "torn record at end of event log ignored");
        return Ok(None);
    }
    let event = ciborium::de::from_reader(buf.as_slice())
        .map_err(|e| PondError::Format(format!("event decode: {e}")))?;
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FileId, SourceHandle};

    fn sample() -> Vec<AdapterEvent> {
        vec![
            AdapterEvent::Added {
                source: SourceHandle::new("a.png", None, vec![1u8, 2, 3]),
            },
            AdapterEvent::ChunkProgress {
                id: FileId(1),
                index: 0,
            },
            AdapterEvent::Failed {
                id: FileId(1),
                reason: "timeout".into(),
            },
        ]
    }

    #[test]
    fn appends_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.pondlog");
        let events = sample();
        {
            let mut log = EventLog::create(&path).unwrap();
            log.append(&events[0]).unwrap();
        }
        {
            let mut log = EventLog::open(&path).unwrap();
            log.append(&events[1]).unwrap();
            log.append(&events[2]).unwrap();
        }
        let back = EventLog::read_all(&path).unwrap();
        assert_eq!(back.len(), 3);
        match &back[0] {
            AdapterEvent::Added { source } => {
                assert_eq!(source.name, "a.png");
                assert_eq!(source.mime, "image/png");
                assert_eq!(source.bytes(), &[1u8, 2, 3]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&back[2], AdapterEvent::Failed { reason, .. } if reason == "timeout"));
    }

    #[test]
    fn torn_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.pondlog");
        {
            let mut log = EventLog::create(&path).unwrap();
            for e in sample() {
                log.append(&e).unwrap();
            }
        }
        let len = std::fs::metadata(&path).unwrap().len();
        let f = OpenOptions::new().write(true).open(&path).unwrap();
        f.set_len(len - 2).unwrap();
        assert_eq!(EventLog::read_all(&path).unwrap().len(), 2);
    }

    #[test]
    fn oversized_length_prefix_reads_as_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.pondlog");
        {
            let mut log = EventLog::create(&path).unwrap();
            log.append(&sample()[1]).unwrap();
        }
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        write_uvarint(&mut f, u64::MAX / 2).unwrap();
        f.write_all(&[1, 2, 3, 4]).unwrap();
        drop(f);

        let back = EventLog::read_all(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert!(matches!(back[0], AdapterEvent::ChunkProgress { index: 0, .. }));
    }

    #[test]
    fn foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-log");
        std::fs::write(&path, b"hello world").unwrap();
        assert!(matches!(
            EventLog::read_all(&path),
            Err(PondError::Format(_))
        ));
        assert!(matches!(EventLog::open(&path), Err(PondError::Format(_))));
    }
}
