//! Filter file format & IO
//!
//! Header (LE, 14 bytes):
//!   magic[4]      = "CCBF"
//!   version[2]    = 1
//!   hash_count[4] = K (u32)
//!   bit_count[4]  = M (i32, > 0)
//!
//! Body: M bytes, one per bit, 0x01 = set, 0x00 = clear.
//!
//! Hash seeds are 0..K and are never written.

use crate::consts::{BIT_CLEAR, BIT_SET, HDR_SIZE, MAGIC_FILTER, MAX_HASH_COUNT, VERSION};
use crate::errors::{CcbfError, Result};
use crate::filter::Bloom;
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterHeader {
    pub hash_count: u32,
    pub bit_count: u32,
}

impl FilterHeader {
    pub fn of(bloom: &Bloom) -> Self {
        Self { hash_count: bloom.hash_count(), bit_count: bloom.bit_count() }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(MAGIC_FILTER)?;
        w.write_u16::<LE>(VERSION)?;
        w.write_u32::<LE>(self.hash_count)?;
        w.write_i32::<LE>(self.bit_count as i32)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut hdr = [0u8; HDR_SIZE];
        r.read_exact(&mut hdr).map_err(|e| CcbfError::from_read(e, "header"))?;
        Self::parse(&hdr)
    }

    fn parse(hdr: &[u8; HDR_SIZE]) -> Result<Self> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&hdr[0..4]);
        let mut rest = &hdr[4..];
        let version = rest.read_u16::<LE>()?;
        if &magic != MAGIC_FILTER || version != VERSION {
            return Err(CcbfError::UnsupportedFormat { magic, version });
        }
        let hash_count = rest.read_u32::<LE>()?;
        let bit_count = rest.read_i32::<LE>()?;
        if hash_count == 0 || hash_count > MAX_HASH_COUNT {
            return Err(CcbfError::CorruptFormat(format!("hash count {hash_count} out of range 1..={MAX_HASH_COUNT}")));
        }
        if bit_count <= 0 {
            return Err(CcbfError::CorruptFormat(format!("bit count {bit_count} is not positive")));
        }
        debug!(hash_count, bit_count, "read filter header");
        Ok(Self { hash_count, bit_count: bit_count as u32 })
    }
}

fn bits_from_bytes(raw: &[u8]) -> Result<Vec<bool>> {
    raw.iter()
        .enumerate()
        .map(|(i, &b)| match b {
            BIT_SET => Ok(true),
            BIT_CLEAR => Ok(false),
            other => Err(CcbfError::CorruptFormat(format!("bit {i} has byte value {other:#04x}"))),
        })
        .collect()
}

/// Serialize `bloom` into `w`. The writer is not flushed.
pub fn write_to<W: Write>(bloom: &Bloom, w: &mut W) -> Result<()> {
    FilterHeader::of(bloom).write(w)?;
    let body: Vec<u8> = bloom.bits().iter().map(|&b| if b { BIT_SET } else { BIT_CLEAR }).collect();
    w.write_all(&body)?;
    Ok(())
}

pub fn encode(bloom: &Bloom) -> Vec<u8> {
    let mut out = Vec::with_capacity(HDR_SIZE + bloom.bit_count() as usize);
    // Vec<u8> writes are infallible
    let _ = write_to(bloom, &mut out);
    out
}

/// Read one filter from `r`, consuming exactly header + bit_count bytes.
pub fn read_from<R: Read>(r: &mut R) -> Result<Bloom> {
    let hdr = FilterHeader::read(r)?;
    let want = hdr.bit_count as usize;
    // grows with the bytes actually present, not with the declared size
    let mut raw = Vec::new();
    r.take(want as u64).read_to_end(&mut raw)?;
    if raw.len() < want {
        return Err(CcbfError::CorruptFormat(format!(
            "bit array truncated: header declares {want} bits, found {}",
            raw.len()
        )));
    }
    Bloom::from_parts(hdr.hash_count, bits_from_bytes(&raw)?)
}

/// Decode a complete filter image. Trailing bytes are rejected.
pub fn decode(bytes: &[u8]) -> Result<Bloom> {
    let mut cur = bytes;
    let bloom = read_from(&mut cur)?;
    if !cur.is_empty() {
        return Err(CcbfError::CorruptFormat(format!("{} trailing bytes after bit array", cur.len())));
    }
    Ok(bloom)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let f = std::fs::OpenOptions::new().read(true).custom_flags(libc::O_DIRECTORY).open(parent_dir(path))?;
    f.sync_all()
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> { Ok(()) }

/// Run `write` against a temp file next to `path`, then atomically publish it.
/// If `write` or the publish fails, any existing file at `path` is untouched.
pub fn publish_atomic<T, F>(path: impl AsRef<Path>, write: F) -> Result<(T, PathBuf)>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<T>,
{
    let path_final = path.as_ref().to_path_buf();
    let mut tmp = tempfile::Builder::new().prefix(".ccbf_").tempfile_in(parent_dir(&path_final))?;
    let out = {
        let mut w = BufWriter::new(tmp.as_file_mut());
        let out = write(&mut w)?;
        w.flush()?;
        out
    };
    tmp.as_file().sync_all()?;
    tmp.persist(&path_final)?;
    let _ = fsync_dir(&path_final);
    Ok((out, path_final))
}

pub fn save_atomic(bloom: &Bloom, path: impl AsRef<Path>) -> Result<PathBuf> {
    let ((), path_final) = publish_atomic(path, |w| write_to(bloom, w))?;
    info!(path = %path_final.display(), hash_count = bloom.hash_count(), bit_count = bloom.bit_count(), "wrote filter");
    Ok(path_final)
}

/// Map `path` read-only and decode it.
pub fn open(path: impl AsRef<Path>) -> Result<Bloom> {
    let path = path.as_ref();
    let f = File::open(path)?;
    let len = f.metadata()?.len();
    if len < HDR_SIZE as u64 {
        return Err(CcbfError::CorruptFormat(format!("file is {len} bytes, shorter than the header")));
    }
    let mmap = unsafe { Mmap::map(&f)? };
    let bloom = decode(&mmap)?;
    info!(path = %path.display(), hash_count = bloom.hash_count(), bit_count = bloom.bit_count(), "loaded filter");
    Ok(bloom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn three_words() -> Bloom {
        let mut b = Bloom::with_rate(3, 0.15).unwrap();
        for w in ["cat", "dog", "bird"] {
            b.insert(w.as_bytes());
        }
        b
    }

    #[test]
    fn golden_bytes() {
        let bytes = encode(&three_words());
        let mut want = b"CCBF".to_vec();
        want.extend_from_slice(&[1, 0]);
        want.extend_from_slice(&[3, 0, 0, 0]);
        want.extend_from_slice(&[12, 0, 0, 0]);
        want.extend_from_slice(&[0, 0, 1, 1, 0, 1, 1, 1, 1, 0, 0, 1]);
        assert_eq!(bytes, want);
    }

    #[test]
    fn decode_roundtrip() {
        let b = three_words();
        let back = decode(&encode(&b)).unwrap();
        assert_eq!(back, b);
        assert!(back.contains(b"dog"));
    }

    #[test]
    fn stream_reads_exact_length() {
        let b = three_words();
        let mut bytes = encode(&b);
        bytes.extend_from_slice(b"next");
        let mut cur = bytes.as_slice();
        assert_eq!(read_from(&mut cur).unwrap(), b);
        assert_eq!(cur, b"next");
        assert!(matches!(decode(&bytes), Err(CcbfError::CorruptFormat(_))));
    }

    #[test]
    fn every_truncation_is_corrupt() {
        let bytes = encode(&three_words());
        for len in 0..bytes.len() {
            let err = decode(&bytes[..len]).unwrap_err();
            assert!(matches!(err, CcbfError::CorruptFormat(_)), "len={len}: {err}");
        }
    }

    #[test]
    fn huge_declared_size_does_not_allocate() {
        let mut bytes = b"CCBF".to_vec();
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&i32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[1, 0, 1]);
        assert!(matches!(decode(&bytes), Err(CcbfError::CorruptFormat(_))));
    }

    #[test]
    fn rejects_foreign_magic_and_version() {
        let mut bytes = encode(&three_words());
        bytes[0..4].copy_from_slice(b"PRUS");
        match decode(&bytes) {
            Err(CcbfError::UnsupportedFormat { magic, version }) => {
                assert_eq!(&magic, b"PRUS");
                assert_eq!(version, 1);
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut bytes = encode(&three_words());
        bytes[4..6].copy_from_slice(&2u16.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(CcbfError::UnsupportedFormat { version: 2, .. })));
    }

    #[test]
    fn rejects_bad_counts() {
        let mut bytes = encode(&three_words());
        bytes[6..10].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(CcbfError::CorruptFormat(_))));

        let mut bytes = encode(&three_words());
        bytes[10..14].copy_from_slice(&(-12i32).to_le_bytes());
        assert!(matches!(decode(&bytes), Err(CcbfError::CorruptFormat(_))));

        let mut bytes = encode(&three_words());
        bytes[10..14].copy_from_slice(&0i32.to_le_bytes());
        bytes.truncate(HDR_SIZE);
        assert!(matches!(decode(&bytes), Err(CcbfError::CorruptFormat(_))));
    }

    #[test]
    fn rejects_absurd_hash_count() {
        let mut bytes = b"CCBF".to_vec();
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&[0, 1]);
        assert!(matches!(decode(&bytes), Err(CcbfError::CorruptFormat(_))));

        bytes[6..10].copy_from_slice(&(MAX_HASH_COUNT + 1).to_le_bytes());
        assert!(matches!(decode(&bytes), Err(CcbfError::CorruptFormat(_))));

        bytes[6..10].copy_from_slice(&MAX_HASH_COUNT.to_le_bytes());
        assert_eq!(decode(&bytes).unwrap().hash_count(), MAX_HASH_COUNT);
    }

    #[test]
    fn failed_publish_keeps_old_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("word.bf");
        let b = three_words();
        save_atomic(&b, &path).unwrap();

        let res: Result<((), PathBuf)> =
            publish_atomic(&path, |_| Err(CcbfError::InvalidParameter("stop".into())));
        assert!(matches!(res, Err(CcbfError::InvalidParameter(_))));
        assert_eq!(open(&path).unwrap(), b);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn rejects_non_binary_bit_bytes() {
        for bad in [2u8, 0xff] {
            let mut bytes = encode(&three_words());
            bytes[HDR_SIZE + 4] = bad;
            assert!(matches!(decode(&bytes), Err(CcbfError::CorruptFormat(_))), "byte {bad}");
        }
    }

    #[test]
    fn write_failure_is_io() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
        }
        assert!(matches!(write_to(&three_words(), &mut Full), Err(CcbfError::Io(_))));
    }

    #[test]
    fn save_and_open() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("word.bf");
        let b = three_words();
        save_atomic(&b, &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), encode(&b));
        assert_eq!(open(&path).unwrap(), b);

        // overwrite in place
        let mut bigger = Bloom::with_rate(50, 0.01).unwrap();
        bigger.insert(b"cat");
        save_atomic(&bigger, &path).unwrap();
        assert_eq!(open(&path).unwrap(), bigger);

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn open_short_file_is_corrupt() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("empty.bf");
        std::fs::write(&path, b"CCBF").unwrap();
        assert!(matches!(open(&path), Err(CcbfError::CorruptFormat(_))));
        assert!(matches!(open(tmp.path().join("missing.bf")), Err(CcbfError::Io(_))));
    }
}
