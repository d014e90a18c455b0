//! Sequential reader for raw blk*.dat files
//!
//! Yields consensus-decoded blocks in file order. Each on-disk record
//! is 4 magic bytes, a 4-byte little-endian length, then the encoded
//! block. Files are memory-mapped and scanned front to back; the
//! zero-filled tail that Bitcoin Core preallocates ends a file.

use crate::MAINNET_MAGIC;
use bitcoin::consensus::Decodable;
use bitcoin::Block;
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlockReadError {
    #[error("failed to read block file: {0}")]
    Io(#[from] std::io::Error),
    #[error("no block files found under {0}")]
    NoBlockFiles(PathBuf),
    #[error("{file}: unexpected magic bytes at offset {offset}")]
    BadMagic { file: PathBuf, offset: u64 },
    #[error("{file}: truncated block record at offset {offset}")]
    Truncated { file: PathBuf, offset: u64 },
    #[error("{file}: undecodable block at offset {offset}: {source}")]
    Decode {
        file: PathBuf,
        offset: u64,
        source: bitcoin::consensus::encode::Error,
    },
}

/// Ordered, finite block sequence over one raw block file or a
/// directory of `blk*.dat` files scanned in sorted file-name order.
pub struct BlockFileReader {
    files: Vec<PathBuf>,
    next_file: usize,
    current: Option<FileCursor>,
}

struct FileCursor {
    path: PathBuf,
    mmap: Mmap,
    offset: usize,
}

impl BlockFileReader {
    pub fn new(path: &Path) -> Result<Self, BlockReadError> {
        let files = if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|entry| entry.path())
                .filter(|p| is_blk_file(p))
                .collect();
            files.sort();
            if files.is_empty() {
                return Err(BlockReadError::NoBlockFiles(path.to_path_buf()));
            }
            files
        } else {
            vec![path.to_path_buf()]
        };

        Ok(Self {
            files,
            next_file: 0,
            current: None,
        })
    }
}

fn is_blk_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.starts_with("blk") && name.ends_with(".dat"))
}

impl Iterator for BlockFileReader {
    type Item = Result<Block, BlockReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let path = self.files.get(self.next_file)?.clone();
                self.next_file += 1;
                match FileCursor::open(&path) {
                    Ok(cursor) => self.current = Some(cursor),
                    Err(err) => return Some(Err(err)),
                }
            }

            let Some(cursor) = self.current.as_mut() else {
                continue;
            };
            match cursor.next_block() {
                Some(item) => {
                    if item.is_err() {
                        self.current = None;
                    }
                    return Some(item);
                }
                // File exhausted, move on to the next one.
                None => self.current = None,
            }
        }
    }
}

impl FileCursor {
    fn open(path: &Path) -> Result<Self, BlockReadError> {
        debug!("scanning {}", path.display());
        let file = File::open(path)?;
        // Safety: the block files are not mutated while a run reads them.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            offset: 0,
        })
    }

    fn next_block(&mut self) -> Option<Result<Block, BlockReadError>> {
        if self.offset + 8 > self.mmap.len() {
            return None;
        }

        let mut header = Cursor::new(&self.mmap[self.offset..self.offset + 8]);
        let magic = match header.read_u32::<LittleEndian>() {
            Ok(magic) => magic,
            Err(err) => return Some(Err(err.into())),
        };

        // Zero magic marks the preallocated padding at the file tail.
        if magic == 0 {
            return None;
        }
        if magic != MAINNET_MAGIC {
            return Some(Err(BlockReadError::BadMagic {
                file: self.path.clone(),
                offset: self.offset as u64,
            }));
        }

        let size = match header.read_u32::<LittleEndian>() {
            Ok(size) => size,
            Err(err) => return Some(Err(err.into())),
        };

        let start = self.offset + 8;
        let end = start + size as usize;
        if end > self.mmap.len() {
            return Some(Err(BlockReadError::Truncated {
                file: self.path.clone(),
                offset: self.offset as u64,
            }));
        }

        let mut body = Cursor::new(&self.mmap[start..end]);
        let result = Block::consensus_decode(&mut body).map_err(|source| BlockReadError::Decode {
            file: self.path.clone(),
            offset: self.offset as u64,
            source,
        });
        self.offset = end;
        Some(result)
    }
}
