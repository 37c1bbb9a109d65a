//! Physical (ZIP) layer of an OPC package.
//!
//! The reader decompresses every member up front into memory; presentation
//! templates are small enough that a single pass beats on-demand access. The
//! writer deflates members into an in-memory buffer so a failed save never
//! leaves a partial file behind.

use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Read access to the members of a ZIP-based package.
pub struct PhysPkgReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl PhysPkgReader<Cursor<Vec<u8>>> {
    /// Open a package held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::new(Cursor::new(data))
    }
}

impl<R: Read + Seek> PhysPkgReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self { archive })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Decompress every file member, keyed by member name.
    ///
    /// Member names are matched case-sensitively, as written by Office.
    pub fn read_all(&mut self) -> Result<HashMap<String, Vec<u8>>> {
        let mut members = HashMap::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let mut file = self.archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;
            members.insert(name, blob);
        }
        Ok(members)
    }

    /// Decompress a single member.
    pub fn blob_for(&mut self, pack_uri: &PackURI) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(pack_uri.membername())
            .map_err(|_| OpcError::PartNotFound(pack_uri.to_string()))?;
        let mut blob = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut blob)?;
        Ok(blob)
    }
}

/// Writes package members into an in-memory ZIP archive.
pub struct PhysPkgWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl PhysPkgWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Add a member for `pack_uri` with content `blob`.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        self.zip.start_file(pack_uri.membername(), self.options)?;
        self.zip.write_all(blob)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}
