/// Package implementation for PowerPoint presentations.
use crate::common::xml::XmlDocument;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::{BlobPart, OpcPackage, PackURI, Part};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;

/// Content types accepted for the main presentation part.
const MAIN_CONTENT_TYPES: [&str; 4] = [
    ct::PML_PRESENTATION_MAIN,
    ct::PML_PRES_MACRO_MAIN,
    ct::PML_TEMPLATE_MAIN,
    ct::PML_SLIDESHOW_MAIN,
];

/// A PowerPoint (.pptx) package opened for editing.
///
/// Wraps an [`OpcPackage`] and adds the presentation-level operations in
/// [`presentation`](super::presentation) and [`slide`](super::slide).
///
/// # Examples
///
/// ```rust,no_run
/// use deckstamp::ooxml::pptx::Package;
///
/// let mut pkg = Package::open("template.pptx")?;
/// println!("{} slides", pkg.slide_count()?);
/// pkg.remove_all_slides()?;
/// pkg.save("empty.pptx")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Package {
    opc: OpcPackage,
    /// SHA-256 of media bytes -> partname, built on first registration
    media_index: Option<HashMap<Vec<u8>, PackURI>>,
}

impl Package {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_opc(OpcPackage::open(path)?)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_opc(OpcPackage::from_bytes(data)?)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_opc(OpcPackage::from_reader(reader)?)
    }

    /// Wrap an OPC package after checking that its main part is a
    /// presentation (regular, macro-enabled, template or slideshow).
    pub fn from_opc(opc: OpcPackage) -> Result<Self> {
        let main_part = opc
            .main_document_part()
            .map_err(|e| OoxmlError::PartNotFound(format!("main presentation part: {}", e)))?;

        let content_type = main_part.content_type();
        if !MAIN_CONTENT_TYPES.contains(&content_type) {
            return Err(OoxmlError::InvalidContentType {
                expected: format!("{} or {}", ct::PML_PRESENTATION_MAIN, ct::PML_PRES_MACRO_MAIN),
                got: content_type.to_string(),
            });
        }

        Ok(Self {
            opc,
            media_index: None,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.opc.to_bytes()?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Ok(self.opc.save(path)?)
    }

    #[inline]
    pub fn opc(&self) -> &OpcPackage {
        &self.opc
    }

    #[inline]
    pub fn opc_mut(&mut self) -> &mut OpcPackage {
        &mut self.opc
    }

    /// Partname of the main presentation part.
    pub fn presentation_partname(&self) -> Result<PackURI> {
        Ok(self.opc.main_document_partname()?)
    }

    #[inline]
    pub fn part(&self, partname: &PackURI) -> Result<&dyn Part> {
        Ok(self.opc.get_part(partname)?)
    }

    #[inline]
    pub fn part_mut(&mut self, partname: &PackURI) -> Result<&mut dyn Part> {
        Ok(self.opc.get_part_mut(partname)?)
    }

    /// Parse an XML part into an editable tree.
    pub fn xml_document(&self, partname: &PackURI) -> Result<XmlDocument> {
        Ok(XmlDocument::parse(self.part(partname)?.blob())?)
    }

    /// Serialize `doc` back into the part `partname`.
    pub fn store_xml(&mut self, partname: &PackURI, doc: &XmlDocument) -> Result<()> {
        self.part_mut(partname)?.set_blob(doc.to_bytes());
        Ok(())
    }

    /// Register an image, reusing an existing part with identical bytes.
    ///
    /// The content type is derived from `ext`; unknown extensions are rejected.
    /// Relate a slide to the returned partname to place the image.
    ///
    /// ```rust,no_run
    /// use deckstamp::ooxml::opc::constants::relationship_type as rt;
    /// use deckstamp::ooxml::pptx::Package;
    ///
    /// let mut pkg = Package::open("deck.pptx")?;
    /// let image = pkg.add_image_part(&std::fs::read("logo.png")?, "png")?;
    /// let slide = pkg.slide(1)?.partname;
    /// let r_id = pkg.part_mut(&slide)?.relate_to(&image, rt::IMAGE);
    /// # let _ = r_id;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn add_image_part(&mut self, blob: &[u8], ext: &str) -> Result<PackURI> {
        let content_type = ct::for_image_ext(ext)
            .ok_or_else(|| OoxmlError::InvalidFormat(format!("unsupported image extension '{}'", ext)))?;
        self.add_media_part(blob, ext, content_type)
    }

    /// Register a media part under `/ppt/media/`, reusing an existing part
    /// with identical bytes. Returns the partname to relate to.
    pub fn add_media_part(&mut self, blob: &[u8], ext: &str, content_type: &str) -> Result<PackURI> {
        let digest = Sha256::digest(blob).to_vec();
        if let Some(existing) = self.media_index().get(&digest) {
            debug!(partname = %existing, "reusing media part with identical content");
            return Ok(existing.clone());
        }

        let ext = ext.to_ascii_lowercase();
        let stem = if content_type.starts_with("image/") { "image" } else { "media" };
        let partname = self.opc.next_partname(&format!("/ppt/media/{}%d.{}", stem, ext))?;
        self.opc.add_part(Box::new(BlobPart::new(
            partname.clone(),
            content_type.to_string(),
            blob.to_vec(),
        )));
        debug!(partname = %partname, bytes = blob.len(), "registered media part");

        self.media_index().insert(digest, partname.clone());
        Ok(partname)
    }

    fn media_index(&mut self) -> &mut HashMap<Vec<u8>, PackURI> {
        let opc = &self.opc;
        self.media_index.get_or_insert_with(|| {
            opc.iter_parts()
                .filter(|p| p.partname().as_str().starts_with("/ppt/media/"))
                .map(|p| (Sha256::digest(p.blob()).to_vec(), p.partname().clone()))
                .collect()
        })
    }
}
