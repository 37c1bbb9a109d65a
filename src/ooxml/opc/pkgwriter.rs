//! Serializes an [`OpcPackage`] to ZIP bytes.
//!
//! Writes `[Content_Types].xml`, the package relationships, and every part
//! reachable from them along with each part's relationships.

use crate::common::xml::escape_attr;
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::package::OpcPackage;
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::Part;
use crate::ooxml::opc::phys_pkg::PhysPkgWriter;
use std::collections::BTreeMap;
use std::path::Path;

pub struct PackageWriter;

impl PackageWriter {
    /// Serialize `package` and write it to `path`. Nothing is written when
    /// serialization fails.
    pub fn write<P: AsRef<Path>>(path: P, package: &OpcPackage) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn to_bytes(package: &OpcPackage) -> Result<Vec<u8>> {
        let parts = package.iter_reachable_parts();
        let mut phys_writer = PhysPkgWriter::new();

        let cti = ContentTypesItem::from_parts(&parts);
        let content_types_uri = PackURI::new(CONTENT_TYPES_URI).map_err(OpcError::InvalidPackUri)?;
        phys_writer.write(&content_types_uri, cti.to_xml().as_bytes())?;

        let package_uri = PackURI::new(PACKAGE_URI).map_err(OpcError::InvalidPackUri)?;
        let pkg_rels_uri = package_uri.rels_uri().map_err(OpcError::InvalidPackUri)?;
        phys_writer.write(&pkg_rels_uri, package.rels().to_xml().as_bytes())?;

        for part in parts {
            phys_writer.write(part.partname(), part.blob())?;
            if !part.rels().is_empty() {
                let rels_uri = part.partname().rels_uri().map_err(OpcError::InvalidPackUri)?;
                phys_writer.write(&rels_uri, part.rels().to_xml().as_bytes())?;
            }
        }

        phys_writer.finish()
    }
}

/// Builder for `[Content_Types].xml`.
///
/// Well-known media extensions get a `Default` element; every other part gets
/// an `Override` for its partname.
struct ContentTypesItem {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypesItem {
    fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());
        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    fn from_parts(parts: &[&dyn Part]) -> Self {
        let mut cti = Self::new();
        for part in parts {
            cti.add_content_type(part.partname(), part.content_type());
        }
        cti
    }

    fn add_content_type(&mut self, partname: &PackURI, content_type: &str) {
        let ext = partname.ext().to_ascii_lowercase();
        if Self::is_default_content_type(&ext, content_type) {
            self.defaults.insert(ext, content_type.to_string());
        } else {
            self.overrides
                .insert(partname.to_string(), content_type.to_string());
        }
    }

    fn is_default_content_type(ext: &str, content_type: &str) -> bool {
        matches!(
            (ext, content_type),
            ("rels", ct::OPC_RELATIONSHIPS)
                | ("xml", ct::XML)
                | ("bmp", ct::BMP)
                | ("gif", ct::GIF)
                | ("jpg", ct::JPEG)
                | ("jpeg", ct::JPEG)
                | ("png", ct::PNG)
                | ("tif", ct::TIFF)
                | ("tiff", ct::TIFF)
                | ("wdp", ct::MS_PHOTO)
                | ("emf", ct::X_EMF)
                | ("wmf", ct::X_WMF)
        )
    }

    fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + 160 * (self.defaults.len() + self.overrides.len()));

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);

        for (ext, content_type) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_attr(ext),
                escape_attr(content_type)
            ));
        }
        for (partname, content_type) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_attr(partname),
                escape_attr(content_type)
            ));
        }

        xml.push_str("</Types>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as rt;
    use crate::ooxml::opc::part::{BlobPart, XmlPart};
    use crate::ooxml::opc::pkgreader::ContentTypeMap;

    #[test]
    fn test_content_types_xml() {
        let mut cti = ContentTypesItem::new();
        cti.add_content_type(&PackURI::new("/ppt/media/image1.PNG").unwrap(), ct::PNG);
        cti.add_content_type(&PackURI::new("/ppt/presentation.xml").unwrap(), ct::PML_PRESENTATION_MAIN);
        cti.add_content_type(&PackURI::new("/ppt/media/image2.svg").unwrap(), ct::SVG);

        let xml = cti.to_xml();
        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Override PartName="/ppt/presentation.xml""#));
        assert!(xml.contains(r#"<Override PartName="/ppt/media/image2.svg" ContentType="image/svg+xml"/>"#));

        // what we write we can read back
        let map = ContentTypeMap::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(map.get(&PackURI::new("/ppt/media/image1.PNG").unwrap()).unwrap(), ct::PNG);
    }

    #[test]
    fn test_write_skips_unreachable_parts() {
        let mut pkg = OpcPackage::new();
        let main = PackURI::new("/ppt/presentation.xml").unwrap();
        let mut main_part = XmlPart::new(
            main.clone(),
            ct::PML_PRESENTATION_MAIN.to_string(),
            b"<p:presentation/>".to_vec(),
        );
        let image = PackURI::new("/ppt/media/image1.png").unwrap();
        main_part.relate_to(&image, rt::IMAGE);
        pkg.add_part(Box::new(main_part));
        pkg.add_part(Box::new(BlobPart::new(image, ct::PNG.to_string(), vec![1, 2, 3])));
        pkg.add_part(Box::new(BlobPart::new(
            PackURI::new("/ppt/media/unused.png").unwrap(),
            ct::PNG.to_string(),
            vec![4],
        )));
        pkg.relate_to(&main, rt::OFFICE_DOCUMENT);

        let bytes = PackageWriter::to_bytes(&pkg).unwrap();
        let reread = OpcPackage::from_bytes(bytes).unwrap();
        assert_eq!(reread.part_count(), 2);
        assert!(!reread.contains_part(&PackURI::new("/ppt/media/unused.png").unwrap()));
        let image = reread.get_part(&PackURI::new("/ppt/media/image1.png").unwrap()).unwrap();
        assert_eq!(image.blob(), &[1, 2, 3]);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pptx");

        let mut pkg = OpcPackage::new();
        let main = PackURI::new("/ppt/presentation.xml").unwrap();
        pkg.add_part(Box::new(XmlPart::new(
            main.clone(),
            ct::PML_PRESENTATION_MAIN.to_string(),
            b"<p:presentation/>".to_vec(),
        )));
        pkg.relate_to(&main, rt::OFFICE_DOCUMENT);
        pkg.save(&path).unwrap();

        let reread = OpcPackage::open(&path).unwrap();
        assert_eq!(reread.main_document_partname().unwrap(), main);
    }
}
