//! In-memory presentation fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";

pub const PNG_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A relationship from a slide, besides its layout.
pub enum SlideRel {
    /// `rId`, media file name under `ppt/media/`, bytes
    Image(&'static str, &'static str, Vec<u8>),
    /// `rId`, URL
    Hyperlink(&'static str, &'static str),
    /// `rId`, 1-based number of the target slide
    Slide(&'static str, usize),
}

pub struct SlideFixture {
    /// (master index, layout index within that master)
    pub layout: (usize, usize),
    /// Children of `p:spTree` after the group properties
    pub shapes: String,
    pub rels: Vec<SlideRel>,
}

/// Builds a presentation package: masters with named layouts, and slides.
#[derive(Default)]
pub struct DeckBuilder {
    masters: Vec<(String, Vec<String>)>,
    slides: Vec<SlideFixture>,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn master(mut self, name: &str, layouts: &[&str]) -> Self {
        self.masters
            .push((name.to_string(), layouts.iter().map(|l| l.to_string()).collect()));
        self
    }

    pub fn slide(mut self, layout: (usize, usize), shapes: impl Into<String>, rels: Vec<SlideRel>) -> Self {
        self.slides.push(SlideFixture {
            layout,
            shapes: shapes.into(),
            rels,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();
        let mut overrides = String::new();
        let mut override_part = |name: &str, kind: &str| {
            overrides.push_str(&format!(
                r#"<Override PartName="/{}" ContentType="{}"/>"#,
                name, kind
            ));
        };

        override_part("ppt/presentation.xml", &format!("{}.presentation.main+xml", PML));
        override_part(
            "ppt/theme/theme1.xml",
            "application/vnd.openxmlformats-officedocument.theme+xml",
        );

        // layouts are numbered across masters
        let mut layout_numbers: Vec<Vec<usize>> = Vec::new();
        let mut next_layout = 1;
        for (m, (name, layouts)) in self.masters.iter().enumerate() {
            let master_file = format!("ppt/slideMasters/slideMaster{}.xml", m + 1);
            override_part(&master_file, &format!("{}.slideMaster+xml", PML));

            let mut numbers = Vec::new();
            let mut ids = String::new();
            let mut master_rels = Vec::new();
            for (l, layout) in layouts.iter().enumerate() {
                let n = next_layout;
                next_layout += 1;
                numbers.push(n);
                let r_id = format!("rId{}", l + 1);
                ids.push_str(&format!(r#"<p:sldLayoutId id="{}" r:id="{}"/>"#, 2147483649u64 + n as u64, r_id));
                master_rels.push((r_id, "slideLayout".to_string(), format!("../slideLayouts/slideLayout{}.xml", n)));

                let layout_file = format!("ppt/slideLayouts/slideLayout{}.xml", n);
                override_part(&layout_file, &format!("{}.slideLayout+xml", PML));
                files.push((
                    layout_file.clone(),
                    format!(
                        r#"<p:sldLayout {}><p:cSld name="{}"><p:spTree/></p:cSld></p:sldLayout>"#,
                        NS, layout
                    )
                    .into_bytes(),
                ));
                files.push((
                    format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", n),
                    rels_xml(&[(
                        "rId1".to_string(),
                        "slideMaster".to_string(),
                        format!("../slideMasters/slideMaster{}.xml", m + 1),
                    )])
                    .into_bytes(),
                ));
            }
            master_rels.push((
                format!("rId{}", layouts.len() + 1),
                "theme".to_string(),
                "../theme/theme1.xml".to_string(),
            ));
            files.push((
                master_file,
                format!(
                    r#"<p:sldMaster {}><p:cSld name="{}"><p:spTree/></p:cSld><p:sldLayoutIdLst>{}</p:sldLayoutIdLst></p:sldMaster>"#,
                    NS, name, ids
                )
                .into_bytes(),
            ));
            files.push((
                format!("ppt/slideMasters/_rels/slideMaster{}.xml.rels", m + 1),
                rels_xml(&master_rels).into_bytes(),
            ));
            layout_numbers.push(numbers);
        }

        let mut pres_rels = Vec::new();
        let mut master_ids = String::new();
        for m in 0..self.masters.len() {
            let r_id = format!("rId{}", pres_rels.len() + 1);
            master_ids.push_str(&format!(r#"<p:sldMasterId id="{}" r:id="{}"/>"#, 2147483648u64 + 100 * m as u64, r_id));
            pres_rels.push((r_id, "slideMaster".to_string(), format!("slideMasters/slideMaster{}.xml", m + 1)));
        }

        let mut slide_ids = String::new();
        for (s, slide) in self.slides.iter().enumerate() {
            let n = s + 1;
            let slide_file = format!("ppt/slides/slide{}.xml", n);
            override_part(&slide_file, &format!("{}.slide+xml", PML));

            let r_id = format!("rId{}", pres_rels.len() + 1);
            slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + s, r_id));
            pres_rels.push((r_id, "slide".to_string(), format!("slides/slide{}.xml", n)));

            let layout = layout_numbers[slide.layout.0][slide.layout.1];
            let mut rels = vec![(
                "rId1".to_string(),
                "slideLayout".to_string(),
                format!("../slideLayouts/slideLayout{}.xml", layout),
            )];
            let mut external = Vec::new();
            for rel in &slide.rels {
                match rel {
                    SlideRel::Image(r_id, name, bytes) => {
                        rels.push((r_id.to_string(), "image".to_string(), format!("../media/{}", name)));
                        files.push((format!("ppt/media/{}", name), bytes.clone()));
                    },
                    SlideRel::Hyperlink(r_id, url) => external.push((r_id.to_string(), url.to_string())),
                    SlideRel::Slide(r_id, target) => {
                        rels.push((r_id.to_string(), "slide".to_string(), format!("slide{}.xml", target)))
                    },
                }
            }
            let mut rels_doc = rels_xml(&rels);
            for (r_id, url) in external {
                rels_doc = rels_doc.replace(
                    "</Relationships>",
                    &format!(
                        r#"<Relationship Id="{}" Type="{}/hyperlink" Target="{}" TargetMode="External"/></Relationships>"#,
                        r_id, REL, url
                    ),
                );
            }

            files.push((
                slide_file,
                format!(
                    r#"<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
                    NS, slide.shapes
                )
                .into_bytes(),
            ));
            files.push((format!("ppt/slides/_rels/slide{}.xml.rels", n), rels_doc.into_bytes()));
        }
        pres_rels.push((
            format!("rId{}", pres_rels.len() + 1),
            "theme".to_string(),
            "theme/theme1.xml".to_string(),
        ));

        files.push((
            "ppt/presentation.xml".to_string(),
            format!(
                r#"<p:presentation {}><p:sldMasterIdLst>{}</p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
                NS, master_ids, slide_ids
            )
            .into_bytes(),
        ));
        files.push(("ppt/_rels/presentation.xml.rels".to_string(), rels_xml(&pres_rels).into_bytes()));
        files.push((
            "ppt/theme/theme1.xml".to_string(),
            br#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"/>"#.to_vec(),
        ));
        files.push((
            "_rels/.rels".to_string(),
            rels_xml(&[("rId1".to_string(), "officeDocument".to_string(), "ppt/presentation.xml".to_string())])
                .into_bytes(),
        ));
        files.push((
            "[Content_Types].xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>{}</Types>"#,
                overrides
            )
            .into_bytes(),
        ));

        let mut zip_data = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut zip_data));
            let options = SimpleFileOptions::default();
            for (name, content) in &files {
                writer.start_file(name.as_str(), options).unwrap();
                writer.write_all(content).unwrap();
            }
            writer.finish().unwrap();
        }
        zip_data
    }
}

fn rels_xml(items: &[(String, String, String)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, kind, target) in items {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id, REL, kind, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// A text shape holding one paragraph per entry, each entry being the runs
/// of that paragraph as `(text, run properties)`.
pub fn text_shape(id: u32, paragraphs: &[&[(&str, &str)]]) -> String {
    let mut body = String::new();
    for runs in paragraphs {
        body.push_str("<a:p>");
        for (text, props) in runs.iter() {
            body.push_str(&format!("<a:r>{}<a:t>{}</a:t></a:r>", props, text));
        }
        body.push_str("</a:p>");
    }
    text_shape_xml(id, &body)
}

/// A text shape with the given paragraph markup.
pub fn text_shape_xml(id: u32, body: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{body}</p:txBody></p:sp>"#
    )
}

pub fn picture(id: u32, r_id: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{r_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr/></p:pic>"#
    )
}

pub fn group(id: u32, inner: &str) -> String {
    format!(
        r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="{id}" name="Group {id}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{inner}</p:grpSp>"#
    )
}

pub fn table(id: u32, cell_text: &str) -> String {
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tr h="370840"><a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>{cell_text}</a:t></a:r></a:p></a:txBody></a:tc></a:tr></a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#
    )
}

/// Run properties with a typeface and a solid color.
pub const STYLED: &str = r#"<a:rPr lang="en-US" sz="3200" b="1"><a:solidFill><a:srgbClr val="1F4E79"/></a:solidFill><a:latin typeface="Georgia"/></a:rPr>"#;
/// Run properties with only a typeface.
pub const FONT_ONLY: &str = r#"<a:rPr lang="en-US"><a:latin typeface="Verdana"/></a:rPr>"#;

/// Three slides over two masters:
///
/// 1. "Title Slide" (first master): split-run title, unresolved greeting,
///    group shape, table and hyperlink
/// 2. "Corporate Cover" (second master "Corporate"): picture and page text
/// 3. "Title and Content": a multi-line body
pub fn sample_deck() -> DeckBuilder {
    let title = text_shape_xml(
        2,
        &format!(
            r#"<a:p><a:r><a:t>{{{{</a:t></a:r><a:r>{STYLED}<a:t>name</a:t></a:r><a:r><a:t>}}}}</a:t></a:r></a:p><a:p><a:r>{FONT_ONLY}<a:t>Hi {{{{ missing.key }}}}</a:t></a:r></a:p><a:p><a:r><a:rPr lang="en-US"><a:hlinkClick r:id="rId3"/></a:rPr><a:t>site</a:t></a:r></a:p>"#
        ),
    );
    let slide1 = format!(
        "{}{}{}",
        title,
        group(3, &text_shape(4, &[&[("{{ items[0].title }}", "")]])),
        table(5, "{{ items.[0].title }}")
    );
    let slide2 = format!("{}{}", picture(2, "rId2"), text_shape(3, &[&[("Page {{ page }}", FONT_ONLY)]]));
    let slide3 = text_shape(2, &[&[("{{ body }}", STYLED)], &[("static", FONT_ONLY)]]);

    DeckBuilder::new()
        .master("Office Theme", &["Title Slide", "Title and Content"])
        .master("Corporate", &["Corporate Cover"])
        .slide(
            (0, 0),
            slide1,
            vec![SlideRel::Hyperlink("rId3", "https://example.com/")],
        )
        .slide(
            (1, 0),
            slide2,
            vec![SlideRel::Image("rId2", "image1.png", PNG_BYTES.to_vec())],
        )
        .slide((0, 1), slide3, vec![])
}
