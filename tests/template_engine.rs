//! End-to-end rendering over synthetic presentations.

mod common;

use common::{DeckBuilder, PNG_BYTES, SlideRel, picture, sample_deck, text_shape, text_shape_xml};
use deckstamp::ooxml::opc::constants::relationship_type as rt;
use deckstamp::ooxml::pptx::Package;
use deckstamp::ooxml::pptx::text::{self, Paragraph};
use deckstamp::template::{
    ConfigSource, EngineOptions, SlideJob, TemplateConfig, TemplateEngine, TemplateError, clone_slide, run,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn slide_texts(pkg: &Package, index: usize) -> Vec<String> {
    let slide = pkg.slide(index).unwrap();
    let doc = pkg.xml_document(&slide.partname).unwrap();
    text::paragraphs(doc.root()).iter().map(Paragraph::text).collect()
}

fn render(config: TemplateConfig) -> Package {
    let engine = TemplateEngine::from_bytes(sample_deck().build()).unwrap();
    let bytes = engine.render_to_bytes(&config).unwrap();
    Package::from_bytes(bytes).unwrap()
}

#[test]
fn split_runs_collapse_into_one_formatted_run() {
    let out = render(TemplateConfig::new(vec![
        SlideJob::new(1).with_data(json!({"name": "Ann", "items": [{"title": "X"}]})),
    ]));

    let slide = out.slide(1).unwrap();
    let doc = out.xml_document(&slide.partname).unwrap();
    let paragraphs = text::paragraphs(doc.root());
    let runs: Vec<_> = paragraphs[0].runs().collect();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text(), "Ann");
    // formatting comes from the run that had both a font and a color
    assert_eq!(runs[0].font_name().as_deref(), Some("Georgia"));
    assert!(runs[0].color().is_some());
    assert_eq!(runs[0].properties().unwrap().attr("sz").as_deref(), Some("3200"));
}

#[test]
fn unresolved_placeholders_are_kept() {
    let out = render(TemplateConfig::new(vec![SlideJob::new(1)]));
    let texts = slide_texts(&out, 1);
    assert_eq!(texts[0], "{{name}}");
    assert_eq!(texts[1], "Hi {{ missing.key }}");
}

#[test]
fn groups_and_tables_are_substituted_with_both_index_forms() {
    let out = render(TemplateConfig::new(vec![
        SlideJob::new(1).with_data(json!({"name": "Ann", "items": [{"title": "X"}]})),
    ]));
    assert_eq!(slide_texts(&out, 1), ["Ann", "Hi {{ missing.key }}", "site", "X", "X"]);
}

#[test]
fn slides_follow_job_order() {
    let out = render(TemplateConfig::new(vec![
        SlideJob::new(2).with_data(json!({"page": 1})),
        SlideJob::new(1).with_data(json!({"name": "Ann"})),
        SlideJob::new(2).with_data(json!({"page": 3})),
    ]));

    assert_eq!(out.slide_count().unwrap(), 3);
    let layouts: Vec<_> = out
        .slides()
        .unwrap()
        .iter()
        .map(|s| out.layout_of(&s.partname).unwrap().name)
        .collect();
    assert_eq!(layouts, ["Corporate Cover", "Title Slide", "Corporate Cover"]);
    assert_eq!(slide_texts(&out, 1), ["Page 1"]);
    assert_eq!(slide_texts(&out, 2)[0], "Ann");
    assert_eq!(slide_texts(&out, 3), ["Page 3"]);
}

#[test]
fn cloned_image_points_at_identical_bytes_in_destination() {
    let out = render(TemplateConfig::new(vec![SlideJob::new(2), SlideJob::new(2)]));

    for index in 1..=2 {
        let slide = out.slide(index).unwrap();
        let doc = out.xml_document(&slide.partname).unwrap();
        let r_id = doc.root().descendants_named("blip")[0].attr("r:embed").unwrap();

        let part = out.part(&slide.partname).unwrap();
        assert_eq!(part.rels().get(&r_id).unwrap().reltype(), rt::IMAGE);
        let image = part.related_partname(&r_id).unwrap();
        assert_eq!(out.part(&image).unwrap().blob(), &PNG_BYTES);
    }

    // one image part shared by both slides
    let media = out
        .opc()
        .iter_parts()
        .filter(|p| p.partname().as_str().starts_with("/ppt/media/"))
        .count();
    assert_eq!(media, 1);
}

#[test]
fn hyperlinks_are_recreated() {
    let out = render(TemplateConfig::new(vec![SlideJob::new(1)]));
    let slide = out.slide(1).unwrap();
    let doc = out.xml_document(&slide.partname).unwrap();
    let r_id = doc.root().descendants_named("hlinkClick")[0].attr("r:id").unwrap();
    let rel = out.part(&slide.partname).unwrap().rels().get(&r_id).unwrap().clone();
    assert!(rel.is_external());
    assert_eq!(rel.target_ref(), "https://example.com/");
}

#[test]
fn slide_jump_links_do_not_alias_new_relationships() {
    let body = r#"<a:p><a:r><a:rPr lang="en-US"><a:hlinkClick r:id="rId2" action="ppaction://hlinksldjump"/></a:rPr><a:t>next</a:t></a:r></a:p><a:p><a:r><a:rPr lang="en-US"><a:hlinkClick r:id="rId3"/></a:rPr><a:t>web</a:t></a:r></a:p>"#;
    let deck = DeckBuilder::new()
        .master("Office Theme", &["Title Slide"])
        .slide(
            (0, 0),
            format!("{}{}", text_shape_xml(2, body), picture(3, "rId4")),
            vec![
                SlideRel::Slide("rId2", 2),
                SlideRel::Hyperlink("rId3", "https://example.com/"),
                SlideRel::Image("rId4", "image1.png", PNG_BYTES.to_vec()),
            ],
        )
        .slide((0, 0), text_shape(2, &[&[("second", "")]]), vec![])
        .build();
    let engine = TemplateEngine::from_bytes(deck).unwrap();
    let out = Package::from_bytes(engine.render_to_bytes(&TemplateConfig::new(vec![SlideJob::new(1)])).unwrap()).unwrap();

    let slide = out.slide(1).unwrap();
    let doc = out.xml_document(&slide.partname).unwrap();
    let part = out.part(&slide.partname).unwrap();

    let links = doc.root().descendants_named("hlinkClick");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].attr("action"), None);
    let link = part.rels().get(&links[0].attr("r:id").unwrap()).unwrap().clone();
    assert!(link.is_external());
    assert_eq!(link.target_ref(), "https://example.com/");
    assert_eq!(slide_texts(&out, 1), ["next", "web"]);

    // every remaining reference resolves to the relationship it was copied for
    let blip = doc.root().descendants_named("blip")[0].attr("r:embed").unwrap();
    assert_eq!(part.rels().get(&blip).unwrap().reltype(), rt::IMAGE);
    assert!(part.rels().iter().all(|rel| rel.reltype() != rt::SLIDE));
}

#[test]
fn carriage_returns_survive_serialization() {
    let bytes = TemplateEngine::from_bytes(sample_deck().build())
        .unwrap()
        .render_to_bytes(&TemplateConfig::new(vec![
            SlideJob::new(3).with_data(json!({"body": "a\rb"})),
        ]))
        .unwrap();
    let out = Package::from_bytes(bytes).unwrap();
    let slide = out.slide(1).unwrap();

    let xml = String::from_utf8(out.part(&slide.partname).unwrap().blob().to_vec()).unwrap();
    assert!(xml.contains("<a:t>a&#13;b</a:t>"));
    assert!(!xml.contains("a\rb"));
    assert_eq!(slide_texts(&out, 1)[0], "a\rb");
}

#[test]
fn newlines_in_values_become_line_breaks() {
    let out = render(TemplateConfig::new(vec![
        SlideJob::new(3).with_data(json!({"body": "one\ntwo\u{0007}\u{000B}three"})),
    ]));
    let slide = out.slide(1).unwrap();
    let doc = out.xml_document(&slide.partname).unwrap();
    let first = text::paragraphs(doc.root())[0];

    let kinds: Vec<_> = first.element().elements().map(|e| e.local_name()).collect();
    assert_eq!(kinds, ["r", "br", "r", "br", "r"]);
    let words: Vec<_> = first.runs().map(|r| r.text()).collect();
    assert_eq!(words, ["one", "two", "three"]);
    // untouched paragraph
    assert_eq!(slide_texts(&out, 1)[1], "static");
}

#[test]
fn master_fallback_and_layout_not_found() {
    let source = Package::from_bytes(sample_deck().build()).unwrap();

    // "Corporate Cover" only under the second master: found through it
    let mut dest = Package::from_bytes(sample_deck().build()).unwrap();
    dest.remove_all_slides().unwrap();
    let cloned = clone_slide(&source, 2, &mut dest).unwrap();
    assert_eq!(cloned.layout.name, "Corporate Cover");

    // no master named "Corporate" in this destination
    let other = DeckBuilder::new()
        .master("Office Theme", &["Title Slide"])
        .master("Other", &["Corporate Cover"])
        .slide((0, 0), text_shape(2, &[&[("x", "")]]), vec![])
        .build();
    let mut dest = Package::from_bytes(other).unwrap();
    dest.remove_all_slides().unwrap();
    match clone_slide(&source, 2, &mut dest) {
        Err(TemplateError::LayoutNotFound { layout, master }) => {
            assert_eq!(layout, "Corporate Cover");
            assert_eq!(master, "Corporate");
        },
        other => panic!("expected LayoutNotFound, got {:?}", other.map(|c| c.partname)),
    }
}

#[test]
fn template_parts_survive_and_removed_slides_do_not() {
    let out = render(TemplateConfig::new(vec![SlideJob::new(3)]));
    assert_eq!(out.slide_masters().unwrap().len(), 2);
    assert_eq!(out.slide_layouts().unwrap().len(), 2);
    assert_eq!(out.slide_size().unwrap(), Some((12192000, 6858000)));
    let slides = out
        .opc()
        .iter_parts()
        .filter(|p| p.partname().as_str().starts_with("/ppt/slides/"))
        .count();
    assert_eq!(slides, 1);
}

#[test]
fn font_normalization_can_be_disabled() {
    let deck = DeckBuilder::new()
        .master("Office Theme", &["Title Slide"])
        .slide(
            (0, 0),
            text_shape(2, &[&[("Named", common::FONT_ONLY), (" plain", "")]]),
            vec![],
        )
        .build();
    let config = TemplateConfig::new(vec![SlideJob::new(1)]);

    let engine = TemplateEngine::from_bytes(deck.clone()).unwrap();
    let out = Package::from_bytes(engine.render_to_bytes(&config).unwrap()).unwrap();
    let slide = out.slide(1).unwrap();
    let doc = out.xml_document(&slide.partname).unwrap();
    let fonts: Vec<_> = text::paragraphs(doc.root())[0].runs().map(|r| r.font_name()).collect();
    assert_eq!(fonts, vec![Some("Verdana".to_string()); 2]);

    let engine = TemplateEngine::from_bytes(deck)
        .unwrap()
        .with_options(EngineOptions { normalize_fonts: false });
    let out = Package::from_bytes(engine.render_to_bytes(&config).unwrap()).unwrap();
    let slide = out.slide(1).unwrap();
    let doc = out.xml_document(&slide.partname).unwrap();
    let fonts: Vec<_> = text::paragraphs(doc.root())[0].runs().map(|r| r.font_name()).collect();
    assert_eq!(fonts, [Some("Verdana".to_string()), None]);
}

#[test]
fn failed_render_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.pptx");
    std::fs::write(&template, sample_deck().build()).unwrap();

    let output = dir.path().join("out.pptx");
    let err = run(
        &template,
        ConfigSource::Json(r#"{"slides": [{"src_page": 1}, {"src_page": 4}]}"#.into()),
        &output,
        EngineOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, TemplateError::SlideIndexOutOfRange { index: 4, count: 3 }));
    assert!(!output.exists());

    let err = run(&template, ConfigSource::Json("not json".into()), &output, EngineOptions::default()).unwrap_err();
    assert!(matches!(err, TemplateError::Json(_)));
    assert!(!output.exists());
}

#[test]
fn config_file_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.pptx");
    let config = dir.path().join("config.json");
    let output = dir.path().join("out.pptx");
    std::fs::write(&template, sample_deck().build()).unwrap();
    std::fs::write(
        &config,
        r#"{"slides": [{"src_page": 2, "replace_texts": {"page": 7}}, {"src_page": 1, "replace_texts": {"name": "Bo"}}]}"#,
    )
    .unwrap();

    let report = run(&template, ConfigSource::Path(config), &output, EngineOptions::default()).unwrap();
    assert_eq!(report.slides, 2);
    assert_eq!(report.resolved, 2);

    let out = Package::open(&output).unwrap();
    assert_eq!(slide_texts(&out, 1), ["Page 7"]);
    assert_eq!(slide_texts(&out, 2)[0], "Bo");
}

#[test]
fn picture_only_deck_without_text() {
    let deck = DeckBuilder::new()
        .master("Office Theme", &["Blank"])
        .slide(
            (0, 0),
            picture(2, "rId2"),
            vec![SlideRel::Image("rId2", "image7.png", vec![1, 2, 3, 4])],
        )
        .build();
    let engine = TemplateEngine::from_bytes(deck).unwrap();
    let (out, report) = engine.render(&TemplateConfig::new(vec![SlideJob::new(1)])).unwrap();
    assert_eq!(report.resources, 1);
    assert_eq!(report.resolved, 0);
    assert_eq!(out.slide_count().unwrap(), 1);
}
