//! The rendering pipeline.
//!
//! The template is loaded once and stays read-only. Each render builds the
//! destination from the same bytes, drops its slides so masters, layouts and
//! theme are kept, then runs the slide jobs in configuration order: clone,
//! substitute, normalize. Output is written only once every job succeeded.

use crate::common::xml::XmlElement;
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::text::{self, Paragraph};
use crate::template::cloner::clone_slide;
use crate::template::config::{ConfigSource, EngineOptions, TemplateConfig};
use crate::template::data::DataTree;
use crate::template::error::Result;
use crate::template::placeholder::{self, Unresolved};
use crate::template::runs::{self, FontContext, RunFormat};
use std::path::Path;
use tracing::{debug, info, info_span, warn};

/// Counters for one slide's substitution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideReport {
    pub paragraphs_rewritten: usize,
    pub resolved: usize,
    pub unresolved: Vec<Unresolved>,
    pub fonts_normalized: usize,
}

/// Summary of a render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub slides: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub resources: usize,
}

/// Substitute placeholders in every paragraph under `root`.
///
/// Paragraphs without `{{`, and those whose text does not change, keep their
/// runs. The others are collapsed into one run formatted from the paragraph's
/// reference run or the slide's fallback font.
pub fn substitute_slide(root: &mut XmlElement, data: &DataTree, options: &EngineOptions) -> SlideReport {
    let fonts = FontContext::collect(root);
    let mut report = SlideReport::default();

    text::for_each_paragraph_mut(root, &mut |p: &mut XmlElement| {
        let view = Paragraph::new(p);
        let original = view.text();
        if !placeholder::has_placeholder(&original) {
            return;
        }
        let substitution = placeholder::substitute(&original, data);
        report.resolved += substitution.resolved;
        report.unresolved.extend(substitution.unresolved);
        if substitution.text == original {
            return;
        }
        let format = RunFormat::capture(view, &fonts);
        runs::rewrite_paragraph(p, &substitution.text, &format);
        report.paragraphs_rewritten += 1;
    });

    if options.normalize_fonts {
        report.fonts_normalized = runs::normalize_fonts(root, &fonts);
    }
    report
}

/// Renders configurations against one template.
///
/// # Examples
///
/// ```rust,no_run
/// use deckstamp::template::{SlideJob, TemplateConfig, TemplateEngine};
/// use serde_json::json;
///
/// let engine = TemplateEngine::open("template.pptx")?;
/// let config = TemplateConfig::new(vec![
///     SlideJob::new(2).with_data(json!({"title": "Agenda"})),
///     SlideJob::new(1),
/// ]);
/// let bytes = engine.render_to_bytes(&config)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct TemplateEngine {
    template: Vec<u8>,
    source: Package,
    options: EngineOptions,
}

impl TemplateEngine {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(template: Vec<u8>) -> Result<Self> {
        let source = Package::from_bytes(template.clone())?;
        Ok(Self {
            template,
            source,
            options: EngineOptions::default(),
        })
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The template, as loaded.
    #[inline]
    pub fn template(&self) -> &Package {
        &self.source
    }

    /// Build the destination presentation for `config`.
    pub fn render(&self, config: &TemplateConfig) -> Result<(Package, RenderReport)> {
        let slide_count = self.source.slide_count()?;
        config.validate(slide_count)?;

        let mut dest = Package::from_bytes(self.template.clone())?;
        dest.remove_all_slides()?;

        let mut report = RenderReport::default();
        for (job_index, job) in config.slides.iter().enumerate() {
            let span = info_span!("slide_job", job = job_index, src_page = job.src_page);
            let _enter = span.enter();

            let cloned = clone_slide(&self.source, job.src_page, &mut dest)?;
            let mut doc = dest.xml_document(&cloned.partname)?;
            let slide = substitute_slide(doc.root_mut(), &job.replace_texts, &self.options);
            dest.store_xml(&cloned.partname, &doc)?;

            for unresolved in &slide.unresolved {
                warn!(token = %unresolved.token, error = %unresolved.error, "placeholder left unresolved");
            }
            debug!(
                layout = %cloned.layout.name,
                resources = cloned.resources.len(),
                rewritten = slide.paragraphs_rewritten,
                resolved = slide.resolved,
                fonts_normalized = slide.fonts_normalized,
                "slide rendered"
            );

            report.slides += 1;
            report.resolved += slide.resolved;
            report.unresolved += slide.unresolved.len();
            report.resources += cloned.resources.len();
        }

        info!(
            slides = report.slides,
            resolved = report.resolved,
            unresolved = report.unresolved,
            "render complete"
        );
        Ok((dest, report))
    }

    pub fn render_to_bytes(&self, config: &TemplateConfig) -> Result<Vec<u8>> {
        let (dest, _) = self.render(config)?;
        Ok(dest.to_bytes()?)
    }

    /// Render and write to `output`. Nothing is written if any job fails.
    pub fn render_to_path<P: AsRef<Path>>(&self, config: &TemplateConfig, output: P) -> Result<RenderReport> {
        let (dest, report) = self.render(config)?;
        dest.save(output)?;
        Ok(report)
    }
}

/// Render `template` with the configuration from `config` into `output`.
pub fn run(
    template: impl AsRef<Path>,
    config: impl Into<ConfigSource>,
    output: impl AsRef<Path>,
    options: EngineOptions,
) -> Result<RenderReport> {
    let config = config.into().load()?;
    TemplateEngine::open(template)?
        .with_options(options)
        .render_to_path(&config, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;
    use crate::ooxml::pptx::package::tests::sample_pptx;
    use crate::template::config::SlideJob;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SLIDE: &str = r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:txBody>
<a:p><a:r><a:rPr><a:latin typeface="Verdana"/></a:rPr><a:t>static</a:t></a:r><a:r><a:t> text</a:t></a:r></a:p>
<a:p><a:r><a:t>Hi {{ who }} / {{ missing }}</a:t></a:r></a:p>
<a:p><a:r><a:t>{{ missing }}</a:t></a:r></a:p>
</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn test_substitute_slide() {
        let mut doc = XmlDocument::parse(SLIDE.as_bytes()).unwrap();
        let options = EngineOptions { normalize_fonts: false };
        let report = substitute_slide(doc.root_mut(), &DataTree::from(json!({"who": "Ann"})), &options);

        assert_eq!(report.paragraphs_rewritten, 1);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.unresolved.len(), 2);
        assert_eq!(report.fonts_normalized, 0);

        let texts: Vec<_> = text::paragraphs(doc.root()).iter().map(Paragraph::text).collect();
        assert_eq!(texts, ["static text", "Hi Ann / {{ missing }}", "{{ missing }}"]);
        // the rewritten paragraph takes the slide font
        let run = text::paragraphs(doc.root())[1].runs().next().unwrap();
        assert_eq!(run.font_name().as_deref(), Some("Verdana"));
        // the untouched paragraph keeps its runs
        assert_eq!(text::paragraphs(doc.root())[0].runs().count(), 2);
    }

    #[test]
    fn test_substitute_slide_normalizes_fonts() {
        let mut doc = XmlDocument::parse(SLIDE.as_bytes()).unwrap();
        let report = substitute_slide(doc.root_mut(), &DataTree::empty_map(), &EngineOptions::default());
        assert_eq!(report.paragraphs_rewritten, 0);
        // " text" and both unrewritten placeholder paragraphs
        assert_eq!(report.fonts_normalized, 3);
        for p in text::paragraphs(doc.root()) {
            assert!(p.runs().all(|r| r.font_name().as_deref() == Some("Verdana")));
        }
    }

    #[test]
    fn test_render_orders_slides() {
        let engine = TemplateEngine::from_bytes(sample_pptx()).unwrap();
        let config = TemplateConfig::new(vec![
            SlideJob::new(2),
            SlideJob::new(1).with_data(json!({"title": "Hello"})),
            SlideJob::new(2),
        ]);
        let (dest, report) = engine.render(&config).unwrap();
        assert_eq!(report.slides, 3);
        assert_eq!(report.resolved, 1);

        let layouts: Vec<_> = dest
            .slide_partnames()
            .unwrap()
            .iter()
            .map(|s| dest.layout_of(s).unwrap().name)
            .collect();
        assert_eq!(layouts, ["Brand Cover", "Title Slide", "Brand Cover"]);

        let second = dest.slide(2).unwrap();
        let doc = dest.xml_document(&second.partname).unwrap();
        assert_eq!(text::paragraphs(doc.root())[0].text(), "Hello");
        // the template is not modified
        assert_eq!(engine.template().slide_count().unwrap(), 2);
    }

    #[test]
    fn test_render_rejects_bad_config_before_work() {
        let engine = TemplateEngine::from_bytes(sample_pptx()).unwrap();
        let config = TemplateConfig::new(vec![SlideJob::new(1), SlideJob::new(7)]);
        assert!(matches!(
            engine.render(&config),
            Err(crate::template::TemplateError::SlideIndexOutOfRange { index: 7, count: 2 })
        ));
    }

    #[test]
    fn test_run_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.pptx");
        let output = dir.path().join("out.pptx");
        std::fs::write(&template, sample_pptx()).unwrap();

        let json = r#"{"slides": [{"src_page": 1, "replace_texts": {"title": "T"}}]}"#;
        let report = run(&template, ConfigSource::Json(json.into()), &output, EngineOptions::default()).unwrap();
        assert_eq!(report.slides, 1);
        assert_eq!(Package::open(&output).unwrap().slide_count().unwrap(), 1);

        let failed = dir.path().join("failed.pptx");
        let bad = r#"{"slides": [{"src_page": 9}]}"#;
        assert!(run(&template, ConfigSource::Json(bad.into()), &failed, EngineOptions::default()).is_err());
        assert!(!failed.exists());
    }
}
