use std::sync::Arc;

use anyhow::Result;
use futures_util::future::try_join_all;
use futures_util::stream::{self, StreamExt};
use image::RgbaImage;
use tracing::{debug, info};

use crate::ocr::{DetectionConfig, TextDetector, TextRegion, merge_detections};
use crate::page::{Page, PageState};
use crate::render::{InpaintMode, OverlayStyle, inpaint, overlay_text};
use crate::translate::{TranslateApi, TranslateOptions};

#[derive(Clone)]
pub struct PipelineConfig {
    pub detection: DetectionConfig,
    pub options: TranslateOptions,
    pub inpaint_mode: InpaintMode,
    pub style: OverlayStyle,
    /// Pages processed at once; per-page region fan-out stays unbounded.
    pub page_concurrency: usize,
}

/// Drives pages through detect -> merge -> translate -> inpaint -> overlay,
/// owning the per-page state machine.
///
/// Stages run strictly in order. The first failing stage marks the page
/// Failed with the error chain as the message and aborts the rest of the
/// run; no partial results are committed. Pages are independent: a failure
/// never affects another page or the store.
pub struct Pipeline<D, T> {
    detector: D,
    translator: T,
    config: PipelineConfig,
}

impl<D: TextDetector, T: TranslateApi> Pipeline<D, T> {
    pub fn new(detector: D, translator: T, config: PipelineConfig) -> Self {
        Self {
            detector,
            translator,
            config,
        }
    }

    /// Runs the full pipeline for one page. Also used for explicit
    /// re-processing: prior regions and output are discarded up front.
    pub async fn process_page(&self, page: &Arc<Page>) -> PageState {
        if page.is_cancelled() {
            return page.state();
        }
        page.set_state(PageState::Processing);
        page.set_regions(Vec::new());
        page.set_processed(None);
        debug!("page {}: processing started", page.id());

        match self.run_stages(page).await {
            Ok(Some(image)) => {
                page.set_processed(Some(image));
                page.set_state(PageState::Completed);
                info!("page {}: completed", page.id());
            }
            Ok(None) => {
                debug!("page {}: cancelled, result discarded", page.id());
            }
            Err(err) => {
                let message = format!("{:#}", err);
                info!("page {}: failed: {}", page.id(), message);
                page.set_state(PageState::Failed(message));
            }
        }
        page.state()
    }

    /// Processes pages concurrently, at most `page_concurrency` in flight.
    pub async fn process_pages(&self, pages: &[Arc<Page>]) {
        stream::iter(pages)
            .map(|page| self.process_page(page))
            .buffer_unordered(self.config.page_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
    }

    async fn run_stages(&self, page: &Arc<Page>) -> Result<Option<Arc<RgbaImage>>> {
        let original = page.original();
        let (width, height) = (original.width(), original.height());

        let detections = self
            .detector
            .detect(Arc::clone(&original), &self.config.detection)
            .await?;
        if page.is_cancelled() {
            return Ok(None);
        }
        let regions = merge_detections(detections, width, height);
        debug!("page {}: {} text region(s) after merge", page.id(), regions.len());
        page.set_regions(regions.clone());

        let regions = self.translate_regions(regions).await?;
        if page.is_cancelled() {
            return Ok(None);
        }
        page.set_regions(regions.clone());

        // Inpaint works on the original image; the overlay goes on top of
        // the inpainted result.
        let inpainted = inpaint(&original, &regions, self.config.inpaint_mode)?;
        if page.is_cancelled() {
            return Ok(None);
        }
        let final_image = overlay_text(&inpainted, &regions, &self.config.style)?;
        if page.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(Arc::new(final_image)))
    }

    /// One independent translation call per region, all in flight at once.
    /// The first failure cancels the wait and fails the batch; a partially
    /// translated region list is never committed.
    async fn translate_regions(&self, regions: Vec<TextRegion>) -> Result<Vec<TextRegion>> {
        let calls = regions
            .iter()
            .map(|region| {
                self.translator
                    .translate(&region.original_text, &self.config.options)
            })
            .collect::<Vec<_>>();
        let translations = try_join_all(calls).await?;

        Ok(regions
            .into_iter()
            .zip(translations)
            .map(|(mut region, translation)| {
                region.translated_text = Some(translation.translated_text);
                region
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::ocr::{DetectFuture, NormBox, RawDetection};
    use crate::render::OverlayFont;
    use crate::translate::{TranslateFuture, Translation};

    #[derive(Clone)]
    struct StubDetector {
        detections: Vec<RawDetection>,
    }

    impl TextDetector for StubDetector {
        fn detect(&self, _image: Arc<RgbaImage>, _config: &DetectionConfig) -> DetectFuture {
            let detections = self.detections.clone();
            Box::pin(async move { Ok(detections) })
        }
    }

    #[derive(Clone, Default)]
    struct StubTranslator {
        fail_on: Option<String>,
    }

    impl TranslateApi for StubTranslator {
        fn translate(&self, text: &str, options: &TranslateOptions) -> TranslateFuture {
            let text = text.to_string();
            let fail_on = self.fail_on.clone();
            let target = options.target_lang.clone();
            Box::pin(async move {
                if fail_on.as_deref() == Some(text.as_str()) {
                    return Err(
                        PipelineError::TranslationApi("provider rejected request".into()).into(),
                    );
                }
                Ok(Translation {
                    translated_text: format!("[{}] {}", target, text),
                    original_text: text,
                    confidence: 0.9,
                })
            })
        }
    }

    fn det(x: f32, y: f32, w: f32, h: f32, text: &str) -> RawDetection {
        RawDetection {
            bbox: NormBox { x, y, w, h },
            text: text.to_string(),
        }
    }

    fn pipeline(
        detector: StubDetector,
        translator: StubTranslator,
    ) -> Pipeline<StubDetector, StubTranslator> {
        Pipeline::new(
            detector,
            translator,
            PipelineConfig {
                detection: DetectionConfig::default(),
                options: TranslateOptions {
                    source_lang: "ko".to_string(),
                    target_lang: "en".to_string(),
                },
                inpaint_mode: InpaintMode::Blur,
                style: OverlayStyle::new("en", OverlayFont::default()),
                page_concurrency: 2,
            },
        )
    }

    fn white_page() -> Arc<Page> {
        Page::new(RgbaImage::from_pixel(
            100,
            100,
            image::Rgba([255, 255, 255, 255]),
        ))
    }

    #[tokio::test]
    async fn successful_run_completes_with_output() {
        let pipeline = pipeline(
            StubDetector {
                detections: vec![det(0.1, 0.6, 0.3, 0.1, "안녕")],
            },
            StubTranslator::default(),
        );
        let page = white_page();

        let state = pipeline.process_page(&page).await;
        assert_eq!(state, PageState::Completed);

        let processed = page.processed().expect("processed image");
        assert_eq!((processed.width(), processed.height()), (100, 100));
        let regions = page.regions();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].translated_text.as_deref(), Some("[en] 안녕"));
    }

    #[tokio::test]
    async fn one_failing_translation_fails_the_whole_page() {
        let pipeline = pipeline(
            StubDetector {
                detections: vec![
                    det(0.0, 0.875, 0.1, 0.05, "one"),
                    det(0.8, 0.125, 0.1, 0.05, "two"),
                ],
            },
            StubTranslator {
                fail_on: Some("two".to_string()),
            },
        );
        let page = white_page();

        let state = pipeline.process_page(&page).await;
        assert!(matches!(state, PageState::Failed(_)));
        assert!(page.processed().is_none());
        // The merged regions were committed, but no translation was.
        assert!(page.regions().iter().all(|r| r.translated_text.is_none()));
    }

    #[tokio::test]
    async fn failure_message_carries_the_error_detail() {
        let pipeline = pipeline(
            StubDetector {
                detections: vec![det(0.1, 0.6, 0.3, 0.1, "bad")],
            },
            StubTranslator {
                fail_on: Some("bad".to_string()),
            },
        );
        let page = white_page();

        match pipeline.process_page(&page).await {
            PageState::Failed(message) => {
                assert!(message.contains("provider rejected request"), "{message}");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn cancelled_page_commits_nothing() {
        let pipeline = pipeline(
            StubDetector {
                detections: vec![det(0.1, 0.6, 0.3, 0.1, "text")],
            },
            StubTranslator::default(),
        );
        let page = white_page();
        page.cancel();

        let state = pipeline.process_page(&page).await;
        assert_eq!(state, PageState::Pending);
        assert!(page.regions().is_empty());
        assert!(page.processed().is_none());
    }

    #[tokio::test]
    async fn empty_detection_set_still_completes() {
        let pipeline = pipeline(StubDetector { detections: vec![] }, StubTranslator::default());
        let page = white_page();

        let state = pipeline.process_page(&page).await;
        assert_eq!(state, PageState::Completed);
        assert!(page.regions().is_empty());
        assert!(page.processed().is_some());
    }

    #[tokio::test]
    async fn batch_processing_is_per_page_isolated() {
        let pipeline = pipeline(
            StubDetector {
                detections: vec![det(0.1, 0.6, 0.3, 0.1, "boom")],
            },
            StubTranslator {
                fail_on: Some("boom".to_string()),
            },
        );
        let ok_page = white_page();
        let bad_page = white_page();
        // The failing page detects "boom"; give the good one no regions.
        let ok_pipeline = super::Pipeline {
            detector: StubDetector { detections: vec![] },
            translator: StubTranslator::default(),
            config: pipeline.config.clone(),
        };

        ok_pipeline.process_pages(std::slice::from_ref(&ok_page)).await;
        pipeline.process_pages(std::slice::from_ref(&bad_page)).await;

        assert_eq!(ok_page.state(), PageState::Completed);
        assert!(matches!(bad_page.state(), PageState::Failed(_)));
    }
}
