//! Extractor double that answers each download call from a script.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use vdq_core::extractor::{
    DownloadOutput, DownloadRequest, Extractor, ExtractorError, FetchOptions, ProgressEvent,
    ProgressSink,
};
use vdq_core::media::MediaInfo;

/// What one download call does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Report progress events, write `<stem>.<ext>` and succeed.
    Succeed {
        ext: &'static str,
        progress: Vec<ProgressEvent>,
    },
    Fail(ExtractorError),
    /// Sleep, then run the inner step.
    After(Duration, Box<Step>),
    /// Panic inside the download call.
    Panic,
}

impl Step {
    pub fn ok() -> Self {
        Step::Succeed {
            ext: "mp4",
            progress: vec![
                ProgressEvent {
                    downloaded_bytes: 512,
                    total_bytes: Some(2048),
                    speed_bytes_per_sec: Some(4096.0),
                    eta_secs: Some(1),
                },
                ProgressEvent {
                    downloaded_bytes: 2048,
                    total_bytes: Some(2048),
                    speed_bytes_per_sec: Some(4096.0),
                    eta_secs: Some(0),
                },
            ],
        }
    }

    pub fn after_ms(ms: u64, step: Step) -> Self {
        Step::After(Duration::from_millis(ms), Box::new(step))
    }

    pub fn unavailable() -> Self {
        Step::Fail(ExtractorError::FormatUnavailable("Requested format is not available".into()))
    }
}

/// Pops one step per download call; when the script is empty, `fallback` is used.
/// A step pinned to a selector with `on_selector` takes precedence.
pub struct ScriptedExtractor {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    pinned: HashMap<String, Step>,
    selectors: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            pinned: HashMap::new(),
            selectors: Mutex::new(Vec::new()),
        }
    }

    /// Every download with exactly this selector runs `step`.
    pub fn on_selector(mut self, selector: &str, step: Step) -> Self {
        self.pinned.insert(selector.to_string(), step);
        self
    }

    pub fn always(step: Step) -> Self {
        Self::new(Vec::new(), step)
    }

    /// Selectors passed to `download`, in call order.
    pub fn selectors(&self) -> Vec<String> {
        self.selectors.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn fetch_metadata(&self, url: &str, _opts: FetchOptions) -> Result<MediaInfo, ExtractorError> {
        Err(ExtractorError::ExtractionFailed(format!("no metadata scripted for {url}")))
    }

    async fn download(
        &self,
        req: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutput, ExtractorError> {
        self.selectors.lock().unwrap().push(req.selector.clone());
        let mut step = match self.pinned.get(&req.selector) {
            Some(pinned) => pinned.clone(),
            None => self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone()),
        };
        while let Step::After(delay, inner) = step {
            tokio::time::sleep(delay).await;
            step = *inner;
        }
        match step {
            Step::Succeed { ext, progress } => {
                for event in progress {
                    sink.on_progress(event);
                }
                let path = req.output_dir.join(format!("{}.{ext}", req.output_stem));
                tokio::fs::write(&path, b"media").await.unwrap();
                Ok(DownloadOutput {
                    extension: ext.to_string(),
                })
            }
            Step::Fail(e) => Err(e),
            Step::Panic => panic!("scripted download panicked on {}", req.selector),
            Step::After(..) => unreachable!("delays are unwrapped above"),
        }
    }
}
