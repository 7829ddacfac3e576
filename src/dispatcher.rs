//! Search dispatch.
//!
//! One inbound intent walks
//! `Start -> Classifying -> (Normalizing -> Uploading)? -> Templating -> Delivered`,
//! or drops into `Failed` from any non-terminal state. Whatever happens, the
//! platform sees exactly one `toast_and_finish` per dispatch.

use crate::classifier::{classify, classify_api, UrlPolicy};
use crate::config::Config;
use crate::engines::Engine;
use crate::error::{Error, Result};
use crate::imaging;
use crate::intent::Intent;
use crate::platform::Platform;
use crate::types::{SearchRequest, Subject};
use crate::upload::{ImageHost, Resmush};
use image::DynamicImage;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// How the subject and engine are read from the inbound intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Organic view/send/process-text event aimed at one engine.
    Share(Engine),
    /// Custom action from the public API; the engine travels in the intent.
    Api,
}

#[derive(Debug)]
pub enum DispatchState {
    Start,
    Classifying,
    Normalizing { uri: String, engine: Engine },
    Uploading { image: DynamicImage, engine: Engine },
    Templating { url: String, engine: Engine },
    Delivered { engine: Engine, query_url: String },
    Failed(Error),
}

impl DispatchState {
    pub fn name(&self) -> &'static str {
        match self {
            DispatchState::Start => "Start",
            DispatchState::Classifying => "Classifying",
            DispatchState::Normalizing { .. } => "Normalizing",
            DispatchState::Uploading { .. } => "Uploading",
            DispatchState::Templating { .. } => "Templating",
            DispatchState::Delivered { .. } => "Delivered",
            DispatchState::Failed(_) => "Failed",
        }
    }
}

/// Terminal result of one dispatch.
#[derive(Debug)]
pub enum Outcome {
    Delivered { engine: Engine, query_url: String },
    Failed(Error),
}

impl Outcome {
    /// The user-visible notification text.
    pub fn message(&self) -> String {
        match self {
            Outcome::Delivered { engine, .. } => format!("Searching with {}", engine),
            Outcome::Failed(e) => e.to_string(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }
}

pub struct Dispatcher {
    platform: Arc<dyn Platform>,
    host: Arc<dyn ImageHost>,
    policy: UrlPolicy,
    pixel_budget: u32,
}

impl Dispatcher {
    pub fn new(
        platform: Arc<dyn Platform>,
        host: Arc<dyn ImageHost>,
        policy: UrlPolicy,
        pixel_budget: u32,
    ) -> Self {
        Self {
            platform,
            host,
            policy,
            pixel_budget,
        }
    }

    /// Dispatcher uploading to the configured reSmush.it endpoint.
    pub fn from_config(config: &Config, platform: Arc<dyn Platform>) -> Result<Self> {
        Ok(Self::new(
            platform,
            Arc::new(Resmush::from_config(config)?),
            config.url_policy,
            config.pixel_budget,
        ))
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Spawn one dispatch on `runtime`. Nothing is shared with other
    /// dispatches; dropping the handle abandons the task.
    pub fn launch(self: &Arc<Self>, runtime: &Handle, intent: Intent, route: Route) -> JoinHandle<Outcome> {
        let this = Arc::clone(self);
        runtime.spawn(async move { this.dispatch(&intent, route).await })
    }

    /// Run the whole pipeline for `intent` and emit its single terminal
    /// notification.
    pub async fn dispatch(&self, intent: &Intent, route: Route) -> Outcome {
        let mut state = DispatchState::Start;
        let outcome = loop {
            state = match state {
                DispatchState::Delivered { engine, query_url } => {
                    info!("opened {} search: {}", engine, query_url);
                    break Outcome::Delivered { engine, query_url };
                }
                DispatchState::Failed(e) => {
                    error!("dispatch of {:?} failed: {}", intent.action(), e);
                    break Outcome::Failed(e);
                }
                current => {
                    let from = current.name();
                    let next = self.step(current, intent, route).await;
                    debug!("{} -> {}", from, next.name());
                    next
                }
            };
        };

        self.platform.toast_and_finish(&outcome.message());
        outcome
    }

    async fn step(&self, state: DispatchState, intent: &Intent, route: Route) -> DispatchState {
        match state {
            DispatchState::Start => DispatchState::Classifying,
            DispatchState::Classifying => {
                let classified = match route {
                    Route::Share(engine) => classify(intent, engine, &self.policy),
                    Route::Api => classify_api(intent, &self.policy),
                };
                match classified {
                    Ok(SearchRequest {
                        subject: Subject::Url(url),
                        engine,
                    }) => DispatchState::Templating { url, engine },
                    Ok(SearchRequest {
                        subject: Subject::LocalImage(uri),
                        engine,
                    }) => DispatchState::Normalizing { uri, engine },
                    Err(e) => DispatchState::Failed(e),
                }
            }
            DispatchState::Normalizing { uri, engine } => match self.normalize(&uri).await {
                Ok(image) => DispatchState::Uploading { image, engine },
                Err(e) => DispatchState::Failed(e),
            },
            // The decoded image is dropped at the end of this arm.
            DispatchState::Uploading { image, engine } => match self.host.upload(&image).await {
                Ok(url) => DispatchState::Templating { url, engine },
                Err(e) => DispatchState::Failed(Error::UploadFailed(e)),
            },
            DispatchState::Templating { url, engine } => {
                let query_url = engine.query_url(&url);
                match self.platform.start_activity(&Intent::view(query_url.as_str())) {
                    Ok(()) => DispatchState::Delivered { engine, query_url },
                    Err(e @ Error::DeliveryFailed(_)) => DispatchState::Failed(e),
                    Err(e) => DispatchState::Failed(Error::DeliveryFailed(e.to_string())),
                }
            }
            terminal @ (DispatchState::Delivered { .. } | DispatchState::Failed(_)) => terminal,
        }
    }

    async fn normalize(&self, uri: &str) -> Result<DynamicImage> {
        let bytes = self.platform.read_content(uri).await.map_err(|e| match e {
            Error::ImageProcessingFailed(_) => e,
            other => Error::ImageProcessingFailed(other.to_string()),
        })?;

        let budget = self.pixel_budget;
        tokio::task::spawn_blocking(move || imaging::normalize(&bytes, budget))
            .await
            .map_err(|e| Error::ImageProcessingFailed(e.to_string()))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::intent::{ACTION_PROCESS_TEXT, ACTION_SEND, ACTION_VIEW, EXTRA_PROCESS_TEXT, EXTRA_STREAM, EXTRA_TEXT, FLAG_NEW_TASK};
    use crate::types::UpdateInfo;
    use async_trait::async_trait;
    use bytes::Bytes;
    use image::{ImageFormat, RgbImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingPlatform {
        pub content: HashMap<String, Vec<u8>>,
        pub fail_delivery: bool,
        pub launched: Mutex<Vec<Intent>>,
        pub messages: Mutex<Vec<String>>,
        pub results: Mutex<Vec<Intent>>,
        pub updates: Mutex<Vec<UpdateInfo>>,
    }

    impl RecordingPlatform {
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }

        pub fn launched(&self) -> Vec<Intent> {
            self.launched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Platform for RecordingPlatform {
        async fn read_content(&self, uri: &str) -> Result<Bytes> {
            self.content
                .get(uri)
                .map(|b| Bytes::from(b.clone()))
                .ok_or_else(|| Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, uri.to_string())))
        }

        fn start_activity(&self, intent: &Intent) -> Result<()> {
            if self.fail_delivery {
                return Err(Error::Io(std::io::Error::other("no activity found")));
            }
            self.launched.lock().unwrap().push(intent.clone());
            Ok(())
        }

        fn toast_and_finish(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }

        fn set_result(&self, result: Intent) {
            self.results.lock().unwrap().push(result);
        }

        fn notify_update(&self, info: &UpdateInfo) {
            self.updates.lock().unwrap().push(info.clone());
        }
    }

    pub(crate) struct FakeHost {
        pub result: std::result::Result<String, u16>,
        pub seen: Mutex<Vec<(u32, u32)>>,
    }

    impl FakeHost {
        pub fn ok(url: &str) -> Self {
            Self {
                result: Ok(url.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(code: u16) -> Self {
            Self {
                result: Err(code),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageHost for FakeHost {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn upload(&self, image: &DynamicImage) -> std::result::Result<String, UploadError> {
            self.seen.lock().unwrap().push((image.width(), image.height()));
            self.result.clone().map_err(UploadError::Status)
        }
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn dispatcher(platform: Arc<RecordingPlatform>, host: Arc<FakeHost>) -> Dispatcher {
        Dispatcher::new(platform, host, UrlPolicy::default(), 65_536)
    }

    #[tokio::test]
    async fn test_search_by_url_end_to_end() {
        let platform = Arc::new(RecordingPlatform::default());
        let host = Arc::new(FakeHost::ok("unused"));
        let intent = Intent::new(ACTION_PROCESS_TEXT).put_extra(EXTRA_PROCESS_TEXT, "http://a.com/i.jpg");

        let outcome = dispatcher(platform.clone(), host.clone())
            .dispatch(&intent, Route::Share(Engine::SauceNao))
            .await;

        assert!(outcome.is_delivered());
        let launched = platform.launched();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].action(), Some(ACTION_VIEW));
        assert_eq!(
            launched[0].data.as_deref(),
            Some("https://saucenao.com/search.php?url=http%3A%2F%2Fa.com%2Fi.jpg")
        );
        assert_eq!(launched[0].flags & FLAG_NEW_TASK, FLAG_NEW_TASK);
        assert_eq!(platform.messages(), vec!["Searching with SauceNAO".to_string()]);
        assert!(host.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_image_is_scaled_and_uploaded() {
        let mut platform = RecordingPlatform::default();
        platform
            .content
            .insert("content://media/1".to_string(), png_bytes(600, 400));
        let platform = Arc::new(platform);
        let host = Arc::new(FakeHost::ok("https://hosted.example.com/x.jpg"));
        let intent = Intent::new(ACTION_SEND)
            .with_type("image/png")
            .put_extra(EXTRA_STREAM, "content://media/1");

        let outcome = dispatcher(platform.clone(), host.clone())
            .dispatch(&intent, Route::Share(Engine::Iqdb))
            .await;

        assert!(outcome.is_delivered());
        let seen = host.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0 * seen[0].1 <= 65_536);
        assert_eq!(
            platform.launched()[0].data.as_deref(),
            Some("http://iqdb.org/?url=https%3A%2F%2Fhosted.example.com%2Fx.jpg")
        );
        assert_eq!(platform.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_message_carries_code() {
        let mut platform = RecordingPlatform::default();
        platform
            .content
            .insert("content://media/1".to_string(), png_bytes(8, 8));
        let platform = Arc::new(platform);
        let intent = Intent::new(ACTION_VIEW)
            .with_type("image/jpeg")
            .with_data("content://media/1");

        let outcome = dispatcher(platform.clone(), Arc::new(FakeHost::failing(413)))
            .dispatch(&intent, Route::Share(Engine::default()))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(Error::UploadFailed(UploadError::Status(413)))
        ));
        let messages = platform.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("413"), "{}", messages[0]);
        assert!(platform.launched().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_image_fails_processing() {
        let mut platform = RecordingPlatform::default();
        platform
            .content
            .insert("content://media/1".to_string(), b"garbage".to_vec());
        let platform = Arc::new(platform);
        let host = Arc::new(FakeHost::ok("unused"));
        let intent = Intent::new(ACTION_SEND)
            .with_type("image/png")
            .with_clip("content://media/1");

        let outcome = dispatcher(platform.clone(), host.clone())
            .dispatch(&intent, Route::Share(Engine::default()))
            .await;

        assert!(matches!(outcome, Outcome::Failed(Error::ImageProcessingFailed(_))));
        assert!(host.seen.lock().unwrap().is_empty());
        assert_eq!(platform.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_content_fails_processing() {
        let platform = Arc::new(RecordingPlatform::default());
        let intent = Intent::new(ACTION_SEND)
            .with_type("image/png")
            .put_extra(EXTRA_STREAM, "content://missing");

        let outcome = dispatcher(platform.clone(), Arc::new(FakeHost::ok("unused")))
            .dispatch(&intent, Route::Share(Engine::default()))
            .await;

        assert!(matches!(outcome, Outcome::Failed(Error::ImageProcessingFailed(_))));
    }

    #[tokio::test]
    async fn test_classification_failures_are_terminal() {
        let cases = vec![
            (Intent::new("android.intent.action.EDIT"), "unsupported request"),
            (Intent::new(ACTION_SEND), "does not contain"),
            (
                Intent::new(ACTION_VIEW).put_extra(EXTRA_TEXT, "not a url"),
                "not a valid URL",
            ),
        ];

        for (intent, expected) in cases {
            let platform = Arc::new(RecordingPlatform::default());
            let outcome = dispatcher(platform.clone(), Arc::new(FakeHost::ok("unused")))
                .dispatch(&intent, Route::Share(Engine::default()))
                .await;

            assert!(!outcome.is_delivered());
            let messages = platform.messages();
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains(expected), "{}", messages[0]);
            assert!(platform.launched().is_empty());
        }
    }

    #[tokio::test]
    async fn test_delivery_failure() {
        let platform = Arc::new(RecordingPlatform {
            fail_delivery: true,
            ..Default::default()
        });
        let intent = Intent::new(ACTION_VIEW).with_data("https://example.com/cat.png");

        let outcome = dispatcher(platform.clone(), Arc::new(FakeHost::ok("unused")))
            .dispatch(&intent, Route::Share(Engine::Yandex))
            .await;

        assert!(matches!(outcome, Outcome::Failed(Error::DeliveryFailed(_))));
        assert_eq!(platform.messages(), vec!["could not open result: IO error: no activity found".to_string()]);
    }

    #[tokio::test]
    async fn test_api_route_reads_engine_from_intent() {
        let platform = Arc::new(RecordingPlatform::default());
        let intent = crate::facade::search_image_url_intent("http://a.com/i.jpg", Engine::TraceMoe);

        let outcome = dispatcher(platform.clone(), Arc::new(FakeHost::ok("unused")))
            .dispatch(&intent, Route::Api)
            .await;

        assert!(outcome.is_delivered());
        assert_eq!(
            platform.launched()[0].data.as_deref(),
            Some("https://trace.moe/?auto&url=http%3A%2F%2Fa.com%2Fi.jpg")
        );
    }

    #[tokio::test]
    async fn test_launch_runs_independent_requests() {
        let platform = Arc::new(RecordingPlatform::default());
        let dispatcher = Arc::new(dispatcher(platform.clone(), Arc::new(FakeHost::ok("unused"))));
        let runtime = Handle::current();

        let first = dispatcher.launch(
            &runtime,
            Intent::new(ACTION_VIEW).with_data("https://example.com/1.png"),
            Route::Share(Engine::GoogleLens),
        );
        let second = dispatcher.launch(
            &runtime,
            Intent::new(ACTION_VIEW).put_extra(EXTRA_TEXT, "nope"),
            Route::Share(Engine::Ascii2d),
        );

        let (first, second) = futures::future::join(first, second).await;
        assert!(first.unwrap().is_delivered());
        assert!(!second.unwrap().is_delivered());
        assert_eq!(platform.messages().len(), 2);
        assert_eq!(platform.launched().len(), 1);
    }
}
