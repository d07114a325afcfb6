use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cropcut_common::error::{CropcutError, CropcutResult};
use cropcut_edit_model::metadata::SourceMetadata;
use cropcut_edit_model::session::EditSession;
use cropcut_edit_model::timeline::TrimInterval;
use cropcut_export::engine::ProgressSink;
use cropcut_export::{
    EncodedOutput, EncodingEngine, EngineLoader, ExportCompiler, ExportController, ExportPhase,
    ExportProgress, ExportRequest, PipelineDescription, ProgressCallback,
};
use tokio::sync::Notify;

#[derive(Default)]
struct FakeEngine {
    fractions: Vec<f64>,
    fail: bool,
    gate: Option<Arc<Notify>>,
    started: Arc<Notify>,
    delay: Option<Duration>,
    encodes: AtomicUsize,
}

#[async_trait]
impl EncodingEngine for FakeEngine {
    async fn encode(
        &self,
        pipeline: &PipelineDescription,
        _input: &Path,
        output: &Path,
        progress: &ProgressSink<'_>,
    ) -> CropcutResult<EncodedOutput> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        for fraction in &self.fractions {
            progress(*fraction);
        }
        if self.fail {
            return Err(CropcutError::engine("encoder crashed"));
        }
        Ok(EncodedOutput {
            path: output.to_path_buf(),
            container: pipeline.container.clone(),
            mime_type: pipeline.mime_type.clone(),
            size_bytes: 1024,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeLoader {
    engine: Arc<FakeEngine>,
    loads: Arc<AtomicUsize>,
    fail_first: AtomicBool,
}

impl FakeLoader {
    fn new(engine: FakeEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            loads: Arc::new(AtomicUsize::new(0)),
            fail_first: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EngineLoader for FakeLoader {
    async fn load(&self) -> CropcutResult<Arc<dyn EncodingEngine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_first.swap(false, Ordering::SeqCst) {
            return Err(CropcutError::unsupported("engine assets failed to load"));
        }
        let engine: Arc<dyn EncodingEngine> = self.engine.clone();
        Ok(engine)
    }
}

fn controller(engine: FakeEngine) -> ExportController<FakeLoader> {
    ExportController::new(FakeLoader::new(engine), ExportCompiler::default())
}

fn request() -> ExportRequest {
    let metadata = SourceMetadata::new(10.0, 1920, 1080);
    let mut session = EditSession::for_source(&metadata);
    session.trim = TrimInterval::new(1.0, 5.0);
    ExportRequest {
        input: PathBuf::from("/videos/demo.webm"),
        output: PathBuf::from("/tmp/cropcut-test-exports/demo_edited.mp4"),
        session,
        metadata,
    }
}

fn recorder() -> (Arc<Mutex<Vec<ExportProgress>>>, ProgressCallback) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p));
    (seen, callback)
}

#[tokio::test]
async fn engine_is_loaded_once() {
    let loader = FakeLoader::new(FakeEngine::default());
    let loads = Arc::clone(&loader.loads);
    let controller = ExportController::new(loader, ExportCompiler::default());

    controller.export(request(), None).await.unwrap();
    controller.export(request(), None).await.unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_engine_load_is_retried() {
    let loader = FakeLoader::new(FakeEngine::default());
    loader.fail_first.store(true, Ordering::SeqCst);
    let engine = Arc::clone(&loader.engine);
    let loads = Arc::clone(&loader.loads);
    let controller = ExportController::new(loader, ExportCompiler::default());

    let err = controller.export(request(), None).await.unwrap_err();
    assert!(matches!(err, CropcutError::Unsupported { .. }));
    assert!(!controller.is_exporting());

    controller.export(request(), None).await.unwrap();
    controller.export(request(), None).await.unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    assert_eq!(engine.encodes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn second_export_is_rejected_while_first_runs() {
    let gate = Arc::new(Notify::new());
    let started = Arc::new(Notify::new());
    let controller = Arc::new(controller(FakeEngine {
        gate: Some(Arc::clone(&gate)),
        started: Arc::clone(&started),
        ..FakeEngine::default()
    }));

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.export(request(), None).await })
    };
    started.notified().await;
    assert!(controller.is_exporting());

    let err = controller.export(request(), None).await.unwrap_err();
    assert!(matches!(err, CropcutError::ExportInProgress));

    gate.notify_one();
    let output = first.await.unwrap().unwrap();
    assert_eq!(output.mime_type, "video/mp4");
    assert!(!controller.is_exporting());
}

#[tokio::test]
async fn progress_is_monotonic_and_completes() {
    let controller = controller(FakeEngine {
        fractions: vec![0.1, 0.05, 0.6, 0.6, 1.0],
        ..FakeEngine::default()
    });
    let (seen, callback) = recorder();
    controller.export(request(), Some(callback)).await.unwrap();

    let seen = seen.lock().unwrap();
    let percents: Vec<f64> = seen.iter().map(|p| p.percent).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(seen.first().map(|p| p.phase), Some(ExportPhase::Preparing));
    assert_eq!(seen.last().map(|p| p.percent), Some(100.0));
    assert_eq!(seen.last().map(|p| p.phase), Some(ExportPhase::Complete));
}

#[tokio::test]
async fn failure_resets_in_flight_state() {
    let controller = controller(FakeEngine {
        fail: true,
        fractions: vec![0.3],
        ..FakeEngine::default()
    });
    let (seen, callback) = recorder();

    let err = controller.export(request(), Some(callback)).await.unwrap_err();
    assert!(matches!(err, CropcutError::Engine { .. }));
    assert!(!controller.is_exporting());
    assert!(seen.lock().unwrap().iter().all(|p| p.percent < 100.0));

    // The flag is clear, so the next attempt reaches the engine again.
    let err = controller.export(request(), None).await.unwrap_err();
    assert!(matches!(err, CropcutError::Engine { .. }));
}

#[tokio::test]
async fn compile_errors_never_reach_the_engine() {
    let loader = FakeLoader::new(FakeEngine::default());
    let engine = Arc::clone(&loader.engine);
    let controller = ExportController::new(loader, ExportCompiler::default());

    let mut req = request();
    req.session.trim = TrimInterval::new(3.0, 30.0);
    let err = controller.export(req, None).await.unwrap_err();
    assert!(matches!(err, CropcutError::Export { .. }));
    assert_eq!(engine.encodes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_export_times_out() {
    let controller = controller(FakeEngine {
        delay: Some(Duration::from_secs(30)),
        ..FakeEngine::default()
    })
    .with_timeout(Some(Duration::from_millis(50)));

    let err = controller.export(request(), None).await.unwrap_err();
    assert!(matches!(err, CropcutError::Timeout { .. }));
    assert!(!controller.is_exporting());
}
