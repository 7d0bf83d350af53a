//! Shared fixtures for the engine test modules

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use chargen_domain::{
    BuilderKey, ChoiceOption, NumericStep, SelectStep, SourceData, Step, StepList, TextStep,
    Wizard,
};

use crate::content::SourceCache;
use crate::ports::{SourceLoadError, SourceLoaderPort};
use crate::registry::BuilderRegistry;
use crate::session::SessionService;

/// Route engine logs into test output; honors `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Counting loader serving the swordsman rules document, optionally failing
/// its first call.
pub(crate) struct ScriptedLoader {
    pub(crate) calls: AtomicUsize,
    fail_first: bool,
}

impl ScriptedLoader {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_first: false,
        })
    }

    pub(crate) fn failing_once() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_first: true,
        })
    }
}

#[async_trait]
impl SourceLoaderPort for ScriptedLoader {
    async fn fetch(&self, _builder_key: &BuilderKey) -> Result<SourceData, SourceLoadError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        if self.fail_first && call == 0 {
            return Err(SourceLoadError::Io("transient".to_string()));
        }
        Ok(SourceData::new(swordsman_source()))
    }
}

pub(crate) fn swordsman_source() -> Value {
    json!({
        "classes": [
            {"value": "fighter", "label": "Fighter"},
            {"value": "ranger", "label": "Ranger"}
        ]
    })
}

/// Three-step fixture wizard: required name, class from source content, and
/// a defaulted level that cascades.
pub(crate) fn swordsman_wizard() -> Wizard {
    let steps = StepList::new(vec![
        Step::new("name", TextStep::new())
            .with_label("Character name")
            .writes_to("identity.name"),
        Step::new(
            "class",
            SelectStep::new(|source: &SourceData, _| {
                source
                    .array_at("classes")
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| {
                                Some(ChoiceOption::new(
                                    item.get("value")?.as_str()?,
                                    item.get("label")?.as_str()?,
                                ))
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            }),
        )
        .writes_to("class"),
        Step::new("level", NumericStep::fixed(1, 10).default_to(1)).writes_to("level"),
    ]);

    Wizard::new("swordsman", steps)
        .with_title("Swordsman Builder")
        .with_pdf_fields(|_, data| {
            [
                (
                    "CharacterName".to_string(),
                    data.str_at("identity.name").unwrap_or_default().to_string(),
                ),
                (
                    "Class".to_string(),
                    data.str_at("class").unwrap_or_default().to_string(),
                ),
                (
                    "Level".to_string(),
                    data.i64_at("level").unwrap_or(1).to_string(),
                ),
            ]
            .into_iter()
            .collect()
        })
}

pub(crate) fn swordsman_registry() -> Arc<BuilderRegistry> {
    let mut registry = BuilderRegistry::new();
    registry.register(swordsman_wizard());
    Arc::new(registry)
}

/// Session service wired to the fixture registry and the given loader.
pub(crate) fn scripted_service(loader: Arc<ScriptedLoader>) -> Arc<SessionService> {
    let cache = Arc::new(SourceCache::new(loader));
    Arc::new(SessionService::new(swordsman_registry(), cache))
}
