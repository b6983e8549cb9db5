#![allow(dead_code)]

use alloyext_core::{
    Account, Command, CommandError, CommandResult, ExtensionSettings, LibrarySource, LoadFailure,
    SdkInstance, SdkLibrary,
};
use futures::future::{BoxFuture, FutureExt};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub type CallLog = Arc<Mutex<Vec<(String, Command)>>>;

/// SDK stub that records every submitted command per instance.
#[derive(Default, Clone)]
pub struct RecordingLibrary {
    calls: CallLog,
}

impl RecordingLibrary {
    pub fn calls(&self) -> Vec<(String, Command)> {
        self.calls.lock().expect("call log lock").clone()
    }

    pub fn calls_for(&self, instance_name: &str) -> Vec<Command> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name == instance_name)
            .map(|(_, command)| command)
            .collect()
    }
}

impl SdkLibrary for RecordingLibrary {
    fn create_instance(&self, instance_name: &str) -> Arc<dyn SdkInstance> {
        Arc::new(RecordingInstance {
            instance_name: instance_name.to_string(),
            calls: Arc::clone(&self.calls),
        })
    }
}

struct RecordingInstance {
    instance_name: String,
    calls: CallLog,
}

impl SdkInstance for RecordingInstance {
    fn invoke(&self, command: Command) -> BoxFuture<'static, CommandResult> {
        self.calls
            .lock()
            .expect("call log lock")
            .push((self.instance_name.clone(), command.clone()));

        let result = match command.name.as_str() {
            "getEcid" => Ok(json!(format!("ecid-{}", self.instance_name))),
            "explode" => Err(CommandError::rejected("explode", "boom")),
            _ => Ok(json!({ "instance": self.instance_name, "command": command.name })),
        };
        async move { result }.boxed()
    }
}

/// Source that yields the library immediately.
pub struct ReadySource(pub RecordingLibrary);

impl LibrarySource for ReadySource {
    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn SdkLibrary>, LoadFailure>> {
        let library: Arc<dyn SdkLibrary> = Arc::new(self.0.clone());
        async move { Ok(library) }.boxed()
    }
}

/// Source that always fails.
pub struct FailingSource(pub &'static str);

impl LibrarySource for FailingSource {
    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn SdkLibrary>, LoadFailure>> {
        let failure = LoadFailure::new(self.0);
        async move { Err(failure) }.boxed()
    }
}

/// Source whose load completes when the test releases the gate.
pub struct GatedSource {
    gate: Mutex<Option<oneshot::Receiver<Result<Arc<dyn SdkLibrary>, LoadFailure>>>>,
}

pub type Gate = oneshot::Sender<Result<Arc<dyn SdkLibrary>, LoadFailure>>;

impl GatedSource {
    pub fn new() -> (Self, Gate) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                gate: Mutex::new(Some(receiver)),
            },
            sender,
        )
    }
}

impl LibrarySource for GatedSource {
    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn SdkLibrary>, LoadFailure>> {
        let receiver = self.gate.lock().expect("gate lock").take();
        async move {
            match receiver {
                Some(receiver) => receiver
                    .await
                    .unwrap_or_else(|_| Err(LoadFailure::new("gate dropped"))),
                None => Err(LoadFailure::new("gate already used")),
            }
        }
        .boxed()
    }
}

pub fn two_account_settings() -> ExtensionSettings {
    ExtensionSettings {
        accounts: vec![
            Account::new("alloy1", "PR123"),
            Account::new("alloy2", "PR456"),
        ],
    }
}
