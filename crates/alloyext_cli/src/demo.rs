//! In-process SDK stand-in for smoke runs.

use alloyext_core::{
    Command, CommandError, CommandResult, LibrarySource, LoadFailure, SdkInstance, SdkLibrary,
};
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};

/// Library source that resolves to [`DemoLibrary`] or fails on request.
pub struct DemoSource {
    pub fail_with: Option<String>,
}

impl LibrarySource for DemoSource {
    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn SdkLibrary>, LoadFailure>> {
        let outcome = match &self.fail_with {
            Some(reason) => Err(LoadFailure::new(reason.clone())),
            None => Ok(Arc::new(DemoLibrary) as Arc<dyn SdkLibrary>),
        };
        async move {
            tokio::task::yield_now().await;
            outcome
        }
        .boxed()
    }
}

struct DemoLibrary;

impl SdkLibrary for DemoLibrary {
    fn create_instance(&self, instance_name: &str) -> Arc<dyn SdkInstance> {
        Arc::new(DemoInstance {
            instance_name: instance_name.to_string(),
            config: Mutex::new(None),
        })
    }
}

struct DemoInstance {
    instance_name: String,
    config: Mutex<Option<Value>>,
}

impl SdkInstance for DemoInstance {
    fn invoke(&self, command: Command) -> BoxFuture<'static, CommandResult> {
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        let configured = config.is_some();
        let Command { name, payload } = command;
        let result = match (name.as_str(), configured) {
            ("configure", false) => {
                *config = payload;
                Ok(json!({ "instanceName": self.instance_name }))
            }
            ("configure", true) => Err(CommandError::rejected(
                name.clone(),
                "instance is already configured",
            )),
            (_, false) => Err(CommandError::rejected(
                name.clone(),
                "configure must be called first",
            )),
            ("getEcid", true) => {
                let property_id = config
                    .as_ref()
                    .and_then(|config| config["propertyID"].as_str())
                    .unwrap_or_default();
                Ok(json!(format!("demo-{}-{property_id}", self.instance_name)))
            }
            (_, true) => Ok(Value::Null),
        };
        async move { result }.boxed()
    }
}
