mod common;

use alloyext_core::{
    Account, Command, CommandError, ExtensionSettings, HandleStatus, InstanceManager,
    InstanceNamespace, LoadFailure, LoadState, LoaderError, CONFIGURE_COMMAND,
    LOAD_CANCELLED_REASON,
};
use common::{two_account_settings, FailingSource, GatedSource, ReadySource, RecordingLibrary};
use serde_json::json;
use std::sync::Arc;

fn start(settings: &ExtensionSettings) -> (InstanceManager, Vec<alloyext_core::ConfiguredInstance>) {
    let startup = InstanceManager::start(Arc::new(InstanceNamespace::new()), settings)
        .expect("valid settings");
    (startup.manager, startup.configured)
}

#[tokio::test]
async fn configures_each_instance_with_its_property_id() {
    let (manager, configured) = start(&two_account_settings());
    let library = RecordingLibrary::default();

    manager
        .load(&ReadySource(library.clone()))
        .await
        .expect("load succeeds");

    assert_eq!(
        library.calls_for("alloy1"),
        vec![Command::configure(json!({ "propertyID": "PR123" }))]
    );
    assert_eq!(
        library.calls_for("alloy2"),
        vec![Command::configure(json!({ "propertyID": "PR456" }))]
    );

    for instance in configured {
        let result = instance.configure.await.expect("configure resolves");
        assert_eq!(result["command"], json!(CONFIGURE_COMMAND));
        assert_eq!(result["instance"], json!(instance.instance_name));
    }
}

#[test]
fn creates_one_handle_per_instance_name() {
    let (manager, _configured) = start(&two_account_settings());
    assert_eq!(manager.namespace().names(), vec!["alloy1", "alloy2"]);
    for name in ["alloy1", "alloy2"] {
        let handle = manager.namespace().get(name).expect("handle registered");
        assert_eq!(handle.status(), HandleStatus::Pending { queued: 1 });
    }
}

#[test]
fn returns_instance_by_property_id() {
    let (manager, _configured) = start(&two_account_settings());

    let handle = manager.get_instance("PR456").expect("PR456 is configured");
    assert_eq!(handle.name(), "alloy2");
    assert!(handle.ptr_eq(&manager.namespace().get("alloy2").expect("alloy2")));
    assert!(manager
        .get_accessor("PR123")
        .expect("PR123 is configured")
        .ptr_eq(&manager.namespace().get("alloy1").expect("alloy1")));
    assert!(manager.get_instance("PR999").is_none());
}

#[tokio::test]
async fn queued_command_resolves_after_load() {
    let (manager, _configured) = start(&two_account_settings());
    let library = RecordingLibrary::default();
    let handle = manager.get_instance("PR123").expect("alloy1");

    let ecid = handle.invoke("getEcid", None);
    assert!(library.calls().is_empty());

    manager
        .load(&ReadySource(library.clone()))
        .await
        .expect("load succeeds");

    assert_eq!(ecid.await, Ok(json!("ecid-alloy1")));
    let names: Vec<String> = library
        .calls_for("alloy1")
        .into_iter()
        .map(|command| command.name)
        .collect();
    assert_eq!(names, vec!["configure", "getEcid"]);
}

#[tokio::test]
async fn preserves_fifo_order_per_handle() {
    let (manager, _configured) = start(&two_account_settings());
    let library = RecordingLibrary::default();
    let alloy1 = manager.get_instance("PR123").expect("alloy1");
    let alloy2 = manager.get_instance("PR456").expect("alloy2");

    let mut pending = Vec::new();
    for index in 0..5 {
        pending.push(alloy1.call(Command::with_payload("sendEvent", json!({ "seq": index }))));
        pending.push(alloy2.call(Command::with_payload("sendEvent", json!({ "seq": index }))));
    }

    let report = manager
        .load(&ReadySource(library.clone()))
        .await
        .expect("load succeeds");
    assert_eq!(report.upgraded, vec!["alloy1", "alloy2"]);
    assert_eq!(report.replayed, 12);

    for name in ["alloy1", "alloy2"] {
        let sequence: Vec<_> = library
            .calls_for(name)
            .into_iter()
            .skip(1)
            .map(|command| command.payload.expect("payload")["seq"].clone())
            .collect();
        assert_eq!(sequence, (0..5).map(|seq| json!(seq)).collect::<Vec<_>>());
    }
    for result in futures::future::join_all(pending).await {
        result.expect("every replayed command resolves");
    }
}

#[tokio::test]
async fn repeated_shim_creation_keeps_queue() {
    let (manager, _configured) = start(&two_account_settings());
    let library = RecordingLibrary::default();
    let handle = manager.namespace().create_shim("alloy1");
    let _ecid = handle.invoke("getEcid", None);

    let again = manager.namespace().create_shim("alloy1");
    assert!(again.ptr_eq(&handle));
    assert_eq!(again.status(), HandleStatus::Pending { queued: 2 });

    manager
        .load(&ReadySource(library.clone()))
        .await
        .expect("load succeeds");
    assert_eq!(library.calls_for("alloy1").len(), 2);
}

#[tokio::test]
async fn lookup_observes_upgrade() {
    let (manager, _configured) = start(&two_account_settings());
    let before = manager.get_instance("PR123").expect("alloy1");
    assert!(matches!(before.status(), HandleStatus::Pending { .. }));

    manager
        .load(&ReadySource(RecordingLibrary::default()))
        .await
        .expect("load succeeds");

    let after = manager.get_instance("PR123").expect("alloy1");
    assert!(after.ptr_eq(&before));
    assert_eq!(after.status(), HandleStatus::Ready);
    assert_eq!(before.invoke("getEcid", None).await, Ok(json!("ecid-alloy1")));
}

#[tokio::test]
async fn commands_issued_while_loading_are_queued_in_order() {
    let (manager, _configured) = start(&two_account_settings());
    let library = RecordingLibrary::default();
    let (source, gate) = GatedSource::new();
    let handle = manager.get_instance("PR456").expect("alloy2");

    let load = manager.load(&source);
    let release = async {
        let during = handle.invoke("getEcid", None);
        assert!(library.calls().is_empty());
        gate.send(Ok(Arc::new(library.clone())))
            .unwrap_or_else(|_| panic!("loader should be waiting"));
        during.await
    };
    let (report, ecid) = tokio::join!(load, release);

    report.expect("load succeeds");
    assert_eq!(ecid, Ok(json!("ecid-alloy2")));
    let names: Vec<String> = library
        .calls_for("alloy2")
        .into_iter()
        .map(|command| command.name)
        .collect();
    assert_eq!(names, vec!["configure", "getEcid"]);
    assert_eq!(manager.namespace().load_state(), LoadState::Loaded);
}

#[tokio::test]
async fn command_rejection_reaches_original_caller() {
    let (manager, _configured) = start(&two_account_settings());
    let handle = manager.get_instance("PR123").expect("alloy1");
    let queued = handle.invoke("explode", None);

    manager
        .load(&ReadySource(RecordingLibrary::default()))
        .await
        .expect("load succeeds");

    assert_eq!(queued.await, Err(CommandError::rejected("explode", "boom")));
    assert_eq!(
        handle.invoke("explode", None).await,
        Err(CommandError::rejected("explode", "boom"))
    );
}

#[tokio::test]
async fn load_failure_rejects_pending_and_future_commands() {
    let (manager, configured) = start(&two_account_settings());
    let handle = manager.get_instance("PR123").expect("alloy1");
    let queued = handle.invoke("getEcid", None);

    let err = manager
        .load(&FailingSource("script blocked"))
        .await
        .expect_err("load must fail");
    assert!(matches!(err, LoaderError::Failed(_)));
    assert_eq!(manager.namespace().pending_commands(), 0);

    let err = queued.await.expect_err("queued command rejects");
    assert!(matches!(
        err,
        CommandError::LibraryLoadFailed { ref instance_name, .. } if instance_name == "alloy1"
    ));
    for instance in configured {
        assert!(instance.configure.await.is_err());
    }

    let err = handle
        .invoke("getEcid", None)
        .await
        .expect_err("later command rejects immediately");
    assert!(matches!(err, CommandError::LibraryLoadFailed { .. }));
}

#[tokio::test]
async fn dropping_load_in_flight_rejects_queued_commands() {
    let (manager, configured) = start(&two_account_settings());
    let (source, _gate) = GatedSource::new();

    let mut load = Box::pin(manager.load(&source));
    assert!(futures::poll!(load.as_mut()).is_pending());
    assert_eq!(manager.namespace().load_state(), LoadState::Loading);
    drop(load);

    assert_eq!(
        manager.namespace().load_state(),
        LoadState::Failed(LoadFailure::new(LOAD_CANCELLED_REASON))
    );
    assert_eq!(manager.namespace().pending_commands(), 0);
    for instance in configured {
        let err = instance.configure.await.expect_err("configure must reject");
        assert!(matches!(
            err,
            CommandError::LibraryLoadFailed { ref failure, .. } if failure.reason == LOAD_CANCELLED_REASON
        ));
    }

    let err = manager
        .load(&ReadySource(RecordingLibrary::default()))
        .await
        .expect_err("cancelled load is final");
    assert_eq!(err, LoaderError::AlreadyTriggered);
}

#[test]
fn padded_identifiers_are_rejected() {
    let settings = ExtensionSettings {
        accounts: vec![Account::new("alloy ", " PR1")],
    };
    let namespace = Arc::new(InstanceNamespace::new());
    let err = InstanceManager::start(Arc::clone(&namespace), &settings)
        .expect_err("padded instance name");
    assert_eq!(err.code(), "padded_identifier");
    assert!(namespace.is_empty());
}

#[tokio::test]
async fn load_runs_once() {
    let (manager, _configured) = start(&two_account_settings());
    let library = RecordingLibrary::default();
    manager
        .load(&ReadySource(library.clone()))
        .await
        .expect("first load");

    let err = manager
        .load(&ReadySource(RecordingLibrary::default()))
        .await
        .expect_err("second load");
    assert_eq!(err, LoaderError::AlreadyTriggered);
    assert_eq!(library.calls().len(), 2);
}

#[test]
fn invalid_settings_are_reported() {
    let settings = ExtensionSettings {
        accounts: vec![Account::new("alloy", "PR1"), Account::new("alloy", "PR2")],
    };
    let namespace = Arc::new(InstanceNamespace::new());
    let err = InstanceManager::start(Arc::clone(&namespace), &settings)
        .expect_err("duplicate instance names");
    assert_eq!(err.code(), "duplicate_instance_name");
    assert!(namespace.is_empty());
}
