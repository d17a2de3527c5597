//! GoodputRecorder behaviour against a recording backend
//!
//! Run with: cargo test --test recorder_test

#[path = "support/mock_backend.rs"]
mod mock_backend;

use goodput_recorder::backend::{GcpOptions, MonitorOptions};
use goodput_recorder::config::ConfigError;
use goodput_recorder::{
    Event, GoodputRecorder, RecorderConfig, RecorderError, RecorderFlags, StaticEnvironment,
};
use mock_backend::{Call, Failures, RecordingBackend};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

fn recorder_with(
    config: RecorderConfig,
    backend: &RecordingBackend,
    process_index: usize,
    jax_backend: &str,
) -> GoodputRecorder {
    GoodputRecorder::new(
        config,
        Arc::new(backend.clone()),
        Arc::new(StaticEnvironment::new(process_index, Some(jax_backend.into()))),
    )
}

fn config(name: &str, upload_dir: &str, upload_interval: u64) -> RecorderConfig {
    RecorderConfig::builder()
        .name(name)
        .upload_dir(upload_dir)
        .upload_interval(upload_interval)
        .build()
        .unwrap()
}

fn rolling_config(sizes: Vec<u32>) -> RecorderConfig {
    RecorderConfig::builder()
        .name("test-rolling")
        .upload_dir("/test")
        .upload_interval(30)
        .rolling_window_size(sizes)
        .build()
        .unwrap()
}

fn expected_options(name: &str, upload_dir: &str, pathway_enabled: bool) -> MonitorOptions {
    MonitorOptions {
        job_name: name.to_string(),
        logger_name: format!("goodput_logger_{name}"),
        upload_dir: upload_dir.to_string(),
        upload_interval: 30,
        monitoring_enabled: true,
        pathway_enabled,
        include_badput_breakdown: true,
        gcp_options: None,
    }
}

// ============== Construction ==============

#[test]
fn test_from_flags() {
    let cases: [(&[&str], Vec<u32>); 2] = [
        (&[], vec![]),
        (&["rolling_window_size=1,2,3"], vec![1, 2, 3]),
    ];

    for (extra, expected_rolling_window_size) in cases {
        let mut recorder_spec = vec![
            "name=test-name".to_string(),
            "upload_dir=/test/path".to_string(),
            "upload_interval=15".to_string(),
        ];
        recorder_spec.extend(extra.iter().map(|s| s.to_string()));
        let flags = RecorderFlags {
            recorder_type: Some("goodput".into()),
            recorder_spec,
            jax_backend: Some("tpu".into()),
        };

        let backend = RecordingBackend::new();
        let recorder = GoodputRecorder::from_flags(
            &flags,
            Arc::new(backend.clone()),
            Arc::new(StaticEnvironment::from_flags(&flags, 0)),
        )
        .unwrap();

        assert_eq!(recorder.config().name(), "test-name");
        assert_eq!(recorder.config().upload_dir(), "/test/path");
        assert_eq!(recorder.config().upload_interval(), 15);
        assert_eq!(
            recorder.config().rolling_window_size(),
            expected_rolling_window_size.as_slice()
        );
        // Construction alone never touches the backend
        assert!(backend.calls().is_empty());
    }
}

#[test]
fn test_from_flags_missing_required() {
    let flags = RecorderFlags {
        recorder_type: Some("goodput".into()),
        recorder_spec: vec!["name=test-name".into()],
        jax_backend: Some("tpu".into()),
    };
    let result = GoodputRecorder::from_flags(
        &flags,
        Arc::new(RecordingBackend::new()),
        Arc::new(StaticEnvironment::default()),
    );

    match result {
        Err(RecorderError::ConfigError(ConfigError::RequiredFieldMissing(field))) => {
            assert_eq!(field, "upload_dir")
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("construction should fail without upload_dir"),
    }
}

#[test]
fn test_from_spec_missing_interval() {
    let result = GoodputRecorder::from_spec(
        ["name=test-name", "upload_dir=/test/path"],
        Arc::new(RecordingBackend::new()),
        Arc::new(StaticEnvironment::default()),
    );
    let err = result.err().expect("construction should fail");
    assert!(err.to_string().contains("upload_interval"));
}

// ============== Event timing ==============

#[test]
fn test_record_event_scope() {
    let backend = RecordingBackend::new();
    let recorder = recorder_with(config("test", "/tmp/test", 1), &backend, 0, "tpu");

    {
        let scope = recorder.record_event(Event::Job).unwrap();
        assert!(scope.is_active());
        assert_eq!(scope.event(), Event::Job);
    }

    assert_eq!(
        backend.calls(),
        vec![
            Call::CreateEventTimer {
                job_name: "test".into(),
                logger_name: "goodput_logger_test".into(),
            },
            Call::RecordStart(Event::Job),
            Call::RecordEnd(Event::Job),
        ]
    );
}

#[test]
fn test_record_event_end_recorded_on_panic() {
    let backend = RecordingBackend::new();
    let recorder = recorder_with(config("test", "/tmp/test", 1), &backend, 0, "tpu");

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _scope = recorder.record_event(Event::Job).unwrap();
        panic!("training step failed");
    }));
    assert!(outcome.is_err());

    assert_eq!(backend.count(&Call::RecordStart(Event::Job)), 1);
    assert_eq!(backend.count(&Call::RecordEnd(Event::Job)), 1);
    let calls = backend.calls();
    assert_eq!(calls.last(), Some(&Call::RecordEnd(Event::Job)));
}

#[test]
fn test_record_event_end_recorded_on_early_return() {
    fn failing_step(recorder: &GoodputRecorder) -> Result<(), String> {
        let _scope = recorder.record_event(Event::Step).map_err(|e| e.to_string())?;
        Err("data exhausted".to_string())
    }

    let backend = RecordingBackend::new();
    let recorder = recorder_with(config("test", "/tmp/test", 1), &backend, 0, "tpu");

    assert!(failing_step(&recorder).is_err());
    assert_eq!(backend.count(&Call::RecordStart(Event::Step)), 1);
    assert_eq!(backend.count(&Call::RecordEnd(Event::Step)), 1);
}

#[test]
fn test_event_timer_created_once() {
    let backend = RecordingBackend::new();
    let recorder = recorder_with(config("test", "/tmp/test", 1), &backend, 0, "tpu");

    let job = recorder.record_event(Event::Job).unwrap();
    for _ in 0..3 {
        recorder.with_event(Event::Step, || ()).unwrap();
    }
    drop(job);

    let created = backend
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::CreateEventTimer { .. }))
        .count();
    assert_eq!(created, 1);
    assert_eq!(backend.count(&Call::RecordStart(Event::Step)), 3);
    assert_eq!(backend.count(&Call::RecordEnd(Event::Step)), 3);
    assert_eq!(backend.calls().last(), Some(&Call::RecordEnd(Event::Job)));
}

#[test]
fn test_record_failures_do_not_abort_scope() {
    let backend = RecordingBackend::failing(Failures {
        record: true,
        ..Default::default()
    });
    let recorder = recorder_with(config("test", "/tmp/test", 1), &backend, 0, "tpu");

    let value = recorder.with_event(Event::DataLoading, || 42).unwrap();
    assert_eq!(value, 42);
    assert_eq!(backend.count(&Call::RecordStart(Event::DataLoading)), 1);
    assert_eq!(backend.count(&Call::RecordEnd(Event::DataLoading)), 1);
}

// ============== Goodput monitoring ==============

#[test]
fn test_maybe_monitor_goodput() {
    for (jax_backend, is_pathways_job) in [("tpu", false), ("proxy", true)] {
        let backend = RecordingBackend::new();
        let recorder = recorder_with(config("test-monitor", "/test", 30), &backend, 0, jax_backend);

        {
            let scope = recorder.maybe_monitor_goodput().unwrap();
            assert!(scope.is_active());
        }

        assert_eq!(
            backend.calls(),
            vec![
                Call::CreateMonitor(expected_options("test-monitor", "/test", is_pathways_job)),
                Call::StartGoodput,
                Call::StopGoodput,
            ]
        );
    }
}

#[test]
fn test_maybe_monitor_goodput_with_gcp_metrics() {
    let backend = RecordingBackend::new();
    let config = RecorderConfig::from_spec([
        "name=test-monitor",
        "upload_dir=/test",
        "upload_interval=30",
        "enable_gcp_goodput_metrics=true",
        "include_badput_breakdown=false",
    ])
    .unwrap();
    let recorder = recorder_with(config, &backend, 0, "tpu");

    recorder.maybe_monitor_goodput().unwrap().finish().unwrap();

    let created = backend.monitors_created();
    assert_eq!(created.len(), 1);
    assert!(!created[0].include_badput_breakdown);
    assert_eq!(
        created[0].gcp_options,
        Some(GcpOptions {
            enable_gcp_goodput_metrics: true,
            enable_gcp_step_deviation_metrics: false,
        })
    );
}

#[test]
fn test_explicit_pathways_flag_overrides_backend() {
    let backend = RecordingBackend::new();
    let config = RecorderConfig::builder()
        .name("test-monitor")
        .upload_dir("/test")
        .upload_interval(30)
        .enable_pathways_goodput(true)
        .build()
        .unwrap();
    let recorder = recorder_with(config, &backend, 0, "tpu");

    recorder.maybe_monitor_goodput().unwrap().finish().unwrap();
    assert!(backend.monitors_created()[0].pathway_enabled);
}

#[test]
fn test_maybe_monitor_rolling_window() {
    let cases = [
        (true, vec![10, 20], false, "tpu"),
        (false, vec![], false, "tpu"),
        (true, vec![50], true, "proxy"),
    ];

    for (is_rolling_window_enabled, rolling_window_size, is_pathways_job, jax_backend) in cases {
        let backend = RecordingBackend::new();
        let recorder = recorder_with(
            rolling_config(rolling_window_size.clone()),
            &backend,
            0,
            jax_backend,
        );

        {
            let scope = recorder.maybe_monitor_rolling_window_goodput().unwrap();
            assert_eq!(scope.is_active(), is_rolling_window_enabled);
        }

        if !is_rolling_window_enabled {
            assert!(backend.calls().is_empty());
            continue;
        }

        assert_eq!(
            backend.calls(),
            vec![
                Call::CreateMonitor(expected_options(
                    "test-rolling",
                    "/test/rolling_window_test-rolling",
                    is_pathways_job
                )),
                Call::StartRollingWindow(rolling_window_size),
                Call::StopRollingWindow,
            ]
        );
    }
}

#[test]
fn test_rolling_window_explicit_disable() {
    let backend = RecordingBackend::new();
    let config = RecorderConfig::builder()
        .name("test-rolling")
        .upload_dir("/test")
        .upload_interval(30)
        .rolling_window_size(vec![10, 20])
        .enable_rolling_window_goodput_monitoring(false)
        .build()
        .unwrap();
    let recorder = recorder_with(config, &backend, 0, "tpu");

    let scope = recorder.maybe_monitor_rolling_window_goodput().unwrap();
    assert!(!scope.is_active());
    drop(scope);
    assert!(backend.calls().is_empty());
}

#[test]
fn test_rolling_window_explicit_enable_without_sizes() {
    let backend = RecordingBackend::new();
    let config = RecorderConfig::from_spec([
        "name=test-rolling",
        "upload_dir=/test",
        "upload_interval=30",
        "enable_rolling_window_goodput_monitoring=true",
    ])
    .unwrap();
    let recorder = recorder_with(config, &backend, 0, "tpu");

    recorder
        .maybe_monitor_rolling_window_goodput()
        .unwrap()
        .finish()
        .unwrap();
    assert!(backend.calls().is_empty());
}

#[test]
fn test_monitor_all_stops_in_reverse_order() {
    let backend = RecordingBackend::new();
    let recorder = recorder_with(rolling_config(vec![10]), &backend, 0, "tpu");

    let group = recorder.maybe_monitor_all_goodput().unwrap();
    assert!(group.cumulative().is_active());
    assert!(group.rolling_window().is_active());
    drop(group);

    let lifecycle: Vec<Call> = backend
        .calls()
        .into_iter()
        .filter(|c| !matches!(c, Call::CreateMonitor(_)))
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            Call::StartGoodput,
            Call::StartRollingWindow(vec![10]),
            Call::StopRollingWindow,
            Call::StopGoodput,
        ]
    );
}

// ============== Non-coordinator processes ==============

#[test]
fn test_non_zero_process_index_skips_monitoring() {
    let backend = RecordingBackend::new();
    let recorder = recorder_with(config("test", "/test", 30), &backend, 1, "tpu");

    recorder.maybe_monitor_goodput().unwrap().finish().unwrap();
    assert!(backend.calls().is_empty());

    let recorder_rolling = recorder_with(rolling_config(vec![10, 20]), &backend, 1, "tpu");
    recorder_rolling
        .maybe_monitor_rolling_window_goodput()
        .unwrap()
        .finish()
        .unwrap();
    assert!(backend.calls().is_empty());

    {
        let scope = recorder.record_event(Event::Job).unwrap();
        assert!(!scope.is_active());
    }
    assert!(backend.calls().is_empty());
}

// ============== Failure handling ==============

#[test]
fn test_monitor_construction_failure_propagates() {
    let backend = RecordingBackend::failing(Failures {
        create_monitor: true,
        ..Default::default()
    });
    let recorder = recorder_with(config("test", "/test", 30), &backend, 0, "tpu");

    let result = recorder.maybe_monitor_goodput();
    assert!(matches!(result, Err(RecorderError::BackendError(_))));
    assert_eq!(backend.count(&Call::StartGoodput), 0);
    assert_eq!(backend.count(&Call::StopGoodput), 0);
}

#[test]
fn test_start_failure_skips_stop() {
    let backend = RecordingBackend::failing(Failures {
        start: true,
        ..Default::default()
    });
    let recorder = recorder_with(config("test", "/test", 30), &backend, 0, "tpu");

    assert!(recorder.maybe_monitor_goodput().is_err());
    assert_eq!(backend.count(&Call::StartGoodput), 1);
    assert_eq!(backend.count(&Call::StopGoodput), 0);
}

#[test]
fn test_rolling_start_failure_stops_cumulative() {
    let backend = RecordingBackend::failing(Failures {
        start_rolling_window: true,
        ..Default::default()
    });
    let recorder = recorder_with(rolling_config(vec![5]), &backend, 0, "tpu");

    assert!(recorder.maybe_monitor_all_goodput().is_err());
    assert_eq!(backend.count(&Call::StartGoodput), 1);
    assert_eq!(backend.count(&Call::StartRollingWindow(vec![5])), 1);
    assert_eq!(backend.count(&Call::StopRollingWindow), 0);
    assert_eq!(backend.count(&Call::StopGoodput), 1);
}

#[test]
fn test_finish_reports_stop_failure() {
    let backend = RecordingBackend::failing(Failures {
        stop: true,
        ..Default::default()
    });
    let recorder = recorder_with(config("test", "/test", 30), &backend, 0, "tpu");

    let scope = recorder.maybe_monitor_goodput().unwrap();
    assert!(matches!(scope.finish(), Err(RecorderError::BackendError(_))));
    // Stop is attempted exactly once even though it failed
    assert_eq!(backend.count(&Call::StopGoodput), 1);
}

#[test]
fn test_dropped_scope_stops_once_despite_failure() {
    let backend = RecordingBackend::failing(Failures {
        stop: true,
        ..Default::default()
    });
    let recorder = recorder_with(config("test", "/test", 30), &backend, 0, "tpu");

    drop(recorder.maybe_monitor_goodput().unwrap());
    assert_eq!(backend.count(&Call::StopGoodput), 1);
}
