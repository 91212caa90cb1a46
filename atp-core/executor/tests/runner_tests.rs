//! 运行器集成测试
//!
//! 通过公开 API 验证即时执行、作用域栈嵌套和各容器的失败语义。
//!
//! 运行方法:
//! ```bash
//! RUST_LOG=debug cargo test --test runner_tests -- --nocapture
//! ```

use atp_executor::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

fn counting_action(
    counter: &Arc<AtomicUsize>,
) -> impl Fn(&TestContext) -> Result<()> + Send + Sync + 'static {
    let counter = counter.clone();
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 测试用例中第 `index` 个顶层动作的容器视图
fn root_container(runner: &TestRunner, index: usize) -> &dyn ActionContainer {
    runner.test_case().actions()[index]
        .as_container()
        .expect("top-level action should be a container")
}

// ============================================
// 即时执行与嵌套
// ============================================

#[test]
fn test_leaf_actions_execute_immediately() {
    init_tracing();

    let mut runner = TestRunner::new("immediate");
    runner.create_variable("greeting", "hello").unwrap();
    assert_eq!(runner.context().get_string("greeting").unwrap(), "hello");

    runner.echo("${greeting} world").unwrap();
    runner.stop_time("timer").unwrap();
    runner.stop_time("timer").unwrap();
    runner.trace_variables().unwrap();

    assert!(runner.context().contains_variable("timer_ms"));
    assert_eq!(runner.test_case().action_count(), 5);
    assert_eq!(
        runner.test_case().last_executed_action().unwrap().name(),
        "trace-variables"
    );
    runner.stop().unwrap();
    assert!(runner.test_case().result().unwrap().is_success());
}

#[test]
fn test_builtin_test_name_variable() {
    let mut runner = TestRunner::new("named_test");
    runner.start().unwrap();
    assert_eq!(
        runner.context().get_string("atp.test.name").unwrap(),
        "named_test"
    );
}

#[test]
fn test_three_level_nesting_attaches_to_scope_top() {
    init_tracing();

    let counter = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("nested");

    runner
        .repeat(RepeatUntilTrue::builder("i ge 3"), |r| {
            r.sequential(|r| {
                r.parallel(|r| {
                    r.action("left", counting_action(&counter))?;
                    r.action("right", counting_action(&counter))
                })
            })
        })
        .unwrap();

    // 循环两轮, 每轮并行执行两个动作
    assert_eq!(counter.load(Ordering::SeqCst), 4);
    assert_eq!(runner.test_case().action_count(), 1);
    assert_eq!(runner.context().get_string("i").unwrap(), "3");

    let repeat = root_container(&runner, 0);
    assert_eq!(repeat.action_count(), 1);

    let sequence = repeat.actions()[0].as_container().unwrap();
    assert_eq!(sequence.action_count(), 1);

    let parallel = sequence.actions()[0].as_container().unwrap();
    assert_eq!(parallel.action_count(), 2);

    let records = parallel.executed_actions();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.executions == 2));
}

#[test]
fn test_declarative_children_precede_scoped_children() {
    let mut runner = TestRunner::new("declarative");
    let declared: ActionRef = Arc::new(EchoAction::new("declared"));

    runner
        .container(SequenceBuilder::new().actions([declared]), |r| r.echo("scoped"))
        .unwrap();

    let sequence = root_container(&runner, 0);
    assert_eq!(sequence.action_count(), 2);
    assert_eq!(sequence.executed_actions().len(), 2);
}

// ============================================
// 顺序与并行
// ============================================

#[test]
fn test_sequential_stops_at_first_failure() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("sequential");

    let error = runner
        .sequential(|r| {
            r.action("one", counting_action(&counter))?;
            r.action("two", counting_action(&counter))?;
            r.fail("third failed")?;
            r.action("four", counting_action(&counter))
        })
        .unwrap_err();

    assert_eq!(error.message(), "third failed");
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    let sequence = root_container(&runner, 0);
    assert_eq!(sequence.action_count(), 4);
    assert_eq!(sequence.executed_actions().len(), 3);
    assert_eq!(
        sequence.executed_actions()[2].status,
        ActionStatus::Failed
    );
}

#[test]
fn test_failure_aborts_remaining_test() {
    let mut runner = TestRunner::new("abort");
    runner.fail("boom").unwrap_err();

    let later = runner.echo("never").unwrap_err();
    assert_eq!(later.message(), "boom");
    assert_eq!(runner.test_case().action_count(), 1);

    let error = runner.stop().unwrap_err();
    assert_eq!(error.message(), "boom");
}

#[test]
fn test_parallel_single_failure_records_all_children() {
    init_tracing();

    let counter = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("parallel");

    let error = runner
        .parallel(|r| {
            r.action("a", counting_action(&counter))?;
            r.run(Arc::new(
                FailAction::new("only failure").with_kind(FailureKind::VALIDATION),
            ))?;
            r.action("c", counting_action(&counter))?;
            r.sleep(Duration::from_millis(10))
        })
        .unwrap_err();

    assert_eq!(error.message(), "only failure");
    assert_eq!(error.kind(), FailureKind::VALIDATION);
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    let parallel = root_container(&runner, 0);
    let records = parallel.executed_actions();
    assert_eq!(records.len(), 4);
    assert_eq!(
        records
            .iter()
            .filter(|record| record.status == ActionStatus::Failed)
            .count(),
        1
    );
}

#[test]
fn test_parallel_shares_context() {
    let mut runner = TestRunner::new("parallel_context");

    runner
        .parallel(|r| {
            for n in 0..8 {
                r.create_variable(format!("var_{}", n), n)?;
            }
            Ok(())
        })
        .unwrap();

    for n in 0..8 {
        assert_eq!(
            runner.context().get_variable(&format!("var_{}", n)).unwrap(),
            n
        );
    }
}

// ============================================
// 循环
// ============================================

#[test]
fn test_repeat_string_condition() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut runner = TestRunner::new("repeat");

    let record = seen.clone();
    runner
        .repeat(
            RepeatUntilTrue::builder("index >= 5")
                .index("index")
                .start_from(2),
            |r| {
                r.action("record", move |context| {
                    let index = context.get_variable("index")?;
                    record.lock().push(index.as_i64().unwrap_or_default());
                    Ok(())
                })
            },
        )
        .unwrap();

    assert_eq!(*seen.lock(), vec![2, 3, 4]);
    assert_eq!(runner.context().get_variable("index").unwrap(), 5);
}

#[test]
fn test_repeat_callback_condition() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("repeat_callback");

    runner
        .repeat(
            RepeatUntilTrue::builder(IterationCondition::callback(|index, _| index > 5))
                .index("index")
                .start_from(2),
            |r| r.action("count", counting_action(&counter)),
        )
        .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 4);
    assert_eq!(runner.context().get_variable("index").unwrap(), 6);
}

#[test]
fn test_iterate_while_condition() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("iterate");

    runner
        .iterate(
            Iterate::builder("index < 5").index("index").start_from(2),
            |r| r.action("count", counting_action(&counter)),
        )
        .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(runner.context().get_variable("index").unwrap(), 5);
}

#[test]
fn test_repeat_on_error_uses_configured_sleep() {
    let mut config = ExecutorConfig::default();
    config.runner.repeat_on_error_sleep_ms = 0;

    let attempts = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("retry").with_config(&config).unwrap();

    let inner = attempts.clone();
    runner
        .repeat_on_error(RepeatOnErrorUntilTrue::builder("i gt 5"), |r| {
            r.action("flaky", move |_| {
                if inner.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(ExecutorError::runtime("not ready"));
                }
                Ok(())
            })
        })
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let container = runner.test_case().actions()[0].clone();
    let records = container.as_container().unwrap().executed_actions();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].executions, 3);
    assert!(records[0].is_success());
}

// ============================================
// 条件
// ============================================

#[test]
fn test_conditional_runs_or_skips() {
    let mut runner = TestRunner::new("conditional");
    runner.create_variable("mode", "fast").unwrap();

    runner
        .conditional(Conditional::builder("mode == \"fast\""), |r| {
            r.create_variable("fast_path", true)
        })
        .unwrap();
    runner
        .conditional(Conditional::builder("mode == \"slow\""), |r| {
            r.create_variable("slow_path", true)
        })
        .unwrap();

    assert!(runner.context().contains_variable("fast_path"));
    assert!(!runner.context().contains_variable("slow_path"));
}

#[test]
fn test_conditional_quoted_operator_words() {
    let mut runner = TestRunner::new("conditional_quoted");
    runner.create_variable("mode", "rock and roll").unwrap();
    runner.create_variable("pair", "a = b").unwrap();

    runner
        .conditional(
            Conditional::builder("mode == \"rock and roll\" and pair = \"a = b\""),
            |r| r.create_variable("hit", true),
        )
        .unwrap();

    assert!(runner.context().contains_variable("hit"));
}

// ============================================
// 异常捕获与断言
// ============================================

#[test]
fn test_catch_matching_kind_succeeds() {
    let mut runner = TestRunner::new("catch");

    runner
        .catch_exception(Catch::builder().exception(FailureKind::RUNTIME), |r| {
            r.echo("before")?;
            r.run(Arc::new(
                FailAction::new("validation failed").with_kind(FailureKind::VALIDATION),
            ))?;
            r.echo("after")
        })
        .unwrap();

    runner.echo("test continues").unwrap();
    assert_eq!(runner.test_case().action_count(), 2);
    assert_eq!(root_container(&runner, 0).executed_actions().len(), 2);
    runner.stop().unwrap();
}

#[test]
fn test_catch_other_kind_rethrows() {
    let mut runner = TestRunner::new("catch_other");

    let error = runner
        .catch_exception(Catch::builder().exception(FailureKind::VALIDATION), |r| {
            r.fail("generic failure")
        })
        .unwrap_err();

    assert_eq!(error.kind(), FailureKind::RUNTIME);
    assert_eq!(error.message(), "generic failure");
}

#[test]
fn test_assert_expected_failure() {
    let mut runner = TestRunner::new("assert");
    runner.create_variable("code", "42").unwrap();

    runner
        .assert_exception(
            Assert::builder()
                .exception("runtime")
                .message("error ${code}"),
            |r| r.fail("error ${code}"),
        )
        .unwrap();

    runner.stop().unwrap();
}

#[test]
fn test_assert_child_success_fails() {
    let mut runner = TestRunner::new("assert_success");

    let error = runner
        .assert_exception(Assert::builder(), |r| r.echo("no failure"))
        .unwrap_err();

    assert!(matches!(error, ExecutorError::ExpectationNotMet(_)));
}

#[test]
fn test_assert_mismatch_propagates_cause() {
    let mut runner = TestRunner::new("assert_mismatch");

    let error = runner
        .assert_exception(Assert::builder().message("expected text"), |r| {
            r.fail("actual text")
        })
        .unwrap_err();

    assert_eq!(error.message(), "actual text");
    assert_eq!(error.kind(), FailureKind::RUNTIME);
}

#[test]
fn test_assert_child_count_is_build_error() {
    let mut runner = TestRunner::new("assert_build");

    let error = runner
        .assert_exception(Assert::builder(), |r| {
            r.echo("one")?;
            r.echo("two")
        })
        .unwrap_err();

    assert!(error.is_build_error());
    assert_eq!(runner.scope_depth(), 0);
    assert_eq!(runner.test_case().action_count(), 0);
}

#[test]
fn test_nested_assert_build_error_surfaces_at_close() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("assert_nested_build");

    let error = runner
        .sequential(|r| {
            r.action("before", counting_action(&counter))?;
            r.assert_exception(Assert::builder(), |_| Ok(()))
        })
        .unwrap_err();

    assert!(matches!(error, ExecutorError::Configuration(_)));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_assert_build_error_fails_test() {
    let mut runner = TestRunner::new("assert_build_fails");

    runner
        .assert_exception(Assert::builder(), |_| Ok(()))
        .unwrap_err();

    let later = runner.echo("never").unwrap_err();
    assert!(later.is_build_error());
    assert_eq!(runner.test_case().action_count(), 0);

    let error = runner.stop().unwrap_err();
    assert!(matches!(error, ExecutorError::Configuration(_)));
    assert!(runner.test_case().result().unwrap().is_failed());
    assert!(!runner.test_case().report().passed);
}

// ============================================
// 模板
// ============================================

fn template_registry() -> Arc<TemplateRegistry> {
    let registry = Arc::new(TemplateRegistry::new());
    registry
        .register(TemplateDefinition::new(
            "set-inner",
            vec![Arc::new(CreateVariablesAction::new().variable("inner", "x is ${x}")) as ActionRef],
        ))
        .unwrap();
    registry
}

#[test]
fn test_template_isolated_context() {
    let mut runner = TestRunner::new("template_local").with_templates(template_registry());

    runner
        .apply_template(
            Template::builder("set-inner")
                .parameter("x", "1")
                .global_context(false),
        )
        .unwrap();

    assert!(!runner.context().contains_variable("x"));
    assert!(!runner.context().contains_variable("inner"));
    assert_eq!(runner.test_case().actions()[0].name(), "template:set-inner");
}

#[test]
fn test_template_global_context() {
    let mut runner = TestRunner::new("template_global").with_templates(template_registry());

    runner
        .apply_template(Template::builder("set-inner").parameter("x", "1"))
        .unwrap();

    assert_eq!(runner.context().get_string("x").unwrap(), "1");
    assert_eq!(runner.context().get_string("inner").unwrap(), "x is 1");
}

#[test]
fn test_template_default_from_config() {
    let mut config = ExecutorConfig::default();
    config.runner.template_global_context = false;

    let mut runner = TestRunner::new("template_config")
        .with_templates(template_registry())
        .with_config(&config)
        .unwrap();

    runner
        .apply_template(Template::builder("set-inner").parameter("x", "1"))
        .unwrap();

    assert!(!runner.context().contains_variable("inner"));
}

#[test]
fn test_template_not_found() {
    let mut runner = TestRunner::new("template_missing");

    let error = runner
        .apply_template(Template::builder("missing"))
        .unwrap_err();

    assert!(matches!(error, ExecutorError::TemplateNotFound(ref name) if name == "missing"));
    assert!(error.is_build_error());
    assert_eq!(runner.test_case().action_count(), 0);
}

#[test]
fn test_template_not_found_fails_test() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("template_missing_fails");
    runner
        .do_finally(|r| r.action("cleanup", counting_action(&cleanups)))
        .unwrap();

    runner
        .apply_template(Template::builder("missing"))
        .unwrap_err();
    runner.echo("never").unwrap_err();

    let error = runner.stop().unwrap_err();
    assert!(matches!(error, ExecutorError::TemplateNotFound(_)));
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    assert!(!runner.test_case().report().passed);
}

#[test]
fn test_variable_initialization_failure_fails_test() {
    let mut runner = TestRunner::new("variable_init");
    runner.variable("url", "http://${missing}").unwrap();
    runner.variable("later", "set").unwrap();

    let first = runner.echo("one").unwrap_err();
    assert_eq!(first.kind(), FailureKind::VARIABLE);

    runner.echo("two").unwrap_err();
    assert!(!runner.context().contains_variable("later"));
    assert!(runner.stop().is_err());
}

// ============================================
// finally 与报告
// ============================================

#[test]
fn test_finally_runs_after_failure() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let mut runner = TestRunner::new("finally");

    runner
        .do_finally(|r| r.action("cleanup", counting_action(&cleanups)))
        .unwrap();
    assert_eq!(cleanups.load(Ordering::SeqCst), 0);

    runner.fail("test failed").unwrap_err();
    let error = runner.stop().unwrap_err();

    assert_eq!(error.message(), "test failed");
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(runner.test_case().final_actions().len(), 1);
}

#[test]
fn test_report_contains_nested_steps() {
    let mut runner = TestRunner::new("report").with_description("nested report");

    runner
        .sequential(|r| {
            r.echo("first")?;
            r.catch_exception(Catch::builder(), |r| r.fail("swallowed"))
        })
        .unwrap();
    runner.stop().unwrap();

    let report = runner.test_case().report();
    assert!(report.passed);
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].children.len(), 2);
    assert_eq!(report.steps[0].children[1].children[0].status, ActionStatus::Failed);

    let json = report.to_json().unwrap();
    assert!(json.contains("\"test_name\": \"report\""));
    assert!(json.contains("swallowed"));
}
