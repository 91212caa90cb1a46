//! 基础运行器示例
//!
//! 演示如何使用 ATP Executor 编排一个测试: 变量、嵌套容器、模板、finally 与执行报告
//!
//! ```bash
//! cargo run -p atp-executor --example basic_executor
//! ```

use std::sync::Arc;
use std::time::Duration;

use atp_executor::{
    ActionRef, ActionStatus, Catch, CreateVariablesAction, EchoAction, ExecutorConfig,
    FailureKind, RepeatUntilTrue, StepReport, Template, TemplateDefinition, TemplateRegistry,
    TestRunner,
};

fn main() -> anyhow::Result<()> {
    // 1. 加载配置并初始化日志
    let config = ExecutorConfig::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(&config.environment.log_level)
        .init();

    // 2. 注册模板
    let templates = Arc::new(TemplateRegistry::new());
    templates.register(
        TemplateDefinition::new(
            "login",
            vec![
                Arc::new(EchoAction::new("登录用户 ${user}")) as ActionRef,
                Arc::new(CreateVariablesAction::new().variable("session", "${user}-session")),
            ],
        )
        .parameter("user", "admin"),
    )?;

    // 3. 创建运行器
    let mut runner = TestRunner::new("basic_executor")
        .with_description("运行器功能演示")
        .with_templates(templates)
        .with_config(&config)?;

    runner.variable("host", "127.0.0.1")?;
    runner.do_finally(|r| r.echo("清理测试环境 ${host}"))?;

    // 4. 编排动作
    runner.apply_template(Template::builder("login").parameter("user", "tester"))?;
    runner.stop_time("demo")?;

    runner.repeat(RepeatUntilTrue::builder("i gt 3"), |r| {
        r.parallel(|r| {
            r.echo("第 ${i} 轮: 任务 A")?;
            r.echo("第 ${i} 轮: 任务 B")?;
            r.sleep(Duration::from_millis(50))
        })
    })?;

    runner.catch_exception(Catch::builder().exception(FailureKind::RUNTIME), |r| {
        r.fail("这个失败会被捕获")
    })?;

    runner.stop_time("demo")?;
    runner.trace_variables()?;

    // 5. 结束测试
    let outcome = runner.stop();

    // 6. 打印执行报告
    let report = runner.test_case().report();
    println!("========================================");
    println!("测试: {}", report.test_name);
    println!("状态: {}", if report.passed { "✓ 通过" } else { "✗ 失败" });
    println!("总步骤: {}", report.steps_executed);
    println!("成功步骤: {}", report.passed_count);
    println!("失败步骤: {}", report.failed_count);
    println!("总耗时: {} ms", report.duration_ms);
    println!();

    println!("步骤详情:");
    println!("----------------------------------------");
    for step in &report.steps {
        print_step(step, 0);
    }
    println!();

    // 7. 导出报告为 JSON
    let json_report = report.to_json()?;
    std::fs::write("execution_report.json", json_report)?;
    println!("报告已保存到: execution_report.json");

    outcome?;
    Ok(())
}

fn print_step(step: &StepReport, depth: usize) {
    let status_icon = match step.status {
        ActionStatus::Success => "✓",
        ActionStatus::Failed => "✗",
        ActionStatus::Skipped => "○",
    };
    println!(
        "{}{} [步骤 {}] {} x{} ({} ms)",
        "  ".repeat(depth),
        status_icon,
        step.step_index + 1,
        step.name,
        step.executions,
        step.duration_ms
    );
    if let Some(error) = &step.error {
        println!("{}   错误: {}", "  ".repeat(depth), error);
    }
    for child in &step.children {
        print_step(child, depth + 1);
    }
}
