//! 通过协调器执行的命令，每个都会写入执行日志
use std::io::Write;
use std::time::Duration;

use handoff_core::api::{Coordinator, PipelinePhase, RunOutcome};

use crate::commands::cli::{MonitorArgs, RunArgs, WaitArgs};
use crate::error::CliError;

pub async fn handle_pipeline(
    coordinator: &mut Coordinator,
    out: &mut dyn Write,
) -> Result<i32, CliError> {
    let ok = coordinator.run_pipeline().await;

    for event in coordinator.events() {
        writeln!(
            out,
            "{} {:<20} {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.event_type,
            event.message
        )?;
    }

    if ok {
        if let Some(report) = coordinator.report() {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        }
        return Ok(0);
    }

    debug_assert_eq!(coordinator.phase(), PipelinePhase::Failed);
    let reason = coordinator
        .events()
        .last()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "unknown failure".to_string());
    Err(CliError::Pipeline(reason))
}

pub fn handle_clear(coordinator: &mut Coordinator, out: &mut dyn Write) -> Result<i32, CliError> {
    let count = coordinator.clear_shared_data();
    writeln!(out, "cleared {count} records")?;
    Ok(0)
}

/// 同步运行时返回子进程的退出码
pub async fn handle_run(
    coordinator: &mut Coordinator,
    args: RunArgs,
    out: &mut dyn Write,
) -> Result<i32, CliError> {
    if args.detach {
        let handle = coordinator.spawn_process(&args.path).await?;
        writeln!(out, "started {} (pid {})", handle.path().display(), handle.pid())?;
        return Ok(0);
    }

    match coordinator.run_process(&args.path).await {
        RunOutcome::Exited(report) => {
            out.write_all(report.stdout.as_bytes())?;
            if !report.stderr.is_empty() {
                eprint!("{}", report.stderr);
            }
            Ok(report.exit_code)
        }
        RunOutcome::LaunchFailed { path, reason } => Err(CliError::Launch {
            path: path.display().to_string(),
            reason,
        }),
    }
}

pub async fn handle_wait(
    coordinator: &mut Coordinator,
    args: WaitArgs,
    out: &mut dyn Write,
) -> Result<i32, CliError> {
    let timeout = Duration::from_secs(args.timeout_secs);
    match coordinator.wait_for_data(&args.key, timeout).await {
        Some(value) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            Ok(0)
        }
        None => {
            writeln!(out, "'{}' not available after {}s", args.key, args.timeout_secs)?;
            Ok(1)
        }
    }
}

pub fn handle_check(
    coordinator: &mut Coordinator,
    keys: &[String],
    out: &mut dyn Write,
) -> Result<i32, CliError> {
    let check = coordinator.check_dependencies(keys);
    for key in &check.available {
        writeln!(out, "ok      {key}")?;
    }
    for key in &check.missing {
        writeln!(out, "missing {key}")?;
    }
    Ok(if check.all_satisfied() { 0 } else { 1 })
}

pub fn handle_report(coordinator: &mut Coordinator, out: &mut dyn Write) -> Result<i32, CliError> {
    let report = coordinator.generate_final_report();
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(0)
}

pub async fn handle_monitor(
    coordinator: &mut Coordinator,
    args: MonitorArgs,
    out: &mut dyn Write,
) -> Result<i32, CliError> {
    let observed = coordinator
        .monitor(Duration::from_secs(args.duration_secs))
        .await;
    if observed.is_empty() {
        writeln!(out, "no new records")?;
    }
    for key in observed {
        writeln!(out, "+ {key}")?;
    }
    Ok(0)
}
