//! Text templates for the domain message stream and the CI status block.

use crate::task::types::Task;

pub fn scan_finished(scanned_repositories: usize) -> String {
    format!("[DONE] Finished scan of {scanned_repositories} repositories")
}

pub fn lint_end(repository: &str, result_count: usize) -> String {
    if result_count > 0 {
        format!("[ERROR] {repository} {result_count} findings")
    } else {
        format!("[DONE] {repository} 0 findings")
    }
}

pub fn lint_slow(seconds: f64, file: &str) -> String {
    format!("[WARN] Linting {file} took {seconds:.1}s")
}

pub fn linter_crash(repository: &str, rule: &str) -> String {
    format!("[ERROR] {repository} crashed while executing rule {rule}")
}

pub fn worker_crash(repository: &str, error_code: Option<&str>) -> String {
    match error_code {
        Some(code) => format!("[ERROR] Worker crashed while scanning {repository} ({code})"),
        None => format!("[ERROR] Worker crashed while scanning {repository}"),
    }
}

pub fn clone_failure(repository: &str) -> String {
    format!("[ERROR] Failed to clone {repository}")
}

pub fn pull_failure(repository: &str) -> String {
    format!("[ERROR] Failed to pull {repository}")
}

pub fn read_failure(repository: &str) -> String {
    format!("[ERROR] Failed to read files of {repository}")
}

pub fn write_failure(repository: &str) -> String {
    format!("[ERROR] Failed to write results of {repository}")
}

/// Status block published on the keep-alive channel: scanned count plus one
/// line per in-flight task with its step and, when known, file progress.
pub fn ci_status(scanned_repositories: usize, tasks: &[Task]) -> String {
    let mut lines = vec![format!(
        "[STATUS] Scanned {scanned_repositories} repositories, {} scans in progress",
        tasks.len()
    )];

    for task in tasks {
        let mut line = format!(" - {} [{}]", task.repository, task.step);
        if let (Some(index), Some(count)) = (task.current_file_index, task.file_count) {
            line.push_str(&format!(" {index}/{count}"));
        }
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::{TaskStep, TaskUpdate};

    #[test]
    fn test_lint_end_reflects_repository_and_count() {
        let with_findings = lint_end("org/b", 3);
        assert!(with_findings.contains("org/b"));
        assert!(with_findings.contains('3'));
        assert!(with_findings.starts_with("[ERROR]"));

        let clean = lint_end("org/a", 0);
        assert!(clean.contains("org/a"));
        assert!(clean.starts_with("[DONE]"));
    }

    #[test]
    fn test_scan_finished_reflects_count() {
        assert!(scan_finished(7).contains('7'));
    }

    #[test]
    fn test_worker_crash_with_and_without_code() {
        assert!(worker_crash("org/a", Some("137")).contains("137"));
        assert!(!worker_crash("org/a", None).contains('('));
    }

    #[test]
    fn test_ci_status_lists_tasks_with_progress() {
        let mut lint_task = Task::new("org/a");
        lint_task.apply(
            TaskUpdate::new()
                .step(TaskStep::Lint)
                .file_count(10)
                .current_file_index(4),
        );
        let clone_task = Task::new("org/b");

        let status = ci_status(2, &[lint_task, clone_task]);
        let lines: Vec<&str> = status.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Scanned 2 repositories"));
        assert!(lines[1].contains("org/a [LINT] 4/10"));
        assert!(
            lines[2].ends_with("org/b [START]"),
            "no progress suffix without counts: {}",
            lines[2]
        );
    }
}
