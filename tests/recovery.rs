use std::fs;
use std::path::Path;
use std::process::Command;

fn caudit() -> Command {
    Command::new(env!("CARGO_BIN_EXE_caudit"))
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write file");
}

#[test]
fn missing_run_artifact_triggers_selective_recovery() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let base = dir.path().join("workspaces");
    let project = base.join("3");
    write_file(&project.join("spec.md"), "# project three\n");
    write_file(&project.join("evaluation/cases.json"), "[]");
    write_file(&project.join("notes.md"), "keep these notes\n");
    write_file(&project.join("generated/lib.rs"), "pub fn junk() {}\n");
    write_file(
        &dir.path().join("auxiliary_files.json"),
        r#"{"3": ["notes.md"]}"#,
    );

    // No run_output.json: absence after an attempt is a failure signal.
    let status = caudit()
        .arg("recover")
        .arg("--workspaces")
        .arg(&base)
        .arg("--ids")
        .arg("3")
        .status()
        .expect("run recover");
    assert!(status.success());

    assert_eq!(
        fs::read_to_string(project.join("spec.md")).expect("read spec"),
        "# project three\n"
    );
    assert_eq!(
        fs::read_to_string(project.join("evaluation/cases.json")).expect("read evaluation"),
        "[]"
    );
    assert_eq!(
        fs::read_to_string(project.join("notes.md")).expect("read notes"),
        "keep these notes\n"
    );
    assert!(!project.join("generated").exists());
}

#[test]
fn network_error_artifact_triggers_template_restore() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let base = dir.path().join("workspaces");
    let templates = dir.path().join("templates");
    write_file(&templates.join("5/spec.md"), "clean template spec\n");
    write_file(&templates.join("5/evaluation/cases.json"), "[]");

    let project = base.join("5");
    write_file(&project.join("spec.md"), "mutated spec\n");
    write_file(&project.join("generated/output.rs"), "junk");
    write_file(
        &project.join("run_output.json"),
        r#"{"error": "connection error: agent unreachable"}"#,
    );

    let status = caudit()
        .arg("recover")
        .arg("--workspaces")
        .arg(&base)
        .arg("--ids")
        .arg("5")
        .arg("--template-root")
        .arg(&templates)
        .status()
        .expect("run recover");
    assert!(status.success());

    assert_eq!(
        fs::read_to_string(project.join("spec.md")).expect("read spec"),
        "clean template spec\n"
    );
    assert!(project.join("evaluation/cases.json").is_file());
    assert!(!project.join("generated").exists());
    assert!(!project.join("run_output.json").exists());
}

#[test]
fn retry_exhaustion_marker_is_detected_across_a_range() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let base = dir.path().join("workspaces");

    let failed = base.join("1");
    write_file(&failed.join("spec.md"), "failed project spec\n");
    write_file(&failed.join("scratch.txt"), "scratch\n");
    write_file(
        &failed.join("run_output.json"),
        r#"{"error": "max retries exceeded after 3 attempts"}"#,
    );

    let clean = base.join("2");
    write_file(&clean.join("run_output.json"), r#"{"response": "done"}"#);
    write_file(&clean.join("generated.txt"), "survives\n");

    let status = caudit()
        .arg("recover")
        .arg("--workspaces")
        .arg(&base)
        .arg("--from")
        .arg("1")
        .arg("--to")
        .arg("2")
        .status()
        .expect("run recover");
    assert!(status.success());

    // Project 1 was reset around its preserved spec.
    assert!(failed.join("spec.md").is_file());
    assert!(!failed.join("scratch.txt").exists());
    // Project 2 was untouched.
    assert_eq!(
        fs::read_to_string(clean.join("generated.txt")).expect("read generated"),
        "survives\n"
    );
}
