use assert_cmd::Command;

#[test]
fn show_help() {
    Command::cargo_bin("said")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn piped_conversation_with_unreachable_model_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::cargo_bin("said")
        .unwrap()
        .args(["--url", "http://127.0.0.1:9/api/generate", "--no-spinner"])
        .arg("--data-dir")
        .arg(dir.path())
        .write_stdin("hello\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("User: hello"));
    assert!(text.contains("Check that Ollama is running."));
    assert!(dir.path().join("conversationHistory.json").exists());
}
