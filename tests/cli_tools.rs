use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path as path_matcher};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("sandbox tempdir"),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    fn state_home(&self) -> PathBuf {
        self.path().join("state")
    }

    fn command(&self, server: &MockServer) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_gbit-studio"));
        command
            .current_dir(self.path())
            .arg("--endpoint")
            .arg(format!("{}/api", server.uri()))
            .env("NO_COLOR", "1")
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("XDG_STATE_HOME", self.state_home())
            .env_remove("GBIT_ENDPOINT")
            .env_remove("GBIT_MAX_ATTEMPTS")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null());
        command
    }

    fn run_with_stdin(&self, mut command: Command, input: &str) -> Output {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn gbit-studio");
        child
            .stdin
            .take()
            .expect("child stdin")
            .write_all(input.as_bytes())
            .expect("write stdin");
        child.wait_with_output().expect("wait for gbit-studio")
    }
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout is utf-8")
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).expect("stderr is utf-8")
}

#[test]
fn explain_reads_file_and_prints_rendered_segments() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
        Mock::given(method("POST"))
            .and(path_matcher("/api"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "let total = a + b;\n"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "text": "## Purpose\n\nAdds two numbers.\n\n- a\n- b"
            })))
            .expect(1)
            .mount(&server)
            .await;
    });

    let sandbox = Sandbox::new();
    let file = sandbox.path().join("snippet.js");
    fs::write(&file, "let total = a + b;\n").expect("write snippet");

    let output = sandbox
        .command(&server)
        .arg("explain")
        .arg(&file)
        .output()
        .expect("run explain");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(
        stdout_of(&output),
        "## Purpose\n\nAdds two numbers.\n\n  • a\n  • b\n"
    );
}

#[test]
fn refactor_reads_stdin_and_prints_extracted_code() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
        Mock::given(method("POST"))
            .and(body_string_contains("MODIFICATION INSTRUCTION"))
            .and(body_string_contains("Convert to Python"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "text": "```python\ndef calculate_sum(arr):\n    return sum(arr)\n```"
            })))
            .expect(1)
            .mount(&server)
            .await;
    });

    let sandbox = Sandbox::new();
    let mut command = sandbox.command(&server);
    command
        .arg("refactor")
        .arg("--instruction")
        .arg("Convert to Python");
    let output = sandbox.run_with_stdin(
        command,
        "function calculateSum(arr) { return arr.reduce((a, b) => a + b, 0); }",
    );

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(
        stdout_of(&output),
        "def calculate_sum(arr):\n    return sum(arr)\n"
    );
}

#[test]
fn generate_retries_transient_failures() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("backup my home directory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "text": "```bash\ntar czf home.tgz ~\n```"
            })))
            .expect(1)
            .mount(&server)
            .await;
    });

    let sandbox = Sandbox::new();
    let output = sandbox
        .command(&server)
        .args(["generate", "backup", "my", "home", "directory"])
        .output()
        .expect("run generate");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "tar czf home.tgz ~\n");
}

#[test]
fn exhausted_retries_exit_with_error() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .expect(1)
            .mount(&server)
            .await;
    });

    let sandbox = Sandbox::new();
    let output = sandbox
        .command(&server)
        .args(["--max-attempts", "1", "generate", "anything"])
        .output()
        .expect("run generate");

    assert!(!output.status.success());
    assert!(stdout_of(&output).is_empty());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("backend unreachable after 1 attempt(s)"), "stderr: {stderr}");
    assert!(stderr.contains("backend exploded"), "stderr: {stderr}");
}

#[test]
fn chat_keeps_history_across_turns_and_writes_trace() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "my name is Ada"}]},
                    {"role": "model", "parts": [{"text": "Nice to meet you, Ada!"}]},
                    {"role": "user", "parts": [{"text": "what is my name?"}]}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "text": "Your name is Ada."})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("my name is Ada"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "text": "Nice to meet you, Ada!"})),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
    });

    let sandbox = Sandbox::new();
    let mut command = sandbox.command(&server);
    command.args(["--trace", "chat"]);
    let output = sandbox.run_with_stdin(command, "my name is Ada\nwhat is my name?\n/exit\n");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Nice to meet you, Ada!"), "stdout: {stdout}");
    assert!(stdout.contains("Your name is Ada."), "stdout: {stdout}");

    let trace_dir = sandbox.state_home().join("gbit-studio").join("traces");
    let entries = fs::read_dir(&trace_dir)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", trace_dir.display()))
        .collect::<Result<Vec<_>, _>>()
        .expect("trace entries");
    assert_eq!(entries.len(), 1, "expected exactly one trace file");
    let content = fs::read_to_string(entries[0].path()).expect("read trace");
    assert!(content.contains("[chat.in"), "trace:\n{content}");
    assert!(content.contains("what is my name?"), "trace:\n{content}");
    assert!(content.contains("[http.req"), "trace:\n{content}");
}
