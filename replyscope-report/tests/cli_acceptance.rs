use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write_config(&self, contents: &str) {
        let dir = self.xdg_config.join("replyscope");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), contents).expect("failed to write config");
    }
}

fn run_report(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("replyscope-report"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("REPLYSCOPE_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute replyscope-report: {e}"))
}

fn render_args(args: &[&str]) -> String {
    args.iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "replyscope-report {} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        render_args(args),
        output.status,
        stdout,
        stderr
    );
}

fn assert_failure_mentions(args: &[&str], output: &Output, needle: &str) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        !output.status.success(),
        "replyscope-report {} should fail, stderr:\n{}",
        render_args(args),
        stderr
    );
    assert!(
        stderr.contains(needle),
        "expected '{needle}' in stderr, got:\n{stderr}"
    );
}

#[test]
fn config_reports_locations_without_keys() {
    let env = CliTestEnv::new();

    let args = ["config"];
    let output = run_report(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not found, using defaults"));
    assert!(stdout.contains("Key source:   none"));
    assert!(stdout.contains("API keys:     0"));
    assert!(
        stdout.contains("https://api.heyreach.io/api/public"),
        "expected default base URL, got:\n{stdout}"
    );
}

#[test]
fn config_prefers_command_line_keys() {
    let env = CliTestEnv::new();
    env.write_config("[api]\napi_keys = [\"from-config-file\"]\n");

    let args = ["--api-key", "first-key-1111", "--api-key", "second-key-2222", "config"];
    let output = run_report(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("command line"));
    assert!(stdout.contains("API keys:     2"));
    assert!(stdout.contains("…2222"), "expected key hint, got:\n{stdout}");
    assert!(
        !stdout.contains("second-key-2222"),
        "full key must not be printed"
    );
}

#[test]
fn config_reads_keys_from_file() {
    let env = CliTestEnv::new();
    env.write_config(
        "[api]\napi_keys = [\"key-a\", \"key-b\", \"\"]\n\n[aggregation]\nfailure_policy = \"fail_fast\"\n",
    );

    let args = ["config"];
    let output = run_report(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(found)"));
    assert!(stdout.contains("config file (api.api_keys)"));
    assert!(stdout.contains("API keys:     2"));
    assert!(stdout.contains("FailFast"));
}

#[test]
fn summary_without_keys_fails_before_network() {
    let env = CliTestEnv::new();

    let args = ["summary"];
    let output = run_report(&env, &args);
    assert_failure_mentions(&args, &output, "no usable API key");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least one API key is required"));
}

#[test]
fn invalid_config_is_rejected() {
    let env = CliTestEnv::new();
    env.write_config("[aggregation]\nconcurrency = 0\n");

    let args = ["config"];
    let output = run_report(&env, &args);
    assert_failure_mentions(&args, &output, "failed to load configuration");
}

#[test]
fn unknown_sort_column_is_rejected() {
    let env = CliTestEnv::new();

    let args = ["--api-key", "k", "campaigns", "--sort", "bogus"];
    let output = run_report(&env, &args);
    assert_failure_mentions(&args, &output, "unknown sort column 'bogus'");
}

#[test]
fn unknown_export_format_is_rejected() {
    let env = CliTestEnv::new();

    let args = ["--export", "csv", "summary"];
    let output = run_report(&env, &args);
    assert_failure_mentions(&args, &output, "Unknown export format: csv");
}

#[test]
fn unreachable_api_reports_fetch_failure() {
    let env = CliTestEnv::new();
    env.write_config("[api]\nbase_url = \"http://127.0.0.1:9\"\ntimeout_secs = 5\n");

    let args = ["--api-key", "test-key", "summary"];
    let output = run_report(&env, &args);
    assert_failure_mentions(&args, &output, "failed to fetch campaign data");
}
