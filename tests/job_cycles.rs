// tests/job_cycles.rs

//! End-to-end job cycles with real processes and real file changes.
//!
//! The build step appends a line to a marker file, so the number of lines in
//! the marker counts how many cycles have started.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;

use rewatch::config::{ExecConfig, JobConfig, WatchConfig};
use rewatch::job::Job;

type TestResult = Result<(), Box<dyn Error>>;

struct Fixture {
    _tmp: tempfile::TempDir,
    src: PathBuf,
    marker: PathBuf,
    append_script: PathBuf,
}

impl Fixture {
    fn new() -> Result<Fixture, Box<dyn Error>> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().canonicalize()?;
        let src = root.join("src");
        fs::create_dir(&src)?;

        let marker = root.join("marker");
        let append_script = root.join("append.sh");
        fs::write(
            &append_script,
            format!("echo run >> {}\n", marker.display()),
        )?;

        Ok(Fixture {
            _tmp: tmp,
            src,
            marker,
            append_script,
        })
    }

    fn job_config(&self, exec_script: &str, delay: &str) -> JobConfig {
        JobConfig {
            delay: Some(delay.to_string()),
            watch: Some(WatchConfig {
                ignore: vec![".git".to_string()],
                pattern: vec![format!("{}/.../*.go", self.src.display())],
            }),
            build: vec![ExecConfig {
                env: Default::default(),
                script: format!("sh {}", self.append_script.display()),
            }],
            exec: Some(ExecConfig {
                env: Default::default(),
                script: exec_script.to_string(),
            }),
            env: Default::default(),
        }
    }

    fn cycles_started(&self) -> usize {
        match fs::read_to_string(&self.marker) {
            Ok(contents) => contents.lines().count(),
            Err(_) => 0,
        }
    }

    fn touch_watched_file(&self) -> std::io::Result<()> {
        fs::write(self.src.join("trigger.go"), "changed")
    }
}

async fn wait_for_cycles(fixture: &Fixture, want: usize, deadline: Duration) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if fixture.cycles_started() >= want {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread")]
async fn file_change_kills_the_process_and_reruns_the_build() -> TestResult {
    let fixture = Fixture::new()?;
    let cfg = fixture.job_config("sleep 3600", "1s");

    let job = Job::new("main", cfg, &[])?;
    let runner = tokio::spawn(job.run());

    assert!(
        wait_for_cycles(&fixture, 1, Duration::from_secs(5)).await,
        "first cycle should run the build step"
    );

    fixture.touch_watched_file()?;
    assert!(
        wait_for_cycles(&fixture, 2, Duration::from_secs(10)).await,
        "a change should kill the exec process and restart the cycle"
    );

    runner.abort();
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_build_step_never_starts_the_exec_process() -> TestResult {
    let fixture = Fixture::new()?;
    let exec_marker = fixture.src.parent().unwrap().join("exec-ran");

    let mut cfg = fixture.job_config(&format!("touch {}", exec_marker.display()), "1s");
    cfg.build.insert(
        0,
        ExecConfig {
            env: Default::default(),
            script: "false".to_string(),
        },
    );

    let job = Job::new("main", cfg, &[])?;
    let runner = tokio::spawn(job.run());

    sleep(Duration::from_secs(2)).await;
    assert!(
        !exec_marker.exists(),
        "exec must not start after a failed build step"
    );
    // The failing first step also aborted before the append step.
    assert_eq!(fixture.cycles_started(), 0);

    runner.abort();
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn crashed_process_stays_dormant_until_the_next_change() -> TestResult {
    let fixture = Fixture::new()?;
    // The exec step exits immediately on its own.
    let cfg = fixture.job_config("false", "1s");

    let job = Job::new("main", cfg, &[])?;
    let runner = tokio::spawn(job.run());

    assert!(wait_for_cycles(&fixture, 1, Duration::from_secs(5)).await);

    // No respawn on its own.
    sleep(Duration::from_secs(3)).await;
    assert_eq!(fixture.cycles_started(), 1, "no restart without a change");

    // The next relevant change wakes the job up again.
    fixture.touch_watched_file()?;
    assert!(
        wait_for_cycles(&fixture, 2, Duration::from_secs(10)).await,
        "a change should restart a dormant job"
    );

    runner.abort();
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn job_without_exec_still_reruns_builds_on_change() -> TestResult {
    let fixture = Fixture::new()?;
    let mut cfg = fixture.job_config("unused", "1s");
    cfg.exec = None;

    let job = Job::new("main", cfg, &[])?;
    let runner = tokio::spawn(job.run());

    assert!(wait_for_cycles(&fixture, 1, Duration::from_secs(5)).await);

    fixture.touch_watched_file()?;
    assert!(
        wait_for_cycles(&fixture, 2, Duration::from_secs(10)).await,
        "the placeholder process should be killed and the build rerun"
    );

    runner.abort();
    Ok(())
}

#[tokio::test]
async fn out_of_range_delay_is_rejected_at_construction() {
    let fixture = Fixture::new().unwrap();
    for bad in ["500ms", "90s"] {
        let cfg = fixture.job_config("sleep 3600", bad);
        assert!(Job::new("main", cfg, &[]).is_err(), "delay {bad} must be rejected");
    }
}
