//! Identity probe in a disposable child process
//!
//! Each probe starts `<program> <args...> <path>`, expects one JSON
//! [`ProbeOutcome`] on stdout and always reaps the child. A child that
//! outlives the timeout is killed and the file is reported unreadable.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::{IdentityProbe, ProbeOutcome};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct IsolatedProbe {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl IsolatedProbe {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Probe through the hidden `probe` subcommand of the running executable
    pub fn current_exe(timeout: Duration) -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, vec!["probe".to_string()], timeout))
    }

    fn spawn(&self, path: &Path) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
    }

    /// Wait for `child` until the timeout; kills it when the time is up
    fn wait(&self, child: &mut Child) -> Result<(), String> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_status)) => return Ok(()),
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("probe timed out after {:?}", self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("failed to wait for probe: {}", e));
                }
            }
        }
    }
}

impl IdentityProbe for IsolatedProbe {
    fn identity_of(&self, path: &Path) -> ProbeOutcome {
        let mut child = match self.spawn(path) {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start probe {:?}: {}", self.program, e);
                return ProbeOutcome::Unreadable(format!("failed to start probe: {}", e));
            }
        };
        debug!("Probing {:?} in child process {}", path, child.id());

        if let Err(reason) = self.wait(&mut child) {
            warn!("Probe of {:?} failed: {}", path, reason);
            return ProbeOutcome::Unreadable(reason);
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            if let Err(e) = stdout.read_to_string(&mut output) {
                return ProbeOutcome::Unreadable(format!("failed to read probe output: {}", e));
            }
        }

        serde_json::from_str(output.trim()).unwrap_or_else(|e| {
            ProbeOutcome::Unreadable(format!("unexpected probe output: {}", e))
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str, timeout: Duration) -> IsolatedProbe {
        IsolatedProbe::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[test]
    fn test_reads_outcome_from_child() {
        let probe = shell(
            r#"echo '{"identified":{"name":"Foo","version":"1.2.3.4567","culture":null,"public_key_token":null}}'"#,
            DEFAULT_PROBE_TIMEOUT,
        );
        match probe.identity_of(Path::new("lib/Foo.dll")) {
            ProbeOutcome::Identified(identity) => {
                assert_eq!(identity.full_name(), "Foo, Version=1.2.3.4567, Culture=neutral, PublicKeyToken=null")
            }
            other => panic!("expected an identity, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_outcome_passes_through() {
        let probe = shell(r#"echo '{"unreadable":"not managed"}'; exit 2"#, DEFAULT_PROBE_TIMEOUT);
        assert_eq!(
            probe.identity_of(Path::new("FakeAssembly.dll")),
            ProbeOutcome::Unreadable("not managed".to_string())
        );
    }

    #[test]
    fn test_hanging_child_is_killed() {
        let probe = shell("sleep 5", Duration::from_millis(200));
        let started = Instant::now();
        match probe.identity_of(Path::new("Slow.dll")) {
            ProbeOutcome::Unreadable(reason) => assert!(reason.contains("timed out"), "{}", reason),
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_garbage_output_is_unreadable() {
        let probe = shell("echo hello", DEFAULT_PROBE_TIMEOUT);
        assert!(matches!(probe.identity_of(Path::new("x.dll")), ProbeOutcome::Unreadable(_)));
    }

    #[test]
    fn test_missing_program_is_unreadable() {
        let probe = IsolatedProbe::new("/nonexistent/projedit-probe", Vec::new(), DEFAULT_PROBE_TIMEOUT);
        assert!(matches!(probe.identity_of(Path::new("x.dll")), ProbeOutcome::Unreadable(_)));
    }
}
