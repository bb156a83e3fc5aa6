//! Canned process outputs for adapter tests.

use std::process::Output;

#[cfg(unix)]
fn status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
#[allow(clippy::cast_sign_loss)]
fn status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code as u32)
}

pub(crate) fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub(crate) fn fail_output(stderr: &[u8]) -> Output {
    Output {
        status: status(1),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}
