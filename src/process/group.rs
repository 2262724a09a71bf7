//! Process group that takes every member down with it.
//!
//! Once a process has been added, disposing the group (or the launcher dying,
//! even by crash) terminates it. Membership is add-only.
//!
//! - Windows: a Job Object configured with `JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE`.
//!   The OS kills members when the last handle closes, which also covers crashes.
//! - Unix: each member leads its own session (`setsid`) so its whole subtree can
//!   be signalled, and on Linux asks for `SIGKILL` when the launcher dies
//!   (`PR_SET_PDEATHSIG`). Disposal signals every live member's group.

use std::process::{Child, Command};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::error::{LauncherError, Result};

#[derive(Debug, Clone, Copy)]
struct Member {
    pid: u32,
    exited: bool,
}

#[derive(Debug, Default)]
struct GroupState {
    members: Vec<Member>,
    disposed: bool,
}

/// Owner of the OS grouping primitive.
/// Disposed exactly once, either explicitly or on drop
pub struct ProcessGroup {
    backend: imp::Backend,
    state: Mutex<GroupState>,
}

impl ProcessGroup {
    /// Create the group. Failing here means no termination safety net
    pub fn create() -> Result<Self> {
        let backend = imp::Backend::create().map_err(LauncherError::GroupCreationFailed)?;
        info!("Process group created");
        Ok(Self {
            backend,
            state: Mutex::new(GroupState::default()),
        })
    }

    /// Configure a command before spawn so the child can be governed by the group.
    /// Must be called on every command whose child will later be added
    pub fn prepare(&self, command: &mut Command) {
        self.backend.prepare(command);
    }

    /// Add a freshly spawned child to the group
    pub fn add(&self, child: &Child) -> Result<()> {
        let pid = child.id();
        // Lock held across the OS call so dispose cannot interleave with an add
        let mut state = self.state.lock();
        if state.disposed {
            return Err(LauncherError::JoinFailed {
                pid,
                source: std::io::Error::other("process group already disposed"),
            });
        }

        self.backend
            .assign(child)
            .map_err(|source| LauncherError::JoinFailed { pid, source })?;
        state.members.push(Member { pid, exited: false });
        debug!("Added PID {} to process group ({} members)", pid, state.members.len());
        Ok(())
    }

    /// Record that a member has been reaped, so its pid is never signalled after reuse
    pub(crate) fn mark_exited(&self, pid: u32) {
        let mut state = self.state.lock();
        if let Some(member) = state.members.iter_mut().find(|m| m.pid == pid && !m.exited) {
            member.exited = true;
        }
    }

    /// Terminate every member and release the OS handle. Later calls are no-ops
    pub fn dispose(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.disposed {
            return Ok(());
        }
        state.disposed = true;

        let live: Vec<u32> = state
            .members
            .iter()
            .filter(|m| !m.exited)
            .map(|m| m.pid)
            .collect();
        info!("Disposing process group, terminating {} live member(s)", live.len());
        self.backend.terminate(&live).map_err(LauncherError::CloseFailed)
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub fn member_count(&self) -> usize {
        self.state.lock().members.len()
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            error!("Failed to dispose process group on drop: {}", e);
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::ffi::c_void;
    use std::io;
    use std::os::windows::io::AsRawHandle;
    use std::process::{Child, Command};

    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::JobObjects::{
        AssignProcessToJobObject, CreateJobObjectW, JobObjectExtendedLimitInformation,
        SetInformationJobObject, TerminateJobObject, JOBOBJECT_EXTENDED_LIMIT_INFORMATION,
        JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
    };

    pub(super) struct Backend {
        job: HANDLE,
    }

    // The job handle is a kernel object handle, usable from any thread
    unsafe impl Send for Backend {}
    unsafe impl Sync for Backend {}

    impl Backend {
        pub(super) fn create() -> io::Result<Self> {
            let job = unsafe { CreateJobObjectW(None, PCWSTR::null()) }.map_err(io::Error::other)?;

            let mut info = JOBOBJECT_EXTENDED_LIMIT_INFORMATION::default();
            info.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
            let configured = unsafe {
                SetInformationJobObject(
                    job,
                    JobObjectExtendedLimitInformation,
                    &info as *const JOBOBJECT_EXTENDED_LIMIT_INFORMATION as *const c_void,
                    std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
                )
            };
            if let Err(e) = configured {
                unsafe {
                    let _ = CloseHandle(job);
                }
                return Err(io::Error::other(e));
            }

            Ok(Self { job })
        }

        pub(super) fn prepare(&self, _command: &mut Command) {}

        pub(super) fn assign(&self, child: &Child) -> io::Result<()> {
            let process = HANDLE(child.as_raw_handle());
            unsafe { AssignProcessToJobObject(self.job, process) }.map_err(io::Error::other)
        }

        pub(super) fn terminate(&self, _live: &[u32]) -> io::Result<()> {
            // Closing alone would be enough with KILL_ON_JOB_CLOSE, but other
            // handles to the job (debuggers, nested jobs) could keep it alive
            let terminated = unsafe { TerminateJobObject(self.job, 1) };
            let closed = unsafe { CloseHandle(self.job) };
            terminated.and(closed).map_err(io::Error::other)
        }
    }
}

#[cfg(unix)]
mod imp {
    use std::io;
    use std::os::unix::process::CommandExt;
    use std::process::{Child, Command};

    use tracing::{debug, warn};

    pub(super) struct Backend;

    impl Backend {
        pub(super) fn create() -> io::Result<Self> {
            Ok(Self)
        }

        pub(super) fn prepare(&self, command: &mut Command) {
            #[cfg(target_os = "linux")]
            let launcher_pid = unsafe { libc::getpid() };

            // Safety: only async-signal-safe calls between fork and exec
            unsafe {
                command.pre_exec(move || {
                    if libc::setsid() == -1 {
                        return Err(io::Error::last_os_error());
                    }

                    #[cfg(target_os = "linux")]
                    {
                        if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                            return Err(io::Error::last_os_error());
                        }
                        // The launcher may have died before the signal was armed
                        if libc::getppid() != launcher_pid {
                            return Err(io::Error::other("launcher exited before child started"));
                        }
                    }

                    Ok(())
                });
            }
        }

        pub(super) fn assign(&self, child: &Child) -> io::Result<()> {
            // Grouping happened in the pre-exec hook; membership is bookkeeping only
            let pid = child.id() as libc::pid_t;
            if unsafe { libc::kill(pid, 0) } == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        pub(super) fn terminate(&self, live: &[u32]) -> io::Result<()> {
            let mut first_error = None;
            for &pid in live {
                if let Err(e) = kill_member(pid as libc::pid_t) {
                    warn!("Failed to kill process group member {}: {}", pid, e);
                    first_error.get_or_insert(e);
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    fn kill_member(pid: libc::pid_t) -> io::Result<()> {
        if unsafe { libc::killpg(pid, libc::SIGKILL) } == 0 {
            debug!("Sent SIGKILL to process group {}", pid);
            return Ok(());
        }

        // Not a group leader (or already gone): fall back to the pid itself
        if unsafe { libc::kill(pid, libc::SIGKILL) } == 0 {
            debug!("Sent SIGKILL to process {}", pid);
            return Ok(());
        }

        let error = io::Error::last_os_error();
        if error.raw_os_error() == Some(libc::ESRCH) {
            debug!("Process {} already exited", pid);
            return Ok(());
        }
        Err(error)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::Stdio;

    fn spawn_sleeper(group: &ProcessGroup) -> Child {
        let mut command = Command::new("sleep");
        command.arg("30").stdin(Stdio::null()).stdout(Stdio::null());
        group.prepare(&mut command);
        command.spawn().expect("sleep should spawn")
    }

    #[test]
    fn test_dispose_kills_every_member() {
        let group = ProcessGroup::create().unwrap();
        let mut first = spawn_sleeper(&group);
        let mut second = spawn_sleeper(&group);
        group.add(&first).unwrap();
        group.add(&second).unwrap();
        assert_eq!(group.member_count(), 2);

        group.dispose().unwrap();

        let first_status = first.wait().unwrap();
        let second_status = second.wait().unwrap();
        assert_eq!(first_status.signal(), Some(libc::SIGKILL));
        assert_eq!(second_status.signal(), Some(libc::SIGKILL));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let group = ProcessGroup::create().unwrap();
        let mut child = spawn_sleeper(&group);
        group.add(&child).unwrap();

        group.dispose().unwrap();
        group.dispose().unwrap();
        assert!(group.is_disposed());
        child.wait().unwrap();
    }

    #[test]
    fn test_add_after_dispose_is_rejected() {
        let group = ProcessGroup::create().unwrap();
        group.dispose().unwrap();

        let mut child = spawn_sleeper(&group);
        let result = group.add(&child);
        assert!(matches!(result, Err(LauncherError::JoinFailed { .. })));

        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[test]
    fn test_drop_disposes_group() {
        let mut child;
        {
            let group = ProcessGroup::create().unwrap();
            child = spawn_sleeper(&group);
            group.add(&child).unwrap();
        }
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(libc::SIGKILL));
    }

    #[test]
    fn test_exited_members_are_not_signalled() {
        let group = ProcessGroup::create().unwrap();
        let mut command = Command::new("true");
        group.prepare(&mut command);
        let mut child = command.spawn().unwrap();
        group.add(&child).unwrap();
        child.wait().unwrap();
        group.mark_exited(child.id());

        // Nothing live to signal, so dispose cannot fail on a stale pid
        group.dispose().unwrap();
    }
}
