//! In-memory collaborators for session tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use procsnap::domain::{
    AppDomainRecord, ArchitectureTag, AttachError, ClrInfo, FileVersionInfo, IntrospectionError,
    ManagedThreadId, ModuleRecord, Pid, RuntimeFlavor, StackFrameRecord, ThreadRecord, Tid,
};
use procsnap::introspection::{
    ClrRuntime, DataTarget, Introspector, ProcessProvider, SelfProcess, StackWalk, TargetProcess,
};
use procsnap::relaunch::Launcher;

pub const INSPECTOR_EXE: &str = "/opt/procsnap/procsnap";

#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub pid: Pid,
    pub architecture: ArchitectureTag,
    pub exe_path: PathBuf,
    pub version: FileVersionInfo,
}

impl TargetProcess for FakeProcess {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn architecture(&self) -> Result<ArchitectureTag, AttachError> {
        Ok(self.architecture)
    }

    fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    fn file_version(&self) -> FileVersionInfo {
        self.version.clone()
    }
}

/// Knows the inspector and at most one target process
pub struct FakeProcesses {
    pub me: SelfProcess,
    pub target: Option<FakeProcess>,
    pub open_calls: Cell<usize>,
}

impl FakeProcesses {
    pub fn new(inspector: ArchitectureTag, target: Option<FakeProcess>) -> Self {
        Self {
            me: SelfProcess {
                pid: Pid(100),
                exe_path: PathBuf::from(INSPECTOR_EXE),
                architecture: inspector,
            },
            target,
            open_calls: Cell::new(0),
        }
    }
}

impl ProcessProvider for FakeProcesses {
    fn current(&self) -> std::io::Result<SelfProcess> {
        Ok(self.me.clone())
    }

    fn open(&self, pid: Pid) -> Result<Box<dyn TargetProcess>, AttachError> {
        self.open_calls.set(self.open_calls.get() + 1);
        match &self.target {
            Some(target) if target.pid == pid => Ok(Box::new(target.clone())),
            _ => Err(AttachError::ProcessNotFound(pid)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeThread {
    pub record: ThreadRecord,
    /// `Err` makes the stack walk fail after the frames before it
    pub frames: Vec<Result<StackFrameRecord, String>>,
}

/// Attach session with canned answers
#[derive(Debug, Clone, Default)]
pub struct FakeDataTarget {
    pub modules: Option<Vec<ModuleRecord>>,
    pub runtimes: Vec<ClrInfo>,
    pub threads: Option<Vec<FakeThread>>,
    pub domains: Option<Vec<AppDomainRecord>>,
    /// OS thread ids whose stacks were asked for
    pub walked: std::rc::Rc<RefCell<Vec<Tid>>>,
}

impl DataTarget for FakeDataTarget {
    fn enumerate_modules(&self) -> Result<Vec<ModuleRecord>, IntrospectionError> {
        self.modules.clone().ok_or_else(|| IntrospectionError::Other(anyhow::anyhow!("boom")))
    }

    fn clr_versions(&self) -> &[ClrInfo] {
        &self.runtimes
    }

    fn create_runtime(&self, _info: &ClrInfo) -> Result<Box<dyn ClrRuntime + '_>, AttachError> {
        Ok(Box::new(FakeRuntime { target: self }))
    }
}

pub struct FakeRuntime<'a> {
    target: &'a FakeDataTarget,
}

impl ClrRuntime for FakeRuntime<'_> {
    fn threads(&self) -> Result<Vec<ThreadRecord>, IntrospectionError> {
        let threads = self
            .target
            .threads
            .as_ref()
            .ok_or_else(|| IntrospectionError::ThreadListFailed("thread store unreadable".into()))?;
        Ok(threads.iter().map(|t| t.record.clone()).collect())
    }

    fn stack_trace(&self, thread: &ThreadRecord) -> Result<StackWalk<'_>, IntrospectionError> {
        self.target.walked.borrow_mut().push(thread.os_thread_id);
        let frames = self
            .target
            .threads
            .iter()
            .flatten()
            .find(|t| t.record.os_thread_id == thread.os_thread_id)
            .map(|t| t.frames.clone())
            .unwrap_or_default();
        let tid = thread.os_thread_id;
        Ok(Box::new(frames.into_iter().map(move |frame| {
            frame.map_err(|reason| IntrospectionError::StackWalkFailed { tid, reason })
        })))
    }

    fn app_domains(&self) -> Result<Vec<AppDomainRecord>, IntrospectionError> {
        self.target
            .domains
            .clone()
            .ok_or_else(|| IntrospectionError::DomainListFailed("domain list unreadable".into()))
    }
}

/// Hands out clones of one data target and counts attaches
pub struct FakeIntrospector {
    pub target: Result<FakeDataTarget, fn(Pid) -> AttachError>,
    pub attach_calls: Cell<usize>,
    pub last_timeout: Cell<Option<Duration>>,
}

impl FakeIntrospector {
    pub fn new(target: FakeDataTarget) -> Self {
        Self { target: Ok(target), attach_calls: Cell::new(0), last_timeout: Cell::new(None) }
    }

    pub fn failing(error: fn(Pid) -> AttachError) -> Self {
        Self { target: Err(error), attach_calls: Cell::new(0), last_timeout: Cell::new(None) }
    }
}

impl Introspector for FakeIntrospector {
    fn attach(&self, pid: Pid, timeout: Duration) -> Result<Box<dyn DataTarget>, AttachError> {
        self.attach_calls.set(self.attach_calls.get() + 1);
        self.last_timeout.set(Some(timeout));
        match &self.target {
            Ok(target) => Ok(Box::new(target.clone())),
            Err(error) => Err(error(pid)),
        }
    }
}

/// Records launches instead of starting processes
#[derive(Default)]
pub struct RecordingLauncher {
    pub calls: RefCell<Vec<(PathBuf, Vec<String>)>>,
    pub fail: bool,
}

impl Launcher for RecordingLauncher {
    fn launch(&self, program: &Path, args: &[String]) -> std::io::Result<ExitStatus> {
        self.calls.borrow_mut().push((program.to_path_buf(), args.to_vec()));
        if self.fail {
            return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
        }
        Ok(ExitStatus::from_raw(0))
    }
}

pub fn target_4242(architecture: ArchitectureTag) -> FakeProcess {
    FakeProcess {
        pid: Pid(4242),
        architecture,
        exe_path: PathBuf::from("/opt/app/App"),
        version: FileVersionInfo {
            file: PathBuf::from("/opt/app/App"),
            file_version: "1.2.3".to_string(),
            build_id: "9f86d081884c7d65".to_string(),
            machine: "X86_64".to_string(),
        },
    }
}

pub fn coreclr_8() -> ClrInfo {
    ClrInfo {
        flavor: RuntimeFlavor::CoreClr,
        version: "8.0.1".to_string(),
        module_path: PathBuf::from(
            "/usr/share/dotnet/shared/Microsoft.NETCore.App/8.0.1/libcoreclr.so",
        ),
    }
}

pub fn frame(sp: u64, ip: u64, text: &str) -> Result<StackFrameRecord, String> {
    Ok(StackFrameRecord { stack_pointer: sp, instruction_pointer: ip, display_text: text.to_string() })
}

pub fn alive(os: u32, managed: u32, frames: Vec<Result<StackFrameRecord, String>>) -> FakeThread {
    FakeThread {
        record: ThreadRecord {
            os_thread_id: Tid(os),
            managed_thread_id: Some(ManagedThreadId(managed)),
            is_alive: true,
        },
        frames,
    }
}

/// Dead threads still carry frames so a walk of one would show up
pub fn dead(os: u32, managed: u32) -> FakeThread {
    FakeThread {
        record: ThreadRecord {
            os_thread_id: Tid(os),
            managed_thread_id: Some(ManagedThreadId(managed)),
            is_alive: false,
        },
        frames: vec![frame(0x1, 0x2, "should never be printed")],
    }
}

/// 3 modules, one dead and one alive thread with 3 frames, one domain
pub fn data_target_4242() -> FakeDataTarget {
    FakeDataTarget {
        modules: Some(vec![
            ModuleRecord { file_path: PathBuf::from("/opt/app/App"), version: "1.2.3".to_string() },
            ModuleRecord { file_path: coreclr_8().module_path, version: "8.0.1".to_string() },
            ModuleRecord {
                file_path: PathBuf::from("/usr/lib/x86_64-linux-gnu/libc.so.6"),
                version: "6".to_string(),
            },
        ]),
        runtimes: vec![coreclr_8()],
        threads: Some(vec![
            dead(4243, 2),
            alive(
                4242,
                1,
                vec![
                    frame(0x7FFD_0000_1000, 0x7F00_AB00_1234, "libc.so.6!clock_nanosleep+0x17"),
                    frame(0x7FFD_0000_1040, 0x7F00_AB10_0ABC, "libcoreclr.so!ThreadNative::Sleep+0x4c"),
                    frame(0x7FFD_0000_10A0, 0x7F00_C000_0010, "[OptimizedTier1] App.Program::Main(string[])+0x10"),
                ],
            ),
        ]),
        domains: Some(vec![AppDomainRecord {
            name: "Default".to_string(),
            id: 1,
            application_base: "/opt/app/".to_string(),
        }]),
        walked: std::rc::Rc::default(),
    }
}

/// The only file in `dir`, if exactly one exists
pub fn single_report(dir: &Path) -> Option<PathBuf> {
    let files: Vec<PathBuf> =
        std::fs::read_dir(dir).ok()?.filter_map(|e| e.ok().map(|e| e.path())).collect();
    match files.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}
