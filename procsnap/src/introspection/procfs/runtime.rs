//! Live runtime view over procfs: threads, stacks, domains.

use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::memory::RemoteMemory;
use super::stack::{read_registers, StackScan};
use super::target::ProcfsTarget;
use crate::domain::{
    AppDomainRecord, AttachError, ClrInfo, IntrospectionError, Pid, ThreadRecord, Tid,
};
use crate::introspection::{ClrRuntime, StackWalk, TargetProcess};
use crate::preflight::check_debug_symbols;
use crate::process_lookup::{extract_comm, list_tasks, read_cmdline, read_cwd, task_state};
use crate::symbolization::{MapEntry, MemoryMap, PerfMap, Symbolizer};

/// Executables that host a managed entry assembly given on the command line
const MANAGED_HOSTS: &[&str] = &["dotnet", "mono", "mono-sgen"];

/// Id of the default application domain
const DEFAULT_DOMAIN_ID: u32 = 1;

/// Read-only view of one runtime inside an attached target
pub struct ProcfsRuntime<'a> {
    target: &'a ProcfsTarget,
    info: ClrInfo,
    map: MemoryMap,
    memory: RemoteMemory,
    word_size: usize,
    perf_map: Option<PerfMap>,
    /// `None` marks modules that failed to load, so they are tried once
    symbolizers: RefCell<HashMap<PathBuf, Option<Rc<Symbolizer>>>>,
}

impl<'a> ProcfsRuntime<'a> {
    /// Build the view for `info`.
    ///
    /// # Errors
    /// `RuntimeCreation` if the runtime module is no longer mapped.
    pub fn new(target: &'a ProcfsTarget, info: &ClrInfo) -> Result<Self, AttachError> {
        let pid = target.pid();
        let map = MemoryMap::read(pid.0)?;
        if map.range_of(&info.module_path).is_none() {
            return Err(AttachError::RuntimeCreation(format!(
                "{} is no longer mapped in process {pid}",
                info.module_path.display()
            )));
        }

        let word_size = target.process().architecture()?.pointer_size();
        let perf_map = match PerfMap::load(pid.0) {
            Ok(Some(perf_map)) => Some(perf_map),
            Ok(None) => {
                warn!(
                    "No {} found, managed frames will show as <unknown> \
                     (start the target with DOTNET_PerfMapEnabled=1)",
                    PerfMap::path_for(pid.0).display()
                );
                None
            }
            Err(e) => {
                warn!("Ignoring perf map of process {pid}: {e:#}");
                None
            }
        };
        debug!("Runtime view for {info}: {} mappings, {word_size}-byte words", map.entries().len());

        Ok(Self {
            target,
            info: info.clone(),
            map,
            memory: RemoteMemory::new(pid),
            word_size,
            perf_map,
            symbolizers: RefCell::new(HashMap::new()),
        })
    }

    fn pid(&self) -> Pid {
        self.target.pid()
    }

    fn is_code(&self, addr: u64) -> bool {
        self.map.find_executable(addr).is_some()
    }

    fn symbolizer_for(&self, path: &Path) -> Option<Rc<Symbolizer>> {
        if let Some(cached) = self.symbolizers.borrow().get(path) {
            return cached.clone();
        }

        let loaded = if check_debug_symbols(path) {
            match Symbolizer::new(path) {
                Ok(symbolizer) => Some(Rc::new(symbolizer)),
                Err(e) => {
                    warn!("Cannot symbolize {}: {e:#}", path.display());
                    None
                }
            }
        } else {
            None
        };
        self.symbolizers.borrow_mut().insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    fn describe(&self, ip: u64) -> String {
        let Some(entry) = self.map.find(ip) else {
            return self.describe_jit(ip).unwrap_or_else(|| "<unknown>".to_string());
        };
        match &entry.path {
            Some(path) => self.describe_module(entry, path, ip),
            None if entry.label.starts_with('[') => {
                format!("{}+0x{:x}", entry.label, ip - entry.range.start)
            }
            None => self.describe_jit(ip).unwrap_or_else(|| "<unknown>".to_string()),
        }
    }

    fn describe_module(&self, entry: &MapEntry, path: &Path, ip: u64) -> String {
        let module = path.file_name().map_or_else(
            || path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );
        let file_offset = entry.file_offset(ip);
        let symbolizer = self.symbolizer_for(path);
        let address = symbolizer.as_ref().and_then(|s| s.address_for_offset(file_offset));

        let summary = symbolizer
            .zip(address)
            .and_then(|(symbolizer, address)| symbolizer.resolve(address).summary());
        match (summary, address) {
            (Some(summary), _) => format!("{module}!{summary}"),
            (None, Some(address)) => format!("{module}+0x{address:x}"),
            (None, None) => format!("{module}+0x{file_offset:x}"),
        }
    }

    fn describe_jit(&self, ip: u64) -> Option<String> {
        let (name, offset) = self.perf_map.as_ref()?.lookup(ip)?;
        Some(format!("{name}+0x{offset:x}"))
    }

    /// End of the stack mapping holding `sp`; threads started after the
    /// view was built need a fresh look at the maps
    fn stack_end(&self, sp: u64) -> Option<u64> {
        if let Some(entry) = self.map.find(sp) {
            return Some(entry.range.end);
        }
        let fresh = MemoryMap::read(self.pid().0).ok()?;
        fresh.find(sp).map(|entry| entry.range.end)
    }
}

impl ClrRuntime for ProcfsRuntime<'_> {
    fn threads(&self) -> Result<Vec<ThreadRecord>, IntrospectionError> {
        let pid = self.pid();
        let tids = list_tasks(pid)
            .map_err(|e| IntrospectionError::ThreadListFailed(format!("{e:#}")))?;

        tids.into_iter()
            .map(|tid| {
                let state = task_state(pid, tid)
                    .map_err(|e| IntrospectionError::ThreadListFailed(format!("{e:#}")))?;
                Ok(ThreadRecord {
                    os_thread_id: tid,
                    managed_thread_id: None,
                    is_alive: is_alive_state(state),
                })
            })
            .collect()
    }

    fn stack_trace(&self, thread: &ThreadRecord) -> Result<StackWalk<'_>, IntrospectionError> {
        let tid: Tid = thread.os_thread_id;
        let Some(registers) = read_registers(self.pid(), tid)? else {
            debug!("Thread {tid} of {} is running or gone, no frames", self.info);
            return Ok(Box::new(std::iter::empty()));
        };

        let (sp, _) = registers;
        let stack_end = self.stack_end(sp).unwrap_or(sp);
        debug!("Thread {tid}: scanning 0x{sp:x}..0x{stack_end:x}");

        Ok(Box::new(StackScan::new(
            self.memory,
            registers,
            stack_end,
            self.word_size,
            |addr| self.is_code(addr),
            |ip| self.describe(ip),
        )))
    }

    fn app_domains(&self) -> Result<Vec<AppDomainRecord>, IntrospectionError> {
        let pid = self.pid();
        let mut cmdline =
            read_cmdline(pid).map_err(|e| IntrospectionError::DomainListFailed(format!("{e:#}")))?;
        if cmdline.is_empty() {
            // Processes can overwrite their argv; fall back to the task name
            let stat = std::fs::read_to_string(format!("/proc/{pid}/stat"))?;
            cmdline.push(extract_comm(&stat)?);
        }
        let cwd = read_cwd(pid).map_err(|e| IntrospectionError::DomainListFailed(format!("{e:#}")))?;

        Ok(vec![default_domain(&cmdline, &cwd, self.target.process().exe_path())])
    }
}

/// `Z` (zombie) and `X` (dead) tasks no longer run code
fn is_alive_state(state: Option<char>) -> bool {
    matches!(state, Some(state) if state != 'Z' && state != 'X')
}

/// The single domain a CoreCLR or Mono process runs in.
///
/// Under a managed host (`dotnet app.dll`) the domain is named after the
/// entry assembly and based in its directory; an apphost is its own entry
/// point.
fn default_domain(cmdline: &[String], cwd: &Path, exe_path: &Path) -> AppDomainRecord {
    let host = exe_path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();

    let entry = MANAGED_HOSTS
        .contains(&host)
        .then(|| {
            cmdline.iter().skip(1).find(|arg| {
                let lower = arg.to_ascii_lowercase();
                !arg.starts_with('-')
                    && (lower.ends_with(".dll") || lower.ends_with(".exe"))
            })
        })
        .flatten()
        .map_or_else(|| exe_path.to_path_buf(), |assembly| cwd.join(assembly));

    let name = entry.file_name().map_or_else(
        || cmdline.first().cloned().unwrap_or_default(),
        |name| name.to_string_lossy().into_owned(),
    );
    let application_base = entry.parent().map_or_else(String::new, |dir| {
        let dir = dir.display().to_string();
        if dir.ends_with('/') {
            dir
        } else {
            format!("{dir}/")
        }
    });

    AppDomainRecord { name, id: DEFAULT_DOMAIN_ID, application_base }
}
