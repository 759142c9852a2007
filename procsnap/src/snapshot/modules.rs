//! `Loaded modules:` section.

use log::warn;

use crate::domain::SnapshotError;
use crate::introspection::DataTarget;
use crate::report::ReportWriter;

/// Write the module list, or a single diagnostic line if it can't be read.
///
/// Returns the number of modules written.
///
/// # Errors
/// Only report I/O failures; enumeration failures are written, not returned.
pub fn write_modules(
    target: &dyn DataTarget,
    report: &mut ReportWriter<'_>,
) -> Result<usize, SnapshotError> {
    let modules = match target.enumerate_modules() {
        Ok(modules) => modules,
        Err(e) => {
            warn!("Module enumeration failed: {e}");
            report.emit(&format!("Couldn't enumerate modules: {e}"))?;
            return Ok(0);
        }
    };

    report.emit("Loaded modules: ")?;
    for module in &modules {
        report.emit(&format!("   {} {}", module.file_path.display(), module.version))?;
    }
    Ok(modules.len())
}
