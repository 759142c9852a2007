//! `AppDomains:` section.

use crate::domain::{Section, SnapshotError};
use crate::introspection::ClrRuntime;
use crate::report::ReportWriter;

/// Write one line per application domain.
///
/// # Errors
/// `FatalTraversal` if the domain list cannot be read, or a report I/O error.
pub fn write_app_domains(
    runtime: &dyn ClrRuntime,
    report: &mut ReportWriter<'_>,
) -> Result<usize, SnapshotError> {
    report.emit("AppDomains: ")?;
    let domains = runtime
        .app_domains()
        .map_err(|source| SnapshotError::FatalTraversal { section: Section::AppDomains, source })?;
    for domain in &domains {
        report.emit(&format!("   {}[{}] {}", domain.name, domain.id, domain.application_base))?;
    }
    Ok(domains.len())
}
