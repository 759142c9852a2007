//! Managed runtime detection from the module list.
//!
//! A runtime is "present" when its engine library is mapped into the target.
//! The version comes from where the library lives: .NET installs each
//! runtime under `shared/Microsoft.NETCore.App/<version>/`.

use std::path::Path;

use crate::domain::{ClrInfo, RuntimeFlavor};
use crate::symbolization::MemoryMap;

/// Runtime family of a module, judged by file name
fn flavor_of(file_name: &str) -> Option<RuntimeFlavor> {
    match file_name {
        "libcoreclr.so" | "libcoreclr.dylib" | "coreclr.dll" => Some(RuntimeFlavor::CoreClr),
        "clr.dll" | "mscorwks.dll" => Some(RuntimeFlavor::Desktop),
        name if name.starts_with("libmonosgen-2.0.so")
            || name.starts_with("libmono-2.0.so")
            || name == "mono-2.0-sgen.dll" =>
        {
            Some(RuntimeFlavor::Mono)
        }
        _ => None,
    }
}

/// Runtimes whose engine library is mapped, in mapping order
#[must_use]
pub fn detect_runtimes(map: &MemoryMap) -> Vec<ClrInfo> {
    map.file_paths()
        .into_iter()
        .filter_map(|path| {
            let file_name = path.file_name()?.to_str()?;
            let flavor = flavor_of(file_name)?;
            Some(ClrInfo {
                flavor,
                version: version_from_path(path).unwrap_or_else(|| "unknown".to_string()),
                module_path: path.to_path_buf(),
            })
        })
        .collect()
}

/// Best-effort version of a module from its path.
///
/// Tries the soname suffix first (`libssl.so.3` → `3`), then a versioned
/// parent directory (`.../8.0.1/libcoreclr.so` → `8.0.1`).
#[must_use]
pub fn version_from_path(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if let Some((_, suffix)) = file_name.split_once(".so.") {
        if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Some(suffix.to_string());
        }
    }

    let parent = path.parent()?.file_name()?.to_str()?;
    looks_like_version(parent).then(|| parent.to_string())
}

/// `8.0.1`, `4.0.30319`, `9.0.0-preview.7.24405.7`
fn looks_like_version(s: &str) -> bool {
    let numeric = s.split_once('-').map_or(s, |(head, _)| head);
    numeric.starts_with(|c: char| c.is_ascii_digit())
        && numeric.contains('.')
        && numeric.chars().all(|c| c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CORECLR_MAPS: &str = "\
55d0c8a00000-55d0c8a10000 r-xp 00000000 08:01 1311 /usr/share/dotnet/dotnet
7f00ab000000-7f00ab200000 r-xp 00000000 08:01 2222 /usr/share/dotnet/shared/Microsoft.NETCore.App/8.0.1/libcoreclr.so
7f00ab200000-7f00ab300000 r--p 00200000 08:01 2222 /usr/share/dotnet/shared/Microsoft.NETCore.App/8.0.1/libcoreclr.so
7f00ac000000-7f00ac100000 r-xp 00000000 08:01 4444 /usr/share/dotnet/shared/Microsoft.NETCore.App/8.0.1/libmono-native.so
7f00ad000000-7f00ad100000 r-xp 00000000 08:01 5555 /usr/lib/x86_64-linux-gnu/libc.so.6
";

    #[test]
    fn test_detect_coreclr() {
        let map = MemoryMap::parse(CORECLR_MAPS).unwrap();
        let runtimes = detect_runtimes(&map);
        assert_eq!(runtimes.len(), 1);
        assert_eq!(runtimes[0].flavor, RuntimeFlavor::CoreClr);
        assert_eq!(runtimes[0].version, "8.0.1");
        assert!(runtimes[0].module_path.ends_with("libcoreclr.so"));
    }

    #[test]
    fn test_detect_nothing_in_native_process() {
        let map = MemoryMap::parse(
            "55d0c8a00000-55d0c8a10000 r-xp 00000000 08:01 1311 /usr/bin/sleep\n",
        )
        .unwrap();
        assert!(detect_runtimes(&map).is_empty());
    }

    #[test]
    fn test_detect_mono_from_soname() {
        let map = MemoryMap::parse(
            "7f00ab000000-7f00ab200000 r-xp 00000000 08:01 2222 /usr/lib/libmonosgen-2.0.so.1.0.0\n",
        )
        .unwrap();
        let runtimes = detect_runtimes(&map);
        assert_eq!(runtimes.len(), 1);
        assert_eq!(runtimes[0].flavor, RuntimeFlavor::Mono);
        assert_eq!(runtimes[0].version, "1.0.0");
    }

    #[test]
    fn test_version_from_soname() {
        assert_eq!(
            version_from_path(&PathBuf::from("/usr/lib/libssl.so.3")).as_deref(),
            Some("3")
        );
        assert_eq!(version_from_path(&PathBuf::from("/usr/lib/libfoo.so")), None);
    }

    #[test]
    fn test_version_from_parent_directory() {
        let path = PathBuf::from("/dotnet/shared/Microsoft.NETCore.App/9.0.0-preview.7.24405.7/libcoreclr.so");
        assert_eq!(version_from_path(&path).as_deref(), Some("9.0.0-preview.7.24405.7"));
        assert_eq!(version_from_path(&PathBuf::from("/opt/app/bin/App")), None);
    }
}
