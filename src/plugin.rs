//! # Codegen Plugins
//!
//! A codegen plugin is a shared library exporting a small C ABI:
//!
//! | symbol                            | required | purpose                               |
//! |-----------------------------------|----------|---------------------------------------|
//! | `ecsact_codegen_plugin_name`      | yes      | plugin name, used in output names     |
//! | `ecsact_codegen_plugin`           | yes      | generate code for one package         |
//! | `ecsact_dylib_set_fn_addr`        | yes      | receive a host function address       |
//! | `ecsact_dylib_has_fn`             | no       | whether a host function is wanted     |
//! | `ecsact_codegen_output_filenames` | no       | custom output file names              |
//!
//! The host talks to plugins through the [`CodegenPlugin`] trait so the
//! codegen pass can be driven by in-process fakes in tests. [`DylibPlugin`]
//! is the implementation backed by `libloading`.

use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;

use crate::error::{Error, Result};
use crate::report::Severity;

/// Identifier of a package known to the language host.
pub type PackageId = i32;

/// Most output files a plugin may declare for one package.
pub const MAX_OUTPUT_FILENAMES: usize = 16;

/// Buffer size handed to a plugin for each output file name.
pub const MAX_OUTPUT_FILENAME_LEN: usize = 1024;

type PluginNameFn = unsafe extern "C" fn() -> *const c_char;
type WriteFn = unsafe extern "C" fn(i32, *const c_char, i32);
type ReportFn = unsafe extern "C" fn(i32, i32, *const c_char, i32);
type PluginFn = unsafe extern "C" fn(PackageId, WriteFn, ReportFn);
type SetFnAddrFn = unsafe extern "C" fn(*const c_char, *const c_void);
type HasFnFn = unsafe extern "C" fn(*const c_char) -> bool;
type OutputFilenamesFn =
    unsafe extern "C" fn(PackageId, *const *mut c_char, i32, i32, *mut i32);

/// A function the host makes available to plugins.
#[derive(Debug, Clone)]
pub struct HostFunction {
    pub name: String,
    pub address: *const c_void,
}

/// Something a plugin did while generating one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    Write {
        filename_index: i32,
        bytes: Vec<u8>,
    },
    Report {
        filename_index: i32,
        severity: Severity,
        message: String,
    },
}

/// Host-side view of a loaded codegen plugin.
pub trait CodegenPlugin {
    /// Name the plugin declares for itself.
    fn name(&self) -> &str;

    /// Where the plugin was loaded from.
    fn location(&self) -> &Path;

    /// Whether the plugin wants the named host function. Plugins that do not
    /// answer are given everything.
    fn has_fn(&self, _function: &str) -> bool {
        true
    }

    /// Hand the plugin the address of a host function.
    fn set_fn_addr(&mut self, function: &str, address: *const c_void);

    /// Output file names the plugin wants for a package, or `None` when the
    /// plugin leaves naming to the host.
    fn output_filenames(&mut self, package_id: PackageId) -> Result<Option<Vec<String>>>;

    /// Generate code for one package.
    fn generate(&mut self, package_id: PackageId) -> Vec<PluginEvent>;

    /// Release the plugin.
    fn unload(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Loads plugins from resolved paths.
pub trait PluginLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn CodegenPlugin>>;
}

/// Loads shared-library plugins.
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl PluginLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn CodegenPlugin>> {
        Ok(Box::new(DylibPlugin::load(path)?))
    }
}

thread_local! {
    static PLUGIN_EVENTS: RefCell<Vec<PluginEvent>> = const { RefCell::new(Vec::new()) };
}

fn c_bytes<'a>(data: *const c_char, len: i32) -> &'a [u8] {
    if data.is_null() || len <= 0 {
        return &[];
    }
    // SAFETY: the plugin ABI guarantees `data` points at `len` readable bytes
    // for the duration of the callback.
    unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len as usize) }
}

extern "C" fn write_trampoline(filename_index: i32, data: *const c_char, len: i32) {
    let bytes = c_bytes(data, len).to_vec();
    PLUGIN_EVENTS.with(|events| {
        events.borrow_mut().push(PluginEvent::Write {
            filename_index,
            bytes,
        })
    });
}

extern "C" fn report_trampoline(filename_index: i32, kind: i32, data: *const c_char, len: i32) {
    let message = String::from_utf8_lossy(c_bytes(data, len)).into_owned();
    PLUGIN_EVENTS.with(|events| {
        events.borrow_mut().push(PluginEvent::Report {
            filename_index,
            severity: Severity::from_abi(kind),
            message,
        })
    });
}

/// A plugin loaded from a shared library.
pub struct DylibPlugin {
    name: String,
    location: PathBuf,
    plugin_fn: PluginFn,
    set_fn_addr_fn: SetFnAddrFn,
    has_fn_fn: Option<HasFnFn>,
    output_filenames_fn: Option<OutputFilenamesFn>,
    // Declared last: the function pointers above are only valid while the
    // library stays loaded.
    library: Library,
}

impl DylibPlugin {
    /// Load a plugin and look up its exported symbols.
    pub fn load(path: &Path) -> Result<Self> {
        let plugin_error = |message: String| Error::Plugin {
            plugin: path.display().to_string(),
            message,
        };

        // SAFETY: plugins are trusted native code; loading runs their
        // initializers in-process.
        let library = unsafe { Library::new(path) }.map_err(|e| plugin_error(e.to_string()))?;

        // SAFETY: the symbol types match the plugin ABI. The copied function
        // pointers are stored next to `library`, which outlives them.
        let (name_fn, plugin_fn, set_fn_addr_fn, has_fn_fn, output_filenames_fn) = unsafe {
            let required = |symbol: &[u8]| {
                plugin_error(format!(
                    "missing required symbol {}",
                    String::from_utf8_lossy(&symbol[..symbol.len() - 1])
                ))
            };
            let name_fn = *library
                .get::<PluginNameFn>(b"ecsact_codegen_plugin_name\0")
                .map_err(|_| required(b"ecsact_codegen_plugin_name\0"))?;
            let plugin_fn = *library
                .get::<PluginFn>(b"ecsact_codegen_plugin\0")
                .map_err(|_| required(b"ecsact_codegen_plugin\0"))?;
            let set_fn_addr_fn = *library
                .get::<SetFnAddrFn>(b"ecsact_dylib_set_fn_addr\0")
                .map_err(|_| required(b"ecsact_dylib_set_fn_addr\0"))?;
            let has_fn_fn = library
                .get::<HasFnFn>(b"ecsact_dylib_has_fn\0")
                .ok()
                .map(|symbol| *symbol);
            let output_filenames_fn = library
                .get::<OutputFilenamesFn>(b"ecsact_codegen_output_filenames\0")
                .ok()
                .map(|symbol| *symbol);
            (name_fn, plugin_fn, set_fn_addr_fn, has_fn_fn, output_filenames_fn)
        };

        // SAFETY: the plugin returns a NUL terminated static string.
        let name = unsafe {
            let raw = name_fn();
            if raw.is_null() {
                return Err(plugin_error("plugin name is null".to_string()));
            }
            CStr::from_ptr(raw).to_string_lossy().into_owned()
        };

        Ok(Self {
            name,
            location: path.to_path_buf(),
            plugin_fn,
            set_fn_addr_fn,
            has_fn_fn,
            output_filenames_fn,
            library,
        })
    }
}

impl CodegenPlugin for DylibPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn has_fn(&self, function: &str) -> bool {
        let (Some(has_fn), Ok(function)) = (self.has_fn_fn, CString::new(function)) else {
            return true;
        };
        // SAFETY: `function` is a valid NUL terminated string for the call.
        unsafe { has_fn(function.as_ptr()) }
    }

    fn set_fn_addr(&mut self, function: &str, address: *const c_void) {
        let Ok(function) = CString::new(function) else {
            return;
        };
        // SAFETY: `function` is a valid NUL terminated string for the call.
        unsafe { (self.set_fn_addr_fn)(function.as_ptr(), address) }
    }

    fn output_filenames(&mut self, package_id: PackageId) -> Result<Option<Vec<String>>> {
        let Some(output_filenames) = self.output_filenames_fn else {
            return Ok(None);
        };

        let mut count: i32 = 0;
        // SAFETY: a null name array with zero capacity only asks for the count.
        unsafe { output_filenames(package_id, ptr::null(), 0, 0, &mut count) };

        if count <= 0 || count as usize > MAX_OUTPUT_FILENAMES {
            return Err(Error::Plugin {
                plugin: self.name.clone(),
                message: format!(
                    "ecsact_codegen_output_filenames returned {} filenames, expected 1 to {}",
                    count, MAX_OUTPUT_FILENAMES
                ),
            });
        }

        let mut buffers = vec![vec![0u8; MAX_OUTPUT_FILENAME_LEN]; MAX_OUTPUT_FILENAMES];
        let pointers: Vec<*mut c_char> = buffers
            .iter_mut()
            .map(|buffer| buffer.as_mut_ptr().cast::<c_char>())
            .collect();

        // SAFETY: every pointer addresses a writable buffer of
        // MAX_OUTPUT_FILENAME_LEN bytes, and there are MAX_OUTPUT_FILENAMES
        // of them.
        unsafe {
            output_filenames(
                package_id,
                pointers.as_ptr(),
                MAX_OUTPUT_FILENAMES as i32,
                MAX_OUTPUT_FILENAME_LEN as i32,
                ptr::null_mut(),
            )
        };

        Ok(Some(
            buffers
                .iter()
                .take(count as usize)
                .map(|buffer| {
                    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
                    String::from_utf8_lossy(&buffer[..end]).into_owned()
                })
                .collect(),
        ))
    }

    fn generate(&mut self, package_id: PackageId) -> Vec<PluginEvent> {
        PLUGIN_EVENTS.with(|events| events.borrow_mut().clear());
        // SAFETY: the trampolines match the callback ABI and only touch
        // thread-local state.
        unsafe { (self.plugin_fn)(package_id, write_trampoline, report_trampoline) };
        PLUGIN_EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
    }

    fn unload(self: Box<Self>) -> Result<()> {
        let plugin = self.name.clone();
        self.library.close().map_err(|e| Error::Plugin {
            plugin,
            message: format!("failed to unload: {}", e),
        })
    }
}

/// Whether a plugin reference names a built-in plugin rather than a path.
///
/// Built-in names contain no path separators and no `.`.
pub fn is_builtin_plugin_name(plugin: &str) -> bool {
    !plugin.is_empty() && !plugin.contains(['/', '\\', '.'])
}

/// File name of a built-in plugin on this platform.
pub fn builtin_plugin_filename(name: &str) -> String {
    format!("ecsact_{}_codegen{}", name, std::env::consts::DLL_SUFFIX)
}

/// Where to look for codegen plugins.
#[derive(Debug, Clone, Default)]
pub struct PluginSearch {
    /// Directory holding built-in plugins.
    pub default_plugins_dir: Option<PathBuf>,
    /// Base directory relative plugin paths resolve against.
    pub base_directory: PathBuf,
    /// Further directories to try, in order.
    pub additional_dirs: Vec<PathBuf>,
}

/// Find the shared library a plugin reference points at.
///
/// Lookup order: the built-in plugins directory (names only), the path
/// itself (relative to the base directory when relative), then every
/// additional directory. A path without an extension gets the platform's
/// shared library suffix. The error lists every location checked.
pub fn resolve_plugin_path(plugin: &str, search: &PluginSearch) -> Result<PathBuf> {
    let mut checked = Vec::new();

    if is_builtin_plugin_name(plugin) {
        if let Some(dir) = &search.default_plugins_dir {
            let candidate = dir.join(builtin_plugin_filename(plugin));
            if candidate.is_file() {
                return Ok(candidate);
            }
            checked.push(candidate);
        }
    }

    let mut path = PathBuf::from(plugin);
    if path.extension().is_none() {
        let suffix = std::env::consts::DLL_SUFFIX.trim_start_matches('.');
        path.set_extension(suffix);
    }

    let mut candidates = Vec::new();
    if path.is_absolute() {
        candidates.push(path.clone());
    } else {
        candidates.push(search.base_directory.join(&path));
        candidates.push(path.clone());
        candidates.extend(search.additional_dirs.iter().map(|dir| dir.join(&path)));
    }

    for candidate in candidates {
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !checked.contains(&candidate) {
            checked.push(candidate);
        }
    }

    Err(Error::PluginNotFound {
        plugin: plugin.to_string(),
        checked,
    })
}
