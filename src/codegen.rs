//! # Codegen Pass
//!
//! Runs a set of codegen plugins over every package the language host knows
//! about. The pass happens in three stages:
//!
//! 1. **Load**: every plugin is loaded and handed the host functions it asks
//!    for. Any load failure aborts the pass.
//! 2. **Plan**: output paths are computed for every plugin and package.
//!    Collisions are all reported, and the pass stops before any file is
//!    written.
//! 3. **Generate**: each plugin runs for each package, one output stream set
//!    at a time, and is unloaded when done.
//!
//! A plugin reporting a fatal message fails that package without stopping
//! other packages or plugins, but the pass as a whole fails.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::plugin::{CodegenPlugin, HostFunction, PackageId, PluginEvent, PluginLoader};
use crate::report::{Reporter, Severity};

/// What the language host makes available to a codegen pass.
pub trait CodegenHost {
    /// Packages to generate code for.
    fn package_ids(&self) -> Vec<PackageId>;

    /// Source file of a package.
    fn package_file_path(&self, package_id: PackageId) -> Option<PathBuf>;

    /// Host functions plugins may bind to.
    fn host_functions(&self) -> Vec<HostFunction>;
}

/// Where generated code goes.
pub enum CodegenOutput<'a> {
    /// One file per output path.
    Files,
    /// Everything into a single caller-owned sink. Plugins declaring more than
    /// one output file cannot use it.
    Writer(&'a mut dyn Write),
    /// Only report the paths that would be generated.
    PrintOutputPaths,
}

/// Settings for one codegen pass.
pub struct CodegenOptions<'a> {
    pub plugin_paths: Vec<PathBuf>,
    /// Directory every output file is placed in, instead of next to its
    /// package.
    pub outdir: Option<PathBuf>,
    pub output: CodegenOutput<'a>,
}

impl<'a> CodegenOptions<'a> {
    pub fn new(plugin_paths: Vec<PathBuf>) -> Self {
        Self {
            plugin_paths,
            outdir: None,
            output: CodegenOutput::Files,
        }
    }

    pub fn with_outdir(mut self, outdir: impl Into<PathBuf>) -> Self {
        self.outdir = Some(outdir.into());
        self
    }

    pub fn with_output(mut self, output: CodegenOutput<'a>) -> Self {
        self.output = output;
        self
    }
}

/// Output files planned for one plugin and package.
#[derive(Debug)]
struct PlannedPackage {
    package_id: PackageId,
    outputs: Vec<PathBuf>,
}

/// Default output file of a plugin for a package: the package file with the
/// plugin name appended to its extension.
pub fn default_output_path(package_file: &Path, plugin_name: &str) -> PathBuf {
    let extension = match package_file.extension() {
        Some(extension) => format!("{}.{}", extension.to_string_lossy(), plugin_name),
        None => plugin_name.to_string(),
    };
    package_file.with_extension(extension)
}

/// Run a codegen pass. Returns every output path the pass produced (or, in
/// print mode, would produce).
pub fn run_codegen(
    options: CodegenOptions<'_>,
    host: &dyn CodegenHost,
    loader: &dyn PluginLoader,
    reporter: &dyn Reporter,
) -> Result<Vec<PathBuf>> {
    let CodegenOptions {
        plugin_paths,
        outdir,
        mut output,
    } = options;

    let mut plugins = load_plugins(&plugin_paths, host, loader, reporter)?;
    let mut has_error = false;

    let mut plans: Vec<Vec<PlannedPackage>> = Vec::with_capacity(plugins.len());
    for plugin in plugins.iter_mut() {
        let (plan, ok) = plan_outputs(plugin.as_mut(), host, outdir.as_deref(), reporter);
        has_error |= !ok;
        plans.push(plan);
    }

    let collisions = find_collisions(&plugins, &plans, reporter);
    if collisions > 0 {
        unload_all(plugins, reporter);
        return Err(Error::Codegen {
            message: format!("{} output file collision(s)", collisions),
        });
    }

    let all_outputs: Vec<PathBuf> = plans
        .iter()
        .flat_map(|plan| plan.iter().flat_map(|pkg| pkg.outputs.iter().cloned()))
        .collect();

    match &mut output {
        CodegenOutput::PrintOutputPaths => {
            for path in &all_outputs {
                reporter.info(&path.display().to_string());
            }
            unload_all(plugins, reporter);
            return finish(has_error, all_outputs);
        }
        CodegenOutput::Writer(_) => {
            if plans.iter().flatten().any(|pkg| pkg.outputs.len() > 1) {
                unload_all(plugins, reporter);
                return Err(Error::Codegen {
                    message: "cannot write multiple output files to a single stream".to_string(),
                });
            }
        }
        CodegenOutput::Files => {
            if let Some(outdir) = &outdir {
                fs::create_dir_all(outdir)?;
            }
        }
    }

    for (plugin, plan) in plugins.into_iter().zip(plans) {
        let mut plugin = plugin;
        for package in &plan {
            let ok = match &mut output {
                CodegenOutput::Writer(writer) => {
                    generate_to_writer(plugin.as_mut(), package, &mut **writer, reporter)
                }
                _ => generate_to_files(plugin.as_mut(), package, reporter),
            };
            if !ok {
                has_error = true;
                reporter.error(&format!(
                    "Codegen plugin '{}' reported fatal error for package {}",
                    plugin.name(),
                    package.package_id
                ));
            }
        }
        let name = plugin.name().to_string();
        if let Err(err) = plugin.unload() {
            reporter.warning(&format!("Plugin '{}': {}", name, err));
        }
    }

    finish(has_error, all_outputs)
}

fn finish(has_error: bool, outputs: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if has_error {
        Err(Error::Codegen {
            message: "one or more codegen plugins failed".to_string(),
        })
    } else {
        Ok(outputs)
    }
}

fn load_plugins(
    plugin_paths: &[PathBuf],
    host: &dyn CodegenHost,
    loader: &dyn PluginLoader,
    reporter: &dyn Reporter,
) -> Result<Vec<Box<dyn CodegenPlugin>>> {
    let host_functions = host.host_functions();
    let mut plugins: Vec<Box<dyn CodegenPlugin>> = Vec::with_capacity(plugin_paths.len());

    for path in plugin_paths {
        let mut plugin = match loader.load(path) {
            Ok(plugin) => plugin,
            Err(err) => {
                reporter.error(&format!("Failed to load plugin {}: {}", path.display(), err));
                unload_all(plugins, reporter);
                return Err(err);
            }
        };

        let duplicate = plugins
            .iter()
            .find(|p| p.name() == plugin.name())
            .map(|p| p.location().to_path_buf());
        if let Some(existing) = duplicate {
            let err = Error::Plugin {
                plugin: plugin.name().to_string(),
                message: format!(
                    "name used by both {} and {}",
                    existing.display(),
                    plugin.location().display()
                ),
            };
            reporter.error(&err.to_string());
            plugins.push(plugin);
            unload_all(plugins, reporter);
            return Err(err);
        }

        for function in &host_functions {
            if plugin.has_fn(&function.name) {
                plugin.set_fn_addr(&function.name, function.address);
            }
        }

        log::debug!("loaded plugin '{}' from {}", plugin.name(), path.display());
        plugins.push(plugin);
    }

    Ok(plugins)
}

fn unload_all(plugins: Vec<Box<dyn CodegenPlugin>>, reporter: &dyn Reporter) {
    for plugin in plugins {
        let name = plugin.name().to_string();
        if let Err(err) = plugin.unload() {
            reporter.warning(&format!("Plugin '{}': {}", name, err));
        }
    }
}

/// Compute output paths of one plugin for every package. The flag is false
/// when some package could not be planned.
fn plan_outputs(
    plugin: &mut dyn CodegenPlugin,
    host: &dyn CodegenHost,
    outdir: Option<&Path>,
    reporter: &dyn Reporter,
) -> (Vec<PlannedPackage>, bool) {
    let mut plan = Vec::new();
    let mut ok = true;

    for package_id in host.package_ids() {
        let package_file = match host.package_file_path(package_id) {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => {
                reporter.error(&format!(
                    "Package {} has no file path, cannot generate '{}' output",
                    package_id,
                    plugin.name()
                ));
                ok = false;
                continue;
            }
        };

        let mut outputs = match plugin.output_filenames(package_id) {
            Ok(Some(filenames)) => {
                let parent = package_file.parent().unwrap_or(Path::new(""));
                filenames.iter().map(|name| parent.join(name)).collect()
            }
            Ok(None) => vec![default_output_path(&package_file, plugin.name())],
            Err(err) => {
                reporter.error(&err.to_string());
                ok = false;
                continue;
            }
        };

        if let Some(outdir) = outdir {
            outputs = outputs
                .into_iter()
                .map(|path| match path.file_name() {
                    Some(filename) => outdir.join(filename),
                    None => outdir.join(path),
                })
                .collect();
        }

        plan.push(PlannedPackage {
            package_id,
            outputs,
        });
    }

    (plan, ok)
}

fn find_collisions(
    plugins: &[Box<dyn CodegenPlugin>],
    plans: &[Vec<PlannedPackage>],
    reporter: &dyn Reporter,
) -> usize {
    let mut owners: HashMap<&Path, usize> = HashMap::new();
    let mut collisions = 0;

    for (index, plan) in plans.iter().enumerate() {
        for path in plan.iter().flat_map(|pkg| pkg.outputs.iter()) {
            match owners.get(path.as_path()) {
                Some(&owner) => {
                    collisions += 1;
                    reporter.error(&format!(
                        "Plugin '{}' ({}) has conflicts with plugin '{}' output file {}",
                        plugins[index].name(),
                        plugins[index].location().display(),
                        plugins[owner].name(),
                        path.display()
                    ));
                }
                None => {
                    owners.insert(path.as_path(), index);
                }
            }
        }
    }

    collisions
}

/// Forward a plugin report. Returns false when it was fatal.
fn forward_report(
    plugin_name: &str,
    severity: Severity,
    message: &str,
    reporter: &dyn Reporter,
) -> bool {
    reporter.report(severity, &format!("[{}] {}", plugin_name, message));
    severity != Severity::Fatal
}

fn known_index(index: i32, outputs: usize) -> bool {
    usize::try_from(index).is_ok_and(|index| index < outputs)
}

fn invalid_index(plugin_name: &str, index: i32, reporter: &dyn Reporter) -> bool {
    forward_report(
        plugin_name,
        Severity::Fatal,
        &format!("invalid output filename index {}", index),
        reporter,
    )
}

fn generate_to_files(
    plugin: &mut dyn CodegenPlugin,
    package: &PlannedPackage,
    reporter: &dyn Reporter,
) -> bool {
    let name = plugin.name().to_string();
    let mut streams = Vec::with_capacity(package.outputs.len());
    for path in &package.outputs {
        match open_output(path) {
            Ok(stream) => streams.push(stream),
            Err(err) => {
                reporter.error(&format!(
                    "[{}] failed to open {}: {}",
                    name,
                    path.display(),
                    err
                ));
                return false;
            }
        }
    }

    let mut ok = true;
    for event in plugin.generate(package.package_id) {
        match event {
            PluginEvent::Write {
                filename_index,
                bytes,
            } => match usize::try_from(filename_index)
                .ok()
                .and_then(|index| streams.get_mut(index))
            {
                Some(stream) => {
                    if let Err(err) = stream.write_all(&bytes) {
                        reporter.error(&format!("[{}] write failed: {}", name, err));
                        ok = false;
                    }
                }
                None => ok &= invalid_index(&name, filename_index, reporter),
            },
            PluginEvent::Report {
                filename_index,
                severity,
                message,
            } => {
                ok &= if known_index(filename_index, streams.len()) {
                    forward_report(&name, severity, &message, reporter)
                } else {
                    invalid_index(&name, filename_index, reporter)
                }
            }
        }
    }

    for (stream, path) in streams.iter_mut().zip(&package.outputs) {
        if let Err(err) = stream.flush() {
            reporter.error(&format!("[{}] failed to write {}: {}", name, path.display(), err));
            ok = false;
        }
    }

    ok
}

fn open_output(path: &Path) -> Result<BufWriter<fs::File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(fs::File::create(path)?))
}

fn generate_to_writer(
    plugin: &mut dyn CodegenPlugin,
    package: &PlannedPackage,
    writer: &mut dyn Write,
    reporter: &dyn Reporter,
) -> bool {
    let name = plugin.name().to_string();
    let mut ok = true;
    for event in plugin.generate(package.package_id) {
        match event {
            PluginEvent::Write {
                filename_index: 0,
                bytes,
            } => {
                if let Err(err) = writer.write_all(&bytes) {
                    reporter.error(&format!("[{}] write failed: {}", name, err));
                    ok = false;
                }
            }
            PluginEvent::Write { filename_index, .. } => {
                ok &= invalid_index(&name, filename_index, reporter)
            }
            PluginEvent::Report {
                filename_index,
                severity,
                message,
            } => {
                ok &= if known_index(filename_index, 1) {
                    forward_report(&name, severity, &message, reporter)
                } else {
                    invalid_index(&name, filename_index, reporter)
                }
            }
        }
    }
    if let Err(err) = writer.flush() {
        reporter.error(&format!("[{}] flush failed: {}", name, err));
        ok = false;
    }
    ok
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::ffi::c_void;
    use std::rc::Rc;

    /// Scripted plugin for exercising the pass without shared libraries.
    #[derive(Clone)]
    pub struct FakePlugin {
        pub name: String,
        pub location: PathBuf,
        pub wanted_fns: Option<Vec<String>>,
        pub filenames: Option<Vec<String>>,
        pub events: Vec<PluginEvent>,
        pub bound_fns: Rc<RefCell<Vec<String>>>,
        pub unloaded: Rc<RefCell<Vec<String>>>,
    }

    impl FakePlugin {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                location: PathBuf::from(format!("/plugins/{}.so", name)),
                wanted_fns: None,
                filenames: None,
                events: vec![PluginEvent::Write {
                    filename_index: 0,
                    bytes: format!("// {}\n", name).into_bytes(),
                }],
                bound_fns: Rc::default(),
                unloaded: Rc::default(),
            }
        }
    }

    impl CodegenPlugin for FakePlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn location(&self) -> &Path {
            &self.location
        }

        fn has_fn(&self, function: &str) -> bool {
            match &self.wanted_fns {
                Some(wanted) => wanted.iter().any(|f| f == function),
                None => true,
            }
        }

        fn set_fn_addr(&mut self, function: &str, _address: *const c_void) {
            self.bound_fns.borrow_mut().push(function.to_string());
        }

        fn output_filenames(&mut self, _package_id: PackageId) -> Result<Option<Vec<String>>> {
            Ok(self.filenames.clone())
        }

        fn generate(&mut self, _package_id: PackageId) -> Vec<PluginEvent> {
            self.events.clone()
        }

        fn unload(self: Box<Self>) -> Result<()> {
            self.unloaded.borrow_mut().push(self.name.clone());
            Ok(())
        }
    }

    /// Hands out clones of registered fake plugins by path.
    #[derive(Default)]
    pub struct FakeLoader {
        plugins: HashMap<PathBuf, FakePlugin>,
    }

    impl FakeLoader {
        pub fn with(mut self, path: impl Into<PathBuf>, plugin: FakePlugin) -> Self {
            self.plugins.insert(path.into(), plugin);
            self
        }
    }

    impl PluginLoader for FakeLoader {
        fn load(&self, path: &Path) -> Result<Box<dyn CodegenPlugin>> {
            self.plugins
                .get(path)
                .cloned()
                .map(|plugin| Box::new(plugin) as Box<dyn CodegenPlugin>)
                .ok_or_else(|| Error::Plugin {
                    plugin: path.display().to_string(),
                    message: "cannot open shared object file".to_string(),
                })
        }
    }

    /// Host with a fixed package table.
    pub struct FakeHost {
        pub packages: Vec<(PackageId, PathBuf)>,
        pub functions: Vec<&'static str>,
    }

    impl FakeHost {
        pub fn new(packages: Vec<(PackageId, PathBuf)>) -> Self {
            Self {
                packages,
                functions: vec!["ecsact_meta_count_packages", "ecsact_meta_package_name"],
            }
        }
    }

    impl CodegenHost for FakeHost {
        fn package_ids(&self) -> Vec<PackageId> {
            self.packages.iter().map(|(id, _)| *id).collect()
        }

        fn package_file_path(&self, package_id: PackageId) -> Option<PathBuf> {
            self.packages
                .iter()
                .find(|(id, _)| *id == package_id)
                .map(|(_, path)| path.clone())
        }

        fn host_functions(&self) -> Vec<HostFunction> {
            self.functions
                .iter()
                .map(|name| HostFunction {
                    name: name.to_string(),
                    address: std::ptr::null(),
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::report::CollectingReporter;
    use tempfile::TempDir;

    fn package_fixture(temp_dir: &TempDir) -> PathBuf {
        let package = temp_dir.path().join("pkg/example.ecsact");
        fs::create_dir_all(package.parent().unwrap()).unwrap();
        fs::write(&package, "package example;").unwrap();
        package
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("a/example.ecsact"), "cpp_header"),
            PathBuf::from("a/example.ecsact.cpp_header")
        );
        assert_eq!(
            default_output_path(Path::new("a/example"), "cpp_header"),
            PathBuf::from("a/example.cpp_header")
        );
    }

    #[test]
    fn test_generates_next_to_package() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let plugin = FakePlugin::new("cpp_header");
        let unloaded = plugin.unloaded.clone();
        let loader = FakeLoader::default().with("/p/cpp_header.so", plugin);
        let host = FakeHost::new(vec![(1, package.clone())]);
        let reporter = CollectingReporter::new();

        let outputs = run_codegen(
            CodegenOptions::new(vec![PathBuf::from("/p/cpp_header.so")]),
            &host,
            &loader,
            &reporter,
        )
        .unwrap();

        let expected = temp_dir.path().join("pkg/example.ecsact.cpp_header");
        assert_eq!(outputs, vec![expected.clone()]);
        assert_eq!(fs::read_to_string(expected).unwrap(), "// cpp_header\n");
        assert_eq!(*unloaded.borrow(), vec!["cpp_header".to_string()]);
    }

    #[test]
    fn test_outdir_and_custom_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let outdir = temp_dir.path().join("gen");

        let mut plugin = FakePlugin::new("split");
        plugin.filenames = Some(vec!["example.hh".to_string(), "example.cc".to_string()]);
        plugin.events = vec![
            PluginEvent::Write {
                filename_index: 0,
                bytes: b"#pragma once\n".to_vec(),
            },
            PluginEvent::Write {
                filename_index: 1,
                bytes: b"#include \"example.hh\"\n".to_vec(),
            },
        ];
        let loader = FakeLoader::default().with("split.so", plugin);
        let host = FakeHost::new(vec![(7, package)]);
        let reporter = CollectingReporter::new();

        let outputs = run_codegen(
            CodegenOptions::new(vec![PathBuf::from("split.so")]).with_outdir(&outdir),
            &host,
            &loader,
            &reporter,
        )
        .unwrap();

        assert_eq!(outputs, vec![outdir.join("example.hh"), outdir.join("example.cc")]);
        assert_eq!(
            fs::read_to_string(outdir.join("example.hh")).unwrap(),
            "#pragma once\n"
        );
        assert_eq!(
            fs::read_to_string(outdir.join("example.cc")).unwrap(),
            "#include \"example.hh\"\n"
        );
    }

    #[test]
    fn test_has_fn_filters_host_functions() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let mut picky = FakePlugin::new("picky");
        picky.wanted_fns = Some(vec!["ecsact_meta_package_name".to_string()]);
        let picky_bound = picky.bound_fns.clone();
        let greedy = FakePlugin::new("greedy");
        let greedy_bound = greedy.bound_fns.clone();

        let loader = FakeLoader::default()
            .with("picky.so", picky)
            .with("greedy.so", greedy);
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();

        run_codegen(
            CodegenOptions::new(vec![PathBuf::from("picky.so"), PathBuf::from("greedy.so")]),
            &host,
            &loader,
            &reporter,
        )
        .unwrap();

        assert_eq!(*picky_bound.borrow(), vec!["ecsact_meta_package_name".to_string()]);
        assert_eq!(greedy_bound.borrow().len(), 2);
    }

    #[test]
    fn test_collision_reports_both_plugins_and_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let mut first = FakePlugin::new("first");
        first.filenames = Some(vec!["same.h".to_string()]);
        let mut second = FakePlugin::new("second");
        second.filenames = Some(vec!["same.h".to_string()]);
        let unloaded = first.unloaded.clone();

        let loader = FakeLoader::default()
            .with("first.so", first)
            .with("second.so", second);
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();

        let result = run_codegen(
            CodegenOptions::new(vec![PathBuf::from("first.so"), PathBuf::from("second.so")]),
            &host,
            &loader,
            &reporter,
        );

        assert!(matches!(result, Err(Error::Codegen { .. })));
        let errors = reporter.messages(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("'second'"));
        assert!(errors[0].contains("'first'"));
        assert!(!temp_dir.path().join("pkg/same.h").exists());
        assert_eq!(*unloaded.borrow(), vec!["first".to_string()]);
    }

    #[test]
    fn test_fatal_report_fails_package_but_other_plugins_run() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let mut broken = FakePlugin::new("broken");
        broken.events = vec![PluginEvent::Report {
            filename_index: 0,
            severity: Severity::Fatal,
            message: "unsupported field type".to_string(),
        }];
        let loader = FakeLoader::default()
            .with("broken.so", broken)
            .with("fine.so", FakePlugin::new("fine"));
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();

        let result = run_codegen(
            CodegenOptions::new(vec![PathBuf::from("broken.so"), PathBuf::from("fine.so")]),
            &host,
            &loader,
            &reporter,
        );

        assert!(matches!(result, Err(Error::Codegen { .. })));
        assert_eq!(
            reporter.messages(Severity::Fatal),
            vec!["[broken] unsupported field type".to_string()]
        );
        assert!(reporter.contains("Codegen plugin 'broken' reported fatal error"));
        assert!(temp_dir.path().join("pkg/example.ecsact.fine").exists());
    }

    #[test]
    fn test_invalid_filename_index_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let mut plugin = FakePlugin::new("oob");
        plugin.events = vec![PluginEvent::Write {
            filename_index: 3,
            bytes: b"x".to_vec(),
        }];
        let loader = FakeLoader::default().with("oob.so", plugin);
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();

        assert!(run_codegen(
            CodegenOptions::new(vec![PathBuf::from("oob.so")]),
            &host,
            &loader,
            &reporter,
        )
        .is_err());
        assert!(reporter.contains("invalid output filename index 3"));
    }

    #[test]
    fn test_report_with_unknown_filename_index_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let mut plugin = FakePlugin::new("chatty");
        plugin.events = vec![
            PluginEvent::Write {
                filename_index: 0,
                bytes: b"// ok\n".to_vec(),
            },
            PluginEvent::Report {
                filename_index: 1,
                severity: Severity::Info,
                message: "generated".to_string(),
            },
        ];
        let loader = FakeLoader::default().with("chatty.so", plugin);
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();

        assert!(run_codegen(
            CodegenOptions::new(vec![PathBuf::from("chatty.so")]),
            &host,
            &loader,
            &reporter,
        )
        .is_err());
        assert!(reporter.contains("invalid output filename index 1"));
        assert!(!reporter.contains("generated"));
    }

    #[test]
    fn test_load_failure_aborts_pass() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let good = FakePlugin::new("good");
        let unloaded = good.unloaded.clone();
        let loader = FakeLoader::default().with("good.so", good);
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();

        let result = run_codegen(
            CodegenOptions::new(vec![PathBuf::from("good.so"), PathBuf::from("missing.so")]),
            &host,
            &loader,
            &reporter,
        );
        assert!(matches!(result, Err(Error::Plugin { .. })));
        assert!(!temp_dir.path().join("pkg/example.ecsact.good").exists());
        assert_eq!(*unloaded.borrow(), vec!["good".to_string()]);
    }

    #[test]
    fn test_duplicate_plugin_names() {
        let loader = FakeLoader::default()
            .with("a/dup.so", FakePlugin::new("dup"))
            .with("b/dup.so", FakePlugin::new("dup"));
        let host = FakeHost::new(Vec::new());
        let reporter = CollectingReporter::new();

        let result = run_codegen(
            CodegenOptions::new(vec![PathBuf::from("a/dup.so"), PathBuf::from("b/dup.so")]),
            &host,
            &loader,
            &reporter,
        );
        assert!(matches!(result, Err(Error::Plugin { plugin, .. }) if plugin == "dup"));
    }

    #[test]
    fn test_writer_mode() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let loader = FakeLoader::default().with("one.so", FakePlugin::new("one"));
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();
        let mut sink: Vec<u8> = Vec::new();

        run_codegen(
            CodegenOptions::new(vec![PathBuf::from("one.so")])
                .with_output(CodegenOutput::Writer(&mut sink)),
            &host,
            &loader,
            &reporter,
        )
        .unwrap();

        assert_eq!(String::from_utf8(sink).unwrap(), "// one\n");
        assert!(!temp_dir.path().join("pkg/example.ecsact.one").exists());
    }

    #[test]
    fn test_writer_mode_rejects_multiple_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let mut plugin = FakePlugin::new("split");
        plugin.filenames = Some(vec!["a.h".to_string(), "a.cc".to_string()]);
        let loader = FakeLoader::default().with("split.so", plugin);
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();
        let mut sink: Vec<u8> = Vec::new();

        let result = run_codegen(
            CodegenOptions::new(vec![PathBuf::from("split.so")])
                .with_output(CodegenOutput::Writer(&mut sink)),
            &host,
            &loader,
            &reporter,
        );
        assert!(matches!(result, Err(Error::Codegen { .. })));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_print_output_paths_generates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let package = package_fixture(&temp_dir);
        let loader = FakeLoader::default().with("one.so", FakePlugin::new("one"));
        let host = FakeHost::new(vec![(1, package)]);
        let reporter = CollectingReporter::new();

        let outputs = run_codegen(
            CodegenOptions::new(vec![PathBuf::from("one.so")])
                .with_output(CodegenOutput::PrintOutputPaths),
            &host,
            &loader,
            &reporter,
        )
        .unwrap();

        let expected = temp_dir.path().join("pkg/example.ecsact.one");
        assert_eq!(outputs, vec![expected.clone()]);
        assert!(!expected.exists());
        assert!(reporter.contains("example.ecsact.one"));
    }

    #[test]
    fn test_package_without_file_path_fails() {
        let loader = FakeLoader::default().with("one.so", FakePlugin::new("one"));
        let host = FakeHost::new(vec![(1, PathBuf::new())]);
        let reporter = CollectingReporter::new();

        assert!(run_codegen(
            CodegenOptions::new(vec![PathBuf::from("one.so")]),
            &host,
            &loader,
            &reporter,
        )
        .is_err());
        assert!(reporter.contains("has no file path"));
    }
}
