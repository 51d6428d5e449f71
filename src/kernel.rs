//! Kernel module loading.
//!
//! A kernel module is a file holding either WGSL source or a SPIR-V
//! binary.  Both are parsed on the host into a [`naga::Module`], which
//! lets entry points be resolved before any device exists and gives the
//! device a single IR to compile regardless of the file format.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::dim::Dim3;
use crate::error::{Error, Result};

const SPIRV_MAGIC: [u8; 4] = 0x0723_0203u32.to_le_bytes();

/// Source format of a kernel module file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    Wgsl,
    SpirV,
}

impl ModuleFormat {
    /// SPIR-V is recognised by extension or by its magic number; anything
    /// else is treated as WGSL text.
    fn detect(path: &Path, bytes: &[u8]) -> Self {
        let spv_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("spv"));
        if spv_extension || bytes.starts_with(&SPIRV_MAGIC) {
            ModuleFormat::SpirV
        } else {
            ModuleFormat::Wgsl
        }
    }
}

/// A compute entry point resolved from a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    /// The `@workgroup_size` the entry point was compiled with.
    pub workgroup_size: Dim3,
}

/// A parsed kernel module together with the path it came from.
#[derive(Debug, Clone)]
pub struct KernelModule {
    path: PathBuf,
    format: ModuleFormat,
    module: naga::Module,
}

impl KernelModule {
    /// Read and parse the module at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|e| Error::ModuleLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let format = ModuleFormat::detect(&path, &bytes);
        let module = match format {
            ModuleFormat::SpirV => {
                naga::front::spv::parse_u8_slice(&bytes, &naga::front::spv::Options::default())
                    .map_err(|e| Error::ModuleLoad {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?
            }
            ModuleFormat::Wgsl => {
                let source = String::from_utf8(bytes).map_err(|e| Error::ModuleLoad {
                    path: path.clone(),
                    reason: format!("module is neither SPIR-V nor UTF-8 WGSL: {e}"),
                })?;
                naga::front::wgsl::parse_str(&source).map_err(|e| Error::ModuleLoad {
                    path: path.clone(),
                    reason: e.emit_to_string(&source),
                })?
            }
        };
        info!(
            "loaded {:?} kernel module {} with {} entry point(s)",
            format,
            path.display(),
            module.entry_points.len()
        );
        Ok(Self {
            path,
            format,
            module,
        })
    }

    /// Resolve a compute entry point by name.
    pub fn entry_point(&self, name: &str) -> Result<EntryPoint> {
        self.module
            .entry_points
            .iter()
            .find(|ep| ep.name == name && ep.stage == naga::ShaderStage::Compute)
            .map(|ep| EntryPoint {
                name: ep.name.clone(),
                workgroup_size: Dim3::from(ep.workgroup_size),
            })
            .ok_or_else(|| Error::FunctionNotFound {
                entry_point: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Names of every compute entry point in the module.
    pub fn compute_entry_points(&self) -> Vec<&str> {
        self.module
            .entry_points
            .iter()
            .filter(|ep| ep.stage == naga::ShaderStage::Compute)
            .map(|ep| ep.name.as_str())
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ModuleFormat {
        self.format
    }

    pub(crate) fn into_naga(self) -> naga::Module {
        self.module
    }
}
