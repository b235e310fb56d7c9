//! Kernel and shader source resolution.
//!
//! A [`ShaderLibrary`] maps resource paths (`shaders/sdf_kernel.wgsl`) to WGSL
//! text. Sources come from registered in-memory entries or from search
//! directories on disk, which take precedence so a deployed file can replace a
//! built-in one. Each raw source is cached on first resolution and stays cached
//! until [`ShaderLibrary::clear_cache`] or until the library is dropped.
//!
//! `#include "file.wgsl"` lines are expanded recursively, relative to the
//! directory of the including file. Each file is inlined at most once per
//! composed program; include cycles are an error.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::error::{MeshfieldError, Result};

/// A compile-time constant prepended to a composed program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderConst {
    /// `const NAME: u32 = ...;`
    U32(u32),
    /// `const NAME: f32 = ...;`
    F32(f32),
    /// `const NAME: bool = ...;`
    Bool(bool),
}

impl ShaderConst {
    fn declare(self, name: &str) -> String {
        match self {
            ShaderConst::U32(v) => format!("const {name}: u32 = {v}u;"),
            ShaderConst::F32(v) => format!("const {name}: f32 = {v:?};"),
            ShaderConst::Bool(v) => format!("const {name}: bool = {v};"),
        }
    }
}

/// Resolves shader resource paths to composed WGSL source.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    registered: HashMap<String, String>,
    search_dirs: Vec<PathBuf>,
    cache: HashMap<String, String>,
}

impl ShaderLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an in-memory source under `path`.
    pub fn register(&mut self, path: impl Into<String>, source: impl Into<String>) {
        let path = normalize(&path.into());
        self.cache.remove(&path);
        self.registered.insert(path, source.into());
    }

    /// Adds a directory searched before registered sources.
    pub fn add_search_dir(&mut self, dir: impl Into<PathBuf>) {
        self.search_dirs.push(dir.into());
    }

    /// Returns true if `path`'s raw source has been loaded.
    #[must_use]
    pub fn is_cached(&self, path: &str) -> bool {
        self.cache.contains_key(&normalize(path))
    }

    /// Drops every cached source.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Composes `path` with its includes expanded and `consts` declared first.
    pub fn compose(&mut self, path: &str, consts: &[(&str, ShaderConst)]) -> Result<String> {
        let mut out = String::new();
        for (name, value) in consts {
            out.push_str(&value.declare(name));
            out.push('\n');
        }

        let mut stack = Vec::new();
        let mut included = HashSet::new();
        self.expand(&normalize(path), &mut stack, &mut included, &mut out)?;
        Ok(out)
    }

    fn expand(
        &mut self,
        path: &str,
        stack: &mut Vec<String>,
        included: &mut HashSet<String>,
        out: &mut String,
    ) -> Result<()> {
        if stack.iter().any(|p| p == path) {
            return Err(MeshfieldError::ShaderIncludeCycle(path.to_string()));
        }
        if !included.insert(path.to_string()) {
            return Ok(());
        }

        let source = self.load(path)?;
        stack.push(path.to_string());
        for line in source.lines() {
            match parse_include(line) {
                Some(file) => {
                    let include_path = join(parent(path), file);
                    self.expand(&include_path, stack, included, out)?;
                }
                None => {
                    let _ = writeln!(out, "{line}");
                }
            }
        }
        stack.pop();
        Ok(())
    }

    fn load(&mut self, path: &str) -> Result<String> {
        if let Some(source) = self.cache.get(path) {
            return Ok(source.clone());
        }

        let from_disk = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.is_file());
        let source = match from_disk {
            Some(file) => std::fs::read_to_string(&file)?,
            None => self
                .registered
                .get(path)
                .cloned()
                .ok_or_else(|| MeshfieldError::ShaderNotFound(path.to_string()))?,
        };

        log::debug!("resolved shader source {path} ({} bytes)", source.len());
        self.cache.insert(path.to_string(), source.clone());
        Ok(source)
    }
}

fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?;
    let rest = rest.trim();
    let start = rest.find('"')? + 1;
    let end = start + rest[start..].find('"')?;
    Some(&rest[start..end])
}

fn parent(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

fn join(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        normalize(file)
    } else {
        normalize(&format!("{dir}/{file}"))
    }
}

// Collapses `.` and `..` segments so one file always maps to one cache key.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}
