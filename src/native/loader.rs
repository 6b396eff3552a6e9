//! Opens the Knitro shared library at runtime and installs its function table.

use super::ffi::FunctionTable;
use crate::error::BindingError;
use libloading::Library;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

struct LoadedLibrary {
    path: PathBuf,
    table: FunctionTable,
    // Keeps the symbols in `table` valid for the rest of the process.
    _library: Library,
}

static LOADED: OnceLock<LoadedLibrary> = OnceLock::new();

/// Loads the solver from `path` and installs it as the process-wide table.
///
/// Loading the path that is already installed returns the installed table.
/// A different path fails with [`BindingError::AlreadyLoaded`]; the first
/// library stays in place because live contexts may point into it.
pub fn load_library(path: impl AsRef<Path>) -> Result<&'static FunctionTable, BindingError> {
    let path = path.as_ref();
    if let Some(loaded) = LOADED.get() {
        return installed_or_conflict(loaded, path);
    }

    let library = unsafe { Library::new(path) }.map_err(|e| BindingError::LibraryLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let table = unsafe { resolve_table(&library)? };
    log::debug!("loaded solver library from {}", path.display());

    let candidate = LoadedLibrary {
        path: path.to_path_buf(),
        table,
        _library: library,
    };
    match LOADED.set(candidate) {
        Ok(()) => Ok(&LOADED.get().ok_or(BindingError::LibraryNotLoaded)?.table),
        // Another thread won the race; ours is dropped and unloaded here.
        Err(_) => {
            let loaded = LOADED.get().ok_or(BindingError::LibraryNotLoaded)?;
            installed_or_conflict(loaded, path)
        }
    }
}

/// The path of the runtime-loaded library, if one is installed.
pub fn loaded_library_path() -> Option<&'static Path> {
    LOADED.get().map(|loaded| loaded.path.as_path())
}

/// The table new contexts use when no explicit table is given.
///
/// A runtime-loaded library takes precedence over the linked one.
pub fn default_table() -> Result<&'static FunctionTable, BindingError> {
    if let Some(loaded) = LOADED.get() {
        return Ok(&loaded.table);
    }
    linked_table().ok_or(BindingError::LibraryNotLoaded)
}

#[cfg(feature = "link")]
fn linked_table() -> Option<&'static FunctionTable> {
    Some(&super::linked::LINKED)
}

#[cfg(not(feature = "link"))]
fn linked_table() -> Option<&'static FunctionTable> {
    None
}

fn installed_or_conflict(
    loaded: &'static LoadedLibrary,
    requested: &Path,
) -> Result<&'static FunctionTable, BindingError> {
    ensure_same_library(&loaded.path, requested)?;
    Ok(&loaded.table)
}

fn ensure_same_library(installed: &Path, requested: &Path) -> Result<(), BindingError> {
    if installed == requested {
        Ok(())
    } else {
        Err(BindingError::AlreadyLoaded(installed.display().to_string()))
    }
}

/// # Safety
/// `library` must export the Knitro symbols with the signatures in `ffi`.
unsafe fn resolve_table(library: &Library) -> Result<FunctionTable, BindingError> {
    Ok(FunctionTable {
        new: symbol(library, "KTR_new")?,
        free: symbol(library, "KTR_free")?,
        set_double_param: symbol(library, "KTR_set_double_param")?,
        get_double_param: symbol(library, "KTR_get_double_param")?,
        set_int_param: symbol(library, "KTR_set_int_param")?,
        get_int_param: symbol(library, "KTR_get_int_param")?,
        init_problem: symbol(library, "KTR_init_problem")?,
        solve: symbol(library, "KTR_solve")?,
    })
}

unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, BindingError> {
    library
        .get::<T>(name.as_bytes())
        .map(|sym| *sym)
        .map_err(|e| BindingError::MissingSymbol {
            symbol: name,
            reason: e.to_string(),
        })
}
