//! Host library
//!
//! The modules cell code can import. Each submodule registers its members into a [`registry::ModuleRegistry`];
//! [`install`] builds the full set a fresh interpreter starts with.
//!
//! | module | provides |
//! |--------|----------|
//! | `os`, `os.path` | environment lookup, `~` expansion, directory creation |
//! | `pathlib` | `Path` |
//! | `random`, `numpy.random`, `string` | seeded draws and character tables |
//! | `synthetic` (`datasets.synthetic`) | `generate_data` |
//! | `datasets.entertainment` | `get_movielens` |
//! | `dispatch` | `get_lib()` with `read_parquet` and `DataFrame` |
//! | `models` | `Model` and its `History` |
//! | `mock` (`unittest.mock`) | `patch` |

pub mod catalog;
pub mod codec;
pub mod dispatch;
pub mod frame;
pub mod mock;
pub mod os;
pub mod pathlib;
pub mod random;
pub mod registry;
pub mod synthetic;
pub mod training;

use registry::ModuleRegistry;

/// Register every host module.
pub fn install(registry: &mut ModuleRegistry) {
    os::register(registry);
    pathlib::register(registry);
    random::register(registry);
    synthetic::register(registry);
    catalog::register(registry);
    dispatch::register(registry);
    training::register(registry);
    mock::register(registry);
    tracing::trace!(modules = registry.module_paths().count(), "host modules installed");
}
