use std::{
    env, io,
    path::{Path, PathBuf},
};

use crate::datasets::labelled;

/// The data directory, relative to the working directory
pub static DATA_DIR: &str = "Data";

/// The default data file: `<cwd>/Data/yelp_labelled.txt`
pub fn default_data_path() -> io::Result<PathBuf> {
    Ok(data_path(env::current_dir()?))
}

/// The data file location under a given root directory
pub fn data_path<P: AsRef<Path>>(root: P) -> PathBuf {
    root.as_ref().join(DATA_DIR).join(labelled::DATA_FILE)
}
