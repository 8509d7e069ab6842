use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

use crate::errors::*;

/// File name endings of fastq inputs, compressed or not.
pub const FASTQ_EXTENSIONS: [&str; 4] = [".fastq", ".fastq.gz", ".fq", ".fq.gz"];

pub fn is_fastq(path: &Path) -> bool {
    path.file_name()
        .map(|name| {
            let name = name.to_string_lossy();
            FASTQ_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        })
        .unwrap_or(false)
}

/// Recursively find every fastq file under a folder, sorted by path.
///
/// Fails if the folder does not exist or holds no fastq file.
pub fn list_fastq_files(input_folder: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let input_folder = input_folder.as_ref();

    if !input_folder.is_dir() {
        return Err(Error::NoInput(input_folder.to_owned()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input_folder).follow_links(true) {
        let entry = entry.map_err(|e| Error::Discovery {
            dir: input_folder.to_owned(),
            source: e,
        })?;

        if entry.file_type().is_file() && is_fastq(entry.path()) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(Error::NoInput(input_folder.to_owned()));
    }

    files.sort();
    Ok(files)
}

/// Name of the sample a fastq file belongs to.
///
/// This is the file name up to the first `.` and then up to the first `_`, for example
/// `FAQ12345_pass_barcode01_0.fastq.gz` belongs to sample `FAQ12345`.
pub fn sample_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    let name = file_name.split('.').next().unwrap_or_default();
    let name = name.split('_').next().unwrap_or_default();
    name.replace("_pass", "").replace("_fail", "")
}

/// Check that no two inputs would be written to the same output sample.
pub fn check_sample_names(inputs: &[PathBuf]) -> Result<()> {
    let mut seen: FxHashMap<String, &PathBuf> = FxHashMap::default();

    for input in inputs {
        let sample = sample_name(input);
        if let Some(first) = seen.get(&sample) {
            return Err(Error::SampleCollision {
                sample,
                first: (*first).clone(),
                second: input.clone(),
            });
        }
        seen.insert(sample, input);
    }

    Ok(())
}
