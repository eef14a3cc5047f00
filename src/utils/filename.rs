use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

use crate::utils::constants::{DEFAULT_OUTPUT_DIR, MANIFEST_FILE};

/// Path of a field file: `{output_dir}/{stem}.parquet`
pub fn field_output_path(output_dir: &Path, stem: &str) -> PathBuf {
    output_dir.join(format!("{}.parquet", stem))
}

pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILE)
}

/// Dated run directory: `output/{prefix}-{YYMMDD}`
pub fn generate_default_run_dir(prefix: &str) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100;

    let dirname = format!("{}-{:02}{:02}{:02}", prefix, year, now.month(), now.day());
    PathBuf::from(DEFAULT_OUTPUT_DIR).join(dirname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_output_path() {
        let path = field_output_path(Path::new("out"), "kaohsiung_pm25_2020-01");
        assert_eq!(path, PathBuf::from("out/kaohsiung_pm25_2020-01.parquet"));
        assert_eq!(
            manifest_path(Path::new("out")),
            PathBuf::from("out/manifest.json")
        );
    }

    #[test]
    fn test_generate_default_run_dir() {
        let dir = generate_default_run_dir("kaohsiung");
        let dir_str = dir.to_string_lossy();

        assert!(dir_str.starts_with("output/kaohsiung-"));
        // "output/" + "kaohsiung-" + YYMMDD
        assert_eq!(dir_str.len(), 7 + 10 + 6);
    }
}
