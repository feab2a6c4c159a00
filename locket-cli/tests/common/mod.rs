/// Common test utilities and macros for CLI integration tests
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

/// Write a synthetic portrait photo with a gradient so crops are distinguishable.
pub fn write_photo(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("photo.png");
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            140,
            255,
        ])
    })
    .save(&path)
    .expect("save photo");
    path
}

/// Macro to set up a temp directory holding a 200x300 input photo and an output directory.
///
/// Creates:
/// - `temp_dir: TempDir` - temporary directory
/// - `input_path: PathBuf` - path to the input photo
/// - `output_dir: PathBuf` - path for delivered files
///
/// # Usage
///
/// ```ignore
/// let (temp_dir, input_path, output_dir) = cli_test_setup!();
/// ```
#[macro_export]
macro_rules! cli_test_setup {
    () => {{
        let temp_dir = tempfile::TempDir::new().expect("create temp dir");
        let input_path = $crate::common::write_photo(temp_dir.path(), 200, 300);
        let output_dir = temp_dir.path().join("output");
        (temp_dir, input_path, output_dir)
    }};
}

/// Macro to run the CLI with a subcommand and arguments, returning the process output.
///
/// # Usage
///
/// ```ignore
/// let output = run_cli!(["layout", "--shape", "oval"]);
/// assert!(output.status.success());
/// ```
#[macro_export]
macro_rules! run_cli {
    ([$($arg:expr),* $(,)?]) => {{
        std::process::Command::new(env!("CARGO_BIN_EXE_locket-cli"))
            .args([$($arg,)*])
            .output()
            .expect("execute CLI")
    }};
}

/// Macro to assert CLI success and print stderr on failure.
///
/// # Usage
///
/// ```ignore
/// assert_cli_success!(output, "export should succeed");
/// ```
#[macro_export]
macro_rules! assert_cli_success {
    ($output:expr, $msg:literal) => {{
        if !$output.status.success() {
            eprintln!("CLI stderr: {}", String::from_utf8_lossy(&$output.stderr));
        }
        assert!($output.status.success(), $msg);
    }};
}
