use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use peaktech_core::{AcquisitionConfig, CaptureFormat, decode_capture_file};

const INPUTS: [&str; 2] = ["input.bin", "input.txt"];

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<(), String> {
    let root = PathBuf::from("tests").join("golden");
    let entries =
        fs::read_dir(&root).map_err(|err| format!("failed to read {}: {}", root.display(), err))?;

    for entry in entries {
        let entry = entry.map_err(|err| format!("failed to read entry: {}", err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(input) = INPUTS.iter().map(|name| path.join(name)).find(|p| p.exists()) else {
            continue;
        };
        let output = path.join("expected_report.json");
        regenerate_one(&input, &output)?;
    }

    Ok(())
}

fn regenerate_one(input: &Path, output: &Path) -> Result<(), String> {
    let format = CaptureFormat::from_path(input);
    let report = decode_capture_file(input, format, AcquisitionConfig::default())
        .map_err(|err| format!("decoding failed for {}: {}", input.display(), err))?;
    let json = serde_json::to_string(&report)
        .map_err(|err| format!("JSON serialization failed: {}", err))?;
    fs::write(output, json)
        .map_err(|err| format!("failed to write {}: {}", output.display(), err))?;
    Ok(())
}
