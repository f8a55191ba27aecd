use assert_cmd::Command;
use predicates::str::contains;
use std::error::Error;
use std::path::Path;
use tempfile::tempdir;

// Helper function to get the path to the compiled binary
fn motionsift_cmd() -> Command {
    let mut cmd = Command::cargo_bin("motionsift").expect("Failed to find motionsift binary");
    cmd.env("NO_COLOR", "1").env_remove("MOTIONSIFT_CONFIG");
    cmd
}

fn write_motion_photo(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    bytes.extend_from_slice(b"MicroVideo");
    bytes.extend_from_slice(&[0u8; 54]);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x18]);
    bytes.extend_from_slice(b"ftypisom");
    bytes.extend_from_slice(&[0u8; 200]);
    std::fs::write(path, bytes)?;
    Ok(())
}

#[test]
fn test_help_lists_subcommands() -> Result<(), Box<dyn Error>> {
    motionsift_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("extract"))
        .stdout(contains("inspect"));
    Ok(())
}

#[test]
fn test_inspect_reports_located_payload() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let photo = dir.path().join("IMG_20240101_MP.jpg");
    write_motion_photo(&photo)?;

    motionsift_cmd()
        .arg("inspect")
        .arg(&photo)
        .assert()
        .success()
        .stderr(contains("MicroVideo"))
        .stderr(contains("iso-box"))
        .stderr(contains("Offset"));
    Ok(())
}

#[test]
fn test_inspect_fails_for_plain_still() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let still = dir.path().join("still.jpg");
    std::fs::write(&still, [0xFF, 0xD8, 0x00, 0x01])?;

    motionsift_cmd()
        .arg("inspect")
        .arg(&still)
        .assert()
        .failure()
        .stderr(contains("No embedded video container found"));
    Ok(())
}

#[test]
fn test_extract_non_existent_input() -> Result<(), Box<dyn Error>> {
    let output_dir = tempdir()?;

    motionsift_cmd()
        .current_dir(output_dir.path())
        .arg("extract")
        .arg("surely/this/does/not/exist/photo.jpg")
        .arg("--output")
        .arg(output_dir.path())
        .assert()
        .failure()
        .stderr(contains("Invalid input path"));
    Ok(())
}

#[test]
fn test_extract_requires_output() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    motionsift_cmd()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("extract")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("No output directory given"));
    Ok(())
}

#[test]
fn test_extract_empty_directory() -> Result<(), Box<dyn Error>> {
    let input_dir = tempdir()?;
    let output_dir = tempdir()?;

    motionsift_cmd()
        .current_dir(input_dir.path())
        .env("HOME", input_dir.path())
        .arg("extract")
        .arg(input_dir.path())
        .arg("-o")
        .arg(output_dir.path())
        .assert()
        .failure()
        .stderr(contains("No processable files found"));
    Ok(())
}

#[test]
fn test_extract_malformed_config_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("broken.json");
    std::fs::write(&config, "{ not json")?;

    motionsift_cmd()
        .arg("extract")
        .arg(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("Failed to parse configuration file"));
    Ok(())
}

#[test]
fn test_extract_rejects_zero_interval() -> Result<(), Box<dyn Error>> {
    motionsift_cmd()
        .args(["extract", "photos", "-o", "frames", "--interval", "0"])
        .assert()
        .failure()
        .stderr(contains("--interval"));
    Ok(())
}

#[cfg(not(feature = "opencv"))]
#[test]
fn test_extract_requires_face_detector_when_enabled() -> Result<(), Box<dyn Error>> {
    let input_dir = tempdir()?;
    let output_dir = tempdir()?;
    write_motion_photo(&input_dir.path().join("IMG_1.jpg"))?;

    motionsift_cmd()
        .current_dir(input_dir.path())
        .env("HOME", input_dir.path())
        .arg("extract")
        .arg(input_dir.path())
        .arg("-o")
        .arg(output_dir.path())
        .assert()
        .failure()
        .stderr(contains("no face detector is available"))
        .stderr(contains("--no-face-detect"));
    assert_eq!(std::fs::read_dir(output_dir.path())?.count(), 0);
    Ok(())
}
