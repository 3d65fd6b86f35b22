use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn formats_lists_menu_for_jpg() {
    let mut cmd = Command::cargo_bin("file-converter").expect("Binary exists");
    cmd.arg("formats").arg("--name").arg("photo.jpg");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Detected .jpg. Choose format:"))
        .stdout(predicate::str::contains("JPEG (.jpeg)"))
        .stdout(predicate::str::contains("PNG (.png)"))
        .stdout(predicate::str::contains("WEBP (.webp)"))
        .stdout(predicate::str::contains("PDF (.pdf)"))
        .stdout(predicate::str::contains("JPG (.jpg)").not());
}

#[test]
fn formats_uses_content_type_when_name_has_no_extension() {
    let mut cmd = Command::cargo_bin("file-converter").expect("Binary exists");
    cmd.args(["formats", "--name", "scan", "--content-type", "application/pdf"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Detected .pdf."))
        .stdout(predicate::str::contains("Word (.docx)"));
}

#[test]
fn formats_rejects_unsupported_upload() {
    let mut cmd = Command::cargo_bin("file-converter").expect("Binary exists");
    cmd.args(["formats", "--name", "archive.zip"]);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Cannot convert .zip files."));
}

#[test]
fn convert_rejects_oversized_upload_before_download() {
    let scratch = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("file-converter").expect("Binary exists");
    cmd.env("FILE_CONVERTER_SCRATCH_DIR", scratch.path())
        .args([
            "convert",
            "--url",
            "http://127.0.0.1:9/never-fetched.png",
            "--name",
            "big.png",
            "--size",
            "11534336",
            "--to",
            "jpeg",
            "--out",
        ])
        .arg(out.path());

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("File too large (max 10 MB)."));
}
