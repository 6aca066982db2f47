use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn cargo_bin(case: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_carform"));
    cmd.env("CARFORM_CONFIG_DIR", config_dir(case));
    cmd.env_remove("CARFORM_FONT");
    cmd
}

fn output_dir() -> &'static Path {
    Path::new("tests/output")
}

fn config_dir(case: &str) -> PathBuf {
    output_dir().join(format!("{}-config", case))
}

/// Fresh form path and config dir for one test case.
fn setup(case: &str) -> String {
    fs::create_dir_all(output_dir()).expect("Failed to create output directory");
    let config = config_dir(case);
    if config.exists() {
        fs::remove_dir_all(&config).ok();
    }
    let form = output_dir().join(format!("{}.json", case));
    cleanup_file(&form);
    form.to_string_lossy().to_string()
}

fn cleanup_file(path: &Path) {
    if path.exists() {
        fs::remove_file(path).ok();
    }
}

fn run(case: &str, form: &str, args: &[&str]) -> Output {
    let mut full = vec!["-f", form];
    full.extend_from_slice(args);
    cargo_bin(case)
        .args(&full)
        .output()
        .expect("Failed to execute command")
}

fn run_ok(case: &str, form: &str, args: &[&str]) -> String {
    let output = run(case, form, args);
    assert!(output.status.success(), "Command {:?} failed: {:?}", args, output);
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn fill_required(case: &str, form: &str) {
    let values = [
        ("Registration number", "AB123"),
        ("Model number", "AA100A-1001001"),
        ("Travel distance", "12000"),
        ("Checked year", "2025"),
        ("Checked month", "06"),
        ("Checked day", "15"),
        ("Maintained year", "2025"),
        ("Maintained month", "06"),
        ("Maintained day", "16"),
    ];
    for (field, value) in values {
        run_ok(case, form, &["set", field, value]);
    }
    run_ok(case, form, &["group", "looked-items", "set", "1", "Brakes"]);
    run_ok(case, form, &["group", "parts-replacement", "set", "1", "Wiper, front"]);
}

fn read_csv(path: &Path) -> Vec<(String, String)> {
    let bytes = fs::read(path).expect("Failed to read CSV");
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"), "CSV has no UTF-8 BOM");

    let mut reader = csv::Reader::from_reader(&bytes[3..]);
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, vec!["Item", "Value"]);
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), r[1].to_string())
        })
        .collect()
}

#[test]
fn test_new_form_and_show() {
    let case = "new-show";
    let form = setup(case);

    run_ok(case, &form, &["new"]);
    assert!(Path::new(&form).exists(), "Form file was not created");

    // A second `new` must not clobber the form silently.
    let output = run(case, &form, &["new"]);
    assert!(!output.status.success());
    run_ok(case, &form, &["new", "--force"]);

    run_ok(case, &form, &["set", "Registration number", "AB123"]);
    let shown = run_ok(case, &form, &["show"]);
    let lines: Vec<&str> = shown.lines().collect();
    assert_eq!(lines.len(), 4 + 9 + 1 + 1);
    assert!(lines[0].starts_with("Business name"));
    assert!(lines[4].starts_with("Registration number") && lines[4].ends_with("AB123"));
    assert!(lines[13].starts_with("Looked item"));
    assert!(lines[14].starts_with("Parts replacement"));
}

#[test]
fn test_fullwidth_input_is_normalized() {
    let case = "fullwidth";
    let form = setup(case);

    run_ok(case, &form, &["set", "Registration number", "品川　５００　あ　１２３４"]);
    let shown = run_ok(case, &form, &["show"]);
    assert!(shown.contains("品川 500 あ 1234"), "unexpected output: {}", shown);
}

#[test]
fn test_export_end_to_end() {
    let case = "export";
    let form = setup(case);
    let csv_path = output_dir().join("export-test");
    let written = output_dir().join("export-test.csv");
    cleanup_file(&written);

    run_ok(
        case,
        &form,
        &["prefs", "set", "--business-name", "山田自動車", "--telephone", "03-1234-5678"],
    );
    fill_required(case, &form);
    run_ok(case, &form, &["group", "looked-items", "reveal", "1"]);
    run_ok(case, &form, &["group", "looked-items", "set", "2", "Tyres \"front\""]);

    let stdout = run_ok(case, &form, &["export", "-o", csv_path.to_str().unwrap()]);
    assert!(stdout.contains("export-test.csv"));

    let rows = read_csv(&written);
    let labels: Vec<&str> = rows.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Business name",
            "Address",
            "Telephone number",
            "Cellphone number",
            "Registration number",
            "Model number",
            "Travel distance",
            "Checked year",
            "Checked month",
            "Checked day",
            "Maintained year",
            "Maintained month",
            "Maintained day",
            "Looked item",
            "Looked item2",
            "Parts replacement",
        ]
    );
    assert_eq!(rows[0].1, "山田自動車");
    assert_eq!(rows[1].1, "");
    assert_eq!(rows[2].1, "03-1234-5678");
    assert_eq!(rows[4].1, "AB123");
    assert_eq!(rows[14].1, "Tyres \"front\"");
    assert_eq!(rows[15].1, "Wiper, front");
}

#[test]
fn test_export_blank_field_is_rejected() {
    let case = "export-blank";
    let form = setup(case);
    let csv_path = output_dir().join("should-not-exist.csv");
    cleanup_file(&csv_path);

    run_ok(case, &form, &["set", "Registration number", "AB123"]);
    let output = run(case, &form, &["export", "-o", csv_path.to_str().unwrap()]);
    assert!(!output.status.success(), "Export should fail with blank fields");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Warning: Please fill in all fields"), "stderr: {}", stderr);
    assert!(!csv_path.exists());
}

#[test]
fn test_group_reveal_and_hide() {
    let case = "group";
    let form = setup(case);

    run_ok(case, &form, &["group", "parts-replacement", "reveal", "1"]);
    run_ok(case, &form, &["group", "parts-replacement", "reveal", "2"]);
    let out = run_ok(case, &form, &["group", "parts-replacement", "set", "3", "Belt"]);
    assert!(out.contains("Parts replacement (3/5)"));
    assert!(out.contains("3. Belt"));

    // The first entry is permanent.
    let out = run_ok(case, &form, &["group", "parts-replacement", "hide", "1"]);
    assert!(out.contains("(3/5)"));

    let out = run_ok(case, &form, &["group", "parts-replacement", "hide", "3"]);
    assert!(out.contains("(2/5)"));
    assert!(!out.contains("Belt"));

    // Revealing past the last slot does nothing.
    let out = run_ok(case, &form, &["group", "parts-replacement", "reveal", "5"]);
    assert!(out.contains("(2/5)"));

    // Hidden entries cannot be filled.
    let output = run(case, &form, &["group", "parts-replacement", "set", "4", "Oil"]);
    assert!(!output.status.success());
}

#[test]
fn test_autofill_date() {
    let case = "autofill";
    let form = setup(case);

    run_ok(case, &form, &["set", "Checked year", "20250615"]);
    run_ok(case, &form, &["autofill", "checked"]);
    let shown = run_ok(case, &form, &["show"]);
    let find = |label: &str| {
        shown
            .lines()
            .find(|l| l.starts_with(label))
            .map(|l| l[label.len()..].trim().to_string())
            .unwrap()
    };
    assert_eq!(find("Checked year"), "2025");
    assert_eq!(find("Checked month"), "06");
    assert_eq!(find("Checked day"), "15");
}

#[test]
fn test_autofill_wrong_length_is_rejected() {
    let case = "autofill-bad";
    let form = setup(case);

    run_ok(case, &form, &["set", "Maintained year", "2025615"]);
    let output = run(case, &form, &["autofill", "maintained"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("YYYYMMDD"), "stderr: {}", stderr);

    let shown = run_ok(case, &form, &["show"]);
    assert!(shown.contains("2025615"));
}

#[test]
fn test_date_command() {
    let case = "date";
    let form = setup(case);

    let out = run_ok(case, &form, &["date", "maintained", "2024-02-09"]);
    assert!(out.contains("Maintained year 2024"));
    assert!(out.contains("Maintained month 02"));
    assert!(out.contains("Maintained day 09"));

    let output = run(case, &form, &["date", "maintained", "not-a-date"]);
    assert!(!output.status.success(), "Command should have failed for invalid date");
}

#[test]
fn test_reset_clears_form() {
    let case = "reset";
    let form = setup(case);

    run_ok(case, &form, &["set", "Model number", "AA100A"]);
    run_ok(case, &form, &["group", "looked-items", "reveal", "1"]);
    run_ok(case, &form, &["reset"]);

    let shown = run_ok(case, &form, &["show"]);
    assert!(!shown.contains("AA100A"));
    assert!(!shown.contains("Looked item2"));
}

#[test]
fn test_preferences_round_trip() {
    let case = "prefs";
    let form = setup(case);

    let output = run(case, &form, &["prefs", "set"]);
    assert!(!output.status.success(), "Empty prefs set should be rejected");

    run_ok(case, &form, &["prefs", "set", "--address", "1-2-3 Shibuya"]);
    run_ok(case, &form, &["prefs", "set", "--cellphone", "090-0000-0000"]);
    let shown = run_ok(case, &form, &["prefs", "show"]);
    assert!(shown.contains("Address: 1-2-3 Shibuya"));
    assert!(shown.contains("Cellphone number: 090-0000-0000"));
    assert!(config_dir(case).join("preferences.json").exists());

    run_ok(case, &form, &["prefs", "reset"]);
    let shown = run_ok(case, &form, &["prefs", "show"]);
    assert!(shown.contains("Address: \n") || shown.contains("Address: \r\n"));
}

#[test]
fn test_print_generates_pdf() {
    let case = "print";
    let form = setup(case);
    let pdf = output_dir().join("test-print.pdf");
    let png = output_dir().join("test-print.png");
    let layout = output_dir().join("test-print-layout.json");
    cleanup_file(&pdf);
    cleanup_file(&png);

    // Small layout keeps the test fast.
    fs::write(
        &layout,
        r#"{
            "width": 700,
            "height": 496,
            "font_size": 16.0,
            "fields": [ { "field": "Registration number", "x": 500, "y": 20 } ],
            "preferences": [ { "field": "business_name", "x": 300, "y": 430 } ],
            "looked_items": [ { "x": 500, "y": 100 } ],
            "parts_replacement": [ { "x": 500, "y": 270 } ]
        }"#,
    )
    .unwrap();

    run_ok(case, &form, &["prefs", "set", "--business-name", "Garage"]);
    run_ok(case, &form, &["set", "Registration number", "AB123"]);
    let stdout = run_ok(
        case,
        &form,
        &[
            "print",
            "-o",
            pdf.to_str().unwrap(),
            "--png",
            png.to_str().unwrap(),
            "--layout",
            layout.to_str().unwrap(),
        ],
    );
    assert!(stdout.contains("Generated"));

    let bytes = fs::read(&pdf).expect("PDF file was not created");
    assert!(bytes.starts_with(b"%PDF"));
    let preview = image::open(&png).expect("PNG preview was not created");
    assert_eq!((preview.width(), preview.height()), (700, 496));
}

#[test]
fn test_print_with_bad_layout_fails() {
    let case = "print-bad";
    let form = setup(case);
    let layout = output_dir().join("bad-layout.json");
    fs::write(&layout, "{ \"width\": 0 }").unwrap();

    let output = run(
        case,
        &form,
        &["print", "-o", "tests/output/should-not-exist.pdf", "--layout", layout.to_str().unwrap()],
    );
    assert!(!output.status.success());
}

#[test]
fn test_print_with_oversized_layout_is_an_error() {
    let case = "print-huge";
    let form = setup(case);
    let layout = output_dir().join("huge-layout.json");
    let json = run_ok(case, &form, &["layout"]).replace("\"width\": 3508", "\"width\": 4294967295");
    fs::write(&layout, json).unwrap();

    let output = run(
        case,
        &form,
        &["print", "-o", "tests/output/should-not-exist.pdf", "--layout", layout.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Invalid layout"), "unexpected stderr: {}", stderr);
    assert!(!stderr.contains("panicked"));
}

#[test]
fn test_layout_dump() {
    let case = "layout";
    let form = setup(case);
    let json = run_ok(case, &form, &["layout"]);
    assert!(json.contains("3508"));
    assert!(json.contains("\"Registration number\""));
    assert!(json.contains("looked_items"));
}

#[test]
fn test_invalid_form_file() {
    let case = "invalid-form";
    let form = setup(case);
    fs::write(&form, "{ \"fields\": { \"Colour\": \"red\" } }").unwrap();

    let output = run(case, &form, &["show"]);
    assert!(!output.status.success(), "Command should have failed for invalid form");
}

#[test]
fn test_unknown_field_rejected() {
    let case = "unknown-field";
    let form = setup(case);
    let output = run(case, &form, &["set", "Colour", "red"]);
    assert!(!output.status.success());
}
