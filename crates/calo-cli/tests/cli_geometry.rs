use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_calosim"))
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command should succeed, stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

#[test]
fn geometry_from_run_config() {
    let config = fixture_path("run_reference.yaml");
    let v = stdout_json(&run(&["geometry", "--config", config.to_str().unwrap(), "--area-m2", "2.0"]));

    assert_eq!(v["name"].as_str(), Some("reference_stack"));
    assert_eq!(v["layer_count"].as_u64(), Some(15));
    assert_eq!(v["n_ecal_layers"].as_u64(), Some(10));
    assert_eq!(v["n_hcal_layers"].as_u64(), Some(5));

    let x0 = v["ecal_depth_x0"].as_f64().unwrap();
    assert!((x0 - 10.0 / 0.89).abs() < 1e-9, "ecal_depth_x0={x0}");

    let budget = &v["budget"];
    assert_eq!(budget["area_m2"].as_f64(), Some(2.0));
    let pbwo4 = &budget["by_material"]["PbWO4"];
    assert!((pbwo4["total_cm"].as_f64().unwrap() - 10.0).abs() < 1e-9);
    assert!((pbwo4["total_cost_chf"].as_f64().unwrap() - 10.0 * 2.0 * 30000.0).abs() < 1e-6);
    assert!(budget["by_material"]["Fe"].is_object(), "Iron should resolve to Fe");
}

#[test]
fn geometry_from_design_name() {
    let v = stdout_json(&run(&["geometry", "--design", "triple_ecal_fe_scint_v4_2"]));
    assert_eq!(v["n_ecal_layers"].as_u64(), Some(181));
    let total = v["budget"]["total_length_cm"].as_f64().unwrap();
    assert!((total - 200.0).abs() < 1e-9, "total_length_cm={total}");
}

#[test]
fn geometry_unknown_design_fails() {
    let output = run(&["geometry", "--design", "no_such_design"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no_such_design"));
}

#[test]
fn designs_lists_reference_layouts() {
    let v = stdout_json(&run(&["designs"]));
    let names: Vec<&str> =
        v.as_array().unwrap().iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec!["pbwo4_fe_scint_v1", "pb_scint_fe_scint_v2", "triple_ecal_fe_scint_v4_2"]
    );
    for d in v.as_array().unwrap() {
        assert_eq!(d["hash"].as_str().unwrap().len(), 64);
        assert!(d["n_ecal_layers"].as_u64().unwrap() > 0);
    }
}

#[test]
fn version_prints_package_version() {
    let output = run(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("calosim {}", env!("CARGO_PKG_VERSION")));
}
