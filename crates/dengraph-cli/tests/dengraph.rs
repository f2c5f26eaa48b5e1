use dengraph_test::{CommandExt, tempfile, tool};
use pretty_assertions::assert_eq;

const SIMPLE_NOISE: &str = "\
1,2,3,4,5,6,20
0,1,1,1,1,1,0
1,0,1,1,1,1,0
1,1,0,1,1,1,0
1,1,1,0,1,1,0
1,1,1,1,0,1,0
1,1,1,1,1,0,0
0,0,0,0,0,0,0
";

#[test]
fn clusters_a_dense_neighbourhood_and_reports_noise() {
    let output = tool!("dengraph")
        .args(["-e", "5", "-n", "5", "--symmetric"])
        .write_stdin(SIMPLE_NOISE)
        .captured_output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "cluster 0: core=[\"1\", \"2\", \"3\", \"4\", \"5\", \"6\"] border=[]\nnoise: [\"20\"]\n"
    );
}

/// Removing node 6 drops every remaining clique member below the `η = 5` core threshold
/// (degree 4 each), so the whole former cluster downgrades to noise alongside `20`.
#[test]
fn apply_script_downgrades_cluster_to_noise_on_removal() {
    let graph_file = tempfile(SIMPLE_NOISE).unwrap();
    let script_file = tempfile("remove,6\n").unwrap();

    let output = tool!("dengraph")
        .args(["-e", "5", "-n", "5", "--symmetric", "-i"])
        .arg(graph_file.path())
        .arg("apply")
        .arg(script_file.path())
        .captured_output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "noise: [\"1\", \"2\", \"20\", \"3\", \"4\", \"5\"]\n");
}
