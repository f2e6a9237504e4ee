mod common;

use common::TestEnv;
use gantry::host::WebHost;

#[test]
fn test_provision_binds_a_store_certificate() {
    let env = TestEnv::new();
    let thumbprint = env.host().import_certificate("CN=psws.example.test").unwrap();

    let result = env.run(&[
        "provision",
        "--site",
        "PSWS",
        "--port",
        "8443",
        "--schema-file",
        "endpoint.mof",
        "--thumbprint",
        &thumbprint,
    ]);
    assert!(
        result.success,
        "provision failed:\n{}",
        result.combined_output()
    );
    assert_output_contains!(result, "https://*:8443");

    let state = env.read_state();
    assert_eq!(state["sites"][0]["protocol"], "https");
    assert_eq!(state["tls_bindings"][0]["port"], 8443);
    assert_eq!(state["tls_bindings"][0]["thumbprint"], thumbprint.as_str());
}

#[test]
fn test_provision_with_unknown_thumbprint_touches_nothing() {
    let env = TestEnv::new();

    let result = env.run(&[
        "provision",
        "--site",
        "PSWS",
        "--schema-file",
        "endpoint.mof",
        "--thumbprint",
        "DEADBEEF",
    ]);

    assert!(!result.success);
    assert_output_contains!(result, "no certificate with thumbprint 'DEADBEEF'");
    assert!(!env.host().pool_exists("PSWS").unwrap());
    assert!(!env.site_dir("PSWS").exists());
}

#[test]
fn test_provision_replaces_a_stale_binding_on_the_port() {
    let env = TestEnv::new();
    let host = env.host();

    // A leftover binding from an earlier endpoint on the same port.
    let old = host.import_certificate("CN=old.example.test").unwrap();
    host.bind_tls(8443, &old).unwrap();

    let new = host.import_certificate("CN=new.example.test").unwrap();
    let result = env.run(&[
        "provision",
        "--site",
        "PSWS",
        "--port",
        "8443",
        "--schema-file",
        "endpoint.mof",
        "--thumbprint",
        &new,
    ]);
    assert!(
        result.success,
        "provision failed:\n{}",
        result.combined_output()
    );

    let state = env.read_state();
    let bindings = state["tls_bindings"].as_array().unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0]["thumbprint"], new.as_str());
}

#[test]
fn test_sentinel_thumbprint_skips_the_store() {
    let env = TestEnv::new();

    let result = env.run(&[
        "provision",
        "--site",
        "PSWS",
        "--schema-file",
        "endpoint.mof",
        "--thumbprint",
        "allowunencryptedtraffic",
    ]);
    assert!(
        result.success,
        "provision failed:\n{}",
        result.combined_output()
    );
    assert_output_contains!(result, "http://*:8080");

    let state = env.read_state();
    assert!(state["tls_bindings"].as_array().unwrap().is_empty());
}
