//! ---
//! lab_section: "08-testing-qa"
//! lab_subsection: "integration-tests"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Build rollback and teardown behavior across the stack."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::sync::Arc;

use topolab_core::{BuildError, LiveTopology};
use topolab_engine::SimEngine;
use topolab_harness::{SuiteOptions, SuiteTopology};
use topolab_parser::{parse_topology, ParseErrorKind};

const DESCRIPTION: &str = "\
[type=openswitch, shell=vtysh] ops1
[type=host] hs1
[type=host] hs2

hs1:port1 -- ops1:port6
ops1:port3 -- hs2:port1
";

#[tokio::test]
async fn failed_node_provisioning_rolls_back_the_partial_build() {
    let engine = Arc::new(SimEngine::new());
    engine.fail_node_provisioning("hs2");

    let topology = parse_topology(DESCRIPTION).unwrap();
    let err = LiveTopology::build(&topology, engine.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::Node { ref node, .. } if node == "hs2"));

    // ops1 and hs1 were provisioned before the failure and must be gone.
    assert_eq!(engine.provisioned_nodes(), 0);
    assert_eq!(engine.provisioned_links(), 0);
}

#[tokio::test]
async fn partial_teardown_failure_is_reported_and_retryable() {
    let engine = Arc::new(SimEngine::new());
    engine.fail_node_deprovisioning("ops1");
    let mut suite = SuiteTopology::build(DESCRIPTION, engine.clone(), SuiteOptions::default())
        .await
        .unwrap();

    let err = suite.teardown().await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("ops1"), "report should name the node: {message}");
    assert_eq!(engine.provisioned_nodes(), 1);
    assert_eq!(engine.provisioned_links(), 0);

    engine.clear_faults();
    suite.teardown().await.unwrap();
    assert_eq!(engine.provisioned_nodes(), 0);
}

#[test]
fn description_errors_carry_line_numbers() {
    let err = parse_topology(
        "[type=host] hs1\n\
         hs1:port1 -- ghost:port1\n",
    )
    .unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.is_reference());
    assert_eq!(err.kind, ParseErrorKind::UnknownNode("ghost".to_owned()));
}

#[test]
fn duplicate_declarations_are_reference_errors() {
    let err = parse_topology(
        "[type=host] hs1\n\
         [type=host] hs1\n",
    )
    .unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.is_reference());
    assert_eq!(err.kind, ParseErrorKind::DuplicateNode("hs1".to_owned()));
}
