//! Drive the provider with the JSON scenarios stored in `test-vectors/`.
//!
//! Each case describes an expectation set, a list of calls with the status
//! each call should get (`null` when no expectation answers), and the
//! outcome of `verify()`.

use mockhttp_core::{ExpectationSet, ExpectedResponseProvider, FullHttpRequest};

#[test]
fn matching_test_vectors() {
    let raw = include_str!("../../test-vectors/matching.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let set: ExpectationSet = serde_json::from_value(case["set"].clone()).unwrap();
        let provider = set.into_provider().unwrap();

        for (i, call) in case["calls"].as_array().unwrap().iter().enumerate() {
            let request: FullHttpRequest = serde_json::from_value(call["request"].clone()).unwrap();
            let status = provider.response(request.as_request()).map(|r| r.status());
            let expected = call["expected_status"].as_u64().map(|s| s as u16);
            assert_eq!(status, expected, "{name}: call #{i}");
        }

        let verify = &case["verify"];
        match provider.verify() {
            Ok(()) => assert!(
                verify["ok"].as_bool().unwrap(),
                "{name}: verify passed unexpectedly"
            ),
            Err(err) => {
                assert!(!verify["ok"].as_bool().unwrap(), "{name}: verify failed: {err}");
                assert_eq!(
                    err.unmet.len() as u64,
                    verify["unmet"].as_u64().unwrap(),
                    "{name}: unmet"
                );
                assert_eq!(
                    err.unexpected.len() as u64,
                    verify["unexpected"].as_u64().unwrap(),
                    "{name}: unexpected"
                );
            }
        }
    }
}
