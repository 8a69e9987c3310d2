//! Property tests for the release body codec.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use release_store::{decode_release, encode_release, ChartRef, Info, Release, Status};
use serde_json::json;

fn arb_status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

fn arb_time() -> impl Strategy<Value = Option<DateTime<Utc>>> {
    // Years 1970..2100, with sub-second precision.
    prop::option::of(
        (0i64..4_102_444_800, 0u32..1_000_000_000)
            .prop_filter_map("valid timestamp", |(secs, nanos)| {
                DateTime::from_timestamp(secs, nanos)
            }),
    )
}

fn arb_config() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        (any::<i64>(), ".{0,16}", any::<bool>()).prop_map(|(replicas, image, debug)| {
            json!({"replicas": replicas, "image": {"tag": image}, "debug": debug})
        }),
    ]
}

prop_compose! {
    fn arb_release()(
        name in "[a-z][-a-z0-9]{0,30}",
        version in 1u32..,
        namespace in "[a-z]{0,12}",
        status in arb_status(),
        first_deployed in arb_time(),
        last_deployed in arb_time(),
        deleted in arb_time(),
        description in ".{0,64}",
        notes in ".{0,64}",
        chart in prop::option::of(("[a-z]{1,12}", "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}")),
        config in arb_config(),
        manifest in ".{0,512}"
    ) -> Release {
        Release {
            name,
            version,
            namespace,
            info: Info {
                status,
                first_deployed,
                last_deployed,
                deleted,
                description,
                notes,
            },
            chart: chart.map(|(name, version)| ChartRef { name, version }),
            config,
            manifest,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn decode_inverts_encode(release in arb_release()) {
        let body = encode_release(&release).unwrap();
        prop_assert_eq!(decode_release(&body).unwrap(), release);
    }

    #[test]
    fn bodies_are_ascii(release in arb_release()) {
        let body = encode_release(&release).unwrap();
        prop_assert!(body.is_ascii());
    }
}
