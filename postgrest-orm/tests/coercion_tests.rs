//! Integration tests for column coercion
//!
//! Covers the wire format of every supported kind as it flows through the
//! client: write payloads, decoded responses and the errors that name the
//! offending field.

mod common;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::mock_client;
use common::models::*;
use postgrest_orm::{Error, IntRange, QueryBuilder};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

fn kitchen_sink() -> KitchenSink {
    let at = Utc.with_ymd_and_hms(2021, 12, 10, 8, 30, 0).unwrap();
    KitchenSink {
        id: 0,
        string_value: Some("a, b and \"c\"".into()),
        bool_value: Some(true),
        unique_value: Some(Uuid::parse_str("9b1deb4d-3b7d-4bad-9bdd-2b0d7b3dcb6d").unwrap()),
        int_value: Some(42),
        long_value: Some(9_007_199_254_740_993),
        float_value: Some(1.1),
        double_value: Some(2.5e-8),
        numeric_value: Some(Decimal::new(1250, 2)),
        datetime_value: Some(at),
        datetime_value_1: Some(DateTime::<Utc>::MAX_UTC),
        date_value: NaiveDate::from_ymd_opt(2021, 12, 10),
        list_of_strings: Some(vec!["one".into(), "two".into()]),
        list_of_datetimes: Some(vec![at, DateTime::<Utc>::MIN_UTC]),
        list_of_ints: Some(vec![1, 2, 3]),
        list_of_floats: Some(vec![1.5, f32::INFINITY]),
        int_range: Some(IntRange::new(20, 50)),
        json_value: Some(json!({"nested": {"array": [1, 2]}})),
        scratch: None,
    }
}

// ============================================================================
// Write Payload Tests
// ============================================================================

mod payload {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kitchen_sink_body() {
        let request = QueryBuilder::<KitchenSink>::new()
            .build_insert(&kitchen_sink())
            .unwrap();
        let body = request.body().unwrap();

        assert!(body.get("id").is_none());
        assert!(body.get("scratch").is_none());
        assert_eq!(body["long_value"], json!(9_007_199_254_740_993_i64));
        assert_eq!(body["float_value"], json!(1.1));
        assert_eq!(body["numeric_value"], json!(12.5));
        assert_eq!(body["datetime_value"], json!("2021-12-10T08:30:00+00:00"));
        assert_eq!(body["datetime_value_1"], json!("infinity"));
        assert_eq!(body["date_value"], json!("2021-12-10"));
        assert_eq!(body["list_of_datetimes"][1], json!("-infinity"));
        assert_eq!(body["list_of_floats"], json!([1.5, "Infinity"]));
        assert_eq!(body["int_range"], json!("[20,51)"));
        assert_eq!(body["unique_value"], json!("9b1deb4d-3b7d-4bad-9bdd-2b0d7b3dcb6d"));
    }

    #[test]
    fn test_absent_optionals_are_sent_as_null() {
        let request = QueryBuilder::<KitchenSink>::new()
            .build_insert(&KitchenSink::default())
            .unwrap();
        let body = request.body().unwrap();
        assert_eq!(body["string_value"], json!(null));
        assert_eq!(body["int_range"], json!(null));
    }
}

// ============================================================================
// Response Decoding Tests
// ============================================================================

mod response {
    use super::*;
    use pretty_assertions::assert_eq;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_kitchen_sink_round_trip() {
        let (client, mock) = mock_client();
        let sink = kitchen_sink();

        // the server echoes the inserted row with its generated key
        let mut echoed = QueryBuilder::<KitchenSink>::new()
            .build_insert(&sink)
            .unwrap()
            .body()
            .cloned()
            .unwrap();
        echoed["id"] = json!(7);
        mock.respond(201, json!([echoed]));

        let inserted = client
            .table::<KitchenSink>()
            .insert(&sink)
            .await
            .unwrap()
            .into_model()
            .unwrap();

        assert_eq!(inserted, KitchenSink { id: 7, ..sink });
    }

    #[tokio::test]
    async fn test_server_tokens() {
        let (client, mock) = mock_client();
        mock.respond(
            200,
            json!([{
                "id": 1,
                "float_value": "NaN",
                "double_value": "-Infinity",
                "numeric_value": "12345678901234567890.123",
                "datetime_value": "2021-12-10 08:30:00.5+02:00",
                "datetime_value_1": "-infinity",
                "date_value": "infinity",
                "unique_value": null,
                "int_range": "[20,51)"
            }]),
        );

        let sink = client.table::<KitchenSink>().single().await.unwrap().unwrap();

        assert!(sink.float_value.unwrap().is_nan());
        assert_eq!(sink.double_value, Some(f64::NEG_INFINITY));
        assert_eq!(
            sink.numeric_value,
            Some("12345678901234567890.123".parse::<Decimal>().unwrap())
        );
        assert_eq!(
            sink.datetime_value,
            Some(Utc.with_ymd_and_hms(2021, 12, 10, 6, 30, 0).unwrap() + chrono::Duration::milliseconds(500))
        );
        assert_eq!(sink.datetime_value_1, Some(DateTime::<Utc>::MIN_UTC));
        assert_eq!(sink.date_value, Some(NaiveDate::MAX));
        assert_eq!(sink.unique_value, None);
        assert_eq!(sink.int_range, Some(IntRange::new(20, 50)));
        // absent nullable columns read as None
        assert_eq!(sink.list_of_ints, None);
    }

    #[tokio::test]
    async fn test_bad_list_item_names_its_index() {
        let (client, mock) = mock_client();
        mock.respond(200, json!([{"id": 1, "list_of_ints": [1, "two", 3]}]));

        let err = client.table::<KitchenSink>().get().await.unwrap_err();
        assert_matches!(
            err,
            Error::Coercion(ref e) if e.field == "kitchen_sink.list_of_ints[1]"
        );
    }

    #[tokio::test]
    async fn test_user_json_and_range() {
        let (client, mock) = mock_client();
        mock.respond(
            200,
            json!([{
                "username": "supabot",
                "data": {"tags": ["bot"], "score": 1.5},
                "age_range": "[1,3)",
                "catchphrase": "'cat' 'fat'",
                "status": "ONLINE"
            }]),
        );

        let user = client.table::<User>().single().await.unwrap().unwrap();
        assert_eq!(user.data, Some(json!({"tags": ["bot"], "score": 1.5})));
        assert_eq!(user.age_range, Some(IntRange::new(1, 2)));
        assert_eq!(user.status.as_deref(), Some("ONLINE"));
    }

    #[tokio::test]
    async fn test_unknown_wire_enum_token() {
        let (client, mock) = mock_client();
        mock.respond(
            200,
            json!([
                {"id": 1, "name": null, "status": "OffDisplay", "created_at": null},
                {"id": 2, "name": null, "status": "Archived", "created_at": null}
            ]),
        );

        let err = client
            .table::<Movie>()
            .select(&["id", "name", "status", "created_at"])
            .get()
            .await
            .unwrap_err();
        assert_matches!(err, Error::Coercion(ref e) if e.field == "movie.status");
    }

    #[tokio::test]
    async fn test_api_error_body() {
        let (client, mock) = mock_client();
        mock.respond(
            400,
            json!({
                "code": "22P02",
                "message": "invalid input syntax for type integer: \"abc\"",
                "details": null,
                "hint": null
            }),
        );

        let err = client.table::<Movie>().eq("id", "abc").get().await.unwrap_err();
        assert_matches!(
            err,
            Error::Api { status: 400, ref code, ref path, .. }
                if code.as_deref() == Some("22P02") && path == "/movie"
        );
    }
}
