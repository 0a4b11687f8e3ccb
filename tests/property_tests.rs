/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use chrono::{Duration, Utc};
use proptest::prelude::*;
use prospect_data_api::csv_export::escape_csv_field;
use prospect_data_api::models::{
    CacheField, CachedSource, DataQuality, ProspectDataCache, ProspectInput, CACHE_TTL_DAYS,
};
use prospect_data_api::prospect_cache::create_prospect_cache_key;
use serde_json::json;

fn blank_or_none() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[ \t]{0,3}".prop_map(Some)]
}

// Property: cache keys are stable for the same identity
proptest! {
    #[test]
    fn key_never_panics(name in "\\PC*", city in proptest::option::of("\\PC*")) {
        let mut prospect = ProspectInput::new(name);
        prospect.city = city;
        let _ = create_prospect_cache_key(&prospect);
    }

    #[test]
    fn key_is_deterministic(
        name in "[A-Za-z ]{1,30}",
        address in proptest::option::of("[A-Za-z0-9 .]{0,30}"),
        city in proptest::option::of("[A-Za-z ]{0,20}"),
        state in proptest::option::of("[A-Z]{2}"),
    ) {
        let prospect = ProspectInput { name, address, city, state };
        prop_assert_eq!(
            create_prospect_cache_key(&prospect),
            create_prospect_cache_key(&prospect.clone())
        );
    }

    #[test]
    fn blank_and_missing_optional_fields_share_a_key(
        name in "[A-Za-z]{1,10}( [A-Za-z]{1,10})?",
        address in blank_or_none(),
        city in blank_or_none(),
        state in blank_or_none(),
    ) {
        let populated = ProspectInput { name: name.clone(), address, city, state };
        let bare = ProspectInput::new(name);
        prop_assert_eq!(create_prospect_cache_key(&populated), create_prospect_cache_key(&bare));
    }

    #[test]
    fn key_always_has_four_segments(
        name in "[A-Za-z ,.'-]{0,30}",
        city in proptest::option::of("[A-Za-z ,.'-]{0,20}"),
    ) {
        let mut prospect = ProspectInput::new(name);
        prospect.city = city;
        let key = create_prospect_cache_key(&prospect);
        prop_assert_eq!(key.split('|').count(), 4);
    }

    #[test]
    fn key_is_case_insensitive(name in "[A-Za-z]{1,10} [A-Za-z]{1,10}") {
        let upper = ProspectInput::new(name.to_uppercase());
        let lower = ProspectInput::new(name.to_lowercase());
        prop_assert_eq!(create_prospect_cache_key(&upper), create_prospect_cache_key(&lower));
    }
}

// Property: data quality only depends on the verified fields
proptest! {
    #[test]
    fn quality_matches_verified_count(mask in 0u16..(1 << 11)) {
        let now = Utc::now();
        let mut record = ProspectDataCache::skeleton(
            "p|||".to_string(),
            ProspectInput::new("p"),
            now,
            Duration::days(CACHE_TTL_DAYS),
        );
        for (i, field) in CacheField::ALL.iter().enumerate() {
            if mask & (1 << i) != 0 {
                record.set_field(*field, CachedSource::new(json!({}), now, Duration::days(1)), now);
            }
        }

        let verified = CacheField::VERIFIED
            .iter()
            .filter(|f| record.field(**f).is_some())
            .count();
        let expected = match verified {
            0 => DataQuality::Limited,
            1 | 2 => DataQuality::Partial,
            _ => DataQuality::Complete,
        };
        prop_assert_eq!(record.data_quality, expected);
    }
}

// Property: CSV escaping keeps plain values intact and always balances quotes
proptest! {
    #[test]
    fn plain_csv_fields_are_untouched(value in "[A-Za-z0-9 .;|-]{0,40}") {
        prop_assert_eq!(escape_csv_field(&value), value);
    }

    #[test]
    fn escaped_csv_fields_unquote_to_original(value in "\\PC*") {
        let escaped = escape_csv_field(&value);
        if escaped.starts_with('"') && escaped != value {
            let inner = &escaped[1..escaped.len() - 1];
            prop_assert_eq!(inner.replace("\"\"", "\""), value);
        } else {
            prop_assert_eq!(escaped, value);
        }
    }
}
