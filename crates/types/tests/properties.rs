//! Property-based invariants of the data model: datetime wire grammar,
//! case-insensitive lookup, and WBEM URI canonicalization.

use proptest::prelude::*;
use wbem_types::{CimDateTime, CimInstanceName, CimValue, NocaseMap};

fn timestamp_string() -> impl Strategy<Value = String> {
    (
        0u32..=9999,
        1u32..=12,
        1u32..=28,
        0u32..=23,
        0u32..=59,
        0u32..=59,
        0u32..=999_999,
        prop::bool::ANY,
        0u32..=999,
    )
        .prop_map(|(y, mo, d, h, mi, s, us, neg, off)| {
            format!(
                "{y:04}{mo:02}{d:02}{h:02}{mi:02}{s:02}.{us:06}{}{off:03}",
                if neg { '-' } else { '+' }
            )
        })
}

fn interval_string() -> impl Strategy<Value = String> {
    (
        0u32..=99_999_999,
        0u32..=23,
        0u32..=59,
        0u32..=59,
        0u32..=999_999,
    )
        .prop_map(|(d, h, m, s, us)| format!("{d:08}{h:02}{m:02}{s:02}.{us:06}:000"))
}

fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,15}"
}

proptest! {
    #[test]
    fn timestamp_parse_format_identity(wire in timestamp_string()) {
        let parsed: CimDateTime = wire.parse().unwrap();
        prop_assert!(parsed.is_timestamp());
        // -000 formats back as +000; both denote UTC
        let canonical = if wire.ends_with("-000") {
            wire.replace("-000", "+000")
        } else {
            wire.clone()
        };
        prop_assert_eq!(parsed.to_string(), canonical);
    }

    #[test]
    fn interval_parse_format_identity(wire in interval_string()) {
        let parsed: CimDateTime = wire.parse().unwrap();
        prop_assert!(parsed.is_interval());
        prop_assert_eq!(parsed.to_string(), wire);
    }

    #[test]
    fn truncated_or_padded_datetime_rejected(wire in timestamp_string(), cut in 0usize..25) {
        prop_assert!(wire[..cut].parse::<CimDateTime>().is_err());
        let padded = format!("{wire}0");
        prop_assert!(padded.parse::<CimDateTime>().is_err());
    }

    #[test]
    fn keybinding_lookup_under_any_case(name in identifier(), flips in prop::collection::vec(prop::bool::ANY, 16)) {
        let mut map = NocaseMap::new();
        map.insert(name.clone(), CimValue::from(42u32));

        let permuted: String = name
            .chars()
            .zip(flips.iter().copied().chain(std::iter::repeat(false)))
            .map(|(c, flip)| {
                if flip {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect();
        prop_assert_eq!(map.get(&permuted), Some(&CimValue::from(42u32)));
    }

    #[test]
    fn uri_keybindings_sorted(names in prop::collection::hash_set(identifier(), 1..6)) {
        let name = CimInstanceName::with_keybindings(
            "CIM_Foo",
            names.iter().map(|n| (n.clone(), CimValue::from(1u64))),
        );
        let uri = name.to_wbem_uri();
        let keys: Vec<&str> = uri
            .strip_prefix("CIM_Foo.")
            .map(|rest| rest.split(',').filter_map(|kv| kv.split('=').next()).collect())
            .unwrap_or_default();

        let mut sorted = keys.clone();
        sorted.sort_by_key(|k| k.to_lowercase());
        prop_assert_eq!(&keys, &sorted);
    }

    #[test]
    fn uri_round_trip_for_string_keys(
        entries in prop::collection::hash_map(identifier(), "[ -~]{0,12}", 1..5)
    ) {
        let name = CimInstanceName::with_keybindings(
            "CIM_Foo",
            entries.iter().map(|(k, v)| (k.clone(), CimValue::from(v.as_str()))),
        );
        let parsed = CimInstanceName::from_wbem_uri(&name.to_wbem_uri()).unwrap();
        prop_assert_eq!(parsed, name);
    }
}
