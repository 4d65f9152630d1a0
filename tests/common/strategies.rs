use proptest::prelude::*;

/// Strategy for a single literal path segment
pub fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,12}"
}

/// Strategy for concrete request paths such as `/wh/orders/42`
pub fn path_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment_strategy(), 1..6)
}

/// Strategy for a path together with a mask choosing which segments become `:params`
pub fn path_with_param_mask_strategy() -> impl Strategy<Value = (Vec<String>, Vec<bool>)> {
    path_strategy().prop_flat_map(|segments| {
        let len = segments.len();
        (Just(segments), prop::collection::vec(any::<bool>(), len))
    })
}

/// Strategy for HTTP methods in mixed case
pub fn method_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("POST".to_string()),
        Just("post".to_string()),
        Just("Put".to_string()),
        Just("GET".to_string()),
        Just("delete".to_string()),
    ]
}

pub fn join_path(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

/// Build a pattern from `segments`, replacing masked segments with `:p{index}`
pub fn to_pattern(segments: &[String], mask: &[bool]) -> String {
    let parts: Vec<String> = segments
        .iter()
        .zip(mask)
        .enumerate()
        .map(|(index, (segment, is_param))| {
            if *is_param {
                format!(":p{index}")
            } else {
                segment.clone()
            }
        })
        .collect();
    join_path(&parts)
}
