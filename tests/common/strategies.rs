use proptest::prelude::*;

/// Error texts around the truncation limit, multi-byte characters included
pub fn error_text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 :]{0,600}",
        "[a-z]{450,550}",
        "[éß漢字 ]{400,700}",
    ]
}

/// Outcome script for a sequence of deliveries: `true` means the model answers
pub fn delivery_script_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..8)
}
