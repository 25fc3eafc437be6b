#![no_main]

use fbtg_core::{
    parse_post_payload_str, select_delivery_strategy, FallbackTrigger, DEFAULT_CAPTION_LIMIT,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let Ok(post) = parse_post_payload_str(&raw) else {
        return;
    };
    let strategy = select_delivery_strategy(post.kind());
    if let Ok(plan) = strategy.plan(&post, DEFAULT_CAPTION_LIMIT) {
        assert!(!plan.attempts.is_empty());
        assert_eq!(plan.strategy, strategy);
        let last = plan.attempts.last().map(|attempt| attempt.fallback_on);
        assert!(matches!(
            last,
            Some(FallbackTrigger::Never | FallbackTrigger::AnyFailure)
        ));
        if let Some(deferred) = plan.deferred_message.as_deref() {
            assert!(deferred.chars().count() > DEFAULT_CAPTION_LIMIT);
        }
    }
});
