#![no_main]

use fbtg_core::video_watch_url;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Some(url) = video_watch_url(&raw) {
        assert!(url.starts_with("youtube.com/watch?v=") || url.starts_with("facebook.com/watch/?v="));
        assert!(!url.ends_with("v="));
    }
});
