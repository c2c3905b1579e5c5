//! Fuzz target: persisted settings blob
//!
//! Feeds arbitrary bytes to the postcard decoder used by the NVS store.
//! Decoding must never panic, and anything that decodes must survive a
//! re-encode unchanged.
//!
//! cargo fuzz run fuzz_settings_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use lcc_controller::app::settings::Settings;

fuzz_target!(|data: &[u8]| {
    let Ok(settings) = postcard::from_bytes::<Settings>(data) else {
        return;
    };
    let bytes = postcard::to_allocvec(&settings).expect("encode decoded settings");
    let again: Settings = postcard::from_bytes(&bytes).expect("decode re-encoded settings");
    // NaN targets make `Settings` unequal to itself; compare bytes instead.
    assert_eq!(postcard::to_allocvec(&again).ok(), Some(bytes));
});
