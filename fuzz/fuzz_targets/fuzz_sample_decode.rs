#![no_main]
use battery_core::calibration::{current_from_raw, voltage_from_raw};
use battery_core::decoder::decode_pair;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: ([u16; 2], i32, i32)| {
    let (words, v_raw, i_raw) = input;
    let pair = decode_pair(&words);
    assert!((0..=5000).contains(&pair.current));
    assert!((0..=5000).contains(&pair.voltage));

    // Calibration saturates instead of overflowing, for any raw input.
    let _ = current_from_raw(i_raw);
    let _ = voltage_from_raw(v_raw, i_raw);
});
