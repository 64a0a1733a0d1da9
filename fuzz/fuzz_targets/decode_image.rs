#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut limits = tiff_strips::Limits::default();
    limits.decoding_buffer_size = 1_000_000;
    limits.ifd_value_size = 1_000_000;
    limits.max_directories = 64;

    let decoder = if let Ok(d) = tiff_strips::Decoder::with_limits(data, limits) {
        d
    } else {
        return;
    };

    let _ = decoder.decode_all();
});
