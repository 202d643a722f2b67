#![no_main]

use std::io::Read;

use decompress_body::{Body, DecompressBody, Response};
use libfuzzer_sys::fuzz_target;

const ENCODINGS: [&str; 5] = ["gzip", "br", "deflate", "zstd", "identity"];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let encoding = ENCODINGS[selector as usize % ENCODINGS.len()];

    let mut res = Response::new(
        [("Content-Encoding", encoding)].into_iter().collect(),
        Body::from(payload.to_vec()),
    );
    if res.decompress_body().is_err() {
        return;
    }

    let mut sink = Vec::new();
    let _ = res.body.by_ref().take(16 * 1024 * 1024).read_to_end(&mut sink);
    let _ = res.body.close();
});
