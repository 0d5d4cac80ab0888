#![no_main]

use futures_util::io::AsyncReadExt;
use libfuzzer_sys::fuzz_target;
use tokio::runtime;

fuzz_target!(|data: &[u8]| {
    let rt = runtime::Builder::new_current_thread().build().expect("runtime");
    rt.block_on(async {
        let sniffed = formpart::sniff(data).await.expect("in-memory reads can't fail");
        assert_eq!(sniffed.content_type(), &formpart::detect_content_type(data));

        let mut replayed = Vec::with_capacity(data.len());
        sniffed.into_reader().read_to_end(&mut replayed).await.expect("replay");
        assert_eq!(replayed, data);
    })
});
