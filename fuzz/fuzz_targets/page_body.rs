//! Fuzz target for catalog response decoding.
//!
//! Decoding arbitrary bytes must either yield a page or a
//! `MalformedResponse` error, and a decoded page must survive the shape
//! check without panicking for any requested page size.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use artpick::catalog::CatalogErrorKind;
use artpick::catalog::http::decode_page_body;

#[derive(Arbitrary, Debug)]
struct PageBodyInput {
    body: String,
    page_index: u16,
    page_size: u8,
}

fuzz_target!(|input: PageBodyInput| {
    let page_index = usize::from(input.page_index);
    match decode_page_body(&input.body, page_index) {
        Ok(page) => {
            assert_eq!(page.page_index, page_index);
            let _ = page.check_shape(usize::from(input.page_size).max(1));
        }
        Err(err) => assert_eq!(err.kind(), CatalogErrorKind::MalformedResponse),
    }
});
