// Browser-only checks for the localStorage backend. Run with
// `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use mami_of_gl::progress::{self, LocalStore, Progress, ProgressStore};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn local_store_round_trips_progress() {
    let mut store = LocalStore::open().expect("localStorage");
    store.remove(progress::KEY_COLLECTED_ZODIAC_IDS).unwrap();
    store.set(progress::KEY_BEST_SCORE, "oops").unwrap();

    let mut p = Progress::load(store);
    assert_eq!(p.best_score(), 0);
    p.record_catch("a1", "leo");
    let ids = p.caught().clone();
    assert!(p.record_run(20, 1, &ids));

    let reopened = Progress::load(LocalStore::open().unwrap());
    assert!(reopened.collected().contains("leo"));
    assert_eq!(reopened.best_score(), 20);
}

#[wasm_bindgen_test]
fn stop_removes_injected_nodes() {
    let doc = web_sys::window().unwrap().document().unwrap();
    let actresses = r#"{ "actresses": [
        { "id": "a1", "name": "Ann Example", "starSign": "Leo", "starSignId": "leo" }
    ] }"#;
    mami_of_gl::start_game("free", actresses, "", "").unwrap();
    for id in ["mami-stage", "mami-hud", "mami-toast"] {
        assert!(doc.get_element_by_id(id).is_some(), "{id} not mounted");
    }
    mami_of_gl::stop_game();
    for id in ["mami-stage", "mami-hud", "mami-toast"] {
        assert!(doc.get_element_by_id(id).is_none(), "{id} left behind");
    }
}
