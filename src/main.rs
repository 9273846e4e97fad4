#[cfg(not(target_arch = "wasm32"))]
fn main() {
    eprintln!("landing-fx runs in the browser. Run `trunk serve` or `trunk build --release`.");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    landing_fx::frontend::run();
}
