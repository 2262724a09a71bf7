/// Tauri build script
/// Runs at compile time before the launcher is built
/// - Processes tauri.conf.json and the capability files
/// - Generates platform-specific resources (Windows icon/manifest)
fn main() {
    println!("cargo:rerun-if-changed=tauri.conf.json");
    println!("cargo:rerun-if-changed=capabilities");

    tauri_build::build()
}
