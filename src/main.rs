// Prevents additional console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    // Replaced by the library once the process group exists; until then
    // there is nothing to clean up
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        std::process::exit(1);
    }));

    icarus_launcher_lib::run();
}
