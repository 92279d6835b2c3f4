use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only the FT232H backend needs the FTDI libraries; the simulated sensor builds anywhere
    if env::var_os("CARGO_FEATURE_FTDI").is_none() {
        return;
    }

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };

    // Shared FTDI libraries live next to the project directory
    let shared_root = manifest_dir.parent().map(PathBuf::from).unwrap_or_else(|| manifest_dir.clone());

    // Path to MPSSE DLL (Win32/32-bit)
    let mpsse_lib_path = shared_root.join("FTDI MPSSE").join("build").join("Win32").join("DLL");

    // Path to D2XX DLL
    let d2xx_lib_path = shared_root.join("FTDI-D2XX-Drivers-Win-2.12.36.20U").join("x86");

    println!("cargo:rustc-link-search=native={}", mpsse_lib_path.display());
    println!("cargo:rustc-link-search=native={}", d2xx_lib_path.display());

    // libmpsse.dll depends on FTD2XX.dll, which is loaded at runtime
    println!("cargo:rustc-link-lib=dylib=libmpsse");

    println!("cargo:rerun-if-changed=../FTDI MPSSE/build/Win32/DLL/libmpsse.dll");
    println!("cargo:rerun-if-changed=../FTDI-D2XX-Drivers-Win-2.12.36.20U/x86/FTD2XX.dll");

    // Copy runtime DLLs next to the executable
    if let Ok(profile) = env::var("PROFILE") {
        let target_dir = manifest_dir
            .join("target")
            .join("i686-pc-windows-msvc")
            .join(&profile);

        if target_dir.exists() {
            let _ = fs::copy(mpsse_lib_path.join("libmpsse.dll"), target_dir.join("libmpsse.dll"));
            let _ = fs::copy(d2xx_lib_path.join("FTD2XX.dll"), target_dir.join("FTD2XX.dll"));

            println!("cargo:warning=Copied runtime DLLs to {}", target_dir.display());
        }
    }
}
