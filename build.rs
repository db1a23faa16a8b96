fn main() {
    #[cfg(all(feature = "dwf", target_os = "windows"))]
    println!("cargo:rustc-link-lib=dwf");
    #[cfg(all(feature = "dwf", target_os = "windows"))]
    println!("cargo:rustc-link-search=native=C:/Program Files (x86)/Digilent/WaveFormsSDK/lib/x64");
    #[cfg(all(feature = "dwf", target_os = "linux"))]
    println!("cargo:rustc-link-lib=dylib=dwf");
    #[cfg(all(feature = "dwf", target_os = "macos"))]
    println!("cargo:rustc-link-search=framework=/Library/Frameworks");
    #[cfg(all(feature = "dwf", target_os = "macos"))]
    println!("cargo:rustc-link-lib=framework=dwf");
}
